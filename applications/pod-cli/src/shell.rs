//! Command shell
//!
//! Parses one command per line and drives the [`Player`]. After every command
//! the events queued by the simulated media element are fed back to the
//! player until none are left.

use crate::error::CliError;
use crate::media::MediaClock;
use pod_core::memory::MemoryEpisodeRepository;
use pod_core::types::{EpisodeId, EpisodeStatus};
use pod_playback::{PlaybackPhase, Player};
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;

/// Upper bound on events pumped per command (guards against feedback loops)
const MAX_EVENTS_PER_COMMAND: usize = 256;

const HELP: &str = "\
commands:
  status                     show the session
  episodes                   list the library
  queue                      list the queue
  play [id]                  resume, or play an episode directly
  pause | toggle             pause / toggle playback
  next | prev | jump <i>     move through the queue
  seek <secs> | seek <n>%    jump within the episode
  ff [secs] | rew [secs]     skip forward / back
  volume <0-1> | rate <x>    output settings
  mute                       toggle mute
  add <id>                   append to the queue
  next-up <id>               insert after the current slot
  top <id>                   move to the head of the queue
  remove <id>                remove from the queue
  move <from> <to>           reorder the queue
  clear                      clear the queue
  mark <played|new|archived> <id>
  tick <secs>                let time pass on the media clock
  fail [message]             simulate a media error
  reject                     reject the next play request
  help | quit";

/// Where to seek
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekTarget {
    Seconds(f64),
    Percent(f64),
}

/// A parsed shell command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Quit,
    Status,
    Episodes,
    Queue,
    Play(Option<EpisodeId>),
    Pause,
    Toggle,
    Next,
    Previous,
    Jump(usize),
    Seek(SeekTarget),
    Forward(Option<f64>),
    Back(Option<f64>),
    Volume(f64),
    Rate(f64),
    Mute,
    Add(EpisodeId),
    PlayNext(EpisodeId),
    Top(EpisodeId),
    Remove(EpisodeId),
    Move(usize, usize),
    Clear,
    Mark(EpisodeStatus, EpisodeId),
    Tick(f64),
    Fail(String),
    Reject,
}

fn number<T: FromStr>(arg: Option<&str>, what: &str) -> Result<T, CliError> {
    let raw = arg.ok_or_else(|| CliError::Parse(format!("missing {what}")))?;
    raw.parse()
        .map_err(|_| CliError::Parse(format!("invalid {what}: {raw}")))
}

fn optional_number(arg: Option<&str>, what: &str) -> Result<Option<f64>, CliError> {
    arg.map(|raw| number(Some(raw), what)).transpose()
}

fn episode_id(arg: Option<&str>) -> Result<EpisodeId, CliError> {
    arg.map(EpisodeId::new)
        .ok_or_else(|| CliError::Parse("missing episode id".to_string()))
}

impl FromStr for Command {
    type Err = CliError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            return Err(CliError::Parse("empty command".to_string()));
        };
        let arg = parts.next();

        let command = match verb.to_ascii_lowercase().as_str() {
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            "status" | "st" => Self::Status,
            "episodes" | "ls" => Self::Episodes,
            "queue" | "q" => Self::Queue,
            "play" => Self::Play(arg.map(EpisodeId::new)),
            "pause" => Self::Pause,
            "toggle" => Self::Toggle,
            "next" => Self::Next,
            "prev" | "previous" => Self::Previous,
            "jump" => Self::Jump(number(arg, "queue index")?),
            "seek" => {
                let raw = arg.ok_or_else(|| CliError::Parse("missing position".to_string()))?;
                match raw.strip_suffix('%') {
                    Some(percent) => Self::Seek(SeekTarget::Percent(number(Some(percent), "percent")?)),
                    None => Self::Seek(SeekTarget::Seconds(number(Some(raw), "position")?)),
                }
            }
            "ff" => Self::Forward(optional_number(arg, "seconds")?),
            "rew" => Self::Back(optional_number(arg, "seconds")?),
            "volume" | "vol" => Self::Volume(number(arg, "volume")?),
            "rate" => Self::Rate(number(arg, "rate")?),
            "mute" => Self::Mute,
            "add" => Self::Add(episode_id(arg)?),
            "next-up" => Self::PlayNext(episode_id(arg)?),
            "top" => Self::Top(episode_id(arg)?),
            "remove" | "rm" => Self::Remove(episode_id(arg)?),
            "move" | "mv" => Self::Move(number(arg, "from index")?, number(parts.next(), "to index")?),
            "clear" => Self::Clear,
            "mark" => {
                let raw = arg.ok_or_else(|| CliError::Parse("missing status".to_string()))?;
                let status = match EpisodeStatus::from_str(raw) {
                    Some(status) if status != EpisodeStatus::InProgress => status,
                    _ => return Err(CliError::Parse(format!("cannot mark as {raw}"))),
                };
                Self::Mark(status, episode_id(parts.next())?)
            }
            "tick" => Self::Tick(number(arg, "seconds")?),
            "fail" => {
                let message: Vec<&str> = arg.into_iter().chain(parts.by_ref()).collect();
                if message.is_empty() {
                    Self::Fail("simulated media error".to_string())
                } else {
                    Self::Fail(message.join(" "))
                }
            }
            "reject" => Self::Reject,
            other => return Err(CliError::Parse(format!("unknown command: {other}"))),
        };

        Ok(command)
    }
}

/// Whether the shell should keep reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// `mm:ss` (or `h:mm:ss`)
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

/// Interactive/scripted front end to a [`Player`]
pub struct Shell<W: Write> {
    player: Player,
    clock: MediaClock,
    episodes: Arc<MemoryEpisodeRepository>,
    out: W,
}

impl<W: Write> Shell<W> {
    pub fn new(
        player: Player,
        clock: MediaClock,
        episodes: Arc<MemoryEpisodeRepository>,
        out: W,
    ) -> Self {
        Self {
            player,
            clock,
            episodes,
            out,
        }
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn clock(&self) -> &MediaClock {
        &self.clock
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Final flush before exit
    pub async fn shutdown(&mut self) {
        self.player.shutdown().await;
    }

    /// Parse and execute one line; failures are printed, not returned
    pub async fn run_line(&mut self, line: &str) -> anyhow::Result<Flow> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(Flow::Continue);
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                writeln!(self.out, "error: {e}")?;
                return Ok(Flow::Continue);
            }
        };

        tracing::debug!(?command, "Executing");
        match self.execute(command).await {
            Ok(flow) => Ok(flow),
            Err(e) => {
                writeln!(self.out, "error: {e}")?;
                Ok(Flow::Continue)
            }
        }
    }

    /// Execute a command, then pump media events
    pub async fn execute(&mut self, command: Command) -> anyhow::Result<Flow> {
        let result = self.dispatch(command).await;
        self.pump_events().await?;
        result
    }

    async fn dispatch(&mut self, command: Command) -> anyhow::Result<Flow> {
        match command {
            Command::Help => writeln!(self.out, "{HELP}")?,
            Command::Quit => return Ok(Flow::Quit),
            Command::Status => self.print_status()?,
            Command::Episodes => self.print_episodes()?,
            Command::Queue => self.print_queue()?,
            Command::Play(None) => self.player.play().await?,
            Command::Play(Some(id)) => {
                let episode = self
                    .episodes
                    .get(&id)
                    .ok_or_else(|| anyhow::anyhow!("unknown episode: {id}"))?;
                self.player.play_episode(episode).await?;
            }
            Command::Pause => self.player.pause().await,
            Command::Toggle => self.player.toggle_play().await?,
            Command::Next => self.player.play_next().await?,
            Command::Previous => self.player.play_previous().await?,
            Command::Jump(index) => {
                if index >= self.player.queue().len() {
                    anyhow::bail!("queue has {} entries", self.player.queue().len());
                }
                self.player.play_queue_index(index).await?;
            }
            Command::Seek(SeekTarget::Seconds(seconds)) => self.player.seek(seconds),
            Command::Seek(SeekTarget::Percent(percent)) => {
                self.player.seek_to_percent(percent / 100.0);
            }
            Command::Forward(seconds) => self.player.skip_forward(seconds),
            Command::Back(seconds) => self.player.skip_backward(seconds),
            Command::Volume(volume) => self.player.set_volume(volume),
            Command::Rate(rate) => self.player.set_playback_rate(rate),
            Command::Mute => self.player.toggle_mute(),
            Command::Add(id) => self.player.add_to_queue_end(&id).await?,
            Command::PlayNext(id) => self.player.add_play_next(&id).await?,
            Command::Top(id) => self.player.move_to_queue_start(&id).await?,
            Command::Remove(id) => self.player.remove_from_queue(&id).await?,
            Command::Move(from, to) => self.player.reorder_queue(from, to).await?,
            Command::Clear => self.player.clear_queue().await?,
            Command::Mark(status, id) => match status {
                EpisodeStatus::Played => self.player.mark_played(&id).await?,
                EpisodeStatus::New => self.player.mark_new(&id).await?,
                EpisodeStatus::Archived => self.player.mark_archived(&id).await?,
                EpisodeStatus::InProgress => anyhow::bail!("cannot mark as in progress"),
            },
            Command::Tick(seconds) => self.clock.advance(seconds),
            Command::Fail(message) => self.clock.fail(message),
            Command::Reject => self.clock.reject_next_play(),
        }
        Ok(Flow::Continue)
    }

    /// Feed queued media events back into the player
    async fn pump_events(&mut self) -> anyhow::Result<()> {
        let mut handled = 0;
        loop {
            let events = self.clock.drain_events();
            if events.is_empty() {
                return Ok(());
            }
            for event in events {
                handled += 1;
                if handled > MAX_EVENTS_PER_COMMAND {
                    tracing::warn!("Media event limit reached, dropping the rest");
                    return Ok(());
                }
                if let Err(e) = self.player.handle_media_event(event).await {
                    writeln!(self.out, "error: {e}")?;
                }
            }
        }
    }

    fn print_status(&mut self) -> std::io::Result<()> {
        let snapshot = self.player.snapshot();
        let Some(episode) = snapshot.current_episode.as_ref() else {
            return writeln!(self.out, "idle");
        };

        let state = match snapshot.phase {
            PlaybackPhase::Idle => "idle",
            PlaybackPhase::Loading => "loading",
            PlaybackPhase::Paused => "paused",
            PlaybackPhase::Playing => "playing",
            PlaybackPhase::Ended => "ended",
            PlaybackPhase::Error => "error",
        };
        writeln!(
            self.out,
            "[{state}] {} - {}  {} / {}  vol {:.2}{}  rate {:.2}x  ({})",
            episode.id,
            episode.title,
            format_time(snapshot.position),
            format_time(snapshot.duration),
            snapshot.volume,
            if snapshot.is_muted { " (muted)" } else { "" },
            snapshot.playback_rate,
            episode.status,
        )?;
        if let Some(error) = &snapshot.error {
            writeln!(self.out, "error: {error}")?;
        }
        Ok(())
    }

    fn print_episodes(&mut self) -> std::io::Result<()> {
        for episode in self.episodes.all() {
            writeln!(
                self.out,
                "{:<12} {:<11} {:>8}  {}",
                episode.id.as_str(),
                episode.status.as_str(),
                format_time(episode.last_position_sec as f64),
                episode.title,
            )?;
        }
        Ok(())
    }

    fn print_queue(&mut self) -> std::io::Result<()> {
        let snapshot = self.player.queue_snapshot();
        if snapshot.entries.is_empty() {
            writeln!(self.out, "queue is empty")?;
        }
        for (index, entry) in snapshot.entries.iter().enumerate() {
            let marker = if snapshot.current_index == Some(index) { ">" } else { " " };
            writeln!(
                self.out,
                "{marker} {index:>2}  {:<12} {:>6}  {}",
                entry.episode_id.as_str(),
                entry.position,
                entry.episode.title,
            )?;
        }
        if let Some(error) = &snapshot.error {
            writeln!(self.out, "error: {error}")?;
        }
        Ok(())
    }
}
