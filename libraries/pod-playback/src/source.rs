//! Platform-agnostic live audio source
//!
//! Abstracts the audio element for different hosts (browser audio element,
//! native player, simulated clock in tests).

use async_trait::async_trait;

use crate::error::Result;

/// The single live audio source owned by the playback session
///
/// Implementors drive the actual audio output and report what happens through
/// [`MediaEvent`](crate::MediaEvent)s, which the host feeds back into the
/// player. No component other than the session touches it.
#[async_trait]
pub trait MediaElement: Send {
    /// Bind the source to a URL and seek to `start_position` once playable
    ///
    /// Readiness is reported later through `MediaEvent::CanPlay`.
    fn load(&mut self, url: &str, start_position: f64) -> Result<()>;

    /// Start playback
    ///
    /// May fail (autoplay restrictions, decode errors); failure is recoverable.
    async fn play(&mut self) -> Result<()>;

    /// Pause playback
    fn pause(&mut self);

    /// Jump to a position in seconds
    fn set_current_time(&mut self, position: f64);

    /// Output volume in `[0, 1]`
    fn set_volume(&mut self, volume: f64);

    /// Mute without touching the volume
    fn set_muted(&mut self, muted: bool);

    /// Playback speed multiplier
    fn set_playback_rate(&mut self, rate: f64);

    /// Detach the source and release its resources
    fn unload(&mut self);
}
