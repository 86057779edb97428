//! Hardware audio stream capability
//!
//! The voice path terminates in platform audio hardware (codec DSP, PCM
//! interface). Warbler drives it through this trait and never assumes an
//! operation succeeds: every failure is reported upward and treated as
//! non-fatal, leaving the device usable for signaling.

use crate::HandsfreeError;
use crate::Profile;
use crate::audio::Codec;
use crate::constants::{AUDIO_BITS_PER_SAMPLE, AUDIO_CHANNELS};

/// Opaque handle of an open hardware stream
pub type StreamId = u16;

/// Parameters applied to an open stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct StreamConfig {
    /// Sample rate in Hz, derived from the negotiated codec
    pub sample_rate: u32,
    /// Channel count (voice is mono)
    pub channels: u8,
    /// Sample width in bits
    pub bits_per_sample: u8,
    /// Speaker level on the hardware scale
    pub volume: u8,
    /// Microphone gain on the hardware scale
    pub mic_gain: u8,
}

impl StreamConfig {
    /// Configuration for `codec` with the given hardware-scale levels
    #[must_use]
    pub fn for_codec(codec: Codec, volume: u8, mic_gain: u8) -> Self {
        Self {
            sample_rate: codec.sample_rate(),
            channels: AUDIO_CHANNELS,
            bits_per_sample: AUDIO_BITS_PER_SAMPLE,
            volume,
            mic_gain,
        }
    }
}

/// Platform audio hardware operations
///
/// # Errors
///
/// Every operation may fail on resource exhaustion or hardware faults;
/// callers log the failure and continue.
pub trait AudioStream {
    /// Open a stream for the given profile, returning its handle
    fn open(&mut self, profile: Profile) -> Result<StreamId, HandsfreeError>;

    /// Apply sample rate, format and levels to an open stream
    fn set_parameters(&mut self, id: StreamId, config: &StreamConfig)
    -> Result<(), HandsfreeError>;

    /// Set the speaker level (hardware scale) on an open stream
    fn set_speaker_volume(&mut self, id: StreamId, level: u8) -> Result<(), HandsfreeError>;

    /// Set the microphone gain (hardware scale) on an open stream
    fn set_mic_gain(&mut self, id: StreamId, level: u8) -> Result<(), HandsfreeError>;

    /// Start playback and capture
    fn start(&mut self, id: StreamId) -> Result<(), HandsfreeError>;

    /// Stop playback and capture
    fn stop(&mut self, id: StreamId) -> Result<(), HandsfreeError>;

    /// Release the stream
    fn close(&mut self, id: StreamId) -> Result<(), HandsfreeError>;
}
