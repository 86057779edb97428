//! Voice audio path management
//!
//! This module owns everything about the synchronous voice link: codec
//! selection, eSCO link parameter sets, the mapping from HFP volume levels
//! to hardware levels, and the audio path life cycle itself.
//!
//! ## Architecture
//!
//! - **`AudioPath`**: state machine deciding when to accept, create or
//!   remove the SCO/eSCO link, including the recovery timer that turns the
//!   device into the link initiator when the AG never establishes audio
//! - **`ScoControl`**: operations the underlying stack exposes for the
//!   audio path
//! - **`AudioStream`**: platform audio hardware (sample rate, levels)

pub mod path;
pub mod stream;

pub use path::*;
pub use stream::*;

use crate::constants::{
    HW_VOLUME_MAX, LATENCY_HANDSFREE_NARROWBAND_MS, LATENCY_HANDSFREE_WIDEBAND_MS,
    LATENCY_HEADSET_MS, PROTO_VOLUME_MAX, RETRANS_EFFORT_POWER, SAMPLE_RATE_NARROWBAND,
    SAMPLE_RATE_WIDEBAND, VOICE_PACKET_TYPES,
};
use crate::session::ScoIndex;
use crate::{BluetoothAddress, HandsfreeError, Profile};

/// Voice codec negotiated with the AG
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, defmt::Format)]
pub enum Codec {
    /// CVSD, 8 kHz
    #[default]
    Narrowband,
    /// mSBC, 16 kHz
    Wideband,
}

impl Codec {
    /// Hardware sample rate for this codec
    #[must_use]
    pub const fn sample_rate(self) -> u32 {
        match self {
            Codec::Narrowband => SAMPLE_RATE_NARROWBAND,
            Codec::Wideband => SAMPLE_RATE_WIDEBAND,
        }
    }

    /// HFP codec id (+BCS value) for this codec
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Codec::Narrowband => crate::constants::CODEC_ID_CVSD,
            Codec::Wideband => crate::constants::CODEC_ID_MSBC,
        }
    }
}

/// eSCO link parameter set offered when accepting or creating a voice link
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct EscoParams {
    /// Maximum latency in milliseconds
    pub max_latency_ms: u16,
    /// Allowed packet types bitmask
    pub packet_types: u16,
    /// Retransmission effort
    pub retransmission_effort: u8,
    /// Whether the link carries wideband (mSBC) audio
    pub wideband: bool,
}

impl EscoParams {
    /// Parameter set for `profile`, given current wideband eligibility.
    ///
    /// Selection depends on nothing else: Headset links never use
    /// wideband, Hands-Free links pick the T2 or S4 latency according to
    /// the codec eligibility.
    #[must_use]
    pub const fn for_profile(profile: Profile, wideband: bool) -> Self {
        match profile {
            Profile::Handsfree => {
                if wideband {
                    Self {
                        max_latency_ms: LATENCY_HANDSFREE_WIDEBAND_MS,
                        packet_types: VOICE_PACKET_TYPES,
                        retransmission_effort: RETRANS_EFFORT_POWER,
                        wideband: true,
                    }
                } else {
                    Self {
                        max_latency_ms: LATENCY_HANDSFREE_NARROWBAND_MS,
                        packet_types: VOICE_PACKET_TYPES,
                        retransmission_effort: RETRANS_EFFORT_POWER,
                        wideband: false,
                    }
                }
            }
            Profile::Headset => Self {
                max_latency_ms: LATENCY_HEADSET_MS,
                packet_types: VOICE_PACKET_TYPES,
                retransmission_effort: RETRANS_EFFORT_POWER,
                wideband: false,
            },
        }
    }
}

/// SCO/eSCO path operations exposed by the underlying stack
///
/// # Errors
///
/// Operations fail when the controller rejects the request or no resources
/// are left; failures are logged by the caller and never fatal.
pub trait ScoControl {
    /// Reserve a path and listen for a peer-initiated connection
    fn create_as_acceptor(&mut self) -> Result<ScoIndex, HandsfreeError>;

    /// Actively create the path to `peer` with the given parameters
    fn create_as_initiator(
        &mut self,
        peer: BluetoothAddress,
        params: &EscoParams,
    ) -> Result<ScoIndex, HandsfreeError>;

    /// Accept a pending peer-initiated connection on `index`
    fn accept(&mut self, index: ScoIndex, params: &EscoParams) -> Result<(), HandsfreeError>;

    /// Tear down or unreserve the path `index`
    fn remove(&mut self, index: ScoIndex) -> Result<(), HandsfreeError>;
}

/// Map an HFP volume level (0..=15) to the hardware scale (0..=`hw_max`).
///
/// Linear scaling with remainder-based rounding: the result is bumped by
/// one when the division remainder reaches `hw_max`. Deterministic,
/// monotonic, and exact at both endpoints.
#[must_use]
pub fn scale_volume(level: u8, hw_max: u8) -> u8 {
    let level = level.min(PROTO_VOLUME_MAX);
    let scaled = u16::from(level) * u16::from(hw_max);
    let mut hw_level = scaled / u16::from(PROTO_VOLUME_MAX);
    if scaled % u16::from(PROTO_VOLUME_MAX) >= u16::from(hw_max) {
        hw_level += 1;
    }
    // scaled / 15 never exceeds hw_max + 1, which fits u8.
    #[allow(clippy::cast_possible_truncation)]
    let hw_level = hw_level as u8;
    hw_level
}

/// Shorthand for [`scale_volume`] with the default hardware maximum
#[must_use]
pub fn scale_volume_to_hw(level: u8) -> u8 {
    scale_volume(level, HW_VOLUME_MAX)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::HW_VOLUME_MAX;

    #[test]
    fn volume_scaling_endpoints_and_monotonicity() {
        assert_eq!(scale_volume(0, HW_VOLUME_MAX), 0);
        assert_eq!(scale_volume(PROTO_VOLUME_MAX, HW_VOLUME_MAX), HW_VOLUME_MAX);

        let mut previous = 0;
        for level in 0..=PROTO_VOLUME_MAX {
            let scaled = scale_volume(level, HW_VOLUME_MAX);
            assert!(scaled >= previous, "not monotonic at level {level}");
            assert!(scaled <= HW_VOLUME_MAX);
            previous = scaled;
        }
    }

    #[test]
    fn volume_scaling_is_deterministic() {
        for level in 0..=PROTO_VOLUME_MAX {
            assert_eq!(
                scale_volume(level, HW_VOLUME_MAX),
                scale_volume(level, HW_VOLUME_MAX)
            );
        }
        // Identity when both scales match.
        for level in 0..=PROTO_VOLUME_MAX {
            assert_eq!(scale_volume(level, PROTO_VOLUME_MAX), level);
        }
    }

    #[test]
    fn volume_scaling_clamps_out_of_range_input() {
        assert_eq!(
            scale_volume(200, HW_VOLUME_MAX),
            scale_volume(PROTO_VOLUME_MAX, HW_VOLUME_MAX)
        );
    }

    #[test]
    fn esco_params_follow_profile_and_codec() {
        let wide = EscoParams::for_profile(Profile::Handsfree, true);
        assert_eq!(wide.max_latency_ms, LATENCY_HANDSFREE_WIDEBAND_MS);
        assert!(wide.wideband);

        let narrow = EscoParams::for_profile(Profile::Handsfree, false);
        assert_eq!(narrow.max_latency_ms, LATENCY_HANDSFREE_NARROWBAND_MS);
        assert!(!narrow.wideband);

        // Headset links never carry wideband audio.
        let headset = EscoParams::for_profile(Profile::Headset, true);
        assert_eq!(headset.max_latency_ms, LATENCY_HEADSET_MS);
        assert!(!headset.wideband);

        for params in [wide, narrow, headset] {
            assert_eq!(params.packet_types, VOICE_PACKET_TYPES);
            assert_eq!(params.retransmission_effort, RETRANS_EFFORT_POWER);
        }
    }

    #[test]
    fn codec_sample_rates() {
        assert_eq!(Codec::Narrowband.sample_rate(), SAMPLE_RATE_NARROWBAND);
        assert_eq!(Codec::Wideband.sample_rate(), SAMPLE_RATE_WIDEBAND);
        assert_eq!(Codec::Narrowband.id(), 1);
        assert_eq!(Codec::Wideband.id(), 2);
    }
}
