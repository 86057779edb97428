//! Warbler Constants
//!
//! This module contains all the constants used throughout the Warbler
//! library: table capacities, HFP feature bits, indicator identifiers,
//! eSCO link parameters and the volume scales shared between the protocol
//! and the audio hardware.

/// Maximum number of concurrently tracked remote sessions (one per exposed
/// profile server: Hands-Free, and optionally Headset)
pub const MAX_SESSIONS: usize = 2;

/// Depth of the inbound event channel
pub const MAX_EVENTS: usize = 8;

/// Depth of the outbound host report channel
pub const MAX_REPORTS: usize = 8;

/// Maximum number of host reports a single event can produce (a call-state
/// update can change call, call-held and call-setup at once)
pub const MAX_REPORTS_PER_EVENT: usize = 4;

/// Maximum encoded size of one host report, including the leading
/// connection handle
pub const MAX_REPORT_SIZE: usize = 300;

/// Maximum stored length of a caller/subscriber number
pub const MAX_NUMBER_LENGTH: usize = 32;

/// `BD_ADDR` length in bytes
pub const BD_ADDR_LENGTH: usize = 6;

/// Highest volume/mic-gain level on the HFP protocol scale (AT+VGS/AT+VGM)
pub const PROTO_VOLUME_MAX: u8 = 15;

/// Highest volume/mic-gain level understood by the audio hardware
pub const HW_VOLUME_MAX: u8 = 10;

/// Default speaker and microphone level at initialization
pub const DEFAULT_VOLUME: u8 = 8;

/// How long to wait for the AG to establish the audio path before taking
/// over as initiator, in milliseconds
pub const SCO_CONNECTION_WAIT_TIMEOUT_MS: u64 = 2000;

/// Wideband (mSBC) hardware sample rate in Hz
pub const SAMPLE_RATE_WIDEBAND: u32 = 16_000;

/// Narrowband (CVSD) hardware sample rate in Hz
pub const SAMPLE_RATE_NARROWBAND: u32 = 8_000;

/// Voice samples are always mono
pub const AUDIO_CHANNELS: u8 = 1;

/// Voice sample width in bits
pub const AUDIO_BITS_PER_SAMPLE: u8 = 16;

/// eSCO packet type bit: EV3
pub const ESCO_PKT_EV3: u16 = 0x0008;

/// eSCO packet type bit: 3-EV3 may not be used
pub const ESCO_PKT_NO_3_EV3: u16 = 0x0080;

/// eSCO packet type bit: 2-EV5 may not be used
pub const ESCO_PKT_NO_2_EV5: u16 = 0x0100;

/// eSCO packet type bit: 3-EV5 may not be used
pub const ESCO_PKT_NO_3_EV5: u16 = 0x0200;

/// Packet types offered on every voice link (EV3 plus the 2-EV3 fallback,
/// EV5 variants excluded)
pub const VOICE_PACKET_TYPES: u16 =
    ESCO_PKT_EV3 | ESCO_PKT_NO_3_EV3 | ESCO_PKT_NO_2_EV5 | ESCO_PKT_NO_3_EV5;

/// eSCO maximum latency for a wideband Hands-Free link (T2), milliseconds
pub const LATENCY_HANDSFREE_WIDEBAND_MS: u16 = 13;

/// eSCO maximum latency for a narrowband Hands-Free link (S4), milliseconds
pub const LATENCY_HANDSFREE_NARROWBAND_MS: u16 = 12;

/// eSCO maximum latency for a Headset link (S3), milliseconds
pub const LATENCY_HEADSET_MS: u16 = 10;

/// Retransmission effort: at least one retransmission, optimize for power
pub const RETRANS_EFFORT_POWER: u8 = 0x01;

/// CIEV indicator id: network service availability
pub const IND_SERVICE: u8 = 1;

/// CIEV indicator id: call active
pub const IND_CALL: u8 = 2;

/// CIEV indicator id: call setup progress
pub const IND_CALL_SETUP: u8 = 3;

/// CIEV indicator id: call held
pub const IND_CALL_HELD: u8 = 4;

/// CIEV indicator id: signal strength
pub const IND_SIGNAL: u8 = 5;

/// CIEV indicator id: roaming
pub const IND_ROAM: u8 = 6;

/// CIEV indicator id: battery charge
pub const IND_BATTERY: u8 = 7;

/// AG feature bit: three-way calling
pub const AG_FEATURE_THREE_WAY_CALLING: u32 = 0x0000_0001;

/// AG feature bit: in-band ring tone capability
pub const AG_FEATURE_INBAND_RING_TONE: u32 = 0x0000_0008;

/// AG feature bit: ability to reject a call
pub const AG_FEATURE_REJECT_CALL: u32 = 0x0000_0020;

/// AG feature bit: enhanced call status
pub const AG_FEATURE_ENHANCED_CALL_STATUS: u32 = 0x0000_0040;

/// AG feature bit: extended error result codes
pub const AG_FEATURE_EXTENDED_ERROR_CODES: u32 = 0x0000_0100;

/// AG feature bit: codec negotiation
pub const AG_FEATURE_CODEC_NEGOTIATION: u32 = 0x0000_0200;

/// AG feature bit: HF indicators
pub const AG_FEATURE_HF_INDICATORS: u32 = 0x0000_0400;

/// AG feature bit: eSCO S4 settings supported
pub const AG_FEATURE_ESCO_S4: u32 = 0x0000_0800;

/// HF feature bit: echo cancellation / noise reduction
pub const HF_FEATURE_ECNR: u32 = 0x0000_0001;

/// HF feature bit: three-way calling
pub const HF_FEATURE_THREE_WAY_CALLING: u32 = 0x0000_0002;

/// HF feature bit: caller-id presentation (CLIP)
pub const HF_FEATURE_CLIP: u32 = 0x0000_0004;

/// HF feature bit: voice recognition activation
pub const HF_FEATURE_VOICE_RECOGNITION: u32 = 0x0000_0008;

/// HF feature bit: remote volume control
pub const HF_FEATURE_REMOTE_VOLUME_CONTROL: u32 = 0x0000_0010;

/// HF feature bit: enhanced call status
pub const HF_FEATURE_ENHANCED_CALL_STATUS: u32 = 0x0000_0020;

/// HF feature bit: enhanced call control
pub const HF_FEATURE_ENHANCED_CALL_CONTROL: u32 = 0x0000_0040;

/// HF feature bit: codec negotiation
pub const HF_FEATURE_CODEC_NEGOTIATION: u32 = 0x0000_0080;

/// HF feature bit: HF indicators
pub const HF_FEATURE_HF_INDICATORS: u32 = 0x0000_0100;

/// HF feature bit: eSCO S4 settings supported
pub const HF_FEATURE_ESCO_S4: u32 = 0x0000_0200;

/// HFP codec id for CVSD (narrowband)
pub const CODEC_ID_CVSD: u8 = 1;

/// HFP codec id for mSBC (wideband)
pub const CODEC_ID_MSBC: u8 = 2;

/// Link key length in bytes
pub const LINK_KEY_LENGTH: usize = 16;
