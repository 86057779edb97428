//! Normalized event model
//!
//! Inbound facts arrive from two independent sources: the profile layer of
//! the Bluetooth stack (AG signaling already decoded from AT responses)
//! and the SCO/eSCO management layer (hardware audio path). Both are
//! expressed here as plain data enums so the dispatcher can consume them
//! from a single channel in strict arrival order.

use crate::audio::Codec;
use crate::constants::MAX_NUMBER_LENGTH;
use crate::{BluetoothAddress, Profile};
use heapless::String;

/// Call setup progress as reported by the AG (CIEV `callsetup` values)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, defmt::Format)]
pub enum CallSetup {
    /// No call setup in progress
    #[default]
    Idle,
    /// Incoming call is ringing
    IncomingRinging,
    /// Outgoing call is being dialed
    OutgoingDialing,
    /// Outgoing call is alerting the remote party
    OutgoingAlerting,
}

impl CallSetup {
    /// Protocol value of this setup state
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            CallSetup::Idle => 0,
            CallSetup::IncomingRinging => 1,
            CallSetup::OutgoingDialing => 2,
            CallSetup::OutgoingAlerting => 3,
        }
    }
}

/// Which volume the AG is adjusting
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum VolumeKind {
    /// Speaker volume (AT+VGS)
    Speaker,
    /// Microphone gain (AT+VGM)
    Microphone,
}

/// One entry of the AG's current call list (`+CLCC` response)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveCall {
    /// Call index on the AG (1-based)
    pub index: u8,
    /// Direction: 0 outgoing, 1 incoming
    pub direction: u8,
    /// Call status (active, held, dialing, ...)
    pub status: u8,
    /// Call mode (voice, data, fax)
    pub mode: u8,
    /// Whether the call is part of a conference
    pub is_conference: bool,
    /// Remote party number, empty if not reported
    pub number: String<MAX_NUMBER_LENGTH>,
    /// Number type octet, zero if no number was reported
    pub number_type: u8,
}

/// Normalized AG signaling events, one per notification the profile layer
/// decodes from the service-level connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HfpEvent {
    /// Service-level connection to the AG has been established
    SlcConnected {
        /// Remote AG address
        address: BluetoothAddress,
    },
    /// Connection is fully up and bound to a profile server
    Connected {
        /// Remote AG address
        address: BluetoothAddress,
        /// RFCOMM connection handle used for host reporting
        handle: u16,
        /// Profile the remote connected to
        profile: Profile,
    },
    /// Connection to the AG has been torn down
    Disconnected {
        /// Remote AG address
        address: BluetoothAddress,
    },
    /// AG supported-features bitmap received during SLC establishment
    AgFeatures {
        /// Connection handle
        handle: u16,
        /// AG feature bits
        features: u32,
    },
    /// Network service availability indicator
    ServiceState {
        /// Connection handle
        handle: u16,
        /// 0 = no service, 1 = service present
        value: u8,
    },
    /// Combined call indicator update (call, call-held, call-setup)
    CallState {
        /// Connection handle
        handle: u16,
        /// At least one active call exists
        active: bool,
        /// At least one held call exists
        held: bool,
        /// Call setup progress
        setup: CallSetup,
    },
    /// Signal strength indicator (0..5)
    SignalStrength {
        /// Connection handle
        handle: u16,
        /// Reported bars
        value: u8,
    },
    /// Roaming indicator
    Roaming {
        /// Connection handle
        handle: u16,
        /// 0 = home network, 1 = roaming
        value: u8,
    },
    /// Battery charge indicator (0..5)
    BatteryLevel {
        /// Connection handle
        handle: u16,
        /// Reported charge level
        value: u8,
    },
    /// RING alert from the AG
    Ring {
        /// Connection handle
        handle: u16,
    },
    /// AG switched in-band ring tones on or off (+BSIR)
    InbandRing {
        /// Connection handle
        handle: u16,
        /// Whether the AG now sends the ring tone in-band
        enabled: bool,
    },
    /// AT command completed successfully (OK)
    CommandOk {
        /// Connection handle
        handle: u16,
    },
    /// AT command failed (ERROR)
    CommandError {
        /// Connection handle
        handle: u16,
    },
    /// Extended error result code (+CME ERROR)
    ExtendedError {
        /// Connection handle
        handle: u16,
        /// CME error code
        code: u16,
    },
    /// Caller line identification (+CLIP)
    CallerId {
        /// Connection handle
        handle: u16,
        /// Number type octet
        number_type: u8,
        /// Calling party number
        number: String<MAX_NUMBER_LENGTH>,
    },
    /// Voice-tag phone number response (+BINP)
    VoiceTagNumber {
        /// Connection handle
        handle: u16,
        /// Number type octet
        number_type: u8,
        /// Phone number attached to the voice tag
        number: String<MAX_NUMBER_LENGTH>,
    },
    /// AG changed a local volume (+VGS / +VGM)
    Volume {
        /// Connection handle
        handle: u16,
        /// Speaker or microphone
        kind: VolumeKind,
        /// Level on the 0..15 protocol scale
        level: u8,
    },
    /// AG selected the voice codec (+BCS)
    CodecSelected {
        /// Connection handle
        handle: u16,
        /// Negotiated codec
        codec: Codec,
    },
    /// One current-call list entry (+CLCC)
    ActiveCall {
        /// Connection handle
        handle: u16,
        /// The reported call entry
        call: ActiveCall,
    },
    /// Subscriber number information (+CNUM)
    SubscriberNumber {
        /// Connection handle
        handle: u16,
        /// Own number as reported by the AG
        number: String<MAX_NUMBER_LENGTH>,
    },
    /// HF indicator state change from the AG (+BIND)
    BatteryIndicator {
        /// Connection handle
        handle: u16,
        /// HF indicator id
        indicator: u8,
        /// New indicator value
        value: u8,
    },
}

/// Hardware audio path (SCO/eSCO) events from the stack's link manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum ScoEvent {
    /// The audio path is up
    Connected {
        /// Index of the connected path
        index: crate::session::ScoIndex,
    },
    /// The audio path went down
    Disconnected {
        /// Index of the removed path
        index: crate::session::ScoIndex,
    },
    /// The peer asks to establish the audio path
    ConnectionRequest {
        /// Index the stack reserved for the requested path
        index: crate::session::ScoIndex,
    },
}

/// A single inbound event for the dispatcher, tagged by source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// AG signaling event
    Hfp(HfpEvent),
    /// Hardware audio path event
    Sco(ScoEvent),
    /// The audio path recovery deadline elapsed
    RecoveryTimeout,
}
