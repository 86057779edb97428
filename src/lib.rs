#![no_std]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![allow(dead_code, clippy::unused_async, clippy::too_many_lines)]

mod address;
pub mod api;
pub mod audio;
pub mod constants;
pub mod events;
pub mod keystore;
pub mod processor;
pub mod report;
pub mod session;
pub mod tracker;

use crate::audio::AudioPath;
use crate::constants::{
    DEFAULT_VOLUME, HF_FEATURE_CLIP, HF_FEATURE_CODEC_NEGOTIATION,
    HF_FEATURE_ENHANCED_CALL_STATUS, HF_FEATURE_ESCO_S4, HF_FEATURE_HF_INDICATORS,
    HF_FEATURE_REMOTE_VOLUME_CONTROL, HF_FEATURE_THREE_WAY_CALLING, MAX_EVENTS, MAX_REPORTS,
};
use crate::events::Event;
use crate::report::HostReport;
use crate::session::{ConnectionState, SessionRegistry};
use crate::tracker::{CallStatus, IndicatorState};
use embassy_sync::channel::Channel;
use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex,
    mutex::{MappedMutexGuard, Mutex, MutexGuard},
};

pub use address::BluetoothAddress;

pub(crate) static EVENT_CHANNEL: Channel<CriticalSectionRawMutex, Event, MAX_EVENTS> =
    Channel::new();

pub(crate) static REQUEST_CHANNEL: Channel<CriticalSectionRawMutex, Request, MAX_EVENTS> =
    Channel::new();

pub(crate) static RESPONSE_CHANNEL: Channel<CriticalSectionRawMutex, Response, MAX_EVENTS> =
    Channel::new();

pub(crate) static REPORT_CHANNEL: Channel<CriticalSectionRawMutex, HostReport, MAX_REPORTS> =
    Channel::new();

/// Global `HandsfreeContext`, initialized by the client at runtime
pub(crate) static HANDSFREE_CONTEXT: Mutex<CriticalSectionRawMutex, Option<HandsfreeContext>> =
    Mutex::new(None);

/// Initialize the global `HandsfreeContext` with the given options.
///
/// This function must be called before using any API functions or spawning
/// the processor task. It sets up the global context with the specified
/// configuration options.
///
/// # Errors
///
/// Returns an error if the context has already been initialized.
pub async fn init_handsfree(options: HandsfreeOptions) -> Result<(), HandsfreeError> {
    let mut guard = HANDSFREE_CONTEXT.lock().await;
    if guard.is_some() {
        return Err(HandsfreeError::AlreadyInitialized);
    }
    *guard = Some(HandsfreeContext::new(options));
    Ok(())
}

/// Get a locked reference to the global `HandsfreeContext`.
///
/// # Errors
///
/// Returns an error if the context has not been initialized.
///
/// # Panics
///
/// Panics if the mutex guard cannot be mapped (never happens in practice).
///
/// # Note
///
/// This function is primarily intended for internal use by the processor
/// task. Applications should use the functions in the `api` module instead.
pub async fn handsfree_context<'a>()
-> Result<MappedMutexGuard<'a, CriticalSectionRawMutex, HandsfreeContext>, HandsfreeError> {
    let guard = HANDSFREE_CONTEXT.lock().await;
    if guard.is_none() {
        return Err(HandsfreeError::NotInitialized);
    }
    Ok(MutexGuard::map(guard, |opt| opt.as_mut().unwrap()))
}

/// Profile server a remote device can bind to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, defmt::Format)]
pub enum Profile {
    /// Hands-Free Profile (HFP)
    #[default]
    Handsfree,
    /// Headset Profile (HSP)
    Headset,
}

impl Profile {
    /// Numeric profile id used in host reports
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Profile::Handsfree => 1,
            Profile::Headset => 2,
        }
    }
}

/// Handsfree-related errors with detailed error information
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum HandsfreeError {
    /// The stack rejected an audio path request
    ScoRequestFailed,
    /// The audio hardware rejected an operation
    AudioStreamFailed,
    /// No session tracks the given address or handle
    SessionNotFound,
    /// The session table has no free slot
    SessionTableFull,
    /// No stored link key for the given address
    KeyNotFound,
    /// The persistent store has no free slot
    StoreFull,
    /// Pairing was requested while not allowed
    PairingNotAllowed,
    /// Invalid parameter provided (e.g., malformed address)
    InvalidParameter,
    /// Operation not valid in the current state
    InvalidState,
    /// The context has not been initialized yet
    NotInitialized,
    /// The context has already been initialized
    AlreadyInitialized,
    /// An event channel is full
    QueueFull,
}

/// Options for configuring the Handsfree device
///
/// # Examples
///
/// ```rust
/// use warbler::HandsfreeOptions;
///
/// // Default: Hands-Free only, mid-scale volumes
/// let options = HandsfreeOptions::default();
///
/// // Quieter start, Headset server exposed as well
/// let custom = HandsfreeOptions {
///     speaker_volume: 4,
///     headset_server: true,
///     ..HandsfreeOptions::default()
/// };
/// ```
#[derive(Debug, Clone, Copy)]
pub struct HandsfreeOptions {
    /// Local HF supported-features bitmap advertised to the AG
    pub feature_mask: u32,
    /// Initial speaker volume on the 0..15 protocol scale
    pub speaker_volume: u8,
    /// Initial microphone gain on the 0..15 protocol scale
    pub mic_volume: u8,
    /// Whether a Headset (HSP) server is exposed next to Hands-Free
    pub headset_server: bool,
}

impl Default for HandsfreeOptions {
    fn default() -> Self {
        Self {
            feature_mask: HF_FEATURE_THREE_WAY_CALLING
                | HF_FEATURE_CLIP
                | HF_FEATURE_REMOTE_VOLUME_CONTROL
                | HF_FEATURE_ENHANCED_CALL_STATUS
                | HF_FEATURE_CODEC_NEGOTIATION
                | HF_FEATURE_HF_INDICATORS
                | HF_FEATURE_ESCO_S4,
            speaker_volume: DEFAULT_VOLUME,
            mic_volume: DEFAULT_VOLUME,
            headset_server: false,
        }
    }
}

/// Shared Handsfree state: session table, call status, indicator history
/// and the audio path controller.
///
/// All mutation happens from the single dispatcher task, one event at a
/// time; handlers run to completion, so no locking is needed beyond the
/// outer context mutex.
#[derive(Debug)]
pub struct HandsfreeContext {
    /// Per-remote-device session records
    registry: SessionRegistry,
    /// Call indicators as last reported by the AG
    call: CallStatus,
    /// Last-known values of the simple CIEV indicators
    indicators: IndicatorState,
    /// Voice audio path controller
    audio: AudioPath,
    /// Configuration options
    options: HandsfreeOptions,
}

impl HandsfreeContext {
    /// Create a new context with the given options
    #[must_use]
    pub fn new(options: HandsfreeOptions) -> Self {
        Self {
            registry: SessionRegistry::new(),
            call: CallStatus::default(),
            indicators: IndicatorState::default(),
            audio: AudioPath::new(options.speaker_volume, options.mic_volume),
            options,
        }
    }

    /// Get a reference to the options
    #[must_use]
    pub fn options(&self) -> &HandsfreeOptions {
        &self.options
    }

    /// Current call status
    #[must_use]
    pub fn call_status(&self) -> CallStatus {
        self.call
    }

    /// Connection state of the session tracking `address`, if any
    #[must_use]
    pub fn session_state(&self, address: BluetoothAddress) -> Option<ConnectionState> {
        self.registry.find_by_address(address).map(|s| s.state)
    }

    /// Pending audio path recovery deadline, if armed
    #[must_use]
    pub fn recovery_deadline(&self) -> Option<embassy_time::Instant> {
        self.audio.recovery_deadline()
    }
}

impl Default for HandsfreeContext {
    fn default() -> Self {
        Self::new(HandsfreeOptions::default())
    }
}

/// API requests sent to the dispatcher task
#[derive(Debug, Clone)]
pub(crate) enum Request {
    /// Establish the voice audio path from our side
    ConnectAudio,
    /// Tear the voice audio path down
    DisconnectAudio,
    /// Get the current call status
    GetCallStatus,
    /// Get the connection state for an address
    GetSessionState(BluetoothAddress),
}

/// API responses sent back from the dispatcher task
#[derive(Debug, Clone)]
pub(crate) enum Response {
    /// The request was carried out
    Ack,
    /// Current call status
    CallStatus(CallStatus),
    /// Connection state for the requested address
    SessionState(Option<ConnectionState>),
    /// Error occurred
    Error(HandsfreeError),
}
