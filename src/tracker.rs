//! Device state tracking
//!
//! Single source of truth for connection, call and indicator state. Every
//! inbound event goes through [`HandsfreeContext::handle_event`], which
//! runs to completion and returns an [`EventOutcome`]: the host reports to
//! emit, an optional diagnostic call transition for the log, and the first
//! side-effect failure encountered. Handlers never log and never panic;
//! events for untracked handles fall through as no-ops.

use crate::audio::{AudioStream, ScoControl};
use crate::constants::{
    AG_FEATURE_CODEC_NEGOTIATION, AG_FEATURE_INBAND_RING_TONE, HF_FEATURE_CODEC_NEGOTIATION,
    IND_BATTERY, IND_CALL, IND_CALL_HELD, IND_CALL_SETUP, IND_ROAM, IND_SERVICE, IND_SIGNAL,
    MAX_REPORTS_PER_EVENT,
};
use crate::events::{CallSetup, Event, HfpEvent, ScoEvent};
use crate::report::{
    EVENT_AT_BCS, EVENT_AT_BINP, EVENT_AT_CLIP, EVENT_AT_CMEE, EVENT_AT_CNUM, EVENT_AT_ERROR,
    EVENT_AT_OK, EVENT_AT_RING, EVENT_AT_VGM, EVENT_AT_VGS, HostReport, at_status_report,
    at_text_report, audio_close_report, audio_open_report, battery_indicator_report,
    call_list_report, close_report, connected_report, indicator_report, open_report,
    profile_report,
};
use crate::session::ConnectionState;
use crate::{HandsfreeContext, HandsfreeError};
use heapless::Vec;

/// Call indicators as last reported by the AG.
///
/// Only AG indicator events write these fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, defmt::Format)]
pub struct CallStatus {
    /// At least one active call exists
    pub call_active: bool,
    /// At least one held call exists
    pub call_held: bool,
    /// Call setup progress
    pub call_setup: CallSetup,
    /// Whether the AG sends ring tones in-band
    pub inband_ring_enabled: bool,
}

/// Last-known values of the simple CIEV indicators, used to suppress
/// redundant host reports. All values start at the protocol default of
/// zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndicatorState {
    service: u8,
    signal: u8,
    roam: u8,
    battery: u8,
}

impl IndicatorState {
    /// Store `value` for `indicator`; returns whether the value changed
    pub fn update(&mut self, indicator: u8, value: u8) -> bool {
        let slot = match indicator {
            IND_SERVICE => &mut self.service,
            IND_SIGNAL => &mut self.signal,
            IND_ROAM => &mut self.roam,
            IND_BATTERY => &mut self.battery,
            _ => return false,
        };
        if *slot == value {
            return false;
        }
        *slot = value;
        true
    }
}

/// Diagnostic classification of a call-setup update.
///
/// Purely observational: the dispatcher logs it and nothing else depends
/// on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum CallTransition {
    /// An incoming call started ringing
    Incoming,
    /// An outgoing call is being dialed
    OutgoingDialing,
    /// An outgoing call is alerting the remote party
    OutgoingAlerting,
    /// Call setup finished with an active call
    Established,
    /// Call setup collapsed without producing a call
    SetupAbandoned,
    /// The active call ended
    Terminated,
}

/// Result of dispatching one event
#[derive(Debug, Default)]
pub struct EventOutcome {
    /// Host reports to emit, in order
    pub reports: Vec<HostReport, MAX_REPORTS_PER_EVENT>,
    /// Diagnostic call transition, if the event was a call-state update
    pub transition: Option<CallTransition>,
    /// First side-effect failure encountered while handling the event
    pub error: Option<HandsfreeError>,
}

impl EventOutcome {
    fn report(&mut self, report: HostReport) {
        self.reports.push(report).ok();
    }

    fn record(&mut self, result: Result<(), HandsfreeError>) {
        if let Err(e) = result {
            self.error.get_or_insert(e);
        }
    }
}

/// Classify a call-state update against the previous status.
///
/// The stored status is updated unconditionally after classification, so
/// no other behavior depends on which branch is taken here.
fn classify(previous: &CallStatus, active: bool, setup: CallSetup) -> Option<CallTransition> {
    match setup {
        CallSetup::IncomingRinging => Some(CallTransition::Incoming),
        CallSetup::OutgoingDialing => Some(CallTransition::OutgoingDialing),
        CallSetup::OutgoingAlerting => Some(CallTransition::OutgoingAlerting),
        CallSetup::Idle => {
            if active {
                Some(CallTransition::Established)
            } else if previous.call_setup != CallSetup::Idle {
                Some(CallTransition::SetupAbandoned)
            } else if previous.call_active {
                Some(CallTransition::Terminated)
            } else {
                None
            }
        }
    }
}

impl HandsfreeContext {
    /// Dispatch one inbound event against the current state.
    ///
    /// Runs to completion and returns the reports to emit; state mutation,
    /// audio path side effects and report generation all happen here, in
    /// arrival order.
    pub fn handle_event<S: ScoControl, A: AudioStream>(
        &mut self,
        event: Event,
        sco: &mut S,
        audio: &mut A,
    ) -> EventOutcome {
        match event {
            Event::Hfp(event) => self.handle_hfp_event(event, sco, audio),
            Event::Sco(event) => self.handle_sco_event(event, sco, audio),
            Event::RecoveryTimeout => self.handle_recovery_timeout(sco),
        }
    }

    fn handle_hfp_event<S: ScoControl, A: AudioStream>(
        &mut self,
        event: HfpEvent,
        sco: &mut S,
        audio: &mut A,
    ) -> EventOutcome {
        let mut outcome = EventOutcome::default();
        match event {
            HfpEvent::SlcConnected { address } => match self.registry.get_or_create(address) {
                Some(session) => {
                    if session.state == ConnectionState::Disconnected {
                        session.state = ConnectionState::ServiceLevelConnected;
                    }
                }
                None => outcome.error = Some(HandsfreeError::SessionTableFull),
            },
            HfpEvent::Connected {
                address,
                handle,
                profile,
            } => match self.registry.get_or_create(address) {
                Some(session) => {
                    session.state = ConnectionState::Connected;
                    session.connection_handle = Some(handle);
                    session.profile = profile;
                    outcome.report(open_report(handle, address, 0));
                    outcome.report(profile_report(handle, profile));
                    // The AG is expected to bring up audio; listen for it.
                    outcome.record(self.audio.prepare_acceptor(session, sco));
                }
                None => outcome.error = Some(HandsfreeError::SessionTableFull),
            },
            HfpEvent::Disconnected { address } => {
                if let Some(session) = self.registry.find_by_address_mut(address) {
                    outcome.record(self.audio.remove_path(session, sco, audio));
                    let handle = session.connection_handle.unwrap_or(0);
                    session.clear();
                    outcome.report(close_report(handle));
                    // Call and negotiation state are process-wide; a full
                    // disconnection returns them to defaults.
                    self.call = CallStatus::default();
                    self.indicators = IndicatorState::default();
                    self.audio
                        .reset(self.options.speaker_volume, self.options.mic_volume);
                }
            }
            HfpEvent::AgFeatures { handle, features } => {
                if self.registry.find_by_handle(handle).is_some() {
                    self.call.inband_ring_enabled = features & AG_FEATURE_INBAND_RING_TONE != 0;
                    let wideband = features & AG_FEATURE_CODEC_NEGOTIATION != 0
                        && self.options.feature_mask & HF_FEATURE_CODEC_NEGOTIATION != 0;
                    self.audio.set_wideband_supported(wideband);
                    outcome.report(connected_report(handle, features));
                }
            }
            HfpEvent::ServiceState { handle, value } => {
                self.indicator_changed(handle, IND_SERVICE, value, &mut outcome);
            }
            HfpEvent::SignalStrength { handle, value } => {
                self.indicator_changed(handle, IND_SIGNAL, value, &mut outcome);
            }
            HfpEvent::Roaming { handle, value } => {
                self.indicator_changed(handle, IND_ROAM, value, &mut outcome);
            }
            HfpEvent::BatteryLevel { handle, value } => {
                self.indicator_changed(handle, IND_BATTERY, value, &mut outcome);
            }
            HfpEvent::CallState {
                handle,
                active,
                held,
                setup,
            } => {
                if self.registry.find_by_handle(handle).is_some() {
                    if self.call.call_active != active {
                        outcome.report(indicator_report(handle, IND_CALL, u8::from(active)));
                    }
                    if self.call.call_held != held {
                        outcome.report(indicator_report(handle, IND_CALL_HELD, u8::from(held)));
                    }
                    if self.call.call_setup != setup {
                        outcome.report(indicator_report(handle, IND_CALL_SETUP, setup.as_u8()));
                    }
                    outcome.transition = classify(&self.call, active, setup);
                    self.call.call_active = active;
                    self.call.call_held = held;
                    self.call.call_setup = setup;
                }
            }
            HfpEvent::Ring { handle } => {
                if self.registry.find_by_handle(handle).is_some() {
                    outcome.report(at_status_report(EVENT_AT_RING, handle, 0));
                }
            }
            HfpEvent::InbandRing { handle, enabled } => {
                if self.registry.find_by_handle(handle).is_some() {
                    self.call.inband_ring_enabled = enabled;
                }
            }
            HfpEvent::CommandOk { handle } => {
                if self.registry.find_by_handle(handle).is_some() {
                    outcome.report(at_status_report(EVENT_AT_OK, handle, 0));
                }
            }
            HfpEvent::CommandError { handle } => {
                if self.registry.find_by_handle(handle).is_some() {
                    outcome.report(at_status_report(EVENT_AT_ERROR, handle, 0));
                }
            }
            HfpEvent::ExtendedError { handle, code } => {
                if self.registry.find_by_handle(handle).is_some() {
                    outcome.report(at_status_report(EVENT_AT_CMEE, handle, code));
                }
            }
            HfpEvent::CallerId {
                handle,
                number_type,
                number,
            } => {
                if self.registry.find_by_handle(handle).is_some() {
                    outcome.report(at_text_report(
                        EVENT_AT_CLIP,
                        handle,
                        u16::from(number_type),
                        number.as_str(),
                    ));
                }
            }
            HfpEvent::VoiceTagNumber {
                handle,
                number_type,
                number,
            } => {
                if self.registry.find_by_handle(handle).is_some() {
                    outcome.report(at_text_report(
                        EVENT_AT_BINP,
                        handle,
                        u16::from(number_type),
                        number.as_str(),
                    ));
                }
            }
            HfpEvent::Volume {
                handle,
                kind,
                level,
            } => {
                if self.registry.find_by_handle(handle).is_some() {
                    outcome.record(self.audio.on_volume(kind, level, audio));
                    let event_id = match kind {
                        crate::events::VolumeKind::Speaker => EVENT_AT_VGS,
                        crate::events::VolumeKind::Microphone => EVENT_AT_VGM,
                    };
                    outcome.report(at_status_report(event_id, handle, u16::from(level)));
                }
            }
            HfpEvent::CodecSelected { handle, codec } => {
                if self.registry.find_by_handle(handle).is_some() {
                    outcome.record(self.audio.on_codec_selected(codec, audio));
                    outcome.report(at_status_report(
                        EVENT_AT_BCS,
                        handle,
                        u16::from(codec.id()),
                    ));
                }
            }
            HfpEvent::ActiveCall { handle, call } => {
                if self.registry.find_by_handle(handle).is_some() {
                    outcome.report(call_list_report(handle, &call));
                }
            }
            HfpEvent::SubscriberNumber { handle, number } => {
                if self.registry.find_by_handle(handle).is_some() {
                    outcome.report(at_text_report(EVENT_AT_CNUM, handle, 0, number.as_str()));
                }
            }
            HfpEvent::BatteryIndicator {
                handle,
                indicator,
                value,
            } => {
                if self.registry.find_by_handle(handle).is_some() {
                    outcome.report(battery_indicator_report(handle, indicator, value));
                }
            }
        }
        outcome
    }

    fn handle_sco_event<S: ScoControl, A: AudioStream>(
        &mut self,
        event: ScoEvent,
        sco: &mut S,
        audio: &mut A,
    ) -> EventOutcome {
        let mut outcome = EventOutcome::default();
        match event {
            ScoEvent::Connected { index } => {
                if let Some(session) = self.registry.find_by_sco_index_mut(index) {
                    outcome.record(self.audio.on_sco_connected(session, audio));
                    let handle = session.connection_handle.unwrap_or(0);
                    outcome.report(audio_open_report(handle));
                }
            }
            ScoEvent::Disconnected { index } => {
                if let Some(session) = self.registry.find_by_sco_index_mut(index) {
                    let handle = session.connection_handle.unwrap_or(0);
                    outcome.record(self.audio.on_sco_disconnected(session, sco, audio));
                    outcome.report(audio_close_report(handle));
                }
            }
            ScoEvent::ConnectionRequest { index } => {
                // The request normally lands on the acceptor reservation;
                // fall back to the connected session if the reservation
                // was lost earlier. Two lookups keep the borrow checker
                // satisfied.
                let session = if self.registry.find_by_sco_index_mut(index).is_some() {
                    self.registry.find_by_sco_index_mut(index)
                } else {
                    self.registry.find_connected_mut()
                };
                if let Some(session) = session {
                    outcome.record(self.audio.on_connection_request(session, index, sco));
                }
            }
        }
        outcome
    }

    fn handle_recovery_timeout<S: ScoControl>(&mut self, sco: &mut S) -> EventOutcome {
        let mut outcome = EventOutcome::default();
        if let Some(session) = self.registry.find_connected_mut() {
            outcome.record(
                self.audio
                    .on_recovery_timeout(session, self.call.call_active, sco),
            );
        }
        outcome
    }

    fn indicator_changed(
        &mut self,
        handle: u16,
        indicator: u8,
        value: u8,
        outcome: &mut EventOutcome,
    ) {
        if self.registry.find_by_handle(handle).is_none() {
            return;
        }
        if self.indicators.update(indicator, value) {
            outcome.report(indicator_report(handle, indicator, value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Codec;
    use crate::audio::testing::{MockSco, MockStream};
    use crate::constants::AG_FEATURE_ESCO_S4;
    use crate::report::{
        EVENT_AT_CIEV, EVENT_AUDIO_OPEN, EVENT_CLOSE, EVENT_CONNECTED, EVENT_OPEN,
        EVENT_PROFILE_TYPE,
    };
    use crate::session::ScoIndex;
    use crate::{BluetoothAddress, HandsfreeContext, HandsfreeOptions, Profile};

    const HANDLE: u16 = 7;

    fn peer() -> BluetoothAddress {
        BluetoothAddress::new([0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5])
    }

    struct Fixture {
        context: HandsfreeContext,
        sco: MockSco,
        stream: MockStream,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                context: HandsfreeContext::new(HandsfreeOptions::default()),
                sco: MockSco::default(),
                stream: MockStream::default(),
            }
        }

        fn dispatch(&mut self, event: Event) -> EventOutcome {
            self.context
                .handle_event(event, &mut self.sco, &mut self.stream)
        }

        fn connect(&mut self) {
            self.dispatch(Event::Hfp(HfpEvent::SlcConnected { address: peer() }));
            self.dispatch(Event::Hfp(HfpEvent::Connected {
                address: peer(),
                handle: HANDLE,
                profile: Profile::Handsfree,
            }));
        }

        fn call_state(&mut self, active: bool, held: bool, setup: CallSetup) -> EventOutcome {
            self.dispatch(Event::Hfp(HfpEvent::CallState {
                handle: HANDLE,
                active,
                held,
                setup,
            }))
        }
    }

    #[test]
    fn connect_emits_open_and_profile_and_arms_acceptor() {
        let mut fixture = Fixture::new();
        fixture.connect();

        assert_eq!(
            fixture.context.session_state(peer()),
            Some(ConnectionState::Connected)
        );
        assert_eq!(fixture.sco.acceptor_calls, 1);

        let session = fixture.context.registry.find_by_handle(HANDLE).unwrap();
        assert!(session.sco_index.is_valid());
    }

    #[test]
    fn disconnect_is_idempotent_and_emits_one_close() {
        let mut fixture = Fixture::new();
        fixture.connect();

        let first = fixture.dispatch(Event::Hfp(HfpEvent::Disconnected { address: peer() }));
        let close_count = first
            .reports
            .iter()
            .filter(|r| r.event_id == EVENT_CLOSE)
            .count();
        assert_eq!(close_count, 1);
        assert_eq!(fixture.context.session_state(peer()), None);
        // The pending acceptor reservation was released.
        assert_eq!(fixture.sco.removed.len(), 1);

        let second = fixture.dispatch(Event::Hfp(HfpEvent::Disconnected { address: peer() }));
        assert!(second.reports.is_empty());
        assert_eq!(fixture.sco.removed.len(), 1);
    }

    #[test]
    fn disconnect_resets_call_state() {
        let mut fixture = Fixture::new();
        fixture.connect();
        fixture.call_state(true, false, CallSetup::Idle);
        assert!(fixture.context.call_status().call_active);

        fixture.dispatch(Event::Hfp(HfpEvent::Disconnected { address: peer() }));
        assert!(!fixture.context.call_status().call_active);
        assert_eq!(fixture.context.call_status().call_setup, CallSetup::Idle);
    }

    #[test]
    fn repeated_indicator_is_suppressed() {
        let mut fixture = Fixture::new();
        fixture.connect();

        let first = fixture.dispatch(Event::Hfp(HfpEvent::ServiceState {
            handle: HANDLE,
            value: 1,
        }));
        assert_eq!(first.reports.len(), 1);
        assert_eq!(first.reports[0].event_id, EVENT_AT_CIEV);

        let repeat = fixture.dispatch(Event::Hfp(HfpEvent::ServiceState {
            handle: HANDLE,
            value: 1,
        }));
        assert!(repeat.reports.is_empty());

        let change = fixture.dispatch(Event::Hfp(HfpEvent::ServiceState {
            handle: HANDLE,
            value: 0,
        }));
        assert_eq!(change.reports.len(), 1);
    }

    #[test]
    fn call_state_reports_only_changed_indicators() {
        let mut fixture = Fixture::new();
        fixture.connect();

        let ringing = fixture.call_state(false, false, CallSetup::IncomingRinging);
        assert_eq!(ringing.reports.len(), 1);
        assert_eq!(ringing.transition, Some(CallTransition::Incoming));

        let answered = fixture.call_state(true, false, CallSetup::Idle);
        // Both call and call-setup changed.
        assert_eq!(answered.reports.len(), 2);
        assert_eq!(answered.transition, Some(CallTransition::Established));

        let unchanged = fixture.call_state(true, false, CallSetup::Idle);
        assert!(unchanged.reports.is_empty());
        assert_eq!(unchanged.transition, Some(CallTransition::Established));
    }

    #[test]
    fn call_classification_covers_teardown_paths() {
        let mut fixture = Fixture::new();
        fixture.connect();

        fixture.call_state(false, false, CallSetup::OutgoingDialing);
        let abandoned = fixture.call_state(false, false, CallSetup::Idle);
        assert_eq!(abandoned.transition, Some(CallTransition::SetupAbandoned));

        fixture.call_state(true, false, CallSetup::Idle);
        let terminated = fixture.call_state(false, false, CallSetup::Idle);
        assert_eq!(terminated.transition, Some(CallTransition::Terminated));

        let quiet = fixture.call_state(false, false, CallSetup::Idle);
        assert_eq!(quiet.transition, None);
    }

    #[test]
    fn events_for_unknown_handles_are_no_ops() {
        let mut fixture = Fixture::new();
        fixture.connect();

        let outcome = fixture.dispatch(Event::Hfp(HfpEvent::ServiceState {
            handle: 99,
            value: 1,
        }));
        assert!(outcome.reports.is_empty());

        let outcome = fixture.dispatch(Event::Hfp(HfpEvent::CallState {
            handle: 99,
            active: true,
            held: false,
            setup: CallSetup::Idle,
        }));
        assert!(outcome.reports.is_empty());
        assert!(!fixture.context.call_status().call_active);

        let outcome = fixture.dispatch(Event::Hfp(HfpEvent::CodecSelected {
            handle: 99,
            codec: Codec::Wideband,
        }));
        assert!(outcome.reports.is_empty());
        assert_eq!(fixture.context.audio.codec(), Codec::Narrowband);
    }

    #[test]
    fn ag_features_configure_inband_ring_and_wideband() {
        let mut fixture = Fixture::new();
        fixture.connect();

        let features = AG_FEATURE_INBAND_RING_TONE | AG_FEATURE_CODEC_NEGOTIATION;
        let outcome = fixture.dispatch(Event::Hfp(HfpEvent::AgFeatures {
            handle: HANDLE,
            features,
        }));
        assert_eq!(outcome.reports.len(), 1);
        assert_eq!(outcome.reports[0].event_id, EVENT_CONNECTED);
        assert!(fixture.context.call_status().inband_ring_enabled);

        // Without the AG codec-negotiation bit the default set stays
        // narrowband.
        let outcome = fixture.dispatch(Event::Hfp(HfpEvent::AgFeatures {
            handle: HANDLE,
            features: AG_FEATURE_ESCO_S4,
        }));
        assert_eq!(outcome.reports.len(), 1);
        assert!(!fixture.context.call_status().inband_ring_enabled);
        assert!(!fixture.context.audio.params(Profile::Handsfree).wideband);
    }

    #[test]
    fn sco_events_for_unknown_index_are_no_ops() {
        let mut fixture = Fixture::new();
        fixture.connect();

        let outcome = fixture.dispatch(Event::Sco(ScoEvent::Connected {
            index: ScoIndex(42),
        }));
        assert!(outcome.reports.is_empty());
        assert!(!fixture.context.audio.sco_connected());
    }

    #[test]
    fn end_to_end_connection_and_audio_setup() {
        let mut fixture = Fixture::new();

        fixture.dispatch(Event::Hfp(HfpEvent::SlcConnected { address: peer() }));
        assert_eq!(
            fixture.context.session_state(peer()),
            Some(ConnectionState::ServiceLevelConnected)
        );

        let connected = fixture.dispatch(Event::Hfp(HfpEvent::Connected {
            address: peer(),
            handle: HANDLE,
            profile: Profile::Handsfree,
        }));
        let ids: heapless::Vec<u16, 4> = connected.reports.iter().map(|r| r.event_id).collect();
        assert_eq!(ids.as_slice(), &[EVENT_OPEN, EVENT_PROFILE_TYPE]);

        fixture.dispatch(Event::Hfp(HfpEvent::AgFeatures {
            handle: HANDLE,
            features: AG_FEATURE_CODEC_NEGOTIATION,
        }));

        let codec = fixture.dispatch(Event::Hfp(HfpEvent::CodecSelected {
            handle: HANDLE,
            codec: Codec::Wideband,
        }));
        assert_eq!(codec.reports.len(), 1);
        assert_eq!(codec.reports[0].event_id, EVENT_AT_BCS);
        assert_eq!(fixture.context.audio.codec(), Codec::Wideband);

        // The acceptor reservation got index 0; the AG requests path 3.
        fixture.dispatch(Event::Sco(ScoEvent::ConnectionRequest {
            index: ScoIndex(3),
        }));
        let session = fixture.context.registry.find_by_handle(HANDLE).unwrap();
        assert_eq!(session.sco_index, ScoIndex(3));
        assert!(!fixture.context.audio.recovery_armed());
        let (_, params) = &fixture.sco.accepted[0];
        assert!(params.wideband);

        let audio_up = fixture.dispatch(Event::Sco(ScoEvent::Connected {
            index: ScoIndex(3),
        }));
        assert_eq!(audio_up.reports.len(), 1);
        assert_eq!(audio_up.reports[0].event_id, EVENT_AUDIO_OPEN);
        assert!(fixture.context.audio.sco_connected());
        assert_eq!(fixture.stream.started, 1);
    }

    #[test]
    fn sco_disconnect_reports_and_rearms() {
        let mut fixture = Fixture::new();
        fixture.connect();
        let reserved = fixture
            .context
            .registry
            .find_by_handle(HANDLE)
            .unwrap()
            .sco_index;

        fixture.dispatch(Event::Sco(ScoEvent::Connected { index: reserved }));
        let outcome = fixture.dispatch(Event::Sco(ScoEvent::Disconnected { index: reserved }));
        assert_eq!(outcome.reports.len(), 1);
        assert_eq!(fixture.sco.acceptor_calls, 2);
        assert!(!fixture.context.audio.sco_connected());
    }

    #[test]
    fn recovery_timeout_initiates_when_call_is_active() {
        let mut fixture = Fixture::new();
        fixture.connect();
        fixture.dispatch(Event::Hfp(HfpEvent::AgFeatures {
            handle: HANDLE,
            features: AG_FEATURE_CODEC_NEGOTIATION,
        }));
        fixture.call_state(true, false, CallSetup::Idle);

        fixture.context.audio.request_initiator();
        fixture.dispatch(Event::Hfp(HfpEvent::CodecSelected {
            handle: HANDLE,
            codec: Codec::Wideband,
        }));
        assert!(fixture.context.audio.recovery_armed());

        fixture.dispatch(Event::RecoveryTimeout);
        assert_eq!(fixture.sco.initiator_calls.len(), 1);
        assert!(!fixture.context.audio.recovery_armed());
    }
}
