//! Audio path life cycle
//!
//! In the normal flow the AG initiates the SCO/eSCO link and this device
//! only listens: whenever a session becomes fully connected (and again
//! after every audio disconnection) a path reservation is created in
//! acceptor mode. The exception is the recovery rule: once a codec has
//! been selected for a locally requested audio connection, the AG gets a
//! fixed window to bring the link up. If the window elapses while a call
//! is active and no audio flows, the stale reservation is dropped and the
//! device creates the link itself, as initiator, with the current
//! parameter set. That rule bounds how long a user can sit in a call with
//! no audio.

use crate::audio::{
    AudioStream, Codec, EscoParams, ScoControl, StreamConfig, StreamId, scale_volume_to_hw,
};
use crate::constants::SCO_CONNECTION_WAIT_TIMEOUT_MS;
use crate::events::VolumeKind;
use crate::session::{ScoIndex, Session};
use crate::{HandsfreeError, Profile};
use embassy_time::{Duration, Instant};

/// Cancellable deadline for the audio path recovery rule.
///
/// Exactly one of these exists; every transition that satisfies the
/// timer's purpose (audio connected, peer connection request, full
/// disconnect) cancels it explicitly. Arming an armed timer restarts it.
#[derive(Debug, Default)]
pub struct RecoveryTimer {
    deadline: Option<Instant>,
}

impl RecoveryTimer {
    /// Start (or restart) the deadline
    pub fn arm(&mut self) {
        self.deadline =
            Some(Instant::now() + Duration::from_millis(SCO_CONNECTION_WAIT_TIMEOUT_MS));
    }

    /// Stop the deadline
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Whether the deadline is pending
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// The pending deadline, if armed
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// State machine for the voice audio path of the active session
#[derive(Debug)]
pub struct AudioPath {
    codec: Codec,
    wideband: bool,
    wideband_supported: bool,
    sco_connected: bool,
    pending_as_initiator: bool,
    recovery: RecoveryTimer,
    stream: Option<StreamId>,
    speaker_volume: u8,
    mic_volume: u8,
}

impl AudioPath {
    /// Create the controller with initial protocol-scale volume levels
    #[must_use]
    pub fn new(speaker_volume: u8, mic_volume: u8) -> Self {
        Self {
            codec: Codec::Narrowband,
            wideband: false,
            wideband_supported: false,
            sco_connected: false,
            pending_as_initiator: false,
            recovery: RecoveryTimer::default(),
            stream: None,
            speaker_volume,
            mic_volume,
        }
    }

    /// Currently selected codec
    #[must_use]
    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Whether the hardware path is currently up
    #[must_use]
    pub fn sco_connected(&self) -> bool {
        self.sco_connected
    }

    /// Whether the recovery deadline is pending
    #[must_use]
    pub fn recovery_armed(&self) -> bool {
        self.recovery.is_armed()
    }

    /// Pending recovery deadline for the dispatcher's select loop
    #[must_use]
    pub fn recovery_deadline(&self) -> Option<Instant> {
        self.recovery.deadline()
    }

    /// Whether a locally requested audio connection is waiting for codec
    /// selection
    #[must_use]
    pub fn pending_as_initiator(&self) -> bool {
        self.pending_as_initiator
    }

    /// eSCO parameter set for `profile` under the current codec eligibility
    #[must_use]
    pub fn params(&self, profile: Profile) -> EscoParams {
        EscoParams::for_profile(profile, self.wideband)
    }

    /// Hardware stream configuration under the current codec and levels
    #[must_use]
    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig::for_codec(
            self.codec,
            scale_volume_to_hw(self.speaker_volume),
            scale_volume_to_hw(self.mic_volume),
        )
    }

    /// Record whether codec negotiation is mutually supported.
    ///
    /// Until an explicit codec selection arrives this also sets the
    /// default eSCO wideband eligibility.
    pub fn set_wideband_supported(&mut self, supported: bool) {
        self.wideband_supported = supported;
        self.wideband = supported;
    }

    /// A local audio connection was requested.
    ///
    /// With codec negotiation available the AG is expected to send a codec
    /// selection first, and the recovery deadline starts there. Without
    /// it, no codec selection will ever come, so the deadline starts
    /// immediately.
    pub fn request_initiator(&mut self) {
        if self.wideband_supported {
            self.pending_as_initiator = true;
        } else {
            self.recovery.arm();
        }
    }

    /// Reserve the audio path in acceptor mode for `session`.
    ///
    /// # Errors
    /// Returns an error when the stack rejects the reservation; the
    /// session keeps an invalid index and stays usable for signaling.
    pub fn prepare_acceptor<S: ScoControl>(
        &mut self,
        session: &mut Session,
        sco: &mut S,
    ) -> Result<(), HandsfreeError> {
        match sco.create_as_acceptor() {
            Ok(index) => {
                session.sco_index = index;
                Ok(())
            }
            Err(e) => {
                session.sco_index = ScoIndex::INVALID;
                Err(e)
            }
        }
    }

    /// The AG selected the voice codec.
    ///
    /// Updates the eSCO wideband eligibility, starts the recovery deadline
    /// if a local audio request was pending, and pushes the new sample
    /// rate to an already open stream.
    ///
    /// # Errors
    /// Returns an error when reconfiguring an open hardware stream fails.
    pub fn on_codec_selected<A: AudioStream>(
        &mut self,
        codec: Codec,
        audio: &mut A,
    ) -> Result<(), HandsfreeError> {
        self.codec = codec;
        self.wideband = codec == Codec::Wideband;

        if self.pending_as_initiator {
            self.recovery.arm();
            self.pending_as_initiator = false;
        }

        if let Some(id) = self.stream {
            let config = self.stream_config();
            audio.set_parameters(id, &config)?;
        }
        Ok(())
    }

    /// The hardware path came up.
    ///
    /// Cancels the recovery deadline unconditionally, then opens,
    /// configures and starts the hardware stream.
    ///
    /// # Errors
    /// Returns an error when the hardware stream cannot be opened or
    /// configured; the path itself stays connected and signaling
    /// continues.
    pub fn on_sco_connected<A: AudioStream>(
        &mut self,
        session: &Session,
        audio: &mut A,
    ) -> Result<(), HandsfreeError> {
        self.sco_connected = true;
        self.recovery.cancel();

        let id = match self.stream {
            Some(id) => id,
            None => {
                let id = audio.open(session.profile)?;
                self.stream = Some(id);
                id
            }
        };
        let config = self.stream_config();
        audio.set_parameters(id, &config)?;
        audio.start(id)?;
        // Re-apply levels so volume stays consistent between call sessions.
        audio.set_speaker_volume(id, config.volume)?;
        audio.set_mic_gain(id, config.mic_gain)?;
        Ok(())
    }

    /// The hardware path went down.
    ///
    /// Stops and releases the hardware stream, then immediately re-arms
    /// acceptor mode so the next call can re-establish audio without any
    /// signaling round trip.
    ///
    /// # Errors
    /// Returns the first hardware or stack failure encountered; teardown
    /// still runs to completion.
    pub fn on_sco_disconnected<S: ScoControl, A: AudioStream>(
        &mut self,
        session: &mut Session,
        sco: &mut S,
        audio: &mut A,
    ) -> Result<(), HandsfreeError> {
        self.sco_connected = false;
        let stream_result = self.close_stream(audio);
        let acceptor_result = self.prepare_acceptor(session, sco);
        stream_result.and(acceptor_result)
    }

    /// The peer requests to establish the audio path.
    ///
    /// Cancels the recovery deadline and accepts with the parameter set
    /// matching the session's profile.
    ///
    /// # Errors
    /// Returns an error when the stack rejects the accept operation.
    pub fn on_connection_request<S: ScoControl>(
        &mut self,
        session: &mut Session,
        index: ScoIndex,
        sco: &mut S,
    ) -> Result<(), HandsfreeError> {
        self.recovery.cancel();
        let params = self.params(session.profile);
        sco.accept(index, &params)?;
        session.sco_index = index;
        Ok(())
    }

    /// The recovery deadline elapsed.
    ///
    /// If a call is active and no audio flows, the AG failed to initiate
    /// the path in time: drop the stale reservation and create the link
    /// as initiator. Retries are bounded only by call duration.
    ///
    /// # Errors
    /// Returns an error when the initiator request is rejected; the
    /// session is left without a reservation.
    pub fn on_recovery_timeout<S: ScoControl>(
        &mut self,
        session: &mut Session,
        call_active: bool,
        sco: &mut S,
    ) -> Result<(), HandsfreeError> {
        self.recovery.cancel();
        if !call_active || self.sco_connected {
            return Ok(());
        }

        if session.sco_index.is_valid() {
            // Unreserving may fail if the index already lapsed; the
            // initiator attempt below is what matters.
            sco.remove(session.sco_index).ok();
            session.sco_index = ScoIndex::INVALID;
        }
        let params = self.params(session.profile);
        let index = sco.create_as_initiator(session.peer_address, &params)?;
        session.sco_index = index;
        Ok(())
    }

    /// The AG changed a volume level.
    ///
    /// Stores the protocol-scale level and re-applies it to an open
    /// stream.
    ///
    /// # Errors
    /// Returns an error when the hardware rejects the level update.
    pub fn on_volume<A: AudioStream>(
        &mut self,
        kind: VolumeKind,
        level: u8,
        audio: &mut A,
    ) -> Result<(), HandsfreeError> {
        let level = level.min(crate::constants::PROTO_VOLUME_MAX);
        match kind {
            VolumeKind::Speaker => self.speaker_volume = level,
            VolumeKind::Microphone => self.mic_volume = level,
        }
        if let Some(id) = self.stream {
            match kind {
                VolumeKind::Speaker => audio.set_speaker_volume(id, scale_volume_to_hw(level))?,
                VolumeKind::Microphone => audio.set_mic_gain(id, scale_volume_to_hw(level))?,
            }
        }
        Ok(())
    }

    /// Tear down everything on full disconnection: deadline, hardware
    /// stream, and any active or pending path reservation.
    ///
    /// # Errors
    /// Returns the first failure encountered; teardown still runs to
    /// completion.
    pub fn remove_path<S: ScoControl, A: AudioStream>(
        &mut self,
        session: &mut Session,
        sco: &mut S,
        audio: &mut A,
    ) -> Result<(), HandsfreeError> {
        self.recovery.cancel();
        self.pending_as_initiator = false;
        self.sco_connected = false;

        let stream_result = self.close_stream(audio);
        let sco_result = if session.sco_index.is_valid() {
            let result = sco.remove(session.sco_index);
            session.sco_index = ScoIndex::INVALID;
            result
        } else {
            Ok(())
        };
        stream_result.and(sco_result)
    }

    /// Reset negotiation state to defaults, keeping configured levels
    pub fn reset(&mut self, speaker_volume: u8, mic_volume: u8) {
        *self = AudioPath::new(speaker_volume, mic_volume);
    }

    fn close_stream<A: AudioStream>(&mut self, audio: &mut A) -> Result<(), HandsfreeError> {
        // Closing an already-closed stream is a no-op.
        let Some(id) = self.stream.take() else {
            return Ok(());
        };
        let stopped = audio.stop(id);
        let closed = audio.close(id);
        stopped.and(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::{MockSco, MockStream};
    use crate::constants::{
        LATENCY_HANDSFREE_WIDEBAND_MS, LATENCY_HEADSET_MS, SAMPLE_RATE_WIDEBAND,
    };
    use crate::session::ConnectionState;

    fn connected_session() -> Session {
        Session {
            peer_address: crate::BluetoothAddress::new([0x20, 0x21, 0x22, 0x23, 0x24, 0x25]),
            connection_handle: Some(7),
            sco_index: ScoIndex::INVALID,
            profile: Profile::Handsfree,
            state: ConnectionState::Connected,
        }
    }

    #[test]
    fn codec_selection_arms_timer_only_when_requested() {
        let mut path = AudioPath::new(8, 8);
        let mut stream = MockStream::default();
        path.set_wideband_supported(true);

        path.on_codec_selected(Codec::Wideband, &mut stream).unwrap();
        assert!(!path.recovery_armed());

        path.request_initiator();
        assert!(path.pending_as_initiator());
        path.on_codec_selected(Codec::Wideband, &mut stream).unwrap();
        assert!(path.recovery_armed());
        assert!(!path.pending_as_initiator());
    }

    #[test]
    fn local_request_without_codec_negotiation_arms_immediately() {
        let mut path = AudioPath::new(8, 8);
        path.set_wideband_supported(false);
        path.request_initiator();
        assert!(path.recovery_armed());
        assert!(!path.pending_as_initiator());
    }

    #[test]
    fn recovery_timeout_reverses_roles_exactly_once() {
        let mut path = AudioPath::new(8, 8);
        let mut sco = MockSco::default();
        let mut stream = MockStream::default();
        let mut session = connected_session();

        path.set_wideband_supported(true);
        path.prepare_acceptor(&mut session, &mut sco).unwrap();
        let reserved = session.sco_index;
        path.request_initiator();
        path.on_codec_selected(Codec::Wideband, &mut stream).unwrap();
        assert!(path.recovery_armed());

        path.on_recovery_timeout(&mut session, true, &mut sco).unwrap();

        assert_eq!(sco.removed.as_slice(), &[reserved]);
        assert_eq!(sco.initiator_calls.len(), 1);
        let (peer, params) = &sco.initiator_calls[0];
        assert_eq!(*peer, session.peer_address);
        assert_eq!(params.max_latency_ms, LATENCY_HANDSFREE_WIDEBAND_MS);
        assert!(params.wideband);
        assert!(session.sco_index.is_valid());
        assert!(!path.recovery_armed());
    }

    #[test]
    fn recovery_timeout_without_active_call_does_nothing() {
        let mut path = AudioPath::new(8, 8);
        let mut sco = MockSco::default();
        let mut session = connected_session();
        session.sco_index = ScoIndex(2);

        path.on_recovery_timeout(&mut session, false, &mut sco).unwrap();

        assert!(sco.removed.is_empty());
        assert!(sco.initiator_calls.is_empty());
        assert_eq!(session.sco_index, ScoIndex(2));
    }

    #[test]
    fn connection_request_preempts_recovery() {
        let mut path = AudioPath::new(8, 8);
        let mut sco = MockSco::default();
        let mut stream = MockStream::default();
        let mut session = connected_session();

        path.set_wideband_supported(true);
        path.request_initiator();
        path.on_codec_selected(Codec::Wideband, &mut stream).unwrap();
        assert!(path.recovery_armed());

        path.on_connection_request(&mut session, ScoIndex(3), &mut sco)
            .unwrap();

        assert!(!path.recovery_armed());
        assert_eq!(session.sco_index, ScoIndex(3));
        assert_eq!(sco.accepted.len(), 1);
        assert!(sco.accepted[0].1.wideband);
        assert!(sco.initiator_calls.is_empty());
    }

    #[test]
    fn headset_request_accepts_with_headset_params() {
        let mut path = AudioPath::new(8, 8);
        let mut sco = MockSco::default();
        let mut session = connected_session();
        session.profile = Profile::Headset;

        path.set_wideband_supported(true);
        path.on_connection_request(&mut session, ScoIndex(1), &mut sco)
            .unwrap();

        let (_, params) = &sco.accepted[0];
        assert_eq!(params.max_latency_ms, LATENCY_HEADSET_MS);
        assert!(!params.wideband);
    }

    #[test]
    fn sco_connected_starts_hardware_and_disarms() {
        let mut path = AudioPath::new(15, 0);
        let mut stream = MockStream::default();
        let session = connected_session();

        path.set_wideband_supported(true);
        path.request_initiator();
        path.on_codec_selected(Codec::Wideband, &mut stream).unwrap();

        path.on_sco_connected(&session, &mut stream).unwrap();

        assert!(path.sco_connected());
        assert!(!path.recovery_armed());
        assert_eq!(stream.opened, 1);
        assert_eq!(stream.started, 1);
        let config = stream.configs.last().unwrap();
        assert_eq!(config.sample_rate, SAMPLE_RATE_WIDEBAND);
        assert_eq!(config.volume, crate::constants::HW_VOLUME_MAX);
        assert_eq!(config.mic_gain, 0);
    }

    #[test]
    fn sco_disconnect_closes_stream_and_rearms_acceptor() {
        let mut path = AudioPath::new(8, 8);
        let mut sco = MockSco::default();
        let mut stream = MockStream::default();
        let mut session = connected_session();

        path.on_sco_connected(&session, &mut stream).unwrap();
        path.on_sco_disconnected(&mut session, &mut sco, &mut stream)
            .unwrap();

        assert!(!path.sco_connected());
        assert_eq!(stream.stopped, 1);
        assert_eq!(stream.closed, 1);
        assert_eq!(sco.acceptor_calls, 1);
        assert!(session.sco_index.is_valid());

        // A second disconnect with no open stream stays a hardware no-op.
        path.on_sco_disconnected(&mut session, &mut sco, &mut stream)
            .unwrap();
        assert_eq!(stream.stopped, 1);
        assert_eq!(stream.closed, 1);
    }

    #[test]
    fn hardware_open_failure_is_not_fatal() {
        let mut path = AudioPath::new(8, 8);
        let mut stream = MockStream {
            fail_open: true,
            ..MockStream::default()
        };
        let session = connected_session();

        let result = path.on_sco_connected(&session, &mut stream);
        assert_eq!(result, Err(HandsfreeError::AudioStreamFailed));
        // The link itself is up; only the hardware leg is missing.
        assert!(path.sco_connected());
        assert!(!path.recovery_armed());
    }

    #[test]
    fn volume_updates_reach_an_open_stream() {
        let mut path = AudioPath::new(8, 8);
        let mut stream = MockStream::default();
        let session = connected_session();

        path.on_volume(VolumeKind::Speaker, 15, &mut stream).unwrap();
        // No stream open yet, level only stored.
        assert!(stream.speaker_levels.is_empty());

        path.on_sco_connected(&session, &mut stream).unwrap();
        assert_eq!(
            stream.configs.last().unwrap().volume,
            crate::constants::HW_VOLUME_MAX
        );

        path.on_volume(VolumeKind::Microphone, 0, &mut stream).unwrap();
        assert_eq!(stream.mic_levels.last(), Some(&0));
    }

    #[test]
    fn remove_path_clears_everything() {
        let mut path = AudioPath::new(8, 8);
        let mut sco = MockSco::default();
        let mut stream = MockStream::default();
        let mut session = connected_session();

        path.prepare_acceptor(&mut session, &mut sco).unwrap();
        let reserved = session.sco_index;
        path.on_sco_connected(&session, &mut stream).unwrap();
        path.set_wideband_supported(true);
        path.request_initiator();

        path.remove_path(&mut session, &mut sco, &mut stream).unwrap();

        assert!(!path.sco_connected());
        assert!(!path.recovery_armed());
        assert!(!path.pending_as_initiator());
        assert_eq!(session.sco_index, ScoIndex::INVALID);
        assert_eq!(sco.removed.as_slice(), &[reserved]);
        assert_eq!(stream.closed, 1);
    }
}
