//! Dispatcher task — event, request and timer processing
//!
//! One task owns all state mutation. It waits on the inbound event
//! channel, the API request channel and (when armed) the audio path
//! recovery deadline, and runs each handler to completion against the
//! locked context before picking up the next item. Events are therefore
//! processed strictly in arrival order, and no handler ever observes
//! half-applied state.
//!
//! # Usage
//!
//! Spawn [`run`] as an Embassy task with your platform's SCO control and
//! audio hardware implementations:
//!
//! ```rust,no_run
//! use warbler::{HandsfreeOptions, processor};
//!
//! async fn bluetooth_task(
//!     sco: impl warbler::audio::ScoControl,
//!     audio: impl warbler::audio::AudioStream,
//! ) {
//!     processor::run(HandsfreeOptions::default(), sco, audio).await;
//! }
//! ```
//!
//! Stack callbacks feed the dispatcher through [`submit_event`] (async
//! contexts) or [`try_submit_event`] (plain callbacks); the platform
//! transport task drains host reports via
//! [`api::next_report`](crate::api::next_report).

use crate::audio::{AudioStream, ScoControl};
use crate::events::Event;
use crate::tracker::EventOutcome;
use crate::{
    EVENT_CHANNEL, HandsfreeContext, HandsfreeError, HandsfreeOptions, REPORT_CHANNEL,
    REQUEST_CHANNEL, RESPONSE_CHANNEL, Request, Response, handsfree_context, init_handsfree,
};
use embassy_futures::select::{Either, Either3, select, select3};
use embassy_time::Timer;

/// Queue an inbound event for the dispatcher
pub async fn submit_event(event: Event) {
    EVENT_CHANNEL.sender().send(event).await;
}

/// Queue an inbound event without waiting.
///
/// Intended for stack callbacks that cannot suspend.
///
/// # Errors
///
/// Returns [`HandsfreeError::QueueFull`] when the event channel is full;
/// the event is dropped in that case.
pub fn try_submit_event(event: Event) -> Result<(), HandsfreeError> {
    EVENT_CHANNEL
        .try_send(event)
        .map_err(|_| HandsfreeError::QueueFull)
}

impl HandsfreeContext {
    /// Process one API request against the current state
    pub(crate) fn process_request<S: ScoControl>(
        &mut self,
        request: Request,
        sco: &mut S,
    ) -> Response {
        match request {
            Request::ConnectAudio => {
                if self.registry.find_connected_mut().is_none() {
                    return Response::Error(HandsfreeError::InvalidState);
                }
                self.audio.request_initiator();
                Response::Ack
            }
            Request::DisconnectAudio => {
                let Some(session) = self.registry.find_connected_mut() else {
                    return Response::Error(HandsfreeError::InvalidState);
                };
                if !session.sco_index.is_valid() {
                    return Response::Error(HandsfreeError::InvalidState);
                }
                // Completion arrives as a hardware disconnection event,
                // which also re-arms acceptor mode.
                match sco.remove(session.sco_index) {
                    Ok(()) => Response::Ack,
                    Err(e) => Response::Error(e),
                }
            }
            Request::GetCallStatus => Response::CallStatus(self.call_status()),
            Request::GetSessionState(address) => {
                Response::SessionState(self.session_state(address))
            }
        }
    }
}

/// One unit of work for the dispatcher loop
enum Step {
    Event(Event),
    Request(Request),
}

async fn next_step(deadline: Option<embassy_time::Instant>) -> Step {
    let events = EVENT_CHANNEL.receiver();
    let requests = REQUEST_CHANNEL.receiver();
    match deadline {
        Some(at) => {
            match select3(events.receive(), requests.receive(), Timer::at(at)).await {
                Either3::First(event) => Step::Event(event),
                Either3::Second(request) => Step::Request(request),
                Either3::Third(()) => Step::Event(Event::RecoveryTimeout),
            }
        }
        None => match select(events.receive(), requests.receive()).await {
            Either::First(event) => Step::Event(event),
            Either::Second(request) => Step::Request(request),
        },
    }
}

async fn publish(outcome: EventOutcome) {
    if let Some(transition) = outcome.transition {
        defmt::debug!("[HFP] call transition: {}", transition);
    }
    if let Some(error) = outcome.error {
        defmt::warn!("[HFP] side effect failed: {}", error);
    }
    for report in outcome.reports {
        REPORT_CHANNEL.sender().send(report).await;
    }
}

/// Run the Handsfree dispatcher task
///
/// # Panics
///
/// This function will panic if context initialization fails, i.e. when
/// `init_handsfree(options)` reports that the context already exists.
pub async fn run<S: ScoControl, A: AudioStream>(
    options: HandsfreeOptions,
    mut sco: S,
    mut audio: A,
) -> ! {
    init_handsfree(options)
        .await
        .expect("Failed to initialize Handsfree context");

    loop {
        let deadline = match handsfree_context().await {
            Ok(context) => context.recovery_deadline(),
            Err(_) => None,
        };

        match next_step(deadline).await {
            Step::Event(event) => {
                defmt::debug!("[HFP] event: {:?}", defmt::Debug2Format(&event));
                let outcome = match handsfree_context().await {
                    Ok(mut context) => context.handle_event(event, &mut sco, &mut audio),
                    Err(e) => {
                        defmt::error!("[HFP] context not initialized: {}", e);
                        continue;
                    }
                };
                publish(outcome).await;
            }
            Step::Request(request) => {
                defmt::debug!("[HFP] request: {:?}", defmt::Debug2Format(&request));
                let response = match handsfree_context().await {
                    Ok(mut context) => context.process_request(request, &mut sco),
                    Err(e) => {
                        defmt::error!("[HFP] context not initialized: {}", e);
                        Response::Error(HandsfreeError::NotInitialized)
                    }
                };
                RESPONSE_CHANNEL.sender().send(response).await;
            }
        }
    }
}
