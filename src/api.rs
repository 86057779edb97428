//! Warbler API Functions
//!
//! This module provides the public API functions for interacting with the
//! dispatcher task. These functions use static channels to communicate
//! with the task and are designed to be called from application code: a
//! host command handler, a button task, or any other place that needs to
//! poke the Handsfree state machine.
//!
//! # Usage
//!
//! ```rust,no_run
//! use warbler::api::{connect_audio, call_status};
//!
//! # async fn example() -> Result<(), warbler::HandsfreeError> {
//! // Bring up the voice path for the active call
//! connect_audio().await?;
//!
//! // Inspect what the AG last told us
//! let status = call_status().await?;
//! # Ok(())
//! # }
//! ```

use crate::report::HostReport;
use crate::session::ConnectionState;
use crate::tracker::CallStatus;
use crate::{
    BluetoothAddress, HandsfreeError, REPORT_CHANNEL, REQUEST_CHANNEL, RESPONSE_CHANNEL, Request,
    Response,
};

/// Request the voice audio path for the active session.
///
/// The AG is still expected to initiate the link; if it does not do so
/// within the recovery window, the device creates the link itself.
///
/// # Errors
///
/// Returns an error if no session is fully connected or the response is
/// unexpected.
pub async fn connect_audio() -> Result<(), HandsfreeError> {
    REQUEST_CHANNEL.sender().send(Request::ConnectAudio).await;
    match RESPONSE_CHANNEL.receiver().receive().await {
        Response::Ack => Ok(()),
        Response::Error(e) => Err(e),
        _ => Err(HandsfreeError::InvalidState),
    }
}

/// Tear down the voice audio path of the active session.
///
/// # Errors
///
/// Returns an error if no audio path exists or the stack rejects the
/// removal.
pub async fn disconnect_audio() -> Result<(), HandsfreeError> {
    REQUEST_CHANNEL
        .sender()
        .send(Request::DisconnectAudio)
        .await;
    match RESPONSE_CHANNEL.receiver().receive().await {
        Response::Ack => Ok(()),
        Response::Error(e) => Err(e),
        _ => Err(HandsfreeError::InvalidState),
    }
}

/// Get the call status as last reported by the AG.
///
/// # Errors
///
/// Returns an error if the dispatcher is not running or the response is
/// unexpected.
pub async fn call_status() -> Result<CallStatus, HandsfreeError> {
    REQUEST_CHANNEL.sender().send(Request::GetCallStatus).await;
    match RESPONSE_CHANNEL.receiver().receive().await {
        Response::CallStatus(status) => Ok(status),
        Response::Error(e) => Err(e),
        _ => Err(HandsfreeError::InvalidState),
    }
}

/// Get the connection state of the session tracking `address`, if any.
///
/// # Errors
///
/// Returns an error if the dispatcher is not running or the response is
/// unexpected.
pub async fn session_state(
    address: BluetoothAddress,
) -> Result<Option<ConnectionState>, HandsfreeError> {
    REQUEST_CHANNEL
        .sender()
        .send(Request::GetSessionState(address))
        .await;
    match RESPONSE_CHANNEL.receiver().receive().await {
        Response::SessionState(state) => Ok(state),
        Response::Error(e) => Err(e),
        _ => Err(HandsfreeError::InvalidState),
    }
}

/// Receive the next host report emitted by the dispatcher.
///
/// The platform transport task calls this in a loop and forwards each
/// record to the host MCU.
pub async fn next_report() -> HostReport {
    REPORT_CHANNEL.receiver().receive().await
}
