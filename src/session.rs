//! Session Registry
//!
//! One `Session` record exists per remote AG the device talks to. Records
//! live in a fixed-size table; a slot is claimed when a service-level
//! connection is reported for an unknown address and released (fields
//! zeroed) when that address disconnects. Lookup is by address or by the
//! RFCOMM connection handle used for host reporting.

use crate::constants::MAX_SESSIONS;
use crate::{BluetoothAddress, Profile};
use heapless::Vec;

/// Identifier of a reserved or connected SCO/eSCO path
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct ScoIndex(pub u16);

impl ScoIndex {
    /// Sentinel meaning "no path reserved"
    pub const INVALID: Self = Self(0xFFFF);

    /// Whether this index refers to an actual path reservation
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }
}

impl Default for ScoIndex {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Connection state of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, defmt::Format)]
pub enum ConnectionState {
    /// No connection to the remote device
    #[default]
    Disconnected,
    /// Service-level connection established, profile not yet bound
    ServiceLevelConnected,
    /// Connection fully up and bound to a profile server
    Connected,
}

/// Per-remote-device session record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Session {
    /// Remote AG address; zeroed while the slot is idle
    pub peer_address: BluetoothAddress,
    /// RFCOMM handle used to key host reports; present once fully connected
    pub connection_handle: Option<u16>,
    /// Current or pending audio path reservation
    pub sco_index: ScoIndex,
    /// Profile the remote connected to; fixed for the session's lifetime
    pub profile: Profile,
    /// Connection state
    pub state: ConnectionState,
}

impl Session {
    /// Reset this record to the idle state
    pub fn clear(&mut self) {
        *self = Session::default();
    }

    /// Whether this slot currently tracks a remote device
    #[must_use]
    pub fn in_use(&self) -> bool {
        self.state != ConnectionState::Disconnected
    }
}

/// Fixed-capacity table of session records
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Vec<Session, MAX_SESSIONS>,
}

impl SessionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Vec::new(),
        }
    }

    /// Find the session tracking `address`, if any
    #[must_use]
    pub fn find_by_address(&self, address: BluetoothAddress) -> Option<&Session> {
        self.sessions
            .iter()
            .find(|s| s.in_use() && s.peer_address == address)
    }

    /// Mutable variant of [`Self::find_by_address`]
    pub fn find_by_address_mut(&mut self, address: BluetoothAddress) -> Option<&mut Session> {
        self.sessions
            .iter_mut()
            .find(|s| s.in_use() && s.peer_address == address)
    }

    /// Find the session reporting under `handle`, if any
    #[must_use]
    pub fn find_by_handle(&self, handle: u16) -> Option<&Session> {
        self.sessions
            .iter()
            .find(|s| s.in_use() && s.connection_handle == Some(handle))
    }

    /// Mutable variant of [`Self::find_by_handle`]
    pub fn find_by_handle_mut(&mut self, handle: u16) -> Option<&mut Session> {
        self.sessions
            .iter_mut()
            .find(|s| s.in_use() && s.connection_handle == Some(handle))
    }

    /// Find the session holding the audio path reservation `index`
    pub fn find_by_sco_index_mut(&mut self, index: ScoIndex) -> Option<&mut Session> {
        if !index.is_valid() {
            return None;
        }
        self.sessions
            .iter_mut()
            .find(|s| s.in_use() && s.sco_index == index)
    }

    /// First fully connected session, if any
    pub fn find_connected_mut(&mut self) -> Option<&mut Session> {
        self.sessions
            .iter_mut()
            .find(|s| s.state == ConnectionState::Connected)
    }

    /// Session tracking `address`, claiming an idle slot if it is unknown.
    ///
    /// Returns `None` when the table is full and no slot can be reused.
    pub fn get_or_create(&mut self, address: BluetoothAddress) -> Option<&mut Session> {
        // Two passes keep the borrow checker satisfied: position first,
        // then reborrow.
        if let Some(pos) = self
            .sessions
            .iter()
            .position(|s| s.in_use() && s.peer_address == address)
        {
            return self.sessions.get_mut(pos);
        }
        if let Some(pos) = self.sessions.iter().position(|s| !s.in_use()) {
            let session = &mut self.sessions[pos];
            session.clear();
            session.peer_address = address;
            return Some(session);
        }
        if self.sessions.push(Session::default()).is_err() {
            return None;
        }
        let session = self.sessions.last_mut()?;
        session.peer_address = address;
        Some(session)
    }

    /// Number of slots currently tracking a remote device
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.sessions.iter().filter(|s| s.in_use()).count()
    }

    /// Reset every slot
    pub fn reset(&mut self) {
        self.sessions.clear();
    }
}
