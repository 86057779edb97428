//! Link key persistence and pairing policy
//!
//! Link keys produced by pairing outlive a power cycle in a small
//! byte-addressed persistent store (NVRAM, flash, EEPROM). The store is an
//! opaque capability: records are keyed by a small id, and the address to
//! id mapping is the store's own business. These helpers are invoked from
//! the platform's pairing callbacks; the event dispatcher never touches
//! them.

use crate::constants::LINK_KEY_LENGTH;
use crate::{BluetoothAddress, HandsfreeError};

/// Serialized size of one link key record
pub const LINK_KEY_RECORD_SIZE: usize = 6 + LINK_KEY_LENGTH;

/// Byte-addressed persistent storage capability
pub trait KeyValueStore {
    /// Write `data` under `id`, returning the number of bytes written
    ///
    /// # Errors
    /// Returns an error when the record cannot be stored.
    fn write(&mut self, id: u8, data: &[u8]) -> Result<usize, HandsfreeError>;

    /// Read the record `id` into `buf`, returning the number of bytes read
    ///
    /// # Errors
    /// Returns an error when no record exists under `id`.
    fn read(&mut self, id: u8, buf: &mut [u8]) -> Result<usize, HandsfreeError>;

    /// Find the id of the record holding keys for `address`
    fn find_id(&self, address: BluetoothAddress) -> Option<u8>;

    /// Allocate a fresh record id
    ///
    /// # Errors
    /// Returns an error when the store is full.
    fn alloc_id(&mut self) -> Result<u8, HandsfreeError>;
}

/// One stored pairing: peer address and its BR/EDR link key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkKeyRecord {
    /// Peer device address
    pub address: BluetoothAddress,
    /// BR/EDR link key
    pub key: [u8; LINK_KEY_LENGTH],
}

impl LinkKeyRecord {
    /// Serialize into the fixed on-store layout: address, then key
    #[must_use]
    pub fn to_bytes(&self) -> [u8; LINK_KEY_RECORD_SIZE] {
        let mut bytes = [0u8; LINK_KEY_RECORD_SIZE];
        bytes[..6].copy_from_slice(self.address.as_bytes());
        bytes[6..].copy_from_slice(&self.key);
        bytes
    }

    /// Deserialize from the fixed on-store layout
    ///
    /// # Errors
    /// Returns an error when `bytes` is shorter than a full record.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HandsfreeError> {
        if bytes.len() < LINK_KEY_RECORD_SIZE {
            return Err(HandsfreeError::InvalidParameter);
        }
        let address = BluetoothAddress::try_from(&bytes[..6])?;
        let mut key = [0u8; LINK_KEY_LENGTH];
        key.copy_from_slice(&bytes[6..LINK_KEY_RECORD_SIZE]);
        Ok(Self { address, key })
    }
}

/// Persist `record`, reusing the existing slot for its address if one
/// exists. Returns the record id used.
///
/// # Errors
/// Returns an error when the store is full or the write fails.
pub fn store_link_keys<K: KeyValueStore>(
    store: &mut K,
    record: &LinkKeyRecord,
) -> Result<u8, HandsfreeError> {
    let id = match store.find_id(record.address) {
        Some(id) => id,
        None => store.alloc_id()?,
    };
    let written = store.write(id, &record.to_bytes())?;
    if written < LINK_KEY_RECORD_SIZE {
        return Err(HandsfreeError::StoreFull);
    }
    Ok(id)
}

/// Load the stored link keys for `address`.
///
/// A miss is an explicit [`HandsfreeError::KeyNotFound`] so the stack can
/// fall back to fresh pairing; nothing is retried here.
///
/// # Errors
/// Returns `KeyNotFound` when no (complete) record exists for `address`.
pub fn load_link_keys<K: KeyValueStore>(
    store: &mut K,
    address: BluetoothAddress,
) -> Result<LinkKeyRecord, HandsfreeError> {
    let id = store.find_id(address).ok_or(HandsfreeError::KeyNotFound)?;
    let mut buf = [0u8; LINK_KEY_RECORD_SIZE];
    let read = store.read(id, &mut buf)?;
    if read < LINK_KEY_RECORD_SIZE {
        return Err(HandsfreeError::KeyNotFound);
    }
    LinkKeyRecord::from_bytes(&buf)
}

/// Whether pairing requests are currently granted.
///
/// The host MCU toggles this; a request outside the allowed window is
/// answered with an explicit rejection and nothing else changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityPolicy {
    pairing_allowed: bool,
}

impl SecurityPolicy {
    /// Allow or forbid pairing requests
    pub fn set_pairing_allowed(&mut self, allowed: bool) {
        self.pairing_allowed = allowed;
    }

    /// Whether pairing requests are currently granted
    #[must_use]
    pub fn pairing_allowed(&self) -> bool {
        self.pairing_allowed
    }

    /// Answer a pairing request from `address`
    ///
    /// # Errors
    /// Returns `PairingNotAllowed` when pairing is currently forbidden.
    pub fn authorize(&self, _address: BluetoothAddress) -> Result<(), HandsfreeError> {
        if self.pairing_allowed {
            Ok(())
        } else {
            Err(HandsfreeError::PairingNotAllowed)
        }
    }
}
