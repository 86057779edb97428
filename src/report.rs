//! Host report encoding
//!
//! Every observable state change is reported to the host MCU as a compact
//! binary record: a 16-bit event id, then the RFCOMM connection handle
//! (little endian) followed by an event-specific payload. Payloads are
//! NUL- or length-terminated so the transport can frame them without a
//! separate length field, and no record ever exceeds
//! [`MAX_REPORT_SIZE`](crate::constants::MAX_REPORT_SIZE) bytes: string
//! fields are truncated explicitly instead of tracked with manual bounds
//! arithmetic.

use crate::constants::MAX_REPORT_SIZE;
use crate::events::ActiveCall;
use crate::{BluetoothAddress, Profile};
use heapless::Vec;

/// Connection opened (payload: peer address, status)
pub const EVENT_OPEN: u16 = 0x0701;
/// Connection closed (no payload)
pub const EVENT_CLOSE: u16 = 0x0702;
/// Audio path opened (no payload)
pub const EVENT_AUDIO_OPEN: u16 = 0x0703;
/// Audio path closed (no payload)
pub const EVENT_AUDIO_CLOSE: u16 = 0x0704;
/// Service level connection up (payload: AG feature bitmap)
pub const EVENT_CONNECTED: u16 = 0x0705;
/// Profile bound for this connection (payload: profile id)
pub const EVENT_PROFILE_TYPE: u16 = 0x0706;

/// Base id for AT response events
pub const AT_EVENT_BASE: u16 = 0x0710;
/// AT OK result
pub const EVENT_AT_OK: u16 = AT_EVENT_BASE;
/// AT ERROR result
pub const EVENT_AT_ERROR: u16 = AT_EVENT_BASE + 0x01;
/// +CME ERROR extended result
pub const EVENT_AT_CMEE: u16 = AT_EVENT_BASE + 0x02;
/// RING alert
pub const EVENT_AT_RING: u16 = AT_EVENT_BASE + 0x03;
/// +VGS speaker volume change
pub const EVENT_AT_VGS: u16 = AT_EVENT_BASE + 0x04;
/// +VGM microphone gain change
pub const EVENT_AT_VGM: u16 = AT_EVENT_BASE + 0x05;
/// +CLIP calling line identification
pub const EVENT_AT_CLIP: u16 = AT_EVENT_BASE + 0x09;
/// +CIEV indicator change
pub const EVENT_AT_CIEV: u16 = AT_EVENT_BASE + 0x0A;
/// +BINP voice-tag phone number
pub const EVENT_AT_BINP: u16 = AT_EVENT_BASE + 0x0B;
/// +BSIR in-band ring state
pub const EVENT_AT_BSIR: u16 = AT_EVENT_BASE + 0x0D;
/// +CNUM subscriber number
pub const EVENT_AT_CNUM: u16 = AT_EVENT_BASE + 0x0E;
/// +CLCC current call list entry
pub const EVENT_AT_CLCC: u16 = AT_EVENT_BASE + 0x11;
/// +BIND HF indicator change
pub const EVENT_AT_BIND: u16 = AT_EVENT_BASE + 0x12;
/// +BCS codec selection
pub const EVENT_AT_BCS: u16 = AT_EVENT_BASE + 0x13;

/// One encoded record for the host reporting channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostReport {
    /// Event identifier
    pub event_id: u16,
    /// Connection handle (2 bytes LE) followed by the payload
    pub data: Vec<u8, MAX_REPORT_SIZE>,
}

/// Bounded encoder for host report payloads.
///
/// Scalar writes silently stop at the capacity limit (payloads are sized
/// well below it); string writes truncate so the terminating NUL always
/// fits.
#[derive(Debug)]
pub struct ReportEncoder {
    data: Vec<u8, MAX_REPORT_SIZE>,
}

impl ReportEncoder {
    /// Start a record keyed by `handle`
    #[must_use]
    pub fn new(handle: u16) -> Self {
        let mut encoder = Self { data: Vec::new() };
        encoder.push(handle as u8);
        encoder.push((handle >> 8) as u8);
        encoder
    }

    fn push(&mut self, byte: u8) {
        self.data.push(byte).ok();
    }

    /// Append one raw byte
    #[must_use]
    pub fn u8(mut self, value: u8) -> Self {
        self.push(value);
        self
    }

    /// Append a little-endian u16
    #[must_use]
    pub fn u16_le(mut self, value: u16) -> Self {
        self.push(value as u8);
        self.push((value >> 8) as u8);
        self
    }

    /// Append a little-endian u32
    #[must_use]
    pub fn u32_le(mut self, value: u32) -> Self {
        for byte in value.to_le_bytes() {
            self.push(byte);
        }
        self
    }

    /// Append a device address in wire order (most significant byte first)
    #[must_use]
    pub fn address(mut self, address: BluetoothAddress) -> Self {
        for byte in address.as_bytes().iter().rev() {
            self.push(*byte);
        }
        self
    }

    /// Append a single value 0..=9 as its ASCII digit
    #[must_use]
    pub fn ascii_digit(mut self, value: u8) -> Self {
        self.push(b'0' + value.min(9));
        self
    }

    /// Append a u8 as decimal ASCII digits
    #[must_use]
    pub fn decimal(mut self, value: u8) -> Self {
        if value >= 100 {
            self.push(b'0' + value / 100);
        }
        if value >= 10 {
            self.push(b'0' + (value / 10) % 10);
        }
        self.push(b'0' + value % 10);
        self
    }

    /// Append string bytes, truncated so a terminating NUL still fits
    #[must_use]
    pub fn str_bytes(mut self, text: &str) -> Self {
        let remaining = (MAX_REPORT_SIZE - 1).saturating_sub(self.data.len());
        for byte in text.as_bytes().iter().take(remaining) {
            self.push(*byte);
        }
        self
    }

    /// Append the terminating NUL and produce the record
    #[must_use]
    pub fn finish(mut self, event_id: u16) -> HostReport {
        self.push(0);
        HostReport {
            event_id,
            data: self.data,
        }
    }

    /// Produce the record without a terminator (fixed-layout payloads)
    #[must_use]
    pub fn finish_raw(self, event_id: u16) -> HostReport {
        HostReport {
            event_id,
            data: self.data,
        }
    }
}

/// Connection opened, or a connection attempt finished with `status`
#[must_use]
pub fn open_report(handle: u16, address: BluetoothAddress, status: u8) -> HostReport {
    ReportEncoder::new(handle)
        .address(address)
        .u8(status)
        .finish_raw(EVENT_OPEN)
}

/// Connection closed
#[must_use]
pub fn close_report(handle: u16) -> HostReport {
    ReportEncoder::new(handle).finish_raw(EVENT_CLOSE)
}

/// Audio path opened
#[must_use]
pub fn audio_open_report(handle: u16) -> HostReport {
    ReportEncoder::new(handle).finish_raw(EVENT_AUDIO_OPEN)
}

/// Audio path closed
#[must_use]
pub fn audio_close_report(handle: u16) -> HostReport {
    ReportEncoder::new(handle).finish_raw(EVENT_AUDIO_CLOSE)
}

/// Service level connection up with the AG's feature bitmap
#[must_use]
pub fn connected_report(handle: u16, features: u32) -> HostReport {
    ReportEncoder::new(handle)
        .u32_le(features)
        .finish_raw(EVENT_CONNECTED)
}

/// Profile bound for this connection
#[must_use]
pub fn profile_report(handle: u16, profile: Profile) -> HostReport {
    ReportEncoder::new(handle)
        .u8(profile.id())
        .finish_raw(EVENT_PROFILE_TYPE)
}

/// Indicator changed: ASCII `"<id>,<value>"`, NUL terminated
#[must_use]
pub fn indicator_report(handle: u16, indicator: u8, value: u8) -> HostReport {
    ReportEncoder::new(handle)
        .ascii_digit(indicator)
        .u8(b',')
        .ascii_digit(value)
        .finish(EVENT_AT_CIEV)
}

/// HF indicator (+BIND) changed: numeric field, then ASCII `"<id>,<value>"`
#[must_use]
pub fn battery_indicator_report(handle: u16, indicator: u8, value: u8) -> HostReport {
    ReportEncoder::new(handle)
        .u16_le(0)
        .ascii_digit(indicator)
        .u8(b',')
        .ascii_digit(value)
        .finish(EVENT_AT_BIND)
}

/// AT response carrying only a numeric field (OK, ERROR, +CME, +VGS, ...)
#[must_use]
pub fn at_status_report(event_id: u16, handle: u16, num: u16) -> HostReport {
    ReportEncoder::new(handle).u16_le(num).finish(event_id)
}

/// AT response carrying a numeric field and a text field (+CLIP, +CNUM, ...)
#[must_use]
pub fn at_text_report(event_id: u16, handle: u16, num: u16, text: &str) -> HostReport {
    ReportEncoder::new(handle)
        .u16_le(num)
        .str_bytes(text)
        .finish(event_id)
}

/// One +CLCC call list entry:
/// `"<idx>,<dir>,<status>,<mode>,<conference>[,<number>,<type>]"`
#[must_use]
pub fn call_list_report(handle: u16, call: &ActiveCall) -> HostReport {
    let mut encoder = ReportEncoder::new(handle)
        .u16_le(0)
        .ascii_digit(call.index)
        .u8(b',')
        .ascii_digit(call.direction)
        .u8(b',')
        .ascii_digit(call.status)
        .u8(b',')
        .ascii_digit(call.mode)
        .u8(b',')
        .ascii_digit(u8::from(call.is_conference));
    if call.number_type != 0 {
        encoder = encoder
            .u8(b',')
            .str_bytes(call.number.as_str())
            .u8(b',')
            .decimal(call.number_type);
    }
    encoder.finish(EVENT_AT_CLCC)
}
