//! Constants of the MOTIMOVE 8 serial protocol.
//!
//! This module defines the protocol-wide constants used for frame layout,
//! message typing, the pulse-delay scheme selection bytes, and the legal
//! parameter domains enforced by the [`StimParams`](crate::params::StimParams)
//! setters.
//!
//! ## Key Concepts
//!
//! - **Frame layout**: every pulse-by-pulse frame is exactly
//!   [`PULSE_FRAME_LEN`] bytes, single-byte big-endian fields, fixed offsets.
//! - **Length tag**: the second frame byte is the protocol constant
//!   [`MSG_LENGTH_TAG`] (0x22 = 34 payload bytes). It is part of the message
//!   definition and is never recomputed.
//! - **Train control**: starting and stopping a stimulation train uses two
//!   fixed literal frames, [`START_TRAIN_FRAME`] and [`STOP_TRAIN_FRAME`].
//! - **Safety envelope**: the per-channel amplitude ceiling depends on the
//!   pulse-delay scheme — staggered pulses allow [`MAX_AMPLITUDE_STD_MA`],
//!   simultaneous pulses only [`MAX_AMPLITUDE_SIMULTANEOUS_MA`].
//!
//! Frame construction lives in [`crate::driver`]; these values should be used
//! wherever frame offsets or parameter domains are needed so the wire format
//! stays consistent in one place.

/// Number of stimulation channels on the device.
pub const NUM_CHANNELS: usize = 8;

/// Start-of-frame marker, first byte of every message.
///
/// Excluded from the checksum (see [`crate::driver::StimDriver::pulse_frame`]).
pub const MSG_START: u8 = 0xFF;

/// Length tag of the pulse-by-pulse message: 0x22 = 34 bytes following the
/// start marker (checksum excluded).
///
/// This is a protocol constant for this message type, not a computed length.
pub const MSG_LENGTH_TAG: u8 = 0x22;

/// Message type byte for the pulse-by-pulse control frame.
pub const MSG_TYPE_PULSE_BY_PULSE: u8 = 0x08;

/// Total length of an emitted pulse-by-pulse frame, checksum included.
pub const PULSE_FRAME_LEN: usize = 35;

/// Pulse-delay byte for the standard scheme: the eight channels fire
/// staggered within the period.
pub const PULSE_DELAY_STD: u8 = 0x00;

/// Pulse-delay byte for the delay-off scheme: all channels fire
/// simultaneously.
pub const PULSE_DELAY_OFF: u8 = 0xAB;

/// Per-channel amplitude ceiling in mA under the standard pulse-delay
/// scheme.
pub const MAX_AMPLITUDE_STD_MA: u8 = 170;

/// Per-channel amplitude ceiling in mA when pulses are delivered
/// simultaneously (pulse-delay off).
pub const MAX_AMPLITUDE_SIMULTANEOUS_MA: u8 = 100;

/// Upper bound of a phase width in µs. Phase widths travel on the wire in
/// units of 10 µs, so the wire domain is 0..=100.
pub const MAX_PHASE_WIDTH_US: u16 = 1000;

/// Lowest settable stimulation frequency in Hz.
pub const MIN_FREQUENCY_HZ: u8 = 1;

/// Highest settable stimulation frequency in Hz.
pub const MAX_FREQUENCY_HZ: u8 = 100;

/// Lower clamp of the derived stimulation period in ms.
pub const MIN_PERIOD_MS: u8 = 10;

/// Upper clamp of the derived stimulation period in ms.
pub const MAX_PERIOD_MS: u8 = 254;

/// Shortest doublet inter-stimulus interval, in units of 100 µs (2.7 ms).
pub const MIN_DOUBLET_ISI: u8 = 27;

/// Longest doublet inter-stimulus interval, in units of 100 µs (10 ms).
pub const MAX_DOUBLET_ISI: u8 = 100;

/// The fixed frame that starts a stimulation train.
///
/// Set the stimulation parameters first through a pulse-by-pulse frame and
/// make sure high voltage is active.
pub const START_TRAIN_FRAME: [u8; 7] = [0xFF, 0x2C, 0x03, 0x2C, 0x02, 0x2C, 0x05];

/// The fixed frame that stops a stimulation train.
pub const STOP_TRAIN_FRAME: [u8; 7] = [0xFF, 0x2C, 0x03, 0x2C, 0x03, 0x2C, 0x06];

/// Byte offset of the pulse-delay field inside a pulse-by-pulse frame.
pub const OFFSET_PULSE_DELAY: usize = 3;

/// Byte offset of the stimulation period field.
pub const OFFSET_PERIOD: usize = 4;

/// Byte offset of the intensity field.
pub const OFFSET_INTENSITY: usize = 5;

/// Byte offset of the first amplitude byte (CH1; CH2..CH8 follow).
pub const OFFSET_AMPLITUDES: usize = 6;

/// Byte offset of the first phase-width byte (CH1; CH2..CH8 follow).
pub const OFFSET_PHASE_WIDTHS: usize = 14;

/// Byte offset of the first prescaler byte (CH1; CH2..CH8 follow).
pub const OFFSET_PRESCALERS: usize = 22;

/// Byte offset of the doublet bitmask.
pub const OFFSET_DOUBLET_MASK: usize = 30;

/// Byte offset of the doublet inter-stimulus interval (units of 100 µs).
pub const OFFSET_DOUBLET_ISI: usize = 31;

/// Byte offset of the sensor-input selection byte.
pub const OFFSET_SENSOR: usize = 32;

/// Byte offset of the high-voltage control byte.
pub const OFFSET_HIGH_VOLTAGE: usize = 33;

/// Byte offset of the trailing checksum.
pub const OFFSET_CHECKSUM: usize = 34;
