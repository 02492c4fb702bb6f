//! Pulse-by-pulse frame builder for the MOTIMOVE 8 stimulator.
//!
//! This module provides the [`StimDriver`] struct, which turns the shared
//! parameter state into the stream of bit-exact control frames the
//! stimulator consumes at the stimulation rate (1..100 Hz).
//!
//! Each call to [`pulse_frame`](StimDriver::pulse_frame) advances the eight
//! per-channel ramp state machines by one pulse, computes the per-channel
//! amplitude bytes (envelope scaling, hardware compensation), and assembles
//! the 35-byte frame with its trailing checksum. The driver also supplies
//! the two fixed train-control frames.
//!
//! ## Pacing
//!
//! The ramp engine's time base is the pulse count, not the wall clock: call
//! `pulse_frame` exactly once per stimulation period. Pacing slower
//! stretches every ramp proportionally, pacing faster shortens it. This is
//! the caller's contract; scheduling helpers live in [`crate::timer`].
//!
//! ## Sharing
//!
//! [`StimDriver::params`] is a public [`StimParams`] whose setters take
//! `&self`, so a controller context can retune the stimulation while the
//! pacing context builds frames. `pulse_frame` itself takes `&mut self`:
//! the borrow checker rules out the one forbidden schedule, two frame
//! builds running concurrently.
//!
//! ## Example
//!
//! ```rust
//! use motimove8::driver::StimDriver;
//!
//! let mut driver = StimDriver::new();
//! driver.params.set_stim_frequency(20);
//! driver.params.set_active_channels([true, false, false, false, false, false, false, false]);
//!
//! let frame = driver.pulse_frame(); // one frame per stimulation period
//! assert_eq!(frame.len(), 35);
//! assert_eq!(frame[0], 0xFF);
//! ```

use crate::checksum::frame_checksum;
use crate::compensation::compensate;
use crate::consts::{
    MSG_LENGTH_TAG, MSG_START, MSG_TYPE_PULSE_BY_PULSE, NUM_CHANNELS, OFFSET_AMPLITUDES,
    OFFSET_CHECKSUM, OFFSET_DOUBLET_ISI, OFFSET_DOUBLET_MASK, OFFSET_HIGH_VOLTAGE,
    OFFSET_INTENSITY, OFFSET_PERIOD, OFFSET_PHASE_WIDTHS, OFFSET_PRESCALERS, OFFSET_PULSE_DELAY,
    OFFSET_SENSOR, PULSE_FRAME_LEN, START_TRAIN_FRAME, STOP_TRAIN_FRAME,
};
use crate::params::StimParams;
use crate::ramp::ChannelRamp;
use libm::roundf;

#[cfg(not(feature = "std"))]
use heapless::Vec;
#[cfg(feature = "std")]
use std::vec::Vec;

/// Control engine for the eight-channel stimulator.
///
/// Owns the shared [`StimParams`] store and the eight ramp state machines,
/// and assembles the wire frames. One instance corresponds to one device
/// session; construction seeds the device-session defaults of the store and
/// settled, inactive ramps.
#[derive(Debug, Default)]
pub struct StimDriver {
    /// Shared parameter store. Setters take `&self`, so the field can be
    /// handed out by reference to a controller context while the driver
    /// keeps building frames.
    pub params: StimParams,
    /// Per-channel envelope state, CH1 at index 0.
    pub(crate) ramps: [ChannelRamp; NUM_CHANNELS],
}

impl StimDriver {
    /// Creates a driver with the device-session defaults (see
    /// [`StimParams::new`]).
    pub fn new() -> Self {
        Self {
            params: StimParams::new(),
            ramps: [ChannelRamp::new(); NUM_CHANNELS],
        }
    }

    /// Builds one pulse-by-pulse frame into `frame`.
    ///
    /// Advances every channel's ramp state machine by one pulse (while
    /// ramping is globally enabled), so this must be called exactly once
    /// per stimulation period.
    ///
    /// The layout is fixed: start marker, length tag 0x22, message type
    /// 0x08, pulse-delay byte, period (BOOST-selected), intensity, eight
    /// amplitude bytes, eight phase-width bytes (BOOST-selected), eight
    /// prescaler bytes, doublet mask, doublet interval, sensor byte,
    /// high-voltage byte, checksum over everything after the start marker.
    pub fn pulse_frame_into(&mut self, frame: &mut [u8; PULSE_FRAME_LEN]) {
        frame[0] = MSG_START;
        frame[1] = MSG_LENGTH_TAG;
        frame[2] = MSG_TYPE_PULSE_BY_PULSE;
        frame[OFFSET_PULSE_DELAY] = self.params.pulse_delay().byte();
        frame[OFFSET_PERIOD] = if self.params.boost_mode() {
            self.params.period_boost_ms()
        } else {
            self.params.period_ms()
        };
        frame[OFFSET_INTENSITY] = self.params.intensity();

        if self.params.ramping_enabled() {
            let max_ma = self.params.max_amplitudes();
            for (ch, ramp) in self.ramps.iter_mut().enumerate() {
                ramp.advance(ch, &self.params);
                // The activation is read back after the update: a channel
                // ramping down was re-asserted active and still fires.
                let active = self.params.channel_active(ch);
                let requested =
                    roundf(max_ma[ch] as f32 * (ramp.level_pct() / 100.0)) as u8 * active as u8;
                frame[OFFSET_AMPLITUDES + ch] = compensate(requested);
            }

            #[cfg(any(feature = "log", feature = "defmt-0-3"))]
            for ch in 0..NUM_CHANNELS {
                let amp = frame[OFFSET_AMPLITUDES + ch];
                if amp != 0 {
                    #[cfg(feature = "log")]
                    log::trace!("stim ch{}: {} mA", ch + 1, amp);
                    #[cfg(feature = "defmt-0-3")]
                    defmt::trace!("stim ch{}: {} mA", ch + 1, amp);
                }
            }

            for (ch, ramp) in self.ramps.iter_mut().enumerate() {
                ramp.finish_pulse(ch, &self.params);
            }
        } else {
            let max_ma = self.params.max_amplitudes();
            for ch in 0..NUM_CHANNELS {
                frame[OFFSET_AMPLITUDES + ch] = max_ma[ch] * self.params.channel_active(ch) as u8;
            }
        }

        let widths = if self.params.boost_mode() {
            self.params.phase_width_bytes_boost()
        } else {
            self.params.phase_width_bytes()
        };
        frame[OFFSET_PHASE_WIDTHS..OFFSET_PHASE_WIDTHS + NUM_CHANNELS].copy_from_slice(&widths);
        frame[OFFSET_PRESCALERS..OFFSET_PRESCALERS + NUM_CHANNELS]
            .copy_from_slice(&self.params.prescalers());

        frame[OFFSET_DOUBLET_MASK] = self.params.doublet_mask();
        frame[OFFSET_DOUBLET_ISI] = self.params.doublet_isi();
        frame[OFFSET_SENSOR] = self.params.sensor_input().byte();
        frame[OFFSET_HIGH_VOLTAGE] = self.params.high_voltage().byte();

        frame[OFFSET_CHECKSUM] = frame_checksum(&frame[1..OFFSET_CHECKSUM]);
    }

    /// Builds one pulse-by-pulse frame and returns it as a byte vector.
    ///
    /// See [`pulse_frame_into`](StimDriver::pulse_frame_into) for the
    /// layout and the once-per-period pacing contract.
    #[cfg(feature = "std")]
    pub fn pulse_frame(&mut self) -> Vec<u8> {
        let mut frame = [0u8; PULSE_FRAME_LEN];
        self.pulse_frame_into(&mut frame);
        Vec::from(&frame[..])
    }

    /// Builds one pulse-by-pulse frame and returns it as a byte vector.
    ///
    /// See [`pulse_frame_into`](StimDriver::pulse_frame_into) for the
    /// layout and the once-per-period pacing contract.
    #[cfg(not(feature = "std"))]
    pub fn pulse_frame(&mut self) -> Vec<u8, PULSE_FRAME_LEN> {
        let mut frame = [0u8; PULSE_FRAME_LEN];
        self.pulse_frame_into(&mut frame);
        Vec::from_slice(&frame).unwrap()
    }

    /// The fixed frame that starts a stimulation train.
    ///
    /// Send the stimulation parameters first through a pulse-by-pulse
    /// frame and make sure high voltage is active.
    pub fn start_train_frame(&self) -> [u8; 7] {
        START_TRAIN_FRAME
    }

    /// The fixed frame that stops a stimulation train.
    pub fn stop_train_frame(&self) -> [u8; 7] {
        STOP_TRAIN_FRAME
    }
}
