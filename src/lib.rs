//! # motimove8
//!
//! A portable, no_std Rust control-plane driver for the MOTIMOVE 8
//! eight-channel functional electrical stimulation (FES) device.
//!
//! This driver translates time-varying stimulation intent — which channels
//! are on, at which amplitudes, frequencies and pulse widths, with smooth
//! on/off transitions — into the stream of bit-exact control frames the
//! stimulator consumes at the stimulation rate (1..100 Hz), using:
//! - eight independent per-channel ramp state machines for amplitude
//!   envelopes
//! - a fixed nonlinear compensation table for the device's output stage
//! - a pulse-delay-dependent amplitude safety ceiling (170 mA staggered,
//!   100 mA simultaneous)
//! - a 7-bit additive checksum over every emitted frame
//! - optional pacing helpers using either timer interrupts or blocking
//!   delay
//!
//! ## Crate features
//! | Feature               | Description |
//! |-----------------------|-------------|
//! | `std`                 | Disables `#![no_std]` support and replaces `heapless::Vec`s with
//! `std::vec::Vec`s |
//! | `delay-loop`          | Uses `embedded_hal::delay::DelayNs` for pulse pacing |
//! | `timer-isr` (default) | Uses `critical_section::with` for ISR-driven pacing |
//! | `defmt-0-3`           | Uses `defmt` logging |
//! | `log`                 | Uses `log` logging |
//!
//! ## Software Features
//!
//! - **Parameter store and frame builder** in pure software (no vendor
//!   blobs, no transport assumptions — frames are plain byte buffers)
//! - Bit-exact pulse-by-pulse frames, BOOST parameter switching, doublet
//!   and sensor control, and the fixed start/stop train frames
//! - Thread-safe parameter mutation: every scalar is an atomic, every
//!   setter clamps and never fails
//! - Feature flags for interrupt-driven or blocking pulse scheduling
//!
//! ## Usage
//!
//! ```rust
//! use motimove8::driver::StimDriver;
//!
//! fn main() {
//!     let mut driver = StimDriver::new();
//!     driver.params.set_stim_frequency(20);
//!     driver.params.set_max_amplitudes([60, 60, 0, 0, 0, 0, 0, 0]);
//!     driver.params.set_active_channels([true, true, false, false, false, false, false, false]);
//!
//!     let frame = driver.pulse_frame(); // one frame per stimulation period
//!     assert_eq!(frame.len(), 35);
//!     # let _ = driver.start_train_frame();
//! }
//! ```
//!
//! Or, drive the pacing with a `DelayNs` implementation:
//!
//! ```rust
//! use motimove8::driver::StimDriver;
//! #[cfg(feature = "delay-loop")]
//! use motimove8::timer::run_pulse_tick;
//! # use embedded_hal_mock::eh1::delay::NoopDelay as Delay;
//!
//! fn main() {
//!     let mut driver = StimDriver::new();
//!     driver.params.set_active_channels([true, false, false, false, false, false, false, false]);
//! # #[cfg(feature = "delay-loop")]
//!     let mut delay = Delay::new();
//! # #[cfg(feature = "delay-loop")]
//!     run_pulse_tick(&mut driver, &mut delay, &mut |frame| {
//!         let _ = frame; // hand the 35 bytes to the transport
//!     });
//! }
//! ```
//!
//! ## Pacing Contract
//!
//! The ramp engine's time base is the pulse count, not the wall clock: call
//! [`pulse_frame`](driver::StimDriver::pulse_frame) exactly once per
//! stimulation period. Pacing slower stretches every ramp proportionally,
//! pacing faster shortens it — this is an explicit contract, not a
//! limitation. See [`timer`] for scheduling helpers.
//!
//! ## Integration Notes
//!
//! - Parameter setters may run concurrently with frame building; atomicity
//!   is per field, so quiesce between related updates and the next pulse if
//!   several fields must change together.
//! - `pulse_frame` takes `&mut self`: two concurrent frame builds are a
//!   compile error, not a runtime hazard.
//! - Only one driver instance should be active per device in
//!   interrupt-driven mode.
//!
//! --
//! Designed for `#![no_std]` use in resource-constrained embedded
//! environments.

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "timer-isr")]
pub use critical_section;

#[cfg(all(feature = "timer-isr", not(feature = "std")))]
pub use heapless;

pub(crate) mod checksum;
pub mod compensation;
pub mod consts;
pub mod driver;
pub mod params;
pub mod ramp;
pub mod timer;

#[cfg(test)]
mod tests {

    #[cfg(all(test, feature = "std"))]
    mod sessions {
        use crate::consts::{OFFSET_AMPLITUDES, OFFSET_CHECKSUM, PULSE_FRAME_LEN};
        use crate::driver::StimDriver;
        use crate::params::PulseDelay;

        fn frame(driver: &mut StimDriver) -> [u8; PULSE_FRAME_LEN] {
            let mut bytes = [0u8; PULSE_FRAME_LEN];
            driver.pulse_frame_into(&mut bytes);
            let sum: u32 = bytes[1..OFFSET_CHECKSUM].iter().map(|b| *b as u32).sum();
            assert_eq!((sum & 0x7F) as u8, bytes[OFFSET_CHECKSUM]);
            bytes
        }

        const CH1_ONLY: [bool; 8] = [true, false, false, false, false, false, false, false];

        #[test]
        fn test_activation_session_ramps_up_and_down() {
            let mut driver = StimDriver::new();
            driver.params.set_stim_frequency(20);

            assert_eq!(driver.start_train_frame(), [0xFF, 0x2C, 0x03, 0x2C, 0x02, 0x2C, 0x05]);

            // Idle pulses first: nothing fires
            for _ in 0..3 {
                assert_eq!(frame(&mut driver)[OFFSET_AMPLITUDES], 0);
            }

            // Switch CH1 on: the envelope climbs from the 25 % start value
            // (compensated 25 -> 24) to the full 100 mA over 20 pulses
            driver.params.set_active_channels(CH1_ONLY);
            assert_eq!(frame(&mut driver)[OFFSET_AMPLITUDES], 24);
            for _ in 0..19 {
                let amp = frame(&mut driver)[OFFSET_AMPLITUDES];
                assert!(amp > 0 && amp < 100);
            }
            assert_eq!(frame(&mut driver)[OFFSET_AMPLITUDES], 100);

            // Switch CH1 off: the channel keeps firing with a falling
            // envelope (250 ms at 20 Hz = 5 steps to the 50 % end value),
            // then goes silent and is released
            driver.params.set_active_channels([false; 8]);
            let descent: Vec<u8> = (0..8).map(|_| frame(&mut driver)[OFFSET_AMPLITUDES]).collect();
            assert_eq!(descent, vec![100, 90, 80, 70, 60, 48, 0, 0]);
            assert!(!driver.params.channel_active(0));

            assert_eq!(driver.stop_train_frame(), [0xFF, 0x2C, 0x03, 0x2C, 0x03, 0x2C, 0x06]);
        }

        #[test]
        fn test_ramp_duration_scales_with_pulse_count() {
            // The time base is the pulse count: at half the frequency the
            // same 1000 ms ramp-up spans half as many pulses
            let pulses_to_full = |freq: u8| {
                let mut driver = StimDriver::new();
                driver.params.set_stim_frequency(freq);
                driver.params.set_active_channels(CH1_ONLY);
                let mut count = 0;
                while frame(&mut driver)[OFFSET_AMPLITUDES] != 100 {
                    count += 1;
                    assert!(count < 100, "envelope never settled");
                }
                count
            };

            assert_eq!(pulses_to_full(20), 20);
            assert_eq!(pulses_to_full(10), 10);
        }

        #[test]
        fn test_simultaneous_pulses_never_exceed_100_ma() {
            let mut driver = StimDriver::new();
            driver.params.set_pulse_delay(PulseDelay::Off);
            driver.params.set_max_amplitudes([150; 8]);
            driver.params.set_active_channels([true; 8]);

            for _ in 0..40 {
                let bytes = frame(&mut driver);
                for ch in 0..8 {
                    assert!(bytes[OFFSET_AMPLITUDES + ch] <= 100);
                }
            }
        }

        #[test]
        fn test_retuning_between_pulses_takes_effect() {
            let mut driver = StimDriver::new();
            driver.params.set_ramping_enabled(false);
            driver.params.set_active_channels(CH1_ONLY);

            driver.params.set_stim_frequency(50);
            assert_eq!(frame(&mut driver)[4], 20);

            driver.params.set_stim_frequency(25);
            driver.params.set_intensity(60);
            let bytes = frame(&mut driver);
            assert_eq!(bytes[4], 40);
            assert_eq!(bytes[5], 60);
        }
    }

    #[cfg(all(test, feature = "timer-isr"))]
    mod macros {

        #[test]
        fn test_setup_macro_initializes_driver() {
            use crate::{init_stim_driver, setup_stim_driver, with_stim_params};
            init_stim_driver!();

            setup_stim_driver!();

            let intensity = with_stim_params!(|params: &crate::params::StimParams| params.intensity());
            assert_eq!(intensity, Some(10));
        }

        #[test]
        fn test_pulse_macro_emits_a_frame() {
            use crate::{init_stim_driver, pulse_stim_timer, setup_stim_driver, with_stim_params};
            init_stim_driver!();

            setup_stim_driver!();

            let _ = with_stim_params!(|params: &crate::params::StimParams| {
                params.set_intensity(33);
            });

            let mut seen = 0u8;
            pulse_stim_timer!(|frame: &[u8]| {
                assert_eq!(frame.len(), crate::consts::PULSE_FRAME_LEN);
                assert_eq!(frame[0], 0xFF);
                assert_eq!(frame[5], 33);
                seen += 1;
            });
            assert_eq!(seen, 1);
        }

        #[test]
        fn test_pulse_macro_without_setup_is_noop() {
            use crate::{init_stim_driver, pulse_stim_timer};
            init_stim_driver!();

            let mut seen = 0u8;
            pulse_stim_timer!(|_frame: &[u8]| {
                seen += 1;
            });
            assert_eq!(seen, 0);
        }
    }
}
