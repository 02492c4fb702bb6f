//! Pacing utilities for the stimulation engine.
//!
//! The ramp engine's time base is the pulse count, not the wall clock: the
//! caller must request one pulse frame per stimulation period. This module
//! carries that contract in two flavors: a blocking loop helper driven by
//! an `embedded_hal::delay::DelayNs` (`delay-loop` feature), and an
//! interrupt-service pattern where a hardware timer fires once per period
//! and pulses a `critical_section`-guarded global driver (`timer-isr`
//! feature).
//!
//! Contains helpers for both schedulings:
//! - [`pulse_interval_ms`] / [`pulse_interval_us`]: the current stimulation
//!   period, BOOST-aware, for programming a timer or delay
//! - [`frequency_interval_us`]: interval for a frequency not yet stored
//! - `run_pulse_tick`: one frame + one period of blocking delay (feature
//!   `delay-loop`)
//! - `global_stim_pulse` and `pulse_stim_timer!()`: interrupt-based frame
//!   emission wrappers (feature `timer-isr`)

use crate::params::StimParams;
use libm::roundf;

#[cfg(feature = "delay-loop")]
mod delay;
#[cfg(feature = "delay-loop")]
pub use delay::*;

#[cfg(feature = "timer-isr")]
mod isr;
#[cfg(feature = "timer-isr")]
pub use isr::*;

#[cfg(feature = "timer-isr")]
mod macros;

/// Microseconds per millisecond.
pub const MICROS_PER_MILLI: u32 = 1_000;

/// The current stimulation period in ms, read from whichever parameter set
/// (normal or BOOST) is selected.
pub fn pulse_interval_ms(params: &StimParams) -> u32 {
    if params.boost_mode() {
        params.period_boost_ms() as u32
    } else {
        params.period_ms() as u32
    }
}

/// The current stimulation period in µs, for timers programmed in
/// microseconds. See [`pulse_interval_ms`].
pub fn pulse_interval_us(params: &StimParams) -> u32 {
    pulse_interval_ms(params) * MICROS_PER_MILLI
}

/// Pulse interval in µs for a stimulation frequency in Hz, before it is
/// stored: `round(1e6 / f)`. Frequencies below 1 Hz are treated as 1 Hz.
pub fn frequency_interval_us(freq_hz: u8) -> u32 {
    roundf(1_000_000.0 / freq_hz.max(1) as f32) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_follows_selected_parameter_set() {
        let params = StimParams::new();
        params.set_stim_frequency(20);
        params.set_stim_frequency_boost(50);

        assert_eq!(pulse_interval_ms(&params), 50);
        assert_eq!(pulse_interval_us(&params), 50_000);

        params.set_boost_mode(true);
        assert_eq!(pulse_interval_ms(&params), 20);
        assert_eq!(pulse_interval_us(&params), 20_000);
    }

    #[test]
    fn test_frequency_interval() {
        assert_eq!(frequency_interval_us(100), 10_000);
        assert_eq!(frequency_interval_us(20), 50_000);
        assert_eq!(frequency_interval_us(3), 333_333);
        assert_eq!(frequency_interval_us(0), 1_000_000);
    }
}
