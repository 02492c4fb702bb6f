use crate::consts::PULSE_FRAME_LEN;
use crate::driver::StimDriver;
use crate::timer::pulse_interval_us;
use embedded_hal::delay::DelayNs;

/// Emits one pulse frame and blocks for one stimulation period.
///
/// This is the simple pacing flavor for firmware without a spare timer
/// interrupt: call it from your control loop and it upholds the
/// once-per-period contract for you — build a frame, hand it to the
/// transport sink, sleep the current period (reread each pulse, so
/// frequency and BOOST changes take effect on the next cycle).
///
/// # Arguments
/// - `driver`: the stimulation driver to advance.
/// - `delay`: a delay provider implementing `DelayNs`, typically from the
///   HAL.
/// - `emit`: sink receiving the 35 frame bytes, e.g. a serial write.
///
/// # Example
/// ```rust
/// use motimove8::driver::StimDriver;
/// use motimove8::timer::run_pulse_tick;
/// # use embedded_hal_mock::eh1::delay::NoopDelay as Delay;
///
/// let mut driver = StimDriver::new();
/// let mut delay = Delay::new();
/// loop {
///     run_pulse_tick(&mut driver, &mut delay, &mut |frame| {
///         let _ = frame; // uart.write_all(frame)
///     });
///     # break; // For testing purposes
/// }
/// ```
///
/// # Notes
/// - The delay spans the full period rather than the time remaining after
///   frame construction; at stimulation rates the build time is noise, but
///   a hardware timer (`timer-isr` feature) paces more precisely.
pub fn run_pulse_tick<D: DelayNs, E: FnMut(&[u8])>(
    driver: &mut StimDriver,
    delay: &mut D,
    emit: &mut E,
) {
    let mut frame = [0u8; PULSE_FRAME_LEN];
    driver.pulse_frame_into(&mut frame);
    emit(&frame);
    delay.delay_us(pulse_interval_us(&driver.params));
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::delay::NoopDelay;

    #[test]
    fn test_run_pulse_tick_emits_one_frame() {
        let mut driver = StimDriver::new();
        let mut delay = NoopDelay::new();
        let mut frames: Vec<Vec<u8>> = Vec::new();

        run_pulse_tick(&mut driver, &mut delay, &mut |frame| {
            frames.push(frame.to_vec());
        });

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), PULSE_FRAME_LEN);
        assert_eq!(frames[0][0], 0xFF);
    }

    #[test]
    fn test_repeated_ticks_advance_the_ramp() {
        let mut driver = StimDriver::new();
        driver.params.set_stim_frequency(20);
        driver
            .params
            .set_active_channels([true, false, false, false, false, false, false, false]);
        let mut delay = NoopDelay::new();
        let mut amplitudes: Vec<u8> = Vec::new();

        for _ in 0..5 {
            run_pulse_tick(&mut driver, &mut delay, &mut |frame| {
                amplitudes.push(frame[6]);
            });
        }

        // Envelope walks up pulse by pulse
        assert!(amplitudes.windows(2).all(|w| w[0] <= w[1]));
        assert!(amplitudes[4] > amplitudes[0]);
    }
}
