use crate::consts::PULSE_FRAME_LEN;
use crate::driver::StimDriver;
use crate::params::StimParams;
use core::cell::RefCell;
use critical_section::Mutex;

/// Used to initialize the global static [`StimDriver`] for use with
/// `critical_section`.
///
/// # Returns
/// * An empty mutable ref-cell
///
/// # Example
/// ```rust
/// use core::cell::RefCell;
/// use critical_section::Mutex;
/// use motimove8::driver::StimDriver;
/// use motimove8::timer::global_stim_driver_init;
///
/// static STIM_DRIVER: Mutex<RefCell<Option<StimDriver>>> = global_stim_driver_init();
/// ```
pub const fn global_stim_driver_init() -> Mutex<RefCell<Option<StimDriver>>> {
    Mutex::new(RefCell::new(None))
}

/// Places a fresh driver (device-session defaults) into the global static.
///
/// Call once from `main()` before enabling the pacing timer interrupt.
///
/// # Example
/// ```rust
/// use core::cell::RefCell;
/// use critical_section::Mutex;
/// use motimove8::driver::StimDriver;
/// use motimove8::timer::{global_stim_driver_init, global_stim_driver_setup};
///
/// static STIM_DRIVER: Mutex<RefCell<Option<StimDriver>>> = global_stim_driver_init();
///
/// fn main() {
///     global_stim_driver_setup(&STIM_DRIVER);
/// }
/// ```
pub fn global_stim_driver_setup(global_driver: &'static Mutex<RefCell<Option<StimDriver>>>) {
    critical_section::with(|cs| {
        let _ = global_driver.borrow(cs).replace(Some(StimDriver::new()));
    });
}

/// Builds one pulse frame from the global driver and hands it to `emit`.
///
/// Intended to be called from the timer interrupt that fires once per
/// stimulation period; reprogram the timer from
/// [`pulse_interval_us`](crate::timer::pulse_interval_us) when the
/// frequency or BOOST selection changes. Does nothing if the global driver
/// has not been set up yet.
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn TIM2() {
///     global_stim_pulse(&STIM_DRIVER, &mut |frame| uart.write_all(frame));
/// }
/// ```
pub fn global_stim_pulse<E: FnMut(&[u8])>(
    global_driver: &'static Mutex<RefCell<Option<StimDriver>>>,
    emit: &mut E,
) {
    critical_section::with(|cs| {
        if let Some(driver) = global_driver.borrow(cs).borrow_mut().as_mut() {
            let mut frame = [0u8; PULSE_FRAME_LEN];
            driver.pulse_frame_into(&mut frame);
            emit(&frame);
        }
    });
}

/// Runs `f` against the parameter store of the global driver, e.g. to
/// retune the stimulation from the main loop while the ISR paces frames.
///
/// Returns `None` if the global driver has not been set up yet.
///
/// # Example
/// ```rust
/// use core::cell::RefCell;
/// use critical_section::Mutex;
/// use motimove8::driver::StimDriver;
/// use motimove8::timer::{global_stim_driver_init, global_stim_driver_setup, with_global_params};
///
/// static STIM_DRIVER: Mutex<RefCell<Option<StimDriver>>> = global_stim_driver_init();
///
/// global_stim_driver_setup(&STIM_DRIVER);
/// let period = with_global_params(&STIM_DRIVER, |params| {
///     params.set_stim_frequency(20);
///     params.period_ms()
/// });
/// assert_eq!(period, Some(50));
/// ```
pub fn with_global_params<R>(
    global_driver: &'static Mutex<RefCell<Option<StimDriver>>>,
    f: impl FnOnce(&StimParams) -> R,
) -> Option<R> {
    critical_section::with(|cs| {
        global_driver
            .borrow(cs)
            .borrow()
            .as_ref()
            .map(|driver| f(&driver.params))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_pulse_is_a_noop_before_setup() {
        static DRIVER: Mutex<RefCell<Option<StimDriver>>> = global_stim_driver_init();
        let mut emitted = 0;
        global_stim_pulse(&DRIVER, &mut |_frame| emitted += 1);
        assert_eq!(emitted, 0);
        assert_eq!(with_global_params(&DRIVER, |params| params.intensity()), None);
    }

    #[test]
    fn test_global_pulse_emits_frames_after_setup() {
        static DRIVER: Mutex<RefCell<Option<StimDriver>>> = global_stim_driver_init();
        global_stim_driver_setup(&DRIVER);

        let intensity = with_global_params(&DRIVER, |params| {
            params.set_intensity(42);
            params.intensity()
        });
        assert_eq!(intensity, Some(42));

        let mut frame_bytes = [0u8; PULSE_FRAME_LEN];
        global_stim_pulse(&DRIVER, &mut |frame| {
            frame_bytes.copy_from_slice(frame);
        });
        assert_eq!(frame_bytes[0], 0xFF);
        assert_eq!(frame_bytes[5], 42);
    }
}
