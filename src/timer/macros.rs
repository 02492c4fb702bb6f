/// Declares a static global `STIM_DRIVER` instance protected by a
/// `critical_section` mutex.
///
/// This macro creates a `static` singleton suitable for interrupt-based
/// pacing, where the main thread retunes parameters and a timer ISR emits
/// one frame per stimulation period.
///
/// # Example
/// ```rust
/// use motimove8::init_stim_driver;
/// init_stim_driver!();
/// ```
#[macro_export]
macro_rules! init_stim_driver {
    () => {
        pub static STIM_DRIVER: $crate::critical_section::Mutex<
            core::cell::RefCell<Option<$crate::driver::StimDriver>>,
        > = $crate::critical_section::Mutex::new(core::cell::RefCell::new(None));
    };
}

/// Initializes the global `STIM_DRIVER` singleton with a fresh driver
/// carrying the device-session defaults.
///
/// # Example
/// ```rust
/// use motimove8::{init_stim_driver, setup_stim_driver};
/// init_stim_driver!();
///
/// setup_stim_driver!();
/// ```
///
/// # Notes
/// - Requires `init_stim_driver!` to have been used earlier.
/// - Call before enabling the pacing timer interrupt.
#[macro_export]
macro_rules! setup_stim_driver {
    () => {
        $crate::critical_section::with(|cs| {
            let _ = STIM_DRIVER
                .borrow(cs)
                .replace(Some($crate::driver::StimDriver::new()));
        });
    };
}

/// Builds one pulse frame from the global `STIM_DRIVER` and hands the
/// bytes to the given sink expression.
///
/// Invoke from the timer ISR that fires once per stimulation period.
/// Silently does nothing if the driver has not been set up yet.
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn TIM2() {
///     pulse_stim_timer!(|frame| uart.write_all(frame));
/// }
/// ```
#[macro_export]
macro_rules! pulse_stim_timer {
    ( $emit:expr ) => {
        $crate::critical_section::with(|cs| {
            if let Some(driver) = STIM_DRIVER.borrow(cs).borrow_mut().as_mut() {
                let mut frame = [0u8; $crate::consts::PULSE_FRAME_LEN];
                driver.pulse_frame_into(&mut frame);
                ($emit)(&frame[..]);
            }
        });
    };
}

/// Runs a closure against the parameter store of the global `STIM_DRIVER`,
/// e.g. to retune amplitudes or frequency from the main loop while the ISR
/// paces frames. Evaluates to `Option<R>`: `None` if the driver has not
/// been set up yet.
///
/// # Example
/// ```rust
/// use motimove8::{init_stim_driver, setup_stim_driver, with_stim_params};
/// init_stim_driver!();
///
/// setup_stim_driver!();
/// let period = with_stim_params!(|params| {
///     params.set_stim_frequency(25);
///     params.period_ms()
/// });
/// assert_eq!(period, Some(40));
/// ```
#[macro_export]
macro_rules! with_stim_params {
    ( $f:expr ) => {
        $crate::critical_section::with(|cs| {
            STIM_DRIVER
                .borrow(cs)
                .borrow()
                .as_ref()
                .map(|driver| ($f)(&driver.params))
        })
    };
}
