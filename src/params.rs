//! Thread-safe parameter store for the stimulation engine.
//!
//! [`StimParams`] holds every scalar the frame builder reads: the eight
//! channel records (activation, maximum amplitude, phase widths, prescaler,
//! ramp times) and the global knobs (frequency and derived period for both
//! the normal and BOOST parameter sets, intensity, pulse-delay scheme,
//! doublet configuration, sensor selection, high-voltage control, ramp
//! shaping).
//!
//! Every field is a single [`core::sync::atomic`] cell and every setter
//! takes `&self`, so a controller thread can mutate parameters while the
//! pacing context builds frames. Atomicity is per field only: a caller that
//! needs several fields to change together must quiesce between the updates
//! and the next pulse.
//!
//! ## Clamping
//!
//! Setters are total. Out-of-range input saturates to the nearest legal
//! value and is never reported as an error:
//!
//! - frequencies clamp to 1..=100 Hz and recompute the stored period
//!   `clamp(round(1000/f), 10, 254)` before the setter returns,
//! - phase widths clamp to 0..=1000 µs and are stored in wire units of
//!   10 µs,
//! - maximum amplitudes saturate at the pulse-delay-dependent ceiling
//!   (170 mA staggered, 100 mA simultaneous),
//! - intensity and the ramp start/end values clamp to 0..=100 %.
//!
//! The only fallible surface in this module is decoding raw wire bytes back
//! into the typed enums via `TryFrom<u8>`.

use crate::consts::{
    MAX_AMPLITUDE_SIMULTANEOUS_MA, MAX_AMPLITUDE_STD_MA, MAX_DOUBLET_ISI, MAX_FREQUENCY_HZ,
    MAX_PERIOD_MS, MAX_PHASE_WIDTH_US, MIN_DOUBLET_ISI, MIN_FREQUENCY_HZ, MIN_PERIOD_MS,
    NUM_CHANNELS, PULSE_DELAY_OFF, PULSE_DELAY_STD,
};
use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};
use libm::roundf;
use thiserror::Error;

/// Error returned when a raw protocol byte does not decode into a typed
/// parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WireByteError {
    /// The byte is neither the staggered (0x00) nor the simultaneous (0xAB)
    /// pulse-delay selector.
    #[error("invalid pulse-delay byte {0:#04x}")]
    PulseDelay(u8),
    /// The byte does not name one of the three sensor inputs.
    #[error("invalid sensor-input byte {0:#04x}")]
    SensorInput(u8),
    /// The byte is not a documented high-voltage control value.
    #[error("invalid high-voltage byte {0:#04x}")]
    HighVoltage(u8),
}

/// Pulse-delay scheme: whether the eight channels fire staggered within the
/// stimulation period or simultaneously.
///
/// The scheme bounds the per-channel amplitude: staggered pulses may use up
/// to 170 mA, simultaneous pulses at most 100 mA.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
pub enum PulseDelay {
    /// Staggered pulses (wire byte 0x00).
    #[default]
    Standard,
    /// Simultaneous pulses (wire byte 0xAB).
    Off,
}

impl PulseDelay {
    /// The byte emitted at the pulse-delay frame offset.
    pub const fn byte(self) -> u8 {
        match self {
            PulseDelay::Standard => PULSE_DELAY_STD,
            PulseDelay::Off => PULSE_DELAY_OFF,
        }
    }

    /// Amplitude ceiling in mA imposed by this scheme.
    pub const fn amplitude_ceiling_ma(self) -> u8 {
        match self {
            PulseDelay::Standard => MAX_AMPLITUDE_STD_MA,
            PulseDelay::Off => MAX_AMPLITUDE_SIMULTANEOUS_MA,
        }
    }
}

impl TryFrom<u8> for PulseDelay {
    type Error = WireByteError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            PULSE_DELAY_STD => Ok(PulseDelay::Standard),
            PULSE_DELAY_OFF => Ok(PulseDelay::Off),
            other => Err(WireByteError::PulseDelay(other)),
        }
    }
}

/// Input the stimulator samples for sensor-triggered operation.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
pub enum SensorInput {
    /// The analog input (wire byte 0x00).
    #[default]
    AnalogInput,
    /// Digital sensor 1 (wire byte 0x01).
    Sensor1,
    /// Digital sensor 2 (wire byte 0x02).
    Sensor2,
}

impl SensorInput {
    /// The byte emitted at the sensor frame offset.
    pub const fn byte(self) -> u8 {
        match self {
            SensorInput::AnalogInput => 0x00,
            SensorInput::Sensor1 => 0x01,
            SensorInput::Sensor2 => 0x02,
        }
    }
}

impl TryFrom<u8> for SensorInput {
    type Error = WireByteError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(SensorInput::AnalogInput),
            0x01 => Ok(SensorInput::Sensor1),
            0x02 => Ok(SensorInput::Sensor2),
            other => Err(WireByteError::SensorInput(other)),
        }
    }
}

/// High-voltage control of the output stage.
///
/// All three values are documented protocol bytes and are emitted literally,
/// including [`DontChange`](HighVoltage::DontChange) (0x02), which leaves
/// the device's current high-voltage state untouched.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
pub enum HighVoltage {
    /// High voltage off (wire byte 0x00).
    #[default]
    Off,
    /// High voltage on (wire byte 0x01).
    On,
    /// Keep the device's current setting (wire byte 0x02).
    DontChange,
}

impl HighVoltage {
    /// The byte emitted at the high-voltage frame offset.
    pub const fn byte(self) -> u8 {
        match self {
            HighVoltage::Off => 0x00,
            HighVoltage::On => 0x01,
            HighVoltage::DontChange => 0x02,
        }
    }
}

impl TryFrom<u8> for HighVoltage {
    type Error = WireByteError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(HighVoltage::Off),
            0x01 => Ok(HighVoltage::On),
            0x02 => Ok(HighVoltage::DontChange),
            other => Err(WireByteError::HighVoltage(other)),
        }
    }
}

/// Default ramp-up times per channel in ms.
const RAMP_UP_DEFAULTS_MS: [u32; NUM_CHANNELS] = [1000, 750, 500, 250, 1000, 750, 500, 250];

/// Default ramp-down times per channel in ms.
const RAMP_DOWN_DEFAULTS_MS: [u32; NUM_CHANNELS] = [250, 500, 750, 1000, 250, 500, 750, 1000];

/// Shared scalar state for the eight stimulation channels and the global
/// stimulation knobs.
///
/// One instance is shared between exactly two contexts: the controller that
/// mutates parameters and the pacing context that builds frames (and, while
/// a channel ramps down, writes its activation back). All accessors take
/// `&self`; the struct is `Sync` and can live in a `static` or behind the
/// `timer-isr` global singleton.
#[derive(Debug)]
pub struct StimParams {
    /// Channel activation, CH1 at index 0.
    active: [AtomicBool; NUM_CHANNELS],
    /// Maximum amplitude per channel in mA.
    max_amp_ma: [AtomicU8; NUM_CHANNELS],
    /// Phase width per channel in wire units of 10 µs.
    phase_width: [AtomicU8; NUM_CHANNELS],
    /// Phase width per channel during BOOST, wire units of 10 µs.
    phase_width_boost: [AtomicU8; NUM_CHANNELS],
    /// Per-channel frequency divider.
    prescaler: [AtomicU8; NUM_CHANNELS],
    /// Per-channel ramp-up time in ms.
    ramp_up_ms: [AtomicU32; NUM_CHANNELS],
    /// Per-channel ramp-down time in ms.
    ramp_down_ms: [AtomicU32; NUM_CHANNELS],
    /// Stimulation frequency in Hz.
    freq_hz: AtomicU8,
    /// Stimulation frequency during BOOST in Hz.
    freq_boost_hz: AtomicU8,
    /// Stimulation period in ms, derived from the frequency.
    period_ms: AtomicU8,
    /// Stimulation period during BOOST in ms, derived.
    period_boost_ms: AtomicU8,
    /// Stimulation intensity in percent.
    intensity_pct: AtomicU8,
    /// Pulse-delay scheme, stored as 0 = standard, 1 = off.
    pulse_delay: AtomicU8,
    /// BOOST parameter set selected.
    boost_mode: AtomicBool,
    /// High-voltage control, stored as its wire byte.
    high_voltage: AtomicU8,
    /// Sensor-input selection, stored as its wire byte.
    sensor_input: AtomicU8,
    /// Doublet bitmask, bit 0 = CH1.
    doublet_mask: AtomicU8,
    /// Doublet inter-stimulus interval in units of 100 µs.
    doublet_isi: AtomicU8,
    /// Global ramp enable.
    ramping: AtomicBool,
    /// Envelope value a fresh ramp-up starts from, in percent.
    ramp_up_start_pct: AtomicU8,
    /// Envelope value a ramp-down runs out at, in percent.
    ramp_down_end_pct: AtomicU8,
}

impl StimParams {
    /// Creates a store with the device-session defaults: all channels
    /// inactive, 100 µs phase widths (BOOST set zeroed), 100 mA maximum
    /// amplitudes, 10 % intensity, 100 Hz / 10 ms in both parameter sets,
    /// standard pulse delay, high voltage off, analog sensor input,
    /// doublets off, prescalers 1, ramping enabled with start 25 % and
    /// end 50 %.
    pub fn new() -> Self {
        Self {
            active: [const { AtomicBool::new(false) }; NUM_CHANNELS],
            max_amp_ma: [const { AtomicU8::new(100) }; NUM_CHANNELS],
            phase_width: [const { AtomicU8::new(10) }; NUM_CHANNELS],
            phase_width_boost: [const { AtomicU8::new(0) }; NUM_CHANNELS],
            prescaler: [const { AtomicU8::new(1) }; NUM_CHANNELS],
            ramp_up_ms: RAMP_UP_DEFAULTS_MS.map(AtomicU32::new),
            ramp_down_ms: RAMP_DOWN_DEFAULTS_MS.map(AtomicU32::new),
            freq_hz: AtomicU8::new(100),
            freq_boost_hz: AtomicU8::new(100),
            period_ms: AtomicU8::new(10),
            period_boost_ms: AtomicU8::new(10),
            intensity_pct: AtomicU8::new(10),
            pulse_delay: AtomicU8::new(0),
            boost_mode: AtomicBool::new(false),
            high_voltage: AtomicU8::new(HighVoltage::Off.byte()),
            sensor_input: AtomicU8::new(SensorInput::AnalogInput.byte()),
            doublet_mask: AtomicU8::new(0),
            doublet_isi: AtomicU8::new(0),
            ramping: AtomicBool::new(true),
            ramp_up_start_pct: AtomicU8::new(25),
            ramp_down_end_pct: AtomicU8::new(50),
        }
    }

    /// Activates or deactivates the eight channels, CH1 at index 0.
    pub fn set_active_channels(&self, states: [bool; NUM_CHANNELS]) {
        for (cell, state) in self.active.iter().zip(states) {
            cell.store(state, Ordering::Relaxed);
        }
    }

    /// Returns the activation state of the eight channels.
    ///
    /// While a channel ramps down this reads true even though the caller
    /// has deactivated it: the engine keeps the channel firing until the
    /// ramp runs out.
    pub fn active_channels(&self) -> [bool; NUM_CHANNELS] {
        core::array::from_fn(|ch| self.active[ch].load(Ordering::Relaxed))
    }

    /// Activation state of a single channel (0-based index).
    pub fn channel_active(&self, channel: usize) -> bool {
        self.active[channel].load(Ordering::Relaxed)
    }

    /// Raw activation write used by the ramp engine to hold a channel
    /// firing through its down-ramp and release it afterwards.
    pub(crate) fn store_channel_active(&self, channel: usize, state: bool) {
        self.active[channel].store(state, Ordering::Relaxed);
    }

    /// Sets the phase width of each channel in µs, clamped to 0..=1000 and
    /// stored in wire units of 10 µs.
    pub fn set_phase_widths(&self, widths_us: [u16; NUM_CHANNELS]) {
        for (cell, width) in self.phase_width.iter().zip(widths_us) {
            cell.store((width.min(MAX_PHASE_WIDTH_US) / 10) as u8, Ordering::Relaxed);
        }
    }

    /// Sets the phase width of each channel during BOOST in µs, clamped to
    /// 0..=1000 and stored in wire units of 10 µs.
    pub fn set_phase_widths_boost(&self, widths_us: [u16; NUM_CHANNELS]) {
        for (cell, width) in self.phase_width_boost.iter().zip(widths_us) {
            cell.store((width.min(MAX_PHASE_WIDTH_US) / 10) as u8, Ordering::Relaxed);
        }
    }

    /// Returns the phase widths in µs.
    pub fn phase_widths(&self) -> [u16; NUM_CHANNELS] {
        core::array::from_fn(|ch| self.phase_width[ch].load(Ordering::Relaxed) as u16 * 10)
    }

    /// Returns the BOOST phase widths in µs.
    pub fn phase_widths_boost(&self) -> [u16; NUM_CHANNELS] {
        core::array::from_fn(|ch| self.phase_width_boost[ch].load(Ordering::Relaxed) as u16 * 10)
    }

    /// Phase-width wire bytes (units of 10 µs) for the frame builder.
    pub(crate) fn phase_width_bytes(&self) -> [u8; NUM_CHANNELS] {
        core::array::from_fn(|ch| self.phase_width[ch].load(Ordering::Relaxed))
    }

    /// BOOST phase-width wire bytes (units of 10 µs) for the frame builder.
    pub(crate) fn phase_width_bytes_boost(&self) -> [u8; NUM_CHANNELS] {
        core::array::from_fn(|ch| self.phase_width_boost[ch].load(Ordering::Relaxed))
    }

    /// Sets the maximum amplitude of each channel in mA, saturated at the
    /// ceiling of the current pulse-delay scheme (170 mA staggered, 100 mA
    /// simultaneous).
    pub fn set_max_amplitudes(&self, amplitudes_ma: [u8; NUM_CHANNELS]) {
        let ceiling = self.pulse_delay().amplitude_ceiling_ma();
        for (cell, amp) in self.max_amp_ma.iter().zip(amplitudes_ma) {
            cell.store(amp.min(ceiling), Ordering::Relaxed);
        }
    }

    /// Returns the maximum amplitudes in mA.
    pub fn max_amplitudes(&self) -> [u8; NUM_CHANNELS] {
        core::array::from_fn(|ch| self.max_amp_ma[ch].load(Ordering::Relaxed))
    }

    /// Sets the stimulation intensity for all channels in percent, clamped
    /// to 0..=100.
    pub fn set_intensity(&self, intensity_pct: u8) {
        self.intensity_pct.store(intensity_pct.min(100), Ordering::Relaxed);
    }

    /// Returns the stimulation intensity in percent.
    pub fn intensity(&self) -> u8 {
        self.intensity_pct.load(Ordering::Relaxed)
    }

    /// Selects the pulse-delay scheme.
    ///
    /// Switching to [`PulseDelay::Off`] lowers the amplitude ceiling to
    /// 100 mA; stored maximum amplitudes above the new ceiling are clamped
    /// down so the safety envelope holds the moment this returns.
    pub fn set_pulse_delay(&self, delay: PulseDelay) {
        self.pulse_delay.store(
            match delay {
                PulseDelay::Standard => 0,
                PulseDelay::Off => 1,
            },
            Ordering::Relaxed,
        );
        let ceiling = delay.amplitude_ceiling_ma();
        for cell in &self.max_amp_ma {
            let amp = cell.load(Ordering::Relaxed);
            if amp > ceiling {
                cell.store(ceiling, Ordering::Relaxed);
            }
        }
    }

    /// Returns the pulse-delay scheme.
    pub fn pulse_delay(&self) -> PulseDelay {
        match self.pulse_delay.load(Ordering::Relaxed) {
            0 => PulseDelay::Standard,
            _ => PulseDelay::Off,
        }
    }

    /// Sets the high-voltage control value.
    pub fn set_high_voltage(&self, high_voltage: HighVoltage) {
        self.high_voltage.store(high_voltage.byte(), Ordering::Relaxed);
    }

    /// Returns the high-voltage control value.
    pub fn high_voltage(&self) -> HighVoltage {
        match self.high_voltage.load(Ordering::Relaxed) {
            0x00 => HighVoltage::Off,
            0x01 => HighVoltage::On,
            _ => HighVoltage::DontChange,
        }
    }

    /// Selects between the normal and the BOOST parameter set (frequency
    /// and phase widths).
    pub fn set_boost_mode(&self, boost: bool) {
        self.boost_mode.store(boost, Ordering::Relaxed);
    }

    /// Whether the BOOST parameter set is selected.
    pub fn boost_mode(&self) -> bool {
        self.boost_mode.load(Ordering::Relaxed)
    }

    /// Sets a new stimulation frequency in Hz, clamped to 1..=100, and
    /// recomputes the stored period `clamp(round(1000/f), 10, 254)`.
    pub fn set_stim_frequency(&self, freq_hz: u8) {
        let freq = freq_hz.clamp(MIN_FREQUENCY_HZ, MAX_FREQUENCY_HZ);
        self.freq_hz.store(freq, Ordering::Relaxed);
        self.period_ms.store(derive_period_ms(freq), Ordering::Relaxed);
    }

    /// Sets the stimulation frequency during BOOST in Hz, clamped to
    /// 1..=100, and recomputes the stored BOOST period.
    pub fn set_stim_frequency_boost(&self, freq_hz: u8) {
        let freq = freq_hz.clamp(MIN_FREQUENCY_HZ, MAX_FREQUENCY_HZ);
        self.freq_boost_hz.store(freq, Ordering::Relaxed);
        self.period_boost_ms.store(derive_period_ms(freq), Ordering::Relaxed);
    }

    /// Returns the stimulation frequency in Hz.
    pub fn frequency(&self) -> u8 {
        self.freq_hz.load(Ordering::Relaxed)
    }

    /// Returns the stimulation frequency during BOOST in Hz.
    pub fn frequency_boost(&self) -> u8 {
        self.freq_boost_hz.load(Ordering::Relaxed)
    }

    /// Returns the stimulation period in ms.
    pub fn period_ms(&self) -> u8 {
        self.period_ms.load(Ordering::Relaxed)
    }

    /// Returns the stimulation period during BOOST in ms.
    pub fn period_boost_ms(&self) -> u8 {
        self.period_boost_ms.load(Ordering::Relaxed)
    }

    /// Returns the stimulation period in seconds (1/f of whichever
    /// parameter set is selected).
    pub fn stim_period_s(&self) -> f32 {
        if self.boost_mode() {
            1.0 / self.frequency_boost() as f32
        } else {
            1.0 / self.frequency() as f32
        }
    }

    /// Enables doublets on the flagged channels, CH1 at index 0. The mask
    /// byte carries bit i for channel i+1.
    pub fn set_doublets(&self, flags: [bool; NUM_CHANNELS]) {
        let mut mask = 0u8;
        for (ch, flag) in flags.iter().enumerate() {
            if *flag {
                mask |= 1 << ch;
            }
        }
        self.doublet_mask.store(mask, Ordering::Relaxed);
    }

    /// Returns the doublet bitmask, bit 0 = CH1.
    pub fn doublet_mask(&self) -> u8 {
        self.doublet_mask.load(Ordering::Relaxed)
    }

    /// Sets the doublet inter-stimulus interval in units of 100 µs,
    /// saturated into the device domain 27..=100 (2.7..10 ms).
    pub fn set_doublet_isi(&self, isi: u8) {
        self.doublet_isi.store(isi.clamp(MIN_DOUBLET_ISI, MAX_DOUBLET_ISI), Ordering::Relaxed);
    }

    /// Returns the doublet inter-stimulus interval in units of 100 µs.
    pub fn doublet_isi(&self) -> u8 {
        self.doublet_isi.load(Ordering::Relaxed)
    }

    /// Selects the sensor input.
    pub fn set_sensor_input(&self, sensor: SensorInput) {
        self.sensor_input.store(sensor.byte(), Ordering::Relaxed);
    }

    /// Returns the selected sensor input.
    pub fn sensor_input(&self) -> SensorInput {
        match self.sensor_input.load(Ordering::Relaxed) {
            0x00 => SensorInput::AnalogInput,
            0x01 => SensorInput::Sensor1,
            _ => SensorInput::Sensor2,
        }
    }

    /// Sets the per-channel frequency prescalers. A prescaler divides the
    /// stimulation frequency for its channel; 0 is not a valid divider and
    /// saturates to 1.
    pub fn set_prescalers(&self, prescalers: [u8; NUM_CHANNELS]) {
        for (cell, prescaler) in self.prescaler.iter().zip(prescalers) {
            cell.store(prescaler.max(1), Ordering::Relaxed);
        }
    }

    /// Returns the per-channel frequency prescalers.
    pub fn prescalers(&self) -> [u8; NUM_CHANNELS] {
        core::array::from_fn(|ch| self.prescaler[ch].load(Ordering::Relaxed))
    }

    /// Sets the per-channel ramp-up times in ms.
    pub fn set_ramp_up_times(&self, times_ms: [u32; NUM_CHANNELS]) {
        for (cell, time) in self.ramp_up_ms.iter().zip(times_ms) {
            cell.store(time, Ordering::Relaxed);
        }
    }

    /// Returns the per-channel ramp-up times in ms.
    pub fn ramp_up_times(&self) -> [u32; NUM_CHANNELS] {
        core::array::from_fn(|ch| self.ramp_up_ms[ch].load(Ordering::Relaxed))
    }

    /// Sets the per-channel ramp-down times in ms.
    pub fn set_ramp_down_times(&self, times_ms: [u32; NUM_CHANNELS]) {
        for (cell, time) in self.ramp_down_ms.iter().zip(times_ms) {
            cell.store(time, Ordering::Relaxed);
        }
    }

    /// Returns the per-channel ramp-down times in ms.
    pub fn ramp_down_times(&self) -> [u32; NUM_CHANNELS] {
        core::array::from_fn(|ch| self.ramp_down_ms[ch].load(Ordering::Relaxed))
    }

    /// Sets the envelope value a fresh ramp-up starts from, in percent,
    /// clamped to 0..=100.
    pub fn set_ramp_up_start(&self, start_pct: u8) {
        self.ramp_up_start_pct.store(start_pct.min(100), Ordering::Relaxed);
    }

    /// Returns the ramp-up start value in percent.
    pub fn ramp_up_start(&self) -> u8 {
        self.ramp_up_start_pct.load(Ordering::Relaxed)
    }

    /// Sets the envelope value a ramp-down runs out at, in percent, clamped
    /// to 0..=100.
    pub fn set_ramp_down_end(&self, end_pct: u8) {
        self.ramp_down_end_pct.store(end_pct.min(100), Ordering::Relaxed);
    }

    /// Returns the ramp-down end value in percent.
    pub fn ramp_down_end(&self) -> u8 {
        self.ramp_down_end_pct.load(Ordering::Relaxed)
    }

    /// Enables or disables the ramp engine globally. With ramping disabled
    /// amplitudes follow the channel activation directly.
    pub fn set_ramping_enabled(&self, enabled: bool) {
        self.ramping.store(enabled, Ordering::Relaxed);
    }

    /// Whether the ramp engine is enabled.
    pub fn ramping_enabled(&self) -> bool {
        self.ramping.load(Ordering::Relaxed)
    }
}

impl Default for StimParams {
    fn default() -> Self {
        Self::new()
    }
}

/// Stimulation period in ms for a frequency already clamped to 1..=100 Hz:
/// `clamp(round(1000/f), 10, 254)`.
fn derive_period_ms(freq_hz: u8) -> u8 {
    let period = roundf(1000.0 / freq_hz as f32);
    period.clamp(MIN_PERIOD_MS as f32, MAX_PERIOD_MS as f32) as u8
}
