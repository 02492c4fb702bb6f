//! Per-channel amplitude ramping for the stimulation engine.
//!
//! This module implements the envelope state machine that shapes a
//! channel's amplitude when it is switched on or off. Instead of jumping
//! between 0 % and 100 % of the configured maximum amplitude, a channel
//! walks a linear ramp: upwards from a configurable start value when it is
//! activated, downwards to a configurable end value when it is
//! deactivated. While a channel ramps down the engine keeps it firing —
//! the caller has already marked it inactive, but pulses continue with
//! decreasing amplitude until the ramp runs out, at which point the engine
//! deactivates the channel itself.
//!
//! The time base is the pulse count, not the wall clock: the machine
//! advances exactly once per emitted frame, and the number of ramp steps is
//! `frequency · ramp_time / 1000`. A caller that paces frames slower than
//! the stimulation period stretches every ramp proportionally.

use crate::params::StimParams;
use libm::floorf;

/// Direction a channel's envelope is currently moving in.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
pub enum RampDirection {
    /// Not ramping: the envelope sits at 0 % or 100 % depending on the
    /// channel activation.
    #[default]
    None,
    /// Walking up towards 100 % after an activation.
    Up,
    /// Walking down towards the configured end value after a deactivation.
    Down,
}

/// Envelope state machine of a single stimulation channel.
///
/// Eight instances live in [`StimDriver`](crate::driver::StimDriver), one
/// per channel; each advances once per emitted pulse via
/// [`advance`](ChannelRamp::advance) and exposes the current envelope value
/// through [`level_pct`](ChannelRamp::level_pct).
#[derive(Clone, Copy, Default, Debug)]
pub struct ChannelRamp {
    /// Current envelope value in percent of the channel's maximum
    /// amplitude. Always within 0..=100 after an update.
    pub(crate) level: f32,

    /// Which way the envelope is moving this pulse.
    pub(crate) direction: RampDirection,

    /// Number of ramp steps taken since the ramp was (re)started.
    ///
    /// Zero whenever no ramp is in progress; the first call of a ramp uses
    /// it to compute the step height before stepping.
    pub(crate) counter: u32,

    /// Envelope value the running ramp was started from, in percent.
    pub(crate) offset: f32,

    /// Step height per pulse of the running ramp, in percent. Negative
    /// while ramping down.
    pub(crate) factor: f32,

    /// Channel activation as observed by the previous pulse.
    ///
    /// Compared against the current activation to detect switching edges.
    pub(crate) old_state: bool,

    /// Channel activation captured at the start of the current pulse.
    pub(crate) new_state: bool,
}

impl ChannelRamp {
    /// Creates a settled, inactive envelope (level 0, no ramp running).
    pub fn new() -> Self {
        Self::default()
    }

    /// Current envelope value in percent (0..=100).
    pub fn level_pct(&self) -> f32 {
        self.level
    }

    /// Which way the envelope is currently moving.
    pub fn direction(&self) -> RampDirection {
        self.direction
    }

    /// Advances the envelope by one pulse.
    ///
    /// Reads the channel activation from the store, decides the ramp
    /// direction from the activation edge and the previous direction, and
    /// steps the envelope. Must be called exactly once per emitted frame;
    /// the frame builder does this for every channel while ramping is
    /// globally enabled.
    ///
    /// While ramping down this re-asserts the channel active in `params`
    /// so the pulse still fires; [`finish_pulse`](ChannelRamp::finish_pulse)
    /// clears it again after the frame is built.
    pub fn advance(&mut self, channel: usize, params: &StimParams) {
        self.new_state = params.channel_active(channel);

        // Direction banks. They run in order and each reads the direction
        // as left by the previous one, so an earlier write can disarm a
        // later predicate.
        if (!self.new_state && !self.old_state && self.direction != RampDirection::Down)
            || (self.new_state && self.old_state && self.direction != RampDirection::Up)
            || self.direction == RampDirection::None
        {
            self.direction = RampDirection::None;
        }
        if (self.new_state && !self.old_state) || self.direction == RampDirection::Up {
            self.direction = RampDirection::Up;
        }
        if (!self.new_state && self.old_state) || self.direction == RampDirection::Down {
            self.direction = RampDirection::Down;
        }

        match self.direction {
            RampDirection::None => {
                // Settled: full envelope when active, none when not.
                self.level = if params.channel_active(channel) { 100.0 } else { 0.0 };
            }
            RampDirection::Up => {
                if self.new_state && !self.old_state {
                    self.counter = 0;
                }
                self.ramp_up(channel, params);
            }
            RampDirection::Down => {
                if !self.new_state && self.old_state {
                    self.counter = 0;
                }
                self.ramp_down(channel, params);
            }
        }
    }

    /// Completes the pulse after the frame has been built: channels still
    /// ramping down are released back to inactive (the next
    /// [`advance`](ChannelRamp::advance) re-asserts them), and the observed
    /// activation becomes the comparison state for the next pulse.
    pub(crate) fn finish_pulse(&mut self, channel: usize, params: &StimParams) {
        if self.direction == RampDirection::Down {
            params.store_channel_active(channel, false);
        }
        self.old_state = self.new_state;
    }

    fn ramp_up(&mut self, channel: usize, params: &StimParams) {
        let start = params.ramp_up_start() as f32;
        if self.counter == 0 {
            // First pulse of this ramp: derive the step height from the
            // number of pulses the configured ramp time spans.
            let n = params.frequency() as f32 * params.ramp_up_times()[channel] as f32 / 1000.0;
            if self.level < start {
                self.offset = start;
                self.factor = (100.0 - self.offset) / n;
                self.level = start;
                self.counter = 1;
            } else if self.level >= 100.0 {
                self.level = 100.0;
                self.counter = 0;
                self.direction = RampDirection::None;
            } else {
                // Resuming from somewhere mid-envelope, e.g. a reactivation
                // during a down-ramp.
                self.offset = floorf(self.level);
                self.factor = (100.0 - self.offset) / n;
                self.counter = 1;
            }
        } else if self.level < start {
            self.level = start;
            self.counter = 1;
        } else if self.level >= 100.0 {
            self.level = 100.0;
            self.counter = 0;
            self.direction = RampDirection::None;
        } else {
            self.level = self.factor * self.counter as f32 + self.offset;
            self.counter += 1;
        }

        if self.level >= 100.0 {
            self.level = 100.0;
            self.counter = 0;
            self.direction = RampDirection::None;
        }
    }

    fn ramp_down(&mut self, channel: usize, params: &StimParams) {
        let end = params.ramp_down_end() as f32;
        if self.counter == 0 {
            let n = params.frequency() as f32 * params.ramp_down_times()[channel] as f32 / 1000.0;
            if self.level > 100.0 {
                self.offset = 100.0;
                self.factor = (end - self.offset) / n;
                self.level = self.offset;
                self.counter = 1;
                // The caller already deactivated the channel; hold it
                // firing until the ramp runs out.
                params.store_channel_active(channel, true);
            } else if self.level <= end {
                // Already at or below the end value, nothing to walk down.
                self.level = end;
                self.counter = 0;
                self.direction = RampDirection::None;
                params.store_channel_active(channel, true);
            } else {
                self.offset = floorf(self.level);
                self.factor = (end - self.offset) / n;
                self.counter = 1;
                params.store_channel_active(channel, true);
            }
        } else if self.level > 100.0 {
            self.level = 100.0;
            self.counter = 1;
            params.store_channel_active(channel, true);
        } else if self.level < end {
            self.level = end;
            self.counter = 0;
            self.direction = RampDirection::None;
        } else {
            self.level = self.factor * self.counter as f32 + self.offset;
            self.counter += 1;
            params.store_channel_active(channel, true);
        }

        if self.level < end {
            // Ran out: drop the envelope and let go of the channel.
            self.level = 0.0;
            self.counter = 0;
            self.direction = RampDirection::None;
            params.store_channel_active(channel, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CH: usize = 0;

    fn active_params(freq_hz: u8) -> StimParams {
        let params = StimParams::new();
        params.set_stim_frequency(freq_hz);
        params.set_active_channels([true, false, false, false, false, false, false, false]);
        params
    }

    fn pulse(ramp: &mut ChannelRamp, params: &StimParams) {
        ramp.advance(CH, params);
        ramp.finish_pulse(CH, params);
    }

    #[test]
    fn test_inactive_channel_stays_settled() {
        let params = StimParams::new();
        let mut ramp = ChannelRamp::new();
        for _ in 0..5 {
            pulse(&mut ramp, &params);
            assert_eq!(ramp.level_pct(), 0.0);
            assert_eq!(ramp.direction(), RampDirection::None);
            assert_eq!(ramp.counter, 0);
        }
    }

    #[test]
    fn test_ramp_up_starts_at_start_value() {
        // 20 Hz and 1000 ms ramp-up: 20 steps from 25 % to 100 %
        let params = active_params(20);
        let mut ramp = ChannelRamp::new();

        pulse(&mut ramp, &params);
        assert_eq!(ramp.direction(), RampDirection::Up);
        assert_eq!(ramp.level_pct(), 25.0);
    }

    #[test]
    fn test_ramp_up_reaches_full_envelope_after_n_pulses() {
        let params = active_params(20);
        let mut ramp = ChannelRamp::new();

        for _ in 0..21 {
            pulse(&mut ramp, &params);
            assert!(ramp.level_pct() >= 0.0 && ramp.level_pct() <= 100.0);
        }
        assert_eq!(ramp.level_pct(), 100.0);
        assert_eq!(ramp.direction(), RampDirection::None);
        assert_eq!(ramp.counter, 0);
    }

    #[test]
    fn test_ramp_up_steps_linearly() {
        let params = active_params(20);
        let mut ramp = ChannelRamp::new();

        pulse(&mut ramp, &params); // 25
        pulse(&mut ramp, &params);
        // step height (100 - 25) / 20 = 3.75
        assert_eq!(ramp.level_pct(), 28.75);
        pulse(&mut ramp, &params);
        assert_eq!(ramp.level_pct(), 32.5);
    }

    #[test]
    fn test_settled_active_channel_holds_full_envelope() {
        let params = active_params(20);
        let mut ramp = ChannelRamp::new();
        for _ in 0..25 {
            pulse(&mut ramp, &params);
        }
        assert_eq!(ramp.level_pct(), 100.0);
        assert_eq!(ramp.direction(), RampDirection::None);
    }

    #[test]
    fn test_ramp_down_holds_channel_firing() {
        // 20 Hz and 250 ms ramp-down: 5 steps from 100 % to 50 %
        let params = active_params(20);
        let mut ramp = ChannelRamp::new();
        for _ in 0..25 {
            pulse(&mut ramp, &params);
        }

        params.set_active_channels([false; 8]);
        ramp.advance(CH, &params);
        // First down pulse still fires at the full envelope
        assert_eq!(ramp.direction(), RampDirection::Down);
        assert_eq!(ramp.level_pct(), 100.0);
        assert!(params.channel_active(CH));
        ramp.finish_pulse(CH, &params);
        assert!(!params.channel_active(CH));
    }

    #[test]
    fn test_ramp_down_descends_and_releases_channel() {
        let params = active_params(20);
        let mut ramp = ChannelRamp::new();
        for _ in 0..25 {
            pulse(&mut ramp, &params);
        }

        params.set_active_channels([false; 8]);
        let mut last = 100.0;
        loop {
            ramp.advance(CH, &params);
            let level = ramp.level_pct();
            assert!(level <= last);
            last = level;
            if ramp.direction() == RampDirection::None {
                break;
            }
            ramp.finish_pulse(CH, &params);
        }
        // Completion zeroes the envelope and deactivates the channel
        assert_eq!(ramp.level_pct(), 0.0);
        assert_eq!(ramp.counter, 0);
        assert!(!params.channel_active(CH));
    }

    #[test]
    fn test_ramp_down_step_height() {
        let params = active_params(20);
        let mut ramp = ChannelRamp::new();
        for _ in 0..25 {
            pulse(&mut ramp, &params);
        }

        params.set_active_channels([false; 8]);
        pulse(&mut ramp, &params); // holds 100, computes factor (50-100)/5
        pulse(&mut ramp, &params);
        assert_eq!(ramp.level_pct(), 90.0);
        pulse(&mut ramp, &params);
        assert_eq!(ramp.level_pct(), 80.0);
    }

    #[test]
    fn test_reactivation_during_down_ramp_resumes_upwards() {
        let params = active_params(20);
        let mut ramp = ChannelRamp::new();
        for _ in 0..25 {
            pulse(&mut ramp, &params);
        }

        params.set_active_channels([false; 8]);
        for _ in 0..3 {
            pulse(&mut ramp, &params);
        }
        let resumed_from = ramp.level_pct();
        assert!(resumed_from < 100.0 && resumed_from > 50.0);

        params.set_active_channels([true, false, false, false, false, false, false, false]);
        pulse(&mut ramp, &params);
        assert_eq!(ramp.direction(), RampDirection::Up);
        assert!(ramp.level_pct() >= resumed_from - 1.0);
        for _ in 0..30 {
            pulse(&mut ramp, &params);
        }
        assert_eq!(ramp.level_pct(), 100.0);
    }

    #[test]
    fn test_deactivation_below_end_value_clamps_to_end() {
        let params = active_params(20);
        params.set_ramp_down_end(50);
        let mut ramp = ChannelRamp::new();

        // Walk partway up, to below the down-ramp end value
        for _ in 0..3 {
            pulse(&mut ramp, &params);
        }
        assert!(ramp.level_pct() < 50.0);

        params.set_active_channels([false; 8]);
        ramp.advance(CH, &params);
        // Clamped straight to the end value, no ramp left to walk; the
        // channel is re-asserted active and fires this pulse
        assert_eq!(ramp.level_pct(), 50.0);
        assert_eq!(ramp.direction(), RampDirection::None);
        assert_eq!(ramp.counter, 0);
        assert!(params.channel_active(CH));
    }

    #[test]
    fn test_direction_none_always_has_zero_counter() {
        let params = active_params(20);
        let mut ramp = ChannelRamp::new();

        for step in 0..120 {
            // Toggle the channel every 17 pulses to exercise every edge
            if step % 17 == 0 {
                let on = (step / 17) % 2 == 1;
                params.set_active_channels([on, false, false, false, false, false, false, false]);
            }
            pulse(&mut ramp, &params);
            assert!(ramp.level_pct() >= 0.0 && ramp.level_pct() <= 100.0);
            if ramp.direction() == RampDirection::None {
                assert_eq!(ramp.counter, 0);
            }
        }
    }
}
