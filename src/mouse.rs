//! Mouse motion classifier (C5).
//!
//! Two independent detectors share one velocity pipeline:
//!
//! - **Acceleration-event timing**: a contiguous run of same-sign raw
//!   acceleration above threshold is an "event"; an event shorter than
//!   [`Config::MIN_ACCEL_TIME_MS`] is faster than any human hand and trips
//!   a lockout.
//! - **Constant-acceleration detection**: a sliding window of smoothed
//!   velocities whose derivative (smoothed acceleration) stays within a
//!   relative tolerance band run after run indicates a mechanically
//!   generated ramp. The shipped source computes this but ships with the
//!   resulting lockout check commented out; see [`Config::CONSTANT_ACCEL_LOCKOUT_ENABLED`].

use core::marker::PhantomData;

use crate::config::Config;
use crate::lockout::{LedSink, LockoutController};
use crate::log::warn;

/// Sign of an in-progress acceleration event. `None` means no event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum AccelPolarity {
    None,
    Positive,
    Negative,
}

/// Mouse motion classifier. `VEL_HIST_SIZE` sizes the velocity window and
/// must be even (the smoothing step splits it into two equal halves).
pub struct MouseDetector<C, const VEL_HIST_SIZE: usize> {
    previous_raw_velocity: u32,
    last_mouse_move_time: u32,

    accel_polarity: AccelPolarity,
    accel_event_start: u32,

    velocity_history: [u32; VEL_HIST_SIZE],
    previous_smoothed_acceleration: i32,
    constant_acceleration_counter: u8,

    _config: PhantomData<C>,
}

impl<C: Config, const VEL_HIST_SIZE: usize> MouseDetector<C, VEL_HIST_SIZE> {
    pub const fn new() -> Self {
        MouseDetector {
            previous_raw_velocity: 0,
            last_mouse_move_time: 0,
            accel_polarity: AccelPolarity::None,
            accel_event_start: 0,
            velocity_history: [0; VEL_HIST_SIZE],
            previous_smoothed_acceleration: 0,
            constant_acceleration_counter: 0,
            _config: PhantomData,
        }
    }

    /// Current value of the constant-acceleration run counter, exposed for
    /// diagnostics/tests.
    pub fn constant_acceleration_counter(&self) -> u8 {
        self.constant_acceleration_counter
    }

    /// Process one inbound 4-byte mouse report (`[buttons, dX, dY,
    /// reserved]`), mutating it in place for the host.
    pub fn on_report<L: LedSink>(
        &mut self,
        now: u32,
        report: &mut [u8; 4],
        lockout: &LockoutController<C>,
        led: &mut L,
    ) {
        let dx = report[1] as i8 as i32;
        let dy = report[2] as i8 as i32;
        let magnitude = libm::sqrtf((dx * dx + dy * dy) as f32);
        let raw_velocity = libm::roundf(magnitude * C::VEL_MULT as f32) as u32;

        let mut move_delay = (now.wrapping_sub(self.last_mouse_move_time)
            .wrapping_add(C::HID_POLL_INTERVAL_MS / 2))
            / C::HID_POLL_INTERVAL_MS;

        if move_delay > C::MOVE_DELAY_LIMIT {
            move_delay = C::MOVE_DELAY_LIMIT;
            self.previous_raw_velocity = 0;
            if self.accel_polarity != AccelPolarity::None {
                let stop_time = self.last_mouse_move_time;
                self.accel_event_stop(stop_time, lockout, led);
            }
        }

        let raw_acceleration = raw_velocity as i32 - self.previous_raw_velocity as i32;
        self.previous_raw_velocity = raw_velocity;
        // moveDelay is computed from elapsed time and can legitimately be 0
        // when two reports land inside the same poll interval; the shipped
        // source divides unconditionally here, which is undefined once
        // moveDelay is 0. Flooring it at 1 keeps this total while changing
        // nothing for any report spacing the original handles cleanly.
        let velocity = raw_velocity / move_delay.max(1);

        match self.accel_polarity {
            AccelPolarity::None => {
                if raw_acceleration.abs() > C::ACCEL_EVENT_THRESHOLD {
                    self.accel_event_start(now, raw_acceleration);
                }
            }
            AccelPolarity::Positive if raw_acceleration < -C::ACCEL_EVENT_THRESHOLD => {
                self.accel_event_stop(now, lockout, led);
                self.accel_event_start(now, raw_acceleration);
            }
            AccelPolarity::Negative if raw_acceleration > C::ACCEL_EVENT_THRESHOLD => {
                self.accel_event_stop(now, lockout, led);
                self.accel_event_start(now, raw_acceleration);
            }
            _ => {}
        }

        if velocity != 0 {
            self.last_mouse_move_time = now;
            for i in (1..VEL_HIST_SIZE).rev() {
                self.velocity_history[i] = self.velocity_history[i - 1];
            }
            self.velocity_history[0] = velocity;

            if self.velocity_history[VEL_HIST_SIZE - 1] > 0 {
                self.update_constant_acceleration(lockout, led);
            }
        } else {
            report[1] = 0;
            report[2] = 0;
        }

        if lockout.is_host_suppressed() {
            *report = [0; 4];
        }
    }

    fn accel_event_start(&mut self, now: u32, raw_acceleration: i32) {
        self.accel_event_start = now;
        self.accel_polarity = if raw_acceleration > 0 {
            AccelPolarity::Positive
        } else {
            AccelPolarity::Negative
        };
    }

    /// `stop_time` is the moment motion actually stopped, which on the
    /// quiescence path is `LastMouseMoveTime`, not `now` — the event's
    /// duration must reflect motion time, not idle time.
    fn accel_event_stop<L: LedSink>(&mut self, stop_time: u32, lockout: &LockoutController<C>, led: &mut L) {
        if stop_time.wrapping_sub(self.accel_event_start) < C::MIN_ACCEL_TIME_MS {
            warn!("hid-botdetect: mouse acceleration event shorter than plausible");
            if lockout.trigger(led) {
                self.velocity_history = [0; VEL_HIST_SIZE];
                self.constant_acceleration_counter = 0;
            }
        }
        self.accel_polarity = AccelPolarity::None;
    }

    fn update_constant_acceleration<L: LedSink>(&mut self, lockout: &LockoutController<C>, led: &mut L) {
        let half = VEL_HIST_SIZE / 2;
        let new_sum: u32 = self.velocity_history[..half].iter().sum();
        let old_sum: u32 = self.velocity_history[half..].iter().sum();
        let new_smoothed = (new_sum * 8) / half as u32;
        let old_smoothed = (old_sum * 8) / half as u32;

        let new_smoothed_acceleration = new_smoothed as i32 - old_smoothed as i32;
        let match_error = (old_smoothed * C::VEL_MATCH_ERROR / C::VEL_MATCH_BASE) as i32;

        let within_tolerance = new_smoothed_acceleration
            >= self.previous_smoothed_acceleration - match_error
            && new_smoothed_acceleration <= self.previous_smoothed_acceleration + match_error;

        if within_tolerance {
            self.constant_acceleration_counter = self.constant_acceleration_counter.saturating_add(1);
            if C::CONSTANT_ACCEL_LOCKOUT_ENABLED
                && self.constant_acceleration_counter > C::CONSTANT_ACCEL_LOCKOUT_THRESHOLD
            {
                if lockout.trigger(led) {
                    self.velocity_history = [0; VEL_HIST_SIZE];
                    self.constant_acceleration_counter = 0;
                }
            }
        } else {
            self.constant_acceleration_counter = 0;
        }
        self.previous_smoothed_acceleration = new_smoothed_acceleration;
    }
}

impl<C: Config, const VEL_HIST_SIZE: usize> Default for MouseDetector<C, VEL_HIST_SIZE> {
    fn default() -> Self {
        Self::new()
    }
}
