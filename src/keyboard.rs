//! Keyboard event extraction (C3) and timing classification (C4).
//!
//! An 8-byte HID boot-protocol keyboard report is diffed against a shadow
//! copy of the previous report to produce [`KeyEvent`]s, which are then fed
//! into a pair of two-band histograms (one for inter-keydown delay, one for
//! per-key downtime) that together decide whether the input stream looks
//! human.
//!
//! # Invariants
//!
//! At most one [`KeyRecord`] is live per currently-held key. A key-down
//! reserves a free slot in the timer log; the matching key-up releases it.
//! Running out of slots on a key-down, or failing to find the matching slot
//! on a key-up, can only happen if [`KeyboardDetector`]'s `MAX_ACTIVE_KEYS`
//! is smaller than the report semantics allow, or if a caller feeds reports
//! that violate HID boot-protocol rules (duplicate codes in the key array,
//! etc). Either way it is unrecoverable here: see [`crate::fatal`].

use core::marker::PhantomData;

use usbd_human_interface_device::page::Keyboard;

use crate::config::Config;
use crate::fatal::invariant_violation;
use crate::lockout::{LedSink, LockoutController};
use crate::log::warn;

/// HID usage ID marking an unfilled key-array slot, and the `KeyTimerLog`
/// "free" sentinel.
const KEY_NONE: u8 = Keyboard::NoEventIndicated as u8;
/// HID rollover sentinel: "too many keys held down to report".
const KEY_ROLLOVER: u8 = Keyboard::ErrorRollOver as u8;
/// First regular (non-modifier) keycode. Anything below this in the key
/// array is a reserved/error code and is ignored.
const KEY_A: u8 = Keyboard::A as u8;
/// Usage ID of the first modifier bit (byte 0, bit 0: left control).
/// Synthetic keycodes for the 8 modifier bits are `MODIFIER_BASE + i`,
/// which lands exactly on the real HID modifier usage IDs.
const MODIFIER_BASE: u8 = Keyboard::LeftControl as u8;

/// A key transition derived from diffing two reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyEvent {
    Down(u8),
    Up(u8),
}

/// One active-key timer slot. `key_code == KEY_NONE` marks it free.
#[derive(Debug, Clone, Copy)]
struct KeyRecord {
    key_code: u8,
    key_down_start: u32,
}

impl KeyRecord {
    const FREE: KeyRecord = KeyRecord {
        key_code: KEY_NONE,
        key_down_start: 0,
    };
}

/// Keyboard event extractor + timing classifier (C3 + C4).
///
/// `FAST_BINS`/`SLOW_BINS` size the delay/downtime histograms;
/// `MAX_ACTIVE_KEYS` sizes the active-key timer log (must be at least 14:
/// 8 modifier bits + 6 key-array slots).
pub struct KeyboardDetector<C, const FAST_BINS: usize, const SLOW_BINS: usize, const MAX_ACTIVE_KEYS: usize>
{
    shadow: [u8; 8],
    key_timer_log: [KeyRecord; MAX_ACTIVE_KEYS],
    last_key_down_time: u32,

    delay_fast: [u8; FAST_BINS],
    delay_slow: [u8; SLOW_BINS],
    downtime_fast: [u8; FAST_BINS],
    downtime_slow: [u8; SLOW_BINS],

    delay_fast_drain: u8,
    delay_slow_drain: u8,
    downtime_fast_drain: u8,
    downtime_slow_drain: u8,

    _config: PhantomData<C>,
}

impl<C: Config, const FAST_BINS: usize, const SLOW_BINS: usize, const MAX_ACTIVE_KEYS: usize>
    KeyboardDetector<C, FAST_BINS, SLOW_BINS, MAX_ACTIVE_KEYS>
{
    pub const fn new() -> Self {
        KeyboardDetector {
            shadow: [0; 8],
            key_timer_log: [KeyRecord::FREE; MAX_ACTIVE_KEYS],
            last_key_down_time: 0,
            delay_fast: [0; FAST_BINS],
            delay_slow: [0; SLOW_BINS],
            downtime_fast: [0; FAST_BINS],
            downtime_slow: [0; SLOW_BINS],
            delay_fast_drain: 0,
            delay_slow_drain: 0,
            downtime_fast_drain: 0,
            downtime_slow_drain: 0,
            _config: PhantomData,
        }
    }

    /// Process one inbound 8-byte keyboard report, mutating it in place for
    /// the host: zeroed under lockout, replayed from the shadow on
    /// rollover, otherwise passed through unchanged.
    pub fn on_report<L: LedSink>(
        &mut self,
        now: u32,
        report: &mut [u8; 8],
        lockout: &LockoutController<C>,
        led: &mut L,
    ) {
        if report[2..8].iter().any(|&code| code == KEY_ROLLOVER) {
            if lockout.is_host_suppressed() {
                *report = [0; 8];
            } else {
                *report = self.shadow;
            }
            return;
        }

        // Modifier bits: byte 0, bit i is MODIFIER_BASE + i.
        let new_mods = report[0];
        let old_mods = self.shadow[0];
        for i in 0..8 {
            let bit = 1u8 << i;
            let code = MODIFIER_BASE + i as u8;
            match (new_mods & bit != 0, old_mods & bit != 0) {
                (true, false) => self.key_down(now, code),
                (false, true) => self.key_up(now, code),
                _ => {}
            }
        }

        // Key array: first downs, then ups, matching the extraction order.
        let new_keys = *report;
        let old_keys = self.shadow;
        for &code in &new_keys[2..8] {
            if code >= KEY_A && !old_keys[2..8].contains(&code) {
                self.key_down(now, code);
            }
        }
        for &code in &old_keys[2..8] {
            if code >= KEY_A && !new_keys[2..8].contains(&code) {
                self.key_up(now, code);
            }
        }

        // Bin-check happens once per report, after every event it produced,
        // not per event: a burst of key transitions in one report must not
        // trigger the lockout side effect (and its histogram reset) midway
        // through still-unprocessed events of that same report.
        self.check_lockout(lockout, led);

        self.shadow = *report;

        if lockout.is_host_suppressed() {
            *report = [0; 8];
        }
    }

    fn key_down(&mut self, now: u32, code: u8) {
        let delay = now.wrapping_sub(self.last_key_down_time);
        Self::bin_event(
            delay,
            &mut self.delay_fast,
            &mut self.delay_slow,
            &mut self.delay_fast_drain,
            &mut self.delay_slow_drain,
        );
        self.last_key_down_time = now;

        match self.key_timer_log.iter_mut().find(|r| r.key_code == KEY_NONE) {
            Some(slot) => {
                slot.key_code = code;
                slot.key_down_start = now;
            }
            None => invariant_violation("no free KeyTimerLog slot on key-down"),
        }
    }

    fn key_up(&mut self, now: u32, code: u8) {
        let downtime = match self.key_timer_log.iter_mut().find(|r| r.key_code == code) {
            Some(slot) => {
                let downtime = now.wrapping_sub(slot.key_down_start);
                slot.key_code = KEY_NONE;
                downtime
            }
            None => invariant_violation("no matching KeyTimerLog slot on key-up"),
        };

        Self::bin_event(
            downtime,
            &mut self.downtime_fast,
            &mut self.downtime_slow,
            &mut self.downtime_fast_drain,
            &mut self.downtime_slow_drain,
        );
    }

    /// Shared fast/slow bin-assignment + drain logic used by both the
    /// keydown-delay and keyup-downtime paths (each with its own pair of
    /// histograms and drain counters — they must never be unified).
    fn bin_event(
        elapsed: u32,
        fast: &mut [u8; FAST_BINS],
        slow: &mut [u8; SLOW_BINS],
        fast_drain: &mut u8,
        slow_drain: &mut u8,
    ) {
        let fast_range = FAST_BINS as u32 * C::FAST_BIN_WIDTH_MS;
        if elapsed < fast_range {
            let bin = (elapsed / C::FAST_BIN_WIDTH_MS) as usize;
            if fast[bin] == u8::MAX {
                warn!("hid-botdetect: keyboard histogram bin pinned at saturation");
            }
            fast[bin] = fast[bin].saturating_add(1);
            drain(fast, fast_drain, C::FAST_DRAIN_DIVIDER);
        } else {
            let slow_range = SLOW_BINS as u32 * C::SLOW_BIN_WIDTH_MS;
            let wrapped = elapsed % slow_range;
            let bin = (wrapped / C::SLOW_BIN_WIDTH_MS) as usize;
            if slow[bin] == u8::MAX {
                warn!("hid-botdetect: keyboard histogram bin pinned at saturation");
            }
            slow[bin] = slow[bin].saturating_add(1);
            drain(slow, slow_drain, C::SLOW_DRAIN_DIVIDER);
        }
    }

    fn check_lockout<L: LedSink>(&mut self, lockout: &LockoutController<C>, led: &mut L) {
        let tripped = self.delay_fast.iter().any(|&b| b > C::LOCKOUT_BIN_THRESHOLD)
            || self.delay_slow.iter().any(|&b| b > C::LOCKOUT_BIN_THRESHOLD)
            || self.downtime_fast.iter().any(|&b| b > C::LOCKOUT_BIN_THRESHOLD)
            || self.downtime_slow.iter().any(|&b| b > C::LOCKOUT_BIN_THRESHOLD);
        if tripped {
            warn!("hid-botdetect: keyboard timing histogram exceeded threshold");
            if lockout.trigger(led) {
                self.delay_fast = [0; FAST_BINS];
                self.delay_slow = [0; SLOW_BINS];
                self.downtime_fast = [0; FAST_BINS];
                self.downtime_slow = [0; SLOW_BINS];
                // Drain counters are intentionally left as-is: a harmless
                // implementation choice preserved from the shipped source.
            }
        }
    }
}

impl<C: Config, const FAST_BINS: usize, const SLOW_BINS: usize, const MAX_ACTIVE_KEYS: usize> Default
    for KeyboardDetector<C, FAST_BINS, SLOW_BINS, MAX_ACTIVE_KEYS>
{
    fn default() -> Self {
        Self::new()
    }
}

/// Drain one histogram: decrement every positive bin once every `divider`
/// events.
fn drain<const N: usize>(bins: &mut [u8; N], counter: &mut u8, divider: u8) {
    *counter += 1;
    if *counter >= divider {
        *counter = 0;
        for bin in bins.iter_mut() {
            if *bin > 0 {
                *bin -= 1;
            }
        }
    }
}

