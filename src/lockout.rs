//! Shared lockout state machine.
//!
//! `LockoutState` is written from two execution contexts: the (lower
//! priority) report-handling code in [`crate::keyboard`] and
//! [`crate::mouse`], and the (higher priority) 1 ms tick in
//! [`LockoutController::on_millisecond_tick`], which may run as an
//! interrupt. A plain `AtomicU8` gives the single-word atomicity the two
//! contexts need without a critical section: every transition is a single
//! store, and a tick racing a trigger can only ever observe one state or
//! the other, never a torn value.
//!
//! `TemporaryLockoutTimeMs` is conceptually owned by the tick context; the
//! report context only ever resets it to 0 on entry into `TemporaryActive`.
//! That write is allowed to race the tick (the original design tolerates a
//! few stale milliseconds against a multi-second lockout), so it is also
//! kept as a plain atomic rather than synchronised.

use core::marker::PhantomData;
use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use crate::config::Config;
use crate::log::info;

/// Lockout phases. `PermanentActive` is terminal: no transition leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum LockoutState {
    Inactive = 0,
    TemporaryActive = 1,
    TemporaryFlashing = 2,
    PermanentActive = 3,
}

impl LockoutState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => LockoutState::Inactive,
            1 => LockoutState::TemporaryActive,
            2 => LockoutState::TemporaryFlashing,
            _ => LockoutState::PermanentActive,
        }
    }
}

/// LED states the core ever asks for. The LED driver itself may support
/// more states; these are the only two the bot-detect core drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedState {
    Off,
    FlashBotdetect,
}

/// The LED driver, provided externally. The core only ever calls the
/// setter; enumeration, PWM timing, colour choices etc. are all the
/// driver's concern.
pub trait LedSink {
    fn set_state(&mut self, state: LedState);
}

/// Lets tests and tools observe a lockout trip without wiring up a real LED.
impl LedSink for () {
    fn set_state(&mut self, _state: LedState) {}
}

/// The shared lockout state machine (component C2).
///
/// One instance is shared between the keyboard and mouse channels (when
/// both are enabled); a lockout trigger from either channel drives the same
/// state. `C` supplies `TEMP_LOCKOUT_MS` / `TEMP_LOCKOUT_FLASH_MS`.
pub struct LockoutController<C> {
    state: AtomicU8,
    temp_lockout_time_ms: AtomicU32,
    _config: PhantomData<C>,
}

impl<C: Config> LockoutController<C> {
    pub const fn new() -> Self {
        LockoutController {
            state: AtomicU8::new(LockoutState::Inactive as u8),
            temp_lockout_time_ms: AtomicU32::new(0),
            _config: PhantomData,
        }
    }

    /// Current lockout phase.
    pub fn state(&self) -> LockoutState {
        LockoutState::from_u8(self.state.load(Ordering::Relaxed))
    }

    /// True while outbound reports must be zeroed.
    pub fn is_host_suppressed(&self) -> bool {
        matches!(
            self.state(),
            LockoutState::TemporaryActive | LockoutState::PermanentActive
        )
    }

    /// Elapsed ms in the current temporary phase (for diagnostics/tests).
    pub fn temp_lockout_time_ms(&self) -> u32 {
        self.temp_lockout_time_ms.load(Ordering::Relaxed)
    }

    /// Invoked by a classifier when its lockout precondition is met.
    ///
    /// Returns `true` iff this call performed the `Inactive ->
    /// TemporaryActive` transition, telling the caller to reset its own
    /// counters (the other channel's counters are left untouched, by
    /// design: a key-chatter attack should not erase mouse-motion
    /// evidence, and vice versa).
    pub(crate) fn trigger<L: LedSink>(&self, led: &mut L) -> bool {
        match self.state() {
            LockoutState::PermanentActive => false,
            LockoutState::TemporaryActive | LockoutState::TemporaryFlashing => {
                self.state
                    .store(LockoutState::PermanentActive as u8, Ordering::Relaxed);
                info!("hid-botdetect: escalating to permanent lockout");
                false
            }
            LockoutState::Inactive => {
                self.temp_lockout_time_ms.store(0, Ordering::Relaxed);
                self.state
                    .store(LockoutState::TemporaryActive as u8, Ordering::Relaxed);
                led.set_state(LedState::FlashBotdetect);
                info!("hid-botdetect: lockout triggered");
                true
            }
        }
    }

    /// The 1 ms edge. May run from an interrupt context; performs at most
    /// one state transition and at most one increment of the temporary
    /// lockout timer.
    pub fn on_millisecond_tick<L: LedSink>(&self, led: &mut L) {
        match self.state() {
            LockoutState::TemporaryActive => {
                let before = self.temp_lockout_time_ms.fetch_add(1, Ordering::Relaxed);
                if before > C::TEMP_LOCKOUT_MS {
                    self.state
                        .store(LockoutState::TemporaryFlashing as u8, Ordering::Relaxed);
                }
            }
            LockoutState::TemporaryFlashing => {
                let before = self.temp_lockout_time_ms.fetch_add(1, Ordering::Relaxed);
                if before > C::TEMP_LOCKOUT_FLASH_MS {
                    led.set_state(LedState::Off);
                    self.state
                        .store(LockoutState::Inactive as u8, Ordering::Relaxed);
                }
            }
            LockoutState::Inactive | LockoutState::PermanentActive => {}
        }
    }
}

impl<C: Config> Default for LockoutController<C> {
    fn default() -> Self {
        Self::new()
    }
}
