//! BadUSB-style bot detection core for USB HID keyboard/mouse report
//! filtering.
//!
//! This crate is the filter core only: it consumes already-parsed HID boot
//! protocol reports, classifies the timing/motion behaviour behind them, and
//! hands back a (possibly suppressed) report for the host to see. USB
//! enumeration, descriptor parsing, and the actual LED hardware are all
//! external collaborators, supplied by the caller through [`lockout::LedSink`].
//!
//! Three detectors share one [`lockout::LockoutController`]:
//!
//! - [`keyboard::KeyboardDetector`] — inter-keydown delay and per-key
//!   downtime histograms.
//! - [`mouse::MouseDetector`] — acceleration-event timing and
//!   constant-acceleration drift.
//!
//! Both are generic over a [`config::Config`] implementation and over the
//! const generics that size their internal histograms/buffers, so a caller
//! can tune bin counts without the crate needing to know about allocation.
//! [`DefaultKeyboardDetector`] and [`DefaultMouseDetector`] wire up
//! [`config::DefaultConfig`] with the sizes used throughout the design notes.
#![cfg_attr(not(any(feature = "std", test)), no_std)]

// Gated on `feature = "std"`, not bare `cfg(test)`: integration tests in
// `tests/` link the library built for plain `cargo test`, which never sets
// `cfg(test)` on the library itself, only on the test binary.
#[cfg(any(feature = "std", test))]
mod log {
    pub use log::error;
    pub use log::info;
    pub use log::warn;
}
#[cfg(not(any(feature = "std", test)))]
mod log {
    pub use defmt::error;
    pub use defmt::info;
    pub use defmt::warn;
}

pub mod config;
pub mod fatal;
pub mod keyboard;
pub mod lockout;
pub mod mouse;

pub use config::{Config, DefaultConfig};
pub use keyboard::{KeyEvent, KeyboardDetector};
pub use lockout::{LedSink, LedState, LockoutController, LockoutState};
pub use mouse::MouseDetector;

/// [`keyboard::KeyboardDetector`] sized per [`DefaultConfig`].
pub type DefaultKeyboardDetector = KeyboardDetector<
    DefaultConfig,
    { config::DEFAULT_FAST_BINS },
    { config::DEFAULT_SLOW_BINS },
    { config::DEFAULT_MAX_ACTIVE_KEYS },
>;

/// [`mouse::MouseDetector`] sized per [`DefaultConfig`].
pub type DefaultMouseDetector = MouseDetector<DefaultConfig, { config::DEFAULT_VEL_HIST_SIZE }>;

/// [`lockout::LockoutController`] sized per [`DefaultConfig`].
pub type DefaultLockoutController = LockoutController<DefaultConfig>;
