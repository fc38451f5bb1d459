//! The one failure path the detectors can hit: a `KeyTimerLog` invariant
//! violation (see the keyboard module's module doc).
//!
//! This can only happen if `Config::MAX_ACTIVE_KEYS` is too small for the
//! HID report semantics actually in use, or if the extractor itself has a
//! bug. Either way there is nothing a caller could do to recover, so the
//! only sound response on a safety-relevant device is to stop processing
//! input entirely and wait for a watchdog reset.

use crate::log::error;

/// Halts the input pipeline after logging `reason`. Never returns.
///
/// Matches the shipped source's `while (1);`, replaced with a
/// watchdog-visible spin so the condition is observable instead of silently
/// wedging.
#[cold]
pub fn invariant_violation(reason: &'static str) -> ! {
    error!("hid-botdetect: invariant violation, halting: {}", reason);
    loop {
        core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);
    }
}
