//! In-flight guard for at-most-one concurrent operations.
//!
//! A [`DeviceSession`](crate::DeviceSession) allows one active poll and one
//! passive sync per device at a time. [`InFlightGuard`] claims a flag and
//! releases it when dropped, so the flag is cleared on every exit path,
//! including early returns and errors.

use std::sync::atomic::{AtomicBool, Ordering};

/// Claimed in-flight flag, released on drop.
///
/// # Example
///
/// ```
/// use std::sync::atomic::AtomicBool;
/// use atmotube_core::guard::InFlightGuard;
///
/// let flag = AtomicBool::new(false);
/// let guard = InFlightGuard::try_acquire(&flag).unwrap();
/// assert!(InFlightGuard::try_acquire(&flag).is_none());
/// drop(guard);
/// assert!(InFlightGuard::try_acquire(&flag).is_some());
/// ```
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    /// Claim the flag, or return `None` if it is already held.
    pub fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
