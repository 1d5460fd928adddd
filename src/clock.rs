//! Time source used to bound exchanges.

use core::time::Duration;

/// Monotonic time source with a blocking delay.
///
/// [`Interface`](crate::Interface) polls [`Clock::now`] while waiting for a reply
/// and uses [`Clock::delay`] for the grace period before discarding stale bytes.
/// Enable the `std` feature for an implementation based on the system clock.
pub trait Clock {
    /// Returns the time elapsed since an arbitrary, fixed point.
    fn now(&self) -> Duration;

    /// Blocks for the given duration.
    fn delay(&mut self, dur: Duration);
}

impl<T: Clock + ?Sized> Clock for &mut T {
    fn now(&self) -> Duration {
        (**self).now()
    }

    fn delay(&mut self, dur: Duration) {
        (**self).delay(dur);
    }
}

/// [`Clock`] backed by [`std::time::Instant`] and [`std::thread::sleep`].
#[cfg(feature = "std")]
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
#[derive(Copy, Clone, Debug)]
pub struct StdClock {
    epoch: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    /// Constructs a clock starting at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn delay(&mut self, dur: Duration) {
        std::thread::sleep(dur);
    }
}
