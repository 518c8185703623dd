//! Time sources feeding the recorder and player.

use std::cell::Cell;

/// Monotonic millisecond clock supplied by the host.
pub trait Clock {
    /// Milliseconds since an arbitrary, fixed origin.
    fn now_ms(&self) -> f64;
}

/// Wall-clock time backed by [`std::time::Instant`].
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: std::time::Instant,
}

#[cfg(not(target_arch = "wasm32"))]
impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Virtual clock that only moves when told to.
///
/// Used by tests and by hosts that pass their own frame timestamps
/// (e.g. a browser's `requestAnimationFrame` time).
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Cell::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: f64) {
        self.now.set(now_ms);
    }

    pub fn advance(&self, delta_ms: f64) {
        self.now.set(self.now.get() + delta_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> f64 {
        (**self).now_ms()
    }
}

/// Milliseconds between `start` and `now` as a frame timestamp.
///
/// Negative or non-finite spans clamp to 0; overly long ones saturate.
pub fn elapsed_ms(start: f64, now: f64) -> u32 {
    let span = (now - start).floor();
    if span.is_nan() || span <= 0.0 {
        0
    } else {
        span as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(100.0);
        assert_eq!(clock.now_ms(), 100.0);
        clock.advance(50.5);
        assert_eq!(clock.now_ms(), 150.5);
        clock.set(10.0);
        assert_eq!((&clock).now_ms(), 10.0);
    }

    #[test]
    fn test_elapsed_clamps() {
        assert_eq!(elapsed_ms(100.0, 350.9), 250);
        assert_eq!(elapsed_ms(100.0, 50.0), 0);
        assert_eq!(elapsed_ms(0.0, f64::NAN), 0);
        assert_eq!(elapsed_ms(0.0, 1e12), u32::MAX);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }
}
