//! Winner selection and clock injection seams
//!
//! Production draws from thread-local OS entropy on every call; tests
//! supply deterministic implementations.

use chrono::{DateTime, Utc};
use rand::Rng;

/// Uniform index picker over the eligible set
pub trait WinnerPicker: Send + Sync {
    /// Pick an index in `0..len`. Callers guarantee `len > 0`.
    fn pick(&self, len: usize) -> usize;
}

/// Production picker backed by `rand::thread_rng`, freshly drawn per call
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngPicker;

impl WinnerPicker for ThreadRngPicker {
    fn pick(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Wall-clock source
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_rng_picker_in_range() {
        let picker = ThreadRngPicker;
        for _ in 0..100 {
            let idx = picker.pick(5);
            assert!(idx < 5);
        }
    }

    #[test]
    fn test_single_element_always_zero() {
        let picker = ThreadRngPicker;
        assert_eq!(picker.pick(1), 0);
    }
}
