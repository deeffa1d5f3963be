//! # Fibonacci Backoff
//!
//! Progressive retry intervals following the Fibonacci sequence, scaled by a base
//! interval and capped at a maximum. Each resource keeps its own instance so one
//! failing resource never slows down another.

/// Fibonacci backoff state
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    base_secs: u64,
    max_secs: u64,
    previous: u64,
    current: u64,
}

impl FibonacciBackoff {
    /// Create a backoff that starts at `base_secs` and never exceeds `max_secs`
    pub fn new(base_secs: u64, max_secs: u64) -> Self {
        let base_secs = base_secs.max(1);
        Self {
            base_secs,
            max_secs: max_secs.max(base_secs),
            previous: 0,
            current: 1,
        }
    }

    /// Next backoff interval in seconds, advancing the sequence
    ///
    /// Produces base × (1, 1, 2, 3, 5, 8, ...) capped at the maximum.
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let value = self.current.saturating_mul(self.base_secs).min(self.max_secs);
        if value < self.max_secs {
            let next = self.previous.saturating_add(self.current);
            self.previous = self.current;
            self.current = next;
        }
        value
    }

    /// Restart the sequence after a successful pass
    pub fn reset(&mut self) {
        self.previous = 0;
        self.current = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fibonacci_sequence() {
        let mut backoff = FibonacciBackoff::new(20, 10_000);
        let values: Vec<u64> = (0..6).map(|_| backoff.next_backoff_seconds()).collect();
        assert_eq!(values, vec![20, 20, 40, 60, 100, 160]);
    }

    #[test]
    fn test_backoff_is_capped() {
        let mut backoff = FibonacciBackoff::new(20, 50);
        let values: Vec<u64> = (0..5).map(|_| backoff.next_backoff_seconds()).collect();
        assert_eq!(values, vec![20, 20, 40, 50, 50]);
    }

    #[test]
    fn test_reset_restarts_sequence() {
        let mut backoff = FibonacciBackoff::new(1, 60);
        backoff.next_backoff_seconds();
        backoff.next_backoff_seconds();
        backoff.next_backoff_seconds();
        backoff.reset();
        assert_eq!(backoff.next_backoff_seconds(), 1);
    }
}
