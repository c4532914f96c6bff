//! Wall-clock budget for one invocation

use std::time::{Duration, Instant};

/// Start instant plus budget, checked cooperatively between units of work
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn new(start: Instant, budget: Duration) -> Self {
        Self { start, budget }
    }

    /// Budget counted from now
    pub fn starting_now(budget: Duration) -> Self {
        Self::new(Instant::now(), budget)
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn expired(&self) -> bool {
        self.elapsed() >= self.budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_budget_is_expired() {
        let deadline = Deadline::starting_now(Duration::ZERO);
        assert!(deadline.expired());
    }

    #[test]
    fn test_generous_budget() {
        let deadline = Deadline::starting_now(Duration::from_secs(3600));
        assert!(!deadline.expired());
        assert!(deadline.elapsed() < Duration::from_secs(100));
    }

    #[test]
    fn test_started_in_the_past() {
        let Some(start) = Instant::now().checked_sub(Duration::from_millis(50)) else {
            return;
        };
        let deadline = Deadline::new(start, Duration::from_millis(10));
        assert!(deadline.expired());
    }
}
