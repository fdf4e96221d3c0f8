//! Timeout-bounded polling over the live tree
//!
//! Every wait in the crate funnels through [`ConditionWaiter::poll`]: evaluate a
//! probe, sleep a fixed interval, repeat until it reports [`Probe::Found`] or the
//! [`Deadline`] elapses. Probes never raise; a failed tree access is a
//! [`Probe::Transient`] outcome that counts as "not yet".

use crate::deadline::Deadline;
use crate::errors::AutomationError;
use std::thread;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Outcome of one evaluation against the live tree
#[derive(Debug)]
pub enum Probe<T> {
    Found(T),
    NotYet,
    /// The provider failed mid-probe (node disposed, tree re-rendering).
    Transient(AutomationError),
}

impl<T> Probe<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Probe::Found(_))
    }
}

impl<T> From<Result<Option<T>, AutomationError>> for Probe<T> {
    fn from(result: Result<Option<T>, AutomationError>) -> Self {
        match result {
            Ok(Some(value)) => Probe::Found(value),
            Ok(None) => Probe::NotYet,
            Err(e) => Probe::Transient(e),
        }
    }
}

/// Generic deadline-bounded polling primitive
#[derive(Debug, Clone, Copy)]
pub struct ConditionWaiter {
    poll_interval: Duration,
}

impl ConditionWaiter {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Poll `probe` until it finds something or `deadline` elapses.
    ///
    /// The probe runs at least once, even with an already-expired deadline.
    /// Sleeps are clipped to the remaining time, so the call returns within the
    /// deadline plus the duration of one probe.
    pub fn poll<T>(&self, deadline: &Deadline, mut probe: impl FnMut() -> Probe<T>) -> Option<T> {
        let mut iteration: u32 = 0;
        loop {
            iteration += 1;
            match probe() {
                Probe::Found(value) => {
                    debug!(
                        iteration,
                        elapsed_ms = deadline.elapsed().as_millis() as u64,
                        "condition satisfied"
                    );
                    return Some(value);
                }
                Probe::NotYet => trace!(iteration, "condition not met yet"),
                Probe::Transient(e) if e.is_transient() => {
                    debug!(iteration, error = %e, "transient access failure absorbed")
                }
                Probe::Transient(e) => {
                    warn!(iteration, error = %e, "probe failed, treating as not met")
                }
            }

            if deadline.has_expired() {
                debug!(
                    iterations = iteration,
                    timeout_ms = deadline.timeout().as_millis() as u64,
                    "deadline elapsed"
                );
                return None;
            }
            thread::sleep(self.poll_interval.min(deadline.remaining()));
        }
    }

    /// Wait until `predicate` evaluates to true. Evaluation errors count as false.
    pub fn wait_until(
        &self,
        deadline: &Deadline,
        mut predicate: impl FnMut() -> Result<bool, AutomationError>,
    ) -> bool {
        self.poll(deadline, || match predicate() {
            Ok(true) => Probe::Found(()),
            Ok(false) => Probe::NotYet,
            Err(e) => Probe::Transient(e),
        })
        .is_some()
    }

    /// Wait until `predicate` turns false, e.g. a popup disappearing.
    pub fn wait_until_gone(
        &self,
        deadline: &Deadline,
        mut still_present: impl FnMut() -> Result<bool, AutomationError>,
    ) -> bool {
        self.wait_until(deadline, || still_present().map(|present| !present))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_returns_true_on_first_success() {
        let waiter = ConditionWaiter::new(Duration::from_millis(10));
        let deadline = Deadline::after(Duration::from_secs(5));
        let mut calls = 0;
        let ok = waiter.wait_until(&deadline, || {
            calls += 1;
            Ok(calls == 3)
        });
        assert!(ok);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_errors_count_as_false() {
        let waiter = ConditionWaiter::new(Duration::from_millis(5));
        let deadline = Deadline::after(Duration::from_secs(5));
        let mut calls = 0;
        let ok = waiter.wait_until(&deadline, || {
            calls += 1;
            if calls < 3 {
                Err(AutomationError::ElementDetached("disposed".into()))
            } else {
                Ok(true)
            }
        });
        assert!(ok);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_deadline_bounds_a_never_true_predicate() {
        let interval = Duration::from_millis(30);
        let timeout = Duration::from_millis(200);
        let waiter = ConditionWaiter::new(interval);
        let started = Instant::now();
        let ok = waiter.wait_until(&Deadline::after(timeout), || Ok(false));
        let elapsed = started.elapsed();
        assert!(!ok);
        assert!(elapsed >= timeout, "returned early: {elapsed:?}");
        assert!(
            elapsed < timeout + interval + Duration::from_millis(50),
            "overshot deadline: {elapsed:?}"
        );
    }

    #[test]
    fn test_expired_deadline_still_probes_once() {
        let waiter = ConditionWaiter::new(Duration::from_millis(10));
        let mut calls = 0;
        let found = waiter.poll(&Deadline::after(Duration::ZERO), || {
            calls += 1;
            Probe::Found(42)
        });
        assert_eq!(found, Some(42));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_wait_until_gone() {
        let waiter = ConditionWaiter::new(Duration::from_millis(5));
        let mut remaining = 2;
        let gone = waiter.wait_until_gone(&Deadline::after(Duration::from_secs(1)), || {
            remaining -= 1;
            Ok(remaining > 0)
        });
        assert!(gone);
    }
}
