//! Escalation policy for repeated install failures.

use crate::types::ApplicationState;

/// Default failure count at which an alert is dispatched.
pub const DEFAULT_ESCALATION_THRESHOLD: u32 = 3;

/// Pure predicate deciding whether a reported transition warrants an alert.
///
/// Evaluated once per state report, before persistence. Dispatch itself is
/// fire-and-forget and owned by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationPolicy {
    threshold: u32,
}

impl EscalationPolicy {
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// True when the report is an error at or past the failure threshold.
    pub fn should_alert(&self, state: ApplicationState, retry_count: u32) -> bool {
        retry_count >= self.threshold && state == ApplicationState::Error
    }
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ESCALATION_THRESHOLD)
    }
}
