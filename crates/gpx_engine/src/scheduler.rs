//! Pure poll scheduling state machine.
//!
//! `Armed` waits for the next tick, `Checking` has exactly one status request
//! outstanding, `Done` is terminal (artifact delivered, attempts exhausted or
//! cancelled). The async driver in `poll.rs` feeds it ticks and results.

use std::time::Duration;

use crate::{Artifact, StatusCheck};

/// Fixed five-second cadence: detection latency is at most one interval and
/// the job engine sees at most one request per client per interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed,
    /// Interval grows by `factor` after every check, capped at `max_interval`.
    Exponential { factor: u32, max_interval: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub backoff: Backoff,
    /// `None` polls until the artifact arrives or the schedule is cancelled.
    pub max_attempts: Option<u32>,
}

impl PollPolicy {
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            backoff: Backoff::Fixed,
            max_attempts: None,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_POLL_INTERVAL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Armed,
    Checking,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    /// Issue status check number `attempt`.
    Check { attempt: u32 },
    /// A check is still outstanding; this tick does nothing.
    SkipInFlight,
    /// The attempt budget was already spent.
    Exhausted { attempts: u32 },
    /// Schedule is over; no more ticks should be delivered.
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckVerdict {
    Continue,
    Delivered(Artifact),
    TimedOut { attempts: u32 },
    /// The result arrived after the schedule ended.
    Discarded,
}

#[derive(Debug, Clone)]
pub struct PollScheduler {
    policy: PollPolicy,
    phase: PollPhase,
    attempts: u32,
}

impl PollScheduler {
    pub fn new(policy: PollPolicy) -> Self {
        Self {
            policy,
            phase: PollPhase::Armed,
            attempts: 0,
        }
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    /// Number of checks issued so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn on_tick(&mut self) -> TickAction {
        match self.phase {
            PollPhase::Checking => TickAction::SkipInFlight,
            PollPhase::Done => TickAction::Stopped,
            PollPhase::Armed if self.budget_spent() => {
                self.phase = PollPhase::Done;
                TickAction::Exhausted {
                    attempts: self.attempts,
                }
            }
            PollPhase::Armed => {
                self.attempts += 1;
                self.phase = PollPhase::Checking;
                TickAction::Check {
                    attempt: self.attempts,
                }
            }
        }
    }

    pub fn on_check_result(&mut self, check: StatusCheck) -> CheckVerdict {
        if self.phase != PollPhase::Checking {
            return CheckVerdict::Discarded;
        }
        match check {
            StatusCheck::Ready(artifact) => {
                self.phase = PollPhase::Done;
                CheckVerdict::Delivered(artifact)
            }
            // Transient errors count as "not ready yet".
            StatusCheck::Pending | StatusCheck::TransientError(_) => {
                if self.budget_spent() {
                    self.phase = PollPhase::Done;
                    CheckVerdict::TimedOut {
                        attempts: self.attempts,
                    }
                } else {
                    self.phase = PollPhase::Armed;
                    CheckVerdict::Continue
                }
            }
        }
    }

    pub fn cancel(&mut self) {
        self.phase = PollPhase::Done;
    }

    /// Delay until the next tick, given the checks issued so far.
    pub fn next_delay(&self) -> Duration {
        match self.policy.backoff {
            Backoff::Fixed => self.policy.interval,
            Backoff::Exponential {
                factor,
                max_interval,
            } => {
                let growth = factor.max(1).saturating_pow(self.attempts);
                self.policy
                    .interval
                    .saturating_mul(growth)
                    .min(max_interval.max(self.policy.interval))
            }
        }
    }

    fn budget_spent(&self) -> bool {
        self.policy
            .max_attempts
            .is_some_and(|max| self.attempts >= max)
    }
}
