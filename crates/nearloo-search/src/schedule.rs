//! Attempt schedule for mirror searches.
//!
//! A [`SearchPlan`] walks query shapes, then attempts, then endpoints. The client feeds it
//! one [`Outcome`] per endpoint call and asks for the next [`Step`] until the plan stops.

use std::time::Duration;

use crate::query::QueryShape;

pub const DEFAULT_ATTEMPT_TIMEOUTS_SECS: [u32; 2] = [35, 45];
pub const DEFAULT_RETRY_PAUSE: Duration = Duration::from_millis(650);

/// One pass over every endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// Timeout declared inside the query.
    pub server_timeout_secs: u32,
    /// Wait before the first endpoint of this attempt.
    pub pause: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptSchedule {
    attempts: Vec<Attempt>,
}

impl AttemptSchedule {
    /// The first attempt starts immediately; later ones wait `pause`.
    pub fn new(server_timeouts_secs: &[u32], pause: Duration) -> Self {
        let attempts = server_timeouts_secs
            .iter()
            .enumerate()
            .map(|(i, &server_timeout_secs)| Attempt {
                server_timeout_secs,
                pause: if i == 0 { Duration::ZERO } else { pause },
            })
            .collect();
        Self { attempts }
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }
}

impl Default for AttemptSchedule {
    fn default() -> Self {
        Self::new(&DEFAULT_ATTEMPT_TIMEOUTS_SECS, DEFAULT_RETRY_PAUSE)
    }
}

/// The endpoint call to make next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub shape: QueryShape,
    pub attempt: usize,
    pub endpoint: usize,
    pub server_timeout_secs: u32,
    /// Non-zero only for the first endpoint of a later attempt.
    pub pause_before: Duration,
}

/// Result of one endpoint call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// At least one place.
    Found,
    /// Valid response without places; the schedule goes on.
    Empty,
    /// Failure worth retrying.
    Retryable,
    /// Failure that ends the current shape after this attempt.
    Permanent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanState {
    Running,
    Found,
    /// Schedule ran out and at least one mirror answered with nothing in range.
    Empty,
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct SearchPlan {
    shapes: Vec<QueryShape>,
    attempts: Vec<Attempt>,
    endpoint_count: usize,
    shape: usize,
    attempt: usize,
    endpoint: usize,
    saw_empty: bool,
    saw_permanent: bool,
    state: PlanState,
}

impl SearchPlan {
    pub fn new(include_likely: bool, schedule: &AttemptSchedule, endpoint_count: usize) -> Self {
        let shapes = if include_likely {
            vec![QueryShape::WithLikely, QueryShape::ToiletsOnly]
        } else {
            vec![QueryShape::ToiletsOnly]
        };
        let state = if schedule.is_empty() || endpoint_count == 0 {
            PlanState::Exhausted
        } else {
            PlanState::Running
        };

        Self {
            shapes,
            attempts: schedule.attempts().to_vec(),
            endpoint_count,
            shape: 0,
            attempt: 0,
            endpoint: 0,
            saw_empty: false,
            saw_permanent: false,
            state,
        }
    }

    pub fn state(&self) -> PlanState {
        self.state
    }

    pub fn current(&self) -> Option<Step> {
        if self.state != PlanState::Running {
            return None;
        }
        let attempt = self.attempts.get(self.attempt)?;
        let shape = *self.shapes.get(self.shape)?;

        Some(Step {
            shape,
            attempt: self.attempt,
            endpoint: self.endpoint,
            server_timeout_secs: attempt.server_timeout_secs,
            pause_before: if self.endpoint == 0 {
                attempt.pause
            } else {
                Duration::ZERO
            },
        })
    }

    /// Record the outcome of the current step and move on.
    pub fn advance(&mut self, outcome: Outcome) -> PlanState {
        if self.state != PlanState::Running {
            return self.state;
        }

        match outcome {
            Outcome::Found => {
                self.state = PlanState::Found;
                return self.state;
            }
            Outcome::Empty => self.saw_empty = true,
            Outcome::Retryable => {}
            Outcome::Permanent => self.saw_permanent = true,
        }

        self.endpoint += 1;
        if self.endpoint < self.endpoint_count {
            return self.state;
        }

        // attempt finished without results
        self.endpoint = 0;
        if !self.saw_permanent && self.attempt + 1 < self.attempts.len() {
            self.attempt += 1;
            return self.state;
        }

        self.attempt = 0;
        self.saw_permanent = false;
        self.shape += 1;
        if self.shape >= self.shapes.len() {
            self.state = if self.saw_empty {
                PlanState::Empty
            } else {
                PlanState::Exhausted
            };
        }
        self.state
    }
}
