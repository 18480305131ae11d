use serde::{Deserialize, Serialize};

use super::{Outcome, OutcomeKind, Task};

/// Largest exit status used for a failure count. 255 is reserved for hard errors.
pub const MAX_FAILURE_EXIT_CODE: u8 = 254;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    task: Task,
    outcome: Outcome,
}

impl Entry {
    pub fn new(task: Task, outcome: Outcome) -> Self {
        Self { task, outcome }
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }
}

/// Aggregate record of a batch: every entry in run order plus counters.
///
/// `failed` counts both failures and timeouts, so `total == passed + failed`
/// holds after every call to [`Summary::record`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    entries: Vec<Entry>,
    total: usize,
    passed: usize,
    failed: usize,
}

impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: Entry) -> &Entry {
        self.total += 1;
        if entry.outcome().kind().is_pass() {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn passed(&self) -> usize {
        self.passed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Timeouts are a subset of `failed`, kept apart only for triage.
    pub fn timed_out(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.outcome().kind() == OutcomeKind::TimedOut)
            .count()
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Process exit status for this batch: the failure count, saturated.
    pub fn exit_code(&self) -> u8 {
        u8::try_from(self.failed)
            .unwrap_or(MAX_FAILURE_EXIT_CODE)
            .min(MAX_FAILURE_EXIT_CODE)
    }

    /// The human-readable tally, e.g. `3 of 5 passed`.
    pub fn tally_line(&self) -> String {
        format!("{} of {} passed", self.passed, self.total)
    }
}
