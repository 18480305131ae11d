use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, AsRefStr, EnumString)]
pub enum OutcomeKind {
    #[serde(rename = "pass")]
    #[strum(serialize = "pass")]
    Passed,
    #[serde(rename = "fail")]
    #[strum(serialize = "fail")]
    Failed,
    #[serde(rename = "timeout")]
    #[strum(serialize = "timeout")]
    TimedOut,
}

impl OutcomeKind {
    /// Classifies a finished process. A timeout wins over whatever status
    /// the killed process reported.
    pub fn classify(timed_out: bool, exit_code: Option<i32>) -> Self {
        if timed_out {
            return Self::TimedOut;
        }
        match exit_code {
            Some(0) => Self::Passed,
            _ => Self::Failed,
        }
    }

    pub fn is_pass(self) -> bool {
        self == Self::Passed
    }
}

/// The classified result of running one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    kind: OutcomeKind,
    elapsed_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    exit_code: Option<i32>,
    log_path: PathBuf,
}

impl Outcome {
    pub fn new(
        kind: OutcomeKind,
        elapsed: Duration,
        exit_code: Option<i32>,
        log_path: PathBuf,
    ) -> Self {
        Self {
            kind,
            elapsed_secs: elapsed.as_secs_f64(),
            exit_code,
            log_path,
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        self.kind
    }

    /// Wall-clock seconds, or the timeout bound for timed-out tasks.
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}
