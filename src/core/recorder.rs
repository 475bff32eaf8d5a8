//! Step recording for pipeline diagnostics.
//!
//! A [`TaskRecorder`] accumulates an append-only, ordered log of named steps.
//! Each step is opened with a description and closed with a success or
//! failure message. Finishing the recorder seals the log into a
//! [`TaskResult`], which is what callers, tests, and support tooling inspect.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A single recorded step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStep<E> {
    /// What the step was trying to do
    pub description: String,

    /// How the step ended
    pub resolution: StepResolution<E>,

    /// Diagnostic key/value pairs attached while the step was open
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

/// Outcome of a single step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum StepResolution<E> {
    Succeeded {
        message: String,
    },
    Failed {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        cause: Option<E>,
    },
}

impl<E> StepResolution<E> {
    pub fn message(&self) -> &str {
        match self {
            Self::Succeeded { message } | Self::Failed { message, .. } => message,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Underlying cause of a failed step
    pub fn cause(&self) -> Option<&E> {
        match self {
            Self::Failed { cause, .. } => cause.as_ref(),
            Self::Succeeded { .. } => None,
        }
    }
}

/// A sealed step log, with a value when the task succeeded
///
/// A failure always contains at least one failed step; deserialization
/// rejects logs that do not.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum TaskResult<T, E> {
    Success { value: T, steps: Vec<TaskStep<E>> },
    Failure { steps: Vec<TaskStep<E>> },
}

/// Wire form of [`TaskResult`], before validation
#[derive(Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
enum StepLog<T, E> {
    Success { value: T, steps: Vec<TaskStep<E>> },
    Failure { steps: Vec<TaskStep<E>> },
}

impl<'de, T, E> Deserialize<'de> for TaskResult<T, E>
where
    T: Deserialize<'de>,
    E: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match StepLog::deserialize(deserializer)? {
            StepLog::Success { value, steps } => Ok(Self::Success { value, steps }),
            StepLog::Failure { steps } => {
                if !steps.iter().any(|s| s.resolution.is_failure()) {
                    return Err(de::Error::custom(
                        "failed task log contains no failed step",
                    ));
                }
                Ok(Self::Failure { steps })
            }
        }
    }
}

impl<T, E> TaskResult<T, E> {
    pub fn steps(&self) -> &[TaskStep<E>] {
        match self {
            Self::Success { steps, .. } | Self::Failure { steps } => steps,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    pub fn step(&self, index: usize) -> Option<&TaskStep<E>> {
        self.steps().get(index)
    }

    /// Resolution of the step at `index`
    ///
    /// # Panics
    ///
    /// Panics if no step was recorded at `index`.
    pub fn resolution_of(&self, index: usize) -> &StepResolution<E> {
        &self.steps()[index].resolution
    }

    /// The last failed step, if any
    pub fn last_failure(&self) -> Option<&TaskStep<E>> {
        self.steps()
            .iter()
            .rev()
            .find(|step| step.resolution.is_failure())
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Success { value, .. } => Some(value),
            Self::Failure { .. } => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Success { value, .. } => Some(value),
            Self::Failure { .. } => None,
        }
    }
}

impl<T, E: fmt::Display> TaskResult<T, E> {
    /// Render the step log as plain text, suitable for a support email
    pub fn support_report(&self) -> String {
        let mut report = String::new();
        let outcome = if self.is_success() { "Succeeded" } else { "Failed" };
        report.push_str(&format!("Outcome: {}\n", outcome));

        for (index, step) in self.steps().iter().enumerate() {
            report.push_str(&format!("Step {}: {}\n", index + 1, step.description));

            for (key, value) in &step.attributes {
                report.push_str(&format!("  {}: {}\n", key, value));
            }

            match &step.resolution {
                StepResolution::Succeeded { message } => {
                    report.push_str(&format!("  Succeeded: {}\n", message));
                }
                StepResolution::Failed { message, cause } => {
                    report.push_str(&format!("  Failed: {}\n", message));
                    if let Some(cause) = cause {
                        let cause = cause.to_string();
                        if cause != *message {
                            report.push_str(&format!("  Cause: {}\n", cause));
                        }
                    }
                }
            }
        }

        report
    }
}

/// Step currently being worked on
#[derive(Debug)]
struct OpenStep {
    description: String,
    attributes: BTreeMap<String, String>,
}

/// Accumulates steps until sealed by one of the `finish_*` methods
///
/// Misuse (closing a step that was never opened, opening a step while
/// another is open, sealing with a step still open) is a programming error
/// and panics.
#[derive(Debug)]
pub struct TaskRecorder<E> {
    steps: Vec<TaskStep<E>>,
    open: Option<OpenStep>,
}

impl<E> Default for TaskRecorder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> TaskRecorder<E> {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            open: None,
        }
    }

    /// Open a new step
    pub fn begin_step(&mut self, description: impl Into<String>) {
        let description = description.into();
        assert!(
            self.open.is_none(),
            "step '{}' opened while another step is still open",
            description
        );

        debug!(step = %description, "Step started");
        self.open = Some(OpenStep {
            description,
            attributes: BTreeMap::new(),
        });
    }

    /// Attach a diagnostic attribute to the open step
    pub fn add_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let open = self
            .open
            .as_mut()
            .unwrap_or_else(|| panic!("attribute added with no open step"));
        open.attributes.insert(key.into(), value.into());
    }

    /// Close the open step as successful
    pub fn step_succeeded(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!(%message, "Step succeeded");
        self.close(StepResolution::Succeeded { message });
    }

    /// Close the open step as failed
    pub fn step_failed(&mut self, message: impl Into<String>, cause: Option<E>) {
        let message = message.into();
        debug!(%message, "Step failed");
        self.close(StepResolution::Failed { message, cause });
    }

    /// Number of steps closed so far
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Seal the log as a success
    pub fn finish_success<T>(self, value: T) -> TaskResult<T, E> {
        TaskResult::Success {
            value,
            steps: self.seal(),
        }
    }

    /// Seal the log as a failure
    ///
    /// # Panics
    ///
    /// Panics if no recorded step failed.
    pub fn finish_failure<T>(self) -> TaskResult<T, E> {
        assert!(
            self.steps.iter().any(|s| s.resolution.is_failure()),
            "task sealed as a failure without a failed step"
        );

        TaskResult::Failure { steps: self.seal() }
    }

    fn close(&mut self, resolution: StepResolution<E>) {
        let open = self
            .open
            .take()
            .unwrap_or_else(|| panic!("step resolved with no open step"));

        self.steps.push(TaskStep {
            description: open.description,
            resolution,
            attributes: open.attributes,
        });
    }

    fn seal(self) -> Vec<TaskStep<E>> {
        if let Some(open) = &self.open {
            panic!("task sealed while step '{}' is still open", open.description);
        }
        self.steps
    }
}
