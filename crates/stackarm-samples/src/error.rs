use stackarm_driver::ArmError;
use thiserror::Error;

use crate::report::CleanupOutcome;

/// A sample step that failed. Returned after cleanup has run.
#[derive(Debug, Error)]
#[error("{step} failed: {source}")]
pub struct SampleError {
    pub step:    &'static str,
    #[source]
    pub source:  ArmError,
    /// How the primary resource group was released; `None` until cleanup ran.
    pub cleanup: Option<CleanupOutcome>,
}

impl SampleError {
    pub(crate) fn with_cleanup(mut self, outcome: CleanupOutcome) -> Self {
        self.cleanup = Some(outcome);
        self
    }
}

/// Attach the name of the failing step to a collaborator error.
pub trait StepExt<T> {
    fn step(self, step: &'static str) -> Result<T, SampleError>;
}

impl<T> StepExt<T> for Result<T, ArmError> {
    fn step(self, step: &'static str) -> Result<T, SampleError> {
        self.map_err(|source| SampleError { step, source, cleanup: None })
    }
}
