//! Warnings raised while computing statistics
//!
//! Every warning is logged through `tracing` and also collected, so callers
//! can inspect what went wrong without capturing log output.

use serde::Serialize;

/// Computation step that raised a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[display("load")]
    Load,
    #[display("feature_statistics")]
    FeatureStatistics,
    #[display("event_time_histogram")]
    EventTimeHistogram,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, derive_more::Display)]
#[display("{stage}: {message}")]
pub struct Diagnostic {
    pub stage: Stage,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs a warning and records it.
    pub fn warn<S>(&mut self, stage: Stage, message: S)
    where
        S: Into<String>,
    {
        let message = message.into();
        tracing::warn!(%stage, "{message}");
        self.entries.push(Diagnostic { stage, message });
    }

    /// Records a warning that has already been logged.
    pub fn record<S>(&mut self, stage: Stage, message: S)
    where
        S: Into<String>,
    {
        self.entries.push(Diagnostic {
            stage,
            message: message.into(),
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
