//! Ingestion Options - Per-session knobs for the batched loader

use crate::error::{IngestError, Result};
use serde::{Deserialize, Serialize};

/// Default number of records persisted per insert call
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// What to do with a value that does not parse as an integer in an integer column
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CoercionPolicy {
    /// Keep the record and persist the field as NULL
    #[default]
    Forward,
    /// Abort the session with a decode failure
    Reject,
    /// Substitute zero for the unparsable value
    Zero,
}

/// Options controlling one ingestion session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestOptions {
    pub batch_size: usize,
    #[serde(default)]
    pub on_bad_integer: CoercionPolicy,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            on_bad_integer: CoercionPolicy::default(),
        }
    }
}

impl IngestOptions {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_coercion(mut self, policy: CoercionPolicy) -> Self {
        self.on_bad_integer = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(IngestError::Config(
                "batch size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
