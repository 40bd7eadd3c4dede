use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Outcome of extracting a single file.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[display("success")]
    Success,
    /// Something useful was extracted, but not everything.
    #[display("partial")]
    Partial,
    #[display("error")]
    Error,
    #[display("skipped")]
    Skipped,
}

impl Status {
    /// Success and partial results both count as a processed-successfully file.
    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Success | Status::Partial)
    }
}
