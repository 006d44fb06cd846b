//! Per-item outcome reports shared by every batch operation.
//!
//! A batch never aborts because one item failed; it returns one
//! [`ItemOutcome`] per item and lets the caller decide the exit status.

use serde::Serialize;

/// Failure taxonomy. Collision skips are not failures and use [`ItemStatus::Skipped`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A ref, file, or workspace path is absent.
    NotFound,
    /// Truncated archive record, unparsable path, bad collaborator output.
    MalformedInput,
    /// Disk or permission failure.
    Io,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    Done { detail: String },
    Skipped { reason: String },
    Failed { kind: FailureKind, message: String },
    /// Not started because the batch was cancelled.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemOutcome {
    pub key: String,
    #[serde(flatten)]
    pub status: ItemStatus,
}

impl ItemOutcome {
    pub fn done(key: impl ToString, detail: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            status: ItemStatus::Done {
                detail: detail.into(),
            },
        }
    }

    pub fn skipped(key: impl ToString, reason: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            status: ItemStatus::Skipped {
                reason: reason.into(),
            },
        }
    }

    pub fn failed(key: impl ToString, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            status: ItemStatus::Failed {
                kind,
                message: message.into(),
            },
        }
    }

    pub fn cancelled(key: impl ToString) -> Self {
        Self {
            key: key.to_string(),
            status: ItemStatus::Cancelled,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, ItemStatus::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, ItemStatus::Skipped { .. })
    }

    pub fn is_done(&self) -> bool {
        matches!(self.status, ItemStatus::Done { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub items: Vec<ItemOutcome>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchCounts {
    pub done: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl BatchReport {
    pub fn push(&mut self, outcome: ItemOutcome) {
        self.items.push(outcome);
    }

    pub fn extend(&mut self, other: BatchReport) {
        self.items.extend(other.items);
    }

    pub fn counts(&self) -> BatchCounts {
        let mut c = BatchCounts::default();
        for item in &self.items {
            match item.status {
                ItemStatus::Done { .. } => c.done += 1,
                ItemStatus::Skipped { .. } => c.skipped += 1,
                ItemStatus::Failed { .. } => c.failed += 1,
                ItemStatus::Cancelled => c.cancelled += 1,
            }
        }
        c
    }

    /// True when at least one item ran and none of them succeeded or skipped.
    pub fn all_failed(&self) -> bool {
        let c = self.counts();
        c.failed > 0 && c.done == 0 && c.skipped == 0
    }

    pub fn find(&self, key: &str) -> Option<&ItemOutcome> {
        self.items.iter().find(|i| i.key == key)
    }

    /// Human-readable listing, one line per item plus a totals line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for item in &self.items {
            let line = match &item.status {
                ItemStatus::Done { detail } => format!("  ok       {} ({detail})", item.key),
                ItemStatus::Skipped { reason } => format!("  skipped  {} ({reason})", item.key),
                ItemStatus::Failed { kind, message } => {
                    format!("  FAILED   {} [{kind:?}] {message}", item.key)
                }
                ItemStatus::Cancelled => format!("  cancel   {}", item.key),
            };
            out.push_str(&line);
            out.push('\n');
        }
        let c = self.counts();
        out.push_str(&format!(
            "{} done, {} skipped, {} failed, {} cancelled\n",
            c.done, c.skipped, c.failed, c.cancelled
        ));
        out
    }
}
