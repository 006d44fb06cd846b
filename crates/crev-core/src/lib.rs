//! Shared foundation for crev: the workspace path scheme, export scope,
//! `configs.json` model, batch reports, and the bounded worker pool.
//!
//! The workspace is a plain directory tree addressed through [`Workspace`]
//! and the key types in [`paths`]. There is no lock file: running two crev
//! processes that write to the same workspace root at once is unsupported
//! and can leave it inconsistent.

pub mod config;
pub mod fsutil;
pub mod paths;
pub mod pool;
pub mod report;
pub mod scope;

pub use config::{ConfigError, RepoEntry, SummarizerConfig, WorkspaceConfig};
pub use fsutil::{has_any_file, is_binary, walk_files, write_atomic};
pub use paths::{parse_key, validate_relative, Category, Key, PathError, PrKey, RepoKey, Workspace};
pub use pool::{run_batch, run_bounded};
pub use report::{BatchReport, FailureKind, ItemOutcome, ItemStatus};
pub use scope::Scope;
pub use tokio_util::sync::CancellationToken;
