//! Context Assembler: renders stored repository and pull request artifacts
//! into markdown documents for the summarizer or a human reader.
//!
//! Rendering never modifies or truncates content, and files appear in the
//! order the caller supplies them, so identical inputs give identical output.

pub mod listing;
pub mod markdown;
pub mod pr;
pub mod repo;

pub use listing::{render_file_listing, FileListing};
pub use markdown::{language_hint, Snapshot};
pub use pr::{load_pr, render_pr, PrDocument, PrFile};
pub use repo::{render_repo, render_structure, FileCategories};
