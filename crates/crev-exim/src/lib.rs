//! Export and import of workspace subtrees.
//!
//! [`archive`] is a pure text codec; [`export`] walks the workspace and
//! writes an archive or a folder copy; [`merge`] applies entries onto a
//! workspace with whole-key collision skipping.

pub mod archive;
pub mod export;
pub mod merge;

pub use archive::{decode, encode, Decoded, Encoded, Entry, RecordError, Rejected};
pub use export::{
    collect_export, export, ExportOptions, ExportReport, OutputFormat, ARCHIVE_EXTENSION,
    DEFAULT_EXPORT_NAME,
};
pub use merge::{entries_from_folder, import_path, merge_entries, MergeError, MergeFailure, MergeReport};
