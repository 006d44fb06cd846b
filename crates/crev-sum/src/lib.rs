//! Summarization for crev: assemble context documents, feed them through a
//! pluggable [`Summarizer`] with per-phase prompts, and store the results.

pub mod pipeline;
pub mod prompts;
pub mod select;
pub mod summarizer;

pub use pipeline::{
    parse_categories, sum_pr, sum_pr_batch, sum_repo, sum_repo_batch, SumContext, SumError,
    SumOptions, SumOutcome,
};
pub use prompts::{Phase, Prompts};
pub use select::{select_prs, select_repos, SelectError};
pub use summarizer::{CommandSummarizer, Summarizer};
