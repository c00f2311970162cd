//! Collects a subreddit's post history into a CSV corpus.
//!
//! Post ids come from an archive index (Pushshift), paged newest-first from a start date.
//! Each page is hydrated through the Reddit API so scores and comment counts are current,
//! and every post is written as one CSV row as soon as it arrives.

mod error;
mod macros;
mod parse;

pub mod config;
pub mod process;
pub mod record;
pub mod request;

pub use error::{Error, Result};
pub use parse::{ArchivedPost, Submission};

const DEFAULT_SUBREDDIT: &str = "asktransgender";
const DEFAULT_OUTPUT: &str = "asktransgender_corpus_updated.csv";
/// Largest page the archive index serves.
const DEFAULT_PAGE_SIZE: usize = 100;
const DEFAULT_LIMIT: usize = 280_000;
