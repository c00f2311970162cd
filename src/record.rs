use chrono::{DateTime, NaiveDateTime};
use serde::{Serialize, Serializer};

use crate::parse::Submission;
use crate::{Error, Result};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One post projected to the columns of the corpus.
/// Field order is the column order of the output file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub title: String,
    pub score: i64,
    pub id: String,
    pub subreddit: String,
    pub url: String,
    pub num_comms: u64,
    pub created: f64,
    pub body: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: NaiveDateTime,
}

impl Record {
    pub const HEADER: [&'static str; 9] = [
        "title",
        "score",
        "id",
        "subreddit",
        "url",
        "num_comms",
        "created",
        "body",
        "timestamp",
    ];

    pub fn from_submission(submission: Submission) -> Result<Self> {
        Ok(Record {
            timestamp: timestamp_from_created(submission.created_utc)?,
            title: submission.title,
            score: submission.score,
            id: submission.id,
            subreddit: submission.subreddit,
            url: submission.url,
            num_comms: submission.num_comments,
            created: submission.created_utc,
            body: submission.selftext,
        })
    }
}

/// Converts fractional epoch seconds into a UTC calendar timestamp.
pub fn timestamp_from_created(created: f64) -> Result<NaiveDateTime> {
    if !created.is_finite() {
        return Err(Error::InvalidTimestamp(created));
    }
    let secs = created.floor();
    let nanos = ((created - secs) * 1_000_000_000.0).round().min(999_999_999.0) as u32;
    if secs < i64::MIN as f64 || secs > i64::MAX as f64 {
        return Err(Error::InvalidTimestamp(created));
    }
    DateTime::from_timestamp(secs as i64, nanos)
        .map(|dt| dt.naive_utc())
        .ok_or(Error::InvalidTimestamp(created))
}

fn serialize_timestamp<S: Serializer>(
    ts: &NaiveDateTime,
    serializer: S,
) -> core::result::Result<S::Ok, S::Error> {
    serializer.collect_str(&ts.format(TIMESTAMP_FORMAT))
}
