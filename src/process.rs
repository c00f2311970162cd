use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use futures::stream::{self, Stream, StreamExt, TryStreamExt};

use crate::config::Config;
use crate::parse::{ArchivedPost, Submission};
use crate::record::Record;
use crate::request::{
    create_client, ArchiveIndex, ContentApi, Pushshift, RedditSession, SearchQuery,
};
use crate::{info_time, Error, Result};

/// Outcome of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub rows: usize,
    pub pages: usize,
    pub output: PathBuf,
}

/// Authenticates, collects the configured forum and writes the corpus to `config.collect.output`.
/// The output file only appears once every row has been written.
pub async fn run(config: &Config) -> Result<Summary> {
    let start_time = Local::now();
    let client = create_client(&config.http)?;

    // Authentication failures must abort before anything touches the output path.
    let session = RedditSession::authenticate(client.clone(), &config.reddit).await?;
    info_time!(start_time, "Authenticated");

    let index = Pushshift::new(client, &config.pushshift);
    let collector = Collector::new(
        index,
        session,
        &config.collect.subreddit,
        config.collect.start_epoch(),
        config.pushshift.page_size,
        config.collect.limit,
    );

    let output = &config.collect.output;
    info_time!(
        "Collecting r/{} since {} (cap {}) into {}",
        config.collect.subreddit,
        config.collect.start_date,
        config.collect.limit,
        output.display()
    );
    let (rows, pages) = write_atomically(output, |file| collector.write_csv(file)).await?;

    let summary = Summary {
        rows,
        pages,
        output: output.clone(),
    };
    info_time!(
        start_time,
        "Wrote {} rows from {} pages to {}",
        summary.rows,
        summary.pages,
        summary.output.display()
    );
    Ok(summary)
}

/// Writes into `<path>.part` and renames it onto `path` once `write` succeeds.
/// On failure the partial file is removed.
async fn write_atomically<F, Fut, T>(path: &Path, write: F) -> Result<T>
where
    F: FnOnce(File) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let part = part_path(path);
    // The csv writer needs a blocking `Write`.
    let file = tokio::fs::File::create(&part).await?.into_std().await;
    let res = match write(file).await {
        Ok(value) => tokio::fs::rename(&part, path)
            .await
            .map(|_| value)
            .map_err(Error::from),
        Err(e) => Err(e),
    };
    if res.is_err() {
        if let Err(rm) = tokio::fs::remove_file(&part).await {
            log::warn!("Couldn't remove partial output {}: {rm}", part.display());
        }
    }
    res
}

fn second_of(created_utc: f64) -> i64 {
    created_utc.floor() as i64
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Pages through the archive index newest-first and hydrates every page through the content API.
pub struct Collector<'a, A, C> {
    index: A,
    api: C,
    subreddit: &'a str,
    after: i64,
    page_size: usize,
    limit: usize,
}

/// Cursor state carried between pages.
///
/// `before` is exclusive and sits one second past the oldest second seen, so posts sharing
/// that second with the end of a page are served again; `boundary` holds the ids of that
/// second that were already yielded.
#[derive(Debug, Clone, Default)]
struct Cursor {
    before: Option<i64>,
    boundary_second: Option<i64>,
    boundary: HashSet<String>,
    yielded: usize,
    pages: usize,
    stalled: bool,
}

impl<'a, A, C> Collector<'a, A, C>
where
    A: ArchiveIndex,
    C: ContentApi,
{
    pub fn new(
        index: A,
        api: C,
        subreddit: &'a str,
        after: i64,
        page_size: usize,
        limit: usize,
    ) -> Self {
        Collector {
            index,
            api,
            subreddit,
            after,
            page_size,
            limit,
        }
    }

    /// A lazy, single pass sequence of pages. Each item is a hydrated page and the number of
    /// pages requested so far. Ends when the index answers an empty page, when the cursor
    /// stalls, or once `limit` posts were yielded.
    fn pages(&self) -> impl Stream<Item = Result<(Vec<Submission>, usize)>> + '_ {
        stream::try_unfold(Cursor::default(), move |mut cursor| async move {
            if cursor.stalled || cursor.yielded >= self.limit {
                return Ok(None);
            }

            // Room for the boundary ids that come back again.
            let wanted = self.limit - cursor.yielded + cursor.boundary.len();
            let size = self.page_size.min(wanted);
            let query = SearchQuery {
                subreddit: self.subreddit,
                after: self.after,
                before: cursor.before,
                size,
            };
            let hits = self.index.search(&query).await?;
            cursor.pages += 1;
            if hits.is_empty() {
                log::debug!("Empty page, index exhausted");
                return Ok(None);
            }

            let oldest = hits
                .iter()
                .map(|hit| second_of(hit.created_utc))
                .min()
                .unwrap_or(self.after);
            let fresh: Vec<ArchivedPost> = hits
                .iter()
                .filter(|hit| !cursor.boundary.contains(&hit.id))
                .cloned()
                .collect();

            if fresh.is_empty() {
                // The page holds nothing but the boundary second. Step past it.
                log::debug!("Only already written posts at {oldest}, moving past that second");
                cursor.before = Some(oldest);
                cursor.boundary_second = None;
                cursor.boundary.clear();
                return Ok(Some(((Vec::new(), cursor.pages), cursor)));
            }

            if let Some(before) = cursor.before {
                if oldest >= before {
                    log::warn!("Cursor didn't move past {before}, stopping");
                    cursor.stalled = true;
                }
            }
            if cursor.boundary_second != Some(oldest) {
                cursor.boundary.clear();
            }
            cursor.boundary.extend(
                hits.iter()
                    .filter(|hit| second_of(hit.created_utc) == oldest)
                    .map(|hit| hit.id.clone()),
            );
            cursor.boundary_second = Some(oldest);
            cursor.before = Some(oldest + 1);

            let submissions = self.hydrate(&fresh).await?;
            cursor.yielded += submissions.len();
            log::debug!(
                "Page {}: {} hits, {} new, {} hydrated",
                cursor.pages,
                hits.len(),
                fresh.len(),
                submissions.len()
            );
            Ok::<_, Error>(Some(((submissions, cursor.pages), cursor)))
        })
    }

    /// Fetches the live posts for `hits`, in the index's order.
    async fn hydrate(&self, hits: &[ArchivedPost]) -> Result<Vec<Submission>> {
        let ids: Vec<String> = hits.iter().map(|hit| hit.id.clone()).collect();
        let mut by_id: HashMap<String, Submission> = self
            .api
            .submissions(&ids)
            .await?
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();

        let ordered = ids
            .iter()
            .filter_map(|id| {
                let found = by_id.remove(id);
                if found.is_none() {
                    log::debug!("{id} is gone from the content API, skipping");
                }
                found
            })
            .collect();
        Ok(ordered)
    }

    /// The records of the run, in the index's order, at most `limit` of them.
    /// Also reports how many pages were requested by the time each record was produced.
    pub fn records(&self) -> impl Stream<Item = Result<(Record, usize)>> + '_ {
        self.pages()
            .map_ok(|(page, pages)| {
                stream::iter(page.into_iter().map(move |submission| {
                    Record::from_submission(submission).map(|record| (record, pages))
                }))
            })
            .try_flatten()
            .take(self.limit)
    }

    /// Streams the records as CSV rows into `sink`, header first.
    /// Returns the number of rows and pages.
    pub async fn write_csv<W: Write>(&self, sink: W) -> Result<(usize, usize)> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(sink);
        writer.write_record(Record::HEADER)?;

        let mut rows = 0;
        let mut pages = 0;
        let records = self.records();
        futures::pin_mut!(records);
        while let Some((record, page)) = records.try_next().await? {
            writer.serialize(&record)?;
            rows += 1;
            pages = page;
        }
        writer.flush()?;
        Ok((rows, pages))
    }
}
