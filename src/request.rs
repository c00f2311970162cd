use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};

use crate::config::{HttpConfig, PushshiftConfig, RedditConfig};
use crate::parse::{parse_listing, parse_search, parse_token, ArchivedPost, Submission, LINK_KIND};
use crate::{Error, Result};

/// The content API accepts at most this many ids per info request.
const INFO_BATCH: usize = 100;

/// One page request against the archive index.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery<'a> {
    pub subreddit: &'a str,
    /// Inclusive lower bound, epoch seconds.
    pub after: i64,
    /// Exclusive upper bound, epoch seconds. `None` on the first page.
    pub before: Option<i64>,
    pub size: usize,
}

/// Archival search index over a forum's history.
#[async_trait]
pub trait ArchiveIndex {
    /// Returns one page of hits, newest first.
    async fn search(&self, query: &SearchQuery<'_>) -> Result<Vec<ArchivedPost>>;
}

/// Live content API, used to hydrate ids into posts as they are at fetch time.
#[async_trait]
pub trait ContentApi {
    /// Posts the API no longer knows about are left out.
    async fn submissions(&self, ids: &[String]) -> Result<Vec<Submission>>;
}

/// Create a configured asynchronous HTTP client.
pub fn create_client(config: &HttpConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Fails with `UpstreamStatus` unless the response is a success, otherwise returns the body.
async fn response_text(res: Response, service: &'static str) -> Result<String> {
    let status = res.status();
    if !status.is_success() {
        return Err(Error::UpstreamStatus { service, status });
    }
    Ok(res.text().await?)
}

/// An authenticated session against the content API.
pub struct RedditSession {
    // Client uses Arc so we can clone cheaply
    client: Client,
    api_url: String,
    token: String,
}

impl RedditSession {
    /// Exchanges the script credentials for a bearer token (password grant).
    pub async fn authenticate(client: Client, config: &RedditConfig) -> Result<Self> {
        log::info!("Authenticating as {}", config.username);
        let res = client
            .post(&config.auth_url)
            .basic_auth(&config.client_id, Some(&config.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", config.username.as_str()),
                ("password", config.password.as_str()),
            ])
            .send()
            .await?;

        let status = res.status();
        if status.is_client_error() {
            return Err(Error::Authentication(format!(
                "token endpoint answered {status}"
            )));
        }
        let token = parse_token(&response_text(res, "reddit auth").await?)?;

        Ok(RedditSession {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token,
        })
    }
}

#[async_trait]
impl ContentApi for RedditSession {
    async fn submissions(&self, ids: &[String]) -> Result<Vec<Submission>> {
        let mut submissions = Vec::with_capacity(ids.len());
        for batch in ids.chunks(INFO_BATCH) {
            let res = self
                .client
                .get(format!("{}/api/info", self.api_url))
                .bearer_auth(&self.token)
                .query(&[("id", fullnames(batch)), ("raw_json", "1".into())])
                .send()
                .await?;
            submissions.extend(parse_listing(&response_text(res, "reddit").await?)?);
        }
        Ok(submissions)
    }
}

/// `t3_` prefixed, comma separated ids.
fn fullnames(ids: &[String]) -> String {
    ids.iter()
        .map(|id| format!("{LINK_KIND}_{id}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Client for the archive index's submission search.
pub struct Pushshift {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl Pushshift {
    pub fn new(client: Client, config: &PushshiftConfig) -> Self {
        Pushshift {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }
}

#[async_trait]
impl ArchiveIndex for Pushshift {
    async fn search(&self, query: &SearchQuery<'_>) -> Result<Vec<ArchivedPost>> {
        log::debug!("Requesting page: {query:?}");
        let mut req = self
            .client
            .get(format!("{}/reddit/search/submission/", self.base_url))
            .query(&search_params(query));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let res = req.send().await?;
        parse_search(&response_text(res, "pushshift").await?)
    }
}

fn search_params(query: &SearchQuery<'_>) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("subreddit", query.subreddit.to_string()),
        ("after", query.after.to_string()),
        ("size", query.size.to_string()),
        ("sort", "desc".into()),
        ("sort_type", "created_utc".into()),
        ("fields", "id,created_utc".into()),
    ];
    if let Some(before) = query.before {
        params.push(("before", before.to_string()));
    }
    params
}
