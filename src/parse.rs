//! Payloads returned by the content API and the archive index.

use serde::Deserialize;

use crate::{Error, Result};

/// Kind prefix of a link (post) in the content API.
pub(crate) const LINK_KIND: &str = "t3";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

/// Extracts the bearer token from the token endpoint's answer.
/// The endpoint reports bad credentials with a success status and an `error` field.
pub(crate) fn parse_token(body: &str) -> Result<String> {
    let res: TokenResponse = serde_json::from_str(body)
        .map_err(|e| Error::Authentication(format!("unreadable token response: {e}")))?;
    match (res.access_token, res.error) {
        (_, Some(error)) => Err(Error::Authentication(error)),
        (Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(Error::Authentication("no access token in response".into())),
    }
}

/// A hit of the archive index, projected to what is needed to page and hydrate.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ArchivedPost {
    pub id: String,
    pub created_utc: f64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Vec<ArchivedPost>,
}

pub(crate) fn parse_search(body: &str) -> Result<Vec<ArchivedPost>> {
    let res: SearchResponse = serde_json::from_str(body)?;
    Ok(res.data)
}

/// A post as the content API reports it at fetch time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Submission {
    pub id: String,
    pub title: String,
    pub score: i64,
    pub subreddit: String,
    #[serde(default)]
    pub url: String,
    pub num_comments: u64,
    pub created_utc: f64,
    #[serde(default)]
    pub selftext: String,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    kind: String,
    data: serde_json::Value,
}

/// Returns the posts of a listing, skipping things that aren't links.
pub(crate) fn parse_listing(body: &str) -> Result<Vec<Submission>> {
    let listing: Listing = serde_json::from_str(body)?;
    listing
        .data
        .children
        .into_iter()
        .filter(|thing| thing.kind == LINK_KIND)
        .map(|thing| serde_json::from_value(thing.data).map_err(Error::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_extracted() {
        let body = r#"{"access_token": "abc", "token_type": "bearer", "expires_in": 86400, "scope": "*"}"#;
        assert_eq!(parse_token(body).unwrap(), "abc");
    }

    #[test]
    fn token_error_is_an_authentication_failure() {
        let err = parse_token(r#"{"error": "invalid_grant"}"#).unwrap_err();
        assert!(matches!(err, Error::Authentication(msg) if msg == "invalid_grant"));

        assert!(matches!(
            parse_token("<html>busy</html>"),
            Err(Error::Authentication(_))
        ));
        assert!(matches!(parse_token("{}"), Err(Error::Authentication(_))));
    }

    #[test]
    fn search_hits_accept_integer_times() {
        let body = r#"{"data": [
            {"id": "f0x1ab", "created_utc": 1580860800},
            {"id": "f0x0zz", "created_utc": 1580860700.0}
        ]}"#;
        let hits = parse_search(body).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "f0x1ab");
        assert_eq!(hits[0].created_utc, 1_580_860_800.0);
    }

    #[test]
    fn malformed_search_is_a_json_error() {
        assert!(matches!(parse_search(r#"{"detail": "nope"}"#), Err(Error::Json(_))));
    }

    #[test]
    fn listing_keeps_only_links() {
        let body = r#"{"kind": "Listing", "data": {"after": null, "children": [
            {"kind": "t3", "data": {
                "id": "f0x1ab", "title": "First post", "score": 12,
                "subreddit": "asktransgender",
                "url": "https://www.reddit.com/r/asktransgender/comments/f0x1ab/first_post/",
                "num_comments": 3, "created_utc": 1580860800.0,
                "selftext": "multi\nline, body", "author": "someone"
            }},
            {"kind": "t1", "data": {"id": "c1", "body": "a comment"}},
            {"kind": "t3", "data": {
                "id": "f0x0zz", "title": "Link post", "score": -1,
                "subreddit": "asktransgender", "url": "https://example.org/",
                "num_comments": 0, "created_utc": 1580860700.0
            }}
        ]}}"#;
        let posts = parse_listing(body).unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].selftext, "multi\nline, body");
        assert_eq!(posts[1].score, -1);
        assert_eq!(posts[1].selftext, "");
    }
}
