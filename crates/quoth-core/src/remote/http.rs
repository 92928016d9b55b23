//! HTTP implementation of the remote source

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::RemoteSource;
use crate::config::Config;
use crate::error::{QuoteError, QuoteResult};
use crate::models::{Quote, QuoteId, MAX_QUOTE_ID};

/// User id sent with pushed quotes; the endpoint requires one
const PUSH_USER_ID: u32 = 1;

/// Record as listed by the remote endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RemotePost {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewPost<'a> {
    title: &'a str,
    body: &'a str,
    user_id: u32,
}

/// Remote source over HTTP
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    url: String,
    limit: usize,
}

impl HttpRemote {
    pub fn new(url: impl Into<String>, limit: usize, timeout: Duration) -> QuoteResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("quoth/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
            limit,
        })
    }

    pub fn from_config(config: &Config) -> QuoteResult<Self> {
        Self::new(
            config.remote_url.clone(),
            config.fetch_limit,
            config.request_timeout(),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RemoteSource for HttpRemote {
    async fn fetch_remote_quotes(&self) -> QuoteResult<Vec<Quote>> {
        debug!("Fetching up to {} remote quotes from {}", self.limit, self.url);

        let response = self
            .client
            .get(&self.url)
            .query(&[("_limit", self.limit)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(QuoteError::Network(format!(
                "GET {} returned {}",
                self.url, status
            )));
        }

        let posts: Vec<RemotePost> = response.json().await?;
        Ok(map_remote_posts(posts, self.limit, Utc::now()))
    }

    async fn push_quote(&self, quote: &Quote) -> QuoteResult<()> {
        let payload = NewPost {
            title: &quote.text,
            body: &quote.category,
            user_id: PUSH_USER_ID,
        };

        let response = self.client.post(&self.url).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(QuoteError::Network(format!(
                "POST {} returned {}",
                self.url, status
            )));
        }

        debug!("Pushed quote {} ({})", quote.id, status);
        Ok(())
    }
}

/// Map remote posts into local quotes
///
/// Text comes from `title`, or `body` when the title is blank. Posts with
/// neither are skipped. At most `limit` quotes are returned.
pub fn map_remote_posts(posts: Vec<RemotePost>, limit: usize, now: DateTime<Utc>) -> Vec<Quote> {
    posts
        .into_iter()
        .filter_map(|post| {
            let text = match post.title.trim() {
                "" => post.body.trim(),
                title => title,
            };
            if text.is_empty() {
                warn!("Skipping remote record {} without text", post.id);
                return None;
            }
            if post.id > MAX_QUOTE_ID {
                warn!("Skipping remote record {} with out-of-range id", post.id);
                return None;
            }
            Some(Quote::from_remote(QuoteId(post.id), text, now))
        })
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Origin, SERVER_CATEGORY};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn post(id: u64, title: &str, body: &str) -> RemotePost {
        RemotePost {
            id,
            title: title.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_map_remote_posts_skips_out_of_range_ids() {
        let quotes = map_remote_posts(
            vec![post(u64::MAX, "too big", ""), post(7, "fits", "")],
            10,
            Utc::now(),
        );
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].id, QuoteId(7));
    }

    #[test]
    fn test_map_remote_posts() {
        let now = Utc::now();
        let quotes = map_remote_posts(
            vec![post(1, "sunt aut facere", "quia et suscipit"), post(2, "  ", "body only")],
            5,
            now,
        );

        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].id, QuoteId(1));
        assert_eq!(quotes[0].text, "sunt aut facere");
        assert_eq!(quotes[0].category, SERVER_CATEGORY);
        assert_eq!(quotes[0].origin, Origin::Remote);
        assert_eq!(quotes[1].text, "body only");
    }

    #[test]
    fn test_map_remote_posts_skips_empty_and_limits() {
        let posts = (1..=10).map(|i| post(i, &format!("title {}", i), "")).collect();
        assert_eq!(map_remote_posts(posts, 5, Utc::now()).len(), 5);

        let quotes = map_remote_posts(vec![post(1, "", ""), post(2, "B", "")], 5, Utc::now());
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].id, QuoteId(2));
    }

    #[tokio::test]
    async fn test_fetch_remote_quotes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts"))
            .and(query_param("_limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"userId": 1, "id": 1, "title": "first", "body": "b1"},
                {"userId": 1, "id": 2, "title": "second", "body": "b2"},
                {"userId": 1, "id": 3, "title": "third", "body": "b3"}
            ])))
            .mount(&server)
            .await;

        let remote =
            HttpRemote::new(format!("{}/posts", server.uri()), 2, Duration::from_secs(5)).unwrap();
        let quotes = remote.fetch_remote_quotes().await.unwrap();

        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[1].id, QuoteId(2));
        assert_eq!(quotes[1].text, "second");
    }

    #[tokio::test]
    async fn test_fetch_server_error_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let remote =
            HttpRemote::new(format!("{}/posts", server.uri()), 5, Duration::from_secs(5)).unwrap();
        let err = remote.fetch_remote_quotes().await.unwrap_err();
        assert!(matches!(err, QuoteError::Network(_)));
    }

    #[tokio::test]
    async fn test_fetch_bad_json_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let remote =
            HttpRemote::new(format!("{}/posts", server.uri()), 5, Duration::from_secs(5)).unwrap();
        assert!(remote.fetch_remote_quotes().await.unwrap_err().is_network());
    }

    #[tokio::test]
    async fn test_push_quote() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/posts"))
            .and(body_partial_json(json!({
                "title": "Knowledge is power.",
                "body": "Education",
                "userId": 1
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 101})))
            .expect(1)
            .mount(&server)
            .await;

        let remote =
            HttpRemote::new(format!("{}/posts", server.uri()), 5, Duration::from_secs(5)).unwrap();
        let quote =
            Quote::new_local(QuoteId(7), "Knowledge is power.", "Education", Utc::now()).unwrap();

        remote.push_quote(&quote).await.unwrap();
    }

    #[tokio::test]
    async fn test_push_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let remote =
            HttpRemote::new(format!("{}/posts", server.uri()), 5, Duration::from_secs(5)).unwrap();
        let quote = Quote::new_local(QuoteId(7), "A", "X", Utc::now()).unwrap();

        let err = remote.push_quote(&quote).await.unwrap_err();
        assert!(matches!(err, QuoteError::Network(_)));
    }
}
