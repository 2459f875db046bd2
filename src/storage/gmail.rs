//! Gmail REST store
//!
//! Talks to `users.messages.list` / `users.messages.get`. The list endpoint
//! returns messages newest first; the oldest match in a range is the last id
//! of the final page.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::security::token::TokenSource;
use crate::storage::{MessageStore, StoredItem, dated_query};

/// Upper bound on pages walked for one earliest-item fetch.
const MAX_PAGES: usize = 200;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageMetadata {
    internal_date: String,
}

pub struct GmailStore {
    client: reqwest::Client,
    api_base: String,
    tokens: Arc<dyn TokenSource>,
    page_size: u32,
}

impl GmailStore {
    pub fn new(
        client: reqwest::Client,
        api_base: &str,
        tokens: Arc<dyn TokenSource>,
        page_size: u32,
    ) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            tokens,
            page_size: page_size.clamp(1, 500),
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/gmail/v1/users/me/messages", self.api_base)
    }

    async fn list_page(
        &self,
        query: &str,
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<ListResponse> {
        let token = self.tokens.access_token().await?;
        let mut params = vec![
            ("q", query.to_string()),
            ("maxResults", max_results.to_string()),
            ("includeSpamTrash", "false".to_string()),
            ("fields", "messages/id,nextPageToken".to_string()),
        ];
        if let Some(page_token) = page_token {
            params.push(("pageToken", page_token.to_string()));
        }

        let response = self
            .client
            .get(self.messages_url())
            .bearer_auth(token)
            .query(&params)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppError::Authentication(
            format!("Gmail rejected credentials ({}): {}", status, body),
        )),
        _ => Err(AppError::Upstream(format!(
            "Gmail request failed ({}): {}",
            status, body
        ))),
    }
}

#[async_trait]
impl MessageStore for GmailStore {
    async fn exists_in_range(
        &self,
        query: &str,
        start: NaiveDate,
        end_exclusive: NaiveDate,
    ) -> Result<bool> {
        let q = dated_query(query, start, end_exclusive);
        let page = self.list_page(&q, 1, None).await?;
        debug!(query = %q, exists = !page.messages.is_empty(), "Gmail existence probe");
        Ok(!page.messages.is_empty())
    }

    async fn fetch_earliest_in_range(
        &self,
        query: &str,
        start: NaiveDate,
        end_exclusive: NaiveDate,
    ) -> Result<Option<StoredItem>> {
        let q = dated_query(query, start, end_exclusive);
        let mut page_token: Option<String> = None;
        let mut last_id: Option<String> = None;

        for page_number in 0..MAX_PAGES {
            let page = self
                .list_page(&q, self.page_size, page_token.as_deref())
                .await?;
            if let Some(last) = page.messages.last() {
                last_id = Some(last.id.clone());
            }
            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => {
                    debug!(query = %q, pages = page_number + 1, "Reached final results page");
                    break;
                }
            }
        }

        if page_token.is_some() {
            // The last id seen is not the oldest match.
            warn!(query = %q, pages = MAX_PAGES, "Page limit reached before final results page");
            return Ok(None);
        }

        let Some(id) = last_id else {
            return Ok(None);
        };
        let timestamp_ms = self.get_item_timestamp(&id).await?;
        Ok(Some(StoredItem { id, timestamp_ms }))
    }

    async fn get_item_timestamp(&self, id: &str) -> Result<i64> {
        let token = self.tokens.access_token().await?;
        let response = self
            .client
            .get(format!("{}/{}", self.messages_url(), id))
            .bearer_auth(token)
            .query(&[("format", "minimal"), ("fields", "id,internalDate")])
            .send()
            .await?;

        let metadata: MessageMetadata = check_status(response).await?.json().await?;
        metadata.internal_date.parse::<i64>().map_err(|e| {
            AppError::Upstream(format!(
                "message {} has unreadable internalDate {:?}: {}",
                id, metadata.internal_date, e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::token::StaticToken;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store(server: &MockServer) -> GmailStore {
        GmailStore::new(
            reqwest::Client::new(),
            &server.uri(),
            Arc::new(StaticToken::new("test-token")),
            500,
        )
    }

    #[tokio::test]
    async fn test_exists_in_range_sends_dated_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .and(header("authorization", "Bearer test-token"))
            .and(query_param("q", "from:(spotify.com) after:2010/01/01 before:2010/02/01"))
            .and(query_param("maxResults", "1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"messages": [{"id": "m1"}]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let exists = store(&server)
            .exists_in_range("from:(spotify.com)", date(2010, 1, 1), date(2010, 2, 1))
            .await
            .unwrap();
        assert!(exists);
    }

    #[tokio::test]
    async fn test_exists_in_range_empty_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let exists = store(&server)
            .exists_in_range("", date(2010, 1, 1), date(2010, 2, 1))
            .await
            .unwrap();
        assert!(!exists);
    }

    #[tokio::test]
    async fn test_fetch_earliest_uses_last_item_of_final_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .and(query_param("pageToken", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [{"id": "m3"}, {"id": "m4-oldest"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [{"id": "m1"}, {"id": "m2"}],
                "nextPageToken": "page-2"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages/m4-oldest"))
            .and(query_param("format", "minimal"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "m4-oldest",
                "internalDate": "1262304000000"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let item = store(&server)
            .fetch_earliest_in_range("", date(2009, 12, 1), date(2010, 2, 1))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(item.id, "m4-oldest");
        assert_eq!(item.timestamp_ms, 1_262_304_000_000);
    }

    #[tokio::test]
    async fn test_fetch_earliest_no_matches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let item = store(&server)
            .fetch_earliest_in_range("", date(2009, 12, 1), date(2010, 2, 1))
            .await
            .unwrap();
        assert!(item.is_none());
    }

    #[tokio::test]
    async fn test_fetch_earliest_gives_up_without_final_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [{"id": "m1"}, {"id": "m2"}],
                "nextPageToken": "more"
            })))
            .expect(MAX_PAGES as u64)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages/m2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "m2", "internalDate": "1264982400000"
            })))
            .expect(0)
            .mount(&server)
            .await;

        let item = store(&server)
            .fetch_earliest_in_range("", date(2009, 12, 1), date(2010, 2, 1))
            .await
            .unwrap();
        assert!(item.is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_token"))
            .mount(&server)
            .await;

        let err = store(&server)
            .exists_in_range("", date(2010, 1, 1), date(2010, 2, 1))
            .await
            .unwrap_err();
        assert!(err.is_authentication());
    }

    #[tokio::test]
    async fn test_server_error_maps_to_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = store(&server)
            .exists_in_range("", date(2010, 1, 1), date(2010, 2, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_unreadable_internal_date() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages/m1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "m1",
                "internalDate": "yesterday"
            })))
            .mount(&server)
            .await;

        let err = store(&server).get_item_timestamp("m1").await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }
}
