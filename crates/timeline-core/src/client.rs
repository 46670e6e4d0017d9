use std::time::Duration;

use anyhow::{Context, anyhow};
use reqwest::{Client, StatusCode};
use timeline_shared::{ApiErrorBody, NewTimelineItem, TimelineItem};
use tracing::{debug, info};

use crate::config::{Config, DEFAULT_API_URL};

pub const TIMELINE_PATH: &str = "/api/v1/timeline";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP client for the timeline persistence service.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed building HTTP client for timeline API")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let base_url = cfg
            .get("api.url")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let timeout = cfg.get_u64("api.timeout")?.unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self::new(base_url, Duration::from_secs(timeout))
    }

    pub fn timeline_url(&self) -> String {
        format!("{}{TIMELINE_PATH}", self.base_url)
    }

    #[tracing::instrument(skip(self), fields(url = %self.timeline_url()))]
    pub async fn fetch_items(&self) -> anyhow::Result<Vec<TimelineItem>> {
        let url = self.timeline_url();
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("failed requesting {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "failed to fetch items: {}",
                describe_failure(status, &body)
            ));
        }

        let items: Vec<TimelineItem> = response
            .json()
            .await
            .context("failed to decode timeline items")?;
        info!(count = items.len(), "fetched timeline items");
        Ok(items)
    }

    #[tracing::instrument(
        skip(self, new_item),
        fields(group = %new_item.group, name = %new_item.name)
    )]
    pub async fn create_item(&self, new_item: &NewTimelineItem) -> anyhow::Result<TimelineItem> {
        let url = self.timeline_url();
        let response = self
            .client
            .post(&url)
            .json(new_item)
            .send()
            .await
            .with_context(|| format!("failed posting to {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "failed to add item: {}",
                describe_failure(status, &body)
            ));
        }

        let created: TimelineItem = response
            .json()
            .await
            .context("failed to decode created item")?;
        debug!(id = created.id, "server assigned id");
        Ok(created)
    }
}

/// `"<status> - <detail>"`, falling back to the raw body when it is not an
/// API error document.
pub fn describe_failure(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.detail_text())
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| "Unknown error".to_string());
    format!("{status} - {detail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeline_url_ignores_trailing_slash() {
        let client =
            ApiClient::new("http://localhost:8000/", Duration::from_secs(1)).expect("client");
        assert_eq!(client.timeline_url(), "http://localhost:8000/api/v1/timeline");
    }

    #[test]
    fn client_reads_url_from_config() {
        let mut cfg = Config::default();
        cfg.apply_overrides(vec![("api.url".to_string(), "http://api.test:9000".to_string())]);
        let client = ApiClient::from_config(&cfg).expect("client");
        assert_eq!(client.timeline_url(), "http://api.test:9000/api/v1/timeline");
    }

    #[test]
    fn failure_uses_detail_when_present() {
        let text = describe_failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail":"end before start"}"#,
        );
        assert_eq!(text, "422 Unprocessable Entity - end before start");
    }

    #[test]
    fn failure_falls_back_to_raw_body() {
        let text = describe_failure(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(text, "502 Bad Gateway - upstream down");
        let empty = describe_failure(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert_eq!(empty, "500 Internal Server Error - Unknown error");
    }
}
