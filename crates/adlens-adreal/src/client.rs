//! HTTP client for the Gemius AdReal REST API.
//!
//! Wraps `reqwest` with AdReal-specific session handling and typed,
//! paginated retrieval. The API is offset-paginated with a `total_count`
//! field on every envelope, so after the first page the remaining offsets
//! are fetched concurrently and accumulated in completion order; page
//! order carries no meaning downstream. Any single page failure (after
//! retries) fails the whole collection: a partially fetched taxonomy would
//! silently corrupt ownership resolution.

use std::time::Duration;

use adlens_core::{AppConfig, BrandNode, SiteNode, StatRecord};
use futures::stream::{self, StreamExt};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::error::AdRealError;
use crate::retry::retry_with_backoff;
use crate::types::{PageEnvelope, StatsQuery};

const DEFAULT_BASE_URL: &str = "https://adreal.gemius.com/api";

/// Connection and pagination settings for [`AdRealClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub username: String,
    pub password: String,
    pub market: String,
    pub timeout_secs: u64,
    pub page_limit: u64,
    pub max_concurrent_pages: usize,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl ClientOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            username: config.adreal_username.clone(),
            password: config.adreal_password.clone(),
            market: config.market.clone(),
            timeout_secs: config.fetch_request_timeout_secs,
            page_limit: config.fetch_page_limit,
            max_concurrent_pages: config.fetch_max_concurrent_pages,
            max_retries: config.fetch_max_retries,
            retry_backoff_ms: config.fetch_retry_backoff_ms,
        }
    }
}

/// Client for the AdReal REST API.
///
/// Holds the cookie-keeping HTTP client (AdReal uses Django session auth),
/// credentials, and pagination settings. Use [`AdRealClient::new`] for
/// production or [`AdRealClient::with_base_url`] to point at a mock server
/// in tests. Call [`AdRealClient::login`] once before any fetch.
pub struct AdRealClient {
    http: Client,
    base_url: String,
    options: ClientOptions,
}

impl AdRealClient {
    /// Creates a new client pointed at the production AdReal API.
    ///
    /// # Errors
    ///
    /// Returns [`AdRealError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(options: ClientOptions) -> Result<Self, AdRealError> {
        Self::with_base_url(options, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`AdRealError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`AdRealError::InvalidBaseUrl`] if
    /// `base_url` is not a valid URL.
    pub fn with_base_url(options: ClientOptions, base_url: &str) -> Result<Self, AdRealError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .cookie_store(true)
            .user_agent("adlens/0.1 (ad-measurement)")
            .build()?;

        let trimmed = base_url.trim_end_matches('/');
        Url::parse(trimmed).map_err(|e| AdRealError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            http,
            base_url: trimmed.to_owned(),
            options,
        })
    }

    /// Establishes the API session.
    ///
    /// Fetches the login page to obtain the `csrftoken` cookie, then posts
    /// the credentials with the token echoed in both the form and the
    /// `X-CSRFToken` header, the way the Django endpoint expects.
    ///
    /// # Errors
    ///
    /// - [`AdRealError::MissingCsrfToken`] if the login page sets no token.
    /// - [`AdRealError::LoginFailed`] if the API rejects the credentials.
    /// - [`AdRealError::Http`] on network failure or non-2xx status.
    pub async fn login(&self) -> Result<(), AdRealError> {
        let login_url = format!("{}/login/?next=/api/", self.base_url);

        let response = self.http.get(&login_url).send().await?;
        let response = response.error_for_status()?;
        let csrftoken = response
            .cookies()
            .find(|c| c.name() == "csrftoken")
            .map(|c| c.value().to_owned())
            .ok_or_else(|| AdRealError::MissingCsrfToken {
                url: login_url.clone(),
            })?;

        let referer = format!("{}/{}/stats/", self.base_url, self.options.market);
        let form = [
            ("username", self.options.username.as_str()),
            ("password", self.options.password.as_str()),
            ("csrfmiddlewaretoken", csrftoken.as_str()),
        ];
        let response = self
            .http
            .post(&login_url)
            .header("Referer", referer)
            .header("X-CSRFToken", &csrftoken)
            .form(&form)
            .send()
            .await?;
        let response = response.error_for_status()?;

        let body = response.text().await?;
        if body.to_lowercase().contains("invalid") {
            return Err(AdRealError::LoginFailed {
                username: self.options.username.clone(),
            });
        }

        tracing::info!(
            user = %self.options.username,
            market = %self.options.market,
            "AdReal login succeeded"
        );
        Ok(())
    }

    /// Fetches the full brand taxonomy for a period (all pages).
    ///
    /// # Errors
    ///
    /// Fails if any page fails after retries; no partial taxonomy is
    /// returned.
    pub async fn fetch_brand_taxonomy(&self, period: &str) -> Result<Vec<BrandNode>, AdRealError> {
        let params = vec![("period".to_owned(), period.to_owned())];
        self.fetch_paged("brands", params, self.options.page_limit)
            .await
    }

    /// Fetches the full site/publisher taxonomy for a period (all pages).
    ///
    /// # Errors
    ///
    /// Fails if any page fails after retries; no partial taxonomy is
    /// returned.
    pub async fn fetch_site_taxonomy(&self, period: &str) -> Result<Vec<SiteNode>, AdRealError> {
        let params = vec![("period".to_owned(), period.to_owned())];
        self.fetch_paged("publishers", params, self.options.page_limit)
            .await
    }

    /// Fetches all stats records matching `query` (all pages).
    ///
    /// # Errors
    ///
    /// Fails if any page fails after retries; no partial stats collection is
    /// returned.
    pub async fn fetch_stats(&self, query: &StatsQuery) -> Result<Vec<StatRecord>, AdRealError> {
        let params = vec![
            ("brands".to_owned(), query.brands.clone()),
            ("format".to_owned(), "json".to_owned()),
            ("metrics".to_owned(), query.metrics.clone()),
            ("periods_range".to_owned(), query.periods_range.clone()),
            ("platforms".to_owned(), query.platforms.clone()),
            ("page_types".to_owned(), query.page_types.clone()),
            ("segments".to_owned(), query.segments.clone()),
        ];
        self.fetch_paged("stats", params, query.limit).await
    }

    /// Fetches every page of an offset-paginated endpoint.
    ///
    /// The first page reveals `total_count`; remaining offsets are fetched
    /// with bounded concurrency and accumulated in completion order. The
    /// first page error aborts the whole fetch.
    async fn fetch_paged<T>(
        &self,
        endpoint: &str,
        params: Vec<(String, String)>,
        limit: u64,
    ) -> Result<Vec<T>, AdRealError>
    where
        T: DeserializeOwned,
    {
        let limit = limit.max(1);

        let first: PageEnvelope<T> = self.fetch_page(endpoint, &params, limit, 0).await?;
        let total = first.total_count.unwrap_or(first.results.len() as u64);
        let mut results = first.results;

        let offsets: Vec<u64> = (limit..total).step_by(usize::try_from(limit).unwrap_or(usize::MAX)).collect();
        if offsets.is_empty() {
            tracing::debug!(endpoint, total, "fetched collection in a single page");
            return Ok(results);
        }

        tracing::debug!(
            endpoint,
            total,
            pages = offsets.len() + 1,
            "fetching remaining pages concurrently"
        );

        let mut pages = stream::iter(
            offsets
                .into_iter()
                .map(|offset| self.fetch_page::<T>(endpoint, &params, limit, offset)),
        )
        .buffer_unordered(self.options.max_concurrent_pages.max(1));

        while let Some(page) = pages.next().await {
            results.extend(page?.results);
        }

        tracing::debug!(endpoint, records = results.len(), "fetched collection");
        Ok(results)
    }

    /// Fetches a single page, retrying transient failures.
    async fn fetch_page<T>(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        limit: u64,
        offset: u64,
    ) -> Result<PageEnvelope<T>, AdRealError>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint_url(endpoint);
        let context = format!("{endpoint} offset={offset}");

        let mut query: Vec<(String, String)> = params.to_vec();
        query.push(("limit".to_owned(), limit.to_string()));
        query.push(("offset".to_owned(), offset.to_string()));

        retry_with_backoff(
            self.options.max_retries,
            self.options.retry_backoff_ms,
            || {
                let http = self.http.clone();
                let url = url.clone();
                let query = query.clone();
                let context = context.clone();
                async move {
                    let response = http.get(&url).query(&query).send().await?;
                    let response = response.error_for_status()?;
                    let body = response.text().await?;
                    serde_json::from_str(&body).map_err(|e| AdRealError::Deserialize {
                        context,
                        source: e,
                    })
                }
            },
        )
        .await
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}/{}/", self.base_url, self.options.market, endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ClientOptions {
        ClientOptions {
            username: "user".to_owned(),
            password: "pass".to_owned(),
            market: "ro".to_owned(),
            timeout_secs: 30,
            page_limit: 100_000,
            max_concurrent_pages: 5,
            max_retries: 0,
            retry_backoff_ms: 0,
        }
    }

    #[test]
    fn endpoint_url_includes_market_and_trailing_slash() {
        let client = AdRealClient::with_base_url(options(), "https://adreal.gemius.com/api")
            .expect("client construction should not fail");
        assert_eq!(
            client.endpoint_url("brands"),
            "https://adreal.gemius.com/api/ro/brands/"
        );
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = AdRealClient::with_base_url(options(), "https://adreal.gemius.com/api/")
            .expect("client construction should not fail");
        assert_eq!(
            client.endpoint_url("stats"),
            "https://adreal.gemius.com/api/ro/stats/"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = AdRealClient::with_base_url(options(), "not a url");
        assert!(matches!(result, Err(AdRealError::InvalidBaseUrl { .. })));
    }
}
