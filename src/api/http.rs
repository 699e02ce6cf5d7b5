//! reqwest-backed list source for the portal REST API.

use std::marker::PhantomData;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use url::Url;

use super::{ListSource, PageRequest, PageResponse};
use crate::config::Config;
use crate::error::{PortalError, Result};
use crate::types::{CurrentUser, Resource, Row};

/// Maximum number of characters of an error body carried into an error message.
const MAX_ERROR_BODY: usize = 200;

/// Fetches pages of `R` from `{base_url}/{resource}`.
#[derive(Debug)]
pub struct HttpListSource<R> {
    client: Client,
    base_url: Url,
    resource: Resource,
    _row: PhantomData<fn() -> R>,
}

impl<R> Clone for HttpListSource<R> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            resource: self.resource,
            _row: PhantomData,
        }
    }
}

impl<R: Row> HttpListSource<R> {
    pub fn new(base_url: &str, resource: Resource, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        // A trailing slash makes `join` append instead of replacing the last segment.
        let mut base = base_url.trim_end_matches('/').to_string();
        base.push('/');
        Ok(Self {
            client,
            base_url: Url::parse(&base)?,
            resource,
            _row: PhantomData,
        })
    }

    /// Build a source from the loaded configuration.
    pub fn from_config(config: &Config, resource: Resource) -> Result<Self> {
        let base_url = config.base_url().ok_or_else(|| {
            PortalError::Config(
                "api.base_url is not set. Run: portal config set api.base_url <url>".to_string(),
            )
        })?;
        Self::new(&base_url, resource, config.api_timeout())
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    /// Full URL for a page request, query string included.
    pub fn page_url(&self, request: &PageRequest) -> Result<Url> {
        let mut url = self.base_url.join(self.resource.path())?;
        url.query_pairs_mut().extend_pairs(request.query_pairs());
        Ok(url)
    }

    async fn handle_response(response: reqwest::Response) -> Result<PageResponse<R>> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message: String = text.chars().take(MAX_ERROR_BODY).collect();
            return Err(match status {
                StatusCode::UNAUTHORIZED => PortalError::Unauthorized,
                StatusCode::FORBIDDEN => PortalError::Forbidden(message),
                StatusCode::NOT_FOUND => PortalError::NotFound(message),
                StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                    PortalError::Validation(message)
                }
                other => PortalError::Api {
                    status: other.as_u16(),
                    message,
                },
            });
        }

        let bytes = response.bytes().await?;
        let page: PageResponse<R> = serde_json::from_slice(&bytes)?;
        page.validate()?;
        Ok(page)
    }
}

impl<R: Row> ListSource for HttpListSource<R> {
    type Row = R;

    async fn fetch_page(&self, user: &CurrentUser, request: PageRequest) -> Result<PageResponse<R>> {
        let url = self.page_url(&request)?;
        tracing::debug!(resource = %self.resource, %url, "fetching page");

        let mut builder = self.client.get(url);
        if let Some(bearer) = user.bearer() {
            builder = builder.header(reqwest::header::AUTHORIZATION, bearer);
        }

        let response = builder.send().await?;
        Self::handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Record;

    fn source(base: &str) -> HttpListSource<Record> {
        HttpListSource::new(base, Resource::Products, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_page_url_appends_resource_to_base_path() {
        let request = PageRequest::new(3, 20);
        let url = source("https://portal.example.com/api/v1/")
            .page_url(&request)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://portal.example.com/api/v1/products?page=3&limit=20"
        );
    }

    #[test]
    fn test_page_url_without_trailing_slash() {
        let request = PageRequest::new(1, 10);
        let url = source("https://portal.example.com/api")
            .page_url(&request)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://portal.example.com/api/products?page=1&limit=10"
        );
    }

    #[test]
    fn test_page_url_encodes_search_and_filters() {
        let mut request = PageRequest::new(1, 10);
        request.search = Some("hex bolt".to_string());
        request
            .filters
            .insert("status".to_string(), Some("draft".to_string()));
        let url = source("http://localhost:8080").page_url(&request).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/products?page=1&limit=10&keyword=hex+bolt&status=draft"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result =
            HttpListSource::<Record>::new("not a url", Resource::Products, Duration::from_secs(1));
        assert!(matches!(result, Err(PortalError::Url(_))));
    }
}
