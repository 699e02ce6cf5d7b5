//! List API contract.
//!
//! This module defines the request/response shapes of the portal's paginated
//! list endpoints and the `ListSource` trait the list controller fetches
//! through. `http` provides the reqwest-backed implementation.

pub mod http;

use std::collections::BTreeMap;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::{PortalError, Result};
use crate::types::{CurrentUser, Row};

pub use http::HttpListSource;

/// One page request. Built fresh for every fetch and not modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
    pub search: Option<String>,
    pub filters: BTreeMap<String, Option<String>>,
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
            search: None,
            filters: BTreeMap::new(),
        }
    }

    /// Query parameters in the order the backend documents them.
    ///
    /// Empty search text and filters set to `None` are omitted.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.per_page.to_string()),
        ];
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("keyword".to_string(), search.to_string()));
        }
        for (key, value) in &self.filters {
            if let Some(value) = value {
                pairs.push((key.clone(), value.clone()));
            }
        }
        pairs
    }
}

/// Pagination metadata returned with every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total_items: u64,
    pub items_per_page: u32,
    pub current_page: u32,
    pub total_pages: u32,
}

impl PageMeta {
    /// Reject metadata that cannot describe a real page.
    pub fn validate(&self) -> Result<()> {
        if self.items_per_page == 0 {
            return Err(PortalError::InvalidMeta(
                "itemsPerPage must be positive".to_string(),
            ));
        }
        if self.current_page == 0 {
            return Err(PortalError::InvalidMeta(
                "currentPage must be at least 1".to_string(),
            ));
        }
        if self.total_items > 0 && self.current_page > self.total_pages {
            return Err(PortalError::InvalidMeta(format!(
                "currentPage {} exceeds totalPages {}",
                self.current_page, self.total_pages
            )));
        }
        Ok(())
    }

    pub fn has_next_page(&self) -> bool {
        self.current_page < self.total_pages
    }
}

/// A page of rows plus its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "R: serde::de::DeserializeOwned"))]
pub struct PageResponse<R> {
    pub items: Vec<R>,
    pub meta: PageMeta,
}

impl<R> PageResponse<R> {
    pub fn validate(&self) -> Result<()> {
        self.meta.validate()?;
        if self.items.len() > self.meta.items_per_page as usize {
            return Err(PortalError::InvalidMeta(format!(
                "page holds {} items but itemsPerPage is {}",
                self.items.len(),
                self.meta.items_per_page
            )));
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Anything the list controller can fetch pages from.
pub trait ListSource: Send + Sync + 'static {
    type Row: Row;

    /// Fetch one page on behalf of `user`.
    fn fetch_page(
        &self,
        user: &CurrentUser,
        request: PageRequest,
    ) -> impl Future<Output = Result<PageResponse<Self::Row>>> + Send;
}
