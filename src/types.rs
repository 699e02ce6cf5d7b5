//! Portal resources, row types and the signed-in user context.

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretBox};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{PortalError, Result};

/// Push event name the backend uses for list-affecting notifications.
pub const NOTIFICATION_EVENT: &str = "notification";

/// Valid resource names for CLI parsing and error messages
pub const VALID_RESOURCES: &[&str] = &["products", "documents", "downloads", "nlf-templates"];

/// A list screen of the portal, backed by one REST collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resource {
    Products,
    Documents,
    Downloads,
    NlfTemplates,
}

impl Resource {
    /// Path segment of the list endpoint, relative to the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            Resource::Products => "products",
            Resource::Documents => "documents",
            Resource::Downloads => "downloads",
            Resource::NlfTemplates => "nlf-templates",
        }
    }

    /// Notification types that invalidate this resource's list.
    pub fn event_types(self) -> &'static [&'static str] {
        match self {
            Resource::Products => &["product.created", "product.updated", "product.deleted"],
            Resource::Documents => &[
                "document.uploaded",
                "document.processed",
                "document.updated",
                "document.deleted",
            ],
            Resource::Downloads => &["download.ready", "download.failed"],
            Resource::NlfTemplates => &[
                "nlf_template.created",
                "nlf_template.updated",
                "nlf_template.deleted",
            ],
        }
    }

    /// Name of the filter that carries the active tab.
    pub fn tab_filter(self) -> &'static str {
        match self {
            Resource::Products | Resource::Documents => "status",
            Resource::Downloads => "state",
            Resource::NlfTemplates => "scope",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

impl FromStr for Resource {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "products" | "product" => Ok(Resource::Products),
            "documents" | "document" | "docs" => Ok(Resource::Documents),
            "downloads" | "download" => Ok(Resource::Downloads),
            "nlf-templates" | "nlf-template" | "nlf" | "templates" => Ok(Resource::NlfTemplates),
            _ => Err(PortalError::UnknownResource(s.to_string())),
        }
    }
}

/// An identity-bearing record shown in a list.
///
/// The list controller only ever looks at `id()`; every other field is passed
/// through to the view untouched.
pub trait Row: Clone + Send + Sync + DeserializeOwned + 'static {
    type Id: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    fn id(&self) -> Self::Id;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Download {
    pub id: i64,
    pub file_name: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NlfTemplate {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

macro_rules! impl_numeric_row {
    ($($ty:ty),*) => {
        $(
            impl Row for $ty {
                type Id = i64;

                fn id(&self) -> i64 {
                    self.id
                }
            }
        )*
    };
}

impl_numeric_row!(Product, Document, Download, NlfTemplate);

/// Record id as sent by the backend (numeric for most collections, string for some).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{n}"),
            RecordId::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Schemaless row used where the caller does not know the resource's shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Record {
    /// Best-effort display label: `name`, then `fileName`, then `title`.
    pub fn label(&self) -> String {
        ["name", "fileName", "title"]
            .iter()
            .find_map(|key| self.fields.get(*key).and_then(|v| v.as_str()))
            .unwrap_or("")
            .to_string()
    }

    /// Render a field as plain text for table output.
    pub fn field_text(&self, key: &str) -> String {
        match self.fields.get(key) {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

impl Row for Record {
    type Id = RecordId;

    fn id(&self) -> RecordId {
        self.id.clone()
    }
}

/// The signed-in user, passed explicitly into every list controller.
#[derive(Clone, Default)]
pub struct CurrentUser {
    pub id: Option<String>,
    pub name: Option<String>,
    pub company_id: Option<String>,
    token: Option<Arc<SecretBox<String>>>,
}

impl CurrentUser {
    /// A user with no identity and no credentials.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(Arc::new(SecretBox::new(Box::new(token.into()))));
        self
    }

    pub fn with_company(mut self, company_id: impl Into<String>) -> Self {
        self.company_id = Some(company_id.into());
        self
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// `Authorization` header value, if the user carries a token.
    pub fn bearer(&self) -> Option<String> {
        self.token
            .as_ref()
            .map(|t| format!("Bearer {}", t.expose_secret()))
    }
}

impl fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentUser")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("company_id", &self.company_id)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
