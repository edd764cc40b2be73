//! API client seams
//!
//! Handlers talk to the vendor through these traits. The HTTP clients live
//! outside this crate; tests use the in-memory fakes from `testing`.

use async_trait::async_trait;
use selectel_core::retry::Retryable;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Errors returned by API clients
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// The API answered with an error status
    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// The request never got an answer
    #[error("transport error: {0}")]
    Transport(String),

    /// The answer could not be decoded
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::status(STATUS_NOT_FOUND, message)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status, .. } if *status == STATUS_NOT_FOUND)
    }
}

impl Retryable for ApiError {
    fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(_) => true,
            ApiError::Status { status, .. } => {
                *status == STATUS_TOO_MANY_REQUESTS || (500..600).contains(status)
            }
            ApiError::Decode(_) => false,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// DBaaS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionCreateOpts {
    pub available_extension_id: String,
    pub datastore_id: String,
    pub database_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extension {
    pub id: String,
    pub available_extension_id: String,
    pub datastore_id: String,
    pub database_id: String,
    pub status: String,
}

/// Database-as-a-service API
#[async_trait]
pub trait DbaasApi: Send + Sync {
    async fn create_extension(&self, opts: &ExtensionCreateOpts) -> ApiResult<Extension>;

    async fn extension(&self, id: &str) -> ApiResult<Extension>;

    async fn delete_extension(&self, id: &str) -> ApiResult<()>;
}

// =============================================================================
// VPC reseller
// =============================================================================

/// A server attached to a floating IP or license
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub id: String,
    pub name: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatingIpOpts {
    pub region: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatingIp {
    pub id: String,
    pub project_id: String,
    pub region: String,
    pub floating_ip_address: String,
    #[serde(default)]
    pub fixed_ip_address: Option<String>,
    #[serde(default)]
    pub port_id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub servers: Vec<Server>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseOpts {
    pub region: String,
    #[serde(rename = "type")]
    pub license_type: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub id: u64,
    pub project_id: String,
    pub region: String,
    #[serde(rename = "type")]
    pub license_type: String,
    pub status: String,
    #[serde(default)]
    pub network_id: Option<String>,
    #[serde(default)]
    pub subnet_id: Option<String>,
    #[serde(default)]
    pub port_id: Option<String>,
    #[serde(default)]
    pub servers: Vec<Server>,
}

/// VPC reseller API
#[async_trait]
pub trait ResellApi: Send + Sync {
    async fn create_floating_ips(
        &self,
        project_id: &str,
        opts: &[FloatingIpOpts],
    ) -> ApiResult<Vec<FloatingIp>>;

    async fn floating_ip(&self, id: &str) -> ApiResult<FloatingIp>;

    async fn delete_floating_ip(&self, id: &str) -> ApiResult<()>;

    async fn create_licenses(
        &self,
        project_id: &str,
        opts: &[LicenseOpts],
    ) -> ApiResult<Vec<License>>;

    async fn license(&self, id: &str) -> ApiResult<License>;

    async fn delete_license(&self, id: &str) -> ApiResult<()>;
}
