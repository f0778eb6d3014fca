//! Clients for the remote definition store.
//!
//! The reconciler only sees the [`DefinitionStore`] trait:
//! - import: create a REST API from a definition body
//! - replace: put a new definition body over an existing REST API
//! - fetch / delete by identity

pub mod apigateway;

pub use apigateway::ApiGatewayClient;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::UpdateMode;
use crate::error::RemoteError;

/// Request to import a new REST API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    pub body: Vec<u8>,
    pub fail_on_warnings: Option<bool>,
}

/// Request to replace the definition of an existing REST API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceRequest {
    pub rest_api_id: String,
    pub body: Vec<u8>,
    pub mode: UpdateMode,
    pub fail_on_warnings: Option<bool>,
}

/// Result of an import or replace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportResult {
    pub id: String,
    pub warnings: Vec<String>,
}

/// A REST API as reported by fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestApi {
    pub id: String,
    pub name: Option<String>,
}

/// Remote store holding REST API definitions.
#[async_trait]
pub trait DefinitionStore: Send + Sync {
    async fn import(&self, req: ImportRequest) -> Result<ImportResult, RemoteError>;

    async fn replace(&self, req: ReplaceRequest) -> Result<ImportResult, RemoteError>;

    async fn fetch(&self, rest_api_id: &str) -> Result<RestApi, RemoteError>;

    async fn delete(&self, rest_api_id: &str) -> Result<(), RemoteError>;
}

#[async_trait]
impl<T: DefinitionStore + ?Sized> DefinitionStore for Arc<T> {
    async fn import(&self, req: ImportRequest) -> Result<ImportResult, RemoteError> {
        (**self).import(req).await
    }

    async fn replace(&self, req: ReplaceRequest) -> Result<ImportResult, RemoteError> {
        (**self).replace(req).await
    }

    async fn fetch(&self, rest_api_id: &str) -> Result<RestApi, RemoteError> {
        (**self).fetch(rest_api_id).await
    }

    async fn delete(&self, rest_api_id: &str) -> Result<(), RemoteError> {
        (**self).delete(rest_api_id).await
    }
}
