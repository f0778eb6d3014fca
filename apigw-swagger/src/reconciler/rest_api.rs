//! REST API reconciler - imports Swagger definitions into the definition store.

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use super::Reconciler;
use crate::clients::{DefinitionStore, ImportRequest, ImportResult, ReplaceRequest};
use crate::config::DesiredConfiguration;
use crate::error::{ReconcileError, RemoteError, Result};
use crate::retry::{retry, RetryError, RetryPolicy};
use crate::state::{Presence, ResourceState};
use crate::warnings::{TracingWarningSink, WarningSink};

/// Reconciler for a REST API defined by a Swagger document.
pub struct RestApiReconciler<S, W = TracingWarningSink> {
    store: S,
    warnings: W,
    delete_retry: RetryPolicy,
}

impl<S: DefinitionStore> RestApiReconciler<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            warnings: TracingWarningSink,
            delete_retry: RetryPolicy::default(),
        }
    }
}

impl<S: DefinitionStore, W: WarningSink> RestApiReconciler<S, W> {
    pub fn with_warning_sink<W2: WarningSink>(self, warnings: W2) -> RestApiReconciler<S, W2> {
        RestApiReconciler {
            store: self.store,
            warnings,
            delete_retry: self.delete_retry,
        }
    }

    pub fn with_delete_retry(mut self, policy: RetryPolicy) -> Self {
        self.delete_retry = policy;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn emit_warnings(&self, result: &ImportResult) {
        for warning in &result.warnings {
            self.warnings.emit(&result.id, warning);
        }
    }
}

#[async_trait]
impl<S: DefinitionStore, W: WarningSink> Reconciler for RestApiReconciler<S, W> {
    type Config = DesiredConfiguration;

    async fn create(&self, state: &mut ResourceState, config: &Self::Config) -> Result<Presence> {
        info!(
            bytes = config.definition_body.len(),
            "Importing REST API from Swagger definition"
        );

        let req = ImportRequest {
            body: config.definition_body.clone(),
            fail_on_warnings: config.fail_on_warnings,
        };
        let result = self.store.import(req).await.map_err(|e| {
            error!("Failed to import REST API: {}", e);
            e
        })?;

        self.emit_warnings(&result);
        if result.id.is_empty() {
            return Err(RemoteError::new("InvalidResponse", "import returned no REST API id").into());
        }

        info!("REST API {} created", result.id);
        state.bind(result.id);

        self.read(state).await
    }

    async fn read(&self, state: &mut ResourceState) -> Result<Presence> {
        if !state.is_present() {
            debug!("No REST API id bound, nothing to read");
            return Ok(Presence::Absent);
        }

        let fetched = self.store.fetch(state.id()).await;
        match fetched {
            Ok(api) => {
                debug!(rest_api_id = %api.id, name = ?api.name, "REST API exists");
                Ok(Presence::Present)
            }
            Err(e) if e.is_not_found() => {
                warn!("REST API {} not found, removing from state", state.id());
                state.clear();
                Ok(Presence::Absent)
            }
            Err(e) => {
                error!("Failed to read REST API {}: {}", state.id(), e);
                Err(e.into())
            }
        }
    }

    async fn update(&self, state: &mut ResourceState, config: &Self::Config) -> Result<Presence> {
        if !state.is_present() {
            return Err(ReconcileError::MissingIdentity);
        }
        info!(
            mode = %config.update_mode,
            bytes = config.definition_body.len(),
            "Replacing definition of REST API {}",
            state.id()
        );

        let req = ReplaceRequest {
            rest_api_id: state.id().to_string(),
            body: config.definition_body.clone(),
            mode: config.update_mode,
            fail_on_warnings: config.fail_on_warnings,
        };
        let result = self.store.replace(req).await.map_err(|e| {
            error!("Failed to replace REST API {}: {}", state.id(), e);
            e
        })?;

        self.emit_warnings(&result);
        if !result.id.is_empty() && result.id != state.id() {
            // The previous object is left as it is.
            warn!(
                previous = %state.id(),
                "Store returned a different REST API id {}, rebinding",
                result.id
            );
            state.bind(result.id);
        }

        self.read(state).await
    }

    async fn delete(&self, state: &mut ResourceState) -> Result<()> {
        if !state.is_present() {
            debug!("No REST API id bound, nothing to delete");
            return Ok(());
        }
        info!("Deleting REST API {}", state.id());

        let store = &self.store;
        let id = state.id();
        retry(&self.delete_retry, move || async move {
            match store.delete(id).await {
                Ok(()) => Ok(()),
                Err(e) if e.is_not_found() => {
                    debug!("REST API {} already gone", id);
                    Ok(())
                }
                Err(e) if e.is_transient() => Err(RetryError::Retryable(e)),
                Err(e) => Err(RetryError::NonRetryable(e)),
            }
        })
        .await
        .map_err(|e| {
            error!("Failed to delete REST API {}: {}", id, e);
            e
        })?;

        state.clear();
        Ok(())
    }
}
