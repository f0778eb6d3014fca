//! Test utilities: an in-memory definition store and a recording warning sink.
//!
//! The store keeps REST APIs in a map, records every call, and can be
//! scripted to fail specific operations.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::clients::{DefinitionStore, ImportRequest, ImportResult, ReplaceRequest, RestApi};
use crate::config::UpdateMode;
use crate::error::RemoteError;
use crate::warnings::WarningSink;

/// Store operation, used to script failures and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Import,
    Replace,
    Fetch,
    Delete,
}

/// A recorded store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Import {
        body: Vec<u8>,
        fail_on_warnings: Option<bool>,
    },
    Replace {
        rest_api_id: String,
        body: Vec<u8>,
        mode: UpdateMode,
        fail_on_warnings: Option<bool>,
    },
    Fetch(String),
    Delete(String),
}

impl Call {
    pub fn operation(&self) -> Operation {
        match self {
            Call::Import { .. } => Operation::Import,
            Call::Replace { .. } => Operation::Replace,
            Call::Fetch(_) => Operation::Fetch,
            Call::Delete(_) => Operation::Delete,
        }
    }
}

#[derive(Default)]
struct Inner {
    apis: HashMap<String, Vec<u8>>,
    calls: Vec<Call>,
    warnings: Vec<String>,
    import_ids: VecDeque<String>,
    replace_id: Option<String>,
    scripted: HashMap<Operation, VecDeque<RemoteError>>,
    sticky: HashMap<Operation, RemoteError>,
}

impl Inner {
    fn next_failure(&mut self, op: Operation) -> Option<RemoteError> {
        if let Some(err) = self.scripted.get_mut(&op).and_then(VecDeque::pop_front) {
            return Some(err);
        }
        self.sticky.get(&op).cloned()
    }
}

/// In-memory [`DefinitionStore`].
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed an existing REST API.
    pub fn insert(&self, id: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.inner().apis.insert(id.into(), body.into());
    }

    /// Remove a REST API behind the reconciler's back.
    pub fn remove(&self, id: &str) {
        self.inner().apis.remove(id);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner().apis.contains_key(id)
    }

    pub fn body(&self, id: &str) -> Option<Vec<u8>> {
        self.inner().apis.get(id).cloned()
    }

    /// Id handed out by the next import (otherwise a random one).
    pub fn next_import_id(&self, id: impl Into<String>) {
        self.inner().import_ids.push_back(id.into());
    }

    /// Make replace move the API to a new id.
    pub fn replace_returns_id(&self, id: impl Into<String>) {
        self.inner().replace_id = Some(id.into());
    }

    /// Warnings returned by every subsequent import and replace.
    pub fn set_warnings<I, T>(&self, warnings: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.inner().warnings = warnings.into_iter().map(Into::into).collect();
    }

    /// Fail the next call of `op` with `err`. Queued failures run in order.
    pub fn fail_next(&self, op: Operation, err: RemoteError) {
        self.inner().scripted.entry(op).or_default().push_back(err);
    }

    /// Fail every call of `op` with `err` once queued failures are used up.
    pub fn fail_always(&self, op: Operation, err: RemoteError) {
        self.inner().sticky.insert(op, err);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner().calls.clone()
    }

    pub fn count(&self, op: Operation) -> usize {
        self.inner()
            .calls
            .iter()
            .filter(|c| c.operation() == op)
            .count()
    }
}

fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..10].to_string()
}

#[async_trait]
impl DefinitionStore for MemoryStore {
    async fn import(&self, req: ImportRequest) -> Result<ImportResult, RemoteError> {
        let mut inner = self.inner();
        inner.calls.push(Call::Import {
            body: req.body.clone(),
            fail_on_warnings: req.fail_on_warnings,
        });
        if let Some(err) = inner.next_failure(Operation::Import) {
            return Err(err);
        }

        let id = inner.import_ids.pop_front().unwrap_or_else(generate_id);
        inner.apis.insert(id.clone(), req.body);
        Ok(ImportResult {
            id,
            warnings: inner.warnings.clone(),
        })
    }

    async fn replace(&self, req: ReplaceRequest) -> Result<ImportResult, RemoteError> {
        let mut inner = self.inner();
        inner.calls.push(Call::Replace {
            rest_api_id: req.rest_api_id.clone(),
            body: req.body.clone(),
            mode: req.mode,
            fail_on_warnings: req.fail_on_warnings,
        });
        if let Some(err) = inner.next_failure(Operation::Replace) {
            return Err(err);
        }
        if inner.apis.remove(&req.rest_api_id).is_none() {
            return Err(RemoteError::not_found("Invalid API identifier specified"));
        }

        let id = inner.replace_id.take().unwrap_or(req.rest_api_id);
        inner.apis.insert(id.clone(), req.body);
        Ok(ImportResult {
            id,
            warnings: inner.warnings.clone(),
        })
    }

    async fn fetch(&self, rest_api_id: &str) -> Result<RestApi, RemoteError> {
        let mut inner = self.inner();
        inner.calls.push(Call::Fetch(rest_api_id.to_string()));
        if let Some(err) = inner.next_failure(Operation::Fetch) {
            return Err(err);
        }

        if inner.apis.contains_key(rest_api_id) {
            Ok(RestApi {
                id: rest_api_id.to_string(),
                name: None,
            })
        } else {
            Err(RemoteError::not_found("Invalid API identifier specified"))
        }
    }

    async fn delete(&self, rest_api_id: &str) -> Result<(), RemoteError> {
        let mut inner = self.inner();
        inner.calls.push(Call::Delete(rest_api_id.to_string()));
        if let Some(err) = inner.next_failure(Operation::Delete) {
            return Err(err);
        }

        match inner.apis.remove(rest_api_id) {
            Some(_) => Ok(()),
            None => Err(RemoteError::not_found("Invalid API identifier specified")),
        }
    }
}

/// [`WarningSink`] that keeps every warning it receives.
#[derive(Default)]
pub struct RecordingSink {
    warnings: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(rest_api_id, message)` pairs in emission order.
    pub fn warnings(&self) -> Vec<(String, String)> {
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl WarningSink for RecordingSink {
    fn emit(&self, rest_api_id: &str, message: &str) {
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((rest_api_id.to_string(), message.to_string()));
    }
}
