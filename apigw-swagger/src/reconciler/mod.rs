//! Reconcilers for remote resources.
//!
//! A reconciler maps one lifecycle event (create, read, update, delete) onto
//! remote calls and keeps the persisted identity in step with the remote object.

pub mod rest_api;

pub use rest_api::RestApiReconciler;

use async_trait::async_trait;

use crate::error::Result;
use crate::state::{Presence, ResourceState};

/// Trait for resource lifecycle reconcilers.
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// Desired configuration supplied on every invocation.
    type Config: Send + Sync;

    /// Create the remote object and bind its identity.
    async fn create(&self, state: &mut ResourceState, config: &Self::Config) -> Result<Presence>;

    /// Check that the remote object still exists; clears the identity if not.
    async fn read(&self, state: &mut ResourceState) -> Result<Presence>;

    /// Push the desired configuration onto the existing remote object.
    async fn update(&self, state: &mut ResourceState, config: &Self::Config) -> Result<Presence>;

    /// Remove the remote object and clear the identity.
    async fn delete(&self, state: &mut ResourceState) -> Result<()>;
}
