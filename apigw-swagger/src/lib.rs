//! apigw-swagger: lifecycle reconciler for Swagger-defined REST APIs.
//!
//! Maps create/read/update/delete events onto calls against a remote
//! definition store, keeping a persisted identity in step with the remote object.

pub mod clients;
pub mod config;
pub mod error;
pub mod host;
pub mod reconciler;
pub mod retry;
pub mod state;
pub mod test_util;
pub mod warnings;

pub use clients::{ApiGatewayClient, DefinitionStore};
pub use config::{DesiredConfiguration, UpdateMode};
pub use error::{ReconcileError, RemoteError};
pub use reconciler::{Reconciler, RestApiReconciler};
pub use state::{Presence, ResourceState, StateFile};
