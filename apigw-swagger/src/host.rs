//! Host driver: loads the persisted identity, runs one lifecycle event,
//! and writes the identity back.

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::config::DesiredConfiguration;
use crate::reconciler::Reconciler;
use crate::state::{Presence, ResourceState, StateFile};

/// One invocation of the reconciler.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    Create(DesiredConfiguration),
    Read,
    Update(DesiredConfiguration),
    Delete,
    /// Read, then create when absent or update when present.
    Apply(DesiredConfiguration),
}

impl LifecycleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::Create(_) => "create",
            LifecycleEvent::Read => "read",
            LifecycleEvent::Update(_) => "update",
            LifecycleEvent::Delete => "delete",
            LifecycleEvent::Apply(_) => "apply",
        }
    }
}

/// State after a successful event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub state: ResourceState,
    pub presence: Presence,
}

async fn dispatch<R>(
    reconciler: &R,
    state: &mut ResourceState,
    event: &LifecycleEvent,
) -> Result<Presence>
where
    R: Reconciler<Config = DesiredConfiguration>,
{
    let presence = match event {
        LifecycleEvent::Create(config) => {
            if state.is_present() {
                anyhow::bail!(
                    "state already bound to REST API {}, use update or apply",
                    state.id()
                );
            }
            reconciler.create(state, config).await?
        }
        LifecycleEvent::Read => reconciler.read(state).await?,
        LifecycleEvent::Update(config) => reconciler.update(state, config).await?,
        LifecycleEvent::Delete => {
            reconciler.delete(state).await?;
            Presence::Absent
        }
        LifecycleEvent::Apply(config) => match reconciler.read(state).await? {
            Presence::Absent => reconciler.create(state, config).await?,
            Presence::Present => reconciler.update(state, config).await?,
        },
    };
    Ok(presence)
}

/// Run `event` against the identity stored in `state_file`.
///
/// The identity is saved even when the event fails, so a create whose
/// confirming read failed still remembers the object it made.
pub async fn run_event<R>(
    reconciler: &R,
    state_file: &StateFile,
    event: LifecycleEvent,
) -> Result<Outcome>
where
    R: Reconciler<Config = DesiredConfiguration>,
{
    let mut state = state_file
        .load()
        .await
        .with_context(|| format!("Failed to load {}", state_file.path().display()))?;
    let before = state.clone();
    info!(event = event.name(), id = %state.id(), "Running lifecycle event");

    let result = dispatch(reconciler, &mut state, &event).await;

    if state != before {
        state_file
            .save(&state)
            .await
            .with_context(|| format!("Failed to save {}", state_file.path().display()))?;
    }

    match result {
        Ok(presence) => {
            info!(event = event.name(), id = %state.id(), ?presence, "Lifecycle event done");
            Ok(Outcome { state, presence })
        }
        Err(e) => {
            error!(event = event.name(), "Lifecycle event failed: {:#}", e);
            Err(e.context(format!("{} failed", event.name())))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::RemoteError;
    use crate::reconciler::RestApiReconciler;
    use crate::test_util::{MemoryStore, Operation};

    fn setup() -> (tempfile::TempDir, StateFile, Arc<MemoryStore>) {
        let dir = tempfile::tempdir().unwrap();
        let file = StateFile::new(dir.path().join("state.json"));
        (dir, file, Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn create_persists_identity() {
        let (_dir, file, store) = setup();
        store.next_import_id("abc123");
        let r = RestApiReconciler::new(Arc::clone(&store));

        let outcome = run_event(
            &r,
            &file,
            LifecycleEvent::Create(DesiredConfiguration::new("doc")),
        )
        .await
        .unwrap();

        assert_eq!(outcome.presence, Presence::Present);
        assert_eq!(file.load().await.unwrap().id, "abc123");
    }

    #[tokio::test]
    async fn create_refuses_bound_state() {
        let (_dir, file, store) = setup();
        file.save(&ResourceState::with_id("abc123")).await.unwrap();
        let r = RestApiReconciler::new(Arc::clone(&store));

        let err = run_event(
            &r,
            &file,
            LifecycleEvent::Create(DesiredConfiguration::new("doc")),
        )
        .await
        .unwrap_err();

        assert!(format!("{err:#}").contains("already bound"));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_confirmation_read_still_saves_identity() {
        let (_dir, file, store) = setup();
        store.next_import_id("abc123");
        store.fail_next(Operation::Fetch, RemoteError::new("Throttling", "slow down"));
        let r = RestApiReconciler::new(Arc::clone(&store));

        let err = run_event(
            &r,
            &file,
            LifecycleEvent::Create(DesiredConfiguration::new("doc")),
        )
        .await
        .unwrap_err();

        assert!(format!("{err:#}").contains("Throttling: slow down"));
        assert_eq!(file.load().await.unwrap().id, "abc123");
    }

    #[tokio::test]
    async fn apply_recreates_after_drift() {
        let (_dir, file, store) = setup();
        file.save(&ResourceState::with_id("gone")).await.unwrap();
        store.next_import_id("fresh1");
        let r = RestApiReconciler::new(Arc::clone(&store));

        let outcome = run_event(
            &r,
            &file,
            LifecycleEvent::Apply(DesiredConfiguration::new("doc")),
        )
        .await
        .unwrap();

        assert_eq!(outcome.state.id, "fresh1");
        assert_eq!(store.count(Operation::Import), 1);
        assert_eq!(store.count(Operation::Replace), 0);
    }

    #[tokio::test]
    async fn apply_updates_existing() {
        let (_dir, file, store) = setup();
        store.insert("abc123", "v1");
        file.save(&ResourceState::with_id("abc123")).await.unwrap();
        let r = RestApiReconciler::new(Arc::clone(&store));

        run_event(
            &r,
            &file,
            LifecycleEvent::Apply(DesiredConfiguration::new("v2")),
        )
        .await
        .unwrap();

        assert_eq!(store.body("abc123"), Some(b"v2".to_vec()));
        assert_eq!(store.count(Operation::Import), 0);
    }

    #[tokio::test]
    async fn delete_clears_state_file() {
        let (_dir, file, store) = setup();
        store.insert("abc123", "v1");
        file.save(&ResourceState::with_id("abc123")).await.unwrap();
        let r = RestApiReconciler::new(Arc::clone(&store));

        let outcome = run_event(&r, &file, LifecycleEvent::Delete).await.unwrap();

        assert_eq!(outcome.presence, Presence::Absent);
        assert!(!file.load().await.unwrap().is_present());
        assert!(!store.contains("abc123"));
    }
}
