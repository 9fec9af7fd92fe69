use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{merged, validate_required, Kind, Resource, ResourceStore, StoreError};

/// In-memory store backend. Selected when no `DATABASE_URL` is configured;
/// backs development servers and the integration test suite. Semantics
/// mirror the Postgres backend exactly, including last-write-wins updates.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Kind, HashMap<Uuid, Resource>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn find_all(&self, kind: Kind) -> Result<Vec<Resource>, StoreError> {
        let collections = self.collections.read().await;
        let mut resources: Vec<Resource> = collections
            .get(&kind)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default();
        // Stable listing order, oldest first, matching the SQL backend
        resources.sort_by_key(|r| r.created_at);
        Ok(resources)
    }

    async fn find_by_id(&self, kind: Kind, id: Uuid) -> Result<Option<Resource>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections.get(&kind).and_then(|c| c.get(&id)).cloned())
    }

    async fn create(
        &self,
        kind: Kind,
        owner: Uuid,
        fields: Map<String, Value>,
    ) -> Result<Resource, StoreError> {
        validate_required(kind, &fields)?;

        let now = Utc::now();
        let resource = Resource {
            id: Uuid::new_v4(),
            owner,
            created_at: now,
            updated_at: now,
            fields,
        };

        let mut collections = self.collections.write().await;
        collections
            .entry(kind)
            .or_default()
            .insert(resource.id, resource.clone());
        Ok(resource)
    }

    async fn apply_update(
        &self,
        kind: Kind,
        resource: Resource,
        patch: Map<String, Value>,
    ) -> Result<Resource, StoreError> {
        let updated = merged(resource, patch);
        let mut collections = self.collections.write().await;
        collections
            .entry(kind)
            .or_default()
            .insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, kind: Kind, resource: Resource) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        if let Some(collection) = collections.get_mut(&kind) {
            collection.remove(&resource.id);
        }
        Ok(())
    }
}
