use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::config;

use super::{merged, validate_required, Kind, Resource, ResourceStore, StoreError};

/// Postgres store backend. Each collection is one table with the document's
/// free-form fields in a single jsonb column, so the three resource kinds
/// share identical SQL shapes.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let db = &config::config().database;
        let pool = PgPoolOptions::new()
            .max_connections(db.max_connections)
            .acquire_timeout(Duration::from_secs(db.connection_timeout))
            .connect(url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        info!("Connected to Postgres store");
        Ok(Self { pool })
    }

    /// Create the collection tables if they do not exist yet. Run once at
    /// startup; safe to repeat.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for kind in [Kind::Organization, Kind::Project, Kind::Volunteer] {
            let ddl = format!(
                "CREATE TABLE IF NOT EXISTS \"{}\" (
                    id uuid PRIMARY KEY,
                    owner uuid NOT NULL,
                    fields jsonb NOT NULL DEFAULT '{{}}'::jsonb,
                    created_at timestamptz NOT NULL,
                    updated_at timestamptz NOT NULL
                )",
                kind.table()
            );
            sqlx::query(&ddl).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn resource_from_row(row: &PgRow) -> Result<Resource, StoreError> {
    let fields: Value = row.try_get("fields")?;
    Ok(Resource {
        id: row.try_get("id")?,
        owner: row.try_get("owner")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        fields: fields.as_object().cloned().unwrap_or_default(),
    })
}

#[async_trait]
impl ResourceStore for PgStore {
    async fn find_all(&self, kind: Kind) -> Result<Vec<Resource>, StoreError> {
        let sql = format!(
            "SELECT id, owner, fields, created_at, updated_at FROM \"{}\" ORDER BY created_at",
            kind.table()
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(resource_from_row).collect()
    }

    async fn find_by_id(&self, kind: Kind, id: Uuid) -> Result<Option<Resource>, StoreError> {
        let sql = format!(
            "SELECT id, owner, fields, created_at, updated_at FROM \"{}\" WHERE id = $1",
            kind.table()
        );
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(resource_from_row).transpose()
    }

    async fn create(
        &self,
        kind: Kind,
        owner: Uuid,
        fields: Map<String, Value>,
    ) -> Result<Resource, StoreError> {
        validate_required(kind, &fields)?;

        let now = chrono::Utc::now();
        let resource = Resource {
            id: Uuid::new_v4(),
            owner,
            created_at: now,
            updated_at: now,
            fields,
        };

        let sql = format!(
            "INSERT INTO \"{}\" (id, owner, fields, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5)",
            kind.table()
        );
        sqlx::query(&sql)
            .bind(resource.id)
            .bind(resource.owner)
            .bind(Value::Object(resource.fields.clone()))
            .bind(resource.created_at)
            .bind(resource.updated_at)
            .execute(&self.pool)
            .await?;

        Ok(resource)
    }

    async fn apply_update(
        &self,
        kind: Kind,
        resource: Resource,
        patch: Map<String, Value>,
    ) -> Result<Resource, StoreError> {
        let updated = merged(resource, patch);

        // Full-document write: last write wins, same as the merge semantics
        // the jsonb || operator would give for a partial write.
        let sql = format!(
            "UPDATE \"{}\" SET fields = $2, updated_at = $3 WHERE id = $1",
            kind.table()
        );
        sqlx::query(&sql)
            .bind(updated.id)
            .bind(Value::Object(updated.fields.clone()))
            .bind(updated.updated_at)
            .execute(&self.pool)
            .await?;

        Ok(updated)
    }

    async fn delete(&self, kind: Kind, resource: Resource) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM \"{}\" WHERE id = $1", kind.table());
        sqlx::query(&sql).bind(resource.id).execute(&self.pool).await?;
        Ok(())
    }
}
