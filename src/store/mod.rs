pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::access::Owned;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// The three resource collections served by the API. All of them share one
/// document shape and one pipeline; the kind only selects the backing
/// collection and its required fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Organization,
    Project,
    Volunteer,
}

impl Kind {
    /// Parse the URL collection segment. Unknown segments are treated the
    /// same as a missing resource further down the pipeline.
    pub fn from_collection(s: &str) -> Option<Kind> {
        match s {
            "organizations" => Some(Kind::Organization),
            "projects" => Some(Kind::Project),
            "volunteers" => Some(Kind::Volunteer),
            _ => None,
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            Kind::Organization => "organizations",
            Kind::Project => "projects",
            Kind::Volunteer => "volunteers",
        }
    }

    /// Domain fields that must be present and non-empty at creation.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Kind::Organization => &["name"],
            Kind::Project => &["name"],
            Kind::Volunteer => &["description"],
        }
    }
}

/// A stored document. Domain fields are free-form and serialize flattened
/// next to the system fields, so clients see one flat JSON object.
#[derive(Debug, Clone, Serialize)]
pub struct Resource {
    pub id: Uuid,
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Owned for Resource {
    fn owner(&self) -> Uuid {
        self.owner
    }
}

/// Errors from store backends
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document rejected by validation")]
    Validation { field_errors: HashMap<String, String> },

    #[error("connection error: {0}")]
    Connection(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Document persistence, keyed by opaque identifiers, over independent
/// collections. Both backends provide last-write-wins per-document update
/// semantics and nothing stronger; there is no optimistic locking.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn find_all(&self, kind: Kind) -> Result<Vec<Resource>, StoreError>;

    async fn find_by_id(&self, kind: Kind, id: Uuid) -> Result<Option<Resource>, StoreError>;

    /// Persist a new document. The owner is always supplied by the caller
    /// of the store (stamped server-side), never taken from domain fields.
    async fn create(
        &self,
        kind: Kind,
        owner: Uuid,
        fields: Map<String, Value>,
    ) -> Result<Resource, StoreError>;

    /// Merge a sanitized patch into a loaded document and persist the
    /// result. Fields absent from the patch are left untouched. An empty
    /// patch is a valid no-op update.
    async fn apply_update(
        &self,
        kind: Kind,
        resource: Resource,
        patch: Map<String, Value>,
    ) -> Result<Resource, StoreError>;

    async fn delete(&self, kind: Kind, resource: Resource) -> Result<(), StoreError>;
}

/// Reject a create payload missing a required field, or supplying it as an
/// empty string. Shared by both backends so validation behavior cannot
/// drift between them.
pub fn validate_required(kind: Kind, fields: &Map<String, Value>) -> Result<(), StoreError> {
    let mut field_errors = HashMap::new();

    for field in kind.required_fields() {
        let present = match fields.get(*field) {
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Null) | None => false,
            Some(_) => true,
        };
        if !present {
            field_errors.insert(field.to_string(), "This field is required".to_string());
        }
    }

    if field_errors.is_empty() {
        Ok(())
    } else {
        Err(StoreError::Validation { field_errors })
    }
}

/// Merge a patch into a document's fields, returning the updated document
/// with a fresh modification timestamp. Backends share this so the merge
/// semantics are identical whether the write lands in Postgres or memory.
/// A fully sanitized (empty) patch leaves the document untouched, the
/// modification timestamp included.
pub(crate) fn merged(mut resource: Resource, patch: Map<String, Value>) -> Resource {
    if patch.is_empty() {
        return resource;
    }
    for (key, value) in patch {
        resource.fields.insert(key, value);
    }
    resource.updated_at = Utc::now();
    resource
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, &str)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    #[test]
    fn collection_segments_parse() {
        assert_eq!(Kind::from_collection("organizations"), Some(Kind::Organization));
        assert_eq!(Kind::from_collection("projects"), Some(Kind::Project));
        assert_eq!(Kind::from_collection("volunteers"), Some(Kind::Volunteer));
        assert_eq!(Kind::from_collection("users"), None);
        assert_eq!(Kind::from_collection(""), None);
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let err = validate_required(Kind::Organization, &fields(&[("description", "x")]))
            .unwrap_err();
        match err {
            StoreError::Validation { field_errors } => {
                assert!(field_errors.contains_key("name"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn empty_required_field_is_rejected() {
        let err = validate_required(Kind::Volunteer, &fields(&[("description", "")])).unwrap_err();
        match err {
            StoreError::Validation { field_errors } => {
                assert!(field_errors.contains_key("description"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn present_required_fields_pass() {
        assert!(validate_required(Kind::Project, &fields(&[("name", "cleanup")])).is_ok());
    }

    #[test]
    fn resource_serializes_flat() {
        let resource = Resource {
            id: Uuid::new_v4(),
            owner: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            fields: fields(&[("name", "helpers")]),
        };
        let v = serde_json::to_value(&resource).unwrap();
        assert_eq!(v["name"], "helpers");
        assert!(v.get("fields").is_none(), "domain fields must flatten");
    }
}
