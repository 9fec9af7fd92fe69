//! Access control decisions shared by every resource route.
//!
//! Three pure functions cover what every handler needs: collapsing a failed
//! lookup into a uniform not-found outcome, deciding whether the caller may
//! mutate a loaded resource, and stripping the parts of an update payload a
//! client is never allowed to apply. Status-code selection lives entirely in
//! [`crate::error::ApiError`]; nothing here touches HTTP.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;

/// Server-managed fields. Client payloads may never set these; they are
/// assigned at creation and immutable thereafter.
pub const SYSTEM_FIELDS: &[&str] = &["id", "owner", "created_at", "updated_at"];

fn is_system_field(key: &str) -> bool {
    SYSTEM_FIELDS.contains(&key)
}

/// Anything with a single controlling owner.
pub trait Owned {
    fn owner(&self) -> Uuid;
}

/// Collapse an absent lookup result into the uniform not-found outcome.
///
/// Applied before any further processing so that every flavor of "no such
/// id" - unknown collection, well-formed but unknown id - is externally
/// indistinguishable.
pub fn require_found<T>(found: Option<T>) -> Result<T, ApiError> {
    found.ok_or_else(|| ApiError::not_found("resource not found"))
}

/// Succeed silently when the caller owns the resource, fail otherwise.
///
/// Must run strictly after [`require_found`]. The lookup-then-ownership
/// ordering means any authenticated caller can distinguish a missing
/// resource from one they don't own; that is the established contract.
pub fn require_owner(caller: &AuthUser, resource: &impl Owned) -> Result<(), ApiError> {
    if resource.owner() == caller.user_id {
        Ok(())
    } else {
        Err(ApiError::forbidden("caller does not own this resource"))
    }
}

/// Sanitize a partial-update payload before it reaches the store.
///
/// Drops every [`SYSTEM_FIELDS`] key unconditionally - identity, ownership
/// and timestamps are immutable after creation regardless of what the
/// client sends - and drops any key whose value is the empty string or
/// `null`, which clients use to mean "leave unchanged". An empty result is
/// fine; the update becomes an idempotent no-op.
pub fn sanitize_patch(patch: Map<String, Value>) -> Map<String, Value> {
    patch
        .into_iter()
        .filter(|(key, value)| {
            !is_system_field(key) && value.as_str() != Some("") && !value.is_null()
        })
        .collect()
}

/// Strip server-managed keys from a create payload. The surviving fields
/// are what the store persists as domain fields, next to the identity and
/// ownership the server stamps itself.
pub fn sanitize_create(mut fields: Map<String, Value>) -> Map<String, Value> {
    for key in SYSTEM_FIELDS {
        fields.remove(*key);
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Doc {
        owner: Uuid,
    }

    impl Owned for Doc {
        fn owner(&self) -> Uuid {
            self.owner
        }
    }

    fn caller(user_id: Uuid) -> AuthUser {
        AuthUser { user_id }
    }

    fn patch(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn found_passes_through() {
        assert_eq!(require_found(Some(7)).unwrap(), 7);
    }

    #[test]
    fn absent_becomes_not_found() {
        let err = require_found::<i32>(None).unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn owner_may_mutate() {
        let id = Uuid::new_v4();
        assert!(require_owner(&caller(id), &Doc { owner: id }).is_ok());
    }

    #[test]
    fn non_owner_is_forbidden() {
        let err = require_owner(&caller(Uuid::new_v4()), &Doc { owner: Uuid::new_v4() })
            .unwrap_err();
        // 401 for ownership mismatch is this API's documented contract
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn owner_key_dropped_regardless_of_value() {
        let out = sanitize_patch(patch(&[
            ("owner", json!(Uuid::new_v4().to_string())),
            ("name", json!("updated")),
        ]));
        assert!(!out.contains_key("owner"));
        assert_eq!(out["name"], "updated");
    }

    #[test]
    fn system_keys_dropped_from_patch() {
        let out = sanitize_patch(patch(&[
            ("id", json!("evil")),
            ("created_at", json!("1999-01-01T00:00:00Z")),
            ("updated_at", json!("1999-01-01T00:00:00Z")),
            ("name", json!("updated")),
        ]));
        assert!(!out.contains_key("id"));
        assert!(!out.contains_key("created_at"));
        assert!(!out.contains_key("updated_at"));
        assert_eq!(out["name"], "updated");
    }

    #[test]
    fn system_keys_dropped_from_create_payload() {
        let out = sanitize_create(patch(&[
            ("id", json!("spoofed-id")),
            ("owner", json!(Uuid::new_v4().to_string())),
            ("created_at", json!("1999-01-01T00:00:00Z")),
            ("name", json!("helpers")),
        ]));
        for key in SYSTEM_FIELDS {
            assert!(!out.contains_key(*key), "{key} must be stripped");
        }
        assert_eq!(out["name"], "helpers");
    }

    #[test]
    fn null_values_mean_leave_unchanged() {
        let out = sanitize_patch(patch(&[
            ("name", json!(null)),
            ("description", json!("still here")),
        ]));
        assert!(!out.contains_key("name"));
        assert_eq!(out["description"], "still here");
    }

    #[test]
    fn empty_strings_mean_leave_unchanged() {
        let out = sanitize_patch(patch(&[
            ("name", json!("")),
            ("description", json!("still here")),
        ]));
        assert!(!out.contains_key("name"));
        assert_eq!(out["description"], "still here");
    }

    #[test]
    fn sanitizing_twice_equals_sanitizing_once() {
        let input = patch(&[
            ("owner", json!("someone-else")),
            ("name", json!("")),
            ("skills", json!("driving")),
        ]);
        let once = sanitize_patch(input);
        let twice = sanitize_patch(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn fully_sanitized_payload_is_empty_not_an_error() {
        let out = sanitize_patch(patch(&[("owner", json!("x")), ("name", json!(""))]));
        assert!(out.is_empty());
    }

    #[test]
    fn non_string_values_survive() {
        let out = sanitize_patch(patch(&[("hours", json!(12))]));
        assert_eq!(out["hours"], 12);
    }
}
