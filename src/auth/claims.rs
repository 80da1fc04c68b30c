use crate::jwt::types::Claims;
use serde_json::Value;

/// Name of the claim carrying granted permission strings
pub const PERMISSIONS_CLAIM: &str = "permissions";

/// Permission accessors for verified claims
impl Claims {
    /// Granted permissions
    ///
    /// `None` when the claim is absent or is not an array. Non-string entries
    /// are skipped.
    pub fn permissions(&self) -> Option<Vec<&str>> {
        match self.extra.get(PERMISSIONS_CLAIM) {
            Some(Value::Array(permissions)) => {
                Some(permissions.iter().filter_map(Value::as_str).collect())
            }
            _ => None,
        }
    }

    /// Exact, case-sensitive membership test
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions()
            .is_some_and(|granted| granted.iter().any(|p| *p == permission))
    }

    /// The `sub` claim, identifying the account that acted
    pub fn subject(&self) -> Option<&str> {
        self.sub.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn claims_with(permissions: Value) -> Claims {
        let mut extra = HashMap::new();
        extra.insert(PERMISSIONS_CLAIM.to_string(), permissions);

        Claims {
            sub: Some("auth0|123".to_string()),
            iss: Some("https://casting.test.auth0.com/".to_string()),
            exp: Some(9999999999),
            extra,
            ..Claims::default()
        }
    }

    #[test]
    fn test_permissions_array() {
        let claims = claims_with(json!(["get:actors", "post:actors"]));
        assert_eq!(claims.permissions(), Some(vec!["get:actors", "post:actors"]));
        assert!(claims.has_permission("post:actors"));
        assert!(!claims.has_permission("delete:actors"));
    }

    #[test]
    fn test_permissions_absent() {
        let claims = Claims::default();
        assert_eq!(claims.permissions(), None);
        assert!(!claims.has_permission("get:actors"));
    }

    #[test]
    fn test_permissions_not_an_array() {
        let claims = claims_with(json!("post:actors"));
        assert_eq!(claims.permissions(), None);
        assert!(!claims.has_permission("post:actors"));
    }

    #[test]
    fn test_permissions_skip_non_strings() {
        let claims = claims_with(json!([1, null, "get:movies", {"p": "post:movies"}]));
        assert_eq!(claims.permissions(), Some(vec!["get:movies"]));
    }

    #[test]
    fn test_empty_permissions_array() {
        let claims = claims_with(json!([]));
        assert_eq!(claims.permissions(), Some(vec![]));
    }

    #[test]
    fn test_no_prefix_or_case_insensitive_match() {
        let claims = claims_with(json!(["post:actors", "delete:*"]));
        assert!(!claims.has_permission("post"));
        assert!(!claims.has_permission("post:actor"));
        assert!(!claims.has_permission("POST:actors"));
        assert!(!claims.has_permission("delete:movies"));
        assert!(claims.has_permission("delete:*"));
    }

    #[test]
    fn test_subject() {
        let claims = claims_with(json!([]));
        assert_eq!(claims.subject(), Some("auth0|123"));
    }
}
