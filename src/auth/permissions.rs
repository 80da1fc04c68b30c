//! Permission enforcement on verified claims

use crate::jwt::types::Claims;

/// Why verified claims do not grant the required permission
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionError {
    /// The token carries no `permissions` array at all
    #[error("Permissions not included in JWT")]
    PermissionsClaimMissing,

    /// The array is present but lacks the required entry
    #[error("Permission not found: {required}")]
    PermissionNotFound {
        /// The permission that was required
        required: String,
    },
}

/// Allow only if `required_permission` is an exact member of the `permissions` claim
pub fn authorize(claims: &Claims, required_permission: &str) -> Result<(), PermissionError> {
    if claims.permissions().is_none() {
        return Err(PermissionError::PermissionsClaimMissing);
    }

    if claims.has_permission(required_permission) {
        Ok(())
    } else {
        Err(PermissionError::PermissionNotFound {
            required: required_permission.to_string(),
        })
    }
}
