//! Role and ownership gates.
//!
//! The role gate decides whether a class of user may act at all; the
//! ownership gate decides whether a specific user may act on a specific
//! resource. Admins pass both.

use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthContext;
use crate::models::user::Role;

/// Roles allowed to create and manage listings.
pub const LISTING_MANAGERS: &[Role] = &[Role::Owner, Role::Admin];

pub fn require_role(auth: &AuthContext, allowed: &[Role], action: &str) -> Result<()> {
    if auth.role.is_admin() || allowed.contains(&auth.role) {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "Role `{}` is not allowed to {action}",
            auth.role.as_str()
        )))
    }
}

pub fn require_admin(auth: &AuthContext) -> Result<()> {
    if auth.role.is_admin() {
        Ok(())
    } else {
        Err(AppError::forbidden("Admin access required"))
    }
}

pub fn require_owner_or_admin(auth: &AuthContext, owner_id: Uuid, action: &str) -> Result<()> {
    if auth.role.is_admin() || auth.user_id == owner_id {
        Ok(())
    } else {
        Err(AppError::forbidden(format!("Not authorized to {action}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(role: Role) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            role,
            username: "someone".into(),
            email: "someone@example.com".into(),
        }
    }

    #[test]
    fn role_gate() {
        assert!(require_role(&ctx(Role::Owner), LISTING_MANAGERS, "create listings").is_ok());
        assert!(require_role(&ctx(Role::Admin), &[Role::Owner], "create listings").is_ok());
        let err = require_role(&ctx(Role::Tenant), LISTING_MANAGERS, "create listings").unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn ownership_gate_matrix() {
        let owner = ctx(Role::Owner);
        let listing_owner = owner.user_id;

        for (actor, allowed) in [
            (owner.clone(), true),
            (ctx(Role::Owner), false),
            (ctx(Role::Tenant), false),
            (ctx(Role::Admin), true),
        ] {
            let outcome = require_owner_or_admin(&actor, listing_owner, "update this listing");
            assert_eq!(outcome.is_ok(), allowed, "role {:?}", actor.role);
            if let Err(err) = outcome {
                assert!(matches!(err, AppError::Forbidden(_)));
            }
        }
    }

    #[test]
    fn admin_gate() {
        assert!(require_admin(&ctx(Role::Admin)).is_ok());
        assert!(require_admin(&ctx(Role::Owner)).is_err());
    }
}
