//! API-side authorization guard for commands.
//!
//! This enforces authorization at the command boundary (before dispatch),
//! while keeping domain aggregates and infra auth-agnostic.

use tradepost_auth::{AuthzError, CommandAuthorization, Permission, Principal, Role, authorize};

use crate::context::PrincipalContext;

/// Check authorization for a command in the current request context.
///
/// This is intended to be called **before** dispatching a command.
pub fn authorize_command<C: CommandAuthorization>(
    principal: &PrincipalContext,
    command: &C,
) -> Result<(), AuthzError> {
    let principal = Principal {
        user_id: principal.user_id(),
        role: principal.role(),
        permissions: permissions_for_role(principal.role()),
    };

    for perm in command.required_permissions() {
        authorize(&principal, perm)?;
    }

    Ok(())
}

/// Static role → permission policy.
///
/// Admin gets the wildcard; buyers and suppliers get the narrow set their
/// portal needs. Ownership ("manage_own") is still checked against the
/// read model by handlers; the permission only gates the verb.
pub fn permissions_for_role(role: Role) -> Vec<Permission> {
    match role {
        Role::Admin => vec![Permission::new("*")],
        Role::Supplier => vec![
            Permission::new("profile.manage_own"),
            Permission::new("catalog.manage_own"),
            Permission::new("inquiries.reply_own"),
        ],
        Role::Buyer => vec![
            Permission::new("profile.manage_own"),
            Permission::new("inquiries.submit"),
            Permission::new("inquiries.reply_own"),
            Permission::new("library.manage_own"),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradepost_core::UserId;

    struct FakeCommand {
        required: Vec<Permission>,
    }

    impl CommandAuthorization for FakeCommand {
        fn required_permissions(&self) -> &[Permission] {
            &self.required
        }
    }

    fn ctx(role: Role) -> PrincipalContext {
        PrincipalContext::new(UserId::new(), role)
    }

    #[test]
    fn admin_wildcard_covers_moderation_verbs() {
        let cmd = FakeCommand {
            required: vec![Permission::new("moderation.products")],
        };
        assert!(authorize_command(&ctx(Role::Admin), &cmd).is_ok());
    }

    #[test]
    fn buyer_cannot_moderate() {
        let cmd = FakeCommand {
            required: vec![Permission::new("moderation.products")],
        };
        assert!(authorize_command(&ctx(Role::Buyer), &cmd).is_err());
    }

    #[test]
    fn supplier_manages_own_catalog() {
        let cmd = FakeCommand {
            required: vec![Permission::new("catalog.manage_own")],
        };
        assert!(authorize_command(&ctx(Role::Supplier), &cmd).is_ok());
        assert!(authorize_command(&ctx(Role::Buyer), &cmd).is_err());
    }
}
