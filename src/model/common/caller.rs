use crate::error::{Error, Result};

use super::user::{OrganizationId, Role, UserId};

/// The identity on whose behalf an operation runs.
///
/// Built per request from the authentication token and handed explicitly to
/// every service call; nothing reads the acting user from ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub organization_id: OrganizationId,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: UserId, organization_id: impl Into<OrganizationId>, role: Role) -> Self {
        Self {
            user_id,
            organization_id: organization_id.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fail with `Forbidden` unless the caller is an admin.
    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(Error::forbidden("Admin access required"))
        }
    }

    /// Fail with `Forbidden` unless the caller belongs to the given organization.
    pub fn require_organization(&self, organization_id: &str, what: impl AsRef<str>) -> Result<()> {
        if self.organization_id == organization_id {
            Ok(())
        } else {
            Err(Error::forbidden(format!(
                "You don't have access to {}",
                what.as_ref()
            )))
        }
    }
}
