//! Well-known roles and the capabilities they grant.
//!
//! Role names match the values supplied by the auth collaborator.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::EntityId;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_PUBLISHER: &str = "publisher";
pub const ROLE_REVIEWER: &str = "reviewer";
pub const ROLE_VIEWER: &str = "viewer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Publisher,
    Reviewer,
    Viewer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => ROLE_ADMIN,
            Role::Publisher => ROLE_PUBLISHER,
            Role::Reviewer => ROLE_REVIEWER,
            Role::Viewer => ROLE_VIEWER,
        }
    }

    /// Parse a role name. Unknown names are `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            ROLE_ADMIN => Some(Role::Admin),
            ROLE_PUBLISHER => Some(Role::Publisher),
            ROLE_REVIEWER => Some(Role::Reviewer),
            ROLE_VIEWER => Some(Role::Viewer),
            _ => None,
        }
    }

    /// May submit schedules for approval and publish content.
    pub fn can_publish(self) -> bool {
        matches!(self, Role::Admin | Role::Publisher)
    }

    /// May approve or reject approval requests.
    pub fn can_review(self) -> bool {
        matches!(self, Role::Admin | Role::Reviewer)
    }
}

/// The user performing an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: EntityId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<EntityId>, role: Role) -> Self {
        Self { id: id.into(), role }
    }

    pub fn require_publisher(&self) -> Result<(), CoreError> {
        if self.role.can_publish() {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "Role '{}' may not publish or submit schedules",
                self.role.as_str()
            )))
        }
    }

    pub fn require_reviewer(&self) -> Result<(), CoreError> {
        if self.role.can_review() {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "Role '{}' may not review approval requests",
                self.role.as_str()
            )))
        }
    }

    /// Org-level settings such as approval controls.
    pub fn require_admin(&self) -> Result<(), CoreError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "Role '{}' may not change organization settings",
                self.role.as_str()
            )))
        }
    }
}
