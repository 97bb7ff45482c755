//! Actor identity and role checks.
//!
//! Every service call receives an [`ActorContext`] describing who is acting.
//! There is no ambient session state: the caller (CLI or any outer layer)
//! builds the context per request and passes it in.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ComplianceError;

/// User role for role-based access control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Compliance administrator: generates work, resolves findings, reads the trail.
    Admin,
    /// Nurse: completes own assignments and acknowledges own violations.
    Nurse,
}

impl Role {
    /// Returns the role name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Nurse => "nurse",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            // "user" is the legacy name for the nurse role
            "nurse" | "user" => Ok(Role::Nurse),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// Request-scoped identity of the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    /// Username of the actor.
    pub actor: String,
    /// The actor's role.
    pub role: Role,
    /// Network origin of the request, recorded in the audit trail.
    pub origin_address: Option<String>,
}

impl ActorContext {
    /// Creates a context for the given actor and role.
    pub fn new(actor: impl Into<String>, role: Role) -> Self {
        Self {
            actor: actor.into(),
            role,
            origin_address: None,
        }
    }

    /// Shorthand for an administrator context.
    pub fn admin(actor: impl Into<String>) -> Self {
        Self::new(actor, Role::Admin)
    }

    /// Shorthand for a nurse context.
    pub fn nurse(actor: impl Into<String>) -> Self {
        Self::new(actor, Role::Nurse)
    }

    /// Adds the request origin for audit purposes.
    pub fn with_origin(mut self, address: impl Into<String>) -> Self {
        self.origin_address = Some(address.into());
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_nurse(&self) -> bool {
        self.role == Role::Nurse
    }

    /// Fails with `Forbidden` unless the actor is an administrator.
    pub fn require_admin(&self, operation: &str) -> Result<(), ComplianceError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ComplianceError::Forbidden(format!(
                "'{}' (role: {}) may not {}",
                self.actor, self.role, operation
            )))
        }
    }

    /// Fails with `Forbidden` unless the actor is a nurse.
    pub fn require_nurse(&self, operation: &str) -> Result<(), ComplianceError> {
        if self.is_nurse() {
            Ok(())
        } else {
            Err(ComplianceError::Forbidden(format!(
                "'{}' (role: {}) may not {}",
                self.actor, self.role, operation
            )))
        }
    }
}
