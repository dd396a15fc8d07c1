//! Permission gate and the access-context seam.
//!
//! The gate is pure: it receives the acting user, the report's ownership
//! facts and a decision resolved beforehand by an [`AccessContextProvider`].
//! Anything short of an explicit grant with an eligible role is forbidden.

use async_trait::async_trait;
use cadence_shared::types::{OrganizationId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ActivityError;

/// The authenticated user acting in a business context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// Acting user.
    pub user_id: UserId,
    /// Business context the user is acting in.
    pub organization_id: OrganizationId,
}

impl Actor {
    /// Creates an actor.
    #[must_use]
    pub const fn new(user_id: UserId, organization_id: OrganizationId) -> Self {
        Self {
            user_id,
            organization_id,
        }
    }
}

/// Role of a user inside an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    /// Organization owner.
    Owner,
    /// Organization administrator.
    Admin,
    /// Independent contractor billing the organization.
    Contractor,
    /// Read-only member.
    Viewer,
}

impl MemberRole {
    /// Returns the string representation of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Contractor => "contractor",
            Self::Viewer => "viewer",
        }
    }

    /// Parses a role from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "owner" => Some(Self::Owner),
            "admin" => Some(Self::Admin),
            "contractor" => Some(Self::Contractor),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }

    /// Returns true if the role may create, read or mutate activity reports.
    #[must_use]
    pub const fn can_manage_activity(self) -> bool {
        matches!(self, Self::Owner | Self::Admin | Self::Contractor)
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of resolving a user's standing in a business context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// The user is an active member with this role.
    Granted(MemberRole),
    /// The user is not an active member of the context.
    Denied,
    /// The provider could not decide (lookup failure, malformed data).
    Unresolved,
}

/// Why the gate refused an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenReason {
    /// Membership was denied or could not be resolved.
    NoAccessContext,
    /// The role is not allowed to manage activity.
    IneligibleRole(MemberRole),
    /// The actor does not own the report.
    NotOwner,
    /// The report belongs to another business context.
    ForeignContext,
}

impl fmt::Display for ForbiddenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAccessContext => f.write_str("no access to this business context"),
            Self::IneligibleRole(role) => write!(f, "role {role} cannot manage activity reports"),
            Self::NotOwner => f.write_str("report is owned by another user"),
            Self::ForeignContext => f.write_str("report belongs to another business context"),
        }
    }
}

/// Gate result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    /// The actor may proceed with the given role.
    Allowed(MemberRole),
    /// The actor is refused.
    Forbidden(ForbiddenReason),
}

impl Authorization {
    /// Converts the gate result into a `Result`, for use with `?`.
    pub fn into_result(self) -> Result<MemberRole, ActivityError> {
        match self {
            Self::Allowed(role) => Ok(role),
            Self::Forbidden(reason) => Err(ActivityError::Forbidden(reason)),
        }
    }
}

/// Ownership facts of an existing report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportAccess {
    /// Report owner.
    pub owner_id: UserId,
    /// Report business context.
    pub organization_id: OrganizationId,
}

/// Resolves a user's role inside a business context.
///
/// Implementations must not fail: lookup problems are reported as
/// [`AccessDecision::Unresolved`].
#[async_trait]
pub trait AccessContextProvider: Send + Sync {
    /// Resolves the standing of `user_id` in `organization_id`.
    async fn resolve(&self, user_id: UserId, organization_id: OrganizationId) -> AccessDecision;
}

/// Stateless ownership and role checks.
pub struct PermissionGate;

impl PermissionGate {
    /// Authorizes an actor without a report, e.g. for create and list.
    #[must_use]
    pub fn authorize_context(decision: AccessDecision) -> Authorization {
        match decision {
            AccessDecision::Granted(role) if role.can_manage_activity() => {
                Authorization::Allowed(role)
            }
            AccessDecision::Granted(role) => {
                Authorization::Forbidden(ForbiddenReason::IneligibleRole(role))
            }
            AccessDecision::Denied | AccessDecision::Unresolved => {
                Authorization::Forbidden(ForbiddenReason::NoAccessContext)
            }
        }
    }

    /// Authorizes an actor against an existing report.
    ///
    /// The decision must have been resolved for the report's business context.
    #[must_use]
    pub fn authorize(actor: &Actor, report: &ReportAccess, decision: AccessDecision) -> Authorization {
        if actor.organization_id != report.organization_id {
            return Authorization::Forbidden(ForbiddenReason::ForeignContext);
        }
        if actor.user_id != report.owner_id {
            return Authorization::Forbidden(ForbiddenReason::NotOwner);
        }
        Self::authorize_context(decision)
    }
}
