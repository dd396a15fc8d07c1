//! Membership-table access context provider.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait};
use tracing::warn;

use cadence_core::access::{AccessContextProvider, AccessDecision, Actor, PermissionGate};
use cadence_core::{ActivityError, MemberRole};
use cadence_shared::types::{OrganizationId, UserId};

use crate::entities::{activity_reports, organization_members};

/// Resolves roles from `organization_members`.
#[derive(Debug, Clone)]
pub struct MembershipAccessProvider {
    db: DatabaseConnection,
}

impl MembershipAccessProvider {
    /// Creates a new membership access provider.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccessContextProvider for MembershipAccessProvider {
    async fn resolve(&self, user_id: UserId, organization_id: OrganizationId) -> AccessDecision {
        let membership =
            organization_members::Entity::find_by_id((organization_id.into_inner(), user_id.into_inner()))
                .one(&self.db)
                .await;

        match membership {
            Ok(Some(member)) if member.is_active => AccessDecision::Granted(member.role.into()),
            Ok(_) => AccessDecision::Denied,
            Err(e) => {
                warn!(%user_id, %organization_id, error = %e, "membership lookup failed");
                AccessDecision::Unresolved
            }
        }
    }
}

/// Runs the permission gate for an existing report.
///
/// # Errors
///
/// Returns `ActivityError::Forbidden` if the gate refuses the actor.
pub(crate) async fn authorize_report(
    access: &Arc<dyn AccessContextProvider>,
    actor: &Actor,
    report: &activity_reports::Model,
) -> Result<MemberRole, ActivityError> {
    let report_access = report.access();
    let decision = access
        .resolve(actor.user_id, report_access.organization_id)
        .await;
    PermissionGate::authorize(actor, &report_access, decision).into_result()
}

/// Runs the permission gate for the actor's own business context.
///
/// # Errors
///
/// Returns `ActivityError::Forbidden` if the gate refuses the actor.
pub(crate) async fn authorize_context(
    access: &Arc<dyn AccessContextProvider>,
    actor: &Actor,
) -> Result<MemberRole, ActivityError> {
    let decision = access.resolve(actor.user_id, actor.organization_id).await;
    PermissionGate::authorize_context(decision).into_result()
}
