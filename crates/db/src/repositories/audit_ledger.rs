//! SeaORM-backed audit ledger.
//!
//! Every commit stores the SHA-256 of the snapshot's canonical content and a
//! chain hash over the previous commit, so tampering with any row breaks the
//! chain from that row on.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

use cadence_core::audit::{AuditError, AuditLedger, AuditReceipt, AuditSnapshot};
use cadence_shared::types::AuditCommitId;

use crate::entities::audit_commits;

/// Audit ledger persisted in `audit_commits`.
#[derive(Debug, Clone)]
pub struct DbAuditLedger {
    db: DatabaseConnection,
}

impl DbAuditLedger {
    /// Creates a new audit ledger.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Hex SHA-256 of `bytes`.
    #[must_use]
    pub fn hash(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }

    /// Chain hash of a commit given its predecessor.
    #[must_use]
    pub fn chain(previous_hash: Option<&str>, content_hash: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(previous_hash.unwrap_or_default().as_bytes());
        hasher.update(b":");
        hasher.update(content_hash.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Finds the commit of a report.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::Unavailable` if the query fails.
    pub async fn find_by_report(
        &self,
        report_id: Uuid,
    ) -> Result<Option<audit_commits::Model>, AuditError> {
        audit_commits::Entity::find()
            .filter(audit_commits::Column::ReportId.eq(report_id))
            .one(&self.db)
            .await
            .map_err(unavailable)
    }

    /// Recomputes every chain hash and returns the sequence of the first
    /// broken commit, if any.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::Unavailable` if the query fails.
    pub async fn verify_chain(&self) -> Result<Option<i64>, AuditError> {
        let commits = audit_commits::Entity::find()
            .order_by_asc(audit_commits::Column::Sequence)
            .all(&self.db)
            .await
            .map_err(unavailable)?;

        let mut previous: Option<String> = None;
        for commit in commits {
            let expected_content = Self::hash(commit.payload_content()?.as_slice());
            let expected_chain = Self::chain(previous.as_deref(), &commit.content_hash);
            if commit.previous_hash != previous
                || commit.content_hash != expected_content
                || commit.chain_hash != expected_chain
            {
                return Ok(Some(commit.sequence));
            }
            previous = Some(commit.chain_hash);
        }
        Ok(None)
    }
}

impl audit_commits::Model {
    /// Canonical content bytes recovered from the stored payload.
    fn payload_content(&self) -> Result<Vec<u8>, AuditError> {
        let mut value: serde_json::Value = serde_json::from_str(&self.payload)
            .map_err(|e| AuditError::Serialization(e.to_string()))?;
        if let Some(map) = value.as_object_mut() {
            map.remove("captured_at");
        }
        serde_json::to_vec(&value).map_err(|e| AuditError::Serialization(e.to_string()))
    }

    fn receipt(&self) -> AuditReceipt {
        AuditReceipt {
            commit_id: AuditCommitId::from_uuid(self.id),
            content_hash: self.content_hash.clone(),
            committed_at: self.committed_at.with_timezone(&Utc),
        }
    }
}

#[async_trait]
impl AuditLedger for DbAuditLedger {
    async fn append(&self, snapshot: &AuditSnapshot) -> Result<AuditReceipt, AuditError> {
        let content_hash = Self::hash(&snapshot.canonical_content()?);
        let payload = serde_json::to_string(&snapshot.to_payload()?)
            .map_err(|e| AuditError::Serialization(e.to_string()))?;

        let txn = self.db.begin().await.map_err(unavailable)?;

        if let Some(existing) = audit_commits::Entity::find()
            .filter(audit_commits::Column::ReportId.eq(snapshot.report_id))
            .one(&txn)
            .await
            .map_err(unavailable)?
        {
            return if existing.content_hash == content_hash {
                Ok(existing.receipt())
            } else {
                Err(AuditError::Rejected(format!(
                    "report {} already has a commit with different content",
                    snapshot.report_id
                )))
            };
        }

        let last = audit_commits::Entity::find()
            .order_by_desc(audit_commits::Column::Sequence)
            .one(&txn)
            .await
            .map_err(unavailable)?;
        let (sequence, previous_hash) = match last {
            Some(last) => (last.sequence + 1, Some(last.chain_hash)),
            None => (1, None),
        };
        let chain_hash = Self::chain(previous_hash.as_deref(), &content_hash);

        let commit = audit_commits::ActiveModel {
            id: Set(Uuid::now_v7()),
            report_id: Set(snapshot.report_id),
            sequence: Set(sequence),
            content_hash: Set(content_hash),
            previous_hash: Set(previous_hash),
            chain_hash: Set(chain_hash),
            payload: Set(payload),
            committed_at: Set(Utc::now().into()),
        }
        .insert(&txn)
        .await
        .map_err(unavailable)?;

        txn.commit().await.map_err(unavailable)?;

        info!(
            report_id = %snapshot.report_id,
            commit_id = %commit.id,
            sequence = commit.sequence,
            "audit commit appended"
        );
        Ok(commit.receipt())
    }
}

fn unavailable(e: sea_orm::DbErr) -> AuditError {
    AuditError::Unavailable(e.to_string())
}
