//! Association linker over the `report_entries` and `entry_work_items` join tables.
//!
//! Each mutation exists twice: as a connection-generic function, so services
//! can run it inside their own transaction, and as a method on
//! [`AssociationRepository`] that wraps it in a transaction of its own.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use cadence_core::ActivityError;

use crate::entities::{
    activity_entries, activity_reports, entry_work_items, report_entries, work_items,
};

pub(crate) fn db_err(e: sea_orm::DbErr) -> ActivityError {
    ActivityError::Database(e.to_string())
}

/// Diagnostic view of a report/work-item pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkDebugInfo {
    /// Report id as given.
    pub report_id: Uuid,
    /// Work item id as given.
    pub work_item_id: Uuid,
    /// Whether the report row exists.
    pub report_exists: bool,
    /// Whether the work item row exists.
    pub work_item_exists: bool,
    /// Active entries of the report linked to the work item.
    pub linked_entry_count: usize,
    /// Lookup failure, if any.
    pub error: Option<String>,
}

impl LinkDebugInfo {
    /// Returns true if at least one active entry connects the pair.
    #[must_use]
    pub const fn is_linked(&self) -> bool {
        self.linked_entry_count > 0
    }
}

// ============================================================================
// Connection-generic operations
// ============================================================================

/// Links an entry to a report. Returns the existing row if already linked.
///
/// # Errors
///
/// Returns `ReportNotFound` or `EntryNotFound` if either side is missing.
pub async fn link_entry<C: ConnectionTrait>(
    conn: &C,
    report_id: Uuid,
    entry_id: Uuid,
) -> Result<report_entries::Model, ActivityError> {
    ensure_report_exists(conn, report_id).await?;
    ensure_entry_exists(conn, entry_id).await?;

    if let Some(existing) = report_entries::Entity::find()
        .filter(report_entries::Column::ReportId.eq(report_id))
        .filter(report_entries::Column::EntryId.eq(entry_id))
        .one(conn)
        .await
        .map_err(db_err)?
    {
        return Ok(existing);
    }

    report_entries::ActiveModel {
        id: Set(Uuid::now_v7()),
        report_id: Set(report_id),
        entry_id: Set(entry_id),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await
    .map_err(db_err)
}

/// Links an entry to a work item. Returns the existing row if already linked.
///
/// # Errors
///
/// Returns `EntryNotFound` or `WorkItemNotFound` if either side is missing.
pub async fn link_work_item<C: ConnectionTrait>(
    conn: &C,
    entry_id: Uuid,
    work_item_id: Uuid,
) -> Result<entry_work_items::Model, ActivityError> {
    ensure_entry_exists(conn, entry_id).await?;
    work_items::Entity::find_by_id(work_item_id)
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(ActivityError::WorkItemNotFound(work_item_id))?;

    if let Some(existing) = entry_work_items::Entity::find()
        .filter(entry_work_items::Column::EntryId.eq(entry_id))
        .filter(entry_work_items::Column::WorkItemId.eq(work_item_id))
        .one(conn)
        .await
        .map_err(db_err)?
    {
        return Ok(existing);
    }

    entry_work_items::ActiveModel {
        id: Set(Uuid::now_v7()),
        entry_id: Set(entry_id),
        work_item_id: Set(work_item_id),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await
    .map_err(db_err)
}

/// Removes the link between a report and an entry.
///
/// # Errors
///
/// Returns `LinkNotFound` if no such link exists.
pub async fn unlink_entry<C: ConnectionTrait>(
    conn: &C,
    report_id: Uuid,
    entry_id: Uuid,
) -> Result<(), ActivityError> {
    let result = report_entries::Entity::delete_many()
        .filter(report_entries::Column::ReportId.eq(report_id))
        .filter(report_entries::Column::EntryId.eq(entry_id))
        .exec(conn)
        .await
        .map_err(db_err)?;

    if result.rows_affected == 0 {
        return Err(ActivityError::LinkNotFound {
            association: "report_entries",
            left: report_id,
            right: entry_id,
        });
    }
    Ok(())
}

/// Removes the link between an entry and a work item.
///
/// # Errors
///
/// Returns `LinkNotFound` if no such link exists.
pub async fn unlink_work_item<C: ConnectionTrait>(
    conn: &C,
    entry_id: Uuid,
    work_item_id: Uuid,
) -> Result<(), ActivityError> {
    let result = entry_work_items::Entity::delete_many()
        .filter(entry_work_items::Column::EntryId.eq(entry_id))
        .filter(entry_work_items::Column::WorkItemId.eq(work_item_id))
        .exec(conn)
        .await
        .map_err(db_err)?;

    if result.rows_affected == 0 {
        return Err(ActivityError::LinkNotFound {
            association: "entry_work_items",
            left: entry_id,
            right: work_item_id,
        });
    }
    Ok(())
}

/// Ids of every entry linked to the report, deleted ones included.
///
/// # Errors
///
/// Returns `ActivityError::Database` if the query fails.
pub async fn linked_entry_ids<C: ConnectionTrait>(
    conn: &C,
    report_id: Uuid,
) -> Result<Vec<Uuid>, ActivityError> {
    Ok(report_entries::Entity::find()
        .filter(report_entries::Column::ReportId.eq(report_id))
        .all(conn)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(|link| link.entry_id)
        .collect())
}

/// Entries linked to the report.
///
/// Soft-deleted entries are excluded unless `include_deleted` is set.
///
/// # Errors
///
/// Returns `ActivityError::Database` if the query fails.
pub async fn entries_for_report_in<C: ConnectionTrait>(
    conn: &C,
    report_id: Uuid,
    include_deleted: bool,
) -> Result<Vec<activity_entries::Model>, ActivityError> {
    let ids = linked_entry_ids(conn, report_id).await?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = activity_entries::Entity::find().filter(activity_entries::Column::Id.is_in(ids));
    if !include_deleted {
        query = query.filter(activity_entries::Column::DeletedAt.is_null());
    }
    query
        .order_by_asc(activity_entries::Column::EntryDate)
        .order_by_asc(activity_entries::Column::Id)
        .all(conn)
        .await
        .map_err(db_err)
}

/// The report an entry is linked to, if any.
///
/// # Errors
///
/// Returns `ActivityError::Database` if the query fails.
pub async fn report_id_for_entry<C: ConnectionTrait>(
    conn: &C,
    entry_id: Uuid,
) -> Result<Option<Uuid>, ActivityError> {
    Ok(report_entries::Entity::find()
        .filter(report_entries::Column::EntryId.eq(entry_id))
        .order_by_asc(report_entries::Column::CreatedAt)
        .one(conn)
        .await
        .map_err(db_err)?
        .map(|link| link.report_id))
}

/// Work-item links of the given entries.
///
/// # Errors
///
/// Returns `ActivityError::Database` if the query fails.
pub async fn work_item_links_for_entries<C: ConnectionTrait>(
    conn: &C,
    entry_ids: Vec<Uuid>,
) -> Result<Vec<entry_work_items::Model>, ActivityError> {
    if entry_ids.is_empty() {
        return Ok(Vec::new());
    }
    entry_work_items::Entity::find()
        .filter(entry_work_items::Column::EntryId.is_in(entry_ids))
        .order_by_asc(entry_work_items::Column::CreatedAt)
        .order_by_asc(entry_work_items::Column::Id)
        .all(conn)
        .await
        .map_err(db_err)
}

async fn ensure_report_exists<C: ConnectionTrait>(
    conn: &C,
    report_id: Uuid,
) -> Result<(), ActivityError> {
    activity_reports::Entity::find_by_id(report_id)
        .one(conn)
        .await
        .map_err(db_err)?
        .map(|_| ())
        .ok_or(ActivityError::ReportNotFound(report_id))
}

async fn ensure_entry_exists<C: ConnectionTrait>(
    conn: &C,
    entry_id: Uuid,
) -> Result<(), ActivityError> {
    activity_entries::Entity::find_by_id(entry_id)
        .filter(activity_entries::Column::DeletedAt.is_null())
        .one(conn)
        .await
        .map_err(db_err)?
        .map(|_| ())
        .ok_or(ActivityError::EntryNotFound(entry_id))
}

// ============================================================================
// Repository
// ============================================================================

/// Association repository; every mutation runs in its own transaction.
#[derive(Debug, Clone)]
pub struct AssociationRepository {
    db: DatabaseConnection,
}

impl AssociationRepository {
    /// Creates a new association repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Links an entry to a report, idempotently.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` kinds for missing sides and `Database` on failure.
    pub async fn link_entry(
        &self,
        report_id: Uuid,
        entry_id: Uuid,
    ) -> Result<report_entries::Model, ActivityError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let link = link_entry(&txn, report_id, entry_id).await?;
        txn.commit().await.map_err(db_err)?;
        Ok(link)
    }

    /// Links an entry to a work item, idempotently.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` kinds for missing sides and `Database` on failure.
    pub async fn link_work_item(
        &self,
        entry_id: Uuid,
        work_item_id: Uuid,
    ) -> Result<entry_work_items::Model, ActivityError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let link = link_work_item(&txn, entry_id, work_item_id).await?;
        txn.commit().await.map_err(db_err)?;
        Ok(link)
    }

    /// Removes a report/entry link.
    ///
    /// # Errors
    ///
    /// Returns `LinkNotFound` if the link is absent.
    pub async fn unlink_entry(&self, report_id: Uuid, entry_id: Uuid) -> Result<(), ActivityError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        unlink_entry(&txn, report_id, entry_id).await?;
        txn.commit().await.map_err(db_err)
    }

    /// Removes an entry/work-item link.
    ///
    /// # Errors
    ///
    /// Returns `LinkNotFound` if the link is absent.
    pub async fn unlink_work_item(
        &self,
        entry_id: Uuid,
        work_item_id: Uuid,
    ) -> Result<(), ActivityError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        unlink_work_item(&txn, entry_id, work_item_id).await?;
        txn.commit().await.map_err(db_err)
    }

    /// Active entries linked to a report.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError::Database` if the query fails.
    pub async fn entries_for_report(
        &self,
        report_id: Uuid,
    ) -> Result<Vec<activity_entries::Model>, ActivityError> {
        entries_for_report_in(&self.db, report_id, false).await
    }

    /// Every entry linked to a report, soft-deleted ones included.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError::Database` if the query fails.
    pub async fn entries_for_report_including_deleted(
        &self,
        report_id: Uuid,
    ) -> Result<Vec<activity_entries::Model>, ActivityError> {
        entries_for_report_in(&self.db, report_id, true).await
    }

    /// Reports with at least one active entry billed against the work item.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError::Database` if the query fails.
    pub async fn reports_for_work_item(
        &self,
        work_item_id: Uuid,
    ) -> Result<Vec<activity_reports::Model>, ActivityError> {
        let entry_ids = self.active_entry_ids_for_work_item(work_item_id).await?;
        if entry_ids.is_empty() {
            return Ok(Vec::new());
        }

        let report_ids: Vec<Uuid> = report_entries::Entity::find()
            .filter(report_entries::Column::EntryId.is_in(entry_ids))
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|link| link.report_id)
            .collect();
        if report_ids.is_empty() {
            return Ok(Vec::new());
        }

        activity_reports::Entity::find()
            .filter(activity_reports::Column::Id.is_in(report_ids))
            .order_by_desc(activity_reports::Column::PeriodYear)
            .order_by_desc(activity_reports::Column::PeriodMonth)
            .order_by_asc(activity_reports::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    /// Describes a report/work-item pair without failing.
    pub async fn debug_info(&self, report_id: Uuid, work_item_id: Uuid) -> LinkDebugInfo {
        let mut info = LinkDebugInfo {
            report_id,
            work_item_id,
            ..LinkDebugInfo::default()
        };
        if let Err(e) = self.fill_debug_info(&mut info).await {
            warn!(%report_id, %work_item_id, error = %e, "link debug lookup failed");
            info.error = Some(e.to_string());
        }
        info
    }

    async fn fill_debug_info(&self, info: &mut LinkDebugInfo) -> Result<(), ActivityError> {
        info.report_exists = activity_reports::Entity::find_by_id(info.report_id)
            .count(&self.db)
            .await
            .map_err(db_err)?
            > 0;
        info.work_item_exists = work_items::Entity::find_by_id(info.work_item_id)
            .count(&self.db)
            .await
            .map_err(db_err)?
            > 0;

        let report_entry_ids = linked_entry_ids(&self.db, info.report_id).await?;
        let work_item_entry_ids = self.active_entry_ids_for_work_item(info.work_item_id).await?;
        info.linked_entry_count = work_item_entry_ids
            .iter()
            .filter(|id| report_entry_ids.contains(id))
            .count();
        Ok(())
    }

    async fn active_entry_ids_for_work_item(
        &self,
        work_item_id: Uuid,
    ) -> Result<Vec<Uuid>, ActivityError> {
        let linked: Vec<Uuid> = entry_work_items::Entity::find()
            .filter(entry_work_items::Column::WorkItemId.eq(work_item_id))
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|link| link.entry_id)
            .collect();
        if linked.is_empty() {
            return Ok(Vec::new());
        }

        Ok(activity_entries::Entity::find()
            .filter(activity_entries::Column::Id.is_in(linked))
            .filter(activity_entries::Column::DeletedAt.is_null())
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|entry| entry.id)
            .collect())
    }
}
