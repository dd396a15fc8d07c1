//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST routes for activity reports and entries
//! - Bearer token middleware producing the acting user
//! - Body and path extractors that answer in the response envelope
//! - The `{ success, data | error }` response envelope

pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use cadence_core::access::AccessContextProvider;
use cadence_core::audit::AuditLedger;
use cadence_core::ValidationPolicy;
use cadence_db::{
    DbAuditLedger, EntryRepository, ExportRepository, MembershipAccessProvider, ReportRepository,
};
use cadence_shared::JwtService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
    /// Resolves the actor's role in a business context.
    pub access: Arc<dyn AccessContextProvider>,
    /// Receives report snapshots at lock time.
    pub ledger: Arc<dyn AuditLedger>,
    /// Validation bounds.
    pub policy: ValidationPolicy,
}

impl AppState {
    /// Wires the membership access provider and the database audit ledger.
    #[must_use]
    pub fn new(db: DatabaseConnection, jwt_service: JwtService, policy: ValidationPolicy) -> Self {
        Self {
            access: Arc::new(MembershipAccessProvider::new(db.clone())),
            ledger: Arc::new(DbAuditLedger::new(db.clone())),
            db: Arc::new(db),
            jwt_service: Arc::new(jwt_service),
            policy,
        }
    }

    /// Report lifecycle service.
    #[must_use]
    pub fn reports(&self) -> ReportRepository {
        ReportRepository::new(
            (*self.db).clone(),
            Arc::clone(&self.access),
            Arc::clone(&self.ledger),
            self.policy,
        )
    }

    /// Entry service.
    #[must_use]
    pub fn entries(&self) -> EntryRepository {
        EntryRepository::new((*self.db).clone(), Arc::clone(&self.access), self.policy)
    }

    /// Export service.
    #[must_use]
    pub fn exports(&self) -> ExportRepository {
        ExportRepository::new((*self.db).clone(), Arc::clone(&self.access))
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
