use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use evtix_core::entities::reconciliation_failures::ListReconciliationFailures;
use evtix_core::framework::DatabaseProcessor;
use evtix_sdk::objects::admin::{PaginationQuery, ReconciliationFailureResponse, clamp_pagination};
use kanau::processor::Processor;

use super::AdminApiError;
use crate::api::extractors::AdminAuth;
use crate::state::AppState;

/// `GET /reconciliation-failures`
///
/// Newest first. Query parameters: `limit`, `offset`.
pub async fn list_reconciliation_failures(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<impl IntoResponse, AdminApiError> {
    let processor = DatabaseProcessor {
        pool: state.db.clone(),
    };

    let (limit, offset) = clamp_pagination(query.limit, query.offset);
    let records = processor
        .process(ListReconciliationFailures { limit, offset })
        .await
        .map_err(AdminApiError::Database)?;

    let response: Vec<ReconciliationFailureResponse> =
        records.iter().map(|r| r.to_response()).collect();
    Ok(Json(response))
}
