use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use evtix_core::entities::event_records::GetEventById;
use evtix_core::entities::participants::ListEventParticipants;
use evtix_core::framework::DatabaseProcessor;
use evtix_sdk::objects::admin::{AdminParticipantResponse, PaginationQuery, clamp_pagination};
use kanau::processor::Processor;
use uuid::Uuid;

use super::AdminApiError;
use crate::api::extractors::AdminAuth;
use crate::state::AppState;

/// `GET /events/{event_id}/participants`
///
/// Oldest registration first. Query parameters: `limit`, `offset`.
pub async fn list_participants(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Query(query): Query<PaginationQuery>,
) -> Result<impl IntoResponse, AdminApiError> {
    let processor = DatabaseProcessor {
        pool: state.db.clone(),
    };

    processor
        .process(GetEventById { event_id })
        .await
        .map_err(AdminApiError::Database)?
        .ok_or(AdminApiError::NotFound)?;

    let (limit, offset) = clamp_pagination(query.limit, query.offset);
    let records = processor
        .process(ListEventParticipants {
            event_id,
            limit,
            offset,
        })
        .await
        .map_err(AdminApiError::Database)?;

    let response: Vec<AdminParticipantResponse> =
        records.iter().map(|r| r.to_admin_response()).collect();
    Ok(Json(response))
}
