// src/handlers/urgency.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{common::error::AppError, config::AppState, models::requirements::UrgencyTier};

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ExpiringFilter {
    /// Ventana en días; por defecto 30 (el corte del nivel `medium`).
    pub within_days: Option<i64>,
    pub tier: Option<UrgencyTier>,
}

#[utoipa::path(
    get,
    path = "/api/requirements/expiring",
    params(ExpiringFilter),
    responses((status = 200, body = [crate::models::requirements::UrgencyEntry])),
    tag = "Urgency"
)]
pub async fn list_expiring(
    State(app_state): State<AppState>,
    Query(filter): Query<ExpiringFilter>,
) -> Result<impl IntoResponse, AppError> {
    let entries = app_state
        .urgency_service
        .list_by_urgency(
            &app_state.db_pool,
            today(),
            filter.within_days.unwrap_or(30),
            filter.tier,
        )
        .await?;
    Ok(Json(entries))
}

#[utoipa::path(
    get,
    path = "/api/requirements/expired",
    responses((status = 200, body = [crate::models::requirements::UrgencyEntry])),
    tag = "Urgency"
)]
pub async fn list_expired(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let entries = app_state
        .urgency_service
        .list_expired(&app_state.db_pool, today())
        .await?;
    Ok(Json(entries))
}

#[utoipa::path(
    get,
    path = "/api/requirements/{id}/renewal-notice",
    responses(
        (status = 200, body = crate::models::requirements::RenewalNotice),
        (status = 422, description = "El empleado no tiene correo registrado")
    ),
    tag = "Urgency"
)]
pub async fn renewal_notice(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let notice = app_state
        .urgency_service
        .renewal_notice(&app_state.db_pool, id, today())
        .await?;
    Ok(Json(notice))
}
