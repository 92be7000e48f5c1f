// src/handlers/requirements.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::requirements::{Priority, RequirementStatus},
    services::{assignment::IndividualItem, lifecycle::SubmittedFile},
};

// El "hoy" del dominio: una fecha civil, inyectada a los servicios para
// que la derivación de vencimientos sea determinista en los tests.
fn today() -> NaiveDate {
    Utc::now().date_naive()
}

// ---
// Payloads: Asignación
// ---

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignItemPayload {
    pub document_type_id: Uuid,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignIndividualPayload {
    pub assigned_by: Uuid,

    #[validate(length(min = 1, message = "Debe incluir al menos un documento."))]
    #[validate(nested)]
    pub items: Vec<AssignItemPayload>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignTemplatePayload {
    pub template_id: Uuid,
    pub assigned_by: Uuid,
    pub override_due_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct RequirementFilter {
    pub status: Option<RequirementStatus>,
    pub priority: Option<Priority>,
}

// ---
// Handlers: Asignación y consulta por empleado
// ---

#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}/requirements",
    params(RequirementFilter),
    responses((status = 200, body = [crate::models::requirements::RequiredDocument])),
    tag = "Requirements"
)]
pub async fn list_employee_requirements(
    State(app_state): State<AppState>,
    Path(employee_id): Path<Uuid>,
    Query(filter): Query<RequirementFilter>,
) -> Result<impl IntoResponse, AppError> {
    let requirements = app_state
        .lifecycle_service
        .list_for_employee(
            &app_state.db_pool,
            employee_id,
            filter.status,
            filter.priority,
            today(),
        )
        .await?;
    Ok(Json(requirements))
}

#[utoipa::path(
    post,
    path = "/api/employees/{employee_id}/requirements",
    request_body = AssignIndividualPayload,
    responses((status = 200, body = crate::models::requirements::AssignmentReport)),
    tag = "Requirements"
)]
pub async fn assign_individual(
    State(app_state): State<AppState>,
    Path(employee_id): Path<Uuid>,
    Json(payload): Json<AssignIndividualPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let items = payload
        .items
        .into_iter()
        .map(|item| IndividualItem {
            document_type_id: item.document_type_id,
            priority: item.priority,
            due_date: item.due_date,
        })
        .collect();

    let report = app_state
        .assignment_service
        .assign_individual(
            &app_state.db_pool,
            employee_id,
            items,
            payload.assigned_by,
            today(),
        )
        .await?;
    Ok(Json(report))
}

#[utoipa::path(
    post,
    path = "/api/employees/{employee_id}/requirements/from-template",
    request_body = AssignTemplatePayload,
    responses((status = 200, body = crate::models::requirements::AssignmentReport)),
    tag = "Requirements"
)]
pub async fn assign_from_template(
    State(app_state): State<AppState>,
    Path(employee_id): Path<Uuid>,
    Json(payload): Json<AssignTemplatePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let report = app_state
        .assignment_service
        .assign_from_template(
            &app_state.db_pool,
            employee_id,
            payload.template_id,
            payload.override_due_date,
            payload.assigned_by,
            today(),
        )
        .await?;
    Ok(Json(report))
}

// ---
// Payloads: Ciclo de vida
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequirementPayload {
    pub due_date: Option<NaiveDate>,
    pub priority: Option<Priority>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFilePayload {
    #[validate(length(min = 1, message = "El nombre del archivo es obligatorio."))]
    pub file_name: String,

    #[validate(length(min = 1, message = "La ruta del archivo es obligatoria."))]
    pub file_path: String,

    #[validate(range(min = 1, message = "El tamaño del archivo debe ser positivo."))]
    pub file_size: i64,

    #[validate(length(min = 1, message = "El tipo MIME es obligatorio."))]
    pub mime_type: String,

    pub uploaded_by: Uuid,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovePayload {
    pub approver_id: Uuid,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RejectPayload {
    pub approver_id: Uuid,

    #[validate(length(min = 1, message = "La razón del rechazo es obligatoria."))]
    pub reason: String,
}

// ---
// Handlers: Ciclo de vida
// ---

#[utoipa::path(
    patch,
    path = "/api/requirements/{id}",
    request_body = UpdateRequirementPayload,
    responses((status = 200, body = crate::models::requirements::RequiredDocument)),
    tag = "Requirements"
)]
pub async fn update_requirement(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRequirementPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let requirement = app_state
        .lifecycle_service
        .update_details(
            &app_state.db_pool,
            id,
            payload.due_date,
            payload.priority,
            payload.note.as_deref(),
        )
        .await?;
    Ok(Json(requirement))
}

#[utoipa::path(
    delete,
    path = "/api/requirements/{id}",
    responses((status = 204)),
    tag = "Requirements"
)]
pub async fn remove_requirement(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .lifecycle_service
        .remove(&app_state.db_pool, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/requirements/{id}/submit",
    request_body = SubmitFilePayload,
    responses((status = 201, body = crate::models::requirements::EmployeeDocument)),
    tag = "Requirements"
)]
pub async fn submit_file(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitFilePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let document = app_state
        .lifecycle_service
        .submit(
            &app_state.db_pool,
            id,
            SubmittedFile {
                file_name: payload.file_name,
                file_path: payload.file_path,
                file_size: payload.file_size,
                mime_type: payload.mime_type,
            },
            payload.uploaded_by,
            today(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(document)))
}

#[utoipa::path(
    post,
    path = "/api/requirements/{id}/approve",
    request_body = ApprovePayload,
    responses((status = 200, body = crate::models::requirements::EmployeeDocument)),
    tag = "Requirements"
)]
pub async fn approve_requirement(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApprovePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let document = app_state
        .lifecycle_service
        .approve(&app_state.db_pool, id, payload.approver_id)
        .await?;
    Ok(Json(document))
}

#[utoipa::path(
    post,
    path = "/api/requirements/{id}/reject",
    request_body = RejectPayload,
    responses((status = 200, body = crate::models::requirements::EmployeeDocument)),
    tag = "Requirements"
)]
pub async fn reject_requirement(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let document = app_state
        .lifecycle_service
        .reject(&app_state.db_pool, id, payload.approver_id, &payload.reason)
        .await?;
    Ok(Json(document))
}
