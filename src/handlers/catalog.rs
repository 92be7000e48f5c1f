// src/handlers/catalog.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::AppError,
    config::AppState,
    models::catalog::RenewalUnit,
    models::requirements::Priority,
    services::catalog_service::{DocumentTypeInput, TemplateItemInput},
};

// ---
// Payloads: Tipos de Documento
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTypePayload {
    #[validate(length(min = 1, message = "El nombre es obligatorio."))]
    pub name: String,

    #[validate(length(min = 1, message = "La categoría es obligatoria."))]
    pub category: String,

    pub description: Option<String>,

    #[serde(default)]
    pub is_mandatory: bool,

    #[serde(default)]
    pub has_expiration: bool,

    pub renewal_period: Option<i32>,
    pub renewal_unit: Option<RenewalUnit>,

    #[validate(range(min = 1, message = "El plazo de entrega debe ser positivo."))]
    pub default_due_days: Option<i32>,
}

impl DocumentTypePayload {
    // Regla cruzada: si el tipo vence, la cadencia completa es obligatoria.
    fn validate_consistency(&self) -> Result<(), ValidationError> {
        if self.has_expiration
            && (self.renewal_period.is_none() || self.renewal_unit.is_none())
        {
            return Err(ValidationError::new("RenewalSpecRequired"));
        }
        Ok(())
    }

    fn into_input(self) -> DocumentTypeInput {
        DocumentTypeInput {
            name: self.name,
            category: self.category,
            description: self.description,
            is_mandatory: self.is_mandatory,
            has_expiration: self.has_expiration,
            renewal_period: self.renewal_period,
            renewal_unit: self.renewal_unit,
            default_due_days: self.default_due_days,
        }
    }
}

fn validate_payload(payload: &DocumentTypePayload) -> Result<(), AppError> {
    payload.validate()?;
    payload.validate_consistency().map_err(|e| {
        let mut errors = validator::ValidationErrors::new();
        errors.add("renewalPeriod", e);
        AppError::ValidationError(errors)
    })
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTypeFilter {
    pub category: Option<String>,
    pub active: Option<bool>,
}

// ---
// Handlers: Tipos de Documento
// ---

#[utoipa::path(
    get,
    path = "/api/catalog/document-types",
    params(DocumentTypeFilter),
    responses((status = 200, body = [crate::models::catalog::DocumentType])),
    tag = "Catalog"
)]
pub async fn list_document_types(
    State(app_state): State<AppState>,
    Query(filter): Query<DocumentTypeFilter>,
) -> Result<impl IntoResponse, AppError> {
    let types = app_state
        .catalog_service
        .list_document_types(&app_state.db_pool, filter.category.as_deref(), filter.active)
        .await?;
    Ok(Json(types))
}

#[utoipa::path(
    post,
    path = "/api/catalog/document-types",
    request_body = DocumentTypePayload,
    responses((status = 201, body = crate::models::catalog::DocumentType)),
    tag = "Catalog"
)]
pub async fn create_document_type(
    State(app_state): State<AppState>,
    Json(payload): Json<DocumentTypePayload>,
) -> Result<impl IntoResponse, AppError> {
    validate_payload(&payload)?;

    let doc_type = app_state
        .catalog_service
        .create_document_type(&app_state.db_pool, payload.into_input())
        .await?;
    Ok((StatusCode::CREATED, Json(doc_type)))
}

#[utoipa::path(
    put,
    path = "/api/catalog/document-types/{id}",
    request_body = DocumentTypePayload,
    responses((status = 200, body = crate::models::catalog::DocumentType)),
    tag = "Catalog"
)]
pub async fn update_document_type(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DocumentTypePayload>,
) -> Result<impl IntoResponse, AppError> {
    validate_payload(&payload)?;

    let doc_type = app_state
        .catalog_service
        .update_document_type(&app_state.db_pool, id, payload.into_input())
        .await?;
    Ok(Json(doc_type))
}

#[utoipa::path(
    delete,
    path = "/api/catalog/document-types/{id}",
    responses((status = 204)),
    tag = "Catalog"
)]
pub async fn deactivate_document_type(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .catalog_service
        .deactivate_document_type(&app_state.db_pool, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Payloads: Plantillas
// ---

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateItemPayload {
    pub document_type_id: Uuid,
    pub priority: Priority,

    #[serde(default)]
    pub has_custom_renewal: bool,

    #[validate(range(min = 1, message = "El periodo de renovación debe ser positivo."))]
    pub custom_renewal_period: Option<i32>,
    pub custom_renewal_unit: Option<RenewalUnit>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplatePayload {
    #[validate(length(min = 1, message = "El nombre es obligatorio."))]
    pub name: String,

    pub description: Option<String>,

    #[validate(length(min = 1, message = "La categoría es obligatoria."))]
    pub category: String,

    pub icon: Option<String>,

    #[validate(length(min = 1, message = "La plantilla debe tener al menos un ítem."))]
    #[validate(nested)]
    pub items: Vec<TemplateItemPayload>,
}

impl TemplatePayload {
    fn items_input(&self) -> Result<Vec<TemplateItemInput>, AppError> {
        self.items
            .iter()
            .map(|item| {
                let custom_renewal = if item.has_custom_renewal {
                    match (item.custom_renewal_period, item.custom_renewal_unit) {
                        (Some(period), Some(unit)) => Some((period, unit)),
                        _ => return Err(AppError::InvalidRenewalSpec(0)),
                    }
                } else {
                    None
                };
                Ok(TemplateItemInput {
                    document_type_id: item.document_type_id,
                    priority: item.priority,
                    custom_renewal,
                })
            })
            .collect()
    }
}

// ---
// Handlers: Plantillas
// ---

#[utoipa::path(
    get,
    path = "/api/catalog/templates",
    responses((status = 200, body = [crate::models::catalog::TemplateWithItems])),
    tag = "Catalog"
)]
pub async fn list_templates(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let templates = app_state
        .catalog_service
        .list_templates(&app_state.db_pool)
        .await?;
    Ok(Json(templates))
}

#[utoipa::path(
    post,
    path = "/api/catalog/templates",
    request_body = TemplatePayload,
    responses((status = 201, body = crate::models::catalog::TemplateWithItems)),
    tag = "Catalog"
)]
pub async fn create_template(
    State(app_state): State<AppState>,
    Json(payload): Json<TemplatePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let items = payload.items_input()?;

    let template = app_state
        .catalog_service
        .create_template(
            &app_state.db_pool,
            &payload.name,
            payload.description.as_deref(),
            &payload.category,
            payload.icon.as_deref(),
            items,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(template)))
}

#[utoipa::path(
    put,
    path = "/api/catalog/templates/{id}",
    request_body = TemplatePayload,
    responses((status = 200, body = crate::models::catalog::TemplateWithItems)),
    tag = "Catalog"
)]
pub async fn update_template(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TemplatePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let items = payload.items_input()?;

    let template = app_state
        .catalog_service
        .update_template(
            &app_state.db_pool,
            id,
            &payload.name,
            payload.description.as_deref(),
            &payload.category,
            payload.icon.as_deref(),
            items,
        )
        .await?;
    Ok(Json(template))
}
