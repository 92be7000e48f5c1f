use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::models::requirements::RequirementStatus;

// Nuestro tipo de error, con `thiserror` para mejor ergonomía.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error de validación")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Especificación de renovación inválida: periodo {0}")]
    InvalidRenewalSpec(i32),

    #[error("Empleado no encontrado")]
    EmployeeNotFound,

    #[error("Tipo de documento no encontrado")]
    DocumentTypeNotFound,

    #[error("Plantilla no encontrada")]
    TemplateNotFound,

    #[error("Requisito no encontrado")]
    RequirementNotFound,

    #[error("El requisito no tiene ningún archivo subido")]
    SubmissionNotFound,

    #[error("Ya existe un tipo de documento con el nombre '{0}'")]
    DocumentTypeNameTaken(String),

    #[error("El requisito ya está asignado a este empleado")]
    AlreadyAssigned,

    #[error("Transición inválida: no se puede '{action}' desde el estado {from:?}")]
    InvalidTransition {
        from: RequirementStatus,
        action: &'static str,
    },

    #[error("El requisito fue modificado por otra operación concurrente")]
    ConcurrentModification,

    #[error("El empleado no tiene correo electrónico registrado")]
    EmployeeEmailMissing,

    #[error("El requisito no tiene fecha de vencimiento ni renovación pendiente")]
    NoRenewalClock,

    // Variante para errores de base de datos (sqlx)
    #[error("Error de base de datos")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para cualquier otro error inesperado.
    // `anyhow::Error` es ideal para capturar el contexto del error.
    #[error("Error interno del servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Devuelve todos los detalles de la validación, campo por campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Uno o más campos son inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::InvalidRenewalSpec(period) => {
                let body = Json(json!({
                    "error": "El periodo de renovación debe ser mayor que cero.",
                    "period": period,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::InvalidTransition { from, action } => {
                let body = Json(json!({
                    "error": format!("No se puede '{action}' un requisito en este estado."),
                    "currentStatus": from,
                }));
                return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
            }

            AppError::EmployeeNotFound => (StatusCode::NOT_FOUND, "Empleado no encontrado."),
            AppError::DocumentTypeNotFound => {
                (StatusCode::NOT_FOUND, "Tipo de documento no encontrado.")
            }
            AppError::TemplateNotFound => (StatusCode::NOT_FOUND, "Plantilla no encontrada."),
            AppError::RequirementNotFound => (StatusCode::NOT_FOUND, "Requisito no encontrado."),
            AppError::SubmissionNotFound => (
                StatusCode::NOT_FOUND,
                "El requisito no tiene ningún archivo subido.",
            ),
            AppError::DocumentTypeNameTaken(_) => (
                StatusCode::CONFLICT,
                "Ya existe un tipo de documento con ese nombre.",
            ),
            AppError::AlreadyAssigned => (
                StatusCode::CONFLICT,
                "El requisito ya está asignado a este empleado.",
            ),
            AppError::ConcurrentModification => (
                StatusCode::CONFLICT,
                "El requisito fue modificado por otra operación; vuelva a consultar su estado.",
            ),
            AppError::EmployeeEmailMissing => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "El empleado no tiene correo electrónico registrado; no se puede notificar.",
            ),
            AppError::NoRenewalClock => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "El requisito no tiene fecha de vencimiento ni renovación que notificar.",
            ),

            // Todos los demás (DatabaseError, InternalServerError) son 500.
            // El `tracing` registra el mensaje detallado que `thiserror` nos dio.
            ref e => {
                tracing::error!("Error interno del servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocurrió un error inesperado.",
                )
            }
        };

        // Respuesta estándar para errores simples que solo llevan un mensaje.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
