// src/models/requirements.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- 1. Prioridad ---
// Literales en español tal cual se persisten y se filtran aguas abajo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Baja,
    Normal,
    Alta,
    Urgente,
}

// --- 2. Estado del Requisito ---
// `Vencido` es un estado *derivado*: nunca se persiste como transición,
// se calcula en lectura a partir de la fecha relevante y el "hoy" inyectado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "requirement_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequirementStatus {
    Pendiente,
    Subido,
    Aprobado,
    Rechazado,
    Vencido,
}

impl RequirementStatus {
    /// Estados desde los cuales el empleado puede (re)subir un archivo.
    /// `Vencido` habilita la resubida del ciclo de renovación; `Aprobado`
    /// vigente y `Subido` (en revisión) la rechazan.
    pub fn allows_submit(self) -> bool {
        matches!(self, Self::Pendiente | Self::Rechazado | Self::Vencido)
    }

    /// Solo un requisito en revisión puede aprobarse o rechazarse.
    pub fn allows_review(self) -> bool {
        matches!(self, Self::Subido)
    }
}

// --- 3. Estado del Documento (archivo subido) ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "document_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pendiente,
    Aprobado,
    Rechazado,
}

// --- 4. Requisito (instancia por empleado) ---
// A lo sumo un requisito activo por par (employee_id, document_type_id);
// el índice único de la migración lo garantiza frente a carreras.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequiredDocument {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub document_type_id: Uuid,
    pub priority: Priority,
    pub due_date: NaiveDate,
    pub status: RequirementStatus,

    // Cadencia de renovación resuelta al asignar (override del ítem de
    // plantilla). Nula = rige el default del tipo de documento.
    pub custom_renewal_period: Option<i32>,
    pub custom_renewal_unit: Option<crate::models::catalog::RenewalUnit>,
    // Bitácora de comentarios del revisor, solo se anexa.
    pub notes: Option<String>,
    pub assigned_by: Uuid,
    pub assigned_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- 5. Documento del Empleado (versión de archivo) ---
// Pueden existir varias versiones por requisito (historial de resubidas);
// la vigente es la de `version` máxima.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDocument {
    pub id: Uuid,
    pub requirement_id: Uuid,
    pub employee_id: Uuid,
    pub document_type_id: Uuid,

    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,

    pub version: i32,
    pub upload_date: NaiveDate,
    // Calculada al aprobar: compute_next_date(upload_date, periodo, unidad).
    // Nula cuando el tipo de documento no vence.
    pub expiration_date: Option<NaiveDate>,

    pub status: DocumentStatus,
    pub approval_notes: Option<String>,
    pub uploaded_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
}

// --- 6. Nivel de Urgencia ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyTier {
    Expired,
    Urgent,
    High,
    Medium,
    Ok,
}

/// Clasificación de urgencia de un requisito: el nivel más los días que
/// faltan (negativos si ya venció).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Urgency {
    pub tier: UrgencyTier,
    pub days_until: i64,
}

impl Urgency {
    pub fn days_expired(&self) -> Option<i64> {
        (self.tier == UrgencyTier::Expired).then_some(-self.days_until)
    }
}

// --- 7. Reporte de Asignación (éxito parcial) ---
// Las operaciones de lote nunca fallan completas por un duplicado: cada
// ítem se reporta como asignado u omitido con su código de razón.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    AlreadyAssigned,
    DocumentTypeNotFound,
    DocumentTypeInactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SkippedAssignment {
    pub document_type_id: Uuid,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentReport {
    pub assigned: Vec<RequiredDocument>,
    pub skipped: Vec<SkippedAssignment>,
}

// --- 8. Vistas del feed de urgencia ---

/// Fila del feed: requisito + contexto para el dashboard y el correo.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UrgencyEntry {
    pub requirement: RequiredDocument,
    pub document_type_name: String,
    pub employee_name: String,
    /// Fecha contra la que se clasifica: expiración de la versión vigente
    /// si existe, si no la fecha límite de entrega.
    pub relevant_date: NaiveDate,
    pub urgency: Urgency,
}

/// Fila cruda que el repositorio entrega al feed: el requisito más el
/// contexto mínimo para derivar estado, fecha relevante y urgencia.
#[derive(Debug, Clone, FromRow)]
pub struct FeedCandidate {
    #[sqlx(flatten)]
    pub requirement: RequiredDocument,
    pub document_type_name: String,
    pub employee_name: String,
    pub employee_email: Option<String>,
    pub has_expiration: bool,
    pub is_mandatory: bool,
    /// Expiración de la versión vigente del archivo, si existe.
    pub current_expiration: Option<NaiveDate>,
}

/// Resultado de la verificación previa al envío de un aviso de renovación.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenewalNotice {
    pub requirement_id: Uuid,
    pub employee_id: Uuid,
    pub employee_name: String,
    pub employee_email: String,
    pub document_type_name: String,
    pub relevant_date: NaiveDate,
    pub urgency: Urgency,
}
