// src/models/catalog.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- 1. Unidad de Renovación ---
// Persistida en Postgres como enum `renewal_unit` con los literales exactos
// (days|weeks|months|years) que los filtros del frontend comparan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "renewal_unit", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RenewalUnit {
    Days,
    Weeks,
    Months,
    Years,
}

// --- 2. Tipo de Documento (catálogo) ---
// Entrada del catálogo que describe una *clase* de documento (ej: "DPI",
// "Certificado Médico"). Nunca se borra físicamente: solo se desactiva,
// para no romper los requisitos ya asignados que lo referencian.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentType {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub is_mandatory: bool,

    // Invariante: si has_expiration es true, renewal_period y renewal_unit
    // deben estar presentes y renewal_period > 0 (CHECK en la migración).
    pub has_expiration: bool,
    pub renewal_period: Option<i32>,
    pub renewal_unit: Option<RenewalUnit>,

    // Plazo de entrega por defecto (en días) al asignar este tipo, si el
    // tipo define uno; si no, rige el plazo global de la configuración.
    pub default_due_days: Option<i32>,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentType {
    /// La cadencia de renovación propia del tipo, si la tiene.
    pub fn renewal_spec(&self) -> Option<EffectiveRenewal> {
        if !self.has_expiration {
            return None;
        }
        match (self.renewal_period, self.renewal_unit) {
            (Some(period), Some(unit)) => Some(EffectiveRenewal { period, unit }),
            _ => None,
        }
    }
}

// --- 3. Renovación Efectiva ---
// Resultado de resolver la cadena de precedencia (ítem de plantilla > tipo).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveRenewal {
    pub period: i32,
    pub unit: RenewalUnit,
}

// --- 4. Plantilla ---
// Paquete reutilizable de tipos de documento para un perfil de puesto
// (ej: "Médico General"). Aplicarla a un empleado es una expansión de
// solo lectura: la asignación nunca muta la plantilla.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    // Puramente presentacional; el motor lo ignora.
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateItem {
    pub id: Uuid,
    pub template_id: Uuid,
    pub document_type_id: Uuid,
    pub priority: crate::models::requirements::Priority,

    // Si has_custom_renewal es true, el ítem sobreescribe la cadencia
    // por defecto del tipo de documento.
    pub has_custom_renewal: bool,
    pub custom_renewal_period: Option<i32>,
    pub custom_renewal_unit: Option<RenewalUnit>,
}

/// Plantilla con sus ítems ya cargados (la forma que viaja por la API).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateWithItems {
    #[serde(flatten)]
    pub template: Template,
    pub items: Vec<TemplateItem>,
}

// --- 5. Empleado ---
// Datos maestros gestionados fuera del motor; aquí solo se leen.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: Uuid,
    pub full_name: String,
    // Puede faltar: bloquea la elegibilidad de notificación, ver urgency.rs
    pub email: Option<String>,
    pub position: Option<String>,
    pub is_active: bool,
}
