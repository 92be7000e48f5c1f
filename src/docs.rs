// src/docs.rs

use crate::handlers;
use crate::models;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Catálogo ---
        handlers::catalog::list_document_types,
        handlers::catalog::create_document_type,
        handlers::catalog::update_document_type,
        handlers::catalog::deactivate_document_type,
        handlers::catalog::list_templates,
        handlers::catalog::create_template,
        handlers::catalog::update_template,

        // --- Requisitos ---
        handlers::requirements::list_employee_requirements,
        handlers::requirements::assign_individual,
        handlers::requirements::assign_from_template,
        handlers::requirements::update_requirement,
        handlers::requirements::remove_requirement,
        handlers::requirements::submit_file,
        handlers::requirements::approve_requirement,
        handlers::requirements::reject_requirement,

        // --- Urgencia ---
        handlers::urgency::list_expiring,
        handlers::urgency::list_expired,
        handlers::urgency::renewal_notice,
    ),
    components(
        schemas(
            // --- Catálogo ---
            models::catalog::RenewalUnit,
            models::catalog::DocumentType,
            models::catalog::EffectiveRenewal,
            models::catalog::Template,
            models::catalog::TemplateItem,
            models::catalog::TemplateWithItems,
            models::catalog::Employee,

            // --- Requisitos ---
            models::requirements::Priority,
            models::requirements::RequirementStatus,
            models::requirements::DocumentStatus,
            models::requirements::RequiredDocument,
            models::requirements::EmployeeDocument,
            models::requirements::UrgencyTier,
            models::requirements::Urgency,
            models::requirements::SkipReason,
            models::requirements::SkippedAssignment,
            models::requirements::AssignmentReport,
            models::requirements::UrgencyEntry,
            models::requirements::RenewalNotice,

            // --- Payloads ---
            handlers::catalog::DocumentTypePayload,
            handlers::catalog::TemplatePayload,
            handlers::catalog::TemplateItemPayload,
            handlers::requirements::AssignItemPayload,
            handlers::requirements::AssignIndividualPayload,
            handlers::requirements::AssignTemplatePayload,
            handlers::requirements::UpdateRequirementPayload,
            handlers::requirements::SubmitFilePayload,
            handlers::requirements::ApprovePayload,
            handlers::requirements::RejectPayload,
        )
    ),
    tags(
        (name = "Catalog", description = "Catálogo de tipos de documento y plantillas"),
        (name = "Requirements", description = "Asignación y ciclo de vida de requisitos"),
        (name = "Urgency", description = "Feed de vencimientos y elegibilidad de avisos")
    )
)]
pub struct ApiDoc;
