// src/services/lifecycle.rs
//
// Máquina de estados de un requisito:
//
//   pendiente -> subido -> { aprobado, rechazado }
//   rechazado -> subido (resubida)
//
// `vencido` no es una transición almacenada: se deriva en lectura a partir
// de la fecha relevante y el "hoy" inyectado, porque la expiración es
// función del reloj de pared. Aprobar y rechazar verifican con
// compare-and-set que el estado sigue siendo `subido` al momento del
// commit, no solo al de la lectura.

use chrono::NaiveDate;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CatalogRepository, RequirementsRepository},
    models::{
        catalog::{DocumentType, EffectiveRenewal},
        requirements::{
            DocumentStatus, EmployeeDocument, Priority, RequiredDocument, RequirementStatus,
        },
    },
    services::renewal::apply_renewal,
};

/// Fecha contra la que se evalúa el vencimiento de un requisito.
///
/// Política unificada: la expiración de la versión vigente si existe, si no
/// la fecha límite de entrega. Un requisito aprobado cuyo tipo no vence no
/// tiene reloj (nunca pasa a vencido).
pub fn relevant_date(
    status: RequirementStatus,
    current_expiration: Option<NaiveDate>,
    due_date: NaiveDate,
) -> Option<NaiveDate> {
    match status {
        RequirementStatus::Aprobado => current_expiration,
        _ => Some(current_expiration.unwrap_or(due_date)),
    }
}

/// Estado efectivo en lectura: deriva `vencido` cuando la fecha relevante
/// quedó atrás y el estado persistido no es terminal-rechazado.
pub fn effective_status(
    stored: RequirementStatus,
    relevant: Option<NaiveDate>,
    today: NaiveDate,
) -> RequirementStatus {
    match stored {
        RequirementStatus::Rechazado => RequirementStatus::Rechazado,
        RequirementStatus::Vencido => RequirementStatus::Vencido,
        RequirementStatus::Pendiente | RequirementStatus::Subido | RequirementStatus::Aprobado => {
            match relevant {
                Some(date) if date < today => RequirementStatus::Vencido,
                _ => stored,
            }
        }
    }
}

/// La renovación que rige a un requisito: el override capturado al asignar
/// (ítem de plantilla) o, en su defecto, el default del tipo.
pub fn requirement_renewal(
    requirement: &RequiredDocument,
    document_type: &DocumentType,
) -> Option<EffectiveRenewal> {
    match (requirement.custom_renewal_period, requirement.custom_renewal_unit) {
        (Some(period), Some(unit)) => Some(EffectiveRenewal { period, unit }),
        _ => document_type.renewal_spec(),
    }
}

/// Versión que recibe la siguiente subida: la primera es 1, cada resubida
/// incrementa sobre la versión vigente.
pub fn next_version(current: Option<&EmployeeDocument>) -> i32 {
    current.map(|d| d.version + 1).unwrap_or(1)
}

/// Metadatos del archivo subido (el almacenamiento físico es externo).
#[derive(Debug, Clone)]
pub struct SubmittedFile {
    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
}

#[derive(Clone)]
pub struct LifecycleService {
    catalog_repo: CatalogRepository,
    requirements_repo: RequirementsRepository,
}

impl LifecycleService {
    pub fn new(catalog_repo: CatalogRepository, requirements_repo: RequirementsRepository) -> Self {
        Self {
            catalog_repo,
            requirements_repo,
        }
    }

    /// Resubida del empleado. Legal desde pendiente, rechazado o vencido
    /// (renovación); crea la siguiente versión del archivo y deja el
    /// requisito en `subido`. El bloqueo de fila hace atómico el
    /// incremento de versión frente a otra resubida concurrente.
    pub async fn submit<'e, E>(
        &self,
        executor: E,
        requirement_id: Uuid,
        file: SubmittedFile,
        uploaded_by: Uuid,
        today: NaiveDate,
    ) -> Result<EmployeeDocument, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let requirement = self
            .requirements_repo
            .get_requirement_for_update(&mut *tx, requirement_id)
            .await?
            .ok_or(AppError::RequirementNotFound)?;

        let current = self
            .requirements_repo
            .get_current_document(&mut *tx, requirement_id)
            .await?;

        let relevant = relevant_date(
            requirement.status,
            current.as_ref().and_then(|d| d.expiration_date),
            requirement.due_date,
        );
        let effective = effective_status(requirement.status, relevant, today);

        if !effective.allows_submit() {
            return Err(AppError::InvalidTransition {
                from: effective,
                action: "subir",
            });
        }

        let version = next_version(current.as_ref());

        let document = self
            .requirements_repo
            .insert_document_version(
                &mut *tx,
                requirement_id,
                requirement.employee_id,
                requirement.document_type_id,
                version,
                &file.file_name,
                &file.file_path,
                file.file_size,
                &file.mime_type,
                today,
                uploaded_by,
            )
            .await?;

        self.requirements_repo
            .set_status(&mut *tx, requirement_id, RequirementStatus::Subido)
            .await?;

        tx.commit().await?;
        Ok(document)
    }

    /// Aprobación del revisor. Solo legal desde `subido`; si el tipo vence,
    /// la expiración de la versión vigente se calcula aquí con la
    /// renovación efectiva del requisito.
    pub async fn approve<'e, E>(
        &self,
        executor: E,
        requirement_id: Uuid,
        approver_id: Uuid,
    ) -> Result<EmployeeDocument, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let requirement = self
            .requirements_repo
            .get_requirement(&mut *tx, requirement_id)
            .await?
            .ok_or(AppError::RequirementNotFound)?;

        if !requirement.status.allows_review() {
            return Err(AppError::InvalidTransition {
                from: requirement.status,
                action: "aprobar",
            });
        }

        let document = self
            .requirements_repo
            .get_current_document(&mut *tx, requirement_id)
            .await?
            .ok_or(AppError::SubmissionNotFound)?;

        let document_type = self
            .catalog_repo
            .get_document_type(&mut *tx, requirement.document_type_id)
            .await?
            .ok_or(AppError::DocumentTypeNotFound)?;

        let expiration = requirement_renewal(&requirement, &document_type)
            .map(|renewal| apply_renewal(document.upload_date, renewal))
            .transpose()?;

        let document = self
            .requirements_repo
            .resolve_document(
                &mut *tx,
                document.id,
                DocumentStatus::Aprobado,
                None,
                approver_id,
                expiration,
            )
            .await?;

        // Verificación al commit: si otra transición ganó la carrera entre
        // la lectura y este punto, no tocamos nada y la transacción cae.
        let updated = self
            .requirements_repo
            .set_status_if(
                &mut *tx,
                requirement_id,
                RequirementStatus::Subido,
                RequirementStatus::Aprobado,
            )
            .await?;
        if updated == 0 {
            return Err(AppError::ConcurrentModification);
        }

        tx.commit().await?;
        Ok(document)
    }

    /// Rechazo del revisor, con razón obligatoria. Devuelve el requisito a
    /// `rechazado` (reabrible con una resubida) y anexa la razón a la
    /// bitácora de notas.
    pub async fn reject<'e, E>(
        &self,
        executor: E,
        requirement_id: Uuid,
        approver_id: Uuid,
        reason: &str,
    ) -> Result<EmployeeDocument, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let requirement = self
            .requirements_repo
            .get_requirement(&mut *tx, requirement_id)
            .await?
            .ok_or(AppError::RequirementNotFound)?;

        if !requirement.status.allows_review() {
            return Err(AppError::InvalidTransition {
                from: requirement.status,
                action: "rechazar",
            });
        }

        let document = self
            .requirements_repo
            .get_current_document(&mut *tx, requirement_id)
            .await?
            .ok_or(AppError::SubmissionNotFound)?;

        let document = self
            .requirements_repo
            .resolve_document(
                &mut *tx,
                document.id,
                DocumentStatus::Rechazado,
                Some(reason),
                approver_id,
                None,
            )
            .await?;

        self.requirements_repo
            .append_note(&mut *tx, requirement_id, reason)
            .await?;

        let updated = self
            .requirements_repo
            .set_status_if(
                &mut *tx,
                requirement_id,
                RequirementStatus::Subido,
                RequirementStatus::Rechazado,
            )
            .await?;
        if updated == 0 {
            return Err(AppError::ConcurrentModification);
        }

        tx.commit().await?;
        Ok(document)
    }

    /// Borrado administrativo: elimina el requisito y todo su historial de
    /// versiones. Legal desde cualquier estado e irreversible.
    pub async fn remove<'e, E>(&self, executor: E, requirement_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        self.requirements_repo.delete_requirement(&mut *tx, requirement_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// PATCH administrativo de fecha/prioridad/nota. No cambia el estado.
    pub async fn update_details<'e, E>(
        &self,
        executor: E,
        requirement_id: Uuid,
        due_date: Option<NaiveDate>,
        priority: Option<Priority>,
        note: Option<&str>,
    ) -> Result<RequiredDocument, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let requirement = self
            .requirements_repo
            .update_details(&mut *tx, requirement_id, due_date, priority)
            .await?;

        let requirement = match note {
            Some(note) if !note.is_empty() => {
                self.requirements_repo.append_note(&mut *tx, requirement_id, note).await?;
                self.requirements_repo
                    .get_requirement(&mut *tx, requirement_id)
                    .await?
                    .ok_or(AppError::RequirementNotFound)?
            }
            _ => requirement,
        };

        tx.commit().await?;
        Ok(requirement)
    }

    /// Requisitos de un empleado con el estado ya derivado contra `today`.
    pub async fn list_for_employee<'e, E>(
        &self,
        executor: E,
        employee_id: Uuid,
        status: Option<RequirementStatus>,
        priority: Option<Priority>,
        today: NaiveDate,
    ) -> Result<Vec<RequiredDocument>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        self.catalog_repo
            .get_employee(&mut *tx, employee_id)
            .await?
            .ok_or(AppError::EmployeeNotFound)?;

        // El filtro por estado se aplica sobre el estado derivado, no el
        // almacenado: pedir `vencido` debe devolver los vencidos de hoy.
        let mut requirements = self
            .requirements_repo
            .list_for_employee(&mut *tx, employee_id, priority)
            .await?;

        for requirement in &mut requirements {
            let current = self
                .requirements_repo
                .get_current_document(&mut *tx, requirement.id)
                .await?;
            let relevant = relevant_date(
                requirement.status,
                current.and_then(|d| d.expiration_date),
                requirement.due_date,
            );
            requirement.status = effective_status(requirement.status, relevant, today);
        }

        tx.commit().await?;

        if let Some(wanted) = status {
            requirements.retain(|r| r.status == wanted);
        }
        Ok(requirements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn rejected_requirements_never_derive_to_vencido() {
        let today = date(2024, 6, 1);
        let past = Some(date(2024, 5, 1));
        assert_eq!(
            effective_status(RequirementStatus::Rechazado, past, today),
            RequirementStatus::Rechazado
        );
    }

    #[test]
    fn pendiente_subido_and_aprobado_expire_when_the_clock_passes() {
        let today = date(2024, 6, 1);
        let past = Some(date(2024, 5, 31));
        for stored in [
            RequirementStatus::Pendiente,
            RequirementStatus::Subido,
            RequirementStatus::Aprobado,
        ] {
            assert_eq!(effective_status(stored, past, today), RequirementStatus::Vencido);
        }
    }

    #[test]
    fn due_today_is_not_yet_expired() {
        let today = date(2024, 6, 1);
        assert_eq!(
            effective_status(RequirementStatus::Pendiente, Some(today), today),
            RequirementStatus::Pendiente
        );
    }

    #[test]
    fn approved_without_expiration_has_no_clock() {
        let due = date(2020, 1, 1);
        assert_eq!(relevant_date(RequirementStatus::Aprobado, None, due), None);
        assert_eq!(
            effective_status(RequirementStatus::Aprobado, None, date(2024, 6, 1)),
            RequirementStatus::Aprobado
        );
    }

    #[test]
    fn pending_requirements_fall_back_to_the_due_date() {
        let due = date(2024, 6, 15);
        assert_eq!(
            relevant_date(RequirementStatus::Pendiente, None, due),
            Some(due)
        );
        // Con expiración vigente, esta manda sobre la fecha límite.
        let expiration = date(2024, 9, 1);
        assert_eq!(
            relevant_date(RequirementStatus::Pendiente, Some(expiration), due),
            Some(expiration)
        );
    }

    #[test]
    fn submit_legality_follows_the_effective_state() {
        assert!(RequirementStatus::Pendiente.allows_submit());
        assert!(RequirementStatus::Rechazado.allows_submit());
        assert!(RequirementStatus::Vencido.allows_submit());
        assert!(!RequirementStatus::Subido.allows_submit());
        assert!(!RequirementStatus::Aprobado.allows_submit());
    }

    #[test]
    fn resubmission_after_reject_bumps_the_version() {
        use chrono::{DateTime, Utc};
        use uuid::Uuid;

        fn document(version: i32) -> EmployeeDocument {
            EmployeeDocument {
                id: Uuid::new_v4(),
                requirement_id: Uuid::new_v4(),
                employee_id: Uuid::new_v4(),
                document_type_id: Uuid::new_v4(),
                file_name: "dpi.pdf".to_string(),
                file_path: "/archivos/dpi.pdf".to_string(),
                file_size: 1024,
                mime_type: "application/pdf".to_string(),
                version,
                upload_date: date(2024, 1, 20),
                expiration_date: None,
                status: DocumentStatus::Rechazado,
                approval_notes: Some("Documento ilegible".to_string()),
                uploaded_by: Uuid::new_v4(),
                approved_by: Some(Uuid::new_v4()),
                approved_at: Some(DateTime::<Utc>::MIN_UTC),
            }
        }

        // Primera subida sin historial.
        assert_eq!(next_version(None), 1);

        // Tras un rechazo el requisito vuelve a admitir subidas, y la
        // resubida continúa el historial en lugar de reiniciarlo.
        assert!(RequirementStatus::Rechazado.allows_submit());
        assert_eq!(next_version(Some(&document(1))), 2);
        assert_eq!(next_version(Some(&document(7))), 8);
    }

    #[test]
    fn captured_override_wins_over_the_type_default_at_approval() {
        use crate::models::catalog::RenewalUnit;
        use crate::models::requirements::Priority;
        use chrono::{DateTime, Utc};
        use uuid::Uuid;

        let now = DateTime::<Utc>::MIN_UTC;
        let document_type = DocumentType {
            id: Uuid::new_v4(),
            name: "Certificado Médico".to_string(),
            category: "medico".to_string(),
            description: None,
            is_mandatory: true,
            has_expiration: true,
            renewal_period: Some(12),
            renewal_unit: Some(RenewalUnit::Months),
            default_due_days: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let mut requirement = RequiredDocument {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            document_type_id: document_type.id,
            priority: Priority::Urgente,
            due_date: date(2024, 1, 27),
            status: RequirementStatus::Subido,
            custom_renewal_period: Some(6),
            custom_renewal_unit: Some(RenewalUnit::Months),
            notes: None,
            assigned_by: Uuid::new_v4(),
            assigned_at: now,
            updated_at: now,
        };

        let renewal = requirement_renewal(&requirement, &document_type).unwrap();
        assert_eq!((renewal.period, renewal.unit), (6, RenewalUnit::Months));
        assert_eq!(
            apply_renewal(date(2024, 1, 20), renewal).unwrap(),
            date(2024, 7, 20)
        );

        // Sin override capturado rige el default del tipo.
        requirement.custom_renewal_period = None;
        requirement.custom_renewal_unit = None;
        let renewal = requirement_renewal(&requirement, &document_type).unwrap();
        assert_eq!((renewal.period, renewal.unit), (12, RenewalUnit::Months));
    }

    #[test]
    fn review_is_only_legal_from_subido() {
        assert!(RequirementStatus::Subido.allows_review());
        for status in [
            RequirementStatus::Pendiente,
            RequirementStatus::Aprobado,
            RequirementStatus::Rechazado,
            RequirementStatus::Vencido,
        ] {
            assert!(!status.allows_review());
        }
    }
}
