// src/services/urgency.rs
//
// Feed de urgencia y elegibilidad de notificación: agrega todos los
// requisitos, los clasifica contra el "hoy" inyectado y expone la vista
// que consumen el dashboard y el disparador de correos masivos. Las
// lecturas son instantáneas eventualmente consistentes: nunca bloquean a
// los escritores.

use chrono::NaiveDate;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::RequirementsRepository,
    models::requirements::{FeedCandidate, RenewalNotice, RequirementStatus, UrgencyEntry, UrgencyTier},
    services::{
        lifecycle::{effective_status, relevant_date},
        renewal::classify_urgency,
    },
};

/// Evalúa un candidato del feed. Devuelve None cuando el requisito no
/// tiene reloj que lo haga aparecer: un aprobado cuyo tipo no vence, o un
/// aprobado recién renovado queda fuera por el filtro de ventana aguas
/// arriba (su `days_until` es lejano).
pub fn evaluate_candidate(candidate: &FeedCandidate, today: NaiveDate) -> Option<UrgencyEntry> {
    let requirement = &candidate.requirement;

    let relevant = relevant_date(
        requirement.status,
        candidate.current_expiration,
        requirement.due_date,
    )?;

    let mut requirement = requirement.clone();
    requirement.status = effective_status(requirement.status, Some(relevant), today);

    // Un rechazado ya aparece en la vista de revisión; el feed de
    // vencimientos solo rastrea relojes de entrega y renovación.
    if requirement.status == RequirementStatus::Rechazado {
        return None;
    }

    Some(UrgencyEntry {
        document_type_name: candidate.document_type_name.clone(),
        employee_name: candidate.employee_name.clone(),
        relevant_date: relevant,
        urgency: classify_urgency(today, relevant),
        requirement,
    })
}

/// Arma el aviso de renovación para un candidato. Falla si el empleado no
/// tiene correo registrado o si el requisito no tiene reloj que notificar
/// (un aprobado cuyo tipo no vence).
pub fn prepare_notice(
    candidate: &FeedCandidate,
    today: NaiveDate,
) -> Result<RenewalNotice, AppError> {
    let email = candidate
        .employee_email
        .clone()
        .filter(|e| !e.is_empty())
        .ok_or(AppError::EmployeeEmailMissing)?;

    let entry = evaluate_candidate(candidate, today).ok_or(AppError::NoRenewalClock)?;

    Ok(RenewalNotice {
        requirement_id: entry.requirement.id,
        employee_id: entry.requirement.employee_id,
        employee_name: entry.employee_name,
        employee_email: email,
        document_type_name: entry.document_type_name,
        relevant_date: entry.relevant_date,
        urgency: entry.urgency,
    })
}

#[derive(Clone)]
pub struct UrgencyService {
    requirements_repo: RequirementsRepository,
}

impl UrgencyService {
    pub fn new(requirements_repo: RequirementsRepository) -> Self {
        Self { requirements_repo }
    }

    /// Requisitos que vencen dentro de `within_days`, opcionalmente
    /// filtrados a un solo nivel. Ordenados del más urgente al menos.
    pub async fn list_by_urgency<'e, E>(
        &self,
        executor: E,
        today: NaiveDate,
        within_days: i64,
        tier_filter: Option<UrgencyTier>,
    ) -> Result<Vec<UrgencyEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let candidates = self.requirements_repo.list_feed_candidates(executor).await?;

        let mut entries: Vec<UrgencyEntry> = candidates
            .iter()
            .filter_map(|c| evaluate_candidate(c, today))
            .filter(|entry| entry.urgency.days_until <= within_days)
            .filter(|entry| tier_filter.is_none_or(|tier| entry.urgency.tier == tier))
            .collect();

        entries.sort_by_key(|entry| entry.urgency.days_until);
        Ok(entries)
    }

    /// Vencidos, sin ventana: equivale a `list_by_urgency` con nivel
    /// `expired` y ventana ilimitada.
    pub async fn list_expired<'e, E>(
        &self,
        executor: E,
        today: NaiveDate,
    ) -> Result<Vec<UrgencyEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        self.list_by_urgency(executor, today, i64::MAX, Some(UrgencyTier::Expired))
            .await
    }

    /// Verificación previa al envío de un aviso de renovación individual.
    /// La falta de correo bloquea la operación: el llamador nunca debe
    /// "enviar" en silencio a nadie.
    pub async fn renewal_notice<'e, E>(
        &self,
        executor: E,
        requirement_id: Uuid,
        today: NaiveDate,
    ) -> Result<RenewalNotice, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let candidate = self
            .requirements_repo
            .get_feed_candidate(executor, requirement_id)
            .await?
            .ok_or(AppError::RequirementNotFound)?;

        prepare_notice(&candidate, today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    use crate::models::requirements::{Priority, RequiredDocument};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn candidate(
        status: RequirementStatus,
        due_date: NaiveDate,
        current_expiration: Option<NaiveDate>,
    ) -> FeedCandidate {
        let now = DateTime::<Utc>::MIN_UTC;
        FeedCandidate {
            requirement: RequiredDocument {
                id: Uuid::new_v4(),
                employee_id: Uuid::new_v4(),
                document_type_id: Uuid::new_v4(),
                priority: Priority::Normal,
                due_date,
                status,
                custom_renewal_period: None,
                custom_renewal_unit: None,
                notes: None,
                assigned_by: Uuid::new_v4(),
                assigned_at: now,
                updated_at: now,
            },
            document_type_name: "DPI".to_string(),
            employee_name: "Ana Pérez".to_string(),
            employee_email: Some("ana@example.com".to_string()),
            has_expiration: true,
            is_mandatory: true,
            current_expiration,
        }
    }

    #[test]
    fn approved_far_from_renewal_is_classified_ok() {
        let today = date(2024, 1, 10);
        let c = candidate(RequirementStatus::Aprobado, date(2024, 1, 1), Some(date(2025, 1, 1)));

        let entry = evaluate_candidate(&c, today).unwrap();
        assert_eq!(entry.urgency.tier, UrgencyTier::Ok);
        // ...y por lo tanto el filtro de ventana lo deja fuera del feed.
        assert!(entry.urgency.days_until > 30);
    }

    #[test]
    fn approved_without_expiration_never_appears() {
        let today = date(2024, 1, 10);
        let c = candidate(RequirementStatus::Aprobado, date(2020, 1, 1), None);
        assert!(evaluate_candidate(&c, today).is_none());
    }

    #[test]
    fn pending_mandatory_uses_the_due_date_as_clock() {
        let today = date(2024, 1, 10);
        let c = candidate(RequirementStatus::Pendiente, date(2024, 1, 20), None);

        let entry = evaluate_candidate(&c, today).unwrap();
        assert_eq!(entry.relevant_date, date(2024, 1, 20));
        assert_eq!(entry.urgency.tier, UrgencyTier::High);
        assert_eq!(entry.urgency.days_until, 10);
    }

    #[test]
    fn expired_requirements_surface_with_derived_vencido() {
        let today = date(2024, 8, 1);
        let c = candidate(RequirementStatus::Aprobado, date(2024, 1, 1), Some(date(2024, 7, 20)));

        let entry = evaluate_candidate(&c, today).unwrap();
        assert_eq!(entry.requirement.status, RequirementStatus::Vencido);
        assert_eq!(entry.urgency.tier, UrgencyTier::Expired);
        assert_eq!(entry.urgency.days_expired(), Some(12));
    }

    #[test]
    fn rejected_requirements_are_not_part_of_the_expiry_feed() {
        let today = date(2024, 8, 1);
        let c = candidate(RequirementStatus::Rechazado, date(2024, 1, 1), None);
        assert!(evaluate_candidate(&c, today).is_none());
    }

    #[test]
    fn notice_requires_a_registered_email() {
        let today = date(2024, 1, 10);

        let mut c = candidate(RequirementStatus::Pendiente, date(2024, 1, 20), None);
        c.employee_email = None;
        assert!(matches!(
            prepare_notice(&c, today),
            Err(AppError::EmployeeEmailMissing)
        ));

        // Un correo vacío cuenta como ausente.
        c.employee_email = Some(String::new());
        assert!(matches!(
            prepare_notice(&c, today),
            Err(AppError::EmployeeEmailMissing)
        ));
    }

    #[test]
    fn notice_for_a_requirement_without_clock_reports_the_right_reason() {
        // Aprobado cuyo tipo no vence: no hay nada que avisar, y el error
        // lo dice (no es un problema de archivo faltante).
        let today = date(2024, 1, 10);
        let c = candidate(RequirementStatus::Aprobado, date(2020, 1, 1), None);
        assert!(matches!(
            prepare_notice(&c, today),
            Err(AppError::NoRenewalClock)
        ));
    }

    #[test]
    fn notice_carries_the_relevant_date_and_urgency() {
        let today = date(2024, 1, 10);
        let c = candidate(RequirementStatus::Pendiente, date(2024, 1, 20), None);

        let notice = prepare_notice(&c, today).unwrap();
        assert_eq!(notice.employee_email, "ana@example.com");
        assert_eq!(notice.relevant_date, date(2024, 1, 20));
        assert_eq!(notice.urgency.tier, UrgencyTier::High);
    }
}
