// src/services/assignment.rs
//
// Motor de asignación de requisitos: expande una lista explícita de tipos
// o una plantilla en filas de `required_documents` para un empleado. La
// planificación es pura (testeable sin base de datos); la persistencia usa
// INSERT ... ON CONFLICT dentro de una transacción para que dos llamadas
// concurrentes nunca dupliquen el par (empleado, tipo).

use std::collections::{HashMap, HashSet};

use chrono::{Days, NaiveDate};
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CatalogRepository, RequirementsRepository},
    models::{
        catalog::{DocumentType, RenewalUnit, TemplateItem},
        requirements::{AssignmentReport, Priority, SkipReason, SkippedAssignment},
    },
    services::renewal::resolve_effective_renewal,
};

/// Un ítem de la asignación individual, ya validado por el handler.
#[derive(Debug, Clone)]
pub struct IndividualItem {
    pub document_type_id: Uuid,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
}

/// Requisito planificado, todavía sin persistir.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRequirement {
    pub document_type_id: Uuid,
    pub priority: Priority,
    pub due_date: NaiveDate,
    pub custom_renewal: Option<(i32, RenewalUnit)>,
}

#[derive(Debug, Clone, Default)]
pub struct AssignmentPlan {
    pub to_create: Vec<PlannedRequirement>,
    pub skipped: Vec<SkippedAssignment>,
}

fn default_due(today: NaiveDate, days: u32) -> NaiveDate {
    today.checked_add_days(Days::new(days as u64)).unwrap_or(today)
}

/// Planifica una asignación individual. Los duplicados (ya asignados o
/// repetidos dentro del propio lote) se reportan como omitidos, nunca
/// abortan el lote completo.
pub fn plan_individual(
    items: &[IndividualItem],
    catalog: &HashMap<Uuid, DocumentType>,
    already_assigned: &HashSet<Uuid>,
    today: NaiveDate,
    global_due_days: u32,
) -> AssignmentPlan {
    let mut plan = AssignmentPlan::default();
    let mut seen: HashSet<Uuid> = HashSet::new();

    for item in items {
        let skip = |reason| SkippedAssignment {
            document_type_id: item.document_type_id,
            reason,
        };

        let Some(doc_type) = catalog.get(&item.document_type_id) else {
            plan.skipped.push(skip(SkipReason::DocumentTypeNotFound));
            continue;
        };
        if !doc_type.is_active {
            plan.skipped.push(skip(SkipReason::DocumentTypeInactive));
            continue;
        }
        if already_assigned.contains(&item.document_type_id) || !seen.insert(item.document_type_id)
        {
            plan.skipped.push(skip(SkipReason::AlreadyAssigned));
            continue;
        }

        let due_date = item.due_date.unwrap_or_else(|| {
            let lead = doc_type.default_due_days.map(|d| d as u32).unwrap_or(global_due_days);
            default_due(today, lead)
        });

        plan.to_create.push(PlannedRequirement {
            document_type_id: item.document_type_id,
            priority: item.priority,
            due_date,
            custom_renewal: None,
        });
    }

    plan
}

/// Planifica la expansión de una plantilla. Reaplicarla es idempotente:
/// solo rellena los tipos que faltan, jamás duplica ni pisa prioridad o
/// fecha de un requisito existente. Un ítem que referencia un tipo
/// desactivado o borrado se omite y se reporta, sin abortar la expansión.
pub fn plan_from_template(
    items: &[TemplateItem],
    catalog: &HashMap<Uuid, DocumentType>,
    already_assigned: &HashSet<Uuid>,
    today: NaiveDate,
    global_due_days: u32,
    override_due_date: Option<NaiveDate>,
) -> AssignmentPlan {
    let mut plan = AssignmentPlan::default();
    let mut seen: HashSet<Uuid> = HashSet::new();

    for item in items {
        let skip = |reason| SkippedAssignment {
            document_type_id: item.document_type_id,
            reason,
        };

        let Some(doc_type) = catalog.get(&item.document_type_id) else {
            plan.skipped.push(skip(SkipReason::DocumentTypeNotFound));
            continue;
        };
        if !doc_type.is_active {
            plan.skipped.push(skip(SkipReason::DocumentTypeInactive));
            continue;
        }
        if already_assigned.contains(&item.document_type_id) || !seen.insert(item.document_type_id)
        {
            plan.skipped.push(skip(SkipReason::AlreadyAssigned));
            continue;
        }

        // Precedencia de fecha: override de la llamada > plazo del tipo >
        // plazo global.
        let due_date = override_due_date.unwrap_or_else(|| {
            let lead = doc_type.default_due_days.map(|d| d as u32).unwrap_or(global_due_days);
            default_due(today, lead)
        });

        // La renovación efectiva se resuelve una sola vez, al asignar, y el
        // override del ítem queda capturado en el requisito.
        let custom_renewal = if item.has_custom_renewal {
            resolve_effective_renewal(item, doc_type).map(|r| (r.period, r.unit))
        } else {
            None
        };

        plan.to_create.push(PlannedRequirement {
            document_type_id: item.document_type_id,
            priority: item.priority,
            due_date,
            custom_renewal,
        });
    }

    plan
}

#[derive(Clone)]
pub struct AssignmentService {
    catalog_repo: CatalogRepository,
    requirements_repo: RequirementsRepository,
    /// Plazo global de entrega (días) cuando ni el ítem ni el tipo traen uno.
    global_due_days: u32,
}

impl AssignmentService {
    pub fn new(
        catalog_repo: CatalogRepository,
        requirements_repo: RequirementsRepository,
        global_due_days: u32,
    ) -> Self {
        Self {
            catalog_repo,
            requirements_repo,
            global_due_days,
        }
    }

    pub async fn assign_individual<'e, E>(
        &self,
        executor: E,
        employee_id: Uuid,
        items: Vec<IndividualItem>,
        assigned_by: Uuid,
        today: NaiveDate,
    ) -> Result<AssignmentReport, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        self.catalog_repo
            .get_employee(&mut *tx, employee_id)
            .await?
            .ok_or(AppError::EmployeeNotFound)?;

        let type_ids: Vec<Uuid> = items.iter().map(|i| i.document_type_id).collect();
        let catalog = self.load_catalog(&mut *tx, &type_ids).await?;
        let assigned = self.load_assigned(&mut *tx, employee_id).await?;

        let plan = plan_individual(&items, &catalog, &assigned, today, self.global_due_days);
        let report = self.persist_plan(&mut tx, employee_id, plan, assigned_by).await?;

        tx.commit().await?;
        Ok(report)
    }

    pub async fn assign_from_template<'e, E>(
        &self,
        executor: E,
        employee_id: Uuid,
        template_id: Uuid,
        override_due_date: Option<NaiveDate>,
        assigned_by: Uuid,
        today: NaiveDate,
    ) -> Result<AssignmentReport, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        self.catalog_repo
            .get_employee(&mut *tx, employee_id)
            .await?
            .ok_or(AppError::EmployeeNotFound)?;

        self.catalog_repo
            .get_template(&mut *tx, template_id)
            .await?
            .ok_or(AppError::TemplateNotFound)?;

        let items = self.catalog_repo.list_template_items(&mut *tx, template_id).await?;
        let type_ids: Vec<Uuid> = items.iter().map(|i| i.document_type_id).collect();
        let catalog = self.load_catalog(&mut *tx, &type_ids).await?;
        let assigned = self.load_assigned(&mut *tx, employee_id).await?;

        let plan = plan_from_template(
            &items,
            &catalog,
            &assigned,
            today,
            self.global_due_days,
            override_due_date,
        );
        let report = self.persist_plan(&mut tx, employee_id, plan, assigned_by).await?;

        tx.commit().await?;
        Ok(report)
    }

    async fn load_catalog<'e, E>(
        &self,
        executor: E,
        type_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, DocumentType>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let types = self.catalog_repo.get_document_types_by_ids(executor, type_ids).await?;
        Ok(types.into_iter().map(|t| (t.id, t)).collect())
    }

    async fn load_assigned<'e, E>(
        &self,
        executor: E,
        employee_id: Uuid,
    ) -> Result<HashSet<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = self.requirements_repo.assigned_type_ids(executor, employee_id).await?;
        Ok(ids.into_iter().collect())
    }

    /// Inserta el plan. Si el índice único rechaza una fila (una asignación
    /// concurrente ganó entre la lectura y el insert), el ítem pasa al
    /// reporte como omitido en lugar de fallar el lote.
    async fn persist_plan(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        employee_id: Uuid,
        plan: AssignmentPlan,
        assigned_by: Uuid,
    ) -> Result<AssignmentReport, AppError> {
        let mut report = AssignmentReport {
            assigned: Vec::with_capacity(plan.to_create.len()),
            skipped: plan.skipped,
        };

        for planned in plan.to_create {
            let inserted = self
                .requirements_repo
                .insert_requirement(
                    &mut **tx,
                    employee_id,
                    planned.document_type_id,
                    planned.priority,
                    planned.due_date,
                    planned.custom_renewal,
                    assigned_by,
                )
                .await?;

            match inserted {
                Some(requirement) => report.assigned.push(requirement),
                None => report.skipped.push(SkippedAssignment {
                    document_type_id: planned.document_type_id,
                    reason: SkipReason::AlreadyAssigned,
                }),
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn doc_type(active: bool, default_due_days: Option<i32>) -> DocumentType {
        let now = DateTime::<Utc>::MIN_UTC;
        DocumentType {
            id: Uuid::new_v4(),
            name: format!("tipo-{}", Uuid::new_v4()),
            category: "identidad".to_string(),
            description: None,
            is_mandatory: true,
            has_expiration: true,
            renewal_period: Some(12),
            renewal_unit: Some(RenewalUnit::Months),
            default_due_days,
            is_active: active,
            created_at: now,
            updated_at: now,
        }
    }

    fn item(type_id: Uuid, priority: Priority) -> IndividualItem {
        IndividualItem {
            document_type_id: type_id,
            priority,
            due_date: None,
        }
    }

    fn template_item(type_id: Uuid, custom: Option<(i32, RenewalUnit)>) -> TemplateItem {
        TemplateItem {
            id: Uuid::new_v4(),
            template_id: Uuid::new_v4(),
            document_type_id: type_id,
            priority: Priority::Urgente,
            has_custom_renewal: custom.is_some(),
            custom_renewal_period: custom.map(|(p, _)| p),
            custom_renewal_unit: custom.map(|(_, u)| u),
        }
    }

    fn catalog_of(types: &[&DocumentType]) -> HashMap<Uuid, DocumentType> {
        types.iter().map(|t| (t.id, (*t).clone())).collect()
    }

    #[test]
    fn individual_defaults_due_date_from_type_then_global() {
        let today = date(2024, 5, 1);
        let with_lead = doc_type(true, Some(14));
        let without_lead = doc_type(true, None);
        let catalog = catalog_of(&[&with_lead, &without_lead]);

        let plan = plan_individual(
            &[item(with_lead.id, Priority::Normal), item(without_lead.id, Priority::Alta)],
            &catalog,
            &HashSet::new(),
            today,
            7,
        );

        assert_eq!(plan.to_create.len(), 2);
        assert_eq!(plan.to_create[0].due_date, date(2024, 5, 15));
        assert_eq!(plan.to_create[1].due_date, date(2024, 5, 8));
        assert!(plan.skipped.is_empty());
    }

    #[test]
    fn already_assigned_types_are_skipped_not_errors() {
        let today = date(2024, 5, 1);
        let dt = doc_type(true, None);
        let catalog = catalog_of(&[&dt]);
        let assigned: HashSet<Uuid> = [dt.id].into();

        let plan = plan_individual(&[item(dt.id, Priority::Normal)], &catalog, &assigned, today, 7);

        assert!(plan.to_create.is_empty());
        assert_eq!(
            plan.skipped,
            vec![SkippedAssignment {
                document_type_id: dt.id,
                reason: SkipReason::AlreadyAssigned
            }]
        );
    }

    #[test]
    fn duplicates_within_the_batch_are_skipped() {
        let today = date(2024, 5, 1);
        let dt = doc_type(true, None);
        let catalog = catalog_of(&[&dt]);

        let plan = plan_individual(
            &[item(dt.id, Priority::Normal), item(dt.id, Priority::Urgente)],
            &catalog,
            &HashSet::new(),
            today,
            7,
        );

        assert_eq!(plan.to_create.len(), 1);
        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.skipped[0].reason, SkipReason::AlreadyAssigned);
    }

    #[test]
    fn unknown_and_inactive_types_are_reported_per_item() {
        let today = date(2024, 5, 1);
        let inactive = doc_type(false, None);
        let catalog = catalog_of(&[&inactive]);
        let ghost = Uuid::new_v4();

        let plan = plan_individual(
            &[item(ghost, Priority::Baja), item(inactive.id, Priority::Baja)],
            &catalog,
            &HashSet::new(),
            today,
            7,
        );

        assert!(plan.to_create.is_empty());
        assert_eq!(plan.skipped[0].reason, SkipReason::DocumentTypeNotFound);
        assert_eq!(plan.skipped[1].reason, SkipReason::DocumentTypeInactive);
    }

    #[test]
    fn template_expansion_captures_the_renewal_override() {
        let today = date(2024, 1, 15);
        let dt = doc_type(true, None);
        let catalog = catalog_of(&[&dt]);
        let items = vec![template_item(dt.id, Some((6, RenewalUnit::Months)))];

        let plan = plan_from_template(&items, &catalog, &HashSet::new(), today, 7, None);

        assert_eq!(plan.to_create.len(), 1);
        let planned = &plan.to_create[0];
        assert_eq!(planned.priority, Priority::Urgente);
        assert_eq!(planned.custom_renewal, Some((6, RenewalUnit::Months)));
    }

    #[test]
    fn template_without_override_follows_the_type_default_at_approval() {
        // Sin override el requisito no captura cadencia propia: al aprobar
        // regirá el default vigente del tipo.
        let today = date(2024, 1, 15);
        let dt = doc_type(true, None);
        let catalog = catalog_of(&[&dt]);
        let items = vec![template_item(dt.id, None)];

        let plan = plan_from_template(&items, &catalog, &HashSet::new(), today, 7, None);
        assert_eq!(plan.to_create[0].custom_renewal, None);
    }

    #[test]
    fn reapplying_a_template_only_fills_the_gaps() {
        let today = date(2024, 1, 15);
        let a = doc_type(true, None);
        let b = doc_type(true, None);
        let catalog = catalog_of(&[&a, &b]);
        let items = vec![template_item(a.id, None), template_item(b.id, None)];

        // Primera aplicación: crea ambos.
        let first = plan_from_template(&items, &catalog, &HashSet::new(), today, 7, None);
        assert_eq!(first.to_create.len(), 2);

        // Segunda aplicación con `a` ya asignado: solo crea `b`... y una
        // tercera con ambos asignados no crea nada.
        let assigned: HashSet<Uuid> = [a.id].into();
        let second = plan_from_template(&items, &catalog, &assigned, today, 7, None);
        assert_eq!(second.to_create.len(), 1);
        assert_eq!(second.to_create[0].document_type_id, b.id);
        assert_eq!(second.skipped[0].reason, SkipReason::AlreadyAssigned);

        let assigned: HashSet<Uuid> = [a.id, b.id].into();
        let third = plan_from_template(&items, &catalog, &assigned, today, 7, None);
        assert!(third.to_create.is_empty());
        assert_eq!(third.skipped.len(), 2);
    }

    #[test]
    fn template_override_due_date_wins_over_leads() {
        let today = date(2024, 1, 15);
        let dt = doc_type(true, Some(30));
        let catalog = catalog_of(&[&dt]);
        let items = vec![template_item(dt.id, None)];

        let forced = date(2024, 2, 1);
        let plan = plan_from_template(&items, &catalog, &HashSet::new(), today, 7, Some(forced));
        assert_eq!(plan.to_create[0].due_date, forced);
    }
}
