// src/services/catalog_service.rs
//
// Contratos CRUD del catálogo: tipos de documento y plantillas. La regla
// central es el invariante de renovación (vence => periodo > 0 y unidad
// presente), validado aquí además del CHECK de la base.

use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CatalogRepository,
    models::catalog::{DocumentType, RenewalUnit, TemplateItem, TemplateWithItems},
    models::requirements::Priority,
};

/// Campos de un tipo de documento tal como llegan de la API.
#[derive(Debug, Clone)]
pub struct DocumentTypeInput {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub is_mandatory: bool,
    pub has_expiration: bool,
    pub renewal_period: Option<i32>,
    pub renewal_unit: Option<RenewalUnit>,
    pub default_due_days: Option<i32>,
}

impl DocumentTypeInput {
    /// Invariante del catálogo: un tipo que vence exige cadencia completa y
    /// positiva; uno que no vence no lleva cadencia.
    fn check_renewal_invariant(&self) -> Result<(), AppError> {
        if self.has_expiration {
            match self.renewal_period {
                Some(period) if period > 0 => {}
                Some(period) => return Err(AppError::InvalidRenewalSpec(period)),
                None => return Err(AppError::InvalidRenewalSpec(0)),
            }
            if self.renewal_unit.is_none() {
                return Err(AppError::InvalidRenewalSpec(0));
            }
        }
        Ok(())
    }

    /// Normaliza la cadencia: si el tipo no vence, se descarta cualquier
    /// periodo/unidad que haya llegado en el payload.
    fn renewal_fields(&self) -> (Option<i32>, Option<RenewalUnit>) {
        if self.has_expiration {
            (self.renewal_period, self.renewal_unit)
        } else {
            (None, None)
        }
    }
}

/// Ítem de plantilla tal como llega de la API.
#[derive(Debug, Clone)]
pub struct TemplateItemInput {
    pub document_type_id: Uuid,
    pub priority: Priority,
    pub custom_renewal: Option<(i32, RenewalUnit)>,
}

#[derive(Clone)]
pub struct CatalogService {
    repo: CatalogRepository,
}

impl CatalogService {
    pub fn new(repo: CatalogRepository) -> Self {
        Self { repo }
    }

    pub async fn list_document_types<'e, E>(
        &self,
        executor: E,
        category: Option<&str>,
        active: Option<bool>,
    ) -> Result<Vec<DocumentType>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list_document_types(executor, category, active).await
    }

    pub async fn create_document_type<'e, E>(
        &self,
        executor: E,
        input: DocumentTypeInput,
    ) -> Result<DocumentType, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        input.check_renewal_invariant()?;
        let (period, unit) = input.renewal_fields();
        self.repo
            .create_document_type(
                executor,
                &input.name,
                &input.category,
                input.description.as_deref(),
                input.is_mandatory,
                input.has_expiration,
                period,
                unit,
                input.default_due_days,
            )
            .await
    }

    pub async fn update_document_type<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        input: DocumentTypeInput,
    ) -> Result<DocumentType, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        input.check_renewal_invariant()?;
        let (period, unit) = input.renewal_fields();
        self.repo
            .update_document_type(
                executor,
                id,
                &input.name,
                &input.category,
                input.description.as_deref(),
                input.is_mandatory,
                input.has_expiration,
                period,
                unit,
                input.default_due_days,
            )
            .await
    }

    pub async fn deactivate_document_type<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.deactivate_document_type(executor, id).await
    }

    pub async fn list_templates<'e, E>(
        &self,
        executor: E,
    ) -> Result<Vec<TemplateWithItems>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let templates = self.repo.list_templates(&mut *tx).await?;
        let mut result = Vec::with_capacity(templates.len());
        for template in templates {
            let items = self.repo.list_template_items(&mut *tx, template.id).await?;
            result.push(TemplateWithItems { template, items });
        }

        tx.commit().await?;
        Ok(result)
    }

    pub async fn create_template<'e, E>(
        &self,
        executor: E,
        name: &str,
        description: Option<&str>,
        category: &str,
        icon: Option<&str>,
        items: Vec<TemplateItemInput>,
    ) -> Result<TemplateWithItems, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let template = self
            .repo
            .create_template(&mut *tx, name, description, category, icon)
            .await?;
        let items = self.insert_items(&mut tx, template.id, items).await?;

        tx.commit().await?;
        Ok(TemplateWithItems { template, items })
    }

    /// Editar una plantilla reemplaza su lista de ítems completa. Las
    /// asignaciones ya hechas no se tocan: la expansión fue de solo lectura.
    pub async fn update_template<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        name: &str,
        description: Option<&str>,
        category: &str,
        icon: Option<&str>,
        items: Vec<TemplateItemInput>,
    ) -> Result<TemplateWithItems, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let template = self
            .repo
            .update_template(&mut *tx, id, name, description, category, icon)
            .await?;
        self.repo.delete_template_items(&mut *tx, id).await?;
        let items = self.insert_items(&mut tx, id, items).await?;

        tx.commit().await?;
        Ok(TemplateWithItems { template, items })
    }

    async fn insert_items(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        template_id: Uuid,
        items: Vec<TemplateItemInput>,
    ) -> Result<Vec<TemplateItem>, AppError> {
        let mut inserted = Vec::with_capacity(items.len());
        for item in items {
            // Un ítem debe referenciar un tipo existente del catálogo.
            self.repo
                .get_document_type(&mut **tx, item.document_type_id)
                .await?
                .ok_or(AppError::DocumentTypeNotFound)?;

            if let Some((period, _)) = item.custom_renewal {
                if period <= 0 {
                    return Err(AppError::InvalidRenewalSpec(period));
                }
            }

            let row = self
                .repo
                .insert_template_item(
                    &mut **tx,
                    template_id,
                    item.document_type_id,
                    item.priority,
                    item.custom_renewal,
                )
                .await?;
            inserted.push(row);
        }
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(has_expiration: bool, period: Option<i32>, unit: Option<RenewalUnit>) -> DocumentTypeInput {
        DocumentTypeInput {
            name: "DPI".to_string(),
            category: "identidad".to_string(),
            description: None,
            is_mandatory: true,
            has_expiration,
            renewal_period: period,
            renewal_unit: unit,
            default_due_days: None,
        }
    }

    #[test]
    fn expiring_type_requires_a_positive_full_renewal_spec() {
        assert!(input(true, Some(12), Some(RenewalUnit::Months)).check_renewal_invariant().is_ok());

        for bad in [
            input(true, Some(0), Some(RenewalUnit::Months)),
            input(true, Some(-1), Some(RenewalUnit::Months)),
            input(true, None, Some(RenewalUnit::Months)),
            input(true, Some(12), None),
        ] {
            assert!(matches!(
                bad.check_renewal_invariant(),
                Err(AppError::InvalidRenewalSpec(_))
            ));
        }
    }

    #[test]
    fn non_expiring_type_drops_any_stray_renewal_fields() {
        let stray = input(false, Some(12), Some(RenewalUnit::Months));
        assert!(stray.check_renewal_invariant().is_ok());
        assert_eq!(stray.renewal_fields(), (None, None));
    }
}
