// src/db/catalog_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::catalog::{DocumentType, Employee, RenewalUnit, Template, TemplateItem},
    models::requirements::Priority,
};

#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Tipos de Documento
    // ---

    pub async fn list_document_types<'e, E>(
        &self,
        executor: E,
        category: Option<&str>,
        active: Option<bool>,
    ) -> Result<Vec<DocumentType>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let types = sqlx::query_as::<_, DocumentType>(
            r#"
            SELECT * FROM document_types
            WHERE ($1::text IS NULL OR category = $1)
              AND ($2::boolean IS NULL OR is_active = $2)
            ORDER BY name ASC
            "#,
        )
        .bind(category)
        .bind(active)
        .fetch_all(executor)
        .await?;
        Ok(types)
    }

    pub async fn get_document_type<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<DocumentType>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let doc_type = sqlx::query_as::<_, DocumentType>("SELECT * FROM document_types WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(doc_type)
    }

    pub async fn get_document_types_by_ids<'e, E>(
        &self,
        executor: E,
        ids: &[Uuid],
    ) -> Result<Vec<DocumentType>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let types =
            sqlx::query_as::<_, DocumentType>("SELECT * FROM document_types WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(executor)
                .await?;
        Ok(types)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_document_type<'e, E>(
        &self,
        executor: E,
        name: &str,
        category: &str,
        description: Option<&str>,
        is_mandatory: bool,
        has_expiration: bool,
        renewal_period: Option<i32>,
        renewal_unit: Option<RenewalUnit>,
        default_due_days: Option<i32>,
    ) -> Result<DocumentType, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, DocumentType>(
            r#"
            INSERT INTO document_types
                (name, category, description, is_mandatory, has_expiration,
                 renewal_period, renewal_unit, default_due_days)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(category)
        .bind(description)
        .bind(is_mandatory)
        .bind(has_expiration)
        .bind(renewal_period)
        .bind(renewal_unit)
        .bind(default_due_days)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::DocumentTypeNameTaken(name.to_string());
                }
            }
            e.into()
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update_document_type<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        name: &str,
        category: &str,
        description: Option<&str>,
        is_mandatory: bool,
        has_expiration: bool,
        renewal_period: Option<i32>,
        renewal_unit: Option<RenewalUnit>,
        default_due_days: Option<i32>,
    ) -> Result<DocumentType, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, DocumentType>(
            r#"
            UPDATE document_types SET
                name = $2, category = $3, description = $4, is_mandatory = $5,
                has_expiration = $6, renewal_period = $7, renewal_unit = $8,
                default_due_days = $9, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(category)
        .bind(description)
        .bind(is_mandatory)
        .bind(has_expiration)
        .bind(renewal_period)
        .bind(renewal_unit)
        .bind(default_due_days)
        .fetch_optional(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::DocumentTypeNameTaken(name.to_string());
                }
            }
            AppError::from(e)
        })?
        .ok_or(AppError::DocumentTypeNotFound)
    }

    /// Borrado lógico: los tipos nunca se eliminan físicamente porque los
    /// requisitos existentes los referencian.
    pub async fn deactivate_document_type<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result =
            sqlx::query("UPDATE document_types SET is_active = false, updated_at = now() WHERE id = $1")
                .bind(id)
                .execute(executor)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::DocumentTypeNotFound);
        }
        Ok(())
    }

    // ---
    // Plantillas
    // ---

    pub async fn list_templates<'e, E>(&self, executor: E) -> Result<Vec<Template>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let templates = sqlx::query_as::<_, Template>("SELECT * FROM templates ORDER BY name ASC")
            .fetch_all(executor)
            .await?;
        Ok(templates)
    }

    pub async fn get_template<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<Template>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let template = sqlx::query_as::<_, Template>("SELECT * FROM templates WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(template)
    }

    pub async fn list_template_items<'e, E>(
        &self,
        executor: E,
        template_id: Uuid,
    ) -> Result<Vec<TemplateItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, TemplateItem>(
            "SELECT * FROM template_items WHERE template_id = $1",
        )
        .bind(template_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    pub async fn create_template<'e, E>(
        &self,
        executor: E,
        name: &str,
        description: Option<&str>,
        category: &str,
        icon: Option<&str>,
    ) -> Result<Template, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let template = sqlx::query_as::<_, Template>(
            r#"
            INSERT INTO templates (name, description, category, icon)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(category)
        .bind(icon)
        .fetch_one(executor)
        .await?;
        Ok(template)
    }

    pub async fn update_template<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        name: &str,
        description: Option<&str>,
        category: &str,
        icon: Option<&str>,
    ) -> Result<Template, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Template>(
            r#"
            UPDATE templates SET
                name = $2, description = $3, category = $4, icon = $5, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(category)
        .bind(icon)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::TemplateNotFound)
    }

    pub async fn insert_template_item<'e, E>(
        &self,
        executor: E,
        template_id: Uuid,
        document_type_id: Uuid,
        priority: Priority,
        custom_renewal: Option<(i32, RenewalUnit)>,
    ) -> Result<TemplateItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, TemplateItem>(
            r#"
            INSERT INTO template_items
                (template_id, document_type_id, priority, has_custom_renewal,
                 custom_renewal_period, custom_renewal_unit)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(template_id)
        .bind(document_type_id)
        .bind(priority)
        .bind(custom_renewal.is_some())
        .bind(custom_renewal.map(|(p, _)| p))
        .bind(custom_renewal.map(|(_, u)| u))
        .fetch_one(executor)
        .await?;
        Ok(item)
    }

    /// Reemplaza los ítems al editar una plantilla (se llama dentro de la
    /// misma transacción que `update_template`).
    pub async fn delete_template_items<'e, E>(
        &self,
        executor: E,
        template_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM template_items WHERE template_id = $1")
            .bind(template_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    // ---
    // Empleados (datos maestros, solo lectura)
    // ---

    pub async fn get_employee<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<Employee>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let employee = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(employee)
    }
}
