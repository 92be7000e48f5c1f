// src/db/requirements_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::catalog::RenewalUnit,
    models::requirements::{
        DocumentStatus, EmployeeDocument, FeedCandidate, Priority, RequiredDocument,
        RequirementStatus,
    },
};

#[derive(Clone)]
pub struct RequirementsRepository {
    pool: PgPool,
}

impl RequirementsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Requisitos
    // ---

    /// Inserta un requisito respetando el índice único
    /// (employee_id, document_type_id). Devuelve None si el par ya existe:
    /// dos asignaciones concurrentes nunca crean dos filas, la perdedora
    /// simplemente no inserta nada.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_requirement<'e, E>(
        &self,
        executor: E,
        employee_id: Uuid,
        document_type_id: Uuid,
        priority: Priority,
        due_date: NaiveDate,
        custom_renewal: Option<(i32, RenewalUnit)>,
        assigned_by: Uuid,
    ) -> Result<Option<RequiredDocument>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let requirement = sqlx::query_as::<_, RequiredDocument>(
            r#"
            INSERT INTO required_documents
                (employee_id, document_type_id, priority, due_date,
                 custom_renewal_period, custom_renewal_unit, assigned_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (employee_id, document_type_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(employee_id)
        .bind(document_type_id)
        .bind(priority)
        .bind(due_date)
        .bind(custom_renewal.map(|(p, _)| p))
        .bind(custom_renewal.map(|(_, u)| u))
        .bind(assigned_by)
        .fetch_optional(executor)
        .await?;
        Ok(requirement)
    }

    /// IDs de tipo ya asignados a un empleado (para planear la expansión).
    pub async fn assigned_type_ids<'e, E>(
        &self,
        executor: E,
        employee_id: Uuid,
    ) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT document_type_id FROM required_documents WHERE employee_id = $1",
        )
        .bind(employee_id)
        .fetch_all(executor)
        .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    pub async fn get_requirement<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<RequiredDocument>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let requirement =
            sqlx::query_as::<_, RequiredDocument>("SELECT * FROM required_documents WHERE id = $1")
                .bind(id)
                .fetch_optional(executor)
                .await?;
        Ok(requirement)
    }

    /// Variante con bloqueo de fila, para la resubida (el incremento de
    /// versión debe ser atómico frente a otra resubida concurrente).
    pub async fn get_requirement_for_update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<RequiredDocument>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let requirement = sqlx::query_as::<_, RequiredDocument>(
            "SELECT * FROM required_documents WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(requirement)
    }

    // El filtro por estado no vive aquí: el servicio deriva `vencido` en
    // lectura y filtra sobre el estado efectivo, no el almacenado.
    pub async fn list_for_employee<'e, E>(
        &self,
        executor: E,
        employee_id: Uuid,
        priority: Option<Priority>,
    ) -> Result<Vec<RequiredDocument>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let requirements = sqlx::query_as::<_, RequiredDocument>(
            r#"
            SELECT * FROM required_documents
            WHERE employee_id = $1
              AND ($2::priority IS NULL OR priority = $2)
            ORDER BY due_date ASC, priority DESC
            "#,
        )
        .bind(employee_id)
        .bind(priority)
        .fetch_all(executor)
        .await?;
        Ok(requirements)
    }

    /// Actualización "compare-and-set" del estado: solo transiciona si el
    /// estado sigue siendo `expected` al momento del commit. Devuelve las
    /// filas afectadas (0 = otra transición ganó la carrera).
    pub async fn set_status_if<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        expected: RequirementStatus,
        new_status: RequirementStatus,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE required_documents SET status = $3, updated_at = now() WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(expected)
        .bind(new_status)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn set_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        new_status: RequirementStatus,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE required_documents SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(new_status)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Anexa una línea a la bitácora de notas del requisito (solo append).
    pub async fn append_note<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        note: &str,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE required_documents
            SET notes = COALESCE(notes || E'\n', '') || $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(note)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// PATCH administrativo: fecha límite y prioridad. Nunca toca el estado.
    pub async fn update_details<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        due_date: Option<NaiveDate>,
        priority: Option<Priority>,
    ) -> Result<RequiredDocument, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, RequiredDocument>(
            r#"
            UPDATE required_documents SET
                due_date = COALESCE($2, due_date),
                priority = COALESCE($3, priority),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(due_date)
        .bind(priority)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::RequirementNotFound)
    }

    /// Borrado administrativo definitivo: el historial de versiones cae por
    /// el ON DELETE CASCADE de la migración.
    pub async fn delete_requirement<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM required_documents WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::RequirementNotFound);
        }
        Ok(())
    }

    // ---
    // Versiones de archivo (employee_documents)
    // ---

    /// La versión vigente es la de número más alto.
    pub async fn get_current_document<'e, E>(
        &self,
        executor: E,
        requirement_id: Uuid,
    ) -> Result<Option<EmployeeDocument>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let document = sqlx::query_as::<_, EmployeeDocument>(
            r#"
            SELECT * FROM employee_documents
            WHERE requirement_id = $1
            ORDER BY version DESC
            LIMIT 1
            "#,
        )
        .bind(requirement_id)
        .fetch_optional(executor)
        .await?;
        Ok(document)
    }

    pub async fn list_document_versions<'e, E>(
        &self,
        executor: E,
        requirement_id: Uuid,
    ) -> Result<Vec<EmployeeDocument>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let documents = sqlx::query_as::<_, EmployeeDocument>(
            "SELECT * FROM employee_documents WHERE requirement_id = $1 ORDER BY version ASC",
        )
        .bind(requirement_id)
        .fetch_all(executor)
        .await?;
        Ok(documents)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_document_version<'e, E>(
        &self,
        executor: E,
        requirement_id: Uuid,
        employee_id: Uuid,
        document_type_id: Uuid,
        version: i32,
        file_name: &str,
        file_path: &str,
        file_size: i64,
        mime_type: &str,
        upload_date: NaiveDate,
        uploaded_by: Uuid,
    ) -> Result<EmployeeDocument, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let document = sqlx::query_as::<_, EmployeeDocument>(
            r#"
            INSERT INTO employee_documents
                (requirement_id, employee_id, document_type_id, version,
                 file_name, file_path, file_size, mime_type, upload_date, uploaded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(requirement_id)
        .bind(employee_id)
        .bind(document_type_id)
        .bind(version)
        .bind(file_name)
        .bind(file_path)
        .bind(file_size)
        .bind(mime_type)
        .bind(upload_date)
        .bind(uploaded_by)
        .fetch_one(executor)
        .await?;
        Ok(document)
    }

    pub async fn resolve_document<'e, E>(
        &self,
        executor: E,
        document_id: Uuid,
        status: DocumentStatus,
        approval_notes: Option<&str>,
        approved_by: Uuid,
        expiration_date: Option<NaiveDate>,
    ) -> Result<EmployeeDocument, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, EmployeeDocument>(
            r#"
            UPDATE employee_documents SET
                status = $2, approval_notes = $3, approved_by = $4,
                approved_at = now(), expiration_date = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(document_id)
        .bind(status)
        .bind(approval_notes)
        .bind(approved_by)
        .bind(expiration_date)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::SubmissionNotFound)
    }

    // ---
    // Feed de urgencia
    // ---

    /// Candidatos del feed: todo requisito cuyo tipo vence, más los
    /// obligatorios aún sin aprobar (su reloj es la fecha límite). La
    /// clasificación final contra el "hoy" inyectado ocurre en el servicio.
    pub async fn list_feed_candidates<'e, E>(
        &self,
        executor: E,
    ) -> Result<Vec<FeedCandidate>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let candidates = sqlx::query_as::<_, FeedCandidate>(
            r#"
            SELECT r.*,
                   dt.name            AS document_type_name,
                   e.full_name        AS employee_name,
                   e.email            AS employee_email,
                   dt.has_expiration,
                   dt.is_mandatory,
                   cur.expiration_date AS current_expiration
            FROM required_documents r
            JOIN document_types dt ON dt.id = r.document_type_id
            JOIN employees e       ON e.id = r.employee_id
            LEFT JOIN LATERAL (
                SELECT ed.expiration_date
                FROM employee_documents ed
                WHERE ed.requirement_id = r.id
                ORDER BY ed.version DESC
                LIMIT 1
            ) cur ON true
            WHERE e.is_active
              AND (dt.has_expiration OR (dt.is_mandatory AND r.status <> 'aprobado'))
            "#,
        )
        .fetch_all(executor)
        .await?;
        Ok(candidates)
    }

    /// Un único candidato, para la verificación previa al aviso de renovación.
    pub async fn get_feed_candidate<'e, E>(
        &self,
        executor: E,
        requirement_id: Uuid,
    ) -> Result<Option<FeedCandidate>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let candidate = sqlx::query_as::<_, FeedCandidate>(
            r#"
            SELECT r.*,
                   dt.name            AS document_type_name,
                   e.full_name        AS employee_name,
                   e.email            AS employee_email,
                   dt.has_expiration,
                   dt.is_mandatory,
                   cur.expiration_date AS current_expiration
            FROM required_documents r
            JOIN document_types dt ON dt.id = r.document_type_id
            JOIN employees e       ON e.id = r.employee_id
            LEFT JOIN LATERAL (
                SELECT ed.expiration_date
                FROM employee_documents ed
                WHERE ed.requirement_id = r.id
                ORDER BY ed.version DESC
                LIMIT 1
            ) cur ON true
            WHERE r.id = $1
            "#,
        )
        .bind(requirement_id)
        .fetch_optional(executor)
        .await?;
        Ok(candidate)
    }
}
