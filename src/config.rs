// src/config.rs

use crate::{
    db::{CatalogRepository, RequirementsRepository},
    services::{
        assignment::AssignmentService, catalog_service::CatalogService,
        lifecycle::LifecycleService, urgency::UrgencyService,
    },
};
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{env, time::Duration};

// Plazo de entrega global (días) cuando ni el ítem ni el tipo definen uno.
const DEFAULT_DUE_DAYS: u32 = 7;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub catalog_service: CatalogService,
    pub assignment_service: AssignmentService,
    pub lifecycle_service: LifecycleService,
    pub urgency_service: UrgencyService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL debe estar definida");
        let due_days = env::var("DEFAULT_DUE_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_DUE_DAYS);

        // Conecta a la base de datos, usando '?' para propagar errores
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexión con la base de datos establecida con éxito!");

        // --- Arma el grafo de dependencias ---
        let catalog_repo = CatalogRepository::new(db_pool.clone());
        let requirements_repo = RequirementsRepository::new(db_pool.clone());

        let catalog_service = CatalogService::new(catalog_repo.clone());
        let assignment_service =
            AssignmentService::new(catalog_repo.clone(), requirements_repo.clone(), due_days);
        let lifecycle_service = LifecycleService::new(catalog_repo, requirements_repo.clone());
        let urgency_service = UrgencyService::new(requirements_repo);

        Ok(Self {
            db_pool,
            catalog_service,
            assignment_service,
            lifecycle_service,
            urgency_service,
        })
    }
}
