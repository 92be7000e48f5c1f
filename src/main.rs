//src/main.rs

use axum::{
    Router,
    routing::{get, patch, post},
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaración de nuestros módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod models;
mod services;

use crate::config::AppState;

#[tokio::main]
async fn main() {
    // Inicializa el logger.
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() es correcto aquí: si la configuración falla, la aplicación
    // no debe arrancar.
    let app_state = AppState::new()
        .await
        .expect("Fallo al inicializar el estado de la aplicación.");

    // Corre las migraciones de SQLx al arrancar
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Fallo al correr las migraciones de la base de datos.");

    tracing::info!("✅ Migraciones de la base de datos ejecutadas con éxito!");

    // Catálogo: tipos de documento y plantillas (solo administradores)
    let catalog_routes = Router::new()
        .route(
            "/document-types",
            post(handlers::catalog::create_document_type)
                .get(handlers::catalog::list_document_types),
        )
        .route(
            "/document-types/{id}",
            axum::routing::put(handlers::catalog::update_document_type)
                .delete(handlers::catalog::deactivate_document_type),
        )
        .route(
            "/templates",
            post(handlers::catalog::create_template).get(handlers::catalog::list_templates),
        )
        .route(
            "/templates/{id}",
            axum::routing::put(handlers::catalog::update_template),
        );

    // Asignación y consulta por empleado
    let employee_routes = Router::new()
        .route(
            "/{employee_id}/requirements",
            post(handlers::requirements::assign_individual)
                .get(handlers::requirements::list_employee_requirements),
        )
        .route(
            "/{employee_id}/requirements/from-template",
            post(handlers::requirements::assign_from_template),
        );

    // Ciclo de vida de un requisito + feed de urgencia.
    // Las rutas fijas van antes que "/{id}" para que axum no las capture.
    let requirement_routes = Router::new()
        .route("/expiring", get(handlers::urgency::list_expiring))
        .route("/expired", get(handlers::urgency::list_expired))
        .route(
            "/{id}",
            patch(handlers::requirements::update_requirement)
                .delete(handlers::requirements::remove_requirement),
        )
        .route("/{id}/submit", post(handlers::requirements::submit_file))
        .route("/{id}/approve", post(handlers::requirements::approve_requirement))
        .route("/{id}/reject", post(handlers::requirements::reject_requirement))
        .route("/{id}/renewal-notice", get(handlers::urgency::renewal_notice));

    // Combina todo en el router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/catalog", catalog_routes)
        .nest("/api/employees", employee_routes)
        .nest("/api/requirements", requirement_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(app_state);

    // Inicia el servidor
    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Fallo al iniciar el listener TCP");
    tracing::info!("🚀 Servidor escuchando en {}", listener.local_addr().unwrap());
    axum::serve(listener, app)
        .await
        .expect("Error en el servidor Axum");
}
