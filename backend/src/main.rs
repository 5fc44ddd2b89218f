use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use std::env;

use tumorx::config::AppConfig;
use tumorx::inference::Models;
use tumorx::report::{ReportGenerator, TumorCatalog};
use tumorx::routes::configure_routes;

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    log::error!("{}: {}", context, err);
    std::io::Error::other(format!("{context}: {err}"))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = AppConfig::load().map_err(|e| startup_error("Invalid configuration", e))?;

    let models =
        Models::load(&config.models).map_err(|e| startup_error("Model loading failed", e))?;

    let catalog = match &config.tumor_info_path {
        Some(path) => {
            log::info!("Loading tumor information from {}", path.display());
            TumorCatalog::from_path(path)
        }
        None => TumorCatalog::builtin(),
    }
    .map_err(|e| startup_error("Tumor information unavailable", e))?;

    let reports = web::Data::new(ReportGenerator::new(catalog, config.report.clone()));
    let models = web::Data::new(models);
    let upload = web::Data::new(config.upload.clone());
    let static_dir = config.server.static_dir.clone();
    let bind_address = config.bind_address();

    log::info!(
        "Reports will be written to {}",
        config.report.output_dir.display()
    );
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .expose_headers(vec!["Content-Disposition", "X-Report-Id", "X-Report-Path"])
                    .max_age(3600),
            )
            .app_data(models.clone())
            .app_data(upload.clone())
            .app_data(reports.clone())
            .configure(|cfg| configure_routes(cfg, static_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
