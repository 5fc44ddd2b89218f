use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::{StreamExt, TryStreamExt};
use image::{ImageFormat, RgbImage};
use serde_json::json;
use shared::{AnalysisResponse, ClassificationDto, SegmentationDto};
use std::io::Cursor;
use std::path::PathBuf;
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::error::ApiError;
use crate::inference::{Models, decode_image};
use crate::pipeline::{Analysis, analyze};
use crate::report::ReportGenerator;

pub const REPORT_DOWNLOAD_NAME: &str = "TumorX_Medical_Report.pdf";

pub fn configure_routes(cfg: &mut web::ServiceConfig, static_dir: Option<PathBuf>) {
    cfg.service(web::resource("/api/health").route(web::get().to(health)))
        .service(web::resource("/api/tumors").route(web::get().to(tumor_catalog)))
        .service(web::resource("/api/analyze").route(web::post().to(handle_analyze)))
        .service(web::resource("/api/report").route(web::post().to(handle_report)));

    if let Some(dir) = static_dir {
        cfg.service(Files::new("/", dir).index_file("index.html"));
    }
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

async fn tumor_catalog(reports: web::Data<ReportGenerator>) -> HttpResponse {
    HttpResponse::Ok().json(reports.catalog())
}

/// Reads the first non-empty file field, enforcing the size limit while
/// streaming.
async fn read_upload(payload: &mut Multipart, max_bytes: usize) -> Result<Vec<u8>, ApiError> {
    while let Some(mut field) = payload.try_next().await? {
        let mut image_data = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk?;
            if image_data.len() + data.len() > max_bytes {
                return Err(ApiError::PayloadTooLarge(max_bytes));
            }
            image_data.extend_from_slice(&data);
        }
        if !image_data.is_empty() {
            return Ok(image_data);
        }
    }
    Err(ApiError::MissingImage)
}

/// Decode and both forward passes run on the blocking pool.
async fn run_pipeline(
    models: web::Data<Models>,
    upload: UploadConfig,
    mut payload: Multipart,
) -> Result<Analysis, ApiError> {
    let image_data = read_upload(&mut payload, upload.max_bytes).await?;
    log::info!("Received upload of {} bytes", image_data.len());

    let models = models.into_inner();
    let analysis = web::block(move || -> Result<Analysis, ApiError> {
        let image = decode_image(&image_data)?;
        Ok(analyze(&models, image)?)
    })
    .await??;
    Ok(analysis)
}

fn encode_png(image: &RgbImage) -> Result<String, ApiError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| ApiError::Encode(e.to_string()))?;
    Ok(STANDARD.encode(bytes))
}

fn to_response(analysis: &Analysis) -> Result<AnalysisResponse, ApiError> {
    let classification = &analysis.classification;
    let risk_tier = analysis.risk_tier();

    let segmentation = match &analysis.segmentation {
        Some(seg) => Some(SegmentationDto {
            overlay_png_base64: encode_png(&seg.composite)?,
            width: seg.composite.width(),
            height: seg.composite.height(),
            tumor_pixels: seg.tumor_pixels(),
            coverage: seg.coverage(),
        }),
        None => None,
    };

    Ok(AnalysisResponse {
        analysis_id: Uuid::new_v4(),
        classification: ClassificationDto {
            label: classification.class,
            confidence: classification.confidence.fraction(),
            confidence_pct: classification.confidence.percent(),
            probabilities: classification.class_probabilities(),
        },
        risk_tier,
        risk_assessment: risk_tier.describe(),
        segmentation,
        segmentation_warning: analysis
            .segmentation_error
            .as_ref()
            .map(|e| format!("Segmentation analysis unavailable: {e}")),
    })
}

async fn handle_analyze(
    models: web::Data<Models>,
    upload: web::Data<UploadConfig>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let analysis = run_pipeline(models, upload.get_ref().clone(), payload).await?;
    let response = to_response(&analysis)?;
    Ok(HttpResponse::Ok().json(response))
}

async fn handle_report(
    models: web::Data<Models>,
    upload: web::Data<UploadConfig>,
    reports: web::Data<ReportGenerator>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let analysis = run_pipeline(models, upload.get_ref().clone(), payload).await?;

    let reports = reports.into_inner();
    let report = web::block(move || reports.generate(&analysis.report_input())).await??;

    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{REPORT_DOWNLOAD_NAME}\""),
        ))
        .insert_header(("X-Report-Id", report.report_id.to_string()))
        .insert_header(("X-Report-Path", report.path.display().to_string()))
        .body(report.bytes))
}
