pub mod builder;
pub mod catalog;
pub mod document;
pub mod render;
pub mod risk;
pub mod writer;

use std::path::PathBuf;

use crate::config::ReportConfig;
pub use builder::{ReportContext, ReportId, ReportInput, build_document, find_logo};
pub use catalog::{TumorCatalog, TumorInfo};
pub use document::{Block, Cell, ReportDocument};
pub use risk::assess_risk;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Tumor information catalog is invalid: {0}")]
    Catalog(String),
    #[error("PDF rendering failed: {0}")]
    Render(String),
    #[error("A report already exists at {0}")]
    AlreadyExists(PathBuf),
    #[error("Report I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
pub struct GeneratedReport {
    pub path: PathBuf,
    pub report_id: ReportId,
    pub pages: usize,
    pub bytes: Vec<u8>,
}

/// Assembles, renders and writes reports. Holds only startup-time data.
pub struct ReportGenerator {
    catalog: TumorCatalog,
    config: ReportConfig,
}

impl ReportGenerator {
    pub fn new(catalog: TumorCatalog, config: ReportConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &TumorCatalog {
        &self.catalog
    }

    pub fn generate(&self, input: &ReportInput<'_>) -> Result<GeneratedReport, ReportError> {
        let context = ReportContext::new(&self.config.system_name, &self.config.model_version)
            .with_logo(find_logo(&self.config.logo_candidates));
        let document = build_document(input, &context, &self.catalog);
        let (bytes, pages) = render::render_pdf(&document)?;

        let file_name = writer::report_file_name(&context.generated_at);
        let path = writer::write_report(&bytes, &self.config.output_dir, &file_name)?;
        log::info!(
            "Report {} written to {} ({} pages)",
            context.report_id,
            path.display(),
            pages
        );

        Ok(GeneratedReport {
            path,
            report_id: context.report_id,
            pages,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::Confidence;
    use image::{DynamicImage, GrayImage, Luma};
    use shared::TumorClass;

    fn generator(dir: &std::path::Path) -> ReportGenerator {
        let config = ReportConfig {
            output_dir: dir.to_path_buf(),
            logo_candidates: vec![dir.join("logo.png")],
            ..ReportConfig::default()
        };
        ReportGenerator::new(TumorCatalog::builtin().unwrap(), config)
    }

    #[test]
    fn test_generate_writes_pdf() {
        let tmp = tempfile::tempdir().unwrap();
        let scan = DynamicImage::ImageLuma8(GrayImage::from_pixel(512, 512, Luma([40])));
        let input = ReportInput::new(TumorClass::Glioma, Confidence::new(0.97)).original(&scan);

        let report = generator(tmp.path()).generate(&input).unwrap();

        assert!(report.path.exists());
        assert!(report.path.starts_with(tmp.path()));
        let name = report.path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("TumorX_Report_") && name.ends_with(".pdf"));
        assert_eq!(&report.bytes[0..4], b"%PDF");
        assert!(report.pages >= 3);
        assert!(report.report_id.as_str().starts_with("TX-"));
    }

    #[test]
    fn test_generate_for_unknown_label() {
        let tmp = tempfile::tempdir().unwrap();
        let input = ReportInput::with_label("unknownclass", Confidence::new(0.5));
        let report = generator(tmp.path()).generate(&input).unwrap();
        assert!(report.path.exists());
    }

    #[test]
    fn test_generate_with_logo() {
        let tmp = tempfile::tempdir().unwrap();
        image::RgbImage::from_pixel(20, 10, image::Rgb([0, 0, 0]))
            .save(tmp.path().join("logo.png"))
            .unwrap();
        let input = ReportInput::new(TumorClass::NoTumor, Confidence::new(0.9));
        assert!(generator(tmp.path()).generate(&input).is_ok());
    }
}
