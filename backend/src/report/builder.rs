use chrono::{DateTime, Local};
use image::{DynamicImage, RgbImage};
use rand::Rng;
use std::fmt;
use std::path::PathBuf;

use super::catalog::TumorCatalog;
use super::document::{Block, Cell, ReportDocument};
use super::risk::assess_risk;
use crate::inference::Confidence;
use shared::TumorClass;

pub const REPORT_TITLE: &str = "AI-Powered Brain Tumor Detection & Analysis";
/// Longest edge of images embedded in the report.
const MAX_EMBED_EDGE: u32 = 1024;

const DISCLAIMERS: [(&str, &str); 5] = [
    (
        "AI Technology Limitations:",
        "This analysis is performed by artificial intelligence and machine learning algorithms. \
         While highly accurate, AI systems can make errors and should never replace professional \
         medical judgment.",
    ),
    (
        "Not a Medical Diagnosis:",
        "This report provides AI-assisted analysis for informational purposes only. It does not \
         constitute a medical diagnosis, treatment recommendation, or medical advice.",
    ),
    (
        "Professional Medical Consultation Required:",
        "Any abnormal findings require consultation with qualified medical professionals \
         including radiologists, neurologists, or neurosurgeons.",
    ),
    (
        "Imaging Limitations:",
        "MRI interpretation depends on image quality, patient positioning, contrast usage, and \
         scanning parameters. Some conditions may not be visible on MRI.",
    ),
    (
        "Emergency Situations:",
        "If experiencing severe headaches, seizures, vision changes, or neurological symptoms, \
         seek immediate medical attention.",
    ),
];

/// Tracking token printed on the report, e.g. `TX-20261019143005-4F0A9C`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportId(String);

impl ReportId {
    pub fn generate(at: &DateTime<Local>) -> Self {
        let suffix: u32 = rand::rng().random_range(0..0x100_0000);
        ReportId(format!("TX-{}-{:06X}", at.format("%Y%m%d%H%M%S"), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a report is about. The label is free text so a report can still be
/// produced for a class the catalog does not know.
pub struct ReportInput<'a> {
    pub label: String,
    pub confidence: Confidence,
    pub original: Option<&'a DynamicImage>,
    pub segmentation: Option<&'a RgbImage>,
}

impl<'a> ReportInput<'a> {
    pub fn new(class: TumorClass, confidence: Confidence) -> Self {
        Self::with_label(class.to_string(), confidence)
    }

    pub fn with_label(label: impl Into<String>, confidence: Confidence) -> Self {
        Self {
            label: label.into(),
            confidence,
            original: None,
            segmentation: None,
        }
    }

    pub fn original(mut self, image: &'a DynamicImage) -> Self {
        self.original = Some(image);
        self
    }

    pub fn segmentation(mut self, image: Option<&'a RgbImage>) -> Self {
        self.segmentation = image;
        self
    }
}

/// Per-report metadata that does not come from the analysis itself.
pub struct ReportContext {
    pub generated_at: DateTime<Local>,
    pub report_id: ReportId,
    pub system_name: String,
    pub model_version: String,
    pub logo: Option<RgbImage>,
}

impl ReportContext {
    pub fn new(system_name: &str, model_version: &str) -> Self {
        let generated_at = Local::now();
        Self {
            report_id: ReportId::generate(&generated_at),
            generated_at,
            system_name: system_name.to_string(),
            model_version: model_version.to_string(),
            logo: None,
        }
    }

    pub fn with_logo(mut self, logo: Option<RgbImage>) -> Self {
        self.logo = logo;
        self
    }

    fn timestamp(&self) -> String {
        self.generated_at.format("%B %d, %Y at %H:%M:%S").to_string()
    }
}

/// First readable candidate wins; a missing or undecodable logo is not an
/// error.
pub fn find_logo(candidates: &[PathBuf]) -> Option<RgbImage> {
    for path in candidates {
        if !path.is_file() {
            continue;
        }
        match image::open(path) {
            Ok(img) => {
                log::debug!("Using report logo {}", path.display());
                return Some(img.to_rgb8());
            }
            Err(e) => log::debug!("Skipping unreadable logo {}: {}", path.display(), e),
        }
    }
    None
}

fn embeddable(image: &DynamicImage) -> RgbImage {
    if image.width().max(image.height()) > MAX_EMBED_EDGE {
        image.thumbnail(MAX_EMBED_EDGE, MAX_EMBED_EDGE).to_rgb8()
    } else {
        image.to_rgb8()
    }
}

pub fn build_document(
    input: &ReportInput<'_>,
    context: &ReportContext,
    catalog: &TumorCatalog,
) -> ReportDocument {
    let mut doc = ReportDocument::new(format!("{} Report {}", context.system_name, context.report_id));
    let timestamp = context.timestamp();

    // Header
    if let Some(logo) = &context.logo {
        doc.spacer(24.0).push(Block::Logo(logo.clone())).spacer(18.0);
    }
    doc.push(Block::Title(REPORT_TITLE.to_string()))
        .spacer(6.0)
        .push(Block::Subtitle(format!("Report Generated: {timestamp}")))
        .push(Block::Subtitle(format!("Model Version: {}", context.model_version)))
        .push(Block::Subtitle(format!("Report ID: {}", context.report_id)))
        .spacer(12.0)
        .push(Block::Rule)
        .spacer(24.0);

    // Scan images, each side falls back independently
    doc.section("MRI SCAN ANALYSIS");
    let left = match input.original {
        Some(image) => Cell::Image {
            image: embeddable(image),
            caption: "Original MRI".to_string(),
        },
        None => Cell::Placeholder("Original MRI (image not available)".to_string()),
    };
    let right = match input.segmentation {
        Some(image) => Cell::Image {
            image: image.clone(),
            caption: "AI Segmentation".to_string(),
        },
        None => Cell::Placeholder("AI Segmentation (image not available)".to_string()),
    };
    doc.push(Block::ImagePair { left, right }).spacer(24.0);

    // Diagnostic table
    let risk = assess_risk(&input.label, input.confidence);
    doc.section("AI DIAGNOSTIC RESULTS");
    doc.push(Block::Table(vec![
        ("Classification Result".to_string(), input.label.clone()),
        (
            "Confidence Level".to_string(),
            format!("{:.2}%", input.confidence.percent()),
        ),
        ("Risk Assessment".to_string(), risk.describe()),
    ]))
    .spacer(24.0);

    doc.section("DETAILED MEDICAL INFORMATION");
    push_detailed_info(&mut doc, &input.label, catalog);
    doc.push(Block::PageBreak);

    doc.section("BRAIN TUMOR REFERENCE GUIDE");
    for info in catalog
        .iter()
        .filter(|info| !info.key.eq_ignore_ascii_case(TumorClass::NoTumor.as_ref()))
    {
        doc.push(Block::LabeledParagraph {
            label: info.title.clone(),
            text: String::new(),
        })
        .push(Block::Paragraph(info.summary.clone()))
        .spacer(8.0);
    }
    doc.push(Block::PageBreak);

    doc.section("MEDICAL DISCLAIMERS & IMPORTANT INFORMATION");
    for (label, text) in DISCLAIMERS {
        doc.push(Block::LabeledParagraph {
            label: label.to_string(),
            text: text.to_string(),
        })
        .spacer(6.0);
    }

    doc.spacer(24.0)
        .push(Block::Subtitle(format!(
            "{} - Advanced Brain Tumor Detection Platform",
            context.system_name
        )))
        .spacer(8.0)
        .push(Block::Subtitle(format!("Generated on {timestamp}")));

    doc
}

fn push_detailed_info(doc: &mut ReportDocument, label: &str, catalog: &TumorCatalog) {
    let Some(info) = catalog.get(label) else {
        doc.push(Block::Paragraph(format!(
            "The AI has detected: {label}. No detailed information available."
        )));
        return;
    };

    doc.push(Block::LabeledParagraph {
        label: format!("About {}:", info.title),
        text: String::new(),
    })
    .spacer(6.0)
    .push(Block::Paragraph(info.summary.clone()));

    let lists = [
        ("Common Types/Subtypes:", &info.subtypes),
        ("Common Symptoms:", &info.symptoms),
        ("Treatment Options:", &info.treatments),
    ];
    for (heading, items) in lists {
        if items.is_empty() {
            continue;
        }
        doc.spacer(6.0).push(Block::LabeledParagraph {
            label: heading.to_string(),
            text: String::new(),
        });
        for item in items {
            doc.push(Block::Bullet(item.clone()));
        }
    }

    for (name, value) in [("Prognosis:", &info.prognosis), ("Prevalence:", &info.prevalence)] {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            doc.spacer(6.0).push(Block::LabeledParagraph {
                label: name.to_string(),
                text: value.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb};

    fn context() -> ReportContext {
        ReportContext::new("TumorX AI System", "TumorX v2.1.0")
    }

    fn catalog() -> TumorCatalog {
        TumorCatalog::builtin().unwrap()
    }

    #[test]
    fn test_report_id_format() {
        let id = ReportId::generate(&Local::now());
        let parts: Vec<&str> = id.as_str().split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "TX");
        assert_eq!(parts[1].len(), 14);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_section_order() {
        let input = ReportInput::new(TumorClass::Glioma, Confidence::new(0.97));
        let doc = build_document(&input, &context(), &catalog());
        assert_eq!(
            doc.headings(),
            vec![
                "MRI SCAN ANALYSIS",
                "AI DIAGNOSTIC RESULTS",
                "DETAILED MEDICAL INFORMATION",
                "BRAIN TUMOR REFERENCE GUIDE",
                "MEDICAL DISCLAIMERS & IMPORTANT INFORMATION",
            ]
        );
        let breaks = doc
            .blocks
            .iter()
            .filter(|b| matches!(b, Block::PageBreak))
            .count();
        assert_eq!(breaks, 2);
    }

    #[test]
    fn test_glioma_high_confidence_content() {
        let input = ReportInput::new(TumorClass::Glioma, Confidence::new(0.97));
        let doc = build_document(&input, &context(), &catalog());
        let text = doc.plain_text();
        assert!(text.contains("Risk Assessment: HIGH PRIORITY - Requires medical attention"));
        assert!(text.contains("Confidence Level: 97.00%"));
        assert!(text.contains("Gliomas arise from glial cells"));
        assert!(text.contains("About Glioma Tumor:"));
    }

    #[test]
    fn test_unknown_label_falls_back() {
        let input = ReportInput::with_label("unknownclass", Confidence::new(0.6));
        let doc = build_document(&input, &context(), &catalog());
        let text = doc.plain_text();
        assert!(text.contains("The AI has detected: unknownclass. No detailed information available."));
        assert!(text.contains("Risk Assessment: LOW"));
    }

    #[test]
    fn test_missing_images_use_independent_placeholders() {
        let scan = DynamicImage::ImageLuma8(GrayImage::from_pixel(64, 64, Luma([90])));
        let input = ReportInput::new(TumorClass::Meningioma, Confidence::new(0.8))
            .original(&scan)
            .segmentation(None);
        let doc = build_document(&input, &context(), &catalog());
        let pair = doc
            .blocks
            .iter()
            .find_map(|b| match b {
                Block::ImagePair { left, right } => Some((left, right)),
                _ => None,
            })
            .unwrap();
        assert!(!pair.0.is_placeholder());
        assert!(pair.1.is_placeholder());
        assert!(doc.plain_text().contains("AI Segmentation (image not available)"));

        let overlay = RgbImage::from_pixel(256, 256, Rgb([10, 10, 10]));
        let input = ReportInput::new(TumorClass::Meningioma, Confidence::new(0.8))
            .segmentation(Some(&overlay));
        let doc = build_document(&input, &context(), &catalog());
        assert!(doc.plain_text().contains("Original MRI (image not available)"));
    }

    #[test]
    fn test_reference_guide_skips_notumor() {
        let input = ReportInput::new(TumorClass::NoTumor, Confidence::new(0.99));
        let doc = build_document(&input, &context(), &catalog());
        let text = doc.plain_text();
        let guide = text.split("BRAIN TUMOR REFERENCE GUIDE").nth(1).unwrap();
        let guide = guide.split("MEDICAL DISCLAIMERS").next().unwrap();
        assert!(guide.contains("Pituitary Tumor"));
        assert!(!guide.contains("No Tumor Detected"));
        assert!(text.contains("Risk Assessment: Healthy - No tumor detected"));
    }

    #[test]
    fn test_large_original_is_downscaled() {
        let scan = DynamicImage::ImageLuma8(GrayImage::from_pixel(3000, 1500, Luma([1])));
        let embedded = embeddable(&scan);
        assert_eq!(embedded.width(), 1024);
        assert!(embedded.height() <= 1024);
    }

    #[test]
    fn test_find_logo_tolerates_absence_and_garbage() {
        let tmp = tempfile::tempdir().unwrap();
        let garbage = tmp.path().join("logo.png");
        std::fs::write(&garbage, b"not a png").unwrap();
        let good = tmp.path().join("logo.jpg");
        RgbImage::from_pixel(4, 2, Rgb([0, 0, 255]))
            .save(&good)
            .unwrap();

        assert!(find_logo(&[tmp.path().join("absent.png")]).is_none());
        let logo = find_logo(&[garbage, good]).unwrap();
        assert_eq!(logo.dimensions(), (4, 2));
    }
}
