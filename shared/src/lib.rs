use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use uuid::Uuid;

/// Output classes of the tumor classifier, in model index order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TumorClass {
    Glioma,
    Meningioma,
    NoTumor,
    Pituitary,
}

impl TumorClass {
    pub const ALL: [TumorClass; 4] = [
        TumorClass::Glioma,
        TumorClass::Meningioma,
        TumorClass::NoTumor,
        TumorClass::Pituitary,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Coarse triage label derived from the predicted class and its confidence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display, AsRefStr,
)]
pub enum RiskTier {
    #[serde(rename = "LOW")]
    #[strum(serialize = "LOW")]
    Low,
    #[serde(rename = "MODERATE")]
    #[strum(serialize = "MODERATE")]
    Moderate,
    #[serde(rename = "HIGH PRIORITY")]
    #[strum(serialize = "HIGH PRIORITY")]
    HighPriority,
    #[serde(rename = "Healthy")]
    #[strum(serialize = "Healthy")]
    Healthy,
}

impl RiskTier {
    pub fn guidance(&self) -> &'static str {
        match self {
            RiskTier::Healthy => "No tumor detected",
            RiskTier::HighPriority => "Requires medical attention",
            RiskTier::Moderate => "Follow-up recommended",
            RiskTier::Low => "Monitor and consult if symptoms progress",
        }
    }

    /// Tier name and guidance as printed in reports, e.g. `MODERATE - Follow-up recommended`.
    pub fn describe(&self) -> String {
        format!("{} - {}", self, self.guidance())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClassProbability {
    pub label: TumorClass,
    pub probability: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClassificationDto {
    pub label: TumorClass,
    /// Fraction in [0, 1].
    pub confidence: f32,
    pub confidence_pct: f32,
    pub probabilities: Vec<ClassProbability>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SegmentationDto {
    pub overlay_png_base64: String,
    pub width: u32,
    pub height: u32,
    pub tumor_pixels: usize,
    pub coverage: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnalysisResponse {
    pub analysis_id: Uuid,
    pub classification: ClassificationDto,
    pub risk_tier: RiskTier,
    pub risk_assessment: String,
    pub segmentation: Option<SegmentationDto>,
    pub segmentation_warning: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorResponse {
    pub error: String,
}
