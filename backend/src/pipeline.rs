use image::DynamicImage;

use crate::inference::{Classification, InferenceError, Models, Segmentation, classify, segment};
use crate::report::{ReportInput, assess_risk};
use shared::RiskTier;

/// Result of running both models on one upload. Classification is required;
/// segmentation is best-effort.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub image: DynamicImage,
    pub classification: Classification,
    pub segmentation: Option<Segmentation>,
    pub segmentation_error: Option<String>,
}

impl Analysis {
    pub fn risk_tier(&self) -> RiskTier {
        assess_risk(
            self.classification.class.as_ref(),
            self.classification.confidence,
        )
    }

    pub fn report_input(&self) -> ReportInput<'_> {
        ReportInput::new(self.classification.class, self.classification.confidence)
            .original(&self.image)
            .segmentation(self.segmentation.as_ref().map(|s| &s.composite))
    }
}

pub fn analyze(models: &Models, image: DynamicImage) -> Result<Analysis, InferenceError> {
    let classification = classify(models.classifier.as_ref(), &image)?;
    log::info!(
        "Classified scan as {} ({:.1}%)",
        classification.class,
        classification.confidence.percent()
    );

    let (segmentation, segmentation_error) = match segment(models.segmenter.as_ref(), &image) {
        Ok(segmentation) => {
            log::debug!("Segmentation flagged {} pixels", segmentation.tumor_pixels());
            (Some(segmentation), None)
        }
        Err(e) => {
            log::warn!("Segmentation analysis unavailable: {}", e);
            (None, Some(e.to_string()))
        }
    };

    Ok(Analysis {
        image,
        classification,
        segmentation,
        segmentation_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::model::fixtures::{Failing, FixedOutput};
    use crate::report::{ReportContext, TumorCatalog, build_document};
    use image::{GrayImage, Luma};
    use shared::TumorClass;
    use std::sync::Arc;

    fn blank_scan() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(512, 512, Luma([0])))
    }

    #[test]
    fn test_healthy_scan_is_healthy_regardless_of_confidence() {
        for confidence in [0.3, 0.6, 0.99] {
            let rest = (1.0 - confidence) / 3.0;
            let models = Models::new(
                Arc::new(FixedOutput::probabilities([rest, rest, confidence, rest])),
                Arc::new(FixedOutput::mask(|_, _| 0.0)),
            );
            let analysis = analyze(&models, blank_scan()).unwrap();
            assert_eq!(analysis.classification.class, TumorClass::NoTumor);
            assert_eq!(analysis.risk_tier(), RiskTier::Healthy);
            assert_eq!(analysis.segmentation.unwrap().tumor_pixels(), 0);
        }
    }

    #[test]
    fn test_segmentation_failure_keeps_classification() {
        let models = Models::new(
            Arc::new(FixedOutput::probabilities([0.8, 0.1, 0.05, 0.05])),
            Arc::new(Failing),
        );
        let analysis = analyze(&models, blank_scan()).unwrap();
        assert_eq!(analysis.classification.class, TumorClass::Glioma);
        assert!(analysis.segmentation.is_none());
        assert!(analysis.segmentation_error.is_some());

        let catalog = TumorCatalog::builtin().unwrap();
        let context = ReportContext::new("TumorX AI System", "test");
        let doc = build_document(&analysis.report_input(), &context, &catalog);
        assert!(doc.plain_text().contains("AI Segmentation (image not available)"));
    }

    #[test]
    fn test_classification_failure_aborts() {
        let models = Models::new(Arc::new(Failing), Arc::new(FixedOutput::mask(|_, _| 0.9)));
        assert!(analyze(&models, blank_scan()).is_err());
    }

    #[test]
    fn test_each_model_called_once() {
        let classifier = Arc::new(FixedOutput::probabilities([0.1, 0.7, 0.1, 0.1]));
        let segmenter = Arc::new(FixedOutput::mask(|_, _| 0.1));
        let models = Models::new(classifier.clone(), segmenter.clone());
        analyze(&models, blank_scan()).unwrap();
        assert_eq!(classifier.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(segmenter.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
