use image::DynamicImage;
use shared::{ClassProbability, TumorClass};

use super::model::{InferenceError, Predictor};
use super::preprocess::classifier_input;

/// Probability mass, always stored as a fraction in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Confidence(f32);

impl Confidence {
    /// Clamps into [0, 1]; NaN becomes 0.
    pub fn new(fraction: f32) -> Self {
        if fraction.is_nan() {
            Confidence(0.0)
        } else {
            Confidence(fraction.clamp(0.0, 1.0))
        }
    }

    pub fn fraction(&self) -> f32 {
        self.0
    }

    pub fn percent(&self) -> f32 {
        self.0 * 100.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub class: TumorClass,
    pub confidence: Confidence,
    pub probabilities: [f32; 4],
}

impl Classification {
    /// First maximum wins on ties so identical scores resolve to the lowest
    /// class index.
    pub fn from_probabilities(probabilities: &[f32]) -> Result<Self, InferenceError> {
        if probabilities.len() != TumorClass::ALL.len() {
            return Err(InferenceError::OutputShape {
                expected: format!("{} class probabilities", TumorClass::ALL.len()),
                actual: format!("{} values", probabilities.len()),
            });
        }
        if let Some(index) = probabilities.iter().position(|p| !p.is_finite()) {
            return Err(InferenceError::NonFinite(index));
        }

        let mut best = 0;
        for (index, &p) in probabilities.iter().enumerate().skip(1) {
            if p > probabilities[best] {
                best = index;
            }
        }

        let mut scores = [0.0f32; 4];
        scores.copy_from_slice(probabilities);
        let class = TumorClass::from_index(best).ok_or_else(|| InferenceError::OutputShape {
            expected: "class index in range".into(),
            actual: best.to_string(),
        })?;

        Ok(Self {
            class,
            confidence: Confidence::new(scores[best]),
            probabilities: scores,
        })
    }

    pub fn class_probabilities(&self) -> Vec<ClassProbability> {
        TumorClass::ALL
            .iter()
            .zip(self.probabilities)
            .map(|(&label, probability)| ClassProbability { label, probability })
            .collect()
    }
}

pub fn classify(
    model: &dyn Predictor,
    image: &DynamicImage,
) -> Result<Classification, InferenceError> {
    let input = classifier_input(image);
    let output = model.predict(input.view())?;
    let probabilities: Vec<f32> = output.iter().copied().collect();
    Classification::from_probabilities(&probabilities)
}
