use std::cmp::Ordering;
use std::collections::HashMap;

use crate::diagnosis::catalog::{CATALOG, CRITICAL_CODE};
use crate::error::AnalysisError;
use crate::models::{CanonicalResponse, DiagnosisResult};

/// Ordered results plus the melanoma percentage derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedScores {
    pub results: Vec<DiagnosisResult>,
    pub melanoma_percent: f64,
}

/// Turn a canonical response into one result per catalog class.
///
/// Iterates the catalog, not the upstream keys: classes the upstream omitted
/// score 0 and extra keys are ignored. Results are sorted by probability,
/// highest first; equal probabilities keep catalog order.
///
/// Callers must route `is_subject == false` responses away before calling.
pub fn process(response: &CanonicalResponse) -> Result<ProcessedScores, AnalysisError> {
    let scores = response.scores.as_ref().ok_or_else(|| {
        AnalysisError::MalformedResponse(
            "The 'predictions' field is missing or invalid in the API response.".to_string(),
        )
    })?;

    let mut results = build_results(scores);
    // sort_by is stable; probabilities are finite after clamping
    results.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(Ordering::Equal)
    });

    let melanoma_percent = results
        .iter()
        .find(|r| r.code == CRITICAL_CODE)
        .map(|r| r.probability * 100.0)
        .unwrap_or(0.0);

    Ok(ProcessedScores {
        results,
        melanoma_percent,
    })
}

fn build_results(scores: &HashMap<String, f64>) -> Vec<DiagnosisResult> {
    CATALOG
        .iter()
        .map(|class| DiagnosisResult {
            code: class.code.to_string(),
            display_name: class.display_name.to_string(),
            probability: clamp_probability(scores.get(class.code).copied().unwrap_or(0.0)),
        })
        .collect()
}

/// Coerce into `[0, 1]`; NaN and infinities count as 0.
fn clamp_probability(p: f64) -> f64 {
    if !p.is_finite() {
        return 0.0;
    }
    p.clamp(0.0, 1.0)
}
