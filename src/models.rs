use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Backend-agnostic shape every adapter normalizes into.
///
/// `scores` is keyed by catalog code. `None` means the upstream did not
/// deliver a usable mapping at all, which the result processor rejects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalResponse {
    pub is_subject: bool,
    pub subject_confidence: Option<f64>,
    pub scores: Option<HashMap<String, f64>>,
    pub model_identifier: Option<String>,
}

/// One catalog class with its clamped probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisResult {
    pub code: String,
    pub display_name: String,
    /// Always within `[0, 1]`.
    pub probability: f64,
}

impl DiagnosisResult {
    /// Probability as a percentage with one decimal, e.g. `87.0%`.
    pub fn percent_label(&self) -> String {
        format!("{:.1}%", self.probability * 100.0)
    }
}

/// Melanoma risk bucket shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskTier::Low => write!(f, "Low"),
            RiskTier::Medium => write!(f, "Medium"),
            RiskTier::High => write!(f, "High"),
        }
    }
}

/// Melanoma percentage and the tier it falls in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Melanoma probability scaled to `[0, 100]`.
    pub percent: f64,
    pub tier: RiskTier,
}

impl RiskAssessment {
    pub fn percent_label(&self) -> String {
        format!("{:.1}%", self.percent)
    }
}

/// Outcome of one analysis, handed to the report layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Analysis {
    Classified {
        results: Vec<DiagnosisResult>,
        risk: RiskAssessment,
        model_identifier: Option<String>,
        subject_confidence: Option<f64>,
    },
    /// The upstream judged the image not to depict a mole. Not an error.
    NotASubject {
        subject_confidence: Option<f64>,
        model_identifier: Option<String>,
    },
}

/// Which classification service produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Hosted,
    Local,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Hosted => write!(f, "hosted model"),
            BackendKind::Local => write!(f, "local API"),
        }
    }
}
