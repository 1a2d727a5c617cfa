//! Catalog-driven scoring and melanoma risk classification.
//!
//! - [`catalog`] — the fixed, ordered set of diagnostic classes and key resolution.
//! - [`processor`] — canonical response → ordered [`DiagnosisResult`](crate::models::DiagnosisResult) list.
//! - [`risk`] — melanoma percentage → [`RiskTier`](crate::models::RiskTier).

pub mod catalog;
pub mod processor;
pub mod risk;
