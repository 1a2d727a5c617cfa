//! Orchestration: adapter call → subject gate → scoring → risk tier.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::backend::Backend;
use crate::diagnosis::processor;
use crate::diagnosis::risk::{self, RiskThresholds};
use crate::error::{AnalysisError, AnalysisFailure, FailureOrigin};
use crate::models::{Analysis, CanonicalResponse};
use crate::upload::ImageUpload;

/// Run one analysis against `backend`.
///
/// Adapter failures are tagged with the backend they came from; everything
/// after the canonical response is tagged as a pipeline failure.
pub async fn run(
    backend: &dyn Backend,
    image: &ImageUpload,
    thresholds: &RiskThresholds,
) -> Result<Analysis, AnalysisFailure> {
    let response = backend
        .analyze(image)
        .await
        .map_err(|error| AnalysisFailure {
            origin: FailureOrigin::Backend(backend.kind()),
            error,
        })?;

    interpret(response, thresholds).map_err(|error| AnalysisFailure {
        origin: FailureOrigin::Pipeline,
        error,
    })
}

/// Turn a canonical response into an [`Analysis`].
///
/// Responses judged not to depict a mole short-circuit to
/// [`Analysis::NotASubject`] without touching their scores.
pub fn interpret(
    response: CanonicalResponse,
    thresholds: &RiskThresholds,
) -> Result<Analysis, AnalysisError> {
    if !response.is_subject {
        return Ok(Analysis::NotASubject {
            subject_confidence: response.subject_confidence,
            model_identifier: response.model_identifier,
        });
    }

    let processed = processor::process(&response)?;
    let risk = risk::assess(processed.melanoma_percent, thresholds);

    tracing::info!(
        top = %processed.results.first().map(|r| r.code.as_str()).unwrap_or("-"),
        melanoma_percent = risk.percent,
        tier = %risk.tier,
        "analysis complete"
    );

    Ok(Analysis::Classified {
        results: processed.results,
        risk,
        model_identifier: response.model_identifier,
        subject_confidence: response.subject_confidence,
    })
}

/// One operator's analysis session: at most one request in flight.
pub struct Session {
    backend: Box<dyn Backend>,
    thresholds: RiskThresholds,
    busy: AtomicBool,
}

impl Session {
    pub fn new(backend: Box<dyn Backend>, thresholds: RiskThresholds) -> Self {
        Self {
            backend,
            thresholds,
            busy: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Analyze `image`, rejecting the call with [`AnalysisError::Busy`] while
    /// another analysis is outstanding.
    pub async fn submit(&self, image: &ImageUpload) -> Result<Analysis, AnalysisFailure> {
        let _guard = BusyGuard::acquire(&self.busy).ok_or(AnalysisFailure {
            origin: FailureOrigin::Pipeline,
            error: AnalysisError::Busy,
        })?;
        run(self.backend.as_ref(), image, &self.thresholds).await
    }
}

struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
