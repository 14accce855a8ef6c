// Verify interactor - Checks a published video against its narration length

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::errors::DomainError;
use crate::domain::rules::{OutputValidator, ValidationResult};
use crate::error::{CompositorError, CompositorResult};
use crate::ports::ProbePort;

/// Output verification request
#[derive(Debug, Clone)]
pub struct VerifyRequest {
    pub output_file: PathBuf,
    pub expected_duration: f64,
    pub tolerance: f64,
}

impl VerifyRequest {
    pub fn new(
        output_file: impl Into<PathBuf>,
        expected_duration: f64,
        tolerance: f64,
    ) -> Result<Self, DomainError> {
        if !expected_duration.is_finite() || expected_duration <= 0.0 {
            return Err(DomainError::InvalidDuration(format!(
                "Expected duration must be positive, got {}",
                expected_duration
            )));
        }
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(DomainError::BadArgs(format!(
                "Tolerance must be non-negative, got {}",
                tolerance
            )));
        }
        Ok(Self {
            output_file: output_file.into(),
            expected_duration,
            tolerance,
        })
    }
}

/// Output verification response
#[derive(Debug, Clone, Serialize)]
pub struct VerifyResponse {
    pub output_file: PathBuf,
    pub file_size: u64,
    pub validation: ValidationResult,
}

/// Interactor for output verification use case
pub struct VerifyInteractor {
    probe_port: Arc<dyn ProbePort>,
}

impl VerifyInteractor {
    pub fn new(probe_port: Arc<dyn ProbePort>) -> Self {
        Self { probe_port }
    }

    /// Probe the output and compare its duration with the expected value
    pub async fn execute(&self, request: VerifyRequest) -> CompositorResult<VerifyResponse> {
        info!("Starting output verification for: {}", request.output_file.display());

        if !request.output_file.is_file() {
            return Err(DomainError::FileNotFound(format!(
                "Output file does not exist: {}",
                request.output_file.display()
            ))
            .into());
        }
        let file_size = std::fs::metadata(&request.output_file)?.len();

        let actual = self
            .probe_port
            .probe_duration(&request.output_file)
            .await
            .map_err(|e| {
                CompositorError::Domain(DomainError::ValidationFailed(format!(
                    "Failed to probe output: {}",
                    e
                )))
            })?;

        let validation =
            OutputValidator::validate_duration(actual, request.expected_duration, request.tolerance);
        if validation.overall_valid {
            info!(actual, expected = request.expected_duration, "Output verification passed");
        } else {
            warn!(
                actual,
                expected = request.expected_duration,
                difference = validation.difference,
                "Output verification failed"
            );
        }

        Ok(VerifyResponse {
            output_file: request.output_file,
            file_size,
            validation,
        })
    }
}
