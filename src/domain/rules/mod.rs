// Domain rules - Business logic and policies

use crate::domain::errors::*;
use crate::domain::model::*;

/// Durations closer than this are treated as equal
const DURATION_EPSILON: f64 = 1e-9;

/// Business rules for splitting the audio duration across visual assets
#[derive(Debug, Clone, Copy, Default)]
pub struct TimelineAllocator {
    bounds: TimelineBounds,
}

impl TimelineAllocator {
    pub fn new(bounds: TimelineBounds) -> Result<Self, DomainError> {
        bounds.validate()?;
        Ok(Self { bounds })
    }

    pub fn bounds(&self) -> TimelineBounds {
        self.bounds
    }

    /// Build the segment plan for `total_duration` seconds of narration.
    ///
    /// The title slide comes first unless the narration is no longer than the
    /// opening. Candidates share the rest evenly within the segment bounds and
    /// are dropped once the budget is spent. With no candidates a single
    /// fallback slide covers the remainder. The last entry absorbs rounding
    /// and any time left over, so the plan sums to `total_duration`.
    pub fn plan(
        &self,
        total_duration: f64,
        title: &str,
        candidates: &[AssetRequest],
    ) -> Result<TimelinePlan, DomainError> {
        if !total_duration.is_finite() || total_duration <= 0.0 {
            return Err(DomainError::InvalidDuration(format!(
                "Total duration must be positive, got {}",
                total_duration
            )));
        }

        let mut entries = Vec::with_capacity(candidates.len() + 1);
        let mut remaining = total_duration;

        if total_duration > self.bounds.opening && self.bounds.opening > 0.0 {
            entries.push(Self::entry(
                AssetRequest::slide(title),
                self.bounds.opening,
                EntryRole::Title,
            ));
            remaining -= self.bounds.opening;
        }

        let mut dropped = 0;
        if candidates.is_empty() {
            if remaining > DURATION_EPSILON {
                entries.push(Self::entry(
                    AssetRequest::slide(title),
                    remaining,
                    EntryRole::Fallback,
                ));
            }
        } else {
            let per_asset = (remaining / candidates.len() as f64)
                .clamp(self.bounds.min_segment, self.bounds.max_segment);

            for (index, candidate) in candidates.iter().enumerate() {
                if remaining <= DURATION_EPSILON {
                    dropped = candidates.len() - index;
                    break;
                }
                let share = per_asset.min(remaining);
                entries.push(Self::entry(candidate.clone(), share, EntryRole::Candidate));
                remaining -= share;
            }
        }

        Self::settle_last(&mut entries, total_duration);

        Ok(TimelinePlan { entries, dropped })
    }

    fn entry(request: AssetRequest, duration: f64, role: EntryRole) -> PlanEntry {
        PlanEntry {
            request: request.with_hint_duration(duration),
            allocated_duration: duration,
            role,
        }
    }

    /// Give the last entry whatever the others did not take
    fn settle_last(entries: &mut [PlanEntry], total_duration: f64) {
        let Some((last, head)) = entries.split_last_mut() else {
            return;
        };
        let taken: f64 = head.iter().map(|e| e.allocated_duration).sum();
        let rest = total_duration - taken;
        if rest > 0.0 {
            last.allocated_duration = rest;
            last.request.hint_duration = rest;
        }
    }
}

/// Business rules for output validation
pub struct OutputValidator;

impl OutputValidator {
    /// Compare a probed output duration against the expected one
    pub fn validate_duration(actual: f64, expected: f64, tolerance: f64) -> ValidationResult {
        let difference = (actual - expected).abs();
        let duration_valid = actual.is_finite() && difference <= tolerance;
        ValidationResult {
            actual,
            expected,
            tolerance,
            difference,
            overall_valid: duration_valid,
        }
    }
}

/// Output validation result
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ValidationResult {
    pub actual: f64,
    pub expected: f64,
    pub tolerance: f64,
    pub difference: f64,
    pub overall_valid: bool,
}

#[cfg(test)]
mod tests;
