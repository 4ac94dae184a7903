//! Pipeline diagnostics: timing and extents for each stage of a run.
//!
//! Collected by [`Pipeline::run_with_diagnostics`](crate::Pipeline::run_with_diagnostics)
//! alongside the rendered image. Skipped stages are listed too, with
//! `applied == false`, so a report always shows the full fixed order.
//!
//! Timestamps are captured via the `web-time` crate, which uses
//! `performance.now()` on WASM and `std::time::Instant` on native.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits in a human-friendly way.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::Extent;

/// Serde support for `std::time::Duration` as fractional seconds.
pub(crate) mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Extent of the input image (and of the rendered output).
    pub input_extent: Extent,
    /// One entry per stage, in pipeline order.
    pub stages: Vec<StageDiagnostics>,
    /// Duration of the final crop.
    #[serde(with = "duration_serde")]
    pub raster_duration: Duration,
    /// Total wall-clock duration of the run.
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Stage name (see [`FilterStage::name`](crate::FilterStage::name)).
    pub stage: String,
    /// Whether the stage's gate was on. Skipped stages report zero
    /// duration and the unchanged working extent.
    pub applied: bool,
    /// Wall-clock duration of the stage.
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Working extent after the stage.
    pub extent: Extent,
}

impl PipelineDiagnostics {
    /// Names of the stages that actually ran, in order.
    #[must_use]
    pub fn applied_stages(&self) -> Vec<&str> {
        self.stages
            .iter()
            .filter(|s| s.applied)
            .map(|s| s.stage.as_str())
            .collect()
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {} ({} pixels)",
            self.input_extent,
            self.input_extent.area(),
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<26} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Working extent"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let pct = |ms: f64| {
            if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            }
        };

        for diag in &self.stages {
            if diag.applied {
                let ms = duration_ms(diag.duration);
                lines.push(format!(
                    "{:<26} {ms:>8.3}ms {:>9.1}%  {}",
                    diag.stage,
                    pct(ms),
                    diag.extent,
                ));
            } else {
                lines.push(format!("{:<26} {:>10} {:>10}  {}", diag.stage, "skipped", "-", diag.extent));
            }
        }

        let raster_ms = duration_ms(self.raster_duration);
        lines.push(format!(
            "{:<26} {raster_ms:>8.3}ms {:>9.1}%  {}",
            "rasterize",
            pct(raster_ms),
            self.input_extent,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
