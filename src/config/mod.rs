// ============================================================================
// Configuration — knobs for building a drainage network and scoring impact
//
// Plain structs with `Default`, like the rest of the engine. Serde derives let a
// caller embed these in whatever settings file their own layer reads.
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, FlowResult};
use crate::grid::D8Convention;

/// What to do with a direction code outside the nine valid values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CodePolicy {
    /// Reject the grid at construction.
    #[default]
    Strict,
    /// Store the cell as a sink (code 0) and log how many were rewritten.
    Lenient,
}

/// How a direction grid is turned into a drainage network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AccumulatorConfig {
    pub convention: D8Convention,
    pub code_policy: CodePolicy,
}

impl AccumulatorConfig {
    pub fn lenient() -> Self {
        Self {
            code_policy: CodePolicy::Lenient,
            ..Default::default()
        }
    }
}

/// Thresholds used when turning point sources into downstream impact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactConfig {
    /// Impact value a cell must exceed to be drawn as an affected channel.
    /// Impact counts are integers, so 0.9 means "at least one source upstream".
    pub channel_threshold: f64,
    /// Minimum drainage area (map units squared) for a cell to count as a channel
    /// when snapping a point onto the network.
    pub snap_area_threshold: f64,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            channel_threshold: 0.9,
            snap_area_threshold: 1.0e6, // 1 km² for metre grids
        }
    }
}

impl ImpactConfig {
    pub fn validate(&self) -> FlowResult<()> {
        if !self.channel_threshold.is_finite() {
            return Err(FlowError::invalid_config("channel_threshold must be finite"));
        }
        if !self.snap_area_threshold.is_finite() || self.snap_area_threshold < 0.0 {
            return Err(FlowError::invalid_config(
                "snap_area_threshold must be a finite, non-negative area",
            ));
        }
        Ok(())
    }
}
