//! Engine configuration: role weights, time-decay half-life, and the
//! residual tolerance used by the normalization pass.
//!
//! Values are fixed per run. Load them from the data/ directory, or use
//! `AttributionConfig::default()` for the built-in table.

use crate::model::TouchpointRole;
use serde::{Deserialize, Serialize};

pub const DEFAULT_HALF_LIFE_DAYS: f64 = 7.0;

/// Payout drift above this is pushed onto the largest holder.
pub const DEFAULT_RESIDUAL_TOLERANCE: f64 = 0.01;

const MILLIS_PER_DAY: f64 = 24.0 * 60.0 * 60.0 * 1000.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RoleWeights {
    pub referral: f64,
    pub demo:     f64,
    pub intro:    f64,
    pub support:  f64,
    pub closer:   f64,
    pub other:    f64,
}

impl RoleWeights {
    /// Unrecognized tags take the "other" weight.
    pub fn weight(&self, role: &TouchpointRole) -> f64 {
        match role {
            TouchpointRole::Referral => self.referral,
            TouchpointRole::Demo     => self.demo,
            TouchpointRole::Intro    => self.intro,
            TouchpointRole::Support  => self.support,
            TouchpointRole::Closer   => self.closer,
            TouchpointRole::Other | TouchpointRole::Unrecognized(_) => self.other,
        }
    }
}

impl Default for RoleWeights {
    fn default() -> Self {
        Self {
            referral: 0.25,
            demo:     0.15,
            intro:    0.15,
            support:  0.10,
            closer:   0.35,
            other:    0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttributionConfig {
    pub role_weights: RoleWeights,
    /// Age at which a touchpoint's time-decay weight halves.
    pub half_life_days: f64,
    #[serde(default = "default_residual_tolerance")]
    pub residual_tolerance: f64,
}

fn default_residual_tolerance() -> f64 {
    DEFAULT_RESIDUAL_TOLERANCE
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            role_weights:       RoleWeights::default(),
            half_life_days:     DEFAULT_HALF_LIFE_DAYS,
            residual_tolerance: DEFAULT_RESIDUAL_TOLERANCE,
        }
    }
}

impl AttributionConfig {
    /// Load from `{data_dir}/attribution/attribution_config.json`.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/attribution/attribution_config.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: AttributionConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_half_life_days(mut self, days: f64) -> Self {
        self.half_life_days = days;
        self
    }

    pub fn half_life_millis(&self) -> f64 {
        self.half_life_days * MILLIS_PER_DAY
    }

    /// ln(2) / half-life, per millisecond.
    pub fn decay_constant(&self) -> f64 {
        std::f64::consts::LN_2 / self.half_life_millis()
    }

    /// Every weight must be positive so that a non-empty touchpoint set
    /// always has a non-zero total score.
    pub fn validate(&self) -> anyhow::Result<()> {
        let w = &self.role_weights;
        for (role, weight) in [
            ("referral", w.referral),
            ("demo", w.demo),
            ("intro", w.intro),
            ("support", w.support),
            ("closer", w.closer),
            ("other", w.other),
        ] {
            if !(weight.is_finite() && weight > 0.0) {
                anyhow::bail!("role weight for '{role}' must be positive, got {weight}");
            }
        }
        if !(self.half_life_days.is_finite() && self.half_life_days > 0.0) {
            anyhow::bail!("half_life_days must be positive, got {}", self.half_life_days);
        }
        if !(self.residual_tolerance.is_finite() && self.residual_tolerance >= 0.0) {
            anyhow::bail!(
                "residual_tolerance must be non-negative, got {}",
                self.residual_tolerance
            );
        }
        Ok(())
    }
}
