use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static DEFAULT_CONFIG: Lazy<BindingConfig> = Lazy::new(BindingConfig::default);

/// Interaction thresholds for binding and anchor recomputation. Every
/// value that changes interaction feel lives here rather than in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BindingConfig {
    /// Clearance kept between an orbit anchor and the host outline.
    pub fixed_binding_distance: f32,
    /// Lower bound of the bindable zone around a shape.
    pub min_binding_gap: f32,
    /// Upper bound of the size-scaled part of the bindable zone.
    pub max_binding_gap: f32,
    /// Fraction of the smaller shape dimension contributing to the zone.
    pub bindable_size_ratio: f32,
    /// Screen-space hover highlight width, divided by zoom when zoomed in.
    pub highlight_thickness: f32,
    /// Fraction of a shape dimension forming the mid-side snap band.
    pub mid_snap_tolerance: f32,
    /// Absolute clamp on the mid-side snap band, lower bound.
    pub mid_band_min: f32,
    /// Absolute clamp on the mid-side snap band, upper bound.
    pub mid_band_max: f32,
    /// How far outside the silhouette a drop point may land while still
    /// counting as a body hit (selects inside mode over orbit mode).
    pub body_hit_tolerance: f32,
    /// Selections larger than this skip binding suggestions entirely.
    pub suggestion_cap: usize,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            fixed_binding_distance: 4.0,
            min_binding_gap: 16.0,
            max_binding_gap: 32.0,
            bindable_size_ratio: 0.25,
            highlight_thickness: 10.0,
            mid_snap_tolerance: 0.05,
            mid_band_min: 5.0,
            mid_band_max: 80.0,
            body_hit_tolerance: 0.0,
            suggestion_cap: 50,
        }
    }
}

/// Shared default used by callers that never load a config file.
pub fn default_config() -> &'static BindingConfig {
    &DEFAULT_CONFIG
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<BindingConfig> {
    let Some(path) = path else {
        return Ok(BindingConfig::default());
    };
    let contents = std::fs::read_to_string(path)?;
    let config = match serde_json::from_str(&contents) {
        Ok(config) => config,
        Err(_) => json5::from_str(&contents)?,
    };
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_ordered() {
        let config = BindingConfig::default();
        assert!(config.min_binding_gap < config.max_binding_gap);
        assert!(config.mid_band_min < config.mid_band_max);
        assert!(config.fixed_binding_distance > 0.0);
    }

    #[test]
    fn load_without_path_yields_defaults() {
        let config = load_config(None).expect("defaults");
        assert_eq!(config.suggestion_cap, BindingConfig::default().suggestion_cap);
    }

    #[test]
    fn partial_json5_overrides_defaults() {
        let config: BindingConfig =
            json5::from_str("{ maxBindingGap: 48, suggestionCap: 10 }").expect("parse");
        assert_eq!(config.max_binding_gap, 48.0);
        assert_eq!(config.suggestion_cap, 10);
        assert_eq!(config.min_binding_gap, 16.0);
    }
}
