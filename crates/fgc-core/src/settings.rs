//! Per-session configuration.
//!
//! `UserSettings` carries the pixel scale factors and sizing units used to
//! turn stored viewport-unit geometry into pixels. `EngineConfig` carries the
//! interaction constants (anchor gap, snap radius). Both load from JSON.

use crate::error::{CoreError, CoreResult};
use crate::model::ControllerType;
use serde::{Deserialize, Serialize};

/// Fixed layout ratios for numpad blocks (multiples of `command_size`).
pub struct LayoutSetting;

impl LayoutSetting {
    pub const BLOCK_HEIGHT_SCALE: f64 = 2.0;
    pub const HORIZONTAL_MARGIN_SCALE: f64 = 1.0 / 6.0;
}

/// Immutable-per-session user configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    /// Pixels per horizontal viewport unit.
    pub viewport_width_unit: f64,
    /// Pixels per vertical viewport unit.
    pub viewport_height_unit: f64,
    /// Pixel multiplier applied to block/icon sizes.
    pub length_unit: f64,
    /// Height of a character move image, in vertical viewport units.
    pub move_image_height: f64,
    /// Side of one command icon, in `length_unit`s.
    pub command_size: f64,
    pub default_controller_type: ControllerType,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            viewport_width_unit: 1000.0,
            viewport_height_unit: 1000.0,
            length_unit: 10.0,
            move_image_height: 0.2,
            command_size: 3.0,
            default_controller_type: ControllerType::Classic,
        }
    }
}

impl UserSettings {
    /// Parse settings from JSON and validate them.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Every scale factor must be finite and strictly positive.
    pub fn validate(&self) -> CoreResult<()> {
        let checks = [
            ("viewportWidthUnit", self.viewport_width_unit),
            ("viewportHeightUnit", self.viewport_height_unit),
            ("lengthUnit", self.length_unit),
            ("moveImageHeight", self.move_image_height),
            ("commandSize", self.command_size),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value <= 0.0 {
                return Err(CoreError::invalid_settings(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Interaction constants for the canvas engine. All distances are pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Distance between a node's bounding box and its anchors.
    pub anchor_gap: f64,
    /// Radius within which a dragged arrow end snaps to an anchor.
    pub anchor_snap_threshold: f64,
    /// Radius of an anchor marker.
    pub anchor_radius: f64,
    /// Extra hit slop around arrow paths.
    pub arrow_hit_tolerance: f64,
    /// Prefix prepended to image file paths before loading.
    pub asset_base_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            anchor_gap: 16.0,
            anchor_snap_threshold: 20.0,
            anchor_radius: 4.0,
            arrow_hit_tolerance: 6.0,
            asset_base_url: String::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Resolve a server-relative asset path to a loadable source.
    pub fn asset_url(&self, path: &str) -> String {
        format!("{}{path}", self.asset_base_url)
    }
}
