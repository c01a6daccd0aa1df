use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{PoseError, Result};
use crate::skeleton::PoseSnapshot;
use crate::solver::ShapeParameters;

// ============================================================================
// Export settings
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputMode {
    /// One image per pose.
    #[default]
    List,
    /// All poses tiled into one image.
    Grid,
}

/// How captured pose previews are turned into output images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub view_width: u32,
    pub view_height: u32,
    pub cam_zoom: f32,
    pub output_mode: OutputMode,
    pub grid_columns: u32,
    /// RGB.
    pub bg_color: [u8; 3],
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            view_width: 512,
            view_height: 512,
            cam_zoom: 1.0,
            output_mode: OutputMode::List,
            grid_columns: 2,
            bg_color: [40, 40, 40],
        }
    }
}

impl ExportSettings {
    fn from_object(object: &Map<String, Value>) -> Self {
        let defaults = Self::default();
        // A legacy square `view_size` stands in for both dimensions.
        let view_size = field::<u32>(object, "view_size");
        Self {
            view_width: field(object, "view_width").or(view_size).unwrap_or(defaults.view_width),
            view_height: field(object, "view_height").or(view_size).unwrap_or(defaults.view_height),
            cam_zoom: field(object, "cam_zoom")
                .filter(|z: &f32| z.is_finite() && *z > 0.0)
                .unwrap_or(defaults.cam_zoom),
            output_mode: field(object, "output_mode").unwrap_or(defaults.output_mode),
            grid_columns: field(object, "grid_columns")
                .filter(|c: &u32| *c > 0)
                .unwrap_or(defaults.grid_columns),
            bg_color: field(object, "bg_color").unwrap_or(defaults.bg_color),
        }
    }
}

/// Columns and rows of an export grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GridLayout {
    pub columns: u32,
    pub rows: u32,
}

impl GridLayout {
    /// Tiles `count` images at most `columns` wide, row by row.
    #[must_use]
    pub fn for_images(count: usize, columns: u32) -> Self {
        if count == 0 {
            return Self::default();
        }
        let count = count as u32;
        let columns = columns.max(1).min(count);
        Self {
            columns,
            rows: count.div_ceil(columns),
        }
    }

    /// Top-left pixel of image `index` for `width × height` cells.
    #[must_use]
    pub fn cell_origin(&self, index: usize, width: u32, height: u32) -> (u32, u32) {
        let columns = self.columns.max(1) as usize;
        ((index % columns) as u32 * width, (index / columns) as u32 * height)
    }
}

// ============================================================================
// PersistedState
// ============================================================================

/// Everything a posing widget stores in its hidden serialized value.
///
/// Parsing is lenient: unknown keys are ignored, missing or malformed keys
/// fall back to defaults, and an unreadable blob yields the default state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistedState {
    pub mesh: ShapeParameters,
    pub poses: Vec<PoseSnapshot>,
    #[serde(rename = "activeTab")]
    pub active_tab: usize,
    pub export: ExportSettings,
    /// `data:image/png;base64,...` previews, one per pose.
    pub captured_images: Vec<String>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            mesh: ShapeParameters::default(),
            poses: vec![PoseSnapshot::default()],
            active_tab: 0,
            export: ExportSettings::default(),
            captured_images: Vec::new(),
        }
    }
}

impl PersistedState {
    /// Parses a persisted blob, never failing.
    #[must_use]
    pub fn from_json_lenient(blob: &str) -> Self {
        if blob.trim().is_empty() {
            return Self::default();
        }
        let value = match serde_json::from_str::<Value>(blob) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Unreadable pose data, using defaults: {e}");
                return Self::default();
            }
        };
        let Value::Object(object) = value else {
            log::warn!("Pose data is not an object, using defaults");
            return Self::default();
        };
        Self::from_object(&object)
    }

    fn from_object(object: &Map<String, Value>) -> Self {
        let mut state = Self {
            mesh: field(object, "mesh").unwrap_or_default(),
            poses: field(object, "poses").unwrap_or_default(),
            active_tab: field(object, "activeTab")
                .or_else(|| field(object, "active_tab"))
                .unwrap_or(0),
            export: object
                .get("export")
                .and_then(Value::as_object)
                .map(ExportSettings::from_object)
                .unwrap_or_default(),
            captured_images: field(object, "captured_images")
                .or_else(|| field(object, "capturedImages"))
                .unwrap_or_default(),
        };
        state.normalize();
        state
    }

    /// Restores the structural invariants: at least one pose, a valid
    /// active tab and clean snapshots.
    pub fn normalize(&mut self) {
        if self.poses.is_empty() {
            self.poses.push(PoseSnapshot::default());
        }
        for pose in &mut self.poses {
            pose.normalize();
        }
        self.active_tab = self.active_tab.min(self.poses.len() - 1);
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    #[must_use]
    pub fn active_pose(&self) -> &PoseSnapshot {
        &self.poses[self.active_tab.min(self.poses.len().saturating_sub(1))]
    }

    /// Decodes every captured preview, skipping blanks.
    #[must_use]
    pub fn decoded_previews(&self) -> Vec<Result<Vec<u8>>> {
        self.captured_images
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| decode_data_url(s))
            .collect()
    }
}

/// Decodes a base64 image, with or without its `data:<mime>;base64,` header.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>> {
    let payload = match url.split_once(',') {
        Some((header, payload)) => {
            if !header.starts_with("data:") || !header.ends_with(";base64") {
                return Err(PoseError::DataUriError(format!("unsupported header '{header}'")));
            }
            payload
        }
        None => url,
    };
    Ok(base64::engine::general_purpose::STANDARD.decode(payload.trim())?)
}

/// Encodes PNG bytes as a data URL.
#[must_use]
pub fn encode_png_data_url(bytes: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

fn field<T: DeserializeOwned>(object: &Map<String, Value>, key: &str) -> Option<T> {
    let value = object.get(key)?;
    if value.is_null() {
        return None;
    }
    match T::deserialize(value) {
        Ok(v) => Some(v),
        Err(e) => {
            log::warn!("Ignoring malformed '{key}' in pose data: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_layout_fills_rows() {
        assert_eq!(GridLayout::for_images(5, 2), GridLayout { columns: 2, rows: 3 });
        assert_eq!(GridLayout::for_images(1, 4), GridLayout { columns: 1, rows: 1 });
        assert_eq!(GridLayout::for_images(0, 4), GridLayout::default());
        assert_eq!(GridLayout { columns: 2, rows: 3 }.cell_origin(3, 64, 32), (64, 32));
    }

    #[test]
    fn legacy_view_size_sets_both_dimensions() {
        let state = PersistedState::from_json_lenient(r#"{"export": {"view_size": 256, "output_mode": "GRID"}}"#);
        assert_eq!(state.export.view_width, 256);
        assert_eq!(state.export.view_height, 256);
        assert_eq!(state.export.output_mode, OutputMode::Grid);
    }

    #[test]
    fn data_url_round_trip() {
        let url = encode_png_data_url(&[1, 2, 3, 250]);
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(decode_data_url(&url).unwrap(), vec![1, 2, 3, 250]);
        assert!(decode_data_url("data:image/png,AAAA").is_err());
    }
}
