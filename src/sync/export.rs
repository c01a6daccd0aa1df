//! Batch export of every pose tab.
//!
//! Each [`PoseSnapshot`](crate::skeleton::PoseSnapshot) is posed once
//! through the [`PoseService`], and the captured previews are composed into
//! output images as the export settings ask: one image per pose (`LIST`)
//! or a single tiled sheet (`GRID`).

use std::io::Cursor;

use image::{imageops, ImageFormat, Rgb, RgbImage};

use super::state::{ExportSettings, GridLayout, OutputMode, PersistedState};
use crate::errors::Result;
use crate::protocol::{PoseRequest, PoseResponse, PoseService};

/// Side of the placeholder image emitted when nothing was captured.
pub const BLANK_SIZE: u32 = 512;

/// The result of exporting every pose tab.
#[derive(Debug, Clone, Default)]
pub struct BatchExport {
    /// One response per pose tab, in tab order.
    pub frames: Vec<PoseResponse>,
    /// Composed preview images.
    pub images: Vec<RgbImage>,
}

impl BatchExport {
    #[must_use]
    pub fn run(service: &PoseService, state: &PersistedState) -> Self {
        let frames = pose_all(service, state);
        let images = compose_previews(state);
        log::info!(
            "Exported {} poses into {} {:?} images",
            frames.len(),
            images.len(),
            state.export.output_mode
        );
        Self { frames, images }
    }

    /// PNG bytes of every composed image.
    pub fn encode_images(&self) -> Result<Vec<Vec<u8>>> {
        self.images.iter().map(encode_png).collect()
    }
}

/// Poses every snapshot, model rotation included, on the persisted body.
#[must_use]
pub fn pose_all(service: &PoseService, state: &PersistedState) -> Vec<PoseResponse> {
    state
        .poses
        .iter()
        .map(|snapshot| {
            let request = PoseRequest {
                model_rotation: Some(snapshot.model_rotation),
                ..PoseRequest::new(state.mesh, snapshot.bones.clone())
            };
            let response = service.handle(&request);
            if !response.is_success() {
                log::warn!("Export of pose '{}' failed", snapshot.name);
            }
            response
        })
        .collect()
}

/// Decodes the captured previews as RGB. Unreadable previews are skipped.
#[must_use]
pub fn decode_previews(state: &PersistedState) -> Vec<RgbImage> {
    state
        .decoded_previews()
        .into_iter()
        .enumerate()
        .filter_map(|(i, bytes)| {
            let decoded = bytes.and_then(|b| Ok(image::load_from_memory(&b)?.to_rgb8()));
            decoded
                .inspect_err(|e| log::warn!("Skipping captured preview {i}: {e}"))
                .ok()
        })
        .collect()
}

/// Decodes the previews and lays them out per [`ExportSettings::output_mode`].
#[must_use]
pub fn compose_previews(state: &PersistedState) -> Vec<RgbImage> {
    let images = decode_previews(state);
    match state.export.output_mode {
        OutputMode::Grid => vec![make_grid(&images, &state.export)],
        OutputMode::List if images.is_empty() => vec![blank(&state.export)],
        OutputMode::List => images,
    }
}

/// Tiles `images` row by row on a `bg_color` canvas. Cells take the size of
/// the first image; larger images are clipped to their cell.
#[must_use]
pub fn make_grid(images: &[RgbImage], export: &ExportSettings) -> RgbImage {
    let Some(first) = images.first() else {
        return blank(export);
    };
    let (width, height) = first.dimensions();
    let layout = GridLayout::for_images(images.len(), export.grid_columns);
    let mut canvas = RgbImage::from_pixel(width * layout.columns, height * layout.rows, Rgb(export.bg_color));

    for (i, image) in images.iter().enumerate() {
        let (x, y) = layout.cell_origin(i, width, height);
        let cell = imageops::crop_imm(image, 0, 0, width, height).to_image();
        imageops::replace(&mut canvas, &cell, i64::from(x), i64::from(y));
    }
    canvas
}

fn blank(export: &ExportSettings) -> RgbImage {
    RgbImage::from_pixel(BLANK_SIZE, BLANK_SIZE, Rgb(export.bg_color))
}

pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}
