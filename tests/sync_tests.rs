//! Sync Layer Tests
//!
//! Tests for:
//! - Persisted state winning over defaults regardless of order
//! - Write-through on committed mutations only
//! - Lenient parsing of malformed and partial blobs
//! - Pose tab management
//! - Batch export: one pose per tab, LIST and GRID preview composition

mod common;

use std::sync::Arc;

use glam::Vec3;
use image::{Rgb, RgbImage};
use parking_lot::Mutex;

use common::stick_service;
use pose_studio::editor::EditorEvent;
use pose_studio::protocol::PoseResponse;
use pose_studio::skeleton::{ManualPose, PoseSnapshot};
use pose_studio::solver::ShapeParameters;
use pose_studio::sync::export::encode_png;
use pose_studio::sync::{
    encode_png_data_url, BatchExport, ExportSettings, OutputMode, PersistedState, StateOrigin, SyncLayer,
};

const SAVED: &str = r#"{
    "mesh": {"age": 60, "gender": 0.2},
    "poses": [
        {"name": "Wave", "bones": {"upperarm_l": [0, 0, 80]}, "modelRotation": [0, 45, 0]},
        {"name": "Rest", "bones": {}}
    ],
    "activeTab": 1,
    "export": {"view_width": 1024, "output_mode": "GRID"}
}"#;

fn recording_layer() -> (SyncLayer, Arc<Mutex<Vec<String>>>) {
    let written = Arc::new(Mutex::new(Vec::new()));
    let sink = written.clone();
    let layer = SyncLayer::new().with_sink(Box::new(move |blob: &str| sink.lock().push(blob.to_string())));
    (layer, written)
}

// ============================================================================
// Initialisation Order
// ============================================================================

#[test]
fn persisted_state_wins_after_defaults() {
    let mut layer = SyncLayer::new();
    layer.init_defaults();
    layer.restore(SAVED);

    assert_eq!(layer.origin(), StateOrigin::Persisted);
    assert_eq!(layer.state().mesh.age, 60.0);
    assert_eq!(layer.active_pose().name, "Rest");
}

#[test]
fn persisted_state_wins_before_defaults() {
    let mut layer = SyncLayer::new();
    layer.restore(SAVED);
    layer.init_defaults();

    assert_eq!(layer.origin(), StateOrigin::Persisted);
    assert_eq!(layer.state().mesh.age, 60.0);
    assert_eq!(layer.tab_count(), 2);
}

#[test]
fn defaults_are_idempotent() {
    let mut layer = SyncLayer::new();
    layer.init_defaults();
    layer.commit_shape(ShapeParameters {
        age: 40.0,
        ..Default::default()
    });
    layer.init_defaults();
    assert_eq!(layer.state().mesh.age, 40.0);
}

#[test]
fn restore_does_not_write_back() {
    let (mut layer, written) = recording_layer();
    layer.restore(SAVED);
    assert_eq!(layer.writes(), 0);
    assert!(written.lock().is_empty());
    assert_eq!(layer.blob(), SAVED);
}

// ============================================================================
// Write-Through
// ============================================================================

#[test]
fn only_committed_editor_events_are_written() {
    let (mut layer, written) = recording_layer();
    layer.init_defaults();
    let pose = ManualPose::new().with("spine", Vec3::new(0.0, 0.0, 15.0));

    assert!(!layer.apply_editor_event(&EditorEvent::PoseChanged(pose.clone())));
    assert!(!layer.apply_editor_event(&EditorEvent::CameraChanged));
    assert_eq!(layer.writes(), 0);

    assert!(layer.apply_editor_event(&EditorEvent::Committed(pose.clone())));
    assert_eq!(layer.writes(), 1);
    assert_eq!(layer.active_pose().bones, pose);

    let blobs = written.lock();
    assert_eq!(blobs.len(), 1);
    assert_eq!(blobs[0], layer.blob());
}

#[test]
fn written_blob_restores_identically() {
    let mut layer = SyncLayer::new();
    layer.restore(SAVED);
    layer.commit_pose(ManualPose::new().with("root", Vec3::new(5.0, 0.0, 0.0)));
    layer.commit_model_rotation(Vec3::new(0.0, 90.0, 0.0));

    let mut reloaded = SyncLayer::new();
    reloaded.restore(layer.blob());
    assert_eq!(reloaded.state(), layer.state());
}

#[test]
fn committed_zero_rotations_are_dropped() {
    let mut layer = SyncLayer::new();
    layer.commit_pose(
        ManualPose::new()
            .with("spine", Vec3::ZERO)
            .with("root", Vec3::new(0.0, 10.0, 0.0)),
    );
    let bones = &layer.active_pose().bones;
    assert_eq!(bones.len(), 1);
    assert!(bones.get("spine").is_none());
    // Committing without an explicit init installs defaults first.
    assert_eq!(layer.origin(), StateOrigin::Defaults);
}

// ============================================================================
// Lenient Parsing
// ============================================================================

#[test]
fn malformed_blob_yields_defaults() {
    for blob in ["", "not json", "[1, 2, 3]", "null"] {
        assert_eq!(PersistedState::from_json_lenient(blob), PersistedState::default(), "{blob:?}");
    }
}

#[test]
fn bad_fields_fall_back_individually() {
    let state = PersistedState::from_json_lenient(
        r#"{"mesh": "tall", "poses": [], "activeTab": 7,
            "export": {"grid_columns": 0, "cam_zoom": 1.5}, "extra": {"ignored": true}}"#,
    );
    assert_eq!(state.mesh, ShapeParameters::default());
    assert_eq!(state.poses.len(), 1);
    assert_eq!(state.active_tab, 0);
    assert_eq!(state.export.grid_columns, 2);
    assert_eq!(state.export.cam_zoom, 1.5);
}

#[test]
fn export_settings_parse_and_keep_keys() {
    let state = PersistedState::from_json_lenient(SAVED);
    assert_eq!(state.export.view_width, 1024);
    assert_eq!(state.export.view_height, ExportSettings::default().view_height);
    assert_eq!(state.export.output_mode, OutputMode::Grid);

    let value: serde_json::Value = serde_json::from_str(&state.to_json().unwrap()).unwrap();
    assert_eq!(value["activeTab"], 1);
    assert_eq!(value["export"]["output_mode"], "GRID");
    assert_eq!(value["poses"][0]["modelRotation"][1], 45.0);
}

// ============================================================================
// Tabs
// ============================================================================

#[test]
fn add_tab_picks_unused_name_and_selects_it() {
    let mut layer = SyncLayer::new();
    layer.init_defaults();
    layer.rename_tab(0, "Pose 2");

    let index = layer.add_tab();
    assert_eq!(index, 1);
    assert_eq!(layer.active_tab(), 1);
    assert_eq!(layer.active_pose().name, "Pose 3");
}

#[test]
fn duplicate_tab_copies_pose_after_source() {
    let mut layer = SyncLayer::new();
    layer.restore(SAVED);

    assert_eq!(layer.duplicate_tab(0), Some(1));
    assert_eq!(layer.tab_count(), 3);
    let copy = layer.active_pose();
    assert_eq!(copy.name, "Wave (copy)");
    assert_eq!(copy.bones.get("upperarm_l"), Some(Vec3::new(0.0, 0.0, 80.0)));
    assert_eq!(layer.state().poses[2].name, "Rest");
    assert_eq!(layer.duplicate_tab(9), None);
}

#[test]
fn last_tab_cannot_be_removed() {
    let mut layer = SyncLayer::new();
    layer.restore(SAVED);

    assert!(layer.remove_tab(0));
    assert_eq!(layer.tab_count(), 1);
    assert_eq!(layer.active_tab(), 0);
    assert_eq!(layer.active_pose().name, "Rest");

    let writes = layer.writes();
    assert!(!layer.remove_tab(0));
    assert_eq!(layer.writes(), writes);
}

#[test]
fn select_tab_clamps_to_last() {
    let mut layer = SyncLayer::new();
    layer.restore(SAVED);
    assert_eq!(layer.select_tab(5), 1);
    assert_eq!(layer.select_tab(0), 0);
}

// ============================================================================
// Batch Export
// ============================================================================

const BG: [u8; 3] = [10, 20, 30];
const TILE_COLORS: [[u8; 3]; 3] = [[255, 0, 0], [0, 255, 0], [0, 0, 255]];

fn three_tab_state(mode: OutputMode) -> PersistedState {
    let mut state = PersistedState::default();
    state.poses = vec![
        PoseSnapshot {
            name: "Wave".to_string(),
            bones: ManualPose::new().with("upperarm_l", Vec3::new(0.0, 0.0, 60.0)),
            model_rotation: [0.0; 3],
        },
        PoseSnapshot {
            name: "Turned".to_string(),
            bones: ManualPose::new(),
            model_rotation: [0.0, 90.0, 0.0],
        },
        PoseSnapshot::named("Rest"),
    ];
    state.export.output_mode = mode;
    state.export.grid_columns = 2;
    state.export.bg_color = BG;
    state.captured_images = TILE_COLORS
        .iter()
        .map(|c| encode_png_data_url(&encode_png(&RgbImage::from_pixel(4, 3, Rgb(*c))).unwrap()))
        .collect();
    state
}

#[test]
fn grid_export_poses_every_tab_and_tiles_previews() {
    let service = stick_service();
    let export = BatchExport::run(&service, &three_tab_state(OutputMode::Grid));

    assert_eq!(export.frames.len(), 3);
    assert!(export.frames.iter().all(PoseResponse::is_success));
    let wave = export.frames[0].applied_pose.as_ref().unwrap();
    assert_eq!(wave.get("upperarm_l"), Some(Vec3::new(0.0, 0.0, 60.0)));
    // Same bones, different model rotation.
    assert_ne!(export.frames[1].vertices, export.frames[2].vertices);

    assert_eq!(export.images.len(), 1);
    let grid = &export.images[0];
    assert_eq!(grid.dimensions(), (8, 6));
    assert_eq!(grid.get_pixel(0, 0), &Rgb(TILE_COLORS[0]));
    assert_eq!(grid.get_pixel(4, 0), &Rgb(TILE_COLORS[1]));
    assert_eq!(grid.get_pixel(3, 5), &Rgb(TILE_COLORS[2]));
    // Fourth cell stays background.
    assert_eq!(grid.get_pixel(4, 3), &Rgb(BG));
    assert_eq!(grid.get_pixel(7, 5), &Rgb(BG));
}

#[test]
fn list_export_keeps_one_image_per_readable_preview() {
    let mut state = three_tab_state(OutputMode::List);
    state.captured_images.insert(1, "data:image/png;base64,AAAA".to_string());
    let export = BatchExport::run(&stick_service(), &state);

    assert_eq!(export.images.len(), 3);
    for (image, color) in export.images.iter().zip(TILE_COLORS) {
        assert_eq!(image.dimensions(), (4, 3));
        assert_eq!(image.get_pixel(2, 1), &Rgb(color));
    }
    assert_eq!(export.encode_images().unwrap().len(), 3);
}

#[test]
fn export_without_previews_yields_background_placeholder() {
    let mut state = three_tab_state(OutputMode::Grid);
    state.captured_images.clear();
    let export = BatchExport::run(&stick_service(), &state);

    assert_eq!(export.frames.len(), 3);
    assert_eq!(export.images.len(), 1);
    assert_eq!(export.images[0].dimensions(), (512, 512));
    assert_eq!(export.images[0].get_pixel(100, 100), &Rgb(BG));
}
