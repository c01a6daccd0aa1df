use glam::Vec3;

use super::state::{ExportSettings, PersistedState};
use crate::editor::EditorEvent;
use crate::skeleton::{ManualPose, PoseSnapshot};
use crate::solver::ShapeParameters;

/// Receives the serialized state after every committed change.
pub type StateSink = Box<dyn FnMut(&str) + Send>;

/// Where the current state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateOrigin {
    /// Nothing has been initialised yet.
    #[default]
    Empty,
    Defaults,
    Persisted,
}

/// Keeps editor state and the host's serialized blob consistent.
///
/// Lifecycle rules:
/// - [`SyncLayer::init_defaults`] is idempotent and never replaces state that
///   is already present, so restoring before or after it gives the same
///   result: persisted values win.
/// - Every committed mutation rewrites the blob and notifies the sink.
///   Transient drag frames are never written.
pub struct SyncLayer {
    state: PersistedState,
    origin: StateOrigin,
    blob: String,
    writes: u64,
    sink: Option<StateSink>,
}

impl Default for SyncLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncLayer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: PersistedState::default(),
            origin: StateOrigin::Empty,
            blob: String::new(),
            writes: 0,
            sink: None,
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: StateSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Installs defaults unless state already exists.
    pub fn init_defaults(&mut self) {
        if self.origin != StateOrigin::Empty {
            log::debug!("State already initialised from {:?}; keeping it", self.origin);
            return;
        }
        self.state = PersistedState::default();
        self.origin = StateOrigin::Defaults;
    }

    /// Loads the host's serialized value. Always wins over defaults.
    ///
    /// The blob is stored as-is and not written back, so a reload does not
    /// count as a change.
    pub fn restore(&mut self, blob: &str) {
        self.state = PersistedState::from_json_lenient(blob);
        self.origin = StateOrigin::Persisted;
        self.blob = blob.to_string();
    }

    #[must_use]
    pub fn origin(&self) -> StateOrigin {
        self.origin
    }

    #[must_use]
    pub fn state(&self) -> &PersistedState {
        &self.state
    }

    /// The last value written for the host.
    #[must_use]
    pub fn blob(&self) -> &str {
        &self.blob
    }

    /// Number of write-throughs so far.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.writes
    }

    // ========================================================================
    // Committed mutations
    // ========================================================================

    pub fn commit_shape(&mut self, shape: ShapeParameters) {
        self.mutate(|s| s.mesh = shape);
    }

    /// Stores `pose` on the active tab.
    pub fn commit_pose(&mut self, pose: ManualPose) {
        self.mutate(|s| {
            let active = s.active_tab;
            s.poses[active].bones = pose;
        });
    }

    pub fn commit_model_rotation(&mut self, degrees: Vec3) {
        self.mutate(|s| {
            let active = s.active_tab;
            s.poses[active].model_rotation = degrees.to_array();
        });
    }

    pub fn commit_export(&mut self, export: ExportSettings) {
        self.mutate(|s| s.export = export);
    }

    pub fn commit_captured_images(&mut self, images: Vec<String>) {
        self.mutate(|s| s.captured_images = images);
    }

    /// Routes an editor event: only committed poses are written.
    /// Returns `true` when the event was persisted.
    pub fn apply_editor_event(&mut self, event: &EditorEvent) -> bool {
        match event {
            EditorEvent::Committed(pose) => {
                self.commit_pose(pose.clone());
                true
            }
            EditorEvent::PoseChanged(_) | EditorEvent::CameraChanged | EditorEvent::None => false,
        }
    }

    // ========================================================================
    // Tabs
    // ========================================================================

    #[must_use]
    pub fn active_tab(&self) -> usize {
        self.state.active_tab
    }

    #[must_use]
    pub fn active_pose(&self) -> &PoseSnapshot {
        self.state.active_pose()
    }

    #[must_use]
    pub fn tab_count(&self) -> usize {
        self.state.poses.len()
    }

    /// Appends an empty pose and selects it. Returns its index.
    pub fn add_tab(&mut self) -> usize {
        let name = self.unique_name(self.state.poses.len() + 1);
        self.mutate(|s| {
            s.poses.push(PoseSnapshot::named(name));
            s.active_tab = s.poses.len() - 1;
        });
        self.state.active_tab
    }

    /// Copies tab `index` right after itself and selects the copy.
    pub fn duplicate_tab(&mut self, index: usize) -> Option<usize> {
        let mut copy = self.state.poses.get(index)?.clone();
        copy.name = format!("{} (copy)", copy.name);
        self.mutate(|s| {
            s.poses.insert(index + 1, copy);
            s.active_tab = index + 1;
        });
        Some(index + 1)
    }

    /// Removes tab `index`. The last remaining tab cannot be removed.
    pub fn remove_tab(&mut self, index: usize) -> bool {
        if self.state.poses.len() <= 1 || index >= self.state.poses.len() {
            return false;
        }
        self.mutate(|s| {
            s.poses.remove(index);
            if s.active_tab > index || s.active_tab >= s.poses.len() {
                s.active_tab = s.active_tab.saturating_sub(1);
            }
        });
        true
    }

    pub fn rename_tab(&mut self, index: usize, name: impl Into<String>) -> bool {
        if index >= self.state.poses.len() {
            return false;
        }
        let name = name.into();
        self.mutate(|s| s.poses[index].name = name);
        true
    }

    /// Selects a tab; out-of-range indices select the last one.
    pub fn select_tab(&mut self, index: usize) -> usize {
        self.mutate(|s| s.active_tab = index);
        self.state.active_tab
    }

    fn unique_name(&self, mut n: usize) -> String {
        loop {
            let name = format!("Pose {n}");
            if self.state.poses.iter().all(|p| p.name != name) {
                return name;
            }
            n += 1;
        }
    }

    fn mutate(&mut self, change: impl FnOnce(&mut PersistedState)) {
        if self.origin == StateOrigin::Empty {
            self.init_defaults();
        }
        change(&mut self.state);
        self.state.normalize();
        self.write_through();
    }

    fn write_through(&mut self) {
        match self.state.to_json() {
            Ok(blob) => {
                self.writes += 1;
                if let Some(sink) = self.sink.as_mut() {
                    sink(&blob);
                }
                self.blob = blob;
            }
            Err(e) => log::error!("Failed to serialize pose data: {e}"),
        }
    }
}
