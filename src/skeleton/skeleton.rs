use glam::{Affine3A, Vec3};
use rustc_hash::FxHashMap;

use super::bone::{is_singular, rest_matrix, Bone, BoneDefinition};
use super::euler::{euler_degrees_to_mat3, is_zero_rotation};
use super::pose::ManualPose;
use crate::errors::{PoseError, Result};

/// An ordered bone hierarchy with rest data and the current pose.
///
/// Bones are stored parents-first, so a single forward pass over
/// [`Skeleton::bones`] always visits a parent before its children.
/// Definition order is otherwise preserved.
///
/// Pose state (each bone's `local_rotation`) is applied with
/// [`Skeleton::update`], which refreshes the global and skinning matrices:
///
/// ```text
/// M_global[b]  = M_global[parent] · M_restLocal[b] · M_local[b]
/// M_skin[b]    = M_global[b] · inverse(M_globalRest[b])
/// ```
#[derive(Debug, Clone)]
pub struct Skeleton {
    bones: Vec<Bone>,
    lookup: FxHashMap<String, usize>,
    roots: Vec<usize>,

    // Rest data derived once per solve
    global_rest_inverse: Vec<Affine3A>,
    degenerate: Vec<usize>,

    // === Runtime Data ===
    pose_global: Vec<Affine3A>,
    skin: Vec<Affine3A>,
    posed: Vec<bool>,
    dirty: bool,
}

struct RestEntry {
    name: String,
    parent: Option<String>,
    head: Vec3,
    tail: Vec3,
    rest_global: Affine3A,
}

impl Skeleton {
    /// Builds a skeleton from head/tail/roll definitions.
    ///
    /// A bone whose parent never appears is logged and becomes a root.
    /// Duplicate names and cyclic parent chains are rejected.
    pub fn from_definitions(definitions: &[BoneDefinition]) -> Result<Self> {
        let entries = definitions
            .iter()
            .map(|d| RestEntry {
                name: d.name.clone(),
                parent: d.parent.clone(),
                head: d.head,
                tail: d.tail,
                rest_global: rest_matrix(d.head, d.tail, d.roll_normal),
            })
            .collect();
        Self::build(entries)
    }

    /// Builds a skeleton from explicit rest frames (e.g. the `restMatrix`
    /// values of a pose response). The roll normals of the definitions are
    /// ignored.
    pub fn from_rest_frames<I>(frames: I) -> Result<Self>
    where
        I: IntoIterator<Item = (BoneDefinition, Affine3A)>,
    {
        let entries = frames
            .into_iter()
            .map(|(d, rest_global)| RestEntry {
                name: d.name,
                parent: d.parent,
                head: d.head,
                tail: d.tail,
                rest_global,
            })
            .collect();
        Self::build(entries)
    }

    fn build(entries: Vec<RestEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(PoseError::DegenerateSkeleton("rig has no bones".into()));
        }

        let mut seen = FxHashMap::default();
        for (i, e) in entries.iter().enumerate() {
            if seen.insert(e.name.as_str(), i).is_some() {
                return Err(PoseError::DegenerateSkeleton(format!(
                    "duplicate bone name '{}'",
                    e.name
                )));
            }
        }

        let order = parents_first_order(&entries, &seen)?;
        drop(seen);

        let mut slots: Vec<Option<RestEntry>> = entries.into_iter().map(Some).collect();
        let mut bones: Vec<Bone> = Vec::with_capacity(order.len());
        let mut lookup: FxHashMap<String, usize> = FxHashMap::default();
        let mut roots = Vec::new();

        for old_index in order {
            let Some(entry) = slots[old_index].take() else {
                continue;
            };
            let index = bones.len();
            let parent = entry.parent.as_deref().and_then(|p| lookup.get(p).copied());

            let (rest_local, rest_local_offset) = match parent {
                Some(p) => {
                    let parent_bone: &Bone = &bones[p];
                    let local = if is_singular(&parent_bone.rest_global) {
                        log::warn!(
                            "Bone '{}' has a singular parent rest frame; using its global rest frame",
                            entry.name
                        );
                        entry.rest_global
                    } else {
                        parent_bone.rest_global.inverse() * entry.rest_global
                    };
                    (local, entry.head - parent_bone.rest_head)
                }
                None => (entry.rest_global, entry.head),
            };

            match parent {
                Some(p) => bones[p].children.push(index),
                None => roots.push(index),
            }

            lookup.insert(entry.name.clone(), index);
            bones.push(Bone {
                name: entry.name,
                parent,
                children: Vec::new(),
                rest_head: entry.head,
                rest_tail: entry.tail,
                length: (entry.tail - entry.head).length(),
                rest_local_offset,
                rest_global: entry.rest_global,
                rest_local,
                local_rotation: Vec3::ZERO,
            });
        }

        let count = bones.len();
        let mut skeleton = Self {
            bones,
            lookup,
            roots,
            global_rest_inverse: Vec::with_capacity(count),
            degenerate: Vec::new(),
            pose_global: vec![Affine3A::IDENTITY; count],
            skin: vec![Affine3A::IDENTITY; count],
            posed: vec![false; count],
            dirty: true,
        };
        skeleton.compute_rest_inverses();
        skeleton.update();
        Ok(skeleton)
    }

    /// `M_globalRest` is the pose chain with every local rotation at identity.
    fn compute_rest_inverses(&mut self) {
        let mut global_rest: Vec<Affine3A> = Vec::with_capacity(self.bones.len());
        self.global_rest_inverse.clear();
        self.degenerate.clear();

        for (i, bone) in self.bones.iter().enumerate() {
            let global = match bone.parent {
                Some(p) => global_rest[p] * bone.rest_local,
                None => bone.rest_local,
            };
            global_rest.push(global);

            if is_singular(&global) {
                log::warn!(
                    "Rest transform of bone '{}' is singular; substituting identity for its inverse",
                    bone.name
                );
                self.degenerate.push(i);
                self.global_rest_inverse.push(Affine3A::IDENTITY);
            } else {
                self.global_rest_inverse.push(global.inverse());
            }
        }
    }

    /// Replaces all rest data after a shape change, keeping the current
    /// local rotations of bones that still exist.
    pub fn retarget(&mut self, definitions: &[BoneDefinition]) -> Result<()> {
        let mut next = Self::from_definitions(definitions)?;
        for bone in &self.bones {
            if let Some(i) = next.find(&bone.name) {
                next.bones[i].local_rotation = bone.local_rotation;
            }
        }
        next.update();
        *self = next;
        Ok(())
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    #[inline]
    #[must_use]
    pub fn bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    #[inline]
    #[must_use]
    pub fn find(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    #[must_use]
    pub fn bone_by_name(&self, name: &str) -> Option<&Bone> {
        self.find(name).map(|i| &self.bones[i])
    }

    #[inline]
    #[must_use]
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Indices of bones whose rest inverse was replaced by identity.
    #[inline]
    #[must_use]
    pub fn degenerate_bones(&self) -> &[usize] {
        &self.degenerate
    }

    // ========================================================================
    // Pose
    // ========================================================================

    #[must_use]
    pub fn local_rotation(&self, index: usize) -> Vec3 {
        self.bones.get(index).map_or(Vec3::ZERO, |b| b.local_rotation)
    }

    /// Sets one bone's local rotation (degrees). Call [`Skeleton::update`]
    /// before reading matrices.
    pub fn set_local_rotation(&mut self, index: usize, degrees: Vec3) {
        if let Some(bone) = self.bones.get_mut(index) {
            bone.local_rotation = degrees;
            self.dirty = true;
        }
    }

    pub fn reset_pose(&mut self) {
        for bone in &mut self.bones {
            bone.local_rotation = Vec3::ZERO;
        }
        self.dirty = true;
    }

    /// Replaces the whole pose: bones named in `pose` get its rotation,
    /// every other bone returns to identity. Unknown names and non-finite
    /// angles are skipped. Returns the number of entries applied.
    pub fn apply_pose(&mut self, pose: &ManualPose) -> usize {
        self.reset_pose();
        let mut applied = 0;
        for (name, degrees) in pose.iter() {
            let Some(index) = self.find(name) else {
                log::warn!("Ignoring pose for unknown bone '{name}'");
                continue;
            };
            if !degrees.is_finite() {
                log::warn!("Ignoring non-finite rotation for bone '{name}'");
                continue;
            }
            self.bones[index].local_rotation = degrees;
            applied += 1;
        }
        self.update();
        applied
    }

    /// The current pose with zero rotations omitted.
    #[must_use]
    pub fn current_pose(&self) -> ManualPose {
        self.bones
            .iter()
            .filter(|b| !is_zero_rotation(b.local_rotation))
            .map(|b| (b.name.clone(), b.local_rotation))
            .collect()
    }

    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Recomputes global and skinning matrices for every bone.
    pub fn update(&mut self) {
        for i in 0..self.bones.len() {
            let bone = &self.bones[i];
            let own_posed = !is_zero_rotation(bone.local_rotation);
            let parent_posed = bone.parent.is_some_and(|p| self.posed[p]);
            let posed = own_posed || parent_posed;

            let global = local_chain(bone, bone.parent.map(|p| self.pose_global[p]));
            self.pose_global[i] = global;
            self.posed[i] = posed;
            // Unposed chains skin with an exact identity.
            self.skin[i] = if posed {
                global * self.global_rest_inverse[i]
            } else {
                Affine3A::IDENTITY
            };
        }
        self.dirty = false;
    }

    // ========================================================================
    // Matrices (valid after `update`)
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn pose_global(&self, index: usize) -> Affine3A {
        self.pose_global[index]
    }

    #[inline]
    #[must_use]
    pub fn skinning_matrix(&self, index: usize) -> Affine3A {
        self.skin[index]
    }

    #[inline]
    #[must_use]
    pub fn skinning_matrices(&self) -> &[Affine3A] {
        &self.skin
    }

    /// `true` when the bone or one of its ancestors carries a rotation.
    #[inline]
    #[must_use]
    pub fn is_posed(&self, index: usize) -> bool {
        self.posed[index]
    }

    #[inline]
    #[must_use]
    pub fn global_rest_inverse(&self, index: usize) -> Affine3A {
        self.global_rest_inverse[index]
    }

    #[must_use]
    pub fn posed_head(&self, index: usize) -> Vec3 {
        self.skin[index].transform_point3(self.bones[index].rest_head)
    }

    #[must_use]
    pub fn posed_tail(&self, index: usize) -> Vec3 {
        self.skin[index].transform_point3(self.bones[index].rest_tail)
    }

    /// Computes the posed global matrix of one bone from the current local
    /// rotations without touching cached state. Used by solvers that probe
    /// many candidate rotations between updates.
    #[must_use]
    pub fn evaluate_pose_global(&self, index: usize) -> Affine3A {
        let bone = &self.bones[index];
        let parent = bone.parent.map(|p| self.evaluate_pose_global(p));
        local_chain(bone, parent)
    }

    #[must_use]
    pub fn evaluate_skinning_matrix(&self, index: usize) -> Affine3A {
        self.evaluate_pose_global(index) * self.global_rest_inverse[index]
    }
}

#[inline]
fn local_chain(bone: &Bone, parent_global: Option<Affine3A>) -> Affine3A {
    let local = if is_zero_rotation(bone.local_rotation) {
        bone.rest_local
    } else {
        bone.rest_local * Affine3A::from_mat3(euler_degrees_to_mat3(bone.local_rotation))
    };
    match parent_global {
        Some(p) => p * local,
        None => local,
    }
}

/// Stable parents-first ordering. Missing parents demote a bone to root.
fn parents_first_order(entries: &[RestEntry], index_of: &FxHashMap<&str, usize>) -> Result<Vec<usize>> {
    let n = entries.len();
    let mut placed = vec![false; n];
    let mut order = Vec::with_capacity(n);

    for e in entries {
        if let Some(p) = e.parent.as_deref()
            && !index_of.contains_key(p)
        {
            log::warn!("Bone '{}' references missing parent '{p}'; treating it as a root", e.name);
        }
    }

    while order.len() < n {
        let before = order.len();
        for (i, e) in entries.iter().enumerate() {
            if placed[i] {
                continue;
            }
            let ready = match e.parent.as_deref().and_then(|p| index_of.get(p)) {
                Some(&p) => p != i && placed[p],
                None => true,
            };
            if ready {
                placed[i] = true;
                order.push(i);
            }
        }
        if order.len() == before {
            let stuck = entries
                .iter()
                .enumerate()
                .find(|(i, _)| !placed[*i])
                .map_or_else(String::new, |(_, e)| e.name.clone());
            return Err(PoseError::DegenerateSkeleton(format!(
                "cyclic parent chain at bone '{stuck}'"
            )));
        }
    }
    Ok(order)
}
