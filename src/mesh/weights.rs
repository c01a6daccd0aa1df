use glam::Vec3;
use smallvec::SmallVec;

use super::MAX_INFLUENCES;
use crate::skeleton::Skeleton;

/// One bone's contribution to a vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Influence {
    pub bone: u32,
    pub weight: f32,
}

pub type Influences = SmallVec<[Influence; MAX_INFLUENCES]>;

/// Normalised per-vertex bone influences.
///
/// Invariants after construction:
/// - every vertex has between 1 and `max_influences` entries
/// - weights of a vertex sum to 1
/// - vertices that received no weight are bound fully to the bone whose
///   rest head is closest
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexWeights {
    influences: Vec<Influences>,
    orphans: usize,
}

impl VertexWeights {
    /// Builds weights from raw `(bone, vertex, weight)` triples.
    ///
    /// Entries for the same vertex and bone are summed. Weights at or below
    /// `threshold` are discarded, only the `max_influences` largest survive,
    /// and the rest are renormalised. Out-of-range vertex or bone indices
    /// are skipped.
    pub fn from_entries<I>(
        entries: I,
        rest_vertices: &[Vec3],
        skeleton: &Skeleton,
        threshold: f32,
        max_influences: usize,
    ) -> Self
    where
        I: IntoIterator<Item = (usize, u32, f32)>,
    {
        let max_influences = max_influences.clamp(1, MAX_INFLUENCES);
        let mut raw: Vec<SmallVec<[Influence; 8]>> = vec![SmallVec::new(); rest_vertices.len()];
        let mut skipped = 0usize;

        for (bone, vertex, weight) in entries {
            let v = vertex as usize;
            if v >= rest_vertices.len() || bone >= skeleton.len() || !weight.is_finite() {
                skipped += 1;
                continue;
            }
            let bone = bone as u32;
            match raw[v].iter_mut().find(|i| i.bone == bone) {
                Some(existing) => existing.weight += weight,
                None => raw[v].push(Influence { bone, weight }),
            }
        }
        if skipped > 0 {
            log::warn!("Skipped {skipped} weight entries with invalid indices or values");
        }

        let mut orphans = 0;
        let influences = raw
            .into_iter()
            .enumerate()
            .map(|(v, mut list)| {
                list.retain(|i| i.weight > threshold);
                list.sort_by(|a, b| b.weight.total_cmp(&a.weight));
                list.truncate(max_influences);

                let mut out: Influences = list.into_iter().collect();
                if !normalize(&mut out) {
                    orphans += 1;
                    out.clear();
                    out.push(Influence {
                        bone: nearest_bone(skeleton, rest_vertices[v]),
                        weight: 1.0,
                    });
                }
                out
            })
            .collect();

        if orphans > 0 {
            log::warn!("Bound {orphans} unweighted vertices to their nearest bone head");
        }

        Self {
            influences,
            orphans,
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.influences.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.influences.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn vertex(&self, index: usize) -> &[Influence] {
        self.influences.get(index).map_or(&[], |i| i.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &[Influence]> {
        self.influences.iter().map(SmallVec::as_slice)
    }

    /// Number of vertices that were reassigned to their nearest bone.
    #[inline]
    #[must_use]
    pub fn orphan_count(&self) -> usize {
        self.orphans
    }

    /// Regroups the weights per bone: `result[bone] = (vertex indices, weights)`.
    #[must_use]
    pub fn per_bone(&self, bone_count: usize) -> Vec<(Vec<u32>, Vec<f32>)> {
        let mut out = vec![(Vec::new(), Vec::new()); bone_count];
        for (v, list) in self.influences.iter().enumerate() {
            for inf in list {
                if let Some((indices, weights)) = out.get_mut(inf.bone as usize) {
                    indices.push(v as u32);
                    weights.push(inf.weight);
                }
            }
        }
        out
    }
}

/// Scales weights to sum to one. Returns `false` when there is nothing to scale.
fn normalize(list: &mut Influences) -> bool {
    let sum: f32 = list.iter().map(|i| i.weight).sum();
    if !sum.is_finite() || sum <= f32::EPSILON {
        return false;
    }
    for inf in list.iter_mut() {
        inf.weight /= sum;
    }
    true
}

fn nearest_bone(skeleton: &Skeleton, point: Vec3) -> u32 {
    skeleton
        .bones()
        .iter()
        .enumerate()
        .map(|(i, b)| (i, b.rest_head.distance_squared(point)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map_or(0, |(i, _)| i as u32)
}
