//! Minimal Wavefront OBJ reader for the MakeHuman base mesh.
//!
//! Only `v`, `g` and `f` records are read. Face corners may use any of the
//! `v`, `v/vt`, `v//vn` or `v/vt/vn` forms; indices are 1-based and
//! negative indices count back from the last vertex.

use std::path::Path;

use glam::Vec3;
use smallvec::SmallVec;

use crate::errors::{PoseError, Result};

pub type Polygon = SmallVec<[u32; 4]>;

/// Base mesh with per-face group names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjMesh {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<Polygon>,
    /// Index into `groups` for every face.
    pub face_groups: Vec<u32>,
    pub groups: Vec<String>,
}

impl ObjMesh {
    #[must_use]
    pub fn group_of(&self, face: usize) -> &str {
        self.face_groups
            .get(face)
            .and_then(|g| self.groups.get(*g as usize))
            .map_or("default", String::as_str)
    }
}

pub fn load_obj(path: &Path) -> Result<ObjMesh> {
    let source = std::fs::read_to_string(path)?;
    parse_obj(&source, &path.display().to_string())
}

pub fn parse_obj(source: &str, label: &str) -> Result<ObjMesh> {
    let mut mesh = ObjMesh::default();
    let mut current_group: Option<u32> = None;

    for (line_no, line) in source.lines().enumerate() {
        let line_no = line_no + 1;
        let mut fields = line.split_whitespace();
        match fields.next() {
            Some("v") => {
                let mut xyz = [0.0f32; 3];
                for slot in &mut xyz {
                    let field = fields
                        .next()
                        .ok_or_else(|| PoseError::parse("obj", label, line_no, "vertex needs three coordinates"))?;
                    *slot = field
                        .parse()
                        .map_err(|_| PoseError::parse("obj", label, line_no, format!("bad coordinate '{field}'")))?;
                }
                mesh.vertices.push(Vec3::from_array(xyz));
            }
            Some("g") => {
                let name = fields.next().unwrap_or("default").to_string();
                let index = match mesh.groups.iter().position(|g| *g == name) {
                    Some(i) => i,
                    None => {
                        mesh.groups.push(name);
                        mesh.groups.len() - 1
                    }
                };
                current_group = Some(index as u32);
            }
            Some("f") => {
                let group = match current_group {
                    Some(g) => g,
                    None => {
                        mesh.groups.push("default".to_string());
                        let g = (mesh.groups.len() - 1) as u32;
                        current_group = Some(g);
                        g
                    }
                };
                let mut polygon = Polygon::new();
                for corner in fields {
                    let index_str = corner.split('/').next().unwrap_or(corner);
                    let raw: i64 = index_str
                        .parse()
                        .map_err(|_| PoseError::parse("obj", label, line_no, format!("bad face index '{corner}'")))?;
                    polygon.push(resolve_index(raw, mesh.vertices.len(), label, line_no)?);
                }
                if polygon.len() < 3 {
                    return Err(PoseError::parse("obj", label, line_no, "face needs at least three corners"));
                }
                mesh.faces.push(polygon);
                mesh.face_groups.push(group);
            }
            _ => {}
        }
    }

    let count = mesh.vertices.len();
    for face in &mesh.faces {
        if let Some(&bad) = face.iter().find(|&&i| i as usize >= count) {
            return Err(PoseError::AssetIndexOutOfBounds {
                context: format!("face vertex in '{label}'"),
                index: bad as usize,
                len: count,
            });
        }
    }

    log::debug!(
        "Parsed OBJ '{label}': {} vertices, {} faces, {} groups",
        mesh.vertices.len(),
        mesh.faces.len(),
        mesh.groups.len()
    );
    Ok(mesh)
}

fn resolve_index(raw: i64, seen: usize, label: &str, line: usize) -> Result<u32> {
    let index = match raw {
        0 => return Err(PoseError::parse("obj", label, line, "face index 0 is invalid")),
        r if r > 0 => r - 1,
        r => seen as i64 + r,
    };
    u32::try_from(index).map_err(|_| PoseError::parse("obj", label, line, format!("face index {raw} out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_groups_and_corner_forms() {
        let src = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\ng body\nf 1/1/1 2//2 3 4\ng joint-head\nf -1 -2 -3\n";
        let mesh = parse_obj(src, "test").unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.faces[0].as_slice(), &[0, 1, 2, 3]);
        assert_eq!(mesh.faces[1].as_slice(), &[3, 2, 1]);
        assert_eq!(mesh.group_of(0), "body");
        assert_eq!(mesh.group_of(1), "joint-head");
    }

    #[test]
    fn out_of_range_face_is_an_error() {
        let err = parse_obj("v 0 0 0\nf 1 2 3\n", "test").unwrap_err();
        assert!(matches!(err, PoseError::AssetIndexOutOfBounds { .. }));
    }
}
