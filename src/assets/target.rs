use std::path::Path;

use glam::Vec3;

use crate::errors::{PoseError, Result};
use crate::solver::morph::MorphTarget;

/// Reads a MakeHuman `.target` file into a [`MorphTarget`] named after the
/// file stem.
pub fn load_target(path: &Path) -> Result<MorphTarget> {
    let source = std::fs::read_to_string(path)?;
    let label = path.display().to_string();
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| PoseError::parse("target", &label, 0, "file name is not valid UTF-8"))?;
    Ok(MorphTarget::new(name, parse_target(&source, &label)?))
}

/// Parses `index dx dy dz` lines. Blank lines and `#` comments are skipped.
pub fn parse_target(source: &str, label: &str) -> Result<Vec<(u32, Vec3)>> {
    let mut deltas = Vec::new();
    for (line_no, line) in source.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [index, dx, dy, dz] = fields.as_slice() else {
            return Err(PoseError::parse(
                "target",
                label,
                line_no + 1,
                format!("expected 4 fields, found {}", fields.len()),
            ));
        };
        let bad = |field: &str| PoseError::parse("target", label, line_no + 1, format!("bad number '{field}'"));
        let index: u32 = index.parse().map_err(|_| bad(index))?;
        let mut delta = [0.0f32; 3];
        for (slot, field) in delta.iter_mut().zip([dx, dy, dz]) {
            *slot = field.parse().map_err(|_| bad(field))?;
        }
        deltas.push((index, Vec3::from_array(delta)));
    }
    Ok(deltas)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_comments() {
        let d = parse_target("# header\n\n3 0.5 0 -1\n", "t").unwrap();
        assert_eq!(d, vec![(3, Vec3::new(0.5, 0.0, -1.0))]);
    }

    #[test]
    fn rejects_short_lines() {
        assert!(parse_target("3 0.5 0\n", "t").is_err());
    }
}
