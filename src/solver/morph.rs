use glam::Vec3;

use super::factors::MacroFactors;

/// Target folder a morph target was found in; decides whether it is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetGroup {
    Macrodetails,
    Breast,
    Genitals,
}

impl TargetGroup {
    pub const ALL: [Self; 3] = [Self::Macrodetails, Self::Breast, Self::Genitals];

    #[must_use]
    pub fn folder(self) -> &'static str {
        match self {
            Self::Macrodetails => "macrodetails",
            Self::Breast => "breast",
            Self::Genitals => "genitals",
        }
    }
}

const CATEGORIES: &[(&str, &[&str])] = &[
    ("gender", &["male", "female"]),
    ("age", &["baby", "child", "young", "old"]),
    ("muscle", &["minmuscle", "averagemuscle", "maxmuscle"]),
    ("weight", &["minweight", "averageweight", "maxweight"]),
    ("height", &["minheight", "averageheight", "maxheight"]),
    ("race", &["african", "asian", "caucasian"]),
    ("cup", &["mincup", "averagecup", "maxcup"]),
    ("firmness", &["minfirmness", "averagefirmness", "maxfirmness"]),
];

/// One category → value assignment parsed from a target file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetTag {
    pub category: &'static str,
    pub value: &'static str,
}

/// A sparse vertex-delta morph target.
#[derive(Debug, Clone, PartialEq)]
pub struct MorphTarget {
    pub name: String,
    pub tags: Vec<TargetTag>,
    pub deltas: Vec<(u32, Vec3)>,
}

impl MorphTarget {
    #[must_use]
    pub fn new(name: impl Into<String>, deltas: Vec<(u32, Vec3)>) -> Self {
        let name = name.into();
        let tags = parse_tags(&name);
        Self { name, tags, deltas }
    }

    /// Product of the factors of every tag. A target with no tags weighs one.
    ///
    /// Evaluation stops as soon as the running product drops below `cutoff`
    /// and zero is returned.
    #[must_use]
    pub fn weight(&self, factors: &MacroFactors, cutoff: f32) -> f32 {
        let mut weight = 1.0;
        for tag in &self.tags {
            weight *= factors.factor(tag.value);
            if weight < cutoff {
                return 0.0;
            }
        }
        weight
    }

    /// Whether a target found in `group` takes part in macro solving.
    ///
    /// Folders also hold unrelated modifiers (e.g. breast distance) that must
    /// not be applied at full weight just because they carry no macro tag.
    #[must_use]
    pub fn is_macro_target(&self, group: TargetGroup) -> bool {
        match group {
            TargetGroup::Macrodetails => !self.tags.is_empty(),
            TargetGroup::Breast => self.has_category("cup"),
            TargetGroup::Genitals => self.tags.iter().any(|t| t.category.starts_with("penis")),
        }
    }

    #[must_use]
    pub fn has_category(&self, category: &str) -> bool {
        self.tags.iter().any(|t| t.category == category)
    }
}

/// Extracts macro tags from a target name such as
/// `universal-male-young-averagemuscle-averageweight`.
///
/// Later parts override earlier ones within the same category.
#[must_use]
pub fn parse_tags(name: &str) -> Vec<TargetTag> {
    let lower = name.to_lowercase();
    let stem = lower.strip_suffix(".target").unwrap_or(&lower);
    let stem = stem.rsplit(['/', '\\']).next().unwrap_or(stem);
    let parts: Vec<&str> = stem.split(['-', '_']).collect();

    let mut tags: Vec<TargetTag> = Vec::new();
    let mut set = |category: &'static str, value: &'static str| {
        match tags.iter_mut().find(|t| t.category == category) {
            Some(t) => t.value = value,
            None => tags.push(TargetTag { category, value }),
        }
    };

    for part in &parts {
        for (category, values) in CATEGORIES {
            if let Some(value) = values.iter().find(|v| *v == part) {
                set(*category, *value);
            }
        }
    }

    let has = |p: &str| parts.contains(&p);
    if has("penis") {
        let modifiers: [(&str, &'static str, &'static str, &'static str); 3] = [
            ("length", "penis_len", "penis-length-incr", "penis-length-decr"),
            ("circ", "penis_circ", "penis-circ-incr", "penis-circ-decr"),
            ("testicles", "penis_test", "penis-testicles-incr", "penis-testicles-decr"),
        ];
        for (part, category, incr, decr) in modifiers {
            if has(part) {
                if has("decr") {
                    set(category, decr);
                }
                if has("incr") {
                    set(category, incr);
                }
            }
        }
    }

    if has("universal") {
        set("universal", "universal");
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::params::ShapeParameters;

    #[test]
    fn parses_macro_name() {
        let tags = parse_tags("universal-female-old-maxmuscle-minweight.target");
        let values: Vec<_> = tags.iter().map(|t| t.value).collect();
        assert_eq!(values, ["female", "old", "maxmuscle", "minweight", "universal"]);
    }

    #[test]
    fn parses_genital_modifier() {
        let tags = parse_tags("penis-length-decr");
        assert_eq!(tags, [TargetTag { category: "penis_len", value: "penis-length-decr" }]);
    }

    #[test]
    fn untagged_breast_target_is_ignored() {
        let t = MorphTarget::new("breast-dist-decr", Vec::new());
        assert!(!t.is_macro_target(TargetGroup::Breast));
        let t = MorphTarget::new("female-young-averagemuscle-averageweight-maxcup-averagefirmness", Vec::new());
        assert!(t.is_macro_target(TargetGroup::Breast));
    }

    #[test]
    fn weight_is_product_of_factors() {
        let factors = MacroFactors::new(&ShapeParameters {
            gender: 1.0,
            ..Default::default()
        });
        let t = MorphTarget::new("universal-male-averagemuscle", Vec::new());
        assert!((t.weight(&factors, 0.001) - 1.0).abs() < 1e-6);
        let t = MorphTarget::new("universal-female-averagemuscle", Vec::new());
        assert_eq!(t.weight(&factors, 0.001), 0.0);
    }
}
