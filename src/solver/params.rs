use serde::{Deserialize, Serialize};

use crate::errors::{PoseError, Result};

/// Youngest age (years) of the age slider, maps to `0.0`.
pub const MIN_AGE_YEARS: f32 = 1.0;
/// Oldest age (years) of the age slider, maps to `1.0`.
pub const MAX_AGE_YEARS: f32 = 90.0;

/// Maps an age in years onto the solver's `[0, 1]` age range.
///
/// `normalize_age(1.0) == 0.0`, `normalize_age(90.0) == 1.0`. Values
/// outside the slider range are clamped.
#[inline]
#[must_use]
pub fn normalize_age(years: f32) -> f32 {
    ((years - MIN_AGE_YEARS) / (MAX_AGE_YEARS - MIN_AGE_YEARS)).clamp(0.0, 1.0)
}

/// Body-shape parameters as they appear on the wire and in persisted state.
///
/// `age` is in years; every other value is a normalised slider position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeParameters {
    pub age: f32,
    pub gender: f32,
    pub weight: f32,
    pub muscle: f32,
    pub height: f32,
    pub breast_size: f32,
    pub genital_size: f32,
}

impl Default for ShapeParameters {
    fn default() -> Self {
        Self {
            age: 25.0,
            gender: 0.5,
            weight: 0.5,
            muscle: 0.5,
            height: 0.5,
            breast_size: 0.5,
            genital_size: 0.5,
        }
    }
}

impl ShapeParameters {
    #[inline]
    #[must_use]
    pub fn normalized_age(&self) -> f32 {
        normalize_age(self.age)
    }

    /// Checks every value against its documented range.
    ///
    /// Age only needs to be finite (it is clamped by [`normalize_age`]);
    /// `height` accepts `[0, 2]`, the rest `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        let unit = [
            ("gender", self.gender),
            ("weight", self.weight),
            ("muscle", self.muscle),
            ("breast_size", self.breast_size),
            ("genital_size", self.genital_size),
        ];

        if !self.age.is_finite() {
            return Err(PoseError::InvalidShape {
                name: "age",
                value: self.age,
            });
        }
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(PoseError::InvalidShape { name, value });
            }
        }
        if !(0.0..=2.0).contains(&self.height) {
            return Err(PoseError::InvalidShape {
                name: "height",
                value: self.height,
            });
        }
        Ok(())
    }
}
