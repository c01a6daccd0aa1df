//! Macro factors: the weights of the MakeHuman macro morph targets as a
//! function of the body-shape sliders.

use super::params::ShapeParameters;

/// A min/average/max split of one slider. Exactly one of `min`/`max` is
/// non-zero on either side of the neutral position and the three always
/// sum to one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triplet {
    pub min: f32,
    pub average: f32,
    pub max: f32,
}

impl Triplet {
    #[must_use]
    pub fn from_slider(value: f32) -> Self {
        let max = (value * 2.0 - 1.0).max(0.0);
        let min = (1.0 - value * 2.0).max(0.0);
        Self {
            min,
            average: 1.0 - (max + min),
            max,
        }
    }

    const AVERAGE: Self = Self {
        min: 0.0,
        average: 1.0,
        max: 0.0,
    };
}

/// An increase/decrease pair for modifiers without an average target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IncrDecr {
    pub incr: f32,
    pub decr: f32,
}

impl IncrDecr {
    #[must_use]
    pub fn from_slider(value: f32) -> Self {
        Self {
            incr: (value * 2.0 - 1.0).max(0.0),
            decr: (1.0 - value * 2.0).max(0.0),
        }
    }

    const NEUTRAL: Self = Self { incr: 0.0, decr: 0.0 };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacroFactors {
    pub male: f32,
    pub female: f32,
    pub baby: f32,
    pub child: f32,
    pub young: f32,
    pub old: f32,
    pub muscle: Triplet,
    pub weight: Triplet,
    pub height: Triplet,
    pub cup: Triplet,
    pub firmness: Triplet,
    pub african: f32,
    pub asian: f32,
    pub caucasian: f32,
    pub penis_length: IncrDecr,
    pub penis_testicles: IncrDecr,
    pub penis_circ: IncrDecr,
}

impl MacroFactors {
    #[must_use]
    pub fn new(params: &ShapeParameters) -> Self {
        let age = params.normalized_age();
        let (baby, child, young, old) = if age < 0.5 {
            let young = ((age - 0.1875) * 3.2).max(0.0);
            let baby = (1.0 - age * 5.333).max(0.0);
            let child = ((5.333 * age).min(1.0) - young).max(0.0);
            (baby, child, young, 0.0)
        } else {
            let old = (age * 2.0 - 1.0).max(0.0);
            (0.0, 0.0, 1.0 - old, old)
        };

        let genital = IncrDecr::from_slider(params.genital_size);

        Self {
            male: params.gender,
            female: 1.0 - params.gender,
            baby,
            child,
            young,
            old,
            muscle: Triplet::from_slider(params.muscle),
            weight: Triplet::from_slider(params.weight),
            height: Triplet::from_slider(params.height),
            cup: Triplet::from_slider(params.breast_size),
            firmness: Triplet::AVERAGE,
            african: 0.333,
            asian: 0.333,
            caucasian: 0.334,
            penis_length: genital,
            penis_testicles: genital,
            penis_circ: IncrDecr::NEUTRAL,
        }
    }

    /// Weight of a single target tag. Unknown tags weigh zero.
    #[must_use]
    pub fn factor(&self, tag: &str) -> f32 {
        match tag {
            "universal" => 1.0,
            "male" => self.male,
            "female" => self.female,
            "baby" => self.baby,
            "child" => self.child,
            "young" => self.young,
            "old" => self.old,
            "minmuscle" => self.muscle.min,
            "averagemuscle" => self.muscle.average,
            "maxmuscle" => self.muscle.max,
            "minweight" => self.weight.min,
            "averageweight" => self.weight.average,
            "maxweight" => self.weight.max,
            "minheight" => self.height.min,
            "averageheight" => self.height.average,
            "maxheight" => self.height.max,
            "mincup" => self.cup.min,
            "averagecup" => self.cup.average,
            "maxcup" => self.cup.max,
            "minfirmness" => self.firmness.min,
            "averagefirmness" => self.firmness.average,
            "maxfirmness" => self.firmness.max,
            "african" => self.african,
            "asian" => self.asian,
            "caucasian" => self.caucasian,
            "penis-length-incr" => self.penis_length.incr,
            "penis-length-decr" => self.penis_length.decr,
            "penis-testicles-incr" => self.penis_testicles.incr,
            "penis-testicles-decr" => self.penis_testicles.decr,
            "penis-circ-incr" => self.penis_circ.incr,
            "penis-circ-decr" => self.penis_circ.decr,
            _ => 0.0,
        }
    }
}
