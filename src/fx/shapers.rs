use serde::{Deserialize, Serialize};

/// Waveshaper signature: `(input, drive, grit) -> output`.
pub type Shaper = fn(f32, f32, f32) -> f32;

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum SaturationMode {
    Tape, // Symmetric tanh, grit adds odd harmonics
    Tube, // Asymmetric exponential, grit adds even harmonics
    Clip, // Soft-knee clipper, grit lowers and hardens the knee
    Fold, // Wavefolder, grit adds folds
}

impl std::fmt::Display for SaturationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tape => write!(f, "Tape"),
            Self::Tube => write!(f, "Tube"),
            Self::Clip => write!(f, "Clip"),
            Self::Fold => write!(f, "Fold"),
        }
    }
}

impl SaturationMode {
    pub const ALL: [Self; 4] = [Self::Tape, Self::Tube, Self::Clip, Self::Fold];

    /// Pure mode nearest to a type control value.
    pub fn from_control(kind: f32) -> Self {
        Self::ALL[(kind.clamp(0.0, 1.0) * 3.0).round() as usize]
    }

    #[inline]
    pub fn process(self, input: f32, drive: f32, grit: f32) -> f32 {
        SHAPERS[self as usize](input, drive, grit)
    }
}

/// Shapers in mode order; the type control crossfades between neighbours.
pub const SHAPERS: [Shaper; 4] = [tape, tube, clip, fold];

pub fn tape(x: f32, drive: f32, grit: f32) -> f32 {
    let g = drive.mul_add(8.0, 1.0);
    // Normalisation lifts |x| > 1 past unity at low drive
    let s = ((x * g).tanh() / g.tanh()).clamp(-1.0, 1.0);
    (grit * 0.8).mul_add(s * s * s - s, s)
}

pub fn tube(x: f32, drive: f32, grit: f32) -> f32 {
    let g = drive.mul_add(6.0, 1.0);
    let s = if x >= 0.0 {
        1.0 - (-x * g).exp()
    } else {
        -(1.0 - (x * g * 0.7).exp()) * 1.1
    };
    (grit * 0.6 * s * s).mul_add(1.0 - s.abs(), s).clamp(-1.0, 1.0)
}

pub fn clip(x: f32, drive: f32, grit: f32) -> f32 {
    let g = drive.mul_add(12.0, 1.0);
    let knee = grit.mul_add(-0.3, 0.85);
    let slope = grit.mul_add(5.0, 3.0);
    let driven = x * g;

    let shaped = if driven > knee {
        (1.0 - knee).mul_add(((driven - knee) * slope).tanh(), knee)
    } else if driven < -knee {
        -(1.0 - knee).mul_add(((-driven - knee) * slope).tanh(), knee)
    } else {
        driven
    };
    (shaped / (knee + 0.15)).clamp(-1.0, 1.0)
}

pub fn fold(x: f32, drive: f32, grit: f32) -> f32 {
    let g = grit.mul_add(4.0, drive.mul_add(4.0, 1.0));
    let mut driven = x * g;
    for _ in 0..4 {
        if driven > 1.0 {
            driven = 2.0 - driven;
        } else if driven < -1.0 {
            driven = -2.0 - driven;
        } else {
            break;
        }
    }
    // Inputs beyond four folds would otherwise escape the range
    driven.clamp(-1.0, 1.0) * 0.8
}

/// Mode index and crossfade fraction for a type control value.
#[inline]
fn mode_position(kind: f32) -> (usize, f32) {
    let scaled = kind.clamp(0.0, 1.0) * 3.0;
    let index = (scaled as usize).min(2);
    (index, scaled - index as f32)
}

/// Crossfade between the two shapers either side of `kind`.
///
/// `kind = 0` is pure tape and `kind = 1` pure fold; the boundaries at 1/3
/// and 2/3 are pure tube and pure clip.
#[inline]
pub fn blend(x: f32, drive: f32, grit: f32, kind: f32) -> f32 {
    let (index, frac) = mode_position(kind);
    let a = SHAPERS[index](x, drive, grit);
    let b = SHAPERS[index + 1](x, drive, grit);
    frac.mul_add(b - a, a)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(steps: usize, lo: f32, hi: f32) -> impl Iterator<Item = f32> + Clone {
        (0..=steps).map(move |i| lo + (hi - lo) * i as f32 / steps as f32)
    }

    #[test]
    fn shapers_stay_bounded() {
        for mode in SaturationMode::ALL {
            for drive in grid(10, 0.0, 1.0) {
                for grit in grid(10, 0.0, 1.0) {
                    for x in grid(400, -10.0, 10.0) {
                        let y = mode.process(x, drive, grit);
                        assert!(
                            y.is_finite() && (-1.5..=1.5).contains(&y),
                            "{mode}({x}, {drive}, {grit}) = {y}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn fold_is_limited_to_point_eight() {
        for x in grid(1000, -10.0, 10.0) {
            assert!(fold(x, 1.0, 1.0).abs() <= 0.8 + 1e-6);
        }
        // 1.5 reflects to 0.5, then scales by 0.8.
        assert!((fold(1.5, 0.0, 0.0) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn tape_without_drive_is_normalised_tanh() {
        for x in grid(200, -1.0, 1.0) {
            let expected = x.tanh() / 1.0f32.tanh();
            assert!((tape(x, 0.0, 0.0) - expected).abs() < 1e-6);
        }
        assert!((tape(1.0, 0.0, 0.0) - 1.0).abs() < 1e-6);
        assert!((tape(-1.0, 0.0, 0.0) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn tape_holds_unity_beyond_full_scale() {
        for grit in grid(10, 0.0, 1.0) {
            for x in grid(100, 1.0, 10.0) {
                let y = tape(x, 0.0, grit);
                assert!(y.abs() <= 1.0 + 1e-6, "tape({x}, 0, {grit}) = {y}");
                assert!((tape(-x, 0.0, grit) + y).abs() < 1e-6);
            }
        }
        // Saturated input sits at the clamp whatever the grit.
        assert_eq!(tape(-10.0, 0.0, 0.3), -1.0);
    }

    #[test]
    fn tube_is_asymmetric() {
        let pos = tube(0.5, 0.5, 0.0);
        let neg = tube(-0.5, 0.5, 0.0);
        assert!(pos > 0.0 && neg < 0.0);
        assert!((pos + neg).abs() > 1e-3);
    }

    #[test]
    fn clip_is_linear_below_the_knee() {
        // drive 0, grit 0: knee 0.85, gain 1, renormalised by 1/1.0
        assert!((clip(0.5, 0.0, 0.0) - 0.5).abs() < 1e-6);
        assert!(clip(5.0, 1.0, 0.0) <= 1.0);
    }

    #[test]
    fn blend_hits_pure_modes_at_zone_edges() {
        let (x, drive, grit) = (0.4, 0.5, 0.3);
        assert_eq!(blend(x, drive, grit, 0.0), tape(x, drive, grit));
        assert!((blend(x, drive, grit, 1.0 / 3.0) - tube(x, drive, grit)).abs() < 1e-5);
        assert!((blend(x, drive, grit, 2.0 / 3.0) - clip(x, drive, grit)).abs() < 1e-5);
        assert!((blend(x, drive, grit, 1.0) - fold(x, drive, grit)).abs() < 1e-6);

        let halfway = blend(x, drive, grit, 0.5);
        let expected = 0.5 * (tube(x, drive, grit) + clip(x, drive, grit));
        assert!((halfway - expected).abs() < 1e-5);
    }

    #[test]
    fn mode_zones_and_names() {
        assert_eq!(SaturationMode::from_control(0.0), SaturationMode::Tape);
        assert_eq!(SaturationMode::from_control(0.4), SaturationMode::Tube);
        assert_eq!(SaturationMode::from_control(0.7), SaturationMode::Clip);
        assert_eq!(SaturationMode::from_control(0.9), SaturationMode::Fold);
        assert_eq!(SaturationMode::from_control(1.0), SaturationMode::Fold);
        assert_eq!(SaturationMode::Fold.to_string(), "Fold");
    }
}
