use std::{num::NonZeroUsize, ops::Range};

use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

/// How far a run may go and how much work one scheduling tick performs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScheduleSpec {
    pub max_rounds: NonZeroUsize,
    pub steps_per_tick: NonZeroUsize,
}

/// The update rule a trend-line run applies each round.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendUpdate {
    /// Move a fixed fraction of the remaining distance toward the
    /// least-squares target. Not gradient descent; the target is the
    /// fixed point.
    Blend { rate: f64 },

    /// True gradient descent on the dataset's mean squared error.
    Descent { learning_rate: f64 },
}

/// When a trend-line run counts as converged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendStop {
    /// Both parameters within a strict epsilon of the target. On firing,
    /// the session snaps the parameters to the target exactly.
    NearTarget { slope_eps: f64, intercept_eps: f64 },

    /// Mean absolute error over the dataset below a limit.
    ErrorBelow { limit: f64 },

    /// No early stop; the run ends at the round ceiling.
    RoundLimit,
}

/// When a classifier run counts as converged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetStop {
    /// Zero misclassified samples on the training set.
    NoMistakes,

    /// No early stop; the run ends at the round ceiling.
    RoundLimit,
}

/// The specification for a trend-line session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendSpec {
    pub update: TrendUpdate,
    pub stop: TrendStop,
    pub schedule: ScheduleSpec,
    /// Sampling range for the randomized starting slope.
    pub start_slope: Range<f64>,
    /// Sampling range for the randomized starting intercept.
    pub start_intercept: Range<f64>,
    pub seed: Option<u64>,
}

impl TrendSpec {
    /// The animated lesson: blend toward the closed-form fit and snap to
    /// it once both parameters are within epsilon.
    pub fn snap_fit() -> Self {
        Self {
            update: TrendUpdate::Blend { rate: 0.115 },
            stop: TrendStop::NearTarget {
                slope_eps: 0.01,
                intercept_eps: 0.03,
            },
            schedule: ScheduleSpec {
                max_rounds: NonZeroUsize::new(90).unwrap(),
                steps_per_tick: NonZeroUsize::new(1).unwrap(),
            },
            start_slope: -0.4..0.5,
            start_intercept: 7.0..13.0,
            seed: None,
        }
    }

    /// The gradient-descent lesson: a fixed number of MSE descent rounds,
    /// two per tick, with no early stop.
    pub fn steady_descent() -> Self {
        Self {
            update: TrendUpdate::Descent {
                learning_rate: 0.032,
            },
            stop: TrendStop::RoundLimit,
            schedule: ScheduleSpec {
                max_rounds: NonZeroUsize::new(140).unwrap(),
                steps_per_tick: NonZeroUsize::new(2).unwrap(),
            },
            start_slope: -0.5..0.5,
            start_intercept: 6.5..12.5,
            seed: None,
        }
    }

    /// The error-threshold lesson: blend rounds until the mean absolute
    /// error over the dataset drops under 0.75.
    pub fn error_floor() -> Self {
        Self {
            stop: TrendStop::ErrorBelow { limit: 0.75 },
            ..Self::snap_fit()
        }
    }
}

/// The specification for a classifier session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetSpec {
    pub inputs: usize,
    pub hidden: usize,
    pub outputs: usize,
    pub learning_rate: f64,
    /// Half-width of the symmetric uniform range weights start in.
    pub weight_range: f64,
    /// Half-width of the symmetric uniform range biases start in.
    pub bias_range: f64,
    pub stop: NetStop,
    pub schedule: ScheduleSpec,
    pub seed: Option<u64>,
}

impl NetSpec {
    /// The risky-message lesson: a 3-2-2 net trained until it makes no
    /// mistakes on the loaded set, three epochs per tick.
    pub fn spam_filter() -> Self {
        Self {
            inputs: 3,
            hidden: 2,
            outputs: 2,
            learning_rate: 0.08,
            weight_range: 0.65,
            bias_range: 0.28,
            stop: NetStop::NoMistakes,
            schedule: ScheduleSpec {
                max_rounds: NonZeroUsize::new(200).unwrap(),
                steps_per_tick: NonZeroUsize::new(3).unwrap(),
            },
            seed: None,
        }
    }

    /// The three-class lesson: a 3-5-3 net trained for a fixed number of
    /// epochs, two per tick.
    pub fn pet_classifier() -> Self {
        Self {
            inputs: 3,
            hidden: 5,
            outputs: 3,
            learning_rate: 0.08,
            weight_range: 0.8,
            bias_range: 0.25,
            stop: NetStop::RoundLimit,
            schedule: ScheduleSpec {
                max_rounds: NonZeroUsize::new(180).unwrap(),
                steps_per_tick: NonZeroUsize::new(2).unwrap(),
            },
            seed: None,
        }
    }
}

/// Generative constants for a synthetic noisy-line dataset.
///
/// A range whose bounds coincide always yields that exact value, so a
/// zero-noise dataset is expressible as `noise: 0.0..0.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineDataSpec {
    pub points: usize,
    /// Range the hidden true slope is drawn from.
    pub slope: Range<f64>,
    /// Range the hidden true intercept is drawn from.
    pub intercept: Range<f64>,
    /// Range the x coordinates are drawn from.
    pub x: Range<f64>,
    /// Range of the uniform noise added to each y.
    pub noise: Range<f64>,
    pub y_min: f64,
    pub y_max: f64,
}

impl Default for LineDataSpec {
    fn default() -> Self {
        Self {
            points: 26,
            slope: 0.65..1.45,
            intercept: 2.0..6.6,
            x: 0.4..9.6,
            noise: -1.7..1.7,
            y_min: 0.4,
            y_max: 19.2,
        }
    }
}

impl LineDataSpec {
    /// The gentler variant used by the snap-fit lesson.
    pub fn low_noise() -> Self {
        Self {
            points: 26,
            slope: 0.68..1.45,
            intercept: 2.2..6.2,
            x: 0.5..9.5,
            noise: -1.3..1.3,
            y_min: 0.4,
            y_max: 19.2,
        }
    }
}

/// Resolves an optional seed into a concrete generator.
///
/// # Arguments
/// * `seed` - Fixed seed for reproducible runs, or `None` for an
///   OS-seeded generator.
pub fn generate_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
