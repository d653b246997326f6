use std::ops::Range;

use ndarray::Array1;
use rand::Rng;

use crate::config::LineDataSpec;

/// One observed (x, y) pair for the trend-line lessons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// One labeled observation for the classifier lessons.
#[derive(Debug, Clone)]
pub struct Sample {
    pub features: Array1<f64>,
    pub label: usize,
}

/// A collection of labeled samples together with its class count.
///
/// Immutable once generated; regeneration replaces the whole set.
#[derive(Debug, Clone)]
pub struct SampleSet {
    samples: Vec<Sample>,
    classes: usize,
}

impl SampleSet {
    pub fn new(samples: Vec<Sample>, classes: usize) -> Self {
        Self { samples, classes }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of distinct class labels the set was generated for.
    pub fn classes(&self) -> usize {
        self.classes
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Cluster centers for the three-class lesson. Each center is emitted as-is
/// plus two jittered copies, giving 27 samples.
const CLUSTER_CENTERS: [([f64; 3], usize); 9] = [
    ([0.82, 0.62, 0.55], 0),
    ([0.75, 0.70, 0.48], 0),
    ([0.66, 0.58, 0.64], 0),
    ([0.35, 0.55, 0.84], 1),
    ([0.28, 0.45, 0.74], 1),
    ([0.42, 0.69, 0.88], 1),
    ([0.90, 0.26, 0.35], 2),
    ([0.80, 0.34, 0.28], 2),
    ([0.93, 0.22, 0.40], 2),
];

const CLUSTER_COPIES: usize = 2;
const CLUSTER_JITTER: f64 = 0.08;

/// The fixed risky-message samples shown before the full set is generated.
/// Label 0 is risky, label 1 is safe.
const STARTERS: [([f64; 3], usize); 5] = [
    ([0.95, 0.90, 0.10], 0),
    ([0.12, 0.12, 0.92], 1),
    ([0.88, 0.95, 0.22], 0),
    ([0.08, 0.15, 0.95], 1),
    ([0.86, 0.78, 0.18], 0),
];

const RISK_NOISE: f64 = 0.16;
const RISK_CUTOFF: f64 = 0.2;

/// Draws uniformly from `range`, or returns the bound itself when the
/// range is collapsed. Keeps zero-noise and fixed-start configurations
/// valid.
pub(crate) fn draw<R: Rng>(rng: &mut R, range: &Range<f64>) -> f64 {
    if range.is_empty() {
        range.start
    } else {
        rng.random_range(range.clone())
    }
}

/// Synthesizes noisy observations around a hidden straight line.
///
/// The true slope and intercept are drawn once per call and never leave
/// this function; the learner only ever sees the noisy points.
///
/// # Arguments
/// * `spec` - Point count, sampling ranges and the y clamp.
/// * `rng` - A random number generator.
pub fn noisy_line<R: Rng>(spec: &LineDataSpec, rng: &mut R) -> Vec<Point> {
    let slope = draw(rng, &spec.slope);
    let intercept = draw(rng, &spec.intercept);

    (0..spec.points)
        .map(|_| {
            let x = draw(rng, &spec.x);
            let noise = draw(rng, &spec.noise);
            let y = (slope * x + intercept + noise).clamp(spec.y_min, spec.y_max);
            Point { x, y }
        })
        .collect()
}

/// Builds the 27-sample, 3-class toy set from the hand-authored cluster
/// centers: each center plus two jittered copies, features clamped to [0, 1].
pub fn toy_clusters<R: Rng>(rng: &mut R) -> SampleSet {
    let mut samples = Vec::with_capacity(CLUSTER_CENTERS.len() * (1 + CLUSTER_COPIES));

    for (center, label) in CLUSTER_CENTERS {
        samples.push(Sample {
            features: center.into_iter().collect(),
            label,
        });
        for _ in 0..CLUSTER_COPIES {
            let jittered = center.map(|v| {
                (v + rng.random_range(-CLUSTER_JITTER..CLUSTER_JITTER)).clamp(0.0, 1.0)
            });
            samples.push(Sample {
                features: jittered.into_iter().collect(),
                label,
            });
        }
    }

    SampleSet::new(samples, 3)
}

/// Generates `n` risky-message samples from the closed-form rule: three
/// uniform features (link risk, urgency, sender trust), a noisy linear
/// score, and label 0 (risky) whenever the score clears the cutoff.
pub fn risk_set<R: Rng>(n: usize, rng: &mut R) -> SampleSet {
    let mut samples = Vec::with_capacity(n);

    for _ in 0..n {
        let link = rng.random::<f64>();
        let urgency = rng.random::<f64>();
        let trust = rng.random::<f64>();
        let noise = rng.random_range(-RISK_NOISE..RISK_NOISE);

        let score = 1.35 * link + 1.05 * urgency - 1.45 * trust + noise;
        let label = if score > RISK_CUTOFF { 0 } else { 1 };

        samples.push(Sample {
            features: Array1::from_vec(vec![link, urgency, trust]),
            label,
        });
    }

    SampleSet::new(samples, 2)
}

/// The five fixed starter samples of the risky-message lesson.
pub fn starter_set() -> SampleSet {
    let samples = STARTERS
        .into_iter()
        .map(|(features, label)| Sample {
            features: features.into_iter().collect(),
            label,
        })
        .collect();

    SampleSet::new(samples, 2)
}

/// Maps a scalar risk level in [0, 1] to the three-feature vector the
/// prediction slider feeds the classifier.
pub fn risk_features(risk: f64) -> Array1<f64> {
    let r = risk.clamp(0.0, 1.0);

    let link = 0.05 + 0.90 * r;
    let urgency = 0.08 + 0.84 * r.powf(1.08);
    let trust = 0.95 - 0.90 * r;

    Array1::from_vec(vec![
        link.clamp(0.0, 1.0),
        urgency.clamp(0.0, 1.0),
        trust.clamp(0.0, 1.0),
    ])
}
