use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::{
    config::NetSpec,
    data::{Sample, SampleSet},
    error::{LabErr, Result},
};

/// Additive epsilon keeping the cross-entropy log away from zero.
pub(crate) const LOSS_EPS: f64 = 1e-9;

#[inline]
pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Softmax over a logit vector. Subtracts the maximum before
/// exponentiating so extreme logits stay finite; the result sums to 1
/// with every entry in (0, 1).
pub fn softmax(z: ArrayView1<'_, f64>) -> Array1<f64> {
    let max = z.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
    let mut out = z.mapv(|v| (v - max).exp());
    let sum = out.sum();
    out /= sum;
    out
}

/// One-hot vector with a 1 at `label`. `label` must be below `classes`.
pub fn one_hot(label: usize, classes: usize) -> Array1<f64> {
    let mut v = Array1::zeros(classes);
    v[label] = 1.0;
    v
}

/// Index of the largest entry; ties break toward the lower index.
fn argmax(v: &Array1<f64>) -> usize {
    let mut best = 0;
    for (i, &p) in v.iter().enumerate().skip(1) {
        if p > v[best] {
            best = i;
        }
    }
    best
}

/// Outer product of a column vector and a row vector.
fn outer(col: &Array1<f64>, row: &Array1<f64>) -> Array2<f64> {
    let col = col.view().insert_axis(Axis(1));
    let row = row.view().insert_axis(Axis(0));
    col.dot(&row)
}

/// Activations produced by one forward pass.
#[derive(Debug, Clone)]
pub struct Forward {
    /// Hidden-layer activations (sigmoid outputs).
    pub hidden: Array1<f64>,
    /// Softmax class probabilities.
    pub probs: Array1<f64>,
}

/// A two-layer feed-forward classifier: affine, sigmoid, affine, softmax.
///
/// Shapes are fixed at construction: `w1` is hidden × inputs, `w2` is
/// outputs × hidden. Parameters are mutated only by the training
/// operations, one whole sample step at a time.
#[derive(Debug, Clone)]
pub struct Classifier {
    w1: Array2<f64>,
    b1: Array1<f64>,
    w2: Array2<f64>,
    b2: Array1<f64>,
    learning_rate: f64,
}

impl Classifier {
    /// Builds a classifier from explicit parameters.
    ///
    /// # Errors
    /// Returns `LabErr::SizeMismatch` if any dimension is zero or the
    /// bias/weight shapes disagree.
    pub fn from_parts(
        w1: Array2<f64>,
        b1: Array1<f64>,
        w2: Array2<f64>,
        b2: Array1<f64>,
        learning_rate: f64,
    ) -> Result<Self> {
        if w1.ncols() == 0 {
            return Err(LabErr::SizeMismatch {
                what: "inputs",
                got: 0,
                expected: 1,
            });
        }
        if w1.nrows() == 0 {
            return Err(LabErr::SizeMismatch {
                what: "hidden units",
                got: 0,
                expected: 1,
            });
        }
        if w2.nrows() == 0 {
            return Err(LabErr::SizeMismatch {
                what: "outputs",
                got: 0,
                expected: 1,
            });
        }
        if b1.len() != w1.nrows() {
            return Err(LabErr::SizeMismatch {
                what: "hidden biases",
                got: b1.len(),
                expected: w1.nrows(),
            });
        }
        if w2.ncols() != w1.nrows() {
            return Err(LabErr::SizeMismatch {
                what: "output weights",
                got: w2.ncols(),
                expected: w1.nrows(),
            });
        }
        if b2.len() != w2.nrows() {
            return Err(LabErr::SizeMismatch {
                what: "output biases",
                got: b2.len(),
                expected: w2.nrows(),
            });
        }

        Ok(Self {
            w1,
            b1,
            w2,
            b2,
            learning_rate,
        })
    }

    /// Draws fresh parameters uniformly from the spec's symmetric ranges.
    /// Deliberately unscaled (no Xavier/He): the lessons start from plain
    /// uniform noise.
    ///
    /// # Errors
    /// Returns `LabErr::EmptyRange` if a range half-width is not positive,
    /// or `LabErr::SizeMismatch` if a layer size is zero.
    pub fn init<R: Rng>(spec: &NetSpec, rng: &mut R) -> Result<Self> {
        let weights = Uniform::new(-spec.weight_range, spec.weight_range)
            .map_err(|_| LabErr::EmptyRange { what: "weights" })?;
        let biases = Uniform::new(-spec.bias_range, spec.bias_range)
            .map_err(|_| LabErr::EmptyRange { what: "biases" })?;

        let w1 = Array2::from_shape_fn((spec.hidden, spec.inputs), |_| weights.sample(rng));
        let b1 = Array1::from_shape_fn(spec.hidden, |_| biases.sample(rng));
        let w2 = Array2::from_shape_fn((spec.outputs, spec.hidden), |_| weights.sample(rng));
        let b2 = Array1::from_shape_fn(spec.outputs, |_| biases.sample(rng));

        Self::from_parts(w1, b1, w2, b2, spec.learning_rate)
    }

    #[inline]
    pub fn inputs(&self) -> usize {
        self.w1.ncols()
    }

    #[inline]
    pub fn hidden_size(&self) -> usize {
        self.w1.nrows()
    }

    #[inline]
    pub fn outputs(&self) -> usize {
        self.w2.nrows()
    }

    #[inline]
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Weight views for rendering edges; the renderer never mutates.
    pub fn w1(&self) -> ArrayView2<'_, f64> {
        self.w1.view()
    }

    pub fn b1(&self) -> ArrayView1<'_, f64> {
        self.b1.view()
    }

    pub fn w2(&self) -> ArrayView2<'_, f64> {
        self.w2.view()
    }

    pub fn b2(&self) -> ArrayView1<'_, f64> {
        self.b2.view()
    }

    /// Full forward pass. Pure: identical inputs give identical outputs
    /// until a training step mutates the parameters.
    ///
    /// # Errors
    /// Returns `LabErr::SizeMismatch` if `x` is not `inputs` long.
    pub fn forward(&self, x: ArrayView1<'_, f64>) -> Result<Forward> {
        self.check_features(x.len())?;

        let z1 = self.w1.dot(&x) + &self.b1;
        let hidden = z1.mapv(sigmoid);
        let z2 = self.w2.dot(&hidden) + &self.b2;
        let probs = softmax(z2.view());

        Ok(Forward { hidden, probs })
    }

    /// Class probabilities for `x`.
    pub fn probs(&self, x: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        Ok(self.forward(x)?.probs)
    }

    /// Highest-probability class for `x`; ties go to the lower index.
    pub fn predicted_class(&self, x: ArrayView1<'_, f64>) -> Result<usize> {
        Ok(argmax(&self.probs(x)?))
    }

    /// One backpropagation + gradient-descent step on a single sample.
    ///
    /// All gradients are derived from the pre-update forward pass, then
    /// every parameter moves by `-learning_rate * gradient` in one shot.
    /// No averaging: this is online stochastic descent even when a caller
    /// loops it over a whole dataset.
    ///
    /// Returns the sample's pre-update cross-entropy loss.
    ///
    /// # Errors
    /// Returns `LabErr::SizeMismatch` on a wrong feature length or a
    /// label outside the output range.
    pub fn train_sample(&mut self, sample: &Sample) -> Result<f64> {
        let outputs = self.outputs();
        if sample.label >= outputs {
            return Err(LabErr::SizeMismatch {
                what: "label",
                got: sample.label,
                expected: outputs,
            });
        }

        let Forward { hidden, probs } = self.forward(sample.features.view())?;
        let loss = -(probs[sample.label] + LOSS_EPS).ln();

        // Combined softmax + cross-entropy gradient at the output.
        let dz2 = &probs - &one_hot(sample.label, outputs);
        let dw2 = outer(&dz2, &hidden);

        // Sigmoid derivative written via its own output.
        let mut dz1 = self.w2.t().dot(&dz2);
        dz1.zip_mut_with(&hidden, |d, &a| *d *= a * (1.0 - a));
        let dw1 = outer(&dz1, &sample.features);

        let lr = self.learning_rate;
        self.w2.scaled_add(-lr, &dw2);
        self.b2.scaled_add(-lr, &dz2);
        self.w1.scaled_add(-lr, &dw1);
        self.b1.scaled_add(-lr, &dz1);

        Ok(loss)
    }

    /// Sweeps the set once in order, one update per sample. Returns the
    /// mean per-sample cross-entropy; an empty set trains nothing and
    /// reports zero loss.
    pub fn train_epoch(&mut self, set: &SampleSet) -> Result<f64> {
        if set.is_empty() {
            return Ok(0.0);
        }

        let mut total = 0.0;
        for sample in set.samples() {
            total += self.train_sample(sample)?;
        }

        Ok(total / set.len() as f64)
    }

    fn check_features(&self, got: usize) -> Result<()> {
        let expected = self.inputs();
        if got != expected {
            return Err(LabErr::SizeMismatch {
                what: "features",
                got,
                expected,
            });
        }
        Ok(())
    }
}
