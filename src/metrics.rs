use crate::{
    data::{Point, SampleSet},
    error::{LabErr, Result},
    network::{Classifier, LOSS_EPS},
};

/// Mean absolute error of the line `(m, b)` over `points`. An empty
/// dataset reports zero error rather than dividing by zero.
pub fn mean_abs_error(points: &[Point], m: f64, b: f64) -> f64 {
    if points.is_empty() {
        return 0.0;
    }

    let total: f64 = points.iter().map(|p| (m * p.x + b - p.y).abs()).sum();
    total / points.len() as f64
}

/// Mean squared error of the line `(m, b)` over `points`. An empty
/// dataset reports zero error.
pub fn mean_sq_error(points: &[Point], m: f64, b: f64) -> f64 {
    if points.is_empty() {
        return 0.0;
    }

    let total: f64 = points
        .iter()
        .map(|p| {
            let err = m * p.x + b - p.y;
            err * err
        })
        .sum();
    total / points.len() as f64
}

/// Number of samples whose predicted class differs from the label.
/// An empty set reports zero mistakes.
///
/// # Errors
/// Returns `LabErr::SizeMismatch` if a sample does not fit the net.
pub fn count_mistakes(net: &Classifier, set: &SampleSet) -> Result<usize> {
    let mut mistakes = 0;
    for sample in set.samples() {
        if net.predicted_class(sample.features.view())? != sample.label {
            mistakes += 1;
        }
    }
    Ok(mistakes)
}

/// Mean cross-entropy of the net over the set, without training.
/// An empty set reports zero loss.
///
/// # Errors
/// Returns `LabErr::SizeMismatch` if a sample does not fit the net.
pub fn mean_cross_entropy(net: &Classifier, set: &SampleSet) -> Result<f64> {
    if set.is_empty() {
        return Ok(0.0);
    }

    let mut total = 0.0;
    for sample in set.samples() {
        if sample.label >= net.outputs() {
            return Err(LabErr::SizeMismatch {
                what: "label",
                got: sample.label,
                expected: net.outputs(),
            });
        }
        let probs = net.probs(sample.features.view())?;
        total += -(probs[sample.label] + LOSS_EPS).ln();
    }

    Ok(total / set.len() as f64)
}

/// Share of the initial error trained away, as a percentage clamped to
/// [0, 100]. A non-positive initial error counts as fully trained.
pub fn progress(initial: f64, current: f64) -> f64 {
    if initial <= 0.0 {
        return 100.0;
    }
    (100.0 * (1.0 - current / initial)).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, Array2, array};

    use super::*;
    use crate::data::Sample;

    #[test]
    fn abs_error_by_hand() {
        let points = [Point { x: 0.0, y: 1.0 }, Point { x: 2.0, y: 2.0 }];

        // Line y = x: residuals 1 and 0.
        assert!((mean_abs_error(&points, 1.0, 0.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn sq_error_by_hand() {
        let points = [Point { x: 0.0, y: 2.0 }, Point { x: 1.0, y: 0.0 }];

        // Line y = 0: residuals 2 and 0, squares 4 and 0.
        assert!((mean_sq_error(&points, 0.0, 0.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn empty_inputs_report_zero() {
        let net = biased_net(array![1.0, 0.0]);
        let empty = SampleSet::new(vec![], 2);

        assert_eq!(mean_abs_error(&[], 1.0, 1.0), 0.0);
        assert_eq!(mean_sq_error(&[], 1.0, 1.0), 0.0);
        assert_eq!(count_mistakes(&net, &empty).unwrap(), 0);
        assert_eq!(mean_cross_entropy(&net, &empty).unwrap(), 0.0);
    }

    #[test]
    fn mistakes_counted_against_labels() {
        // Zero weights leave only the output biases, so the net always
        // predicts class 0.
        let net = biased_net(array![1.0, 0.0]);
        let set = SampleSet::new(
            vec![
                Sample {
                    features: array![0.1, 0.2, 0.3],
                    label: 0,
                },
                Sample {
                    features: array![0.4, 0.5, 0.6],
                    label: 1,
                },
                Sample {
                    features: array![0.7, 0.8, 0.9],
                    label: 1,
                },
            ],
            2,
        );

        assert_eq!(count_mistakes(&net, &set).unwrap(), 2);
    }

    #[test]
    fn cross_entropy_rejects_bad_label() {
        let net = biased_net(array![1.0, 0.0]);
        let set = SampleSet::new(
            vec![Sample {
                features: array![0.1, 0.2, 0.3],
                label: 5,
            }],
            2,
        );

        assert!(matches!(
            mean_cross_entropy(&net, &set).unwrap_err(),
            LabErr::SizeMismatch { what: "label", .. }
        ));
    }

    #[test]
    fn progress_clamps() {
        assert_eq!(progress(0.0, 1.0), 100.0);
        assert_eq!(progress(4.0, 0.0), 100.0);
        assert_eq!(progress(4.0, 8.0), 0.0);
        assert!((progress(4.0, 1.0) - 75.0).abs() < 1e-12);
    }

    fn biased_net(b2: Array1<f64>) -> Classifier {
        let hidden = 2;
        let outputs = b2.len();
        Classifier::from_parts(
            Array2::zeros((hidden, 3)),
            Array1::zeros(hidden),
            Array2::zeros((outputs, hidden)),
            b2,
            0.1,
        )
        .unwrap()
    }
}
