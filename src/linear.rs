use std::ops::Range;

use rand::Rng;

use crate::data::{self, Point};

/// All-x-equal cutoff for the least-squares denominator.
const DEGENERATE_EPS: f64 = 1e-9;

/// A slope/intercept pair, usually the closed-form least-squares fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitLine {
    pub m: f64,
    pub b: f64,
}

/// Closed-form simple linear regression over `points`.
///
/// Degenerate inputs fall back to a flat line: all-equal x gives slope 0
/// through the mean y, and an empty set gives the zero line. Never fails.
pub fn fit_least_squares(points: &[Point]) -> FitLine {
    if points.is_empty() {
        return FitLine { m: 0.0, b: 0.0 };
    }

    let n = points.len() as f64;
    let mut sx = 0.0;
    let mut sy = 0.0;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for p in points {
        sx += p.x;
        sy += p.y;
        sxy += p.x * p.y;
        sxx += p.x * p.x;
    }

    let den = n * sxx - sx * sx;
    if den.abs() < DEGENERATE_EPS {
        return FitLine { m: 0.0, b: sy / n };
    }

    let m = (n * sxy - sx * sy) / den;
    let b = (sy - m * sx) / n;
    FitLine { m, b }
}

/// The trend line the learner watches: a working slope/intercept pair plus
/// the least-squares target it is trained toward.
///
/// The target is computed once at dataset-load time and never changes
/// during a run. The working pair starts flat; `random_start` moves it
/// somewhere visually interesting before training begins.
#[derive(Debug, Clone)]
pub struct LinearModel {
    m: f64,
    b: f64,
    target: FitLine,
}

impl LinearModel {
    pub fn new(target: FitLine) -> Self {
        Self {
            m: 0.0,
            b: 0.0,
            target,
        }
    }

    #[inline]
    pub fn m(&self) -> f64 {
        self.m
    }

    #[inline]
    pub fn b(&self) -> f64 {
        self.b
    }

    #[inline]
    pub fn target(&self) -> FitLine {
        self.target
    }

    #[inline]
    pub fn predict(&self, x: f64) -> f64 {
        self.m * x + self.b
    }

    /// Moves the working parameters to a random point away from the target
    /// so the animated convergence has somewhere to go. Collapsed ranges
    /// pin a parameter exactly.
    pub fn random_start<R: Rng>(
        &mut self,
        slope: &Range<f64>,
        intercept: &Range<f64>,
        rng: &mut R,
    ) {
        self.m = data::draw(rng, slope);
        self.b = data::draw(rng, intercept);
    }

    /// One blend round: move a fixed fraction of the remaining distance
    /// toward the target. The target is the fixed point, so repeated
    /// rounds converge monotonically on a geometric schedule.
    pub fn blend_step(&mut self, rate: f64) {
        self.m += (self.target.m - self.m) * rate;
        self.b += (self.target.b - self.b) * rate;
    }

    /// One gradient-descent round on the dataset's mean squared error.
    /// Empty datasets leave the parameters untouched.
    pub fn descent_step(&mut self, learning_rate: f64, points: &[Point]) {
        if points.is_empty() {
            return;
        }

        let n = points.len() as f64;
        let mut dm = 0.0;
        let mut db = 0.0;
        for p in points {
            let err = self.m * p.x + self.b - p.y;
            dm += 2.0 * err * p.x / n;
            db += 2.0 * err / n;
        }

        self.m -= learning_rate * dm;
        self.b -= learning_rate * db;
    }

    /// Whether both parameters are strictly within epsilon of the target.
    pub fn near_target(&self, slope_eps: f64, intercept_eps: f64) -> bool {
        (self.target.m - self.m).abs() < slope_eps
            && (self.target.b - self.b).abs() < intercept_eps
    }

    /// Pins the working pair to the target exactly. Invoked when a
    /// near-target stopping rule fires, so a converged line is the fit,
    /// not an approximation of it.
    pub fn snap_to_target(&mut self) {
        self.m = self.target.m;
        self.b = self.target.b;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::mean_sq_error;

    fn line(points: &[(f64, f64)]) -> Vec<Point> {
        points.iter().map(|&(x, y)| Point { x, y }).collect()
    }

    #[test]
    fn exact_fit_through_two_points() {
        let fit = fit_least_squares(&line(&[(0.0, 1.0), (1.0, 3.0)]));

        assert!((fit.m - 2.0).abs() < 1e-12);
        assert!((fit.b - 1.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_x_gives_flat_mean_line() {
        let fit = fit_least_squares(&line(&[(2.0, 1.0), (2.0, 3.0), (2.0, 8.0)]));

        assert_eq!(fit.m, 0.0);
        assert!((fit.b - 4.0).abs() < 1e-12);
    }

    #[test]
    fn empty_fit_is_zero_line() {
        assert_eq!(fit_least_squares(&[]), FitLine { m: 0.0, b: 0.0 });
    }

    #[test]
    fn blend_fixed_point_is_target() {
        let mut model = LinearModel::new(FitLine { m: 1.5, b: -2.0 });
        model.snap_to_target();
        model.blend_step(0.115);

        assert_eq!(model.m(), 1.5);
        assert_eq!(model.b(), -2.0);
    }

    #[test]
    fn descent_reduces_mse() {
        let points = line(&[(0.0, 4.0), (2.0, 6.0), (4.0, 8.0), (6.0, 10.0)]);
        let mut model = LinearModel::new(fit_least_squares(&points));

        let before = mean_sq_error(&points, model.m(), model.b());
        for _ in 0..50 {
            model.descent_step(0.032, &points);
        }
        let after = mean_sq_error(&points, model.m(), model.b());

        assert!(after < before);
    }

    #[test]
    fn descent_on_empty_is_noop() {
        let mut model = LinearModel::new(FitLine { m: 1.0, b: 4.0 });
        model.descent_step(0.032, &[]);

        assert_eq!(model.m(), 0.0);
        assert_eq!(model.b(), 0.0);
    }
}
