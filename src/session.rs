use log::{debug, info};
use ndarray::{Array1, ArrayView1};
use rand::rngs::StdRng;

use crate::{
    config::{self, NetSpec, NetStop, TrendSpec, TrendStop, TrendUpdate},
    data::{Point, SampleSet},
    error::{LabErr, Result},
    linear::{LinearModel, fit_least_squares},
    metrics,
    network::Classifier,
    run::{RunPhase, TrainRun},
};

/// One trend-line lesson: the dataset, the animated line, the run state
/// and the error readouts, advanced by external ticks.
///
/// The session owns no clock. The surrounding application calls [`tick`]
/// at whatever cadence it likes; each call performs at most the
/// configured number of update rounds and returns the resulting phase.
///
/// [`tick`]: LinearSession::tick
pub struct LinearSession {
    spec: TrendSpec,
    rng: StdRng,
    points: Vec<Point>,
    model: LinearModel,
    loaded: bool,
    initial_error: f64,
    current_error: f64,
    run: TrainRun,
}

impl LinearSession {
    pub fn new(spec: TrendSpec) -> Self {
        let rng = config::generate_rng(spec.seed);
        let run = TrainRun::new(spec.schedule.max_rounds);

        Self {
            rng,
            run,
            points: Vec::new(),
            model: LinearModel::new(fit_least_squares(&[])),
            loaded: false,
            initial_error: 0.0,
            current_error: 0.0,
            spec,
        }
    }

    /// Replaces the dataset, computes the least-squares target once, and
    /// resets the run. The working line moves to a fresh random start.
    pub fn load(&mut self, points: Vec<Point>) {
        let target = fit_least_squares(&points);
        debug!(m = target.m, b = target.b; "least-squares target computed");

        self.model = LinearModel::new(target);
        self.model
            .random_start(&self.spec.start_slope, &self.spec.start_intercept, &mut self.rng);
        self.points = points;
        self.loaded = true;
        self.run.reset();
        self.rebaseline();

        info!(points = self.points.len(); "trend dataset loaded");
    }

    /// Begins a run. The start is re-randomized every time, so this also
    /// serves as the re-initialization that leaves a terminal phase. A
    /// run already in progress is discarded.
    ///
    /// # Errors
    /// Returns `LabErr::NotReady` before any dataset is loaded; nothing
    /// mutates in that case.
    pub fn start(&mut self) -> Result<()> {
        if !self.loaded {
            return Err(LabErr::NotReady { op: "start" });
        }

        self.model
            .random_start(&self.spec.start_slope, &self.spec.start_intercept, &mut self.rng);
        self.run.begin();
        self.rebaseline();
        info!("trend run started");
        Ok(())
    }

    /// Cooperatively stops the run; the line stays where it is.
    pub fn halt(&mut self) {
        self.run.halt();
    }

    /// Re-randomizes the working line and resets the run to idle.
    pub fn reset(&mut self) {
        self.model
            .random_start(&self.spec.start_slope, &self.spec.start_intercept, &mut self.rng);
        self.run.reset();
        self.rebaseline();
    }

    /// Advances the run by one scheduling tick: up to the configured
    /// number of update rounds, each followed by evaluation and the
    /// stopping decision. Outside a running phase this is a no-op.
    pub fn tick(&mut self) -> RunPhase {
        let steps = self.run.increments(self.spec.schedule.steps_per_tick.get());

        for _ in 0..steps {
            if !self.run.phase().is_running() {
                break;
            }

            match self.spec.update {
                TrendUpdate::Blend { rate } => self.model.blend_step(rate),
                TrendUpdate::Descent { learning_rate } => {
                    self.model.descent_step(learning_rate, &self.points)
                }
            }
            self.run.record_round();

            self.current_error =
                metrics::mean_abs_error(&self.points, self.model.m(), self.model.b());
            let converged = self.stop_rule_holds();

            match self.run.observe(self.current_error, converged) {
                RunPhase::Converged => {
                    // A near-target finish pins the line to the fit exactly.
                    if matches!(self.spec.stop, TrendStop::NearTarget { .. }) {
                        self.model.snap_to_target();
                        self.current_error = metrics::mean_abs_error(
                            &self.points,
                            self.model.m(),
                            self.model.b(),
                        );
                    }
                    info!(rounds = self.run.rounds(); "trend run converged");
                }
                RunPhase::MaxedOut => {
                    info!(rounds = self.run.rounds(); "trend run hit its round ceiling");
                }
                _ => {}
            }
        }

        self.run.phase()
    }

    #[inline]
    pub fn predict(&self, x: f64) -> f64 {
        self.model.predict(x)
    }

    pub fn model(&self) -> &LinearModel {
        &self.model
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn run(&self) -> &TrainRun {
        &self.run
    }

    #[inline]
    pub fn phase(&self) -> RunPhase {
        self.run.phase()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn current_error(&self) -> f64 {
        self.current_error
    }

    pub fn initial_error(&self) -> f64 {
        self.initial_error
    }

    /// Share of the starting error trained away so far, in percent.
    pub fn progress(&self) -> f64 {
        metrics::progress(self.initial_error, self.current_error)
    }

    fn rebaseline(&mut self) {
        self.initial_error =
            metrics::mean_abs_error(&self.points, self.model.m(), self.model.b());
        self.current_error = self.initial_error;
    }

    fn stop_rule_holds(&self) -> bool {
        match self.spec.stop {
            TrendStop::NearTarget {
                slope_eps,
                intercept_eps,
            } => self.model.near_target(slope_eps, intercept_eps),
            TrendStop::ErrorBelow { limit } => self.current_error < limit,
            TrendStop::RoundLimit => false,
        }
    }
}

/// One classifier lesson: the net, its training set, the optional starter
/// warmup, the run state and the metric readouts.
///
/// Loading the training set keeps warm weights; `reset_model` and
/// starter loading re-draw them. Every load resets the run.
pub struct NetSession {
    spec: NetSpec,
    rng: StdRng,
    net: Classifier,
    data: Option<SampleSet>,
    starters: Option<SampleSet>,
    warmup_left: usize,
    run: TrainRun,
    mistakes: Option<usize>,
    last_loss: Option<f64>,
    history: Vec<f64>,
}

impl NetSession {
    /// # Errors
    /// Fails when the spec cannot build a net (zero layer size or an
    /// empty init range).
    pub fn new(spec: NetSpec) -> Result<Self> {
        let mut rng = config::generate_rng(spec.seed);
        let net = Classifier::init(&spec, &mut rng)?;

        Ok(Self {
            rng,
            net,
            data: None,
            starters: None,
            warmup_left: 0,
            run: TrainRun::new(spec.schedule.max_rounds),
            mistakes: None,
            last_loss: None,
            history: Vec::new(),
            spec,
        })
    }

    /// Loads the training set and resets the run. The weights are kept:
    /// a net warmed up on the starters goes on from where it stands.
    ///
    /// # Errors
    /// Returns `LabErr::SizeMismatch` if any sample does not fit the net;
    /// the previous set stays loaded in that case.
    pub fn load(&mut self, set: SampleSet) -> Result<()> {
        self.check_set(&set)?;
        let samples = set.len();

        self.mistakes = Some(metrics::count_mistakes(&self.net, &set)?);
        self.data = Some(set);
        self.run.reset();
        self.warmup_left = 0;
        self.last_loss = None;
        self.history.clear();

        info!(samples = samples; "training set loaded");
        Ok(())
    }

    /// Loads the fixed starter samples and re-initializes the net: the
    /// lesson restarts from fresh random weights with only the starters
    /// in hand. Any previously loaded training set is dropped.
    ///
    /// # Errors
    /// Returns `LabErr::SizeMismatch` if a starter does not fit the net,
    /// or an init error if the spec cannot re-draw parameters.
    pub fn load_starters(&mut self, set: SampleSet) -> Result<()> {
        self.check_set(&set)?;

        self.net = Classifier::init(&self.spec, &mut self.rng)?;
        self.mistakes = Some(metrics::count_mistakes(&self.net, &set)?);
        self.starters = Some(set);
        self.data = None;
        self.warmup_left = 0;
        self.run.reset();
        self.last_loss = None;
        self.history.clear();

        info!("starter samples loaded, net re-initialized");
        Ok(())
    }

    /// Re-draws the net's parameters and resets the run. Loaded data
    /// stays; the mistake readout is re-evaluated against the fresh net.
    pub fn reset_model(&mut self) -> Result<()> {
        self.net = Classifier::init(&self.spec, &mut self.rng)?;
        self.run.reset();
        self.warmup_left = 0;
        self.last_loss = None;
        self.history.clear();
        self.mistakes = match self.eval_set() {
            Some(set) => Some(metrics::count_mistakes(&self.net, set)?),
            None => None,
        };

        info!("classifier re-initialized");
        Ok(())
    }

    /// Begins a run over the loaded training set. When starters are
    /// loaded, the first rounds replay them one per tick before epoch
    /// training begins. From a terminal phase this is a no-op; reset or
    /// load first.
    ///
    /// # Errors
    /// Returns `LabErr::NotReady` until a training set is loaded; nothing
    /// mutates in that case.
    pub fn start(&mut self) -> Result<()> {
        if self.data.is_none() {
            return Err(LabErr::NotReady { op: "start" });
        }
        if self.run.phase().is_terminal() {
            debug!("start ignored, run already finished");
            return Ok(());
        }

        self.warmup_left = self.starters.as_ref().map_or(0, SampleSet::len);
        self.run.begin();
        info!(warmup = self.warmup_left; "classifier run started");
        Ok(())
    }

    /// Cooperatively stops the run; weights and readouts stay put.
    pub fn halt(&mut self) {
        self.run.halt();
    }

    /// Advances the run by one scheduling tick. A warmup round trains one
    /// starter sample; afterwards each increment is one full epoch over
    /// the training set, up to the configured number per tick. Every
    /// increment re-evaluates the mistake count and applies the stopping
    /// rule. Outside a running phase this is a no-op.
    pub fn tick(&mut self) -> Result<RunPhase> {
        if !self.run.phase().is_running() {
            return Ok(self.run.phase());
        }

        if self.warmup_left > 0 {
            if let Some(starters) = self.starters.as_ref() {
                let idx = starters.len() - self.warmup_left;
                let loss = self.net.train_sample(&starters.samples()[idx])?;
                self.last_loss = Some(loss);
            }
            self.warmup_left -= 1;
            self.run.record_round();
            self.evaluate()?;
            return Ok(self.run.phase());
        }

        let steps = self.run.increments(self.spec.schedule.steps_per_tick.get());
        for _ in 0..steps {
            if !self.run.phase().is_running() {
                break;
            }

            let Some(data) = self.data.as_ref() else {
                break;
            };
            let loss = self.net.train_epoch(data)?;
            self.last_loss = Some(loss);
            self.history.push(loss);
            self.run.record_round();
            self.evaluate()?;
        }

        Ok(self.run.phase())
    }

    /// Class probabilities for an input, without training.
    pub fn predict(&self, x: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        self.net.probs(x)
    }

    pub fn predicted_class(&self, x: ArrayView1<'_, f64>) -> Result<usize> {
        self.net.predicted_class(x)
    }

    pub fn net(&self) -> &Classifier {
        &self.net
    }

    pub fn run(&self) -> &TrainRun {
        &self.run
    }

    #[inline]
    pub fn phase(&self) -> RunPhase {
        self.run.phase()
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Mistakes on the current evaluation set, if one is loaded.
    pub fn mistakes(&self) -> Option<usize> {
        self.mistakes
    }

    /// Lowest mistake count seen during the current run.
    pub fn best_mistakes(&self) -> Option<usize> {
        self.run.best().map(|b| b as usize)
    }

    pub fn last_loss(&self) -> Option<f64> {
        self.last_loss
    }

    /// Mean epoch losses in training order, for the chart.
    pub fn loss_history(&self) -> &[f64] {
        &self.history
    }

    fn eval_set(&self) -> Option<&SampleSet> {
        self.data.as_ref().or(self.starters.as_ref())
    }

    fn check_set(&self, set: &SampleSet) -> Result<()> {
        for sample in set.samples() {
            if sample.features.len() != self.net.inputs() {
                return Err(LabErr::SizeMismatch {
                    what: "features",
                    got: sample.features.len(),
                    expected: self.net.inputs(),
                });
            }
            if sample.label >= self.net.outputs() {
                return Err(LabErr::SizeMismatch {
                    what: "label",
                    got: sample.label,
                    expected: self.net.outputs(),
                });
            }
        }
        Ok(())
    }

    fn evaluate(&mut self) -> Result<()> {
        let mistakes = match self.eval_set() {
            Some(set) => metrics::count_mistakes(&self.net, set)?,
            None => return Ok(()),
        };
        self.mistakes = Some(mistakes);

        let converged = match self.spec.stop {
            NetStop::NoMistakes => mistakes == 0,
            NetStop::RoundLimit => false,
        };

        match self.run.observe(mistakes as f64, converged) {
            RunPhase::Converged => {
                info!(rounds = self.run.rounds(); "classifier run converged")
            }
            RunPhase::MaxedOut => {
                info!(rounds = self.run.rounds(); "classifier run hit its epoch ceiling")
            }
            _ => {}
        }
        Ok(())
    }
}

/// Which lesson the surrounding application is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Linear,
    Network,
}

impl ModelKind {
    fn label(self) -> &'static str {
        match self {
            ModelKind::Linear => "linear",
            ModelKind::Network => "network",
        }
    }
}

/// Owns both lessons and routes ticks to the active one.
///
/// Switching halts the other lesson's run before the switch becomes
/// observable, so a shared readout never shows a metric that is still
/// moving.
pub struct Session {
    linear: LinearSession,
    network: NetSession,
    active: ModelKind,
}

impl Session {
    /// # Errors
    /// Fails when the classifier spec cannot build a net.
    pub fn new(trend: TrendSpec, net: NetSpec) -> Result<Self> {
        Ok(Self {
            linear: LinearSession::new(trend),
            network: NetSession::new(net)?,
            active: ModelKind::Linear,
        })
    }

    #[inline]
    pub fn active(&self) -> ModelKind {
        self.active
    }

    /// Switches the active lesson, halting the previous one's run.
    pub fn activate(&mut self, kind: ModelKind) {
        if kind == self.active {
            return;
        }

        match self.active {
            ModelKind::Linear => self.linear.halt(),
            ModelKind::Network => self.network.halt(),
        }
        self.active = kind;
        info!(model = kind.label(); "active model switched");
    }

    /// Ticks the active lesson and returns its phase.
    pub fn tick(&mut self) -> Result<RunPhase> {
        match self.active {
            ModelKind::Linear => Ok(self.linear.tick()),
            ModelKind::Network => self.network.tick(),
        }
    }

    pub fn linear(&self) -> &LinearSession {
        &self.linear
    }

    pub fn linear_mut(&mut self) -> &mut LinearSession {
        &mut self.linear
    }

    pub fn network(&self) -> &NetSession {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut NetSession {
        &mut self.network
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::LineDataSpec, data};

    fn seeded_trend() -> TrendSpec {
        TrendSpec {
            seed: Some(11),
            ..TrendSpec::snap_fit()
        }
    }

    fn seeded_net() -> NetSpec {
        NetSpec {
            seed: Some(11),
            ..NetSpec::pet_classifier()
        }
    }

    #[test]
    fn start_without_data_is_not_ready() {
        let mut session = LinearSession::new(seeded_trend());
        let err = session.start().unwrap_err();

        assert!(matches!(err, LabErr::NotReady { op: "start" }));
        assert_eq!(session.phase(), RunPhase::Idle);
        assert_eq!(session.run().rounds(), 0);
    }

    #[test]
    fn loading_exposes_the_dataset() {
        let mut session = LinearSession::new(seeded_trend());
        assert!(!session.is_loaded());
        assert!(session.points().is_empty());

        let mut rng = config::generate_rng(Some(3));
        let points = data::noisy_line(&LineDataSpec::default(), &mut rng);
        session.load(points.clone());

        assert!(session.is_loaded());
        assert_eq!(session.points(), points.as_slice());
    }

    #[test]
    fn switching_halts_the_running_lesson() {
        let mut session = Session::new(seeded_trend(), seeded_net()).unwrap();
        let mut rng = config::generate_rng(Some(3));
        let points = data::noisy_line(&LineDataSpec::default(), &mut rng);

        session.linear_mut().load(points);
        session.linear_mut().start().unwrap();
        assert_eq!(session.linear().phase(), RunPhase::Running);

        session.activate(ModelKind::Network);
        assert_eq!(session.active(), ModelKind::Network);
        assert_eq!(session.linear().phase(), RunPhase::Idle);
    }

    #[test]
    fn idle_ticks_are_noops() {
        let mut session = LinearSession::new(seeded_trend());
        let mut rng = config::generate_rng(Some(3));
        session.load(data::noisy_line(&LineDataSpec::default(), &mut rng));

        assert_eq!(session.tick(), RunPhase::Idle);
        assert_eq!(session.run().rounds(), 0);
    }
}
