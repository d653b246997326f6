use std::env;

use log::{info, warn};
use ml_lab::{LineDataSpec, ModelKind, NetSpec, Result, Session, TrendSpec, config, data};
use serde::de::DeserializeOwned;

const SEED_VAR: &str = "ML_LAB_SEED";
const TREND_VAR: &str = "ML_LAB_TREND_SPEC";
const NET_VAR: &str = "ML_LAB_NET_SPEC";

fn main() -> Result<()> {
    env_logger::init();

    let seed = env::var(SEED_VAR).ok().and_then(|raw| raw.parse().ok());

    let mut trend: TrendSpec = spec_from_env(TREND_VAR).unwrap_or_else(TrendSpec::snap_fit);
    let mut net: NetSpec = spec_from_env(NET_VAR).unwrap_or_else(NetSpec::pet_classifier);
    if seed.is_some() {
        trend.seed = seed;
        net.seed = seed;
    }

    let mut session = Session::new(trend, net)?;
    let mut rng = config::generate_rng(seed);

    session
        .linear_mut()
        .load(data::noisy_line(&LineDataSpec::default(), &mut rng));
    session.linear_mut().start()?;
    while !session.tick()?.is_terminal() {}

    let line = session.linear();
    info!(rounds = line.run().rounds(); "trend lesson finished");
    println!(
        "trend: m {:.4}, b {:.4} after {} rounds ({:.0}% of the error trained away)",
        line.model().m(),
        line.model().b(),
        line.run().rounds(),
        line.progress(),
    );

    session.activate(ModelKind::Network);
    session.network_mut().load(data::toy_clusters(&mut rng))?;
    session.network_mut().start()?;
    while !session.tick()?.is_terminal() {}

    let lesson = session.network();
    info!(epochs = lesson.run().rounds(); "classifier lesson finished");
    println!(
        "classifier: {} mistakes after {} epochs (best {})",
        lesson.mistakes().unwrap_or(0),
        lesson.run().rounds(),
        lesson.best_mistakes().unwrap_or(0),
    );

    let probe = ndarray::array![0.8, 0.6, 0.5];
    println!(
        "probe {probe} classified as {} with probs {}",
        lesson.predicted_class(probe.view())?,
        lesson.predict(probe.view())?,
    );

    Ok(())
}

/// Reads a JSON spec override from the environment; malformed values are
/// logged and ignored so the presets still run.
fn spec_from_env<T: DeserializeOwned>(var: &str) -> Option<T> {
    let raw = env::var(var).ok()?;
    match serde_json::from_str(&raw) {
        Ok(spec) => Some(spec),
        Err(e) => {
            warn!("ignoring {var}: {e}");
            None
        }
    }
}
