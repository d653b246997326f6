pub mod config;
pub mod data;
pub mod error;
pub mod linear;
pub mod metrics;
pub mod network;
pub mod run;
pub mod session;

pub use config::{LineDataSpec, NetSpec, NetStop, ScheduleSpec, TrendSpec, TrendStop, TrendUpdate};
pub use data::{Point, Sample, SampleSet};
pub use error::{LabErr, Result};
pub use linear::{FitLine, LinearModel};
pub use network::{Classifier, Forward};
pub use run::{RunPhase, TrainRun};
pub use session::{LinearSession, ModelKind, NetSession, Session};
