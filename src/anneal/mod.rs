//! Path annealer.
//!
//! Orders and orients pen strokes to minimize the pen-up travel between
//! the end of one stroke and the start of the next. This is a
//! double-ended variant of the travelling salesman path problem, solved
//! with simulated annealing over a block-reversal-with-flip move whose
//! energy delta is computed from the two affected junctions only.
//!
//! # References
//!
//! - Kirkpatrick, Gelatt & Vecchi (1983), "Optimization by Simulated Annealing"
//! - Lin (1965), "Computer Solutions of the Traveling Salesman Problem" (2-opt)

mod config;
mod runner;
mod types;

pub use config::{AnnealConfig, TemperatureSchedule};
pub use runner::{optimize, AnnealProgress, AnnealResult, AnnealRunner};
pub use types::{Arrangement, Snapshot};
