//! Pen-plotter path ordering.
//!
//! Takes the strokes of a vector drawing, grouped by pen, and reorders and
//! reorients them so the tool spends as little time as possible travelling
//! with the pen up:
//!
//! - **Path Annealer** ([`anneal`]): simulated annealing over arrangements
//!   of reversible strokes with an O(1) block-reversal move, a cooling
//!   schedule, a wall-clock budget with shrink-and-resume retries, and
//!   best-so-far tracking.
//! - **Pen plans** ([`pens`]): per-pen optimization and travel reports,
//!   optionally parallel across pens.
//! - **Cleanup** ([`cleanup`]): merging strokes that touch end to start and
//!   removing segments drawn twice.
//! - **Fixed orderings** ([`ordering`]): drawing along one direction, or
//!   cutting nested paths before the paths around them.
//!
//! # Architecture
//!
//! Parsing drawings and emitting G-code or HPGL are left to consumers.
//! They hand in polylines and get polylines back; every returned stroke
//! is an input stroke, possibly reversed.
//!
//! # Example
//!
//! ```
//! use u_penpath::{optimize, travel_distance, AnnealConfig, Stroke};
//!
//! let strokes = vec![
//!     Stroke::from_coords([(3.0, 0.0), (4.0, 0.0)]),
//!     Stroke::from_coords([(2.0, 0.0), (3.0, 0.0)]),
//!     Stroke::from_coords([(1.0, 0.0), (2.0, 0.0)]),
//! ];
//! let before = travel_distance(&strokes);
//! let config = AnnealConfig::default().with_seed(1).with_quiet(true);
//! let ordered = optimize(strokes, &config).unwrap();
//! assert!(travel_distance(&ordered) <= before);
//! ```

pub mod anneal;
pub mod cleanup;
pub mod error;
pub mod geometry;
pub mod ordering;
pub mod pens;

pub use anneal::{optimize, AnnealConfig, AnnealProgress, AnnealResult, AnnealRunner};
pub use error::{Error, Result};
pub use geometry::{draw_distance, travel_distance, Point, Stroke};
pub use ordering::{directionalize, sort_inside_out};
pub use pens::{
    optimize_pens, order_pens, prepare_pens, travel_report, PenId, PenOrdering, PenPaths,
    TravelReport,
};
