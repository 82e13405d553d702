//! Per-pen plans.
//!
//! Drawings are split by pen (or tool). Each pen's strokes are ordered
//! independently; with the `parallel` feature pens run concurrently.
//! [`order_pens`] picks between annealing and the fixed orderings in
//! [`crate::ordering`].

use std::collections::BTreeMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::anneal::{AnnealConfig, AnnealRunner};
use crate::cleanup::{merge_touching, remove_repeated_draws};
use crate::error::{Error, Result};
use crate::geometry::{travel_distance, Stroke};
use crate::ordering::{directionalize, sort_inside_out};

/// Pen or tool identifier.
pub type PenId = u32;

/// Strokes grouped by pen.
pub type PenPaths = BTreeMap<PenId, Vec<Stroke>>;

/// Turns single-point strokes into zero-length two-point strokes.
fn widen_dots(strokes: Vec<Stroke>) -> Vec<Stroke> {
    strokes
        .into_iter()
        .map(|stroke| match (stroke.len(), stroke.first()) {
            (1, Some(p)) => Stroke::new(vec![p, p]),
            _ => stroke,
        })
        .collect()
}

/// Removes repeated draws (unless `allow_repeats`) and merges touching
/// strokes for every pen. Pens left without strokes are dropped.
///
/// Single-point strokes become zero-length strokes `[p, p]`, so every
/// returned stroke is accepted by [`optimize_pens`].
pub fn prepare_pens(pens: PenPaths, allow_repeats: bool) -> PenPaths {
    pens.into_iter()
        .map(|(pen, strokes)| {
            let strokes = widen_dots(strokes);
            let cleaned = if allow_repeats {
                merge_touching(&strokes)
            } else {
                remove_repeated_draws(&strokes)
            };
            (pen, cleaned)
        })
        .filter(|(_, strokes)| !strokes.is_empty())
        .collect()
}

/// Config for one pen. A seeded config gets `seed + pen`.
fn pen_config(config: &AnnealConfig, pen: PenId) -> AnnealConfig {
    let mut config = config.clone();
    config.seed = config.seed.map(|seed| seed.wrapping_add(u64::from(pen)));
    config
}

fn optimize_pen(pen: PenId, strokes: Vec<Stroke>, config: &AnnealConfig) -> Result<Vec<Stroke>> {
    let result = AnnealRunner::run(strokes, &pen_config(config, pen))?;
    log::debug!(
        "pen {pen}: {} strokes, travel {:.3} -> {:.3}",
        result.strokes.len(),
        result.initial_energy,
        result.best_energy
    );
    Ok(result.strokes)
}

/// Applies `plan` to every pen, then merges strokes the plan brought end
/// to start.
fn map_pens<F>(pens: PenPaths, plan: F) -> Result<PenPaths>
where
    F: Fn(PenId, Vec<Stroke>) -> Result<Vec<Stroke>> + Sync + Send,
{
    let plan_pen = |(pen, strokes): (PenId, Vec<Stroke>)| {
        plan(pen, strokes).map(|planned| (pen, merge_touching(&planned)))
    };

    #[cfg(feature = "parallel")]
    {
        pens.into_par_iter().map(plan_pen).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        pens.into_iter().map(plan_pen).collect()
    }
}

/// Optimizes every pen's strokes and merges strokes the new order brought
/// end to start.
///
/// # Errors
///
/// Fails on the first invalid stroke or an invalid configuration.
pub fn optimize_pens(pens: PenPaths, config: &AnnealConfig) -> Result<PenPaths> {
    config.validate()?;
    map_pens(pens, |pen, strokes| optimize_pen(pen, strokes, config))
}

/// How each pen's strokes are put in drawing order.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PenOrdering {
    /// Minimize pen-up travel by simulated annealing.
    Anneal(AnnealConfig),
    /// Nested and closed paths before their containers, for cutting.
    InsideOut,
    /// Keep the order and draw every run along this angle in degrees
    /// (0 is +x, 90 is +y). Replaces annealing for slanted pens.
    Direction(f64),
}

impl Default for PenOrdering {
    fn default() -> Self {
        Self::Anneal(AnnealConfig::default())
    }
}

/// Orders every pen's strokes with `ordering`, then merges strokes that
/// ended up end to start.
///
/// # Errors
///
/// Annealing fails on the first invalid stroke or an invalid
/// configuration; a non-finite direction is an invalid configuration.
pub fn order_pens(pens: PenPaths, ordering: &PenOrdering) -> Result<PenPaths> {
    match ordering {
        PenOrdering::Anneal(config) => optimize_pens(pens, config),
        PenOrdering::InsideOut => map_pens(pens, |_, strokes| Ok(sort_inside_out(strokes))),
        PenOrdering::Direction(degrees) => {
            if !degrees.is_finite() {
                return Err(Error::InvalidConfig(format!(
                    "direction must be finite, got {degrees}"
                )));
            }
            map_pens(pens, |_, strokes| Ok(directionalize(&strokes, *degrees)))
        }
    }
}

/// Pen-up travel per pen before and after optimization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TravelReport {
    /// `(pen, before, after)` for every pen present in `before`.
    pub pens: Vec<(PenId, f64, f64)>,
}

impl TravelReport {
    pub fn total_before(&self) -> f64 {
        self.pens.iter().map(|&(_, before, _)| before).sum()
    }

    pub fn total_after(&self) -> f64 {
        self.pens.iter().map(|&(_, _, after)| after).sum()
    }

    /// Overall reduction in percent; zero when there was no travel.
    pub fn improvement_percent(&self) -> f64 {
        let before = self.total_before();
        if before > 0.0 {
            (before - self.total_after()) * 100.0 / before
        } else {
            0.0
        }
    }
}

/// Compares pen-up travel between two plans. Pens missing from `after`
/// count as zero travel.
pub fn travel_report(before: &PenPaths, after: &PenPaths) -> TravelReport {
    let pens = before
        .iter()
        .map(|(&pen, strokes)| {
            let after = after.get(&pen).map_or(0.0, |s| travel_distance(s));
            (pen, travel_distance(strokes), after)
        })
        .collect();
    TravelReport { pens }
}
