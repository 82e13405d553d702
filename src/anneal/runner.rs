//! Annealing loop.
//!
//! # Algorithm
//!
//! 1. Start from the input order with every flag cleared.
//! 2. At each step:
//!    a. Pick slots `i <= j` and swap the block's end slots, flipping both
//!       flags. The two boundary junctions now have their post-move cost,
//!       which gives the energy delta in O(1).
//!    b. Accept with probability `exp(-delta / (E0 * k * T))`.
//!    c. On acceptance finish the reversal of the block interior, otherwise
//!       swap the end slots back.
//! 3. Every `poll_interval` steps check the clock, the cancel flag and
//!    report progress.
//! 4. An attempt that runs out of time is retried from the best snapshot
//!    with a budget shrunk to a fraction of the steps it managed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::config::{AnnealConfig, MAX_EXPONENT};
use super::types::{Arrangement, Snapshot};
use crate::error::Result;
use crate::geometry::Stroke;

/// Minimum percent advance between two progress reports.
const REPORT_STEP_PERCENT: f64 = 5.0;

/// Progress of a running optimization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnealProgress {
    /// 1-based attempt number.
    pub attempt: usize,
    /// Step within the current attempt.
    pub step: usize,
    /// Step budget of the current attempt.
    pub max_steps: usize,
    /// `step / max_steps` as a percentage.
    pub percent: f64,
    /// Seconds since the call started.
    pub elapsed_secs: f64,
    /// Lowest travel energy seen so far.
    pub best_energy: f64,
}

/// Result of an annealing run.
#[derive(Debug, Clone)]
pub struct AnnealResult {
    /// Strokes in optimized order, each in its optimized direction.
    pub strokes: Vec<Stroke>,

    /// Travel energy of the input arrangement.
    pub initial_energy: f64,

    /// Travel energy of `strokes`.
    pub best_energy: f64,

    /// Steps executed across all attempts.
    pub steps: usize,

    /// Attempts started. Zero when the input was trivial.
    pub attempts: usize,

    /// Number of accepted moves (including improvements).
    pub accepted_moves: usize,

    /// Number of accepted moves that lowered the energy.
    pub improving_moves: usize,

    /// Whether the last attempt stopped on the clock.
    pub timed_out: bool,

    /// Whether cancelled externally.
    pub cancelled: bool,

    /// Wall-clock time spent.
    pub elapsed: Duration,
}

impl AnnealResult {
    fn unchanged(strokes: Vec<Stroke>, energy: f64, started: Instant) -> Self {
        Self {
            strokes,
            initial_energy: energy,
            best_energy: energy,
            steps: 0,
            attempts: 0,
            accepted_moves: 0,
            improving_moves: 0,
            timed_out: false,
            cancelled: false,
            elapsed: started.elapsed(),
        }
    }

    /// Travel reduction relative to the input, in percent.
    pub fn improvement_percent(&self) -> f64 {
        if self.initial_energy > 0.0 {
            (self.initial_energy - self.best_energy) * 100.0 / self.initial_energy
        } else {
            0.0
        }
    }
}

/// Executes the path annealer.
pub struct AnnealRunner;

impl AnnealRunner {
    /// Optimizes the order and direction of `strokes`.
    ///
    /// # Errors
    ///
    /// Fails before doing any work if the configuration is invalid or a
    /// stroke has fewer than two points or a non-finite coordinate.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_penpath::anneal::{AnnealConfig, AnnealRunner};
    /// use u_penpath::Stroke;
    ///
    /// let strokes = vec![
    ///     Stroke::from_coords([(2.0, 0.0), (3.0, 0.0)]),
    ///     Stroke::from_coords([(0.0, 0.0), (1.0, 0.0)]),
    ///     Stroke::from_coords([(2.0, 0.0), (1.0, 0.0)]),
    /// ];
    /// let config = AnnealConfig::default().with_seed(7).with_quiet(true);
    /// let result = AnnealRunner::run(strokes, &config).unwrap();
    /// assert!(result.best_energy <= result.initial_energy);
    /// ```
    pub fn run(strokes: Vec<Stroke>, config: &AnnealConfig) -> Result<AnnealResult> {
        Self::execute(strokes, config, None, &mut |_| {})
    }

    /// Runs with a progress callback.
    ///
    /// The callback is invoked at poll points whenever progress advanced by
    /// at least five percent. It runs on the optimizer's hot path and must
    /// not block. It is never invoked when `config.quiet` is set.
    pub fn run_with_progress<F>(
        strokes: Vec<Stroke>,
        config: &AnnealConfig,
        mut progress: F,
    ) -> Result<AnnealResult>
    where
        F: FnMut(&AnnealProgress),
    {
        Self::execute(strokes, config, None, &mut progress)
    }

    /// Runs with an optional cancellation token.
    ///
    /// The flag is polled together with the clock; a cancelled run returns
    /// the best arrangement found so far.
    pub fn run_with_cancel(
        strokes: Vec<Stroke>,
        config: &AnnealConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<AnnealResult> {
        Self::execute(strokes, config, cancel.as_deref(), &mut |_| {})
    }

    /// Runs with both a cancellation token and a progress callback.
    ///
    /// Progress is reported before the flag is polled, so a callback that
    /// sets the flag stops the run at the same poll point.
    pub fn run_with_progress_and_cancel<F>(
        strokes: Vec<Stroke>,
        config: &AnnealConfig,
        cancel: Option<Arc<AtomicBool>>,
        mut progress: F,
    ) -> Result<AnnealResult>
    where
        F: FnMut(&AnnealProgress),
    {
        Self::execute(strokes, config, cancel.as_deref(), &mut progress)
    }

    fn execute(
        strokes: Vec<Stroke>,
        config: &AnnealConfig,
        cancel: Option<&AtomicBool>,
        progress: &mut dyn FnMut(&AnnealProgress),
    ) -> Result<AnnealResult> {
        config.validate()?;
        for (index, stroke) in strokes.iter().enumerate() {
            stroke.validate(index)?;
        }

        let started = Instant::now();
        let n = strokes.len();
        if n <= 1 {
            return Ok(AnnealResult::unchanged(strokes, 0.0, started));
        }

        let initial_energy = Arrangement::new(&strokes).energy();
        if initial_energy == 0.0 {
            log::debug!("{n} strokes already chain with zero travel");
            return Ok(AnnealResult::unchanged(strokes, 0.0, started));
        }

        let rng = StdRng::seed_from_u64(config.seed.unwrap_or_else(rand::random));
        let mut state = AnnealState::new(&strokes, initial_energy, rng);
        let ctx = RunContext {
            config,
            scale: initial_energy * config.k,
            started,
            cancel,
        };

        let mut max_steps = config.initial_steps(n);
        log::debug!(
            "annealing {n} strokes: initial travel {initial_energy:.3}, {max_steps} steps"
        );

        let mut attempts = 0;
        let mut steps = 0;
        let end = loop {
            attempts += 1;
            let outcome = state.attempt(&ctx, attempts, max_steps, progress);
            steps += outcome.steps;

            match outcome.end {
                AttemptEnd::TimedOut if attempts <= config.retries => {
                    max_steps = (outcome.steps as f64 * config.shrink_factor) as usize;
                    log::warn!(
                        "annealing attempt {attempts} timed out after {} steps; retrying with {max_steps}",
                        outcome.steps
                    );
                    state.reset_to_best();
                }
                AttemptEnd::TimedOut => {
                    log::warn!("annealing timed out after {attempts} attempt(s)");
                    break AttemptEnd::TimedOut;
                }
                end => break end,
            }
        };

        let (best, best_energy, accepted_moves, improving_moves) = state.into_best();
        let result = AnnealResult {
            strokes: best.materialize(strokes),
            initial_energy,
            best_energy,
            steps,
            attempts,
            accepted_moves,
            improving_moves,
            timed_out: end == AttemptEnd::TimedOut,
            cancelled: end == AttemptEnd::Cancelled,
            elapsed: started.elapsed(),
        };

        if !config.quiet {
            log::info!(
                "travel improvement: {:.1}% (took {:.2} seconds)",
                result.improvement_percent(),
                result.elapsed.as_secs_f64()
            );
        }

        Ok(result)
    }
}

/// Optimizes `strokes` and returns them in their new order and direction.
///
/// Shorthand for [`AnnealRunner::run`] when the statistics are not needed.
pub fn optimize(strokes: Vec<Stroke>, config: &AnnealConfig) -> Result<Vec<Stroke>> {
    AnnealRunner::run(strokes, config).map(|result| result.strokes)
}

/// Acceptance probability for an energy change at `scale = E0 * k * T`.
///
/// Clamped to 1, including where `exp` would overflow. A non-positive
/// scale means zero temperature: only non-worsening moves pass.
pub(crate) fn acceptance_probability(delta: f64, scale: f64) -> f64 {
    if scale.is_nan() || scale <= 0.0 {
        return if delta <= 0.0 { 1.0 } else { 0.0 };
    }
    let exponent = -delta / scale;
    if exponent > MAX_EXPONENT {
        1.0
    } else {
        exponent.exp().min(1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptEnd {
    Completed,
    TimedOut,
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
struct AttemptOutcome {
    steps: usize,
    end: AttemptEnd,
}

/// Per-call constants shared by all attempts.
struct RunContext<'c> {
    config: &'c AnnealConfig,
    /// `E0 * k`; multiplied by the temperature at each step.
    scale: f64,
    started: Instant,
    cancel: Option<&'c AtomicBool>,
}

impl RunContext<'_> {
    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Mutable state of one optimization call.
struct AnnealState<'a, R> {
    arrangement: Arrangement<'a>,
    energy: f64,
    initial_energy: f64,
    best: Snapshot,
    best_energy: f64,
    rng: R,
    accepted_moves: usize,
    improving_moves: usize,
}

impl<'a, R: Rng> AnnealState<'a, R> {
    fn new(strokes: &'a [Stroke], initial_energy: f64, rng: R) -> Self {
        let arrangement = Arrangement::new(strokes);
        let best = arrangement.snapshot();
        Self {
            arrangement,
            energy: initial_energy,
            initial_energy,
            best,
            best_energy: initial_energy,
            rng,
            accepted_moves: 0,
            improving_moves: 0,
        }
    }

    fn attempt(
        &mut self,
        ctx: &RunContext<'_>,
        attempt: usize,
        max_steps: usize,
        progress: &mut dyn FnMut(&AnnealProgress),
    ) -> AttemptOutcome {
        let config = ctx.config;
        let attempt_started = Instant::now();
        let mut last_percent = -REPORT_STEP_PERCENT;

        for step in 0..max_steps {
            let u = step as f64 / max_steps as f64;
            let temperature = config.schedule.temperature(u);
            self.step(ctx.scale * temperature);

            if step % config.poll_interval != 0 {
                continue;
            }

            debug_assert!(
                (self.energy - self.arrangement.energy()).abs() <= 1e-6 * self.initial_energy,
                "tracked energy {} drifted from {}",
                self.energy,
                self.arrangement.energy()
            );

            if !config.quiet {
                let percent = step as f64 * 100.0 / max_steps as f64;
                if percent >= last_percent + REPORT_STEP_PERCENT {
                    last_percent = percent;
                    progress(&AnnealProgress {
                        attempt,
                        step,
                        max_steps,
                        percent,
                        elapsed_secs: ctx.started.elapsed().as_secs_f64(),
                        best_energy: self.best_energy,
                    });
                }
            }

            let end = if ctx.is_cancelled() {
                AttemptEnd::Cancelled
            } else if attempt_started.elapsed() > config.timeout {
                AttemptEnd::TimedOut
            } else {
                continue;
            };
            return AttemptOutcome {
                steps: step + 1,
                end,
            };
        }

        AttemptOutcome {
            steps: max_steps,
            end: AttemptEnd::Completed,
        }
    }

    /// One proposal: block reversal between two random slots.
    fn step(&mut self, scale: f64) {
        let n = self.arrangement.len();
        let i = self.rng.random_range(0..n);
        let j = self.rng.random_range(i..n);

        let old = self.arrangement.boundary_energy(i, j);
        self.arrangement.swap_ends(i, j);
        let delta = self.arrangement.boundary_energy(i, j) - old;

        if acceptance_probability(delta, scale) >= self.rng.random::<f64>() {
            self.arrangement.reverse_interior(i, j);
            self.energy += delta;
            self.accepted_moves += 1;
            if delta < 0.0 {
                self.improving_moves += 1;
            }
            if self.energy < self.best_energy {
                self.best_energy = self.energy;
                self.best = self.arrangement.snapshot();
            }
        } else {
            self.arrangement.swap_ends(i, j);
        }
    }

    fn reset_to_best(&mut self) {
        self.arrangement.restore(&self.best);
        self.energy = self.best_energy;
    }

    fn into_best(self) -> (Snapshot, f64, usize, usize) {
        (
            self.best,
            self.best_energy,
            self.accepted_moves,
            self.improving_moves,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anneal::TemperatureSchedule;
    use crate::error::Error;
    use crate::geometry::travel_distance;

    fn seg(x0: f64, y0: f64, x1: f64, y1: f64) -> Stroke {
        Stroke::from_coords([(x0, y0), (x1, y1)])
    }

    fn random_strokes(n: usize, seed: u64) -> Vec<Stroke> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                seg(
                    rng.random_range(0.0..100.0),
                    rng.random_range(0.0..100.0),
                    rng.random_range(0.0..100.0),
                    rng.random_range(0.0..100.0),
                )
            })
            .collect()
    }

    fn quiet(seed: u64) -> AnnealConfig {
        AnnealConfig::default().with_seed(seed).with_quiet(true)
    }

    fn assert_same_multiset(input: &[Stroke], output: &[Stroke]) {
        assert_eq!(input.len(), output.len());
        let mut used = vec![false; output.len()];
        for stroke in input {
            let slot = output
                .iter()
                .enumerate()
                .position(|(k, s)| !used[k] && s.same_path(stroke));
            match slot {
                Some(k) => used[k] = true,
                None => panic!("stroke {stroke:?} missing from output"),
            }
        }
    }

    // ---- Acceptance ----

    #[test]
    fn test_acceptance_improving_move_saturates() {
        assert_eq!(acceptance_probability(-1e6, 1e-9), 1.0);
        assert_eq!(acceptance_probability(-1.0, 1.0), 1.0);
    }

    #[test]
    fn test_acceptance_worsening_move() {
        let p = acceptance_probability(1.0, 1.0);
        assert!((p - (-1.0_f64).exp()).abs() < 1e-12);
        assert_eq!(acceptance_probability(1e6, 1e-9), 0.0);
    }

    #[test]
    fn test_acceptance_zero_temperature() {
        assert_eq!(acceptance_probability(0.5, 0.0), 0.0);
        assert_eq!(acceptance_probability(0.0, 0.0), 1.0);
        assert_eq!(acceptance_probability(-0.5, -1.0), 1.0);
    }

    // ---- Degenerate inputs ----

    #[test]
    fn test_empty_input() {
        let result = AnnealRunner::run(Vec::new(), &quiet(1)).unwrap();
        assert!(result.strokes.is_empty());
        assert_eq!(result.attempts, 0);
    }

    #[test]
    fn test_single_stroke_unchanged() {
        let s = seg(5.0, 1.0, 0.0, 0.0);
        let out = optimize(vec![s.clone()], &quiet(1)).unwrap();
        assert_eq!(out, vec![s]);
    }

    #[test]
    fn test_zero_energy_returns_input() {
        let strokes = vec![
            seg(0.0, 0.0, 1.0, 0.0),
            seg(1.0, 0.0, 1.0, 1.0),
            seg(1.0, 1.0, 0.0, 1.0),
        ];
        let result = AnnealRunner::run(strokes.clone(), &quiet(3)).unwrap();
        assert_eq!(result.strokes, strokes);
        assert_eq!(result.best_energy, 0.0);
        assert_eq!(result.steps, 0);
    }

    #[test]
    fn test_invalid_stroke_rejected() {
        let strokes = vec![seg(0.0, 0.0, 1.0, 0.0), Stroke::from_coords([(2.0, 2.0)])];
        let err = AnnealRunner::run(strokes, &quiet(1)).unwrap_err();
        assert_eq!(err, Error::InvalidInput { index: 1, points: 1 });
    }

    #[test]
    fn test_single_invalid_stroke_rejected() {
        let err = optimize(vec![Stroke::default()], &quiet(1)).unwrap_err();
        assert_eq!(err, Error::InvalidInput { index: 0, points: 0 });
    }

    #[test]
    fn test_invalid_config_rejected() {
        let strokes = vec![seg(0.0, 0.0, 1.0, 0.0), seg(5.0, 0.0, 6.0, 0.0)];
        let err = AnnealRunner::run(strokes, &quiet(1).with_k(-1.0)).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    // ---- Optimization ----

    #[test]
    fn test_reverse_ordered_chain_is_solved() {
        // Supplied right-to-left: each junction costs 2 units.
        let strokes = vec![
            seg(3.0, 0.0, 4.0, 0.0),
            seg(2.0, 0.0, 3.0, 0.0),
            seg(1.0, 0.0, 2.0, 0.0),
            seg(0.0, 0.0, 1.0, 0.0),
        ];
        let before = travel_distance(&strokes);
        assert!((before - 6.0).abs() < 1e-12);

        let result = AnnealRunner::run(strokes.clone(), &quiet(42)).unwrap();
        assert!(result.best_energy < before);
        assert!(
            result.best_energy < 1e-9,
            "expected a zero-travel chain, got {}",
            result.best_energy
        );
        assert!((travel_distance(&result.strokes) - result.best_energy).abs() < 1e-9);
        assert_same_multiset(&strokes, &result.strokes);
    }

    #[test]
    fn test_random_strokes_improve() {
        let strokes = random_strokes(60, 9);
        let result = AnnealRunner::run(strokes.clone(), &quiet(5)).unwrap();

        assert!(result.best_energy < result.initial_energy);
        assert!(result.improvement_percent() > 0.0);
        assert!(result.improving_moves > 0);
        assert!(result.accepted_moves >= result.improving_moves);
        assert!(!result.timed_out);
        assert_eq!(result.attempts, 1);
        assert_eq!(result.steps, 250 * 60);
        assert!(
            (travel_distance(&result.strokes) - result.best_energy).abs()
                <= 1e-9 * result.initial_energy
        );
        assert_same_multiset(&strokes, &result.strokes);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let strokes = random_strokes(40, 11);
        let a = optimize(strokes.clone(), &quiet(123)).unwrap();
        let b = optimize(strokes, &quiet(123)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_linear_schedule_never_worsens() {
        let strokes = random_strokes(30, 2);
        let config = quiet(8)
            .with_schedule(TemperatureSchedule::Linear)
            .with_k(1.0);
        let result = AnnealRunner::run(strokes.clone(), &config).unwrap();
        assert!(result.best_energy <= result.initial_energy);
        assert_same_multiset(&strokes, &result.strokes);
    }

    // ---- Timeout, cancellation, progress ----

    #[test]
    fn test_timeout_with_retries_is_bounded() {
        let strokes = random_strokes(2000, 4);
        let config = quiet(4)
            .with_max_steps(usize::MAX / 2)
            .with_timeout(Duration::from_millis(20))
            .with_retries(2);

        let started = Instant::now();
        let result = AnnealRunner::run(strokes.clone(), &config).unwrap();
        let elapsed = started.elapsed();

        // The first attempt always times out; a retry on the shrunk budget
        // may or may not finish in time.
        assert!((2..=3).contains(&result.attempts));
        let bound = config.timeout * (config.retries as u32 + 1) + Duration::from_millis(250);
        assert!(elapsed < bound, "run took {elapsed:?}, bound {bound:?}");
        assert!(result.best_energy <= result.initial_energy);
        assert_same_multiset(&strokes, &result.strokes);
    }

    #[test]
    fn test_zero_timeout_stops_early() {
        let strokes = random_strokes(200, 6);
        let config = quiet(6).with_timeout(Duration::ZERO).with_retries(0);
        let result = AnnealRunner::run(strokes, &config).unwrap();
        assert!(result.timed_out);
        assert_eq!(result.attempts, 1);
        assert!(result.steps <= config.poll_interval + 1);
    }

    #[test]
    fn test_cancellation() {
        let strokes = random_strokes(50, 3);
        // Set before running so the first poll observes it.
        let cancel = Arc::new(AtomicBool::new(true));
        let result = AnnealRunner::run_with_cancel(strokes, &quiet(3), Some(cancel)).unwrap();
        assert!(result.cancelled);
        assert_eq!(result.attempts, 1);
        assert_eq!(result.steps, 1);
        assert!(result.best_energy <= result.initial_energy);
    }

    #[test]
    fn test_progress_reports() {
        let strokes = random_strokes(100, 12);
        let config = AnnealConfig::default().with_seed(12);
        let mut reports = Vec::new();
        let result =
            AnnealRunner::run_with_progress(strokes, &config, |p| reports.push(*p)).unwrap();

        assert!(!reports.is_empty());
        assert!(reports.len() <= 21);
        assert_eq!(reports[0].step, 0);
        for w in reports.windows(2) {
            assert!(w[1].percent >= w[0].percent + REPORT_STEP_PERCENT);
            assert!(w[1].best_energy <= w[0].best_energy);
        }
        assert!(reports.iter().all(|p| p.best_energy >= result.best_energy));
    }

    #[test]
    fn test_progress_callback_can_cancel() {
        let strokes = random_strokes(100, 13);
        let config = AnnealConfig::default().with_seed(13);
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let mut reports = 0;

        let result =
            AnnealRunner::run_with_progress_and_cancel(strokes, &config, Some(cancel), |_| {
                reports += 1;
                flag.store(true, Ordering::Relaxed);
            })
            .unwrap();

        assert_eq!(reports, 1);
        assert!(result.cancelled);
        assert_eq!(result.attempts, 1);
        assert_eq!(result.steps, 1);
    }

    #[test]
    fn test_quiet_suppresses_progress() {
        let strokes = random_strokes(20, 12);
        let mut calls = 0;
        AnnealRunner::run_with_progress(strokes, &quiet(12), |_| calls += 1).unwrap();
        assert_eq!(calls, 0);
    }
}
