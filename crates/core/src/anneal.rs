//! Simulated-annealing search over track orderings and pitch shifts.
//!
//! One *attempt* anneals from a fresh random state for a fixed iteration
//! count; the outer loop keeps launching attempts until the wall-clock
//! budget is spent (always completing at least one) and keeps the best
//! state seen anywhere. Every inner-loop step is a swap of two order
//! positions plus a local shift re-optimization, priced through the delta
//! path in [`crate::evaluator`], so an iteration is a handful of table
//! lookups.
//!
//! Escape mode is how the search leaves local minima: a worsening move that
//! survives the Metropolis draw starts a bounded exploration run from the
//! worsened state (up to `multi_swap_factor * n` steps) instead of a single
//! accepted step. Outside escape mode every iteration starts from the best
//! known state.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::camelot::CamelotKey;
use crate::cost::{CostBreakdown, CostParams};
use crate::error::MixError;
use crate::evaluator::{affected_edges, MixEvaluator};
use crate::tables::TransitionTables;

/// Annealing schedule parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnealParams {
    /// Inner-loop iterations per attempt.
    pub total_iterations: u64,
    /// Temperature at iteration 0.
    pub initial_temp: f64,
    /// Temperature reached at the last iteration.
    pub final_temp: f64,
    /// Escape-run length budget, as a multiple of the track count.
    pub multi_swap_factor: f64,
    /// Iterations between progress reports (also the cancellation-check
    /// cadence inside an attempt).
    pub reporting_rate: u64,
}

impl Default for AnnealParams {
    fn default() -> Self {
        Self {
            total_iterations: 410_000,
            initial_temp: 500.0,
            final_temp: 0.1,
            multi_swap_factor: 2.0,
            reporting_rate: 50_000,
        }
    }
}

impl AnnealParams {
    /// Per-iteration cooling multiplier, derived so that `final_temp` is
    /// reached exactly at `total_iterations`.
    pub fn cooling_factor(&self) -> f64 {
        ((self.final_temp / self.initial_temp).ln() / self.total_iterations as f64).exp()
    }

    pub fn validate(&self) -> Result<(), MixError> {
        for (name, value) in [
            ("initial_temp", self.initial_temp),
            ("final_temp", self.final_temp),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(MixError::BadTemperature { name, value });
            }
        }
        if self.total_iterations < 1 {
            return Err(MixError::NoIterations);
        }
        if self.reporting_rate < 1 {
            return Err(MixError::NoReportingRate);
        }
        if !(self.multi_swap_factor >= 1.0) {
            return Err(MixError::BadMultiSwapFactor(self.multi_swap_factor));
        }
        Ok(())
    }
}

/// One progress record, emitted every `reporting_rate` iterations.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressUpdate {
    pub attempt: usize,
    pub iteration: u64,
    pub temperature: f64,
    pub escape_mode: bool,
    /// Best state so far in this attempt.
    pub best: CostBreakdown,
}

/// Receiver for progress records. Implementations must not fail; a sink
/// that drops records cannot disturb the optimization.
pub trait ProgressSink: Sync {
    fn report(&self, update: &ProgressUpdate);
}

/// Progress sink that writes one `log::info!` line per record.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn report(&self, u: &ProgressUpdate) {
        log::info!(
            "attempt {} iter {:>7}: temp={:>7.1} escape={} best={:.1} (H={:.1} T={:.1} S={:.1})",
            u.attempt + 1,
            u.iteration,
            u.temperature,
            u.escape_mode,
            u.best.overall,
            u.best.harmonic,
            u.best.tempo,
            u.best.shift,
        );
    }
}

/// Progress sink that discards every record.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn report(&self, _update: &ProgressUpdate) {}
}

/// Caller-side knobs for one optimization run.
#[derive(Default)]
pub struct RunOptions<'a> {
    /// Seed for reproducible runs. Seeded runs execute attempts
    /// sequentially (attempt `k` uses `seed + k`); unseeded runs draw OS
    /// entropy per attempt and fan out across worker threads.
    pub seed: Option<u64>,
    /// Cooperative cancellation flag, checked between attempts and every
    /// `reporting_rate` iterations within one.
    pub cancel: Option<&'a AtomicBool>,
    /// Progress receiver. `None` suppresses reporting.
    pub progress: Option<&'a dyn ProgressSink>,
    /// Worker-thread count for unseeded runs. Defaults to the machine's
    /// available parallelism.
    pub workers: Option<NonZeroUsize>,
}

/// Per-track edge-cost statistics across attempts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackStats {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

/// Result of one optimization run.
#[derive(Debug, Clone, Serialize)]
pub struct MixResult {
    /// Best ordering found: a permutation of `0..n` track indices.
    pub best_order: Vec<usize>,
    /// Per-track semitone shifts for the best state, indexed by track.
    pub best_shifts: Vec<i8>,
    /// Total cost of the best state.
    pub best_cost: f64,
    /// Component breakdown of `best_cost`.
    pub best_breakdown: CostBreakdown,
    /// Cost breakdown of each completed attempt, in attempt order.
    pub attempt_costs: Vec<CostBreakdown>,
    /// Number of attempts that contributed a result.
    pub n_attempts: usize,
    /// Min/avg/max edge cost around each track across attempts.
    pub per_track: Vec<TrackStats>,
    /// True when the caller's cancellation flag cut the run short; the
    /// best-so-far state above is still consistent.
    pub cancelled: bool,
    /// Wall time actually spent.
    pub elapsed: Duration,
}

/// Best state of one finished (or cancelled) attempt.
struct AttemptOutcome {
    order: Vec<usize>,
    shifts: Vec<i8>,
    breakdown: CostBreakdown,
    per_track_avg: Vec<f64>,
    cancelled: bool,
}

/// The annealing search engine. Borrows a validated evaluator and runs
/// attempts against it; all mutable state lives on the attempt's stack, so
/// one annealer can drive many attempts in parallel.
pub struct Annealer<'a> {
    eval: &'a MixEvaluator<'a>,
    params: &'a AnnealParams,
    cooling: f64,
    escape_budget: u64,
}

impl<'a> Annealer<'a> {
    pub fn new(eval: &'a MixEvaluator<'a>, params: &'a AnnealParams) -> Result<Self, MixError> {
        params.validate()?;
        Ok(Self {
            eval,
            params,
            cooling: params.cooling_factor(),
            escape_budget: (params.multi_swap_factor * eval.len() as f64) as u64,
        })
    }

    /// Run attempts until the time budget is spent (at least one always
    /// completes) and collect the best state plus per-attempt diagnostics.
    pub fn run(&self, time_limit: Duration, opts: &RunOptions<'_>) -> MixResult {
        let start = Instant::now();
        let outcomes = match opts.seed {
            Some(seed) => self.run_sequential(start, time_limit, seed, opts),
            None => self.run_parallel(start, time_limit, opts),
        };
        let flag_seen = opts.cancel.is_some_and(|c| c.load(Ordering::Relaxed));
        self.collect(start, outcomes, flag_seen)
    }

    /// Deterministic path: attempts run back to back on this thread.
    fn run_sequential(
        &self,
        start: Instant,
        time_limit: Duration,
        seed: u64,
        opts: &RunOptions<'_>,
    ) -> Vec<AttemptOutcome> {
        let mut outcomes = Vec::new();
        let mut attempt = 0usize;
        loop {
            if attempt > 0 && start.elapsed() >= time_limit {
                break;
            }
            if attempt > 0 && opts.cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                break;
            }
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(attempt as u64));
            let outcome = self.run_attempt(attempt, &mut rng, opts.cancel, opts.progress);
            let cancelled = outcome.cancelled;
            outcomes.push(outcome);
            attempt += 1;
            if cancelled {
                break;
            }
        }
        outcomes
    }

    /// Unseeded path: a scoped worker pool claims attempt indices until the
    /// budget is spent. Only the outcome list is shared, behind a mutex
    /// touched once per attempt.
    fn run_parallel(
        &self,
        start: Instant,
        time_limit: Duration,
        opts: &RunOptions<'_>,
    ) -> Vec<AttemptOutcome> {
        let workers = opts
            .workers
            .or_else(|| std::thread::available_parallelism().ok())
            .map(NonZeroUsize::get)
            .unwrap_or(1);

        let next_attempt = AtomicUsize::new(0);
        let completed = AtomicUsize::new(0);
        let outcomes: Mutex<Vec<(usize, AttemptOutcome)>> = Mutex::new(Vec::new());

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let done = completed.load(Ordering::Relaxed);
                    if done >= 1 {
                        if start.elapsed() >= time_limit {
                            break;
                        }
                        if opts.cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                            break;
                        }
                    }
                    let attempt = next_attempt.fetch_add(1, Ordering::Relaxed);
                    let mut rng = StdRng::from_os_rng();
                    let outcome = self.run_attempt(attempt, &mut rng, opts.cancel, opts.progress);
                    let cancelled = outcome.cancelled;
                    outcomes.lock().push((attempt, outcome));
                    completed.fetch_add(1, Ordering::Relaxed);
                    if cancelled {
                        break;
                    }
                });
            }
        });

        let mut outcomes = outcomes.into_inner();
        outcomes.sort_by_key(|(attempt, _)| *attempt);
        outcomes.into_iter().map(|(_, o)| o).collect()
    }

    /// One full annealing attempt from a fresh random state.
    fn run_attempt(
        &self,
        attempt: usize,
        rng: &mut StdRng,
        cancel: Option<&AtomicBool>,
        progress: Option<&dyn ProgressSink>,
    ) -> AttemptOutcome {
        let n = self.eval.len();

        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);
        let mut shifts: Vec<i8> = (0..n).map(|_| rng.random_range(-1i8..=1)).collect();

        let mut best = self.eval.total_cost(&order, &shifts);
        let mut best_order = order.clone();
        let mut best_shifts = shifts.clone();
        let mut current_cost = best.overall;

        let mut temp = self.params.initial_temp;
        let mut escape_mode = false;
        let mut escape_counter = 0u64;
        let mut cancelled = false;
        let shift_cost = self.eval.shift_cost();

        let mut iteration = 0u64;
        while iteration < self.params.total_iterations {
            if iteration % self.params.reporting_rate == 0 {
                if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                    cancelled = true;
                    break;
                }
                if let Some(sink) = progress {
                    sink.report(&ProgressUpdate {
                        attempt,
                        iteration,
                        temperature: temp,
                        escape_mode,
                        best,
                    });
                }
            }

            // Outside escape mode every step explores from the best state.
            // The previous step's swap is never reverted: the working
            // buffers are overwritten here before any read.
            if !escape_mode {
                order.copy_from_slice(&best_order);
                shifts.copy_from_slice(&best_shifts);
                current_cost = best.overall;
            }

            // Two distinct positions, uniformly.
            let a = rng.random_range(0..n);
            let mut b = rng.random_range(0..n - 1);
            if b >= a {
                b += 1;
            }

            let affected = affected_edges(a, b, n);
            let old_edges = self.eval.sum_edge_costs(&affected, &order, &shifts);
            let old_shifted =
                (shifts[order[a]] != 0) as u32 + (shifts[order[b]] != 0) as u32;

            order.swap(a, b);
            self.eval.optimize_shift_at(&order, &mut shifts, a);
            self.eval.optimize_shift_at(&order, &mut shifts, b);

            let new_edges = self.eval.sum_edge_costs(&affected, &order, &shifts);
            let new_shifted =
                (shifts[order[a]] != 0) as u32 + (shifts[order[b]] != 0) as u32;
            let shift_delta = shift_cost * (new_shifted as f64 - old_shifted as f64);

            let candidate = current_cost + (new_edges - old_edges) + shift_delta;

            if candidate < best.overall {
                best_order.copy_from_slice(&order);
                best_shifts.copy_from_slice(&shifts);
                // Store the recomputed total, not the delta accumulation,
                // so the reported best is exactly reproducible from the
                // state. Improvements are rare, the full pass is cheap.
                best = self.eval.total_cost(&best_order, &best_shifts);
                current_cost = best.overall;
                escape_mode = false;
            } else if escape_mode {
                current_cost = candidate;
                escape_counter += 1;
                if escape_counter > self.escape_budget {
                    escape_mode = false;
                    escape_counter = 0;
                }
            } else if ((best.overall - candidate) / temp).exp() > rng.random::<f64>() {
                escape_mode = true;
                escape_counter = 0;
                current_cost = candidate;
            }

            temp *= self.cooling;
            iteration += 1;
        }

        let per_track_avg = self.per_track_averages(&best_order, &best_shifts);
        AttemptOutcome {
            order: best_order,
            shifts: best_shifts,
            breakdown: best,
            per_track_avg,
            cancelled,
        }
    }

    /// Average weighted edge cost around each track in a final state: the
    /// mean of `h + tempo_cost_weight * t` over the one or two edges
    /// incident to the track's position.
    fn per_track_averages(&self, order: &[usize], shifts: &[i8]) -> Vec<f64> {
        let n = order.len();
        let weight = self.eval.tempo_cost_weight();
        let mut avgs = vec![0.0; n];
        for (pos, &track) in order.iter().enumerate() {
            let mut h_sum = 0.0;
            let mut t_sum = 0.0;
            let mut count = 0u32;
            if pos > 0 {
                let prev = order[pos - 1];
                let (h, t) = self
                    .eval
                    .edge_components(prev, track, shifts[prev], shifts[track]);
                h_sum += h;
                t_sum += t;
                count += 1;
            }
            if pos < n - 1 {
                let next = order[pos + 1];
                let (h, t) = self
                    .eval
                    .edge_components(track, next, shifts[track], shifts[next]);
                h_sum += h;
                t_sum += t;
                count += 1;
            }
            if count > 0 {
                let c = count as f64;
                avgs[track] = h_sum / c + weight * (t_sum / c);
            }
        }
        avgs
    }

    /// Fold attempt outcomes into the result: best state across attempts,
    /// ordered per-attempt breakdowns, and per-track min/avg/max.
    fn collect(&self, start: Instant, outcomes: Vec<AttemptOutcome>, flag_seen: bool) -> MixResult {
        let n = self.eval.len();
        let n_attempts = outcomes.len();
        let cancelled = flag_seen || outcomes.iter().any(|o| o.cancelled);

        // Strict improvement only, so ties keep the earliest attempt.
        let mut best_idx = 0;
        for (i, outcome) in outcomes.iter().enumerate().skip(1) {
            if outcome.breakdown.overall < outcomes[best_idx].breakdown.overall {
                best_idx = i;
            }
        }

        let mut per_track = vec![
            TrackStats {
                min: f64::INFINITY,
                avg: 0.0,
                max: f64::NEG_INFINITY,
            };
            n
        ];
        for outcome in &outcomes {
            for (track, &cost) in outcome.per_track_avg.iter().enumerate() {
                let stats = &mut per_track[track];
                stats.min = stats.min.min(cost);
                stats.max = stats.max.max(cost);
                stats.avg += cost;
            }
        }
        for stats in &mut per_track {
            stats.avg /= n_attempts as f64;
        }

        let attempt_costs: Vec<CostBreakdown> =
            outcomes.iter().map(|o| o.breakdown).collect();
        let best = &outcomes[best_idx];

        log::debug!(
            "run finished: {} attempts, best {:.1} in {:.1}s",
            n_attempts,
            best.breakdown.overall,
            start.elapsed().as_secs_f64()
        );

        MixResult {
            best_order: best.order.clone(),
            best_shifts: best.shifts.clone(),
            best_cost: best.breakdown.overall,
            best_breakdown: best.breakdown,
            attempt_costs,
            n_attempts,
            per_track,
            cancelled,
            elapsed: start.elapsed(),
        }
    }
}

/// Optimize a mix in one call: validate everything, build the annealer,
/// and run it for the given wall-clock budget.
///
/// `bpm` and `keys` are parallel arrays describing the track pool; the
/// tables must come from [`TransitionTables::build`] (or `from_raw`) for
/// the same cost constants.
pub fn optimize_mix(
    bpm: &[u32],
    keys: &[CamelotKey],
    tables: &TransitionTables,
    cost: &CostParams,
    anneal: &AnnealParams,
    time_limit: Duration,
    opts: &RunOptions<'_>,
) -> Result<MixResult, MixError> {
    if time_limit.is_zero() {
        return Err(MixError::NonPositiveTimeLimit);
    }
    let eval = MixEvaluator::new(bpm, keys, tables, cost)?;
    let annealer = Annealer::new(&eval, anneal)?;
    Ok(annealer.run(time_limit, opts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooling_factor_reaches_final_temp() {
        let params = AnnealParams::default();
        let cooling = params.cooling_factor();
        assert!(cooling < 1.0);
        let end = params.initial_temp * cooling.powi(params.total_iterations as i32);
        assert!((end - params.final_temp).abs() / params.final_temp < 1e-6);
    }

    #[test]
    fn test_validate_rejects_bad_params() {
        let mut params = AnnealParams::default();
        params.initial_temp = 0.0;
        assert!(matches!(
            params.validate(),
            Err(MixError::BadTemperature { .. })
        ));

        let mut params = AnnealParams::default();
        params.final_temp = f64::NAN;
        assert!(matches!(
            params.validate(),
            Err(MixError::BadTemperature { .. })
        ));

        let mut params = AnnealParams::default();
        params.total_iterations = 0;
        assert_eq!(params.validate(), Err(MixError::NoIterations));

        let mut params = AnnealParams::default();
        params.multi_swap_factor = 0.5;
        assert_eq!(
            params.validate(),
            Err(MixError::BadMultiSwapFactor(0.5))
        );

        let mut params = AnnealParams::default();
        params.reporting_rate = 0;
        assert_eq!(params.validate(), Err(MixError::NoReportingRate));
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert_eq!(AnnealParams::default().validate(), Ok(()));
    }
}
