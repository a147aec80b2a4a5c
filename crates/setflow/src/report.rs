//! Report rendering for optimized mixes.
//!
//! Everything here reads the engine's output and cost primitives; nothing
//! feeds back into the search.

use setflow_core::{CamelotKey, CostParams, MixEvaluator, MixResult, TransitionTables};
use setflow_library::MixTrack;

/// Print the per-attempt cost breakdowns and the overall best.
pub fn print_attempts(result: &MixResult) {
    for (i, attempt) in result.attempt_costs.iter().enumerate() {
        println!(
            "  Attempt {:3}: Overall={:5.1}  H={:5.1}  T={:5.1}  S={:5.1}",
            i + 1,
            attempt.overall,
            attempt.harmonic,
            attempt.tempo,
            attempt.shift
        );
    }

    println!("\n=== Final Best Overall Results ===");
    if result.cancelled {
        println!("(run was cancelled; best state found so far)");
    }
    println!("Best Overall Cost: {:5.1}", result.best_cost);
    println!(
        "Cost Breakdown: Harmonic: {:5.1}, Tempo: {:5.1}, Shift: {:5.1}",
        result.best_breakdown.harmonic, result.best_breakdown.tempo, result.best_breakdown.shift
    );
}

/// Print per-track aggregate transition costs across all attempts, sorted
/// worst first, so problem tracks stand out.
pub fn print_per_track(tracks: &[MixTrack], result: &MixResult) {
    let mut rows: Vec<(f64, usize)> = result
        .per_track
        .iter()
        .enumerate()
        .map(|(i, stats)| (stats.avg, i))
        .collect();
    rows.sort_by(|a, b| b.0.total_cmp(&a.0));

    println!(
        "\nPer-track aggregate transition costs over all annealing attempts (sorted worst first):"
    );
    println!("{:<40} {:>6} {:>6} {:>6} {:>6}", "Track", "Min", "Avg", "Max", "#Runs");
    for (avg, i) in rows {
        let stats = &result.per_track[i];
        println!(
            "{:<40.40} {:6.2} {:6.2} {:6.2} {:6}",
            tracks[i].display_name(),
            stats.min,
            avg,
            stats.max,
            result.n_attempts
        );
    }
}

/// Print the final mix order with per-transition cost components and, for
/// dissonant transitions, bridge-key hints.
pub fn print_mix_order(
    tracks: &[MixTrack],
    result: &MixResult,
    eval: &MixEvaluator<'_>,
    tables: &TransitionTables,
    cost: &CostParams,
) {
    println!("\nFinal Mix Order:");
    for (pos, &idx) in result.best_order.iter().enumerate() {
        let track = &tracks[idx];
        let shift = result.best_shifts[idx];
        let effective = track.key.shift(shift);

        let bpm_str = format!("BPM {:3}", track.bpm);
        let key_str = format!("{:>3} [{:+}]", track.key.to_string(), shift);
        let eff_str = format!("{:>5}", effective.to_string());

        let mut harmonic = 0.0;
        let trans_info = if pos == 0 {
            "(Start)".to_string()
        } else {
            let prev_idx = result.best_order[pos - 1];
            let (h, t) =
                eval.edge_components(prev_idx, idx, result.best_shifts[prev_idx], shift);
            harmonic = h;
            format!("(H={:4.1}  T={:4.1})", h, t)
        };

        let mut bridge_hint = String::new();
        if pos > 0 && harmonic >= cost.non_harmonic_cost {
            let prev_idx = result.best_order[pos - 1];
            let prev_eff = tracks[prev_idx].key.shift(result.best_shifts[prev_idx]);
            let suggestions = bridge_keys(prev_eff, effective, tables, cost);
            if !suggestions.is_empty() {
                bridge_hint = format!("  << {}", suggestions.join(" / "));
            }
        }

        println!(
            "{:2}. {:<7}  {:<10} -> {:<5}  {:<20}  {}{}",
            pos + 1,
            bpm_str,
            key_str,
            eff_str,
            trans_info,
            track.display_name(),
            bridge_hint
        );
    }
}

/// Keys (with a shift) that would sit cleanly between two effective keys:
/// both legs must be an exact match, a relative-key change, or one wheel
/// step on the same ring.
fn bridge_keys(
    from: CamelotKey,
    to: CamelotKey,
    tables: &TransitionTables,
    cost: &CostParams,
) -> Vec<String> {
    let mut suggestions = Vec::new();
    for candidate in CamelotKey::all() {
        for s in [-1i8, 0, 1] {
            let effective = candidate.shift(s);
            let from_cost = tables.direct_cost(from.id(), effective.id());
            let to_cost = tables.direct_cost(effective.id(), to.id());
            if from_cost <= cost.key_diff_one_cost && to_cost <= cost.key_diff_one_cost {
                suggestions.push(format!("{}({:+})", candidate, s));
            }
        }
    }
    suggestions
}

/// A library track that can be dropped into a tempo-break transition.
struct InsertionCandidate<'a> {
    track: &'a MixTrack,
    shift: i8,
    effective: CamelotKey,
}

/// Candidates from `library` whose BPM fits the overlapping tempo window of
/// both neighbours and whose key (under some shift) matches either
/// neighbour's effective key. Closest-to-average BPM first, capped at 10.
fn find_insertion_candidates<'a>(
    a_bpm: u32,
    a_eff: CamelotKey,
    b_bpm: u32,
    b_eff: CamelotKey,
    library: &'a [MixTrack],
    tempo_threshold: f64,
) -> Vec<InsertionCandidate<'a>> {
    let low = (a_bpm as f64 - tempo_threshold).max(b_bpm as f64 - tempo_threshold);
    let high = (a_bpm as f64 + tempo_threshold).min(b_bpm as f64 + tempo_threshold);
    if low > high {
        return Vec::new();
    }

    let mut candidates: Vec<InsertionCandidate<'a>> = library
        .iter()
        .filter(|t| (low..=high).contains(&(t.bpm as f64)))
        .filter_map(|t| {
            for s in [-1i8, 0, 1] {
                let effective = t.key.shift(s);
                if effective == a_eff || effective == b_eff {
                    return Some(InsertionCandidate {
                        track: t,
                        shift: s,
                        effective,
                    });
                }
            }
            None
        })
        .collect();

    let avg_bpm = (a_bpm as f64 + b_bpm as f64) / 2.0;
    candidates.sort_by(|x, y| {
        (x.track.bpm as f64 - avg_bpm)
            .abs()
            .total_cmp(&(y.track.bpm as f64 - avg_bpm).abs())
    });
    candidates.truncate(10);
    candidates
}

/// For each transition whose BPM gap is past the tempo threshold but short
/// of a hard break, print library tracks that could be inserted to smooth
/// it over.
pub fn print_tempo_break_candidates(
    tracks: &[MixTrack],
    result: &MixResult,
    library: &[MixTrack],
    cost: &CostParams,
) {
    println!("\nCandidate insertion tracks for tempo break transitions:");
    let order = &result.best_order;
    for pos in 0..order.len() - 1 {
        let (ia, ib) = (order[pos], order[pos + 1]);
        let (a, b) = (&tracks[ia], &tracks[ib]);
        let diff = (a.bpm as f64 - b.bpm as f64).abs();
        if diff <= cost.tempo_threshold || diff > cost.tempo_break_threshold() {
            continue;
        }

        let (sa, sb) = (result.best_shifts[ia], result.best_shifts[ib]);
        let (a_eff, b_eff) = (a.key.shift(sa), b.key.shift(sb));

        println!("\nTransition between:");
        println!(
            "  {} | BPM: {} | Key: {} [{:+}] -> {}",
            a.display_name(),
            a.bpm,
            a.key,
            sa,
            a_eff
        );
        println!(
            "  {} | BPM: {} | Key: {} [{:+}] -> {}",
            b.display_name(),
            b.bpm,
            b.key,
            sb,
            b_eff
        );

        let candidates =
            find_insertion_candidates(a.bpm, a_eff, b.bpm, b_eff, library, cost.tempo_threshold);
        if candidates.is_empty() {
            println!("   No suitable candidates found.");
            continue;
        }
        println!(
            "{:>3}  {:<7}  {:<10} -> {:<5}  {:<8}  Song - Artist",
            "No.", "BPM", "OrigKey", "EffKey", "Rating"
        );
        for (i, cand) in candidates.iter().enumerate() {
            let rating = cand
                .track
                .rating
                .map_or_else(|| "N/A".to_string(), |r| r.to_string());
            println!(
                "{:2}. BPM {:3}  {:>3} [{:+}]   -> {:>5}  {:<8}  {}",
                i + 1,
                cand.track.bpm,
                cand.track.key.to_string(),
                cand.shift,
                cand.effective.to_string(),
                rating,
                cand.track.display_name()
            );
        }
    }
}

/// Print the 24-key Camelot reference table with the keys reached by
/// shifting one semitone down and up.
pub fn print_key_table() {
    let header = format!(
        "{:^8} | {:^12} | {:^20} | {:^20}",
        "Camelot", "Real Key", "Down Shift", "Up Shift"
    );
    println!("{}", header);
    println!("{}", "-".repeat(header.len()));
    for key in CamelotKey::all() {
        let down = key.shift(-1);
        let up = key.shift(1);
        println!(
            "{:^8} | {:^12} | {:^20} | {:^20}",
            key.to_string(),
            key.real_name(),
            format!("{} ({})", down, down.real_name()),
            format!("{} ({})", up, up.real_name())
        );
    }
}
