//! Small end-to-end optimization demo on a hardcoded track pool.
//!
//! Usage:
//!   cargo run --package setflow-core --example optimize_demo

use std::time::Duration;

use setflow_core::{
    optimize_mix, AnnealParams, CamelotKey, CostParams, LogSink, RunOptions, TransitionTables,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // (bpm, key) pool: a couple of clean clusters plus one outlier that
    // forces a tempo break.
    let pool: &[(u32, &str)] = &[
        (124, "8A"),
        (126, "8B"),
        (122, "9A"),
        (128, "7A"),
        (125, "5A"),
        (90, "3B"),
        (123, "10A"),
        (127, "12B"),
    ];

    let bpm: Vec<u32> = pool.iter().map(|(b, _)| *b).collect();
    let keys: Vec<CamelotKey> = pool
        .iter()
        .map(|(_, k)| k.parse())
        .collect::<Result<_, _>>()?;

    let cost = CostParams::default();
    let anneal = AnnealParams {
        total_iterations: 100_000,
        reporting_rate: 25_000,
        ..AnnealParams::default()
    };
    let tables = TransitionTables::build(&cost);

    let opts = RunOptions {
        seed: Some(1),
        progress: Some(&LogSink),
        ..RunOptions::default()
    };
    let result = optimize_mix(
        &bpm,
        &keys,
        &tables,
        &cost,
        &anneal,
        Duration::from_secs(2),
        &opts,
    )?;

    println!(
        "best cost {:.1} (H={:.1} T={:.1} S={:.1}) over {} attempts",
        result.best_cost,
        result.best_breakdown.harmonic,
        result.best_breakdown.tempo,
        result.best_breakdown.shift,
        result.n_attempts
    );
    for (pos, &i) in result.best_order.iter().enumerate() {
        let effective = keys[i].shift(result.best_shifts[i]);
        println!(
            "{:2}. BPM {:3}  {:>3} [{:+}] -> {:>3}",
            pos + 1,
            bpm[i],
            keys[i].to_string(),
            result.best_shifts[i],
            effective.to_string()
        );
    }
    Ok(())
}
