use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use setflow_core::{
    optimize_mix, AnnealParams, CostParams, LogSink, MixEvaluator, RunOptions, TransitionTables,
};
use setflow_library::{load_playlist, select_mix_tracks};

mod report;

/// Setflow: orders a pool of tracks and picks per-track pitch shifts so the
/// whole set mixes with as little harmonic and tempo dissonance as possible.
#[derive(Parser, Debug)]
#[command(name = "setflow")]
#[command(about = "Setflow DJ set optimizer")]
struct Args {
    /// Playlist export (JSON) with BPM and Camelot key per track
    #[arg(required_unless_present = "key_table")]
    playlist: Option<PathBuf>,

    /// Optimization time budget in minutes
    #[arg(default_value_t = 5.0)]
    minutes: f64,

    /// RNG seed for a reproducible run (also disables parallel attempts)
    #[arg(long)]
    seed: Option<u64>,

    /// Second playlist searched for insertion candidates at tempo breaks
    #[arg(long)]
    candidates: Option<PathBuf>,

    /// Print the 24-key Camelot reference table and exit
    #[arg(long)]
    key_table: bool,
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.key_table {
        report::print_key_table();
        return Ok(());
    }

    if args.minutes <= 0.0 || !args.minutes.is_finite() {
        anyhow::bail!("time budget must be a positive number of minutes");
    }

    let playlist_path = args
        .playlist
        .context("a playlist file is required (or pass --key-table)")?;
    let entries = load_playlist(&playlist_path)
        .with_context(|| format!("loading playlist {:?}", playlist_path))?;
    let tracks = select_mix_tracks(&entries);
    if tracks.len() < 2 {
        anyhow::bail!(
            "need at least two tracks with a valid BPM and Camelot key (got {})",
            tracks.len()
        );
    }

    let bpm: Vec<u32> = tracks.iter().map(|t| t.bpm).collect();
    let keys: Vec<_> = tracks.iter().map(|t| t.key).collect();

    let cost = CostParams::default();
    let anneal = AnnealParams::default();
    let tables = TransitionTables::build(&cost);
    let time_limit = Duration::from_secs_f64(args.minutes * 60.0);

    println!("Time budget: {} min", args.minutes);
    let opts = RunOptions {
        seed: args.seed,
        progress: Some(&LogSink),
        ..RunOptions::default()
    };
    let result = optimize_mix(&bpm, &keys, &tables, &cost, &anneal, time_limit, &opts)?;

    println!(
        "\nOptimizer finished: {} attempts in {:.1}s",
        result.n_attempts,
        result.elapsed.as_secs_f64()
    );
    report::print_attempts(&result);
    report::print_per_track(&tracks, &result);

    // The renderer reuses the engine's cost primitives read-only.
    let eval = MixEvaluator::new(&bpm, &keys, &tables, &cost)?;
    report::print_mix_order(&tracks, &result, &eval, &tables, &cost);

    if let Some(candidates_path) = args.candidates {
        let library = select_mix_tracks(
            &load_playlist(&candidates_path)
                .with_context(|| format!("loading candidate playlist {:?}", candidates_path))?,
        );
        report::print_tempo_break_candidates(&tracks, &result, &library, &cost);
    }

    Ok(())
}
