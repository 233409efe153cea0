//! Delver Headless Floor Cache Harness
//!
//! Drives randomized transition walks against a real save directory and
//! checks the registry invariants after every step. Runs entirely
//! in-process - no rendering, no input.
//!
//! Usage:
//!   cargo run -p delver-simtest
//!   cargo run -p delver-simtest -- --seed 7 --steps 5000 --slots 4 --verbose

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use delver_core::prelude::*;
use delver_logic::constants::INITIAL_RECENCY_MARK;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Headless floor cache harness
#[derive(Parser, Debug)]
#[command(name = "delver-simtest")]
#[command(about = "Random transition walks with floor cache invariant checks")]
struct Args {
    /// RNG seed for the walk and the cache
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Transitions per walk
    #[arg(long, default_value_t = 2000)]
    steps: usize,

    /// Slot capacity (overrides the config file)
    #[arg(long)]
    slots: Option<usize>,

    /// Save directory (default: a fresh temporary directory)
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// JSON cache config to start from
    #[arg(long)]
    config: Option<PathBuf>,

    /// Delete stale backing files found at startup
    #[arg(long)]
    force_cleanup: bool,

    /// Print every check and debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    println!("=== Delver Floor Cache Harness ===\n");

    let base = match base_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Bad configuration: {}", e);
            std::process::exit(2);
        }
    };
    let scratch = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Could not create a scratch directory: {}", e);
            std::process::exit(2);
        }
    };
    let save_root = args
        .save_dir
        .clone()
        .unwrap_or_else(|| scratch.path().to_path_buf());

    let mut results = Vec::new();

    // 1. Startup ownership guard
    results.extend(validate_startup(&base, &save_root.join("startup")));

    // 2. Random walk
    results.extend(validate_random_walk(&base, &save_root.join("walk"), &args));

    // 3. Degraded paths
    results.extend(validate_degraded_paths(&base, &save_root.join("degraded")));

    // 4. Companion roster
    results.extend(validate_roster(&base, &save_root.join("roster")));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || args.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );
    info!("harness finished: {}/{} checks passed", passed, total);

    if failed > 0 {
        std::process::exit(1);
    }
}

fn base_config(args: &Args) -> Result<CacheConfig, CacheError> {
    let mut config = match &args.config {
        Some(path) => CacheConfig::from_json_file(path)?,
        None => CacheConfig::default(),
    };
    config.seed = Some(args.seed);
    if let Some(slots) = args.slots {
        config.slot_capacity = slots;
    }
    config.validate()?;
    Ok(config)
}

fn open(base: &CacheConfig, dir: &Path, force_cleanup: bool) -> Result<FloorCache, CacheError> {
    FloorCache::with_defaults(base.clone().with_save_dir(dir), force_cleanup)
}

fn check(results: &mut Vec<TestResult>, name: &str, passed: bool, detail: String) {
    if passed {
        debug!("{} passed: {}", name, detail);
    } else {
        warn!("{} failed: {}", name, detail);
    }
    results.push(TestResult {
        name: name.into(),
        passed,
        detail,
    });
}

// ── 1. Startup ──────────────────────────────────────────────────────────

fn validate_startup(base: &CacheConfig, dir: &Path) -> Vec<TestResult> {
    println!("--- Startup ---");
    let mut results = Vec::new();

    if let Err(e) = fs::create_dir_all(dir) {
        check(&mut results, "startup_dir", false, e.to_string());
        return results;
    }
    let stale = dir.join(format!("{}.F01", base.save_name));
    let _ = fs::write(&stale, b"stale");

    let refused = matches!(open(base, dir, false), Err(CacheError::StaleBackingFile { .. }));
    check(
        &mut results,
        "startup_refuses_stale_file",
        refused,
        format!("stale file present: {}", stale.exists()),
    );

    match open(base, dir, true) {
        Ok(mut cache) => {
            check(
                &mut results,
                "startup_force_cleanup",
                !stale.exists(),
                "stale file removed with force".into(),
            );
            let again = cache.initialize(true);
            let leftovers = fs::read_dir(dir).map(|d| d.count()).unwrap_or(usize::MAX);
            check(
                &mut results,
                "startup_cleanup_idempotent",
                matches!(again, Ok(0)) && leftovers == 0,
                format!("second pass {:?}, {} files left", again.ok(), leftovers),
            );
        }
        Err(e) => check(&mut results, "startup_force_cleanup", false, e.to_string()),
    }

    results
}

// ── 2. Random walk ──────────────────────────────────────────────────────

fn random_mode(cache: &FloorCache, rng: &mut StdRng) -> TransitionMode {
    if cache.in_encounter() {
        return TransitionMode::LATERAL;
    }
    match rng.gen_range(0..100) {
        0..=39 => TransitionMode::STAIRS_DOWN,
        40..=74 => TransitionMode::STAIRS_UP,
        75..=79 => TransitionMode::SHAFT_DOWN,
        80..=83 => TransitionMode::SHAFT_UP,
        84..=88 => TransitionMode::TRAP_DOOR,
        89..=91 => TransitionMode::TELEPORT_LEVEL_UP,
        92..=94 => TransitionMode::TELEPORT_LEVEL_DOWN,
        95..=97 => TransitionMode::ENTER_ENCOUNTER,
        _ => TransitionMode::STAIRS_DOWN | TransitionMode::NO_RETURN,
    }
}

fn validate_random_walk(base: &CacheConfig, dir: &Path, args: &Args) -> Vec<TestResult> {
    println!("--- Random Walk ({} steps) ---", args.steps);
    let mut results = Vec::new();

    let mut cache = match open(base, dir, args.force_cleanup) {
        Ok(cache) => cache,
        Err(e) => {
            check(&mut results, "walk_open", false, e.to_string());
            return results;
        }
    };
    let mut rng = StdRng::seed_from_u64(args.seed);
    let capacity = cache.registry().capacity();

    let mut first_failure: Option<String> = None;
    let mut max_live = 0;
    let mut max_depth = 0;
    let mut evictions = 0;
    let mut flushes = 0;
    let mut restores = 0;

    for step in 0..args.steps {
        cache.advance_turns(rng.gen_range(1..200));
        let mode = random_mode(&cache, &mut rng);
        let report = cache.request_transition(mode);

        evictions += report.evicted.len();
        flushes += usize::from(report.flushed);
        restores += usize::from(report.arrival == ArrivalKind::Restored);
        max_live = max_live.max(cache.registry().live_count());
        max_depth = max_depth.max(cache.depth());

        let problem = if let Err(e) = cache.validate() {
            Some(e.to_string())
        } else if cache.registry().live_count() > capacity {
            Some(format!("{} live slots", cache.registry().live_count()))
        } else if cache.current_floor().is_some()
            && cache
                .backing_path(cache.current_floor())
                .map(|p| p.exists())
                .unwrap_or(true)
        {
            Some(format!("{} still has a backing file", cache.current_floor()))
        } else if report.flushed && cache.registry().clock() != INITIAL_RECENCY_MARK {
            Some("clock not reset by flush".into())
        } else {
            None
        };

        if let Some(problem) = problem {
            first_failure = Some(format!("step {} ({:?}): {}", step, mode, problem));
            break;
        }
    }

    check(
        &mut results,
        "walk_invariants",
        first_failure.is_none(),
        first_failure.unwrap_or_else(|| format!("{} steps clean", args.steps)),
    );
    check(
        &mut results,
        "walk_capacity_bound",
        max_live <= capacity,
        format!("max {} of {} slots live, deepest {}", max_live, capacity, max_depth),
    );
    check(
        &mut results,
        "walk_exercised_cache",
        args.steps < 100 || (evictions > 0 || restores > 0),
        format!("{} evictions, {} restores, {} flushes", evictions, restores, flushes),
    );

    let released = cache.shutdown();
    let leftovers = fs::read_dir(dir).map(|d| d.count()).unwrap_or(usize::MAX);
    check(
        &mut results,
        "walk_shutdown_clean",
        leftovers == 0,
        format!("released {} files, {} left", released, leftovers),
    );

    results
}

// ── 3. Degraded paths ───────────────────────────────────────────────────

fn validate_degraded_paths(base: &CacheConfig, dir: &Path) -> Vec<TestResult> {
    println!("--- Degraded Paths ---");
    let mut results = Vec::new();

    let mut cache = match open(base, dir, true) {
        Ok(cache) => cache,
        Err(e) => {
            check(&mut results, "degraded_open", false, e.to_string());
            return results;
        }
    };

    cache.request_transition(TransitionMode::STAIRS_DOWN);
    let upper = cache.current_floor();
    cache.request_transition(TransitionMode::STAIRS_DOWN);
    let lower = cache.current_floor();

    // Corrupt the floor above, then climb back into it.
    if let Some(path) = cache.backing_path(upper) {
        let _ = fs::write(path, b"garbage");
    }
    let report = cache.request_transition(TransitionMode::STAIRS_UP);
    let severed = cache
        .registry()
        .find_slot(lower)
        .map(|s| s.upper_neighbor.is_none())
        .unwrap_or(false);
    check(
        &mut results,
        "degraded_restore_dead_end",
        report.arrival == ArrivalKind::DeadEnd && severed && cache.validate().is_ok(),
        format!("arrival {:?}, edge severed: {}", report.arrival, severed),
    );

    // Pull the directory out from under a save.
    let leaving = cache.current_floor();
    let _ = fs::remove_dir_all(dir);
    let report = cache.request_transition(TransitionMode::STAIRS_DOWN);
    check(
        &mut results,
        "degraded_persist_no_return",
        report.persist_failed
            && report.mode.contains(TransitionMode::NO_RETURN)
            && !cache.registry().contains(leaving)
            && cache.validate().is_ok(),
        format!("persist failed: {}, mode {:?}", report.persist_failed, report.mode),
    );

    results
}

// ── 4. Roster ───────────────────────────────────────────────────────────

fn validate_roster(base: &CacheConfig, dir: &Path) -> Vec<TestResult> {
    println!("--- Companion Roster ---");
    let mut results = Vec::new();

    let mut cache = match open(base, dir, true) {
        Ok(cache) => cache,
        Err(e) => {
            check(&mut results, "roster_open", false, e.to_string());
            return results;
        }
    };
    let capacity = cache.config().roster_capacity;
    let offered = capacity + 4;

    let level = cache.level_mut();
    let player = level.player;
    let mut spawned = 0;
    for dy in -4..=4 {
        for dx in -4..=4 {
            let pos = player.offset(dx, dy);
            if spawned < offered && level.can_occupy(pos) && level.connector(pos).is_none() {
                level.spawn_pet(Creature::new(1, format!("hound{}", spawned)), pos, 12);
                spawned += 1;
            }
        }
    }

    let report = cache.request_transition(TransitionMode::STAIRS_DOWN);
    let arrived = cache.level().pet_count();
    check(
        &mut results,
        "roster_capacity",
        arrived + report.pets_lost.len() == spawned.min(capacity),
        format!(
            "{} offered, {} carried, {} left, {} lost",
            spawned,
            report.pets_carried,
            report.pets_left_behind,
            report.pets_lost.len()
        ),
    );

    results
}
