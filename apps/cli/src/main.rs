#![deny(warnings)]

//! Headless CLI: walk a plan scenario through the wizard and print the analysis.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use persistence::{default_session_dir, FileStorage, MemoryStorage, SessionStorage};
use plan_core::PlannerConfig;
use plan_runtime::{export_report, open_session, run_scenario, Scenario, SessionGate};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_SCENARIO: &str = "assets/scenarios/cevicheria_valle.yaml";

#[derive(Debug, Default)]
struct Args {
    scenario: Option<PathBuf>,
    config: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    persist: bool,
    export: Option<PathBuf>,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--scenario" => args.scenario = it.next().map(PathBuf::from),
            "--config" => args.config = it.next().map(PathBuf::from),
            "--data-dir" => args.data_dir = it.next().map(PathBuf::from),
            "--export" => args.export = it.next().map(PathBuf::from),
            "--persist" => args.persist = true,
            _ => {}
        }
    }
    args
}

/// The CLI user owns the machine, so every gated action is open.
struct LocalSession;

impl SessionGate for LocalSession {
    fn is_authenticated(&self) -> bool {
        true
    }
    fn is_demo_mode(&self) -> bool {
        false
    }
    fn has_premium_access(&self) -> bool {
        true
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<PlannerConfig> {
    let Some(path) = path else {
        return Ok(PlannerConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    Ok(PlannerConfig::from_yaml_str(&text)?)
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = parse_args();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        sha = env!("PLAN_GIT_SHA"),
        built = env!("PLAN_BUILD_DATE"),
        ?args,
        "starting planner CLI"
    );

    let cfg = load_config(args.config.as_ref())?;
    let scenario_path = args
        .scenario
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SCENARIO));
    let scenario = Scenario::load(&scenario_path)
        .with_context(|| format!("loading scenario {}", scenario_path.display()))?;

    let data_dir = args
        .data_dir
        .clone()
        .or_else(|| args.persist.then(|| PathBuf::from(default_session_dir())));
    let storage: Box<dyn SessionStorage> = match &data_dir {
        Some(dir) => Box::new(FileStorage::open(dir)?),
        None => Box::new(MemoryStorage::new()),
    };
    let mut ctl = open_session(storage, cfg);
    let walk = run_scenario(&mut ctl, &scenario, Instant::now())?;

    for report in &walk.reports {
        let mark = if report.passes() { "ok" } else { "!!" };
        println!("[{mark}] {}", report.step);
        for err in &report.structural {
            println!("     {}: {err}", err.field());
        }
        for finding in report.heuristics.iter().flat_map(|h| &h.findings) {
            println!("     {finding}");
        }
    }
    if let Some(err) = &walk.stopped {
        bail!("scenario '{}' stopped at {}: {err}", scenario.name, walk.reached);
    }
    ctl.unload()?;

    let Some(analysis) = ctl.analysis() else {
        bail!("analysis step reached without an analysis report");
    };
    let m = &analysis.metrics;
    println!(
        "Plan OK | {} | products: {} | priced: {}",
        ctl.data().configuration.name,
        m.products.len(),
        m.pricing.priced_count
    );
    println!(
        "KPI | investment: ${} | fixed/month: ${} | avg margin: {}% | break-even: {} | score: {} ({})",
        m.total_expenses.round_dp(2),
        m.total_fixed_cost.round_dp(2),
        m.pricing.average_margin_pct.round_dp(1),
        m.break_even
            .as_ref()
            .map_or_else(|| "n/a".to_string(), |b| format!("{} units/month", b.units_ceil())),
        m.viability_score,
        m.decision
    );
    if let Some(opt) = &analysis.optimized {
        println!(
            "Optimized | avg margin: {}% | break-even: {}",
            opt.average_margin_pct.round_dp(1),
            opt.break_even
                .as_ref()
                .map_or_else(|| "n/a".to_string(), |b| format!("{} units/month", b.units_ceil()))
        );
    }
    for advisory in &analysis.advisories {
        println!("{advisory}");
    }

    if let Some(path) = &args.export {
        let json = export_report(&LocalSession, ctl.data(), m, Utc::now())?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "report exported");
    }
    Ok(())
}
