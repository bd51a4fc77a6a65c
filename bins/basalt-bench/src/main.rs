use anyhow::Context;
use basalt_config::BenchConfig;
use basalt_perf::{BenchReport, ThroughputConfig, WaitStrategy, format_rate, run_many};
use tracing_subscriber::EnvFilter;

fn load_config() -> anyhow::Result<BenchConfig> {
    match std::env::args().nth(1) {
        Some(path) => BenchConfig::load(&path).with_context(|| format!("loading config {path}")),
        None => Ok(BenchConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    let config = load_config()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    tracing::debug!(?config, "loaded config");

    let cfg = ThroughputConfig {
        slots: config.capacity,
        iterations: config.iterations,
        producer_core: config.producer_core,
        consumer_core: config.consumer_core,
        wait: if config.backoff {
            WaitStrategy::Backoff
        } else {
            WaitStrategy::Spin
        },
    };

    tracing::info!(
        slots = cfg.slots,
        iterations = cfg.iterations,
        runs = config.runs,
        wait = ?cfg.wait,
        "starting spsc throughput benchmark"
    );
    let runs = run_many(&cfg, config.runs).context("throughput run failed")?;
    let report = BenchReport::new(runs);

    for (i, run) in report.runs.iter().enumerate() {
        println!(
            "run {:>3}: {:.3} seconds  {:>8.2} ns/op  {}",
            i + 1,
            run.elapsed_secs(),
            run.ns_per_op(),
            format_rate(run.ops_per_sec())
        );
    }
    if let Some(summary) = report.ns_per_op.as_ref().filter(|s| s.count > 1) {
        println!(
            "ns/op: min {:.2}  median {:.2}  mean {:.2}  max {:.2}  stddev {:.2}",
            summary.min, summary.median, summary.mean, summary.max, summary.stddev
        );
    }

    if let Some(path) = &config.report_path {
        let json = report.to_json().context("serializing report")?;
        std::fs::write(path, json).with_context(|| format!("writing report to {path}"))?;
        tracing::info!(path, "wrote json report");
    }

    Ok(())
}
