use anyhow::Context;
use clap::Parser;
use generator::calibration::{synthetic_reference, write_calibration};
use harmloccore::transport::{MemoryChannel, RecordChannel, UdpChannel};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::WorkflowConfig;
use workflow::runner::{is_fatal, CycleSummary, Runner};

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Synthetic driver for the harmonic tag localizer")]
struct Args {
    /// Run the configured number of cycles and print one JSON line per cycle
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Keep producing cycles on the scenario interval until Ctrl+C
    #[arg(long, default_value_t = false)]
    serve: bool,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    #[arg(long)]
    cycles: Option<usize>,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    #[arg(long)]
    calibration: Option<PathBuf>,
    #[arg(long)]
    fft_threads: Option<usize>,
    /// Capture records in memory instead of sending datagrams
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    /// Write a synthetic calibration file to the calibration path before starting
    #[arg(long, default_value_t = false)]
    write_calibration: bool,
}

fn print_summary(summary: &CycleSummary) -> anyhow::Result<()> {
    let line = serde_json::to_string(summary).context("serializing cycle summary")?;
    println!("{}", line);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = if let Some(path) = args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::default()
    };
    if let Some(cycles) = args.cycles {
        config.scenario.cycles = cycles;
    }
    if let Some(host) = args.host {
        config.localizer.destination.host = host;
    }
    if let Some(port) = args.port {
        config.localizer.destination.port = port;
    }
    if let Some(path) = args.calibration {
        config.localizer.calibration_path = path;
    }
    if let Some(threads) = args.fft_threads {
        config.localizer.fft_threads = threads;
    }

    if args.write_calibration {
        let reference = synthetic_reference(&config.localizer.layout, config.scenario.seed);
        write_calibration(&config.localizer.calibration_path, &reference)?;
        info!(
            "wrote {} calibration phasors to {}",
            reference.len(),
            config.localizer.calibration_path.display()
        );
    }

    let channel: Arc<dyn RecordChannel> = if args.dry_run {
        Arc::new(MemoryChannel::new())
    } else {
        Arc::new(UdpChannel::new())
    };
    let mut runner = Runner::new(&config, channel)?;

    if args.offline {
        for summary in runner.run(config.scenario.cycles)? {
            print_summary(&summary)?;
        }
    }
    if args.serve {
        info!("streaming cycles every {} ms (Ctrl+C to stop)", config.scenario.interval_ms);
        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for the cycle loop")?;
        runtime.block_on(async {
            let mut ticker =
                tokio::time::interval(Duration::from_millis(config.scenario.interval_ms.max(1)));
            loop {
                tokio::select! {
                    _ = ticker.tick() => match runner.step() {
                        Ok(summary) => print_summary(&summary)?,
                        Err(err) if is_fatal(&err) => return Err(err.context("stopping stream")),
                        Err(err) => warn!("cycle failed: {:#}", err),
                    },
                    result = signal::ctrl_c() => {
                        result.context("awaiting Ctrl+C to exit")?;
                        break;
                    }
                }
            }
            Ok::<(), anyhow::Error>(())
        })?;
    }

    let metrics = runner.metrics();
    info!(
        "cycles={} failed={} sent={} send_failures={} non_finite={}",
        metrics.cycles,
        metrics.failed_cycles,
        metrics.records_sent,
        metrics.send_failures,
        metrics.non_finite_solutions
    );
    runner.shutdown();
    Ok(())
}
