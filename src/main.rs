use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use xrag::{analyze_csv, write_spectrum_csv, PeakPolicy, SyntheticSpectrum, XragConfig};

/// Analyse X-ray spectra from the command line.
#[derive(Debug, Parser)]
#[command(name = "xrag", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Normalize a CSV spectrum, detect peaks and print the analysis as JSON.
    Analyze {
        /// CSV file with `energy` and `intensity` columns.
        csv: PathBuf,
        /// YAML pipeline configuration; flags below override it.
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        window: Option<usize>,
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,
    },
    /// Write a synthetic single-peak spectrum as CSV.
    Generate {
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Randomize the peak centre and width from the seed.
        #[arg(long)]
        jitter: bool,
        /// Output file; stdout when omitted.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    KeepTies,
    SuppressPlateaus,
}

impl From<PolicyArg> for PeakPolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::KeepTies => PeakPolicy::KeepTies,
            PolicyArg::SuppressPlateaus => PeakPolicy::SuppressPlateaus,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    match Cli::parse().command {
        Command::Analyze {
            csv,
            config,
            window,
            threshold,
            policy,
        } => {
            let base = match config {
                Some(path) => XragConfig::from_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => XragConfig::default(),
            };
            let mut peaks_cfg = base.peak_config();
            if let Some(window) = window {
                peaks_cfg = peaks_cfg.with_window(window);
            }
            if let Some(threshold) = threshold {
                peaks_cfg = peaks_cfg.with_threshold(threshold);
            }
            if let Some(policy) = policy {
                peaks_cfg = peaks_cfg.with_policy(policy.into());
            }

            let bytes =
                std::fs::read(&csv).with_context(|| format!("reading {}", csv.display()))?;
            let analysis = analyze_csv(&bytes, &peaks_cfg)?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            serde_json::to_writer_pretty(&mut out, &analysis)?;
            writeln!(out)?;
        }
        Command::Generate {
            seed,
            jitter,
            output,
        } => {
            let generator = if jitter {
                SyntheticSpectrum::jittered(seed)
            } else {
                SyntheticSpectrum {
                    seed,
                    ..SyntheticSpectrum::default()
                }
            };
            let spectrum = generator.generate()?;
            match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    write_spectrum_csv(&spectrum, BufWriter::new(file))?;
                    eprintln!("wrote {} points to {}", spectrum.len(), path.display());
                }
                None => write_spectrum_csv(&spectrum, io::stdout().lock())?,
            }
        }
    }
    Ok(())
}
