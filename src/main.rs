use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use cmg_extractor::{
    clientes_for_barra, combined_extract, export_frame, fetch_cmg, fetch_ivt, inventory,
    list_barras, list_clientes, write_report, BarClientsLookup, BarraLookup, ClienteLookup,
    CmgQuery, CombinedQuery, IvtQuery, JoinOutcome, JoinSide, QueryReport, SeriesResult,
    SkippedPartition,
};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "cmg_extractor")]
#[command(about = "Query monthly CMg/IVT parquet archives")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Arguments every query shares: the data root and the inclusive month
/// window.
#[derive(Args, Clone)]
struct Window {
    /// Base folder; its parent must hold the All_Data archive
    #[arg(long)]
    root: PathBuf,

    /// Inclusive start month (YYYY-MM)
    #[arg(long)]
    date_i: String,

    /// Inclusive end month (YYYY-MM)
    #[arg(long)]
    date_f: String,
}

#[derive(Subcommand)]
enum Command {
    /// Extract marginal-cost rows for bars matching a pattern
    Cmg {
        #[command(flatten)]
        window: Window,
        /// Comma-separated bar name fragments
        #[arg(long)]
        barras: String,
        #[arg(long, value_enum, default_value = "files")]
        output: OutputMode,
    },
    /// Extract consumption rows for clients at matching bars
    Consumo {
        #[command(flatten)]
        window: Window,
        /// Comma-separated client name fragments
        #[arg(long)]
        clientes: String,
        /// Comma-separated bar name fragments
        #[arg(long)]
        barra: String,
        #[arg(long, value_enum, default_value = "files")]
        output: OutputMode,
    },
    /// Consumption joined with withdrawal- and injection-bar prices
    Combinado {
        #[command(flatten)]
        window: Window,
        /// Client name fragment
        #[arg(long)]
        cliente: String,
        /// Withdrawal bar serving the client
        #[arg(long)]
        barra_retiro: String,
        /// Injection bar to compare against
        #[arg(long)]
        barra_iny: String,
        #[arg(long, value_enum, default_value = "files")]
        output: OutputMode,
    },
    /// List distinct bars matching a pattern
    Barras {
        #[command(flatten)]
        window: Window,
        #[arg(long)]
        barras: String,
        #[arg(long, value_enum, default_value = "text")]
        format: ListFormat,
    },
    /// List distinct (Cliente, Barra) pairs for matching clients
    Clientes {
        #[command(flatten)]
        window: Window,
        #[arg(long)]
        clientes: String,
        #[arg(long, value_enum, default_value = "text")]
        format: ListFormat,
    },
    /// List clients drawing from one exact bar
    ClientesBarra {
        #[command(flatten)]
        window: Window,
        /// Exact bar name (trimmed, case-insensitive)
        #[arg(long)]
        barra: String,
        #[arg(long, value_enum, default_value = "text")]
        format: ListFormat,
    },
    /// Show which monthly partitions exist under All_Data
    Disponible {
        /// Base folder; its parent must hold the All_Data archive
        #[arg(long)]
        root: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputMode {
    /// Write parquet + CSV + report under CarpetaOut
    Files,
    /// Print counts only
    Summary,
}

#[derive(Clone, Copy, ValueEnum)]
enum ListFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Cmg {
            window,
            barras,
            output,
        } => {
            let query = CmgQuery {
                data_root: window.root.clone(),
                date_i: window.date_i,
                date_f: window.date_f,
                barras: barras.clone(),
            };
            let pb = spinner("Extracting marginal costs...");
            let started = Instant::now();
            let result = fetch_cmg(&query)?;
            pb.finish_and_clear();
            info!("query completed in {:.2?}", started.elapsed());
            let stem = format!("CMg_{}", stem_fragment(&barras));
            finish_series(result, &window.root, &stem, output)?;
        }
        Command::Consumo {
            window,
            clientes,
            barra,
            output,
        } => {
            let query = IvtQuery {
                data_root: window.root.clone(),
                date_i: window.date_i,
                date_f: window.date_f,
                clientes: clientes.clone(),
                barra,
            };
            let pb = spinner("Extracting consumption...");
            let started = Instant::now();
            let result = fetch_ivt(&query)?;
            pb.finish_and_clear();
            info!("query completed in {:.2?}", started.elapsed());
            let stem = format!("Consumo_{}", stem_fragment(&clientes));
            finish_series(result, &window.root, &stem, output)?;
        }
        Command::Combinado {
            window,
            cliente,
            barra_retiro,
            barra_iny,
            output,
        } => {
            let query = CombinedQuery {
                data_root: window.root.clone(),
                date_i: window.date_i,
                date_f: window.date_f,
                cliente: cliente.clone(),
                barra_retiro,
                barra_iny,
            };
            let pb = spinner("Extracting consumption and marginal costs...");
            let started = Instant::now();
            let result = combined_extract(&query)?;
            pb.finish_and_clear();
            info!("combined extract completed in {:.2?}", started.elapsed());

            print_skips(&result.skipped);
            match result.outcome {
                JoinOutcome::Joined(df) => {
                    println!("✅ {} combined rows", df.height());
                    if matches!(output, OutputMode::Files) {
                        let stem = format!("Consumo_CMG_{}", stem_fragment(&cliente));
                        let paths = export_frame(&df, &window.root, &stem)?;
                        let report = QueryReport::new(df.height(), &result.skipped);
                        write_report(&report, &window.root, &stem)?;
                        println!("📦 saved {}", paths.parquet.display());
                        println!("💾 saved {}", paths.csv.display());
                    }
                }
                JoinOutcome::EmptyInput(JoinSide::Consumption) => {
                    println!("no consumption rows matched; nothing to join");
                }
                JoinOutcome::EmptyInput(JoinSide::Prices) => {
                    println!("no marginal-cost rows matched; nothing to join");
                }
            }
        }
        Command::Barras {
            window,
            barras,
            format,
        } => {
            let result = list_barras(&BarraLookup {
                data_root: window.root,
                date_i: window.date_i,
                date_f: window.date_f,
                barras,
            })?;
            print_skips(&result.skipped);
            match format {
                ListFormat::Json => println!("{}", serde_json::to_string_pretty(&result.values)?),
                ListFormat::Text => {
                    for value in &result.values {
                        println!("{}", value);
                    }
                    println!("Barras encontradas: {}", result.values.len());
                }
            }
        }
        Command::Clientes {
            window,
            clientes,
            format,
        } => {
            let result = list_clientes(&ClienteLookup {
                data_root: window.root,
                date_i: window.date_i,
                date_f: window.date_f,
                clientes,
            })?;
            print_skips(&result.skipped);
            match format {
                ListFormat::Json => println!("{}", serde_json::to_string_pretty(&result.pairs)?),
                ListFormat::Text => {
                    for pair in &result.pairs {
                        println!("{}", pair);
                    }
                    println!("Clientes encontrados: {}", result.pairs.len());
                }
            }
        }
        Command::ClientesBarra {
            window,
            barra,
            format,
        } => {
            let result = clientes_for_barra(&BarClientsLookup {
                data_root: window.root,
                date_i: window.date_i,
                date_f: window.date_f,
                barra,
            })?;
            print_skips(&result.skipped);
            match format {
                ListFormat::Json => println!("{}", serde_json::to_string_pretty(&result.values)?),
                ListFormat::Text => {
                    for value in &result.values {
                        println!("{}", value);
                    }
                    println!("Clientes encontrados: {}", result.values.len());
                }
            }
        }
        Command::Disponible { root } => {
            let pb = spinner("Scanning All_Data...");
            let entries = inventory(&root)?;
            pb.finish_and_clear();
            for entry in &entries {
                println!("{}  {}", entry.kind, entry.token);
            }
            println!("Partitions available: {}", entries.len());
        }
    }

    Ok(())
}

/// Shared tail for the two row-level queries: print the three-way outcome
/// (rows / no matches / pre-flight rejection handled upstream) and export
/// when asked.
fn finish_series(
    result: SeriesResult,
    root: &std::path::Path,
    stem: &str,
    output: OutputMode,
) -> Result<()> {
    print_skips(&result.skipped);
    let skipped = result.skipped.clone();
    match result.into_frame() {
        Some(df) => {
            println!("✅ {} rows", df.height());
            if matches!(output, OutputMode::Files) {
                let paths = export_frame(&df, root, stem)?;
                let report = QueryReport::new(df.height(), &skipped);
                write_report(&report, root, stem)?;
                println!("📦 saved {}", paths.parquet.display());
                println!("💾 saved {}", paths.csv.display());
            }
        }
        None => println!("no matches in range"),
    }
    Ok(())
}

fn print_skips(skipped: &[SkippedPartition]) {
    for skip in skipped {
        println!("⚠️  skipped {} {}: {}", skip.kind, skip.token, skip.reason);
    }
}

/// Turn a comma-separated pattern into a filename-friendly fragment.
fn stem_fragment(pattern: &str) -> String {
    pattern
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .replace(['/', '\\'], "-")
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
