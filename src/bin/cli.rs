//! Pipeframe CLI
//!
//! Command-line interface for running pipes directly:
//! - Query a pipe and print its frames
//! - Fetch template variable values
//! - Check upstream health and list pipes
//! - Generate a default config file

use anyhow::{bail, Context};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use pipeframe::config::{generate_default_config, Config};
use pipeframe::frame::{Field, FieldValues, Frame, OutputFormat};
use pipeframe::logging::init_tracing;
use pipeframe::query::{ExecutorOptions, PipeQuery, QueryExecutor, TimeRange};
use pipeframe::upstream::{PipeClient, PipeSource};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pipeframe-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run analytics pipes and print their results as data frames")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Upstream API host, overrides the config
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub output: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a pipe and print its frames
    Query {
        /// Pipe name
        pipe: String,
        /// Pipe parameters in key=value format; values may use ${__from}/${__to}
        #[arg(short, long)]
        param: Vec<String>,
        /// Time range ending now (e.g., 6h, 7d, 4w)
        #[arg(short, long, default_value = "6h")]
        last: String,
        /// Time column (default: first temporal column)
        #[arg(short, long)]
        time_key: Option<String>,
        /// Frame shape (timeseries, wide, table)
        #[arg(short, long, default_value = "timeseries")]
        format: String,
        /// Value columns to keep (comma-separated)
        #[arg(long, default_value = "")]
        data_keys: String,
        /// Label columns to pivot by (comma-separated)
        #[arg(long, default_value = "")]
        label_keys: String,
    },

    /// Print distinct values of a column
    Variables {
        /// Pipe name
        pipe: String,
        /// Column to read values from
        key: String,
        /// Pipe parameters in key=value format
        #[arg(short, long)]
        param: Vec<String>,
        /// Time range ending now (e.g., 6h, 7d, 4w)
        #[arg(short, long, default_value = "6h")]
        last: String,
    },

    /// Check that the upstream API accepts our token
    Health,

    /// List pipes exposed as endpoints
    Pipes,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        return write_default_config(output.as_ref());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(host) = &cli.host {
        config.upstream.host = host.clone();
    }

    init_tracing(&config.logging);

    let client = PipeClient::new(config.upstream.client_config())
        .context("invalid upstream configuration (set PIPEFRAME_TOKEN or [upstream] token)")?;
    let client: Arc<dyn PipeSource> = Arc::new(client);
    let options: ExecutorOptions = config.query.executor_options();
    let executor = QueryExecutor::new(Arc::clone(&client), options);

    match cli.command {
        Commands::Query {
            pipe,
            param,
            last,
            time_key,
            format,
            data_keys,
            label_keys,
        } => {
            let mut query = PipeQuery::new("cli", pipe)
                .format(parse_format(&format)?)
                .time_range(last_range(&last)?);
            for (key, value) in parse_params(&param)? {
                query = query.param(key, value);
            }
            if let Some(key) = time_key {
                query = query.time_key(key);
            }
            query.data_keys = data_keys;
            query.label_keys = label_keys;

            let frames = executor.execute(&query).await?;

            match cli.output.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&frames)?),
                _ => {
                    for frame in &frames {
                        print_frame(frame);
                        println!();
                    }
                }
            }
        }

        Commands::Variables {
            pipe,
            key,
            param,
            last,
        } => {
            let mut query = PipeQuery::new("cli", pipe)
                .variable_key(key)
                .time_range(last_range(&last)?);
            for (k, v) in parse_params(&param)? {
                query = query.param(k, v);
            }

            let values = executor.variable_values(&query).await?;

            match cli.output.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&values)?),
                _ => {
                    if values.is_empty() {
                        println!("No values");
                    }
                    for value in values {
                        println!("{}", value);
                    }
                }
            }
        }

        Commands::Health => {
            let report = client.health_check().await;

            match cli.output.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&report)?),
                _ => {
                    println!("Upstream: {}", config.upstream.host);
                    println!("Status: {}", report.message);
                }
            }

            if !report.is_healthy() {
                std::process::exit(1);
            }
        }

        Commands::Pipes => {
            let pipes = client.list_pipes().await?;

            match cli.output.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&pipes)?),
                _ => {
                    if pipes.is_empty() {
                        println!("No endpoint pipes found.");
                    } else {
                        println!("{:<40} {}", "Name", "ID");
                        println!("{}", "-".repeat(60));
                        for pipe in pipes {
                            println!("{:<40} {}", pipe.name, pipe.id);
                        }
                    }
                }
            }
        }

        Commands::Config { .. } => {}
    }

    Ok(())
}

fn write_default_config(output: Option<&PathBuf>) -> anyhow::Result<()> {
    let config = generate_default_config();

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &config)?;
            println!("Config written to {:?}", path);
        }
        None => {
            print!("{}", config);
        }
    }

    Ok(())
}

fn parse_format(s: &str) -> anyhow::Result<OutputFormat> {
    match s.trim().to_lowercase().as_str() {
        "timeseries" | "time_series" => Ok(OutputFormat::TimeSeries),
        "wide" => Ok(OutputFormat::Wide),
        "table" => Ok(OutputFormat::Table),
        other => bail!("Invalid format: {}. Use: timeseries, wide, table", other),
    }
}

fn parse_params(params: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    params
        .iter()
        .map(|p| match p.split_once('=') {
            Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
            _ => bail!("Invalid parameter: {}. Use key=value", p),
        })
        .collect()
}

fn last_range(s: &str) -> anyhow::Result<TimeRange> {
    let to = Utc::now();
    Ok(TimeRange::new(to - parse_duration(s)?, to))
}

fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim().to_lowercase();

    if let Some(hours) = s.strip_suffix('h') {
        Ok(Duration::hours(hours.parse()?))
    } else if let Some(days) = s.strip_suffix('d') {
        Ok(Duration::days(days.parse()?))
    } else if let Some(weeks) = s.strip_suffix('w') {
        Ok(Duration::weeks(weeks.parse()?))
    } else if let Some(months) = s.strip_suffix('m') {
        Ok(Duration::days(months.parse::<i64>()? * 30))
    } else {
        bail!("Invalid duration format: {}. Use: 6h, 7d, 4w, 3m", s)
    }
}

fn print_frame(frame: &Frame) {
    println!("== {} ({} rows)", frame.name, frame.row_count());

    let headers: Vec<String> = frame.fields.iter().map(field_header).collect();
    println!("{}", headers.join(" | "));
    println!("{}", "-".repeat(headers.iter().map(|h| h.len() + 3).sum::<usize>()));

    for row in 0..frame.row_count() {
        let cells: Vec<String> = frame
            .fields
            .iter()
            .zip(&headers)
            .map(|(field, header)| format!("{:<width$}", cell(field, row), width = header.len()))
            .collect();
        println!("{}", cells.join(" | "));
    }
}

fn field_header(field: &Field) -> String {
    if field.labels.is_empty() {
        return format!("{:<20}", field.name);
    }
    let labels: Vec<String> = field
        .labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    format!("{:<20}", format!("{}{{{}}}", field.name, labels.join(",")))
}

fn cell(field: &Field, row: usize) -> String {
    match &field.values {
        FieldValues::Numeric(v) => v.get(row).copied().flatten().map(|n| n.to_string()),
        FieldValues::Temporal(v) => v
            .get(row)
            .copied()
            .flatten()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
        FieldValues::Textual(v) => v.get(row).cloned().flatten(),
    }
    .unwrap_or_else(|| "-".to_string())
}
