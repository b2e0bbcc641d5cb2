//! Funnel Report — derives conversion metrics, diagram geometry, and printable
//! report fields from a snapshot of funnel stage counts.
//!
//! Reads the stage counts as JSON (file or stdin) and writes JSON to stdout.

use anyhow::Context;
use clap::{Parser, Subcommand};
use funnel_core::{AppConfig, FunnelMetrics, ReportPeriod};
use funnel_reporting::{
    FunnelAnalyzer, FunnelLayoutEngine, ReportContext, ReportProjector, ReportTemplate,
};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "funnel-report")]
#[command(about = "Conversion funnel analytics, layout, and report export")]
#[command(version)]
struct Cli {
    /// TOML config file (environment variables still take precedence)
    #[arg(long, env = "FUNNEL_REPORT__CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Conversion rates, insights, and recommended actions
    Analyze {
        /// Stage counts JSON (default: stdin)
        #[arg(short, long)]
        input: Option<String>,
    },

    /// Segment geometry for drawing the funnel diagram
    Layout {
        /// Stage counts JSON (default: stdin)
        #[arg(short, long)]
        input: Option<String>,

        /// Logical width of the drawing surface (overrides config)
        #[arg(long)]
        canvas_width: Option<f64>,
    },

    /// Formatted report fields for the printable document
    Report {
        /// Stage counts JSON (default: stdin)
        #[arg(short, long)]
        input: Option<String>,

        /// Reporting period: today, week, month, quarter, year
        #[arg(short, long, default_value = "month")]
        period: String,

        /// JSON array of the field keys the report template displays
        #[arg(short, long)]
        template: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "funnel_report=info,funnel_reporting=info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze { input } => {
            let metrics = read_metrics(input.as_deref())?;
            let analysis =
                FunnelAnalyzer::from_config(&config.report).analyze_metrics(&metrics, &config.labels);
            info!(
                health = ?analysis.health,
                flagged = analysis.recommendations.len(),
                "Funnel analysis complete"
            );
            emit(&analysis)
        }
        Commands::Layout {
            input,
            canvas_width,
        } => {
            let metrics = read_metrics(input.as_deref())?;
            let mut engine = FunnelLayoutEngine::from_config(&config.layout);
            if let Some(width) = canvas_width {
                anyhow::ensure!(
                    width.is_finite() && width > 0.0,
                    "canvas width must be positive, got {width}"
                );
                engine = engine.with_canvas_width(width);
            }
            let layout = engine.layout(&metrics.diagram_stages(&config.labels));
            info!(
                segments = layout.segments.len(),
                total_height = layout.total_height,
                "Funnel layout complete"
            );
            emit(&layout)
        }
        Commands::Report {
            input,
            period,
            template,
        } => {
            let metrics = read_metrics(input.as_deref())?;
            let resolved = ReportPeriod::from_key(&period);
            if resolved.key() != period {
                warn!(requested = %period, resolved = resolved.key(), "Unknown period, using default");
            }

            let analysis =
                FunnelAnalyzer::from_config(&config.report).analyze_metrics(&metrics, &config.labels);
            let mut document = ReportProjector::new(&config.report, &config.labels)
                .document(&analysis, &ReportContext::now(resolved));

            if let Some(path) = template {
                let template = ReportTemplate::from_path(&path)
                    .with_context(|| format!("loading report template {path}"))?;
                document = document.bind(&template);
            }

            info!(
                report_id = %document.report_id,
                period = resolved.key(),
                fields = document.fields.len(),
                "Report generated"
            );
            println!("{}", document.export_json()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&str>) -> anyhow::Result<AppConfig> {
    match AppConfig::load(path) {
        Ok(config) => Ok(config),
        Err(e) if path.is_none() => {
            warn!(error = %e, "Failed to load config, using defaults");
            Ok(AppConfig::default())
        }
        Err(e) => Err(e).with_context(|| format!("loading config {}", path.unwrap_or_default())),
    }
}

fn read_metrics(path: Option<&str>) -> anyhow::Result<FunnelMetrics> {
    match path {
        Some(path) => FunnelMetrics::from_path(path)
            .with_context(|| format!("loading stage counts from {path}")),
        None => FunnelMetrics::from_reader(std::io::stdin().lock())
            .context("loading stage counts from stdin"),
    }
}

fn emit<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
