//! Vahan Analytics - command line front end
//!
//! ```text
//! vahan summary [--from 2023-01 --to 2023-12 --category 2W --state Maharashtra]
//! vahan growth --by state,manufacturer --kind yoy
//! vahan timeseries --by category
//! vahan export --what manufacturers --output top.xlsx
//! vahan report --output dashboard.json
//! vahan sample --output vahan_sample_data.csv
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vahan_analytics::config::DashboardConfig;
use vahan_analytics::data::{
    DataLoader, DataProcessor, Dimension, FilterError, FilterSpec, RegistrationTable,
    VehicleCategory, YearMonth,
};
use vahan_analytics::export::{self, ExportFormat};
use vahan_analytics::report::DashboardReport;
use vahan_analytics::sample::SampleGenerator;
use vahan_analytics::source::{FileSource, HttpSource, RegistrationSource};
use vahan_analytics::stats::{GrowthCalculator, MetricsCalculator, TimeSeriesBuilder};

#[derive(Parser)]
#[command(
    name = "vahan",
    version,
    about = "Vehicle registration analytics over Vahan dashboard data"
)]
struct Cli {
    /// Config file (defaults to ./vahan.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// CSV file to load instead of the configured one
    #[arg(long, global = true)]
    data: Option<PathBuf>,
    /// Fetch CSV from this URL instead of a file
    #[arg(long, global = true)]
    url: Option<String>,
    /// Fail when any row is rejected
    #[arg(long, global = true)]
    strict: bool,
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default, Clone)]
struct FilterArgs {
    /// First month, YYYY-MM
    #[arg(long)]
    from: Option<YearMonth>,
    /// Last month, YYYY-MM
    #[arg(long)]
    to: Option<YearMonth>,
    /// 2W, 3W or 4W; comma separated or repeated
    #[arg(long, value_delimiter = ',')]
    category: Vec<String>,
    /// Repeat to select several states
    #[arg(long)]
    state: Vec<String>,
    /// Repeat to select several manufacturers
    #[arg(long)]
    manufacturer: Vec<String>,
}

impl FilterArgs {
    /// An open end of the date range is taken from the loaded data.
    fn to_spec(&self, table: &RegistrationTable) -> Result<FilterSpec, FilterError> {
        let mut spec = FilterSpec::default();
        if self.from.is_some() || self.to.is_some() {
            let domain = table.domain();
            if let (Some(start), Some(end)) = (
                self.from.or(domain.first_period),
                self.to.or(domain.last_period),
            ) {
                spec = spec.with_date_range(start, end);
            }
        }
        for category in &self.category {
            spec = spec.with_category(category.parse::<VehicleCategory>()?);
        }
        for state in &self.state {
            spec = spec.with_state(state.clone());
        }
        for manufacturer in &self.manufacturer {
            spec = spec.with_manufacturer(manufacturer.clone());
        }
        Ok(spec)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GrowthKind {
    Yoy,
    Qoq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportTarget {
    /// The filtered registration rows
    Table,
    Categories,
    Manufacturers,
    States,
    Growth,
    Timeseries,
}

#[derive(Subcommand)]
enum Commands {
    /// Print KPIs, category summary, top manufacturers and states
    Summary {
        #[command(flatten)]
        filter: FilterArgs,
        /// How many manufacturers and states to list
        #[arg(long)]
        top: Option<usize>,
    },
    /// Print period-over-period growth
    Growth {
        #[command(flatten)]
        filter: FilterArgs,
        /// Grouping dimensions, comma separated (default: state,category,manufacturer)
        #[arg(long, value_delimiter = ',')]
        by: Vec<Dimension>,
        #[arg(long, value_enum, default_value_t = GrowthKind::Yoy)]
        kind: GrowthKind,
        /// Only print the last N rows
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print monthly totals with 3/6/12 month moving averages
    Timeseries {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        by: Option<Dimension>,
    },
    /// Write a table or result set to CSV, XLSX or JSON
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, value_enum, default_value_t = ExportTarget::Table)]
        what: ExportTarget,
        /// Output file; defaults to <export_dir>/<what>.<format>
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Overrides the format implied by the output extension
        #[arg(long, value_enum)]
        format: Option<ExportFormat>,
        /// Grouping dimensions for growth and timeseries exports
        #[arg(long, value_delimiter = ',')]
        by: Vec<Dimension>,
        #[arg(long, value_enum, default_value_t = GrowthKind::Yoy)]
        kind: GrowthKind,
    },
    /// Write the full dashboard report as JSON
    Report {
        #[command(flatten)]
        filter: FilterArgs,
        /// Output file; stdout when omitted
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Generate the synthetic sample dataset as CSV
    Sample {
        #[arg(long, short, default_value = "vahan_sample_data.csv")]
        output: PathBuf,
        #[arg(long, default_value_t = 2020)]
        start_year: i32,
        #[arg(long, default_value_t = 2024)]
        end_year: i32,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = DashboardConfig::load(cli.config.as_deref()).context("Loading config")?;
    if let Some(data) = &cli.data {
        config.data_path = data.clone();
        config.source_url = None;
    }
    if let Some(url) = &cli.url {
        config.source_url = Some(url.clone());
    }
    config.strict |= cli.strict;

    match cli.command {
        Commands::Sample {
            output,
            start_year,
            end_year,
            seed,
        } => {
            let table = SampleGenerator::new(start_year, end_year)
                .with_seed(seed)
                .table()
                .context("Generating sample data")?;
            export::export(&(), table.dataframe(), &output, ExportFormat::Csv)
                .with_context(|| format!("Writing {}", output.display()))?;
            println!("Wrote {} rows to {}", table.height(), output.display());
        }
        Commands::Summary { filter, top } => {
            let table = load_table(&config)?;
            let spec = filter.to_spec(&table)?;
            print_summary(&table, &spec, top.unwrap_or(config.top_n))?;
        }
        Commands::Growth {
            filter,
            by,
            kind,
            limit,
        } => {
            let table = load_table(&config)?;
            let filtered = DataProcessor::apply_filter(&table, &filter.to_spec(&table)?)?;
            print_growth(&filtered, &growth_dimensions(&by), kind, limit)?;
        }
        Commands::Timeseries { filter, by } => {
            let table = load_table(&config)?;
            let filtered = DataProcessor::apply_filter(&table, &filter.to_spec(&table)?)?;
            let points = TimeSeriesBuilder::monthly(&filtered, by)?;
            println!(
                "{:<8} {:<34} {:>12} {:>12} {:>12} {:>12}",
                "MONTH", "KEY", "TOTAL", "MA3", "MA6", "MA12"
            );
            for p in &points {
                println!(
                    "{:<8} {:<34} {:>12} {:>12} {:>12} {:>12}",
                    p.period.to_string(),
                    p.key.as_deref().unwrap_or("all"),
                    p.total,
                    fmt_opt(p.ma_3m),
                    fmt_opt(p.ma_6m),
                    fmt_opt(p.ma_12m)
                );
            }
        }
        Commands::Export {
            filter,
            what,
            output,
            format,
            by,
            kind,
        } => {
            let table = load_table(&config)?;
            let spec = filter.to_spec(&table)?;
            run_export(&table, &spec, &config, what, output, format, &by, kind)?;
        }
        Commands::Report { filter, output } => {
            let table = load_table(&config)?;
            let spec = filter.to_spec(&table)?;
            let report = DashboardReport::build(&table, &spec, config.top_n)?;
            match output {
                Some(path) => {
                    export::write_json(&report, &path)
                        .with_context(|| format!("Writing {}", path.display()))?;
                    println!("Report written to {}", path.display());
                }
                None => println!("{}", serde_json::to_string_pretty(&report)?),
            }
        }
    }
    Ok(())
}

/// Load from the configured source, falling back to generated data if allowed.
fn load_table(config: &DashboardConfig) -> Result<RegistrationTable> {
    let source: Box<dyn RegistrationSource> = match &config.source_url {
        Some(url) => Box::new(
            HttpSource::new(url.clone(), config.request_timeout(), config.retry_policy())
                .context("Building HTTP client")?,
        ),
        None => Box::new(FileSource::new(&config.data_path)),
    };

    let mut loader = DataLoader::new(config.load_options());
    let result = loader.load(source.as_ref()).cloned();
    match result {
        Ok(table) => {
            if let Some(report) = loader.get_report() {
                if report.rows_rejected > 0 {
                    warn!(
                        rejected = report.rows_rejected,
                        "Some rows were rejected during load"
                    );
                    for r in &report.rejections {
                        warn!(row = r.row, reason = %r.reason, "Rejected row");
                    }
                }
            }
            Ok(table)
        }
        Err(e) if config.falls_back_on(&e) => {
            warn!(error = %e, "Source unavailable, using generated sample data");
            Ok(SampleGenerator::default().table()?)
        }
        Err(e) => Err(e).with_context(|| format!("Loading registrations from {}", source.name())),
    }
}

fn growth_dimensions(by: &[Dimension]) -> Vec<Dimension> {
    if by.is_empty() {
        GrowthCalculator::DEFAULT_DIMENSIONS.to_vec()
    } else {
        by.to_vec()
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string())
}

fn print_summary(table: &RegistrationTable, spec: &FilterSpec, top_n: usize) -> Result<()> {
    let filtered = DataProcessor::apply_filter(table, spec)?;
    let kpis = MetricsCalculator::kpis(&filtered)?;

    println!("Rows:                  {}", filtered.height());
    println!("Total registrations:   {}", kpis.total_registrations);
    println!("Manufacturers:         {}", kpis.unique_manufacturers);
    println!("States:                {}", kpis.unique_states);
    if let Some(latest) = kpis.latest_period {
        println!(
            "Latest month:          {} ({} registrations, avg YoY {}%)",
            latest,
            kpis.latest_month_registrations,
            fmt_opt(kpis.avg_yoy_growth)
        );
    }

    println!("\n{:<6} {:>14} {:>8} {:>14} {:>10}", "CAT", "TOTAL", "SHARE", "AVG/MONTH", "YOY%");
    for c in MetricsCalculator::category_summary(&filtered)? {
        println!(
            "{:<6} {:>14} {:>7.2}% {:>14.1} {:>10}",
            c.category,
            c.total_registrations,
            c.share_pct,
            c.avg_monthly_registrations,
            fmt_opt(c.latest_yoy_growth)
        );
    }

    println!("\n{:<40} {:>14} {:>8} {:>10} {:>10}", "MANUFACTURER", "TOTAL", "SHARE", "YOY%", "QOQ%");
    for m in MetricsCalculator::manufacturer_analysis(&filtered)?.iter().take(top_n) {
        println!(
            "{:<40} {:>14} {:>7.2}% {:>10} {:>10}",
            m.manufacturer,
            m.total_registrations,
            m.share_pct,
            fmt_opt(m.avg_yoy_growth),
            fmt_opt(m.avg_qoq_growth)
        );
    }

    println!("\n{:<24} {:>14} {:>8} {:>10}", "STATE", "TOTAL", "SHARE", "YOY%");
    for s in MetricsCalculator::state_analysis(&filtered, top_n)? {
        println!(
            "{:<24} {:>14} {:>7.2}% {:>10}",
            s.state,
            s.total_registrations,
            s.share_pct,
            fmt_opt(s.avg_yoy_growth)
        );
    }
    Ok(())
}

fn print_growth(
    table: &RegistrationTable,
    dims: &[Dimension],
    kind: GrowthKind,
    limit: Option<usize>,
) -> Result<()> {
    let header: Vec<String> = dims.iter().map(|d| d.to_string().to_uppercase()).collect();
    println!("{:<8} {:<60} {:>12} {:>12} {:>10}", "PERIOD", header.join(" / "), "TOTAL", "PREVIOUS", "GROWTH%");

    let lines: Vec<String> = match kind {
        GrowthKind::Yoy => GrowthCalculator::year_over_year(table, dims)?
            .iter()
            .map(|r| growth_line(&r.period.to_string(), &r.key, r.total, r.previous_total, r.growth_pct))
            .collect(),
        GrowthKind::Qoq => GrowthCalculator::quarter_over_quarter(table, dims)?
            .iter()
            .map(|r| growth_line(&r.period.to_string(), &r.key, r.total, r.previous_total, r.growth_pct))
            .collect(),
    };
    let skip = limit.map(|n| lines.len().saturating_sub(n)).unwrap_or(0);
    for line in &lines[skip..] {
        println!("{}", line);
    }
    Ok(())
}

fn growth_line(
    period: &str,
    key: &[String],
    total: u64,
    previous: Option<u64>,
    growth: Option<f64>,
) -> String {
    format!(
        "{:<8} {:<60} {:>12} {:>12} {:>10}",
        period,
        key.join(" / "),
        total,
        previous.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
        fmt_opt(growth)
    )
}

#[allow(clippy::too_many_arguments)]
fn run_export(
    table: &RegistrationTable,
    spec: &FilterSpec,
    config: &DashboardConfig,
    what: ExportTarget,
    output: Option<PathBuf>,
    format: Option<ExportFormat>,
    by: &[Dimension],
    kind: GrowthKind,
) -> Result<()> {
    let format = format
        .or_else(|| output.as_deref().and_then(ExportFormat::from_path))
        .unwrap_or(ExportFormat::Csv);
    let path = output.unwrap_or_else(|| {
        let name = format!(
            "{}.{}",
            what.to_possible_value()
                .map(|v| v.get_name().to_string())
                .unwrap_or_else(|| "export".to_string()),
            format.extension()
        );
        config.export_dir.join(name)
    });

    let filtered = DataProcessor::apply_filter(table, spec)?;

    match what {
        ExportTarget::Table => {
            export::export(&filtered.records()?, filtered.dataframe(), &path, format)?
        }
        ExportTarget::Categories => {
            let rows = MetricsCalculator::category_summary(&filtered)?;
            export::export(&rows, &export::category_frame(&rows)?, &path, format)?
        }
        ExportTarget::Manufacturers => {
            let rows = MetricsCalculator::manufacturer_analysis(&filtered)?;
            export::export(&rows, &export::manufacturer_frame(&rows)?, &path, format)?
        }
        ExportTarget::States => {
            let rows = MetricsCalculator::state_analysis(&filtered, config.top_n)?;
            export::export(&rows, &export::state_frame(&rows)?, &path, format)?
        }
        ExportTarget::Growth => {
            let dims = growth_dimensions(by);
            match kind {
                GrowthKind::Yoy => {
                    let rows = GrowthCalculator::year_over_year(&filtered, &dims)?;
                    export::export(&rows, &export::yoy_frame(&dims, &rows)?, &path, format)?
                }
                GrowthKind::Qoq => {
                    let rows = GrowthCalculator::quarter_over_quarter(&filtered, &dims)?;
                    export::export(&rows, &export::qoq_frame(&dims, &rows)?, &path, format)?
                }
            }
        }
        ExportTarget::Timeseries => {
            let dimension = by.first().copied();
            let rows = TimeSeriesBuilder::monthly(&filtered, dimension)?;
            export::export(&rows, &export::timeseries_frame(dimension, &rows)?, &path, format)?
        }
    }

    info!(rows = filtered.height(), "Export finished");
    println!("Exported {:?} to {}", what, path.display());
    Ok(())
}
