//! CLI entry point for the time series pipeline.

use anyhow::{Result, anyhow, bail};
use clap::{Parser, ValueEnum};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};
use trendline::utils::truncate_str;
use trendline::{AnalysisReport, ForecastResult, NullPolicy, PipelineConfig, TimeSeriesPipeline};

/// CLI-compatible null handling choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CliNullPolicy {
    /// Drop rows with a missing value
    Drop,
    /// Fill with the mean of the present values
    Mean,
    /// Fill with the median of the present values
    Median,
    /// Fill with the most frequent value
    Mode,
    /// Continue with the missing values
    Keep,
}

impl CliNullPolicy {
    fn policy(self) -> Option<NullPolicy> {
        match self {
            CliNullPolicy::Drop => Some(NullPolicy::DropRows),
            CliNullPolicy::Mean => Some(NullPolicy::FillMean),
            CliNullPolicy::Median => Some(NullPolicy::FillMedian),
            CliNullPolicy::Mode => Some(NullPolicy::FillMode),
            CliNullPolicy::Keep => None,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Time series validation, statistics and forecasting",
    long_about = "Loads a CSV time series, repairs its formats, reports statistics and outliers, \
                  and forecasts it.\n\n\
                  Any option not given on the command line is asked for interactively.\n\n\
                  EXAMPLES:\n  \
                  # Fully interactive\n  \
                  trendline\n\n  \
                  # Non-interactive\n  \
                  trendline -i sales.csv --date-column Date --value-column Sales \\\n    \
                  --auto-correct --null-policy median --periods 30\n\n  \
                  # Machine-readable output\n  \
                  trendline -i sales.csv -d Date -v Sales --auto-correct \\\n    \
                  --null-policy drop --periods 12 --json"
)]
struct Args {
    /// Path to the CSV file to analyze
    #[arg(short, long)]
    input: Option<String>,

    /// Name of the timestamp column
    #[arg(short, long)]
    date_column: Option<String>,

    /// Name of the value column
    #[arg(short, long)]
    value_column: Option<String>,

    /// How to handle missing values
    #[arg(long, value_enum)]
    null_policy: Option<CliNullPolicy>,

    /// Number of periods to forecast
    #[arg(short, long, allow_negative_numbers = true)]
    periods: Option<i64>,

    /// Remove IQR outliers before forecasting
    #[arg(long)]
    remove_outliers: bool,

    /// Correct formats without asking
    #[arg(long)]
    auto_correct: bool,

    /// Coverage of the forecast interval (0.0 - 1.0)
    #[arg(long, default_value = "0.8")]
    confidence_level: f64,

    /// Seasonal period in observations (inferred from the data if omitted)
    #[arg(long)]
    seasonal_period: Option<usize>,

    /// Output directory for results
    #[arg(short, long, default_value = "./outputs")]
    output: String,

    /// Write <input>_report.json and <input>_forecast.json to the output directory
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Requires every choice on the command line; disables prompts and logs.
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is disabled so stdout only carries
/// the JSON document.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Line-based prompts on stdin. Fails once stdin is exhausted.
struct Prompter<R: BufRead> {
    input: R,
    enabled: bool,
}

impl<R: BufRead> Prompter<R> {
    fn ask(&mut self, question: &str) -> Result<String> {
        if !self.enabled {
            bail!("missing required option for '{}'", question.trim_end_matches(": "));
        }
        print!("{}", question);
        io::stdout().flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            bail!("input closed while waiting for '{}'", question.trim_end_matches(": "));
        }
        Ok(line.trim().to_string())
    }

    /// Ask until one of `choices` (case-insensitive) is entered.
    fn choose(&mut self, question: &str, choices: &[&str]) -> Result<String> {
        loop {
            let answer = self.ask(question)?.to_lowercase();
            if choices.contains(&answer.as_str()) {
                return Ok(answer);
            }
            println!("Please enter one of: {}", choices.join(", "));
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    let mut config = PipelineConfig::builder()
        .output_dir(&args.output)
        .confidence_level(args.confidence_level);
    if let Some(period) = args.seasonal_period {
        config = config.seasonal_period(period);
    }
    let config = config.build()?;

    let pipeline = TimeSeriesPipeline::builder().config(config).build()?;
    let stdin = io::stdin();
    let mut prompter = Prompter {
        input: stdin.lock(),
        enabled: !args.json,
    };

    run(pipeline, &args, &mut prompter)
}

fn run<R: BufRead>(
    mut pipeline: TimeSeriesPipeline,
    args: &Args,
    prompter: &mut Prompter<R>,
) -> Result<()> {
    let human = !args.json;

    // Load
    let input = match &args.input {
        Some(input) => input.clone(),
        None => prompter.ask("\nPlease provide the path to your CSV file: ")?,
    };
    if !Path::new(&input).exists() {
        return Err(anyhow!("Input file not found: {}", input));
    }
    let preview = pipeline.load(&input)?;
    if human {
        println!("\nData Preview (First {} rows):", preview.height());
        println!("{}", preview);
    }

    // Select
    let date_column = match &args.date_column {
        Some(name) => name.clone(),
        None => prompter.ask("Enter the name of the date column: ")?,
    };
    let value_column = match &args.value_column {
        Some(name) => name.clone(),
        None => prompter.ask("Enter the name of the value column: ")?,
    };
    pipeline.select(&date_column, &value_column)?;

    // Formats
    let formats = pipeline.inspect()?;
    if human {
        println!("\nCurrent data formats:");
        println!("Date column format: {} ({})", formats.timestamp, formats.timestamp_dtype);
        println!("Value column format: {} ({})", formats.value, formats.value_dtype);
    }

    if formats.needs_correction() {
        if !args.auto_correct && !confirm_correction(prompter)? {
            println!("Exiting. Please ensure your data is in the correct format before trying again.");
            return Ok(());
        }
        let correction = pipeline.correct()?;
        debug!("Correction summary: {:?}", correction);
        if human {
            let formats = pipeline.inspect()?;
            println!("\nNew data formats:");
            println!("Date column format: {} ({})", formats.timestamp, formats.timestamp_dtype);
            println!("Value column format: {} ({})", formats.value, formats.value_dtype);
            if correction.coerced_to_missing > 0 {
                println!(
                    "{} values could not be read as numbers and are now missing",
                    correction.coerced_to_missing
                );
            }
        }
    } else if human {
        println!("\nData formats are appropriate for time series analysis.");
    }

    // Nulls
    let info = pipeline.data_info()?;
    if human {
        println!("\nData Shape: ({}, {})", info.rows, info.columns);
        println!("Null Values:");
        for (column, count) in info.null_counts.iter() {
            println!("  {:<20} {}", truncate_str(column, 19), count);
        }
    }
    if info.null_counts.total() > 0 {
        let policy = match args.null_policy {
            Some(choice) => choice.policy(),
            None => ask_null_policy(prompter)?,
        };
        match policy {
            Some(policy) => {
                let resolution = pipeline.resolve(policy)?;
                if human {
                    println!(
                        "Applied '{}': {} rows before, {} after",
                        policy.description(),
                        resolution.rows_before,
                        resolution.rows_after
                    );
                }
            }
            None => warn!("Continuing with {} missing values", info.null_counts.total()),
        }
    }

    // Statistics
    let stats = pipeline.summary()?;
    let outliers = pipeline.outliers()?;
    if human {
        println!("\nBasic Statistics:");
        println!("max: {:.2}", stats.max);
        println!("min: {:.2}", stats.min);
        println!("mean: {:.2}", stats.mean);
        println!("median: {:.2}", stats.median);
        println!("mode: {:.2}", stats.mode);
        println!("\nNumber of outliers detected: {}", outliers.len());
    }
    if args.remove_outliers && !outliers.is_empty() {
        let removed = pipeline.remove_outliers()?;
        info!("Removed {} outlier rows", removed);
    }

    let report = pipeline.report()?;

    // Forecast
    loop {
        let periods = match args.periods {
            Some(periods) => periods,
            None => {
                let answer = prompter.ask("\nEnter the number of periods to forecast: ")?;
                match answer.parse::<i64>() {
                    Ok(periods) => periods,
                    Err(_) => {
                        println!("Please enter a whole number");
                        continue;
                    }
                }
            }
        };
        match pipeline.set_horizon(periods) {
            Ok(()) => break,
            Err(e) if args.periods.is_none() && e.is_recoverable() => println!("{}", e),
            Err(e) => return Err(e.into()),
        }
    }

    pipeline.fit()?;
    let forecast = pipeline.forecast()?;

    let written = if args.emit_report {
        pipeline.write_outputs(&report, Some(&forecast))?
    } else {
        Vec::new()
    };

    if args.json {
        let output = serde_json::json!({
            "report": report,
            "forecast": forecast,
            "files": written,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_summary(&pipeline, &report, &forecast, &written);
    }
    Ok(())
}

/// The yes/no, then exit/change, flow for inappropriate formats.
fn confirm_correction<R: BufRead>(prompter: &mut Prompter<R>) -> Result<bool> {
    println!("\nThe data formats are not appropriate for time series analysis.");
    println!("Date column should be a date");
    println!("Value column should be numeric");

    if prompter.choose("\nWould you like to correct the formats? (yes/no): ", &["yes", "no"])? == "yes" {
        return Ok(true);
    }
    println!("\nIt is not possible to continue with inappropriate data formats.");
    let choice = prompter.choose(
        "Would you like to exit or try changing the data format? (exit/change): ",
        &["exit", "change"],
    )?;
    Ok(choice == "change")
}

/// The correct/continue menu followed by the 1-4 policy menu.
fn ask_null_policy<R: BufRead>(prompter: &mut Prompter<R>) -> Result<Option<NullPolicy>> {
    println!("\nNull values detected. How would you like to proceed?");
    println!("1. Correct null values");
    println!("2. Continue with null values");
    if prompter.choose("\nEnter your choice (1 or 2): ", &["1", "2"])? == "2" {
        return Ok(None);
    }

    println!("\nHow should the null values be corrected?");
    for (i, policy) in NullPolicy::ALL.iter().enumerate() {
        println!("{}. {}", i + 1, policy.description());
    }
    loop {
        let answer = prompter.ask("\nEnter your choice (1-4): ")?;
        match NullPolicy::from_str(&answer) {
            Ok(policy) => return Ok(Some(policy)),
            Err(e) if e.is_recoverable() => println!("{}", e),
            Err(e) => return Err(e.into()),
        }
    }
}

/// Human-readable final summary.
///
/// Uses `println!` intentionally: this is the primary output of the CLI and
/// must be visible regardless of log level.
fn print_summary(
    pipeline: &TimeSeriesPipeline,
    report: &AnalysisReport,
    forecast: &ForecastResult,
    written: &[std::path::PathBuf],
) {
    println!();
    println!("{}", "=".repeat(80));
    println!("ANALYSIS COMPLETE");
    println!("{}", "=".repeat(80));
    println!();
    println!("Date Range: {}", report.date_range);
    println!("Observations: {}", report.total_observations);
    if let Some(std) = report.std {
        println!("Standard Deviation: {:.2}", std);
    }
    println!(
        "Outliers: {} ({:.1}%)",
        report.outlier_count, report.outlier_percentage
    );
    println!();

    println!("Forecast ({}, last 5 rows):", pipeline.engine_name());
    println!(
        "{:<12} {:>12} {:>12} {:>12}",
        "Date", "Forecast", "Lower", "Upper"
    );
    println!("{}", "-".repeat(52));
    for row in forecast.tail(5) {
        println!(
            "{:<12} {:>12.2} {:>12.2} {:>12.2}",
            row.timestamp, row.point_estimate, row.lower_bound, row.upper_bound
        );
    }
    println!();

    let steps = pipeline.processing_steps();
    if !steps.is_empty() {
        println!("Processing Steps:");
        for step in steps {
            println!("  - {}", step);
        }
        println!();
    }

    if !written.is_empty() {
        println!("Output Files:");
        for path in written {
            println!("  - {}", path.display());
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("Use --emit-report to save the report and forecast as JSON");
    println!("{}", "=".repeat(80));
}
