//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use oligocalc_client::{Calculator, ClientOptions, MeltClient};
use oligocalc_core::batch::{BatchDriver, BatchOptions, BatchProgress, BatchSummary};
use oligocalc_shared::{
    AppConfig, ConcentrationParameters, OligoCalcError, RowErrorPolicy, ServiceConfig,
    ThermodynamicResult, init_config, load_config, load_config_from,
};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// oligocalc — melting temperature and hybridization thermodynamics for primers.
#[derive(Parser)]
#[command(
    name = "oligocalc",
    version,
    about = "Compute Tm, dG, dH and dS for DNA sequences using the IDT melt calculator.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.oligocalc/oligocalc.toml).
    #[arg(long, env = "OLIGOCALC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Annotate every sequence in a CSV file with Tm, dG, dH and dS.
    Batch {
        /// Input CSV; the first column holds the quoted sequence.
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output CSV (created or truncated).
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        concentrations: ConcentrationArgs,

        /// What to do when a row fails: abort (default) or skip.
        #[arg(long, value_name = "POLICY")]
        on_error: Option<RowErrorPolicy>,

        /// Shorthand for `--on-error skip`.
        #[arg(long, conflicts_with = "on_error")]
        skip_malformed: bool,

        /// Calculator endpoint override.
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Compute thermodynamics for a single sequence.
    Calc {
        /// DNA sequence (A, C, G, T).
        sequence: String,

        #[command(flatten)]
        concentrations: ConcentrationArgs,

        /// Start from the primer preset instead of the calculator defaults.
        #[arg(long)]
        primer: bool,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,

        /// Calculator endpoint override.
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

/// Per-field overrides for solution conditions.
#[derive(Args, Debug, Clone, Default)]
pub(crate) struct ConcentrationArgs {
    /// Oligonucleotide concentration (µM).
    #[arg(long)]
    pub oligo_conc: Option<f64>,

    /// Target concentration (µM).
    #[arg(long)]
    pub target_conc: Option<f64>,

    /// Na+ concentration (mM).
    #[arg(long)]
    pub na_conc: Option<f64>,

    /// Mg2+ concentration (mM).
    #[arg(long)]
    pub mg_conc: Option<f64>,

    /// dNTP concentration (mM).
    #[arg(long)]
    pub dntp_conc: Option<f64>,
}

impl ConcentrationArgs {
    /// Apply the flags that were given on top of `base`.
    fn apply(&self, base: ConcentrationParameters) -> Result<ConcentrationParameters> {
        let params = ConcentrationParameters {
            oligo: self.oligo_conc.unwrap_or(base.oligo),
            target: self.target_conc.unwrap_or(base.target),
            na: self.na_conc.unwrap_or(base.na),
            mg: self.mg_conc.unwrap_or(base.mg),
            dntp: self.dntp_conc.unwrap_or(base.dntp),
        };

        let fields = [
            ("oligo", params.oligo),
            ("target", params.target),
            ("Na+", params.na),
            ("Mg2+", params.mg),
            ("dNTP", params.dntp),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(eyre!(
                "{name} concentration must be a non-negative number, got {value}"
            ));
        }

        Ok(params)
    }
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "oligocalc=info",
        1 => "oligocalc=debug",
        _ => "oligocalc=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Command::Batch {
            input,
            output,
            concentrations,
            on_error,
            skip_malformed,
            endpoint,
        } => {
            let policy = resolve_policy(on_error, skip_malformed, config.batch.on_error);
            cmd_batch(&config, input, output, &concentrations, policy, endpoint).await
        }
        Command::Calc {
            sequence,
            concentrations,
            primer,
            json,
            endpoint,
        } => cmd_calc(&config, &sequence, &concentrations, primer, json, endpoint).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&config).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

/// `--on-error` wins, then `--skip-malformed`, then the config file.
fn resolve_policy(
    on_error: Option<RowErrorPolicy>,
    skip_malformed: bool,
    configured: RowErrorPolicy,
) -> RowErrorPolicy {
    on_error
        .or(skip_malformed.then_some(RowErrorPolicy::Skip))
        .unwrap_or(configured)
}

fn build_client(service: &ServiceConfig, endpoint: Option<String>) -> Result<MeltClient> {
    let mut service = service.clone();
    if let Some(endpoint) = endpoint {
        service.endpoint = endpoint;
    }
    let options = ClientOptions::from_config(&service)?;
    Ok(MeltClient::new(options)?)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_batch(
    config: &AppConfig,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    concentrations: &ConcentrationArgs,
    on_error: RowErrorPolicy,
    endpoint: Option<String>,
) -> Result<()> {
    let input = input.unwrap_or_else(|| PathBuf::from(&config.batch.input));
    let output = output.unwrap_or_else(|| PathBuf::from(&config.batch.output));

    if !input.is_file() {
        return Err(eyre!("input file '{}' not found", input.display()));
    }

    let options = BatchOptions {
        params: concentrations.apply(config.concentrations)?,
        on_error,
    };

    let client = build_client(&config.service, endpoint)?;

    info!(
        input = %input.display(),
        output = %output.display(),
        endpoint = %client.endpoint(),
        policy = %options.on_error,
        "processing sequence table"
    );

    let reporter = CliProgress::new();
    let driver = BatchDriver::new(&client, options, &reporter);

    let summary = match driver.run(&input, &output).await {
        Ok(summary) => summary,
        Err(e) => {
            reporter.spinner.abandon();
            return Err(batch_error(e, &output));
        }
    };

    println!();
    println!("  Batch complete!");
    println!("  Rows:    {}", summary.rows_read);
    println!("  Written: {}", summary.rows_written);
    println!("  Skipped: {}", summary.skipped.len());
    for skipped in &summary.skipped {
        println!("    line {}: {}", skipped.line, skipped.error);
    }
    println!("  Output:  {}", output.display());
    println!("  Time:    {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn batch_error(err: OligoCalcError, output: &Path) -> color_eyre::Report {
    match err {
        OligoCalcError::MalformedRow { .. }
        | OligoCalcError::RemoteService(_)
        | OligoCalcError::Extraction { .. }
        | OligoCalcError::Parse { .. } => eyre!(
            "{err}\nrows before the failure were kept in '{}'; pass --on-error skip to continue past failing rows",
            output.display()
        ),
        other => other.into(),
    }
}

async fn cmd_calc(
    config: &AppConfig,
    sequence: &str,
    concentrations: &ConcentrationArgs,
    primer: bool,
    json: bool,
    endpoint: Option<String>,
) -> Result<()> {
    let base = if primer {
        ConcentrationParameters::primer()
    } else {
        ConcentrationParameters::default()
    };
    let params = concentrations.apply(base)?;

    let client = build_client(&config.service, endpoint)?;
    let result = client.compute(sequence, &params).await?;

    if json {
        let out = serde_json::json!({
            "sequence": sequence.to_uppercase(),
            "concentrations": params,
            "result": result,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_result(sequence, &result);
    }

    Ok(())
}

fn print_result(sequence: &str, result: &ThermodynamicResult) {
    println!();
    println!("  Sequence: {}", sequence.to_uppercase());
    println!("  Tm:       {:.2} °C", result.tm);
    println!("  dG:       {:.2} kcal/mol", result.dg);
    println!("  dH:       {:.2} kcal/mol", result.dh);
    println!("  dS:       {:.2} cal/(mol·K)", result.ds);
    println!();
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl BatchProgress for CliProgress {
    fn row_started(&self, line: usize, sequence: &str) {
        self.spinner
            .set_message(format!("Calculating [line {line}] {sequence}"));
    }

    fn row_finished(&self, _line: usize, _result: &ThermodynamicResult) {
        self.spinner.inc(1);
    }

    fn row_skipped(&self, line: usize, _error: &OligoCalcError) {
        self.spinner.set_message(format!("Skipped line {line}"));
    }

    fn done(&self, _summary: &BatchSummary) {
        self.spinner.finish_and_clear();
    }
}
