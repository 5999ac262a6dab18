use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::Serialize;
use thiserror::Error;
use tokio::runtime::Runtime;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dealreel_core::{
    load_reel_config, Clock, CommandExecutor, DailyRunController, DealEntry, ManualClock,
    MediaProber, ReelConfig, RunOutcome, SystemClock, SystemCommandExecutor,
};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] dealreel_core::ConfigError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to parse deals file {path}: {source}")]
    Deals {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Reel(#[from] dealreel_core::ReelError),
    #[error("run for {date} failed: {reason}")]
    RunFailed { date: NaiveDate, reason: String },
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Daily deal short renderer", long_about = None)]
pub struct Cli {
    /// Path to dealreel.toml
    #[arg(long, default_value = "configs/dealreel.toml")]
    pub config: PathBuf,
    /// Overrides paths.output_dir
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Overrides paths.work_dir
    #[arg(long)]
    pub work_dir: Option<PathBuf>,
    /// Overrides tools.ffmpeg
    #[arg(long)]
    pub ffmpeg: Option<PathBuf>,
    /// Overrides tools.ffprobe
    #[arg(long)]
    pub ffprobe: Option<PathBuf>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Renders today's video from a deals file
    Render(RenderArgs),
    /// Shows whether today's video is still due
    Status,
    /// Prints the duration ffprobe reports for a file or URL
    Probe(ProbeArgs),
    /// Generates shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// JSON array of {"deal": {...}, "trailers": [...]}
    #[arg(long)]
    pub deals: PathBuf,
    /// Render as if today were this date (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<NaiveDate>,
    /// Render even if the marker says today is done
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    pub source: String,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Installs the fmt subscriber on stderr so JSON output on stdout stays clean.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

pub fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions(args) = &cli.command {
        let mut command = Cli::command();
        clap_complete::generate(args.shell, &mut command, "dealreelctl", &mut io::stdout());
        return Ok(());
    }

    let context = AppContext::new(&cli)?;
    match &cli.command {
        Commands::Render(args) => {
            let summary = context.render(args)?;
            render(&summary, cli.format)?;
            if let Some(reason) = summary.error {
                return Err(AppError::RunFailed {
                    date: summary.date,
                    reason,
                });
            }
        }
        Commands::Status => {
            let status = context.status()?;
            render(&status, cli.format)?;
        }
        Commands::Probe(args) => {
            let report = context.probe(args)?;
            render(&report, cli.format)?;
        }
        Commands::Completions(_) => {}
    }
    Ok(())
}

fn render<T>(value: &T, format: OutputFormat) -> Result<()>
where
    T: Serialize + DisplayFallback,
{
    match format {
        OutputFormat::Text => {
            println!("{}", value.display());
            Ok(())
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{}", json);
            Ok(())
        }
    }
}

trait DisplayFallback {
    fn display(&self) -> String;
}

struct AppContext {
    config: ReelConfig,
    executor: Arc<dyn CommandExecutor>,
}

impl AppContext {
    fn new(cli: &Cli) -> Result<Self> {
        let config = apply_overrides(load_reel_config(&cli.config)?, cli);
        Ok(Self {
            config,
            executor: Arc::new(SystemCommandExecutor),
        })
    }

    fn controller(&self, date: Option<NaiveDate>) -> DailyRunController {
        let clock: Arc<dyn Clock> = match date {
            Some(date) => Arc::new(ManualClock::new(start_of_day(&self.config, date))),
            None => Arc::new(SystemClock),
        };
        DailyRunController::new(self.config.clone(), self.executor.clone(), clock)
    }

    fn render(&self, args: &RenderArgs) -> Result<RenderSummary> {
        let deals = load_deals(&args.deals)?;
        info!(path = %args.deals.display(), deals = deals.len(), "deals loaded");
        let controller = self.controller(args.date);
        let runtime = Runtime::new()?;
        let outcome = runtime.block_on(async {
            if args.force {
                controller.run_forced(&deals).await
            } else {
                controller.run(&deals).await
            }
        });
        Ok(RenderSummary::from_outcome(outcome, deals.len()))
    }

    fn status(&self) -> Result<StatusReport> {
        let controller = self.controller(None);
        let today = controller.today();
        let last_video_date = controller.marker().read().map_err(dealreel_core::ReelError::from)?;
        let expected_output = self.config.output_path(&today.format("%Y-%m-%d").to_string());
        Ok(StatusReport {
            today,
            last_video_date,
            due_today: last_video_date != Some(today),
            marker_path: controller.marker().path().to_path_buf(),
            output_exists: expected_output.exists(),
            expected_output,
        })
    }

    fn probe(&self, args: &ProbeArgs) -> Result<ProbeReport> {
        let prober = MediaProber::new(
            &self.config.tools.ffprobe,
            self.config.tools.probe_timeout(),
            self.executor.clone(),
        );
        let runtime = Runtime::new()?;
        let probed = runtime.block_on(prober.probe_duration(&args.source));
        Ok(ProbeReport {
            source: args.source.clone(),
            duration: probed.seconds(),
        })
    }
}

fn apply_overrides(mut config: ReelConfig, cli: &Cli) -> ReelConfig {
    if let Some(dir) = &cli.output_dir {
        config.paths.output_dir = dir.to_string_lossy().to_string();
    }
    if let Some(dir) = &cli.work_dir {
        config.paths.work_dir = dir.to_string_lossy().to_string();
    }
    if let Some(ffmpeg) = &cli.ffmpeg {
        config.tools.ffmpeg = ffmpeg.to_string_lossy().to_string();
    }
    if let Some(ffprobe) = &cli.ffprobe {
        config.tools.ffprobe = ffprobe.to_string_lossy().to_string();
    }
    config
}

/// Midnight of `date` at the configured offset, as UTC.
fn start_of_day(config: &ReelConfig, date: NaiveDate) -> DateTime<Utc> {
    let local = date.and_time(NaiveTime::MIN);
    let offset = chrono::Duration::seconds(i64::from(config.schedule.offset().local_minus_utc()));
    Utc.from_utc_datetime(&(local - offset))
}

fn load_deals(path: &Path) -> Result<Vec<DealEntry>> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| AppError::Deals {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Serialize)]
pub struct RenderSummary {
    pub outcome: &'static str,
    pub date: NaiveDate,
    pub deals: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub games: Option<usize>,
    pub skipped_deals: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RenderSummary {
    fn from_outcome(outcome: RunOutcome, deals: usize) -> Self {
        let mut summary = Self {
            outcome: outcome.label(),
            date: outcome.date(),
            deals,
            output: None,
            sha256: None,
            games: None,
            skipped_deals: 0,
            expected_duration: None,
            error: None,
        };
        match outcome {
            RunOutcome::Produced(report) => {
                summary.games = Some(report.game_count());
                summary.skipped_deals = report.skipped_deals.len();
                summary.expected_duration = Some(report.expected_duration);
                summary.sha256 = Some(report.sha256);
                summary.output = Some(report.output);
            }
            RunOutcome::SkippedNoContent { skipped_deals, .. } => {
                summary.skipped_deals = skipped_deals;
            }
            RunOutcome::SkippedAlreadyDone { .. } => {}
            RunOutcome::Failed { error, .. } => summary.error = Some(error.to_string()),
        }
        summary
    }
}

impl DisplayFallback for RenderSummary {
    fn display(&self) -> String {
        let mut lines = vec![format!("{}: {}", self.date, self.outcome)];
        if let Some(output) = &self.output {
            lines.push(format!("  - Output: {}", output.display()));
        }
        if let Some(games) = self.games {
            lines.push(format!("  - Games: {games} of {} deals", self.deals));
        }
        if self.skipped_deals > 0 {
            lines.push(format!("  - Skipped deals: {}", self.skipped_deals));
        }
        if let Some(duration) = self.expected_duration {
            lines.push(format!("  - Duration: {duration:.2} s"));
        }
        if let Some(error) = &self.error {
            lines.push(format!("  - Error: {error}"));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub today: NaiveDate,
    pub last_video_date: Option<NaiveDate>,
    pub due_today: bool,
    pub marker_path: PathBuf,
    pub expected_output: PathBuf,
    pub output_exists: bool,
}

impl DisplayFallback for StatusReport {
    fn display(&self) -> String {
        let last = self
            .last_video_date
            .map(|date| date.to_string())
            .unwrap_or_else(|| "never".to_string());
        let due = if self.due_today { "due" } else { "done" };
        format!(
            "Today: {} ({due})\nLast video: {last}\nMarker: {}\nOutput: {}{}",
            self.today,
            self.marker_path.display(),
            self.expected_output.display(),
            if self.output_exists { "" } else { " (missing)" }
        )
    }
}

#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub source: String,
    pub duration: Option<f64>,
}

impl DisplayFallback for ProbeReport {
    fn display(&self) -> String {
        match self.duration {
            Some(duration) => format!("{}: {duration:.3} s", self.source),
            None => format!("{}: duration unknown", self.source),
        }
    }
}
