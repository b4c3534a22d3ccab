//! Command-line runner for mobiprobe interaction plans.
//!
//! Opens one Appium session, runs a plan file or a single ad-hoc
//! interaction, prints a status line per step, and ends the session exactly
//! once however many steps failed.
//!
//! # Usage
//!
//! ```bash
//! # Run a plan file
//! mobiprobe run demos/testapp1.json
//!
//! # Click one element
//! mobiprobe click test-button
//!
//! # Type into a field and check the read-back
//! mobiprobe type text-input "Hello Appium!"
//!
//! # Swipe up and down over an element
//! mobiprobe swipe swipe-area
//!
//! # Check that elements are present, scrolling once before giving up
//! mobiprobe verify app-title test-button swipe-area --scroll-retry
//!
//! # Press a button three times, dismissing the alert each time, then check the counter
//! mobiprobe counter test-button button-counter --presses 3
//!
//! # Use another server and app package
//! mobiprobe --server http://10.0.0.5:4723 --namespace com.testapp2 run demos/testapp2.json
//!
//! # Print the effective configuration, or persist it
//! mobiprobe show-config
//! mobiprobe --server http://10.0.0.5:4723 init-config
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use mobiprobe_core::action::Step;
use mobiprobe_core::config::{logs_dir, MobiprobeConfig};
use mobiprobe_core::gesture::ScreenSwipe;
use mobiprobe_core::plan::Plan;
use mobiprobe_core::session::Session;
use mobiprobe_core::transcript::Transcript;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Run resilient Appium interaction plans against a mobile device.
#[derive(Parser)]
#[command(name = "mobiprobe")]
#[command(about = "Run resilient Appium interaction plans against a mobile device")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.mobiprobe/config.json)
    #[arg(short, long, env = "MOBIPROBE_CONFIG")]
    config: Option<PathBuf>,

    /// Appium server URL
    #[arg(short, long, env = "MOBIPROBE_SERVER")]
    server: Option<String>,

    /// Application package used to qualify resource ids
    #[arg(short, long, env = "MOBIPROBE_NAMESPACE")]
    namespace: Option<String>,

    /// Write diagnostics to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Write the step transcript as JSON Lines to this file
    #[arg(long)]
    transcript: Option<PathBuf>,

    /// Save a screenshot of every failed step into this directory
    #[arg(long)]
    screenshot_dir: Option<PathBuf>,

    /// Suppress status lines and the summary
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a JSON plan file
    Run {
        /// Path to the plan
        plan: PathBuf,
    },

    /// Click an element
    Click {
        /// Element identifier
        id: String,
        /// Scroll the screen before looking the element up
        #[arg(long)]
        scroll_first: bool,
    },

    /// Clear a field, type into it, and verify the read-back
    Type {
        /// Element identifier
        id: String,
        /// Text to type
        text: String,
    },

    /// Swipe up and down over an element
    Swipe {
        /// Element identifier
        id: String,
    },

    /// Check that elements are present and displayed
    Verify {
        /// Element identifiers
        #[arg(required = true)]
        ids: Vec<String>,
        /// Scroll once and retry before reporting an element missing
        #[arg(long)]
        scroll_retry: bool,
    },

    /// Dismiss an alert if one is showing
    DismissAlert,

    /// Press a button repeatedly, dismissing alerts, then check a counter
    Counter {
        /// Button identifier
        button: String,
        /// Counter identifier
        counter: String,
        /// Number of presses
        #[arg(short, long, default_value = "1")]
        presses: u32,
        /// Acceptable counts (defaults to presses-1, presses, presses+1)
        #[arg(short, long, value_delimiter = ',')]
        expect: Vec<u32>,
    },

    /// Print the effective configuration as JSON
    ShowConfig,

    /// Write the effective configuration to ~/.mobiprobe/config.json
    InitConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

fn init_tracing(log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| "mobiprobe.log".into());
            let file_appender = tracing_appender::rolling::never(dir, name);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(file_appender)
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

#[derive(Debug)]
enum CliError {
    Config(String),
    Session(String),
    Plan(String),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Config(_) => ExitCode::from(2),
            CliError::Session(_) => ExitCode::from(3),
            CliError::Plan(_) => ExitCode::from(4),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Config error: {}", msg),
            CliError::Session(msg) => write!(f, "Session error: {}", msg),
            CliError::Plan(msg) => write!(f, "Plan error: {}", msg),
        }
    }
}

fn load_config(cli: &Cli) -> Result<MobiprobeConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => MobiprobeConfig::load_from(path).map_err(|e| CliError::Config(e.to_string()))?,
        None => MobiprobeConfig::load(),
    };
    if let Some(server) = &cli.server {
        config.server_url = server.clone();
    }
    if let Some(namespace) = &cli.namespace {
        config.namespace = namespace.clone();
    }
    Ok(config)
}

/// The plan a subcommand runs. `None` for commands that need no session.
fn plan_for(command: &Command) -> Result<Option<Plan>, CliError> {
    let single = |name: &str, step: Step| Ok(Some(Plan::new(name, vec![step])));
    match command {
        Command::Run { plan } => Plan::load(plan)
            .map(Some)
            .map_err(|e| CliError::Plan(e.to_string())),
        Command::Click { id, scroll_first } => single(
            "click",
            Step::Click { id: id.clone(), name: None, scroll_first: *scroll_first },
        ),
        Command::Type { id, text } => single(
            "type",
            Step::EnterText { id: id.clone(), name: None, text: text.clone() },
        ),
        Command::Swipe { id } => single("swipe", Step::SwipeElement { id: id.clone(), name: None }),
        Command::Verify { ids, scroll_retry } => single(
            "verify",
            Step::VerifyElements {
                ids: ids.clone(),
                scroll_retry: scroll_retry.then(ScreenSwipe::nudge),
            },
        ),
        Command::DismissAlert => single("dismiss-alert", Step::DismissAlert),
        Command::Counter { button, counter, presses, expect } => {
            let expected = if expect.is_empty() {
                counter_window(*presses)
            } else {
                expect.clone()
            };
            let plan = Plan::new(
                "counter",
                vec![
                    Step::Repeat {
                        times: *presses,
                        steps: vec![Step::ClickAndDismiss { id: button.clone(), name: None }],
                    },
                    Step::VerifyCounter { id: counter.clone(), name: None, expected },
                ],
            );
            plan.validate().map_err(|e| CliError::Plan(e.to_string()))?;
            Ok(Some(plan))
        }
        Command::ShowConfig | Command::InitConfig => Ok(None),
    }
}

/// Counts within one of `presses`.
fn counter_window(presses: u32) -> Vec<u32> {
    (presses.saturating_sub(1)..=presses.saturating_add(1)).collect()
}

fn default_transcript_path() -> PathBuf {
    transcript_path_in(&logs_dir())
}

/// `run_<timestamp>_<uuid>.jsonl` in `dir`. The uuid keeps runs started
/// within the same second apart.
fn transcript_path_in(dir: &Path) -> PathBuf {
    dir.join(format!(
        "run_{}_{}.jsonl",
        chrono::Utc::now().format("%Y%m%d_%H%M%S"),
        uuid::Uuid::new_v4().simple()
    ))
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(&cli)?;

    // Plans are validated before a session is created.
    let Some(plan) = plan_for(&cli.command)? else {
        return config_command(&cli.command, &config);
    };

    let echo: Option<Box<dyn Write + Send>> = if cli.quiet {
        None
    } else {
        Some(Box::new(std::io::stdout()))
    };
    let transcript_path = cli.transcript.clone().unwrap_or_else(default_transcript_path);
    let transcript = Transcript::with_outputs(echo, Some(&transcript_path));

    let session = Session::connect(&config, transcript)
        .await
        .map_err(|e| CliError::Session(format!("could not start session on {}: {}", config.server_url, e)))?;
    info!(session = %session.id, plan = %plan.name, "running plan");

    let namespace = plan.namespace.clone().unwrap_or_else(|| config.namespace.clone());
    let capture = config.capture_failures || cli.screenshot_dir.is_some();
    let summary = session
        .orchestrator(&namespace, &config)
        .capture_failures(capture)
        .run_plan(&plan)
        .await;

    session.teardown().await;

    if let Some(dir) = &cli.screenshot_dir {
        save_screenshots(&session, dir).await;
    }

    if !cli.quiet {
        println!("{}", summary);
    }
    Ok(())
}

fn config_command(command: &Command, config: &MobiprobeConfig) -> Result<(), CliError> {
    if let Command::InitConfig = command {
        config.save().map_err(|e| CliError::Config(e.to_string()))?;
        println!("{}", MobiprobeConfig::default_path().display());
        return Ok(());
    }
    let json = serde_json::to_string_pretty(config).map_err(|e| CliError::Config(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

async fn save_screenshots(session: &Session, dir: &Path) {
    if let Err(e) = std::fs::create_dir_all(dir) {
        warn!(dir = %dir.display(), error = %e, "could not create screenshot directory");
        return;
    }
    for record in session.transcript().records().await {
        let Some(png) = record.screenshot else {
            continue;
        };
        let path = dir.join(format!("{}_{}.png", record.step, record.id));
        if let Err(e) = std::fs::write(&path, png.as_slice()) {
            warn!(path = %path.display(), error = %e, "could not save screenshot");
        }
    }
}
