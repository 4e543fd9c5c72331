//! Pathlock
//!
//! Browse a directory tree behind password locks and conditional rules.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use explorer::config::{default_config_path, Config};
use explorer::engine::parse_rules;
use explorer::session::{format_rule_load, Command, Outcome, Session};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Pathlock - password-gated file tree explorer.
#[derive(Parser, Debug)]
#[command(name = "pathlock")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive session
    Shell,

    /// Print the visible tree
    Tree {
        /// Directory to start from (defaults to the root)
        path: Option<PathBuf>,
    },

    /// Lock a file or directory
    Lock {
        /// Path to lock
        path: String,

        /// Set a one-time lock that disappears after the first unlock
        #[arg(long, short)]
        temporary: bool,

        /// Password (prompted for when omitted)
        #[arg(long, short)]
        password: Option<String>,
    },

    /// Unlock a file or directory
    Unlock {
        /// Path to unlock
        path: String,

        /// Password (prompted for when omitted)
        #[arg(long, short)]
        password: Option<String>,
    },

    /// Show lock, access and visibility state of a path
    Status {
        /// Path to inspect
        path: String,
    },

    /// Inspect the rule file
    #[command(subcommand)]
    Rules(RulesCommands),

    /// Change the root directory and save it to the configuration
    SetRoot {
        /// New root directory
        dir: PathBuf,
    },
}

/// Subcommands for rule inspection.
#[derive(Subcommand, Debug, Clone)]
pub enum RulesCommands {
    /// Parse a rule file and report problems without touching any locks
    Check {
        /// Rule file (defaults to the configured one)
        file: Option<PathBuf>,
    },

    /// List the rules loaded from the configured rule file
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = Config::load(&config_path)?;
    let overridden = config.apply_env_overrides();

    // Initialize tracing
    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config.explorer.log_level.to_lowercase()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Using config file: {:?}", config_path);
    for setting in overridden {
        tracing::info!("Overriding {} from environment", setting);
    }

    // The configured root may be gone; set-root is how it gets replaced.
    if let Commands::SetRoot { .. } = &cli.command {
        config.explorer.root_dir = None;
    }

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Shell => {
            let mut session = Session::open(config, config_path)?;
            run_shell(&mut session).await?;
        }
        Commands::Tree { path } => {
            let mut session = Session::open(config, config_path)?;
            let path = path.map(|p| p.to_string_lossy().into_owned());
            finish(session.execute(Command::Tree(path)));
        }
        Commands::Lock {
            path,
            temporary,
            password,
        } => {
            let password = match password {
                Some(password) => password,
                None => read_password("New password: ").await?,
            };
            let mut session = Session::open(config, config_path)?;
            let command = if temporary {
                Command::TempLock { path, password }
            } else {
                Command::Lock { path, password }
            };
            finish(session.execute(command));
        }
        Commands::Unlock { path, password } => {
            let password = match password {
                Some(password) => password,
                None => read_password("Password: ").await?,
            };
            let mut session = Session::open(config, config_path)?;
            finish(session.execute(Command::Unlock { path, password }));
        }
        Commands::Status { path } => {
            let mut session = Session::open(config, config_path)?;
            finish(session.execute(Command::Status(path)));
        }
        Commands::Rules(RulesCommands::Check { file }) => {
            let file = file.unwrap_or_else(|| config.rules_path());
            check_rules(&file)?;
        }
        Commands::Rules(RulesCommands::List) => {
            let mut session = Session::open(config, config_path)?;
            finish(session.execute(Command::Rules));
        }
        Commands::SetRoot { dir } => {
            let dir = std::path::absolute(&dir)
                .with_context(|| format!("Invalid directory: {}", dir.display()))?;
            let mut session = Session::open(config, config_path)?;
            let dir = dir.to_string_lossy().into_owned();
            finish(session.execute(Command::Root(Some(dir))));
        }
    }

    Ok(())
}

/// Print the outcome of a one-shot command, exiting non-zero on errors.
fn finish(outcome: Outcome) {
    if let Outcome::Continue(text) = outcome {
        let failed = text
            .lines()
            .any(|line| line.starts_with("error:") || line.starts_with("warning:"));
        if failed {
            eprintln!("{}", text);
            std::process::exit(1);
        }
        if !text.is_empty() {
            println!("{}", text);
        }
    }
}

/// Parse a rule file and print what was understood.
fn check_rules(path: &Path) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read rule file: {}", path.display()))?;
    let parsed = parse_rules(&source);

    for (i, rule) in parsed.rules.iter().enumerate() {
        println!("{:>3}. {}", i + 1, rule);
    }
    println!("{}", format_rule_load(parsed.rules.len(), &parsed.diagnostics));

    if !parsed.diagnostics.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

/// Read one line from stdin after printing `prompt`.
async fn read_password(prompt: &str) -> anyhow::Result<String> {
    print!("{}", prompt);
    std::io::stdout().flush()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let password = lines
        .next_line()
        .await?
        .context("No password given")?;
    if password.is_empty() {
        anyhow::bail!("Password must not be empty");
    }
    Ok(password)
}

/// Run the interactive session until `quit`, end of input, or Ctrl-C.
async fn run_shell(session: &mut Session) -> anyhow::Result<()> {
    println!(
        "pathlock: browsing {} (type 'help' for commands)",
        session.engine().root_path().display()
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("pathlock> ");
        std::io::stdout().flush()?;

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    println!();
                    break;
                };
                match session.execute_line(&line) {
                    Outcome::Continue(text) => {
                        if !text.is_empty() {
                            println!("{}", text);
                        }
                    }
                    Outcome::Quit => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl-C");
                println!();
                break;
            }
        }
    }

    if let Some(warning) = session.flush() {
        eprintln!("{}", warning);
    }
    tracing::info!("Session ended");
    Ok(())
}
