use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use stellar::config::{LoggingConfig, StellarConfig};
use stellar::ratelimit::RateLimiter;
use stellar::version::{
    compute_next_version, normalize, parse_dependencies, validate_runtime_version_format,
    validate_version_format, BumpType,
};

/// Theme hub tooling: version rules and download rate limiting.
#[derive(Debug, Parser)]
#[command(name = "stellar", version, about)]
struct Cli {
    /// YAML configuration file (STELLAR_* environment variables override it)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the version that follows CURRENT
    NextVersion {
        /// Current version, with or without a leading `v`
        current: String,
        #[arg(long, short, value_enum, default_value_t = BumpType::Minor)]
        bump: BumpType,
    },
    /// Check a version string's format
    Validate {
        version: String,
        /// Check a `major.minor.patch` runtime version instead
        #[arg(long)]
        runtime: bool,
    },
    /// Parse a dependency list (one per line) from FILE or stdin
    Deps {
        file: Option<PathBuf>,
    },
    /// Run KEY through a rate limiter COUNT times and print each decision
    Simulate {
        key: String,
        #[arg(long, short = 'n', default_value_t = 3)]
        count: u32,
    },
    /// Print the effective configuration
    Config,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = StellarConfig::load(cli.config.as_deref())?;
    init_tracing(&config.logging);

    debug!(config = ?config, "Configuration loaded");

    match cli.command {
        Command::NextVersion { current, bump } => {
            let next = compute_next_version(normalize(&current), bump)?;
            println!("{}", next);
        }
        Command::Validate { version, runtime } => {
            let valid = if runtime {
                validate_runtime_version_format(&version)
            } else {
                validate_version_format(normalize(&version))
            };
            println!("{}", if valid { "valid" } else { "invalid" });
            if !valid {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Deps { file } => {
            let text = match file {
                Some(path) => std::fs::read_to_string(path)?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let dependencies = parse_dependencies(Some(&text));
            println!("{}", serde_json::to_string_pretty(&dependencies)?);
        }
        Command::Simulate { key, count } => {
            let limiter = RateLimiter::with_settings(config.rate_limiting.settings()?);
            info!(key = %key, count, "Simulating rate limit checks");
            for _ in 0..count {
                println!("{}", serde_json::to_string(&limiter.check(&key))?);
            }
        }
        Command::Config => {
            print!("{}", config.to_yaml()?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Initialize tracing to stderr, honouring `RUST_LOG` over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
