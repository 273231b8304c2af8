use clap::Parser;
use radius_auth::{AuthConfig, AuthError, ConfigError, RadiusValidator};
use std::io::ErrorKind;
use std::process;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Check a username/password pair against a RADIUS server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "radius-auth")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "CONFIG", default_value = "radius-auth.json")]
    config: String,

    /// User to authenticate
    #[arg(value_name = "USERNAME", required_unless_present = "validate")]
    username: Option<String>,

    /// Password to check (prefer the environment variable over the command line)
    #[arg(short, long, env = "RADIUS_AUTH_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Validate configuration and exit (doesn't contact any server)
    #[arg(long)]
    validate: bool,
}

const EXIT_ACCEPT: i32 = 0;
const EXIT_REJECT: i32 = 1;
const EXIT_ERROR: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AuthConfig::from_file(&cli.config) {
        Ok(cfg) => cfg,
        Err(ConfigError::Io(e)) if e.kind() == ErrorKind::NotFound && !cli.validate => {
            init_tracing("info");

            warn!("Could not load config file from: {}", cli.config);
            info!("Creating example configuration at: {}", cli.config);

            if let Err(e) = AuthConfig::example().to_file(&cli.config) {
                error!("Error creating example config: {}", e);
                process::exit(EXIT_ERROR);
            }

            info!("Please edit {} and run again", cli.config);
            process::exit(EXIT_ACCEPT);
        }
        Err(e) => {
            eprintln!("Configuration validation failed!");
            eprintln!("   Error: {}", e);
            process::exit(EXIT_ERROR);
        }
    };

    if cli.validate {
        println!("Configuration validated successfully!");
        println!();
        println!("Configuration summary:");
        println!("  NAS address: {}", config.ip_address);
        println!("  Servers: {}", config.options.host.hosts().join(", "));
        println!("  Port: {}", config.options.port);
        println!("  Timeout: {} ms", config.options.timeout);
        println!("  Retries: {}", config.options.retries);
        match config.identifier {
            Some(id) => println!("  Identifier: {}", id),
            None => println!("  Identifier: random"),
        }
        println!(
            "  Message-Authenticator: {}",
            if config.require_message_authenticator { "required" } else { "off" }
        );
        if let Some(ref path) = config.audit_log_path {
            println!("  Audit log: {}", path);
        }
        process::exit(EXIT_ACCEPT);
    }

    init_tracing(config.log_level.as_deref().unwrap_or("info"));

    let (Some(username), Some(password)) = (cli.username, cli.password) else {
        error!("A username and a password (--password or RADIUS_AUTH_PASSWORD) are required");
        process::exit(EXIT_ERROR);
    };

    let validator = match RadiusValidator::new(config) {
        Ok(v) => v,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(EXIT_ERROR);
        }
    };

    match validator.validate(&username, &password).await {
        Ok(validation) if validation.is_valid => {
            println!("ACCEPT {}", validation.credentials.id);
            process::exit(EXIT_ACCEPT);
        }
        Ok(validation) => {
            println!("REJECT {}", validation.credentials.id);
            process::exit(EXIT_REJECT);
        }
        Err(AuthError::Configuration(e)) => {
            error!("Configuration error: {}", e);
            process::exit(EXIT_ERROR);
        }
        Err(AuthError::Request(e)) => {
            error!("Invalid credentials: {}", e);
            process::exit(EXIT_ERROR);
        }
        Err(AuthError::Transport(e)) => {
            // Already reported through the validator's log sink
            eprintln!("ERROR {}", e);
            process::exit(EXIT_ERROR);
        }
    }
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
