use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail};
use clap::{Parser, Subcommand};
use rand::RngCore;
use tracing::info;
use tracing_subscriber::EnvFilter;

use classroll::auth::{DEFAULT_TOKEN_TTL_MINUTES, MAX_TOKEN_TTL_MINUTES, PasswordHasher, TokenService};
use classroll::config::ServerConfig;
use classroll::error::Error;
use classroll::server::validation::{validate_password, validate_username};
use classroll::server::{AppState, create_router};
use classroll::store::{SqliteStore, Store};
use classroll::types::Role;

const NOT_INITIALIZED: &str =
    "Server not initialized. Run 'classroll admin init' first to create the database and secret key.";

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Parser)]
#[command(name = "classroll")]
#[command(about = "A student records server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8000")]
        port: u16,

        /// Data directory holding the database and secret key
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Lifetime of issued access tokens, in minutes
        #[arg(long, default_value_t = DEFAULT_TOKEN_TTL_MINUTES)]
        token_ttl_minutes: i64,

        /// Token signing secret. Defaults to the key file written by `admin init`.
        #[arg(long, env = "CLASSROLL_SECRET_KEY", hide_env_values = true)]
        secret_key: Option<String>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database and signing secret)
    Init {
        /// Data directory holding the database and secret key
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// Create an account directly in the database
    CreateUser {
        /// Data directory holding the database and secret key
        #[arg(long, default_value = "./data")]
        data_dir: String,

        #[arg(long)]
        username: String,

        #[arg(long)]
        password: String,

        /// One of admin, teacher or student
        #[arg(long, default_value = "teacher")]
        role: Role,
    },
}

fn run_init(data_dir: String, non_interactive: bool) -> anyhow::Result<()> {
    let config = ServerConfig {
        data_dir: data_dir.into(),
        ..Default::default()
    };
    let data_path = &config.data_dir;
    fs::create_dir_all(data_path)?;

    let key_file = config.secret_key_path();
    if key_file.exists() {
        bail!(
            "Server already initialized. Secret key exists at: {}",
            key_file.display()
        );
    }

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    fs::write(&key_file, generate_secret())?;

    #[cfg(unix)]
    set_restrictive_permissions(&key_file);

    println!();
    println!("========================================");
    println!("Database initialized in {}", data_path.display());
    println!("Token signing secret written to: {}", key_file.display());
    println!("========================================");
    println!();

    if !non_interactive {
        create_admin_prompt(&store)?;
    }

    Ok(())
}

fn create_admin_prompt(store: &SqliteStore) -> anyhow::Result<()> {
    let create_admin = inquire::Confirm::new("Would you like to create an admin account?")
        .with_default(true)
        .prompt()?;

    if !create_admin {
        return Ok(());
    }

    let username = inquire::Text::new("Username:")
        .with_validator(|input: &str| match validate_username(input) {
            Ok(()) => Ok(inquire::validator::Validation::Valid),
            Err(e) => Ok(inquire::validator::Validation::Invalid(e.message.into())),
        })
        .prompt()?;

    let password = inquire::Password::new("Password:")
        .with_validator(inquire::required!("Password cannot be empty"))
        .prompt()?;

    create_user(store, &username, &password, Role::Admin)
}

fn create_user(store: &SqliteStore, username: &str, password: &str, role: Role) -> anyhow::Result<()> {
    validate_username(username).map_err(|e| anyhow!(e.message))?;
    validate_password(password).map_err(|e| anyhow!(e.message))?;

    let password_hash = PasswordHasher::new().hash(password)?;

    match store.create_user(username, &password_hash, role) {
        Ok(user) => {
            println!("Created {} account '{}' (id {})", user.role, user.username, user.id);
            Ok(())
        }
        Err(Error::Conflict(message)) => bail!("{message}"),
        Err(e) => Err(e.into()),
    }
}

fn run_create_user(
    data_dir: String,
    username: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<()> {
    let config = ServerConfig {
        data_dir: data_dir.into(),
        ..Default::default()
    };

    if !config.db_path().exists() {
        bail!(NOT_INITIALIZED);
    }

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    create_user(&store, username, password, role)
}

async fn run_serve(config: ServerConfig) -> anyhow::Result<()> {
    if !config.db_path().exists() {
        bail!(NOT_INITIALIZED);
    }

    let secret = match config.load_secret() {
        Ok(secret) => secret,
        Err(Error::Config(reason)) => bail!("{NOT_INITIALIZED} ({reason})"),
        Err(e) => return Err(e.into()),
    };

    if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&config.token_ttl_minutes) {
        bail!("--token-ttl-minutes must be between 1 and {MAX_TOKEN_TTL_MINUTES}");
    }
    let ttl = chrono::Duration::try_minutes(config.token_ttl_minutes)
        .ok_or_else(|| anyhow!("--token-ttl-minutes is out of range"))?;

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    let tokens = TokenService::new(&secret, ttl)?;
    let state = Arc::new(AppState::new(Arc::new(store), tokens));

    let app = create_router(state);
    let addr = config.socket_addr()?;

    info!(
        "Starting server on {} (tokens valid for {} minutes)",
        addr, config.token_ttl_minutes
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("classroll=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                non_interactive,
            } => {
                run_init(data_dir, non_interactive)?;
            }
            AdminCommands::CreateUser {
                data_dir,
                username,
                password,
                role,
            } => {
                run_create_user(data_dir, &username, &password, role)?;
            }
        },
        Commands::Serve {
            host,
            port,
            data_dir,
            token_ttl_minutes,
            secret_key,
        } => {
            run_serve(ServerConfig {
                host,
                port,
                data_dir: data_dir.into(),
                token_ttl_minutes,
                secret_key,
            })
            .await?;
        }
    }

    Ok(())
}
