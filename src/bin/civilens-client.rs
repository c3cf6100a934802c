use anyhow::{anyhow, Context, Result};
use civilens_client::api::client::ApiClient;
use civilens_client::auth::models::{LoginRequest, RegisterRequest};
use civilens_client::auth::service::AuthService;
use civilens_client::observability::metrics::encode_text;
use civilens_client::transport::client::RequestOptions;
use civilens_client::transport::envelope::Envelope;
use civilens_client::utils::config_loader;
use civilens_client::utils::logging;
use civilens_client::utils::logging::LogLevel;
use clap::{Parser, Subcommand};
use http::Method;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "civilens.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and persist the refresh token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CIVILENS_PASSWORD")]
        password: String,
    },
    /// Create an account and log in with it
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CIVILENS_PASSWORD")]
        password: String,
        #[arg(long)]
        username: Option<String>,
        /// Extra registration fields as key=value
        #[arg(long = "field", value_parser = parse_pair)]
        fields: Vec<(String, String)>,
    },
    Logout,
    /// Fetch the current profile
    Profile,
    /// Print session state and the stored user
    Status,
    Get {
        path: String,
        #[arg(short, long = "query", value_parser = parse_pair)]
        query: Vec<(String, String)>,
    },
    Post {
        path: String,
        #[arg(short, long)]
        data: Option<String>,
    },
    Put {
        path: String,
        #[arg(short, long)]
        data: Option<String>,
    },
    Patch {
        path: String,
        #[arg(short, long)]
        data: Option<String>,
    },
    Delete {
        path: String,
    },
    /// Dump the metrics recorded during this invocation
    Metrics,
}

fn parse_pair(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected key=value, got '{}'", raw))?;
    Ok((key.to_owned(), value.to_owned()))
}

fn parse_body(data: Option<String>) -> Result<Value> {
    match data {
        Some(raw) => serde_json::from_str(&raw).context("--data is not valid JSON"),
        None => Ok(json!({})),
    }
}

fn print_envelope(envelope: &Envelope) -> Result<bool> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(envelope.success)
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Read args, load YAML config
    // -------------------------------

    let args = Args::parse();
    let client_config = config_loader::run(&args.config)?;
    logging::run(&client_config, args.log_level)?;

    // -------------------------------
    // 2. Build client and auth service
    // -------------------------------

    let api = ApiClient::from_config(&client_config)?;
    let auth = AuthService::new(api.clone());

    // -------------------------------
    // 3. Restore the stored session, unless we are about to replace it
    // -------------------------------

    let bootstrap = !matches!(
        args.command,
        Command::Login { .. } | Command::Register { .. } | Command::Metrics
    );
    if bootstrap {
        match auth.refresh_from_storage().await {
            Ok(true) => info!("session restored"),
            Ok(false) => info!("no stored session"),
            Err(err) if !err.is_terminal() => warn!("stored session kept for later: {}", err),
            Err(err) => warn!("stored session could not be restored: {}", err),
        }
    }

    // -------------------------------
    // 4. Run the command
    // -------------------------------

    let succeeded = match args.command {
        Command::Login { email, password } => {
            print_envelope(&auth.login(&LoginRequest::new(email, password)).await)?
        }
        Command::Register {
            email,
            password,
            username,
            fields,
        } => {
            let extra: Map<String, Value> = fields
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect();
            let request = RegisterRequest {
                email,
                password,
                username,
                extra,
            };
            print_envelope(&auth.register(&request).await)?
        }
        Command::Logout => print_envelope(&auth.logout().await)?,
        Command::Profile => print_envelope(&auth.profile().await)?,
        Command::Status => {
            let status = json!({
                "state": auth.state().as_str(),
                "user": auth.current_user().map(|user| user.to_value()),
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
            true
        }
        Command::Get { path, query } => {
            let mut options = RequestOptions::new();
            for (key, value) in &query {
                options = options.query(key, value);
            }
            print_envelope(&api.get(&path, options).await)?
        }
        Command::Post { path, data } => send(&api, Method::POST, &path, data).await?,
        Command::Put { path, data } => send(&api, Method::PUT, &path, data).await?,
        Command::Patch { path, data } => send(&api, Method::PATCH, &path, data).await?,
        Command::Delete { path } => print_envelope(&api.delete(&path).await)?,
        Command::Metrics => {
            print!("{}", encode_text().await?);
            true
        }
    };

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

async fn send(api: &ApiClient, method: Method, path: &str, data: Option<String>) -> Result<bool> {
    let body = parse_body(data)?;
    print_envelope(&api.request(method, path, Some(&body), RequestOptions::new()).await)
}
