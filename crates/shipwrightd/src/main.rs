//! Shipwright daemon — HTTP boundary for the deployment pipeline.
//!
//! Exposes `POST /deploy` (the deployment operation) and `GET /healthz`.
//! All configuration is fixed at process start: the allow-listed requester
//! credentials and the hosting-service token are parsed once and injected
//! into the orchestrator.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use serde::Serialize;
use tracing::{error, info, Level};

use shipwright_core::{
    init_tracing, CredentialStore, DeployError, DeployRequest, GitCli, GithubRemote, HostingRemote,
    HttpCallback, Orchestrator, VERSION,
};

#[derive(Parser)]
#[command(name = "shipwrightd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Static-site deployment daemon", long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8080", env = "SHIPWRIGHT_BIND")]
    bind: SocketAddr,

    /// Hosting-service access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: String,

    /// Allow-listed credentials as email:secret pairs, comma separated
    #[arg(
        long = "allow",
        env = "SHIPWRIGHT_ALLOWED",
        value_delimiter = ',',
        hide_env_values = true
    )]
    allow: Vec<String>,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

struct AppState {
    orchestrator: Orchestrator,
    started: Instant,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json, Level::INFO);

    let credentials = parse_allow_list(&cli.allow)?;
    if credentials.is_empty() {
        anyhow::bail!("no allow-listed credentials configured (set SHIPWRIGHT_ALLOWED)");
    }

    let remote = GithubRemote::connect(cli.github_token)
        .await
        .context("could not resolve the authenticated hosting account")?;
    info!(owner = remote.owner_login(), "connected to hosting service");

    let orchestrator = Orchestrator::new(
        credentials,
        Arc::new(remote),
        Arc::new(GitCli::new()),
        Arc::new(HttpCallback::new()),
    );
    let state = Arc::new(AppState {
        orchestrator,
        started: Instant::now(),
    });

    let app = Router::new()
        .route("/deploy", post(deploy))
        .route("/healthz", get(healthz))
        .with_state(state);

    info!(bind = %cli.bind, "listening");
    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("could not bind {}", cli.bind))?;
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

fn parse_allow_list(pairs: &[String]) -> Result<CredentialStore> {
    let mut store = CredentialStore::new();
    for pair in pairs {
        let (email, secret) = pair.split_once(':').with_context(|| {
            format!("invalid credential pair {pair:?}, expected email:secret")
        })?;
        store.allow(email, secret);
    }
    Ok(store)
}

#[derive(Serialize)]
struct DeployResponse {
    message: String,
    repo_url: String,
    pages_url: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

type DeployResult = std::result::Result<Json<DeployResponse>, (StatusCode, Json<ErrorResponse>)>;

async fn deploy(State(state): State<Arc<AppState>>, Json(request): Json<DeployRequest>) -> DeployResult {
    // Run detached from the connection: a client disconnect must not cancel
    // a push mid-flight.
    let task = tokio::spawn(async move { state.orchestrator.deploy(&request).await });
    let result = match task.await {
        Ok(result) => result,
        Err(join_err) => {
            error!(error = %join_err, "deployment task aborted");
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "deployment task aborted".into(),
                }),
            ));
        }
    };

    match result {
        Ok(outcome) => Ok(Json(DeployResponse {
            message: if outcome.notified {
                "deployed".into()
            } else {
                "deployed; evaluator unreachable".into()
            },
            repo_url: outcome.repo_url,
            pages_url: outcome.pages_url,
        })),
        Err(err) => Err((
            error_status(&err),
            Json(ErrorResponse {
                error: err.to_string(),
            }),
        )),
    }
}

fn error_status(err: &DeployError) -> StatusCode {
    match err {
        DeployError::Unauthorized(_) => StatusCode::FORBIDDEN,
        DeployError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        DeployError::RepositoryNotFound(_) => StatusCode::NOT_FOUND,
        DeployError::RemoteUnavailable(_) => StatusCode::BAD_GATEWAY,
        DeployError::RemoteRejected(_) | DeployError::Publish(_) | DeployError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: u64,
}

async fn healthz(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: VERSION,
        uptime_secs: state.started.elapsed().as_secs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_maps_client_faults_to_4xx() {
        assert_eq!(
            error_status(&DeployError::Unauthorized("a@x.com".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            error_status(&DeployError::InvalidRequest("round".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_status(&DeployError::RepositoryNotFound("octo/x".into())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn error_status_maps_system_faults_to_5xx() {
        assert_eq!(
            error_status(&DeployError::RemoteUnavailable("down".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            error_status(&DeployError::RemoteRejected("token".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            error_status(&DeployError::Publish("git".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn health_reports_the_pipeline_version() {
        // Both crates carry the workspace version; /healthz reports the
        // pipeline library's.
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn allow_list_parses_pairs() {
        let store = parse_allow_list(&["a@x.com:S".into(), "b@y.org:T".into()]).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.authorize("a@x.com", "S").is_ok());
        assert!(store.authorize("b@y.org", "T").is_ok());
    }

    #[test]
    fn allow_list_rejects_malformed_pairs() {
        assert!(parse_allow_list(&["missing-separator".into()]).is_err());
    }

    #[test]
    fn allow_list_secret_may_contain_colons() {
        let store = parse_allow_list(&["a@x.com:S:with:colons".into()]).unwrap();
        assert!(store.authorize("a@x.com", "S:with:colons").is_ok());
    }
}
