use std::fmt::Display;
use std::time::Duration;

use anyhow::{Result, anyhow};
use bookrev_app::state::AppState;
use bookrev_server::config::{Parser, ServerConfig};
use bookrev_types::claim::ApiClaim;
use rand::Rng as _;
use reqwest::Url;
use tempfile::TempDir;
use time::{OffsetDateTime, PrimitiveDateTime};

pub mod rest;

/// Guid the default authorized test client acts as.
pub const TEST_USER_GUID: &str = "e2e-user-1";

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, std::time::Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

#[derive(Debug, Clone, Copy)]
pub enum TestUser {
    User,
    Anonymous,
}

pub async fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix(format!("{}_", test_name))?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let database_url = format!("sqlite://{}/test.db?mode=rwc", data_dir);
    let port = random_port()?;
    let port = port.to_string();
    let base_url = format!("http://localhost:{}", port);
    let args = &[
        "bookrev-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
        "--base-url",
        &base_url,
        "--database-url",
        &database_url,
    ];
    let config = ServerConfig::try_parse_from(args)?;

    // Schema is ready before launch, so tests can seed the database directly
    let pool = bookrev_dal::new_pool(&database_url).await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;
    pool.close().await;

    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

pub async fn launch_env(args: ServerConfig, user: TestUser) -> Result<(reqwest::Client, AppState)> {
    let base_url = args.base_url.clone();
    let state = bookrev_server::build_state(&args).await?;
    let server_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) =
            bookrev_server::run_graceful_with_state(args, server_state, std::future::pending())
                .await
        {
            tracing::error!("Server failed: {e}");
        }
    });
    wait_for_server(&base_url).await?;

    let client = match user {
        TestUser::User => authorized_client(&state, TEST_USER_GUID)?,
        TestUser::Anonymous => reqwest::Client::new(),
    };
    Ok((client, state))
}

/// Client with a bearer token for the given user guid.
pub fn authorized_client(state: &AppState, user_guid: &str) -> Result<reqwest::Client> {
    let token = state.tokens().issue(ApiClaim::new_expired(user_guid))?;
    let mut headers = reqwest::header::HeaderMap::new();
    let mut auth = reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))?;
    auth.set_sensitive(true);
    headers.insert(reqwest::header::AUTHORIZATION, auth);
    Ok(reqwest::Client::builder().default_headers(headers).build()?)
}

async fn wait_for_server(base_url: &Url) -> Result<()> {
    let client = reqwest::Client::new();
    let health_url = base_url.join("health")?;
    for _ in 0..100 {
        match client.get(health_url.clone()).send().await {
            Ok(response) if response.status().is_success() => return Ok(()),
            _ => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    }
    Err(anyhow!("Server did not become ready"))
}

pub fn extend_url(url: &Url, segment: impl Display) -> Url {
    let mut url = url.clone();
    url.path_segments_mut()
        .expect("URL cannot be extended")
        .push(&segment.to_string());
    url
}

pub fn now() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}
