//! Belay - session core command line
//!
//! Drives the session stack from a terminal for manual testing against a
//! backend: `belay login kakao <token>`, `belay fetch /api/v1/posts`.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::env;

use anyhow::{anyhow, bail, Context, Result};
use belay_domain::HttpMethod;
use belay_lib::utils::logging::{init_tracing, with_startup_tracing};
use belay_lib::{auth_fetch, get_valid_token, is_authenticated, login, logout, AppContext, FetchOptions};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables before the configuration reads them
    let dotenv = dotenvy::dotenv();

    let config = with_startup_tracing(|| {
        match &dotenv {
            Ok(path) => info!(path = %path.display(), "loaded .env"),
            Err(e) => warn!(error = %e, "could not load .env file"),
        }
        belay_infra::config::load()
    })
    .context("failed to load configuration")?;
    init_tracing(&config.logging)?;

    let ctx = AppContext::with_config(config).context("failed to build application context")?;
    let state = ctx.controller.restore().await;
    info!(status = ?state.status, "session restored");

    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("login") => {
            let (provider, token) = match (args.get(1), args.get(2)) {
                (Some(provider), Some(token)) => (provider, token),
                _ => bail!("usage: belay login <kakao|naver|google|apple> <provider-token>"),
            };
            let state = login(&ctx, provider, token).await?;
            let nickname = state.user.as_ref().map_or("(profile unavailable)", |u| u.nickname.as_str());
            println!("logged in as {nickname}");
        }
        Some("logout") => {
            logout(&ctx).await;
            println!("logged out");
        }
        Some("status") => {
            println!(
                "authenticated: {} (phase {:?})",
                is_authenticated(&ctx),
                ctx.controller.phase()
            );
        }
        Some("token") => {
            let token = get_valid_token(&ctx).await?;
            println!("{token}");
        }
        Some("fetch") => {
            let target = args.get(1).ok_or_else(|| anyhow!("usage: belay fetch <path> [METHOD]"))?;
            let method = match args.get(2) {
                Some(raw) => Some(raw.parse::<HttpMethod>()?),
                None => None,
            };
            let options = FetchOptions { method, ..FetchOptions::default() };
            let response = auth_fetch(&ctx, target, options).await?;
            println!("HTTP {}", response.status);
            println!("{}", response.text());
        }
        _ => print_help(),
    }

    Ok(())
}

fn print_help() {
    eprintln!(
        "Usage: belay <command>

Commands:
    login <provider> <token>   Exchange a social provider token
    logout                     End the session
    status                     Show session status
    token                      Print a valid access token
    fetch <path> [METHOD]      Authenticated request"
    );
}
