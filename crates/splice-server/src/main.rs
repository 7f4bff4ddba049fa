// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Splice account server binary.

use clap::{Parser, Subcommand};
use splice_server::{create_app_state, create_router};
use std::time::Duration;
use tower_http::{
	cors::{Any, CorsLayer},
	trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod version;

/// How often the expired-session sweep runs. Expiry is enforced on read;
/// the sweep only reclaims rows.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Splice server - account service with email/password and social sign-in.
#[derive(Parser, Debug)]
#[command(
	name = "splice-server",
	about = "Splice account and social sign-in server",
	version
)]
struct Args {
	/// Subcommands for splice-server (e.g., `version`)
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version and build information
	Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	// Parse CLI arguments
	let args = Args::parse();

	// Handle subcommands that should not start the server
	if let Some(Command::Version) = args.command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	// Load .env file if present
	dotenvy::dotenv().ok();

	// Load configuration, honoring an explicit config file path
	let config = match std::env::var("SPLICE_SERVER_CONFIG_FILE") {
		Ok(path) if !path.is_empty() => splice_server_config::load_config_with_file(path)?,
		_ => splice_server_config::load_config()?,
	};

	// Setup tracing
	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	tracing::info!(
			host = %config.http.host,
			port = config.http.port,
			database = %config.database.url,
			"starting splice-server"
	);

	// Create database pool and run migrations
	let pool = splice_server_db::create_pool(&config.database.url).await?;
	splice_server_db::run_migrations(&pool).await?;

	let state = create_app_state(pool, &config);

	// Periodic sweep of expired session rows; the first tick fires
	// immediately, so stale rows from a previous run go right away.
	{
		let sessions = state.sessions.clone();
		tokio::spawn(async move {
			let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
			loop {
				interval.tick().await;
				match sessions.delete_expired().await {
					Ok(deleted) if deleted > 0 => {
						tracing::info!(deleted, "expired sessions deleted");
					}
					Ok(_) => {}
					Err(e) => tracing::warn!(error = %e, "session sweep failed"),
				}
			}
		});
	}

	let app = create_router(state)
		.layer(TraceLayer::new_for_http())
		.layer(
			CorsLayer::new()
				.allow_origin(Any)
				.allow_methods(Any)
				.allow_headers(Any),
		);

	// Start server
	let addr = config.socket_addr();
	tracing::info!("listening on {}", addr);

	let listener = tokio::net::TcpListener::bind(&addr).await?;

	// Run server with graceful shutdown
	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "Server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Received shutdown signal");
		}
	}

	tracing::info!("Server shutdown complete");
	Ok(())
}
