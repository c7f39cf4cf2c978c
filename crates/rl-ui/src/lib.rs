//! HTTP control panel for a single training or evaluation job.
//!
//! Routes `/status`, `/logs`, `/run` and `/stop` onto a [`jobslot::Supervisor`];
//! `/run` payloads are turned into script invocations by [`command`].

pub mod api;
pub mod command;
pub mod config;

use std::sync::Arc;

use api::AppState;
use command::CommandBuilder;
use config::Config;
use jobslot::Supervisor;

/// Bind the configured address and serve until Ctrl-C. A running job is
/// asked to stop on the way out.
pub async fn serve(config: Config) -> std::io::Result<()> {
	let root = config.root();
	let ui_dir = config.ui_dir();
	let supervisor = Supervisor::new(config.supervisor_config());
	let state = AppState {
		supervisor: Arc::clone(&supervisor),
		commands: Arc::new(CommandBuilder::new(&root, config.paths.python.clone())),
	};

	if !ui_dir.is_dir() {
		tracing::warn!("ui directory {} not found, serving API only", ui_dir.display());
	}
	let app = api::router(state, ui_dir.is_dir().then_some(ui_dir));

	let addr = config.bind_addr();
	let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
		tracing::error!("failed to bind HTTP on {}: {}", addr, e);
		e
	})?;
	tracing::info!("RL UI running at http://{}", addr);
	tracing::info!("jobs run in {}", root.display());

	axum::serve(listener, app)
		.with_graceful_shutdown(async move {
			let _ = tokio::signal::ctrl_c().await;
			tracing::info!("shutting down");
			supervisor.stop().await;
		})
		.await
}
