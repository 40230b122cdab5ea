use std::{future::Future, time::Duration};

use axum::{extract::Request, Router};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, info, info_span};

use crate::config::Config;
use crate::service::database::DatabaseService;
use crate::session::SessionContext;

mod archive;
mod audio;
pub mod config;
mod entity;
mod error;
mod migration;
mod notify;
mod publisher;
mod result;
mod route;
mod service;
mod session;
pub mod shutdown;
mod tick;

pub async fn serve<F>(cfg: Config, listener: TcpListener, signal: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("Server listening on {}", listener.local_addr().unwrap());

    tokio::fs::create_dir_all(&cfg.recorder.working_dir)
        .await
        .expect("create working directory");

    let database = DatabaseService::new(&cfg.database)
        .await
        .expect("database setup failed");

    // Session uploads can take minutes; only the poll client gets a hard
    // request timeout.
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_millis(2000))
        .build()
        .unwrap();
    let client_poll = reqwest::Client::builder()
        .connect_timeout(Duration::from_millis(2000))
        .timeout(Duration::from_millis(10000))
        .build()
        .unwrap();

    let (done_tx, done_rx) = mpsc::unbounded_channel();
    let ctx = SessionContext {
        config: cfg.clone(),
        client,
        db: database.get_connection().clone(),
        done_tx,
    };

    let app_state = AppState { database };

    let app = Router::new()
        .merge(route::route())
        .nest_service("/logs", ServeDir::new(cfg.log.dir.clone()))
        .layer(if cfg.http.cors {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
        })
        .with_state(app_state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let span = info_span!(
                    "http_request",
                    uri = ?request.uri(),
                    method = ?request.method(),
                    span_id = tracing::field::Empty,
                );
                span.record(
                    "span_id",
                    span.id().unwrap_or(tracing::Id::from_u64(42)).into_u64(),
                );
                span
            }),
        );

    notify::daemon_started(&cfg);
    tokio::spawn(tick::source_check(ctx, client_poll, done_rx));

    axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .await
        .unwrap_or_else(|e| error!("Application error: {e}"));
}

#[derive(Clone)]
struct AppState {
    database: DatabaseService,
}
