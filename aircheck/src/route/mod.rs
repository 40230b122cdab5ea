use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use api::catalog::CatalogUpdate;
use api::status::StatusEntry;

use crate::entity::catalog_records;
use crate::result::Result;
use crate::service::catalog::CatalogService;
use crate::service::status::StatusService;
use crate::AppState;

/// Read-only status for the website plus the catalog operations the desktop
/// editor drives. Key-invariant violations surface as 404/409 responses.
pub fn route() -> Router<AppState> {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/archives", get(list_archives).delete(remove_by_host))
        .route(
            "/api/archives/:file_name",
            get(get_archive).patch(edit_archive).delete(remove_archive),
        )
        .route("/api/archives/:file_name/rename", post(rename_archive))
        .route("/api/archives/:file_name/link", get(download_link))
}

async fn status(State(state): State<AppState>) -> Result<Json<Vec<StatusEntry>>> {
    let rows = StatusService::list(state.database.get_connection()).await?;
    Ok(Json(
        rows.into_iter()
            .map(|row| StatusEntry {
                host: row.host,
                link: row.link,
                length: row.length,
                description: row.description,
                starting_time: row.starting_time,
            })
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
struct ArchivesQuery {
    host: Option<String>,
}

async fn list_archives(
    State(state): State<AppState>,
    Query(query): Query<ArchivesQuery>,
) -> Result<Json<Vec<catalog_records::Model>>> {
    let db = state.database.get_connection();
    let rows = match query.host {
        Some(host) => CatalogService::list_by_host(db, &host).await?,
        None => CatalogService::list(db).await?,
    };
    Ok(Json(rows))
}

async fn get_archive(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Json<catalog_records::Model>> {
    let record = CatalogService::get(state.database.get_connection(), &file_name).await?;
    Ok(Json(record))
}

async fn edit_archive(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
    Json(update): Json<CatalogUpdate>,
) -> Result<Json<catalog_records::Model>> {
    let record =
        CatalogService::edit(state.database.get_connection(), &file_name, update).await?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
struct RenameRequest {
    new_name: String,
}

async fn rename_archive(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
    Json(request): Json<RenameRequest>,
) -> Result<Json<catalog_records::Model>> {
    let record = CatalogService::rename(
        state.database.get_connection(),
        &file_name,
        &request.new_name,
    )
    .await?;
    Ok(Json(record))
}

async fn remove_archive(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<()> {
    CatalogService::remove(state.database.get_connection(), &file_name).await
}

#[derive(Debug, Deserialize)]
struct HostQuery {
    host: String,
}

async fn remove_by_host(
    State(state): State<AppState>,
    Query(query): Query<HostQuery>,
) -> Result<Json<u64>> {
    let removed =
        CatalogService::remove_all_by_host(state.database.get_connection(), &query.host).await?;
    Ok(Json(removed))
}

async fn download_link(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Json<Option<String>>> {
    let link =
        CatalogService::get_download_link(state.database.get_connection(), &file_name).await?;
    Ok(Json(link))
}
