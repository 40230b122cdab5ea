use std::path::Path;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::multipart;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use api::catalog::NewCatalogRecord;

use crate::config::Upload;
use crate::entity::catalog_records;
use crate::error::AppError;
use crate::result::Result;
use crate::service::catalog::CatalogService;
use crate::session::sanitize;

/// Characters escaped when the file name becomes a URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Uploads a finished recording to the remote file store, creates a public
/// share for it, and records the result in the catalog. Transfer failures
/// propagate to the caller; nothing here retries.
#[allow(clippy::too_many_arguments)]
pub async fn publish(
    client: &reqwest::Client,
    cfg: &Upload,
    db: &DatabaseConnection,
    file_name: &str,
    path: &Path,
    host: &str,
    description: &str,
    date: &str,
    length: f64,
) -> Result<catalog_records::Model> {
    if cfg.url.is_empty() {
        return Err(AppError::transfer_failed("no upload endpoint configured"));
    }

    let display_name = sanitize(file_name);
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::not_found(path.display())
        } else {
            AppError::transfer_failed(format!("read {}: {e}", path.display()))
        }
    })?;

    let token = login(client, cfg).await?;
    let remote_path = format!(
        "{}/{}",
        cfg.upload_path.trim_matches('/'),
        encode_path_segment(&display_name)
    );

    delete_existing(client, cfg, &remote_path, &token).await?;
    upload_bytes(client, cfg, &remote_path, &token, &display_name, bytes).await?;
    let share_hash = create_share(client, cfg, &remote_path, &token).await?;

    let download_link = format!(
        "{}/play_recording/{}",
        cfg.public_base.trim_end_matches('/'),
        encode_path_segment(&display_name)
    );

    CatalogService::add(
        db,
        NewCatalogRecord {
            file_name: display_name,
            date: date.to_string(),
            description: description.to_string(),
            download_link: Some(download_link),
            share_hash: Some(share_hash),
            length,
            host: host.to_string(),
        },
    )
    .await
}

async fn login(client: &reqwest::Client, cfg: &Upload) -> Result<String> {
    let response = client
        .post(format!("{}/api/login", cfg.url.trim_end_matches('/')))
        .json(&json!({ "username": cfg.username, "password": cfg.password }))
        .send()
        .await
        .map_err(AppError::transfer_failed)?;
    if !response.status().is_success() {
        return Err(AppError::transfer_failed(format!(
            "login rejected: {}",
            response.status()
        )));
    }
    let token = response.text().await.map_err(AppError::transfer_failed)?;
    Ok(token.trim().to_string())
}

/// A stale copy from an interrupted earlier upload would make the store
/// reject ours; 404 just means there was none.
async fn delete_existing(
    client: &reqwest::Client,
    cfg: &Upload,
    remote_path: &str,
    token: &str,
) -> Result<()> {
    let response = client
        .delete(format!(
            "{}/api/resources/{remote_path}",
            cfg.url.trim_end_matches('/')
        ))
        .header("X-Auth", token)
        .send()
        .await
        .map_err(AppError::transfer_failed)?;
    match response.status().as_u16() {
        200 | 204 | 404 => Ok(()),
        status => Err(AppError::transfer_failed(format!(
            "failed to delete existing remote file: {status}"
        ))),
    }
}

async fn upload_bytes(
    client: &reqwest::Client,
    cfg: &Upload,
    remote_path: &str,
    token: &str,
    display_name: &str,
    bytes: Vec<u8>,
) -> Result<()> {
    debug!("uploading {} bytes to {remote_path}", bytes.len());
    let part = multipart::Part::bytes(bytes)
        .file_name(display_name.to_string())
        .mime_str("audio/mpeg")
        .map_err(AppError::transfer_failed)?;
    let form = multipart::Form::new().part("files", part);

    let response = client
        .post(format!(
            "{}/api/resources/{remote_path}",
            cfg.url.trim_end_matches('/')
        ))
        .header("X-Auth", token)
        .multipart(form)
        .send()
        .await
        .map_err(AppError::transfer_failed)?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::transfer_failed(format!(
            "upload failed: {status} - {body}"
        )));
    }
    Ok(())
}

#[derive(Deserialize)]
struct ShareResponse {
    hash: String,
}

async fn create_share(
    client: &reqwest::Client,
    cfg: &Upload,
    remote_path: &str,
    token: &str,
) -> Result<String> {
    let response = client
        .post(format!(
            "{}/api/share/{remote_path}",
            cfg.url.trim_end_matches('/')
        ))
        .header("X-Auth", token)
        .json(&json!({ "path": format!("/{remote_path}") }))
        .send()
        .await
        .map_err(AppError::transfer_failed)?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::transfer_failed(format!(
            "failed to create share link: {status} - {body}"
        )));
    }
    let share: ShareResponse = response.json().await.map_err(AppError::transfer_failed)?;
    Ok(share.hash)
}

fn encode_path_segment(name: &str) -> String {
    utf8_percent_encode(name, PATH_SEGMENT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_path_segments() {
        assert_eq!(
            encode_path_segment("Pineland - Evening singing.mp3"),
            "Pineland%20-%20Evening%20singing.mp3"
        );
        assert_eq!(encode_path_segment("a/b"), "a%2Fb");
    }
}
