use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Local};
use sea_orm::DatabaseConnection;
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::result::Result;
use crate::service::catalog::CatalogService;
use crate::{archive, audio, notify, publisher};

/// Stand-in for the measured length in the working file name, replaced once
/// the recording is finished.
pub const LENGTH_PLACEHOLDER: &str = "BROADCAST_LENGTH";

/// Everything a session needs beyond its own identity: configuration, shared
/// clients, and the channel that hands completion back to the orchestrator.
#[derive(Clone)]
pub struct SessionContext {
    pub config: Config,
    pub client: reqwest::Client,
    pub db: DatabaseConnection,
    pub done_tx: mpsc::UnboundedSender<String>,
}

/// One in-progress recording, from ffmpeg spawn to archival. Owned by the
/// orchestrator's active map; mutates only its own state and reports back
/// over the completion channel.
pub struct Session {
    pub host: String,
    pub title: String,
    pub description: String,
    pub starting_time: DateTime<Local>,
    /// Live listen URL, also used as the capture input.
    pub source_url: String,
    pub file_name: String,
    pub working_path: PathBuf,
    state: RwLock<State>,
}

struct State {
    is_recording: bool,
    recording_stopped: bool,
    uploaded: bool,
    audio_length_minutes: f64,
}

impl Default for State {
    fn default() -> Self {
        Self {
            is_recording: false,
            recording_stopped: false,
            uploaded: false,
            audio_length_minutes: -1.0,
        }
    }
}

impl Session {
    pub fn new(endpoint: &str, source: &api::source::Source, working_dir: &Path) -> Self {
        let host = source.host().to_string();
        let title = title_case(&host.replace('/', ""));
        let description = sanitize(source.description());
        let starting_time = Local::now();
        let file_name = format!(
            "{} - {} - {} - {}.mp3",
            title,
            description,
            starting_time.format("%B %d %A %Y %I_%M %p"),
            LENGTH_PLACEHOLDER
        );
        let working_path = working_dir.join(&file_name);
        let source_url = format!("{}/{}", endpoint.trim_end_matches('/'), host);

        Self {
            host,
            title,
            description,
            starting_time,
            source_url,
            file_name,
            working_path,
            state: RwLock::new(State::default()),
        }
    }

    /// Starts the capture asynchronously. A no-op if already recording.
    pub fn start(self: &Arc<Self>, ctx: SessionContext) {
        {
            let mut state = self.state.write().unwrap();
            if state.is_recording {
                return;
            }
            state.is_recording = true;
        }

        notify::session_started(&ctx, self);

        let session = self.clone();
        tokio::spawn(async move { session.run(ctx).await });
    }

    async fn run(self: Arc<Self>, ctx: SessionContext) {
        info!(host = %self.host, url = %self.source_url, "recording started");

        match self.capture().await {
            Ok(status) => info!(host = %self.host, "capture process exited: {status}"),
            Err(e) => error!(host = %self.host, "capture failed: {:?}", e),
        }

        {
            let mut state = self.state.write().unwrap();
            state.is_recording = false;
            state.recording_stopped = true;
        }
        let _ = ctx.done_tx.send(self.host.clone());

        match self.process_file(&ctx).await {
            Ok(()) => info!(
                host = %self.host,
                minutes = self.audio_length_minutes(),
                "post-processing finished"
            ),
            Err(AppError::CaptureFailed(msg)) => {
                error!(host = %self.host, "{msg} The stream ended with no usable audio.")
            }
            Err(e) => error!(host = %self.host, "post-processing failed: {:?}", e),
        }
    }

    /// Runs ffmpeg against the live stream until the broadcast ends and the
    /// process exits on its own; there is no remote stop.
    async fn capture(&self) -> Result<std::process::ExitStatus> {
        Command::new("ffmpeg")
            .arg("-y")
            .arg("-i")
            .arg(&self.source_url)
            .arg(&self.working_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| AppError::capture_failed(format!("failed to spawn ffmpeg: {e}")))
    }

    async fn process_file(&self, ctx: &SessionContext) -> Result<()> {
        if !self.working_path.exists() {
            return Err(AppError::capture_failed(format!(
                "{} does not exist.",
                self.working_path.display()
            )));
        }

        info!(host = %self.host, "processing {}", self.file_name);
        let recorder = &ctx.config.recorder;

        if recorder.trim_silence {
            if let Err(e) = audio::remove_silence(&self.working_path).await {
                warn!(host = %self.host, "silence removal skipped: {:?}", e);
            }
        }

        let minutes = match audio::duration_minutes(&self.working_path).await {
            Ok(m) => m,
            Err(e) => {
                warn!(host = %self.host, "duration probe failed ({:?}), using elapsed time", e);
                self.elapsed_minutes()
            }
        };
        self.state.write().unwrap().audio_length_minutes = minutes;

        let final_name = self
            .file_name
            .replace(LENGTH_PLACEHOLDER, &audio::format_duration(minutes));
        let final_path = self.working_path.with_file_name(&final_name);
        tokio::fs::rename(&self.working_path, &final_path).await?;

        if should_publish(minutes, recorder.minimum_length, &self.host, &self.description) {
            let track = CatalogService::count_by_host(&ctx.db, &self.host)
                .await
                .unwrap_or(0) as u32
                + 1;
            let tags = audio::Tags {
                artist: self.title.clone(),
                title: self.description.clone(),
                genre: recorder.genre.clone(),
                track,
            };
            if let Err(e) = audio::write_tags(&final_path, &tags).await {
                warn!(host = %self.host, "tagging skipped: {:?}", e);
            }

            info!(host = %self.host, "uploading {final_name}");
            match publisher::publish(
                &ctx.client,
                &ctx.config.upload,
                &ctx.db,
                &final_name,
                &final_path,
                &self.host,
                &self.description,
                &self.starting_time.format("%B %d %A %Y %I_%M %p").to_string(),
                minutes,
            )
            .await
            {
                Ok(record) => {
                    self.state.write().unwrap().uploaded = true;
                    info!(host = %self.host, "uploaded as {}", record.file_name);
                }
                Err(e) => {
                    error!(host = %self.host, "upload failed, keeping local copy: {:?}", e);
                }
            }
        } else {
            info!(
                host = %self.host,
                "{final_name} is too small ({minutes:.1} <= {}) or a test stream, not uploading",
                recorder.minimum_length
            );
            self.state.write().unwrap().uploaded = true;
        }

        if recorder.backup {
            let backup_path = final_path.clone();
            match tokio::task::spawn_blocking(move || archive::compress(&backup_path)).await {
                Ok(Ok(zip_path)) => info!(host = %self.host, "compressed to {}", zip_path.display()),
                Ok(Err(e)) => warn!(host = %self.host, "compression failed: {:?}", e),
                Err(e) => warn!(host = %self.host, "compression task failed: {e}"),
            }
        }

        if self.uploaded() {
            tokio::fs::remove_file(&final_path).await?;
            info!(host = %self.host, "original copy deleted: {final_name}");
        }

        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.state.read().unwrap().is_recording
    }

    pub fn recording_stopped(&self) -> bool {
        self.state.read().unwrap().recording_stopped
    }

    pub fn uploaded(&self) -> bool {
        self.state.read().unwrap().uploaded
    }

    pub fn audio_length_minutes(&self) -> f64 {
        self.state.read().unwrap().audio_length_minutes
    }

    fn elapsed_seconds(&self) -> u64 {
        Local::now()
            .signed_duration_since(self.starting_time)
            .num_seconds()
            .max(0) as u64
    }

    fn elapsed_minutes(&self) -> f64 {
        self.elapsed_seconds() as f64 / 60.0
    }

    pub fn status_entry(&self) -> api::status::StatusEntry {
        api::status::StatusEntry {
            host: self.host.clone(),
            link: self.source_url.clone(),
            length: audio::format_elapsed(self.elapsed_seconds()),
            description: self.description.clone(),
            starting_time: self.starting_time.format("%B %d %A %Y %I:%M %p").to_string(),
        }
    }
}

/// A recording enters the catalog only when it is longer than the configured
/// minimum and is not an explicitly named test stream.
fn should_publish(minutes: f64, minimum_length: f64, host: &str, description: &str) -> bool {
    minutes > minimum_length
        && !host.eq_ignore_ascii_case("test")
        && !description.eq_ignore_ascii_case("test")
}

/// Keeps descriptions filesystem- and URL-safe; applied identically to
/// session descriptions and published file names so catalog keys always
/// match the transport path.
pub fn sanitize(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&Amp;", "&")
        .replace('&', "and")
        .replace('/', " or ")
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use api::source::Source;

    fn source(host: &str, description: &str) -> Source {
        Source {
            listenurl: format!("http://example.org:8000/{host}"),
            server_description: Some(description.to_string()),
            genre: None,
            title: None,
            is_private: None,
        }
    }

    #[test]
    fn sanitizes_descriptions() {
        assert_eq!(
            sanitize("Sunday &amp; Monday/Tues"),
            "Sunday and Monday or Tues"
        );
        assert_eq!(sanitize("Plain text"), "Plain text");
    }

    #[test]
    fn builds_working_file_name() {
        let session = Session::new(
            "http://example.org:8000",
            &source("pineland", "Sunday & Monday"),
            Path::new("/tmp/work"),
        );
        assert_eq!(session.host, "pineland");
        assert_eq!(session.title, "Pineland");
        assert_eq!(session.description, "Sunday and Monday");
        assert!(session.file_name.starts_with("Pineland - Sunday and Monday - "));
        assert!(session
            .file_name
            .ends_with(&format!(" - {LENGTH_PLACEHOLDER}.mp3")));
        assert_eq!(session.source_url, "http://example.org:8000/pineland");
    }

    #[test]
    fn short_and_test_recordings_stay_out_of_the_catalog() {
        // A 3-minute capture with a 10-minute threshold is dropped.
        assert!(!should_publish(3.0, 10.0, "pineland", "Sunday Service"));
        assert!(should_publish(12.0, 10.0, "pineland", "Sunday Service"));

        // Exact, case-insensitive name matches are test streams.
        assert!(!should_publish(30.0, 10.0, "TEST", "whatever"));
        assert!(!should_publish(30.0, 10.0, "pineland", "Test"));
        assert!(should_publish(30.0, 10.0, "pineland", "testing the new mics"));
    }

    #[test]
    fn state_flags_start_cleared() {
        let session = Session::new(
            "http://example.org:8000",
            &source("pineland", "Sunday"),
            Path::new("/tmp/work"),
        );
        assert!(!session.is_recording());
        session.state.write().unwrap().is_recording = true;
        assert!(session.is_recording());
        assert!(!session.recording_stopped());
        assert_eq!(session.audio_length_minutes(), -1.0);
    }
}
