use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::error::AppError;
use crate::result::Result;

/// Tags stamped onto a finished recording before publishing.
#[derive(Debug, Clone)]
pub struct Tags {
    pub artist: String,
    pub title: String,
    pub genre: String,
    pub track: u32,
}

/// Strips interior silence in place. The filter re-encodes, so the output
/// goes through a sibling temp file first.
pub async fn remove_silence(path: &Path) -> Result<()> {
    let tmp = path.with_extension("trim.mp3");
    let status = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(path)
        .arg("-af")
        .arg("silenceremove=stop_periods=-1:stop_duration=1:stop_threshold=-40dB")
        .arg(&tmp)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|e| AppError::capture_failed(format!("failed to run ffmpeg: {e}")))?;

    if !status.success() {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(AppError::capture_failed(format!(
            "silence removal exited with {status} for {}",
            path.display()
        )));
    }

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Measures the audio length in minutes by decoding to the null muxer and
/// parsing the `Duration:` line ffmpeg prints on stderr.
pub async fn duration_minutes(path: &Path) -> Result<f64> {
    let output = Command::new("ffmpeg")
        .arg("-i")
        .arg(path)
        .arg("-f")
        .arg("null")
        .arg("-")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| AppError::capture_failed(format!("failed to run ffmpeg: {e}")))?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    debug!("ffmpeg duration probe for {}", path.display());
    parse_duration_seconds(&stderr)
        .map(|seconds| seconds / 60.0)
        .ok_or_else(|| {
            AppError::capture_failed(format!("no duration reported for {}", path.display()))
        })
}

fn parse_duration_seconds(stderr: &str) -> Option<f64> {
    let line = stderr.lines().find(|l| l.contains("Duration:"))?;
    let time = line.split("Duration:").nth(1)?.split(',').next()?.trim();
    let mut parts = time.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Writes ID3 tags via a stream-copy remux; the audio itself is untouched.
pub async fn write_tags(path: &Path, tags: &Tags) -> Result<()> {
    let tmp = path.with_extension("tagged.mp3");
    let status = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(path)
        .arg("-codec")
        .arg("copy")
        .arg("-metadata")
        .arg(format!("artist={}", tags.artist))
        .arg("-metadata")
        .arg(format!("album_artist={}", tags.artist))
        .arg("-metadata")
        .arg(format!("title={}", tags.title))
        .arg("-metadata")
        .arg(format!("genre={}", tags.genre))
        .arg("-metadata")
        .arg(format!("track={}", tags.track))
        .arg("-metadata")
        .arg(format!("disc={}", tags.track))
        .arg(&tmp)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|e| AppError::capture_failed(format!("failed to run ffmpeg: {e}")))?;

    if !status.success() {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(AppError::capture_failed(format!(
            "tagging exited with {status} for {}",
            path.display()
        )));
    }

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Archival-name duration: `"{m}m {s}s"` under an hour, `"{h}h {m}m {s}s"`
/// otherwise.
pub fn format_duration(minutes: f64) -> String {
    let total = (minutes * 60.0).round().max(0.0) as u64;
    let hours = total / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;
    if hours == 0 {
        format!("{mins}m {secs}s")
    } else {
        format!("{hours}h {mins}m {secs}s")
    }
}

/// Status-page elapsed time, spelled out and pluralized; the hours clause is
/// omitted while it is zero.
pub fn format_elapsed(elapsed_seconds: u64) -> String {
    let hours = elapsed_seconds / 3600;
    let minutes = (elapsed_seconds % 3600) / 60;
    let seconds = elapsed_seconds % 60;

    let unit = |n: u64, word: &str| {
        if n == 1 {
            format!("{n} {word}")
        } else {
            format!("{n} {word}s")
        }
    };

    if hours == 0 {
        format!("{}, {}", unit(minutes, "minute"), unit(seconds, "second"))
    } else {
        format!(
            "{}, {}, {}",
            unit(hours, "hour"),
            unit(minutes, "minute"),
            unit(seconds, "second")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_short_durations() {
        assert_eq!(format_duration(0.75), "0m 45s");
    }

    #[test]
    fn formats_durations_over_an_hour() {
        let minutes = 75.0 + 5.0 / 60.0;
        assert_eq!(format_duration(minutes), "1h 15m 5s");
    }

    #[test]
    fn formats_exactly_one_hour() {
        assert_eq!(format_duration(60.0), "1h 0m 0s");
    }

    #[test]
    fn formats_elapsed_text() {
        assert_eq!(format_elapsed(59), "0 minutes, 59 seconds");
        assert_eq!(format_elapsed(61), "1 minute, 1 second");
        assert_eq!(format_elapsed(3723), "1 hour, 2 minutes, 3 seconds");
    }

    #[test]
    fn parses_ffmpeg_duration_line() {
        let stderr = "Input #0, mp3, from 'x.mp3':\n  Duration: 01:15:05.00, start: 0.000000, bitrate: 128 kb/s\n";
        let seconds = parse_duration_seconds(stderr).unwrap();
        assert_eq!(seconds, 4505.0);
    }

    #[test]
    fn duration_parse_rejects_garbage() {
        assert!(parse_duration_seconds("no duration here").is_none());
        assert!(parse_duration_seconds("Duration: N/A, bitrate: N/A").is_none());
    }
}
