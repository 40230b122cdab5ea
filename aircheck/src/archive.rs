use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::error::AppError;
use crate::result::Result;

/// Wraps the finished recording in a deflate-compressed zip next to the
/// original. Blocking I/O; call through `spawn_blocking` from async code.
pub fn compress(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AppError::not_found(path.display()))?;
    let zip_path = path.with_extension("zip");

    let out = File::create(&zip_path)?;
    let mut writer = ZipWriter::new(out);
    writer.start_file(
        file_name,
        SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
    )?;
    io::copy(&mut File::open(path)?, &mut writer)?;
    writer.finish()?;

    Ok(zip_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn compresses_a_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("Pineland - Evening singing.mp3");
        std::fs::write(&source, b"not really audio, but compressible aaaaaa").unwrap();

        let zip_path = compress(&source).unwrap();
        assert!(zip_path.exists());
        assert_eq!(zip_path.extension().unwrap(), "zip");

        let mut archive = zip::ZipArchive::new(File::open(&zip_path).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);
        let mut entry = archive.by_index(0).unwrap();
        assert_eq!(entry.name(), "Pineland - Evening singing.mp3");
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).unwrap();
        assert_eq!(contents, b"not really audio, but compressible aaaaaa");
    }

    #[test]
    fn missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = compress(&dir.path().join("absent.mp3")).unwrap_err();
        assert!(matches!(err, AppError::InternalServerError(_)));
    }
}
