use std::path::{Path, PathBuf};

use anyhow::Result;

/// Case-insensitive extension check against a configured list.
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
        })
        .unwrap_or(false)
}

/// Find the subtitle file recorded alongside a video: same file stem in the
/// same directory, one of `extensions` (any case).
pub fn find_companion(video: &Path, extensions: &[String]) -> Option<PathBuf> {
    let stem = video.file_stem()?;
    let dir = match video.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.file_stem() == Some(stem))
        .filter(|path| has_extension(path, extensions))
        .filter(|path| path.is_file())
        .collect();
    candidates.sort(); // deterministic when both .srt and .SRT exist
    candidates.into_iter().next()
}

/// Sum of the sizes of `paths`, in bytes.
pub fn total_size(paths: &[PathBuf]) -> Result<u64> {
    let mut total = 0;
    for path in paths {
        let metadata = std::fs::metadata(path)
            .map_err(|e| anyhow::anyhow!("cannot stat {}: {}", path.display(), e))?;
        total += metadata.len();
    }
    Ok(total)
}

/// Relative difference between summed input sizes and the merged output.
///
/// Returns `None` when the inputs are empty, since no ratio can be formed.
pub fn size_delta(input_bytes: u64, output_bytes: u64) -> Option<f64> {
    if input_bytes == 0 {
        return None;
    }
    Some(input_bytes.abs_diff(output_bytes) as f64 / input_bytes as f64)
}

/// Delete each file, continuing past failures.
///
/// Returns the paths that were removed and the paths that could not be.
pub fn delete_files(paths: &[PathBuf]) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut deleted = Vec::new();
    let mut failed = Vec::new();
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => {
                tracing::info!("Deleted: {}", path.display());
                deleted.push(path.clone());
            }
            Err(e) => {
                tracing::error!("Failed to delete {}: {}", path.display(), e);
                failed.push(path.clone());
            }
        }
    }
    (deleted, failed)
}
