use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Deserialize;

use crate::error::FlightError;

/// Source of a recording's playable duration.
pub trait DurationProvider {
    fn name(&self) -> &str;
    fn duration(&self, path: &Path) -> Result<chrono::Duration, FlightError>;
}

/// Reads durations with an external `ffprobe` binary.
pub struct Ffprobe {
    binary: PathBuf,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

impl Ffprobe {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl DurationProvider for Ffprobe {
    fn name(&self) -> &str {
        "ffprobe"
    }

    fn duration(&self, path: &Path) -> Result<chrono::Duration, FlightError> {
        let unavailable = |reason: String| FlightError::DurationUnavailable {
            path: path.to_path_buf(),
            reason,
        };

        if !path.is_file() {
            return Err(unavailable("file not found".to_string()));
        }

        let output = Command::new(&self.binary)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| unavailable(format!("failed to run {}: {}", self.binary.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(unavailable(format!(
                "ffprobe exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let seconds = parse_ffprobe_duration(&output.stdout).map_err(unavailable)?;
        whole_seconds(seconds)
            .ok_or_else(|| unavailable(format!("duration {}s is out of range", seconds)))
    }
}

/// Pull `format.duration` (seconds, as a string) out of ffprobe's JSON.
fn parse_ffprobe_duration(stdout: &[u8]) -> Result<f64, String> {
    let parsed: FfprobeOutput =
        serde_json::from_slice(stdout).map_err(|e| format!("invalid ffprobe output: {}", e))?;
    let raw = parsed
        .format
        .duration
        .ok_or_else(|| "ffprobe reported no duration".to_string())?;
    let seconds: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("unparseable duration '{}'", raw))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(format!("invalid duration '{}'", raw));
    }
    Ok(seconds)
}

/// Durations are truncated to whole seconds before grouping. `None` when the
/// value does not fit a `chrono::Duration`.
fn whole_seconds(seconds: f64) -> Option<chrono::Duration> {
    let whole = seconds.trunc();
    if whole >= i64::MAX as f64 {
        return None;
    }
    chrono::Duration::try_seconds(whole as i64)
}
