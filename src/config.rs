use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::filename::DEFAULT_TIMESTAMP_OFFSET;
use crate::flight::DEFAULT_GAP_TOLERANCE_SECS;
use crate::subtitle::merger::OffsetAnchor;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub concatenator: ConcatenatorConfig,
    pub probe: ProbeConfig,
    pub files: FilesConfig,
    pub segmentation: SegmentationConfig,
    pub subtitles: SubtitlesConfig,
    pub integrity: IntegrityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Base directory; each batch gets a `<YYYY MM DD> <label>` folder inside.
    pub root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcatenatorConfig {
    pub path: PathBuf,
    /// Flag placed before the output path. Empty means the output is passed
    /// as the last positional argument.
    pub output_flag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub ffprobe_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    pub timestamp_offset: usize,
    pub video_extensions: Vec<String>,
    pub subtitle_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub gap_tolerance_secs: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitlesConfig {
    pub offset_anchor: OffsetAnchor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrityConfig {
    /// Largest accepted |inputs - output| / inputs before sources are kept.
    pub max_size_delta: f64,
}

// --- Default implementations ---

impl Default for OutputConfig {
    fn default() -> Self {
        let root = dirs::video_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("FPV");
        Self { root }
    }
}

impl Default for ConcatenatorConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("mp4_merge"),
            output_flag: "--out".to_string(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            ffprobe_path: PathBuf::from("ffprobe"),
        }
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            timestamp_offset: DEFAULT_TIMESTAMP_OFFSET,
            video_extensions: vec!["mp4".to_string(), "mov".to_string()],
            subtitle_extensions: vec!["srt".to_string()],
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            gap_tolerance_secs: DEFAULT_GAP_TOLERANCE_SECS,
        }
    }
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            max_size_delta: 0.001,
        }
    }
}

// --- Config loading ---

impl Config {
    /// Load config and return the resolved file path (if any).
    pub fn load_with_path(path: Option<&Path>) -> anyhow::Result<(Self, Option<PathBuf>)> {
        // 1. Check explicit path
        if let Some(p) = path {
            let content = std::fs::read_to_string(p).map_err(|e| {
                anyhow::anyhow!("Failed to read config file {}: {}", p.display(), e)
            })?;
            let config = Self::parse(&content, p)?;
            return Ok((config, Some(p.to_path_buf())));
        }

        // 2. Check beside the executable
        if let Ok(exe_path) = std::env::current_exe() {
            let beside_exe = exe_path.parent().map(|p| p.join("flightmerge.toml"));
            if let Some(p) = beside_exe {
                if p.exists() {
                    let content = std::fs::read_to_string(&p)?;
                    let config = Self::parse(&content, &p)?;
                    return Ok((config, Some(p)));
                }
            }
        }

        // 3. Check platform config directory (e.g. ~/.config/flightmerge/config.toml)
        if let Some(config_dir) = dirs::config_dir() {
            let platform_config = config_dir.join("flightmerge").join("config.toml");
            if platform_config.exists() {
                let content = std::fs::read_to_string(&platform_config)?;
                let config = Self::parse(&content, &platform_config)?;
                return Ok((config, Some(platform_config)));
            }
        }

        // 4. Fall back to defaults
        tracing::info!("No config file found, using defaults");
        Ok((Config::default(), None))
    }

    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with_path(path).map(|(config, _)| config)
    }

    fn parse(content: &str, origin: &Path) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Invalid config file {}: {}", origin.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make grouping or the integrity gate meaningless.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.segmentation.gap_tolerance_secs < 0 {
            anyhow::bail!(
                "segmentation.gap_tolerance_secs must not be negative (got {})",
                self.segmentation.gap_tolerance_secs
            );
        }
        if !(0.0..1.0).contains(&self.integrity.max_size_delta) {
            anyhow::bail!(
                "integrity.max_size_delta must be in [0, 1) (got {})",
                self.integrity.max_size_delta
            );
        }
        if self.files.video_extensions.is_empty() {
            anyhow::bail!("files.video_extensions must not be empty");
        }
        let overlap = self
            .files
            .video_extensions
            .iter()
            .find(|v| {
                self.files
                    .subtitle_extensions
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(v))
            });
        if let Some(ext) = overlap {
            anyhow::bail!("extension '{}' is listed as both video and subtitle", ext);
        }
        Ok(())
    }

    pub fn gap_tolerance(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.segmentation.gap_tolerance_secs)
    }

    /// Generate a default config file with all fields and inline documentation.
    pub fn generate_default_commented() -> String {
        let root = OutputConfig::default().root;
        let root_str = root.to_string_lossy().replace('\\', "\\\\");

        format!(
r#"# flightmerge configuration

[output]
# Base destination directory. Each batch is written to
# "<root>/<YYYY MM DD> <label>", dated by the earliest recording.
root = "{root}"

[concatenator]
# External tool that losslessly joins MP4 files. It is run as
# <path> <inputs...> <output_flag> <output>.
path = "mp4_merge"
# Flag placed before the output path. Set to "" to pass the output last.
output_flag = "--out"

[probe]
# ffprobe binary used to read recording durations.
ffprobe_path = "ffprobe"

[files]
# Byte offset of the 14-digit YYYYMMDDHHMMSS timestamp in file names
# (4 for DJI_YYYYMMDDHHMMSS_XXXX_D.MP4).
timestamp_offset = 4
# Extensions treated as video recordings (case-insensitive).
video_extensions = ["mp4", "mov"]
# Extensions of companion subtitle/telemetry files (case-insensitive).
subtitle_extensions = ["srt"]

[segmentation]
# A gap longer than this many seconds between one recording's end and the
# next recording's start begins a new flight.
gap_tolerance_secs = 10

[subtitles]
# What moves the merged subtitle timeline forward after each recording:
# "subtitle" = the end of that file's last cue (recordings without subtitles
# do not advance it), "video" = the recording's video duration.
offset_anchor = "subtitle"

[integrity]
# Sources are deleted only if |inputs - output| / inputs is at most this
# value and the subtitle merge succeeded. 0.001 = 0.1%.
max_size_delta = 0.001
"#,
            root = root_str
        )
    }
}
