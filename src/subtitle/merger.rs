// Subtitle timeline merger: concatenates the per-recording subtitle files of
// one flight into a single stream whose cue numbers, timestamps and frame
// counters keep counting across file boundaries.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FlightError, SubtitleError};
use crate::flight::Flight;
use crate::storage::find_companion;
use crate::subtitle::parser::{parse_cues, SubtitleCue};

/// What the cumulative time offset advances by after each recording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetAnchor {
    /// The raw end of the file's last cue. Recordings without subtitles do
    /// not move the timeline.
    #[default]
    Subtitle,
    /// The recording's probed video duration, whether or not it has subtitles.
    Video,
}

impl fmt::Display for OffsetAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subtitle => write!(f, "subtitle"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// Outcome of merging one flight's subtitles.
#[derive(Debug, Default)]
pub struct SubtitleMergeReport {
    /// Subtitle files whose cues made it into the output.
    pub files_merged: Vec<PathBuf>,
    /// Recordings that had no companion subtitle file.
    pub recordings_without_subtitles: Vec<PathBuf>,
    /// Recoverable problems (files with no timestamped cue).
    pub warnings: Vec<FlightError>,
    /// Unrecoverable parse failures, by file.
    pub failures: Vec<(PathBuf, SubtitleError)>,
    pub cues_written: u64,
    pub time_offset: Duration,
    pub frame_offset: u64,
}

impl SubtitleMergeReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Running state of one flight's merged subtitle stream.
#[derive(Debug)]
pub struct SubtitleMerger {
    anchor: OffsetAnchor,
    output: String,
    report: SubtitleMergeReport,
}

impl SubtitleMerger {
    pub fn new(anchor: OffsetAnchor) -> Self {
        Self {
            anchor,
            output: String::new(),
            report: SubtitleMergeReport::default(),
        }
    }

    pub fn time_offset(&self) -> Duration {
        self.report.time_offset
    }

    pub fn frame_offset(&self) -> u64 {
        self.report.frame_offset
    }

    /// Account for a recording that has no subtitle file.
    pub fn push_missing(&mut self, recording: &Path, video_duration: Duration) {
        tracing::debug!("No subtitles for {}", recording.display());
        self.report
            .recordings_without_subtitles
            .push(recording.to_path_buf());
        if self.anchor == OffsetAnchor::Video {
            self.report.time_offset += video_duration;
        }
    }

    /// Append one subtitle file's cues, shifted onto the merged timeline.
    pub fn push_file(&mut self, path: &Path, content: &str, video_duration: Duration) {
        let cues = match parse_cues(content) {
            Ok(cues) => cues,
            Err(e) => {
                self.fail(path, e, video_duration);
                return;
            }
        };

        let time_offset = self.report.time_offset;
        let frame_offset = self.report.frame_offset;
        let index_base = self.report.cues_written;

        let next_frame_offset = match cues.iter().rev().find_map(SubtitleCue::frame_count) {
            Some(last_frame) => match frame_offset.checked_add(last_frame) {
                Some(next) => next,
                None => {
                    let e = SubtitleError::FrameCounterOverflow {
                        value: last_frame.to_string(),
                        offset: frame_offset,
                    };
                    self.fail(path, e, video_duration);
                    return;
                }
            },
            None => {
                if !cues.is_empty() {
                    tracing::debug!("No FrameCnt in {}, frame offset unchanged", path.display());
                }
                frame_offset
            }
        };

        // Shift the whole file first so a failure leaves no partial output.
        let shifted = cues
            .iter()
            .enumerate()
            .map(|(position, cue)| {
                cue.shifted(index_base + position as u64 + 1, time_offset, frame_offset)
            })
            .collect::<Result<Vec<_>, _>>();
        let shifted = match shifted {
            Ok(shifted) => shifted,
            Err(e) => {
                self.fail(path, e, video_duration);
                return;
            }
        };

        for cue in &shifted {
            if !self.output.is_empty() {
                self.output.push('\n');
            }
            self.output.push_str(&cue.render());
        }
        self.report.cues_written += cues.len() as u64;
        self.report.files_merged.push(path.to_path_buf());
        self.report.frame_offset = next_frame_offset;

        match cues.last() {
            Some(last) => {
                let advance = match self.anchor {
                    OffsetAnchor::Subtitle => last.end,
                    OffsetAnchor::Video => video_duration,
                };
                self.report.time_offset += advance;
            }
            None => {
                let warning = FlightError::SubtitleParseWarning {
                    path: path.to_path_buf(),
                    reason: "no timestamped cues, offsets not advanced".to_string(),
                };
                tracing::warn!("{}", warning);
                self.report.warnings.push(warning);
                if self.anchor == OffsetAnchor::Video {
                    self.report.time_offset += video_duration;
                }
            }
        }
    }

    /// Record a subtitle file that could not be read at all.
    pub fn push_unreadable(&mut self, path: &Path, reason: String, video_duration: Duration) {
        self.fail(path, SubtitleError::Unreadable { reason }, video_duration);
    }

    fn fail(&mut self, path: &Path, error: SubtitleError, video_duration: Duration) {
        tracing::error!("Cannot merge subtitles {}: {}", path.display(), error);
        self.report.failures.push((path.to_path_buf(), error));
        // The video is still part of the merged file.
        if self.anchor == OffsetAnchor::Video {
            self.report.time_offset += video_duration;
        }
    }

    pub fn finish(self) -> (String, SubtitleMergeReport) {
        (self.output, self.report)
    }
}

/// Merge the subtitles of every recording in `flight` and write the result
/// to `output`.
///
/// The output file is written even when no recording had subtitles. Only a
/// failure to write it is returned as an error; parse problems are reported
/// in the [`SubtitleMergeReport`].
pub fn merge_flight_subtitles(
    flight: &Flight,
    extensions: &[String],
    anchor: OffsetAnchor,
    output: &Path,
) -> std::io::Result<SubtitleMergeReport> {
    let mut merger = SubtitleMerger::new(anchor);

    for recording in flight.recordings() {
        let video_duration = recording.duration.to_std().unwrap_or_default();
        let Some(companion) = find_companion(&recording.path, extensions) else {
            merger.push_missing(&recording.path, video_duration);
            continue;
        };

        // Invalid UTF-8 is unreadable; a lossy decode would not match the source.
        match std::fs::read_to_string(&companion) {
            Ok(content) => merger.push_file(&companion, &content, video_duration),
            Err(e) => merger.push_unreadable(&companion, e.to_string(), video_duration),
        }
    }

    let (content, report) = merger.finish();
    std::fs::write(output, content)?;
    tracing::info!(
        "Wrote {} ({} cues from {} file(s))",
        output.display(),
        report.cues_written,
        report.files_merged.len()
    );
    Ok(report)
}
