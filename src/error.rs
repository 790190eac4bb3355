use std::path::PathBuf;

/// Failures of the flight pipeline.
///
/// `MalformedFilename` and `DurationUnavailable` are fatal for the batch: a
/// recording that cannot be ordered cannot be grouped. The remaining variants
/// are scoped to one flight and never stop the others.
#[derive(Debug, thiserror::Error)]
pub enum FlightError {
    #[error("Malformed filename '{}': {reason}", .path.display())]
    MalformedFilename { path: PathBuf, reason: String },

    #[error("Duration unavailable for '{}': {reason}", .path.display())]
    DurationUnavailable { path: PathBuf, reason: String },

    #[error("Flight {flight}: merge failed, no usable output at '{}' ({reason})", .output.display())]
    MergeFailed {
        flight: usize,
        output: PathBuf,
        reason: String,
    },

    #[error("Subtitle warning for '{}': {reason}", .path.display())]
    SubtitleParseWarning { path: PathBuf, reason: String },

    #[error("Flight {flight}: sources kept, {}", .reasons.join("; "))]
    IntegrityGateFailed { flight: usize, reasons: Vec<String> },
}

/// Unrecoverable subtitle parse failures. Any of these marks the flight's
/// subtitle merge as failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubtitleError {
    #[error("Invalid timestamp '{value}' (expected HH:MM:SS,mmm)")]
    InvalidTimestamp { value: String },

    #[error("Missing '-->' separator at line {line}: '{value}'")]
    MissingSeparator { line: usize, value: String },

    #[error("Invalid cue index at line {line}: '{value}'")]
    InvalidIndex { line: usize, value: String },

    #[error("Cue at line {line} has no timing line")]
    MissingTiming { line: usize },

    #[error("Frame counter {value} overflows when shifted by {offset}")]
    FrameCounterOverflow { value: String, offset: u64 },

    #[error("Unreadable subtitle file: {reason}")]
    Unreadable { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_file_and_flight() {
        let err = FlightError::MalformedFilename {
            path: PathBuf::from("/drone/DJI_2024XX0101000000_0001_D.MP4"),
            reason: "not a timestamp".to_string(),
        };
        assert!(err.to_string().contains("DJI_2024XX0101000000_0001_D.MP4"));

        let err = FlightError::IntegrityGateFailed {
            flight: 3,
            reasons: vec!["size mismatch 0.20%".to_string(), "subtitles".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Flight 3"));
        assert!(msg.contains("size mismatch 0.20%; subtitles"));
    }
}
