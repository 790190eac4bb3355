//! SRT cue parsing for drone telemetry subtitles.
//!
//! DJI goggles write one cue per video frame (or per telemetry sample):
//!
//! ```text
//! 1
//! 00:00:00,000 --> 00:00:00,033
//! <font size="28">FrameCnt: 1, DiffTime: 33ms
//! 2024-06-15 14:30:12.123
//! [iso: 100] [shutter: 1/60.0] [fnum: 2.8]</font>
//! ```
//!
//! Blocks are separated by blank lines. The body is kept verbatim apart from
//! the `FrameCnt:` counter, which the merger rewrites.

use std::fmt::Write as _;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::error::SubtitleError;
use crate::subtitle::timestamp::{format_timestamp, parse_timestamp};

static FRAME_COUNTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"FrameCnt:(\s*)(\d+)").expect("valid frame counter pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleCue {
    pub index: u64,
    pub start: Duration,
    pub end: Duration,
    pub lines: Vec<String>,
}

impl SubtitleCue {
    /// The last `FrameCnt:` value in the cue body, if any.
    pub fn frame_count(&self) -> Option<u64> {
        self.lines
            .iter()
            .flat_map(|line| FRAME_COUNTER.captures_iter(line))
            .filter_map(|caps| caps[2].parse().ok())
            .last()
    }

    /// Copy of this cue moved along the merged timeline.
    pub fn shifted(
        &self,
        index: u64,
        time_offset: Duration,
        frame_offset: u64,
    ) -> Result<Self, SubtitleError> {
        let lines = if frame_offset == 0 {
            self.lines.clone()
        } else {
            self.lines
                .iter()
                .map(|line| shift_frame_counters(line, frame_offset))
                .collect::<Result<Vec<_>, _>>()?
        };
        Ok(Self {
            index,
            start: self.start + time_offset,
            end: self.end + time_offset,
            lines,
        })
    }

    /// Render as an SRT block without the trailing blank separator line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.index);
        let _ = writeln!(
            out,
            "{} --> {}",
            format_timestamp(self.start),
            format_timestamp(self.end)
        );
        for line in &self.lines {
            let _ = writeln!(out, "{}", line);
        }
        out
    }
}

fn shift_frame_counters(line: &str, frame_offset: u64) -> Result<String, SubtitleError> {
    let mut overflowed: Option<String> = None;
    let shifted = FRAME_COUNTER.replace_all(line, |caps: &regex::Captures| {
        match caps[2]
            .parse::<u64>()
            .ok()
            .and_then(|value| value.checked_add(frame_offset))
        {
            Some(value) => format!("FrameCnt:{}{}", &caps[1], value),
            None => {
                overflowed.get_or_insert_with(|| caps[2].to_string());
                caps[0].to_string()
            }
        }
    });

    match overflowed {
        Some(value) => Err(SubtitleError::FrameCounterOverflow {
            value,
            offset: frame_offset,
        }),
        None => Ok(shifted.into_owned()),
    }
}

/// Parse SRT content into cues.
///
/// Malformed blocks (a missing `-->` separator, a bad timestamp, a
/// non-numeric index) fail the whole file. A file with no blocks at all
/// parses to an empty list.
pub fn parse_cues(content: &str) -> Result<Vec<SubtitleCue>, SubtitleError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut cues = Vec::new();
    let mut block: Vec<(usize, &str)> = Vec::new();

    for (line_idx, line) in content.lines().enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            if !block.is_empty() {
                cues.push(parse_block(&block)?);
                block.clear();
            }
            continue;
        }
        block.push((line_idx + 1, line));
    }
    if !block.is_empty() {
        cues.push(parse_block(&block)?);
    }

    Ok(cues)
}

fn parse_block(block: &[(usize, &str)]) -> Result<SubtitleCue, SubtitleError> {
    let (index_line_no, index_line) = block[0];
    let index: u64 = index_line
        .trim()
        .parse()
        .map_err(|_| SubtitleError::InvalidIndex {
            line: index_line_no,
            value: index_line.to_string(),
        })?;

    let &(timing_line_no, timing_line) = block.get(1).ok_or(SubtitleError::MissingTiming {
        line: index_line_no,
    })?;
    let (start, end) =
        timing_line
            .split_once("-->")
            .ok_or_else(|| SubtitleError::MissingSeparator {
                line: timing_line_no,
                value: timing_line.to_string(),
            })?;

    Ok(SubtitleCue {
        index,
        start: parse_timestamp(start.trim())?,
        end: parse_timestamp(end.trim())?,
        lines: block[2..].iter().map(|(_, l)| l.to_string()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\n\
00:00:00,000 --> 00:00:00,033\n\
<font size=\"28\">FrameCnt: 1, DiffTime: 33ms\n\
2024-06-15 14:30:12.123\n\
\n\
2\n\
00:00:00,033 --> 00:00:00,066\n\
<font size=\"28\">FrameCnt: 2, DiffTime: 33ms\n\
2024-06-15 14:30:12.156\n";

    #[test]
    fn test_parse_cues() {
        let cues = parse_cues(SAMPLE).unwrap();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].index, 1);
        assert_eq!(cues[1].start, Duration::from_millis(33));
        assert_eq!(cues[1].end, Duration::from_millis(66));
        assert_eq!(cues[1].lines.len(), 2);
        assert_eq!(cues[1].frame_count(), Some(2));
    }

    #[test]
    fn test_parse_crlf_and_bom() {
        let content = format!("\u{feff}{}", SAMPLE.replace('\n', "\r\n"));
        let cues = parse_cues(&content).unwrap();
        assert_eq!(cues.len(), 2);
        assert!(!cues[0].lines[0].ends_with('\r'));
    }

    #[test]
    fn test_parse_tolerates_extra_blank_lines() {
        let content = format!("\n\n{}\n\n\n", SAMPLE.replace("\n\n", "\n\n\n"));
        assert_eq!(parse_cues(&content).unwrap().len(), 2);
    }

    #[test]
    fn test_empty_file_has_no_cues() {
        assert!(parse_cues("").unwrap().is_empty());
        assert!(parse_cues("\n \n").unwrap().is_empty());
    }

    #[test]
    fn test_missing_separator_is_error() {
        let err = parse_cues("1\n00:00:00,000 00:00:01,000\ntext\n").unwrap_err();
        assert!(matches!(err, SubtitleError::MissingSeparator { line: 2, .. }));
    }

    #[test]
    fn test_bad_timestamp_is_error() {
        let err = parse_cues("1\n00:00:00.000 --> 00:00:01,000\n").unwrap_err();
        assert!(matches!(err, SubtitleError::InvalidTimestamp { .. }));
    }

    #[test]
    fn test_bad_index_is_error() {
        let err = parse_cues("one\n00:00:00,000 --> 00:00:01,000\n").unwrap_err();
        assert!(matches!(err, SubtitleError::InvalidIndex { line: 1, .. }));
    }

    #[test]
    fn test_index_without_timing_is_error() {
        let err = parse_cues("1\n").unwrap_err();
        assert_eq!(err, SubtitleError::MissingTiming { line: 1 });
    }

    #[test]
    fn test_cue_without_body() {
        let cues = parse_cues("7\n00:00:01,000 --> 00:00:02,000\n").unwrap();
        assert_eq!(cues[0].index, 7);
        assert!(cues[0].lines.is_empty());
        assert_eq!(cues[0].frame_count(), None);
    }

    #[test]
    fn test_shifted_rewrites_time_index_and_counter() {
        let cue = SubtitleCue {
            index: 1,
            start: Duration::from_secs(2),
            end: Duration::from_millis(2033),
            lines: vec!["FrameCnt: 3, DiffTime: 33ms".to_string(), "GPS (0, 0)".to_string()],
        };
        let moved = cue.shifted(46, Duration::from_secs(90), 45).unwrap();
        assert_eq!(moved.index, 46);
        assert_eq!(moved.start, Duration::from_secs(92));
        assert_eq!(moved.lines[0], "FrameCnt: 48, DiffTime: 33ms");
        assert_eq!(moved.lines[1], "GPS (0, 0)");
    }

    #[test]
    fn test_shifted_counter_overflow_is_error() {
        let cue = SubtitleCue {
            index: 1,
            start: Duration::ZERO,
            end: Duration::from_millis(33),
            lines: vec![format!("FrameCnt: {}, DiffTime: 33ms", u64::MAX - 1)],
        };
        let err = cue.shifted(1, Duration::ZERO, 2).unwrap_err();
        assert_eq!(
            err,
            SubtitleError::FrameCounterOverflow {
                value: (u64::MAX - 1).to_string(),
                offset: 2,
            }
        );
        assert!(cue.shifted(1, Duration::ZERO, 1).is_ok());
    }

    #[test]
    fn test_render() {
        let cue = SubtitleCue {
            index: 12,
            start: Duration::from_millis(92_000),
            end: Duration::from_millis(92_033),
            lines: vec!["FrameCnt: 48".to_string()],
        };
        assert_eq!(
            cue.render(),
            "12\n00:01:32,000 --> 00:01:32,033\nFrameCnt: 48\n"
        );
    }

    #[test]
    fn test_render_then_parse_keeps_cue() {
        let cues = parse_cues(SAMPLE).unwrap();
        let reparsed = parse_cues(&cues[1].render()).unwrap();
        assert_eq!(reparsed[0], cues[1]);
    }
}
