use std::time::Duration;

use crate::error::SubtitleError;

/// Parse an SRT timestamp of the form `HH:MM:SS,mmm`. Hours take two or
/// more digits so long merged timelines still parse.
pub fn parse_timestamp(value: &str) -> Result<Duration, SubtitleError> {
    let invalid = || SubtitleError::InvalidTimestamp {
        value: value.to_string(),
    };

    // Everything after the hours has a fixed width: `:MM:SS,mmm`.
    let bytes = value.as_bytes();
    if bytes.len() < 12 {
        return Err(invalid());
    }
    let h = bytes.len() - 10;
    if bytes[h] != b':' || bytes[h + 3] != b':' || bytes[h + 6] != b',' {
        return Err(invalid());
    }

    let field = |range: std::ops::Range<usize>| -> Result<u64, SubtitleError> {
        let part = &bytes[range];
        if !part.iter().all(u8::is_ascii_digit) {
            return Err(invalid());
        }
        part.iter()
            .try_fold(0u64, |acc, digit| {
                acc.checked_mul(10)?.checked_add(u64::from(digit - b'0'))
            })
            .ok_or_else(invalid)
    };

    let hours = field(0..h)?;
    let minutes = field(h + 1..h + 3)?;
    let seconds = field(h + 4..h + 6)?;
    let millis = field(h + 7..h + 10)?;
    if minutes >= 60 || seconds >= 60 {
        return Err(invalid());
    }

    hours
        .checked_mul(3600)
        .and_then(|secs| secs.checked_add(minutes * 60 + seconds))
        .and_then(|secs| secs.checked_mul(1000))
        .and_then(|ms| ms.checked_add(millis))
        .map(Duration::from_millis)
        .ok_or_else(invalid)
}

/// Format a duration as `HH:MM:SS,mmm`. Sub-millisecond precision is dropped.
pub fn format_timestamp(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    let millis = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let seconds = total_secs % 60;
    let minutes = (total_secs / 60) % 60;
    let hours = total_secs / 3600;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}
