use std::path::Path;

use chrono::NaiveDateTime;

use crate::error::FlightError;

/// Width of the `YYYYMMDDHHMMSS` timestamp embedded in recording names.
pub const TIMESTAMP_LEN: usize = 14;

/// Default offset of the timestamp inside the base name (`DJI_` prefix).
pub const DEFAULT_TIMESTAMP_OFFSET: usize = 4;

/// Extract the recording start time from a file name such as
/// `DJI_20240615143012_0001_D.MP4`.
///
/// The timestamp is read from a fixed byte range of the base name, so only
/// the layout matters, not the prefix text.
pub fn parse_start_time(path: &Path, offset: usize) -> Result<NaiveDateTime, FlightError> {
    let malformed = |reason: String| FlightError::MalformedFilename {
        path: path.to_path_buf(),
        reason,
    };

    let name = path
        .file_name()
        .ok_or_else(|| malformed("path has no file name".to_string()))?
        .to_str()
        .ok_or_else(|| malformed("file name is not valid UTF-8".to_string()))?;

    let raw = name
        .as_bytes()
        .get(offset..offset + TIMESTAMP_LEN)
        .ok_or_else(|| {
            malformed(format!(
                "expected a {}-digit timestamp at byte {}",
                TIMESTAMP_LEN, offset
            ))
        })?;

    if !raw.iter().all(u8::is_ascii_digit) {
        return Err(malformed(format!(
            "'{}' is not a YYYYMMDDHHMMSS timestamp",
            String::from_utf8_lossy(raw)
        )));
    }

    // All-ASCII digits, so this slice sits on char boundaries.
    let digits = &name[offset..offset + TIMESTAMP_LEN];
    NaiveDateTime::parse_from_str(digits, "%Y%m%d%H%M%S")
        .map_err(|e| malformed(format!("'{}' is out of range: {}", digits, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_parse_dji_name() {
        let path = Path::new("/media/sd/DJI_20240615143012_0001_D.MP4");
        let start = parse_start_time(path, DEFAULT_TIMESTAMP_OFFSET).unwrap();
        assert_eq!(start, at(2024, 6, 15, 14, 30, 12));
    }

    #[test]
    fn test_prefix_text_is_irrelevant() {
        let path = Path::new("ABC_20231231235959_X.mp4");
        let start = parse_start_time(path, 4).unwrap();
        assert_eq!(start, at(2023, 12, 31, 23, 59, 59));
    }

    #[test]
    fn test_custom_offset() {
        let path = Path::new("20240101000000.mp4");
        let start = parse_start_time(path, 0).unwrap();
        assert_eq!(start, at(2024, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_non_numeric_timestamp_is_malformed() {
        let path = Path::new("DJI_2024O615143012_0001_D.MP4");
        let err = parse_start_time(path, 4).unwrap_err();
        assert!(matches!(err, FlightError::MalformedFilename { .. }));
        assert!(err.to_string().contains("DJI_2024O615143012_0001_D.MP4"));
    }

    #[test]
    fn test_out_of_range_components_are_malformed() {
        // Month 13
        assert!(parse_start_time(Path::new("DJI_20241315143012_0001.MP4"), 4).is_err());
        // Hour 25
        assert!(parse_start_time(Path::new("DJI_20240615253012_0001.MP4"), 4).is_err());
        // February 30th
        assert!(parse_start_time(Path::new("DJI_20240230120000_0001.MP4"), 4).is_err());
    }

    #[test]
    fn test_short_name_is_malformed() {
        let err = parse_start_time(Path::new("DJI_2024.MP4"), 4).unwrap_err();
        assert!(matches!(err, FlightError::MalformedFilename { .. }));
    }

    #[test]
    fn test_sign_is_rejected() {
        assert!(parse_start_time(Path::new("DJI_+2024061514301_0001.MP4"), 4).is_err());
    }
}
