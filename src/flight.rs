// Flight segmentation: recordings whose start falls within the gap tolerance
// of the previous recording's end belong to the same flight.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{Duration, NaiveDateTime};

use crate::error::FlightError;
use crate::filename::parse_start_time;
use crate::probe::DurationProvider;

/// Default gap tolerance between two recordings of one flight.
pub const DEFAULT_GAP_TOLERANCE_SECS: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    pub path: PathBuf,
    pub start_time: NaiveDateTime,
    pub duration: Duration,
}

impl Recording {
    pub fn new(path: impl Into<PathBuf>, start_time: NaiveDateTime, duration: Duration) -> Self {
        Self {
            path: path.into(),
            start_time,
            duration,
        }
    }

    /// Saturates at `NaiveDateTime::MAX` for durations past the calendar.
    pub fn end_time(&self) -> NaiveDateTime {
        self.start_time
            .checked_add_signed(self.duration)
            .unwrap_or(NaiveDateTime::MAX)
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// A non-empty run of recordings, ordered by start time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flight {
    recordings: Vec<Recording>,
}

impl Flight {
    fn starting_with(first: Recording) -> Self {
        Self {
            recordings: vec![first],
        }
    }

    pub fn recordings(&self) -> &[Recording] {
        &self.recordings
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.recordings.iter().map(|r| r.path.clone()).collect()
    }

    pub fn start_time(&self) -> NaiveDateTime {
        self.recordings[0].start_time
    }

    pub fn end_time(&self) -> NaiveDateTime {
        self.recordings
            .iter()
            .map(Recording::end_time)
            .max()
            .unwrap_or_else(|| self.start_time())
    }

    pub fn len(&self) -> usize {
        self.recordings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty()
    }
}

/// Parse start times and probe durations for every path.
///
/// Any failure aborts the whole batch before grouping, since a recording that
/// cannot be placed in time cannot be safely assigned to a flight. Paths that
/// resolve to the same file are collapsed so each file is grouped once.
pub fn load_recordings(
    paths: &[PathBuf],
    timestamp_offset: usize,
    provider: &dyn DurationProvider,
) -> Result<Vec<Recording>, FlightError> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut recordings = Vec::with_capacity(paths.len());

    for path in paths {
        let key = std::fs::canonicalize(path).unwrap_or_else(|_| path.clone());
        if !seen.insert(key) {
            tracing::warn!("Ignoring duplicate input: {}", path.display());
            continue;
        }
        let start_time = parse_start_time(path, timestamp_offset)?;
        let duration = provider.duration(path)?;
        if duration < Duration::zero() || start_time.checked_add_signed(duration).is_none() {
            return Err(FlightError::DurationUnavailable {
                path: path.clone(),
                reason: format!("implausible duration of {}s", duration.num_seconds()),
            });
        }
        tracing::debug!(
            "{}: start {} duration {}s ({})",
            path.display(),
            start_time,
            duration.num_seconds(),
            provider.name()
        );
        recordings.push(Recording::new(path.clone(), start_time, duration));
    }

    Ok(recordings)
}

/// Partition recordings into flights.
///
/// Recordings are sorted by start time (file name breaks ties) and walked
/// once. A new flight starts whenever the gap between the previous
/// recording's end and the next one's start is strictly greater than
/// `tolerance`.
pub fn group_flights(mut recordings: Vec<Recording>, tolerance: Duration) -> Vec<Flight> {
    recordings.sort_by(|a, b| {
        a.start_time
            .cmp(&b.start_time)
            .then_with(|| a.path.file_name().cmp(&b.path.file_name()))
            .then_with(|| a.path.cmp(&b.path))
    });

    let mut flights = Vec::new();
    let mut current: Option<Flight> = None;
    let mut last_end: Option<NaiveDateTime> = None;

    for recording in recordings {
        let end = recording.end_time();
        let contiguous = last_end.is_some_and(|last| {
            last.checked_add_signed(tolerance)
                .map_or(true, |limit| recording.start_time <= limit)
        });

        match current.as_mut() {
            Some(flight) if contiguous => flight.recordings.push(recording),
            _ => flights.extend(current.replace(Flight::starting_with(recording))),
        }
        last_end = Some(end);
    }

    if let Some(done) = current {
        flights.push(done);
    }
    flights
}
