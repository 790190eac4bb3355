// Batch orchestration: segment recordings into flights, then for each flight
// concatenate -> check size and merge subtitles -> delete sources only if
// both checks pass.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;

use crate::concat::Concatenator;
use crate::config::Config;
use crate::error::FlightError;
use crate::flight::{group_flights, load_recordings, Flight};
use crate::probe::DurationProvider;
use crate::storage::{self, find_companion, has_extension};
use crate::subtitle::merger::{merge_flight_subtitles, SubtitleMergeReport};

/// Options for one `merge` invocation.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Destination label appended to the dated folder name.
    pub label: String,
    /// Never delete sources, even when the integrity gate passes.
    pub keep_sources: bool,
}

/// Integrity facts gathered for one merged flight.
#[derive(Debug)]
pub struct MergeResult {
    pub output_video: PathBuf,
    pub output_subtitle: PathBuf,
    pub video_size_ok: bool,
    pub subtitle_merge_ok: bool,
    /// `None` when the sizes could not be compared.
    pub size_delta: Option<f64>,
    pub subtitles: Option<SubtitleMergeReport>,
}

impl MergeResult {
    pub fn gate_passed(&self) -> bool {
        self.video_size_ok && self.subtitle_merge_ok
    }
}

#[derive(Debug)]
pub enum FlightOutcome {
    /// Merged and verified; sources removed.
    Merged {
        result: MergeResult,
        deleted: Vec<PathBuf>,
        delete_failures: Vec<PathBuf>,
    },
    /// Merged and verified; sources kept on request.
    SourcesKept { result: MergeResult },
    MergeFailed { error: FlightError },
    IntegrityGateFailed {
        result: MergeResult,
        error: FlightError,
    },
}

#[derive(Debug)]
pub struct FlightReport {
    /// 1-based position of the flight in the batch.
    pub index: usize,
    pub sources: Vec<PathBuf>,
    pub outcome: FlightOutcome,
}

#[derive(Debug)]
pub struct BatchReport {
    pub destination: PathBuf,
    pub flights: Vec<FlightReport>,
}

impl BatchReport {
    /// Flights whose sources were kept because merging or verification failed.
    pub fn failed_flights(&self) -> usize {
        self.flights
            .iter()
            .filter(|f| {
                matches!(
                    f.outcome,
                    FlightOutcome::MergeFailed { .. } | FlightOutcome::IntegrityGateFailed { .. }
                )
            })
            .count()
    }

    pub fn all_merged(&self) -> bool {
        self.failed_flights() == 0
    }
}

/// Split the command-line inputs into recordings to group. Subtitle files are
/// dropped because they are picked up as companions of their video.
pub fn select_videos(inputs: &[PathBuf], config: &Config) -> Vec<PathBuf> {
    inputs
        .iter()
        .filter(|path| {
            if has_extension(path, &config.files.video_extensions) {
                true
            } else if has_extension(path, &config.files.subtitle_extensions) {
                tracing::debug!("Skipping subtitle input {}", path.display());
                false
            } else {
                tracing::warn!("Skipping unsupported file {}", path.display());
                false
            }
        })
        .cloned()
        .collect()
}

/// Detect flights without touching any file.
pub fn plan_flights(
    inputs: &[PathBuf],
    config: &Config,
    provider: &dyn DurationProvider,
) -> Result<Vec<Flight>> {
    let videos = select_videos(inputs, config);
    let recordings = load_recordings(&videos, config.files.timestamp_offset, provider)?;
    Ok(group_flights(recordings, config.gap_tolerance()))
}

/// The label becomes one path component under `output.root`, so it may not
/// be empty, contain a separator or step out with `..`.
pub fn validate_label(label: &str) -> Result<&str> {
    let label = label.trim();
    if label.is_empty() {
        anyhow::bail!("No destination label provided");
    }
    if label.contains(['/', '\\']) || label.contains("..") {
        anyhow::bail!(
            "Invalid label '{}': path separators and '..' are not allowed",
            label
        );
    }
    Ok(label)
}

/// `"<YYYY MM DD> <label>"`, dated by the earliest recording.
pub fn batch_base_name(earliest: NaiveDateTime, label: &str) -> String {
    format!("{} {}", earliest.format("%Y %m %d"), label)
}

/// Run a whole batch: plan flights, create the destination folder and
/// process every flight in order.
///
/// Errors returned here happen before any file is touched. Per-flight
/// failures are reported in the [`BatchReport`] instead.
pub fn run_batch(
    inputs: &[PathBuf],
    options: &BatchOptions,
    config: &Config,
    provider: &dyn DurationProvider,
    concatenator: &dyn Concatenator,
) -> Result<BatchReport> {
    let label = validate_label(&options.label)?;

    let flights = plan_flights(inputs, config, provider)?;
    let earliest = flights
        .iter()
        .map(Flight::start_time)
        .min()
        .ok_or_else(|| anyhow::anyhow!("No video recordings among the inputs"))?;

    let base_name = batch_base_name(earliest, label);
    let destination = config.output.root.join(&base_name);
    std::fs::create_dir_all(&destination)
        .with_context(|| format!("Failed to create {}", destination.display()))?;
    tracing::info!(
        "Processing {} flight(s) into {} (concatenator: {})",
        flights.len(),
        destination.display(),
        concatenator.name()
    );

    let mut reports = Vec::with_capacity(flights.len());
    for (i, flight) in flights.iter().enumerate() {
        let index = i + 1;
        let outcome = process_flight(
            index,
            flight,
            &destination,
            &base_name,
            options,
            config,
            concatenator,
        );
        log_outcome(index, &outcome);
        reports.push(FlightReport {
            index,
            sources: flight.paths(),
            outcome,
        });
    }

    Ok(BatchReport {
        destination,
        flights: reports,
    })
}

fn process_flight(
    index: usize,
    flight: &Flight,
    destination: &Path,
    base_name: &str,
    options: &BatchOptions,
    config: &Config,
    concatenator: &dyn Concatenator,
) -> FlightOutcome {
    let output_video = destination.join(format!("{} {}.mp4", base_name, index));
    let output_subtitle = destination.join(format!("{} {}.srt", base_name, index));
    let sources = flight.paths();

    let merge_failed = |reason: &str| FlightOutcome::MergeFailed {
        error: FlightError::MergeFailed {
            flight: index,
            output: output_video.clone(),
            reason: reason.to_string(),
        },
    };

    // A leftover file would satisfy the existence check without a merge.
    if output_video.exists() {
        return merge_failed("output already exists");
    }

    // 1. Concatenate (blocks until the tool exits)
    if !concatenator.concatenate(&sources, &output_video) {
        return merge_failed("concatenator produced no output file");
    }

    // 2. Subtitles
    let subtitles = match merge_flight_subtitles(
        flight,
        &config.files.subtitle_extensions,
        config.subtitles.offset_anchor,
        &output_subtitle,
    ) {
        Ok(report) => Some(report),
        Err(e) => {
            tracing::error!("Failed to write {}: {}", output_subtitle.display(), e);
            None
        }
    };
    let subtitle_merge_ok = subtitles.as_ref().is_some_and(SubtitleMergeReport::is_ok);

    // 3. Size check
    let size_delta = match (
        storage::total_size(&sources),
        std::fs::metadata(&output_video),
    ) {
        (Ok(input_bytes), Ok(output)) => storage::size_delta(input_bytes, output.len()),
        (Err(e), _) => {
            tracing::error!("Flight {}: {:#}", index, e);
            None
        }
        (_, Err(e)) => {
            tracing::error!("Flight {}: cannot stat {}: {}", index, output_video.display(), e);
            None
        }
    };
    let video_size_ok = size_delta.is_some_and(|d| d <= config.integrity.max_size_delta);

    let result = MergeResult {
        output_video,
        output_subtitle,
        video_size_ok,
        subtitle_merge_ok,
        size_delta,
        subtitles,
    };

    // 4. Deletion gate
    if !result.gate_passed() {
        let error = FlightError::IntegrityGateFailed {
            flight: index,
            reasons: gate_failure_reasons(&result, config.integrity.max_size_delta),
        };
        return FlightOutcome::IntegrityGateFailed { result, error };
    }

    if options.keep_sources {
        return FlightOutcome::SourcesKept { result };
    }

    let (deleted, delete_failures) = storage::delete_files(&deletion_targets(flight, config));
    FlightOutcome::Merged {
        result,
        deleted,
        delete_failures,
    }
}

/// Every source video of the flight plus its companion subtitle file.
fn deletion_targets(flight: &Flight, config: &Config) -> Vec<PathBuf> {
    let mut targets = Vec::new();
    for recording in flight.recordings() {
        targets.push(recording.path.clone());
        if let Some(companion) = find_companion(&recording.path, &config.files.subtitle_extensions)
        {
            targets.push(companion);
        }
    }
    targets
}

fn gate_failure_reasons(result: &MergeResult, max_size_delta: f64) -> Vec<String> {
    let mut reasons = Vec::new();
    if !result.video_size_ok {
        reasons.push(match result.size_delta {
            Some(delta) => format!(
                "size mismatch {:.2}% (threshold: {:.2}%)",
                delta * 100.0,
                max_size_delta * 100.0
            ),
            None => "file sizes could not be compared".to_string(),
        });
    }
    if !result.subtitle_merge_ok {
        match &result.subtitles {
            Some(report) => {
                for (path, e) in &report.failures {
                    reasons.push(format!("subtitle merge failed for {}: {}", path.display(), e));
                }
            }
            None => reasons.push(format!(
                "subtitle output {} could not be written",
                result.output_subtitle.display()
            )),
        }
    }
    reasons
}

fn log_outcome(index: usize, outcome: &FlightOutcome) {
    match outcome {
        FlightOutcome::Merged {
            result,
            deleted,
            delete_failures,
        } => {
            tracing::info!(
                "Flight {}: merged into {}, deleted {} source file(s)",
                index,
                result.output_video.display(),
                deleted.len()
            );
            for path in delete_failures {
                tracing::error!("Flight {}: could not delete {}", index, path.display());
            }
        }
        FlightOutcome::SourcesKept { result } => tracing::info!(
            "Flight {}: merged into {}, sources kept",
            index,
            result.output_video.display()
        ),
        FlightOutcome::MergeFailed { error } => tracing::error!("{}", error),
        FlightOutcome::IntegrityGateFailed { error, .. } => tracing::warn!("{}", error),
    }
}
