use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Result;

use crate::concat::ExternalConcatenator;
use crate::config::Config;
use crate::flight::Flight;
use crate::pipeline::{run_batch, BatchOptions, BatchReport, FlightOutcome};
use crate::probe::Ffprobe;

/// Print the flights that `merge` would produce.
pub fn show_plan(config: &Config, files: &[PathBuf]) -> Result<()> {
    println!("Detecting flights... please wait.");
    let probe = Ffprobe::new(&config.probe.ffprobe_path);
    let flights = crate::pipeline::plan_flights(files, config, &probe)?;
    print!("{}", format_plan(&flights));
    Ok(())
}

/// Merge every flight and print a summary. Fails if any flight was not merged.
pub fn run_merge(config: &Config, files: &[PathBuf], options: &BatchOptions) -> Result<()> {
    let probe = Ffprobe::new(&config.probe.ffprobe_path);
    let concatenator = ExternalConcatenator::from_config(&config.concatenator);

    let report = run_batch(files, options, config, &probe, &concatenator)?;
    print!("{}", format_summary(&report));

    let failed = report.failed_flights();
    if failed > 0 {
        anyhow::bail!("{} of {} flight(s) were not merged", failed, report.flights.len());
    }
    Ok(())
}

pub fn format_plan(flights: &[Flight]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Flights detected: {}", flights.len());
    for (i, flight) in flights.iter().enumerate() {
        let _ = writeln!(
            out,
            "Flight {} ({} -> {}):",
            i + 1,
            flight.start_time().format("%Y-%m-%d %H:%M:%S"),
            flight.end_time().format("%H:%M:%S")
        );
        for recording in flight.recordings() {
            let _ = writeln!(
                out,
                "  {} ({}s)",
                recording.file_name(),
                recording.duration.num_seconds()
            );
        }
        out.push('\n');
    }
    out
}

pub fn format_summary(report: &BatchReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Output folder: {}", report.destination.display());
    for flight in &report.flights {
        match &flight.outcome {
            FlightOutcome::Merged {
                result,
                deleted,
                delete_failures,
            } => {
                let _ = writeln!(
                    out,
                    "Flight {}: merged -> {}",
                    flight.index,
                    result.output_video.display()
                );
                for path in deleted {
                    let _ = writeln!(out, "  Deleted: {}", path.display());
                }
                for path in delete_failures {
                    let _ = writeln!(out, "  Could not delete: {}", path.display());
                }
            }
            FlightOutcome::SourcesKept { result } => {
                let _ = writeln!(
                    out,
                    "Flight {}: merged -> {} (sources kept)",
                    flight.index,
                    result.output_video.display()
                );
            }
            FlightOutcome::MergeFailed { error } => {
                let _ = writeln!(out, "{}", error);
                for path in &flight.sources {
                    let _ = writeln!(out, "  Kept: {}", path.display());
                }
            }
            FlightOutcome::IntegrityGateFailed { error, .. } => {
                let _ = writeln!(out, "{}", error);
                for path in &flight.sources {
                    let _ = writeln!(out, "  Kept: {}", path.display());
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FlightError;
    use crate::flight::{group_flights, Recording};
    use crate::pipeline::{FlightReport, MergeResult};
    use chrono::{Duration, NaiveDate};

    fn recording(name: &str, h: u32, m: u32, s: u32, secs: i64) -> Recording {
        let start = NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap();
        Recording::new(format!("/sd/{}", name), start, Duration::seconds(secs))
    }

    fn merge_result() -> MergeResult {
        MergeResult {
            output_video: PathBuf::from("/out/2024 06 15 Beach 1.mp4"),
            output_subtitle: PathBuf::from("/out/2024 06 15 Beach 1.srt"),
            video_size_ok: true,
            subtitle_merge_ok: true,
            size_delta: Some(0.0),
            subtitles: None,
        }
    }

    #[test]
    fn test_format_plan_lists_flights_and_files() {
        let flights = group_flights(
            vec![
                recording("A.MP4", 10, 0, 0, 30),
                recording("B.MP4", 10, 0, 31, 20),
                recording("C.MP4", 10, 5, 0, 10),
            ],
            Duration::seconds(10),
        );
        let plan = format_plan(&flights);
        assert!(plan.contains("Flights detected: 2"));
        assert!(plan.contains("Flight 1 (2024-06-15 10:00:00 -> 10:00:51):"));
        assert!(plan.contains("  B.MP4 (20s)"));
        assert!(plan.contains("Flight 2 (2024-06-15 10:05:00 -> 10:05:10):"));
    }

    #[test]
    fn test_format_summary_names_files_and_flights() {
        let report = BatchReport {
            destination: PathBuf::from("/out"),
            flights: vec![
                FlightReport {
                    index: 1,
                    sources: vec![PathBuf::from("/sd/A.MP4")],
                    outcome: FlightOutcome::Merged {
                        result: merge_result(),
                        deleted: vec![PathBuf::from("/sd/A.MP4")],
                        delete_failures: vec![],
                    },
                },
                FlightReport {
                    index: 2,
                    sources: vec![PathBuf::from("/sd/B.MP4")],
                    outcome: FlightOutcome::IntegrityGateFailed {
                        result: merge_result(),
                        error: FlightError::IntegrityGateFailed {
                            flight: 2,
                            reasons: vec!["size mismatch 0.20% (threshold: 0.10%)".to_string()],
                        },
                    },
                },
            ],
        };
        let summary = format_summary(&report);
        assert!(summary.contains("Flight 1: merged -> /out/2024 06 15 Beach 1.mp4"));
        assert!(summary.contains("  Deleted: /sd/A.MP4"));
        assert!(summary.contains("Flight 2: sources kept, size mismatch 0.20%"));
        assert!(summary.contains("  Kept: /sd/B.MP4"));
    }

    #[test]
    fn test_show_plan_fails_on_malformed_name() {
        let tmp = tempfile::TempDir::new().unwrap();
        let bad = tmp.path().join("DJI_oops.MP4");
        std::fs::write(&bad, b"x").unwrap();
        assert!(show_plan(&Config::default(), &[bad]).is_err());
    }
}
