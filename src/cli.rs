use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "flightmerge",
    version,
    about = "Group drone recordings into flights and merge each flight's video and subtitles"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merge each flight and delete its sources once the merge is verified
    Merge {
        /// Destination label, appended to the date of the earliest recording
        #[arg(short, long)]
        label: String,

        /// Keep source files even when the merge is verified
        #[arg(long)]
        keep_sources: bool,

        /// Recordings to process (subtitle files are found automatically)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show the detected flights without merging or deleting anything
    Plan {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print a commented default config file
    InitConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_merge() {
        let cli = Cli::try_parse_from([
            "flightmerge",
            "merge",
            "--label",
            "Beach",
            "a.MP4",
            "b.MP4",
        ])
        .unwrap();
        match cli.command {
            Commands::Merge {
                label,
                keep_sources,
                files,
            } => {
                assert_eq!(label, "Beach");
                assert!(!keep_sources);
                assert_eq!(files.len(), 2);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_merge_requires_label_and_files() {
        assert!(Cli::try_parse_from(["flightmerge", "merge", "a.MP4"]).is_err());
        assert!(Cli::try_parse_from(["flightmerge", "merge", "--label", "x"]).is_err());
    }

    #[test]
    fn test_global_config_flag() {
        let cli =
            Cli::try_parse_from(["flightmerge", "plan", "a.MP4", "--config", "fm.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("fm.toml")));
    }
}
