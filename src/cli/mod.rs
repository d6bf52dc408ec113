use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "appstore-harvest",
    about = "App Store metadata & review harvester with static HTML reports"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Args)]
pub struct ConfigArg {
    /// JSON config file; environment variables override it.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve apps from keywords/URLs, fetch details and reviews, and save them.
    Collect {
        #[command(flatten)]
        config: ConfigArg,
        #[arg(long)]
        keywords: Option<String>,
        #[arg(long)]
        urls: Option<String>,
        #[arg(long)]
        country: Option<String>,
        /// local | remote | both
        #[arg(long)]
        save: Option<String>,
        #[arg(long)]
        result_dir: Option<PathBuf>,
    },
    /// Render an analysis JSON document into a static HTML page.
    Report {
        #[command(flatten)]
        config: ConfigArg,
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        template: Option<PathBuf>,
    },
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    Doctor {
        #[command(flatten)]
        config: ConfigArg,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Show {
        #[command(flatten)]
        config: ConfigArg,
    },
    Get {
        key: String,
        #[command(flatten)]
        config: ConfigArg,
    },
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn parses_collect_overrides() {
        let cli = Cli::parse_from([
            "appstore-harvest",
            "collect",
            "--keywords",
            "bible,prayer",
            "--save",
            "both",
            "--config",
            "harvest.json",
        ]);

        match cli.command {
            Commands::Collect {
                config,
                keywords,
                save,
                ..
            } => {
                assert_eq!(keywords.as_deref(), Some("bible,prayer"));
                assert_eq!(save.as_deref(), Some("both"));
                assert_eq!(config.config.as_deref(), Some(std::path::Path::new("harvest.json")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
