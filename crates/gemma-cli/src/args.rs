//! CLI argument definitions using clap
//!
//! - gemma count [filters]               # Matching transcript count
//! - gemma browse [filters] --pages N    # Matching transcripts, N pages deep
//! - gemma run "prompt" [filters]        # Streaming analysis (Ctrl+C stops)
//! - gemma quick "prompt" [filters]      # Synchronous quick summary
//! - gemma artifacts list|show           # Archive
//! - gemma chat <artifact> "message"     # Ask about an artifact
//! - gemma config show|init              # Configuration files

use clap::{Args, Parser, Subcommand, ValueEnum};
use gemma_core::config::DEFAULT_CONFIG_FILE;
use gemma_core::filter::{Emotion, FilterControls, MatchMode, SortBy, SortOrder};

#[derive(Parser)]
#[command(name = "gemma")]
#[command(about = "Gemma transcript analyzer - filter transcripts and stream analysis runs")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (JSON, TOML or YAML)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: String,

    /// Enable verbose output (event log and debug logging)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Count transcripts matching the filters
    Count {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// List one page of matching transcripts
    Browse {
        #[command(flatten)]
        filters: FilterArgs,

        /// Pages to list, following the server's has-more flag
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },

    /// Run a streaming analysis; Ctrl+C stops it
    Run {
        /// What to ask about the matching statements
        prompt: String,

        /// Most statements to analyze (1-200)
        #[arg(long, short = 'n')]
        max_statements: Option<u32>,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Synchronous quick summary over the same filters and prompt
    Quick {
        prompt: String,

        #[arg(long, short = 'n')]
        max_statements: Option<u32>,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Browse the artifact archive
    Artifacts {
        #[command(subcommand)]
        action: ArtifactsAction,
    },

    /// Ask a question about an archived artifact
    Chat {
        /// Artifact id
        artifact: String,

        /// Message to send
        message: String,
    },

    /// Manage configuration files
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Clone)]
pub enum ArtifactsAction {
    /// List archived artifacts, newest first
    List {
        /// Keep loading pages until the archive is exhausted
        #[arg(long)]
        all: bool,
    },

    /// Print one artifact
    Show {
        /// Artifact id
        id: String,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigAction {
    /// Show the resolved configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MatchArg {
    Any,
    All,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortArg {
    CreatedAt,
    Speaker,
    Emotion,
    JobId,
    StartTime,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OrderArg {
    Asc,
    Desc,
}

/// Filter flags shared by every query command
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Earliest date (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// Latest date (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,

    /// Speaker to include (repeatable)
    #[arg(long = "speaker")]
    pub speakers: Vec<String>,

    /// Emotion to include (repeatable); none means all
    #[arg(long = "emotion")]
    pub emotions: Vec<String>,

    /// Keyword to look for (repeatable)
    #[arg(long = "keyword")]
    pub keywords: Vec<String>,

    /// How keywords combine
    #[arg(long = "match", value_enum)]
    pub match_mode: Option<MatchArg>,

    /// Context lines before each statement (0-10)
    #[arg(long)]
    pub context: Option<String>,

    /// Page size (1-200)
    #[arg(long)]
    pub page_size: Option<String>,

    #[arg(long, value_enum)]
    pub sort_by: Option<SortArg>,

    #[arg(long, value_enum)]
    pub order: Option<OrderArg>,
}

impl FilterArgs {
    /// Write the flags into the console's raw controls
    ///
    /// Numbers are passed through as typed; the controls clamp them.
    pub fn apply(&self, controls: &mut FilterControls) -> Result<(), String> {
        if self.from.is_some() || self.to.is_some() {
            controls.set_date_window(
                self.from.clone().unwrap_or_default(),
                self.to.clone().unwrap_or_default(),
            );
        }
        if !self.speakers.is_empty() {
            controls.speakers = self.speakers.join(",");
        }
        for raw in &self.emotions {
            controls.emotions.insert(raw.parse::<Emotion>()?);
        }
        if !self.keywords.is_empty() {
            controls.keywords = self.keywords.join(",");
        }
        if let Some(mode) = self.match_mode {
            controls.match_mode = match mode {
                MatchArg::Any => MatchMode::Any,
                MatchArg::All => MatchMode::All,
            };
        }
        if let Some(context) = &self.context {
            controls.context_lines = context.clone();
        }
        if let Some(page_size) = &self.page_size {
            controls.page_size = page_size.clone();
        }
        if let Some(sort) = self.sort_by {
            controls.sort_by = match sort {
                SortArg::CreatedAt => SortBy::CreatedAt,
                SortArg::Speaker => SortBy::Speaker,
                SortArg::Emotion => SortBy::Emotion,
                SortArg::JobId => SortBy::JobId,
                SortArg::StartTime => SortBy::StartTime,
            };
        }
        if let Some(order) = self.order {
            controls.order = match order {
                OrderArg::Asc => SortOrder::Asc,
                OrderArg::Desc => SortOrder::Desc,
            };
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_flags_reach_the_controls() {
        let cli = Cli::parse_from([
            "gemma",
            "count",
            "--speaker",
            "customer",
            "--speaker",
            "agent",
            "--emotion",
            "anger",
            "--keyword",
            "refund",
            "--match",
            "all",
            "--page-size",
            "9999",
            "--order",
            "asc",
        ]);
        let Commands::Count { filters } = cli.command else {
            panic!("expected count");
        };

        let mut controls = FilterControls::default();
        filters.apply(&mut controls).unwrap();
        let spec = controls.gather_filters();
        assert_eq!(spec.speakers.len(), 2);
        assert!(spec.emotions.contains(&Emotion::Anger));
        assert_eq!(spec.match_mode, MatchMode::All);
        assert_eq!(spec.page_size, 200);
        assert_eq!(spec.order, SortOrder::Asc);
    }

    #[test]
    fn test_unknown_emotion_is_rejected() {
        let filters = FilterArgs {
            emotions: vec!["boredom".to_string()],
            ..FilterArgs::default()
        };
        assert!(filters.apply(&mut FilterControls::default()).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["gemma", "artifacts", "list", "--verbose"]);
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Artifacts {
                action: ArtifactsAction::List { all: false }
            }
        ));
    }
}
