use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use clap::{Args, Parser, Subcommand};
use walric_core::Resolution;
use walric_gather::source::TimeWindow;

use crate::config::Config;

/// Curate a local collection of wallpapers gathered from Reddit
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Opts {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub cmd: OptsCmd,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration file [default: <config dir>/walric.toml]
    #[arg(long, short, env = "WALRIC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Where the database and the images are kept
    #[arg(long, env = "WALRIC_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, env = "WALRIC_DEBUG", global = true)]
    pub debug: bool,
}

pub static PROJECT_DIRS: LazyLock<directories::ProjectDirs> = LazyLock::new(|| {
    directories::ProjectDirs::from("org", "walric", "walric")
        .expect("Unable to determine project's dir")
});

impl GlobalOpts {
    /// Command line wins over the configuration file
    pub fn data_dir<'a>(&'a self, config: &'a Config) -> &'a Path {
        self.data_dir
            .as_deref()
            .or(config.walric.data_dir.as_deref())
            .unwrap_or_else(|| PROJECT_DIRS.data_local_dir())
    }
}

#[derive(Debug, Subcommand)]
pub enum OptsCmd {
    /// Download new images from the top posts of the configured subreddits
    Gather {
        /// Time window of the top posts [default: from config]
        #[arg(long, short)]
        window: Option<TimeWindow>,

        /// Number of top posts to consider per subreddit [default: from config]
        #[arg(long, short)]
        limit: Option<u32>,

        /// Subreddits to gather from [default: from config]
        subreddits: Vec<String>,
    },
    /// Select a random submission not shown before, and record it
    Random(ResolutionArgs),
    /// List submissions large enough for the given resolution
    ListCandidates(ResolutionArgs),
    /// Show the last selected submission
    Current,
    /// Show all selected submissions, oldest first
    History,
    /// Show a submission
    Info {
        /// Reddit post id
        post_id: String,
    },
    /// Search submissions by title
    Search { text: String },
    /// Show the number of submissions per subreddit
    Stats,
}

#[derive(Debug, Args)]
pub struct ResolutionArgs {
    /// Minimum image width in pixels
    #[arg(long, env = "WALRIC_MIN_WIDTH")]
    pub min_width: u32,

    /// Minimum image height in pixels
    #[arg(long, env = "WALRIC_MIN_HEIGHT")]
    pub min_height: u32,
}

impl From<&ResolutionArgs> for Resolution {
    fn from(args: &ResolutionArgs) -> Self {
        Resolution::new(args.min_width, args.min_height)
    }
}
