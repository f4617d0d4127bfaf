mod cli;
mod config;
mod output;

use std::io::{self, Write as _};
use std::sync::Arc;

use clap::Parser;
use cli::{Opts, OptsCmd};
use config::{Config, ConfigError};
use snafu::{FromString, ResultExt, Snafu, Whatever};
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use walric_core::{CoreError, Resolution, Services};
use walric_db::{Database, DbError};
use walric_gather::source::RedditPostSource;
use walric_gather::transport::HttpTransport;
use walric_gather::{GatherError, GatherOptions, GatherReport, Gatherer};
use walric_util_error::FmtCompact as _;

use crate::output::Table;

pub const LOG_TARGET: &str = "walric::cli";

type WhateverResult<T> = std::result::Result<T, snafu::Whatever>;

#[derive(Debug, Snafu)]
pub enum CliError {
    #[snafu(display("Configuration error"))]
    Config { source: ConfigError },
    #[snafu(display("Data dir error"))]
    DataDir { source: io::Error },
    #[snafu(display("Database error"))]
    Database { source: DbError },
    #[snafu(display("HTTP client error"))]
    HttpClient { source: reqwest::Error },
    #[snafu(transparent)]
    Core { source: CoreError },
    #[snafu(transparent)]
    Gather { source: GatherError },
    #[snafu(display("No subreddits given nor configured"))]
    NoSubreddits,
    #[snafu(display("Failed to write output"))]
    Output { source: io::Error },
    #[snafu(display("Miscellaneous error"))]
    Whatever { source: Whatever },
}

pub type CliResult<T> = std::result::Result<T, CliError>;

#[snafu::report]
#[tokio::main]
async fn main() -> CliResult<()> {
    let opts = Opts::parse();
    init_logging(opts.global.debug).context(WhateverSnafu)?;

    let config = Config::load(opts.global.config.as_deref()).context(ConfigSnafu)?;

    let table = handle_cmd(opts, config).await?;
    print_table(&table)
}

fn print_table(table: &Table) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    table.write_to(&mut stdout).context(OutputSnafu)?;
    stdout.flush().context(OutputSnafu)?;
    Ok(())
}

async fn handle_cmd(opts: Opts, config: Config) -> CliResult<Table> {
    let data_dir = opts.global.data_dir(&config).to_owned();
    let db_path = Database::mk_db_path(&data_dir)
        .await
        .context(DataDirSnafu)?;
    let db = Database::open(db_path).await.context(DatabaseSnafu)?;
    let services = Services::new(Arc::new(db));

    Ok(match opts.cmd {
        OptsCmd::Gather {
            window,
            limit,
            subreddits,
        } => {
            let channels = if subreddits.is_empty() {
                config.walric.subreddits.clone()
            } else {
                subreddits
            };
            if channels.is_empty() {
                return NoSubredditsSnafu.fail();
            }

            let user_agent = &config.reddit.user_agent;
            let source = RedditPostSource::new(user_agent).context(HttpClientSnafu)?;
            let transport = HttpTransport::new(user_agent).context(HttpClientSnafu)?;
            let gatherer = Gatherer::new(
                Arc::new(source),
                Arc::new(transport),
                &services,
                GatherOptions {
                    data_dir,
                    window: window.unwrap_or(config.walric.time_filter),
                    limit: limit.unwrap_or(config.walric.submission_limit),
                    workers: config.walric.workers.max(1),
                },
            );

            let cancel = CancellationToken::new();
            let ctrl_c = tokio::spawn({
                let cancel = cancel.clone();
                async move {
                    match tokio::signal::ctrl_c().await {
                        Ok(()) => {
                            warn!(target: LOG_TARGET, "Interrupted, stopping");
                            cancel.cancel();
                        }
                        Err(err) => {
                            warn!(target: LOG_TARGET, err = %err.fmt_compact(), "Can't listen for Ctrl-C");
                        }
                    }
                }
            });

            let mut report = GatherReport::default();
            let res = gatherer.gather_into(&channels, &cancel, &mut report).await;
            ctrl_c.abort();
            if let Err(err) = res {
                // what was gathered before the failure is still worth showing
                if !report.channels.is_empty() {
                    print_table(&output::gather_summary(&report))?;
                }
                return Err(err.into());
            }

            info!(
                target: LOG_TARGET,
                registered = report.registered(),
                "Gathering complete"
            );
            output::gather_summary(&report)
        }
        OptsCmd::Random(args) => {
            let picked = services.submissions.random(Resolution::from(&args)).await?;
            services.history.save(&picked.submission).await?;
            output::submission_details(&picked)
        }
        OptsCmd::ListCandidates(args) => {
            let candidates = services
                .submissions
                .by_min_resolution(Resolution::from(&args))
                .await?;
            output::submission_list(&candidates)
        }
        OptsCmd::Current => {
            let current = services.history.current().await?;
            output::submission_details(&current.submission)
        }
        OptsCmd::History => output::history_list(&services.history.all().await?),
        OptsCmd::Info { post_id } => {
            output::submission_details(&services.submissions.by_post_id(&post_id).await?)
        }
        OptsCmd::Search { text } => {
            output::submission_list(&services.submissions.search(&text).await?)
        }
        OptsCmd::Stats => output::stats_list(&services.subreddits.stats().await?),
    })
}

pub fn init_logging(debug: bool) -> WhateverResult<()> {
    let default_level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .try_init()
        .map_err(|_| Whatever::without_source("Failed to initialize logging".to_string()))?;

    Ok(())
}
