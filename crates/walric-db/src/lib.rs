//! [`redb`]-backed storage for walric
//!
//! Implements [`walric_core::Repository`]. Every record table is keyed by a
//! sequential `u64` id, with separate unique indices for subreddit names and
//! post ids, and a `(date, id)` index of the history.

mod repository;
mod tables;
mod tx_ops;

use std::io;
use std::path::{Path, PathBuf};

use redb_bincode::{ReadTransaction, WriteTransaction};
use snafu::{Location, ResultExt as _, Snafu};
use tokio::task::JoinError;
use tracing::{debug, info, instrument};
use walric_core::CoreError;

pub use self::tables::*;

const LOG_TARGET: &str = "walric::db";

/// File name of the database inside the data directory
pub const DB_FILE_NAME: &str = "walric.redb";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DbError {
    Database {
        source: redb::DatabaseError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(transparent)]
    Table {
        source: redb::TableError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(transparent)]
    Storage {
        source: redb::StorageError,
        #[snafu(implicit)]
        location: Location,
    },
    Transaction {
        source: redb::TransactionError,
        #[snafu(implicit)]
        location: Location,
    },
    Commit {
        source: redb::CommitError,
        #[snafu(implicit)]
        location: Location,
    },
    DbVersionTooHigh {
        db_ver: u64,
        code_ver: u64,
        #[snafu(implicit)]
        location: Location,
    },
    Join {
        source: JoinError,
        #[snafu(implicit)]
        location: Location,
    },
    InvalidTimestamp {
        source: time::error::ComponentRange,
        #[snafu(implicit)]
        location: Location,
    },
    TimestampOutOfRange {
        #[snafu(implicit)]
        location: Location,
    },
}
pub type DbResult<T> = std::result::Result<T, DbError>;

impl From<DbError> for CoreError {
    fn from(err: DbError) -> Self {
        CoreError::Storage {
            source: Box::new(err),
        }
    }
}

/// Result of inserting a record that must be unique and may reference a
/// parent record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted { id: u64 },
    /// A record with the same unique key is already stored; nothing changed
    AlreadyPresent,
    /// The referenced parent record does not exist; nothing changed
    MissingParent,
}

#[derive(Debug)]
pub struct Database {
    inner: redb_bincode::Database,
}

impl Database {
    const DB_VER: u64 = 1;

    pub async fn mk_db_path(data_dir: &Path) -> std::result::Result<PathBuf, io::Error> {
        tokio::fs::create_dir_all(&data_dir).await?;
        Ok(data_dir.join(DB_FILE_NAME))
    }

    #[instrument(skip_all)]
    pub async fn open(path: impl Into<PathBuf>) -> DbResult<Database> {
        let path = path.into();
        debug!(target: LOG_TARGET, path = %path.display(), "Opening database");
        let inner = tokio::task::spawn_blocking(move || redb_bincode::Database::create(path))
            .await
            .context(JoinSnafu)?
            .context(DatabaseSnafu)?;

        Self::write_with_inner(&inner, |tx| {
            Self::init_tables_tx(tx)?;
            Self::handle_db_ver_tx(tx)?;
            Ok(())
        })
        .await?;

        Ok(Self { inner })
    }

    fn init_tables_tx(tx: &WriteTransaction) -> DbResult<()> {
        tx.open_table(&db_version::TABLE)?;
        tx.open_table(&subreddits::TABLE)?;
        tx.open_table(&subreddits_by_name::TABLE)?;
        tx.open_table(&submissions::TABLE)?;
        tx.open_table(&submissions_by_post_id::TABLE)?;
        tx.open_table(&history::TABLE)?;
        tx.open_table(&history_by_date::TABLE)?;
        Ok(())
    }

    fn handle_db_ver_tx(tx: &WriteTransaction) -> DbResult<()> {
        let mut table_db_ver = tx.open_table(&db_version::TABLE)?;

        let Some(cur_db_ver) = table_db_ver.first()?.map(|g| g.1.value()) else {
            info!(target: LOG_TARGET, "Initializing new database");
            table_db_ver.insert(&(), &Self::DB_VER)?;
            return Ok(());
        };

        if Self::DB_VER < cur_db_ver {
            return DbVersionTooHighSnafu {
                db_ver: cur_db_ver,
                code_ver: Self::DB_VER,
            }
            .fail();
        }

        debug!(target: LOG_TARGET, db_ver = cur_db_ver, "Database version");
        Ok(())
    }

    async fn write_with_inner<T>(
        inner: &redb_bincode::Database,
        f: impl FnOnce(&'_ WriteTransaction) -> DbResult<T>,
    ) -> DbResult<T> {
        tokio::task::block_in_place(|| {
            let dbtx = inner.begin_write().context(TransactionSnafu)?;
            let res = f(&dbtx)?;

            dbtx.commit().context(CommitSnafu)?;

            Ok(res)
        })
    }

    pub async fn write_with<T>(
        &self,
        f: impl FnOnce(&'_ WriteTransaction) -> DbResult<T>,
    ) -> DbResult<T> {
        Self::write_with_inner(&self.inner, f).await
    }

    pub async fn read_with<T>(
        &self,
        f: impl FnOnce(&'_ ReadTransaction) -> DbResult<T>,
    ) -> DbResult<T> {
        tokio::task::block_in_place(|| {
            let dbtx = self.inner.begin_read().context(TransactionSnafu)?;

            f(&dbtx)
        })
    }
}
