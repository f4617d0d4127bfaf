//! Services exposed to the callers: the ingestion pipeline, the selection
//! commands and the history tracker.

mod history;
mod submission;
mod subreddit;

use std::sync::Arc;

pub use self::history::HistoryService;
pub use self::submission::SubmissionService;
pub use self::subreddit::SubredditService;
use crate::{Repository, Validator};

/// All the services, sharing one validated storage handle
#[derive(Clone)]
pub struct Services {
    pub subreddits: SubredditService,
    pub submissions: SubmissionService,
    pub history: HistoryService,
}

impl Services {
    pub fn new(storage: Arc<dyn Repository>) -> Self {
        let validator = Arc::new(Validator::new(storage));
        let submissions = SubmissionService::new(validator.clone());
        Self {
            subreddits: SubredditService::new(validator.clone()),
            history: HistoryService::new(validator, submissions.clone()),
            submissions,
        }
    }
}
