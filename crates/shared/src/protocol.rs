use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{EventId, ProfileId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub profile_id: ProfileId,
    pub name: String,
}

/// Event entry collected on the submission form but not yet committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub points: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventView {
    pub event_id: EventId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub points: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    pub comment: String,
    pub rating: i64,
    pub stars: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileView {
    pub profile_id: ProfileId,
    pub name: String,
    pub school: String,
    pub department: String,
    #[serde(skip)]
    pub picture: Option<Vec<u8>>,
    pub capabilities: Vec<String>,
    pub events: Vec<EventView>,
    pub average_rating: f64,
    pub average_stars: String,
    pub comments: Vec<CommentView>,
}
