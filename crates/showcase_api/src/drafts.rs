use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::NaiveDate;
use shared::{
    domain::SessionId,
    error::{ApiError, ValidationError},
    protocol::EventDraft,
    text::parse_points,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Sessions untouched for this long are dropped from the registry.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Event drafts collected by one submission form, in the order they were added.
#[derive(Debug, Default, Clone)]
pub struct DraftAccumulator {
    drafts: Vec<EventDraft>,
}

impl DraftAccumulator {
    pub fn drafts(&self) -> &[EventDraft] {
        &self.drafts
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub(crate) fn push(&mut self, draft: EventDraft) {
        self.drafts.push(draft);
    }

    pub(crate) fn clear(&mut self) {
        self.drafts.clear();
    }
}

/// Everything one submission form holds between requests.
#[derive(Debug, Default)]
pub struct SessionDrafts {
    pub accumulator: DraftAccumulator,
    pub picture: Option<Vec<u8>>,
}

impl SessionDrafts {
    fn is_blank(&self) -> bool {
        self.accumulator.is_empty() && self.picture.is_none()
    }
}

/// Raw values of the "add event" form.
#[derive(Debug, Clone, Default)]
pub struct EventDraftInput {
    pub name: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub points: String,
}

/// Appends a draft when it has a name and points. Missing dates become `today`;
/// the order of start and end is not checked.
pub fn add_event_draft(
    accumulator: &mut DraftAccumulator,
    input: EventDraftInput,
    today: NaiveDate,
) -> Result<EventDraft, ApiError> {
    if input.name.is_empty() || input.points.is_empty() {
        warn!("event draft rejected: name or points missing");
        return Err(ValidationError::IncompleteEvent.into());
    }

    let draft = EventDraft {
        name: input.name,
        start: input.start.unwrap_or(today),
        end: input.end.unwrap_or(today),
        points: parse_points(&input.points),
    };
    accumulator.push(draft.clone());
    debug!(drafts = accumulator.len(), "event draft added");
    Ok(draft)
}

/// Parses a `YYYY-MM-DD` form value. Blank means "not chosen".
pub fn parse_draft_date(raw: &str) -> Result<Option<NaiveDate>, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ValidationError::MalformedDate.into())
}

struct SessionSlot {
    drafts: Arc<Mutex<SessionDrafts>>,
    touched: Instant,
}

/// Drafts of every open submission session.
///
/// The registry lock only covers map lookups. Work on a session's drafts
/// happens under that session's own lock, so sessions never wait on each
/// other.
#[derive(Clone)]
pub struct DraftSessions {
    slots: Arc<Mutex<HashMap<SessionId, SessionSlot>>>,
    idle_ttl: Duration,
}

impl Default for DraftSessions {
    fn default() -> Self {
        Self::with_idle_ttl(DEFAULT_IDLE_TTL)
    }
}

impl DraftSessions {
    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self {
            slots: Arc::default(),
            idle_ttl,
        }
    }

    /// Returns the drafts of `session`, creating them on first use.
    pub async fn session(&self, session: SessionId) -> Arc<Mutex<SessionDrafts>> {
        let mut slots = self.slots.lock().await;
        let now = Instant::now();
        self.evict_idle(&mut slots, session, now);
        let slot = slots.entry(session).or_insert_with(|| SessionSlot {
            drafts: Arc::default(),
            touched: now,
        });
        slot.touched = now;
        Arc::clone(&slot.drafts)
    }

    async fn existing(&self, session: SessionId) -> Option<Arc<Mutex<SessionDrafts>>> {
        let mut slots = self.slots.lock().await;
        let now = Instant::now();
        self.evict_idle(&mut slots, session, now);
        slots.get_mut(&session).map(|slot| {
            slot.touched = now;
            Arc::clone(&slot.drafts)
        })
    }

    fn evict_idle(
        &self,
        slots: &mut HashMap<SessionId, SessionSlot>,
        current: SessionId,
        now: Instant,
    ) {
        let before = slots.len();
        // A slot still referenced outside the map is in use.
        slots.retain(|id, slot| {
            *id == current
                || now.duration_since(slot.touched) < self.idle_ttl
                || Arc::strong_count(&slot.drafts) > 1
        });
        let evicted = before - slots.len();
        if evicted > 0 {
            debug!(evicted, "idle draft sessions dropped");
        }
    }

    pub async fn snapshot(&self, session: SessionId) -> Vec<EventDraft> {
        let Some(drafts) = self.existing(session).await else {
            return Vec::new();
        };
        let drafts = drafts.lock().await;
        drafts.accumulator.drafts().to_vec()
    }

    pub async fn picture_kept(&self, session: SessionId) -> bool {
        let Some(drafts) = self.existing(session).await else {
            return false;
        };
        let drafts = drafts.lock().await;
        drafts.picture.is_some()
    }

    pub async fn keep_picture(&self, session: SessionId, picture: Vec<u8>) {
        let drafts = self.session(session).await;
        drafts.lock().await.picture = Some(picture);
    }

    pub async fn add(
        &self,
        session: SessionId,
        input: EventDraftInput,
        today: NaiveDate,
    ) -> Result<EventDraft, ApiError> {
        let drafts = self.session(session).await;
        let mut drafts = drafts.lock().await;
        add_event_draft(&mut drafts.accumulator, input, today)
    }

    /// Drops `session` when it holds nothing and no request is using it.
    pub async fn forget_if_blank(&self, session: SessionId) {
        let mut slots = self.slots.lock().await;
        let unused = slots.get(&session).is_some_and(|slot| {
            Arc::strong_count(&slot.drafts) == 1
                && slot
                    .drafts
                    .try_lock()
                    .is_ok_and(|drafts| drafts.is_blank())
        });
        if unused {
            slots.remove(&session);
        }
    }

    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
