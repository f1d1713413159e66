use shared::{
    domain::{ProfileId, SessionId, ViewChange},
    error::{ApiError, ErrorCode, ValidationError},
    protocol::{CommentView, EventView, ProfileSummary, ProfileView},
    rating::{render_stars, DEFAULT_MAX_RATING},
    text::{join_points, parse_capabilities, parse_points},
};
use storage::{Storage, StoredProfile};
use tracing::{info, warn};

pub mod drafts;

pub use drafts::{
    add_event_draft, parse_draft_date, DraftAccumulator, DraftSessions, EventDraftInput,
    SessionDrafts, DEFAULT_IDLE_TTL,
};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub drafts: DraftSessions,
}

impl ApiContext {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            drafts: DraftSessions::default(),
        }
    }
}

/// Values of the profile form at submit time.
#[derive(Debug, Clone, Default)]
pub struct ProfileSubmission {
    pub name: String,
    pub school: String,
    pub department: String,
    pub picture: Option<Vec<u8>>,
    pub capabilities: String,
}

impl ProfileSubmission {
    fn is_complete(&self) -> bool {
        !self.name.is_empty()
            && !self.school.is_empty()
            && !self.department.is_empty()
            && self.picture.is_some()
            && !self.capabilities.is_empty()
    }
}

/// Writes the profile and then one event per draft, in draft order. The
/// accumulator is cleared only after every event row is stored. Writes are
/// independent commits: a failure part way leaves the rows already written.
pub async fn submit_profile(
    ctx: &ApiContext,
    submission: ProfileSubmission,
    drafts: &mut DraftAccumulator,
) -> Result<ProfileId, ApiError> {
    if !submission.is_complete() || drafts.is_empty() {
        warn!("profile submission rejected: required fields missing");
        return Err(ValidationError::IncompleteProfile.into());
    }

    let profile_id = ctx
        .storage
        .create_profile(
            &submission.name,
            &submission.school,
            &submission.department,
            submission.picture.as_deref(),
            &submission.capabilities,
        )
        .await
        .map_err(internal)?;

    for draft in drafts.drafts() {
        ctx.storage
            .create_event(
                profile_id,
                &draft.name,
                draft.start,
                draft.end,
                &join_points(&draft.points),
            )
            .await
            .map_err(internal)?;
    }

    let events = drafts.len();
    drafts.clear();
    info!(profile_id = profile_id.0, events, "profile submitted");
    Ok(profile_id)
}

/// Runs [`submit_profile`] against the drafts of `session` and forgets the
/// session once its drafts are committed. A picture uploaded with this or an
/// earlier request of the session is kept until the profile is stored.
///
/// Only `session` is locked while the store is written.
pub async fn submit_session_profile(
    ctx: &ApiContext,
    session: SessionId,
    mut submission: ProfileSubmission,
) -> Result<ProfileId, ApiError> {
    let handle = ctx.drafts.session(session).await;
    let mut state = handle.lock().await;
    if submission.picture.is_some() {
        state.picture.clone_from(&submission.picture);
    } else {
        submission.picture.clone_from(&state.picture);
    }

    let result = submit_profile(ctx, submission, &mut state.accumulator).await;
    if result.is_ok() {
        state.picture = None;
    }
    drop(state);
    drop(handle);
    ctx.drafts.forget_if_blank(session).await;
    result
}

pub async fn list_profiles(ctx: &ApiContext) -> Result<Vec<ProfileSummary>, ApiError> {
    let profiles = ctx.storage.list_profiles().await.map_err(internal)?;
    Ok(profiles
        .into_iter()
        .map(|profile| ProfileSummary {
            profile_id: profile.profile_id,
            name: profile.name,
        })
        .collect())
}

/// Distinct profile names in first-seen order, as offered by the browse view.
pub fn selectable_names(profiles: &[ProfileSummary]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for profile in profiles {
        if !names.contains(&profile.name) {
            names.push(profile.name.clone());
        }
    }
    names
}

/// Resolves the profile shown for `name`, defaulting to the first listed
/// name. When several profiles share a name the last one listed wins.
pub async fn select_profile(
    ctx: &ApiContext,
    name: Option<&str>,
) -> Result<Option<ProfileView>, ApiError> {
    let profiles = ctx.storage.list_profiles().await.map_err(internal)?;
    let Some(name) = name.or_else(|| profiles.first().map(|p| p.name.as_str())) else {
        return Ok(None);
    };
    let Some(selected) = profiles.iter().rev().find(|p| p.name == name).cloned() else {
        return Ok(None);
    };
    profile_view_for(ctx, selected).await.map(Some)
}

pub async fn profile_view(ctx: &ApiContext, profile_id: ProfileId) -> Result<ProfileView, ApiError> {
    let profile = ctx
        .storage
        .find_profile(profile_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::new(ErrorCode::NotFound, "profile not found"))?;
    profile_view_for(ctx, profile).await
}

async fn profile_view_for(ctx: &ApiContext, profile: StoredProfile) -> Result<ProfileView, ApiError> {
    let events = ctx
        .storage
        .list_events(profile.profile_id)
        .await
        .map_err(internal)?;
    let comments = ctx
        .storage
        .list_comments(profile.profile_id)
        .await
        .map_err(internal)?;
    let average_rating = ctx
        .storage
        .average_rating(profile.profile_id)
        .await
        .map_err(internal)?;

    Ok(ProfileView {
        profile_id: profile.profile_id,
        capabilities: parse_capabilities(&profile.capabilities),
        name: profile.name,
        school: profile.school,
        department: profile.department,
        picture: profile.picture,
        events: events
            .into_iter()
            .map(|event| EventView {
                event_id: event.event_id,
                points: parse_points(&event.points),
                name: event.event_name,
                start_date: event.start_date,
                end_date: event.end_date,
            })
            .collect(),
        average_rating,
        average_stars: render_stars(average_rating, DEFAULT_MAX_RATING),
        comments: comments
            .into_iter()
            .map(|comment| CommentView {
                stars: render_stars(comment.rating as f64, DEFAULT_MAX_RATING),
                comment: comment.comment,
                rating: comment.rating,
                created_at: comment.created_at,
            })
            .collect(),
    })
}

/// Stores a comment when it has text and a chosen rating. `0` is the unset
/// value of the rating control and is refused here even though the store
/// would accept it.
pub async fn submit_comment(
    ctx: &ApiContext,
    profile_id: ProfileId,
    comment: &str,
    rating: i64,
) -> Result<ViewChange, ApiError> {
    if comment.is_empty() || rating <= 0 {
        warn!(profile_id = profile_id.0, rating, "comment rejected");
        return Err(ValidationError::IncompleteComment.into());
    }

    ctx.storage
        .create_comment(profile_id, comment, rating)
        .await
        .map_err(internal)?;
    info!(profile_id = profile_id.0, rating, "comment added");
    Ok(ViewChange::Refresh)
}

fn internal(err: anyhow::Error) -> ApiError {
    tracing::error!(error = %err, "store operation failed");
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
