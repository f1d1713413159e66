use axum::extract::{multipart::MultipartError, Multipart};
use serde::Deserialize;
use shared::error::{ApiError, ErrorCode};
use showcase_api::{parse_draft_date, EventDraftInput, ProfileSubmission};

use crate::pages::ProfileFormValues;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CreateAction {
    AddEvent,
    Submit,
}

/// Fields of the multipart submission form.
#[derive(Debug, Default)]
pub(crate) struct CreateForm {
    pub(crate) action: Option<String>,
    pub(crate) values: ProfileFormValues,
    pub(crate) picture: Option<Vec<u8>>,
}

impl CreateForm {
    pub(crate) fn action(&self) -> CreateAction {
        match self.action.as_deref() {
            Some("add_event") => CreateAction::AddEvent,
            _ => CreateAction::Submit,
        }
    }

    pub(crate) fn event_input(&self) -> Result<EventDraftInput, ApiError> {
        Ok(EventDraftInput {
            name: self.values.event_name.clone(),
            start: parse_draft_date(&self.values.start_date)?,
            end: parse_draft_date(&self.values.end_date)?,
            points: self.values.points.clone(),
        })
    }

    pub(crate) fn submission(&mut self) -> ProfileSubmission {
        ProfileSubmission {
            name: self.values.name.clone(),
            school: self.values.school.clone(),
            department: self.values.department.clone(),
            picture: self.picture.take(),
            capabilities: self.values.capabilities.clone(),
        }
    }

    /// Form values to show after a draft was accepted: profile fields stay,
    /// event fields start over.
    pub(crate) fn values_after_draft(&self) -> ProfileFormValues {
        ProfileFormValues {
            name: self.values.name.clone(),
            school: self.values.school.clone(),
            department: self.values.department.clone(),
            capabilities: self.values.capabilities.clone(),
            ..ProfileFormValues::default()
        }
    }
}

pub(crate) async fn read_create_form(mut multipart: Multipart) -> Result<CreateForm, ApiError> {
    let mut form = CreateForm::default();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        if name == "picture" {
            let chosen = field.file_name().is_some_and(|file| !file.is_empty());
            let bytes = field.bytes().await.map_err(malformed)?;
            if chosen && !bytes.is_empty() {
                form.picture = Some(bytes.to_vec());
            }
            continue;
        }

        let value = normalize_newlines(&field.text().await.map_err(malformed)?);
        let values = &mut form.values;
        match name.as_str() {
            "action" => form.action = Some(value),
            "name" => values.name = value,
            "school" => values.school = value,
            "department" => values.department = value,
            "capabilities" => values.capabilities = value,
            "event_name" => values.event_name = value,
            "start_date" => values.start_date = value,
            "end_date" => values.end_date = value,
            "points" => values.points = value,
            _ => {}
        }
    }

    Ok(form)
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentForm {
    #[serde(default)]
    pub(crate) comment: String,
    #[serde(default)]
    pub(crate) rating: i64,
}

/// Browsers submit textarea line breaks as CRLF.
pub(crate) fn normalize_newlines(raw: &str) -> String {
    raw.replace("\r\n", "\n")
}

fn malformed(err: MultipartError) -> ApiError {
    ApiError::new(
        ErrorCode::Validation,
        format!("malformed form submission: {}", err.body_text()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crlf_line_breaks_become_newlines() {
        assert_eq!(normalize_newlines("Did X\r\nDid Y"), "Did X\nDid Y");
    }

    #[test]
    fn unknown_action_means_submit() {
        let form = CreateForm::default();
        assert_eq!(form.action(), CreateAction::Submit);
        let form = CreateForm {
            action: Some("add_event".into()),
            ..CreateForm::default()
        };
        assert_eq!(form.action(), CreateAction::AddEvent);
    }

    #[test]
    fn blank_dates_stay_unset() {
        let form = CreateForm {
            values: ProfileFormValues {
                event_name: "Intern".into(),
                points: "x".into(),
                ..ProfileFormValues::default()
            },
            ..CreateForm::default()
        };
        let input = form.event_input().expect("input");
        assert!(input.start.is_none());
        assert!(input.end.is_none());
    }
}
