use anyhow::Context as _;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use shared::protocol::{EventDraft, ProfileView};
use tera::{Context, Tera};

pub(crate) const CREATE_PAGE: &str = "create.html";
pub(crate) const BROWSE_PAGE: &str = "browse.html";

/// Page templates, parsed once at startup.
pub(crate) struct Pages {
    tera: Tera,
}

impl Pages {
    pub(crate) fn load() -> anyhow::Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("layout.html", include_str!("../templates/layout.html")),
            (CREATE_PAGE, include_str!("../templates/create.html")),
            (BROWSE_PAGE, include_str!("../templates/browse.html")),
        ])
        .context("failed to parse page templates")?;
        Ok(Self { tera })
    }

    pub(crate) fn render<T: Serialize>(&self, template: &str, page: &T) -> anyhow::Result<String> {
        let context = Context::from_serialize(page)
            .with_context(|| format!("failed to build context for {template}"))?;
        self.tera
            .render(template, &context)
            .with_context(|| format!("failed to render {template}"))
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Notice {
    pub(crate) kind: NoticeKind,
    pub(crate) message: String,
}

impl Notice {
    pub(crate) fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub(crate) fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}

/// Text values echoed back into the submission form.
#[derive(Debug, Clone, Default, Serialize)]
pub(crate) struct ProfileFormValues {
    pub(crate) name: String,
    pub(crate) school: String,
    pub(crate) department: String,
    pub(crate) capabilities: String,
    pub(crate) event_name: String,
    pub(crate) start_date: String,
    pub(crate) end_date: String,
    pub(crate) points: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreatePage {
    pub(crate) form: ProfileFormValues,
    pub(crate) today: String,
    pub(crate) drafts: Vec<EventDraft>,
    pub(crate) picture_kept: bool,
    pub(crate) notice: Option<Notice>,
}

#[derive(Debug, Serialize)]
pub(crate) struct BrowsePage {
    pub(crate) names: Vec<String>,
    pub(crate) selected_name: Option<String>,
    pub(crate) profile: Option<ProfileView>,
    pub(crate) picture_uri: Option<String>,
    pub(crate) average_label: String,
    pub(crate) comment: String,
    pub(crate) notice: Option<Notice>,
}

impl BrowsePage {
    pub(crate) fn new(names: Vec<String>, profile: Option<ProfileView>) -> Self {
        let picture_uri = profile
            .as_ref()
            .and_then(|p| p.picture.as_deref())
            .map(picture_data_uri);
        let average_label = profile
            .as_ref()
            .map(|p| format!("{:.1}", p.average_rating))
            .unwrap_or_default();
        Self {
            names,
            selected_name: profile.as_ref().map(|p| p.name.clone()),
            profile,
            picture_uri,
            average_label,
            comment: String::new(),
            notice: None,
        }
    }
}

pub(crate) fn picture_data_uri(bytes: &[u8]) -> String {
    format!("data:{};base64,{}", sniff_image_mime(bytes), STANDARD.encode(bytes))
}

fn sniff_image_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else {
        "application/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn data_uri_uses_sniffed_mime() {
        assert!(picture_data_uri(b"\x89PNG\r\n\x1a\nrest").starts_with("data:image/png;base64,"));
        assert!(picture_data_uri(&[0xFF, 0xD8, 0xFF, 0xE0]).starts_with("data:image/jpeg;base64,"));
        assert_eq!(picture_data_uri(b"abc"), "data:application/octet-stream;base64,YWJj");
    }

    #[test]
    fn templates_parse_and_render_drafts() {
        let pages = Pages::load().expect("templates");
        let page = CreatePage {
            form: ProfileFormValues::default(),
            today: "2024-01-01".into(),
            drafts: vec![EventDraft {
                name: "Intern <b>".into(),
                start: NaiveDate::from_ymd_opt(2023, 1, 1).expect("date"),
                end: NaiveDate::from_ymd_opt(2023, 6, 1).expect("date"),
                points: vec!["Did X".into(), "Did Y".into()],
            }],
            picture_kept: true,
            notice: Some(Notice::success("Event added!")),
        };

        let html = pages.render(CREATE_PAGE, &page).expect("render");
        assert!(html.contains("Intern &lt;b&gt; (2023-01-01 - 2023-06-01)"));
        assert!(html.contains("<li>Did Y</li>"));
        assert!(html.contains("Event added!"));
        assert!(html.contains("Picture uploaded."));
    }

    #[test]
    fn empty_browse_page_invites_a_first_profile() {
        let pages = Pages::load().expect("templates");
        let html = pages
            .render(BROWSE_PAGE, &BrowsePage::new(Vec::new(), None))
            .expect("render");
        assert!(html.contains("No profiles available. Please create one!"));
    }
}
