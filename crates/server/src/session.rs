use axum::http::{header, HeaderMap, HeaderValue};
use shared::domain::SessionId;

pub(crate) const SESSION_COOKIE: &str = "showcase_session";

pub(crate) fn session_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| SessionId::parse(value))
}

/// Returns the caller's session and, when a new one had to be issued, the
/// `Set-Cookie` value announcing it.
pub(crate) fn resolve_session(headers: &HeaderMap) -> (SessionId, Option<HeaderValue>) {
    match session_from_headers(headers) {
        Some(session) => (session, None),
        None => {
            let session = SessionId::new();
            (session, Some(session_cookie(session)))
        }
    }
}

fn session_cookie(session: SessionId) -> HeaderValue {
    let cookie = format!("{SESSION_COOKIE}={session}; Path=/; HttpOnly; SameSite=Lax");
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_session_among_other_cookies() {
        let session = SessionId::new();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {SESSION_COOKIE}={session}"))
                .expect("header"),
        );
        assert_eq!(session_from_headers(&headers), Some(session));
    }

    #[test]
    fn issues_cookie_for_missing_or_garbled_session() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("showcase_session=not-a-uuid"),
        );
        let (session, cookie) = resolve_session(&headers);
        let cookie = cookie.expect("new cookie");
        assert!(cookie
            .to_str()
            .expect("ascii")
            .starts_with(&format!("{SESSION_COOKIE}={session};")));
    }
}
