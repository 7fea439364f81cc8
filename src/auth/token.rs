//! Anti-forgery (CSRF) token state.
//!
//! The portal issues a token through a `Set-Cookie: CSRF-Token=...`
//! header on GET responses and expects it back on every subsequent
//! request: in the `CSRF-Token` header for GETs (or the literal `Fetch`
//! when no token is known yet, which asks the portal to issue one) and
//! in the `X-CSRF-Token` header for everything else.

use reqwest::header::{HeaderMap, SET_COOKIE};
use reqwest::Method;

/// Cookie and GET-request header name carrying the anti-forgery token.
pub const CSRF_TOKEN_NAME: &str = "CSRF-Token";

/// Header name used on mutating (non-GET) requests.
pub const CSRF_TOKEN_WRITE_HEADER: &str = "X-CSRF-Token";

/// Sentinel value asking the portal to issue a fresh token.
const FETCH_TOKEN: &str = "Fetch";

/// Holds the current anti-forgery token for one session.
///
/// Pure state, no I/O. Once a response sets the token it is reused on
/// every later request until a response replaces it. One store belongs
/// to exactly one session; exchanges on a session are sequenced, so no
/// locking is needed here.
#[derive(Debug, Default)]
pub struct CsrfTokenStore {
    token: Option<String>,
}

impl CsrfTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current token, if a response has issued one.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Header name and value to attach to an outgoing request.
    ///
    /// GET requests carry `CSRF-Token`, with `Fetch` standing in while
    /// no token is known. Mutating requests carry `X-CSRF-Token`; an
    /// empty value is sent when no token is known and the portal is
    /// expected to reject it, which callers surface as an
    /// authentication failure.
    pub fn header_for(&self, method: &Method) -> (&'static str, String) {
        if *method == Method::GET {
            let value = self
                .token
                .clone()
                .unwrap_or_else(|| FETCH_TOKEN.to_string());
            (CSRF_TOKEN_NAME, value)
        } else {
            (CSRF_TOKEN_WRITE_HEADER, self.token.clone().unwrap_or_default())
        }
    }

    /// Harvest a token from the response's `Set-Cookie` headers.
    ///
    /// All entries are scanned, not just the first; an entry starting
    /// with `CSRF-Token=` replaces the stored token with everything
    /// after the `=`, verbatim. Last match wins. No-op when no entry
    /// matches, and idempotent for a given cookie value.
    pub fn absorb(&mut self, headers: &HeaderMap) {
        let prefix = format!("{CSRF_TOKEN_NAME}=");
        for value in headers.get_all(SET_COOKIE) {
            let Ok(cookie) = value.to_str() else {
                continue;
            };
            if let Some(token) = cookie.strip_prefix(&prefix) {
                self.token = Some(token.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn cookies(values: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for v in values {
            headers.append(SET_COOKIE, HeaderValue::from_str(v).unwrap());
        }
        headers
    }

    #[test]
    fn get_without_token_asks_for_one() {
        let store = CsrfTokenStore::new();
        assert_eq!(store.header_for(&Method::GET), (CSRF_TOKEN_NAME, "Fetch".to_string()));
    }

    #[test]
    fn non_get_without_token_sends_empty_value() {
        let store = CsrfTokenStore::new();
        let (name, value) = store.header_for(&Method::POST);
        assert_eq!(name, CSRF_TOKEN_WRITE_HEADER);
        assert_eq!(value, "");
    }

    #[test]
    fn absorbed_token_is_echoed_on_both_header_forms() {
        let mut store = CsrfTokenStore::new();
        store.absorb(&cookies(&["CSRF-Token=abc123"]));

        assert_eq!(store.header_for(&Method::GET), (CSRF_TOKEN_NAME, "abc123".to_string()));
        assert_eq!(
            store.header_for(&Method::POST),
            (CSRF_TOKEN_WRITE_HEADER, "abc123".to_string())
        );
        assert_eq!(
            store.header_for(&Method::DELETE),
            (CSRF_TOKEN_WRITE_HEADER, "abc123".to_string())
        );
    }

    #[test]
    fn absorb_scans_all_set_cookie_entries() {
        let mut store = CsrfTokenStore::new();
        store.absorb(&cookies(&[
            "session=keep-me",
            "CSRF-Token=first",
            "CSRF-Token=second",
        ]));
        // Last matching entry wins.
        assert_eq!(store.token(), Some("second"));
    }

    #[test]
    fn absorb_without_matching_cookie_is_a_no_op() {
        let mut store = CsrfTokenStore::new();
        store.absorb(&cookies(&["CSRF-Token=abc123"]));
        store.absorb(&cookies(&["unrelated=value"]));
        store.absorb(&HeaderMap::new());
        assert_eq!(store.token(), Some("abc123"));
    }

    #[test]
    fn absorb_is_idempotent() {
        let mut store = CsrfTokenStore::new();
        store.absorb(&cookies(&["CSRF-Token=abc123"]));
        store.absorb(&cookies(&["CSRF-Token=abc123"]));
        assert_eq!(store.token(), Some("abc123"));
    }

    #[test]
    fn later_cookie_replaces_stored_token() {
        let mut store = CsrfTokenStore::new();
        store.absorb(&cookies(&["CSRF-Token=old"]));
        store.absorb(&cookies(&["CSRF-Token=new"]));
        assert_eq!(store.header_for(&Method::GET).1, "new");
    }

    #[test]
    fn token_value_is_taken_verbatim_after_the_equals() {
        let mut store = CsrfTokenStore::new();
        store.absorb(&cookies(&["CSRF-Token=abc=def; Path=/"]));
        assert_eq!(store.token(), Some("abc=def; Path=/"));
    }
}
