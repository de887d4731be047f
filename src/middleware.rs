//! Middleware orchestration.
//!
//! Drives the per-request cycle for one signed cookie: decode the inbound
//! value into request state, let the handler mutate it, and write the
//! result back as a `Set-Cookie` header. Host frameworks plug in through
//! the [`Exchange`] trait.

use std::time::Duration;

use crate::codec::CookieCodec;
use crate::config::CookieProperties;
use crate::state::{CookieData, RequestState};

/// Host-framework surface the middleware drives.
///
/// An implementation exposes the raw inbound cookie value, the request's
/// state map, and a way to append `Set-Cookie` headers to the outbound
/// response. It makes no other demands on the host.
pub trait Exchange {
    /// Raw value of the named request cookie, if present.
    fn request_cookie(&self, name: &str) -> Option<&str>;

    /// The request-scoped state map.
    fn state(&mut self) -> &mut RequestState;

    /// Appends a `Set-Cookie` header line to the response.
    fn append_set_cookie(&mut self, header: String);
}

/// Freestanding [`Exchange`] over a raw `Cookie` header line.
///
/// Serves as the reference host for frameworks without a native adapter
/// and as the test harness.
#[derive(Debug, Default)]
pub struct PlainExchange {
    cookie_header: Option<String>,
    state: RequestState,
    set_cookies: Vec<String>,
}

impl PlainExchange {
    /// Creates an exchange for a request without cookies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an exchange carrying an inbound `Cookie` header line.
    #[must_use]
    pub fn with_cookie_header(header: &str) -> Self {
        Self {
            cookie_header: Some(header.to_string()),
            ..Self::default()
        }
    }

    /// `Set-Cookie` header lines appended so far.
    #[must_use]
    pub fn set_cookies(&self) -> &[String] {
        &self.set_cookies
    }
}

impl Exchange for PlainExchange {
    fn request_cookie(&self, name: &str) -> Option<&str> {
        self.cookie_header
            .as_deref()
            .and_then(|header| find_cookie(header, name))
    }

    fn state(&mut self) -> &mut RequestState {
        &mut self.state
    }

    fn append_set_cookie(&mut self, header: String) {
        self.set_cookies.push(header);
    }
}

/// Extracts the named cookie's value from a `Cookie` header line.
#[must_use]
pub fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    for cookie in header.split(';') {
        let cookie = cookie.trim();
        if let Some(rest) = cookie.strip_prefix(name)
            && let Some(value) = rest.strip_prefix('=')
        {
            return Some(value);
        }
    }
    None
}

/// Assembles a `Set-Cookie` header line.
#[must_use]
pub fn format_set_cookie(
    name: &str,
    value: &str,
    max_age: Option<Duration>,
    props: &CookieProperties,
) -> String {
    let mut header = format!("{name}={value}; Path={}", props.path);
    if let Some(domain) = &props.domain {
        header.push_str("; Domain=");
        header.push_str(domain);
    }
    if let Some(max_age) = max_age {
        header.push_str(&format!("; Max-Age={}", max_age.as_secs()));
    }
    if props.secure {
        header.push_str("; Secure");
    }
    if props.http_only {
        header.push_str("; HttpOnly");
    }
    header.push_str("; SameSite=");
    header.push_str(props.same_site.as_str());
    header
}

/// Drives the read / handle / write-back cycle for one signed cookie.
///
/// Holds only the codec and no per-request state, so a single instance
/// (typically behind an `Arc`) serves any number of concurrent requests.
pub struct SignedCookieMiddleware<C> {
    codec: C,
}

impl<C: CookieCodec> SignedCookieMiddleware<C> {
    pub fn new(codec: C) -> Self {
        Self { codec }
    }

    /// Read-only access to the underlying codec.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Decodes the inbound cookie and stores the outcome in request state.
    ///
    /// Always stores a [`CookieData`] under the configured attribute name,
    /// so handlers can rely on it being present; a missing or invalid
    /// cookie just leaves it empty or errored.
    pub fn on_request(&self, conn: &mut impl Exchange) {
        let data = self
            .codec
            .decode(conn.request_cookie(self.codec.cookie_name()));
        conn.state().insert(self.codec.state_attribute_name(), data);
    }

    /// Removes the request's state and writes the cookie back when a value
    /// is present.
    ///
    /// A null value appends nothing and leaves the client's cookie
    /// untouched. Requests that never went through
    /// [`on_request`](Self::on_request) are a no-op.
    ///
    /// # Panics
    ///
    /// Panics if the handler stored a value the codec cannot encode.
    pub fn on_response(&self, conn: &mut impl Exchange) {
        let Some(data) = conn
            .state()
            .remove::<CookieData<C::Value>>(self.codec.state_attribute_name())
        else {
            return;
        };
        let Some(value) = data.into_value() else {
            return;
        };

        let token = self
            .codec
            .encode(&value)
            .expect("cookie state failed to encode");
        let header = format_set_cookie(
            self.codec.cookie_name(),
            &token,
            self.codec.max_age(),
            self.codec.properties(),
        );
        conn.append_set_cookie(header);
    }

    /// Runs the full request cycle around a downstream handler.
    ///
    /// The write-back happens only when the handler succeeds; an error is
    /// returned unchanged with no cookie appended.
    ///
    /// # Errors
    ///
    /// Propagates the downstream handler's error.
    pub fn dispatch<X, R, E>(
        &self,
        conn: &mut X,
        downstream: impl FnOnce(&mut X) -> Result<R, E>,
    ) -> Result<R, E>
    where
        X: Exchange,
    {
        self.on_request(conn);
        let response = downstream(conn)?;
        self.on_response(conn);
        Ok(response)
    }
}
