//! Per-request state.
//!
//! Holds the decoded cookie outcome and the explicit request-scoped
//! attribute map shared between middleware and handlers.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use crate::config::DecodeError;

/// Outcome of decoding one request's cookie.
///
/// As produced by a codec, at most one side is set: a missing or empty
/// cookie yields neither, a valid cookie yields the value, an invalid one
/// yields the error. There is no way to set the error after construction,
/// so handler writes only ever move the state toward a new value; a stored
/// decode error stays readable for the rest of the request and is dropped
/// with it.
#[derive(Debug, Clone, PartialEq)]
pub struct CookieData<T> {
    value: Option<T>,
    error: Option<DecodeError>,
}

impl<T> CookieData<T> {
    /// State for a request that carried no cookie.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            value: None,
            error: None,
        }
    }

    /// State for a successfully decoded cookie.
    #[must_use]
    pub fn with_value(value: T) -> Self {
        Self {
            value: Some(value),
            error: None,
        }
    }

    /// State for a cookie that failed verification or deserialization.
    #[must_use]
    pub fn with_error(error: DecodeError) -> Self {
        Self {
            value: None,
            error: Some(error),
        }
    }

    #[must_use]
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn value_mut(&mut self) -> Option<&mut T> {
        self.value.as_mut()
    }

    #[must_use]
    pub fn error(&self) -> Option<&DecodeError> {
        self.error.as_ref()
    }

    /// Replaces the value to be written back at response time.
    pub fn set(&mut self, value: T) {
        self.value = Some(value);
    }

    /// Clears the value so no cookie is written back.
    pub fn clear(&mut self) {
        self.value = None;
    }

    /// Consumes the container, returning the value for write-back.
    #[must_use]
    pub fn into_value(self) -> Option<T> {
        self.value
    }
}

impl<T> Default for CookieData<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Explicit request-scoped attribute map.
///
/// Middleware stores decoded cookie state here under its configured
/// attribute name; handlers look it up by the same name and type. One
/// instance lives and dies with a single request and is never shared
/// across threads.
#[derive(Default)]
pub struct RequestState {
    entries: HashMap<String, Box<dyn Any + Send>>,
}

impl RequestState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Stores a value under `name`, replacing any previous entry.
    pub fn insert<T: Any + Send>(&mut self, name: &str, value: T) {
        self.entries.insert(name.to_string(), Box::new(value));
    }

    /// Looks up a value by name; `None` when absent or of another type.
    #[must_use]
    pub fn get<T: Any + Send>(&self, name: &str) -> Option<&T> {
        self.entries.get(name).and_then(|v| v.downcast_ref())
    }

    pub fn get_mut<T: Any + Send>(&mut self, name: &str) -> Option<&mut T> {
        self.entries.get_mut(name).and_then(|v| v.downcast_mut())
    }

    /// Removes and returns a value by name. An entry of another type is
    /// left in place.
    pub fn remove<T: Any + Send>(&mut self, name: &str) -> Option<T> {
        match self.entries.remove(name)?.downcast::<T>() {
            Ok(boxed) => Some(*boxed),
            Err(other) => {
                self.entries.insert(name.to_string(), other);
                None
            }
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

impl fmt::Debug for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestState")
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
