//! Operations passed to [`Handler`]s.
//!
//! [`Handler`]: crate::Handler

use std::marker::PhantomData;

/// Stores a new `T` in a database.
#[derive(Clone, Copy, Debug)]
pub struct Insert<T>(pub T);

/// Reads a value from a database, usually by a [`By`] selector.
#[derive(Clone, Copy, Debug)]
pub struct Select<T>(pub T);

/// Requests a value from a remote party, usually by a [`By`] selector.
#[derive(Clone, Copy, Debug)]
pub struct Fetch<T>(pub T);

/// Selector of a `W` by a `B` key.
///
/// `W` only tags the expected result, so the same key type may select
/// different values.
#[derive(Clone, Copy, Debug)]
pub struct By<W, B> {
    /// Tag of the selected value.
    _what: PhantomData<W>,

    /// Key to select by.
    by: B,
}

impl<W, B> By<W, B> {
    /// Creates a new [`By`] selector out of the provided key.
    #[must_use]
    pub fn new(by: B) -> Self {
        Self {
            _what: PhantomData,
            by,
        }
    }

    /// Returns the key of this [`By`] selector.
    #[must_use]
    pub fn into_inner(self) -> B {
        self.by
    }
}

#[cfg(test)]
mod spec {
    use super::{By, Fetch, Select};

    #[test]
    fn selector_keeps_key() {
        let Select(by) = Select(By::<Option<String>, _>::new(7_u8));
        assert_eq!(by.into_inner(), 7);

        let Fetch(by) = Fetch(By::<(), _>::new("token"));
        assert_eq!(by.into_inner(), "token");
    }
}
