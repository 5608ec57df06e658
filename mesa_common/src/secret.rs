//! A wrapper for values that must never reach the logs.
//!
//! Configuration structs derive `Debug` and get printed freely at startup; wrapping the JWT secret (and anything
//! like it) in [`Secret`] makes that safe, since both `Debug` and `Display` render as `****`. Access to the inner
//! value is explicit, via [`Secret::reveal`].

use std::{
    fmt,
    fmt::{Debug, Display},
};

#[derive(Clone, Default)]
pub struct Secret<T>
where T: Clone + Default
{
    value: T,
}

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    /// Hand out the wrapped value. Call sites are easy to audit for leaks, which is the point.
    pub fn reveal(&self) -> &T {
        &self.value
    }
}

impl<T: Clone + Default> Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default> Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}
