//! Marker types.

/// Marker type describing an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker type describing an entity issuing.
#[derive(Clone, Copy, Debug)]
pub struct Issue;

/// Marker type describing an entity expiration.
#[derive(Clone, Copy, Debug)]
pub struct Expiration;
