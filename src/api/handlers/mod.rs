//! API request handlers.

/// Deliberation endpoint.
pub mod conversation;
/// Liveness endpoint.
pub mod health;
/// Perspective listing.
pub mod perspectives;
