/// Router Module Index
///
/// Splits the routing table into access tiers so the authentication
/// requirements of every endpoint are visible at the module level rather
/// than buried in individual handlers.

/// Routes accessible to all clients (anonymous, mostly read-only).
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
pub mod authenticated;

/// Moderation routes. Authenticated like the tier above, with the
/// moderator role check enforced inside each handler.
pub mod admin;
