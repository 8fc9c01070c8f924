//! API-wide constants.

/// Path prefix for all API routes.
pub const API_PREFIX: &str = "/api/v0";
