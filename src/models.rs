//! Data models for the outage crawl.
//!
//! This module defines the core data structures used throughout the application:
//! - [`SessionForm`]: per-session credentials discovered on the portal's listing page
//! - [`OutageRecord`]: one scheduled power-interruption entry parsed from the result table
//!
//! Both are plain immutable values; all protocol behavior lives in the
//! session/crawler modules.

use serde::Serialize;

/// Per-session form credentials discovered on the portal's listing page.
///
/// The portal renders its form with a server-issued view state token and
/// dynamically named fields. Both values must come from the *same* page
/// fetch: a submit is only accepted when the echoed token and the
/// prefix-qualified field names match what the server rendered together.
///
/// # Fields
///
/// * `token` - Opaque view state string, echoed verbatim on submit
/// * `field_prefix` - Namespace the server prepends to every form field name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionForm {
    /// The server-issued view state token.
    pub token: String,
    /// The per-request form field namespace.
    pub field_prefix: String,
}

/// A single scheduled power outage as announced on the portal.
///
/// Fields map positionally to the columns of the portal's result table and
/// are kept as the plain trimmed text the portal rendered, in row order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutageRecord {
    /// Date of the scheduled outage.
    pub date: String,
    /// Town the outage applies to.
    pub town: String,
    /// Substation taken out of service.
    pub substation: String,
    /// Feeder line affected.
    pub feeder: String,
    /// Free-text description of the affected locations.
    pub location: String,
    /// Kind of maintenance work being carried out.
    pub work_type: String,
    /// Start of the outage window.
    pub from_time: String,
    /// End of the outage window.
    pub to_time: String,
}
