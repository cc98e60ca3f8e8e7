//! HTTP routes.
//!
//! Organized by audience:
//! - `forms` - server-rendered intake pages for browsers
//! - `api` - JSON endpoints for non-browser clients

pub mod api;
pub mod forms;
