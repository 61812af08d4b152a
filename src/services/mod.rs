//! Business logic
//!
//! Services take the shared `AppState` and an authenticated `Identity`
//! where one is needed, and return schema types. They never see HTTP.

pub mod accounts;
pub mod graph;
pub mod notifications;
pub mod posts;

/// Trimmed value, or None when absent or blank
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
