use chrono::{DateTime, Utc};

use super::wait::{wait_minutes, WaitBucket};
use super::{CallRequest, Priority, Status};

/// Active filter set. `None` means "todos" (no restriction).
#[derive(Debug, Clone, Default)]
pub struct Filters {
    pub search: String,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    /// Wait-time bucket, evaluated against a caller-supplied clock.
    /// Only honored by the list view.
    pub wait: Option<WaitBucket>,
}

impl Filters {
    pub fn is_active(&self) -> bool {
        !self.search.is_empty()
            || self.status.is_some()
            || self.priority.is_some()
            || self.wait.is_some()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Search predicate: case-insensitive substring on the patient name,
/// plain substring on the phone.
fn matches_search(request: &CallRequest, search: &str) -> bool {
    if search.is_empty() {
        return true;
    }
    request
        .patient
        .to_lowercase()
        .contains(&search.to_lowercase())
        || request.phone.contains(search)
}

/// Full predicate used by the list view.
pub fn matches(request: &CallRequest, filters: &Filters, now: DateTime<Utc>) -> bool {
    if !matches_search(request, &filters.search) {
        return false;
    }
    if let Some(status) = filters.status {
        if request.status != status {
            return false;
        }
    }
    if let Some(priority) = filters.priority {
        if request.priority != priority {
            return false;
        }
    }
    if let Some(bucket) = filters.wait {
        if !bucket.contains(wait_minutes(request.created_at, now)) {
            return false;
        }
    }
    true
}

/// Predicate used by the Kanban view. Status is not applied here because
/// the columns already encode it, and the wait bucket is list-view only.
pub fn matches_kanban(request: &CallRequest, filters: &Filters) -> bool {
    if !matches_search(request, &filters.search) {
        return false;
    }
    if let Some(priority) = filters.priority {
        if request.priority != priority {
            return false;
        }
    }
    true
}

/// Visible subset for the list view, preserving collection order.
pub fn apply<'a>(
    requests: &'a [CallRequest],
    filters: &Filters,
    now: DateTime<Utc>,
) -> Vec<&'a CallRequest> {
    requests
        .iter()
        .filter(|r| matches(r, filters, now))
        .collect()
}
