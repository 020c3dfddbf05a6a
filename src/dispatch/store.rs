use chrono::{DateTime, Utc};

use super::storage::StorageError;
use super::{pseudo_geocode, seed_requests, CallRequest, RequestDraft, RequestPatch, Status};

/// Persistence seam for the request collection. Production uses the
/// `.despacho/` JSON file; tests use an in-memory port.
pub trait RequestPort {
    /// Ok(None) when nothing has been persisted yet.
    fn load(&self) -> Result<Option<Vec<CallRequest>>, StorageError>;
    fn save(&self, requests: &[CallRequest]) -> Result<(), StorageError>;
}

/// The request collection plus its persistence port. Every mutation
/// writes the whole collection back through the port.
pub struct RequestStore {
    port: Box<dyn RequestPort>,
    requests: Vec<CallRequest>,
}

impl RequestStore {
    /// Open the store. A missing or unreadable collection falls back to
    /// the demonstration seed, warning on stderr for the unreadable case.
    pub fn open(port: Box<dyn RequestPort>, now: DateTime<Utc>) -> Self {
        let requests = match port.load() {
            Ok(Some(requests)) => requests,
            Ok(None) => seed_requests(now),
            Err(err) => {
                eprintln!("warning: could not read request collection ({err}), using seed data");
                seed_requests(now)
            }
        };
        Self { port, requests }
    }

    pub fn requests(&self) -> &[CallRequest] {
        &self.requests
    }

    pub fn get(&self, id: i64) -> Option<&CallRequest> {
        self.requests.iter().find(|r| r.id == id)
    }

    /// Create a request from a validated draft. Urgent drafts jump the
    /// queue; everything else appends.
    pub fn create(
        &mut self,
        draft: RequestDraft,
        now: DateTime<Utc>,
    ) -> Result<CallRequest, StorageError> {
        let request = CallRequest {
            id: now.timestamp_millis(),
            coords: pseudo_geocode(&draft.origin),
            patient: draft.patient,
            phone: draft.phone,
            origin: draft.origin,
            destination: draft.destination,
            priority: draft.priority,
            status: Status::Triage,
            notes: draft.notes,
            created_at: now,
        };
        if request.is_urgent() {
            self.requests.insert(0, request.clone());
        } else {
            self.requests.push(request.clone());
        }
        self.persist()?;
        Ok(request)
    }

    /// Merge a patch into the record, then restore the urgent-first
    /// ordering. Unknown ids are a no-op.
    pub fn update(&mut self, id: i64, patch: RequestPatch) -> Result<(), StorageError> {
        let Some(request) = self.requests.iter_mut().find(|r| r.id == id) else {
            return Ok(());
        };
        if let Some(patient) = patch.patient {
            request.patient = patient;
        }
        if let Some(phone) = patch.phone {
            request.phone = phone;
        }
        if let Some(origin) = patch.origin {
            request.coords = pseudo_geocode(&origin);
            request.origin = origin;
        }
        if let Some(destination) = patch.destination {
            request.destination = destination;
        }
        if let Some(notes) = patch.notes {
            request.notes = notes;
        }
        if let Some(priority) = patch.priority {
            request.priority = priority;
        }
        if let Some(status) = patch.status {
            request.status = status;
        }
        // Stable sort keeps the relative order within each group.
        self.requests.sort_by_key(|r| !r.is_urgent());
        self.persist()
    }

    pub fn mark_urgent(&mut self, id: i64) -> Result<(), StorageError> {
        self.update(id, RequestPatch::priority(super::Priority::Urgent))
    }

    /// Cancellation keeps the record; nothing in the normal flow deletes.
    pub fn cancel(&mut self, id: i64) -> Result<(), StorageError> {
        self.update(id, RequestPatch::status(Status::Cancelled))
    }

    pub fn set_status(&mut self, id: i64, status: Status) -> Result<(), StorageError> {
        self.update(id, RequestPatch::status(status))
    }

    /// Hard removal. Kept for completeness; no interactive flow reaches it.
    pub fn delete(&mut self, id: i64) -> Result<(), StorageError> {
        self.requests.retain(|r| r.id != id);
        self.persist()
    }

    /// Requests whose status has no column in `statuses` go back to Triage.
    /// Returns how many were moved.
    pub fn reassign_stranded(&mut self, statuses: &[Status]) -> Result<usize, StorageError> {
        let mut moved = 0;
        for request in &mut self.requests {
            if !statuses.contains(&request.status) {
                request.status = Status::Triage;
                moved += 1;
            }
        }
        if moved > 0 {
            self.persist()?;
        }
        Ok(moved)
    }

    fn persist(&self) -> Result<(), StorageError> {
        self.port.save(&self.requests)
    }
}

/// In-memory port for tests.
#[cfg(test)]
pub struct MemoryPort {
    initial: Option<Vec<CallRequest>>,
    pub saved: std::cell::RefCell<Vec<Vec<CallRequest>>>,
}

#[cfg(test)]
impl MemoryPort {
    pub fn empty() -> Self {
        Self {
            initial: None,
            saved: std::cell::RefCell::new(Vec::new()),
        }
    }

    pub fn with(requests: Vec<CallRequest>) -> Self {
        Self {
            initial: Some(requests),
            saved: std::cell::RefCell::new(Vec::new()),
        }
    }
}

#[cfg(test)]
impl RequestPort for MemoryPort {
    fn load(&self) -> Result<Option<Vec<CallRequest>>, StorageError> {
        Ok(self.initial.clone())
    }

    fn save(&self, requests: &[CallRequest]) -> Result<(), StorageError> {
        self.saved.borrow_mut().push(requests.to_vec());
        Ok(())
    }
}
