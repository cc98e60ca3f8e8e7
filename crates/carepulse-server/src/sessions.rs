//! Server-side state of rendered forms.
//!
//! Every form page carries a session id in a hidden input. The id maps to
//! the [`FormController`] of that page, so values, touched fields and the
//! submission lifecycle survive between the GET that rendered the form and
//! the POSTs that submit it. Controllers are only reached through
//! [`FormSessions::with`], which runs a synchronous closure on the entry;
//! no map guard is ever held across an `.await`.

use std::time::{Duration, Instant};

use carepulse_forms::FormController;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug)]
struct SessionEntry<R> {
    /// Path of the page the form was rendered for.
    scope: String,
    controller: FormController<R>,
    touched_at: Instant,
}

/// Concurrent map of form sessions, one per rendered form.
#[derive(Debug)]
pub struct FormSessions<R> {
    entries: DashMap<Uuid, SessionEntry<R>>,
    ttl: Duration,
}

impl<R> FormSessions<R> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Store a new controller bound to `scope` and return its id.
    pub fn create(&self, scope: impl Into<String>, controller: FormController<R>) -> Uuid {
        self.purge_expired();
        let id = Uuid::new_v4();
        self.entries.insert(
            id,
            SessionEntry {
                scope: scope.into(),
                controller,
                touched_at: Instant::now(),
            },
        );
        debug!(session = %id, "form session created");
        id
    }

    /// Resolve a posted session id, creating a fresh session when it is
    /// missing, unknown, expired or bound to another page.
    pub fn resolve(
        &self,
        id: Option<&str>,
        scope: &str,
        init: impl FnOnce() -> FormController<R>,
    ) -> Uuid {
        let live = id
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .filter(|id| self.with(*id, scope, |_| ()).is_some());
        match live {
            Some(id) => id,
            None => self.create(scope, init()),
        }
    }

    /// Run `f` on the controller of a live session bound to `scope`.
    ///
    /// Returns `None` when the session does not exist, has expired or
    /// belongs to another page.
    pub fn with<T>(
        &self,
        id: Uuid,
        scope: &str,
        f: impl FnOnce(&mut FormController<R>) -> T,
    ) -> Option<T> {
        let mut entry = self.entries.get_mut(&id)?;
        if entry.scope != scope {
            return None;
        }
        if entry.touched_at.elapsed() > self.ttl {
            drop(entry);
            self.entries.remove(&id);
            debug!(session = %id, "form session expired");
            return None;
        }
        entry.touched_at = Instant::now();
        Some(f(&mut entry.controller))
    }

    pub fn remove(&self, id: Uuid) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop sessions idle for longer than the configured lifetime.
    pub fn purge_expired(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.touched_at.elapsed() <= ttl);
    }
}
