//! Change tracker: pending unit of work plus identity map.
//!
//! # Invariants
//! - Pending entries keep the order they were added in.
//! - At most one tracked snapshot exists per storage id.
//! - Tracked callers hold fields only; their call list is rebuilt from the
//!   tracked calls whose `caller_id` points at them.

use crate::model::caller::{Caller, CallerId};
use crate::model::phone_call::{PhoneCall, PhoneCallId};
use std::collections::BTreeMap;

/// One staged record graph awaiting `save_changes`.
#[derive(Debug, Clone)]
pub(crate) enum PendingEntry {
    Caller(Caller),
    PhoneCall(PhoneCall),
}

#[derive(Debug, Default)]
pub(crate) struct ChangeTracker {
    pending: Vec<PendingEntry>,
    callers: BTreeMap<CallerId, Caller>,
    phone_calls: BTreeMap<PhoneCallId, PhoneCall>,
}

impl ChangeTracker {
    pub(crate) fn stage(&mut self, entry: PendingEntry) {
        self.pending.push(entry);
    }

    pub(crate) fn pending(&self) -> &[PendingEntry] {
        &self.pending
    }

    pub(crate) fn take_pending(&mut self) -> Vec<PendingEntry> {
        std::mem::take(&mut self.pending)
    }

    /// Puts entries back at the front after a failed save.
    pub(crate) fn restore_pending(&mut self, mut entries: Vec<PendingEntry>) {
        entries.append(&mut self.pending);
        self.pending = entries;
    }

    /// Tracks a saved caller and every call it owns.
    pub(crate) fn attach_caller(&mut self, caller: &Caller) {
        for call in &caller.phone_calls {
            self.attach_phone_call(call);
        }
        if let Some(id) = caller.id {
            self.callers.insert(id, caller_fields(caller));
        }
    }

    pub(crate) fn attach_phone_call(&mut self, call: &PhoneCall) {
        if let Some(id) = call.id {
            self.phone_calls.insert(id, call.clone());
        }
    }

    /// Returns the tracked snapshot if present, otherwise tracks `loaded`.
    pub(crate) fn resolve_phone_call(&mut self, loaded: PhoneCall) -> PhoneCall {
        match loaded.id {
            Some(id) => self
                .phone_calls
                .entry(id)
                .or_insert(loaded)
                .clone(),
            None => loaded,
        }
    }

    /// Resolves a loaded caller against tracked fields.
    ///
    /// The call list always comes from `loaded`, each call resolved through
    /// `resolve_phone_call`, so calls saved after the caller still appear.
    pub(crate) fn resolve_caller(&mut self, loaded: Caller) -> Caller {
        let Some(id) = loaded.id else {
            return loaded;
        };
        let fields = self
            .callers
            .entry(id)
            .or_insert_with(|| caller_fields(&loaded))
            .clone();
        let phone_calls = loaded
            .phone_calls
            .into_iter()
            .map(|call| self.resolve_phone_call(call))
            .collect();
        Caller {
            phone_calls,
            ..fields
        }
    }

    pub(crate) fn phone_call(&self, id: PhoneCallId) -> Option<&PhoneCall> {
        self.phone_calls.get(&id)
    }

    pub(crate) fn phone_call_mut(&mut self, id: PhoneCallId) -> Option<&mut PhoneCall> {
        self.phone_calls.get_mut(&id)
    }

    /// Tracked caller with its tracked calls attached, ordered by id.
    pub(crate) fn caller(&self, id: CallerId) -> Option<Caller> {
        let fields = self.callers.get(&id)?;
        let phone_calls = self
            .phone_calls
            .values()
            .filter(|call| call.caller_id == Some(id))
            .cloned()
            .collect();
        Some(Caller {
            phone_calls,
            ..fields.clone()
        })
    }

    pub(crate) fn tracked_counts(&self) -> (usize, usize) {
        (self.callers.len(), self.phone_calls.len())
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
        self.callers.clear();
        self.phone_calls.clear();
    }
}

fn caller_fields(caller: &Caller) -> Caller {
    Caller {
        id: caller.id,
        name: caller.name.clone(),
        phone_calls: Vec::new(),
    }
}
