use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use uuid::Uuid;

/// Remembers which doses were already reminded about, so each overdue dose
/// is announced once per day. Cloning shares the same ledger.
#[derive(Clone, Debug, Default)]
pub struct ReminderLedger {
    sent: Arc<Mutex<HashSet<(Uuid, NaiveDate)>>>,
}

impl ReminderLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time a dose is claimed for `date`.
    pub fn claim(&self, medication_id: Uuid, date: NaiveDate) -> bool {
        self.lock().insert((medication_id, date))
    }

    /// Forgets a claim, e.g. after the reminder could not be delivered.
    pub fn release(&self, medication_id: Uuid, date: NaiveDate) {
        self.lock().remove(&(medication_id, date));
    }

    /// Drops entries dated before `date`.
    pub fn prune_before(&self, date: NaiveDate) {
        self.lock().retain(|(_, day)| *day >= date);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<(Uuid, NaiveDate)>> {
        self.sent.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
