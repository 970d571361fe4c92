//! Dose status for "today".
//!
//! A medication is `Taken` when today's log says so. Otherwise it is
//! `Overdue` once the clock is strictly past the scheduled time plus the
//! grace window, and `Pending` until then. The comparison never looks at
//! yesterday: after midnight the schedule starts over for the new day.
//!
//! "Today" is the calendar date of `now` in its own timezone, so callers pass
//! the instant already converted to the account's offset.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::{Medication, MedicationLog};

/// Minutes after the scheduled time before a dose counts as overdue.
pub const GRACE_WINDOW_MINUTES: i64 = 30;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoseStatus {
    Taken,
    Pending,
    Overdue,
}

impl DoseStatus {
    pub fn label(self) -> &'static str {
        match self {
            DoseStatus::Taken => "Taken",
            DoseStatus::Pending => "Pending",
            DoseStatus::Overdue => "Overdue",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            DoseStatus::Taken => "✅",
            DoseStatus::Pending => "🕒",
            DoseStatus::Overdue => "⚠️",
        }
    }

    /// Whether the "mark taken" action should be offered.
    pub fn can_mark_taken(self) -> bool {
        self != DoseStatus::Taken
    }
}

impl fmt::Display for DoseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn grace_window() -> Duration {
    Duration::minutes(GRACE_WINDOW_MINUTES)
}

/// First log in `logs` for the medication on `date`.
///
/// Storage keeps one log per medication per day, so order only matters for
/// hand-built inputs.
pub fn todays_log(
    medication_id: Uuid,
    logs: &[MedicationLog],
    date: NaiveDate,
) -> Option<&MedicationLog> {
    logs.iter()
        .find(|log| log.medication_id == medication_id && log.log_date == date)
}

pub fn dose_status<Tz: TimeZone>(
    medication: &Medication,
    logs: &[MedicationLog],
    now: &DateTime<Tz>,
) -> DoseStatus {
    let local_now = now.naive_local();
    let today = local_now.date();

    if todays_log(medication.id, logs, today).is_some_and(|log| log.taken) {
        return DoseStatus::Taken;
    }

    let scheduled = today.and_time(whole_minute(medication.time));
    let overdue_after = scheduled + grace_window();

    if local_now > overdue_after {
        DoseStatus::Overdue
    } else {
        DoseStatus::Pending
    }
}

/// Evaluates every medication independently, preserving input order.
pub fn today_statuses<'a, Tz: TimeZone>(
    medications: &'a [Medication],
    logs: &[MedicationLog],
    now: &DateTime<Tz>,
) -> Vec<(&'a Medication, DoseStatus)> {
    medications
        .iter()
        .map(|medication| (medication, dose_status(medication, logs, now)))
        .collect()
}

fn whole_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::models::Frequency;
    use chrono::{FixedOffset, Utc};

    pub(crate) fn medication_at(hour: u32, minute: u32) -> Medication {
        Medication {
            id: Uuid::new_v4(),
            user_id: 42,
            name: "Aspirin".to_string(),
            dosage: "100mg".to_string(),
            frequency: Frequency::OnceDaily,
            time: NaiveTime::from_hms_opt(hour, minute, 0).unwrap(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    pub(crate) fn log_for(medication: &Medication, date: NaiveDate, taken: bool) -> MedicationLog {
        MedicationLog {
            id: Uuid::new_v4(),
            medication_id: medication.id,
            user_id: medication.user_id,
            log_date: date,
            taken,
            taken_at: Utc::now(),
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    fn at(date: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.from_utc_datetime(&date.and_hms_opt(hour, minute, 0).unwrap())
    }

    #[test]
    fn pending_within_grace_window() {
        let med = medication_at(8, 0);
        assert_eq!(dose_status(&med, &[], &at(day(), 8, 29)), DoseStatus::Pending);
    }

    #[test]
    fn overdue_after_grace_window() {
        let med = medication_at(8, 0);
        assert_eq!(dose_status(&med, &[], &at(day(), 8, 31)), DoseStatus::Overdue);
    }

    #[test]
    fn exactly_at_threshold_is_still_pending() {
        let med = medication_at(8, 0);
        assert_eq!(dose_status(&med, &[], &at(day(), 8, 30)), DoseStatus::Pending);

        let just_after = at(day(), 8, 30) + Duration::seconds(1);
        assert_eq!(dose_status(&med, &[], &just_after), DoseStatus::Overdue);
    }

    #[test]
    fn taken_today_wins_regardless_of_time() {
        let med = medication_at(8, 0);
        let logs = vec![log_for(&med, day(), true)];
        assert_eq!(dose_status(&med, &logs, &at(day(), 23, 59)), DoseStatus::Taken);
        assert_eq!(dose_status(&med, &logs, &at(day(), 0, 0)), DoseStatus::Taken);
    }

    #[test]
    fn untaken_log_follows_time_rule() {
        let med = medication_at(8, 0);
        let logs = vec![log_for(&med, day(), false)];
        assert_eq!(dose_status(&med, &logs, &at(day(), 8, 0)), DoseStatus::Pending);
        assert_eq!(dose_status(&med, &logs, &at(day(), 9, 0)), DoseStatus::Overdue);
    }

    #[test]
    fn yesterdays_log_does_not_count_today() {
        let med = medication_at(8, 0);
        let yesterday = day().pred_opt().unwrap();
        let logs = vec![log_for(&med, yesterday, true)];
        assert_eq!(dose_status(&med, &logs, &at(day(), 9, 0)), DoseStatus::Overdue);
    }

    #[test]
    fn other_medications_logs_are_ignored() {
        let med = medication_at(8, 0);
        let other = medication_at(8, 0);
        let logs = vec![log_for(&other, day(), true)];
        assert_eq!(dose_status(&med, &logs, &at(day(), 9, 0)), DoseStatus::Overdue);
    }

    #[test]
    fn late_dose_resets_after_midnight() {
        let med = medication_at(23, 50);
        let next_day = day().succ_opt().unwrap();
        assert_eq!(dose_status(&med, &[], &at(next_day, 0, 5)), DoseStatus::Pending);
        assert_eq!(dose_status(&med, &[], &at(next_day, 0, 10)), DoseStatus::Pending);
    }

    #[test]
    fn first_matching_log_decides() {
        let med = medication_at(8, 0);
        let logs = vec![log_for(&med, day(), false), log_for(&med, day(), true)];
        assert_eq!(dose_status(&med, &logs, &at(day(), 9, 0)), DoseStatus::Overdue);
    }

    #[test]
    fn seconds_in_scheduled_time_are_ignored() {
        let mut med = medication_at(8, 0);
        med.time = NaiveTime::from_hms_opt(8, 0, 45).unwrap();
        assert_eq!(
            dose_status(&med, &[], &(at(day(), 8, 30) + Duration::seconds(10))),
            DoseStatus::Overdue
        );
    }

    #[test]
    fn same_inputs_give_same_status() {
        let med = medication_at(8, 0);
        let logs = vec![log_for(&med, day(), false)];
        let now = at(day(), 8, 45);
        assert_eq!(dose_status(&med, &logs, &now), dose_status(&med, &logs, &now));
    }

    #[test]
    fn today_follows_the_offset_of_now() {
        // 23:00 UTC on the 10th is already 01:00 on the 11th at +02:00.
        let med = medication_at(0, 15);
        let logs = vec![log_for(&med, day(), true)];
        let utc_now = at(day(), 23, 0);
        let local_now = utc_now.with_timezone(&FixedOffset::east_opt(2 * 3600).unwrap());

        assert_eq!(dose_status(&med, &logs, &utc_now), DoseStatus::Taken);
        assert_eq!(dose_status(&med, &logs, &local_now), DoseStatus::Overdue);
    }

    #[test]
    fn statuses_are_independent_per_medication() {
        let meds = vec![medication_at(7, 0), medication_at(12, 0), medication_at(20, 0)];
        let logs = vec![log_for(&meds[0], day(), true)];

        let statuses: Vec<DoseStatus> = today_statuses(&meds, &logs, &at(day(), 12, 45))
            .into_iter()
            .map(|(_, status)| status)
            .collect();

        assert_eq!(
            statuses,
            vec![DoseStatus::Taken, DoseStatus::Overdue, DoseStatus::Pending]
        );
    }

    #[test]
    fn only_untaken_doses_offer_mark_taken() {
        assert!(!DoseStatus::Taken.can_mark_taken());
        assert!(DoseStatus::Pending.can_mark_taken());
        assert!(DoseStatus::Overdue.can_mark_taken());
    }
}
