use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};

use crate::db::models::{Medication, MedicationLog};
use crate::status::{todays_log, DoseStatus};

/// Helper function to format the date
///
/// This function takes a `NaiveDate` and formats it as a string in the "dd-mm-yyyy" format.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

/// Formats a dose time the way users type it, `HH:MM`.
pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Helper function to escape special characters for Markdown
///
/// Telegram's MarkdownV2 requires every reserved character outside of
/// entities to be preceded by a backslash.
///
/// # Arguments
///
/// * `text` - A string slice containing the text to be escaped
///
/// # Returns
///
/// A `String` with all Markdown special characters escaped
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if "_*[]()~`>#+-=|{}.!\\".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// One numbered MarkdownV2 line per medication, e.g.
/// `2. ⚠️ *Aspirin* 100mg at 08:00 (Once daily): Overdue`.
///
/// `taken_at` is shown for taken doses, in the account's local time.
pub fn medication_line(
    position: usize,
    medication: &Medication,
    status: DoseStatus,
    taken_at: Option<DateTime<FixedOffset>>,
) -> String {
    let taken = match (status, taken_at) {
        (DoseStatus::Taken, Some(at)) => format!(" at {}", format_time(at.time())),
        _ => String::new(),
    };

    format!(
        "{}\\. {} *{}* {} at {} \\({}\\): {}{}",
        position,
        status.emoji(),
        escape_markdown(&medication.name),
        escape_markdown(&medication.dosage),
        escape_markdown(&format_time(medication.time)),
        escape_markdown(medication.frequency.label()),
        status.label(),
        taken,
    )
}

/// The `/meds` listing. `now` carries the account's offset and decides which
/// day's logs are shown.
pub fn medications_message(
    statuses: &[(&Medication, DoseStatus)],
    logs: &[MedicationLog],
    now: &DateTime<FixedOffset>,
) -> String {
    let today = now.date_naive();
    if statuses.is_empty() {
        return "No medications added yet\\. Use /add to create one\\.".to_string();
    }

    let lines = statuses
        .iter()
        .enumerate()
        .map(|(i, (medication, status))| {
            let taken_at = todays_log(medication.id, logs, today)
                .map(|log| log.taken_at.with_timezone(now.offset()));
            medication_line(i + 1, medication, *status, taken_at)
        })
        .collect::<Vec<String>>()
        .join("\n");

    let hint = if statuses.iter().any(|(_, status)| status.can_mark_taken()) {
        "\n\nMark a dose with /taken followed by its number\\."
    } else {
        "\n\nAll doses taken today\\. Well done\\!"
    };

    format!(
        "*Medications for {}*\n\n{}{}",
        escape_markdown(&format_date(today)),
        lines,
        hint
    )
}
