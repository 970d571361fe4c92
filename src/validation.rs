//! Field checks for chat input before anything reaches the database.

use std::sync::LazyLock;

use chrono::NaiveTime;
use regex::Regex;
use thiserror::Error;

use crate::db::models::{Frequency, NewMedication};

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex should not panic")
});

/// Largest offset from UTC any real timezone uses, in minutes.
pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Medication name is required")]
    NameRequired,
    #[error("Medication name must be at least 2 characters")]
    NameTooShort,
    #[error("That looks like a command. Send the medication name, or /cancel to stop")]
    NameIsCommand,
    #[error("Dosage is required")]
    DosageRequired,
    #[error("Frequency must be one of: {}", frequency_choices())]
    UnknownFrequency,
    #[error("Time is required")]
    TimeRequired,
    #[error("Time must be in HH:MM format")]
    InvalidTime,
    #[error("Please enter a valid email address or leave blank to remove")]
    InvalidEmail,
    #[error("Offset must look like +02:00 or -05:30 and stay within 14 hours of UTC")]
    InvalidOffset,
}

fn frequency_choices() -> String {
    Frequency::ALL
        .iter()
        .map(|f| f.label())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn validate_name(input: &str) -> Result<String, ValidationError> {
    let name = input.trim();
    if name.is_empty() {
        return Err(ValidationError::NameRequired);
    }
    if name.starts_with('/') {
        return Err(ValidationError::NameIsCommand);
    }
    if name.chars().count() < 2 {
        return Err(ValidationError::NameTooShort);
    }
    Ok(name.to_string())
}

pub fn validate_dosage(input: &str) -> Result<String, ValidationError> {
    let dosage = input.trim();
    if dosage.is_empty() {
        return Err(ValidationError::DosageRequired);
    }
    Ok(dosage.to_string())
}

pub fn validate_frequency(input: &str) -> Result<Frequency, ValidationError> {
    Frequency::parse(input).ok_or(ValidationError::UnknownFrequency)
}

/// Parses a 24-hour `HH:MM` time of day.
pub fn validate_time(input: &str) -> Result<NaiveTime, ValidationError> {
    let raw = input.trim();
    if raw.is_empty() {
        return Err(ValidationError::TimeRequired);
    }

    let (hours, minutes) = raw.split_once(':').ok_or(ValidationError::InvalidTime)?;
    if !is_clock_field(hours) || minutes.len() != 2 || !is_clock_field(minutes) {
        return Err(ValidationError::InvalidTime);
    }
    let hours: u32 = hours.parse().map_err(|_| ValidationError::InvalidTime)?;
    let minutes: u32 = minutes.parse().map_err(|_| ValidationError::InvalidTime)?;

    NaiveTime::from_hms_opt(hours, minutes, 0).ok_or(ValidationError::InvalidTime)
}

/// Validates every field of the add-medication form at once.
pub fn validate_new_medication(
    name: &str,
    dosage: &str,
    frequency: &str,
    time: &str,
) -> Result<NewMedication, Vec<ValidationError>> {
    let name = validate_name(name);
    let dosage = validate_dosage(dosage);
    let frequency = validate_frequency(frequency);
    let time = validate_time(time);

    match (name, dosage, frequency, time) {
        (Ok(name), Ok(dosage), Ok(frequency), Ok(time)) => Ok(NewMedication {
            name,
            dosage,
            frequency,
            time,
        }),
        (name, dosage, frequency, time) => Err([
            name.err(),
            dosage.err(),
            frequency.err(),
            time.err(),
        ]
        .into_iter()
        .flatten()
        .collect()),
    }
}

/// Blank input clears the caretaker and yields `None`.
pub fn validate_caretaker_email(input: &str) -> Result<Option<String>, ValidationError> {
    let email = input.trim();
    if email.is_empty() {
        return Ok(None);
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(Some(email.to_string()))
}

/// Parses `+HH:MM`, `-HH:MM`, `Z` or `UTC` into minutes east of UTC.
pub fn parse_utc_offset(input: &str) -> Result<i32, ValidationError> {
    let raw = input.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return Ok(0);
    }

    let (sign, rest) = match raw.chars().next() {
        Some('+') => (1, &raw[1..]),
        Some('-') => (-1, &raw[1..]),
        _ => return Err(ValidationError::InvalidOffset),
    };

    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "00"));
    if !is_clock_field(hours) || minutes.len() != 2 || !is_clock_field(minutes) {
        return Err(ValidationError::InvalidOffset);
    }
    let hours: i32 = hours.parse().map_err(|_| ValidationError::InvalidOffset)?;
    let minutes: i32 = minutes.parse().map_err(|_| ValidationError::InvalidOffset)?;
    if minutes >= 60 {
        return Err(ValidationError::InvalidOffset);
    }

    let total = sign * (hours * 60 + minutes);
    if total.abs() > MAX_UTC_OFFSET_MINUTES {
        return Err(ValidationError::InvalidOffset);
    }
    Ok(total)
}

fn is_clock_field(field: &str) -> bool {
    (1..=2).contains(&field.len()) && field.chars().all(|c| c.is_ascii_digit())
}

pub fn format_utc_offset(minutes: i32) -> String {
    let sign = if minutes < 0 { '-' } else { '+' };
    let minutes = minutes.abs();
    format!("{}{:02}:{:02}", sign, minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_trimmed_and_needs_two_characters() {
        assert_eq!(validate_name("  Aspirin "), Ok("Aspirin".to_string()));
        assert_eq!(validate_name("   "), Err(ValidationError::NameRequired));
        assert_eq!(validate_name(" A "), Err(ValidationError::NameTooShort));
        assert_eq!(validate_name("Zä"), Ok("Zä".to_string()));
    }

    #[test]
    fn name_rejects_slash_commands() {
        assert_eq!(validate_name("/meds"), Err(ValidationError::NameIsCommand));
        assert_eq!(validate_name("  /unknown "), Err(ValidationError::NameIsCommand));
        assert_eq!(validate_name("Aspirin/Codeine"), Ok("Aspirin/Codeine".to_string()));
    }

    #[test]
    fn dosage_is_free_form_but_required() {
        assert_eq!(validate_dosage("2 puffs"), Ok("2 puffs".to_string()));
        assert_eq!(validate_dosage(""), Err(ValidationError::DosageRequired));
    }

    #[test]
    fn time_accepts_24_hour_clock() {
        assert_eq!(validate_time("08:00"), Ok(NaiveTime::from_hms_opt(8, 0, 0).unwrap()));
        assert_eq!(validate_time("8:05"), Ok(NaiveTime::from_hms_opt(8, 5, 0).unwrap()));
        assert_eq!(validate_time("23:59"), Ok(NaiveTime::from_hms_opt(23, 59, 0).unwrap()));
        assert_eq!(validate_time(""), Err(ValidationError::TimeRequired));
        for bad in ["24:00", "12:60", "noon", "12", "12:5", "-1:00", "12:00:00"] {
            assert_eq!(validate_time(bad), Err(ValidationError::InvalidTime), "{bad}");
        }
    }

    #[test]
    fn form_reports_every_failing_field() {
        let errors = validate_new_medication("", "", "weekly", "25:00").unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::NameRequired,
                ValidationError::DosageRequired,
                ValidationError::UnknownFrequency,
                ValidationError::InvalidTime,
            ]
        );
    }

    #[test]
    fn form_builds_new_medication() {
        let new = validate_new_medication(" Metformin ", "500mg", "Twice daily", "19:30").unwrap();
        assert_eq!(new.name, "Metformin");
        assert_eq!(new.frequency, Frequency::TwiceDaily);
        assert_eq!(new.time, NaiveTime::from_hms_opt(19, 30, 0).unwrap());
    }

    #[test]
    fn unknown_frequency_lists_choices() {
        let message = ValidationError::UnknownFrequency.to_string();
        assert!(message.contains("Once daily"));
        assert!(message.contains("As needed"));
    }

    #[test]
    fn caretaker_email_shape() {
        assert_eq!(
            validate_caretaker_email(" nurse@example.com "),
            Ok(Some("nurse@example.com".to_string()))
        );
        assert_eq!(validate_caretaker_email(""), Ok(None));
        for bad in ["nurse", "nurse@example", "nurse @example.com", "@example.com", "a@b@c.d"] {
            assert_eq!(
                validate_caretaker_email(bad),
                Err(ValidationError::InvalidEmail),
                "{bad}"
            );
        }
    }

    #[test]
    fn utc_offsets() {
        assert_eq!(parse_utc_offset("+02:00"), Ok(120));
        assert_eq!(parse_utc_offset("-05:30"), Ok(-330));
        assert_eq!(parse_utc_offset("+9"), Ok(540));
        assert_eq!(parse_utc_offset("UTC"), Ok(0));
        assert_eq!(parse_utc_offset("+14:00"), Ok(840));
        assert_eq!(parse_utc_offset("+14:30"), Err(ValidationError::InvalidOffset));
        assert_eq!(parse_utc_offset("02:00"), Err(ValidationError::InvalidOffset));
        assert_eq!(parse_utc_offset("+02:75"), Err(ValidationError::InvalidOffset));
        assert_eq!(format_utc_offset(-330), "-05:30");
        assert_eq!(format_utc_offset(0), "+00:00");
    }
}
