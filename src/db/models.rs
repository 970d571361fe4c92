use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use phf::phf_map;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DatabaseError;

/// How often a medication is meant to be taken.
///
/// Informational only: reminders and dose status are driven by the single
/// daily `time` of the medication.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    #[serde(rename = "Once daily")]
    OnceDaily,
    #[serde(rename = "Twice daily")]
    TwiceDaily,
    #[serde(rename = "Three times daily")]
    ThreeTimesDaily,
    #[serde(rename = "As needed")]
    AsNeeded,
}

/// Lowercased labels and the short aliases accepted from chat input.
static FREQUENCY_LOOKUP: phf::Map<&'static str, Frequency> = phf_map! {
    "once daily" => Frequency::OnceDaily,
    "once" => Frequency::OnceDaily,
    "twice daily" => Frequency::TwiceDaily,
    "twice" => Frequency::TwiceDaily,
    "three times daily" => Frequency::ThreeTimesDaily,
    "three" => Frequency::ThreeTimesDaily,
    "as needed" => Frequency::AsNeeded,
    "prn" => Frequency::AsNeeded,
};

impl Frequency {
    pub const ALL: [Frequency; 4] = [
        Frequency::OnceDaily,
        Frequency::TwiceDaily,
        Frequency::ThreeTimesDaily,
        Frequency::AsNeeded,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Frequency::OnceDaily => "Once daily",
            Frequency::TwiceDaily => "Twice daily",
            Frequency::ThreeTimesDaily => "Three times daily",
            Frequency::AsNeeded => "As needed",
        }
    }

    /// Looks up a frequency by label or alias, ignoring case and surrounding whitespace.
    pub fn parse(input: &str) -> Option<Self> {
        FREQUENCY_LOOKUP
            .get(input.trim().to_lowercase().as_str())
            .copied()
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A registered account. The id is the Telegram user id.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: i64,
    pub chat_id: i64,
    pub utc_offset_minutes: i32,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// The offset used to decide which calendar day is "today" for this account.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    pub fn local_now(&self, now: DateTime<Utc>) -> DateTime<FixedOffset> {
        now.with_timezone(&self.offset())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Medication {
    pub id: Uuid,
    pub user_id: i64,
    pub name: String,
    pub dosage: String,
    pub frequency: Frequency,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub created_at: DateTime<Utc>,
}

/// A validated medication that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMedication {
    pub name: String,
    pub dosage: String,
    pub frequency: Frequency,
    pub time: NaiveTime,
}

/// Row shape of `medications`; the frequency is stored as its label.
#[derive(sqlx::FromRow, Debug)]
pub struct MedicationRow {
    pub id: Uuid,
    pub user_id: i64,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub dose_time: NaiveTime,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<MedicationRow> for Medication {
    type Error = DatabaseError;

    fn try_from(row: MedicationRow) -> Result<Self, Self::Error> {
        let frequency = Frequency::parse(&row.frequency).ok_or_else(|| {
            DatabaseError::Corrupt(format!(
                "medication {} has unknown frequency {:?}",
                row.id, row.frequency
            ))
        })?;

        Ok(Medication {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            dosage: row.dosage,
            frequency,
            time: row.dose_time,
            created_at: row.created_at,
        })
    }
}

/// Records that a medication was addressed on a calendar day.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MedicationLog {
    pub id: Uuid,
    pub medication_id: Uuid,
    pub user_id: i64,
    #[serde(rename = "date")]
    pub log_date: NaiveDate,
    pub taken: bool,
    pub taken_at: DateTime<Utc>,
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
