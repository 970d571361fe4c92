use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use teloxide::{prelude::*, types::InputFile};

use super::{ensure_user, reply_unknown_sender};
use crate::{
    config::AccountDefaults,
    db::{
        models::{Medication, MedicationLog, User},
        Db,
    },
    errors::HandlerResult,
    status::{today_statuses, DoseStatus},
    validation::{format_utc_offset, parse_utc_offset},
};

/// Registers the sender and greets them.
pub async fn start(bot: Bot, msg: Message, db: Db, defaults: AccountDefaults) -> HandlerResult {
    let Some(user) = ensure_user(&db, &msg, defaults).await? else {
        reply_unknown_sender(&bot, &msg).await?;
        return Ok(());
    };
    log::info!("User {} started the bot", user.id);

    bot.send_message(
        msg.chat.id,
        format!(
            "Welcome to MedsBuddy!\n\n\
            Add your medications with /add, check today's doses with /meds \
            and mark them with /taken. I'll remind you when a dose is overdue.\n\n\
            Your timezone is UTC{}. Change it with /timezone +02:00.",
            format_utc_offset(user.utc_offset_minutes)
        ),
    )
    .await?;
    Ok(())
}

/// Shows or sets the UTC offset that decides when the user's day starts.
pub async fn timezone(
    bot: Bot,
    msg: Message,
    arg: String,
    db: Db,
    defaults: AccountDefaults,
) -> HandlerResult {
    let Some(user) = ensure_user(&db, &msg, defaults).await? else {
        reply_unknown_sender(&bot, &msg).await?;
        return Ok(());
    };

    if arg.trim().is_empty() {
        bot.send_message(
            msg.chat.id,
            format!(
                "Your timezone is UTC{}. Send e.g. /timezone -05:00 to change it.",
                format_utc_offset(user.utc_offset_minutes)
            ),
        )
        .await?;
        return Ok(());
    }

    match parse_utc_offset(&arg) {
        Ok(minutes) => {
            db.set_utc_offset(user.id, minutes).await?;
            log::info!("User {} set UTC offset to {} minutes", user.id, minutes);
            bot.send_message(
                msg.chat.id,
                format!("Timezone set to UTC{}.", format_utc_offset(minutes)),
            )
            .await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, e.to_string()).await?;
        }
    }
    Ok(())
}

#[derive(Serialize, Debug)]
pub struct ExportedMedication<'a> {
    #[serde(flatten)]
    pub medication: &'a Medication,
    pub status: DoseStatus,
}

#[derive(Serialize, Debug)]
pub struct Export<'a> {
    pub date: NaiveDate,
    pub utc_offset: String,
    pub caretaker_email: Option<String>,
    pub medications: Vec<ExportedMedication<'a>>,
    pub logs: &'a [MedicationLog],
}

pub fn build_export<'a>(
    user: &User,
    caretaker_email: Option<String>,
    medications: &'a [Medication],
    logs: &'a [MedicationLog],
    now: &DateTime<FixedOffset>,
) -> Export<'a> {
    Export {
        date: now.date_naive(),
        utc_offset: format_utc_offset(user.utc_offset_minutes),
        caretaker_email,
        medications: today_statuses(medications, logs, now)
            .into_iter()
            .map(|(medication, status)| ExportedMedication { medication, status })
            .collect(),
        logs,
    }
}

/// Sends the user's medications and today's statuses as a JSON document.
pub async fn export(bot: Bot, msg: Message, db: Db, defaults: AccountDefaults) -> HandlerResult {
    let Some(user) = ensure_user(&db, &msg, defaults).await? else {
        reply_unknown_sender(&bot, &msg).await?;
        return Ok(());
    };

    log::info!("Exporting data for user {}", user.id);
    let now = user.local_now(Utc::now());
    let medications = db.list_medications(user.id).await?;
    let logs = db.logs_for_date(user.id, now.date_naive()).await?;
    let caretaker_email = db.caretaker_email(user.id).await?;

    let export = build_export(&user, caretaker_email, &medications, &logs, &now);
    let json = serde_json::to_vec_pretty(&export)?;

    bot.send_document(
        msg.chat.id,
        InputFile::memory(json).file_name(format!("medsbuddy-{}.json", export.date)),
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::tests::{log_for, medication_at};
    use chrono::TimeZone;

    #[test]
    fn export_carries_statuses_and_settings() {
        let user = User {
            id: 42,
            chat_id: 42,
            utc_offset_minutes: -300,
            created_at: Utc::now(),
        };
        let offset = user.offset();
        let day = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let now = offset
            .from_local_datetime(&day.and_hms_opt(9, 0, 0).unwrap())
            .unwrap();

        let meds = vec![medication_at(8, 0), medication_at(21, 0)];
        let logs = vec![log_for(&meds[1], day, true)];

        let export = build_export(
            &user,
            Some("nurse@example.com".to_string()),
            &meds,
            &logs,
            &now,
        );
        let json = serde_json::to_value(&export).unwrap();

        assert_eq!(json["date"], "2024-06-10");
        assert_eq!(json["utc_offset"], "-05:00");
        assert_eq!(json["caretaker_email"], "nurse@example.com");
        assert_eq!(json["medications"][0]["status"], "Overdue");
        assert_eq!(json["medications"][0]["time"], "08:00");
        assert_eq!(json["medications"][0]["frequency"], "Once daily");
        assert_eq!(json["medications"][1]["status"], "Taken");
        assert_eq!(json["logs"][0]["date"], "2024-06-10");
    }
}
