use chrono::{DateTime, Duration, FixedOffset, Utc};
use futures::future;
use teloxide::prelude::*;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::{
    db::{
        models::{Medication, MedicationLog, User},
        Db,
    },
    errors::Result,
    status::{dose_status, DoseStatus, GRACE_WINDOW_MINUTES},
    utils::{escape_markdown, format_time},
};

pub mod ledger;

pub use ledger::ReminderLedger;

/// Schedules the overdue-dose reminder job.
///
/// On every tick of `cron` the job walks all accounts and sends each user one
/// message per medication that became overdue today. The returned scheduler
/// must be kept alive for the job to keep running.
pub async fn schedule_reminders(
    db: Db,
    bot: Bot,
    ledger: ReminderLedger,
    cron: &str,
) -> Result<JobScheduler> {
    let sched = JobScheduler::new().await?;

    let job = Job::new_async(cron, move |_uuid, _l| {
        let bot = bot.clone();
        let db = db.clone();
        let ledger = ledger.clone();
        Box::pin(async move {
            match check_and_remind_overdue(&db, &bot, &ledger, Utc::now()).await {
                Ok(sent) if sent > 0 => log::info!("Sent {} overdue dose reminder(s)", sent),
                Ok(_) => log::debug!("No overdue doses"),
                Err(e) => log::error!("Error checking overdue doses: {}", e),
            }
        })
    })
    .map_err(|e| {
        log::error!("Failed to create reminder job: {}", e);
        e
    })?;

    sched.add(job).await.map_err(|e| {
        log::error!("Failed to add reminder job to scheduler: {}", e);
        e
    })?;

    sched.start().await?;

    log::info!("Reminder scheduler started with schedule {:?}", cron);
    Ok(sched)
}

/// Medications whose dose is overdue at `now`, in input order.
pub fn overdue_medications<'a>(
    medications: &'a [Medication],
    logs: &[MedicationLog],
    now: &DateTime<FixedOffset>,
) -> Vec<&'a Medication> {
    medications
        .iter()
        .filter(|medication| dose_status(medication, logs, now) == DoseStatus::Overdue)
        .collect()
}

/// Runs one reminder sweep over every account. Returns how many reminders went out.
///
/// A failure for one account is logged and does not stop the sweep.
pub async fn check_and_remind_overdue(
    db: &Db,
    bot: &Bot,
    ledger: &ReminderLedger,
    now: DateTime<Utc>,
) -> Result<usize> {
    ledger.prune_before(now.date_naive() - Duration::days(2));

    let users = db.list_users().await?;
    let mut sent = 0;

    for user in &users {
        match remind_user(db, bot, ledger, user, now).await {
            Ok(count) => sent += count,
            Err(e) => log::error!("Failed to check reminders for user {}: {}", user.id, e),
        }
    }

    Ok(sent)
}

async fn remind_user(
    db: &Db,
    bot: &Bot,
    ledger: &ReminderLedger,
    user: &User,
    now: DateTime<Utc>,
) -> Result<usize> {
    let local_now = user.local_now(now);
    let today = local_now.date_naive();

    let medications = db.list_medications(user.id).await?;
    if medications.is_empty() {
        return Ok(0);
    }
    let logs = db.logs_for_date(user.id, today).await?;

    let due: Vec<&Medication> = overdue_medications(&medications, &logs, &local_now)
        .into_iter()
        .filter(|medication| ledger.claim(medication.id, today))
        .collect();

    let chat_id = ChatId(user.chat_id);
    let results = future::join_all(
        due.iter()
            .map(|medication| send_overdue_reminder(bot, chat_id, medication)),
    )
    .await;

    let mut delivered = 0;
    for (medication, result) in due.iter().zip(results) {
        match result {
            Ok(()) => delivered += 1,
            Err(e) => {
                log::error!("Failed to send reminder for {}: {}", medication.id, e);
                ledger.release(medication.id, today);
            }
        }
    }

    Ok(delivered)
}

pub fn reminder_message(medication: &Medication) -> String {
    format!(
        "⏰ *Dose reminder*\n\n\
        *{}* {} was due at `{}` and is more than {} minutes late\\.\n\
        Use /meds to mark it as taken\\.",
        escape_markdown(&medication.name),
        escape_markdown(&medication.dosage),
        format_time(medication.time),
        GRACE_WINDOW_MINUTES,
    )
}

async fn send_overdue_reminder(
    bot: &Bot,
    chat_id: ChatId,
    medication: &Medication,
) -> std::result::Result<(), teloxide::RequestError> {
    bot.send_message(chat_id, reminder_message(medication))
        .parse_mode(teloxide::types::ParseMode::MarkdownV2)
        .await?;
    Ok(())
}
