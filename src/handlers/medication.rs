use chrono::Utc;
use teloxide::{
    prelude::*,
    types::{KeyboardButton, KeyboardMarkup, KeyboardRemove, ParseMode},
};

use super::{ensure_user, reply_unknown_sender, MyDialogue, State};
use crate::{
    config::AccountDefaults,
    db::{
        models::{Frequency, Medication},
        Db,
    },
    errors::HandlerResult,
    status::{dose_status, today_statuses, DoseStatus},
    utils::{escape_markdown, format_time, medications_message},
    validation::{validate_dosage, validate_frequency, validate_name, validate_new_medication},
};

/// Starts the add-medication form.
pub async fn start_add(bot: Bot, msg: Message, dialogue: MyDialogue) -> HandlerResult {
    log::info!("Starting add-medication dialogue in chat {}", msg.chat.id);
    bot.send_message(
        msg.chat.id,
        "Let's add a medication. What is its name? (e.g. Aspirin)\nSend /cancel to stop.",
    )
    .reply_markup(KeyboardRemove::new())
    .await?;
    dialogue.update(State::ReceiveName).await?;
    Ok(())
}

pub async fn receive_name(bot: Bot, dialogue: MyDialogue, msg: Message) -> HandlerResult {
    let Some(text) = msg.text() else {
        bot.send_message(msg.chat.id, "Please send the name as text.")
            .await?;
        return Ok(());
    };

    match validate_name(text) {
        Ok(name) => {
            bot.send_message(msg.chat.id, "What is the dosage? (e.g. 100mg)")
                .await?;
            dialogue.update(State::ReceiveDosage { name }).await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, e.to_string()).await?;
        }
    }
    Ok(())
}

pub async fn receive_dosage(
    bot: Bot,
    dialogue: MyDialogue,
    name: String,
    msg: Message,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        bot.send_message(msg.chat.id, "Please send the dosage as text.")
            .await?;
        return Ok(());
    };

    match validate_dosage(text) {
        Ok(dosage) => {
            bot.send_message(msg.chat.id, "How often do you take it?")
                .reply_markup(frequency_keyboard())
                .await?;
            dialogue
                .update(State::ReceiveFrequency { name, dosage })
                .await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, e.to_string()).await?;
        }
    }
    Ok(())
}

pub async fn receive_frequency(
    bot: Bot,
    dialogue: MyDialogue,
    (name, dosage): (String, String),
    msg: Message,
) -> HandlerResult {
    match validate_frequency(msg.text().unwrap_or_default()) {
        Ok(frequency) => {
            bot.send_message(
                msg.chat.id,
                "At what time of day? Use 24-hour HH:MM, e.g. 08:00.",
            )
            .reply_markup(KeyboardRemove::new())
            .await?;
            dialogue
                .update(State::ReceiveTime {
                    name,
                    dosage,
                    frequency,
                })
                .await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, e.to_string())
                .reply_markup(frequency_keyboard())
                .await?;
        }
    }
    Ok(())
}

/// Last step of the form: validates the whole entry and stores it.
pub async fn receive_time(
    bot: Bot,
    dialogue: MyDialogue,
    (name, dosage, frequency): (String, String, Frequency),
    msg: Message,
    db: Db,
    defaults: AccountDefaults,
) -> HandlerResult {
    let time = msg.text().unwrap_or_default();
    let new = match validate_new_medication(&name, &dosage, frequency.label(), time) {
        Ok(new) => new,
        Err(errors) => {
            let message = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("\n");
            bot.send_message(msg.chat.id, message).await?;
            return Ok(());
        }
    };

    let Some(user) = ensure_user(&db, &msg, defaults).await? else {
        reply_unknown_sender(&bot, &msg).await?;
        return Ok(());
    };

    let medication = db.add_medication(user.id, &new).await?;
    log::info!("User {} added medication {}", user.id, medication.id);

    bot.send_message(
        msg.chat.id,
        format!(
            "Added {} ({}), {}, at {}. See /meds for today's status.",
            medication.name,
            medication.dosage,
            medication.frequency,
            format_time(medication.time)
        ),
    )
    .await?;
    dialogue.exit().await?;
    Ok(())
}

/// Lists the sender's medications with today's dose status.
pub async fn list_medications(
    bot: Bot,
    msg: Message,
    db: Db,
    defaults: AccountDefaults,
) -> HandlerResult {
    let Some(user) = ensure_user(&db, &msg, defaults).await? else {
        reply_unknown_sender(&bot, &msg).await?;
        return Ok(());
    };

    log::info!("Listing medications for user {}", user.id);
    let now = user.local_now(Utc::now());
    let today = now.date_naive();
    let medications = db.list_medications(user.id).await?;
    let logs = db.logs_for_date(user.id, today).await?;

    let statuses = today_statuses(&medications, &logs, &now);
    bot.send_message(msg.chat.id, medications_message(&statuses, &logs, &now))
        .parse_mode(ParseMode::MarkdownV2)
        .await?;
    Ok(())
}

/// Marks the medication picked by `selector` (list number or name) as taken today.
pub async fn mark_taken(
    bot: Bot,
    msg: Message,
    selector: String,
    db: Db,
    defaults: AccountDefaults,
) -> HandlerResult {
    let Some(user) = ensure_user(&db, &msg, defaults).await? else {
        reply_unknown_sender(&bot, &msg).await?;
        return Ok(());
    };

    if selector.trim().is_empty() {
        bot.send_message(
            msg.chat.id,
            "Tell me which one, e.g. /taken 1 or /taken Aspirin. See /meds for the list.",
        )
        .await?;
        return Ok(());
    }

    let now_utc = Utc::now();
    let now = user.local_now(now_utc);
    let today = now.date_naive();
    let medications = db.list_medications(user.id).await?;

    let Some(medication) = select_medication(&medications, &selector) else {
        bot.send_message(
            msg.chat.id,
            format!("No medication matches \"{}\". See /meds.", selector.trim()),
        )
        .await?;
        return Ok(());
    };

    let logs = db.logs_for_date(user.id, today).await?;
    if !dose_status(medication, &logs, &now).can_mark_taken() {
        bot.send_message(
            msg.chat.id,
            format!("{} is already marked as taken today.", medication.name),
        )
        .await?;
        return Ok(());
    }

    db.mark_taken(user.id, medication.id, today, now_utc).await?;
    log::info!("User {} took medication {} on {}", user.id, medication.id, today);

    bot.send_message(
        msg.chat.id,
        format!(
            "{} *{}* marked as taken\\.",
            DoseStatus::Taken.emoji(),
            escape_markdown(&medication.name)
        ),
    )
    .parse_mode(ParseMode::MarkdownV2)
    .await?;
    Ok(())
}

/// Resolves a 1-based list position, an exact name, or a unique name prefix.
pub fn select_medication<'a>(
    medications: &'a [Medication],
    selector: &str,
) -> Option<&'a Medication> {
    let selector = selector.trim();
    if let Ok(position) = selector.parse::<usize>() {
        return position
            .checked_sub(1)
            .and_then(|index| medications.get(index));
    }

    let wanted = selector.to_lowercase();
    if let Some(exact) = medications
        .iter()
        .find(|m| m.name.to_lowercase() == wanted)
    {
        return Some(exact);
    }

    let mut prefixed = medications
        .iter()
        .filter(|m| m.name.to_lowercase().starts_with(&wanted));
    match (prefixed.next(), prefixed.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

fn frequency_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(
        Frequency::ALL
            .iter()
            .map(|f| vec![KeyboardButton::new(f.label())]),
    )
    .resize_keyboard()
    .one_time_keyboard()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::tests::medication_at;

    fn named(name: &str) -> Medication {
        let mut medication = medication_at(8, 0);
        medication.name = name.to_string();
        medication
    }

    #[test]
    fn selects_by_position() {
        let meds = vec![named("Aspirin"), named("Metformin")];
        assert_eq!(select_medication(&meds, "2").map(|m| m.name.as_str()), Some("Metformin"));
        assert!(select_medication(&meds, "0").is_none());
        assert!(select_medication(&meds, "3").is_none());
    }

    #[test]
    fn selects_by_name_ignoring_case() {
        let meds = vec![named("Aspirin"), named("Metformin")];
        assert_eq!(
            select_medication(&meds, " aspirin ").map(|m| m.name.as_str()),
            Some("Aspirin")
        );
        assert_eq!(select_medication(&meds, "met").map(|m| m.name.as_str()), Some("Metformin"));
    }

    #[test]
    fn ambiguous_prefix_selects_nothing() {
        let meds = vec![named("Metoprolol"), named("Metformin")];
        assert!(select_medication(&meds, "met").is_none());
        assert_eq!(
            select_medication(&meds, "metformin").map(|m| m.name.as_str()),
            Some("Metformin")
        );
    }

    #[test]
    fn exact_name_beats_longer_prefix_match() {
        let meds = vec![named("Vitamin D3"), named("Vitamin D")];
        assert_eq!(
            select_medication(&meds, "vitamin d").map(|m| m.name.as_str()),
            Some("Vitamin D")
        );
    }
}
