use teloxide::prelude::*;

use super::{ensure_user, reply_unknown_sender};
use crate::{
    config::AccountDefaults,
    db::Db,
    errors::HandlerResult,
    validation::{validate_caretaker_email, ValidationError},
};

/// What a `/caretaker` argument asks for.
#[derive(Debug, PartialEq, Eq)]
pub enum CaretakerAction {
    Show,
    Save(Option<String>),
}

/// No argument shows the current caretaker; `clear`, `none` or `-` remove it;
/// anything else must be an email address.
pub fn caretaker_action(arg: &str) -> Result<CaretakerAction, ValidationError> {
    let arg = arg.trim();
    if arg.is_empty() {
        return Ok(CaretakerAction::Show);
    }
    if ["clear", "none", "-"].iter().any(|word| arg.eq_ignore_ascii_case(word)) {
        return Ok(CaretakerAction::Save(None));
    }
    validate_caretaker_email(arg).map(CaretakerAction::Save)
}

pub async fn caretaker(
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
    let user_id = user.id;

    let action = match caretaker_action(&arg) {
        Ok(action) => action,
        Err(e) => {
            bot.send_message(msg.chat.id, e.to_string()).await?;
            return Ok(());
        }
    };

    let reply = match action {
        CaretakerAction::Show => match db.caretaker_email(user_id).await? {
            Some(email) => format!(
                "Current caretaker: {}\nSend /caretaker <email> to change it or /caretaker clear to remove it.",
                email
            ),
            None => "No caretaker set. Send /caretaker <email> to add one who should hear about missed doses."
                .to_string(),
        },
        CaretakerAction::Save(email) => {
            db.save_caretaker_email(user_id, email.as_deref()).await?;
            log::info!("User {} updated caretaker email", user_id);
            match email {
                Some(email) => format!("Email saved successfully. Current caretaker: {}", email),
                None => "Caretaker removed.".to_string(),
            }
        }
    };

    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}
