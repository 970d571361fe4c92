//! Bot endpoints. Each module covers one area of the chat interface.

use teloxide::{
    dispatching::dialogue::{Dialogue, InMemStorage},
    prelude::*,
};

use crate::{
    config::AccountDefaults,
    db::{models::Frequency, models::User, Db},
    errors::Result,
};

pub mod account;
pub mod caretaker;
pub mod medication;

/// Conversation state. The add-medication form collects one field per message.
#[derive(Clone, PartialEq, Debug, Default)]
pub enum State {
    #[default]
    Start,
    ReceiveName,
    ReceiveDosage {
        name: String,
    },
    ReceiveFrequency {
        name: String,
        dosage: String,
    },
    ReceiveTime {
        name: String,
        dosage: String,
        frequency: Frequency,
    },
}

pub type MyDialogue = Dialogue<State, InMemStorage<State>>;

/// Telegram user id of the sender, if the message has one.
pub fn sender_id(msg: &Message) -> Option<i64> {
    msg.from.as_ref().map(|user| user.id.0 as i64)
}

/// Loads the sender's account, registering it on first contact.
pub async fn ensure_user(
    db: &Db,
    msg: &Message,
    defaults: AccountDefaults,
) -> Result<Option<User>> {
    let Some(user_id) = sender_id(msg) else {
        return Ok(None);
    };
    let user = db
        .upsert_user(user_id, msg.chat.id.0, defaults.utc_offset_minutes)
        .await?;
    Ok(Some(user))
}

pub(crate) async fn reply_unknown_sender(bot: &Bot, msg: &Message) -> ResponseResult<()> {
    log::warn!("Message in chat {} has no sender", msg.chat.id);
    bot.send_message(msg.chat.id, "Couldn't identify you. Please message me directly.")
        .await?;
    Ok(())
}
