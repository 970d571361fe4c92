use dotenvy::dotenv;
use envconfig::Envconfig;
use teloxide::{
    dispatching::{
        dialogue::{self, InMemStorage},
        Dispatcher, UpdateFilterExt,
    },
    prelude::*,
    types::{KeyboardButton, KeyboardMarkup, KeyboardRemove, ReplyMarkup},
    utils::command::BotCommands,
};

use medsbuddy::{
    config::{AccountDefaults, Config},
    db::{self, Db},
    errors::{AppError, HandlerResult},
    handlers::{account, caretaker, medication, MyDialogue, State},
    services::{schedule_reminders, ReminderLedger},
};

const MENU_MEDICATIONS: &str = "💊 My Medications";
const MENU_ADD: &str = "➕ Add Medication";
const MENU_HELP: &str = "❓ Help";

#[derive(BotCommands, Debug, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
enum Command {
    #[command(description = "Register and show a welcome message.")]
    Start,
    #[command(description = "Display help information about available commands.")]
    Help,
    #[command(description = "Display the main menu.")]
    Menu,
    #[command(description = "Add a medication.")]
    Add,
    #[command(description = "Stop adding a medication.")]
    Cancel,
    #[command(description = "List medications with today's dose status.")]
    Meds,
    #[command(description = "Mark a dose as taken, e.g. /taken 1 or /taken Aspirin.")]
    Taken(String),
    #[command(description = "Show, set or clear the caretaker email.")]
    Caretaker(String),
    #[command(description = "Show or set your UTC offset, e.g. /timezone +02:00.")]
    Timezone(String),
    #[command(description = "Download your medications as JSON.")]
    Export,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize the logger with default settings or "info" level if not specified
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    log::info!("Starting MedsBuddy...");

    // Load environment variables from a .env file if present
    dotenv().ok();

    let config = Config::init_from_env()?;
    let defaults = AccountDefaults {
        utc_offset_minutes: config.default_offset_minutes()?,
    };

    let db = db::init_db(&config.database_url).await?;

    let bot = Bot::new(&config.telegram_bot_token);

    let mut scheduler = schedule_reminders(
        db.clone(),
        bot.clone(),
        ReminderLedger::new(),
        &config.reminder_cron,
    )
    .await?;

    let handler = dialogue::enter::<Update, InMemStorage<State>, State, _>().branch(
        Update::filter_message()
            // Commands work in every dialogue state
            .branch(dptree::entry().filter_command::<Command>().endpoint(answer))
            // Add-medication form steps
            .branch(dptree::case![State::ReceiveName].endpoint(medication::receive_name))
            .branch(
                dptree::case![State::ReceiveDosage { name }].endpoint(medication::receive_dosage),
            )
            .branch(
                dptree::case![State::ReceiveFrequency { name, dosage }]
                    .endpoint(medication::receive_frequency),
            )
            .branch(
                dptree::case![State::ReceiveTime {
                    name,
                    dosage,
                    frequency
                }]
                .endpoint(medication::receive_time),
            )
            // Menu buttons and everything else
            .branch(dptree::endpoint(handle_message)),
    );

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![db, InMemStorage::<State>::new(), defaults])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    scheduler.shutdown().await?;
    log::info!("Shutting down gracefully");
    Ok(())
}

async fn answer(
    bot: Bot,
    msg: Message,
    cmd: Command,
    db: Db,
    dialogue: MyDialogue,
    defaults: AccountDefaults,
) -> HandlerResult {
    log::info!("Received command {:?} in chat {}", cmd, msg.chat.id);

    match cmd {
        Command::Start => account::start(bot, msg, db, defaults).await?,
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?;
        }
        Command::Menu => {
            let keyboard = KeyboardMarkup::new(vec![
                vec![KeyboardButton::new(MENU_MEDICATIONS)],
                vec![KeyboardButton::new(MENU_ADD)],
                vec![KeyboardButton::new(MENU_HELP)],
            ])
            .resize_keyboard();

            bot.send_message(msg.chat.id, "What would you like to do?")
                .reply_markup(ReplyMarkup::Keyboard(keyboard))
                .await?;
        }
        Command::Add => medication::start_add(bot, msg, dialogue).await?,
        Command::Cancel => {
            dialogue.exit().await?;
            bot.send_message(msg.chat.id, "Cancelled.")
                .reply_markup(KeyboardRemove::new())
                .await?;
        }
        Command::Meds => medication::list_medications(bot, msg, db, defaults).await?,
        Command::Taken(selector) => {
            medication::mark_taken(bot, msg, selector, db, defaults).await?
        }
        Command::Caretaker(arg) => caretaker::caretaker(bot, msg, arg, db, defaults).await?,
        Command::Timezone(arg) => account::timezone(bot, msg, arg, db, defaults).await?,
        Command::Export => account::export(bot, msg, db, defaults).await?,
    }

    Ok(())
}

/// Handles menu buttons and any other text outside of a dialogue.
async fn handle_message(
    bot: Bot,
    msg: Message,
    db: Db,
    dialogue: MyDialogue,
    defaults: AccountDefaults,
) -> HandlerResult {
    match msg.text() {
        Some(MENU_MEDICATIONS) => medication::list_medications(bot, msg, db, defaults).await?,
        Some(MENU_ADD) => medication::start_add(bot, msg, dialogue).await?,
        Some(MENU_HELP) => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?;
        }
        _ => {
            bot.send_message(
                msg.chat.id,
                "I don't understand that. Please use the /menu or type /help for available commands.",
            )
            .await?;
        }
    }
    Ok(())
}
