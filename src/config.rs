use envconfig::Envconfig;

use crate::validation::{parse_utc_offset, ValidationError};

/// Settings read from the environment. Call `dotenvy::dotenv()` first to pick
/// up a local `.env` file.
#[derive(Envconfig, Debug, Clone)]
pub struct Config {
    #[envconfig(from = "TELEGRAM_BOT_TOKEN")]
    pub telegram_bot_token: String,

    #[envconfig(from = "DATABASE_URL")]
    pub database_url: String,

    /// Six-field cron expression (with seconds) for the reminder sweep.
    #[envconfig(from = "REMINDER_CRON", default = "0 * * * * *")]
    pub reminder_cron: String,

    /// UTC offset given to new accounts until they run /timezone.
    #[envconfig(from = "DEFAULT_UTC_OFFSET", default = "+00:00")]
    pub default_utc_offset: String,
}

impl Config {
    pub fn default_offset_minutes(&self) -> Result<i32, ValidationError> {
        parse_utc_offset(&self.default_utc_offset)
    }
}

/// Account defaults handed to bot endpoints.
#[derive(Debug, Clone, Copy)]
pub struct AccountDefaults {
    pub utc_offset_minutes: i32,
}
