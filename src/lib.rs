//! MedsBuddy: a Telegram medication reminder.
//!
//! Users record medications with a daily dose time, mark doses as taken and
//! may store a caretaker email. A background job reminds them about overdue
//! doses. Data lives in Postgres.

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod services;
pub mod status;
pub mod utils;
pub mod validation;
