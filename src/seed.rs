//! Inserts demo medications for one account.
//!
//! Usage: `seed <telegram-user-id> [chat-id]`. The chat id defaults to the
//! user id, which is what private chats use.

use chrono::NaiveTime;
use rand::Rng;

use medsbuddy::{
    db::{self, models::Frequency, models::NewMedication},
    validation::parse_utc_offset,
};

const SEED_MEDICATIONS: [(&str, &str, Frequency); 6] = [
    ("Aspirin", "100mg", Frequency::OnceDaily),
    ("Metformin", "500mg", Frequency::TwiceDaily),
    ("Lisinopril", "10mg", Frequency::OnceDaily),
    ("Amoxicillin", "250mg", Frequency::ThreeTimesDaily),
    ("Levothyroxine", "50mcg", Frequency::OnceDaily),
    ("Albuterol", "2 puffs", Frequency::AsNeeded),
];

fn get_seed_data(rng: &mut impl Rng) -> Vec<NewMedication> {
    SEED_MEDICATIONS
        .iter()
        .filter_map(|(name, dosage, frequency)| {
            // Quarter-hour slots between 06:00 and 21:45.
            let hour = rng.gen_range(6..22);
            let minute = rng.gen_range(0..4) * 15;
            Some(NewMedication {
                name: name.to_string(),
                dosage: dosage.to_string(),
                frequency: *frequency,
                time: NaiveTime::from_hms_opt(hour, minute, 0)?,
            })
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    dotenvy::dotenv().ok();

    let mut args = std::env::args().skip(1);
    let user_id: i64 = args
        .next()
        .ok_or("usage: seed <telegram-user-id> [chat-id]")?
        .parse()?;
    let chat_id: i64 = match args.next() {
        Some(raw) => raw.parse()?,
        None => user_id,
    };

    let database_url = std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL is not set")?;
    let offset = std::env::var("DEFAULT_UTC_OFFSET").unwrap_or_else(|_| "+00:00".to_string());
    let offset = parse_utc_offset(&offset)?;

    let db = db::init_db(&database_url).await?;
    db.upsert_user(user_id, chat_id, offset).await?;

    for new in get_seed_data(&mut rand::thread_rng()) {
        let medication = db.add_medication(user_id, &new).await?;
        log::info!(
            "Seeded {} {} at {} for user {}",
            medication.name,
            medication.dosage,
            medication.time.format("%H:%M"),
            user_id
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn seed_times_fall_on_daytime_quarter_hours() {
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            let meds = get_seed_data(&mut rng);
            assert_eq!(meds.len(), SEED_MEDICATIONS.len());
            for med in meds {
                assert!((6..22).contains(&med.time.hour()));
                assert_eq!(med.time.minute() % 15, 0);
            }
        }
    }
}
