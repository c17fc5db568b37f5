use clap::Subcommand;
use focusloop_core::Database;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's totals
    Today,
    /// All-time totals
    All,
    /// Current and longest consecutive-day focus streaks
    Streaks,
    /// Most recent sessions, newest first
    History {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Delete all recorded sessions
    Reset,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        StatsAction::Today => {
            println!("{}", serde_json::to_string_pretty(&db.stats_today()?)?);
        }
        StatsAction::All => {
            println!("{}", serde_json::to_string_pretty(&db.stats_all()?)?);
        }
        StatsAction::Streaks => {
            println!("{}", serde_json::to_string_pretty(&db.streaks()?)?);
        }
        StatsAction::History { limit } => {
            println!(
                "{}",
                serde_json::to_string_pretty(&db.recent_sessions(limit)?)?
            );
        }
        StatsAction::Reset => {
            let removed = db.reset_sessions()?;
            println!("deleted {removed} sessions");
        }
    }
    Ok(())
}
