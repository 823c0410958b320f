//! althingi-ingest - batch driver
//!
//! Retrieves and reconciles parliamentary data from Althingi's public XML
//! feed, one parliament at a time, and derives issue statuses.

use althingi_common::config::Settings;
use althingi_common::Error;
use althingi_ingest::db::parliaments;
use althingi_ingest::status;
use althingi_ingest::sync::{self, SyncContext};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for althingi-ingest
#[derive(Parser, Debug)]
#[command(name = "althingi-ingest")]
#[command(about = "Reconciles Althingi's public XML feed into a local database")]
#[command(version)]
struct Args {
    /// Parliament number or range (e.g. 148 or 130-140; a descending
    /// range is processed in descending order). Defaults to the current
    /// parliament.
    #[arg(short, long)]
    parliament: Option<String>,

    /// Only fetch activity from the last N days (vote castings, speeches)
    #[arg(short, long)]
    days: Option<i64>,

    /// Configuration file (TOML)
    #[arg(short, long, env = "ALTHINGI_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Update upcoming committee agendas and parliamentary sessions
    Upcoming,
    /// Update issues in the selected parliament(s)
    Issues,
    /// Update one issue by issue number
    Issue { issue_num: i64 },
    /// Derive issue statuses in the selected parliament(s)
    IssueStatuses,
    /// Derive one issue's status by issue number
    IssueStatus { issue_num: i64 },
    /// Update sessions in the selected parliament(s)
    Sessions,
    /// Update one session by session number
    Session { session_num: i64 },
    /// Update persons (MPs) in the selected parliament(s)
    Persons,
    /// Update one person by feed id
    Person { person_xml_id: i64 },
    /// Update ministerial offices and seats
    Ministers,
    /// Update the presidium
    Presidents,
    /// Update parties
    Parties,
    /// Update committees
    Committees,
    /// Update one committee by feed id
    Committee { committee_xml_id: i64 },
    /// Update committee agendas
    CommitteeAgendas,
    /// Update one committee agenda by feed id
    CommitteeAgenda { committee_agenda_xml_id: i64 },
    /// Update constituencies
    Constituencies,
    /// Update vote castings
    VoteCastings,
    /// Update one vote casting by feed id
    VoteCasting { vote_casting_xml_id: i64 },
    /// Update speeches
    Speeches,
    /// Update issue categories and category groups
    Categories,
    /// Update everything for the selected parliament(s) and stamp the
    /// parliament as fully synchronized
    All,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "althingi_ingest=info,althingi_common=info".into()),
        )
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            // Transient (transport) failures exit 1, domain failures 2.
            match e.downcast_ref::<Error>() {
                Some(err) if err.is_fatal() => ExitCode::from(1),
                _ => ExitCode::from(2),
            }
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let settings = match &args.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load()?,
    };

    // Validate the whole parliament selection before touching anything.
    let parliament_nums = parse_parliament_range(args.parliament.as_deref(), &settings)?;

    let pool = althingi_common::db::init_database_pool(&settings.database_path)
        .await
        .context("Failed to open database")?;

    let mut ctx = SyncContext::new(pool, settings)?;

    for parliament_num in parliament_nums {
        info!("Processing parliament {}", parliament_num);
        update_data(&mut ctx, parliament_num, args.days, &args.command).await?;
    }

    let stats = ctx.stats;
    info!(
        "Run complete: {} added, {} updated, {} unchanged, {} deleted",
        stats.added, stats.updated, stats.unchanged, stats.deleted
    );

    Ok(())
}

async fn update_data(
    ctx: &mut SyncContext,
    parliament_num: i64,
    days: Option<i64>,
    command: &Command,
) -> Result<()> {
    let parliament_num = Some(parliament_num);

    match command {
        Command::Upcoming => {
            sync::sessions::sync_next_sessions(ctx).await?;
            sync::committee_agendas::sync_next_committee_agendas(ctx, parliament_num).await?;
        }
        Command::Issues => sync::issues::sync_issues(ctx, parliament_num).await?,
        Command::Issue { issue_num } => {
            sync::issues::sync_issue(ctx, *issue_num, parliament_num).await?;
        }
        Command::IssueStatuses => status::sync_issue_statuses(ctx, parliament_num).await?,
        Command::IssueStatus { issue_num } => {
            status::sync_issue_status(ctx, *issue_num, parliament_num).await?;
        }
        Command::Sessions => sync::sessions::sync_sessions(ctx, parliament_num, None).await?,
        Command::Session { session_num } => {
            sync::sessions::sync_session(ctx, *session_num, parliament_num).await?;
        }
        Command::Persons => sync::persons::sync_persons(ctx, parliament_num).await?,
        Command::Person { person_xml_id } => {
            sync::persons::sync_person(ctx, *person_xml_id, parliament_num).await?;
        }
        Command::Ministers => sync::ministers::sync_ministers(ctx, parliament_num).await?,
        Command::Presidents => sync::presidents::sync_presidents(ctx, parliament_num).await?,
        Command::Parties => sync::parties::sync_parties(ctx, parliament_num).await?,
        Command::Committees => sync::committees::sync_committees(ctx, parliament_num).await?,
        Command::Committee { committee_xml_id } => {
            sync::committees::sync_committee(ctx, *committee_xml_id, parliament_num).await?;
        }
        Command::CommitteeAgendas => {
            sync::committee_agendas::sync_committee_agendas(ctx, parliament_num, None).await?;
        }
        Command::CommitteeAgenda {
            committee_agenda_xml_id,
        } => {
            sync::committee_agendas::sync_committee_agenda(
                ctx,
                *committee_agenda_xml_id,
                parliament_num,
            )
            .await?;
        }
        Command::Constituencies => {
            sync::constituencies::sync_constituencies(ctx, parliament_num).await?;
        }
        Command::VoteCastings => {
            sync::vote_castings::sync_vote_castings(ctx, parliament_num, days).await?;
        }
        Command::VoteCasting {
            vote_casting_xml_id,
        } => {
            sync::vote_castings::sync_vote_casting(ctx, *vote_casting_xml_id, parliament_num)
                .await?;
        }
        Command::Speeches => sync::speeches::sync_speeches(ctx, parliament_num, days).await?,
        Command::Categories => sync::categories::sync_categories(ctx).await?,
        Command::All => {
            sync::parties::sync_parties(ctx, parliament_num).await?;
            sync::constituencies::sync_constituencies(ctx, parliament_num).await?;
            sync::categories::sync_categories(ctx).await?;
            sync::committees::sync_committees(ctx, parliament_num).await?;
            sync::persons::sync_persons(ctx, parliament_num).await?;
            sync::ministers::sync_ministers(ctx, parliament_num).await?;
            sync::presidents::sync_presidents(ctx, parliament_num).await?;
            sync::issues::sync_issues(ctx, parliament_num).await?;
            sync::sessions::sync_sessions(ctx, parliament_num, None).await?;
            sync::speeches::sync_speeches(ctx, parliament_num, days).await?;
            sync::committee_agendas::sync_committee_agendas(ctx, parliament_num, None).await?;
            sync::vote_castings::sync_vote_castings(ctx, parliament_num, days).await?;

            // Builds on everything above, so it runs last.
            status::sync_issue_statuses(ctx, parliament_num).await?;

            // Stamped only once every sub-step has succeeded.
            let parliament = sync::parliaments::sync_parliament(ctx, parliament_num).await?;
            parliaments::set_last_full_update(&ctx.pool, parliament.id, chrono::Utc::now())
                .await?;
            info!("Parliament {} fully updated", parliament.parliament_num);
        }
    }

    Ok(())
}

/// Parse the parliament selection: a single number or an inclusive range.
/// A descending range ("140-130") yields descending processing order.
/// Every number is validated against the feed's known span up front.
fn parse_parliament_range(value: Option<&str>, settings: &Settings) -> Result<Vec<i64>> {
    use althingi_common::config::FIRST_PARLIAMENT_NUM;

    let nums = match value {
        None => vec![settings.current_parliament_num],
        Some(value) => {
            let parse = |s: &str| -> Result<i64> {
                s.trim()
                    .parse()
                    .map_err(|_| Error::InvalidInput(format!("Invalid parliament number: {}", s)))
                    .map_err(anyhow::Error::from)
            };

            match value.split_once('-') {
                Some((from, to)) => {
                    let from = parse(from)?;
                    let to = parse(to)?;
                    if from > to {
                        (to..=from).rev().collect()
                    } else {
                        (from..=to).collect()
                    }
                }
                None => vec![parse(value)?],
            }
        }
    };

    for num in &nums {
        if *num < FIRST_PARLIAMENT_NUM || *num > settings.current_parliament_num {
            return Err(Error::InvalidInput(format!(
                "Parliament {} is outside the feed's known range {}-{}",
                num, FIRST_PARLIAMENT_NUM, settings.current_parliament_num
            ))
            .into());
        }
    }

    Ok(nums)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            current_parliament_num: 148,
            ..Settings::default()
        }
    }

    #[test]
    fn test_default_is_current_parliament() {
        let nums = parse_parliament_range(None, &settings()).unwrap();
        assert_eq!(nums, vec![148]);
    }

    #[test]
    fn test_ascending_range() {
        let nums = parse_parliament_range(Some("145-148"), &settings()).unwrap();
        assert_eq!(nums, vec![145, 146, 147, 148]);
    }

    #[test]
    fn test_descending_range_preserves_order() {
        let nums = parse_parliament_range(Some("148-145"), &settings()).unwrap();
        assert_eq!(nums, vec![148, 147, 146, 145]);
    }

    #[test]
    fn test_out_of_range_is_rejected() {
        assert!(parse_parliament_range(Some("19"), &settings()).is_err());
        assert!(parse_parliament_range(Some("149"), &settings()).is_err());
        assert!(parse_parliament_range(Some("145-149"), &settings()).is_err());
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(parse_parliament_range(Some("abc"), &settings()).is_err());
        assert!(parse_parliament_range(Some("140-abc"), &settings()).is_err());
    }
}
