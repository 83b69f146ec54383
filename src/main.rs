//! gmdesk - game master's desk

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use gmdesk::schema::Stat;
use gmdesk::sheet::{format_modifier, SheetSession};
use gmdesk::tracker::{TrackerEvent, TurnTracker};
use gmdesk::{Config, Desk};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Combat dashboard and character sheet for a tabletop RPG room
#[derive(Parser, Debug)]
#[command(name = "gmdesk", version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database file (overrides the configuration)
    #[arg(short, long)]
    database: Option<String>,

    /// User whose room is opened
    #[arg(short, long)]
    user: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Game master's combat dashboard
    #[command(subcommand)]
    Tracker(TrackerCommand),

    /// Player character sheet
    #[command(subcommand)]
    Sheet(SheetCommand),
}

#[derive(Subcommand, Debug)]
enum TrackerCommand {
    /// Show the turn order and pending reports
    Show,
    /// Roll initiative for everyone
    Roll,
    /// End the active combatant's turn
    Next,
    /// Send a combatant to the back of the order
    Remove { id: String },
    /// Damage (negative) or heal (positive) a combatant
    Hp {
        id: String,
        #[arg(allow_hyphen_values = true)]
        delta: i64,
    },
    /// Apply a pending attack report
    Apply {
        report: String,
        #[arg(long)]
        target: Option<String>,
        #[arg(long)]
        damage: Option<i64>,
    },
    /// Print the order every time it changes
    Watch,
}

#[derive(Subcommand, Debug)]
enum SheetCommand {
    /// Show a character sheet
    Show {
        #[arg(long)]
        character: Option<String>,
    },
    /// Roll and confirm a level-up
    LevelUp {
        #[arg(long)]
        character: Option<String>,
    },
    /// Set a stored stat
    Set {
        stat: Stat,
        #[arg(allow_hyphen_values = true)]
        value: String,
        #[arg(long)]
        character: Option<String>,
    },
    /// List the racial abilities of a character
    Races {
        #[arg(long)]
        character: Option<String>,
    },
}

fn print_order(tracker: &TurnTracker) {
    for (position, c) in tracker.order().iter().enumerate() {
        println!(
            "{}{:>2}. {:<20} PV {:>4}  init {:>3} {} [{}]",
            if position == 0 { ">" } else { " " },
            position + 1,
            c.name,
            c.hp,
            c.current_init,
            c.init_details.as_deref().unwrap_or(""),
            c.category,
        );
    }
    for report in tracker.reports() {
        println!(
            "   report {}: {} -> {} with {} (attack {}, damage {}, {})",
            report.id,
            report.attacker,
            report.target_name,
            report.weapon,
            report.attack_roll,
            report.damage,
            if report.success { "hit" } else { "miss" },
        );
    }
}

fn print_sheet(sheet: &SheetSession) {
    let Some(character) = sheet.selected() else {
        println!("No player characters in room {}", sheet.room().id());
        return;
    };

    println!(
        "{} ({}) level {} {}",
        character.name,
        character.id,
        character.level.unwrap_or(1),
        character.race.as_deref().unwrap_or("")
    );
    for score in sheet.ability_scores() {
        println!(
            "  {:<4} {:>3} ({})",
            score.stat,
            score.value,
            format_modifier(score.modifier)
        );
    }
    for stat in [Stat::Pv, Stat::Defense, Stat::Contact, Stat::Magie, Stat::Distance, Stat::Init] {
        println!("  {:<8} {:>3}", stat, sheet.displayed(stat));
    }
    println!("  {:<8} {:>3}", Stat::PvMax, character.stat(Stat::PvMax));
}

async fn run_tracker(desk: &Desk, uid: &str, command: TrackerCommand) -> Result<()> {
    let mut tracker = desk.tracker(uid).await?;

    match command {
        TrackerCommand::Show => {}
        TrackerCommand::Roll => {
            tracker.roll_initiative().await?;
        }
        TrackerCommand::Next => {
            tracker.advance_turn().await?;
        }
        TrackerCommand::Remove { id } => {
            if tracker.remove_combatant(&id).await?.is_none() {
                println!("No combatant {}", id);
            }
        }
        TrackerCommand::Hp { id, delta } => {
            if tracker.apply_delta(&id, delta).await?.is_none() {
                println!("No combatant {}", id);
            }
        }
        TrackerCommand::Apply {
            report,
            target,
            damage,
        } => {
            if tracker
                .apply_report(&report, target.as_deref(), damage)
                .await?
                .is_none()
            {
                println!("Nothing applied for report {}", report);
            }
        }
        TrackerCommand::Watch => {
            print_order(&tracker);
            loop {
                tokio::select! {
                    event = tracker.pending_changes() => {
                        if event? == TrackerEvent::Closed {
                            break;
                        }
                        println!();
                        print_order(&tracker);
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            tracker.close();
            return Ok(());
        }
    }

    print_order(&tracker);
    tracker.close();
    Ok(())
}

async fn run_sheet(desk: &Desk, uid: &str, command: SheetCommand) -> Result<()> {
    let mut sheet = desk.sheet(uid).await?;

    let character = match &command {
        SheetCommand::Show { character }
        | SheetCommand::LevelUp { character }
        | SheetCommand::Set { character, .. }
        | SheetCommand::Races { character } => character.clone(),
    };
    if let Some(id) = character {
        sheet.select(&id).await?;
    }

    match command {
        SheetCommand::Show { .. } => {}
        SheetCommand::LevelUp { .. } => {
            let rolled = sheet.roll_level_up()?;
            let change = sheet.confirm_level_up().await?;
            println!(
                "Rolled {} {} = {}; max hit points {} -> {}",
                rolled.roll,
                format_modifier(rolled.con_modifier),
                rolled.increase,
                change.before,
                change.after
            );
        }
        SheetCommand::Set { stat, value, .. } => {
            let mut form = sheet.begin_edit()?;
            form.set_from_input(stat, &value);
            sheet.save(&form).await?;
        }
        SheetCommand::Races { .. } => {
            for line in sheet.race_abilities(&desk.races()?)? {
                println!("{}", line);
            }
            sheet.close();
            return Ok(());
        }
    }

    print_sheet(&sheet);
    sheet.close();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gmdesk=info".into()),
        )
        .with(
            args.log_json
                .then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
        )
        .with(
            (!args.log_json)
                .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
        .init();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(database) = args.database {
        config.db_path = Some(database);
    }

    let desk = Desk::open(config).await?;

    match args.command {
        Command::Tracker(command) => run_tracker(&desk, &args.user, command).await,
        Command::Sheet(command) => run_sheet(&desk, &args.user, command).await,
    }
}
