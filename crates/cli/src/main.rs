//! Goalie CLI - personal goal tracking with streaks.

mod output;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::Weekday;
use clap::{Parser, Subcommand};
use goalie_core::{date, Day, GoalId, MilestoneId};
use goalie_progress::{
    GoalChanges, GoalSpec, GoalStatusType, GoalTracker, MilestoneChanges, MilestoneSpec,
    TrackerConfig,
};
use goalie_storage::{JsonStorage, Storage};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "goalie")]
#[command(about = "Track goals, milestones and daily streaks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Data directory
    #[arg(long, global = true, env = "GOALIE_DIR", default_value = ".goalie")]
    data_dir: PathBuf,

    /// Store data in a SQLite database file instead of JSON files
    #[cfg(feature = "sqlite")]
    #[arg(long, global = true, env = "GOALIE_DB")]
    db: Option<PathBuf>,

    /// Treat this day as today (YYYY-MM-DD)
    #[arg(long, global = true, value_parser = parse_day_arg)]
    today: Option<Day>,

    /// Offset from UTC in minutes used to decide the current day
    #[arg(long, global = true, env = "GOALIE_UTC_OFFSET", default_value_t = 0, allow_hyphen_values = true)]
    utc_offset: i32,

    /// First day of the week for weekly stats
    #[arg(long, global = true, default_value = "sun", value_parser = parse_weekday_arg)]
    week_start: Weekday,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a goal
    Add {
        /// Goal title
        title: String,
        /// Description
        #[arg(long, default_value = "")]
        description: String,
        /// Due date
        #[arg(long, value_parser = parse_day_arg)]
        due: Option<Day>,
        /// Initial milestone (repeatable)
        #[arg(short, long = "milestone")]
        milestones: Vec<String>,
    },
    /// List goals with status and progress
    List {
        /// Only goals with this status (on-track, behind, late, late-behind, completed)
        #[arg(long)]
        status: Option<GoalStatusType>,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one goal
    Show {
        /// Goal ID
        id: GoalId,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit goal fields
    Edit {
        /// Goal ID
        id: GoalId,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// New due date
        #[arg(long, value_parser = parse_day_arg, conflicts_with = "clear_due")]
        due: Option<Day>,
        /// Remove the due date
        #[arg(long)]
        clear_due: bool,
    },
    /// Manage milestones
    #[command(subcommand)]
    Milestone(MilestoneCommand),
    /// Mark a goal completed
    Complete {
        /// Goal ID
        id: GoalId,
    },
    /// Delete a goal and its milestones
    Rm {
        /// Goal ID
        id: GoalId,
    },
    /// Show the current streak
    Streak,
    /// Show weekly statistics
    Stats,
}

#[derive(Subcommand, Debug)]
enum MilestoneCommand {
    /// Add a milestone
    Add {
        /// Goal ID
        goal: GoalId,
        /// Milestone text
        text: String,
        /// Due date
        #[arg(long, value_parser = parse_day_arg)]
        due: Option<Day>,
    },
    /// Edit a milestone
    Edit {
        /// Goal ID
        goal: GoalId,
        /// Milestone ID
        milestone: MilestoneId,
        /// New text
        #[arg(long)]
        text: Option<String>,
        /// New due date
        #[arg(long, value_parser = parse_day_arg, conflicts_with = "clear_due")]
        due: Option<Day>,
        /// Remove the due date
        #[arg(long)]
        clear_due: bool,
    },
    /// Toggle completion
    Toggle {
        /// Goal ID
        goal: GoalId,
        /// Milestone ID
        milestone: MilestoneId,
    },
    /// Delete a milestone
    Rm {
        /// Goal ID
        goal: GoalId,
        /// Milestone ID
        milestone: MilestoneId,
    },
    /// Reorder milestones
    Reorder {
        /// Goal ID
        goal: GoalId,
        /// Milestone IDs in the new order
        #[arg(required = true)]
        order: Vec<MilestoneId>,
    },
}

fn parse_day_arg(s: &str) -> std::result::Result<Day, String> {
    date::parse_day(s).ok_or_else(|| format!("invalid date: {s:?} (expected YYYY-MM-DD)"))
}

fn parse_weekday_arg(s: &str) -> std::result::Result<Weekday, String> {
    s.parse::<Weekday>().map_err(|_| format!("invalid weekday: {s:?}"))
}

fn due_change(due: Option<Day>, clear: bool) -> Option<Option<Day>> {
    if clear {
        Some(None)
    } else {
        due.map(Some)
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = TrackerConfig::default()
        .with_utc_offset_minutes(cli.utc_offset)
        .with_week_start(cli.week_start);
    config.validate()?;
    let today = cli.today.unwrap_or_else(|| config.today());
    debug!("Today is {}", today);

    #[cfg(feature = "sqlite")]
    if let Some(db) = &cli.db {
        let storage = goalie_storage::SqliteStorage::new_from_path(db).await?;
        return run(GoalTracker::new(storage).with_config(config), cli.command, today).await;
    }

    let storage = JsonStorage::new(&cli.data_dir).await?;
    run(GoalTracker::new(storage).with_config(config), cli.command, today).await
}

async fn run<S: Storage + 'static>(tracker: GoalTracker<S>, command: Commands, today: Day) -> Result<()> {
    match command {
        Commands::Add { title, description, due, milestones } => {
            let spec = GoalSpec {
                title,
                description,
                due_date: due,
                milestones: milestones
                    .into_iter()
                    .map(|text| MilestoneSpec { text, due_date: None })
                    .collect(),
            };
            let update = tracker.create_goal(spec, today).await?;
            println!("Added goal: {} - {}", update.goal.id, update.goal.title);
            output::print_update(&update);
        }
        Commands::List { status, json } => {
            let views = tracker.list_goal_views(today, status).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else {
                output::print_goal_list(&views);
            }
        }
        Commands::Show { id, json } => {
            let view = tracker.goal_view(id, today).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                output::print_goal(&view, today);
            }
        }
        Commands::Edit { id, title, description, due, clear_due } => {
            let changes = GoalChanges {
                title,
                description,
                due_date: due_change(due, clear_due),
            };
            let update = tracker.update_goal(id, changes, today).await?;
            println!("Updated goal: {}", update.goal.id);
            output::print_update(&update);
        }
        Commands::Milestone(cmd) => run_milestone(&tracker, cmd, today).await?,
        Commands::Complete { id } => {
            let update = tracker.complete_goal(id, today).await?;
            if update.streak.is_none() {
                println!("Goal {} was already completed", id);
            } else {
                println!("Goal {} marked as completed!", id);
            }
            output::print_update(&update);
        }
        Commands::Rm { id } => {
            tracker.delete_goal(id).await?;
            println!("Deleted goal {}", id);
        }
        Commands::Streak => {
            let summary = tracker.activity().user_stats(today).await?;
            output::print_streak_summary(&summary);
        }
        Commands::Stats => {
            let stats = tracker.weekly_stats(today).await?;
            let summary = tracker.activity().user_stats(today).await?;
            output::print_streak_summary(&summary);
            println!("Completed this week: {}", stats.goals_completed_this_week);
            println!("Active goals: {}", stats.active_goals);
        }
    }

    Ok(())
}

async fn run_milestone<S: Storage + 'static>(
    tracker: &GoalTracker<S>,
    command: MilestoneCommand,
    today: Day,
) -> Result<()> {
    let update = match command {
        MilestoneCommand::Add { goal, text, due } => {
            tracker
                .add_milestone(goal, MilestoneSpec { text, due_date: due }, today)
                .await?
        }
        MilestoneCommand::Edit { goal, milestone, text, due, clear_due } => {
            if text.is_none() && due.is_none() && !clear_due {
                return Err(anyhow!("nothing to change: pass --text, --due or --clear-due"));
            }
            let changes = MilestoneChanges {
                text,
                due_date: due_change(due, clear_due),
            };
            tracker.update_milestone(goal, milestone, changes, today).await?
        }
        MilestoneCommand::Toggle { goal, milestone } => {
            tracker.toggle_milestone(goal, milestone, today).await?
        }
        MilestoneCommand::Rm { goal, milestone } => {
            tracker.delete_milestone(goal, milestone, today).await?
        }
        MilestoneCommand::Reorder { goal, order } => {
            tracker.reorder_milestones(goal, order, today).await?
        }
    };

    output::print_update(&update);
    Ok(())
}
