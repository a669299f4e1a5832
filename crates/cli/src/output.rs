//! Terminal formatting.

use goalie_core::{date, Day, StreakSummary};
use goalie_progress::{is_milestone_overdue, GoalUpdate, GoalView, StreakResult};

pub fn print_goal_list(views: &[GoalView]) {
    println!("Goals ({})", views.len());
    for view in views {
        println!(
            "  {} | {:<13} | {:>3}% | {}",
            view.goal.id,
            view.status.kind.label(),
            view.status.progress_percent,
            view.goal.title,
        );
    }
}

pub fn print_goal(view: &GoalView, today: Day) {
    let goal = &view.goal;
    println!("Goal: {}", goal.id);
    println!("  Title: {}", goal.title);
    if !goal.description.is_empty() {
        println!("  Description: {}", goal.description);
    }
    println!("  Due: {}", due_label(goal.due_date));
    println!("  Status: {}", view.status.kind.label());
    println!("  Progress: {}%", view.status.progress_percent);
    println!("  Created: {}", goal.created_at);

    if !goal.milestones.is_empty() {
        println!("  Milestones:");
        for m in goal.ordered_milestones() {
            let check = if m.completed { "x" } else { " " };
            let overdue = if is_milestone_overdue(m, today) { " (overdue)" } else { "" };
            let text = if m.has_text() { m.text.as_str() } else { "<missing text>" };
            println!("    [{}] {} {} - due {}{}", check, m.id, text, due_label(m.due_date), overdue);
        }
    }

    if !view.integrity_warnings.is_empty() {
        println!(
            "  Warning: {} milestone(s) have no text; edit or delete them before other changes",
            view.integrity_warnings.len()
        );
    }
}

pub fn print_update(update: &GoalUpdate) {
    println!(
        "  {} | {}% complete",
        update.status.kind.label(),
        update.status.progress_percent
    );
    if update.auto_completed {
        println!("Every milestone is done - goal completed!");
    }
    if let Some(streak) = &update.streak {
        print_streak_update(streak);
    }
}

fn print_streak_update(streak: &StreakResult) {
    if !streak.is_new_streak_day {
        return;
    }
    if streak.is_new_record() {
        println!("New record! {} day streak", streak.current_streak);
    } else {
        println!(
            "Streak extended: {} day(s) (best {})",
            streak.current_streak, streak.longest_streak
        );
    }
}

pub fn print_streak_summary(summary: &StreakSummary) {
    println!("Current streak: {} day(s)", summary.current_streak);
    println!("Longest streak: {} day(s)", summary.longest_streak);
    match summary.last_activity_date {
        Some(day) => println!("Last activity: {}", date::format_day(day)),
        None => println!("Last activity: never"),
    }
}

fn due_label(due: Option<Day>) -> String {
    due.map(date::format_day)
        .unwrap_or_else(|| "No due date".to_string())
}
