//! Task management commands for CLI.

use chrono::{DateTime, NaiveDate, Utc};
use clap::Subcommand;
use punchclock_core::task::lifecycle::available_actions;
use punchclock_core::task::timer::{format_hms, format_hours_minutes, live_session_seconds};
use punchclock_core::{LocalTaskBackend, Priority, Task, TaskBackend, TaskStatus};

use super::{CliResult, Env, Output};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Create {
        /// Task title
        title: String,
        /// Task description
        #[arg(long)]
        description: Option<String>,
        /// low, medium, high or urgent
        #[arg(long)]
        priority: Option<String>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    /// List tasks
    List {
        /// Filter by status (pending, in_progress, paused, completed, cancelled)
        #[arg(long)]
        status: Option<String>,
    },
    /// Show one task with its live elapsed time
    Show {
        /// Task ID or unique prefix
        id: String,
    },
    /// Start (or restart a paused) task
    Start { id: String },
    /// Pause the running task
    Pause { id: String },
    /// Resume a paused task
    Resume { id: String },
    /// Complete a task
    Complete { id: String },
    /// Cancel a task
    Cancel { id: String },
    /// Delete a task
    Delete { id: String },
    /// Add a title/description revision
    Edit {
        id: String,
        /// New title (default: keep current)
        #[arg(long)]
        title: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
    },
    /// Discount seconds from the running session (e.g. a forgotten break)
    Adjust {
        id: String,
        /// Seconds to discount
        seconds: u64,
    },
}

fn parse_status(s: &str) -> Result<TaskStatus, String> {
    TaskStatus::parse(s).ok_or_else(|| format!("unknown status: {s}"))
}

/// First eight characters of an id, or the whole id when shorter.
fn short_id(id: &str) -> &str {
    id.char_indices().nth(8).map_or(id, |(end, _)| &id[..end])
}

fn print_task(task: &Task, now: DateTime<Utc>) {
    let elapsed = task.elapsed_seconds(now);
    println!("{}  {}", task.id, task.title());
    println!("  status:   {}", task.status);
    println!("  priority: {:?}", task.priority);
    println!(
        "  elapsed:  {} ({})",
        format_hms(elapsed),
        format_hours_minutes(elapsed)
    );
    if task.status == TaskStatus::InProgress {
        println!("  session:  {}", format_hms(live_session_seconds(task, now)));
    }
    let actions: Vec<String> = available_actions(task.status)
        .iter()
        .map(ToString::to_string)
        .collect();
    if !actions.is_empty() {
        println!("  next:     {}", actions.join(", "));
    }
    if let Some(description) = task.description() {
        println!("  {description}");
    }
    if !task.tags.is_empty() {
        println!("  tags:     {}", task.tags.join(", "));
    }
    if let Some(due) = task.due_date {
        println!("  due:      {due}");
    }
    if task.is_carried_forward {
        println!("  (carried forward)");
    }
}

pub fn run(action: TaskAction, out: Output) -> CliResult {
    let env = Env::open()?;
    let offset = env.config.shift.offset()?;
    let mut backend = LocalTaskBackend::open(env.db, env.config.owner.id, env.clock.clone())?;
    let now = || env.clock.now();

    let task = match action {
        TaskAction::Create {
            title,
            description,
            priority,
            tags,
            due,
        } => {
            let priority = priority
                .map(|p| Priority::parse(&p).ok_or_else(|| format!("unknown priority: {p}")))
                .transpose()?;
            let mut task = backend.create(&title, description)?;
            if let Some(priority) = priority {
                task = task.with_priority(priority);
            }
            if let Some(tags) = tags {
                task = task.with_tags(tags.split(',').map(|s| s.trim().to_string()).collect());
            }
            if let Some(due) = due {
                task = task.with_due_date(due);
            }
            backend.reconcile(task)?
        }
        TaskAction::List { status } => {
            let status = status.as_deref().map(parse_status).transpose()?;
            backend.carry_forward(offset)?;
            let tasks: Vec<&Task> = backend.board().list(status);
            let now = now();
            return out.emit(&tasks, || {
                for task in &tasks {
                    println!(
                        "{}  {:<11}  {}  {}",
                        short_id(&task.id),
                        task.status.as_str(),
                        format_hms(task.elapsed_seconds(now)),
                        task.title()
                    );
                }
            });
        }
        TaskAction::Show { id } => {
            let id = backend.resolve_id(&id)?;
            backend
                .board()
                .get(&id)
                .cloned()
                .ok_or_else(|| format!("Task not found: {id}"))?
        }
        TaskAction::Start { id } => {
            let id = backend.resolve_id(&id)?;
            backend.start(&id)?
        }
        TaskAction::Pause { id } => {
            let id = backend.resolve_id(&id)?;
            backend.pause(&id)?
        }
        TaskAction::Resume { id } => {
            let id = backend.resolve_id(&id)?;
            backend.resume(&id)?
        }
        TaskAction::Complete { id } => {
            let id = backend.resolve_id(&id)?;
            backend.complete(&id)?
        }
        TaskAction::Cancel { id } => {
            let id = backend.resolve_id(&id)?;
            backend.cancel(&id)?
        }
        TaskAction::Delete { id } => {
            let id = backend.resolve_id(&id)?;
            let task = backend.delete(&id)?;
            return out.emit(&task, || println!("Task deleted: {}", task.id));
        }
        TaskAction::Edit {
            id,
            title,
            description,
        } => {
            let id = backend.resolve_id(&id)?;
            let current = backend
                .board()
                .get(&id)
                .map(|t| t.title().to_string())
                .unwrap_or_default();
            backend.update(&id, title.as_deref().unwrap_or(&current), description)?
        }
        TaskAction::Adjust { id, seconds } => {
            let id = backend.resolve_id(&id)?;
            backend.adjust_paused_for(&id, seconds)?
        }
    };

    let now = now();
    out.emit(&task, || print_task(&task, now))
}
