//! Command-line front end for the task board.
//!
//! # Responsibility
//! - Open the SQLite-backed board and route each subcommand to the
//!   orchestrator or a single-entity store.
//! - Print plain, line-oriented results; failures exit with status 1.

use clap::{Parser, Subcommand};
use log::info;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;
use taskboard_core::{
    init_logging, BoardConfig, Category, EntityKind, OrchestratorError, StoreError, Task,
    TaskBoard, Template, TemplatePresenter, DEFAULT_CATEGORY_ID,
};

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Parser, Debug)]
#[command(name = "taskboard", version, about = "Local task board")]
struct Cli {
    /// Board database file (defaults to TASKBOARD_DB_PATH or the temp dir).
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Absolute directory for rolling log files.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check core linkage.
    Ping,
    List {
        #[arg(long)]
        category: Option<String>,
        #[arg(long, conflicts_with = "pending")]
        completed: bool,
        #[arg(long)]
        pending: bool,
    },
    Add {
        title: String,
        #[arg(long)]
        category: Option<String>,
    },
    Toggle {
        id: String,
    },
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    Delete {
        id: String,
    },
    /// Delete all tasks, or only checked ones with --completed.
    Clear {
        #[arg(long)]
        completed: bool,
    },
    Categories,
    AddCategory {
        name: String,
        #[arg(long)]
        color: Option<String>,
    },
    /// Delete a category; its tasks move to the default category.
    DeleteCategory {
        id: String,
    },
    Templates,
    /// Derive a template from three hex colors.
    AddTemplate {
        name: String,
        primary: String,
        text: String,
        background: String,
    },
    ActivateTemplate {
        id: String,
    },
    DeleteTemplate {
        id: String,
    },
}

/// Stands in for a theming layer: records which palette would be applied.
struct LogPresenter;

impl TemplatePresenter for LogPresenter {
    fn apply(&self, template: &Template) {
        info!(
            "event=template_apply module=cli status=ok id={} primary={}",
            template.id, template.colors.primary
        );
    }
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult {
    let mut config = BoardConfig::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(log_dir) = cli.log_dir {
        config.log_dir = Some(log_dir);
    }
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, &log_dir.to_string_lossy())?;
    }

    if let Command::Ping = cli.command {
        println!("taskboard_core ping={}", taskboard_core::ping());
        println!("taskboard_core version={}", taskboard_core::core_version());
        return Ok(());
    }

    let db_path = config.db_path.clone();
    let board = TaskBoard::open_sqlite(&db_path, config, Some(Rc::new(LogPresenter)))?;
    execute(&board, cli.command)
}

fn execute(board: &TaskBoard, command: Command) -> CliResult {
    let orchestrator = board.orchestrator();
    match command {
        Command::Ping => {}
        Command::List {
            category,
            completed,
            pending,
        } => {
            let tasks = match category.as_deref() {
                Some(category_id) => board.tasks().get_tasks_by_category(category_id),
                None => board.tasks().list(),
            };
            tasks
                .iter()
                .filter(|task| (!completed || task.checked) && (!pending || !task.checked))
                .for_each(print_task);
        }
        Command::Add { title, category } => {
            let category_id = category.as_deref().unwrap_or(DEFAULT_CATEGORY_ID);
            let task = orchestrator.create_task_in_category(title, category_id)?;
            print_task(&task);
        }
        Command::Toggle { id } => {
            let task = orchestrator
                .toggle_task_check_status(&id)?
                .ok_or(OrchestratorError::TaskNotFound(id))?;
            print_task(&task);
        }
        Command::Edit {
            id,
            title,
            category,
        } => {
            let mut task = board
                .tasks()
                .find_by_id(&id)
                .ok_or(OrchestratorError::TaskNotFound(id))?;
            if let Some(title) = title {
                task.title = title;
            }
            if let Some(category) = category {
                task.category_id = category;
            }
            orchestrator.update_task(task.clone())?;
            print_task(&task);
        }
        Command::Delete { id } => {
            let task = orchestrator
                .delete_task(&id)?
                .ok_or(OrchestratorError::TaskNotFound(id))?;
            println!("deleted {}", task.id);
        }
        Command::Clear { completed: true } => {
            let removed = orchestrator.clear_completed_tasks()?;
            println!("removed {} completed task(s)", removed.len());
        }
        Command::Clear { completed: false } => {
            orchestrator.clear_all_tasks()?;
            println!("removed all tasks");
        }
        Command::Categories => board.categories().list().iter().for_each(print_category),
        Command::AddCategory { name, color } => {
            let category = orchestrator.create_category(name, color.as_deref())?;
            print_category(&category);
        }
        Command::DeleteCategory { id } => {
            let category = orchestrator
                .delete_category(&id)?
                .ok_or(OrchestratorError::CategoryNotFound(id))?;
            println!("deleted {}", category.id);
        }
        Command::Templates => board.templates().list().iter().for_each(print_template),
        Command::AddTemplate {
            name,
            primary,
            text,
            background,
        } => {
            let template = Template::custom(name, &primary, &text, &background)?;
            board.templates().add(template.clone())?;
            print_template(&template);
        }
        Command::ActivateTemplate { id } => {
            let template = board.templates().activate(&id)?;
            print_template(&template);
        }
        Command::DeleteTemplate { id } => {
            let template = board
                .templates()
                .remove(&id)?
                .ok_or(StoreError::UnknownEntity {
                    kind: EntityKind::Template,
                    id,
                })?;
            println!("deleted {}", template.id);
        }
    }
    Ok(())
}

fn print_task(task: &Task) {
    let mark = if task.checked { 'x' } else { ' ' };
    println!("[{mark}] {}  {}  ({})", task.id, task.title, task.category_id);
}

fn print_category(category: &Category) {
    println!(
        "{}  {}  {}  {}/{} ({}%)",
        category.id,
        category.name,
        category.color,
        category.completed_tasks(),
        category.tasks().len(),
        category.completion_percentage()
    );
}

fn print_template(template: &Template) {
    let mark = if template.active { '*' } else { ' ' };
    let origin = if template.is_default { "protected" } else { "removable" };
    println!("{mark} {}  {}  [{origin}]", template.id, template.name);
}
