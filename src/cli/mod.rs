#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{CommandFactory as _, Parser, Subcommand};

use crate::auth::{AuthGate, Session};
use crate::board::BoardState;
use crate::config;
use crate::error::KanriError;
use crate::output::table::{short_id, task_table};
use crate::store::TaskStore;
use crate::store::json::JsonTaskStore;
use crate::task::model::{
    Task, TaskDraft, TaskPatch, TaskStatus, parse_tags, validate_due_date, validate_title,
};
use crate::tui;
use crate::tui::board::BoardOptions;

#[derive(Debug, Parser)]
#[command(name = "kanri", version, about = "Kanban task board for the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Open the interactive board (default)
    Board,
    List(ListArgs),
    Add(AddArgs),
    Edit(EditArgs),
    Move(MoveArgs),
    #[command(alias = "rm")]
    Remove(RemoveArgs),
    Auth(AuthArgs),
    Config(ConfigArgs),
    Completion(CompletionArgs),
    Version,
}

#[derive(Debug, Parser)]
pub struct ListArgs {
    /// Only tasks in this column (TODO, IN_PROGRESS, DONE)
    #[arg(short = 's', long = "status")]
    pub status: Option<String>,
    /// Output in JSON format
    #[arg(long = "json")]
    pub json: bool,
    /// Output in CSV format
    #[arg(long = "csv")]
    pub csv: bool,
}

#[derive(Debug, Parser)]
pub struct AddArgs {
    /// Task title
    pub title: String,
    /// Description
    #[arg(short = 'm', long = "message", default_value = "")]
    pub description: String,
    /// Due date (YYYY-MM-DD)
    #[arg(long = "due")]
    pub due: Option<String>,
    /// Tags (bug, feature, review); repeat or comma-separate
    #[arg(short = 't', long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Debug, Parser)]
pub struct EditArgs {
    /// Task id (unique prefix accepted)
    pub id: String,
    #[arg(long = "title")]
    pub title: Option<String>,
    #[arg(short = 'm', long = "message")]
    pub description: Option<String>,
    #[arg(long = "due", conflicts_with = "clear_due")]
    pub due: Option<String>,
    /// Remove the due date
    #[arg(long = "clear-due")]
    pub clear_due: bool,
    #[arg(short = 't', long = "tag", conflicts_with = "clear_tags")]
    pub tags: Vec<String>,
    /// Remove all tags
    #[arg(long = "clear-tags")]
    pub clear_tags: bool,
}

#[derive(Debug, Parser)]
pub struct MoveArgs {
    /// Task id (unique prefix accepted)
    pub id: String,
    /// Destination column (TODO, IN_PROGRESS, DONE)
    pub status: String,
}

#[derive(Debug, Parser)]
pub struct RemoveArgs {
    /// Task id (unique prefix accepted)
    pub id: String,
    /// Skip confirmation
    #[arg(short = 'f', long = "force")]
    pub force: bool,
}

#[derive(Debug, Parser)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub cmd: AuthCmd,
}

#[derive(Debug, Subcommand)]
pub enum AuthCmd {
    /// Create an account and sign in
    Signup { email: String },
    /// Sign in with an existing account
    Signin { email: String },
    /// Drop the current session
    Signout,
    /// Show the current session
    Whoami,
}

#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub cmd: ConfigCmd,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCmd {
    /// Print the resolved configuration
    List,
    /// Print one value
    Get { key: String },
    /// Set one value
    Set { key: String, value: String },
}

#[derive(Debug, Parser)]
pub struct CompletionArgs {
    pub shell: clap_complete::Shell,
}

pub async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.cmd {
        None | Some(Commands::Board) => cmd_board().await,
        Some(Commands::List(args)) => cmd_list(args).await,
        Some(Commands::Add(args)) => cmd_add(args).await,
        Some(Commands::Edit(args)) => cmd_edit(args).await,
        Some(Commands::Move(args)) => cmd_move(args).await,
        Some(Commands::Remove(args)) => cmd_remove(args).await,
        Some(Commands::Auth(args)) => cmd_auth(args).await,
        Some(Commands::Config(args)) => match args.cmd {
            ConfigCmd::List => {
                print!("{}", config::list_resolved_toml()?);
                Ok(ExitCode::SUCCESS)
            }
            ConfigCmd::Get { key } => {
                let val = config::get_value_string(&key)?;
                match val {
                    Some(v) => {
                        println!("{v}");
                        Ok(ExitCode::SUCCESS)
                    }
                    None => anyhow::bail!(
                        "configuration key '{key}' not found - use 'kanri config list' to see available keys"
                    ),
                }
            }
            ConfigCmd::Set { key, value } => {
                config::set_value_string(&key, &value)?;
                println!("Set {key} = {value}");
                Ok(ExitCode::SUCCESS)
            }
        },
        Some(Commands::Completion(args)) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "kanri", &mut std::io::stdout());
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Version) => Ok(cmd_version()),
    }
}

/// Everything a task command needs: config, the store, and the session
/// state the auth gate reports.
struct Ctx {
    store: Arc<JsonTaskStore>,
    gate: AuthGate,
    session: Option<Session>,
    auth_enabled: bool,
    cfg: crate::config::Config,
}

impl Ctx {
    /// Owner filter for reads and creates. `None` when auth is disabled;
    /// requires a session otherwise.
    fn owner(&self) -> anyhow::Result<Option<String>> {
        if !self.auth_enabled {
            return Ok(None);
        }
        match &self.session {
            Some(session) => Ok(Some(session.user_id.clone())),
            None => Err(KanriError::NotSignedIn.into()),
        }
    }
}

async fn load_ctx() -> anyhow::Result<Ctx> {
    tokio::task::spawn_blocking(|| -> anyhow::Result<Ctx> {
        let (cfg, _paths) = config::load()?;
        let data_dir: PathBuf = cfg.data_dir()?;
        let store = Arc::new(JsonTaskStore::new(data_dir.join("tasks")));
        let gate = AuthGate::open(&data_dir)?;
        let session = gate.current();
        Ok(Ctx {
            store,
            gate,
            session,
            auth_enabled: cfg.auth.enabled,
            cfg,
        })
    })
    .await?
}

async fn cmd_board() -> anyhow::Result<ExitCode> {
    let ctx = load_ctx().await?;
    let owner = ctx.owner()?;

    let opts = BoardOptions {
        titles: ctx.cfg.column_titles(),
        confirm_delete: ctx.cfg.ui.confirm_delete,
        icons: ctx.cfg.ui.icons,
        owner,
        session_email: ctx.session.as_ref().map(|s| s.email.clone()),
    };
    tui::board::run(ctx.store, opts)?;
    Ok(ExitCode::SUCCESS)
}

async fn cmd_list(args: ListArgs) -> anyhow::Result<ExitCode> {
    let ctx = load_ctx().await?;
    let owner = ctx.owner()?;

    let mut tasks = ctx.store.list(owner.as_deref());
    if let Some(filter) = &args.status {
        let status: TaskStatus = filter.parse().map_err(anyhow::Error::from)?;
        tasks.retain(|t| t.status == status);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(ExitCode::SUCCESS);
    }
    let table = task_table(&tasks);
    if args.csv {
        table.write_csv().context("failed to write CSV")?;
    } else {
        table.print().context("failed to print table")?;
    }
    Ok(ExitCode::SUCCESS)
}

async fn cmd_add(args: AddArgs) -> anyhow::Result<ExitCode> {
    let ctx = load_ctx().await?;
    let owner = ctx.owner()?;

    validate_title(&args.title)?;
    if let Some(due) = &args.due {
        validate_due_date(due)?;
    }
    let draft = TaskDraft {
        title: args.title,
        description: args.description,
        due_date: args.due,
        tags: parse_tags(&args.tags)?,
    };

    let Some(task) = ctx.store.create(draft, owner.as_deref()) else {
        anyhow::bail!("failed to create task");
    };
    println!(
        "Created {} in {} (order {})",
        short_id(&task.id),
        task.status,
        task.order
    );
    Ok(ExitCode::SUCCESS)
}

async fn cmd_edit(args: EditArgs) -> anyhow::Result<ExitCode> {
    let ctx = load_ctx().await?;
    let task = resolve_task(&ctx, &args.id)?;

    if let Some(title) = &args.title {
        validate_title(title)?;
    }
    let due_date = if args.clear_due {
        Some(None)
    } else if let Some(due) = &args.due {
        validate_due_date(due)?;
        Some(Some(due.clone()))
    } else {
        None
    };
    let tags = if args.clear_tags {
        Some(Vec::new())
    } else if args.tags.is_empty() {
        None
    } else {
        Some(parse_tags(&args.tags)?)
    };

    let patch = TaskPatch {
        title: args.title,
        description: args.description,
        due_date,
        tags,
        ..TaskPatch::default()
    };
    if patch.is_empty() {
        anyhow::bail!("nothing to change - pass at least one field flag");
    }

    if ctx.store.update(&task.id, patch).is_none() {
        anyhow::bail!("failed to update task {}", short_id(&task.id));
    }
    println!("Updated {}", short_id(&task.id));
    Ok(ExitCode::SUCCESS)
}

async fn cmd_move(args: MoveArgs) -> anyhow::Result<ExitCode> {
    let ctx = load_ctx().await?;
    let task = resolve_task(&ctx, &args.id)?;
    let to: TaskStatus = args.status.parse().map_err(anyhow::Error::from)?;
    if task.status == to {
        println!("{} is already in {to}", short_id(&task.id));
        return Ok(ExitCode::SUCCESS);
    }

    // Same placement a drop at the end of the destination column produces.
    // The order slot comes from the task owner's own board, like creation.
    let board = BoardState::load(ctx.store.list(task.user_id.as_deref()));
    let patch = TaskPatch {
        status: Some(to),
        order: Some(board.next_order(to)),
        ..TaskPatch::default()
    };
    if ctx.store.update(&task.id, patch).is_none() {
        anyhow::bail!("failed to move task {}", short_id(&task.id));
    }
    println!("Moved {} to {to}", short_id(&task.id));
    Ok(ExitCode::SUCCESS)
}

async fn cmd_remove(args: RemoveArgs) -> anyhow::Result<ExitCode> {
    let ctx = load_ctx().await?;
    let task = resolve_task(&ctx, &args.id)?;

    if !args.force && !confirm_delete(&task)? {
        println!("Kept {}", short_id(&task.id));
        return Ok(ExitCode::SUCCESS);
    }
    if !ctx.store.delete(&task.id) {
        anyhow::bail!("failed to delete task {}", short_id(&task.id));
    }
    println!("Deleted {}", short_id(&task.id));
    Ok(ExitCode::SUCCESS)
}

async fn cmd_auth(args: AuthArgs) -> anyhow::Result<ExitCode> {
    let ctx = load_ctx().await?;
    match args.cmd {
        AuthCmd::Signup { email } => {
            let password = prompt_password()?;
            let session = ctx.gate.sign_up(&email, &password)?;
            println!("Signed up and in as {}", session.email);
        }
        AuthCmd::Signin { email } => {
            let password = prompt_password()?;
            let session = ctx.gate.sign_in(&email, &password)?;
            println!("Signed in as {}", session.email);
        }
        AuthCmd::Signout => {
            ctx.gate.sign_out()?;
            println!("Signed out");
        }
        AuthCmd::Whoami => match ctx.session {
            Some(session) => println!("{} ({})", session.email, session.user_id),
            None => println!("not signed in"),
        },
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_version() -> ExitCode {
    println!("kanri version {}", env!("CARGO_PKG_VERSION"));
    println!("  rust: {}", rustc_version_runtime::version());
    println!(
        "  os/arch: {}/{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    ExitCode::SUCCESS
}

/// Looks a task up by full id or unique prefix. `update`/`delete` style
/// commands resolve against all tasks, not just the session owner's.
fn resolve_task(ctx: &Ctx, pattern: &str) -> anyhow::Result<Task> {
    let tasks = ctx.store.list(None);
    let mut matches = tasks.iter().filter(|t| t.id.starts_with(pattern));
    let Some(first) = matches.next() else {
        return Err(KanriError::TaskNotFound(pattern.to_owned()).into());
    };
    if matches.next().is_some() {
        anyhow::bail!("multiple tasks match id prefix '{pattern}'");
    }
    Ok(first.clone())
}

fn confirm_delete(task: &Task) -> anyhow::Result<bool> {
    println!("This will delete \"{}\" ({})", task.title, short_id(&task.id));
    print!("Are you sure? (y/N): ");
    std::io::Write::flush(&mut std::io::stdout())?;
    let mut input = String::new();
    let _ = std::io::stdin().read_line(&mut input)?;
    Ok(is_affirmative(&input))
}

/// Only an explicit yes confirms; anything else (including empty input)
/// declines.
fn is_affirmative(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

fn prompt_password() -> anyhow::Result<String> {
    print!("Password: ");
    std::io::Write::flush(&mut std::io::stdout())?;
    let mut input = String::new();
    let _ = std::io::stdin().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_explicit_yes_confirms_a_delete() {
        assert!(is_affirmative("y"));
        assert!(is_affirmative("YES"));
        assert!(is_affirmative("  yes \n"));

        assert!(!is_affirmative("n"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("\n"));
        assert!(!is_affirmative("yep"));
    }
}
