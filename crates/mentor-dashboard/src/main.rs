//! `mentor-dashboard` command line: the dashboard pages against the simulator

use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use mentor_dashboard::{render, telemetry, Dashboard, DashboardConfig, FlagsBackendKind, TaskFilter};
use mentor_flags::names;
use mentor_source::{keys, operations, TaskStatus, TaskType};
use serde::Serialize;
use std::path::PathBuf;

fn cli() -> Command {
    Command::new("mentor-dashboard")
        .version(mentor_dashboard::VERSION)
        .about("Mentor dashboard data layer over the simulated backend")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .global(true)
                .value_parser(value_parser!(u64))
                .help("Simulator seed for reproducible data"),
        )
        .arg(
            Arg::new("latency-scale")
                .long("latency-scale")
                .global(true)
                .value_parser(value_parser!(f64))
                .help("Multiplier on simulated latency, 0 disables it"),
        )
        .arg(
            Arg::new("memory-flags")
                .long("memory-flags")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Keep flags in memory instead of the flags file"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print JSON instead of text"),
        )
        .subcommand(Command::new("overview").about("Today's sessions, open queues and alerts"))
        .subcommand(Command::new("mentees").about("Mentee roster"))
        .subcommand(
            Command::new("tasks")
                .about("Task board")
                .arg(
                    Arg::new("type")
                        .long("type")
                        .value_parser(value_parser!(TaskType))
                        .help("Only this product (cvpro, interviewsim, sponsormatch, gapmap, general)"),
                )
                .arg(Arg::new("mentee").long("mentee").help("Only this mentee id"))
                .arg(Arg::new("search").long("search").help("Match title or description")),
        )
        .subcommand(
            Command::new("move-task")
                .about("Move a task to another column, optimistically")
                .arg(Arg::new("task").required(true).help("Task id, e.g. task-3"))
                .arg(
                    Arg::new("status")
                        .required(true)
                        .value_parser(["new", "in-progress", "waiting-mentee", "done"])
                        .help("Target column"),
                )
                .arg(
                    Arg::new("fail")
                        .long("fail")
                        .action(ArgAction::SetTrue)
                        .help("Make the write fail to show the rollback"),
                ),
        )
        .subcommand(Command::new("sessions").about("Session calendar"))
        .subcommand(
            Command::new("thread")
                .about("One message thread")
                .arg(Arg::new("id").required(true).help("Thread id, e.g. thread-1")),
        )
        .subcommand(Command::new("earnings").about("Earnings summary and history"))
        .subcommand(
            Command::new("flags")
                .about("Persisted flags")
                .subcommand_required(true)
                .subcommand(
                    Command::new("get")
                        .about("Print a flag")
                        .arg(Arg::new("name").required(true)),
                )
                .subcommand(
                    Command::new("set")
                        .about("Store a flag; JSON values are stored as JSON, anything else as a string")
                        .arg(Arg::new("name").required(true))
                        .arg(Arg::new("value").required(true)),
                )
                .subcommand(
                    Command::new("remove")
                        .about("Delete a flag")
                        .arg(Arg::new("name").required(true)),
                )
                .subcommand(Command::new("list").about("List stored flags and their size")),
        )
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<DashboardConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => DashboardConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => DashboardConfig::default(),
    };
    if let Some(seed) = matches.get_one::<u64>("seed") {
        config = config.with_seed(*seed);
    }
    if let Some(scale) = matches.get_one::<f64>("latency-scale") {
        config = config.with_latency_scale(*scale);
    }
    if matches.get_flag("memory-flags") {
        config = config.with_flags_backend(FlagsBackendKind::Memory);
    }
    config.validate()?;
    Ok(config)
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T) -> String) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text(value));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    let config = load_config(&matches)?;
    telemetry::init(&config.logging)?;

    let dashboard = Dashboard::from_config(&config)?;
    let json = matches.get_flag("json");

    match matches.subcommand() {
        Some(("overview", _)) => emit(json, &dashboard.overview().await?, render::overview)?,
        Some(("mentees", _)) => emit(json, &dashboard.mentees().await?, |m| render::mentees(m))?,
        Some(("tasks", args)) => {
            let mut filter = TaskFilter::new();
            if let Some(kind) = args.get_one::<TaskType>("type") {
                filter = filter.with_kind(*kind);
            }
            if let Some(mentee) = args.get_one::<String>("mentee") {
                filter = filter.with_mentee(mentee.clone());
            }
            if let Some(search) = args.get_one::<String>("search") {
                filter = filter.with_search(search.clone());
            }
            let board = dashboard.task_board(&filter).await?;
            if json {
                let shown: Vec<_> = board.columns.iter().flat_map(|c| c.tasks.iter()).collect();
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                print!("{}", render::board(&board));
            }
        }
        Some(("move-task", args)) => move_task(&dashboard, args).await?,
        Some(("sessions", _)) => emit(json, &dashboard.sessions().await?, |s| render::sessions(s))?,
        Some(("thread", args)) => {
            let id = args.get_one::<String>("id").context("thread id is required")?;
            emit(json, &dashboard.thread(id).await?, render::thread)?;
        }
        Some(("earnings", _)) => emit(json, &dashboard.earnings().await?, render::earnings)?,
        Some(("flags", args)) => flags(&dashboard, args)?,
        _ => bail!("unknown command; see --help"),
    }
    Ok(())
}

async fn move_task(dashboard: &Dashboard, args: &ArgMatches) -> anyhow::Result<()> {
    let task_id = args.get_one::<String>("task").context("task id is required")?.clone();
    let status: TaskStatus = args
        .get_one::<String>("status")
        .context("status is required")?
        .parse()?;

    let before = dashboard
        .tasks()
        .await?
        .into_iter()
        .find(|t| t.id == task_id)
        .with_context(|| format!("no task {task_id}"))?;
    println!("{}: {}", task_id, before.status);

    let watched = task_id.clone();
    let _subscription = dashboard.watch(&keys::tasks(), move |entry| {
        let shown = entry
            .data
            .as_ref()
            .and_then(|data| data.as_tasks())
            .and_then(|tasks| tasks.iter().find(|t| t.id == watched))
            .map(|t| t.status.to_string());
        println!(
            "  board [{}]: {}",
            render::status_label(entry.status, entry.is_fetching, entry.is_stale),
            shown.as_deref().unwrap_or("-")
        );
    });

    if args.get_flag("fail") {
        dashboard.source().fail_next(operations::UPDATE_TASK_STATUS, 1);
    }

    match dashboard.move_task(&task_id, status).await {
        Ok(update) => println!("{}: {} (confirmed)", update.task_id, update.status),
        Err(e) => println!("move failed: {e} (rolled back: {})", e.rolled_back()),
    }

    let after = dashboard
        .tasks()
        .await?
        .into_iter()
        .find(|t| t.id == task_id)
        .map(|t| t.status.to_string())
        .unwrap_or_default();
    println!("{task_id}: {after}");
    Ok(())
}

fn flags(dashboard: &Dashboard, args: &ArgMatches) -> anyhow::Result<()> {
    let store = dashboard.flags();
    match args.subcommand() {
        Some(("get", sub)) => {
            let name = sub.get_one::<String>("name").context("name is required")?;
            match store.try_get::<serde_json::Value>(name) {
                Some(value) => println!("{value}"),
                None => println!("{name} is not set"),
            }
        }
        Some(("set", sub)) => {
            let name = sub.get_one::<String>("name").context("name is required")?;
            let text = sub.get_one::<String>("value").context("value is required")?;
            store.set_text(name, text)?;
            if !names::is_well_known(name) {
                eprintln!("note: {name} is not a well-known flag name");
            }
        }
        Some(("remove", sub)) => {
            let name = sub.get_one::<String>("name").context("name is required")?;
            if !store.remove(name) {
                bail!("flag storage is unavailable");
            }
        }
        Some(("list", _)) => {
            if !store.is_available() {
                println!("flag storage is unavailable");
            }
            for (name, value) in store.entries() {
                println!("{name} = {value}");
            }
            println!("{} flags, {}", store.keys().len(), store.size_formatted());
        }
        _ => bail!("unknown flags command; see --help"),
    }
    Ok(())
}
