use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use linux_manager::Result;
use linux_manager::config::Config;
use linux_manager::executor::{CommandList, Executor, StdoutSink};
use linux_manager::logging::{self, LogTarget};
use linux_manager::navigator::Navigator;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Config file (default: <config dir>/linuxmanager/config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Write logs of the terminal UI to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Terminal UI (file browser + command output)
    Tui {
        /// Folder to open instead of the configured default
        #[arg(long)]
        start: Option<String>,
    },
    /// Print the menu the browser would show for a folder
    Ls {
        /// Folder to list (default: configured start folder)
        dir: Option<String>,
    },
    /// Run shell commands in order, streaming their output
    Exec {
        /// Commands; an empty one ends the list
        #[arg(required = true)]
        commands: Vec<String>,
    },
    /// List the public repositories of the configured (or given) user
    Repos {
        #[arg(long)]
        user: Option<String>,
    },
    /// Print the resolved configuration
    Config,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let cmd = args.cmd.unwrap_or(Command::Tui { start: None });

    let target = match (&cmd, args.log_file.as_deref()) {
        (_, Some(path)) => LogTarget::File(path),
        (Command::Tui { .. }, None) => LogTarget::Off,
        _ => LogTarget::Stderr,
    };
    logging::init(target)?;

    let home = linux_manager::config::home_dir()?;
    let config_path = match args.config {
        Some(p) => p,
        None => linux_manager::config::default_path()?,
    };
    let config = Config::load(&config_path, &home)?;

    match cmd {
        Command::Tui { start } => linux_manager::ui::run_tui(config, start),
        Command::Ls { dir } => cmd_ls(&config, dir),
        Command::Exec { commands } => cmd_exec(&config, commands),
        Command::Repos { user } => cmd_repos(&config, user),
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn cmd_ls(config: &Config, dir: Option<String>) -> Result<()> {
    let dir = dir
        .map(|d| linux_manager::config::expand_tilde(&d, &config.home))
        .unwrap_or_else(|| config.start_folder());
    let mut nav = Navigator::new(config.settings.sort_entries);
    nav.populate(&dir)?;
    for (i, entry) in nav.entries().iter().enumerate() {
        match entry.path() {
            Some(path) => println!("{:>3}. {:<30} {}", i + 1, entry.label(), path),
            None => println!(
                "{:>3}. {:<30} {}",
                i + 1,
                entry.label(),
                entry.hint().unwrap_or_default()
            ),
        }
    }
    Ok(())
}

fn cmd_exec(config: &Config, commands: Vec<String>) -> Result<()> {
    let list = CommandList::from_slots(commands)?;
    let executor = Executor::new(config.settings.shell.clone(), Arc::new(StdoutSink::default()));
    let report = executor.run(&list);
    if !report.ok() {
        eprintln!(
            "{} of {} command(s) failed",
            report.failed(),
            report.outcomes.len()
        );
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_repos(config: &Config, user: Option<String>) -> Result<()> {
    let user = match user.or_else(|| config.git_user().map(ToOwned::to_owned)) {
        Some(u) => u,
        None => return Err(linux_manager::Error::msg("No gituser specified in configs")),
    };
    for name in linux_manager::repos::list(config, &user)? {
        println!("{name}");
    }
    Ok(())
}
