use std::path::PathBuf;

use anstyle::Style;
use clap::{Parser, Subcommand};
use gongfeng_git::config;
use gongfeng_git::git::{
    Branch, BranchType, PullOptions, PushOptions, Repository, RepositoryType, git_error,
};
use gongfeng_git::git::{ProgressEvent, StatusResult};
use gongfeng_git::styling::{
    ERROR, ERROR_EMOJI, HINT, PROGRESS, PROGRESS_EMOJI, SECONDARY, SUCCESS, SUCCESS_EMOJI,
    eprint, eprintln, println,
};

#[derive(Parser)]
#[command(name = "gf-git")]
#[command(about = "Inspect a git repository the way gongfeng sees it", long_about = None)]
struct Cli {
    /// Run as if started in <PATH>
    #[arg(short = 'C', global = true, value_name = "PATH")]
    directory: Option<PathBuf>,

    /// Config file (defaults to <config dir>/gongfeng/git.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Show debug logging, including every git command
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Working-directory status
    Status,
    /// Local and remote-tracking branches
    Branches,
    /// Remotes with their roles
    Remotes,
    /// Infer the remote branch a local branch tracks
    Tracking { branch: String },
    /// Classify a path as regular, bare, missing or unsafe
    RepoType { path: Option<PathBuf> },
    /// The checked-out branch
    CurrentBranch,
    /// Recent commits
    Log {
        range: Option<String>,
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
    /// Fetch from a remote
    Fetch { remote: String },
    /// Pull from a remote
    Pull {
        remote: String,
        #[arg(long)]
        recurse_submodules: bool,
    },
    /// Push a branch to a remote
    Push {
        remote: String,
        branch: String,
        /// Push to this remote branch instead of setting a new upstream
        #[arg(long)]
        remote_branch: Option<String>,
        #[arg(long)]
        force_with_lease: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Some(path) = cli.config.clone() {
        config::set_config_path(path);
    }
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        match git_error(&e) {
            Some(git_err) => eprintln!("{git_err}"),
            None => eprintln!("{ERROR_EMOJI} {ERROR}{e:#}{ERROR:#}"),
        }
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "debug".to_string()
    } else {
        config::settings()
            .log_level
            .clone()
            .unwrap_or_else(|| "warn".to_string())
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let repo = cli
        .directory
        .as_ref()
        .map(Repository::at)
        .unwrap_or_else(Repository::current);

    match cli.command {
        Commands::Status => match repo.status()? {
            Some(status) => print_status(&status),
            None => println!("{HINT}Not a git repository{HINT:#}"),
        },
        Commands::Branches => {
            for branch in repo.branches()? {
                print_branch(&branch);
            }
        }
        Commands::Remotes => {
            for remote in repo.resolved_remotes()? {
                let url = remote
                    .fetch_url
                    .as_ref()
                    .map(|u| u.raw().to_string())
                    .unwrap_or_default();
                match remote.role {
                    Some(role) => println!("{}\t{url}\t{SECONDARY}({role}){SECONDARY:#}", remote.name),
                    None => println!("{}\t{url}", remote.name),
                }
            }
        }
        Commands::Tracking { branch } => match repo.determine_tracking_branch(&branch)? {
            Some(tracking) => println!("{tracking}"),
            None => println!("{HINT}No tracking branch found for {branch}{HINT:#}"),
        },
        Commands::RepoType { path } => {
            let target = path.map(Repository::at).unwrap_or(repo);
            match target.repository_type()? {
                RepositoryType::Regular {
                    top_level_working_directory,
                } => println!("regular\t{}", top_level_working_directory.display()),
                RepositoryType::Bare => println!("bare"),
                RepositoryType::Missing => println!("missing"),
                RepositoryType::Unsafe { path } => println!("unsafe\t{}", path.display()),
            }
        }
        Commands::CurrentBranch => match repo.current_branch()? {
            Some(branch) => println!("{branch}"),
            None => println!("{HINT}HEAD is detached{HINT:#}"),
        },
        Commands::Log { range, limit } => {
            for commit in repo.commits(range.as_deref(), Some(limit))? {
                let tags = if commit.tags.is_empty() {
                    String::new()
                } else {
                    format!(" {SECONDARY}({}){SECONDARY:#}", commit.tags.join(", "))
                };
                println!(
                    "{PROGRESS}{}{PROGRESS:#} {}{tags} {HINT}{}{HINT:#}",
                    commit.short_sha, commit.summary, commit.author.name
                );
            }
        }
        Commands::Fetch { remote } => {
            repo.fetch(&remote, Some(&mut render_progress))?;
        }
        Commands::Pull {
            remote,
            recurse_submodules,
        } => {
            let options = PullOptions { recurse_submodules };
            repo.pull(&remote, &options, Some(&mut render_progress))?;
        }
        Commands::Push {
            remote,
            branch,
            remote_branch,
            force_with_lease,
        } => {
            let options = PushOptions {
                force_with_lease,
                tags: Vec::new(),
            };
            repo.push(
                &remote,
                &branch,
                remote_branch.as_deref(),
                &options,
                Some(&mut render_progress),
            )?;
        }
    }
    Ok(())
}

fn print_status(status: &StatusResult) {
    let head = status.branch.head.as_deref().unwrap_or("(detached)");
    let mut header = format!("On {head}");
    if let Some(upstream) = &status.branch.upstream {
        header.push_str(&format!(" tracking {upstream}"));
    }
    if let Some((ahead, behind)) = status.branch.ahead_behind {
        header.push_str(&format!(" (+{ahead} -{behind})"));
    }
    println!("{header}");
    if status.merge_in_progress {
        println!("{ERROR}Merge in progress{ERROR:#}");
    }
    if status.is_clean() {
        println!("{SUCCESS_EMOJI} {SUCCESS}Working tree clean{SUCCESS:#}");
        return;
    }
    for entry in &status.entries {
        let mut line = format!("{:<10} {}", entry.kind.to_string(), entry.path);
        if let Some(old_path) = &entry.old_path {
            line.push_str(&format!(" <- {old_path}"));
        }
        if let Some(conflict) = &entry.conflict {
            let markers = conflict
                .marker_count
                .map(|n| format!(", {n} markers"))
                .unwrap_or_default();
            line.push_str(&format!(" {HINT}[{}{markers}]{HINT:#}", conflict.action));
        }
        if let Some(submodule) = entry.submodule {
            let mut flags = Vec::new();
            if submodule.commit_changed {
                flags.push("commit");
            }
            if submodule.modified_changes {
                flags.push("modified");
            }
            if submodule.untracked_changes {
                flags.push("untracked");
            }
            line.push_str(&format!(" {HINT}[submodule: {}]{HINT:#}", flags.join(", ")));
        }
        println!("{line}");
    }
}

fn print_branch(branch: &Branch) {
    let style = match branch.branch_type {
        BranchType::Local => Style::new(),
        BranchType::Remote => SECONDARY,
    };
    let short_sha = branch.tip.sha.get(..7).unwrap_or(&branch.tip.sha);
    let upstream = branch
        .upstream
        .as_deref()
        .map(|u| format!(" {HINT}-> {u}{HINT:#}"))
        .unwrap_or_default();
    println!("{style}{}{style:#} {short_sha}{upstream}", branch.name);
}

fn render_progress(event: ProgressEvent) {
    let percent = (event.value * 100.0).round() as u32;
    let description = event.description.unwrap_or_default();
    eprint!(
        "\r\x1b[2K{PROGRESS_EMOJI} {PROGRESS}{} {percent:>3}%{PROGRESS:#} {HINT}{description}{HINT:#}",
        event.title
    );
    if event.value >= 1.0 {
        eprintln!();
    }
}
