mod output;

use std::path::{Path, PathBuf};

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use log::{debug, info};
use projtree_core::{EventLog, FileNode, NodeId, NodeTree, ScanConfig, ScanMessage, Scanner};

use output::{Summary, file_list, render_tree};

/// projtree - print project directories the way an IDE project explorer shows them
#[derive(Parser, Debug)]
#[command(name = "projtree")]
#[command(about = "Scan project directories into a project tree and print it")]
#[command(version)]
struct Args {
    /// Project directories, one project each (defaults to current directory)
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    /// Keep version control metadata such as .git in the tree
    #[arg(long)]
    include_vcs: bool,

    /// Do not descend into symlinked directories
    #[arg(long)]
    no_follow_symlinks: bool,

    /// Scan again after the first sync and report what changed
    #[arg(long)]
    rescan: bool,

    /// Print a flat list of files instead of the tree
    #[arg(long)]
    files_only: bool,

    /// No progress or summary on stderr
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let config = ScanConfig {
        follow_symlinks: !args.no_follow_symlinks,
        skip_vcs: !args.include_vcs,
    };

    let events = EventLog::new();
    let mut tree = NodeTree::with_observer(events.clone());

    let mut projects = Vec::with_capacity(args.paths.len());
    for path in &args.paths {
        let path = path
            .canonicalize()
            .wrap_err_with(|| format!("Cannot open project directory {}", path.display()))?;
        let project = tree.new_project_node(path.clone());
        tree.add_project_nodes(NodeId::SESSION, &[project]);

        let files = scan(&path, &config, args.quiet)?;
        let stats = tree.build_tree(project, files, None);
        info!("{}: {} files", path.display(), stats.added);
        projects.push((project, path));
    }
    debug!("Initial sync emitted {} notifications", events.len());
    events.take();

    if args.rescan {
        for (project, path) in &projects {
            let files = scan(path, &config, args.quiet)?;
            let stats = tree.build_tree(*project, files, None);
            let notifications = events.take();
            eprintln!(
                "{}: {} added, {} removed, {} unchanged, {} notifications",
                path.display(),
                stats.added,
                stats.removed,
                stats.unchanged,
                notifications.len()
            );
        }
    }

    if args.files_only {
        for (project, _) in &projects {
            for file in file_list(&tree, *project) {
                println!("{}", file.display());
            }
        }
    } else {
        print!("{}", render_tree(&tree, NodeId::SESSION));
    }

    if !args.quiet {
        let mut summary = Summary::default();
        tree.accept(NodeId::SESSION, &mut summary);
        eprintln!("{summary}");
    }

    Ok(())
}

/// Scan one project directory on a worker thread, showing progress on stderr
fn scan(path: &Path, config: &ScanConfig, quiet: bool) -> Result<Vec<FileNode>> {
    let scanner = Scanner::new(config.clone());
    let (rx, handle) = scanner.scan(path.to_path_buf(), |file: &Path| FileNode::classified(file))?;

    let mut last_percent = None;
    for msg in rx {
        match msg {
            ScanMessage::Started(root) => debug!("Scanning {}", root.display()),
            ScanMessage::Progress(progress) => {
                let percent = progress.percent();
                if !quiet && last_percent != Some(percent) {
                    eprint!("\rScanning {} {:>3}%", path.display(), percent);
                    last_percent = Some(percent);
                }
            }
            ScanMessage::Completed => debug!("Finished {}", path.display()),
            ScanMessage::Cancelled => debug!("Cancelled {}", path.display()),
        }
    }
    if last_percent.is_some() {
        eprintln!();
    }

    handle
        .join()
        .map_err(|_| eyre!("Scanner thread for {} panicked", path.display()))
}
