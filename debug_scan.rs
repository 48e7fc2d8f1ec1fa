// Run with: cargo run -p projtree-core --example debug_scan -- /path/to/project
// Prints raw scanner messages with timestamps, then syncs a tree once.

use projtree_core::{FileNode, NodeId, NodeTree, ScanConfig, ScanMessage, Scanner};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

fn main() {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    println!("Scanning: {:?}", path);

    let scanner = Scanner::new(ScanConfig::default());
    let (rx, handle) = match scanner.scan(path.clone(), |p: &Path| FileNode::classified(p)) {
        Ok(scan) => scan,
        Err(e) => {
            println!("ERROR: {}", e);
            return;
        }
    };

    let start = Instant::now();
    let mut last_print = Instant::now();
    let mut updates = 0u64;

    for msg in rx {
        match msg {
            ScanMessage::Started(root) => {
                println!("[{:>6.1}s] STARTED {:?}", start.elapsed().as_secs_f64(), root);
            }
            ScanMessage::Progress(p) => {
                updates += 1;
                let now = Instant::now();
                // Print every 200ms or at the end of the range
                if now.duration_since(last_print) > Duration::from_millis(200) || p.is_done() {
                    println!(
                        "[{:>6.1}s] progress={:>3}% value={:<8} updates={}",
                        start.elapsed().as_secs_f64(),
                        p.percent(),
                        p.value,
                        updates
                    );
                    last_print = now;
                }
            }
            ScanMessage::Completed => {
                println!("[{:>6.1}s] COMPLETED", start.elapsed().as_secs_f64());
            }
            ScanMessage::Cancelled => {
                println!("[{:>6.1}s] CANCELLED", start.elapsed().as_secs_f64());
            }
        }
    }

    let files = handle.join().unwrap();
    println!("\nFound {} files", files.len());

    let mut tree = NodeTree::new();
    let project = tree.new_project_node(path);
    tree.add_project_nodes(NodeId::SESSION, &[project]);

    let sync_start = Instant::now();
    let stats = tree.build_tree(project, files, None);
    println!(
        "Synced in {:.1}ms: {} added, {} nodes",
        sync_start.elapsed().as_secs_f64() * 1000.0,
        stats.added,
        tree.len()
    );
}
