//! Human-readable rendering of trees, plans, and summaries.

use colored::{ColoredString, Colorize};
use serde::Serialize;

use crate::model::{Action, ActionKind, LeafStatus, UnifiedNode};
use crate::sync::SyncSummary;
use crate::sync::plan::count_by_kind;

/// One line of a rendered unified tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeLine {
    pub depth: usize,
    pub name: String,
    /// `None` for directories.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LeafStatus>,
    /// Which sides the entry exists on: `"disk"`, `"records"` or `"both"`.
    pub sides: &'static str,
}

fn sides(on_disk: bool, in_records: bool) -> &'static str {
    match (on_disk, in_records) {
        (true, true) => "both",
        (true, false) => "disk",
        _ => "records",
    }
}

/// Flatten a unified tree in display order: a directory, its documents, then its subdirectories.
#[must_use]
pub fn tree_lines(root: &UnifiedNode) -> Vec<TreeLine> {
    let mut lines = Vec::new();
    push_node(root, 0, &mut lines);
    lines
}

fn push_node(node: &UnifiedNode, depth: usize, lines: &mut Vec<TreeLine>) {
    lines.push(TreeLine {
        depth,
        name: node.display_name.clone(),
        status: None,
        sides: sides(node.on_disk, node.folder.is_some() || depth == 0),
    });
    for leaf in &node.files {
        lines.push(TreeLine {
            depth: depth + 1,
            name: leaf.name.clone(),
            status: Some(leaf.status()),
            sides: sides(leaf.on_disk, leaf.has_record()),
        });
    }
    for child in &node.subdirs {
        push_node(child, depth + 1, lines);
    }
}

fn paint_status(status: LeafStatus) -> ColoredString {
    match status {
        LeafStatus::Conflict => status.as_str().red().bold(),
        LeafStatus::Export => status.as_str().yellow(),
        LeafStatus::Import => status.as_str().cyan(),
        LeafStatus::InSync => status.as_str().green(),
    }
}

fn paint_kind(kind: ActionKind) -> ColoredString {
    let label = format!("{:<8}", kind.as_str());
    match kind {
        ActionKind::Conflict => label.red().bold(),
        ActionKind::Export => label.yellow(),
        ActionKind::Import => label.cyan(),
        ActionKind::Mkdir | ActionKind::Mkfolder => label.blue(),
    }
}

/// Print the unified tree with per-document status.
pub fn print_tree(root: &UnifiedNode) {
    for line in tree_lines(root) {
        let indent = "  ".repeat(line.depth);
        match line.status {
            None => println!("{indent}{}/ {}", line.name.bold(), format!("[{}]", line.sides).dimmed()),
            Some(status) => println!(
                "{indent}{} {} {}",
                line.name,
                paint_status(status),
                format!("[{}]", line.sides).dimmed()
            ),
        }
    }
}

/// Print a planned action list, one action per line, followed by per-kind counts.
pub fn print_actions(actions: &[Action], skipped: usize) {
    if actions.is_empty() {
        println!("{}", "Nothing to do: both sides are in sync.".green());
    } else {
        println!("{}", "Planned Actions:".bold().underline());
        for action in actions {
            let target = if action.kind.is_leaf() {
                format!("{}/{}", action.path, action.name)
            } else {
                action.path.clone()
            };
            println!("  {} {target}", paint_kind(action.kind));
        }
        println!();
        let counts: Vec<String> = count_by_kind(actions)
            .into_iter()
            .map(|(kind, n)| format!("{kind}: {n}"))
            .collect();
        println!("  {}", counts.join(", "));
    }
    if skipped > 0 {
        println!("  {}", format!("{skipped} skipped by skip rules").dimmed());
    }
}

/// Print a batch summary.
pub fn print_summary(summary: &SyncSummary) {
    println!("{}", "Sync Summary".bold().underline());
    println!();

    if summary.is_empty() {
        println!("{}", "Nothing to do: both sides are in sync.".green());
        return;
    }

    let rows = [
        ("Directories created", summary.directories),
        ("Folders created", summary.folders),
        ("Exported", summary.exported),
        ("Imported", summary.imported),
    ];
    for (label, count) in rows {
        if count > 0 {
            println!("  {label:<20} {count}");
        }
    }
    if summary.conflicts > 0 {
        println!("  {:<20} {}", "Conflicts".red().bold(), summary.conflicts);
    }
    if summary.skipped > 0 {
        println!("  {:<20} {}", "Skipped".yellow(), summary.skipped);
    }
    if summary.failed > 0 {
        println!("  {:<20} {}", "Failed".red(), summary.failed);
    }
    println!();
    println!("  {}: {}", "Total applied".bold(), summary.total_applied());

    if summary.conflicts > 0 {
        println!();
        println!(
            "{}",
            "Conflicting documents changed on both sides; edit one side and sync again.".dimmed()
        );
    }
    if summary.failed > 0 {
        println!("{}", "Run with -v to see why actions failed.".dimmed());
    }
}
