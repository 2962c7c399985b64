use crate::{entry::Entry, errors::GenerateError};
use colored::Colorize;
use std::{fmt::Write, path::Path};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Directory,
    File,
    Modified,
}

/// Represents a node in the tree (either file or directory).
#[derive(Debug)]
struct TreeNode {
    name: String,
    kind: NodeKind,
    children: Vec<TreeNode>,
}
impl TreeNode {
    fn new(name: String, kind: NodeKind) -> Self {
        Self {
            name,
            kind,
            children: Vec::new(),
        }
    }
}

/// Build the tree for `entries`, loading deferred directories on the way.
fn build_nodes(parent: &Path, entries: &[Entry]) -> Result<Vec<TreeNode>, GenerateError> {
    let mut nodes = Vec::new();

    for entry in entries {
        let kind = match entry {
            Entry::Directory { .. } => NodeKind::Directory,
            Entry::Plain { .. } | Entry::Templated { .. } => NodeKind::File,
            Entry::Modify { .. } => NodeKind::Modified,
            // never committed
            Entry::Placeholder { .. } => continue,
        };

        let mut node = TreeNode::new(entry.name().to_string(), kind);

        if entry.is_dir() {
            let path = parent.join(entry.name());
            let children = entry.entries().map_err(|source| GenerateError::Entries {
                path: path.clone(),
                source,
            })?;

            node.children = build_nodes(&path, &children)?;
        }

        nodes.push(node);
    }

    Ok(nodes)
}

fn write_tree(out: &mut String, node: &TreeNode, prefix: &str, is_last: bool) {
    let connector = if is_last {
        "└── ".yellow()
    } else {
        "├── ".yellow()
    };
    let name = match node.kind {
        NodeKind::Directory => node.name.blue(),
        NodeKind::File => node.name.green(),
        NodeKind::Modified => node.name.magenta(),
    };
    let _ = writeln!(out, "{}{}{}", prefix.yellow(), connector, name);

    let child_prefix = if is_last {
        format!("{}    ", prefix)
    } else {
        format!("{}│   ", prefix)
    };

    let len = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        write_tree(out, child, &child_prefix, i == len - 1);
    }
}

/// Renders `entries` as an ASCII tree rooted at `destination`.
///
/// # Errors
///
/// Fails if a deferred directory cannot list its children.
pub fn render_tree(entries: &[Entry], destination: &Path) -> Result<String, GenerateError> {
    let root_name = destination
        .file_name()
        .map(|os| os.to_string_lossy().to_string())
        .unwrap_or_else(|| destination.display().to_string());

    let mut root = TreeNode::new(root_name, NodeKind::Directory);
    root.children = build_nodes(Path::new(""), entries)?;

    let mut out = String::new();
    write_tree(&mut out, &root, "", true);

    Ok(out)
}

pub fn preview_as_tree(entries: &[Entry], destination: &Path) -> Result<(), GenerateError> {
    let tree = render_tree(entries, destination)?;

    println!(
        "Legend: {} = (directory), {} = (file), {} = (modified)",
        "blue".blue(),
        "green".green(),
        "magenta".magenta()
    );

    let fancy_prompt = format!(
        "{} {}\n",
        "┌─".bold().bright_blue(),
        "Preview".bold().bright_blue(),
    );

    println!("{}", fancy_prompt);

    print!("{}", tree);

    println!();

    Ok(())
}
