//! Terminal rendering of the dashboard tree

use std::io::Write;

use colored::*;
use sai_core::domain::state::TaskState;
use sai_dashboard::{Dashboard, PageContext};
use sai_dashboard::reconciler::keys;
use sai_dashboard::topology::{PconLayout, Topology};
use sai_dashboard::tree::{NodeId, UiTree};

/// What the terminal shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Events list and builder fleet, redrawn in place
    Overview,
    /// One task's header followed by its streaming log
    Task,
}

impl Mode {
    /// Task pages follow their log, anything else shows the overview
    pub fn for_page(page: &PageContext) -> Self {
        if page.is_task_view() {
            Mode::Task
        } else {
            Mode::Overview
        }
    }
}

pub struct View {
    mode: Mode,
    last: Vec<String>,
}

impl View {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            last: Vec::new(),
        }
    }

    /// Forget what was drawn, so the next refresh draws everything
    pub fn reset(&mut self) {
        self.last.clear();
    }

    /// Redraws if anything visible changed
    pub fn refresh(&mut self, dash: &Dashboard) {
        let lines = match self.mode {
            Mode::Overview => {
                let mut lines = header_lines(dash);
                lines.extend(overview_lines(dash.tree()));
                lines.extend(fleet_lines(dash.topology()));
                lines
            }
            Mode::Task => match dash.page().task.as_deref() {
                Some(task) => task_lines(dash.tree(), task),
                None => Vec::new(),
            },
        };
        if lines == self.last {
            return;
        }
        if self.mode == Mode::Overview {
            print!("\x1b[2J\x1b[H");
        }
        for line in &lines {
            println!("{line}");
        }
        self.last = lines;
    }

    /// Log output that just became visible
    pub fn log(&self, text: &str) -> std::io::Result<()> {
        let mut out = std::io::stdout().lock();
        out.write_all(text.as_bytes())?;
        out.flush()
    }

    pub fn notice(&self, text: &str) {
        eprintln!("{}", text.yellow());
    }
}

/// Text content of rendered markup: tags dropped, `<br>` as a newline,
/// entities decoded
pub fn plain(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let end = rest[start..].find('>').map_or(rest.len(), |e| start + e + 1);
        if rest[start..end].eq_ignore_ascii_case("<br>") {
            out.push('\n');
        }
        rest = &rest[end..];
    }
    out.push_str(rest);
    out.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn text_of(tree: &UiTree, key: &str) -> String {
    tree.by_key(key)
        .map(|node| plain(tree.text(node)).trim().to_string())
        .unwrap_or_default()
}

fn state_of(tree: &UiTree, node: NodeId) -> Option<TaskState> {
    tree.attr(node, "state")
        .and_then(|s| s.parse::<u8>().ok())
        .map(TaskState::from)
}

fn state_mark(state: TaskState) -> ColoredString {
    match state {
        TaskState::Waiting => "·".dimmed(),
        TaskState::Dispatched | TaskState::Building => "▸".cyan(),
        TaskState::Success => "✔".green(),
        TaskState::Failed => "✘".red(),
        TaskState::Cancelled => "-".yellow(),
        TaskState::BuildingWithFailures => "▸".red(),
        TaskState::Unknown(_) => "?".dimmed(),
    }
}

fn state_name(state: TaskState) -> ColoredString {
    let name = format!("{:?}", state);
    match state {
        TaskState::Waiting | TaskState::Unknown(_) => name.dimmed(),
        TaskState::Dispatched | TaskState::Building => name.cyan(),
        TaskState::Success => name.green(),
        TaskState::Failed | TaskState::BuildingWithFailures => name.red(),
        TaskState::Cancelled => name.yellow(),
    }
}

fn header_lines(dash: &Dashboard) -> Vec<String> {
    let who = match dash.session().user() {
        Some(user) => format!("logged in as {user}"),
        None => "not logged in".to_string(),
    };
    vec![format!("{}  {}", "Sai".bold(), who.dimmed()), String::new()]
}

/// One block per event: summary line, then a line per task group
pub fn overview_lines(tree: &UiTree) -> Vec<String> {
    let Some(table) = tree.by_key(keys::EVENTS) else {
        return vec!["Waiting for events...".dimmed().to_string()];
    };
    let mut lines = Vec::new();
    for row in tree.children(table) {
        let Some(uuid) = tree
            .get(*row)
            .and_then(|node| node.key())
            .and_then(|key| key.strip_prefix("ev-"))
        else {
            continue;
        };
        let field = |part: &str| text_of(tree, &keys::summary("ev", part, uuid));

        let marker = match tree.by_key(&keys::summary("ev", "comp", uuid)) {
            Some(comp) if tree.has_class(comp, "comp_pass") => "✔".green(),
            Some(comp) if tree.has_class(comp, "comp_fail") => "✘".red(),
            _ => "●".cyan(),
        };
        lines.push(format!(
            "{} {} {} {} {}  {}",
            marker,
            field("repo").bold(),
            field("ref"),
            field("hash").dimmed(),
            field("age").dimmed(),
            text_of(tree, &keys::progress_text(uuid)),
        ));

        let Some(tasks) = tree.by_key(&keys::event_tasks(uuid)) else {
            continue;
        };
        for group in tree.children(tasks) {
            let Some(taskname) = tree.attr(*group, "taskname") else {
                continue;
            };
            let marks: String = tree
                .by_key(&keys::group_row(uuid, taskname))
                .map(|row| {
                    tree.children(row)
                        .iter()
                        .filter_map(|node| state_of(tree, *node))
                        .map(|state| state_mark(state).to_string())
                        .collect()
                })
                .unwrap_or_default();
            lines.push(format!("    {:<24} {}", taskname, marks));
        }
    }
    lines
}

fn pcon_lines(lines: &mut Vec<String>, topology: &Topology, pcon: &PconLayout, depth: usize) {
    let indent = "  ".repeat(depth);
    let power = if pcon.on { "⏻".green() } else { "⏻".dimmed() };
    lines.push(format!("{indent}{} {} {}", power, pcon.name.bold(), pcon.kind.dimmed()));
    for name in &pcon.builders {
        lines.push(builder_line(topology, name, depth + 1));
    }
    for child in &pcon.children {
        pcon_lines(lines, topology, child, depth + 1);
    }
}

fn builder_line(topology: &Topology, name: &str, depth: usize) -> String {
    let indent = "  ".repeat(depth);
    let Some(builder) = topology.builder(name) else {
        return format!("{indent}{name}");
    };
    let status = if builder.online {
        "●".green()
    } else if builder.powering_up {
        "◐".yellow()
    } else {
        "○".red()
    };
    let loads: Vec<String> = builder.loads.iter().map(|l| format!("{l:>3}%")).collect();
    format!("{indent}{} {} {}", status, name, loads.join(" ").dimmed())
}

/// Builders grouped under their power controllers
pub fn fleet_lines(topology: &Topology) -> Vec<String> {
    if topology.builders().is_empty() {
        return Vec::new();
    }
    let layout = topology.layout();
    let mut lines = vec![String::new(), "Builders".bold().to_string()];
    for root in &layout.roots {
        pcon_lines(&mut lines, topology, root, 1);
    }
    if !layout.unmanaged.is_empty() {
        lines.push(format!("  {}", "unmanaged".dimmed()));
        for name in &layout.unmanaged {
            lines.push(builder_line(topology, name, 2));
        }
    }
    lines
}

fn descendant_text(tree: &UiTree, under: NodeId, key_prefix: &str) -> String {
    tree.descendants(under)
        .into_iter()
        .find(|node| {
            tree.get(*node)
                .and_then(|n| n.key())
                .is_some_and(|key| key.starts_with(key_prefix))
        })
        .map(|node| plain(tree.text(node)).trim().to_string())
        .unwrap_or_default()
}

/// Task header: event, task state and builder, then any artifacts
pub fn task_lines(tree: &UiTree, task: &str) -> Vec<String> {
    let Some(panel) = tree.by_key(&keys::task_panel(task)) else {
        return vec![format!("Waiting for task {task}...").dimmed().to_string()];
    };
    let part = |name: &str| text_of(tree, &keys::panel_part(name, task));

    let mut lines = vec![format!(
        "{} {} {}",
        descendant_text(tree, panel, "tievrepo-").bold(),
        descendant_text(tree, panel, "tievref-"),
        descendant_text(tree, panel, "tievhash-").dimmed(),
    )];
    let state = state_of(tree, panel)
        .map(|s| state_name(s).to_string())
        .unwrap_or_default();
    let builder = part("builder");
    let mut status = format!("{} {} {}", state, part("state").bold(), part("plat").dimmed());
    if !builder.is_empty() {
        status.push_str(&format!(" on {builder}"));
    }
    lines.push(status);

    if let Some(arts) = tree.by_key(&keys::artifacts(task)) {
        for art in tree.children(arts) {
            lines.push(format!("  {} {}", "⤓".cyan(), plain(tree.text(*art)).trim()));
        }
    }
    lines
}
