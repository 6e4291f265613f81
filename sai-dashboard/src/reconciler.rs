//! Entity reconciliation
//!
//! Maps events, tasks and artifacts onto keyed nodes of the [`UiTree`].
//! Once a node for an entity exists it is patched in place; only a full
//! overview snapshot throws the events list away and builds it again.

use std::collections::HashMap;

use sai_core::domain::event::{Event, RefKind};
use sai_core::domain::state::TaskState;
use sai_core::domain::task::Task;
use sai_core::dto::inbound::{Artifact, EventEntry, TaskActivity, TaskInfo};
use tracing::debug;

use crate::age;
use crate::format::{class_token, escape_html, humanize, plat_icon};
use crate::i18n::Translator;
use crate::progress::Progress;
use crate::session::AuthState;
use crate::tree::{NodeId, UiTree};

/// Node keys, the identity of everything the reconciler renders
pub mod keys {
    pub const STICKY: &str = "sai_sticky";
    pub const OVERVIEW: &str = "sai_overview";
    pub const BUILDERS: &str = "sai_builders";
    pub const CREDS: &str = "creds";
    pub const LOGOUT: &str = "logout";
    pub const REMAUTH: &str = "remauth";
    pub const REMAUTH_AGE: &str = "remauth-age";
    pub const EVENTS: &str = "sai_events";
    pub const LOG_LINES: &str = "dlogsn";
    pub const LOG_TIMES: &str = "dlogst";
    pub const LOG_TEXT: &str = "logs";

    pub fn event(uuid: &str) -> String {
        format!("ev-{uuid}")
    }

    /// A field of an event summary; `prefix` is "ev" in the events list
    /// and "tiev" inside a task panel
    pub fn summary(prefix: &str, part: &str, uuid: &str) -> String {
        format!("{prefix}{part}-{uuid}")
    }

    pub fn event_tasks(uuid: &str) -> String {
        format!("evtasks-{uuid}")
    }

    pub fn event_progress(uuid: &str) -> String {
        format!("evprog-{uuid}")
    }

    pub fn progress_text(uuid: &str) -> String {
        format!("evprogtxt-{uuid}")
    }

    pub fn progress_bar(uuid: &str, segment: &str) -> String {
        format!("evbar-{uuid}-{segment}")
    }

    pub fn event_rebuild(uuid: &str) -> String {
        format!("rebuild-ev-{uuid}")
    }

    pub fn event_delete(uuid: &str) -> String {
        format!("delete-ev-{uuid}")
    }

    pub fn group(event: &str, taskname: &str) -> String {
        format!("grp-{event}-{taskname}")
    }

    pub fn group_row(event: &str, taskname: &str) -> String {
        format!("grprow-{event}-{taskname}")
    }

    pub fn group_label(event: &str, taskname: &str) -> String {
        format!("grplabel-{event}-{taskname}")
    }

    pub fn task(uuid: &str) -> String {
        format!("task-{uuid}")
    }

    pub fn task_link(uuid: &str) -> String {
        format!("tasklink-{uuid}")
    }

    pub fn task_panel(uuid: &str) -> String {
        format!("taskinfo-{uuid}")
    }

    pub fn task_stop(uuid: &str) -> String {
        format!("stop-{uuid}")
    }

    pub fn task_rebuild(uuid: &str) -> String {
        format!("rebuild-{uuid}")
    }

    /// A field of a task panel
    pub fn panel_part(part: &str, uuid: &str) -> String {
        format!("ti{part}-{uuid}")
    }

    pub fn artifacts(uuid: &str) -> String {
        format!("arts-{uuid}")
    }

    pub fn artifact(task: &str, nonce: &str, filename: &str) -> String {
        format!("art-{task}-{nonce}-{filename}")
    }

    pub fn builder(name: &str) -> String {
        format!("bld-{name}")
    }

    pub fn builder_label(name: &str) -> String {
        format!("bldlabel-{name}")
    }

    pub fn builder_loads(name: &str) -> String {
        format!("bldloads-{name}")
    }

    pub fn builder_load(name: &str, instance: usize) -> String {
        format!("bldload-{name}-{instance}")
    }
}

/// Page-wide inputs to a render pass
#[derive(Debug, Clone, Copy)]
pub struct RenderCtx<'a> {
    /// Unix seconds
    pub now: i64,
    pub authorized: bool,
    /// Event-wide actions are not offered inside a git browser
    pub git_integrated: bool,
    pub tr: &'a Translator,
}

/// Creates the fixed page skeleton every render pass hangs off
pub fn ensure_layout(tree: &mut UiTree) {
    let root = tree.root();
    tree.ensure_child(root, keys::CREDS, "div");
    if tree.by_key(keys::LOGOUT).is_none() {
        let logout = tree.ensure_child(root, keys::LOGOUT, "div");
        tree.add_class(logout, "hide");
    }
    tree.ensure_child(root, keys::REMAUTH, "span");
    tree.ensure_child(root, keys::STICKY, "div");
    tree.ensure_child(root, keys::OVERVIEW, "div");
    tree.ensure_child(root, keys::BUILDERS, "div");
}

pub(crate) fn layout_node(tree: &mut UiTree, key: &str) -> NodeId {
    match tree.by_key(key) {
        Some(id) => id,
        None => {
            ensure_layout(tree);
            let root = tree.root();
            tree.ensure_child(root, key, "div")
        }
    }
}

/// Which of the three task-detail branches handled a task frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Indicator,
    Panel,
    Built,
    Ignored,
}

fn set_state(tree: &mut UiTree, node: NodeId, state: TaskState) {
    tree.replace_class_prefix(node, "taskstate", Some(&format!("taskstate{}", state.code())));
    tree.set_attr(node, "state", state.code().to_string());
}

fn node_state(tree: &UiTree, node: NodeId) -> Option<TaskState> {
    tree.attr(node, "state")
        .and_then(|s| s.parse::<u8>().ok())
        .map(TaskState::from)
}

#[derive(Debug, Default)]
pub struct Reconciler {
    /// Artifacts announced before their task panel existed
    pending_artifacts: HashMap<String, Vec<Artifact>>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies an overview frame
    ///
    /// With `delta` set the single event in the frame is patched where it
    /// stands; otherwise the events list is rebuilt from the frame.
    pub fn apply_overview(
        &mut self,
        tree: &mut UiTree,
        entries: &[EventEntry],
        delta: bool,
        ctx: &RenderCtx,
    ) {
        if delta {
            if let [entry] = entries {
                if let Some(row) = tree.by_key(&keys::event(&entry.e.uuid)) {
                    debug!("overview delta for event {}", entry.e.uuid);
                    self.patch_event(tree, row, entry, ctx);
                    return;
                }
            }
        }

        debug!("overview snapshot of {} events", entries.len());
        let sticky = layout_node(tree, keys::STICKY);
        tree.clear_children(sticky);
        let table = tree.create_keyed("table", keys::EVENTS);
        tree.append(sticky, table);
        for entry in entries {
            let row = tree.create_keyed("tr", &keys::event(&entry.e.uuid));
            tree.append(table, row);
            tree.add_class(row, "event");
            self.patch_event(tree, row, entry, ctx);
        }
    }

    fn patch_event(&mut self, tree: &mut UiTree, row: NodeId, entry: &EventEntry, ctx: &RenderCtx) {
        let uuid = &entry.e.uuid;
        patch_event_summary(tree, row, "ev", &entry.e, entry.t.len(), ctx, true);
        let progress = tree.ensure_child(row, &keys::event_progress(uuid), "td");
        tree.add_class(progress, "progress");
        let tasks = tree.ensure_child(row, &keys::event_tasks(uuid), "td");
        tree.add_class(tasks, "tasks");

        for task in &entry.t {
            place_task(tree, tasks, uuid, task);
        }
        refresh_event(tree, uuid);
    }

    /// Applies a task frame along the branch the router picked
    pub fn apply_task(
        &mut self,
        tree: &mut UiTree,
        info: &TaskInfo,
        outcome: TaskOutcome,
        ctx: &RenderCtx,
    ) -> TaskOutcome {
        let uuid = &info.t.uuid;
        match outcome {
            TaskOutcome::Indicator => {
                let Some(indicator) = tree.by_key(&keys::task(uuid)) else {
                    return TaskOutcome::Ignored;
                };
                set_state(tree, indicator, info.t.state);
                if let Some(event) = tree.attr(indicator, "event").map(str::to_string) {
                    refresh_event(tree, &event);
                }
                TaskOutcome::Indicator
            }
            TaskOutcome::Panel => {
                let Some(panel) = tree.by_key(&keys::task_panel(uuid)) else {
                    return TaskOutcome::Ignored;
                };
                patch_task_panel(tree, panel, info, ctx);
                TaskOutcome::Panel
            }
            TaskOutcome::Built => {
                self.build_task_panel(tree, info, ctx);
                TaskOutcome::Built
            }
            TaskOutcome::Ignored => TaskOutcome::Ignored,
        }
    }

    fn build_task_panel(&mut self, tree: &mut UiTree, info: &TaskInfo, ctx: &RenderCtx) {
        let uuid = &info.t.uuid;
        debug!("building detail panel for task {}", uuid);

        let sticky = layout_node(tree, keys::STICKY);
        tree.clear_children(sticky);
        let panel = tree.create_keyed("div", &keys::task_panel(uuid));
        tree.append(sticky, panel);
        tree.add_class(panel, "taskinfo");
        patch_task_panel(tree, panel, info, ctx);

        let overview = layout_node(tree, keys::OVERVIEW);
        tree.clear_children(overview);
        let pre = tree.create("pre");
        tree.append(overview, pre);
        for (key, class) in [
            (keys::LOG_LINES, "dlogsn"),
            (keys::LOG_TIMES, "dlogst"),
            (keys::LOG_TEXT, "nowrap"),
        ] {
            let column = tree.ensure_child(pre, key, "div");
            tree.add_class(column, class);
        }

        if let Some(pending) = self.pending_artifacts.remove(uuid) {
            for art in &pending {
                self.apply_artifact(tree, art, ctx.tr);
            }
        }
    }

    /// Lists a download for a task, deferring it until the task's panel
    /// exists
    pub fn apply_artifact(&mut self, tree: &mut UiTree, art: &Artifact, tr: &Translator) {
        let Some(list) = tree.by_key(&keys::artifacts(&art.task_uuid)) else {
            debug!("holding artifact {} until its task is shown", art.blob_filename);
            let pending = self
                .pending_artifacts
                .entry(art.task_uuid.clone())
                .or_default();
            if !pending.contains(art) {
                pending.push(art.clone());
            }
            return;
        };
        let key = keys::artifact(&art.task_uuid, &art.artifact_down_nonce, &art.blob_filename);
        if tree.by_key(&key).is_some() {
            return;
        }
        let item = tree.ensure_child(list, &key, "div");
        tree.add_class(item, "sai_arts");
        tree.set_text(
            item,
            format!(
                "<img src=\"artifact.svg\">&nbsp;<a href=\"{}\" title=\"{}\">{}</a>&nbsp;{}B",
                escape_html(&art.download_path()),
                escape_html(&tr.translate("Download", &[])),
                escape_html(&art.blob_filename),
                humanize(art.len)
            ),
        );
    }

    pub fn pending_artifacts(&self, task: &str) -> usize {
        self.pending_artifacts.get(task).map_or(0, Vec::len)
    }

    /// Marks what a task is busy with; false if the task is not shown
    pub fn apply_activity(&mut self, tree: &mut UiTree, activity: &TaskActivity) -> bool {
        let class = format!("activity-{}", class_token(&activity.activity));
        let mut shown = false;
        for key in [
            keys::task(&activity.task_uuid),
            keys::task_panel(&activity.task_uuid),
        ] {
            if let Some(node) = tree.by_key(&key) {
                tree.replace_class_prefix(node, "activity-", Some(&class));
                shown = true;
            }
        }
        shown
    }

    /// Shows the login or logout affordance and the remaining login time
    pub fn render_auth(&self, tree: &mut UiTree, auth: &AuthState, now_ms: i64, tr: &Translator) {
        let creds = layout_node(tree, keys::CREDS);
        let logout = layout_node(tree, keys::LOGOUT);
        let remauth = layout_node(tree, keys::REMAUTH);
        match auth {
            AuthState::Unknown => {}
            AuthState::Unauthorized => {
                tree.remove_class(creds, "hide");
                tree.add_class(logout, "hide");
                tree.clear_children(remauth);
                tree.set_text(remauth, "");
            }
            AuthState::Authorized {
                user,
                expires_at_ms,
            } => {
                tree.add_class(creds, "hide");
                tree.remove_class(logout, "hide");
                tree.set_text(remauth, format!("{} ", escape_html(user)));
                if let Some(expires) = expires_at_ms {
                    let remaining = tree.ensure_child(remauth, keys::REMAUTH_AGE, "span");
                    age::stamp(tree, remaining, now_ms.div_euclid(1_000), expires.div_euclid(1_000), tr);
                }
            }
        }
    }
}

fn patch_event_summary(
    tree: &mut UiTree,
    parent: NodeId,
    prefix: &str,
    event: &Event,
    task_count: usize,
    ctx: &RenderCtx,
    actions: bool,
) {
    let uuid = &event.uuid;
    let key = |part: &str| keys::summary(prefix, part, uuid);

    let region = tree.ensure_child(parent, &key("sum"), "td");
    tree.add_class(region, "waiting");
    let comp = tree.ensure_child(region, &key("comp"), "table");
    tree.add_class(comp, "comp");
    tree.toggle_class(comp, "comp_pass", event.state == TaskState::Success);
    tree.toggle_class(comp, "comp_fail", event.state.is_bad());

    let link = tree.ensure_child(comp, &key("link"), "a");
    tree.set_attr(link, "href", format!("/sai/?event={uuid}"));
    tree.toggle_class(
        link,
        "deemph",
        matches!(event.state, TaskState::Success | TaskState::Failed),
    );
    let marker = match event.state {
        TaskState::Success => Some("evr-passed"),
        TaskState::Failed => Some("evr-failed"),
        _ => None,
    };
    tree.replace_class_prefix(link, "evr-", marker);

    if actions {
        let hidden = !ctx.authorized || ctx.git_integrated;
        for (node_key, alt) in [
            (keys::event_rebuild(uuid), "rebuild all"),
            (keys::event_delete(uuid), "delete event"),
        ] {
            let button = tree.ensure_child(comp, &node_key, "img");
            tree.add_class(button, "rebuild");
            tree.set_attr(button, "alt", alt);
            tree.toggle_class(button, "hide", hidden);
        }
    }

    let repo = tree.ensure_child(comp, &key("repo"), "span");
    tree.add_class(repo, "e1");
    tree.set_text(repo, escape_html(&event.repo_name));

    let git_ref = tree.ensure_child(comp, &key("ref"), "span");
    tree.add_class(git_ref, "e2");
    let (ref_class, ref_label, ref_name) = match event.ref_kind() {
        RefKind::Branch(name) => (Some("ref-branch"), "Branch", name),
        RefKind::Tag(name) => (Some("ref-tag"), "Tag", name),
        RefKind::Other(name) => (None, "", name),
    };
    tree.replace_class_prefix(git_ref, "ref-", ref_class);
    tree.set_attr(git_ref, "title", ctx.tr.translate(ref_label, &[]));
    tree.set_text(git_ref, escape_html(ref_name));

    let hash = tree.ensure_child(comp, &key("hash"), "span");
    tree.add_class(hash, "e3");
    tree.set_text(hash, escape_html(event.short_hash()));

    let created = tree.ensure_child(comp, &key("age"), "span");
    tree.add_class(created, "e4");
    tree.set_attr(created, "title", ctx.tr.translate("created", &[]));
    age::stamp(tree, created, ctx.now, event.created as i64, ctx.tr);

    let builds = tree.ensure_child(comp, &key("builds"), "span");
    tree.add_class(builds, "e3");
    if task_count > 1 {
        let count = task_count.to_string();
        tree.set_text(builds, ctx.tr.translate("%{n} builds", &[("n", &count)]));
        tree.remove_class(builds, "hide");
    } else {
        tree.set_text(builds, "");
        tree.add_class(builds, "hide");
    }
}

/// Puts a task indicator in its group, or patches the one already there
fn place_task(tree: &mut UiTree, tasks: NodeId, event_uuid: &str, task: &Task) {
    let indicator = match tree.by_key(&keys::task(&task.uuid)) {
        Some(id) => id,
        None => {
            let group = tree.ensure_child(tasks, &keys::group(event_uuid, &task.taskname), "div");
            tree.add_class(group, "ib");
            tree.set_attr(group, "taskname", task.taskname.clone());
            let row = tree.ensure_child(group, &keys::group_row(event_uuid, &task.taskname), "div");
            tree.add_class(row, "keepline");
            let label = tree.ensure_child(group, &keys::group_label(event_uuid, &task.taskname), "span");
            tree.add_class(label, "ti2");
            tree.set_text(label, escape_html(&task.taskname));

            let indicator = tree.ensure_child(row, &keys::task(&task.uuid), "div");
            tree.add_class(indicator, "taskstate");
            tree.set_attr(indicator, "event", event_uuid.to_string());
            indicator
        }
    };
    set_state(tree, indicator, task.state);
    let link = tree.ensure_child(indicator, &keys::task_link(&task.uuid), "a");
    tree.set_attr(link, "href", format!("/sai/index.html?task={}", task.uuid));
    tree.set_text(link, plat_icon(&task.platform, 0));
}

/// Recomputes the group classes and progress of one event from its
/// indicators
fn refresh_event(tree: &mut UiTree, event_uuid: &str) {
    let Some(tasks) = tree.by_key(&keys::event_tasks(event_uuid)) else {
        return;
    };
    let mut all_states = Vec::new();
    for group in tree.children(tasks).to_vec() {
        let Some(taskname) = tree.attr(group, "taskname").map(str::to_string) else {
            continue;
        };
        let Some(row) = tree.by_key(&keys::group_row(event_uuid, &taskname)) else {
            continue;
        };
        let states: Vec<TaskState> = tree
            .children(row)
            .iter()
            .filter_map(|node| node_state(tree, *node))
            .collect();
        patch_group(tree, group, event_uuid, &taskname, &states);
        all_states.extend(states);
    }
    patch_progress(tree, event_uuid, Progress::from_states(all_states));
}

fn patch_group(tree: &mut UiTree, group: NodeId, event_uuid: &str, taskname: &str, states: &[TaskState]) {
    let awaiting = states.contains(&TaskState::Waiting);
    let all_good = !states.is_empty() && states.iter().all(|s| *s == TaskState::Success);
    let has_bad = states.iter().any(|s| s.is_bad());
    let all_done = states.iter().all(|s| s.code() >= 3);

    tree.toggle_class(group, "awaiting", awaiting);
    tree.toggle_class(group, "ov_good", all_good);
    tree.toggle_class(group, "ov_bad", !all_good && has_bad);
    tree.toggle_class(group, "ov_dunno", !all_good && !has_bad && !all_done);

    if let Some(label) = tree.by_key(&keys::group_label(event_uuid, taskname)) {
        tree.toggle_class(label, "ov_bad", !all_good && has_bad);
    }
}

fn patch_progress(tree: &mut UiTree, event_uuid: &str, progress: Progress) {
    let Some(region) = tree.by_key(&keys::event_progress(event_uuid)) else {
        return;
    };
    let text = tree.ensure_child(region, &keys::progress_text(event_uuid), "span");
    tree.set_text(text, progress.summary());

    let widths = progress.widths();
    for (segment, width) in [
        ("good", widths.good),
        ("pending", widths.pending),
        ("ongoing", widths.ongoing),
        ("bad", widths.bad),
    ] {
        let bar = tree.ensure_child(region, &keys::progress_bar(event_uuid, segment), "div");
        tree.add_class(bar, &format!("bar-{segment}"));
        tree.set_attr(bar, "style", format!("width:{width}%"));
    }
}

fn patch_task_panel(tree: &mut UiTree, panel: NodeId, info: &TaskInfo, ctx: &RenderCtx) {
    let task = &info.t;
    let uuid = &task.uuid;
    set_state(tree, panel, task.state);

    if let Some(event) = &info.e {
        patch_event_summary(tree, panel, "tiev", event, 1, ctx, false);
    }

    let platform = tree.ensure_child(panel, &keys::panel_part("plat", uuid), "span");
    tree.add_class(platform, "ti1");
    tree.set_text(
        platform,
        format!("{}{}", plat_icon(&task.platform, 2), escape_html(&task.platform)),
    );

    let stop = tree.ensure_child(panel, &keys::task_stop(uuid), "img");
    tree.add_class(stop, "rebuild");
    tree.set_attr(stop, "alt", "stop build");
    tree.toggle_class(stop, "hide", !(ctx.authorized && task.state.is_running()));

    let rebuild = tree.ensure_child(panel, &keys::task_rebuild(uuid), "img");
    tree.add_class(rebuild, "rebuild");
    tree.set_attr(rebuild, "alt", "rebuild");
    tree.toggle_class(rebuild, "hide", !ctx.authorized);

    let name = tree.ensure_child(panel, &keys::panel_part("state", uuid), "span");
    tree.add_class(name, "ti2");
    set_state(tree, name, task.state);
    tree.set_text(name, format!("&nbsp;{}&nbsp;&nbsp;", escape_html(&task.taskname)));

    let builder = tree.ensure_child(panel, &keys::panel_part("builder", uuid), "span");
    tree.add_class(builder, "ti5");
    tree.set_text(builder, escape_html(&task.builder_name));
    tree.toggle_class(builder, "hide", task.builder_name.is_empty());

    let started = tree.ensure_child(panel, &keys::panel_part("age", uuid), "span");
    let duration = tree.ensure_child(panel, &keys::panel_part("dur", uuid), "span");
    tree.add_class(duration, "ti5");
    let running_on_builder = !task.builder_name.is_empty() && task.started != 0;
    age::stamp(
        tree,
        started,
        ctx.now,
        if running_on_builder { task.started as i64 } else { 0 },
        ctx.tr,
    );
    if running_on_builder {
        let now = u64::try_from(ctx.now).unwrap_or(0);
        tree.set_text(duration, format!("Dur: {:.1}s", task.elapsed_secs(now)));
    } else {
        tree.set_text(duration, "");
    }

    let arts = tree.ensure_child(panel, &keys::artifacts(uuid), "div");
    tree.add_class(arts, "sai_arts_list");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Language;
    use sai_core::dto::inbound::{Overview, ServerMessage};

    fn overview(json: &str) -> Overview {
        match serde_json::from_str::<ServerMessage>(json).unwrap() {
            ServerMessage::Overview(ov) => ov,
            other => panic!("unexpected {other:?}"),
        }
    }

    fn task_info(json: &str) -> TaskInfo {
        match serde_json::from_str::<ServerMessage>(json).unwrap() {
            ServerMessage::TaskInfo(info) => info,
            other => panic!("unexpected {other:?}"),
        }
    }

    fn ctx(tr: &Translator) -> RenderCtx<'_> {
        RenderCtx {
            now: 1_700_000_000,
            authorized: true,
            git_integrated: false,
            tr,
        }
    }

    const TWO_EVENTS: &str = r#"{"schema":"sai.warmcat.com.overview","overview":[
        {"e":{"uuid":"e1","repo_name":"lws","ref":"refs/heads/main","hash":"0123456789ab","created":1699999000,"state":2},
         "t":[{"uuid":"t1","taskname":"build","platform":"linux/x86_64/gcc","state":3},
              {"uuid":"t2","taskname":"test","platform":"linux/x86_64/gcc","state":2},
              {"uuid":"t3","taskname":"build","platform":"freebsd/x86_64/llvm","state":0}]},
        {"e":{"uuid":"e2","repo_name":"sai","ref":"refs/tags/v1","state":3},
         "t":[{"uuid":"t4","taskname":"build","state":3}]}]}"#;

    fn snapshot(tree: &mut UiTree, rec: &mut Reconciler, tr: &Translator) {
        ensure_layout(tree);
        rec.apply_overview(tree, &overview(TWO_EVENTS).overview, false, &ctx(tr));
    }

    #[test]
    fn test_snapshot_groups_tasks_in_first_seen_order() {
        let tr = Translator::default();
        let mut tree = UiTree::new();
        let mut rec = Reconciler::new();
        snapshot(&mut tree, &mut rec, &tr);

        let tasks = tree.by_key(&keys::event_tasks("e1")).unwrap();
        let names: Vec<_> = tree
            .children(tasks)
            .iter()
            .map(|g| tree.attr(*g, "taskname").unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["build", "test"]);

        let row = tree.by_key(&keys::group_row("e1", "build")).unwrap();
        assert_eq!(
            tree.children(row),
            &[
                tree.by_key(&keys::task("t1")).unwrap(),
                tree.by_key(&keys::task("t3")).unwrap()
            ]
        );

        let build = tree.by_key(&keys::group("e1", "build")).unwrap();
        assert!(tree.has_class(build, "awaiting"));
        assert!(tree.has_class(build, "ov_dunno"));
        let e2_build = tree.by_key(&keys::group("e2", "build")).unwrap();
        assert!(tree.has_class(e2_build, "ov_good"));

        let text = tree.by_key(&keys::progress_text("e1")).unwrap();
        assert_eq!(tree.text(text), "1 passed, 1 ongoing, 1 pending");
    }

    #[test]
    fn test_delta_leaves_other_events_untouched() {
        let tr = Translator::default();
        let mut tree = UiTree::new();
        let mut rec = Reconciler::new();
        snapshot(&mut tree, &mut rec, &tr);

        let e2 = tree.by_key(&keys::event("e2")).unwrap();
        let e2_before = tree.render(e2);
        let t1 = tree.by_key(&keys::task("t1")).unwrap();

        let delta = overview(
            r#"{"schema":"sai.warmcat.com.overview","overview":[
            {"e":{"uuid":"e1","repo_name":"lws","ref":"refs/heads/main","state":4},
             "t":[{"uuid":"t1","taskname":"build","state":4},
                  {"uuid":"t2","taskname":"test","state":3},
                  {"uuid":"t3","taskname":"build","state":3}]}]}"#,
        );
        rec.apply_overview(&mut tree, &delta.overview, true, &ctx(&tr));

        assert_eq!(tree.render(e2), e2_before);
        assert_eq!(tree.by_key(&keys::task("t1")), Some(t1));
        assert!(tree.has_class(t1, "taskstate4"));
        let build = tree.by_key(&keys::group("e1", "build")).unwrap();
        assert!(tree.has_class(build, "ov_bad"));
        assert!(!tree.has_class(build, "awaiting"));
        let comp = tree.by_key("evcomp-e1").unwrap();
        assert!(tree.has_class(comp, "comp_fail"));
    }

    #[test]
    fn test_snapshot_replaces_previous_events() {
        let tr = Translator::default();
        let mut tree = UiTree::new();
        let mut rec = Reconciler::new();
        snapshot(&mut tree, &mut rec, &tr);

        let only = overview(
            r#"{"schema":"sai.warmcat.com.overview","overview":[{"e":{"uuid":"e9"},"t":[]}]}"#,
        );
        rec.apply_overview(&mut tree, &only.overview, false, &ctx(&tr));

        assert!(tree.by_key(&keys::event("e1")).is_none());
        assert!(tree.by_key(&keys::task("t1")).is_none());
        assert!(tree.by_key(&keys::event("e9")).is_some());
    }

    #[test]
    fn test_indicator_state_is_idempotent() {
        let tr = Translator::default();
        let mut tree = UiTree::new();
        let mut rec = Reconciler::new();
        snapshot(&mut tree, &mut rec, &tr);

        let info = task_info(r#"{"schema":"com.warmcat.sai.taskinfo","t":{"uuid":"t2","state":6}}"#);
        for _ in 0..2 {
            assert_eq!(
                rec.apply_task(&mut tree, &info, TaskOutcome::Indicator, &ctx(&tr)),
                TaskOutcome::Indicator
            );
        }
        let t2 = tree.by_key(&keys::task("t2")).unwrap();
        let state_classes: Vec<_> = tree
            .get(t2)
            .unwrap()
            .classes()
            .iter()
            .filter(|c| c.starts_with("taskstate"))
            .cloned()
            .collect();
        assert_eq!(state_classes, vec!["taskstate", "taskstate6"]);
        let test = tree.by_key(&keys::group("e1", "test")).unwrap();
        assert!(tree.has_class(test, "ov_bad"));
    }

    #[test]
    fn test_summary_labels_follow_language() {
        let tr = Translator::new(Language::Japanese);
        let mut tree = UiTree::new();
        let mut rec = Reconciler::new();
        snapshot(&mut tree, &mut rec, &tr);

        let branch = tree.by_key(&keys::summary("ev", "ref", "e1")).unwrap();
        assert_eq!(tree.attr(branch, "title"), Some("ブランチ"));
        let tag = tree.by_key(&keys::summary("ev", "ref", "e2")).unwrap();
        assert_eq!(tree.attr(tag, "title"), Some("タグ"));
        let created = tree.by_key(&keys::summary("ev", "age", "e1")).unwrap();
        assert_eq!(tree.attr(created, "title"), Some("作成した"));
        let builds = tree.by_key(&keys::summary("ev", "builds", "e1")).unwrap();
        assert_eq!(tree.text(builds), "3 builds");

        let art: Artifact = serde_json::from_str(
            r#"{"task_uuid":"t9","artifact_down_nonce":"n","blob_filename":"x.bin","len":1}"#,
        )
        .unwrap();
        let info = task_info(r#"{"schema":"com.warmcat.sai.taskinfo","t":{"uuid":"t9"}}"#);
        rec.apply_task(&mut tree, &info, TaskOutcome::Built, &ctx(&tr));
        rec.apply_artifact(&mut tree, &art, &tr);
        let item = tree.by_key(&keys::artifact("t9", "n", "x.bin")).unwrap();
        assert!(tree.text(item).contains("title=\"ダウンロード\""));
    }

    #[test]
    fn test_task_panel_build_then_patch() {
        let tr = Translator::default();
        let mut tree = UiTree::new();
        let mut rec = Reconciler::new();
        ensure_layout(&mut tree);

        let art: Artifact = serde_json::from_str(
            r#"{"task_uuid":"t1","artifact_down_nonce":"n","blob_filename":"a.zip","len":4096}"#,
        )
        .unwrap();
        rec.apply_artifact(&mut tree, &art, &tr);
        assert_eq!(rec.pending_artifacts("t1"), 1);

        let info = task_info(
            r#"{"schema":"com.warmcat.sai.taskinfo","e":{"uuid":"e1","ref":"refs/heads/x"},
                "t":{"uuid":"t1","taskname":"build","state":2,"builder_name":"b1","started":1699999990}}"#,
        );
        rec.apply_task(&mut tree, &info, TaskOutcome::Built, &ctx(&tr));

        let panel = tree.by_key(&keys::task_panel("t1")).unwrap();
        assert!(tree.by_key(keys::LOG_TEXT).is_some());
        assert_eq!(rec.pending_artifacts("t1"), 0);
        let item = tree.by_key(&keys::artifact("t1", "n", "a.zip")).unwrap();
        assert!(tree.text(item).contains("artifacts/t1/n/a.zip"));
        assert!(tree.text(item).contains("4.000KiB"));
        let stop = tree.by_key(&keys::task_stop("t1")).unwrap();
        assert!(!tree.has_class(stop, "hide"));

        let done = task_info(
            r#"{"schema":"com.warmcat.sai.taskinfo","t":{"uuid":"t1","taskname":"build","state":3,
                "builder_name":"b1","started":1699999990,"duration":12500000}}"#,
        );
        rec.apply_task(&mut tree, &done, TaskOutcome::Panel, &ctx(&tr));
        assert_eq!(tree.by_key(&keys::task_panel("t1")), Some(panel));
        assert!(tree.has_class(panel, "taskstate3"));
        assert!(tree.has_class(stop, "hide"));
        let dur = tree.by_key("tidur-t1").unwrap();
        assert_eq!(tree.text(dur), "Dur: 12.5s");
    }

    #[test]
    fn test_untrusted_text_is_escaped() {
        let tr = Translator::default();
        let mut tree = UiTree::new();
        let mut rec = Reconciler::new();
        ensure_layout(&mut tree);
        let ov = overview(
            r#"{"schema":"sai.warmcat.com.overview","overview":[
                {"e":{"uuid":"e1","repo_name":"<script>x</script>"},"t":[]}]}"#,
        );
        rec.apply_overview(&mut tree, &ov.overview, false, &ctx(&tr));

        let repo = tree.by_key("evrepo-e1").unwrap();
        assert_eq!(tree.text(repo), "&lt;script&gt;x&lt;/script&gt;");
    }

    #[test]
    fn test_activity_class_replaced() {
        let tr = Translator::default();
        let mut tree = UiTree::new();
        let mut rec = Reconciler::new();
        snapshot(&mut tree, &mut rec, &tr);

        for category in ["1", "2"] {
            let act = TaskActivity {
                task_uuid: "t2".into(),
                activity: category.into(),
            };
            assert!(rec.apply_activity(&mut tree, &act));
        }
        let t2 = tree.by_key(&keys::task("t2")).unwrap();
        assert!(tree.has_class(t2, "activity-2"));
        assert!(!tree.has_class(t2, "activity-1"));

        let unseen = TaskActivity {
            task_uuid: "nope".into(),
            activity: "1".into(),
        };
        assert!(!rec.apply_activity(&mut tree, &unseen));
    }

    #[test]
    fn test_auth_affordances() {
        let tr = Translator::default();
        let mut tree = UiTree::new();
        let rec = Reconciler::new();
        ensure_layout(&mut tree);

        rec.render_auth(
            &mut tree,
            &AuthState::Authorized {
                user: "andy".into(),
                expires_at_ms: Some(3_600_000),
            },
            0,
            &tr,
        );
        let creds = tree.by_key(keys::CREDS).unwrap();
        let logout = tree.by_key(keys::LOGOUT).unwrap();
        assert!(tree.has_class(creds, "hide"));
        assert!(!tree.has_class(logout, "hide"));
        let age = tree.by_key(keys::REMAUTH_AGE).unwrap();
        assert_eq!(tree.text(age), "in 60m");

        rec.render_auth(&mut tree, &AuthState::Unauthorized, 0, &tr);
        assert!(!tree.has_class(creds, "hide"));
        assert!(tree.has_class(logout, "hide"));
        assert!(tree.by_key(keys::REMAUTH_AGE).is_none());
    }
}
