//! Builder fleet topology
//!
//! Power controllers form a forest through their `depends_on` links and
//! builders hang off the controller whose name matches their group key.
//! The forest is derived from scratch on every render, but the node of each
//! builder is kept across renders and only patched, so its transitions and
//! listeners survive.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use sai_core::domain::builder::Builder;
use sai_core::domain::load::LoadReport;
use sai_core::domain::power::PowerController;
use sai_core::dto::inbound::PowerTopology;
use tracing::debug;

use crate::format::{escape_html, plat_icon};
use crate::reconciler::{keys, layout_node};
use crate::tree::{NodeId, UiTree};

/// One power controller with what hangs off it, in display order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PconLayout {
    pub name: String,
    pub on: bool,
    pub kind: String,
    /// Builder names, sorted
    pub builders: Vec<String>,
    /// Child controllers, sorted by name
    pub children: Vec<PconLayout>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TopologyLayout {
    pub roots: Vec<PconLayout>,
    /// Builders no known controller claims, sorted
    pub unmanaged: Vec<String>,
}

/// Derives the controller forest and builder placement
///
/// Pure: the same caches always give the same layout. Controllers whose
/// parent chain loops back on itself are not reachable from any root and
/// are left out.
pub fn layout(pcons: &BTreeMap<String, PowerController>, builders: &[Builder]) -> TopologyLayout {
    let mut children: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut roots = Vec::new();
    for (name, pcon) in pcons {
        match pcon
            .parent()
            .filter(|p| pcons.contains_key(*p) && *p != name.as_str())
        {
            Some(parent) => children.entry(parent).or_default().push(name.as_str()),
            None => roots.push(name.as_str()),
        }
    }

    let mut by_group: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut unmanaged = Vec::new();
    for builder in builders {
        let group = builder.group_key();
        if pcons.contains_key(group) {
            by_group.entry(group).or_default().push(builder.name.as_str());
        } else {
            unmanaged.push(builder.name.clone());
        }
    }
    for names in by_group.values_mut() {
        names.sort_unstable();
    }
    unmanaged.sort();

    fn build(
        name: &str,
        pcons: &BTreeMap<String, PowerController>,
        children: &BTreeMap<&str, Vec<&str>>,
        by_group: &BTreeMap<&str, Vec<&str>>,
    ) -> PconLayout {
        let pcon = &pcons[name];
        PconLayout {
            name: name.to_string(),
            on: pcon.on,
            kind: pcon.kind.clone(),
            builders: by_group
                .get(name)
                .map(|v| v.iter().map(|s| s.to_string()).collect())
                .unwrap_or_default(),
            children: children
                .get(name)
                .map(|v| v.iter().map(|c| build(c, pcons, children, by_group)).collect())
                .unwrap_or_default(),
        }
    }

    TopologyLayout {
        roots: roots
            .into_iter()
            .map(|r| build(r, pcons, &children, &by_group))
            .collect(),
        unmanaged,
    }
}

/// Power controller and builder caches
#[derive(Debug, Default)]
pub struct Topology {
    /// Never pruned; a controller stays until the page is reloaded
    pcons: BTreeMap<String, PowerController>,
    builders: Vec<Builder>,
    /// Stay-on flags from the power topology, by builder name
    stay: HashMap<String, bool>,
    /// Builders that currently own a node
    shown: BTreeSet<String>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pcons(&self) -> &BTreeMap<String, PowerController> {
        &self.pcons
    }

    pub fn builders(&self) -> &[Builder] {
        &self.builders
    }

    pub fn builder(&self, name: &str) -> Option<&Builder> {
        self.builders.iter().find(|b| b.name == name)
    }

    /// Merges controllers in by name
    pub fn merge_pcons(&mut self, topology: &PowerTopology) {
        for pcon in &topology.power_controllers {
            self.pcons.insert(pcon.name.clone(), pcon.clone());
        }
        for managed in &topology.builders {
            self.stay.insert(managed.name.clone(), managed.stay_on);
        }
    }

    /// Replaces the builder list; load samples of builders that are still
    /// present carry over
    pub fn replace_builders(&mut self, mut builders: Vec<Builder>) {
        for builder in &mut builders {
            if let Some(old) = self.builder(&builder.name) {
                builder.loads = old.loads.clone();
            }
        }
        self.builders = builders;
    }

    pub fn layout(&self) -> TopologyLayout {
        layout(&self.pcons, &self.builders)
    }

    /// Redraws the fleet into the builders container
    pub fn render(&mut self, tree: &mut UiTree) {
        let container = layout_node(tree, keys::BUILDERS);

        let mut live = BTreeSet::new();
        for builder in &self.builders {
            let node = match tree.by_key(&keys::builder(&builder.name)) {
                Some(node) => {
                    tree.detach(node);
                    node
                }
                None => create_builder_node(tree, &builder.name),
            };
            let stay_on = self.stay.get(&builder.name).copied().unwrap_or(builder.stay_on);
            patch_builder(tree, node, builder, stay_on);
            live.insert(builder.name.clone());
        }
        for gone in self.shown.difference(&live) {
            if let Some(node) = tree.by_key(&keys::builder(gone)) {
                tree.remove(node);
            }
        }
        self.shown = live;

        tree.clear_children(container);
        let fleet = tree.create("div");
        tree.add_class(fleet, "builders");
        tree.append(container, fleet);

        let layout = self.layout();
        debug!(
            "fleet render: {} root controllers, {} unmanaged builders",
            layout.roots.len(),
            layout.unmanaged.len()
        );
        for root in &layout.roots {
            render_pcon(tree, fleet, root);
        }
        if !layout.unmanaged.is_empty() {
            let section = tree.create("div");
            tree.add_class(section, "unmanaged");
            tree.append(fleet, section);
            let label = tree.create("div");
            tree.add_class(label, "pconname");
            tree.set_text(label, "unmanaged");
            tree.append(section, label);
            attach_builders(tree, section, &layout.unmanaged);
        }
    }

    /// Records a load report and patches that builder's load bars only
    ///
    /// Returns false for builders not in the list and for instances the
    /// builder does not have.
    pub fn apply_load(&mut self, tree: &mut UiTree, report: &LoadReport) -> bool {
        let Some(builder) = self
            .builders
            .iter_mut()
            .find(|b| b.name == report.builder_name)
        else {
            debug!("load report for unknown builder {}", report.builder_name);
            return false;
        };
        let instance = usize::try_from(report.instance).unwrap_or(usize::MAX);
        if !builder.record_load(instance, report.normalized_percent()) {
            debug!(
                "load report for {} instance {} out of range",
                report.builder_name, report.instance
            );
            return false;
        }
        let builder = builder.clone();

        patch_loads(tree, &builder);
        if let Some(bar) = tree.by_key(&keys::builder_load(&builder.name, instance)) {
            let tasks: Vec<&str> = report
                .active_tasks
                .iter()
                .map(|t| t.task_name.as_str())
                .collect();
            tree.set_attr(bar, "title", tasks.join(", "));
        }
        true
    }
}

fn create_builder_node(tree: &mut UiTree, name: &str) -> NodeId {
    let node = tree.create_keyed("div", &keys::builder(name));
    tree.add_class(node, "ibuil");
    tree.add_class(node, "bdr");
    let label = tree.ensure_child(node, &keys::builder_label(name), "div");
    tree.add_class(label, "bn");
    let loads = tree.ensure_child(node, &keys::builder_loads(name), "div");
    tree.add_class(loads, "loads");
    node
}

fn patch_builder(tree: &mut UiTree, node: NodeId, builder: &Builder, stay_on: bool) {
    tree.toggle_class(node, "online", builder.online);
    tree.toggle_class(node, "offline", !builder.online);
    tree.toggle_class(node, "powering-up", builder.powering_up);
    tree.toggle_class(node, "powering-down", builder.powering_down);
    tree.toggle_class(node, "power-managed", builder.power_managed);
    tree.toggle_class(node, "stay-on", stay_on);
    tree.set_attr(
        node,
        "title",
        format!("{}@{}", builder.platform, builder.hostname()),
    );
    if let Some(label) = tree.by_key(&keys::builder_label(&builder.name)) {
        tree.set_text(
            label,
            format!(
                "{}{}",
                plat_icon(&builder.platform, 1),
                escape_html(builder.hostname())
            ),
        );
    }
    patch_loads(tree, builder);
}

/// One bar per instance, sized to the latest normalised load
fn patch_loads(tree: &mut UiTree, builder: &Builder) {
    let Some(loads) = tree.by_key(&keys::builder_loads(&builder.name)) else {
        return;
    };
    let count = builder.instance_slots().min(builder.instances as usize).max(builder.loads.len());
    for instance in 0..count {
        let percent = builder.loads.get(instance).copied().unwrap_or(0);
        let bar = tree.ensure_child(loads, &keys::builder_load(&builder.name, instance), "div");
        tree.add_class(bar, "load");
        tree.set_attr(bar, "style", format!("width:{percent}%"));
    }
    let mut extra = count;
    while let Some(bar) = tree.by_key(&keys::builder_load(&builder.name, extra)) {
        tree.remove(bar);
        extra += 1;
    }
}

fn attach_builders(tree: &mut UiTree, parent: NodeId, names: &[String]) {
    for name in names {
        if let Some(node) = tree.by_key(&keys::builder(name)) {
            tree.append(parent, node);
        }
    }
}

fn render_pcon(tree: &mut UiTree, parent: NodeId, pcon: &PconLayout) {
    let node = tree.create("div");
    tree.add_class(node, "pcon");
    tree.add_class(node, if pcon.on { "pcon-on" } else { "pcon-off" });
    tree.set_attr(node, "name", pcon.name.clone());
    tree.append(parent, node);

    let label = tree.create("div");
    tree.add_class(label, "pconname");
    let text = if pcon.kind.is_empty() {
        escape_html(&pcon.name)
    } else {
        format!("{} ({})", escape_html(&pcon.name), escape_html(&pcon.kind))
    };
    tree.set_text(label, text);
    tree.append(node, label);

    let builders = tree.create("div");
    tree.add_class(builders, "pcon-builders");
    tree.append(node, builders);
    attach_builders(tree, builders, &pcon.builders);

    for child in &pcon.children {
        render_pcon(tree, node, child);
    }
}
