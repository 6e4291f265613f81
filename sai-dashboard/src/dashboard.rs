//! The dashboard engine
//!
//! [`Dashboard`] owns every piece of client state and runs one input to
//! completion at a time. It never performs IO; each entry point returns the
//! [`Effect`]s its caller has to carry out.

use sai_core::dto::inbound::{AuthFields, ServerMessage};
use tracing::{debug, info, warn};

use crate::age;
use crate::commands::Command;
use crate::i18n::{Language, Translator};
use crate::logs::{FollowingViewport, LogAssembler, Viewport};
use crate::page::PageContext;
use crate::reconciler::{self, Reconciler, RenderCtx, TaskOutcome};
use crate::router::{self, Decoded, Route};
use crate::session::Session;
use crate::timers::{TimerHandle, TimerKind, Timers};
use crate::topology::Topology;
use crate::tree::UiTree;
use crate::{DashboardConfig, Effect, ReloadReason};

pub struct Dashboard {
    config: DashboardConfig,
    page: PageContext,
    tree: UiTree,
    timers: Timers,
    session: Session,
    translator: Translator,
    reconciler: Reconciler,
    topology: Topology,
    logs: LogAssembler,
    viewport: Box<dyn Viewport>,
    age_timer: Option<TimerHandle>,
}

fn render_ctx<'a>(
    session: &Session,
    page: &PageContext,
    tr: &'a Translator,
    now_ms: i64,
) -> RenderCtx<'a> {
    RenderCtx {
        now: now_ms.div_euclid(1_000),
        authorized: session.is_authorized(),
        git_integrated: page.is_git_integrated(),
        tr,
    }
}

impl Dashboard {
    pub fn new(config: DashboardConfig, page: PageContext) -> Self {
        Self::with_viewport(config, page, Box::new(FollowingViewport::new()))
    }

    pub fn with_viewport(
        config: DashboardConfig,
        page: PageContext,
        viewport: Box<dyn Viewport>,
    ) -> Self {
        let mut tree = UiTree::new();
        reconciler::ensure_layout(&mut tree);
        Self {
            session: Session::new(&config),
            logs: LogAssembler::new(config.log_flush_ms),
            config,
            page,
            tree,
            timers: Timers::new(),
            translator: Translator::default(),
            reconciler: Reconciler::new(),
            topology: Topology::new(),
            viewport,
            age_timer: None,
        }
    }

    pub fn tree(&self) -> &UiTree {
        &self.tree
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn page(&self) -> &PageContext {
        &self.page
    }

    pub fn logs(&self) -> &LogAssembler {
        &self.logs
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    /// When [`Dashboard::on_timer`] next has something to do
    pub fn next_deadline(&self) -> Option<i64> {
        self.timers.next_deadline()
    }

    /// A connection attempt is starting
    pub fn on_connecting(&mut self) {
        self.session.connecting();
    }

    /// The connection is up: ask for whatever this page shows
    pub fn on_open(&mut self, _now_ms: i64) -> Vec<Effect> {
        self.session.opened(&mut self.timers);
        let request = self
            .page
            .initial_request(self.config.api_version, self.logs.last_log_ts());
        debug!("initial request {}", request.schema());
        vec![Effect::Send(request)]
    }

    /// The connection is gone; a reconnect is scheduled
    pub fn on_close(&mut self, now_ms: i64) {
        self.session.closed(&mut self.timers, now_ms);
    }

    /// Handles one text frame from the server
    pub fn on_frame(&mut self, frame: &str, now_ms: i64) -> Vec<Effect> {
        let decoded = match router::decode(frame, self.config.api_version) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("dropping frame: {}", e);
                return Vec::new();
            }
        };
        let (envelope, message) = match decoded {
            Decoded::VersionSkew { server } => {
                warn!(
                    "server speaks protocol {}, this client {}; reloading",
                    server, self.config.api_version
                );
                return vec![Effect::Reload(ReloadReason::VersionSkew)];
            }
            Decoded::Message { envelope, message } => (envelope, message),
        };

        if matches!(message, ServerMessage::Unauthorized) {
            info!("server says this client is unauthorized; reloading");
            return vec![Effect::Reload(ReloadReason::Unauthorized)];
        }

        if let Some(alang) = &envelope.alang {
            self.select_language(alang);
        }

        let route = router::classify(&message, &self.tree, &self.page);
        debug!("{} frame routed to {:?}", message.kind(), route);

        match message {
            ServerMessage::Overview(overview) => {
                self.apply_auth(&overview.auth(), now_ms);
                let ctx = render_ctx(&self.session, &self.page, &self.translator, now_ms);
                let delta = route == Route::OverviewDelta;
                self.reconciler
                    .apply_overview(&mut self.tree, &overview.overview, delta, &ctx);
                if delta {
                    self.ensure_age_timer(now_ms);
                } else {
                    self.refresh_ages(now_ms);
                }
            }
            ServerMessage::TaskInfo(info) => {
                self.apply_auth(&info.auth(), now_ms);
                let outcome = match route {
                    Route::TaskIndicator => TaskOutcome::Indicator,
                    Route::TaskPanel => TaskOutcome::Panel,
                    Route::TaskDetail => TaskOutcome::Built,
                    _ => TaskOutcome::Ignored,
                };
                let ctx = render_ctx(&self.session, &self.page, &self.translator, now_ms);
                let outcome = self
                    .reconciler
                    .apply_task(&mut self.tree, &info, outcome, &ctx);
                if outcome == TaskOutcome::Built {
                    self.logs.write(&mut self.tree);
                }
                if outcome != TaskOutcome::Ignored {
                    self.refresh_ages(now_ms);
                }
            }
            ServerMessage::Builders(list) => {
                self.topology.replace_builders(list.builders);
                self.topology.render(&mut self.tree);
            }
            ServerMessage::PowerTopology(topology) => {
                self.topology.merge_pcons(&topology);
                self.topology.render(&mut self.tree);
            }
            ServerMessage::LoadReport(report) => {
                self.topology.apply_load(&mut self.tree, &report);
            }
            ServerMessage::Log(chunk) => {
                if let Err(e) = self.logs.push(&chunk, &mut self.timers, now_ms) {
                    warn!("dropping log chunk for {}: {}", chunk.task_uuid, e);
                }
            }
            ServerMessage::Artifact(artifact) => {
                self.reconciler
                    .apply_artifact(&mut self.tree, &artifact, &self.translator);
            }
            ServerMessage::TaskActivity(activity) => {
                self.reconciler.apply_activity(&mut self.tree, &activity);
            }
            ServerMessage::Unauthorized | ServerMessage::Unknown => {}
        }
        Vec::new()
    }

    /// Runs every timer due at `now_ms`
    pub fn on_timer(&mut self, now_ms: i64) -> Vec<Effect> {
        let mut effects = Vec::new();
        for (handle, kind) in self.timers.take_due(now_ms) {
            match kind {
                TimerKind::AgeRefresh => {
                    if self.age_timer == Some(handle) {
                        self.age_timer = None;
                    }
                    self.refresh_ages(now_ms);
                }
                TimerKind::LogFlush => {
                    if let Some(text) = self.logs.flush(&mut self.tree, self.viewport.as_mut()) {
                        effects.push(Effect::LogsFlushed { text });
                    }
                }
                TimerKind::Reconnect => {
                    self.session.reconnect_due();
                    effects.push(Effect::Reconnect);
                }
                TimerKind::SessionExpiry => {
                    info!("login expired; reloading");
                    effects.push(Effect::Reload(ReloadReason::SessionExpired));
                }
                TimerKind::DelayedReload => {
                    effects.push(Effect::Reload(ReloadReason::EventDeleted));
                }
            }
        }
        effects
    }

    /// Sends an operator command
    ///
    /// Dropped without a trace when the connection is not open.
    pub fn command(&mut self, command: &Command, now_ms: i64) -> Vec<Effect> {
        if !self.session.is_open() {
            debug!("connection not open, dropping {:?}", command);
            return Vec::new();
        }
        let message = command.to_message();
        info!("sending {}", message.schema());

        if let Command::DeleteEvent { .. } = command {
            self.timers.schedule(
                TimerKind::DelayedReload,
                now_ms + self.config.delete_reload_ms as i64,
            );
        }
        if command
            .resets_task()
            .is_some_and(|task| self.page.task.as_deref() == Some(task))
        {
            self.logs.reset(&mut self.timers, &mut self.tree);
        }
        vec![Effect::Send(message)]
    }

    fn select_language(&mut self, alang: &str) {
        if let Some(language) = Language::from_accept(alang) {
            if language != self.translator.language() {
                debug!("switching language to {:?}", language);
                self.translator = Translator::new(language);
            }
        }
    }

    fn apply_auth(&mut self, auth: &AuthFields, now_ms: i64) {
        if self.session.apply_auth(auth, &mut self.timers, now_ms) {
            self.reconciler
                .render_auth(&mut self.tree, self.session.auth(), now_ms, &self.translator);
        }
    }

    fn refresh_ages(&mut self, now_ms: i64) {
        if let Some(handle) = self.age_timer.take() {
            self.timers.cancel(handle);
        }
        let next = age::refresh(&mut self.tree, now_ms.div_euclid(1_000), &self.translator);
        self.age_timer = Some(
            self.timers
                .schedule(TimerKind::AgeRefresh, now_ms + next as i64 * 1_000),
        );
    }

    fn ensure_age_timer(&mut self, now_ms: i64) {
        let pending = self.age_timer.is_some_and(|h| self.timers.is_pending(h));
        if !pending {
            self.refresh_ages(now_ms);
        }
    }
}
