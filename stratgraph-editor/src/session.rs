//! The editing session: one mutator per graph.
//!
//! `EditorSession` owns the working canvas and wires the pure core to the two
//! debounced policies. Every change refreshes the live explanation and local
//! validation, then (re)schedules a history capture and, when enabled, an
//! autosave. Time is passed in explicitly; callers poll [`EditorSession::tick`].

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use stratgraph_core::canvas::{
    annotate_errors, annotate_summaries, to_canvas, to_definition_with_meta, CanvasEdge,
    CanvasNode,
};
use stratgraph_core::explain::{explain, Explanation};
use stratgraph_core::graph::{DefinitionMeta, EditError, GraphEdit, StrategyDefinition};
use stratgraph_core::history::{HistorySnapshot, HistoryState};
use stratgraph_core::validate::{validate, ValidationError, ValidationReport};
use tracing::{debug, info, warn};

use crate::autosave::{run_round_trip, AutosaveApplied, AutosaveState, AutosaveTicket};
use crate::backend::{BackendError, StrategyBackend};
use crate::config::EditorConfig;
use crate::scheduler::{DebounceScheduler, TaskKind};
use crate::worker::{AutosaveWorker, RoundTripDone};

/// Something `tick` (or an explicit call) did that the UI may want to show.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    HistoryCaptured,
    AutosaveStarted { ticket: u64 },
    AutosaveFinished(AutosaveApplied),
    /// The worker thread went away; autosave falls back to the session thread.
    WorkerLost,
}

/// Payload of a debounced task. A capture records the canvas as it was when
/// scheduled; an autosave reads the live canvas when it fires.
#[derive(Debug)]
enum Deferred {
    Capture(HistorySnapshot),
    Autosave,
}

pub struct EditorSession {
    config: EditorConfig,
    meta: DefinitionMeta,
    nodes: Vec<CanvasNode>,
    edges: Vec<CanvasEdge>,
    history: HistoryState,
    scheduler: DebounceScheduler<Deferred>,
    autosave: AutosaveState,
    backend: Arc<dyn StrategyBackend>,
    worker: Option<AutosaveWorker>,
    explanation: Explanation,
    validation: ValidationReport,
    last_autosave: Option<AutosaveApplied>,
}

impl EditorSession {
    /// Open `definition` as an unsaved graph. Round trips run on the calling
    /// thread inside `tick`.
    pub fn new(
        definition: &StrategyDefinition,
        backend: Arc<dyn StrategyBackend>,
        config: EditorConfig,
    ) -> Self {
        let (nodes, edges) = to_canvas(definition);
        let history = HistoryState::with_limit(&nodes, &edges, config.max_history);
        Self {
            meta: definition.meta,
            explanation: explain(definition),
            validation: validate(definition),
            nodes,
            edges,
            history,
            scheduler: DebounceScheduler::new(),
            autosave: AutosaveState::new(),
            backend,
            worker: None,
            last_autosave: None,
            config,
        }
    }

    /// Like [`new`](Self::new), with round trips on a background worker.
    pub fn with_worker(
        definition: &StrategyDefinition,
        backend: Arc<dyn StrategyBackend>,
        config: EditorConfig,
    ) -> io::Result<Self> {
        let worker = AutosaveWorker::spawn(backend.clone())?;
        let mut session = Self::new(definition, backend, config);
        session.worker = Some(worker);
        Ok(session)
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub fn definition(&self) -> StrategyDefinition {
        to_definition_with_meta(&self.nodes, &self.edges, self.meta)
    }

    pub fn nodes(&self) -> &[CanvasNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[CanvasEdge] {
        &self.edges
    }

    pub fn explanation(&self) -> &Explanation {
        &self.explanation
    }

    pub fn validation(&self) -> &ValidationReport {
        &self.validation
    }

    pub fn history(&self) -> &HistoryState {
        &self.history
    }

    pub fn autosave(&self) -> &AutosaveState {
        &self.autosave
    }

    pub fn last_autosave(&self) -> Option<&AutosaveApplied> {
        self.last_autosave.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.autosave.needs_save(&self.definition())
    }

    /// When the next debounced task is due, for sleeping between ticks.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Canvas nodes decorated with error highlights and per-block summaries,
    /// plus the graph-global errors for a banner.
    pub fn annotated_canvas(&self) -> (Vec<CanvasNode>, Vec<ValidationError>) {
        let summarized = annotate_summaries(&self.nodes, &self.definition());
        annotate_errors(&summarized, &self.validation.errors)
    }

    // ── Edits ───────────────────────────────────────────────────────

    pub fn apply_edit(&mut self, edit: GraphEdit, now: Instant) -> Result<(), EditError> {
        let next = self.definition().apply_edit(edit)?;
        let (nodes, edges) = to_canvas(&next);
        self.nodes = nodes;
        self.edges = edges;
        self.changed(now);
        Ok(())
    }

    /// Replace the canvas wholesale, as a drag frame or paste does.
    pub fn set_canvas(&mut self, nodes: Vec<CanvasNode>, edges: Vec<CanvasEdge>, now: Instant) {
        self.nodes = nodes;
        self.edges = edges;
        self.changed(now);
    }

    /// Step back one snapshot. A pending history capture is flushed first so
    /// the edit being undone is the one the user just made.
    pub fn undo(&mut self, now: Instant) -> bool {
        self.flush_history();
        let step = self.take_history().undo();
        self.history = step.history;
        self.restore(step.snapshot, now)
    }

    pub fn redo(&mut self, now: Instant) -> bool {
        self.flush_history();
        let step = self.take_history().redo();
        self.history = step.history;
        self.restore(step.snapshot, now)
    }

    // ── Versions ────────────────────────────────────────────────────

    /// Replace the working graph with a persisted version.
    ///
    /// Pending tasks are cancelled and any in-flight round trip is orphaned:
    /// it still completes against the backend, but its result is discarded.
    pub fn load_version(&mut self, version: u32) -> Result<(), BackendError> {
        let definition = self.backend.load_version(version)?;
        for kind in TaskKind::ALL {
            self.scheduler.cancel_pending(kind);
        }
        let (nodes, edges) = to_canvas(&definition);
        self.history = HistoryState::with_limit(&nodes, &edges, self.config.max_history);
        self.nodes = nodes;
        self.edges = edges;
        self.meta = definition.meta;
        self.refresh();
        self.autosave.invalidate(Some(self.definition().fingerprint()));
        self.last_autosave = None;
        info!(version, "loaded version");
        Ok(())
    }

    /// Run a round trip now on the calling thread, skipping the debounce.
    ///
    /// `None` when nothing changed since the last save or a round trip is
    /// already in flight; in the latter case an autosave is rescheduled.
    pub fn save_now(&mut self, now: Instant) -> Option<AutosaveApplied> {
        self.scheduler.cancel_pending(TaskKind::Autosave);
        let definition = self.definition();
        let Some(ticket) = self.autosave.begin(&definition) else {
            if self.autosave.is_in_flight() {
                self.schedule_autosave(now);
            }
            return None;
        };
        let outcome = run_round_trip(self.backend.as_ref(), &ticket);
        let applied = self.autosave.complete(&ticket, outcome);
        self.last_autosave = Some(applied.clone());
        Some(applied)
    }

    // ── Time ────────────────────────────────────────────────────────

    /// Collect finished round trips and fire due debounced tasks.
    pub fn tick(&mut self, now: Instant) -> Vec<SessionEvent> {
        let mut events = self.drain_worker(now);
        for (_, task) in self.scheduler.take_due(now) {
            match task {
                Deferred::Capture(snapshot) => {
                    self.history = self
                        .take_history()
                        .push_snapshot(&snapshot.nodes, &snapshot.edges);
                    debug!(past = self.history.past_len(), "history captured");
                    events.push(SessionEvent::HistoryCaptured);
                }
                Deferred::Autosave => self.fire_autosave(now, &mut events),
            }
        }
        events
    }

    /// Block up to `timeout` for the in-flight round trip, then apply it.
    /// Without a worker there is never anything to wait for.
    pub fn wait_for_autosave(&mut self, timeout: Duration, now: Instant) -> Vec<SessionEvent> {
        let Some(worker) = &self.worker else {
            return Vec::new();
        };
        match worker.recv_timeout(timeout) {
            Ok(Some(done)) => vec![self.finish(done, now)],
            Ok(None) => Vec::new(),
            Err(_) => {
                self.lose_worker();
                vec![SessionEvent::WorkerLost]
            }
        }
    }

    // ── Internals ───────────────────────────────────────────────────

    fn changed(&mut self, now: Instant) {
        self.refresh();
        if self.config.autosave_enabled {
            self.schedule_autosave(now);
        }
        let snapshot = HistorySnapshot::new(&self.nodes, &self.edges);
        self.scheduler.schedule(
            TaskKind::History,
            self.config.history_debounce(),
            Deferred::Capture(snapshot),
            now,
        );
    }

    fn schedule_autosave(&mut self, now: Instant) {
        self.scheduler.schedule(
            TaskKind::Autosave,
            self.config.autosave_debounce(),
            Deferred::Autosave,
            now,
        );
    }

    fn refresh(&mut self) {
        let definition = self.definition();
        self.explanation = explain(&definition);
        self.validation = validate(&definition);
    }

    fn restore(&mut self, snapshot: Option<HistorySnapshot>, now: Instant) -> bool {
        let Some(snapshot) = snapshot else {
            return false;
        };
        self.nodes = snapshot.nodes;
        self.edges = snapshot.edges;
        self.refresh();
        if self.config.autosave_enabled {
            self.schedule_autosave(now);
        }
        true
    }

    fn flush_history(&mut self) {
        if let Some(Deferred::Capture(snapshot)) = self.scheduler.cancel_pending(TaskKind::History) {
            self.history = self.take_history().push_snapshot(&snapshot.nodes, &snapshot.edges);
        }
    }

    /// Move the history out for a consuming update.
    fn take_history(&mut self) -> HistoryState {
        std::mem::replace(&mut self.history, HistoryState::with_limit(&[], &[], 1))
    }

    fn fire_autosave(&mut self, now: Instant, events: &mut Vec<SessionEvent>) {
        let definition = self.definition();
        let Some(ticket) = self.autosave.begin(&definition) else {
            return;
        };
        events.push(SessionEvent::AutosaveStarted { ticket: ticket.id });
        match &self.worker {
            Some(worker) => {
                if worker.submit(ticket.clone()).is_ok() {
                    return;
                }
                self.lose_worker();
                events.push(SessionEvent::WorkerLost);
                self.run_inline(ticket, now, events);
            }
            None => self.run_inline(ticket, now, events),
        }
    }

    fn run_inline(&mut self, ticket: AutosaveTicket, now: Instant, events: &mut Vec<SessionEvent>) {
        let outcome = run_round_trip(self.backend.as_ref(), &ticket);
        events.push(self.finish(RoundTripDone { ticket, outcome }, now));
    }

    fn drain_worker(&mut self, now: Instant) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        loop {
            let Some(worker) = &self.worker else {
                break;
            };
            match worker.try_recv() {
                Ok(Some(done)) => events.push(self.finish(done, now)),
                Ok(None) => break,
                Err(_) => {
                    self.lose_worker();
                    events.push(SessionEvent::WorkerLost);
                    break;
                }
            }
        }
        events
    }

    fn finish(&mut self, done: RoundTripDone, now: Instant) -> SessionEvent {
        let applied = self.autosave.complete(&done.ticket, done.outcome);
        let current = self.definition();

        // An edit that landed mid-flight is saved by the next firing; its own
        // firing was skipped while this trip held the slot. An orphaned ticket
        // says nothing about the loaded graph, so use the new baseline.
        let unsaved = match applied {
            AutosaveApplied::Discarded => self.autosave.needs_save(&current),
            _ => current.fingerprint() != done.ticket.hash,
        };
        if unsaved && self.config.autosave_enabled && !self.scheduler.is_pending(TaskKind::Autosave)
        {
            self.schedule_autosave(now);
        }

        if applied != AutosaveApplied::Discarded {
            self.last_autosave = Some(applied.clone());
        }
        SessionEvent::AutosaveFinished(applied)
    }

    fn lose_worker(&mut self) {
        warn!("autosave worker lost; running round trips inline");
        self.worker = None;
    }
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("blocks", &self.nodes.iter().filter(|n| !n.is_note()).count())
            .field("edges", &self.edges.len())
            .field("autosave", &self.autosave)
            .field("worker", &self.worker)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use stratgraph_core::graph::params::PeriodParams;
    use stratgraph_core::graph::{BlockId, BlockParams};
    use stratgraph_core::templates::StrategyTemplate;

    fn session() -> (EditorSession, Arc<InMemoryBackend>) {
        let backend = Arc::new(InMemoryBackend::new());
        let session = EditorSession::new(
            &StrategyTemplate::GoldenCross.build(),
            backend.clone(),
            EditorConfig::default(),
        );
        (session, backend)
    }

    fn set_fast_period(session: &mut EditorSession, period: u32, now: Instant) {
        session
            .apply_edit(
                GraphEdit::UpdateParams {
                    id: BlockId::new("sma_fast"),
                    params: BlockParams::Sma(PeriodParams { period }),
                },
                now,
            )
            .unwrap();
    }

    #[test]
    fn explanation_tracks_edits_immediately() {
        let t0 = Instant::now();
        let (mut s, _) = session();
        assert!(s.explanation().entry.contains("the 50-day SMA"));
        set_fast_period(&mut s, 20, t0);
        assert!(s.explanation().entry.contains("the 20-day SMA"));
    }

    #[test]
    fn rejected_edit_changes_nothing() {
        let t0 = Instant::now();
        let (mut s, _) = session();
        let before = s.definition();
        let err = s.apply_edit(GraphEdit::RemoveBlock(BlockId::new("nope")), t0);
        assert!(err.is_err());
        assert_eq!(s.definition(), before);
        assert_eq!(s.next_deadline(), None);
    }

    #[test]
    fn undo_flushes_the_pending_capture() {
        let t0 = Instant::now();
        let (mut s, _) = session();
        set_fast_period(&mut s, 20, t0);
        assert!(!s.history().can_undo());
        assert!(s.undo(t0));
        assert!(s.explanation().entry.contains("the 50-day SMA"));
        assert!(s.redo(t0));
        assert!(s.explanation().entry.contains("the 20-day SMA"));
    }

    #[test]
    fn undo_with_nothing_is_a_no_op() {
        let (mut s, _) = session();
        assert!(!s.undo(Instant::now()));
    }

    #[test]
    fn save_now_skips_when_clean() {
        let t0 = Instant::now();
        let (mut s, backend) = session();
        assert_eq!(s.save_now(t0), Some(AutosaveApplied::Saved { version: 1 }));
        assert_eq!(s.save_now(t0), None);
        assert!(!s.is_dirty());
        assert_eq!(backend.version_count(), 1);
    }

    #[test]
    fn annotated_canvas_carries_summaries() {
        let (s, _) = session();
        let (nodes, global) = s.annotated_canvas();
        assert!(global.is_empty());
        assert!(nodes.iter().any(|n| match &n.data {
            stratgraph_core::canvas::NodeData::Block(b) =>
                b.summary.as_deref() == Some("the 50-day SMA"),
            _ => false,
        }));
    }
}
