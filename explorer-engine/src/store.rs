//! FILENAME: explorer-engine/src/store.rs
//! Explorer Store - drives materialization passes for one explorer instance.
//!
//! The store performs no I/O. A load hands back the queries to issue; the
//! host runs them (possibly concurrently) and feeds each reply to `deliver`.
//! Once every reply a pass needs has arrived, the pass runs synchronously.
//!
//! Only one pass is in flight at a time. A load arriving while the store is
//! locked is remembered, and the latest such load restarts the store as soon
//! as the in-flight pass completes.

use rustc_hash::FxHashMap;

use crate::collapse::{CollapsePolicy, CollapseTracker};
use crate::config::{ExplorerConfig, SupersedePolicy};
use crate::definition::{Dimension, Hierarchy, QueryResult};
use crate::ingest::{PassInput, ResultIngestor, SelectionIndex};
use crate::view::{ExplorerNode, ExplorerView, MaxCount};

/// Named filters applied to the base query.
pub const BASE_FILTERS: &[&str] = &["statefilter"];

/// Named filters applied to selection queries.
pub const SELECTION_FILTERS: &[&str] = &["stateSelectionFilter", "hoverSelectionFilter", "statefilter"];

// ============================================================================
// REQUESTS AND EVENTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// Unfiltered member counts, run once per hierarchy to seed its max count.
    Totals,
    /// Member counts under the current filters.
    Base,
    /// Member counts under the current filters and the user's selection.
    Selection,
}

/// A query the host must run on the store's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub kind: QueryKind,
    /// Hierarchy whose members go on rows.
    pub hierarchy: String,
    pub show_empty: bool,
    pub named_filters: Vec<String>,
    /// Replies carrying an outdated flight are ignored.
    pub flight: u64,
}

impl QueryRequest {
    fn new(kind: QueryKind, hierarchy: &str, show_empty: bool, filters: &[&str], flight: u64) -> Self {
        QueryRequest {
            kind,
            hierarchy: hierarchy.to_string(),
            show_empty,
            named_filters: filters.iter().map(|f| f.to_string()).collect(),
            flight,
        }
    }
}

/// Parameters of one explorer load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub dimension: Dimension,
    pub hierarchy_index: usize,
    /// Active selection filters; non-empty means a selection query joins the pass.
    pub selections: Vec<String>,
    pub show_empty: bool,
}

impl LoadRequest {
    pub fn new(dimension: Dimension) -> Self {
        LoadRequest {
            dimension,
            hierarchy_index: 0,
            selections: Vec::new(),
            show_empty: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// Run these queries and hand each reply to `ExplorerStore::deliver`.
    Queries(Vec<QueryRequest>),
    /// A pass completed; the view replaces the consumer's node list.
    Published(ExplorerView),
    /// The published pass merged a selection; a highlight pass may run.
    SelectRequest,
    /// Sub-counts of the published nodes changed.
    SubSelect,
}

/// Runs queries synchronously, e.g. against a local cube or in tests.
pub trait QuerySource {
    fn run(&mut self, request: &QueryRequest) -> QueryResult;
}

// ============================================================================
// STORE
// ============================================================================

#[derive(Debug)]
struct PendingPass {
    request: LoadRequest,
    hierarchy: Hierarchy,
    use_selection: bool,
    selection_flight: u64,
    base: Option<QueryResult>,
    selection: Option<QueryResult>,
}

impl PendingPass {
    fn is_ready(&self) -> bool {
        self.base.is_some() && (!self.use_selection || self.selection.is_some())
    }
}

pub struct ExplorerStore<P = CollapseTracker> {
    config: ExplorerConfig,
    collapse: P,
    locked: bool,
    stale: Option<LoadRequest>,
    pending: Option<PendingPass>,
    flight: u64,
    selection_flight: u64,
    /// Flight of a standalone selection refresh, if one is outstanding.
    selection_refresh: Option<u64>,
    totals: FxHashMap<String, MaxCount>,
    show_empty: bool,
    view: ExplorerView,
}

impl ExplorerStore {
    pub fn new(config: ExplorerConfig) -> Self {
        ExplorerStore::with_policy(config, CollapseTracker::new())
    }

    /// Records a user toggle; the next pass seeds the node with it.
    pub fn set_collapse(&mut self, node: &ExplorerNode, collapsed: bool) {
        self.collapse.set_collapse(node, collapsed);
    }
}

impl<P: CollapsePolicy> ExplorerStore<P> {
    pub fn with_policy(config: ExplorerConfig, collapse: P) -> Self {
        ExplorerStore {
            config,
            collapse,
            locked: false,
            stale: None,
            pending: None,
            flight: 0,
            selection_flight: 0,
            selection_refresh: None,
            totals: FxHashMap::default(),
            show_empty: false,
            view: ExplorerView::default(),
        }
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    /// Turns selection queries on or off for subsequent loads. Disabling
    /// also drops an outstanding selection refresh.
    pub fn set_enable_selection(&mut self, enabled: bool) {
        self.config.enable_selection = enabled;
        if !enabled {
            self.selection_refresh = None;
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// The most recently published view.
    pub fn view(&self) -> &ExplorerView {
        &self.view
    }

    pub fn max_count(&self) -> i64 {
        self.view.max_count
    }

    /// The running max ledger entry for a hierarchy.
    pub fn running_max(&self, hierarchy: &str) -> Option<MaxCount> {
        self.totals.get(hierarchy).copied()
    }

    /// Starts a load, or queues it when a pass is already in flight.
    pub fn load(&mut self, request: LoadRequest) -> Vec<StoreEvent> {
        if self.locked {
            log::info!(
                target: "EXPLORER",
                "load for {} deferred until the in-flight pass completes",
                request.dimension.name
            );
            self.stale = Some(request);
            return Vec::new();
        }

        let hierarchy = match request.dimension.hierarchy(request.hierarchy_index) {
            Ok(h) => h.clone(),
            Err(err) => {
                log::error!(target: "EXPLORER", "cannot load {}: {}", request.dimension.name, err);
                self.view = ExplorerView::default();
                return vec![StoreEvent::Published(self.view.clone())];
            }
        };

        self.locked = true;
        self.stale = None;
        self.flight += 1;
        self.show_empty = request.show_empty;
        if self.config.enable_selection {
            // outstanding selection refreshes belong to the previous load
            self.selection_flight += 1;
            self.selection_refresh = None;
        }

        let use_selection = self.config.enable_selection && !request.selections.is_empty();
        self.pending = Some(PendingPass {
            request,
            hierarchy,
            use_selection,
            selection_flight: 0,
            base: None,
            selection: None,
        });

        vec![StoreEvent::Queries(self.pass_queries())]
    }

    /// Queries the pending pass still needs: the totals query first for an
    /// unseen hierarchy, then the base and optional selection queries.
    fn pass_queries(&mut self) -> Vec<QueryRequest> {
        let Some(pending) = self.pending.as_mut() else {
            return Vec::new();
        };
        let name = pending.hierarchy.unique_name.clone();
        let show_empty = pending.request.show_empty;

        if !self.totals.contains_key(&name) {
            return vec![QueryRequest::new(QueryKind::Totals, &name, show_empty, &[], self.flight)];
        }

        let mut queries = vec![QueryRequest::new(QueryKind::Base, &name, show_empty, BASE_FILTERS, self.flight)];
        if pending.use_selection {
            self.selection_flight += 1;
            pending.selection_flight = self.selection_flight;
            queries.push(QueryRequest::new(
                QueryKind::Selection,
                &name,
                show_empty,
                SELECTION_FILTERS,
                self.selection_flight,
            ));
        }
        queries
    }

    /// Accepts the reply to a query the store issued.
    pub fn deliver(&mut self, request: &QueryRequest, result: QueryResult) -> Vec<StoreEvent> {
        match request.kind {
            QueryKind::Totals => {
                if !self.is_current_pass(request) {
                    return self.ignore(request);
                }
                let seeded = MaxCount::new(result.max_member_count());
                self.totals.insert(request.hierarchy.clone(), seeded);
                vec![StoreEvent::Queries(self.pass_queries())]
            }
            QueryKind::Base => {
                if !self.is_current_pass(request) {
                    return self.ignore(request);
                }
                if let Some(pending) = self.pending.as_mut() {
                    pending.base = Some(result);
                }
                self.complete_if_ready()
            }
            QueryKind::Selection => {
                let for_pending = self.pending.as_ref().map_or(false, |p| {
                    p.use_selection && p.selection_flight == request.flight && request.flight == self.selection_flight
                });
                if for_pending {
                    if let Some(pending) = self.pending.as_mut() {
                        pending.selection = Some(result);
                    }
                    return self.complete_if_ready();
                }
                if self.selection_refresh == Some(request.flight) && request.flight == self.selection_flight {
                    self.selection_refresh = None;
                    return self.apply_selection(&result);
                }
                self.ignore(request)
            }
        }
    }

    fn is_current_pass(&self, request: &QueryRequest) -> bool {
        request.flight == self.flight
            && self
                .pending
                .as_ref()
                .map_or(false, |p| p.hierarchy.unique_name == request.hierarchy)
    }

    fn ignore(&self, request: &QueryRequest) -> Vec<StoreEvent> {
        log::debug!(
            target: "EXPLORER",
            "ignoring outdated {:?} reply for {} (flight {})",
            request.kind,
            request.hierarchy,
            request.flight
        );
        Vec::new()
    }

    fn complete_if_ready(&mut self) -> Vec<StoreEvent> {
        if !self.pending.as_ref().map_or(false, PendingPass::is_ready) {
            return Vec::new();
        }
        let Some(pending) = self.pending.take() else {
            return Vec::new();
        };
        self.locked = false;

        if let Some(stale) = self.stale.take() {
            return match self.config.supersede {
                SupersedePolicy::Restart => {
                    log::info!(target: "EXPLORER", "pass superseded, restarting with newer load");
                    self.load(stale)
                }
                SupersedePolicy::PublishThenReload => {
                    let mut events = self.publish(pending);
                    events.extend(self.load(stale));
                    events
                }
            };
        }

        self.publish(pending)
    }

    fn publish(&mut self, pending: PendingPass) -> Vec<StoreEvent> {
        let name = pending.hierarchy.unique_name.clone();
        let Some(base) = pending.base.as_ref() else {
            return Vec::new();
        };
        let input = PassInput {
            hierarchy: &pending.hierarchy,
            base,
            selection: pending.selection.as_ref(),
            show_empty: pending.request.show_empty,
            max_count: self.totals.get(&name).copied().unwrap_or_default(),
        };

        let view = match ResultIngestor::new(&self.config, &self.collapse).materialize(&input) {
            Ok(view) => {
                self.totals.insert(name, view.running_max);
                view
            }
            Err(err) => {
                log::error!(target: "EXPLORER", "materialization failed for {}: {}", name, err);
                ExplorerView::empty(name)
            }
        };

        let mut events = vec![StoreEvent::Published(view.clone())];
        if view.selection_ready {
            events.push(StoreEvent::SelectRequest);
        }
        self.view = view;
        events
    }

    // ========================================================================
    // SELECTION REFRESH
    // ========================================================================

    /// Refreshes sub-counts of the published nodes for the user's current
    /// selection filters. No active filters clears the selection instead.
    pub fn load_selection(&mut self, selections: &[String]) -> Vec<StoreEvent> {
        if !self.config.enable_selection || self.locked || self.view.hierarchy.is_empty() {
            return Vec::new();
        }
        if selections.is_empty() {
            self.selection_refresh = None;
            return self.clear_selection();
        }
        self.selection_flight += 1;
        self.selection_refresh = Some(self.selection_flight);
        vec![StoreEvent::Queries(vec![QueryRequest::new(
            QueryKind::Selection,
            &self.view.hierarchy,
            self.show_empty,
            SELECTION_FILTERS,
            self.selection_flight,
        )])]
    }

    fn apply_selection(&mut self, result: &QueryResult) -> Vec<StoreEvent> {
        let index = SelectionIndex::new(result);
        self.for_each_node(|node| {
            node.subcount = Some(index.subcount(&node.unique_name));
            node.has_select = true;
        });
        vec![StoreEvent::SubSelect]
    }

    /// Drops sub-counts from the published nodes.
    pub fn clear_selection(&mut self) -> Vec<StoreEvent> {
        if !self.config.enable_selection {
            return Vec::new();
        }
        self.for_each_node(|node| {
            node.subcount = None;
            node.has_select = false;
        });
        vec![StoreEvent::SubSelect]
    }

    fn for_each_node(&mut self, mut f: impl FnMut(&mut ExplorerNode)) {
        self.view.nodes.iter_mut().for_each(&mut f);
        self.view
            .custom_groups
            .values_mut()
            .flat_map(|nodes| nodes.iter_mut())
            .for_each(&mut f);
    }

    // ========================================================================
    // SYNCHRONOUS DRIVER
    // ========================================================================

    /// Runs every requested query against `source` until the store is idle,
    /// returning the remaining events in order.
    pub fn run_to_idle(&mut self, events: Vec<StoreEvent>, source: &mut impl QuerySource) -> Vec<StoreEvent> {
        let mut queue: std::collections::VecDeque<StoreEvent> = events.into();
        let mut out = Vec::new();

        while let Some(event) = queue.pop_front() {
            match event {
                StoreEvent::Queries(queries) => {
                    for query in queries {
                        let result = source.run(&query);
                        queue.extend(self.deliver(&query, result));
                    }
                }
                other => out.push(other),
            }
        }
        out
    }
}
