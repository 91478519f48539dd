// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::{
    DebouncedSearch, Facets, FetchState, FetchStatus, FetchTicket, FilterPatch, ListKind,
    ListPage, LoadingMode, NavigationSnapshot, PageSize, QueryParams, SNAPSHOT_VERSION, SortOrder,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountPhase {
    Uninitialized,
    Restoring,
    Ready,
    Unmounted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: FetchTicket,
    pub params: QueryParams,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListCommand<R> {
    /// `snapshot` is the raw stored snapshot for this page, read once.
    Mount {
        snapshot: Option<String>,
    },
    SearchInput {
        text: String,
        at: Instant,
    },
    Tick {
        now: Instant,
    },
    SetFilter(FilterPatch),
    SetPage(u32),
    SetPageSize(PageSize),
    ToggleSort,
    Refetch,
    ScrollTo(u32),
    PrepareForDetailNavigation {
        row_id: Option<i64>,
    },
    FetchCompleted {
        ticket: FetchTicket,
        result: Result<ListPage<R>, String>,
    },
    Unmount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent {
    FetchRequested(FetchRequest),
    SnapshotChanged(NavigationSnapshot),
    StatusChanged(FetchStatus),
    Restored,
    PageClamped { from: u32, to: u32 },
    StaleResponseDropped(FetchTicket),
}

/// What a table renderer needs from the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableView<'a, R> {
    pub items: &'a [R],
    pub total: u64,
    pub page: u32,
    pub page_size: PageSize,
    pub total_pages: u32,
    pub sort_order: SortOrder,
    pub loading: LoadingMode,
    pub error: Option<&'a str>,
}

/// Single source of truth for one paginated, filterable list.
///
/// All inputs arrive through [`ListController::dispatch`]; network work is
/// requested through [`ListEvent::FetchRequested`] and its outcome fed back
/// as [`ListCommand::FetchCompleted`]. Only the response carrying the most
/// recently issued ticket is applied.
#[derive(Debug, Clone)]
pub struct ListController<R> {
    kind: ListKind,
    phase: MountPhase,
    params: QueryParams,
    search: DebouncedSearch,
    fetch: FetchState<R>,
    last_ticket: FetchTicket,
    in_flight: Option<FetchRequest>,
    last_requested: Option<QueryParams>,
    loaded_once: bool,
    scroll_offset: u32,
    selected_row: Option<i64>,
}

impl<R> ListController<R> {
    pub fn new(kind: ListKind, defaults: QueryParams, debounce: Duration) -> Self {
        let params = defaults.normalized();
        let mut search = DebouncedSearch::new(debounce);
        search.reset(&params.search);
        Self {
            kind,
            phase: MountPhase::Uninitialized,
            params,
            search,
            fetch: FetchState::default(),
            last_ticket: FetchTicket::new(0),
            in_flight: None,
            last_requested: None,
            loaded_once: false,
            scroll_offset: 0,
            selected_row: None,
        }
    }

    pub fn dispatch(&mut self, command: ListCommand<R>) -> Vec<ListEvent> {
        match command {
            ListCommand::Mount { snapshot } => self.mount(snapshot.as_deref()),
            ListCommand::SearchInput { text, at } => {
                if self.phase != MountPhase::Unmounted {
                    self.search.on_keystroke(&text, at);
                }
                Vec::new()
            }
            ListCommand::Tick { now } => self.tick(now),
            ListCommand::SetFilter(patch) => self.set_filter(&patch),
            ListCommand::SetPage(page) => self.set_page(page),
            ListCommand::SetPageSize(page_size) => self.set_page_size(page_size),
            ListCommand::ToggleSort => {
                let mut next = self.params.clone();
                next.sort_order = next.sort_order.flipped();
                self.commit(next)
            }
            ListCommand::Refetch => self.refetch(),
            ListCommand::ScrollTo(offset) => self.scroll_to(offset),
            ListCommand::PrepareForDetailNavigation { row_id } => self.prepare_for_detail(row_id),
            ListCommand::FetchCompleted { ticket, result } => self.complete(ticket, result),
            ListCommand::Unmount => self.unmount(),
        }
    }

    pub fn kind(&self) -> ListKind {
        self.kind
    }

    pub fn phase(&self) -> MountPhase {
        self.phase
    }

    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    pub fn items(&self) -> &[R] {
        &self.fetch.items
    }

    pub fn total(&self) -> u64 {
        self.fetch.total
    }

    pub fn facets(&self) -> &Facets {
        &self.fetch.facets
    }

    pub fn page(&self) -> u32 {
        self.params.page
    }

    pub fn page_size(&self) -> PageSize {
        self.params.page_size
    }

    pub fn total_pages(&self) -> u32 {
        self.params.total_pages(self.fetch.total)
    }

    pub fn status(&self) -> FetchStatus {
        self.fetch.status
    }

    pub fn error(&self) -> Option<&str> {
        self.fetch.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.fetch.status == FetchStatus::Loading
    }

    pub fn loading_mode(&self) -> LoadingMode {
        match (self.fetch.status, self.loaded_once) {
            (FetchStatus::Loading, false) => LoadingMode::Blocking,
            (FetchStatus::Loading, true) => LoadingMode::Overlay,
            _ => LoadingMode::None,
        }
    }

    pub fn search_draft(&self) -> &str {
        self.search.draft()
    }

    /// When the event loop should next send [`ListCommand::Tick`].
    pub fn next_deadline(&self) -> Option<Instant> {
        self.search.deadline()
    }

    pub fn in_flight(&self) -> Option<&FetchRequest> {
        self.in_flight.as_ref()
    }

    pub fn scroll_offset(&self) -> u32 {
        self.scroll_offset
    }

    pub fn selected_row(&self) -> Option<i64> {
        self.selected_row
    }

    pub fn view(&self) -> TableView<'_, R> {
        TableView {
            items: &self.fetch.items,
            total: self.fetch.total,
            page: self.params.page,
            page_size: self.params.page_size,
            total_pages: self.total_pages(),
            sort_order: self.params.sort_order,
            loading: self.loading_mode(),
            error: self.error(),
        }
    }

    pub fn snapshot(&self, is_returning: bool) -> NavigationSnapshot {
        NavigationSnapshot {
            version: SNAPSHOT_VERSION,
            query: self.params.clone(),
            is_returning,
            scroll_offset: self.scroll_offset,
            selected_row: self.selected_row,
        }
    }

    fn is_mounted(&self) -> bool {
        matches!(self.phase, MountPhase::Restoring | MountPhase::Ready)
    }

    fn mount(&mut self, raw: Option<&str>) -> Vec<ListEvent> {
        if self.phase != MountPhase::Uninitialized {
            debug!(list = self.kind.as_str(), phase = ?self.phase, "ignoring repeated mount");
            return Vec::new();
        }

        let mut events = Vec::new();
        match raw.and_then(NavigationSnapshot::parse) {
            Some(snapshot) if snapshot.is_returning => {
                info!(
                    list = self.kind.as_str(),
                    page = snapshot.query.page,
                    "restoring list state from navigation snapshot"
                );
                self.params = snapshot.query;
                self.search.reset(&self.params.search);
                self.scroll_offset = snapshot.scroll_offset;
                self.selected_row = snapshot.selected_row;
                self.phase = MountPhase::Restoring;
                events.push(ListEvent::Restored);
            }
            _ => {
                self.phase = MountPhase::Ready;
            }
        }

        events.push(ListEvent::SnapshotChanged(self.snapshot(false)));
        self.issue_fetch(&mut events);
        events
    }

    fn tick(&mut self, now: Instant) -> Vec<ListEvent> {
        if self.phase == MountPhase::Unmounted {
            return Vec::new();
        }
        let Some(text) = self.search.poll(now) else {
            return Vec::new();
        };
        let mut next = self.params.clone();
        next.search = text;
        if next.filters_differ(&self.params) {
            next.page = 1;
        }
        self.commit(next)
    }

    fn set_filter(&mut self, patch: &FilterPatch) -> Vec<ListEvent> {
        if let Some(search) = &patch.search {
            self.search.reset(search);
        }
        let mut next = patch.apply_to(&self.params);
        if next.filters_differ(&self.params) {
            next.page = 1;
        }
        self.commit(next)
    }

    fn set_page(&mut self, page: u32) -> Vec<ListEvent> {
        let total_pages = self.total_pages();
        if page == 0 || page > total_pages {
            debug!(
                list = self.kind.as_str(),
                page, total_pages, "ignoring out-of-range page"
            );
            return Vec::new();
        }
        let mut next = self.params.clone();
        next.page = page;
        self.commit(next)
    }

    fn set_page_size(&mut self, page_size: PageSize) -> Vec<ListEvent> {
        let mut next = self.params.clone();
        next.page_size = page_size;
        if next != self.params {
            next.page = 1;
        }
        self.commit(next)
    }

    fn refetch(&mut self) -> Vec<ListEvent> {
        if !self.is_mounted() {
            return Vec::new();
        }
        let mut events = Vec::new();
        self.issue_fetch(&mut events);
        events
    }

    fn scroll_to(&mut self, offset: u32) -> Vec<ListEvent> {
        if offset == self.scroll_offset {
            return Vec::new();
        }
        self.scroll_offset = offset;
        if !self.is_mounted() {
            return Vec::new();
        }
        vec![ListEvent::SnapshotChanged(self.snapshot(false))]
    }

    fn prepare_for_detail(&mut self, row_id: Option<i64>) -> Vec<ListEvent> {
        if !self.is_mounted() {
            return Vec::new();
        }
        self.selected_row = row_id;
        vec![ListEvent::SnapshotChanged(self.snapshot(true))]
    }

    /// Moves to `next` and fetches unless those exact params were the last
    /// ones requested. Before mount the change is only recorded; the mount
    /// fetch picks it up.
    fn commit(&mut self, next: QueryParams) -> Vec<ListEvent> {
        if self.phase == MountPhase::Unmounted || next == self.params {
            return Vec::new();
        }
        self.params = next;
        if self.phase == MountPhase::Uninitialized {
            return Vec::new();
        }

        let mut events = vec![ListEvent::SnapshotChanged(self.snapshot(false))];
        if self.last_requested.as_ref() != Some(&self.params) {
            self.issue_fetch(&mut events);
        }
        events
    }

    fn issue_fetch(&mut self, events: &mut Vec<ListEvent>) {
        self.last_ticket = self.last_ticket.next();
        let request = FetchRequest {
            ticket: self.last_ticket,
            params: self.params.clone(),
        };
        if let Some(previous) = self.in_flight.replace(request.clone()) {
            debug!(
                list = self.kind.as_str(),
                superseded = previous.ticket.get(),
                "newer fetch supersedes in-flight request"
            );
        }
        debug!(
            list = self.kind.as_str(),
            ticket = request.ticket.get(),
            page = request.params.page,
            "issuing list fetch"
        );
        self.last_requested = Some(self.params.clone());
        self.fetch.status = FetchStatus::Loading;
        events.push(ListEvent::StatusChanged(FetchStatus::Loading));
        events.push(ListEvent::FetchRequested(request));
    }

    fn complete(
        &mut self,
        ticket: FetchTicket,
        result: Result<ListPage<R>, String>,
    ) -> Vec<ListEvent> {
        if self.phase == MountPhase::Unmounted {
            debug!(
                list = self.kind.as_str(),
                ticket = ticket.get(),
                "dropping response that arrived after unmount"
            );
            return Vec::new();
        }
        if self
            .in_flight
            .take_if(|request| request.ticket == ticket)
            .is_none()
        {
            debug!(
                list = self.kind.as_str(),
                ticket = ticket.get(),
                "dropping stale list response"
            );
            return vec![ListEvent::StaleResponseDropped(ticket)];
        }
        if self.phase == MountPhase::Restoring {
            self.phase = MountPhase::Ready;
        }

        let mut events = Vec::new();
        match result {
            Ok(page) => {
                let last_page = self.params.total_pages(page.total);
                if page.total > 0 && self.params.page > last_page {
                    let from = self.params.page;
                    info!(
                        list = self.kind.as_str(),
                        from,
                        to = last_page,
                        "requested page no longer exists; clamping"
                    );
                    self.params.page = last_page;
                    self.fetch.total = page.total;
                    events.push(ListEvent::PageClamped {
                        from,
                        to: last_page,
                    });
                    events.push(ListEvent::SnapshotChanged(self.snapshot(false)));
                    self.issue_fetch(&mut events);
                    return events;
                }

                if page.total == 0 && self.params.page > 1 {
                    let from = self.params.page;
                    info!(
                        list = self.kind.as_str(),
                        from, "result set is empty; clamping to first page"
                    );
                    self.params.page = 1;
                    self.last_requested = Some(self.params.clone());
                    events.push(ListEvent::PageClamped { from, to: 1 });
                    events.push(ListEvent::SnapshotChanged(self.snapshot(false)));
                }

                self.fetch.items = page.items;
                self.fetch.total = page.total;
                self.fetch.facets = page.facets;
                self.fetch.error = None;
                self.fetch.status = FetchStatus::Success;
                self.loaded_once = true;
                events.push(ListEvent::StatusChanged(FetchStatus::Success));
            }
            Err(message) => {
                warn!(
                    list = self.kind.as_str(),
                    error = %message,
                    "list fetch failed; keeping last good rows"
                );
                if !self.loaded_once {
                    self.fetch.items.clear();
                    self.fetch.total = 0;
                    self.fetch.facets.clear();
                }
                self.fetch.error = Some(message);
                self.fetch.status = FetchStatus::Error;
                events.push(ListEvent::StatusChanged(FetchStatus::Error));
            }
        }
        events
    }

    fn unmount(&mut self) -> Vec<ListEvent> {
        if self.phase == MountPhase::Unmounted {
            return Vec::new();
        }
        self.phase = MountPhase::Unmounted;
        self.search.cancel();
        if let Some(request) = self.in_flight.take() {
            debug!(
                list = self.kind.as_str(),
                ticket = request.ticket.get(),
                "unmounted with fetch in flight"
            );
        }
        Vec::new()
    }
}
