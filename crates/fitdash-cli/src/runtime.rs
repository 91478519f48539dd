// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use fitdash_app::{
    ListCommand, ListController, ListEvent, ListSource, MetricBoard, MetricCommand, MetricEvent,
    MetricKey, MetricSource, SnapshotStore, persist, read_for_mount, snapshot_key,
};
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Drives one list controller to quiescence against a blocking source.
///
/// Every requested fetch is answered before the next command is processed,
/// and every snapshot change is written through to the session store.
pub struct ListRuntime<'a, R> {
    controller: ListController<R>,
    source: &'a mut dyn ListSource<R>,
    store: &'a mut dyn SnapshotStore,
    key: String,
    fetches: usize,
}

impl<'a, R> ListRuntime<'a, R> {
    pub fn new(
        controller: ListController<R>,
        source: &'a mut dyn ListSource<R>,
        store: &'a mut dyn SnapshotStore,
        session: &str,
    ) -> Self {
        let key = snapshot_key(session, controller.kind());
        Self {
            controller,
            source,
            store,
            key,
            fetches: 0,
        }
    }

    pub fn controller(&self) -> &ListController<R> {
        &self.controller
    }

    /// Fetches issued so far.
    pub fn fetches(&self) -> usize {
        self.fetches
    }

    pub fn mount(&mut self) -> Vec<ListEvent> {
        let snapshot = read_for_mount(&*self.store, &self.key);
        self.dispatch(ListCommand::Mount { snapshot })
    }

    /// Types `text` into the search box and lets the debounce window elapse.
    pub fn type_search(&mut self, text: &str, at: Instant) -> Vec<ListEvent> {
        let mut events = self.dispatch(ListCommand::SearchInput {
            text: text.to_owned(),
            at,
        });
        if let Some(deadline) = self.controller.next_deadline() {
            events.extend(self.dispatch(ListCommand::Tick { now: deadline }));
        }
        events
    }

    pub fn dispatch(&mut self, command: ListCommand<R>) -> Vec<ListEvent> {
        let mut processed = Vec::new();
        let mut queue = VecDeque::from([command]);
        while let Some(command) = queue.pop_front() {
            for event in self.controller.dispatch(command) {
                match &event {
                    ListEvent::FetchRequested(request) => {
                        self.fetches += 1;
                        let result = self
                            .source
                            .fetch_page(&request.params)
                            .map_err(|error| format!("{error:#}"));
                        queue.push_back(ListCommand::FetchCompleted {
                            ticket: request.ticket,
                            result,
                        });
                    }
                    ListEvent::SnapshotChanged(snapshot) => {
                        if let Err(error) = persist(&mut *self.store, &self.key, snapshot) {
                            warn!(key = %self.key, error = %format!("{error:#}"), "snapshot not saved");
                        }
                    }
                    ListEvent::PageClamped { from, to } => {
                        info!(list = self.controller.kind().as_str(), from, to, "page clamped");
                    }
                    ListEvent::StaleResponseDropped(ticket) => {
                        debug!(ticket = ticket.get(), "stale list response dropped");
                    }
                    ListEvent::StatusChanged(_) | ListEvent::Restored => {}
                }
                processed.push(event);
            }
        }
        processed
    }
}

/// Drives the metric board against a blocking metric source.
pub struct DashboardRuntime<'a> {
    board: MetricBoard,
    source: &'a mut dyn MetricSource,
}

impl<'a> DashboardRuntime<'a> {
    pub fn new(board: MetricBoard, source: &'a mut dyn MetricSource) -> Self {
        Self { board, source }
    }

    pub fn board(&self) -> &MetricBoard {
        &self.board
    }

    pub fn dispatch(&mut self, command: MetricCommand) -> Vec<MetricEvent> {
        let mut processed = Vec::new();
        let mut queue = VecDeque::from([command]);
        while let Some(command) = queue.pop_front() {
            for event in self.board.dispatch(command) {
                match &event {
                    MetricEvent::BaseRequested { ticket, filter } => {
                        let result = self
                            .source
                            .fetch_overview(*filter)
                            .map_err(|error| format!("{error:#}"));
                        queue.push_back(MetricCommand::BaseLoaded {
                            ticket: *ticket,
                            filter: *filter,
                            result,
                        });
                    }
                    MetricEvent::MetricRequested {
                        ticket,
                        metric,
                        range,
                    } => {
                        let result = self
                            .source
                            .fetch_metric(*metric, *range)
                            .map_err(|error| format!("{error:#}"));
                        queue.push_back(MetricCommand::MetricLoaded {
                            ticket: *ticket,
                            metric: *metric,
                            result,
                        });
                    }
                    MetricEvent::Failed { metric, message } => {
                        warn!(
                            metric = metric.map(MetricKey::as_str),
                            error = %message,
                            "dashboard fetch failed"
                        );
                    }
                    _ => {}
                }
                processed.push(event);
            }
        }
        processed
    }
}
