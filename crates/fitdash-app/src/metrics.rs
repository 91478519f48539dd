// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::{BTreeMap, BTreeSet};
use time::Date;
use tracing::{debug, info, warn};

use crate::{
    BaseMetrics, DateRange, DateRangeForm, FetchTicket, MetricKey, MetricValue, MountPhase,
    QuickFilter,
};

/// What a metric card's selector currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricFilter {
    Quick(QuickFilter),
    Custom,
}

/// A custom range whose value has been fetched with exactly that range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedOverride {
    pub range: DateRange,
    pub value: MetricValue,
}

/// Where the number on a card came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Base(QuickFilter),
    Custom(DateRange),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScopedRequest {
    ticket: FetchTicket,
    range: DateRange,
    revert_to: MetricFilter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MetricCard {
    filter: MetricFilter,
    quick: QuickFilter,
    applied: Option<AppliedOverride>,
    pending: Option<ScopedRequest>,
    focused_with: Option<MetricFilter>,
    reselected_custom: bool,
    error: Option<String>,
}

impl MetricCard {
    fn new(quick: QuickFilter) -> Self {
        Self {
            filter: MetricFilter::Quick(quick),
            quick,
            applied: None,
            pending: None,
            focused_with: None,
            reselected_custom: false,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Picker {
    metric: MetricKey,
    form: DateRangeForm,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricCommand {
    Mount,
    SetQuickFilter {
        metric: MetricKey,
        filter: QuickFilter,
    },
    OpenCustomRange(MetricKey),
    SetPickerStart(Option<Date>),
    SetPickerEnd(Option<Date>),
    ApplyCustomRange,
    CloseWithoutApply,
    SelectorFocus(MetricKey),
    SelectorSelect {
        metric: MetricKey,
        filter: MetricFilter,
    },
    SelectorBlur(MetricKey),
    BaseLoaded {
        ticket: FetchTicket,
        filter: QuickFilter,
        result: Result<BaseMetrics, String>,
    },
    MetricLoaded {
        ticket: FetchTicket,
        metric: MetricKey,
        result: Result<MetricValue, String>,
    },
    Unmount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricEvent {
    BaseRequested {
        ticket: FetchTicket,
        filter: QuickFilter,
    },
    MetricRequested {
        ticket: FetchTicket,
        metric: MetricKey,
        range: DateRange,
    },
    PickerOpened {
        metric: MetricKey,
        range: Option<DateRange>,
    },
    PickerClosed {
        metric: MetricKey,
    },
    ValueChanged(MetricKey),
    Failed {
        metric: Option<MetricKey>,
        message: String,
    },
    StaleResponseDropped(FetchTicket),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub metric: MetricKey,
    pub filter: MetricFilter,
    pub value: Option<MetricValue>,
    pub source: ValueSource,
    pub applied: bool,
    pub applied_range: Option<DateRange>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Dashboard metric cards, each with its own quick filter or custom range.
///
/// Page-level numbers are fetched once per quick filter and shared by every
/// card on that filter. A custom range fetches only the one metric it
/// belongs to, so cards never refetch on each other's behalf.
#[derive(Debug, Clone)]
pub struct MetricBoard {
    phase: MountPhase,
    cards: BTreeMap<MetricKey, MetricCard>,
    base: BTreeMap<QuickFilter, BaseMetrics>,
    base_pending: BTreeMap<QuickFilter, FetchTicket>,
    base_errors: BTreeMap<QuickFilter, String>,
    picker: Option<Picker>,
    last_ticket: FetchTicket,
}

impl MetricBoard {
    pub fn new(default_filter: QuickFilter) -> Self {
        let cards = MetricKey::ALL
            .into_iter()
            .map(|metric| (metric, MetricCard::new(default_filter)))
            .collect();
        Self {
            phase: MountPhase::Uninitialized,
            cards,
            base: BTreeMap::new(),
            base_pending: BTreeMap::new(),
            base_errors: BTreeMap::new(),
            picker: None,
            last_ticket: FetchTicket::new(0),
        }
    }

    pub fn dispatch(&mut self, command: MetricCommand) -> Vec<MetricEvent> {
        if self.phase == MountPhase::Unmounted {
            debug!(?command, "metric board unmounted; ignoring command");
            return Vec::new();
        }
        match command {
            MetricCommand::Mount => self.mount(),
            MetricCommand::SetQuickFilter { metric, filter } => {
                self.set_quick_filter(metric, filter)
            }
            MetricCommand::OpenCustomRange(metric) => self.open_custom_range(metric),
            MetricCommand::SetPickerStart(date) => {
                if let Some(picker) = &mut self.picker {
                    picker.form.start = date;
                }
                Vec::new()
            }
            MetricCommand::SetPickerEnd(date) => {
                if let Some(picker) = &mut self.picker {
                    picker.form.end = date;
                }
                Vec::new()
            }
            MetricCommand::ApplyCustomRange => self.apply_custom_range(),
            MetricCommand::CloseWithoutApply => match self.picker.take() {
                Some(picker) => vec![MetricEvent::PickerClosed {
                    metric: picker.metric,
                }],
                None => Vec::new(),
            },
            MetricCommand::SelectorFocus(metric) => {
                let card = self.card_mut(metric);
                card.focused_with = Some(card.filter);
                card.reselected_custom = false;
                Vec::new()
            }
            MetricCommand::SelectorSelect { metric, filter } => self.select(metric, filter),
            MetricCommand::SelectorBlur(metric) => self.blur(metric),
            MetricCommand::BaseLoaded {
                ticket,
                filter,
                result,
            } => self.base_loaded(ticket, filter, result),
            MetricCommand::MetricLoaded {
                ticket,
                metric,
                result,
            } => self.metric_loaded(ticket, metric, result),
            MetricCommand::Unmount => {
                self.phase = MountPhase::Unmounted;
                self.base.clear();
                self.base_pending.clear();
                self.base_errors.clear();
                self.picker = None;
                for card in self.cards.values_mut() {
                    card.pending = None;
                }
                Vec::new()
            }
        }
    }

    pub fn phase(&self) -> MountPhase {
        self.phase
    }

    pub fn card(&self, metric: MetricKey) -> CardView {
        let fallback = MetricCard::new(QuickFilter::default());
        let card = self.cards.get(&metric).unwrap_or(&fallback);
        let (value, source) = match card.applied {
            Some(applied) => (Some(applied.value), ValueSource::Custom(applied.range)),
            None => (
                self.base
                    .get(&card.quick)
                    .and_then(|metrics| metrics.get(&metric))
                    .copied(),
                ValueSource::Base(card.quick),
            ),
        };
        let loading = card.pending.is_some()
            || (card.applied.is_none() && self.base_pending.contains_key(&card.quick));
        CardView {
            metric,
            filter: card.filter,
            value,
            source,
            applied: card.applied.is_some(),
            applied_range: card.applied.map(|applied| applied.range),
            loading,
            error: card.error.clone().or_else(|| {
                card.applied
                    .is_none()
                    .then(|| self.base_errors.get(&card.quick).cloned())
                    .flatten()
            }),
        }
    }

    pub fn cards(&self) -> Vec<CardView> {
        MetricKey::ALL.into_iter().map(|metric| self.card(metric)).collect()
    }

    pub fn picker(&self) -> Option<(MetricKey, DateRangeForm)> {
        self.picker.map(|picker| (picker.metric, picker.form))
    }

    /// Whether the open picker's Apply action is enabled.
    pub fn can_apply(&self) -> bool {
        self.picker.is_some_and(|picker| picker.form.can_apply())
    }

    fn card_mut(&mut self, metric: MetricKey) -> &mut MetricCard {
        let quick = QuickFilter::default();
        self.cards
            .entry(metric)
            .or_insert_with(|| MetricCard::new(quick))
    }

    fn next_ticket(&mut self) -> FetchTicket {
        self.last_ticket = self.last_ticket.next();
        self.last_ticket
    }

    fn mount(&mut self) -> Vec<MetricEvent> {
        if self.phase != MountPhase::Uninitialized {
            debug!(phase = ?self.phase, "ignoring repeated metric board mount");
            return Vec::new();
        }
        self.phase = MountPhase::Ready;
        let filters: BTreeSet<QuickFilter> = self.cards.values().map(|card| card.quick).collect();
        let mut events = Vec::new();
        for filter in filters {
            self.ensure_base(filter, &mut events);
        }
        events
    }

    fn ensure_base(&mut self, filter: QuickFilter, events: &mut Vec<MetricEvent>) {
        if self.phase != MountPhase::Ready
            || self.base.contains_key(&filter)
            || self.base_pending.contains_key(&filter)
        {
            return;
        }
        let ticket = self.next_ticket();
        debug!(
            filter = filter.as_str(),
            ticket = ticket.get(),
            "requesting dashboard overview"
        );
        self.base_pending.insert(filter, ticket);
        events.push(MetricEvent::BaseRequested { ticket, filter });
    }

    fn set_quick_filter(&mut self, metric: MetricKey, filter: QuickFilter) -> Vec<MetricEvent> {
        let card = self.card_mut(metric);
        card.filter = MetricFilter::Quick(filter);
        card.quick = filter;
        card.applied = None;
        card.error = None;
        if let Some(dropped) = card.pending.take() {
            debug!(
                metric = metric.as_str(),
                ticket = dropped.ticket.get(),
                "quick filter supersedes custom range request"
            );
        }

        let mut events = Vec::new();
        if self.picker.is_some_and(|picker| picker.metric == metric) {
            self.picker = None;
            events.push(MetricEvent::PickerClosed { metric });
        }
        self.ensure_base(filter, &mut events);
        events.push(MetricEvent::ValueChanged(metric));
        events
    }

    fn open_custom_range(&mut self, metric: MetricKey) -> Vec<MetricEvent> {
        let applied = self.card_mut(metric).applied.map(|applied| applied.range);
        self.picker = Some(Picker {
            metric,
            form: DateRangeForm::prefilled(applied),
        });
        vec![MetricEvent::PickerOpened {
            metric,
            range: applied,
        }]
    }

    fn apply_custom_range(&mut self) -> Vec<MetricEvent> {
        let Some(picker) = self.picker else {
            return Vec::new();
        };
        let range = match picker.form.validate() {
            Ok(range) => range,
            Err(error) => {
                debug!(metric = picker.metric.as_str(), %error, "apply disabled");
                return Vec::new();
            }
        };
        if self.phase != MountPhase::Ready {
            debug!(
                metric = picker.metric.as_str(),
                "board not mounted; ignoring apply"
            );
            return Vec::new();
        }
        self.picker = None;

        let metric = picker.metric;
        let ticket = self.next_ticket();
        let card = self.card_mut(metric);
        let revert_to = match card.pending {
            Some(previous) => previous.revert_to,
            None => card.filter,
        };
        card.pending = Some(ScopedRequest {
            ticket,
            range,
            revert_to,
        });
        card.filter = MetricFilter::Custom;
        card.error = None;
        info!(
            metric = metric.as_str(),
            ticket = ticket.get(),
            "requesting metric for custom range"
        );
        vec![
            MetricEvent::PickerClosed { metric },
            MetricEvent::MetricRequested {
                ticket,
                metric,
                range,
            },
        ]
    }

    fn select(&mut self, metric: MetricKey, filter: MetricFilter) -> Vec<MetricEvent> {
        match filter {
            MetricFilter::Quick(quick) => self.set_quick_filter(metric, quick),
            MetricFilter::Custom => {
                let card = self.card_mut(metric);
                if card.filter == MetricFilter::Custom {
                    card.reselected_custom = true;
                    Vec::new()
                } else {
                    self.open_custom_range(metric)
                }
            }
        }
    }

    /// A selector that was already on Custom when focused, still on Custom
    /// at blur, and saw Custom picked again reopens the picker with the
    /// applied range.
    fn blur(&mut self, metric: MetricKey) -> Vec<MetricEvent> {
        let card = self.card_mut(metric);
        let focused_with = card.focused_with.take();
        let reselected = std::mem::take(&mut card.reselected_custom);
        let reopen = reselected
            && focused_with == Some(MetricFilter::Custom)
            && card.filter == MetricFilter::Custom;
        if reopen && self.picker.is_none() {
            return self.open_custom_range(metric);
        }
        Vec::new()
    }

    fn base_loaded(
        &mut self,
        ticket: FetchTicket,
        filter: QuickFilter,
        result: Result<BaseMetrics, String>,
    ) -> Vec<MetricEvent> {
        if self.base_pending.get(&filter) != Some(&ticket) {
            debug!(
                filter = filter.as_str(),
                ticket = ticket.get(),
                "dropping stale overview response"
            );
            return vec![MetricEvent::StaleResponseDropped(ticket)];
        }
        self.base_pending.remove(&filter);

        match result {
            Ok(metrics) => {
                self.base.insert(filter, metrics);
                self.base_errors.remove(&filter);
                self.cards
                    .iter()
                    .filter(|(_, card)| card.applied.is_none() && card.quick == filter)
                    .map(|(metric, _)| MetricEvent::ValueChanged(*metric))
                    .collect()
            }
            Err(message) => {
                warn!(filter = filter.as_str(), error = %message, "dashboard overview failed");
                self.base_errors.insert(filter, message.clone());
                vec![MetricEvent::Failed {
                    metric: None,
                    message,
                }]
            }
        }
    }

    fn metric_loaded(
        &mut self,
        ticket: FetchTicket,
        metric: MetricKey,
        result: Result<MetricValue, String>,
    ) -> Vec<MetricEvent> {
        let card = self.card_mut(metric);
        let Some(request) = card.pending.take_if(|request| request.ticket == ticket) else {
            debug!(
                metric = metric.as_str(),
                ticket = ticket.get(),
                "dropping stale metric response"
            );
            return vec![MetricEvent::StaleResponseDropped(ticket)];
        };

        match result {
            Ok(value) => {
                card.applied = Some(AppliedOverride {
                    range: request.range,
                    value,
                });
                card.error = None;
                vec![MetricEvent::ValueChanged(metric)]
            }
            Err(message) => {
                warn!(metric = metric.as_str(), error = %message, "metric fetch failed");
                if card.applied.is_none() {
                    card.filter = request.revert_to;
                }
                card.error = Some(message.clone());
                vec![MetricEvent::Failed {
                    metric: Some(metric),
                    message,
                }]
            }
        }
    }
}
