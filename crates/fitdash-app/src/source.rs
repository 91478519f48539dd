// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;

use crate::{BaseMetrics, DateRange, ListPage, MetricKey, MetricValue, QueryParams, QuickFilter};

/// Backend for one paginated list endpoint.
pub trait ListSource<R> {
    fn fetch_page(&mut self, params: &QueryParams) -> Result<ListPage<R>>;
}

/// Backend for the dashboard metric cards.
pub trait MetricSource {
    /// Page-level numbers for every metric, scoped to a quick filter.
    fn fetch_overview(&mut self, filter: QuickFilter) -> Result<BaseMetrics>;
    /// One metric scoped to a custom range.
    fn fetch_metric(&mut self, metric: MetricKey, range: DateRange) -> Result<MetricValue>;
}
