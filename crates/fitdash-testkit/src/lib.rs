// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use fitdash_app::{
    BaseMetrics, DateRange, GymId, GymPhotoId, GymPhotoRow, ListPage, ListRow, ListSource,
    MetricKey, MetricSource, MetricValue, QueryParams, QuickFilter, RevenueRow, SortOrder,
    TransactionId, UserId, UserRow, format_date,
};
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use time::{Date, Duration, Month};

const FIRST_NAMES: [&str; 16] = [
    "Asha", "Raj", "Priya", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn",
    "Kai", "Elliot", "Robin", "Cameron", "Hayden", "Rowan",
];
const LAST_NAMES: [&str; 14] = [
    "Patel", "Sharma", "Walker", "Martin", "Lopez", "Reed", "Turner", "Flores", "Bennett",
    "Price", "Iyer", "Brooks", "Nair", "Foster",
];
const PLANS: [&str; 4] = ["basic", "silver", "gold", "platinum"];
const PLAN_PRICES_CENTS: [i64; 4] = [999, 1_999, 2_999, 4_999];
const GYM_WORDS: [&str; 10] = [
    "Iron", "Pulse", "Summit", "Core", "Forge", "Peak", "Anchor", "Motion", "Vital", "Apex",
];
const GYM_SUFFIXES: [&str; 5] = ["Fitness", "Gym", "Athletics", "Strength Club", "Studio"];
const PHOTO_SOURCES: [&str; 3] = ["owner", "google", "admin"];

const REFERENCE_YEAR: i32 = 2026;

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Deterministic rows for the admin lists. Ids count up from 1 per kind.
#[derive(Debug, Clone)]
pub struct FitnessFaker {
    rng: DeterministicRng,
    seed: u64,
    next_user: i64,
    next_photo: i64,
    next_transaction: i64,
}

impl FitnessFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
            next_user: 1,
            next_photo: 1,
            next_transaction: 1,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn user(&mut self) -> UserRow {
        let id = UserId::new(self.next_user);
        self.next_user += 1;
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        let plan = self
            .rng
            .bool()
            .then(|| self.pick(&PLANS).to_owned());
        UserRow {
            id,
            name: format!("{first} {last}"),
            email: format!(
                "{}.{}{}@example.com",
                first.to_lowercase(),
                last.to_lowercase(),
                id.get()
            ),
            phone: format!("555-{:04}", self.rng.int_n(10_000)),
            plan,
            created_at: self.date_string(),
        }
    }

    pub fn gym_photo(&mut self) -> GymPhotoRow {
        let id = GymPhotoId::new(self.next_photo);
        self.next_photo += 1;
        let gym = self.rng.int_n(12) as i64 + 1;
        GymPhotoRow {
            id,
            gym_id: GymId::new(gym),
            gym_name: format!(
                "{} {}",
                GYM_WORDS[gym as usize % GYM_WORDS.len()],
                GYM_SUFFIXES[gym as usize % GYM_SUFFIXES.len()]
            ),
            url: format!("https://cdn.example.com/gyms/{gym}/photo-{}.jpg", id.get()),
            source: self.pick(&PHOTO_SOURCES).to_owned(),
            uploaded_at: self.date_string(),
        }
    }

    pub fn revenue_row(&mut self) -> RevenueRow {
        let id = TransactionId::new(self.next_transaction);
        self.next_transaction += 1;
        let plan_index = self.rng.int_n(PLANS.len());
        RevenueRow {
            id,
            user_name: format!("{} {}", self.pick(&FIRST_NAMES), self.pick(&LAST_NAMES)),
            plan: PLANS[plan_index].to_owned(),
            amount_cents: PLAN_PRICES_CENTS[plan_index],
            paid_at: self.date_string(),
        }
    }

    pub fn users(&mut self, count: usize) -> Vec<UserRow> {
        (0..count).map(|_| self.user()).collect()
    }

    pub fn gym_photos(&mut self, count: usize) -> Vec<GymPhotoRow> {
        (0..count).map(|_| self.gym_photo()).collect()
    }

    pub fn revenue_rows(&mut self, count: usize) -> Vec<RevenueRow> {
        (0..count).map(|_| self.revenue_row()).collect()
    }

    /// Page-level numbers that shrink with narrower quick filters.
    pub fn overview(&mut self, filter: QuickFilter) -> BaseMetrics {
        let divisor = match filter {
            QuickFilter::Today => 365,
            QuickFilter::Week => 52,
            QuickFilter::Month => 12,
            QuickFilter::Overall => 1,
        };
        let users = 2_000 + self.rng.int_n(3_000) as u64;
        let cents = 5_000_000 + self.rng.int_n(5_000_000) as i64;
        BaseMetrics::from([
            (MetricKey::TotalUsers, MetricValue::Count(users / divisor)),
            (MetricKey::Revenue, MetricValue::Cents(cents / divisor as i64)),
            (MetricKey::GymOwners, MetricValue::Count(40 + self.rng.int_n(20) as u64)),
            (MetricKey::Gyms, MetricValue::Count(60 + self.rng.int_n(40) as u64)),
        ])
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn date_string(&mut self) -> String {
        format_date(reference_date() + Duration::days(self.rng.int_n(365) as i64))
    }
}

/// Rows the scripted source can filter by query key.
pub trait FixtureRow: ListRow + Clone {
    fn field(&self, key: &str) -> Option<String>;
}

impl FixtureRow for UserRow {
    fn field(&self, key: &str) -> Option<String> {
        match key {
            "plan" => Some(self.plan.clone().unwrap_or_default()),
            _ => None,
        }
    }
}

impl FixtureRow for GymPhotoRow {
    fn field(&self, key: &str) -> Option<String> {
        match key {
            "gym_id" => Some(self.gym_id.get().to_string()),
            "source" => Some(self.source.clone()),
            _ => None,
        }
    }
}

impl FixtureRow for RevenueRow {
    fn field(&self, key: &str) -> Option<String> {
        match key {
            "plan" => Some(self.plan.clone()),
            _ => None,
        }
    }
}

/// In-memory list backend that pages, searches, filters, and sorts like
/// the real endpoints and records every request it receives.
#[derive(Debug, Clone)]
pub struct ScriptedListSource<R> {
    rows: Vec<R>,
    requests: Vec<QueryParams>,
    failures: VecDeque<String>,
}

impl<R: FixtureRow> ScriptedListSource<R> {
    pub fn new(rows: Vec<R>) -> Self {
        Self {
            rows,
            requests: Vec::new(),
            failures: VecDeque::new(),
        }
    }

    pub fn requests(&self) -> &[QueryParams] {
        &self.requests
    }

    pub fn request_count(&self) -> usize {
        self.requests.len()
    }

    /// The next request fails with `message` instead of answering.
    pub fn fail_next(&mut self, message: &str) {
        self.failures.push_back(message.to_owned());
    }

    /// Simulates server-side deletions.
    pub fn truncate(&mut self, len: usize) {
        self.rows.truncate(len);
    }

    pub fn matching(&self, params: &QueryParams) -> Vec<R> {
        let needle = params.search.to_lowercase();
        let mut rows: Vec<R> = self
            .rows
            .iter()
            .filter(|row| {
                needle.is_empty()
                    || row
                        .cells()
                        .iter()
                        .any(|cell| cell.to_lowercase().contains(&needle))
            })
            .filter(|row| {
                params.filters.iter().all(|(key, value)| match row.field(key) {
                    Some(field) => field.eq_ignore_ascii_case(value),
                    None => true,
                })
            })
            .cloned()
            .collect();
        rows.sort_by_key(ListRow::row_id);
        if params.sort_order == SortOrder::Desc {
            rows.reverse();
        }
        rows
    }
}

impl<R: FixtureRow> ListSource<R> for ScriptedListSource<R> {
    fn fetch_page(&mut self, params: &QueryParams) -> Result<ListPage<R>> {
        self.requests.push(params.clone());
        if let Some(message) = self.failures.pop_front() {
            bail!("{message}");
        }

        let rows = self.matching(params);
        let size = params.page_size.get() as usize;
        let start = (params.page.max(1) as usize - 1) * size;
        let items = rows.iter().skip(start).take(size).cloned().collect();
        Ok(ListPage::new(items, rows.len() as u64))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricRequest {
    Overview(QuickFilter),
    Scoped(MetricKey, DateRange),
}

/// Dashboard backend with fixed overview numbers per quick filter.
/// Scoped requests answer with a value derived from the range length.
#[derive(Debug, Clone)]
pub struct ScriptedMetricSource {
    overviews: BTreeMap<QuickFilter, BaseMetrics>,
    requests: Vec<MetricRequest>,
    failures: VecDeque<String>,
}

impl ScriptedMetricSource {
    pub fn new(faker: &mut FitnessFaker) -> Self {
        let overviews = QuickFilter::ALL
            .into_iter()
            .map(|filter| (filter, faker.overview(filter)))
            .collect();
        Self {
            overviews,
            requests: Vec::new(),
            failures: VecDeque::new(),
        }
    }

    pub fn overview_for(&self, filter: QuickFilter) -> Option<&BaseMetrics> {
        self.overviews.get(&filter)
    }

    pub fn requests(&self) -> &[MetricRequest] {
        &self.requests
    }

    pub fn fail_next(&mut self, message: &str) {
        self.failures.push_back(message.to_owned());
    }

    pub fn scoped_value(metric: MetricKey, range: DateRange) -> MetricValue {
        let days = (range.end() - range.start()).whole_days() + 1;
        if metric.is_money() {
            MetricValue::Cents(days * 10_000)
        } else {
            MetricValue::Count(days.unsigned_abs() * 3)
        }
    }
}

impl MetricSource for ScriptedMetricSource {
    fn fetch_overview(&mut self, filter: QuickFilter) -> Result<BaseMetrics> {
        self.requests.push(MetricRequest::Overview(filter));
        if let Some(message) = self.failures.pop_front() {
            bail!("{message}");
        }
        self.overviews
            .get(&filter)
            .cloned()
            .with_context(|| format!("no overview scripted for {}", filter.as_str()))
    }

    fn fetch_metric(&mut self, metric: MetricKey, range: DateRange) -> Result<MetricValue> {
        self.requests.push(MetricRequest::Scoped(metric, range));
        if let Some(message) = self.failures.pop_front() {
            bail!("{message}");
        }
        Ok(Self::scoped_value(metric, range))
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("session.db");
    Ok((dir, db_path))
}

pub fn plans() -> &'static [&'static str] {
    &PLANS
}

pub fn reference_date() -> Date {
    Date::from_calendar_date(REFERENCE_YEAR, Month::January, 1).unwrap_or(Date::MIN)
}
