// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use time::Date;
use time::macros::format_description;

use crate::ids::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub const fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PageSize(u32);

impl PageSize {
    pub const ALLOWED: [u32; 4] = [5, 10, 20, 50];

    pub fn new(value: u32) -> Option<Self> {
        Self::ALLOWED.contains(&value).then_some(Self(value))
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self(10)
    }
}

impl TryFrom<u32> for PageSize {
    type Error = String;

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| {
            format!(
                "page size {value} is not supported; use one of {:?}",
                Self::ALLOWED
            )
        })
    }
}

impl From<PageSize> for u32 {
    fn from(value: PageSize) -> Self {
        value.0
    }
}

pub fn parse_date(raw: &str) -> Result<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .with_context(|| format!("invalid date {raw:?}; use YYYY-MM-DD"))
}

pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

mod iso_date {
    use super::{format_date, parse_date};
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_date(&raw).map_err(|error| serde::de::Error::custom(format!("{error:#}")))
    }
}

/// Inclusive calendar range. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    #[serde(with = "iso_date")]
    start: Date,
    #[serde(with = "iso_date")]
    end: Date,
}

#[derive(Deserialize)]
struct RawDateRange {
    #[serde(with = "iso_date")]
    start: Date,
    #[serde(with = "iso_date")]
    end: Date,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = String;

    fn try_from(raw: RawDateRange) -> std::result::Result<Self, Self::Error> {
        Self::new(raw.start, raw.end).ok_or_else(|| {
            format!(
                "date range starts {} after it ends {}",
                format_date(raw.start),
                format_date(raw.end)
            )
        })
    }
}

impl DateRange {
    pub fn new(start: Date, end: Date) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub const fn start(self) -> Date {
        self.start
    }

    pub const fn end(self) -> Date {
        self.end
    }
}

/// Every input that determines one list fetch. Compared by value to decide
/// whether a fetch is needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueryParams {
    pub search: String,
    pub filters: BTreeMap<String, String>,
    pub date_range: Option<DateRange>,
    pub sort_order: SortOrder,
    pub page: u32,
    pub page_size: PageSize,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            search: String::new(),
            filters: BTreeMap::new(),
            date_range: None,
            sort_order: SortOrder::default(),
            page: 1,
            page_size: PageSize::default(),
        }
    }
}

impl QueryParams {
    pub fn with_page_size(page_size: PageSize) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    /// Repairs values a stale or hand-edited snapshot may carry.
    pub fn normalized(mut self) -> Self {
        if self.page == 0 {
            self.page = 1;
        }
        self.filters.retain(|key, value| !key.is_empty() && !value.is_empty());
        self
    }

    /// True when `other` differs in anything besides page and page size.
    pub fn filters_differ(&self, other: &Self) -> bool {
        self.search != other.search
            || self.filters != other.filters
            || self.date_range != other.date_range
    }

    pub fn total_pages(&self, total: u64) -> u32 {
        total_pages(total, self.page_size)
    }
}

pub fn total_pages(total: u64, page_size: PageSize) -> u32 {
    let size = u64::from(page_size.get());
    u32::try_from(total.div_ceil(size)).unwrap_or(u32::MAX)
}

/// Partial update merged into [`QueryParams`] by `setFilter`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    pub search: Option<String>,
    pub filters: BTreeMap<String, Option<String>>,
    pub date_range: Option<Option<DateRange>>,
}

impl FilterPatch {
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn filter(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::default().and_filter(key, value)
    }

    pub fn date_range(range: Option<DateRange>) -> Self {
        Self {
            date_range: Some(range),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn and_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), Some(value.into()));
        self
    }

    #[must_use]
    pub fn and_clear(mut self, key: impl Into<String>) -> Self {
        self.filters.insert(key.into(), None);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_none() && self.filters.is_empty() && self.date_range.is_none()
    }

    pub fn apply_to(&self, params: &QueryParams) -> QueryParams {
        let mut next = params.clone();
        if let Some(search) = &self.search {
            next.search = search.trim().to_owned();
        }
        for (key, value) in &self.filters {
            match value.as_deref().map(str::trim) {
                Some(value) if !value.is_empty() => {
                    next.filters.insert(key.clone(), value.to_owned());
                }
                _ => {
                    next.filters.remove(key);
                }
            }
        }
        if let Some(range) = self.date_range {
            next.date_range = range;
        }
        next
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// How the renderer should present an in-progress load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingMode {
    None,
    Blocking,
    Overlay,
}

pub type Facets = BTreeMap<String, Value>;

/// One server page as returned by a list endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage<R> {
    pub items: Vec<R>,
    pub total: u64,
    pub facets: Facets,
}

impl<R> ListPage<R> {
    pub fn new(items: Vec<R>, total: u64) -> Self {
        Self {
            items,
            total,
            facets: Facets::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<R> {
    pub status: FetchStatus,
    pub items: Vec<R>,
    pub total: u64,
    pub facets: Facets,
    pub error: Option<String>,
}

impl<R> Default for FetchState<R> {
    fn default() -> Self {
        Self {
            status: FetchStatus::Idle,
            items: Vec::new(),
            total: 0,
            facets: Facets::new(),
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListKind {
    Users,
    GymPhotos,
    Revenue,
}

impl ListKind {
    pub const ALL: [Self; 3] = [Self::Users, Self::GymPhotos, Self::Revenue];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::GymPhotos => "gym-photos",
            Self::Revenue => "revenue",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "users" => Some(Self::Users),
            "gym-photos" => Some(Self::GymPhotos),
            "revenue" => Some(Self::Revenue),
            _ => None,
        }
    }

    /// Filter keys the backend understands for this list. Lists with a
    /// `date_filter` key also accept a custom date range.
    pub const fn filter_keys(self) -> &'static [&'static str] {
        match self {
            Self::Users => &["plan", "date_filter"],
            Self::GymPhotos => &["gym_id", "source"],
            Self::Revenue => &["plan", "date_filter"],
        }
    }
}

pub trait ListRow {
    fn row_id(&self) -> i64;
    fn cells(&self) -> Vec<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRow {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

impl ListRow for UserRow {
    fn row_id(&self) -> i64 {
        self.id.get()
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.get().to_string(),
            self.name.clone(),
            self.email.clone(),
            self.phone.clone(),
            self.plan.clone().unwrap_or_default(),
            self.created_at.clone(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GymPhotoRow {
    pub id: GymPhotoId,
    pub gym_id: GymId,
    #[serde(default)]
    pub gym_name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub uploaded_at: String,
}

impl ListRow for GymPhotoRow {
    fn row_id(&self) -> i64 {
        self.id.get()
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.get().to_string(),
            self.gym_id.get().to_string(),
            self.gym_name.clone(),
            self.source.clone(),
            self.url.clone(),
            self.uploaded_at.clone(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueRow {
    pub id: TransactionId,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub plan: String,
    #[serde(rename = "amount", with = "decimal_cents")]
    pub amount_cents: i64,
    #[serde(default)]
    pub paid_at: String,
}

impl ListRow for RevenueRow {
    fn row_id(&self) -> i64 {
        self.id.get()
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.get().to_string(),
            self.user_name.clone(),
            self.plan.clone(),
            self.amount_cents.to_string(),
            self.paid_at.clone(),
        ]
    }
}

pub fn decimal_to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

mod decimal_cents {
    use super::decimal_to_cents;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(cents: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(*cents as f64 / 100.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        f64::deserialize(deserializer).map(decimal_to_cents)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum QuickFilter {
    Today,
    Week,
    Month,
    #[default]
    Overall,
}

impl QuickFilter {
    pub const ALL: [Self; 4] = [Self::Today, Self::Week, Self::Month, Self::Overall];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Week => "week",
            Self::Month => "month",
            Self::Overall => "overall",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "today" => Some(Self::Today),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            "overall" => Some(Self::Overall),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricKey {
    TotalUsers,
    Revenue,
    GymOwners,
    Gyms,
}

impl MetricKey {
    pub const ALL: [Self; 4] = [Self::TotalUsers, Self::Revenue, Self::GymOwners, Self::Gyms];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TotalUsers => "totalUsers",
            Self::Revenue => "revenue",
            Self::GymOwners => "gymOwners",
            Self::Gyms => "gyms",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "totalUsers" => Some(Self::TotalUsers),
            "revenue" => Some(Self::Revenue),
            "gymOwners" => Some(Self::GymOwners),
            "gyms" => Some(Self::Gyms),
            _ => None,
        }
    }

    pub const fn is_money(self) -> bool {
        matches!(self, Self::Revenue)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricValue {
    Count(u64),
    Cents(i64),
}

impl MetricValue {
    /// Interprets a raw JSON number for `metric`; money arrives as a decimal
    /// amount, counts as non-negative integers.
    pub fn from_json(metric: MetricKey, value: &Value) -> Option<Self> {
        if metric.is_money() {
            return value.as_f64().map(|amount| Self::Cents(decimal_to_cents(amount)));
        }
        value
            .as_u64()
            .or_else(|| {
                value
                    .as_f64()
                    .filter(|n| *n >= 0.0 && n.fract() == 0.0)
                    .map(|n| n as u64)
            })
            .map(Self::Count)
    }

    pub fn display_raw(self) -> String {
        match self {
            Self::Count(count) => count.to_string(),
            Self::Cents(cents) => cents.to_string(),
        }
    }
}

pub type BaseMetrics = BTreeMap<MetricKey, MetricValue>;
