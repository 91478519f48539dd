// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use fitdash_app::{
    BaseMetrics, DateRange, Facets, ListKind, ListPage, ListSource, MetricKey, MetricSource,
    MetricValue, QueryParams, QuickFilter, format_date,
};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    token: Option<String>,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    /// A blank `token` is treated as absent.
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("api.base_url must not be empty");
        }
        Url::parse(&base_url)
            .with_context(|| format!("api.base_url {base_url:?} is not a valid URL"))?;

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            token: token
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_owned),
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// A [`ListSource`] for one list endpoint.
    pub fn endpoint<R>(&self, kind: ListKind) -> Endpoint<'_, R> {
        Endpoint {
            client: self,
            kind,
            rows: PhantomData,
        }
    }

    pub fn list_url(&self, kind: ListKind, params: &QueryParams) -> Result<Url> {
        self.url(list_path(kind), &query_pairs(params))
    }

    pub fn fetch_list<R: DeserializeOwned>(
        &self,
        kind: ListKind,
        params: &QueryParams,
    ) -> Result<ListPage<R>> {
        let url = self.list_url(kind, params)?;
        let data: ListData<R> = self
            .get(url)
            .with_context(|| format!("fetch {} list", kind.as_str()))?;
        Ok(ListPage {
            items: data.items,
            total: data.total,
            facets: data.facets,
        })
    }

    pub fn fetch_overview(&self, filter: QuickFilter) -> Result<BaseMetrics> {
        let url = self.url(
            "/admin/dashboard",
            &[("date_filter".to_owned(), filter.as_str().to_owned())],
        )?;
        let data: serde_json::Map<String, Value> = self
            .get(url)
            .with_context(|| format!("fetch dashboard overview for {}", filter.as_str()))?;
        parse_overview(&data)
    }

    pub fn fetch_metric(&self, metric: MetricKey, range: DateRange) -> Result<MetricValue> {
        let url = self.url(
            "/admin/dashboard/metric",
            &[
                ("metric".to_owned(), metric.as_str().to_owned()),
                ("date_filter".to_owned(), "custom".to_owned()),
                ("custom_start_date".to_owned(), format_date(range.start())),
                ("custom_end_date".to_owned(), format_date(range.end())),
            ],
        )?;
        let data: MetricData = self
            .get(url)
            .with_context(|| format!("fetch {} for custom range", metric.as_str()))?;
        MetricValue::from_json(metric, &data.value).ok_or_else(|| {
            anyhow!(
                "server sent {} for {}; expected a number",
                data.value,
                metric.as_str()
            )
        })
    }

    /// Checks that the backend answers and accepts the configured token.
    pub fn ping(&self) -> Result<()> {
        self.fetch_overview(QuickFilter::Today).map(|_| ())
    }

    fn url(&self, path: &str, pairs: &[(String, String)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{path}", self.base_url))
            .with_context(|| format!("build URL for {path}"))?;
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url)
    }

    fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(url = %url, "GET");
        let mut request = self.http.get(url.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            warn!(url = %url, status = status.as_u16(), "request failed");
            return Err(clean_error_response(status, &body));
        }

        let body = response.text().context("read response body")?;
        let envelope: Envelope<T> = serde_json::from_str(&body).context("decode response")?;
        envelope.into_data()
    }
}

/// Binds a [`Client`] to one list endpoint and row type.
#[derive(Debug, Clone, Copy)]
pub struct Endpoint<'a, R> {
    client: &'a Client,
    kind: ListKind,
    rows: PhantomData<fn() -> R>,
}

impl<R> Endpoint<'_, R> {
    pub fn kind(&self) -> ListKind {
        self.kind
    }
}

impl<R: DeserializeOwned> ListSource<R> for Endpoint<'_, R> {
    fn fetch_page(&mut self, params: &QueryParams) -> Result<ListPage<R>> {
        self.client.fetch_list(self.kind, params)
    }
}

impl MetricSource for Client {
    fn fetch_overview(&mut self, filter: QuickFilter) -> Result<BaseMetrics> {
        Client::fetch_overview(self, filter)
    }

    fn fetch_metric(&mut self, metric: MetricKey, range: DateRange) -> Result<MetricValue> {
        Client::fetch_metric(self, metric, range)
    }
}

pub const fn list_path(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Users => "/admin/users",
        ListKind::GymPhotos => "/admin/gym-photos",
        ListKind::Revenue => "/admin/revenue/transactions",
    }
}

/// Query string for a list request. A date range always wins over any
/// `date_filter` value set through the categorical filters.
pub fn query_pairs(params: &QueryParams) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if !params.search.is_empty() {
        pairs.push(("search".to_owned(), params.search.clone()));
    }
    pairs.push(("page".to_owned(), params.page.to_string()));
    pairs.push(("limit".to_owned(), params.page_size.get().to_string()));
    pairs.push((
        "sort_order".to_owned(),
        params.sort_order.as_str().to_owned(),
    ));

    for (key, value) in &params.filters {
        if params.date_range.is_some() && is_date_key(key) {
            continue;
        }
        pairs.push((key.clone(), value.clone()));
    }

    if let Some(range) = params.date_range {
        pairs.push(("date_filter".to_owned(), "custom".to_owned()));
        pairs.push(("custom_start_date".to_owned(), format_date(range.start())));
        pairs.push(("custom_end_date".to_owned(), format_date(range.end())));
    }
    pairs
}

fn is_date_key(key: &str) -> bool {
    matches!(key, "date_filter" | "custom_start_date" | "custom_end_date")
}

fn parse_overview(data: &serde_json::Map<String, Value>) -> Result<BaseMetrics> {
    let mut metrics = BaseMetrics::new();
    for metric in MetricKey::ALL {
        let Some(raw) = data.get(metric.as_str()) else {
            debug!(metric = metric.as_str(), "overview omitted metric");
            continue;
        };
        let value = MetricValue::from_json(metric, raw).ok_or_else(|| {
            anyhow!(
                "server sent {raw} for {}; expected a number",
                metric.as_str()
            )
        })?;
        metrics.insert(metric, value);
    }
    Ok(metrics)
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- check api.base_url in the config file ({})",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = parsed.message.or(parsed.error)
        && !message.is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), message);
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return anyhow!(
            "server rejected credentials ({}) -- check api.token in the config file",
            status.as_u16()
        );
    }

    if body.len() < 100 && !body.contains('{') && !body.trim().is_empty() {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: Option<bool>,
    data: Option<T>,
    message: Option<String>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<T> {
        if self.success == Some(false) {
            let message = self
                .message
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| "request was not successful".to_owned());
            bail!("{message}");
        }
        self.data.ok_or_else(|| anyhow!("response has no data"))
    }
}

#[derive(Debug, Deserialize)]
struct ListData<R> {
    #[serde(default = "Vec::new")]
    items: Vec<R>,
    #[serde(default)]
    total: u64,
    #[serde(flatten)]
    facets: Facets,
}

#[derive(Debug, Deserialize)]
struct MetricData {
    value: Value,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: Option<String>,
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{Client, Envelope, ListData, clean_error_response, parse_overview, query_pairs};
    use anyhow::Result;
    use fitdash_app::{
        DateRange, FilterPatch, MetricKey, MetricValue, QueryParams, SortOrder, UserRow,
        parse_date,
    };
    use reqwest::StatusCode;
    use std::time::Duration;

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_owned(), value.to_owned())
    }

    #[test]
    fn default_params_send_paging_and_sort_only() {
        assert_eq!(
            query_pairs(&QueryParams::default()),
            vec![
                pair("page", "1"),
                pair("limit", "10"),
                pair("sort_order", "desc"),
            ]
        );
    }

    #[test]
    fn search_and_filters_are_sent() {
        let mut params = FilterPatch::search("raj")
            .and_filter("plan", "gold")
            .apply_to(&QueryParams::default());
        params.sort_order = SortOrder::Asc;
        let sent = query_pairs(&params);
        assert!(sent.contains(&pair("search", "raj")));
        assert!(sent.contains(&pair("plan", "gold")));
        assert!(sent.contains(&pair("sort_order", "asc")));
    }

    #[test]
    fn date_range_replaces_quick_date_filter() -> Result<()> {
        let range = DateRange::new(parse_date("2026-01-01")?, parse_date("2026-01-31")?)
            .ok_or_else(|| anyhow::anyhow!("valid range"))?;
        let params = FilterPatch::filter("date_filter", "week")
            .apply_to(&QueryParams::default());
        let params = FilterPatch::date_range(Some(range)).apply_to(&params);

        let sent = query_pairs(&params);
        let date_filters: Vec<_> = sent.iter().filter(|(key, _)| key == "date_filter").collect();
        assert_eq!(date_filters, vec![&pair("date_filter", "custom")]);
        assert!(sent.contains(&pair("custom_start_date", "2026-01-01")));
        assert!(sent.contains(&pair("custom_end_date", "2026-01-31")));
        Ok(())
    }

    #[test]
    fn list_data_keeps_unknown_keys_as_facets() -> Result<()> {
        let data: ListData<UserRow> = serde_json::from_str(
            r#"{"items":[],"total":0,"plans":["gold","silver"],"activeCount":4}"#,
        )?;
        assert_eq!(data.facets.len(), 2);
        assert!(data.facets.contains_key("plans"));
        Ok(())
    }

    #[test]
    fn unsuccessful_envelope_surfaces_message() {
        let envelope: Envelope<()> = serde_json::from_str(
            r#"{"success":false,"message":"plan filter is invalid"}"#,
        )
        .expect("envelope parses");
        let error = envelope.into_data().expect_err("success=false is an error");
        assert_eq!(error.to_string(), "plan filter is invalid");
    }

    #[test]
    fn overview_maps_revenue_to_cents() -> Result<()> {
        let data = serde_json::from_str(
            r#"{"totalUsers":120,"revenue":4500.5,"gymOwners":7,"gyms":11}"#,
        )?;
        let metrics = parse_overview(&data)?;
        assert_eq!(metrics.get(&MetricKey::Revenue), Some(&MetricValue::Cents(450_050)));
        assert_eq!(metrics.get(&MetricKey::Gyms), Some(&MetricValue::Count(11)));
        Ok(())
    }

    #[test]
    fn overview_rejects_non_numeric_values() -> Result<()> {
        let data = serde_json::from_str(r#"{"totalUsers":"many"}"#)?;
        let error = parse_overview(&data).expect_err("string is not a count");
        assert!(error.to_string().contains("totalUsers"));
        Ok(())
    }

    #[test]
    fn error_response_prefers_server_message() {
        let error = clean_error_response(
            StatusCode::BAD_REQUEST,
            r#"{"success":false,"message":"bad date"}"#,
        );
        assert_eq!(error.to_string(), "server error (400): bad date");

        let error = clean_error_response(StatusCode::UNAUTHORIZED, "");
        assert!(error.to_string().contains("api.token"));

        let error = clean_error_response(StatusCode::BAD_GATEWAY, "{\"oops\":");
        assert_eq!(error.to_string(), "server returned 502");
    }

    #[test]
    fn client_rejects_empty_or_invalid_base_url() {
        assert!(Client::new("  ", None, Duration::from_secs(1)).is_err());
        assert!(Client::new("not a url", None, Duration::from_secs(1)).is_err());
    }

    #[test]
    fn blank_token_is_dropped() -> Result<()> {
        let client = Client::new("http://localhost:5000/api/", Some("  "), Duration::from_secs(1))?;
        assert!(!client.has_token());
        assert_eq!(client.base_url(), "http://localhost:5000/api");
        Ok(())
    }
}
