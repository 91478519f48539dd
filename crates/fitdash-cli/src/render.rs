// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use fitdash_app::{
    CardView, ListKind, ListRow, LoadingMode, MetricValue, TableView, ValueSource, format_date,
};
use std::fmt::Write as _;

pub fn headers(kind: ListKind) -> &'static [&'static str] {
    match kind {
        ListKind::Users => &["id", "name", "email", "phone", "plan", "created"],
        ListKind::GymPhotos => &["id", "gym", "gym name", "source", "url", "uploaded"],
        ListKind::Revenue => &["id", "user", "plan", "amount", "paid"],
    }
}

pub fn table<R: ListRow>(kind: ListKind, view: &TableView<'_, R>) -> String {
    let mut out = String::new();
    if let Some(error) = view.error {
        let _ = writeln!(out, "error: {error}");
    }
    if view.loading == LoadingMode::Blocking {
        out.push_str("loading...\n");
        return out;
    }

    out.push_str(&headers(kind).join("\t"));
    out.push('\n');
    for row in view.items {
        let mut cells = row.cells();
        if kind == ListKind::Revenue
            && let Some(amount) = cells.get_mut(3)
            && let Ok(cents) = amount.parse::<i64>()
        {
            *amount = money(cents);
        }
        out.push_str(&cells.join("\t"));
        out.push('\n');
    }
    if view.items.is_empty() && view.error.is_none() {
        out.push_str("(no rows)\n");
    }
    let _ = writeln!(
        out,
        "page {}/{} (total {}, {} per page, {})",
        view.page,
        view.total_pages,
        view.total,
        view.page_size.get(),
        view.sort_order.as_str()
    );
    out
}

pub fn row_detail<R: ListRow>(kind: ListKind, row: &R) -> String {
    headers(kind)
        .iter()
        .zip(row.cells())
        .fold(String::new(), |mut out, (header, cell)| {
            let _ = writeln!(out, "{header}: {cell}");
            out
        })
}

pub fn cards(cards: &[CardView]) -> String {
    let mut out = String::new();
    for card in cards {
        let value = match card.value {
            Some(value) => metric_value(value),
            None if card.loading => "...".to_owned(),
            None => "-".to_owned(),
        };
        let source = match card.source {
            ValueSource::Base(filter) => filter.as_str().to_owned(),
            ValueSource::Custom(range) => {
                format!("{}..{}", format_date(range.start()), format_date(range.end()))
            }
        };
        let _ = write!(out, "{}\t{value}\t{source}", card.metric.as_str());
        if let Some(error) = &card.error {
            let _ = write!(out, "\terror: {error}");
        }
        out.push('\n');
    }
    out
}

fn metric_value(value: MetricValue) -> String {
    match value {
        MetricValue::Count(count) => count.to_string(),
        MetricValue::Cents(cents) => money(cents),
    }
}

fn money(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}
