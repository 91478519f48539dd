// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use time::Date;

use crate::{DateRange, format_date, parse_date};

/// Pending inputs of a custom date-range picker. Nothing here is applied
/// until [`DateRangeForm::validate`] succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRangeForm {
    pub start: Option<Date>,
    pub end: Option<Date>,
}

impl DateRangeForm {
    pub fn prefilled(range: Option<DateRange>) -> Self {
        match range {
            Some(range) => Self {
                start: Some(range.start()),
                end: Some(range.end()),
            },
            None => Self::default(),
        }
    }

    pub fn from_inputs(start: &str, end: &str) -> Result<Self> {
        Ok(Self {
            start: parse_optional_date(start)?,
            end: parse_optional_date(end)?,
        })
    }

    /// Whether the Apply action is enabled.
    pub fn can_apply(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn validate(&self) -> Result<DateRange> {
        let (start, end) = match (self.start, self.end) {
            (Some(start), Some(end)) => (start, end),
            (None, None) => bail!("pick a start and end date"),
            (None, Some(_)) => bail!("pick a start date"),
            (Some(_), None) => bail!("pick an end date"),
        };
        match DateRange::new(start, end) {
            Some(range) => Ok(range),
            None => bail!(
                "start date {} is after end date {}; swap them or pick a new range",
                format_date(start),
                format_date(end)
            ),
        }
    }
}

fn parse_optional_date(raw: &str) -> Result<Option<Date>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse_date(trimmed).map(Some)
}

#[cfg(test)]
mod tests {
    use super::DateRangeForm;
    use crate::{DateRange, parse_date};
    use anyhow::Result;

    #[test]
    fn apply_requires_both_dates() -> Result<()> {
        let only_start = DateRangeForm::from_inputs("2026-01-01", "")?;
        assert!(!only_start.can_apply());
        let message = only_start
            .validate()
            .expect_err("missing end should fail")
            .to_string();
        assert!(message.contains("end date"));

        let only_end = DateRangeForm::from_inputs("", "2026-01-31")?;
        assert!(!only_end.can_apply());
        assert!(!DateRangeForm::default().can_apply());
        Ok(())
    }

    #[test]
    fn apply_rejects_start_after_end() -> Result<()> {
        let form = DateRangeForm::from_inputs("2026-02-10", "2026-02-01")?;
        assert!(!form.can_apply());
        let message = form.validate().expect_err("inverted range").to_string();
        assert!(message.contains("after end date"));
        Ok(())
    }

    #[test]
    fn valid_form_produces_range() -> Result<()> {
        let form = DateRangeForm::from_inputs("2026-02-01", "2026-02-10")?;
        let range = form.validate()?;
        assert_eq!(range.start(), parse_date("2026-02-01")?);
        assert_eq!(range.end(), parse_date("2026-02-10")?);
        Ok(())
    }

    #[test]
    fn prefilled_form_round_trips_range() -> Result<()> {
        let range = DateRange::new(parse_date("2026-03-01")?, parse_date("2026-03-31")?)
            .ok_or_else(|| anyhow::anyhow!("valid range"))?;
        let form = DateRangeForm::prefilled(Some(range));
        assert_eq!(form.validate()?, range);
        assert_eq!(DateRangeForm::prefilled(None), DateRangeForm::default());
        Ok(())
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert!(DateRangeForm::from_inputs("yesterday", "").is_err());
    }
}
