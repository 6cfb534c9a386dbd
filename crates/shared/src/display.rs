use std::fmt::Write;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::RecordDetails;

pub const DEFAULT_DATE_FORMAT: &str = "%d/%m/%Y";
pub const DEFAULT_PALLET_UNFINISHED_LABEL: &str = "Não Finalizado";
pub const DEFAULT_BOX_UNFINISHED_LABEL: &str = "Não Finalizada";

/// How tracked dates are shown to people: a short strftime pattern and the
/// placeholder used while a record has no completion date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateDisplay {
    pub pattern: String,
    pub unfinished_label: String,
}

impl DateDisplay {
    pub fn new(pattern: impl Into<String>, unfinished_label: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            unfinished_label: unfinished_label.into(),
        }
    }

    pub fn pallets() -> Self {
        Self::new(DEFAULT_DATE_FORMAT, DEFAULT_PALLET_UNFINISHED_LABEL)
    }

    pub fn boxes() -> Self {
        Self::new(DEFAULT_DATE_FORMAT, DEFAULT_BOX_UNFINISHED_LABEL)
    }

    /// Renders `date` with the configured pattern, falling back to
    /// [`DEFAULT_DATE_FORMAT`] when the pattern is not valid strftime.
    pub fn format_date(&self, date: NaiveDate) -> String {
        let mut out = String::new();
        if write!(out, "{}", date.format(&self.pattern)).is_err() {
            return date.format(DEFAULT_DATE_FORMAT).to_string();
        }
        out
    }

    pub fn render(
        &self,
        code: &str,
        created_at: NaiveDate,
        finished_at: Option<NaiveDate>,
    ) -> RecordDetails {
        RecordDetails {
            code: code.to_string(),
            created_at: self.format_date(created_at),
            finished_at: finished_at
                .map(|date| self.format_date(date))
                .unwrap_or_else(|| self.unfinished_label.clone()),
        }
    }
}
