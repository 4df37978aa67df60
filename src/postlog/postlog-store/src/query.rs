/*
 * vSMTP mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
 */
use postlog_common::utils::to_unix_micros;

/// Bounds on an instant, `from` is inclusive and `to` exclusive.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    ///
    pub from: Option<time::OffsetDateTime>,
    ///
    pub to: Option<time::OffsetDateTime>,
}

/// Filter of the raw entries.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EntryFilter {
    /// Range on the parsed timestamp, entries without one are excluded by a bound.
    pub range: TimeRange,
    /// Substring of the content.
    pub search: Option<String>,
}

/// Filter of the delivery records.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeliveryFilter {
    /// Range on `first_seen_at`.
    pub range: TimeRange,
    /// Substring of the sender.
    pub sender: Option<String>,
    /// Substring of the recipient.
    pub recipient: Option<String>,
    /// Exact status.
    pub status: Option<String>,
    /// Substring of the sender, the recipient or the response.
    pub search: Option<String>,
}

/// One page of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Page {
    number: u32,
    size: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_SIZE)
    }
}

impl Page {
    /// Number of items of a page if not specified.
    pub const DEFAULT_SIZE: u32 = 50;

    /// Page `number` (starting at 1) of `size` items, both are at least 1.
    #[must_use]
    pub fn new(number: u32, size: u32) -> Self {
        Self {
            number: number.max(1),
            size: size.max(1),
        }
    }

    ///
    #[must_use]
    pub const fn number(&self) -> u32 {
        self.number
    }

    ///
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Number of items before this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.size)
    }
}

/// A page of items, and the number of items matching the filter.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Paginated<T> {
    ///
    pub items: Vec<T>,
    /// Number of items across all the pages.
    pub total: u64,
    ///
    pub page: Page,
}

impl<T> Paginated<T> {
    /// Number of pages needed to list all the items.
    #[must_use]
    pub fn pages(&self) -> u64 {
        (self.total + u64::from(self.page.size) - 1) / u64::from(self.page.size)
    }
}

/// A bound parameter of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SqlParam {
    Int(i64),
    Text(String),
}

/// Conditions of a `WHERE` clause with positional `?` parameters.
#[derive(Debug, Default)]
pub(crate) struct Where {
    clauses: Vec<String>,
    pub(crate) params: Vec<SqlParam>,
}

/// Escape the `LIKE` metacharacters of `input` with `!`, and match it anywhere.
pub(crate) fn like_pattern(input: &str) -> String {
    let mut pattern = String::with_capacity(input.len() + 2);
    pattern.push('%');
    for c in input.chars() {
        if matches!(c, '!' | '%' | '_') {
            pattern.push('!');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl Where {
    fn range(&mut self, column: &str, range: &TimeRange) {
        if let Some(from) = range.from {
            self.clauses.push(format!("{column} >= ?"));
            self.params.push(SqlParam::Int(to_unix_micros(from)));
        }
        if let Some(to) = range.to {
            self.clauses.push(format!("{column} < ?"));
            self.params.push(SqlParam::Int(to_unix_micros(to)));
        }
    }

    fn like_any(&mut self, columns: &[&str], value: Option<&String>) {
        if let Some(value) = value {
            let pattern = like_pattern(value);
            self.clauses.push(format!(
                "({})",
                columns
                    .iter()
                    .map(|c| format!("{c} LIKE ? ESCAPE '!'"))
                    .collect::<Vec<_>>()
                    .join(" OR ")
            ));
            self.params
                .extend(columns.iter().map(|_| SqlParam::Text(pattern.clone())));
        }
    }

    fn equals(&mut self, column: &str, value: Option<&String>) {
        if let Some(value) = value {
            self.clauses.push(format!("{column} = ?"));
            self.params.push(SqlParam::Text(value.clone()));
        }
    }

    /// The clause, with a leading space, or nothing.
    pub(crate) fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    /// The parameters followed by the `LIMIT ? OFFSET ?` of `page`.
    pub(crate) fn paged_params(&self, page: Page) -> Vec<SqlParam> {
        let mut params = self.params.clone();
        params.push(SqlParam::Int(i64::from(page.size())));
        params.push(SqlParam::Int(
            i64::try_from(page.offset()).unwrap_or(i64::MAX),
        ));
        params
    }
}

impl EntryFilter {
    pub(crate) fn to_where(&self) -> Where {
        let mut clause = Where::default();
        clause.range("occurred_at", &self.range);
        clause.like_any(&["content"], self.search.as_ref());
        clause
    }
}

impl DeliveryFilter {
    pub(crate) fn to_where(&self) -> Where {
        let mut clause = Where::default();
        clause.range("first_seen_at", &self.range);
        clause.like_any(&["sender"], self.sender.as_ref());
        clause.like_any(&["recipient"], self.recipient.as_ref());
        clause.equals("status", self.status.as_ref());
        clause.like_any(&["sender", "recipient", "response"], self.search.as_ref());
        clause
    }
}

pub(crate) const ENTRY_COLUMNS: &str =
    "id, timestamp, hostname, service, pid, content, transaction_id";

pub(crate) const DELIVERY_COLUMNS: &str =
    "transaction_id, first_seen_at, sender, size, recipient, relay, delay, dsn, status, response";

pub(crate) const STATS_BY_STATUS: &str =
    "SELECT COALESCE(status, 'unknown'), COUNT(*) FROM deliveries GROUP BY COALESCE(status, 'unknown')";
