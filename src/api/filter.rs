//! Read-query filter: validation and the canonical request payload.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::output::OutputFormat;

/// Lexical format the remote expects for range bounds.
pub const WIRE_DATE_FORMAT: &str = "%d.%m.%YT%H:%M:%S";

/// Page size the remote itself uses when browsing the feed.
pub const DEFAULT_PAGE_SIZE: u32 = 51;

pub const MAX_PAGE_SIZE: u32 = 200;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("page size {size} outside 1..={MAX_PAGE_SIZE}")]
    PageSize { size: u32 },

    #[error("{field} date {value:?} does not match dd.mm.yyyyThh:mm:ss")]
    MalformedDate { field: &'static str, value: String },
}

/// Operation-type tag the feed can be narrowed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    Income,
    Outcome,
    FinancialTransactions,
    Cashless,
    Transfers,
    Cash,
    StateNotifications,
    Promo,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Income => "income",
            OperationKind::Outcome => "outcome",
            OperationKind::FinancialTransactions => "financialTransactions",
            OperationKind::Cashless => "cashless",
            OperationKind::Transfers => "transfers",
            OperationKind::Cash => "cash",
            OperationKind::StateNotifications => "stateNotifications",
            OperationKind::Promo => "promo",
        }
    }
}

/// Query over the operations feed.
///
/// Unset optionals are omitted from the payload entirely, matching the
/// remote's expectations; they are never sent as nulls.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationsFilter {
    pub kind: Option<OperationKind>,
    /// Inclusive range start, `dd.mm.yyyyThh:mm:ss`
    pub from: Option<String>,
    /// Inclusive range end, same format
    pub to: Option<String>,
    /// Resource identifiers to narrow to, e.g. `card:123456`
    pub resources: Option<Vec<String>>,
    pub from_amount: Option<f64>,
    pub to_amount: Option<f64>,
    pub offset: u32,
    pub size: u32,
    /// Include operations the remote hides by default
    pub show_hidden: Option<bool>,
    /// Representation applied after the page is fetched
    pub output: OutputFormat,
}

impl Default for OperationsFilter {
    fn default() -> Self {
        Self {
            kind: None,
            from: None,
            to: None,
            resources: None,
            from_amount: None,
            to_amount: None,
            offset: 0,
            size: DEFAULT_PAGE_SIZE,
            show_hidden: None,
            output: OutputFormat::default(),
        }
    }
}

impl OperationsFilter {
    /// Reject locally anything the remote would reject; nothing invalid is
    /// ever sent.
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.size < 1 || self.size > MAX_PAGE_SIZE {
            return Err(FilterError::PageSize { size: self.size });
        }
        for (field, value) in [("from", &self.from), ("to", &self.to)] {
            if let Some(value) = value {
                NaiveDateTime::parse_from_str(value, WIRE_DATE_FORMAT).map_err(|_| {
                    FilterError::MalformedDate {
                        field,
                        value: value.clone(),
                    }
                })?;
            }
        }
        Ok(())
    }

    /// The canonical request body. Field order is fixed by the payload
    /// struct, so equal filters always serialize byte-identically.
    pub fn to_payload(&self) -> OperationsPayload<'_> {
        OperationsPayload {
            pagination_offset: self.offset,
            pagination_size: self.size,
            filter_name: self.kind.map(|kind| kind.as_str()),
            from: self.from.as_deref(),
            to: self.to.as_deref(),
            used_resource: self.resources.as_deref(),
            from_amount: self.from_amount,
            to_amount: self.to_amount,
            show_hidden: self.show_hidden,
        }
    }

    /// The same criteria, advanced to the next page.
    pub fn next_page(&self) -> Self {
        Self {
            offset: self.offset + self.size,
            ..self.clone()
        }
    }
}

/// Wire shape of the operations listing request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationsPayload<'a> {
    pagination_offset: u32,
    pagination_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter_name: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    used_resource: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    from_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    to_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    show_hidden: Option<bool>,
}
