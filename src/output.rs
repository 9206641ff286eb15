//! Output representation strategies.
//!
//! Conversion happens after a page is fetched and is fully decoupled from
//! the retrieval path: the same [`OperationsPage`] backs both shapes.

use serde::{Deserialize, Serialize};

use crate::models::{Operation, OperationsPage};

/// Requested shape for a query's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// The parsed page, record per operation.
    #[default]
    Records,
    /// A flattened fixed-column table.
    Table,
}

/// Column set of the tabular representation, in order.
pub const TABLE_COLUMNS: [&str; 8] = [
    "id",
    "date",
    "type",
    "state",
    "description",
    "correspondent",
    "amount",
    "currency",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationsTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl OperationsTable {
    pub fn from_page(page: &OperationsPage) -> Self {
        Self {
            columns: TABLE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: page.operations.iter().map(row).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperationsView {
    Records(OperationsPage),
    Table(OperationsTable),
}

impl OperationsPage {
    /// Apply the requested representation strategy.
    pub fn into_view(self, format: OutputFormat) -> OperationsView {
        match format {
            OutputFormat::Records => OperationsView::Records(self),
            OutputFormat::Table => OperationsView::Table(OperationsTable::from_page(&self)),
        }
    }
}

fn row(operation: &Operation) -> Vec<String> {
    let amount = operation.operation_amount.as_ref();
    vec![
        operation.id.clone(),
        operation.date.clone().unwrap_or_default(),
        operation.kind.clone().unwrap_or_default(),
        operation.state.name.clone(),
        operation.description.clone().unwrap_or_default(),
        operation.correspondent.clone().unwrap_or_default(),
        amount.map(|m| m.amount.to_string()).unwrap_or_default(),
        amount.map(|m| m.currency.code.clone()).unwrap_or_default(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Currency, Money};

    fn page() -> OperationsPage {
        let operation = Operation {
            id: "op-1".to_string(),
            date: Some("14.02.2025T12:30:45".to_string()),
            kind: Some("income".to_string()),
            description: Some("Перевод".to_string()),
            operation_amount: Some(Money {
                amount: 99.9,
                currency: Currency {
                    code: "RUB".to_string(),
                },
            }),
            ..Operation::default()
        };
        OperationsPage {
            success: true,
            operations: vec![operation],
            offset: 0,
            size: 51,
        }
    }

    #[test]
    fn records_view_is_the_page_itself() {
        let page = page();
        match page.clone().into_view(OutputFormat::Records) {
            OperationsView::Records(inner) => assert_eq!(inner, page),
            other => panic!("unexpected view: {other:?}"),
        }
    }

    #[test]
    fn table_view_flattens_each_operation() {
        match page().into_view(OutputFormat::Table) {
            OperationsView::Table(table) => {
                assert_eq!(table.columns.len(), TABLE_COLUMNS.len());
                assert_eq!(table.rows.len(), 1);
                let row = &table.rows[0];
                assert_eq!(row[0], "op-1");
                assert_eq!(row[2], "income");
                assert_eq!(row[6], "99.9");
                assert_eq!(row[7], "RUB");
            }
            other => panic!("unexpected view: {other:?}"),
        }
    }
}
