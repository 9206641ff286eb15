use serde::{Deserialize, Serialize};

/// Monetary amount with its currency.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Money {
    pub amount: f64,
    pub currency: Currency,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Currency {
    pub code: String,
}

/// Processing status of an operation: display name plus a coarse category.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperationStatus {
    pub name: String,
    pub category: Option<String>,
}

/// The resource an operation was addressed to (a card, an account).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceRef {
    pub id: Option<String>,
    pub display_value: Option<String>,
}

/// One ledger entry, immutable once received.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Operation {
    pub id: String,
    pub date: Option<String>,
    pub channel: Option<String>,
    pub form: Option<String>,
    pub state: OperationStatus,
    pub description: Option<String>,
    pub to_resource: Option<ResourceRef>,
    pub correspondent: Option<String>,
    pub operation_amount: Option<Money>,
    pub national_amount: Option<Money>,
    pub billing_amount: Option<Money>,
    pub classification_code: Option<i64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub copyable: bool,
    pub nfc: bool,
    pub has_receipt: bool,
    pub composite_payment: bool,
    pub external_id: Option<String>,
    pub is_financial: bool,
}

/// Result of one read query. Pages are never cached; each call produces a
/// fresh one. `offset`/`size` echo the query for caller-side continuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationsPage {
    pub success: bool,
    pub operations: Vec<Operation>,
    pub offset: u32,
    pub size: u32,
}

impl OperationsPage {
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Offset of the page after this one.
    pub fn next_offset(&self) -> u32 {
        self.offset + self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPERATION_JSON: &str = r#"{
        "id": "op-7031",
        "date": "14.02.2025T12:30:45",
        "channel": "MOBILE",
        "form": "ExtCardTransferIn",
        "state": {"name": "Исполнено", "category": "success"},
        "description": "Перевод на карту",
        "toResource": {"id": "card:123456", "displayValue": "Visa •• 4321"},
        "correspondent": "IVAN I.",
        "operationAmount": {"amount": 1500.5, "currency": {"code": "RUB"}},
        "nationalAmount": {"amount": 1500.5, "currency": {"code": "RUB"}},
        "billingAmount": {"amount": 1500.5, "currency": {"code": "RUB"}},
        "classificationCode": 2,
        "type": "income",
        "copyable": true,
        "nfc": false,
        "hasReceipt": true,
        "compositePayment": false,
        "externalId": "ext-99",
        "isFinancial": true,
        "someFutureField": {"ignored": true}
    }"#;

    #[test]
    fn parses_a_full_operation() {
        let operation: Operation = serde_json::from_str(OPERATION_JSON).unwrap();
        assert_eq!(operation.id, "op-7031");
        assert_eq!(operation.state.name, "Исполнено");
        assert_eq!(operation.state.category.as_deref(), Some("success"));
        assert_eq!(
            operation.to_resource.as_ref().unwrap().id.as_deref(),
            Some("card:123456")
        );
        assert_eq!(operation.operation_amount.as_ref().unwrap().amount, 1500.5);
        assert_eq!(
            operation.operation_amount.as_ref().unwrap().currency.code,
            "RUB"
        );
        assert_eq!(operation.kind.as_deref(), Some("income"));
        assert!(operation.copyable);
        assert!(operation.has_receipt);
        assert!(operation.is_financial);
    }

    #[test]
    fn sparse_operations_fall_back_to_defaults() {
        let operation: Operation = serde_json::from_str(r#"{"id": "op-1"}"#).unwrap();
        assert_eq!(operation.id, "op-1");
        assert!(operation.date.is_none());
        assert!(!operation.copyable);
        assert!(!operation.is_financial);
        assert_eq!(operation.state, OperationStatus::default());
    }

    #[test]
    fn page_continuation_follows_the_query() {
        let page = OperationsPage {
            success: true,
            operations: vec![Operation::default()],
            offset: 51,
            size: 51,
        };
        assert_eq!(page.len(), 1);
        assert_eq!(page.next_offset(), 102);
    }
}
