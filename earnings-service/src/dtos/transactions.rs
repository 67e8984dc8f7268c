use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{PaymentLine, PaymentMethod, TransactionDraft, TransactionInput};

/// Create or fully replace a client transaction.
///
/// Either `amount` with `payment_method`, or a `payments` split. With
/// `service_ids` and no `amount`, the amount is the sum of the services'
/// current prices.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TransactionRequest {
    pub client_id: Option<Uuid>,

    #[validate(length(max = 200))]
    #[schema(example = "Walk-in")]
    pub client_name: Option<String>,

    #[schema(value_type = Option<String>, example = "45.00")]
    pub amount: Option<Decimal>,

    pub payment_method: Option<PaymentMethod>,

    #[serde(default)]
    pub payments: Vec<PaymentLine>,

    #[serde(default)]
    pub service_ids: Vec<Uuid>,

    #[schema(value_type = Option<String>, example = "5.00")]
    pub tip_amount: Option<Decimal>,

    pub notes: Option<String>,
}

impl From<TransactionRequest> for TransactionInput {
    fn from(req: TransactionRequest) -> Self {
        Self {
            client_id: req.client_id,
            client_name: req.client_name,
            draft: TransactionDraft {
                amount: req.amount,
                payment_method: req.payment_method,
                payments: req.payments,
                tip_amount: req.tip_amount,
            },
            service_ids: req.service_ids,
            notes: req.notes,
        }
    }
}
