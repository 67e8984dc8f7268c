//! Client transactions: the itemized sub-ledger of a detailed day.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use sqlx::FromRow;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use super::earnings::{checked_money, max_amount};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Other => "other",
        }
    }
}

impl TryFrom<String> for PaymentMethod {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "other" => Ok(PaymentMethod::Other),
            other => Err(format!("unknown payment method '{}'", other)),
        }
    }
}

/// One payment-method share of a transaction.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct PaymentLine {
    #[sqlx(try_from = "String")]
    pub payment_method: PaymentMethod,
    #[schema(value_type = String, example = "25.00")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct ClientTransaction {
    pub transaction_id: Uuid,
    pub earnings_id: Uuid,
    pub client_id: Option<Uuid>,
    pub client_name: Option<String>,
    #[schema(value_type = String)]
    pub amount: Decimal,
    #[sqlx(try_from = "String")]
    pub payment_method: PaymentMethod,
    pub has_multiple_payments: bool,
    #[schema(value_type = String)]
    pub tip_amount: Decimal,
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl ClientTransaction {
    /// The amount shown to users: the split rows' sum for multi-payment
    /// transactions, the stored amount otherwise.
    pub fn display_amount(&self, payments: &[PaymentLine]) -> Decimal {
        if self.has_multiple_payments {
            payments.iter().map(|p| p.amount).sum()
        } else {
            self.amount
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct TransactionServiceLine {
    pub service_id: Uuid,
    pub service_name: String,
    #[schema(value_type = String)]
    pub price_at_time: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionDetail {
    #[serde(flatten)]
    pub transaction: ClientTransaction,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    pub payments: Vec<PaymentLine>,
    pub services: Vec<TransactionServiceLine>,
}

impl TransactionDetail {
    pub fn new(
        transaction: ClientTransaction,
        payments: Vec<PaymentLine>,
        services: Vec<TransactionServiceLine>,
    ) -> Self {
        let total_amount = transaction.display_amount(&payments);
        Self {
            transaction,
            total_amount,
            payments,
            services,
        }
    }
}

// ============================================================================
// Amount resolution
// ============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum DraftError {
    #[error("amount is required when no services or payments are given")]
    MissingAmount,
    #[error("payment_method is required")]
    MissingPaymentMethod,
    #[error("{0} must not be negative")]
    NegativeAmount(&'static str),
    #[error("{0} exceeds the largest amount that can be stored")]
    AmountTooLarge(&'static str),
    #[error("amount {given} does not match the sum of payments {sum}")]
    AmountMismatch { given: Decimal, sum: Decimal },
}

impl From<DraftError> for AppError {
    fn from(err: DraftError) -> Self {
        AppError::BadRequest(anyhow::anyhow!(err.to_string()))
    }
}

/// Amount fields of a create/update request before resolution.
#[derive(Debug, Clone, Default)]
pub struct TransactionDraft {
    pub amount: Option<Decimal>,
    pub payment_method: Option<PaymentMethod>,
    pub payments: Vec<PaymentLine>,
    pub tip_amount: Option<Decimal>,
}

/// What gets written to `client_transactions` and `client_payment_methods`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAmounts {
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub has_multiple_payments: bool,
    pub payments: Vec<PaymentLine>,
    pub tip_amount: Decimal,
}

impl TransactionDraft {
    /// Resolve the stored amounts. `service_total` is the sum of the linked
    /// services' current prices, if any services are linked.
    pub fn resolve(self, service_total: Option<Decimal>) -> Result<ResolvedAmounts, DraftError> {
        let tip_amount = checked_money("tip_amount", self.tip_amount.unwrap_or(Decimal::ZERO))?;
        let given = self
            .amount
            .map(|amount| checked_money("amount", amount))
            .transpose()?;

        let mut payments = Vec::with_capacity(self.payments.len());
        for line in self.payments {
            payments.push(PaymentLine {
                payment_method: line.payment_method,
                amount: checked_money("payments.amount", line.amount)?,
            });
        }

        match payments.len() {
            0 => {
                let payment_method = self
                    .payment_method
                    .ok_or(DraftError::MissingPaymentMethod)?;
                let amount = match (given, service_total) {
                    (Some(amount), _) => amount,
                    (None, Some(total)) => checked_money("amount", total)?,
                    (None, None) => return Err(DraftError::MissingAmount),
                };
                Ok(ResolvedAmounts {
                    amount,
                    payment_method,
                    has_multiple_payments: false,
                    payments: Vec::new(),
                    tip_amount,
                })
            }
            1 => {
                let line = payments.remove(0);
                check_matches(given, line.amount)?;
                Ok(ResolvedAmounts {
                    amount: line.amount,
                    payment_method: line.payment_method,
                    has_multiple_payments: false,
                    payments: Vec::new(),
                    tip_amount,
                })
            }
            _ => {
                let sum = payments
                    .iter()
                    .try_fold(Decimal::ZERO, |acc, p| acc.checked_add(p.amount))
                    .filter(|sum| *sum <= max_amount())
                    .ok_or(DraftError::AmountTooLarge("amount"))?;
                check_matches(given, sum)?;
                Ok(ResolvedAmounts {
                    amount: sum,
                    payment_method: payments[0].payment_method,
                    has_multiple_payments: true,
                    payments,
                    tip_amount,
                })
            }
        }
    }
}

fn check_matches(given: Option<Decimal>, sum: Decimal) -> Result<(), DraftError> {
    match given {
        Some(given) if given != sum => Err(DraftError::AmountMismatch { given, sum }),
        _ => Ok(()),
    }
}

/// A create or full-replacement update of one transaction.
#[derive(Debug, Clone, Default)]
pub struct TransactionInput {
    pub client_id: Option<Uuid>,
    pub client_name: Option<String>,
    pub draft: TransactionDraft,
    pub service_ids: Vec<Uuid>,
    pub notes: Option<String>,
}

/// Drop repeated service ids, keeping first occurrence order.
pub fn dedup_service_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn line(method: PaymentMethod, amount: &str) -> PaymentLine {
        PaymentLine {
            payment_method: method,
            amount: money(amount),
        }
    }

    #[test]
    fn single_payment_needs_amount_and_method() {
        let draft = TransactionDraft {
            amount: Some(money("40")),
            ..Default::default()
        };
        assert_eq!(draft.resolve(None), Err(DraftError::MissingPaymentMethod));

        let draft = TransactionDraft {
            payment_method: Some(PaymentMethod::Card),
            ..Default::default()
        };
        assert_eq!(draft.resolve(None), Err(DraftError::MissingAmount));
    }

    #[test]
    fn amount_defaults_to_service_total() {
        let draft = TransactionDraft {
            payment_method: Some(PaymentMethod::Cash),
            tip_amount: Some(money("5")),
            ..Default::default()
        };
        let resolved = draft.resolve(Some(money("65.00"))).unwrap();
        assert_eq!(resolved.amount, money("65.00"));
        assert_eq!(resolved.payment_method, PaymentMethod::Cash);
        assert_eq!(resolved.tip_amount, money("5"));
        assert!(!resolved.has_multiple_payments);
    }

    #[test]
    fn explicit_amount_overrides_service_total() {
        let draft = TransactionDraft {
            amount: Some(money("50")),
            payment_method: Some(PaymentMethod::Card),
            ..Default::default()
        };
        let resolved = draft.resolve(Some(money("65"))).unwrap();
        assert_eq!(resolved.amount, money("50"));
    }

    #[test]
    fn split_payments_store_their_sum() {
        let draft = TransactionDraft {
            payments: vec![
                line(PaymentMethod::Cash, "20.00"),
                line(PaymentMethod::Card, "35.50"),
            ],
            ..Default::default()
        };
        let resolved = draft.resolve(None).unwrap();
        assert!(resolved.has_multiple_payments);
        assert_eq!(resolved.amount, money("55.50"));
        assert_eq!(resolved.payments.len(), 2);
    }

    #[test]
    fn single_payment_line_collapses() {
        let draft = TransactionDraft {
            payments: vec![line(PaymentMethod::Other, "12")],
            ..Default::default()
        };
        let resolved = draft.resolve(None).unwrap();
        assert!(!resolved.has_multiple_payments);
        assert!(resolved.payments.is_empty());
        assert_eq!(resolved.payment_method, PaymentMethod::Other);
        assert_eq!(resolved.amount, money("12"));
    }

    #[test]
    fn given_amount_must_match_split_sum() {
        let draft = TransactionDraft {
            amount: Some(money("60")),
            payments: vec![
                line(PaymentMethod::Cash, "20"),
                line(PaymentMethod::Card, "30"),
            ],
            ..Default::default()
        };
        assert!(matches!(
            draft.resolve(None),
            Err(DraftError::AmountMismatch { .. })
        ));
    }

    #[test]
    fn negative_values_are_rejected() {
        let draft = TransactionDraft {
            amount: Some(money("10")),
            payment_method: Some(PaymentMethod::Cash),
            tip_amount: Some(money("-1")),
            ..Default::default()
        };
        assert_eq!(
            draft.resolve(None),
            Err(DraftError::NegativeAmount("tip_amount"))
        );

        let draft = TransactionDraft {
            payments: vec![
                line(PaymentMethod::Cash, "-5"),
                line(PaymentMethod::Card, "10"),
            ],
            ..Default::default()
        };
        assert_eq!(
            draft.resolve(None),
            Err(DraftError::NegativeAmount("payments.amount"))
        );
    }

    #[test]
    fn oversized_amounts_are_rejected_without_overflowing() {
        let huge = "79228162514264337593543950335";
        let draft = TransactionDraft {
            payments: vec![
                line(PaymentMethod::Cash, huge),
                line(PaymentMethod::Card, huge),
            ],
            ..Default::default()
        };
        assert_eq!(
            draft.resolve(None),
            Err(DraftError::AmountTooLarge("payments.amount"))
        );

        // Each line fits, their sum does not
        let draft = TransactionDraft {
            payments: vec![
                line(PaymentMethod::Cash, "9999999999.99"),
                line(PaymentMethod::Card, "0.01"),
            ],
            ..Default::default()
        };
        assert_eq!(draft.resolve(None), Err(DraftError::AmountTooLarge("amount")));

        let draft = TransactionDraft {
            amount: Some(money("10")),
            payment_method: Some(PaymentMethod::Cash),
            tip_amount: Some(money("10000000000")),
            ..Default::default()
        };
        assert_eq!(draft.resolve(None), Err(DraftError::AmountTooLarge("tip_amount")));

        let draft = TransactionDraft {
            payment_method: Some(PaymentMethod::Card),
            ..Default::default()
        };
        assert_eq!(
            draft.resolve(Some(money("12000000000"))),
            Err(DraftError::AmountTooLarge("amount"))
        );
    }

    #[test]
    fn display_amount_follows_the_multiple_payments_flag() {
        let now = Utc::now();
        let mut tx = ClientTransaction {
            transaction_id: Uuid::new_v4(),
            earnings_id: Uuid::new_v4(),
            client_id: None,
            client_name: Some("Walk-in".to_string()),
            amount: money("30"),
            payment_method: PaymentMethod::Cash,
            has_multiple_payments: false,
            tip_amount: Decimal::ZERO,
            notes: None,
            created_utc: now,
            updated_utc: now,
        };
        let payments = vec![
            line(PaymentMethod::Cash, "10"),
            line(PaymentMethod::Card, "25"),
        ];

        assert_eq!(tx.display_amount(&payments), money("30"));
        tx.has_multiple_payments = true;
        assert_eq!(tx.display_amount(&payments), money("35"));
    }

    #[test]
    fn duplicate_service_ids_are_dropped() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(dedup_service_ids(&[a, b, a]), vec![a, b]);
    }
}
