//! Splitting a payment request across tenders
//!
//! A request may mix cash, checks, money orders and cards. Planning is pure:
//! it validates the tenders, orders them (cards first, so a decline aborts
//! before anything is written) and works out how much cash is kept and how
//! much is handed back as change.

use super::money::sum;
use crate::core::error::PaymentError;
use crate::core::validation::validators::max_amount;
use crate::entities::payment::PaymentMethod;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One payment method and amount within a request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Tender {
    pub method: PaymentMethod,
    #[validate(custom(function = "crate::core::validation::validators::positive_amount"))]
    pub amount: Decimal,
    /// Check or money order number
    #[serde(default)]
    pub reference: Option<String>,
    /// Card token issued by the gateway's client-side tokenizer
    #[serde(default)]
    pub token: Option<String>,
}

impl Tender {
    pub fn cash(amount: Decimal) -> Self {
        Self {
            method: PaymentMethod::Cash,
            amount,
            reference: None,
            token: None,
        }
    }

    pub fn check(amount: Decimal, reference: impl Into<String>) -> Self {
        Self {
            method: PaymentMethod::Check,
            amount,
            reference: Some(reference.into()),
            token: None,
        }
    }

    pub fn card(amount: Decimal, token: impl Into<String>) -> Self {
        Self {
            method: PaymentMethod::Card,
            amount,
            reference: None,
            token: Some(token.into()),
        }
    }
}

/// A tender after planning, with the amount that will actually be recorded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedTender {
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub reference: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenderPlan {
    /// Cards first (request order), then the other tenders (request order)
    pub tenders: Vec<PlannedTender>,
    pub total_applied: Decimal,
    pub change_due: Decimal,
    /// What is still owed after this request; `None` for account payments
    pub remaining_due: Option<Decimal>,
}

impl TenderPlan {
    pub fn cards(&self) -> impl Iterator<Item = &PlannedTender> {
        self.tenders.iter().filter(|t| t.method == PaymentMethod::Card)
    }
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Validate and order tenders against an optional amount due.
///
/// Non-cash tenders may not exceed the amount due. Cash only covers what the
/// other tenders leave open; the rest comes back as `change_due`.
pub fn plan_tenders(
    amount_due: Option<Decimal>,
    tenders: &[Tender],
) -> Result<TenderPlan, PaymentError> {
    if tenders.is_empty() {
        return Err(PaymentError::InvalidTender("at least one tender is required".to_string()));
    }

    for tender in tenders {
        if tender.amount <= Decimal::ZERO {
            return Err(PaymentError::InvalidTender(format!(
                "{} amount must be greater than zero",
                tender.method
            )));
        }
        if tender.amount > max_amount() {
            return Err(PaymentError::InvalidTender(format!(
                "{} amount must not exceed {}",
                tender.method,
                max_amount()
            )));
        }
        match tender.method {
            PaymentMethod::Check if !has_text(&tender.reference) => {
                return Err(PaymentError::InvalidTender(
                    "check payments need a check number".to_string(),
                ));
            }
            PaymentMethod::Card if !has_text(&tender.token) => {
                return Err(PaymentError::InvalidTender(
                    "card payments need a card token".to_string(),
                ));
            }
            _ => {}
        }
    }

    let non_cash = sum(tenders
        .iter()
        .filter(|t| t.method != PaymentMethod::Cash)
        .map(|t| t.amount));
    if let Some(due) = amount_due {
        if non_cash > due {
            return Err(PaymentError::Overpayment { due });
        }
    }

    let planned = |t: &Tender, amount: Decimal| PlannedTender {
        method: t.method,
        amount,
        reference: t.reference.as_ref().map(|r| r.trim().to_string()),
        token: t.token.clone(),
    };

    let mut ordered: Vec<PlannedTender> = tenders
        .iter()
        .filter(|t| t.method == PaymentMethod::Card)
        .map(|t| planned(t, t.amount))
        .collect();
    ordered.extend(
        tenders
            .iter()
            .filter(|t| !matches!(t.method, PaymentMethod::Card | PaymentMethod::Cash))
            .map(|t| planned(t, t.amount)),
    );

    let mut cash_room = amount_due.map(|due| due - non_cash);
    let mut change_due = Decimal::ZERO;
    for tender in tenders.iter().filter(|t| t.method == PaymentMethod::Cash) {
        let kept = match cash_room.as_mut() {
            Some(room) => {
                let kept = tender.amount.min(*room);
                *room -= kept;
                kept
            }
            None => tender.amount,
        };
        change_due += tender.amount - kept;
        if kept > Decimal::ZERO {
            ordered.push(planned(tender, kept));
        }
    }

    let total_applied = sum(ordered.iter().map(|t| t.amount));
    Ok(TenderPlan {
        tenders: ordered,
        total_applied,
        change_due,
        remaining_due: amount_due.map(|due| due - total_applied),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dollars(n: i64) -> Decimal {
        Decimal::new(n * 100, 2)
    }

    #[test]
    fn test_cards_are_ordered_first() {
        let tenders = vec![
            Tender::cash(dollars(20)),
            Tender::check(dollars(30), "1042"),
            Tender::card(dollars(40), "tok_visa"),
        ];
        let plan = plan_tenders(Some(dollars(100)), &tenders).unwrap();
        let methods: Vec<PaymentMethod> = plan.tenders.iter().map(|t| t.method).collect();
        assert_eq!(
            methods,
            vec![PaymentMethod::Card, PaymentMethod::Check, PaymentMethod::Cash]
        );
        assert_eq!(plan.total_applied, dollars(90));
        assert_eq!(plan.remaining_due, Some(dollars(10)));
        assert_eq!(plan.change_due, Decimal::ZERO);
    }

    #[test]
    fn test_excess_cash_becomes_change() {
        let tenders = vec![Tender::card(dollars(60), "tok_visa"), Tender::cash(dollars(50))];
        let plan = plan_tenders(Some(dollars(100)), &tenders).unwrap();
        assert_eq!(plan.change_due, dollars(10));
        assert_eq!(plan.total_applied, dollars(100));
        assert_eq!(plan.tenders[1].amount, dollars(40));
        assert_eq!(plan.remaining_due, Some(Decimal::ZERO));
    }

    #[test]
    fn test_cash_with_nothing_left_to_cover_is_all_change() {
        let tenders = vec![Tender::check(dollars(100), "77"), Tender::cash(dollars(20))];
        let plan = plan_tenders(Some(dollars(100)), &tenders).unwrap();
        assert_eq!(plan.tenders.len(), 1);
        assert_eq!(plan.change_due, dollars(20));
    }

    #[test]
    fn test_non_cash_overpayment_is_rejected() {
        let tenders = vec![Tender::card(dollars(120), "tok_visa")];
        let err = plan_tenders(Some(dollars(100)), &tenders).unwrap_err();
        assert!(matches!(err, PaymentError::Overpayment { .. }));
    }

    #[test]
    fn test_missing_reference_or_token_is_rejected() {
        let mut check = Tender::check(dollars(10), "");
        check.reference = Some("  ".to_string());
        assert!(matches!(
            plan_tenders(None, &[check]),
            Err(PaymentError::InvalidTender(_))
        ));

        let mut card = Tender::card(dollars(10), "tok");
        card.token = None;
        assert!(plan_tenders(None, &[card]).is_err());
        assert!(plan_tenders(None, &[]).is_err());
        assert!(plan_tenders(None, &[Tender::cash(Decimal::ZERO)]).is_err());
        assert!(plan_tenders(None, &[Tender::cash(dollars(1_000_000))]).is_err());
    }

    #[test]
    fn test_account_payment_keeps_everything() {
        let tenders = vec![Tender::cash(dollars(500))];
        let plan = plan_tenders(None, &tenders).unwrap();
        assert_eq!(plan.total_applied, dollars(500));
        assert_eq!(plan.change_due, Decimal::ZERO);
        assert_eq!(plan.remaining_due, None);
    }
}
