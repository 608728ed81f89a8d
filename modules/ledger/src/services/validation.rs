use crate::contracts::posting_request_v1::{JournalLineRequest, PostingRequestV1};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("posting request must have at least two lines")]
    TooFewLines,

    #[error("line {index} has both debit and credit set")]
    BothSidesSet { index: usize },

    #[error("line {index} has neither debit nor credit set")]
    NeitherSideSet { index: usize },

    #[error("line {index} has a negative amount")]
    NegativeAmount { index: usize },

    #[error("debits ({debits}) do not equal credits ({credits})")]
    NotBalanced { debits: Decimal, credits: Decimal },

    #[error("memo must not be empty")]
    EmptyMemo,

    #[error("currency code must be 3 uppercase letters, got {0:?}")]
    InvalidCurrency(String),

    #[error("tenant_id must not be empty")]
    EmptyTenant,
}

pub fn is_valid_currency(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase())
}

fn validate_line(index: usize, line: &JournalLineRequest) -> Result<(), ValidationError> {
    let debit_set = line.debit > Decimal::ZERO;
    let credit_set = line.credit > Decimal::ZERO;

    if line.debit < Decimal::ZERO || line.credit < Decimal::ZERO {
        return Err(ValidationError::NegativeAmount { index });
    }
    if debit_set && credit_set {
        return Err(ValidationError::BothSidesSet { index });
    }
    if !debit_set && !credit_set {
        return Err(ValidationError::NeitherSideSet { index });
    }
    Ok(())
}

/// Structural validation only — it does not touch the database (account
/// existence/activeness is checked separately against the chart of
/// accounts, since that requires a transaction).
pub fn validate_posting_request(req: &PostingRequestV1) -> Result<(), ValidationError> {
    if req.tenant_id.is_empty() {
        return Err(ValidationError::EmptyTenant);
    }
    if req.memo.trim().is_empty() {
        return Err(ValidationError::EmptyMemo);
    }
    if !is_valid_currency(&req.currency) {
        return Err(ValidationError::InvalidCurrency(req.currency.clone()));
    }
    if req.lines.len() < 2 {
        return Err(ValidationError::TooFewLines);
    }

    for (index, line) in req.lines.iter().enumerate() {
        validate_line(index, line)?;
    }

    let debits: Decimal = req.lines.iter().map(|l| l.debit).sum();
    let credits: Decimal = req.lines.iter().map(|l| l.credit).sum();
    if debits != credits {
        return Err(ValidationError::NotBalanced { debits, credits });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::posting_request_v1::{Dimensions, SourceDocType};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn line(debit: &str, credit: &str) -> JournalLineRequest {
        JournalLineRequest {
            account_code: "1000".into(),
            debit: debit.parse().unwrap(),
            credit: credit.parse().unwrap(),
            dimensions: Dimensions::default(),
        }
    }

    fn base_request(lines: Vec<JournalLineRequest>) -> PostingRequestV1 {
        PostingRequestV1 {
            tenant_id: "t1".into(),
            date: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
            source_module: SourceDocType::Manual,
            source_id: Uuid::new_v4(),
            memo: "test".into(),
            currency: "IDR".into(),
            lines,
        }
    }

    #[test]
    fn balanced_two_line_request_is_valid() {
        let req = base_request(vec![line("100.00", "0"), line("0", "100.00")]);
        assert!(validate_posting_request(&req).is_ok());
    }

    #[test]
    fn single_line_is_rejected() {
        let req = base_request(vec![line("100.00", "0")]);
        assert_eq!(
            validate_posting_request(&req).unwrap_err(),
            ValidationError::TooFewLines
        );
    }

    #[test]
    fn unbalanced_request_is_rejected() {
        let req = base_request(vec![line("100.00", "0"), line("0", "50.00")]);
        assert!(matches!(
            validate_posting_request(&req).unwrap_err(),
            ValidationError::NotBalanced { .. }
        ));
    }

    #[test]
    fn line_with_both_sides_set_is_rejected() {
        let req = base_request(vec![line("100.00", "50.00"), line("0", "50.00")]);
        assert_eq!(
            validate_posting_request(&req).unwrap_err(),
            ValidationError::BothSidesSet { index: 0 }
        );
    }

    #[test]
    fn negative_amount_is_rejected() {
        let req = base_request(vec![line("-1.00", "0"), line("0", "1.00")]);
        assert!(matches!(
            validate_posting_request(&req).unwrap_err(),
            ValidationError::NegativeAmount { index: 0 }
        ));
    }

    #[test]
    fn invalid_currency_is_rejected() {
        let req = {
            let mut r = base_request(vec![line("1.00", "0"), line("0", "1.00")]);
            r.currency = "idr".into();
            r
        };
        assert!(matches!(
            validate_posting_request(&req).unwrap_err(),
            ValidationError::InvalidCurrency(_)
        ));
    }

    #[test]
    fn currency_validator_rejects_wrong_length() {
        assert!(!is_valid_currency("ID"));
        assert!(!is_valid_currency("IDRR"));
        assert!(is_valid_currency("IDR"));
    }
}
