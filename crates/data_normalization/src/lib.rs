pub mod rates;

pub use crate::rates::{normalize_interest_rate, round_cents};

use models::{Field, Obligation};
use serde_json::{Map, Value};

/// Obligations in the compact form embedded in the prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalObligations {
    pub records: Vec<Value>,
}

impl CanonicalObligations {
    /// All records back to back, one closed JSON object each.
    pub fn payload(&self) -> String {
        self.records.iter().map(|r| r.to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Applies per-field normalization and serializes every obligation.
///
/// Pure: identical input always gives byte-identical output.
pub fn normalize_obligations(obligations: &[Obligation]) -> CanonicalObligations {
    CanonicalObligations {
        records: obligations
            .iter()
            .map(normalize_obligation)
            .map(|o| canonical_record(&o))
            .collect(),
    }
}

/// Rate scaled to a percentage, money rounded to cents.
pub fn normalize_obligation(obligation: &Obligation) -> Obligation {
    Obligation {
        remaining_balance: obligation.remaining_balance.map(round_cents),
        interest_rate: obligation.interest_rate.map(normalize_interest_rate),
        monthly_payment: round_cents(obligation.monthly_payment),
        ..obligation.clone()
    }
}

/// Fixed key order. Absent optional fields are left out entirely, and so are
/// a zero balance and a zero rate.
pub fn canonical_record(obligation: &Obligation) -> Value {
    let mut map = Map::new();
    map.insert("id".to_string(), Value::from(obligation.id));
    map.insert(
        Field::Description.label().to_string(),
        Value::from(obligation.description.as_str()),
    );
    map.insert(
        Field::Kind.label().to_string(),
        Value::from(obligation.kind.as_str()),
    );
    if let Some(institution) = &obligation.institution {
        map.insert(
            Field::Institution.label().to_string(),
            Value::from(institution.as_str()),
        );
    }
    if let Some(balance) = obligation.remaining_balance.filter(|b| *b != 0.0) {
        map.insert(
            Field::RemainingBalance.label().to_string(),
            Value::from(balance),
        );
    }
    if let Some(rate) = obligation.interest_rate.filter(|r| *r != 0.0) {
        map.insert(Field::InterestRate.label().to_string(), Value::from(rate));
    }
    map.insert(
        Field::MonthlyPayment.label().to_string(),
        Value::from(obligation.monthly_payment),
    );
    if let Some(day) = obligation.day_of_month {
        map.insert(Field::DayOfMonth.label().to_string(), Value::from(day));
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obligation(id: usize, description: &str, kind: &str, payment: f64) -> Obligation {
        Obligation {
            id,
            source_row: id + 1,
            description: description.to_string(),
            kind: kind.to_string(),
            institution: None,
            remaining_balance: None,
            interest_rate: None,
            monthly_payment: payment,
            day_of_month: None,
        }
    }

    #[test]
    fn test_canonical_record_field_order_and_omission() {
        let mut card = obligation(1, "Card A", "credit-card", 150.0);
        card.institution = Some("Big Bank".to_string());
        card.interest_rate = Some(0.2199);
        card.day_of_month = Some(15);

        let out = normalize_obligations(&[card]).payload();
        assert_eq!(
            out,
            r#"{"id":1,"description":"Card A","type":"credit-card","institution":"Big Bank","interest_rate":21.99,"monthly_payment":150.0,"day_of_month":15}"#
        );
        assert!(!out.contains("remaining_balance"));
    }

    #[test]
    fn test_interest_rate_scaling_in_records() {
        let mut a = obligation(1, "A", "loan", 10.0);
        a.interest_rate = Some(0.055);
        let mut b = obligation(2, "B", "loan", 10.0);
        b.interest_rate = Some(7.25);

        let canonical = normalize_obligations(&[a, b]);
        assert_eq!(canonical.records[0]["interest_rate"], Value::from(5.5));
        assert_eq!(canonical.records[1]["interest_rate"], Value::from(7.25));
    }

    #[test]
    fn test_zero_balance_and_rate_are_omitted() {
        let mut paid = obligation(1, "A", "loan", 10.0);
        paid.remaining_balance = Some(0.0);
        paid.interest_rate = Some(0.0);

        let payload = normalize_obligations(&[paid]).payload();
        assert_eq!(
            payload,
            r#"{"id":1,"description":"A","type":"loan","monthly_payment":10.0}"#
        );
    }

    #[test]
    fn test_rate_rounding_to_zero_is_omitted() {
        let mut promo = obligation(1, "Promo card", "credit-card", 25.0);
        promo.interest_rate = Some(0.00001);
        promo.remaining_balance = Some(0.001);

        let record = &normalize_obligations(&[promo]).records[0];
        assert!(record.get("interest_rate").is_none());
        assert!(record.get("remaining_balance").is_none());
    }

    #[test]
    fn test_zero_monthly_payment_is_kept() {
        let record = &normalize_obligations(&[obligation(1, "Old loan", "loan", 0.0)]).records[0];
        assert_eq!(record["monthly_payment"], Value::from(0.0));
    }

    #[test]
    fn test_normalization_is_deterministic() {
        let mut loan = obligation(2, "Loan B", "loan", 300.0);
        loan.interest_rate = Some(0.0599);
        loan.remaining_balance = Some(12_345.678);
        let input = vec![obligation(1, "Card A", "credit-card", 150.0), loan];

        let first = normalize_obligations(&input).payload();
        let second = normalize_obligations(&input).payload();
        assert_eq!(first, second);
        assert!(first.contains(r#""interest_rate":5.99"#));
        assert!(first.contains(r#""remaining_balance":12345.68"#));
    }

    #[test]
    fn test_records_are_individually_parseable() {
        let input = vec![
            obligation(1, "Card A", "credit-card", 150.0),
            obligation(2, "Loan \"B\"", "loan", 300.0),
        ];
        let payload = normalize_obligations(&input).payload();

        let parsed: Vec<Value> = serde_json::Deserializer::from_str(&payload)
            .into_iter::<Value>()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1]["description"], Value::from("Loan \"B\""));
    }

    #[test]
    fn test_source_order_is_preserved() {
        let input = vec![
            obligation(1, "Zeta", "bill", 1.0),
            obligation(2, "Alpha", "bill", 2.0),
        ];
        let canonical = normalize_obligations(&input);
        assert_eq!(canonical.records[0]["description"], Value::from("Zeta"));
        assert_eq!(canonical.records[1]["description"], Value::from("Alpha"));
    }
}
