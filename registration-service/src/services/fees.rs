//! Fee arithmetic for registration payments.

use rust_decimal::Decimal;

use crate::models::{round_money, FeeTypeCode, PaymentDuration, PaymentMethod};

/// Billed amounts for one registration payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeBreakdown {
    pub base_total: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
}

impl FeeBreakdown {
    /// Service fee is snapshotted on the registration but not billed.
    pub fn compute(
        registration_fee: Decimal,
        additional_fee: Decimal,
        discount_percentage: Option<Decimal>,
    ) -> Self {
        let base_total = registration_fee + additional_fee;
        let discount_amount = match discount_percentage {
            Some(pct) if !pct.is_zero() => round_money(base_total * pct / Decimal::ONE_HUNDRED),
            _ => Decimal::ZERO,
        };

        Self {
            base_total,
            discount_amount,
            final_amount: base_total - discount_amount,
        }
    }

    /// Manual methods record what was handed over; online methods the full amount.
    pub fn actual_paid_amount(&self, method: PaymentMethod, paid_amount: Option<Decimal>) -> Decimal {
        match (method.is_manual(), paid_amount) {
            (true, Some(paid)) => paid,
            _ => self.final_amount,
        }
    }
}

/// Invoice line to be written together with its invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    pub fee_type: FeeTypeCode,
    pub description: String,
    pub amount: Decimal,
}

/// Lines for a registration invoice; zero-amount fees get no line.
pub fn invoice_lines(
    registration_fee: Decimal,
    additional_fee: Decimal,
    duration: PaymentDuration,
) -> Vec<PlannedLine> {
    let mut lines = Vec::with_capacity(2);
    if registration_fee > Decimal::ZERO {
        lines.push(PlannedLine {
            fee_type: FeeTypeCode::Registration,
            description: FeeTypeCode::Registration.display_name().to_string(),
            amount: registration_fee,
        });
    }
    if additional_fee > Decimal::ZERO {
        lines.push(PlannedLine {
            fee_type: FeeTypeCode::Tuition,
            description: duration.fee_description().to_string(),
            amount: additional_fee,
        });
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    #[test]
    fn ten_percent_off_fifteen_hundred() {
        let fees = FeeBreakdown::compute(d("500"), d("1000"), Some(d("10")));
        assert_eq!(fees.base_total, d("1500"));
        assert_eq!(fees.discount_amount, d("150"));
        assert_eq!(fees.final_amount, d("1350"));
    }

    #[test]
    fn no_discount_bills_the_base_total() {
        let fees = FeeBreakdown::compute(d("500"), d("2500"), None);
        assert_eq!(fees.discount_amount, Decimal::ZERO);
        assert_eq!(fees.final_amount, d("3000"));
    }

    #[test]
    fn discount_is_rounded_to_cents() {
        let fees = FeeBreakdown::compute(d("333.33"), d("0"), Some(d("12.5")));
        assert_eq!(fees.discount_amount, d("41.67"));
        assert_eq!(fees.final_amount, d("291.66"));
    }

    #[test]
    fn final_amount_matches_percentage_formula() {
        for pct in ["0", "5", "12.5", "33.33", "100"] {
            let fees = FeeBreakdown::compute(d("750.50"), d("1200.25"), Some(d(pct)));
            let expected = round_money(
                d("1950.75") * (Decimal::ONE - d(pct) / Decimal::ONE_HUNDRED),
            );
            assert!((fees.final_amount - expected).abs() <= d("0.01"), "pct {pct}");
        }
    }

    #[test]
    fn online_payments_record_the_final_amount() {
        let fees = FeeBreakdown::compute(d("500"), d("1000"), Some(d("10")));
        assert_eq!(
            fees.actual_paid_amount(PaymentMethod::Cash, Some(d("1000"))),
            d("1000")
        );
        assert_eq!(
            fees.actual_paid_amount(PaymentMethod::Telebirr, Some(d("1"))),
            d("1350")
        );
    }

    #[test]
    fn lines_skip_zero_fees() {
        let lines = invoice_lines(d("0"), d("2500"), PaymentDuration::Quarter);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].fee_type, FeeTypeCode::Tuition);
        assert_eq!(lines[0].description, "Quarterly Fee (2.5 Months)");

        let lines = invoice_lines(d("500"), d("1000"), PaymentDuration::OneMonth);
        assert_eq!(lines[0].description, "Registration Fee");
        assert_eq!(lines[1].description, "Monthly Fee (1 Month)");
    }
}
