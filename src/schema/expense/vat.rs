use serde::Serialize;

/// Beyond this magnitude every f64 is already a whole number of cents
const EXACT_CENTS_LIMIT: f64 = 4_503_599_627_370_496.0 / 100.0;

/// Round a currency value to two decimals, half away from zero after scaling by 100.
/// Values too large to carry cents, and non-finite values, are returned unchanged.
pub fn round_cents(value: f64) -> f64 {
    if !value.is_finite() || value.abs() >= EXACT_CENTS_LIMIT {
        return value;
    }
    (value * 100.0).round() / 100.0
}

/// VAT due on a net `amount` at `rate` percent, rounded to cents
pub fn vat_amount(amount: f64, rate: f64) -> f64 {
    round_cents(amount * (rate / 100.0))
}

/// Net / VAT / gross split of an amount, each rounded to cents
#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct VatBreakdown {
    pub net_amount: f64,
    pub vat_amount: f64,
    pub total_amount: f64,
    pub vat_rate: f64,
}

impl VatBreakdown {
    /// `amount` excludes VAT
    pub fn from_net(amount: f64, rate: f64) -> Self {
        let vat = amount * (rate / 100.0);
        Self {
            net_amount: round_cents(amount),
            vat_amount: round_cents(vat),
            total_amount: round_cents(amount + vat),
            vat_rate: rate,
        }
    }

    /// `amount` already includes VAT
    pub fn from_gross(amount: f64, rate: f64) -> Self {
        let net = amount / (1.0 + rate / 100.0);
        Self {
            net_amount: round_cents(net),
            vat_amount: round_cents(amount - net),
            total_amount: round_cents(amount),
            vat_rate: rate,
        }
    }
}
