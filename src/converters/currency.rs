use super::{ConversionError, ConversionResult};
use crate::models::payload::{CurrencyInput, CurrencyOutput};

/// Units of each currency per US dollar.
const USD_RATES: &[(&str, f64)] = &[
    ("USD", 1.0),
    ("EUR", 0.92),
    ("GBP", 0.79),
    ("JPY", 149.50),
    ("CHF", 0.88),
    ("CAD", 1.36),
    ("AUD", 1.52),
    ("NZD", 1.64),
    ("CNY", 7.24),
    ("HKD", 7.82),
    ("SGD", 1.34),
    ("INR", 83.10),
    ("KRW", 1330.0),
    ("SEK", 10.45),
    ("NOK", 10.60),
    ("DKK", 6.87),
    ("PLN", 3.98),
    ("MXN", 17.10),
    ("BRL", 4.95),
    ("ZAR", 18.60),
    ("TRY", 32.20),
    ("AED", 3.67),
];

fn usd_rate(code: &str) -> Option<f64> {
    USD_RATES.iter().find(|(c, _)| *c == code).map(|(_, rate)| *rate)
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

pub fn convert(input: &CurrencyInput) -> ConversionResult<CurrencyOutput> {
    let from = input.from_currency.trim().to_uppercase();
    let to = input.to_currency.trim().to_uppercase();

    let from_rate = usd_rate(&from)
        .ok_or_else(|| ConversionError::Unsupported(format!("Unsupported currency: {from}")))?;
    let to_rate = usd_rate(&to)
        .ok_or_else(|| ConversionError::Unsupported(format!("Unsupported currency: {to}")))?;

    let exchange_rate = to_rate / from_rate;
    let converted_amount = input.amount * exchange_rate;
    if !converted_amount.is_finite() {
        return Err(ConversionError::Unsupported("Result is out of range".to_string()));
    }

    Ok(CurrencyOutput {
        amount: input.amount,
        from_currency: from,
        to_currency: to,
        exchange_rate: round_to(exchange_rate, 6),
        converted_amount: round_to(converted_amount, 2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn request(amount: f64, from: &str, to: &str) -> CurrencyInput {
        CurrencyInput { amount, from_currency: from.to_string(), to_currency: to.to_string() }
    }

    #[test]
    fn converts_usd_to_eur() {
        let output = convert(&request(100.0, "USD", "EUR")).unwrap();
        assert_eq!(output.exchange_rate, 0.92);
        assert_eq!(output.converted_amount, 92.0);
    }

    #[test]
    fn cross_rates_go_through_usd() {
        let output = convert(&request(10.0, "eur", "gbp")).unwrap();
        assert_eq!(output.from_currency, "EUR");
        assert_eq!(output.to_currency, "GBP");
        assert_eq!(output.exchange_rate, 0.858696);
        assert_eq!(output.converted_amount, 8.59);
    }

    #[test]
    fn same_currency_is_identity() {
        let output = convert(&request(42.5, "JPY", "JPY")).unwrap();
        assert_eq!(output.exchange_rate, 1.0);
        assert_eq!(output.converted_amount, 42.5);
    }

    #[test]
    fn unknown_currency_is_unsupported() {
        let err = convert(&request(1.0, "USD", "XYZ")).unwrap_err();
        assert_eq!(err, ConversionError::Unsupported("Unsupported currency: XYZ".to_string()));
    }

    #[rstest]
    #[case(1e307, "USD", "KRW")]
    #[case(f64::MAX, "EUR", "JPY")]
    fn overflowing_amount_is_out_of_range(#[case] amount: f64, #[case] from: &str, #[case] to: &str) {
        assert_eq!(
            convert(&request(amount, from, to)),
            Err(ConversionError::Unsupported("Result is out of range".to_string()))
        );
    }

    #[rstest]
    #[case(1e306, "USD", "EUR")]
    #[case(1e-300, "USD", "JPY")]
    fn extreme_but_representable_amounts_stay_finite(#[case] amount: f64, #[case] from: &str, #[case] to: &str) {
        let output = convert(&request(amount, from, to)).unwrap();
        assert!(output.converted_amount.is_finite());
        assert!(output.exchange_rate.is_finite());
    }
}
