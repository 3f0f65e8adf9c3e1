use super::{ConversionError, ConversionResult};
use crate::models::payload::{UnitInput, UnitOutput};

/// Factor to the category's base unit (metre, square metre, metre/second,
/// pascal, kilogram, litre).
const LINEAR_UNITS: &[(&str, &[(&str, f64)])] = &[
    ("length", &[
        ("mm", 0.001),
        ("cm", 0.01),
        ("m", 1.0),
        ("km", 1000.0),
        ("in", 0.0254),
        ("ft", 0.3048),
        ("yd", 0.9144),
        ("mi", 1609.344),
        ("nmi", 1852.0),
    ]),
    ("area", &[
        ("mm2", 1e-6),
        ("cm2", 1e-4),
        ("m2", 1.0),
        ("ha", 10_000.0),
        ("km2", 1e6),
        ("in2", 0.000_645_16),
        ("ft2", 0.092_903_04),
        ("yd2", 0.836_127_36),
        ("acre", 4046.856_422_4),
        ("mi2", 2_589_988.110_336),
    ]),
    ("speed", &[
        ("m_s", 1.0),
        ("km_h", 1000.0 / 3600.0),
        ("mph", 0.447_04),
        ("ft_s", 0.3048),
        ("knot", 1852.0 / 3600.0),
    ]),
    ("pressure", &[
        ("pa", 1.0),
        ("kpa", 1000.0),
        ("mpa", 1e6),
        ("bar", 100_000.0),
        ("psi", 6894.757_293_168),
        ("atm", 101_325.0),
        ("mmhg", 133.322_387_415),
        ("torr", 101_325.0 / 760.0),
    ]),
    ("mass", &[
        ("mg", 1e-6),
        ("g", 0.001),
        ("kg", 1.0),
        ("t", 1000.0),
        ("oz", 0.028_349_523_125),
        ("lb", 0.453_592_37),
        ("st", 6.350_293_18),
    ]),
    ("volume", &[
        ("ml", 0.001),
        ("l", 1.0),
        ("m3", 1000.0),
        ("tsp", 0.004_928_921_593_75),
        ("tbsp", 0.014_786_764_781_25),
        ("cup", 0.236_588_236_5),
        ("pt", 0.473_176_473),
        ("qt", 0.946_352_946),
        ("gal", 3.785_411_784),
    ]),
];

fn linear_factor(category: &str, unit: &str) -> Option<Option<f64>> {
    LINEAR_UNITS
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, units)| units.iter().find(|(u, _)| *u == unit).map(|(_, f)| *f))
}

fn to_kelvin(value: f64, unit: &str) -> Option<f64> {
    match unit {
        "c" => Some(value + 273.15),
        "f" => Some((value - 32.0) * 5.0 / 9.0 + 273.15),
        "k" => Some(value),
        _ => None,
    }
}

fn from_kelvin(kelvin: f64, unit: &str) -> Option<f64> {
    match unit {
        "c" => Some(kelvin - 273.15),
        "f" => Some((kelvin - 273.15) * 9.0 / 5.0 + 32.0),
        "k" => Some(kelvin),
        _ => None,
    }
}

/// Rounds away binary noise such as `0.30000000000000004`.
fn tidy(value: f64) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    let magnitude = value.abs().log10().floor() as i32;
    let factor = 10f64.powi(12 - magnitude);
    if !factor.is_finite() {
        return value;
    }
    (value * factor).round() / factor
}

pub fn convert(input: &UnitInput) -> ConversionResult<UnitOutput> {
    let category = input.category.trim().to_lowercase();
    let from = input.from_unit.trim().to_lowercase();
    let to = input.to_unit.trim().to_lowercase();
    let unknown_unit = |unit: &str| {
        ConversionError::Unsupported(format!("Unknown {category} unit: {unit}"))
    };

    let converted = if category == "temperature" {
        let kelvin = to_kelvin(input.value, &from).ok_or_else(|| unknown_unit(&from))?;
        if kelvin < 0.0 {
            return Err(ConversionError::Unsupported(
                "Temperature is below absolute zero".to_string(),
            ));
        }
        from_kelvin(kelvin, &to).ok_or_else(|| unknown_unit(&to))?
    } else {
        let from_factor = linear_factor(&category, &from)
            .ok_or_else(|| ConversionError::Unsupported(format!("Unknown unit category: {category}")))?
            .ok_or_else(|| unknown_unit(&from))?;
        let to_factor = linear_factor(&category, &to)
            .flatten()
            .ok_or_else(|| unknown_unit(&to))?;
        input.value * from_factor / to_factor
    };

    if !converted.is_finite() {
        return Err(ConversionError::Unsupported("Result is out of range".to_string()));
    }

    Ok(UnitOutput {
        category,
        value: input.value,
        from_unit: from,
        to_unit: to,
        converted_value: tidy(converted),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn request(category: &str, value: f64, from: &str, to: &str) -> UnitInput {
        UnitInput {
            category: category.to_string(),
            value,
            from_unit: from.to_string(),
            to_unit: to.to_string(),
        }
    }

    #[rstest]
    #[case("length", 1.0, "mi", "km", 1.609344)]
    #[case("length", 12.0, "in", "ft", 1.0)]
    #[case("area", 1.0, "ha", "m2", 10_000.0)]
    #[case("speed", 100.0, "km_h", "m_s", 27.7777777778)]
    #[case("pressure", 1.0, "atm", "kpa", 101.325)]
    #[case("mass", 1.0, "kg", "lb", 2.20462262185)]
    #[case("volume", 1.0, "gal", "l", 3.785411784)]
    #[case("temperature", 100.0, "c", "f", 212.0)]
    #[case("temperature", 32.0, "F", "K", 273.15)]
    fn converts_between_units(
        #[case] category: &str,
        #[case] value: f64,
        #[case] from: &str,
        #[case] to: &str,
        #[case] expected: f64,
    ) {
        let output = convert(&request(category, value, from, to)).unwrap();
        assert!(
            (output.converted_value - expected).abs() < 1e-9,
            "{value} {from} -> {to}: got {}, expected {expected}",
            output.converted_value
        );
    }

    #[test]
    fn rejects_unknown_category_and_unit() {
        assert!(matches!(
            convert(&request("luminosity", 1.0, "lm", "cd")),
            Err(ConversionError::Unsupported(_))
        ));
        assert!(matches!(
            convert(&request("length", 1.0, "m", "parsec")),
            Err(ConversionError::Unsupported(_))
        ));
    }

    #[rstest]
    #[case(1e308, "km", "mm")]
    #[case(f64::MAX, "mi", "in")]
    fn overflowing_result_is_out_of_range(#[case] value: f64, #[case] from: &str, #[case] to: &str) {
        assert_eq!(
            convert(&request("length", value, from, to)),
            Err(ConversionError::Unsupported("Result is out of range".to_string()))
        );
    }

    #[rstest]
    #[case(1e-300, "mm", "m", 1e-303)]
    #[case(5e-320, "m", "m", 5e-320)]
    fn tiny_results_stay_finite(#[case] value: f64, #[case] from: &str, #[case] to: &str, #[case] expected: f64) {
        let output = convert(&request("length", value, from, to)).unwrap();
        assert!(output.converted_value.is_finite());
        assert!(
            ((output.converted_value - expected) / expected).abs() < 1e-9,
            "got {}, expected {expected}",
            output.converted_value
        );
    }

    #[test]
    fn rejects_temperatures_below_absolute_zero() {
        assert!(convert(&request("temperature", -300.0, "c", "k")).is_err());
    }
}
