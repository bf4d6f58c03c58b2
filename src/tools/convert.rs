//! Unit conversion.
//!
//! Linear categories convert through a base unit (metre, kilogram, litre,
//! second, byte). Temperature is affine and converts through celsius.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Length,
    Mass,
    Volume,
    Time,
    DataStorage,
    Temperature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Temperature {
    Celsius,
    Fahrenheit,
    Kelvin,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Unit {
    Linear { category: Category, factor: f64 },
    Temperature(Temperature),
}

impl Unit {
    fn category(&self) -> Category {
        match self {
            Unit::Linear { category, .. } => *category,
            Unit::Temperature(_) => Category::Temperature,
        }
    }
}

/// (aliases, category, size in the category's base unit)
const LINEAR_UNITS: &[(&[&str], Category, f64)] = &[
    // Length, base: metre
    (&["millimeter", "millimetre", "mm"], Category::Length, 0.001),
    (&["centimeter", "centimetre", "cm"], Category::Length, 0.01),
    (&["meter", "metre", "m"], Category::Length, 1.0),
    (&["kilometer", "kilometre", "km"], Category::Length, 1000.0),
    (&["inch", "in"], Category::Length, 0.0254),
    (&["foot", "feet", "ft"], Category::Length, 0.3048),
    (&["yard", "yd"], Category::Length, 0.9144),
    (&["mile", "mi"], Category::Length, 1609.344),
    (&["nautical_mile", "nmi"], Category::Length, 1852.0),
    // Mass, base: kilogram
    (&["milligram", "mg"], Category::Mass, 0.000_001),
    (&["gram", "g"], Category::Mass, 0.001),
    (&["kilogram", "kg"], Category::Mass, 1.0),
    (&["tonne", "metric_ton", "t"], Category::Mass, 1000.0),
    (&["ounce", "oz"], Category::Mass, 0.028_349_523_125),
    (&["pound", "lb", "lbs"], Category::Mass, 0.453_592_37),
    (&["stone", "st"], Category::Mass, 6.350_293_18),
    // Volume, base: litre
    (&["milliliter", "millilitre", "ml"], Category::Volume, 0.001),
    (&["liter", "litre", "l"], Category::Volume, 1.0),
    (&["cubic_meter", "cubic_metre", "m3"], Category::Volume, 1000.0),
    (&["teaspoon", "tsp"], Category::Volume, 0.004_928_921_593_75),
    (&["tablespoon", "tbsp"], Category::Volume, 0.014_786_764_781_25),
    (&["fluid_ounce", "fl_oz"], Category::Volume, 0.029_573_529_562_5),
    (&["cup"], Category::Volume, 0.236_588_236_5),
    (&["pint", "pt"], Category::Volume, 0.473_176_473),
    (&["quart", "qt"], Category::Volume, 0.946_352_946),
    (&["gallon", "gal"], Category::Volume, 3.785_411_784),
    // Time, base: second
    (&["millisecond", "ms"], Category::Time, 0.001),
    (&["second", "sec", "s"], Category::Time, 1.0),
    (&["minute", "min"], Category::Time, 60.0),
    (&["hour", "hr", "h"], Category::Time, 3600.0),
    (&["day", "d"], Category::Time, 86_400.0),
    (&["week", "wk"], Category::Time, 604_800.0),
    // Data storage, base: byte
    (&["bit"], Category::DataStorage, 0.125),
    (&["byte", "b"], Category::DataStorage, 1.0),
    (&["kilobyte", "kb"], Category::DataStorage, 1e3),
    (&["megabyte", "mb"], Category::DataStorage, 1e6),
    (&["gigabyte", "gb"], Category::DataStorage, 1e9),
    (&["terabyte", "tb"], Category::DataStorage, 1e12),
    (&["kibibyte", "kib"], Category::DataStorage, 1024.0),
    (&["mebibyte", "mib"], Category::DataStorage, 1_048_576.0),
    (&["gibibyte", "gib"], Category::DataStorage, 1_073_741_824.0),
];

/// Lowercased name with simple plurals ("meters", "inches") reduced to the singular.
fn normalize(name: &str) -> String {
    let lower = name.trim().to_lowercase().replace([' ', '-'], "_");

    if let Some(stem) = lower.strip_suffix("es").filter(|stem| stem.ends_with("ch")) {
        return stem.to_string();
    }
    if let Some(stem) = lower.strip_suffix('s').filter(|stem| stem.len() > 2) {
        return stem.to_string();
    }
    lower
}

fn lookup(name: &str) -> Option<Unit> {
    let key = name.trim().to_lowercase().replace([' ', '-'], "_");
    let normalized = normalize(name);

    if let Some(t) = temperature(&key).or_else(|| temperature(&normalized)) {
        return Some(Unit::Temperature(t));
    }

    // Exact alias first so that e.g. "ms" is milliseconds, not a plural of "m"
    [key, normalized].iter().find_map(|candidate| {
        LINEAR_UNITS
            .iter()
            .find(|(aliases, _, _)| aliases.contains(&candidate.as_str()))
            .map(|(_, category, factor)| Unit::Linear {
                category: *category,
                factor: *factor,
            })
    })
}

fn temperature(name: &str) -> Option<Temperature> {
    match name {
        "celsius" | "c" | "°c" => Some(Temperature::Celsius),
        "fahrenheit" | "f" | "°f" => Some(Temperature::Fahrenheit),
        "kelvin" | "k" => Some(Temperature::Kelvin),
        _ => None,
    }
}

fn to_celsius(value: f64, unit: Temperature) -> f64 {
    match unit {
        Temperature::Celsius => value,
        Temperature::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
        Temperature::Kelvin => value - 273.15,
    }
}

fn from_celsius(value: f64, unit: Temperature) -> f64 {
    match unit {
        Temperature::Celsius => value,
        Temperature::Fahrenheit => value * 9.0 / 5.0 + 32.0,
        Temperature::Kelvin => value + 273.15,
    }
}

/// Round to 12 significant digits to drop float noise (e.g. 211.99999999999997 -> 212).
fn tidy(value: f64) -> f64 {
    const SIGNIFICANT_DIGITS: i32 = 12;
    if !value.is_finite() || value == 0.0 {
        return value;
    }

    let magnitude = value.abs().log10().floor() as i32;
    let decimals = SIGNIFICANT_DIGITS - 1 - magnitude;
    // Large values have no fractional noise; tiny ones would overflow the scale
    if decimals <= 0 || decimals > 300 {
        return value;
    }

    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Convert between two units of the same category.
///
/// Returns `None` for unknown units or units from different categories.
pub fn try_convert(value: f64, from: &str, to: &str) -> Option<f64> {
    let from = lookup(from)?;
    let to = lookup(to)?;

    if from.category() != to.category() {
        return None;
    }

    let result = match (from, to) {
        (Unit::Linear { factor: f, .. }, Unit::Linear { factor: t, .. }) => value * f / t,
        (Unit::Temperature(f), Unit::Temperature(t)) => from_celsius(to_celsius(value, f), t),
        _ => return None,
    };

    Some(tidy(result))
}

/// Convert between units; unknown or mismatched units yield `NaN`.
pub fn convert_unit(value: f64, from: &str, to: &str) -> f64 {
    try_convert(value, from, to).unwrap_or(f64::NAN)
}

/// The category a unit name belongs to, if it is known.
pub fn category_of(unit: &str) -> Option<Category> {
    lookup(unit).map(|u| u.category())
}
