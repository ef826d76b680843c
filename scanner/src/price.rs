//! Price parsing and currency formatting
//!
//! Prices arrive as numbers or as strings in whichever convention the
//! backend used (`"$1.500,50"`, `"ARS 2,500.00"`, `"1500"`). They are shown
//! in the configured locale.

use serde_json::Value;

/// How amounts are rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyFormat {
    /// Currency symbol, e.g. `$`
    pub symbol: String,
    /// Thousands separator
    pub thousands_separator: char,
    /// Decimal separator
    pub decimal_separator: char,
    /// Whether a space goes between the symbol and the amount
    pub symbol_spaced: bool,
}

impl CurrencyFormat {
    /// Argentine pesos: `$ 1.500,50`
    #[must_use]
    pub fn es_ar() -> Self {
        Self {
            symbol: "$".to_owned(),
            thousands_separator: '.',
            decimal_separator: ',',
            symbol_spaced: true,
        }
    }

    /// US style: `$1,500.50`
    #[must_use]
    pub fn en_us() -> Self {
        Self {
            symbol: "$".to_owned(),
            thousands_separator: ',',
            decimal_separator: '.',
            symbol_spaced: false,
        }
    }

    /// Format for a locale tag (`es-AR`, `en-US`, case-insensitive)
    #[must_use]
    pub fn for_locale(locale: &str) -> Option<Self> {
        match locale.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "es-ar" | "es" => Some(Self::es_ar()),
            "en-us" | "en" => Some(Self::en_us()),
            _ => None,
        }
    }

    /// Replace the currency symbol
    #[must_use]
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    /// Render an amount with two decimals
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // cents of a ticket price fit in i64
    pub fn format(&self, amount: f64) -> String {
        let cents = (amount * 100.0).round() as i64;
        let sign = if cents < 0 { "-" } else { "" };
        let cents = cents.unsigned_abs();

        let digits = (cents / 100).to_string();
        let mut whole = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, digit) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                whole.push(self.thousands_separator);
            }
            whole.push(digit);
        }

        let space = if self.symbol_spaced { " " } else { "" };
        format!(
            "{sign}{symbol}{space}{whole}{sep}{fraction:02}",
            symbol = self.symbol,
            sep = self.decimal_separator,
            fraction = cents % 100,
        )
    }

    /// Render a JSON price field, `None` if it holds no amount
    #[must_use]
    pub fn format_value(&self, value: &Value) -> Option<String> {
        let amount = match value {
            Value::Number(number) => number.as_f64()?,
            Value::String(text) => parse_amount(text)?,
            Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => return None,
        };
        amount.is_finite().then(|| self.format(amount))
    }
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        Self::es_ar()
    }
}

/// Parse a human-written amount
///
/// Currency symbols and spaces are ignored. When both `.` and `,` appear,
/// the last one is the decimal separator. A lone separator is decimal
/// unless it is followed by exactly three digits (`1.500`, `2,000`) or
/// repeats (`1.000.000`).
#[must_use]
pub fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let last_dot = cleaned.rfind('.');
    let last_comma = cleaned.rfind(',');

    let decimal = match (last_dot, last_comma) {
        (Some(dot), Some(comma)) => Some(if dot > comma { '.' } else { ',' }),
        (Some(_), None) => lone_separator_is_decimal(&cleaned, '.').then_some('.'),
        (None, Some(_)) => lone_separator_is_decimal(&cleaned, ',').then_some(','),
        (None, None) => None,
    };

    let normalized: String = cleaned
        .chars()
        .filter_map(|c| match c {
            '.' | ',' if Some(c) == decimal => Some('.'),
            '.' | ',' => None,
            other => Some(other),
        })
        .collect();

    normalized.parse().ok()
}

fn lone_separator_is_decimal(text: &str, separator: char) -> bool {
    if text.matches(separator).count() > 1 {
        return false;
    }
    let digits_after = text
        .rsplit(separator)
        .next()
        .map_or(0, |tail| tail.chars().filter(char::is_ascii_digit).count());
    digits_after != 3
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn formats_es_ar() {
        let format = CurrencyFormat::es_ar();
        assert_eq!(format.format(1500.5), "$ 1.500,50");
        assert_eq!(format.format(0.0), "$ 0,00");
        assert_eq!(format.format(999.999), "$ 1.000,00");
        assert_eq!(format.format(1_234_567.0), "$ 1.234.567,00");
        assert_eq!(format.format(-20.0), "-$ 20,00");
    }

    #[test]
    fn formats_en_us_with_custom_symbol() {
        let format = CurrencyFormat::en_us().with_symbol("US$");
        assert_eq!(format.format(2500.0), "US$2,500.00");
    }

    #[test]
    fn locales() {
        assert_eq!(CurrencyFormat::for_locale("es-AR"), Some(CurrencyFormat::es_ar()));
        assert_eq!(CurrencyFormat::for_locale("en_us"), Some(CurrencyFormat::en_us()));
        assert_eq!(CurrencyFormat::for_locale("fr-FR"), None);
    }

    #[test]
    fn parses_both_conventions() {
        assert_eq!(parse_amount("$1.500,50"), Some(1500.5));
        assert_eq!(parse_amount("ARS 2,500.00"), Some(2500.0));
        assert_eq!(parse_amount("1500"), Some(1500.0));
        assert_eq!(parse_amount("1.500"), Some(1500.0));
        assert_eq!(parse_amount("1.000.000"), Some(1_000_000.0));
        assert_eq!(parse_amount("12,5"), Some(12.5));
        assert_eq!(parse_amount("99.90"), Some(99.9));
        assert_eq!(parse_amount("gratis"), None);
    }

    #[test]
    fn formats_json_values() {
        let format = CurrencyFormat::es_ar();
        assert_eq!(format.format_value(&json!(1500)), Some("$ 1.500,00".into()));
        assert_eq!(format.format_value(&json!("$ 800,5")), Some("$ 800,50".into()));
        assert_eq!(format.format_value(&json!(null)), None);
        assert_eq!(format.format_value(&json!("")), None);
    }
}
