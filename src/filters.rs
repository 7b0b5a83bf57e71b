use askama::Result;
use chrono::{DateTime, Utc};
use std::fmt::Display;

// `{{ amount|money }}` renders "$1234.50".
#[allow(clippy::unnecessary_wraps)]
pub fn money<T: Display>(amount: T) -> Result<String> {
    Ok(format!("${:.2}", amount))
}

#[allow(clippy::unnecessary_wraps)]
pub fn one_decimal<T: Display>(value: T) -> Result<String> {
    Ok(format!("{:.1}", value))
}

#[allow(clippy::unnecessary_wraps)]
pub fn date(value: &Option<DateTime<Utc>>) -> Result<String> {
    Ok(value
        .map(|d| d.format("%b %d, %Y").to_string())
        .unwrap_or_else(|| "N/A".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn money_pads_to_cents() {
        assert_eq!(money(Decimal::new(12345, 1)).unwrap(), "$1234.50");
        assert_eq!(money(0.0).unwrap(), "$0.00");
    }

    #[test]
    fn one_decimal_rounds() {
        assert_eq!(one_decimal(6.26_f64).unwrap(), "6.3");
        assert_eq!(one_decimal(2.0_f64).unwrap(), "2.0");
    }

    #[test]
    fn missing_dates_render_as_na() {
        assert_eq!(date(&None).unwrap(), "N/A");
        let d = "2024-03-05T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(date(&Some(d)).unwrap(), "Mar 05, 2024");
    }
}
