//! Display policy
//!
//! Pure functions from poller state to what a card or chart shows. Nothing
//! here is stored; it is recomputed on every render.

use serde::Serialize;
use std::time::Duration;

use crate::poller::PollState;

/// What a metric card should show
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DisplayValue {
    /// Too many consecutive failures
    Error,
    /// No value yet
    Loading,
    /// Animate from `from` to `to`
    Value { from: f64, to: f64 },
}

impl DisplayValue {
    pub fn from_state(state: &PollState, error_threshold: u32) -> Self {
        if state.is_error(error_threshold) {
            return DisplayValue::Error;
        }
        match state.last_value {
            None => DisplayValue::Loading,
            Some(to) => DisplayValue::Value {
                from: state.previous_value.unwrap_or(to),
                to,
            },
        }
    }

    /// Text for the card once any animation has finished
    pub fn text(&self) -> String {
        match self {
            DisplayValue::Error => "Network error".to_string(),
            DisplayValue::Loading => "Loading...".to_string(),
            DisplayValue::Value { to, .. } => format_count(*to),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, DisplayValue::Error)
    }
}

/// How long a count-up animation should run so it finishes just after the
/// next sample arrives
pub fn animation_duration(poll_interval: Duration) -> Duration {
    poll_interval + Duration::from_millis(100)
}

/// Format with `,` thousands separators and at most three decimals
pub fn format_count(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    let negative = rounded < 0.0;
    let abs = rounded.abs();

    let whole = abs.trunc() as u64;
    let fraction = format!("{:.3}", abs - abs.trunc());
    let fraction = fraction.trim_start_matches('0').trim_end_matches('0');
    let fraction = if fraction == "." { "" } else { fraction };

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}{}{}", if negative { "-" } else { "" }, grouped, fraction)
}

/// Compact y-axis label: `1500` becomes `1.5k`, `2000` becomes `2k`
pub fn format_axis_tick(value: f64) -> String {
    if value >= 1000.0 {
        let k = value / 1000.0;
        if k.fract() == 0.0 {
            format!("{:.0}k", k)
        } else {
            format!("{:.1}k", k)
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

/// Chart title, flagged when its data could not be loaded
pub fn chart_title(title: &str, error: bool) -> String {
    if error {
        format!("{} - Network Error", title)
    } else {
        title.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(last: Option<f64>, previous: Option<f64>, errors: u32) -> PollState {
        PollState {
            last_value: last,
            previous_value: previous,
            consecutive_error_count: errors,
            is_loading: last.is_none() && errors == 0,
            ..PollState::new()
        }
    }

    #[test]
    fn test_display_policy() {
        assert_eq!(DisplayValue::from_state(&state(None, None, 0), 2), DisplayValue::Loading);
        assert_eq!(DisplayValue::from_state(&state(None, None, 1), 2), DisplayValue::Loading);
        assert_eq!(DisplayValue::from_state(&state(None, None, 2), 2), DisplayValue::Error);
        assert_eq!(
            DisplayValue::from_state(&state(Some(100.0), Some(92.0), 1), 2),
            DisplayValue::Value { from: 92.0, to: 100.0 }
        );
        assert_eq!(
            DisplayValue::from_state(&state(Some(100.0), None, 0), 2),
            DisplayValue::Value { from: 100.0, to: 100.0 }
        );
        assert!(DisplayValue::from_state(&state(Some(100.0), None, 3), 2).is_error());
    }

    #[test]
    fn test_display_text() {
        assert_eq!(DisplayValue::Error.text(), "Network error");
        assert_eq!(DisplayValue::Loading.text(), "Loading...");
        assert_eq!(
            DisplayValue::Value { from: 1.0, to: 1234567.0 }.text(),
            "1,234,567"
        );
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0.0), "0");
        assert_eq!(format_count(999.0), "999");
        assert_eq!(format_count(1000.0), "1,000");
        assert_eq!(format_count(33.25), "33.25");
        assert_eq!(format_count(1.23456), "1.235");
        assert_eq!(format_count(-4500.5), "-4,500.5");
    }

    #[test]
    fn test_format_axis_tick() {
        assert_eq!(format_axis_tick(0.0), "0");
        assert_eq!(format_axis_tick(950.0), "950");
        assert_eq!(format_axis_tick(1000.0), "1k");
        assert_eq!(format_axis_tick(1500.0), "1.5k");
        assert_eq!(format_axis_tick(250000.0), "250k");
    }

    #[test]
    fn test_animation_and_titles() {
        assert_eq!(
            animation_duration(Duration::from_millis(4000)),
            Duration::from_millis(4100)
        );
        assert_eq!(chart_title("Messages", false), "Messages");
        assert_eq!(chart_title("Messages", true), "Messages - Network Error");
    }

    #[test]
    fn test_display_serializes_with_state_tag() {
        let json = serde_json::to_value(DisplayValue::Value { from: 1.0, to: 2.0 }).unwrap();
        assert_eq!(json["state"], "value");
        assert_eq!(json["to"], 2.0);
    }
}
