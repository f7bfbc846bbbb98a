/// Rounds a millisecond duration to two decimal places.
pub fn format_millis(millis: f64) -> f64 {
    (millis * 100.0).round() / 100.0
}
