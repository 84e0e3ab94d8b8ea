// src/common/duration.rs

use chrono::Duration;

/// Converte uma string de expiração ("24h", "30d", "900") em `Duration`.
///
/// Sem unidade = segundos. Unidades aceitas: ms, s, m, h, d, w.
pub fn parse_expiry(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let split_at = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split_at);

    let amount: i64 = digits.parse().ok()?;
    if amount <= 0 {
        return None;
    }

    match unit.trim() {
        "" | "s" => Some(Duration::seconds(amount)),
        "ms" => Some(Duration::milliseconds(amount)),
        "m" => Some(Duration::minutes(amount)),
        "h" => Some(Duration::hours(amount)),
        "d" => Some(Duration::days(amount)),
        "w" => Some(Duration::weeks(amount)),
        _ => None,
    }
}
