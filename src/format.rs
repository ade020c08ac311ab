//! Rendering helpers for dashboard stat cards

/// Format an integer with thousands-separator grouping (1234567 -> "1,234,567").
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Render a time value with one decimal place and the seconds unit.
pub fn seconds(value: f64) -> String {
    format!("{value:.1}s")
}

/// Render a currency value with a dollar prefix and two decimal places.
pub fn currency(value: f64) -> String {
    format!("${value:.2}")
}

/// Render a signed count delta: "+3", "-2", "0".
pub fn signed_count(diff: i64) -> String {
    if diff > 0 {
        format!("+{diff}")
    } else {
        diff.to_string()
    }
}

/// Render a signed whole-percent delta: "+12%", "-5%", "0%".
pub fn signed_percent(percent: f64) -> String {
    let rounded = percent.round() as i64;
    format!("{}%", signed_count(rounded))
}

/// Render a signed seconds delta with one decimal place: "+0.4s", "-0.4s", "0.0s".
pub fn signed_seconds(diff: f64) -> String {
    if diff > 0.0 {
        format!("+{diff:.1}s")
    } else {
        format!("{diff:.1}s")
    }
}
