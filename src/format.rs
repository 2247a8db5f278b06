use crate::film::Field;

/// Removes citation markers like `[12]` by dropping every ASCII digit and square bracket.
/// Digits that belong to a name are dropped as well.
pub fn clean_text(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_ascii_digit() && *c != '[' && *c != ']')
        .collect()
}

pub fn format_revenue(revenue: &Field) -> String {
    format!("${}", group_number(revenue.to_number()))
}

const FRACTION_DIGITS: usize = 3;

/// en-US style rendering: `,` thousands separators, at most three fraction digits.
pub fn group_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        let symbol = if n > 0.0 { "∞" } else { "-∞" };
        return symbol.to_string();
    }

    // Display gives the shortest decimal that round-trips, rounding starts from there
    let shortest = n.abs().to_string();
    let (int_part, frac_part) = round_half_up(&shortest);
    let frac_part = frac_part.trim_end_matches('0');

    let mut out = String::with_capacity(int_part.len() + int_part.len() / 3 + frac_part.len() + 2);
    // Rounding can turn a small negative number into zero
    if n < 0.0 && (int_part.bytes().any(|b| b != b'0') || !frac_part.is_empty()) {
        out.push('-');
    }
    for (idx, digit) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

/// Rounds a plain decimal string to three fraction digits, ties away from zero.
fn round_half_up(decimal: &str) -> (String, String) {
    let (int_part, frac_part) = decimal.split_once('.').unwrap_or((decimal, ""));
    if frac_part.len() <= FRACTION_DIGITS {
        return (int_part.to_string(), frac_part.to_string());
    }

    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part[..FRACTION_DIGITS].bytes())
        .map(|b| b - b'0')
        .collect();
    if frac_part.as_bytes()[FRACTION_DIGITS] >= b'5' {
        let mut idx = digits.len();
        loop {
            if idx == 0 {
                digits.insert(0, 1);
                break;
            }
            idx -= 1;
            if digits[idx] == 9 {
                digits[idx] = 0;
            } else {
                digits[idx] += 1;
                break;
            }
        }
    }

    let text: String = digits.iter().map(|d| char::from(b'0' + d)).collect();
    let (int_part, frac_part) = text.split_at(text.len() - FRACTION_DIGITS);
    (int_part.to_string(), frac_part.to_string())
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
