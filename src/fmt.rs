fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn dollars(val: f64, decimals: usize) -> String {
    let text = format!("{:.*}", decimals, val.abs());
    let (int_part, frac) = match text.split_once('.') {
        Some((i, f)) => (i, format!(".{f}")),
        None => (text.as_str(), String::new()),
    };
    let sign = if val < 0.0 && text.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    format!("{sign}${}{frac}", group_thousands(int_part))
}

/// `$1,234.56`
pub fn money(val: f64) -> String {
    dollars(val, 2)
}

/// `$1,235`, rounded to the whole dollar.
pub fn whole_money(val: f64) -> String {
    dollars(val.round(), 0)
}

/// Plain two-decimal figure without currency symbol, as shown in row tables.
pub fn two_places(val: f64) -> String {
    format!("{val:.2}")
}
