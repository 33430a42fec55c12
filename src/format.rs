//! Text formatting and parsing of durations.

const TOO_LARGE: &str = "Duration too large";

/// `MM:SS`, or `HH:MM:SS` once there is at least one full hour.
pub fn format_clock(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Accumulated focus time as `HH:MM`; seconds are dropped.
pub fn format_focus(total_secs: u64) -> String {
    format!("{:02}:{:02}", total_secs / 3600, (total_secs % 3600) / 60)
}

/// Split seconds into `(hours, minutes, seconds)`.
pub fn split_hms(total_secs: u64) -> (u64, u64, u64) {
    (total_secs / 3600, (total_secs % 3600) / 60, total_secs % 60)
}

/// Parse a countdown length into seconds.
///
/// Accepts unit form (`1h30m`, `90s`, `2h`), clock form (`1:30:00`, `25:00`)
/// or a bare number of minutes (`25`).
pub fn parse_duration(s: &str) -> Result<u64, String> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        return Err("Empty duration".into());
    }

    let total = if s.contains(':') {
        parse_clock(&s)?
    } else if s.chars().all(|c| c.is_ascii_digit()) {
        let minutes = s.parse::<u64>().map_err(|_| "Invalid minutes")?;
        minutes.checked_mul(60).ok_or(TOO_LARGE)?
    } else {
        parse_units(&s)?
    };

    if total > 0 { Ok(total) } else { Err("Duration must be > 0".into()) }
}

fn parse_units(s: &str) -> Result<u64, String> {
    let mut total: u64 = 0;
    let mut num = String::new();

    for c in s.chars() {
        let (factor, err) = match c {
            '0'..='9' => {
                num.push(c);
                continue;
            }
            ' ' => continue,
            'h' => (3600, "Invalid hours"),
            'm' => (60, "Invalid minutes"),
            's' => (1, "Invalid seconds"),
            _ => return Err("Invalid format".into()),
        };
        let part = take_number(&mut num, err)?;
        total = part
            .checked_mul(factor)
            .and_then(|p| total.checked_add(p))
            .ok_or(TOO_LARGE)?;
    }

    if !num.is_empty() {
        return Err("Missing unit (h, m or s)".into());
    }
    Ok(total)
}

fn take_number(num: &mut String, err: &str) -> Result<u64, String> {
    let n = num.parse::<u64>().map_err(|_| err.to_string())?;
    num.clear();
    Ok(n)
}

fn parse_clock(s: &str) -> Result<u64, String> {
    let parts = s
        .split(':')
        .map(|p| p.trim().parse::<u64>().map_err(|_| "Invalid clock value".to_string()))
        .collect::<Result<Vec<_>, _>>()?;

    let total = match parts.as_slice() {
        [m, sec] => m.checked_mul(60).and_then(|m| m.checked_add(*sec)),
        [h, m, sec] => h
            .checked_mul(3600)
            .and_then(|h| m.checked_mul(60).and_then(|m| h.checked_add(m)))
            .and_then(|hm| hm.checked_add(*sec)),
        _ => return Err("Expected MM:SS or HH:MM:SS".into()),
    };
    total.ok_or_else(|| TOO_LARGE.to_string())
}
