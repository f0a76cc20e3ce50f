use chrono::NaiveDate;

/// Format a grade date the way the portal shows it (DD/MM/YYYY)
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a percentage change with sign, e.g. "+20.00%"
pub fn format_trend(percentage: f64) -> String {
    format!("{:+.2}%", percentage)
}

/// Format an optional mean, "-" when there is none
pub fn format_mean(mean: Option<f64>) -> String {
    match mean {
        Some(m) => format!("{:.2}", m),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();
        assert_eq!(format_date(date), "07/01/2025");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("ARTE", 10), "ARTE");
        assert_eq!(truncate_string("EDUCAZIONE FISICA", 10), "EDUCAZI...");
        assert_eq!(truncate_string("ARTE", 2), "AR");
        // Counts characters, not bytes
        assert_eq!(truncate_string("RELIGIONE CATTOLICA/ATTIVITÀ", 28), "RELIGIONE CATTOLICA/ATTIVITÀ");
    }

    #[test]
    fn test_format_trend_and_mean() {
        assert_eq!(format_trend(20.0), "+20.00%");
        assert_eq!(format_trend(-12.5), "-12.50%");
        assert_eq!(format_mean(Some(6.333333)), "6.33");
        assert_eq!(format_mean(None), "-");
    }
}
