pub const POSTER_BASE: &str = "https://image.tmdb.org/t/p/w500";
pub const POSTER_PLACEHOLDER: &str = "/no-poster.png";
const NOT_AVAILABLE: &str = "N/A";

pub fn poster_url(poster_path: Option<&str>) -> String {
    match poster_path.filter(|p| !p.is_empty()) {
        Some(path) => format!("{POSTER_BASE}{path}"),
        None => POSTER_PLACEHOLDER.to_string(),
    }
}

/// One decimal, or "N/A" when the upstream has no votes yet.
pub fn rating_label(vote_average: Option<f64>) -> String {
    match vote_average {
        Some(v) if v != 0.0 && v.is_finite() => format!("{v:.1}"),
        _ => NOT_AVAILABLE.to_string(),
    }
}

pub fn year_label(release_date: Option<&str>) -> String {
    release_date
        .filter(|d| !d.is_empty())
        .and_then(|d| d.split('-').next())
        .map(|y| y.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

pub fn language_label(code: Option<&str>) -> String {
    code.map(|c| c.to_uppercase()).unwrap_or_default()
}

pub fn runtime_label(runtime: Option<u32>) -> Option<String> {
    runtime.filter(|r| *r > 0).map(|r| format!("{r} minutes"))
}

pub fn money_label(amount: Option<u64>) -> Option<String> {
    amount
        .filter(|a| *a > 0)
        .map(|a| format!("${:.1}M", a as f64 / 1_000_000.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poster_falls_back_to_placeholder() {
        assert_eq!(
            poster_url(Some("/abc.jpg")),
            "https://image.tmdb.org/t/p/w500/abc.jpg"
        );
        assert_eq!(poster_url(None), POSTER_PLACEHOLDER);
        assert_eq!(poster_url(Some("")), POSTER_PLACEHOLDER);
    }

    #[test]
    fn labels_use_na_fallbacks() {
        assert_eq!(rating_label(Some(7.26)), "7.3");
        assert_eq!(rating_label(Some(0.0)), "N/A");
        assert_eq!(rating_label(None), "N/A");
        assert_eq!(year_label(Some("1989-06-23")), "1989");
        assert_eq!(year_label(Some("2025")), "2025");
        assert_eq!(year_label(None), "N/A");
        assert_eq!(language_label(Some("en")), "EN");
    }

    #[test]
    fn money_only_for_positive_amounts() {
        assert_eq!(money_label(Some(35_000_000)).as_deref(), Some("$35.0M"));
        assert_eq!(money_label(Some(411_348_924)).as_deref(), Some("$411.3M"));
        assert_eq!(money_label(Some(0)), None);
        assert_eq!(runtime_label(Some(126)).as_deref(), Some("126 minutes"));
        assert_eq!(runtime_label(Some(0)), None);
    }
}
