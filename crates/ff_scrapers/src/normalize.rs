//! Text cleanup and timestamp resolution for extracted articles.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use ff_core::{CandidateArticle, DateStatus, NormalizedArticle};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use scraper::Html;

pub const ELLIPSIS: &str = "...";

lazy_static! {
    static ref ENTITY: Regex = Regex::new(r"&(amp|lt|gt|quot|#(\d{1,7}));").unwrap();
    static ref RELATIVE_EN: Regex = Regex::new(
        r"(?i)^(\d+|an?|one)\s+(second|sec|minute|min|hour|hr|day|week)s?\s+ago$"
    )
    .unwrap();
    static ref RELATIVE_AR: Regex = Regex::new(r"^منذ\s*(\d+)?\s*(\S+)$").unwrap();
}

/// Decodes `&amp; &lt; &gt; &quot;` and decimal `&#NNN;` in a single pass.
pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| match &caps[1] {
            "amp" => "&".to_string(),
            "lt" => "<".to_string(),
            "gt" => ">".to_string(),
            "quot" => "\"".to_string(),
            _ => caps[2]
                .parse::<u32>()
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string()),
        })
        .into_owned()
}

/// Drops markup and collapses whitespace. Text without a `<` is never
/// parsed, so entities stay as they are.
pub fn strip_tags(text: &str) -> String {
    let text = if text.contains('<') {
        let fragment = Html::parse_fragment(text);
        fragment.root_element().text().collect::<String>()
    } else {
        text.to_string()
    };
    collapse_whitespace(&text)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Markup is removed before entities are decoded, so escaped text such as
/// `&lt;ETF&gt;` survives as literal characters.
fn clean_description(text: &str) -> String {
    if text.contains('<') {
        // the parser has already decoded entities inside text nodes
        strip_tags(text)
    } else {
        collapse_whitespace(&decode_entities(text))
    }
}

/// Cuts `text` to at most `max_len` characters, ending with [`ELLIPSIS`]
/// when anything was removed.
pub fn truncate_with_ellipsis(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let keep = max_len.saturating_sub(ELLIPSIS.chars().count());
    let head: String = text.chars().take(keep).collect();
    format!("{}{}", head.trim_end(), ELLIPSIS)
}

/// Reads a publication label. Labels that cannot be read resolve to `now`
/// with [`DateStatus::Unparsed`].
pub fn resolve_published(label: &str, now: DateTime<Utc>) -> (DateTime<Utc>, DateStatus) {
    match parse_published(label.trim(), now) {
        Some(at) => (at, DateStatus::Parsed),
        None => (now, DateStatus::Unparsed),
    }
}

fn parse_published(label: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if label.is_empty() {
        return None;
    }
    if let Ok(at) = DateTime::parse_from_rfc2822(label) {
        return Some(at.with_timezone(&Utc));
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(label) {
        return Some(at.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(label, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    parse_relative(label).map(|ago| now - ago)
}

fn parse_relative(label: &str) -> Option<Duration> {
    if let Some(caps) = RELATIVE_EN.captures(label) {
        let count = match caps[1].to_ascii_lowercase().as_str() {
            "a" | "an" | "one" => 1,
            n => n.parse::<i64>().ok()?,
        };
        return unit_duration(&caps[2].to_ascii_lowercase(), count);
    }

    let label = western_digits(label);
    let caps = RELATIVE_AR.captures(&label)?;
    let unit = caps.get(2)?.as_str();
    let (base, dual) = arabic_unit(unit)?;
    let count = match caps.get(1) {
        Some(n) => n.as_str().parse::<i64>().ok()?,
        None if dual => 2,
        None => 1,
    };
    unit_duration(base, count)
}

fn unit_duration(unit: &str, count: i64) -> Option<Duration> {
    match unit {
        "second" | "sec" => Some(Duration::seconds(count)),
        "minute" | "min" => Some(Duration::minutes(count)),
        "hour" | "hr" => Some(Duration::hours(count)),
        "day" => Some(Duration::days(count)),
        "week" => Some(Duration::weeks(count)),
        _ => None,
    }
}

/// Maps an Arabic time unit to its English base and whether it is the dual form.
fn arabic_unit(word: &str) -> Option<(&'static str, bool)> {
    let unit = match word {
        "ثانية" | "ثوان" | "ثواني" | "ثوانٍ" => ("second", false),
        "ثانيتين" => ("second", true),
        "دقيقة" | "دقائق" => ("minute", false),
        "دقيقتين" => ("minute", true),
        "ساعة" | "ساعات" => ("hour", false),
        "ساعتين" => ("hour", true),
        "يوم" | "أيام" | "ايام" => ("day", false),
        "يومين" => ("day", true),
        "أسبوع" | "أسابيع" | "اسبوع" => ("week", false),
        "أسبوعين" => ("week", true),
        _ => return None,
    };
    Some(unit)
}

fn western_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '٠'..='٩' => char::from(b'0' + (c as u32 - '٠' as u32) as u8),
            _ => c,
        })
        .collect()
}

/// Cleans a candidate into a display-ready article.
pub fn normalize_article(
    candidate: CandidateArticle,
    description_max_len: usize,
    now: DateTime<Utc>,
) -> NormalizedArticle {
    let title = collapse_whitespace(&decode_entities(&candidate.title));
    let description = candidate
        .description
        .as_deref()
        .map(clean_description)
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| title.clone());
    let (published_at, date_status) = resolve_published(&candidate.published_label, now);

    NormalizedArticle {
        title,
        url: candidate.url,
        description: truncate_with_ellipsis(&description, description_max_len),
        author: decode_entities(candidate.author.trim()),
        published_label: candidate.published_label,
        published_at,
        date_status,
        image_url: candidate.image_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(
            decode_entities("Bitcoin &amp; Ether &lt;3 &quot;ETF&quot; &gt; gold &#8364;"),
            "Bitcoin & Ether <3 \"ETF\" > gold €"
        );
        assert_eq!(decode_entities("&#99999999;"), "&#99999999;");
        assert_eq!(decode_entities("no entities"), "no entities");
    }

    #[test]
    fn test_decode_is_idempotent_on_decoded_text() {
        for input in [
            "Bitcoin &amp; Ether",
            "&lt;tag&gt;",
            "&quot;quoted&quot;",
            "euro &#8364; sign",
            "plain text",
            "عملة &amp; رقمية",
        ] {
            let once = decode_entities(input);
            assert_eq!(decode_entities(&once), once, "input: {}", input);
        }
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<p>Hello <b>crypto</b> world</p>"), "Hello crypto world");
        assert_eq!(strip_tags("  spaced \n out  "), "spaced out");
        assert_eq!(strip_tags("I <3 BTC"), "I <3 BTC");
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        let short = "short text";
        assert_eq!(truncate_with_ellipsis(short, 100), short);

        let exact: String = "a".repeat(100);
        assert_eq!(truncate_with_ellipsis(&exact, 100), exact);

        for max in [5usize, 10, 100, 200] {
            let long = "x".repeat(max + 50);
            let out = truncate_with_ellipsis(&long, max);
            assert!(out.chars().count() <= max);
            assert!(out.ends_with(ELLIPSIS));
        }
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        let arabic = "ب".repeat(150);
        let out = truncate_with_ellipsis(&arabic, 100);
        assert_eq!(out.chars().count(), 100);
        assert!(out.ends_with(ELLIPSIS));
    }

    #[test]
    fn test_resolve_absolute_dates() {
        let (at, status) = resolve_published("Mon, 10 Mar 2025 08:30:00 GMT", now());
        assert_eq!(status, DateStatus::Parsed);
        assert_eq!(at, Utc.with_ymd_and_hms(2025, 3, 10, 8, 30, 0).unwrap());

        let (at, status) = resolve_published("2025-03-09 21:15:00", now());
        assert_eq!(status, DateStatus::Parsed);
        assert_eq!(at, Utc.with_ymd_and_hms(2025, 3, 9, 21, 15, 0).unwrap());

        let (at, _) = resolve_published("2025-03-09T21:15:00+02:00", now());
        assert_eq!(at, Utc.with_ymd_and_hms(2025, 3, 9, 19, 15, 0).unwrap());
    }

    #[test]
    fn test_resolve_relative_dates() {
        let (at, status) = resolve_published("5 hours ago", now());
        assert_eq!(status, DateStatus::Parsed);
        assert_eq!(at, now() - Duration::hours(5));

        let (at, _) = resolve_published("an hour ago", now());
        assert_eq!(at, now() - Duration::hours(1));

        let (at, _) = resolve_published("منذ 3 ساعات", now());
        assert_eq!(at, now() - Duration::hours(3));

        let (at, _) = resolve_published("منذ ساعتين", now());
        assert_eq!(at, now() - Duration::hours(2));

        let (at, _) = resolve_published("منذ دقيقة", now());
        assert_eq!(at, now() - Duration::minutes(1));

        let (at, _) = resolve_published("منذ ٤ أيام", now());
        assert_eq!(at, now() - Duration::days(4));
    }

    #[test]
    fn test_unparsed_label_falls_back_to_now() {
        for label in ["مؤخراً", "", "sometime soon", "منذ زمن"] {
            let (at, status) = resolve_published(label, now());
            assert_eq!(status, DateStatus::Unparsed, "label: {}", label);
            assert_eq!(at, now());
        }
    }

    #[test]
    fn test_normalize_article() {
        let candidate = CandidateArticle {
            title: "Bitcoin &amp; Ether rally as ETF flows return".to_string(),
            url: "https://sa.investing.com/news/cryptocurrency-news/article-1".to_string(),
            description: Some(format!("<p>{}</p>", "word ".repeat(60))),
            author: "Reuters".to_string(),
            published_label: "مؤخراً".to_string(),
            image_url: None,
        };
        let article = normalize_article(candidate, 100, now());
        assert_eq!(article.title, "Bitcoin & Ether rally as ETF flows return");
        assert!(article.description.chars().count() <= 100);
        assert!(article.description.ends_with(ELLIPSIS));
        assert!(!article.description.contains('<'));
        assert_eq!(article.date_status, DateStatus::Unparsed);
        assert_eq!(article.published_at, now());
    }

    #[test]
    fn test_normalize_keeps_escaped_angle_brackets() {
        let candidate = CandidateArticle {
            title: "Why &lt;ETF&gt; demand matters for Bitcoin".to_string(),
            url: "https://sa.investing.com/news/cryptocurrency-news/article-3".to_string(),
            description: Some("Fund flows a&lt;b and &lt;Ether&gt; rise".to_string()),
            author: "Reuters".to_string(),
            published_label: "2025-03-09 10:00:00".to_string(),
            image_url: None,
        };
        let article = normalize_article(candidate, 200, now());
        assert_eq!(article.title, "Why <ETF> demand matters for Bitcoin");
        assert_eq!(article.description, "Fund flows a<b and <Ether> rise");

        let candidate = CandidateArticle {
            title: "Funds <b>return</b> to crypto".to_string(),
            url: "https://sa.investing.com/news/cryptocurrency-news/article-4".to_string(),
            description: Some("<p>Inflows of &lt;$1bn&gt; &amp; <b>more</b></p>".to_string()),
            author: "Reuters".to_string(),
            published_label: "2025-03-09 10:00:00".to_string(),
            image_url: None,
        };
        let article = normalize_article(candidate, 200, now());
        assert_eq!(article.title, "Funds <b>return</b> to crypto");
        assert_eq!(article.description, "Inflows of <$1bn> & more");
    }

    #[test]
    fn test_normalize_missing_description_uses_title() {
        let candidate = CandidateArticle {
            title: "Ether slips below key support".to_string(),
            url: "https://sa.investing.com/news/cryptocurrency-news/article-2".to_string(),
            description: None,
            author: "Investing.com".to_string(),
            published_label: "2025-03-09 10:00:00".to_string(),
            image_url: Some("https://i-invdn-com.investing.com/x.jpg".to_string()),
        };
        let article = normalize_article(candidate, 100, now());
        assert_eq!(article.description, "Ether slips below key support");
        assert_eq!(article.date_status, DateStatus::Parsed);
        assert!(article.image_url.is_some());
    }
}
