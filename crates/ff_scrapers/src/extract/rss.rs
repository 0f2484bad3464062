use ff_core::CandidateArticle;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use super::Extractor;
use crate::normalize::{decode_entities, truncate_with_ellipsis};

/// Length of the description synthesized from a title when an item has none.
const SYNTHESIZED_DESCRIPTION_LEN: usize = 100;

lazy_static! {
    static ref ITEM: Regex = Regex::new(r"(?s)<item\b[^>]*>(.*?)</item>").unwrap();
    static ref TITLE: Regex = Regex::new(r"(?s)<title\b[^>]*>(.*?)</title>").unwrap();
    static ref LINK: Regex = Regex::new(r"(?s)<link\b[^>]*>(.*?)</link>").unwrap();
    static ref DESCRIPTION: Regex =
        Regex::new(r"(?s)<description\b[^>]*>(.*?)</description>").unwrap();
    static ref PUB_DATE: Regex = Regex::new(r"(?s)<pubDate\b[^>]*>(.*?)</pubDate>").unwrap();
    static ref AUTHOR: Regex =
        Regex::new(r"(?s)<(?:author|dc:creator)\b[^>]*>(.*?)</(?:author|dc:creator)>").unwrap();
    static ref ENCLOSURE: Regex =
        Regex::new(r#"<enclosure\b[^>]*?\burl\s*=\s*["']([^"']+)["']"#).unwrap();
    static ref CDATA: Regex = Regex::new(r"(?s)^\s*<!\[CDATA\[(.*?)\]\]>\s*$").unwrap();
}

/// Text of the first `tag` match, CDATA unwrapped and trimmed.
fn tag_text(pattern: &Regex, item: &str) -> Option<String> {
    let raw = pattern.captures(item)?.get(1)?.as_str();
    let text = match CDATA.captures(raw) {
        Some(caps) => caps[1].to_string(),
        None => raw.to_string(),
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

pub(super) fn extract_items(extractor: &Extractor, body: &str) -> Vec<CandidateArticle> {
    let cap = extractor.options.cap;
    let mut articles = Vec::new();

    for (index, item) in ITEM.captures_iter(body).enumerate() {
        if articles.len() >= cap {
            break;
        }
        let item = &item[1];

        let Some(title) = tag_text(&TITLE, item).map(|t| decode_entities(&t)) else {
            debug!("Item {} has no title, skipping", index);
            continue;
        };
        let Some(url) = tag_text(&LINK, item).map(|l| decode_entities(&l)) else {
            debug!("Item {} has no link, skipping", index);
            continue;
        };
        if !extractor.title_ok(&title) {
            debug!("Item {} title too short: {:?}", index, title);
            continue;
        }
        if !extractor.url_ok(&url) {
            debug!("Item {} link does not look like an article: {}", index, url);
            continue;
        }

        let description = tag_text(&DESCRIPTION, item)
            .map(|d| decode_entities(&d))
            .or_else(|| Some(truncate_with_ellipsis(&title, SYNTHESIZED_DESCRIPTION_LEN)));
        let author = tag_text(&AUTHOR, item)
            .unwrap_or_else(|| extractor.profile.default_author.clone());
        let published_label = tag_text(&PUB_DATE, item)
            .unwrap_or_else(|| extractor.profile.recent_label.clone());
        let image_url = ENCLOSURE
            .captures(item)
            .map(|caps| decode_entities(caps[1].trim()));

        articles.push(CandidateArticle {
            title,
            url,
            description,
            author,
            published_label,
            image_url,
        });
    }

    articles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractOptions;
    use crate::sources::SourceProfile;

    fn extractor(cap: usize) -> Extractor {
        Extractor::new(
            SourceProfile::investing_crypto(),
            ExtractOptions {
                cap,
                ..ExtractOptions::default()
            },
        )
        .unwrap()
    }

    fn item(n: usize) -> String {
        format!(
            "<item><title>Crypto headline number {n} &amp; more</title>\
             <link>https://sa.investing.com/news/cryptocurrency-news/article-{n}</link>\
             <pubDate>2025-03-0{d} 10:00:00</pubDate>\
             <enclosure url=\"https://i-invdn-com.investing.com/news/{n}.jpg\" type=\"image/jpeg\" />\
             </item>",
            n = n,
            d = (n % 9) + 1
        )
    }

    fn feed(items: &[String]) -> String {
        format!(
            "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>News</title>{}</channel></rss>",
            items.concat()
        )
    }

    #[test]
    fn test_cap_in_document_order() {
        let items: Vec<String> = (1..=8).map(item).collect();
        for cap in [5usize, 10, 12] {
            let found = extract_items(&extractor(cap), &feed(&items));
            assert_eq!(found.len(), cap.min(8));
            for (i, article) in found.iter().enumerate() {
                assert!(article.url.ends_with(&format!("article-{}", i + 1)));
            }
        }
    }

    #[test]
    fn test_item_fields() {
        let found = extract_items(&extractor(5), &feed(&[item(3)]));
        let article = &found[0];
        assert_eq!(article.title, "Crypto headline number 3 & more");
        assert_eq!(article.description.as_deref(), Some("Crypto headline number 3 & more"));
        assert_eq!(article.author, "Investing.com");
        assert_eq!(article.published_label, "2025-03-04 10:00:00");
        assert_eq!(
            article.image_url.as_deref(),
            Some("https://i-invdn-com.investing.com/news/3.jpg")
        );
    }

    #[test]
    fn test_cdata_and_optional_tags() {
        let body = feed(&["<item>\
            <title><![CDATA[Ether ETF sees record inflows]]></title>\
            <link><![CDATA[https://sa.investing.com/news/cryptocurrency-news/article-77]]></link>\
            <description><![CDATA[<p>Funds took in <b>$1bn</b>.</p>]]></description>\
            <dc:creator>Reuters</dc:creator>\
            </item>"
            .to_string()]);
        let found = extract_items(&extractor(5), &body);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Ether ETF sees record inflows");
        assert_eq!(found[0].description.as_deref(), Some("<p>Funds took in <b>$1bn</b>.</p>"));
        assert_eq!(found[0].author, "Reuters");
        assert_eq!(found[0].published_label, "مؤخراً");
        assert!(found[0].image_url.is_none());
    }

    #[test]
    fn test_escaped_description_markup_is_unwrapped() {
        let body = feed(&["<item>\
            <title>Ether ETF sees record inflows</title>\
            <link>https://sa.investing.com/news/cryptocurrency-news/article-78</link>\
            <description>&lt;p&gt;Funds took in &amp;lt;$1bn&amp;gt;&lt;/p&gt;</description>\
            </item>"
            .to_string()]);
        let found = extract_items(&extractor(5), &body);
        assert_eq!(found[0].description.as_deref(), Some("<p>Funds took in &lt;$1bn&gt;</p>"));
    }

    #[test]
    fn test_invalid_items_do_not_reduce_valid_count() {
        let items = vec![
            "<item><link>https://sa.investing.com/news/cryptocurrency-news/article-90</link></item>"
                .to_string(),
            item(1),
            "<item><title>Missing link but long title</title></item>".to_string(),
            "<item><title>Too short</title><link>https://sa.investing.com/news/cryptocurrency-news/article-91</link></item>"
                .to_string(),
            "<item><title>Unrelated section article</title><link>https://sa.investing.com/news/forex-news/article-92</link></item>"
                .to_string(),
            item(2),
            item(3),
        ];
        let found = extract_items(&extractor(5), &feed(&items));
        assert_eq!(found.len(), 3);
        assert!(found[0].url.ends_with("article-1"));
        assert!(found[2].url.ends_with("article-3"));
    }

    #[test]
    fn test_long_title_synthesizes_truncated_description() {
        let title = "Bitcoin ".repeat(30);
        let body = feed(&[format!(
            "<item><title>{}</title><link>https://sa.investing.com/news/cryptocurrency-news/article-5</link></item>",
            title
        )]);
        let found = extract_items(&extractor(5), &body);
        let description = found[0].description.as_deref().unwrap();
        assert!(description.chars().count() <= SYNTHESIZED_DESCRIPTION_LEN);
        assert!(description.ends_with("..."));
    }

    #[test]
    fn test_malformed_xml_is_tolerated() {
        let body = format!("<rss><channel>{}<item><title>Unclosed item", item(4));
        let found = extract_items(&extractor(5), &body);
        assert_eq!(found.len(), 1);
    }
}
