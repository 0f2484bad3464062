//! Prompt templates and response parsing for the generation capabilities.

use ff_core::{Error, Result, RewrittenCopy};
use lazy_static::lazy_static;
use regex::Regex;

/// Characters of the title that go into the image prompt.
pub const IMAGE_THEME_CHARS: usize = 100;

pub const TITLE_LABEL: &str = "العنوان";
pub const DESCRIPTION_LABEL: &str = "الوصف";

lazy_static! {
    static ref LABELED_LINE: Regex =
        Regex::new(r"^[\s*_#>-]*(العنوان|الوصف)[\s*_]*[:：][\s*_]*(.*?)[\s*_]*$").unwrap();
}

pub fn image_prompt(title: &str) -> String {
    let theme: String = title.chars().take(IMAGE_THEME_CHARS).collect();
    format!(
        "Create a modern, minimal cryptocurrency illustration for a news article. \
         Dark-mode friendly and professional, using abstract crypto symbols and a \
         blockchain network motif. Theme: {}",
        theme.trim()
    )
}

pub const REWRITE_SYSTEM_PROMPT: &str =
    "أنت محرر أخبار مالية محترف تكتب بالعربية الفصحى بأسلوب رسمي وموجز.";

pub fn rewrite_prompt(title: &str, description: &str) -> String {
    format!(
        "أعد صياغة عنوان الخبر ووصفه التاليين بأسلوب رسمي دون تغيير المعنى.\n\
         أجب بسطرين فقط وبالتنسيق التالي حرفياً:\n\
         {t}: <العنوان الجديد>\n\
         {d}: <الوصف الجديد>\n\n\
         {t}: {title}\n\
         {d}: {description}",
        t = TITLE_LABEL,
        d = DESCRIPTION_LABEL,
        title = title,
        description = description
    )
}

/// Reads the two labeled lines back out of a rewrite response.
pub fn parse_rewrite(response: &str) -> Result<RewrittenCopy> {
    let mut title = None;
    let mut description = None;

    for line in response.lines() {
        let Some(caps) = LABELED_LINE.captures(line.trim()) else {
            continue;
        };
        let value = caps[2].trim().to_string();
        if value.is_empty() {
            continue;
        }
        match &caps[1] {
            TITLE_LABEL if title.is_none() => title = Some(value),
            DESCRIPTION_LABEL if description.is_none() => description = Some(value),
            _ => {}
        }
    }

    match (title, description) {
        (Some(title), Some(description)) => Ok(RewrittenCopy { title, description }),
        (None, _) => Err(Error::Enrichment(format!(
            "rewrite response has no {} line",
            TITLE_LABEL
        ))),
        (_, None) => Err(Error::Enrichment(format!(
            "rewrite response has no {} line",
            DESCRIPTION_LABEL
        ))),
    }
}
