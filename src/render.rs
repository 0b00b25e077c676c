//! Markdown rendering of the digest page.

use chrono::{DateTime, Utc};

use crate::aggregate::NewsItem;
use crate::config::FeedSource;
use crate::parser::parse_date;

const UNKNOWN_DATE: &str = "Unknown date";

/// Renders the full page: front matter, banner, link table, one block per
/// item, footer.
///
/// `directory` lists one feed per authority; it drives the link table and
/// the source names in the header and footer regardless of which feeds
/// produced items.
pub fn render(
    items: &[NewsItem],
    directory: &[&FeedSource],
    generated_at: DateTime<Utc>,
) -> String {
    let updated = format_timestamp(&generated_at);
    let names: Vec<&str> = directory.iter().map(|feed| feed.source.as_str()).collect();

    let mut md = String::new();

    md.push_str("---\n");
    md.push_str("description: >-\n");
    md.push_str(&format!(
        "  Automatisch bijgewerkte regulatory news feed van {}.\n",
        join_dutch(&names)
    ));
    md.push_str(&format!("  Laatste update: {}\n", updated));
    md.push_str("---\n\n");

    md.push_str("# 📰 Regulatory News Feed\n\n");
    md.push_str(&format!("> **Laatste update:** {}\n", updated));
    md.push_str("> \n");
    md.push_str(
        "> Deze pagina wordt automatisch bijgewerkt via RSS feeds van de financiële toezichthouders.\n\n",
    );

    md.push_str("## Directe links\n\n");
    md.push_str("| Toezichthouder | Nieuwspagina |\n");
    md.push_str("|---|---|\n");
    for feed in directory {
        md.push_str(&format!(
            "| {} | [{}]({}) |\n",
            bold_source(feed),
            feed.display.as_deref().unwrap_or_else(|| display_url(&feed.website)),
            feed.website
        ));
    }
    md.push_str("\n---\n\n");

    md.push_str("## Laatste nieuws\n\n");
    for item in items {
        md.push_str(&render_item(item));
    }

    md.push_str(&format!(
        "\n*Deze pagina wordt automatisch gegenereerd. Bronnen: {} RSS feeds.*\n",
        names.join(", ")
    ));

    md
}

fn render_item(item: &NewsItem) -> String {
    let mut block = format!("### {} {}\n\n", item.label, item.title);
    block.push_str(&format!("**{}** · {}\n\n", item_date(item), item.category));
    if !item.description.is_empty() {
        block.push_str(&format!("{}\n\n", item.description));
    }
    if !item.link.is_empty() {
        block.push_str(&format!("🔗 [Lees meer →]({})\n\n", item.link));
    }
    block.push_str("---\n\n");
    block
}

/// Medium date, e.g. "5 Mar 2024".
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%-d %b %Y").to_string()
}

/// The feed's own date text decides what is shown; items whose feed gave no
/// date show the time they were stamped with.
fn item_date(item: &NewsItem) -> String {
    match item.raw_date.as_deref() {
        Some(raw) => format_date_text(raw),
        None => format_date(&item.date),
    }
}

/// Formats a raw feed date, or [`UNKNOWN_DATE`] when it cannot be read.
fn format_date_text(raw: &str) -> String {
    parse_date(raw)
        .map(|date| format_date(&date))
        .unwrap_or_else(|| UNKNOWN_DATE.to_string())
}

/// Long timestamp for the banner, e.g. "19 October 2026 at 14:05 UTC".
pub fn format_timestamp(date: &DateTime<Utc>) -> String {
    date.format("%-d %B %Y at %H:%M UTC").to_string()
}

/// "🟢 AFM" becomes "🟢 **AFM**"; labels without the source name are bolded whole.
fn bold_source(feed: &FeedSource) -> String {
    if feed.label.contains(&feed.source) {
        feed.label
            .replacen(&feed.source, &format!("**{}**", feed.source), 1)
    } else {
        format!("**{}**", feed.label)
    }
}

/// Link text without scheme, `www.` and trailing slash.
fn display_url(url: &str) -> &str {
    let url = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let url = url.strip_prefix("www.").unwrap_or(url);
    url.trim_end_matches('/')
}

/// "A, B, C en D"
fn join_dutch(names: &[&str]) -> String {
    match names {
        [] => String::new(),
        [only] => only.to_string(),
        [rest @ .., last] => format!("{} en {}", rest.join(", "), last),
    }
}
