use serde::Deserialize;
use std::fmt;

/// Nature of a news item, either guessed from its text or fixed per feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum Category {
    Consultation,
    Warning,
    Enforcement,
    Guidance,
    Publication,
    Speech,
    News,
}

/// Keyword sets in precedence order, Dutch and English. First match wins.
const RULES: &[(Category, &[&str])] = &[
    (Category::Consultation, &["consultation", "consultatie"]),
    (Category::Warning, &["warning", "waarschuwing"]),
    (Category::Enforcement, &["enforcement", "boete", "fine"]),
    (Category::Guidance, &["guideline", "guidance", "leidraad"]),
    (Category::Publication, &["report", "publication", "rapport"]),
    (Category::Speech, &["speech", "toespraak"]),
];

impl Category {
    pub fn label(self) -> &'static str {
        match self {
            Category::Consultation => "Consultation",
            Category::Warning => "Warning",
            Category::Enforcement => "Enforcement",
            Category::Guidance => "Guidance",
            Category::Publication => "Publication",
            Category::Speech => "Speech",
            Category::News => "News",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Category::Consultation => "📋",
            Category::Warning => "🔔",
            Category::Enforcement => "⚖️",
            Category::Guidance => "📖",
            Category::Publication => "📊",
            Category::Speech => "🎤",
            Category::News => "📰",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.icon(), self.label())
    }
}

/// Guesses a category from an item's title and description.
///
/// Matching is a case-insensitive substring scan, so "fine" also hits
/// "define". Anything without a keyword is [`Category::News`].
pub fn classify(title: &str, description: &str) -> Category {
    let text = format!("{} {}", title, description).to_lowercase();

    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| text.contains(*kw)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::News)
}
