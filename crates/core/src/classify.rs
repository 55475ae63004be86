use crate::config::KeywordConfig;
use crate::domain::proposal::Category;

/// Hints this short carry no category information.
const MIN_MEANINGFUL_HINT_LEN: usize = 3;

/// True when `text` holds `TS` as a standalone word, any case.
///
/// Word characters are alphanumerics and `_`, so `(TS)` and `TS-12` match
/// while `TSA` or `PLOTS` do not.
pub fn has_ts_token(text: &str) -> bool {
    text.split(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
        .any(|word| word.eq_ignore_ascii_case("ts"))
}

/// Maps a proposal title and its raw category hint to a [`Category`].
///
/// First match wins: a `TS` title means works; then configured keywords are
/// looked up in the hint and, failing that, in the title; otherwise the hint
/// itself becomes an `Other` label when it is meaningful.
pub fn classify(title: &str, hint: &str, keywords: &KeywordConfig) -> Category {
    if has_ts_token(title) {
        return Category::Works;
    }

    if let Some(category) = keyword_category(hint, keywords) {
        return category;
    }
    if let Some(category) = keyword_category(title, keywords) {
        return category;
    }

    let label = hint.trim().to_uppercase();
    let is_placeholder =
        keywords.placeholders.iter().any(|placeholder| placeholder.trim().to_uppercase() == label);
    if label.chars().count() >= MIN_MEANINGFUL_HINT_LEN && !is_placeholder {
        Category::Other(label)
    } else {
        Category::other()
    }
}

fn keyword_category(text: &str, keywords: &KeywordConfig) -> Option<Category> {
    let haystack = text.to_uppercase();
    if haystack.trim().is_empty() {
        return None;
    }

    let ordered = [
        (&keywords.maintenance, Category::Maintenance),
        (&keywords.works, Category::Works),
        (&keywords.design, Category::Design),
    ];

    ordered.into_iter().find_map(|(list, category)| {
        list.iter()
            .map(|keyword| keyword.trim().to_uppercase())
            .any(|keyword| !keyword.is_empty() && haystack.contains(&keyword))
            .then_some(category)
    })
}
