use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::classify::has_ts_token;

pub const TS_TYPOLOGY: &str = "Maintenance TS";
const ANIMATION: &str = "ANIMATION";

/// Typology tags of a proposal and the one tag its amount is booked under.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypologyAllocation {
    /// Counted tags, deduplicated case-insensitively in first-seen order.
    pub tags: Vec<String>,
    pub primary: Option<String>,
}

/// Splits a raw tag list on commas only, so multi-word tags survive.
pub fn parse_tags(raw: &str, placeholders: &[String]) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty() && !tag.eq_ignore_ascii_case("nan"))
        .filter(|tag| {
            !placeholders.iter().any(|placeholder| placeholder.trim().eq_ignore_ascii_case(tag))
        })
        .map(str::to_string)
        .collect()
}

pub fn has_ts(title: &str) -> bool {
    has_ts_token(title)
}

fn is_ts_tag(tag: &str) -> bool {
    has_ts_token(tag)
}

fn is_animation_tag(tag: &str) -> bool {
    tag.to_uppercase().contains(ANIMATION)
}

/// Adds the TS tag when the title says TS and no tag already does.
pub fn inject_ts_tag(mut tags: Vec<String>, title: &str) -> Vec<String> {
    if has_ts(title) && !tags.iter().any(|tag| is_ts_tag(tag)) {
        tags.push(TS_TYPOLOGY.to_string());
    }
    tags
}

/// Tag the amount is attributed to: any TS tag, else the first non-animation
/// tag, else the first tag.
pub fn primary_typology(tags: &[String]) -> Option<String> {
    if let Some(tag) = tags.iter().find(|tag| is_ts_tag(tag)) {
        if tag.eq_ignore_ascii_case("TS") {
            return Some(TS_TYPOLOGY.to_string());
        }
        return Some(tag.clone());
    }

    if tags.len() > 1 {
        if let Some(tag) = tags.iter().find(|tag| !is_animation_tag(tag)) {
            return Some(tag.clone());
        }
    }

    tags.first().cloned()
}

pub fn allocate_typology(
    raw: Option<&str>,
    title: &str,
    placeholders: &[String],
) -> TypologyAllocation {
    let tags = inject_ts_tag(parse_tags(raw.unwrap_or_default(), placeholders), title);
    let primary = primary_typology(&tags);

    let mut seen = HashSet::new();
    let tags = tags.into_iter().filter(|tag| seen.insert(tag.to_uppercase())).collect();

    TypologyAllocation { tags, primary }
}
