//! Sustainable Development Goal tag parsing

/// Parse a free-text goals field into canonical `SDG {n}` tags.
///
/// The field is split on commas; each token contributes its first run of
/// digits, so `"SDG 1 - No Poverty"` and `"1"` both become `"SDG 1"` and
/// `"SDG 3.4"` becomes `"SDG 3"`. Tokens without digits are dropped. Tags keep first-seen order and are
/// deduplicated. A blank field yields no tags.
pub fn parse_sdgs(field: &str) -> Vec<String> {
    if field.trim().is_empty() {
        return Vec::new();
    }

    let mut tags: Vec<String> = Vec::new();
    for token in field.split(',') {
        let digits = leading_digit_run(token.trim());
        if digits.is_empty() {
            continue;
        }
        let tag = format!("SDG {digits}");
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

fn leading_digit_run(token: &str) -> &str {
    let Some(start) = token.find(|c: char| c.is_ascii_digit()) else {
        return "";
    };
    let rest = &token[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    &rest[..end]
}

/// Column name of the presence flag for a tag: `"SDG 13"` → `"Has_SDG_13"`
pub fn flag_column_name(tag: &str) -> String {
    format!("Has_{}", tag.replace(' ', "_"))
}
