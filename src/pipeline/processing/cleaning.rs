use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::Completeness;

static STRIPPED_SYMBOLS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[®*,]").expect("valid symbol pattern"));
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Clean a menu item name.
///
/// One pass strips a single leading `"`, a single trailing `"` unless a
/// digit precedes it (size markers like `6"` survive), removes `®`, `*` and
/// `,`, and collapses whitespace. Passes repeat until the text stops
/// changing, so `clean_identifier(clean_identifier(s)) == clean_identifier(s)`.
pub fn clean_identifier(raw: &str) -> String {
    let mut current = raw.to_string();
    loop {
        let next = clean_pass(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn clean_pass(raw: &str) -> String {
    let mut name = raw;

    if let Some(rest) = name.strip_prefix('"') {
        name = rest.trim();
    }

    if let Some(rest) = name.strip_suffix('"') {
        let size_marker = rest.chars().last().is_some_and(|c| c.is_ascii_digit());
        if !size_marker {
            name = rest.trim();
        }
    }

    let without_symbols = STRIPPED_SYMBOLS.replace_all(name, "");
    let collapsed = WHITESPACE_RUN.replace_all(without_symbols.trim(), " ");
    collapsed.trim().to_string()
}

/// Keep only rows with every value present, in their original order.
pub fn filter_complete<R: Completeness>(rows: Vec<R>) -> Vec<R> {
    rows.into_iter().filter(Completeness::is_complete).collect()
}
