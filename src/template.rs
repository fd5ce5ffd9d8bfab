//! Path template interpolation
//!
//! Child resources are addressed by paths such as `/invoices/{invoice_id}`
//! whose placeholders are filled from the parent-derived [`RequestContext`].

use crate::error::{Error, Result};
use crate::types::RequestContext;
use regex::Regex;
use std::sync::LazyLock;

/// Regex for matching path placeholders: {name}
static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\s*([a-zA-Z_][a-zA-Z0-9_]*)\s*\}").unwrap());

/// Render a path template with the given context
///
/// Every placeholder must be defined by the context; the names of all
/// undefined ones are reported together.
pub fn render(template: &str, ctx: &RequestContext) -> Result<String> {
    let mut errors = Vec::new();

    let rendered = PLACEHOLDER_REGEX.replace_all(template, |cap: &regex::Captures<'_>| {
        let name = &cap[1];
        match ctx.get(name) {
            Some(value) => value.to_string(),
            None => {
                errors.push(name.to_string());
                String::new()
            }
        }
    });

    if errors.is_empty() {
        Ok(rendered.into_owned())
    } else {
        Err(Error::undefined_var(errors.join(", ")))
    }
}

/// Extract all placeholder names from a template, in order of appearance
pub fn placeholders(template: &str) -> Vec<String> {
    PLACEHOLDER_REGEX
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect()
}
