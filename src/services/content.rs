// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Markdown and HTML conversion.
//!
//! All functions are total: malformed input produces best-effort output.

use crate::models::ContentFormat;
use pulldown_cmark::{html, Options, Parser};

/// Render CommonMark (plus tables, strikethrough and task lists) to HTML.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Convert HTML back to markdown.
pub fn html_to_markdown(html: &str) -> String {
    match htmd::convert(html) {
        Ok(markdown) => markdown,
        Err(e) => {
            tracing::warn!(error = %e, "HTML to markdown conversion failed, returning input");
            html.to_string()
        }
    }
}

pub fn convert(content: &str, from: ContentFormat, to: ContentFormat) -> String {
    match (from, to) {
        (ContentFormat::Markdown, ContentFormat::Markdown)
        | (ContentFormat::Html, ContentFormat::Html) => content.to_string(),
        (ContentFormat::Markdown, ContentFormat::Html) => markdown_to_html(content),
        (ContentFormat::Html, ContentFormat::Markdown) => html_to_markdown(content),
    }
}
