// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTML → plain text
//!
//! Paragraph-first extraction, tried in order:
//! 1. `<p>` elements inside the first `<article>`
//! 2. every `<p>` in the document
//! 3. if that is under the word floor, `<p>` inside the first of
//!    `div.main-content`, `div.content`, `div.post-content`,
//!    `div.entry-content` that yields any text
//! 4. if still under the floor, the text of the first semantic container
//!    (`main`, `[role='main']`, `article`) or `<body>`, minus scripts and
//!    navigation

use scraper::{ElementRef, Html, Selector};

use crate::rag::word_count;

const CONTENT_DIV_CLASSES: &[&str] = &["main-content", "content", "post-content", "entry-content"];
const CONTAINER_SELECTORS: &[&str] = &["main", "[role='main']", "article", "body"];
const NOISE_TAGS: &[&str] = &["script", "style", "noscript", "nav", "header", "footer", "aside"];

/// Extract readable text from an HTML page
///
/// # Arguments
/// * `html` - Raw HTML string
/// * `min_words` - Word floor that decides whether to try the next strategy
/// * `max_chars` - Maximum characters to return
pub fn extract_main_content(html: &str, min_words: usize, max_chars: usize) -> String {
    let document = Html::parse_document(html);

    let mut text = match first_match(&document, "article") {
        Some(article) => paragraphs_within(&article),
        None => all_paragraphs(&document),
    };

    if word_count(&text) < min_words {
        for class_name in CONTENT_DIV_CLASSES {
            let selector = format!("div.{}", class_name);
            if let Some(div) = first_match(&document, &selector) {
                let candidate = paragraphs_within(&div);
                if !candidate.is_empty() {
                    text = candidate;
                    break;
                }
            }
        }
    }

    if word_count(&text) < min_words {
        if let Some(fallback) = container_text(&document) {
            if word_count(&fallback) > word_count(&text) {
                text = fallback;
            }
        }
    }

    truncate_content(&text, max_chars)
}

/// Text of the `<title>` element, if present
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    first_match(&document, "title")
        .map(|el| clean_text(&el.text().collect::<Vec<_>>().join(" ")))
        .filter(|title| !title.is_empty())
}

fn first_match<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

fn paragraphs_within(element: &ElementRef) -> String {
    let Ok(selector) = Selector::parse("p") else {
        return String::new();
    };
    join_paragraphs(element.select(&selector))
}

fn all_paragraphs(document: &Html) -> String {
    let Ok(selector) = Selector::parse("p") else {
        return String::new();
    };
    join_paragraphs(document.select(&selector))
}

fn join_paragraphs<'a>(paragraphs: impl Iterator<Item = ElementRef<'a>>) -> String {
    paragraphs
        .map(|p| clean_text(&p.text().collect::<Vec<_>>().join(" ")))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first semantic container, skipping noise elements
fn container_text(document: &Html) -> Option<String> {
    CONTAINER_SELECTORS.iter().find_map(|selector| {
        let element = first_match(document, selector)?;
        let text = text_without_noise(&element);
        (!text.is_empty()).then_some(text)
    })
}

fn text_without_noise(element: &ElementRef) -> String {
    let mut parts = Vec::new();
    collect_text(element, &mut parts);
    clean_text(&parts.join(" "))
}

fn collect_text<'a>(element: &ElementRef<'a>, parts: &mut Vec<&'a str>) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            if !NOISE_TAGS.contains(&child_element.value().name()) {
                collect_text(&child_element, parts);
            }
        } else if let Some(text) = child.value().as_text() {
            parts.push(&**text);
        }
    }
}

/// Collapse whitespace runs and trim
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max_chars` characters, preserving word boundaries
pub fn truncate_content(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut = text
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let truncated = &text[..cut];
    match truncated.rfind(' ') {
        Some(last_space) => text[..last_space].to_string(),
        None => truncated.to_string(),
    }
}
