//! Content extraction from a page snapshot.
//!
//! Walks an ordered list of semantic container selectors, falls back to
//! the whole body, strips chrome/boilerplate subtrees, collapses
//! whitespace, and truncates the text for transmission while keeping the
//! full length for word-count and reading-time estimates.

use anyhow::{bail, Result};

use crate::models::{ContentSnapshot, ContentType};

use super::bridge::{PageNode, PageSnapshot};

/// Truncation cap for transmitted text.
pub const MAX_EXTRACT_CHARS: usize = 5000;

#[derive(Debug, Clone, Copy)]
enum Selector {
    Tag(&'static str),
    Role(&'static str),
    Class(&'static str),
    Id(&'static str),
}

/// Tried in order; first match wins.
const CONTENT_SELECTORS: &[Selector] = &[
    Selector::Tag("article"),
    Selector::Role("main"),
    Selector::Tag("main"),
    Selector::Class("article-content"),
    Selector::Class("post-content"),
    Selector::Class("entry-content"),
    Selector::Id("content"),
];

const STRIP_TAGS: &[&str] = &["nav", "footer", "aside", "script", "style", "iframe"];

const AD_CLASS_MARKERS: &[&str] = &["ad", "ads", "advert", "advertisement", "sponsor", "promo"];

fn matches(node: &PageNode, selector: Selector) -> bool {
    match selector {
        Selector::Tag(tag) => node.tag.eq_ignore_ascii_case(tag),
        Selector::Role(role) => node
            .role
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case(role)),
        Selector::Class(class) => node.classes.iter().any(|c| c.eq_ignore_ascii_case(class)),
        Selector::Id(id) => node.id.as_deref().is_some_and(|i| i.eq_ignore_ascii_case(id)),
    }
}

fn find_first<'a>(node: &'a PageNode, selector: Selector) -> Option<&'a PageNode> {
    if matches(node, selector) {
        return Some(node);
    }
    node.children
        .iter()
        .find_map(|child| find_first(child, selector))
}

fn is_stripped(node: &PageNode) -> bool {
    if STRIP_TAGS.iter().any(|tag| node.tag.eq_ignore_ascii_case(tag)) {
        return true;
    }
    node.classes.iter().any(|class| {
        let class = class.to_ascii_lowercase();
        AD_CLASS_MARKERS.iter().any(|marker| *marker == class)
    })
}

fn collect_text(node: &PageNode, out: &mut String) {
    if is_stripped(node) {
        return;
    }
    if !node.text.is_empty() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&node.text);
    }
    for child in &node.children {
        collect_text(child, out);
    }
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

pub fn domain_of(url: &str) -> String {
    let without_scheme = url.split("://").nth(1).unwrap_or(url);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(without_scheme);
    host.trim_start_matches("www.").to_ascii_lowercase()
}

fn infer_content_type(snapshot: &PageSnapshot, domain: &str) -> ContentType {
    if let Some(hint) = snapshot.content_type_hint {
        return hint;
    }

    const VIDEO_DOMAINS: &[&str] = &["youtube.com", "vimeo.com", "twitch.tv"];
    const SOCIAL_DOMAINS: &[&str] = &[
        "twitter.com",
        "x.com",
        "facebook.com",
        "instagram.com",
        "reddit.com",
        "tiktok.com",
        "bsky.app",
    ];

    if VIDEO_DOMAINS.iter().any(|d| domain.ends_with(d)) {
        return ContentType::Video;
    }
    if SOCIAL_DOMAINS.iter().any(|d| domain.ends_with(d)) {
        return ContentType::SocialPost;
    }
    if domain.contains("podcast") {
        return ContentType::Podcast;
    }
    if find_first(&snapshot.body, Selector::Tag("article")).is_some() {
        return ContentType::Article;
    }
    ContentType::Webpage
}

/// Extract a `ContentSnapshot` from the bridge's page snapshot. Failure
/// here suppresses both the analysis trigger and consumption logging for
/// the page view.
pub fn extract_content(snapshot: &PageSnapshot) -> Result<ContentSnapshot> {
    let container = CONTENT_SELECTORS
        .iter()
        .find_map(|selector| find_first(&snapshot.body, *selector))
        .unwrap_or(&snapshot.body);

    let mut raw = String::new();
    collect_text(container, &mut raw);
    let full_text = collapse_whitespace(&raw);

    if full_text.is_empty() {
        bail!("no extractable text on {}", snapshot.url);
    }

    let domain = domain_of(&snapshot.url);
    let content_type = infer_content_type(snapshot, &domain);
    let word_count = full_text.split_whitespace().count();
    let full_text_len = full_text.chars().count();

    Ok(ContentSnapshot {
        url: snapshot.url.clone(),
        domain,
        title: snapshot.title.clone(),
        author: snapshot.author.clone(),
        publish_date: snapshot.publish_date,
        content_type,
        word_count,
        full_text_len,
        extracted_text: truncate_chars(&full_text, MAX_EXTRACT_CHARS),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn page(body: PageNode) -> PageSnapshot {
        PageSnapshot {
            url: "https://news.example.com/story".into(),
            title: "A Story".into(),
            author: Some("Jo Writer".into()),
            publish_date: None,
            content_type_hint: None,
            body,
        }
    }

    #[test]
    fn prefers_article_container_over_body_noise() {
        let body = PageNode::new("body")
            .with_child(PageNode::new("nav").with_text("Home About Contact"))
            .with_child(PageNode::new("article").with_text("The actual story text."))
            .with_child(PageNode::new("footer").with_text("Copyright"));

        let content = extract_content(&page(body)).unwrap();
        assert_eq!(content.extracted_text, "The actual story text.");
        assert_eq!(content.content_type, ContentType::Article);
    }

    #[test]
    fn strips_chrome_and_ads_inside_container() {
        let body = PageNode::new("body").with_child(
            PageNode::new("article")
                .with_child(PageNode::new("p").with_text("First   paragraph."))
                .with_child(PageNode::new("div").with_class("ad").with_text("Buy now"))
                .with_child(PageNode::new("script").with_text("var x = 1;"))
                .with_child(PageNode::new("p").with_text("Second paragraph.")),
        );

        let content = extract_content(&page(body)).unwrap();
        assert_eq!(content.extracted_text, "First paragraph. Second paragraph.");
        assert_eq!(content.word_count, 4);
    }

    #[test]
    fn falls_back_to_body_when_no_container_matches() {
        let body = PageNode::new("body").with_child(PageNode::new("div").with_text("Plain page."));
        let content = extract_content(&page(body)).unwrap();
        assert_eq!(content.extracted_text, "Plain page.");
        assert_eq!(content.content_type, ContentType::Webpage);
    }

    #[test]
    fn empty_page_is_an_extraction_failure() {
        let body = PageNode::new("body").with_child(PageNode::new("nav").with_text("menu"));
        assert!(extract_content(&page(body)).is_err());
    }

    #[test]
    fn long_text_truncates_for_transmission_but_keeps_full_length() {
        let text = "word ".repeat(2000);
        let body = PageNode::new("body")
            .with_child(PageNode::new("article").with_text(text.trim_end()));

        let content = extract_content(&page(body)).unwrap();
        assert_eq!(content.extracted_text.chars().count(), MAX_EXTRACT_CHARS);
        assert_eq!(content.word_count, 2000);
        assert!(content.full_text_len > MAX_EXTRACT_CHARS);
        // 2000 words at 200 wpm = 10 minutes
        assert_eq!(content.estimated_reading_secs(), 600);
    }

    #[test]
    fn domain_heuristics_classify_video_and_social() {
        let mut snapshot = page(PageNode::new("body").with_child(
            PageNode::new("div").with_text("some description text for the watch page"),
        ));
        snapshot.url = "https://www.youtube.com/watch?v=abc".into();
        assert_eq!(
            extract_content(&snapshot).unwrap().content_type,
            ContentType::Video
        );

        snapshot.url = "https://reddit.com/r/rust/comments/1".into();
        assert_eq!(
            extract_content(&snapshot).unwrap().content_type,
            ContentType::SocialPost
        );
    }

    #[test]
    fn domain_strips_scheme_and_www() {
        assert_eq!(domain_of("https://www.Example.com/a/b?q=1"), "example.com");
        assert_eq!(domain_of("example.org/path"), "example.org");
    }
}
