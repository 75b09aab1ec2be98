//! WordPress export input
//!
//! Walks every `item` element of the export file. Attachment items
//! contribute their attachment URL; embedded HTML content contributes every
//! `href=`/`src=` attribute value. Only absolute http(s) URLs are kept, and
//! duplicates are dropped while preserving first-seen order.

use crate::input::InputResult;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

fn url_attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)(?:href|src)=["']([^"']+)"#).expect("hard-coded pattern compiles")
    })
}

/// Which child of the current item is being accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    PostType,
    AttachmentUrl,
    Content,
}

/// Extracts the URL list from a WordPress export file.
pub fn read_urls_from_export(path: &Path) -> InputResult<Vec<String>> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let mut reader = Reader::from_str(&text);

    let mut urls: Vec<String> = Vec::new();
    let mut in_item = false;
    let mut post_type = String::new();
    let mut attachment_url = String::new();
    let mut contents: Vec<String> = Vec::new();
    let mut capture: Option<Field> = None;
    let mut buffer = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"item" => {
                    in_item = true;
                    post_type.clear();
                    attachment_url.clear();
                    contents.clear();
                }
                b"post_type" if in_item => {
                    capture = Some(Field::PostType);
                    buffer.clear();
                }
                b"attachment_url" if in_item => {
                    capture = Some(Field::AttachmentUrl);
                    buffer.clear();
                }
                b"encoded" if in_item => {
                    capture = Some(Field::Content);
                    buffer.clear();
                }
                _ => {}
            },
            Event::End(e) => match (e.local_name().as_ref(), capture) {
                (b"item", _) => {
                    if post_type.trim() == "attachment" && !attachment_url.trim().is_empty() {
                        push_if_http(&mut urls, attachment_url.trim());
                    }
                    for content in &contents {
                        for caps in url_attr_regex().captures_iter(content) {
                            push_if_http(&mut urls, &caps[1]);
                        }
                    }
                    in_item = false;
                }
                (b"post_type", Some(Field::PostType)) => {
                    post_type = std::mem::take(&mut buffer);
                    capture = None;
                }
                (b"attachment_url", Some(Field::AttachmentUrl)) => {
                    attachment_url = std::mem::take(&mut buffer);
                    capture = None;
                }
                (b"encoded", Some(Field::Content)) => {
                    contents.push(std::mem::take(&mut buffer));
                    capture = None;
                }
                _ => {}
            },
            Event::Text(t) if capture.is_some() => buffer.push_str(&t.unescape()?),
            Event::CData(t) if capture.is_some() => {
                buffer.push_str(&String::from_utf8_lossy(&t))
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(dedupe_keeping_order(urls))
}

/// Keeps absolute http(s) URLs only.
fn push_if_http(urls: &mut Vec<String>, candidate: &str) {
    let candidate = candidate.trim();
    let lower = candidate.to_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        urls.push(candidate.to_string());
    }
}

fn dedupe_keeping_order(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|url| seen.insert(url.clone()))
        .collect()
}
