//! Response parsers for the legacy endpoints.
//!
//! Everything here is pure text in, values out, so it can be tested against
//! fabricated documents without touching the network.

use std::borrow::Cow;
use std::sync::LazyLock;

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use regex::{Captures, Regex};

use super::error::ExtractorError;

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static NUMERIC_ENTITY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(?:[xX]([0-9a-fA-F]+)|([0-9]+));").unwrap());
static PAGE_TITLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title>").unwrap());
static LIVE_TITLE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<h1\b[^>]*\bclass\s*=\s*["'][^"']*\btitle_text\b[^"']*["'][^>]*>(.*?)</h1>"#)
        .unwrap()
});
static SEGMENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(/content/[0-9]+/lv[^.]*\.f4v)/").unwrap());

/// Site suffixes appended to every watch page title.
const TITLE_SUFFIXES: [&str; 2] = ["- ニコニコ動画:GINZA", "- ニコニコ動画"];

/// Extract the stream URL from a flat video-info response.
///
/// The body is a percent-encoded query string, sometimes wrapped in a
/// minimal HTML document.
pub fn parse_flat_info(body: &str) -> Result<String, ExtractorError> {
    let text = html_text(body);
    let pairs = parse_query(text.trim())?;
    pairs
        .into_iter()
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value)
        .ok_or_else(|| ExtractorError::parse("flat video info has no `url` key"))
}

/// Decode an `application/x-www-form-urlencoded` string, rejecting
/// malformed percent escapes.
pub fn parse_query(query: &str) -> Result<Vec<(String, String)>, ExtractorError> {
    query
        .split('&')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (key, value) = part.split_once('=').unwrap_or((part, ""));
            Ok((unescape_component(key)?, unescape_component(value)?))
        })
        .collect()
}

fn unescape_component(raw: &str) -> Result<String, ExtractorError> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return Err(ExtractorError::parse(format!(
                    "invalid percent escape in `{raw}`"
                )));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(Cow::into_owned)
        .map_err(|e| ExtractorError::parse(format!("query component is not utf-8: {e}")))
}

/// Text content of an HTML fragment: tags dropped, entities decoded.
pub fn html_text(fragment: &str) -> String {
    let stripped = TAG_REGEX.replace_all(fragment, "");
    decode_entities(&stripped)
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_owned();
    }
    let numeric = NUMERIC_ENTITY_REGEX.replace_all(text, |caps: &Captures| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (_, Some(dec)) => dec.as_str().parse::<u32>().ok(),
            _ => None,
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_owned())
    });
    numeric
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

/// Text of the page's `<title>` element.
pub fn extract_page_title(html: &str) -> Option<String> {
    PAGE_TITLE_REGEX
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| html_text(m.as_str()))
}

/// Turn a watch page title into something usable as a file name.
///
/// Strips the site suffixes, replaces path separators with `_` and trims.
pub fn normalize_title(title: &str) -> String {
    let mut title = title.to_owned();
    for suffix in TITLE_SUFFIXES {
        title = title.replace(suffix, "");
    }
    title.replace(['/', '\\'], "_").trim().to_owned()
}

/// Title of a live watch page, read from the `h1.title_text` heading.
///
/// When the heading appears more than once the last one wins.
pub fn extract_live_title(html: &str) -> Option<String> {
    LIVE_TITLE_REGEX
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .last()
        .map(|m| html_text(m.as_str()).trim().to_owned())
}

/// Scalar fields of a live player status document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerStatus {
    pub rtmp_url: String,
    pub ticket: String,
    pub que: String,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Url,
    Ticket,
    Que,
    Code,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"url" => Some(Self::Url),
            b"ticket" => Some(Self::Ticket),
            b"que" => Some(Self::Que),
            b"code" => Some(Self::Code),
            _ => None,
        }
    }
}

/// Parse a live player status document.
///
/// `url` and `ticket` take the first matching element; the texts of all
/// `que` elements are joined in document order. A root carrying
/// `status="fail"` is reported with its error code.
pub fn parse_player_status(xml: &str) -> Result<PlayerStatus, ExtractorError> {
    let mut reader = Reader::from_str(xml);

    let mut status = PlayerStatus::default();
    let mut ques: Vec<String> = Vec::new();
    let mut seen = (false, false);
    let mut failed = false;
    let mut error_code = String::new();
    let mut saw_root = false;

    let mut depth = 0usize;
    // (field, depth it was opened at, collected text)
    let mut capture: Option<(Field, usize, String)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                if !saw_root {
                    saw_root = true;
                    failed = root_failed(&e)?;
                }
                if capture.is_none()
                    && let Some(field) = Field::from_name(e.local_name().as_ref())
                {
                    capture = Some((field, depth, String::new()));
                }
            }
            Event::Empty(e) => {
                if !saw_root {
                    saw_root = true;
                    failed = root_failed(&e)?;
                }
            }
            Event::Text(t) => {
                if let Some((_, _, text)) = capture.as_mut() {
                    match t.unescape() {
                        Ok(s) => text.push_str(&s),
                        Err(_) => text.push_str(&String::from_utf8_lossy(&t)),
                    }
                }
            }
            Event::CData(c) => {
                if let Some((_, _, text)) = capture.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) => {
                if let Some((field, opened_at, _)) = capture.as_ref()
                    && *opened_at == depth
                {
                    let field = *field;
                    let text = capture.take().map(|(_, _, t)| t).unwrap_or_default();
                    match field {
                        Field::Url if !seen.0 => {
                            status.rtmp_url = text.trim().to_owned();
                            seen.0 = true;
                        }
                        Field::Ticket if !seen.1 => {
                            status.ticket = text.trim().to_owned();
                            seen.1 = true;
                        }
                        Field::Que => ques.push(text),
                        Field::Code if error_code.is_empty() => {
                            error_code = text.trim().to_owned();
                        }
                        _ => {}
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(ExtractorError::parse("player status document has no root element"));
    }
    if failed {
        let code = if error_code.is_empty() {
            "unknown"
        } else {
            error_code.as_str()
        };
        return Err(ExtractorError::parse(format!(
            "player status request failed: {code}"
        )));
    }

    status.que = ques.join("\n");
    Ok(status)
}

fn root_failed(root: &quick_xml::events::BytesStart<'_>) -> Result<bool, ExtractorError> {
    for attr in root.attributes().flatten() {
        if attr.key.as_ref() == b"status" {
            return Ok(attr.unescape_value()? == "fail");
        }
    }
    Ok(false)
}

/// Segment paths embedded in a `que` blob, in the order they appear.
///
/// Matches `/content/<digits>/lv<...>.f4v` followed by a slash and keeps
/// the path without that slash. No match yields an empty list.
pub fn extract_segments(que: &str) -> Vec<String> {
    SEGMENT_REGEX
        .captures_iter(que)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())
        .collect()
}
