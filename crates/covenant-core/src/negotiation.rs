//! Header negotiation.
//!
//! A [`Negotiator`] picks, from a raw request header, the best value the
//! server supports. The returned [`NegotiatedValue`] carries the supported
//! value itself (so downstream code sees the canonical spelling) and the
//! parameters of the matched client entry.
//!
//! Bundled implementations:
//!
//! - [`AcceptNegotiator`] for `Accept` (quality-weighted media ranges)
//! - [`ContentTypeNegotiator`] for `Content-Type` (parameters ignored when
//!   matching, returned as attributes)
//! - [`AcceptLanguageNegotiator`] for `Accept-Language` (language ranges with
//!   primary-subtag fallback)

use indexmap::IndexMap;
use mime::Mime;
use std::cmp::Ordering;

/// Result of a successful negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedValue {
    /// The selected supported value.
    pub value: String,
    /// Parameters of the client entry that matched (e.g. `charset`).
    pub attributes: IndexMap<String, String>,
}

impl NegotiatedValue {
    /// Creates a value with no attributes.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            attributes: IndexMap::new(),
        }
    }
}

/// Selects a supported value for a raw header.
pub trait Negotiator: Send + Sync {
    /// Negotiates `header`, the comma-joined header value.
    fn negotiate(&self, header: &str) -> Option<NegotiatedValue>;

    /// The values this negotiator can select, in preference order.
    fn supported_values(&self) -> &[String];
}

/// One comma-separated entry of a negotiation header.
#[derive(Debug, Clone)]
struct Entry {
    value: String,
    params: IndexMap<String, String>,
    quality: f32,
}

/// Splits a header into entries. Entries with an unparsable quality are
/// dropped.
fn parse_entries(header: &str) -> Vec<Entry> {
    header
        .split(',')
        .filter_map(|raw| {
            let mut parts = raw.split(';').map(str::trim);
            let value = parts.next().filter(|v| !v.is_empty())?.to_string();
            let mut params = IndexMap::new();
            let mut quality = 1.0;
            for part in parts {
                let Some((name, param)) = part.split_once('=') else {
                    continue;
                };
                let name = name.trim().to_ascii_lowercase();
                let param = param.trim().trim_matches('"').to_string();
                if name == "q" {
                    quality = param.parse::<f32>().ok().filter(|q| (0.0..=1.0).contains(q))?;
                } else {
                    params.insert(name, param);
                }
            }
            Some(Entry {
                value,
                params,
                quality,
            })
        })
        .collect()
}

/// Picks the supported value with the best `(quality, specificity)` match.
///
/// `specificity` scores how precisely an entry matches a supported value;
/// `0` means no match. For each supported value the most specific entry
/// decides its quality, so `text/*;q=0, text/html` still accepts HTML. Ties
/// keep server preference order.
fn select<F>(supported: &[String], entries: &[Entry], specificity: F) -> Option<NegotiatedValue>
where
    F: Fn(&Entry, &str) -> u8,
{
    let mut best: Option<(f32, u8, &String, &Entry)> = None;
    for candidate in supported {
        let matched = entries
            .iter()
            .map(|entry| (specificity(entry, candidate), entry))
            .filter(|(score, _)| *score > 0)
            .max_by(|(a, _), (b, _)| a.cmp(b));
        let Some((score, entry)) = matched else {
            continue;
        };
        if entry.quality <= 0.0 {
            continue;
        }
        let better = match &best {
            None => true,
            Some((quality, best_score, _, _)) => {
                match entry.quality.partial_cmp(quality).unwrap_or(Ordering::Equal) {
                    Ordering::Greater => true,
                    Ordering::Equal => score > *best_score,
                    Ordering::Less => false,
                }
            }
        };
        if better {
            best = Some((entry.quality, score, candidate, entry));
        }
    }
    best.map(|(_, _, value, entry)| NegotiatedValue {
        value: value.clone(),
        attributes: entry.params.clone(),
    })
}

fn collect_values<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Into::into).collect()
}

/// Negotiates `Accept` against supported media types.
///
/// ```
/// use covenant_core::{AcceptNegotiator, Negotiator};
///
/// let negotiator = AcceptNegotiator::new(["application/json", "application/xml"]);
/// let chosen = negotiator.negotiate("application/xml;q=0.9, application/*;q=0.1").unwrap();
/// assert_eq!(chosen.value, "application/xml");
/// assert!(negotiator.negotiate("text/html").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct AcceptNegotiator {
    supported: Vec<String>,
}

impl AcceptNegotiator {
    /// Creates a negotiator for the given media types, in preference order.
    pub fn new<I, S>(supported: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            supported: collect_values(supported),
        }
    }
}

/// Scores how specifically `range` matches `media_type`.
fn media_range_score(range: &Mime, media_type: &Mime) -> u8 {
    if range.type_() == mime::STAR && range.subtype() == mime::STAR {
        return 1;
    }
    if range.type_() != media_type.type_() {
        return 0;
    }
    if range.subtype() == mime::STAR {
        return 2;
    }
    if range.subtype() == media_type.subtype() {
        return 4;
    }
    if media_type
        .suffix()
        .is_some_and(|suffix| suffix.as_str() == range.subtype().as_str())
    {
        return 3;
    }
    0
}

impl Negotiator for AcceptNegotiator {
    fn negotiate(&self, header: &str) -> Option<NegotiatedValue> {
        let entries = parse_entries(header);
        select(&self.supported, &entries, |entry, candidate| {
            match (entry.value.parse::<Mime>(), candidate.parse::<Mime>()) {
                (Ok(range), Ok(media_type)) => media_range_score(&range, &media_type),
                _ => 0,
            }
        })
    }

    fn supported_values(&self) -> &[String] {
        &self.supported
    }
}

/// Negotiates `Content-Type` against supported media types.
///
/// Matching compares the media type essence; parameters such as `charset`
/// are returned as attributes.
#[derive(Debug, Clone)]
pub struct ContentTypeNegotiator {
    supported: Vec<String>,
}

impl ContentTypeNegotiator {
    /// Creates a negotiator for the given media types.
    pub fn new<I, S>(supported: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            supported: collect_values(supported),
        }
    }
}

impl Negotiator for ContentTypeNegotiator {
    fn negotiate(&self, header: &str) -> Option<NegotiatedValue> {
        parse_entries(header).into_iter().find_map(|entry| {
            let essence = entry.value.to_ascii_lowercase();
            self.supported
                .iter()
                .find(|supported| supported.eq_ignore_ascii_case(&essence))
                .map(|supported| NegotiatedValue {
                    value: supported.clone(),
                    attributes: entry.params,
                })
        })
    }

    fn supported_values(&self) -> &[String] {
        &self.supported
    }
}

/// Negotiates `Accept-Language` against supported language tags.
///
/// ```
/// use covenant_core::{AcceptLanguageNegotiator, Negotiator};
///
/// let negotiator = AcceptLanguageNegotiator::new(["en", "de-CH"]);
/// assert_eq!(negotiator.negotiate("de, en;q=0.5").unwrap().value, "de-CH");
/// assert_eq!(negotiator.negotiate("en-GB").unwrap().value, "en");
/// ```
#[derive(Debug, Clone)]
pub struct AcceptLanguageNegotiator {
    supported: Vec<String>,
}

impl AcceptLanguageNegotiator {
    /// Creates a negotiator for the given language tags, in preference order.
    pub fn new<I, S>(supported: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            supported: collect_values(supported),
        }
    }
}

/// Scores how specifically a language `range` matches `tag`.
fn language_score(range: &str, tag: &str) -> u8 {
    let range = range.to_ascii_lowercase();
    let tag = tag.to_ascii_lowercase();
    if range == "*" {
        1
    } else if range == tag {
        4
    } else if tag.starts_with(&format!("{range}-")) {
        3
    } else if range.starts_with(&format!("{tag}-")) {
        2
    } else {
        0
    }
}

impl Negotiator for AcceptLanguageNegotiator {
    fn negotiate(&self, header: &str) -> Option<NegotiatedValue> {
        let entries = parse_entries(header);
        select(&self.supported, &entries, |entry, candidate| {
            language_score(&entry.value, candidate)
        })
    }

    fn supported_values(&self) -> &[String] {
        &self.supported
    }
}
