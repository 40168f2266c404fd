/// FITS header: ordered 80-column cards with typed values.

use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum HeaderValue {
    String(String),
    Integer(i64),
    Float(f64),
    Logical(bool),
    Undefined,
}

impl HeaderValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Float(v) => Some(*v),
            HeaderValue::Integer(v) => Some(*v as f64),
            // Some writers quote numeric values
            HeaderValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HeaderValue::Integer(v) => Some(*v),
            HeaderValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::String(s) => write!(f, "{}", s),
            HeaderValue::Integer(v) => write!(f, "{}", v),
            // Debug keeps the trailing ".0" on integral floats
            HeaderValue::Float(v) => write!(f, "{:?}", v),
            HeaderValue::Logical(true) => write!(f, "True"),
            HeaderValue::Logical(false) => write!(f, "False"),
            HeaderValue::Undefined => Ok(()),
        }
    }
}

/// One header card. COMMENT/HISTORY cards carry their text as a string value.
#[derive(Clone, Debug, PartialEq)]
pub struct Card {
    pub keyword: String,
    pub value: HeaderValue,
    pub comment: Option<String>,
}

impl Card {
    pub fn new(keyword: &str, value: HeaderValue) -> Self {
        Card {
            keyword: keyword.trim().to_ascii_uppercase(),
            value,
            comment: None,
        }
    }

    pub fn is_commentary(&self) -> bool {
        matches!(self.keyword.as_str(), "COMMENT" | "HISTORY")
    }
}

#[derive(Clone, Debug, Default)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    /// Replace the value of an existing keyword, or append a new card.
    pub fn set(&mut self, keyword: &str, value: HeaderValue) {
        let card = Card::new(keyword, value);
        match self
            .cards
            .iter_mut()
            .find(|c| !c.is_commentary() && c.keyword == card.keyword)
        {
            Some(existing) => existing.value = card.value,
            None => self.cards.push(card),
        }
    }

    /// Exact keyword lookup. Commentary cards are not addressable.
    pub fn get(&self, keyword: &str) -> Option<&HeaderValue> {
        let keyword = keyword.trim();
        self.cards
            .iter()
            .find(|c| !c.is_commentary() && c.keyword == keyword)
            .map(|c| &c.value)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.get(keyword).is_some()
    }

    pub fn get_f64(&self, keyword: &str) -> Option<f64> {
        self.get(keyword).and_then(HeaderValue::as_f64)
    }

    pub fn get_i64(&self, keyword: &str) -> Option<i64> {
        self.get(keyword).and_then(HeaderValue::as_i64)
    }

    pub fn get_str(&self, keyword: &str) -> Option<&str> {
        self.get(keyword).and_then(HeaderValue::as_str)
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Parse a single 80-column card. Returns `None` for blank cards and `END`.
pub(crate) fn parse_card(card: &str) -> Option<Card> {
    let keyword = card.get(..8).unwrap_or(card).trim_end();
    if keyword.is_empty() || keyword == "END" {
        return None;
    }
    let keyword = keyword.to_ascii_uppercase();
    let rest = card.get(8..).unwrap_or("");

    if keyword == "COMMENT" || keyword == "HISTORY" || !rest.starts_with("= ") {
        return Some(Card {
            keyword,
            value: HeaderValue::String(rest.trim().to_string()),
            comment: None,
        });
    }

    let (value, comment) = split_value_comment(&rest[2..]);
    Some(Card {
        keyword,
        value,
        comment,
    })
}

fn split_value_comment(field: &str) -> (HeaderValue, Option<String>) {
    let trimmed = field.trim_start();

    if let Some(quoted) = trimmed.strip_prefix('\'') {
        // Quoted string: '' is an escaped quote
        let mut text = String::new();
        let mut chars = quoted.char_indices().peekable();
        let mut end = quoted.len();
        while let Some((i, c)) = chars.next() {
            if c == '\'' {
                if matches!(chars.peek(), Some((_, '\''))) {
                    text.push('\'');
                    chars.next();
                } else {
                    end = i + 1;
                    break;
                }
            } else {
                text.push(c);
            }
        }
        let comment = comment_after(&quoted[end.min(quoted.len())..]);
        return (HeaderValue::String(text.trim_end().to_string()), comment);
    }

    let (raw, comment) = match trimmed.find('/') {
        Some(idx) => (&trimmed[..idx], comment_after(&trimmed[idx..])),
        None => (trimmed, None),
    };
    (parse_value(raw.trim()), comment)
}

fn comment_after(s: &str) -> Option<String> {
    let idx = s.find('/')?;
    let text = s[idx + 1..].trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn parse_value(s: &str) -> HeaderValue {
    match s {
        "" => HeaderValue::Undefined,
        "T" => HeaderValue::Logical(true),
        "F" => HeaderValue::Logical(false),
        _ => {
            if let Ok(v) = s.parse::<i64>() {
                HeaderValue::Integer(v)
            } else if let Ok(v) = s.replace(['D', 'd'], "E").parse::<f64>() {
                HeaderValue::Float(v)
            } else {
                HeaderValue::String(s.to_string())
            }
        }
    }
}
