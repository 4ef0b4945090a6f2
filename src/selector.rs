/// One candidate way to select an element beneath a search root.
///
/// A [`LocatorSpec`] carries an ordered list of these; the locator engine
/// tries them in declared order and short-circuits on the first that yields a
/// match. For maximum resilience against framework-rendered markup, lead with
/// the most explicit strategy (an attribute the application itself writes) and
/// fall back to looser ones (class fragments, visible text).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Attribute present, optionally with an exact value.
    Attr {
        name: String,
        value: Option<String>,
    },
    /// `class` attribute contains the fragment (case-insensitive).
    Class(String),
    /// Tag name equals (case-insensitive).
    Tag(String),
    /// Text content matches the target. Exact comparison runs over the whole
    /// candidate set before any fuzzy comparison is attempted.
    Text(String),
    /// Structural position: the n-th descendant with the given tag.
    Nth { tag: String, index: usize },
    /// Conjunction: every inner strategy must hold for the same candidate.
    All(Vec<Strategy>),
    /// Represents an unparseable selector string, with a reason.
    Invalid(String),
}

/// Post-filter predicate applied to a strategy's candidates before the first
/// survivor is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextFilter {
    /// Trimmed text equals exactly.
    Exact(String),
    /// Trimmed text contains, case-insensitive.
    Contains(String),
}

impl TextFilter {
    pub fn accepts(&self, text: &str) -> bool {
        let text = text.trim();
        match self {
            TextFilter::Exact(want) => text == want,
            TextFilter::Contains(want) => {
                text.to_lowercase().contains(&want.to_lowercase())
            }
        }
    }
}

/// An ordered list of candidate selection strategies plus an optional
/// post-filter. Immutable per invocation; the locator engine consumes it once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorSpec {
    pub strategies: Vec<Strategy>,
    pub filter: Option<TextFilter>,
}

impl LocatorSpec {
    pub fn new(strategies: Vec<Strategy>) -> Self {
        Self {
            strategies,
            filter: None,
        }
    }

    pub fn single(strategy: Strategy) -> Self {
        Self::new(vec![strategy])
    }

    pub fn with_filter(mut self, filter: TextFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

impl From<Strategy> for LocatorSpec {
    fn from(strategy: Strategy) -> Self {
        LocatorSpec::single(strategy)
    }
}

impl From<Vec<Strategy>> for LocatorSpec {
    fn from(strategies: Vec<Strategy>) -> Self {
        LocatorSpec::new(strategies)
    }
}

impl From<&str> for LocatorSpec {
    /// Parse a fallback chain: candidate strategies separated by `||`, tried
    /// in declared order.
    fn from(s: &str) -> Self {
        LocatorSpec::new(s.split("||").map(|part| Strategy::from(part.trim())).collect())
    }
}

impl From<&str> for Strategy {
    fn from(s: &str) -> Self {
        let s = s.trim();
        match s {
            _ if s.starts_with("attr:") => {
                let rest = &s["attr:".len()..];
                match rest.split_once('=') {
                    Some((name, value)) => Strategy::Attr {
                        name: name.trim().to_string(),
                        value: Some(value.trim().to_string()),
                    },
                    None => Strategy::Attr {
                        name: rest.trim().to_string(),
                        value: None,
                    },
                }
            }
            _ if s.starts_with("class:") => {
                Strategy::Class(s["class:".len()..].trim().to_string())
            }
            _ if s.starts_with("tag:") => Strategy::Tag(s["tag:".len()..].trim().to_string()),
            _ if s.starts_with("text:") => Strategy::Text(s["text:".len()..].to_string()),
            _ if s.starts_with("nth:") => {
                let rest = &s["nth:".len()..];
                match rest.split_once(':').and_then(|(tag, idx)| {
                    idx.trim()
                        .parse::<usize>()
                        .ok()
                        .map(|index| (tag.trim().to_string(), index))
                }) {
                    Some((tag, index)) => Strategy::Nth { tag, index },
                    None => Strategy::Invalid(format!(
                        "Invalid nth selector: '{rest}', expected 'nth:<tag>:<index>'"
                    )),
                }
            }
            _ => Strategy::Invalid(format!(
                "Unknown selector format: \"{s}\". Use prefixes 'attr:', 'class:', 'tag:', 'text:', or 'nth:', with '||' between fallback candidates."
            )),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}
