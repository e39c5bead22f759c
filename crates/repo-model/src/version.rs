//! Generic version ordering, version ranges and version constraints.
//!
//! Versions are tokenized on `.`, `-`, `_` and on transitions between digits
//! and letters. Numeric tokens compare numerically, qualifiers by a fixed
//! rank (`alpha < beta < milestone < rc < snapshot < release < sp`), unknown
//! qualifiers sort after `sp` lexicographically. Trailing zero and release
//! tokens are dropped, so `1.0.0 == 1`.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors from parsing ranges and constraints.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("Invalid version range {range}: {reason}")]
    InvalidRange { range: String, reason: String },

    #[error("Empty version constraint")]
    Empty,
}

fn invalid(range: &str, reason: &str) -> VersionError {
    VersionError::InvalidRange {
        range: range.to_string(),
        reason: reason.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Item {
    /// Digits with leading zeros stripped, so length-then-lexicographic
    /// comparison equals numeric comparison without overflow.
    Number(String),
    Qualifier(String),
}

impl Item {
    fn is_padding(&self) -> bool {
        match self {
            Item::Number(n) => n == "0",
            Item::Qualifier(q) => qualifier_rank(q) == RELEASE_RANK,
        }
    }
}

const RELEASE_RANK: i32 = 0;
const UNKNOWN_RANK: i32 = 2;

fn qualifier_rank(q: &str) -> i32 {
    match q {
        "alpha" | "a" => -5,
        "beta" | "b" => -4,
        "milestone" | "m" => -3,
        "rc" | "cr" => -2,
        "snapshot" => -1,
        "" | "ga" | "final" | "release" => RELEASE_RANK,
        "sp" => 1,
        _ => UNKNOWN_RANK,
    }
}

fn compare_numbers(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_qualifiers(a: &str, b: &str) -> Ordering {
    let (ra, rb) = (qualifier_rank(a), qualifier_rank(b));
    ra.cmp(&rb).then_with(|| {
        if ra == UNKNOWN_RANK {
            a.cmp(b)
        } else {
            Ordering::Equal
        }
    })
}

fn compare_items(a: Option<&Item>, b: Option<&Item>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(Item::Number(x)), Some(Item::Number(y))) => compare_numbers(x, y),
        (Some(Item::Qualifier(x)), Some(Item::Qualifier(y))) => compare_qualifiers(x, y),
        (Some(Item::Number(_)), Some(Item::Qualifier(_))) => Ordering::Greater,
        (Some(Item::Qualifier(_)), Some(Item::Number(_))) => Ordering::Less,
        (Some(Item::Number(x)), None) => compare_numbers(x, "0"),
        (None, Some(Item::Number(y))) => compare_numbers("0", y),
        (Some(Item::Qualifier(x)), None) => compare_qualifiers(x, ""),
        (None, Some(Item::Qualifier(y))) => compare_qualifiers("", y),
    }
}

fn flush(current: &mut String, digits: bool, items: &mut Vec<Item>) {
    if current.is_empty() {
        return;
    }
    let token = std::mem::take(current);
    if digits {
        let trimmed = token.trim_start_matches('0');
        items.push(Item::Number(if trimmed.is_empty() {
            "0".to_string()
        } else {
            trimmed.to_string()
        }));
    } else {
        items.push(Item::Qualifier(token.to_ascii_lowercase()));
    }
}

fn tokenize(version: &str) -> Vec<Item> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut digits = false;

    for c in version.chars() {
        if c == '.' || c == '-' || c == '_' {
            flush(&mut current, digits, &mut items);
            continue;
        }
        let is_digit = c.is_ascii_digit();
        if !current.is_empty() && is_digit != digits {
            flush(&mut current, digits, &mut items);
        }
        digits = is_digit;
        current.push(c);
    }
    flush(&mut current, digits, &mut items);

    while items.last().is_some_and(Item::is_padding) {
        items.pop();
    }
    items
}

/// A version with generic ordering. Any string is a valid version.
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Version {
    text: String,
    items: Vec<Item>,
}

impl Version {
    /// Parse a version string.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let items = tokenize(&text);
        Self { text, items }
    }

    /// The original text.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl From<String> for Version {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for Version {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.text
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.items.len().max(other.items.len());
        for i in 0..len {
            let ord = compare_items(self.items.get(i), other.items.get(i));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Qualifier aliases compare equal, so hash by rank.
        for item in &self.items {
            match item {
                Item::Number(n) => n.hash(state),
                Item::Qualifier(q) => {
                    let rank = qualifier_rank(q);
                    rank.hash(state);
                    if rank == UNKNOWN_RANK {
                        q.hash(state);
                    }
                }
            }
        }
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version({})", self.text)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// One end of a range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub version: Version,
    pub inclusive: bool,
}

/// A version interval such as `[1.0,2.0)`, `(,1.5]` or `[1.2]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    lower: Option<Bound>,
    upper: Option<Bound>,
}

impl VersionRange {
    /// Parse a single bracketed range.
    pub fn parse(range: &str) -> Result<Self, VersionError> {
        let trimmed = range.trim();
        let lower_inclusive = match trimmed.chars().next() {
            Some('[') => true,
            Some('(') => false,
            _ => return Err(invalid(range, "range must start with '[' or '('")),
        };
        let upper_inclusive = match trimmed.chars().last() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(invalid(range, "range must end with ']' or ')'")),
        };
        if trimmed.len() < 2 {
            return Err(invalid(range, "range is too short"));
        }
        let body = trimmed[1..trimmed.len() - 1].trim();

        match body.split_once(',') {
            None => {
                if !lower_inclusive || !upper_inclusive {
                    return Err(invalid(range, "single version must be enclosed in []"));
                }
                if body.is_empty() {
                    return Err(invalid(range, "single version is empty"));
                }
                let bound = Bound {
                    version: Version::new(body),
                    inclusive: true,
                };
                Ok(Self {
                    lower: Some(bound.clone()),
                    upper: Some(bound),
                })
            }
            Some((low, high)) => {
                let (low, high) = (low.trim(), high.trim());
                if high.contains(',') {
                    return Err(invalid(range, "too many bounds"));
                }
                let lower = (!low.is_empty()).then(|| Bound {
                    version: Version::new(low),
                    inclusive: lower_inclusive,
                });
                let upper = (!high.is_empty()).then(|| Bound {
                    version: Version::new(high),
                    inclusive: upper_inclusive,
                });
                if let (Some(l), Some(u)) = (&lower, &upper) {
                    if l.version > u.version {
                        return Err(invalid(range, "lower bound exceeds upper bound"));
                    }
                }
                Ok(Self { lower, upper })
            }
        }
    }

    /// Whether the version lies within this range.
    pub fn contains(&self, version: &Version) -> bool {
        let above = match &self.lower {
            None => true,
            Some(b) if b.inclusive => version >= &b.version,
            Some(b) => version > &b.version,
        };
        let below = match &self.upper {
            None => true,
            Some(b) if b.inclusive => version <= &b.version,
            Some(b) => version < &b.version,
        };
        above && below
    }

    pub fn lower(&self) -> Option<&Bound> {
        self.lower.as_ref()
    }

    pub fn upper(&self) -> Option<&Bound> {
        self.upper.as_ref()
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(l), Some(u)) = (&self.lower, &self.upper) {
            if l.inclusive && u.inclusive && l.version == u.version {
                return write!(f, "[{}]", l.version);
            }
        }
        match &self.lower {
            Some(b) => write!(f, "{}{}", if b.inclusive { '[' } else { '(' }, b.version)?,
            None => write!(f, "(")?,
        }
        write!(f, ",")?;
        match &self.upper {
            Some(b) => write!(f, "{}{}", b.version, if b.inclusive { ']' } else { ')' }),
            None => write!(f, ")"),
        }
    }
}

/// A declared version requirement: either a single preferred version or a
/// union of ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    version: Option<Version>,
    ranges: Vec<VersionRange>,
}

impl VersionConstraint {
    /// Constraint that prefers exactly one version.
    pub fn preferred(version: Version) -> Self {
        Self {
            version: Some(version),
            ranges: Vec::new(),
        }
    }

    /// Parse `1.0`, `[1,2)`, or a union such as `[1,2),[3,4)`.
    pub fn parse(spec: &str) -> Result<Self, VersionError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(VersionError::Empty);
        }
        if !spec.starts_with('[') && !spec.starts_with('(') {
            return Ok(Self::preferred(Version::new(spec)));
        }

        let mut ranges = Vec::new();
        let mut rest = spec;
        while !rest.is_empty() {
            let end = rest
                .find(|c| c == ']' || c == ')')
                .ok_or_else(|| invalid(spec, "unbounded range"))?;
            ranges.push(VersionRange::parse(&rest[..=end])?);
            rest = rest[end + 1..].trim_start();
            if let Some(next) = rest.strip_prefix(',') {
                rest = next.trim_start();
                if rest.is_empty() {
                    return Err(invalid(spec, "trailing comma"));
                }
            } else if !rest.is_empty() {
                return Err(invalid(spec, "ranges must be separated by ','"));
            }
        }
        Ok(Self {
            version: None,
            ranges,
        })
    }

    /// The preferred version, if this is not a range constraint.
    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    /// The ranges (empty for a plain version).
    pub fn ranges(&self) -> &[VersionRange] {
        &self.ranges
    }

    pub fn has_ranges(&self) -> bool {
        !self.ranges.is_empty()
    }

    /// Whether the version satisfies this constraint.
    pub fn contains_version(&self, version: &Version) -> bool {
        if self.ranges.is_empty() {
            self.version.as_ref().is_some_and(|v| v == version)
        } else {
            self.ranges.iter().any(|r| r.contains(version))
        }
    }
}

impl FromStr for VersionConstraint {
    type Err = VersionError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        Self::parse(spec)
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(version) = &self.version {
            return write!(f, "{}", version);
        }
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", range)?;
        }
        Ok(())
    }
}
