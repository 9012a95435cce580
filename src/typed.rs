//! Turns raw, whitespace separated text into typed sets.
//!
//! A set is always one of three kinds, integers, decimals or words, and the
//! `TypedSet` enum keeps the elements in their natural order: numeric order for
//! numbers, lexicographic order for words. Parsing is lenient. A token that
//! doesn't fit the requested kind is set aside in `rejected` and parsing goes
//! on with the next token.
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use crate::algebra::{self, Relation, SetOp};

/// The three kinds of element a set may hold. The numeric codes are the ones
/// written to the `TIPO=` line of a `.conjunto` file.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum SetKind {
    /// Signed whole numbers
    Integer,
    /// Finite base-10 floating point numbers
    Decimal,
    /// Lowercased words
    Token,
}

impl SetKind {
    /// The on-disk type code: 1, 2 or 3
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            SetKind::Integer => 1,
            SetKind::Decimal => 2,
            SetKind::Token => 3,
        }
    }

    /// Inverse of `code`
    #[must_use]
    pub fn from_code(code: u8) -> Option<SetKind> {
        match code {
            1 => Some(SetKind::Integer),
            2 => Some(SetKind::Decimal),
            3 => Some(SetKind::Token),
            _ => None,
        }
    }

    /// Human readable name of the kind
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            SetKind::Integer => "Integers",
            SetKind::Decimal => "Decimals",
            SetKind::Token => "Words/Text",
        }
    }
}

/// A finite `f64` with a total order, so that it can live in a `BTreeSet`.
/// Negative zero is folded into zero, so `-0` and `0` are the same element.
#[derive(Debug, Clone, Copy)]
pub struct Decimal(f64);

impl Decimal {
    /// Returns `None` for `NaN` and the infinities
    #[must_use]
    pub fn new(value: f64) -> Option<Decimal> {
        if !value.is_finite() {
            return None;
        }
        Some(Decimal(if value == 0.0 { 0.0 } else { value }))
    }

    /// The wrapped value
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Decimal {}
impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}
impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The result of a lenient parse: the accepted elements, deduplicated and in
/// order, and the raw tokens that didn't fit, in the order they were seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed<T: Ord> {
    /// Accepted elements
    pub accepted: BTreeSet<T>,
    /// Tokens that couldn't be converted
    pub rejected: Vec<String>,
}

fn lenient<T: Ord>(raw: &str, kind: SetKind, convert: impl Fn(&str) -> Option<T>) -> Parsed<T> {
    let mut accepted = BTreeSet::new();
    let mut rejected = Vec::new();
    for token in raw.split_whitespace() {
        match convert(token) {
            Some(value) => {
                accepted.insert(value);
            }
            None => {
                tracing::warn!(token, kind = kind.label(), "dropping malformed token");
                rejected.push(token.to_owned());
            }
        }
    }
    Parsed { accepted, rejected }
}

fn integer_of(token: &str) -> Option<i64> {
    token.parse().ok()
}

fn decimal_of(token: &str) -> Option<Decimal> {
    token.parse().ok().and_then(Decimal::new)
}

fn word_of(token: &str) -> String {
    token.to_lowercase()
}

/// Parses every whitespace separated token of `raw` as an `i64`
#[must_use]
pub fn parse_integers(raw: &str) -> Parsed<i64> {
    lenient(raw, SetKind::Integer, integer_of)
}

/// Parses every whitespace separated token of `raw` as a finite decimal
#[must_use]
pub fn parse_decimals(raw: &str) -> Parsed<Decimal> {
    lenient(raw, SetKind::Decimal, decimal_of)
}

/// Lowercases every whitespace separated token of `raw`. Never rejects.
#[must_use]
pub fn parse_tokens(raw: &str) -> Parsed<String> {
    lenient(raw, SetKind::Token, |token| Some(word_of(token)))
}

/// A `TypedSet` together with the tokens rejected while building it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSet {
    /// The set built from the accepted tokens
    pub set: TypedSet,
    /// Tokens that didn't fit the requested kind
    pub rejected: Vec<String>,
}

/// Parses `raw` into a set of the requested `kind`
#[must_use]
pub fn parse(raw: &str, kind: SetKind) -> ParsedSet {
    match kind {
        SetKind::Integer => {
            let Parsed { accepted, rejected } = parse_integers(raw);
            ParsedSet { set: TypedSet::Integer(accepted), rejected }
        }
        SetKind::Decimal => {
            let Parsed { accepted, rejected } = parse_decimals(raw);
            ParsedSet { set: TypedSet::Decimal(accepted), rejected }
        }
        SetKind::Token => {
            let Parsed { accepted, rejected } = parse_tokens(raw);
            ParsedSet { set: TypedSet::Token(accepted), rejected }
        }
    }
}

/// Each token of the input lands in exactly one of the three buckets: the
/// integer bucket if it parses as an integer, otherwise the decimal bucket if
/// it parses as a decimal, otherwise the word bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classified {
    /// Tokens that parsed as integers
    pub integers: BTreeSet<i64>,
    /// Tokens that parsed as decimals but not as integers
    pub decimals: BTreeSet<Decimal>,
    /// Everything else, lowercased
    pub tokens: BTreeSet<String>,
}

impl Classified {
    /// Sum of the integer bucket
    #[must_use]
    pub fn integer_sum(&self) -> i128 {
        self.integers.iter().map(|&n| i128::from(n)).sum()
    }

    /// Sum of the decimal bucket
    #[must_use]
    pub fn decimal_sum(&self) -> f64 {
        self.decimals.iter().map(|d| d.value()).sum()
    }
}

/// Sorts the tokens of `raw` by the first kind they parse as
#[must_use]
pub fn classify(raw: &str) -> Classified {
    let mut classified = Classified::default();
    for token in raw.split_whitespace() {
        if let Some(n) = integer_of(token) {
            classified.integers.insert(n);
        } else if let Some(d) = decimal_of(token) {
            classified.decimals.insert(d);
        } else {
            classified.tokens.insert(word_of(token));
        }
    }
    classified
}

/// A set of one kind of element, in canonical order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedSet {
    /// A set of integers
    Integer(BTreeSet<i64>),
    /// A set of decimals
    Decimal(BTreeSet<Decimal>),
    /// A set of words
    Token(BTreeSet<String>),
}

impl TypedSet {
    /// An empty set of the given kind
    #[must_use]
    pub fn empty(kind: SetKind) -> TypedSet {
        match kind {
            SetKind::Integer => TypedSet::Integer(BTreeSet::new()),
            SetKind::Decimal => TypedSet::Decimal(BTreeSet::new()),
            SetKind::Token => TypedSet::Token(BTreeSet::new()),
        }
    }

    /// Builds a word set from already-split words, lowercasing each
    pub fn tokens<'a>(words: impl IntoIterator<Item = &'a str>) -> TypedSet {
        TypedSet::Token(words.into_iter().map(word_of).collect())
    }

    /// The kind of element held
    #[must_use]
    pub fn kind(&self) -> SetKind {
        match self {
            TypedSet::Integer(_) => SetKind::Integer,
            TypedSet::Decimal(_) => SetKind::Decimal,
            TypedSet::Token(_) => SetKind::Token,
        }
    }

    /// Cardinality
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            TypedSet::Integer(s) => s.len(),
            TypedSet::Decimal(s) => s.len(),
            TypedSet::Token(s) => s.len(),
        }
    }

    /// Is the set empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The elements as strings, in canonical order
    #[must_use]
    pub fn rendered(&self) -> Vec<String> {
        match self {
            TypedSet::Integer(s) => s.iter().map(ToString::to_string).collect(),
            TypedSet::Decimal(s) => s.iter().map(ToString::to_string).collect(),
            TypedSet::Token(s) => s.iter().cloned().collect(),
        }
    }

    /// The elements joined by single spaces, suitable for re-parsing
    #[must_use]
    pub fn space_joined(&self) -> String {
        self.rendered().join(" ")
    }

    /// The canonical rendering, `{a, b, c}`
    #[must_use]
    pub fn canonical(&self) -> String {
        format!("{{{}}}", self.rendered().join(", "))
    }

    /// The smallest element, rendered
    #[must_use]
    pub fn first(&self) -> Option<String> {
        match self {
            TypedSet::Integer(s) => s.first().map(ToString::to_string),
            TypedSet::Decimal(s) => s.first().map(ToString::to_string),
            TypedSet::Token(s) => s.first().cloned(),
        }
    }

    /// The largest element, rendered
    #[must_use]
    pub fn last(&self) -> Option<String> {
        match self {
            TypedSet::Integer(s) => s.last().map(ToString::to_string),
            TypedSet::Decimal(s) => s.last().map(ToString::to_string),
            TypedSet::Token(s) => s.last().cloned(),
        }
    }

    /// Reinterprets the set as a set of words, using the rendered elements
    #[must_use]
    pub fn to_tokens(&self) -> BTreeSet<String> {
        match self {
            TypedSet::Token(s) => s.clone(),
            other => other.rendered().into_iter().collect(),
        }
    }

    /// Computes `self op other`. Sets of different kinds are compared by
    /// their rendered elements and the result is a word set.
    #[must_use]
    pub fn combine(&self, op: SetOp, other: &TypedSet) -> TypedSet {
        match (self, other) {
            (TypedSet::Integer(a), TypedSet::Integer(b)) => {
                TypedSet::Integer(algebra::apply(op, a, b))
            }
            (TypedSet::Decimal(a), TypedSet::Decimal(b)) => {
                TypedSet::Decimal(algebra::apply(op, a, b))
            }
            (TypedSet::Token(a), TypedSet::Token(b)) => TypedSet::Token(algebra::apply(op, a, b)),
            (a, b) => TypedSet::Token(algebra::apply(op, &a.to_tokens(), &b.to_tokens())),
        }
    }

    /// How `self` relates to `other`
    #[must_use]
    pub fn relation(&self, other: &TypedSet) -> Relation {
        match (self, other) {
            (TypedSet::Integer(a), TypedSet::Integer(b)) => algebra::relation(a, b),
            (TypedSet::Decimal(a), TypedSet::Decimal(b)) => algebra::relation(a, b),
            (TypedSet::Token(a), TypedSet::Token(b)) => algebra::relation(a, b),
            (a, b) => algebra::relation(&a.to_tokens(), &b.to_tokens()),
        }
    }

    /// Every subset, in bitmask order, or `None` for sets larger than
    /// `algebra::POWER_SET_LIMIT`
    #[must_use]
    pub fn power_set(&self) -> Option<Vec<TypedSet>> {
        Some(match self {
            TypedSet::Integer(s) => {
                algebra::power_set(s)?.into_iter().map(TypedSet::Integer).collect()
            }
            TypedSet::Decimal(s) => {
                algebra::power_set(s)?.into_iter().map(TypedSet::Decimal).collect()
            }
            TypedSet::Token(s) => algebra::power_set(s)?.into_iter().map(TypedSet::Token).collect(),
        })
    }

    /// Is every element of `self` in `other`?
    #[must_use]
    pub fn is_subset(&self, other: &TypedSet) -> bool {
        self.combine(SetOp::Difference, other).is_empty()
    }

    /// Summary statistics for the set
    #[must_use]
    pub fn summary(&self) -> Summary {
        match self {
            TypedSet::Integer(s) => {
                let values: Vec<f64> = s.iter().map(|&n| n as f64).collect();
                Summary::Numeric(NumericSummary::of(&values))
            }
            TypedSet::Decimal(s) => {
                let values: Vec<f64> = s.iter().map(|d| d.value()).collect();
                Summary::Numeric(NumericSummary::of(&values))
            }
            TypedSet::Token(s) => Summary::Words(WordSummary::of(s)),
        }
    }
}

impl fmt::Display for TypedSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// Statistics that make sense for the kind of set at hand
#[derive(Debug, Clone, PartialEq)]
pub enum Summary {
    /// For integer and decimal sets
    Numeric(Option<NumericSummary>),
    /// For word sets
    Words(Option<WordSummary>),
}

/// Smallest, largest, sum and mean of a non-empty numeric set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericSummary {
    /// Smallest element
    pub min: f64,
    /// Largest element
    pub max: f64,
    /// Sum of the elements
    pub sum: f64,
    /// Arithmetic mean
    pub mean: f64,
}

impl NumericSummary {
    /// `values` must already be in ascending order
    fn of(values: &[f64]) -> Option<NumericSummary> {
        let (&min, &max) = (values.first()?, values.last()?);
        let sum: f64 = values.iter().sum();
        Some(NumericSummary { min, max, sum, mean: sum / values.len() as f64 })
    }
}

/// Word counts and lengths of a non-empty word set
#[derive(Debug, Clone, PartialEq)]
pub struct WordSummary {
    /// Number of distinct words
    pub words: usize,
    /// Characters over all words
    pub characters: usize,
    /// Mean characters per word
    pub mean_length: f64,
    /// The first shortest word, alphabetically
    pub shortest: String,
    /// The first longest word, alphabetically
    pub longest: String,
    /// Alphabetically first
    pub first: String,
    /// Alphabetically last
    pub last: String,
}

impl WordSummary {
    fn of(words: &BTreeSet<String>) -> Option<WordSummary> {
        let first = words.first()?.clone();
        let last = words.last()?.clone();
        let length = |w: &&String| w.chars().count();
        let characters: usize = words.iter().map(|w| w.chars().count()).sum();
        // `min_by_key` keeps the first minimum, `max_by_key` the last maximum
        let shortest = words.iter().min_by_key(length)?.clone();
        let longest = words.iter().rev().max_by_key(length)?.clone();
        Some(WordSummary {
            words: words.len(),
            characters,
            mean_length: characters as f64 / words.len() as f64,
            shortest,
            longest,
            first,
            last,
        })
    }
}
