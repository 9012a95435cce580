//! The session's named sets, and the log of everything done to them.
use chrono::{DateTime, Local};
use indexmap::IndexMap;
use std::fmt;

use crate::algebra::SetOp;
use crate::typed::{self, SetKind, TypedSet};

/// Errors from store operations. None of them change the store.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    /// A list selection outside `0..len`
    #[error("invalid index {index}: there are {len} sets")]
    IndexOutOfRange {
        /// The index asked for
        index: usize,
        /// How many sets there are
        len: usize,
    },
    /// No set has this name
    #[error("there is no set named '{0}'")]
    UnknownSet(String),
    /// Set names can't be empty
    #[error("a set needs a non-blank name")]
    InvalidName,
}

/// What kind of thing a `HistoryEntry` records
#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum HistoryKind {
    /// Bookkeeping done by the program itself, such as seeding examples
    System,
    /// A set was created or replaced
    Created,
    /// A set was removed from the store
    Removed,
    /// A union was computed
    Union,
    /// An intersection was computed
    Intersection,
    /// A difference was computed
    Difference,
    /// A symmetric difference was computed
    SymmetricDifference,
    /// A set was written to disk
    Saved,
    /// A set was read from disk
    Loaded,
    /// A set was imported from free text
    Imported,
    /// A set file was deleted
    Deleted,
}

impl HistoryKind {
    /// The upper-case tag written in front of the description
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            HistoryKind::System => "SYSTEM",
            HistoryKind::Created => "CREATED",
            HistoryKind::Removed => "REMOVED",
            HistoryKind::Union => "UNION",
            HistoryKind::Intersection => "INTERSECTION",
            HistoryKind::Difference => "DIFFERENCE",
            HistoryKind::SymmetricDifference => "SYMMETRIC DIFFERENCE",
            HistoryKind::Saved => "SAVED",
            HistoryKind::Loaded => "LOADED",
            HistoryKind::Imported => "IMPORTED",
            HistoryKind::Deleted => "DELETED",
        }
    }
}

impl From<SetOp> for HistoryKind {
    fn from(op: SetOp) -> Self {
        match op {
            SetOp::Union => HistoryKind::Union,
            SetOp::Intersection => HistoryKind::Intersection,
            SetOp::Difference => HistoryKind::Difference,
            SetOp::SymmetricDifference => HistoryKind::SymmetricDifference,
        }
    }
}

/// One line of history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// When it happened
    pub at: DateTime<Local>,
    /// What happened
    pub kind: HistoryKind,
    /// The details, e.g. `A U B = {1, 2}`
    pub description: String,
}

impl HistoryEntry {
    /// An entry stamped with the current time
    #[must_use]
    pub fn now(kind: HistoryKind, description: impl Into<String>) -> HistoryEntry {
        HistoryEntry { at: Local::now(), kind, description: description.into() }
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.at.format(TIMESTAMP), self.kind.tag(), self.description)
    }
}

/// The format of timestamps in history lines and file headers
pub const TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

/// What `Store::create` did
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Creation {
    /// A new name was added
    Created,
    /// An existing set was replaced, after confirmation
    Replaced,
    /// The name was taken and replacing it wasn't confirmed; nothing changed
    Cancelled,
}

/// Named sets in insertion order, plus an append-only history.
///
/// Index based selection (`by_index`, `remove`) uses the same order as
/// `list`, so "set #2" means the same set until the store is changed.
#[derive(Debug, Default)]
pub struct Store {
    sets: IndexMap<String, Named>,
    history: Vec<HistoryEntry>,
}

/// A set together with the element text it was made from
#[derive(Debug)]
struct Named {
    set: TypedSet,
    raw: String,
}

impl Store {
    /// An empty store with an empty history
    #[must_use]
    pub fn new() -> Store {
        Store::default()
    }

    /// A store holding `Naturais`, `Pares` and `Vogais`
    #[must_use]
    pub fn with_examples() -> Store {
        let mut store = Store::new();
        for (name, raw, kind) in [
            ("Naturais", "1 2 3 4 5", SetKind::Integer),
            ("Pares", "2 4 6 8", SetKind::Integer),
            ("Vogais", "a e i o u", SetKind::Token),
        ] {
            let set = typed::parse(raw, kind).set;
            store.sets.insert(name.to_owned(), Named { set, raw: raw.to_owned() });
        }
        store.record(HistoryKind::System, "example sets created");
        store
    }

    fn record(&mut self, kind: HistoryKind, description: impl Into<String>) {
        self.history.push(HistoryEntry::now(kind, description));
    }

    /// Adds `set` under `name`. If the name is already taken,
    /// `confirm_replace` is asked whether to replace the old set; if it says
    /// no, the old set stays and the result is `Creation::Cancelled`.
    ///
    /// The set's element text is its canonical elements; use `create_from`
    /// to keep the text the user typed.
    pub fn create(
        &mut self,
        name: &str,
        set: TypedSet,
        confirm_replace: impl FnOnce(&str) -> bool,
    ) -> Result<Creation, StoreError> {
        let raw = set.space_joined();
        self.create_from(name, set, raw, confirm_replace)
    }

    /// Like `create`, but remembers `raw` as the text the set was parsed
    /// from, to be saved verbatim later.
    pub fn create_from(
        &mut self,
        name: &str,
        set: TypedSet,
        raw: impl Into<String>,
        confirm_replace: impl FnOnce(&str) -> bool,
    ) -> Result<Creation, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidName);
        }
        let creation = if self.sets.contains_key(name) {
            if !confirm_replace(name) {
                tracing::debug!(name, "replacement declined");
                return Ok(Creation::Cancelled);
            }
            Creation::Replaced
        } else {
            Creation::Created
        };
        self.record(HistoryKind::Created, format!("{name} = {set}"));
        self.sets.insert(name.to_owned(), Named { set, raw: raw.into() });
        Ok(creation)
    }

    /// Every `(name, set)` pair, in selection order
    pub fn list(&self) -> impl Iterator<Item = (&str, &TypedSet)> {
        self.sets.iter().map(|(name, named)| (name.as_str(), &named.set))
    }

    /// The set named `name`
    pub fn get(&self, name: &str) -> Result<&TypedSet, StoreError> {
        self.named(name).map(|named| &named.set)
    }

    /// The element text the set named `name` was made from
    pub fn raw(&self, name: &str) -> Result<&str, StoreError> {
        self.named(name).map(|named| named.raw.as_str())
    }

    fn named(&self, name: &str) -> Result<&Named, StoreError> {
        self.sets.get(name).ok_or_else(|| StoreError::UnknownSet(name.to_owned()))
    }

    /// The `index`th pair of `list`, counting from zero
    pub fn by_index(&self, index: usize) -> Result<(&str, &TypedSet), StoreError> {
        self.sets
            .get_index(index)
            .map(|(name, named)| (name.as_str(), &named.set))
            .ok_or(StoreError::IndexOutOfRange { index, len: self.sets.len() })
    }

    /// Removes the `index`th set and returns its name. The remaining sets
    /// keep their relative order.
    pub fn remove(&mut self, index: usize) -> Result<String, StoreError> {
        let len = self.sets.len();
        let (name, _) =
            self.sets.shift_remove_index(index).ok_or(StoreError::IndexOutOfRange { index, len })?;
        self.record(HistoryKind::Removed, name.clone());
        Ok(name)
    }

    /// Computes `left op right` without changing either set, and records the
    /// result in the history.
    pub fn combine(&mut self, left: &str, op: SetOp, right: &str) -> Result<TypedSet, StoreError> {
        let result = self.get(left)?.combine(op, self.get(right)?);
        self.record(op.into(), format!("{left} {} {right} = {result}", op.symbol()));
        Ok(result)
    }

    /// Union, intersection and difference of the same two sets, in that
    /// order, each recorded as if requested on its own
    pub fn combine_all(&mut self, left: &str, right: &str) -> Result<[TypedSet; 3], StoreError> {
        Ok([
            self.combine(left, SetOp::Union, right)?,
            self.combine(left, SetOp::Intersection, right)?,
            self.combine(left, SetOp::Difference, right)?,
        ])
    }

    /// Records a durable operation done elsewhere, such as saving a set
    pub fn note(&mut self, kind: HistoryKind, description: impl Into<String>) {
        self.record(kind, description);
    }

    /// Everything done so far, oldest first
    #[must_use]
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Number of sets
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Is the store empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

#[allow(clippy::pedantic)]
#[cfg(test)]
mod test {
    use super::*;

    fn ints(raw: &str) -> TypedSet {
        typed::parse(raw, SetKind::Integer).set
    }

    fn kinds(store: &Store) -> Vec<HistoryKind> {
        store.history().iter().map(|e| e.kind).collect()
    }

    #[test]
    fn created_sets_are_listed_in_insertion_order() {
        let mut store = Store::new();
        for name in ["B", "A", "C"] {
            assert_eq!(store.create(name, ints("1"), |_| false), Ok(Creation::Created));
        }
        let names: Vec<&str> = store.list().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
        assert_eq!(store.by_index(1).unwrap().0, "A");
        assert_eq!(store.by_index(1).unwrap().0, "A");
    }

    #[test]
    fn replacing_needs_confirmation() {
        let mut store = Store::new();
        store.create("A", ints("1 2"), |_| unreachable!()).unwrap();
        assert_eq!(store.create("A", ints("9"), |_| false), Ok(Creation::Cancelled));
        assert_eq!(store.get("A").unwrap(), &ints("2 1"));
        assert_eq!(store.create("A", ints("9"), |name| name == "A"), Ok(Creation::Replaced));
        assert_eq!(store.get("A").unwrap(), &ints("9"));
        assert_eq!(kinds(&store), vec![HistoryKind::Created, HistoryKind::Created]);
        assert_eq!(store.history()[0].description, "A = {1, 2}");
    }

    #[test]
    fn the_typed_text_is_kept_alongside_the_set() {
        let mut store = Store::new();
        store.create_from("L", typed::parse("b a a c", SetKind::Token).set, "b a a c", |_| true).unwrap();
        store.create("M", ints("3 1 3"), |_| true).unwrap();
        assert_eq!(store.raw("L").unwrap(), "b a a c");
        assert_eq!(store.get("L").unwrap().canonical(), "{a, b, c}");
        assert_eq!(store.raw("M").unwrap(), "1 3");
        assert_eq!(Store::with_examples().raw("Pares").unwrap(), "2 4 6 8");
        assert_eq!(store.raw("Z"), Err(StoreError::UnknownSet("Z".to_string())));
    }

    #[test]
    fn blank_names_are_refused() {
        let mut store = Store::new();
        assert_eq!(store.create("  ", ints("1"), |_| true), Err(StoreError::InvalidName));
        assert!(store.is_empty());
    }

    #[test]
    fn removing_out_of_range_leaves_the_store_alone() {
        let mut store = Store::with_examples();
        assert_eq!(store.len(), 3);
        let before = store.history().len();
        assert_eq!(store.remove(5), Err(StoreError::IndexOutOfRange { index: 5, len: 3 }));
        assert_eq!(store.len(), 3);
        assert_eq!(store.history().len(), before);
    }

    #[test]
    fn removing_keeps_the_order_of_the_rest() {
        let mut store = Store::with_examples();
        assert_eq!(store.remove(0).unwrap(), "Naturais");
        let names: Vec<&str> = store.list().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Pares", "Vogais"]);
        assert_eq!(kinds(&store), vec![HistoryKind::System, HistoryKind::Removed]);
    }

    #[test]
    fn combining_records_the_literal_result_and_changes_nothing() {
        let mut store = Store::new();
        store.create("A", ints("1 2 3 4 5"), |_| true).unwrap();
        store.create("B", ints("4 5 6 7 8"), |_| true).unwrap();
        assert_eq!(store.combine("A", SetOp::Union, "B").unwrap(), ints("1 2 3 4 5 6 7 8"));
        assert_eq!(store.combine("A", SetOp::Intersection, "B").unwrap(), ints("4 5"));
        assert_eq!(store.combine("A", SetOp::Difference, "B").unwrap(), ints("1 2 3"));
        assert_eq!(store.combine("B", SetOp::Difference, "A").unwrap(), ints("6 7 8"));
        assert_eq!(store.get("A").unwrap(), &ints("1 2 3 4 5"));
        let last = store.history().last().unwrap();
        assert_eq!(last.kind, HistoryKind::Difference);
        assert_eq!(last.description, "B - A = {6, 7, 8}");
        assert_eq!(
            store.combine("A", SetOp::Union, "Z"),
            Err(StoreError::UnknownSet("Z".to_string()))
        );
    }

    #[test]
    fn combine_all_runs_three_operations() {
        let mut store = Store::with_examples();
        let [union, both, only_first] = store.combine_all("Naturais", "Pares").unwrap();
        assert_eq!(union, ints("1 2 3 4 5 6 8"));
        assert_eq!(both, ints("2 4"));
        assert_eq!(only_first, ints("1 3 5"));
        assert_eq!(
            kinds(&store),
            vec![
                HistoryKind::System,
                HistoryKind::Union,
                HistoryKind::Intersection,
                HistoryKind::Difference
            ]
        );
    }

    #[test]
    fn history_lines_show_the_tag() {
        let entry = HistoryEntry::now(HistoryKind::Saved, "A in a.conjunto");
        let line = entry.to_string();
        assert!(line.starts_with('['));
        assert!(line.ends_with("] SAVED: A in a.conjunto"), "{line}");
    }
}
