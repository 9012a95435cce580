//! Set operations over ordered sets, and the cardinality identities used to
//! check them.
//!
//! Every operation returns a fresh `BTreeSet`, so results are always in
//! canonical order and the operands are never modified.
use std::collections::BTreeSet;

/// The binary operations a user can ask for by name
#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum SetOp {
    /// Elements in either set
    Union,
    /// Elements in both sets
    Intersection,
    /// Elements in the first set but not the second
    Difference,
    /// Elements in exactly one of the sets
    SymmetricDifference,
}

impl SetOp {
    /// The infix symbol used when an operation is written out, `A U B`
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            SetOp::Union => "U",
            SetOp::Intersection => "INT",
            SetOp::Difference => "-",
            SetOp::SymmetricDifference => "XOR",
        }
    }
}

/// `a ∪ b`
pub fn union<T: Ord + Clone>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> BTreeSet<T> {
    a.union(b).cloned().collect()
}

/// `a ∩ b`
pub fn intersection<T: Ord + Clone>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> BTreeSet<T> {
    a.intersection(b).cloned().collect()
}

/// `a − b`. Not commutative.
pub fn difference<T: Ord + Clone>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> BTreeSet<T> {
    a.difference(b).cloned().collect()
}

/// `(a − b) ∪ (b − a)`
pub fn symmetric_difference<T: Ord + Clone>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> BTreeSet<T> {
    a.symmetric_difference(b).cloned().collect()
}

/// Dispatches on `op`
pub fn apply<T: Ord + Clone>(op: SetOp, a: &BTreeSet<T>, b: &BTreeSet<T>) -> BTreeSet<T> {
    match op {
        SetOp::Union => union(a, b),
        SetOp::Intersection => intersection(a, b),
        SetOp::Difference => difference(a, b),
        SetOp::SymmetricDifference => symmetric_difference(a, b),
    }
}

/// `a ⊆ b`
pub fn is_subset<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> bool {
    a.is_subset(b)
}

/// `a ⊂ b`: a subset, and not equal
pub fn is_proper_subset<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> bool {
    a.len() < b.len() && a.is_subset(b)
}

/// `a ∩ b = ∅`
pub fn is_disjoint<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> bool {
    a.is_disjoint(b)
}

/// Same elements
pub fn is_equal<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> bool {
    a == b
}

/// `universe − a`. Elements of `a` outside `universe` are ignored.
pub fn complement<T: Ord + Clone>(a: &BTreeSet<T>, universe: &BTreeSet<T>) -> BTreeSet<T> {
    difference(universe, a)
}

/// Power sets grow as `2ⁿ`; we refuse to build one for larger sets.
pub const POWER_SET_LIMIT: usize = 16;

/// All subsets of `a`, ordered by the bit pattern of their members, so the
/// empty set comes first and `a` itself last. `None` if `a` has more than
/// `POWER_SET_LIMIT` elements.
pub fn power_set<T: Ord + Clone>(a: &BTreeSet<T>) -> Option<Vec<BTreeSet<T>>> {
    if a.len() > POWER_SET_LIMIT {
        return None;
    }
    let members: Vec<&T> = a.iter().collect();
    let subsets: Vec<BTreeSet<T>> = (0_u32..1 << members.len())
        .map(|mask| {
            members
                .iter()
                .enumerate()
                .filter(|(bit, _)| mask & (1 << bit) != 0)
                .map(|(_, &member)| member.clone())
                .collect()
        })
        .collect();
    Some(subsets)
}

/// How two sets relate. When more than one description fits, the first one
/// in declaration order wins: two empty sets are `Equal`, and an empty set
/// next to a non-empty one is `Disjoint`.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Relation {
    /// Same elements
    Equal,
    /// No elements in common
    Disjoint,
    /// The left set is a proper subset of the right
    Subset,
    /// The right set is a proper subset of the left
    Superset,
    /// Some elements in common, neither contains the other
    Overlapping,
}

impl Relation {
    /// How the left set stands to the right, in words
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Relation::Equal => "equal",
            Relation::Disjoint => "disjoint",
            Relation::Subset => "proper subset",
            Relation::Superset => "proper superset",
            Relation::Overlapping => "overlapping",
        }
    }
}

/// Classifies the pair `(a, b)`
pub fn relation<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> Relation {
    if a == b {
        Relation::Equal
    } else if a.is_disjoint(b) {
        Relation::Disjoint
    } else if a.is_subset(b) {
        Relation::Subset
    } else if b.is_subset(a) {
        Relation::Superset
    } else {
        Relation::Overlapping
    }
}

/// The two sides of a cardinality identity. `lhs` is always counted from an
/// actual set, `rhs` from arithmetic on cardinalities.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct IdentityCheck {
    /// Counted from the union itself
    pub lhs: u64,
    /// Computed by inclusion–exclusion
    pub rhs: u64,
}

impl IdentityCheck {
    /// Do the two sides agree?
    #[must_use]
    pub fn holds(self) -> bool {
        self.lhs == self.rhs
    }
}

fn count<T>(set: &BTreeSet<T>) -> u64 {
    set.len() as u64
}

/// `|A ∪ B| = |A| + |B| − |A ∩ B|`
pub fn two_set_identity<T: Ord + Clone>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> IdentityCheck {
    let lhs = count(&union(a, b));
    let rhs = count(a) + count(b) - count(&intersection(a, b));
    IdentityCheck { lhs, rhs }
}

/// The seven cardinalities the three-set inclusion–exclusion formula needs.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub struct Overlaps {
    /// `|A|`
    pub a: u64,
    /// `|B|`
    pub b: u64,
    /// `|C|`
    pub c: u64,
    /// `|A ∩ B|`
    pub ab: u64,
    /// `|A ∩ C|`
    pub ac: u64,
    /// `|B ∩ C|`
    pub bc: u64,
    /// `|A ∩ B ∩ C|`
    pub abc: u64,
}

impl Overlaps {
    /// Counts the cardinalities of actual sets
    pub fn of<T: Ord + Clone>(a: &BTreeSet<T>, b: &BTreeSet<T>, c: &BTreeSet<T>) -> Overlaps {
        let ab = intersection(a, b);
        Overlaps {
            a: count(a),
            b: count(b),
            c: count(c),
            ab: count(&ab),
            ac: count(&intersection(a, c)),
            bc: count(&intersection(b, c)),
            abc: count(&intersection(&ab, c)),
        }
    }

    /// `|A ∪ B ∪ C| = |A|+|B|+|C| − |A∩B| − |A∩C| − |B∩C| + |A∩B∩C|`.
    /// `None` when the cardinalities can't come from real sets and the sum
    /// would go negative.
    #[must_use]
    pub fn union_size(&self) -> Option<u64> {
        let included = self.a.checked_add(self.b)?.checked_add(self.c)?.checked_add(self.abc)?;
        let excluded = self.ab.checked_add(self.ac)?.checked_add(self.bc)?;
        included.checked_sub(excluded)
    }
}

/// Checks the three-set formula against the union of `a`, `b` and `c`
pub fn three_set_identity<T: Ord + Clone>(
    a: &BTreeSet<T>,
    b: &BTreeSet<T>,
    c: &BTreeSet<T>,
) -> IdentityCheck {
    let lhs = count(&union(&union(a, b), c));
    // Real sets never make the formula go negative
    let rhs = Overlaps::of(a, b, c).union_size().unwrap_or_default();
    IdentityCheck { lhs, rhs }
}

/// The outcome of checking both De Morgan laws inside a universe
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct DeMorgan {
    /// `(A ∪ B)ᶜ = Aᶜ ∩ Bᶜ`
    pub complement_of_union: bool,
    /// `(A ∩ B)ᶜ = Aᶜ ∪ Bᶜ`
    pub complement_of_intersection: bool,
}

/// Checks De Morgan's laws for `a` and `b` relative to `universe`
pub fn de_morgan<T: Ord + Clone>(
    a: &BTreeSet<T>,
    b: &BTreeSet<T>,
    universe: &BTreeSet<T>,
) -> DeMorgan {
    let (not_a, not_b) = (complement(a, universe), complement(b, universe));
    DeMorgan {
        complement_of_union: complement(&union(a, b), universe) == intersection(&not_a, &not_b),
        complement_of_intersection: complement(&intersection(a, b), universe)
            == union(&not_a, &not_b),
    }
}
