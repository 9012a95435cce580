//! Computes, once, everything the reports say about a collection of named
//! sets: per-set summaries, every pairwise comparison, the Jaccard matrix, a
//! similarity ranking, element frequencies and overall statistics. The
//! `render` module only formats an `Analysis`; it never computes.
use chrono::{DateTime, Local};
use fxhash::FxBuildHasher;
use indexmap::IndexMap;

use crate::algebra::{IdentityCheck, Relation, SetOp};
use crate::typed::{SetKind, Summary, TypedSet};

/// How many entries `Analysis::most_shared` returns at most
pub const MOST_SHARED: usize = 10;

/// `|A ∩ B| / |A ∪ B|`, or 0 when both sets are empty
#[must_use]
pub fn jaccard(a: &TypedSet, b: &TypedSet) -> f64 {
    let union = a.combine(SetOp::Union, b).len();
    if union == 0 {
        return 0.0;
    }
    a.combine(SetOp::Intersection, b).len() as f64 / union as f64
}

/// `2|A ∩ B| / (|A| + |B|)`, or 0 when both sets are empty
#[must_use]
pub fn dice(a: &TypedSet, b: &TypedSet) -> f64 {
    let sizes = a.len() + b.len();
    if sizes == 0 {
        return 0.0;
    }
    2.0 * a.combine(SetOp::Intersection, b).len() as f64 / sizes as f64
}

/// Coarse reading of a Jaccard index
#[derive(PartialEq, Eq, Debug, Clone, Copy, PartialOrd, Ord)]
pub enum Similarity {
    /// Below 0.1
    VeryLow,
    /// Below 0.3
    Low,
    /// Below 0.6
    Moderate,
    /// Below 0.8
    High,
    /// 0.8 and above
    VeryHigh,
}

impl Similarity {
    /// The bucket `jaccard` falls in
    #[must_use]
    pub fn of(jaccard: f64) -> Similarity {
        if jaccard < 0.1 {
            Similarity::VeryLow
        } else if jaccard < 0.3 {
            Similarity::Low
        } else if jaccard < 0.6 {
            Similarity::Moderate
        } else if jaccard < 0.8 {
            Similarity::High
        } else {
            Similarity::VeryHigh
        }
    }

    /// Words for the bucket
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Similarity::VeryLow => "very low similarity",
            Similarity::Low => "low similarity",
            Similarity::Moderate => "moderate similarity",
            Similarity::High => "high similarity",
            Similarity::VeryHigh => "very high similarity",
        }
    }
}

/// What the reports show about a single set
#[derive(Debug, Clone, PartialEq)]
pub struct SetSummary {
    /// Its name
    pub name: String,
    /// Its kind
    pub kind: SetKind,
    /// The elements, rendered, in canonical order
    pub elements: Vec<String>,
    /// Smallest element
    pub first: Option<String>,
    /// Largest element
    pub last: Option<String>,
    /// Kind specific statistics
    pub summary: Summary,
}

impl SetSummary {
    /// Cardinality
    #[must_use]
    pub fn size(&self) -> usize {
        self.elements.len()
    }
}

/// Everything computed for one pair of sets. `left` and `right` index
/// `Analysis::sets`, and `left < right`.
#[derive(Debug, Clone, PartialEq)]
pub struct PairReport {
    /// Index of the first set
    pub left: usize,
    /// Index of the second set
    pub right: usize,
    /// `|A ∪ B|`
    pub union: usize,
    /// `|A ∩ B|`
    pub intersection: usize,
    /// `|A − B|`
    pub left_only: usize,
    /// `|B − A|`
    pub right_only: usize,
    /// `|A △ B|`
    pub symmetric_difference: usize,
    /// Jaccard index
    pub jaccard: f64,
    /// Dice coefficient
    pub dice: f64,
    /// How A stands to B
    pub relation: Relation,
    /// `|A ∪ B|` counted, against `|A| + |B| − |A ∩ B|`
    pub identity: IdentityCheck,
}

impl PairReport {
    fn of(left: usize, a: &TypedSet, right: usize, b: &TypedSet) -> PairReport {
        let size = |op| a.combine(op, b).len();
        let union = size(SetOp::Union);
        let intersection = size(SetOp::Intersection);
        PairReport {
            left,
            right,
            union,
            intersection,
            left_only: size(SetOp::Difference),
            right_only: b.combine(SetOp::Difference, a).len(),
            symmetric_difference: size(SetOp::SymmetricDifference),
            jaccard: jaccard(a, b),
            dice: dice(a, b),
            relation: a.relation(b),
            identity: IdentityCheck {
                lhs: union as u64,
                rhs: (a.len() + b.len() - intersection) as u64,
            },
        }
    }

    /// Is A contained in B?
    #[must_use]
    pub fn left_in_right(&self) -> bool {
        self.left_only == 0
    }

    /// Is B contained in A?
    #[must_use]
    pub fn right_in_left(&self) -> bool {
        self.right_only == 0
    }
}

/// An element and the number of sets it appears in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frequency {
    /// The rendered element
    pub element: String,
    /// In how many sets it appears
    pub sets: usize,
}

/// Figures about the collection as a whole
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    /// Sum of all cardinalities
    pub total_elements: usize,
    /// Size of the union of all sets
    pub distinct_elements: usize,
    /// Mean cardinality
    pub mean_size: f64,
    /// Largest cardinality
    pub largest: usize,
    /// Smallest cardinality
    pub smallest: usize,
    /// `(size, number of sets of that size)`, by size
    pub size_distribution: Vec<(usize, usize)>,
    /// Mean Jaccard index over all pairs; `None` with fewer than two sets
    pub mean_jaccard: Option<f64>,
}

impl Statistics {
    /// `largest - smallest`
    #[must_use]
    pub fn spread(&self) -> usize {
        self.largest - self.smallest
    }
}

/// The computed results every report is rendered from
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// When the analysis was made
    pub generated: DateTime<Local>,
    /// The sets, in the order given
    pub sets: Vec<SetSummary>,
    /// `matrix[i][j]` is the Jaccard index of sets `i` and `j`
    pub matrix: Vec<Vec<f64>>,
    /// Every pair `i < j`, in enumeration order
    pub pairs: Vec<PairReport>,
    /// Indexes into `pairs`, most similar first. Ties keep enumeration order.
    pub ranking: Vec<usize>,
    /// Every element, most widespread first. Ties keep first-seen order.
    pub frequencies: Vec<Frequency>,
    /// Collection-wide figures
    pub statistics: Statistics,
}

impl Analysis {
    /// Analyses `sets` in the order given
    pub fn compute<'a>(
        sets: impl IntoIterator<Item = (&'a str, &'a TypedSet)>,
        generated: DateTime<Local>,
    ) -> Analysis {
        let sets: Vec<(&str, &TypedSet)> = sets.into_iter().collect();

        let matrix: Vec<Vec<f64>> =
            sets.iter().map(|(_, a)| sets.iter().map(|(_, b)| jaccard(a, b)).collect()).collect();

        let mut pairs = Vec::new();
        for (i, (_, a)) in sets.iter().enumerate() {
            for (j, (_, b)) in sets.iter().enumerate().skip(i + 1) {
                pairs.push(PairReport::of(i, a, j, b));
            }
        }
        let mut ranking: Vec<usize> = (0..pairs.len()).collect();
        ranking.sort_by(|&x, &y| pairs[y].jaccard.total_cmp(&pairs[x].jaccard));

        let mut counts: IndexMap<String, usize, FxBuildHasher> = IndexMap::default();
        for (_, set) in &sets {
            for element in set.rendered() {
                *counts.entry(element).or_insert(0) += 1;
            }
        }
        let mut frequencies: Vec<Frequency> =
            counts.into_iter().map(|(element, sets)| Frequency { element, sets }).collect();
        frequencies.sort_by(|x, y| y.sets.cmp(&x.sets));

        let sizes: Vec<usize> = sets.iter().map(|(_, set)| set.len()).collect();
        let mut size_distribution: IndexMap<usize, usize, FxBuildHasher> = IndexMap::default();
        for &size in &sizes {
            *size_distribution.entry(size).or_insert(0) += 1;
        }
        size_distribution.sort_keys();
        let total_elements: usize = sizes.iter().sum();
        let statistics = Statistics {
            total_elements,
            distinct_elements: frequencies.len(),
            mean_size: if sizes.is_empty() { 0.0 } else { total_elements as f64 / sizes.len() as f64 },
            largest: sizes.iter().copied().max().unwrap_or(0),
            smallest: sizes.iter().copied().min().unwrap_or(0),
            size_distribution: size_distribution.into_iter().collect(),
            mean_jaccard: if pairs.is_empty() {
                None
            } else {
                Some(pairs.iter().map(|p| p.jaccard).sum::<f64>() / pairs.len() as f64)
            },
        };

        let sets = sets
            .into_iter()
            .map(|(name, set)| SetSummary {
                name: name.to_owned(),
                kind: set.kind(),
                elements: set.rendered(),
                first: set.first(),
                last: set.last(),
                summary: set.summary(),
            })
            .collect();
        tracing::debug!(pairs = pairs.len(), elements = frequencies.len(), "analysis computed");
        Analysis { generated, sets, matrix, pairs, ranking, frequencies, statistics }
    }

    /// The pairs, most similar first
    pub fn ranked(&self) -> impl Iterator<Item = &PairReport> {
        self.ranking.iter().map(|&i| &self.pairs[i])
    }

    /// Elements found in exactly one set
    pub fn unique(&self) -> impl Iterator<Item = &Frequency> {
        self.frequencies.iter().filter(|f| f.sets == 1)
    }

    /// The most widespread elements, at most `MOST_SHARED` of them
    #[must_use]
    pub fn most_shared(&self) -> &[Frequency] {
        &self.frequencies[..self.frequencies.len().min(MOST_SHARED)]
    }

    /// The names of the two sets of a pair
    #[must_use]
    pub fn names(&self, pair: &PairReport) -> (&str, &str) {
        (&self.sets[pair.left].name, &self.sets[pair.right].name)
    }
}
