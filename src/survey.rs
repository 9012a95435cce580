//! Three overlapping memberships described by percentages of a population,
//! solved with inclusion–exclusion.
//!
//! The classic instance is a town of 40 000 people and three clubs. The
//! percentages give the size of each club, of each pairwise overlap, and of
//! the overlap of all three. `attending_any` works the formula on those
//! counts; `members` builds concrete sets of people with exactly those
//! overlaps, so that the formula can be checked against a real union.
use std::collections::BTreeSet;

use crate::algebra::{self, IdentityCheck, Overlaps};

/// Why a survey can't be turned into concrete sets
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SurveyError {
    /// Some Venn region would need a negative number of people
    #[error("the percentages leave a negative number of people in the region {region}")]
    Inconsistent {
        /// The region in `A`, `AB`, `ABC` notation
        region: &'static str,
    },
    /// More people attend some club than live in the town
    #[error("{attending} people attend a club but the population is only {population}")]
    Overfull {
        /// Computed number of people attending any club
        attending: u64,
        /// The population
        population: u64,
    },
    /// The population is too large to take percentages of
    #[error("a population of {population} is too large to work with")]
    TooLarge {
        /// The population
        population: u64,
    },
}

/// Populations above this are solved by the formula only; `verify` doesn't
/// build sets of people for them
pub const LITERAL_LIMIT: u64 = 1_000_000;

/// Percentages (whole numbers, 0–100) of a population in three sets and in
/// their overlaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Survey {
    /// Size of the population
    pub population: u64,
    /// Percent in each of `A`, `B`, `C`
    pub singles: [u64; 3],
    /// Percent in `A∩B`, `A∩C`, `B∩C`
    pub pairs: [u64; 3],
    /// Percent in `A∩B∩C`
    pub all_three: u64,
}

impl Survey {
    /// Colina 20%, Silvestre 16%, Campestre 14%; Colina and Silvestre 8%,
    /// Colina and Campestre 5%, Silvestre and Campestre 4%; all three 2%.
    #[must_use]
    pub fn clubs(population: u64) -> Survey {
        Survey { population, singles: [20, 16, 14], pairs: [8, 5, 4], all_three: 2 }
    }

    fn share(&self, percent: u64) -> Result<u64, SurveyError> {
        self.population
            .checked_mul(percent)
            .map(|n| n / 100)
            .ok_or(SurveyError::TooLarge { population: self.population })
    }

    fn shares(&self, percents: [u64; 3]) -> Result<[u64; 3], SurveyError> {
        let [x, y, z] = percents;
        Ok([self.share(x)?, self.share(y)?, self.share(z)?])
    }

    /// The seven cardinalities, from the percentages
    pub fn counts(&self) -> Result<Overlaps, SurveyError> {
        let [a, b, c] = self.shares(self.singles)?;
        let [ab, ac, bc] = self.shares(self.pairs)?;
        Ok(Overlaps { a, b, c, ab, ac, bc, abc: self.share(self.all_three)? })
    }

    /// People in at least one set, by inclusion–exclusion on the counts
    pub fn attending_any(&self) -> Result<u64, SurveyError> {
        let attending = self
            .counts()?
            .union_size()
            .ok_or(SurveyError::Inconsistent { region: "A∪B∪C" })?;
        if attending > self.population {
            return Err(SurveyError::Overfull { attending, population: self.population });
        }
        Ok(attending)
    }

    /// People in none of the sets
    pub fn attending_none(&self) -> Result<u64, SurveyError> {
        Ok(self.population - self.attending_any()?)
    }

    /// Numbers people `0..` region by region and returns the three sets of
    /// people, with exactly the overlaps the survey describes.
    pub fn members(&self) -> Result<[BTreeSet<u64>; 3], SurveyError> {
        fn minus(total: u64, parts: &[u64], region: &'static str) -> Result<u64, SurveyError> {
            parts
                .iter()
                .try_fold(total, |left, &part| left.checked_sub(part))
                .ok_or(SurveyError::Inconsistent { region })
        }
        if self.population > LITERAL_LIMIT {
            return Err(SurveyError::TooLarge { population: self.population });
        }
        let n = self.counts()?;
        let abc = n.abc;
        let ab = minus(n.ab, &[abc], "AB")?;
        let ac = minus(n.ac, &[abc], "AC")?;
        let bc = minus(n.bc, &[abc], "BC")?;
        let a = minus(n.a, &[ab, ac, abc], "A")?;
        let b = minus(n.b, &[ab, bc, abc], "B")?;
        let c = minus(n.c, &[ac, bc, abc], "C")?;

        let mut sets: [BTreeSet<u64>; 3] = Default::default();
        let mut next = 0_u64;
        for (size, members_of) in [
            (a, [true, false, false]),
            (b, [false, true, false]),
            (c, [false, false, true]),
            (ab, [true, true, false]),
            (ac, [true, false, true]),
            (bc, [false, true, true]),
            (abc, [true, true, true]),
        ] {
            for person in next..next + size {
                for (set, member) in sets.iter_mut().zip(members_of) {
                    if member {
                        set.insert(person);
                    }
                }
            }
            next += size;
        }
        Ok(sets)
    }

    /// Compares the union of the concrete sets with the formula's answer.
    /// `None` when the population is over `LITERAL_LIMIT`.
    pub fn verify(&self) -> Result<Option<IdentityCheck>, SurveyError> {
        let rhs = self.attending_any()?;
        if self.population > LITERAL_LIMIT {
            tracing::debug!(population = self.population, "too many people to list");
            return Ok(None);
        }
        let [a, b, c] = self.members()?;
        let lhs = algebra::union(&algebra::union(&a, &b), &c).len() as u64;
        Ok(Some(IdentityCheck { lhs, rhs }))
    }
}

#[allow(clippy::pedantic)]
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn clubs_counts_from_percentages() {
        let counts = Survey::clubs(40_000).counts().unwrap();
        assert_eq!(
            counts,
            Overlaps { a: 8000, b: 6400, c: 5600, ab: 3200, ac: 2000, bc: 1600, abc: 800 }
        );
    }

    #[test]
    fn clubs_inclusion_exclusion() {
        // 20 + 16 + 14 - 8 - 5 - 4 + 2 = 35 percent
        let survey = Survey::clubs(40_000);
        assert_eq!(survey.attending_any(), Ok(14_000));
        assert_eq!(survey.attending_none(), Ok(26_000));
    }

    #[test]
    fn arithmetic_and_literal_sets_agree() {
        let survey = Survey::clubs(40_000);
        let check = survey.verify().unwrap().unwrap();
        assert!(check.holds(), "{check:?}");

        let [a, b, c] = survey.members().unwrap();
        assert_eq!(Overlaps::of(&a, &b, &c), survey.counts().unwrap());
        assert!(algebra::three_set_identity(&a, &b, &c).holds());
    }

    #[test]
    fn inconsistent_surveys_are_reported() {
        let survey = Survey { population: 100, singles: [10, 10, 10], pairs: [20, 0, 0], all_three: 0 };
        assert_eq!(survey.members(), Err(SurveyError::Inconsistent { region: "A" }));

        let crowded = Survey { population: 100, singles: [90, 90, 90], pairs: [0, 0, 0], all_three: 0 };
        assert!(matches!(crowded.attending_any(), Err(SurveyError::Overfull { .. })));
    }

    #[test]
    fn huge_populations_are_an_error_not_a_panic() {
        let population = 1_000_000_000_000_000_000;
        let survey = Survey::clubs(population);
        assert_eq!(survey.attending_any(), Err(SurveyError::TooLarge { population }));
        assert_eq!(survey.verify(), Err(SurveyError::TooLarge { population }));
    }

    #[test]
    fn large_populations_skip_the_literal_check() {
        let survey = Survey::clubs(10_000_000_000);
        assert_eq!(survey.attending_any(), Ok(3_500_000_000));
        assert_eq!(survey.verify(), Ok(None));
        assert!(matches!(survey.members(), Err(SurveyError::TooLarge { .. })));

        let at_limit = Survey::clubs(LITERAL_LIMIT);
        assert!(at_limit.verify().unwrap().unwrap().holds());
    }
}
