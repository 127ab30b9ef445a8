// Crossover: recombine two parent fragments into one offspring.
//
// Breeding works measure by measure. The offspring's chord is drawn
// uniformly from the pool of all four parent chords. Its melody starts as
// parent A's melody for that measure, with a randomly chosen tick window
// [s, e) spliced over using notes drawn from parent B's full note pool;
// past the window, A's remaining notes resume. Any note that will not fit
// the span being filled is redrawn up to a fixed retry budget, after which
// a synthesized random eighth note is inserted instead so the fill always
// makes forward progress. The offspring therefore always lands on exactly
// one full measure of ticks, whatever the parents' note shapes.
//
// Randomness comes from a caller-supplied `EvoRng`, never from ambient
// state, so a breeding call is reproducible from its seed.

use crate::fragment::{Chord, Fragment, Measure, Note, Octave, PitchClass, TICKS_PER_MEASURE};
use evomel_prng::EvoRng;
use std::fmt;

/// Measure-count mismatch between the breeder and an input fragment.
///
/// Breeding never partially recovers from this: the caller gets the error
/// and no offspring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreedError {
    pub expected: usize,
    pub found: usize,
}

impl fmt::Display for BreedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parent fragment has {} measures, breeder expects {}",
            self.found, self.expected
        )
    }
}

impl std::error::Error for BreedError {}

/// Measure-by-measure crossover of two fragments.
#[derive(Debug, Clone)]
pub struct Breeder {
    /// Measure count both parents must have.
    pub measures: usize,
    /// Redraws allowed per slot before falling back to a synthesized
    /// eighth note. Eight redraws keeps the fallback rare without letting
    /// an unlucky streak stall the fill.
    pub retry_limit: u32,
}

impl Default for Breeder {
    fn default() -> Self {
        Breeder {
            measures: crate::fragment::MEASURES_PER_FRAGMENT,
            retry_limit: 8,
        }
    }
}

impl Breeder {
    /// Produce one offspring fragment from two parents.
    ///
    /// The offspring always satisfies the measure invariant, and each of its
    /// chords is one of the four parent chords.
    pub fn breed(
        &self,
        a: &Fragment,
        b: &Fragment,
        rng: &mut EvoRng,
    ) -> Result<Fragment, BreedError> {
        for parent in [a, b] {
            if parent.measures.len() != self.measures {
                return Err(BreedError {
                    expected: self.measures,
                    found: parent.measures.len(),
                });
            }
        }

        let chord_pool: Vec<Chord> = a
            .measures
            .iter()
            .chain(&b.measures)
            .map(|m| m.chord)
            .collect();
        let note_pool: Vec<Note> = b
            .measures
            .iter()
            .flat_map(|m| m.notes.iter().copied())
            .collect();

        let mut measures = Vec::with_capacity(self.measures);
        for i in 0..self.measures {
            let chord = *rng.pick(&chord_pool);
            let notes = self.splice_melody(&a.measures[i].notes, &note_pool, rng);
            measures.push(Measure::new(chord, notes));
        }
        Ok(Fragment::new(measures))
    }

    /// Build one offspring measure's melody: base prefix, spliced window,
    /// base remainder, each under the fits-or-fallback rule.
    fn splice_melody(&self, base: &[Note], pool: &[Note], rng: &mut EvoRng) -> Vec<Note> {
        let measure = TICKS_PER_MEASURE as usize;
        let start = rng.range_usize(0, measure);
        let end = rng.range_usize_inclusive(start, measure);

        let mut notes = Vec::new();
        let mut filled = 0usize;

        // Keep base notes that end at or before the window start.
        let mut next = 0;
        while next < base.len() && filled + base[next].ticks() as usize <= start {
            notes.push(base[next]);
            filled += base[next].ticks() as usize;
            next += 1;
        }

        // Fill the window from the donor pool.
        while filled < end {
            let note = self.fit_from_pool(pool, end - filled, rng);
            filled += note.ticks() as usize;
            notes.push(note);
        }

        // Skip base notes the window overlapped, then resume the base,
        // still falling back when a note no longer fits.
        let mut base_pos: usize = base[..next].iter().map(|n| n.ticks() as usize).sum();
        while next < base.len() && base_pos < end {
            base_pos += base[next].ticks() as usize;
            next += 1;
        }
        while filled < measure {
            let note = if next < base.len() {
                let candidate = base[next];
                next += 1;
                if candidate.ticks() as usize <= measure - filled {
                    candidate
                } else {
                    random_eighth(rng)
                }
            } else {
                random_eighth(rng)
            };
            filled += note.ticks() as usize;
            notes.push(note);
        }

        notes
    }

    /// Draw a pool note that fits the remaining span, retrying up to the
    /// budget, then synthesize an eighth note to guarantee progress.
    fn fit_from_pool(&self, pool: &[Note], remaining: usize, rng: &mut EvoRng) -> Note {
        for _ in 0..self.retry_limit {
            let candidate = *rng.pick(pool);
            if candidate.ticks() as usize <= remaining {
                return candidate;
            }
        }
        random_eighth(rng)
    }
}

/// A uniformly random pitched eighth note — the guaranteed-progress fallback.
fn random_eighth(rng: &mut EvoRng) -> Note {
    Note::pitched(*rng.pick(&PitchClass::ALL), *rng.pick(&Octave::ALL), 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notation::{NotationStyle, parse_fragment};

    fn parents() -> (Fragment, Fragment) {
        let style = NotationStyle::default();
        let a = parse_fragment(
            "C5w+E5w+G5w+C5iiii_E5ii_G5ii A5w+A5iii_Riii_B5ii",
            &style,
        )
        .unwrap();
        let b = parse_fragment(
            "D5w+F5w+D6ii_F6ii_A6iiii Rw+Riiii_G6iiii",
            &style,
        )
        .unwrap();
        (a, b)
    }

    #[test]
    fn test_offspring_measures_are_always_full() {
        let (a, b) = parents();
        let breeder = Breeder::default();
        for seed in 0..500 {
            let mut rng = EvoRng::new(seed);
            let child = breeder.breed(&a, &b, &mut rng).unwrap();
            assert_eq!(
                child.validate(),
                Ok(()),
                "offspring from seed {seed} should satisfy the invariant"
            );
        }
    }

    #[test]
    fn test_offspring_chords_come_from_parent_pool() {
        let (a, b) = parents();
        let pool: Vec<Chord> = a
            .measures
            .iter()
            .chain(&b.measures)
            .map(|m| m.chord)
            .collect();
        let breeder = Breeder::default();
        for seed in 0..200 {
            let mut rng = EvoRng::new(seed);
            let child = breeder.breed(&a, &b, &mut rng).unwrap();
            for measure in &child.measures {
                assert!(
                    pool.contains(&measure.chord),
                    "seed {seed}: chord {:?} is not a parent chord",
                    measure.chord
                );
            }
        }
    }

    #[test]
    fn test_breeding_is_reproducible_per_seed() {
        let (a, b) = parents();
        let breeder = Breeder::default();
        let mut rng1 = EvoRng::new(77);
        let mut rng2 = EvoRng::new(77);
        assert_eq!(
            breeder.breed(&a, &b, &mut rng1).unwrap(),
            breeder.breed(&a, &b, &mut rng2).unwrap()
        );
    }

    #[test]
    fn test_wrong_measure_count_is_rejected() {
        let (a, b) = parents();
        let mut short = a.clone();
        short.measures.pop();
        let breeder = Breeder::default();
        let mut rng = EvoRng::new(1);
        assert_eq!(
            breeder.breed(&short, &b, &mut rng),
            Err(BreedError {
                expected: 2,
                found: 1,
            })
        );
        assert_eq!(
            breeder.breed(&a, &short, &mut rng),
            Err(BreedError {
                expected: 2,
                found: 1,
            })
        );
    }

    #[test]
    fn test_zero_retry_budget_still_fills_measures() {
        // With no redraws allowed every non-fitting draw falls back to a
        // synthesized eighth note; the invariant must still hold.
        let (a, b) = parents();
        let breeder = Breeder {
            retry_limit: 0,
            ..Breeder::default()
        };
        for seed in 0..100 {
            let mut rng = EvoRng::new(seed);
            let child = breeder.breed(&a, &b, &mut rng).unwrap();
            assert_eq!(child.validate(), Ok(()));
        }
    }
}
