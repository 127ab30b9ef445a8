// The fragment model: the central representation for breeding and encoding.
//
// A fragment is exactly two 4/4 measures. Each measure pairs a chord (a set
// of pitch classes sounding for the whole measure in the low octave) with a
// melody line quantized to eighth-note ticks. Melody notes carry a pitch
// class, one of two octaves, and a duration counted in ticks; the durations
// of a measure's notes always sum to the measure length.
//
// The fragment is the unit exchanged between every component: the generator
// and breeder produce fragments, the codec converts them to and from the
// one-hot bit-vector form consumed by the external scorer, and the notation
// module reads and writes their textual form. Fragments are treated as
// immutable once produced — consumers build fresh values rather than
// mutating their inputs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Eighth-note ticks per measure (4/4 time at two ticks per beat).
pub const TICKS_PER_MEASURE: u8 = 8;

/// Measures per fragment. The bit-vector layout is fixed to this count.
pub const MEASURES_PER_FRAGMENT: usize = 2;

/// One of the 12 chromatic pitch classes, in fixed ascending order from C.
///
/// The discriminant order is the index basis for every one-hot encoding:
/// chord fields and melody blocks both index pitches by `PitchClass::index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PitchClass {
    C = 0,
    Cs = 1,
    D = 2,
    Ds = 3,
    E = 4,
    F = 5,
    Fs = 6,
    G = 7,
    Gs = 8,
    A = 9,
    As = 10,
    B = 11,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::Cs,
        PitchClass::D,
        PitchClass::Ds,
        PitchClass::E,
        PitchClass::F,
        PitchClass::Fs,
        PitchClass::G,
        PitchClass::Gs,
        PitchClass::A,
        PitchClass::As,
        PitchClass::B,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<PitchClass> {
        PitchClass::ALL.get(index).copied()
    }

    /// Notation label, `#` for sharps (e.g. "C#").
    pub fn label(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::Cs => "C#",
            PitchClass::D => "D",
            PitchClass::Ds => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::Fs => "F#",
            PitchClass::G => "G",
            PitchClass::Gs => "G#",
            PitchClass::A => "A",
            PitchClass::As => "A#",
            PitchClass::B => "B",
        }
    }

    pub fn from_label(label: &str) -> Option<PitchClass> {
        PitchClass::ALL.iter().copied().find(|p| p.label() == label)
    }
}

/// The two octaves a melody note may occupy.
///
/// The model is octave-agnostic: which numeric octave markers these map to
/// in text notation is decided by `notation::NotationStyle`, and the codec
/// only cares that `Low` occupies one-hot indices 0-11 and `High` 12-23.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Octave {
    Low = 0,
    High = 1,
}

impl Octave {
    pub const ALL: [Octave; 2] = [Octave::Low, Octave::High];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// A melody note: a rest or a pitched note, with a duration in ticks (1..=8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Note {
    Rest {
        ticks: u8,
    },
    Pitched {
        pitch: PitchClass,
        octave: Octave,
        ticks: u8,
    },
}

impl Note {
    pub fn rest(ticks: u8) -> Note {
        Note::Rest { ticks }
    }

    pub fn pitched(pitch: PitchClass, octave: Octave, ticks: u8) -> Note {
        Note::Pitched {
            pitch,
            octave,
            ticks,
        }
    }

    /// Duration of this note in eighth-note ticks.
    pub fn ticks(self) -> u8 {
        match self {
            Note::Rest { ticks } => ticks,
            Note::Pitched { ticks, .. } => ticks,
        }
    }
}

/// A set of pitch classes sounding together, stored as a 12-bit mask.
///
/// Bit i corresponds to `PitchClass::from_index(i)`, matching the chord
/// field of the bit-vector encoding directly. The empty chord means "no
/// chord" for that measure. Octave and duration are implied: chords always
/// sound in the low octave for the whole measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Chord {
    mask: u16,
}

impl Chord {
    pub const EMPTY: Chord = Chord { mask: 0 };

    pub fn from_pitches<I: IntoIterator<Item = PitchClass>>(pitches: I) -> Chord {
        let mut chord = Chord::EMPTY;
        for pitch in pitches {
            chord.insert(pitch);
        }
        chord
    }

    pub fn insert(&mut self, pitch: PitchClass) {
        self.mask |= 1 << pitch.index();
    }

    pub fn contains(self, pitch: PitchClass) -> bool {
        self.mask & (1 << pitch.index()) != 0
    }

    pub fn is_empty(self) -> bool {
        self.mask == 0
    }

    pub fn len(self) -> usize {
        self.mask.count_ones() as usize
    }

    /// The member pitch classes in ascending index order.
    pub fn pitches(self) -> impl Iterator<Item = PitchClass> {
        PitchClass::ALL
            .into_iter()
            .filter(move |p| self.contains(*p))
    }
}

/// One measure: a chord sounding under an ordered melody line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measure {
    pub chord: Chord,
    pub notes: Vec<Note>,
}

impl Measure {
    pub fn new(chord: Chord, notes: Vec<Note>) -> Measure {
        Measure { chord, notes }
    }

    /// Total melody duration in ticks. Valid measures sum to `TICKS_PER_MEASURE`.
    pub fn ticks(&self) -> u8 {
        self.notes.iter().map(|n| n.ticks()).sum()
    }
}

/// A two-measure fragment, the unit exchanged between all components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub measures: Vec<Measure>,
}

impl Fragment {
    pub fn new(measures: Vec<Measure>) -> Fragment {
        Fragment { measures }
    }

    /// Check the structural invariants: exactly `MEASURES_PER_FRAGMENT`
    /// measures, each with melody durations summing to `TICKS_PER_MEASURE`.
    ///
    /// The generator, breeder, and codec never produce a fragment violating
    /// these, so a failure here means malformed external input.
    pub fn validate(&self) -> Result<(), InvariantError> {
        if self.measures.len() != MEASURES_PER_FRAGMENT {
            return Err(InvariantError::MeasureCount {
                found: self.measures.len(),
            });
        }
        for (index, measure) in self.measures.iter().enumerate() {
            let ticks = measure.ticks();
            if ticks != TICKS_PER_MEASURE {
                return Err(InvariantError::TickSum {
                    measure: index,
                    found: ticks,
                });
            }
        }
        Ok(())
    }
}

/// A fragment or measure that breaks the structural invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantError {
    /// The fragment does not hold exactly `MEASURES_PER_FRAGMENT` measures.
    MeasureCount { found: usize },
    /// A measure's melody durations do not sum to `TICKS_PER_MEASURE`.
    TickSum { measure: usize, found: u8 },
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantError::MeasureCount { found } => write!(
                f,
                "fragment has {} measures, expected {}",
                found, MEASURES_PER_FRAGMENT
            ),
            InvariantError::TickSum { measure, found } => write!(
                f,
                "measure {} holds {} ticks, expected {}",
                measure + 1,
                found,
                TICKS_PER_MEASURE
            ),
        }
    }
}

impl std::error::Error for InvariantError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_measure() -> Measure {
        Measure::new(
            Chord::from_pitches([PitchClass::C, PitchClass::E, PitchClass::G]),
            vec![
                Note::pitched(PitchClass::C, Octave::Low, 4),
                Note::rest(2),
                Note::pitched(PitchClass::G, Octave::High, 2),
            ],
        )
    }

    #[test]
    fn test_pitch_class_index_round_trip() {
        for pitch in PitchClass::ALL {
            assert_eq!(PitchClass::from_index(pitch.index()), Some(pitch));
            assert_eq!(PitchClass::from_label(pitch.label()), Some(pitch));
        }
        assert_eq!(PitchClass::from_index(12), None);
        assert_eq!(PitchClass::from_label("H"), None);
    }

    #[test]
    fn test_chord_set_semantics() {
        let mut chord = Chord::EMPTY;
        assert!(chord.is_empty());
        chord.insert(PitchClass::E);
        chord.insert(PitchClass::C);
        chord.insert(PitchClass::E); // duplicate insert is a no-op
        assert_eq!(chord.len(), 2);
        assert!(chord.contains(PitchClass::C));
        assert!(!chord.contains(PitchClass::D));
        // Iteration is in index order regardless of insertion order.
        let pitches: Vec<PitchClass> = chord.pitches().collect();
        assert_eq!(pitches, vec![PitchClass::C, PitchClass::E]);
    }

    #[test]
    fn test_validate_accepts_full_measures() {
        let fragment = Fragment::new(vec![full_measure(), full_measure()]);
        assert_eq!(fragment.validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_wrong_measure_count() {
        let fragment = Fragment::new(vec![full_measure()]);
        assert_eq!(
            fragment.validate(),
            Err(InvariantError::MeasureCount { found: 1 })
        );
    }

    #[test]
    fn test_validate_rejects_underfilled_measure() {
        let short = Measure::new(Chord::EMPTY, vec![Note::rest(7)]);
        let fragment = Fragment::new(vec![full_measure(), short]);
        assert_eq!(
            fragment.validate(),
            Err(InvariantError::TickSum {
                measure: 1,
                found: 7
            })
        );
    }

    #[test]
    fn test_validate_rejects_overfilled_measure() {
        let long = Measure::new(
            Chord::EMPTY,
            vec![Note::rest(8), Note::pitched(PitchClass::A, Octave::Low, 1)],
        );
        let fragment = Fragment::new(vec![long, full_measure()]);
        assert_eq!(
            fragment.validate(),
            Err(InvariantError::TickSum {
                measure: 0,
                found: 9
            })
        );
    }

    #[test]
    fn test_serde_round_trip() {
        let fragment = Fragment::new(vec![full_measure(), full_measure()]);
        let json = serde_json::to_string(&fragment).unwrap();
        let restored: Fragment = serde_json::from_str(&json).unwrap();
        assert_eq!(fragment, restored);
    }
}
