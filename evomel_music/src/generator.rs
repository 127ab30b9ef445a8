// Random fragment generation: the population seed for evolution.
//
// Uniform sampling with no musical judgment — chords are 0 to 6 distinct
// random pitch classes, melodies are random pitches (or rests) at random
// octaves with uniformly drawn durations, redrawn whenever a duration would
// overflow the ticks left in the measure. Quality is the scorer's problem;
// this module only guarantees structural validity.

use crate::fragment::{
    Chord, Fragment, MEASURES_PER_FRAGMENT, Measure, Note, Octave, PitchClass, TICKS_PER_MEASURE,
};
use evomel_prng::EvoRng;

/// Most pitch classes a random chord may hold.
pub const MAX_CHORD_PITCHES: usize = 6;

/// Generate a random two-measure fragment.
///
/// The result always satisfies `Fragment::validate`.
pub fn random_fragment(rng: &mut EvoRng) -> Fragment {
    let measures = (0..MEASURES_PER_FRAGMENT)
        .map(|_| Measure::new(random_chord(rng), random_melody(rng)))
        .collect();
    Fragment::new(measures)
}

fn random_chord(rng: &mut EvoRng) -> Chord {
    let size = rng.range_usize_inclusive(0, MAX_CHORD_PITCHES);
    let mut chord = Chord::EMPTY;
    // Redraw on collision until the chord reaches its target size.
    while chord.len() < size {
        chord.insert(*rng.pick(&PitchClass::ALL));
    }
    chord
}

fn random_melody(rng: &mut EvoRng) -> Vec<Note> {
    let mut notes = Vec::new();
    let mut left = TICKS_PER_MEASURE;
    while left > 0 {
        let ticks = rng.range_u64(1, TICKS_PER_MEASURE as u64 + 1) as u8;
        if ticks > left {
            continue;
        }
        left -= ticks;
        // Rests are drawn with the same weight as each pitch class.
        let roll = rng.range_usize_inclusive(0, PitchClass::ALL.len());
        if roll == PitchClass::ALL.len() {
            notes.push(Note::rest(ticks));
        } else {
            notes.push(Note::pitched(
                PitchClass::ALL[roll],
                *rng.pick(&Octave::ALL),
                ticks,
            ));
        }
    }
    notes
}
