// One-hot bit-vector codec: the scorer-facing form of a fragment.
//
// The external scoring program consumes fragments as fixed-width bit
// vectors, one per text line. The layout is:
//
//   rating  chord1[12]  chord2[12]  melody1[8 x 25]  melody2[8 x 25]
//
// The leading token is a floating-point rating (0.0 when unknown), carried
// verbatim but never interpreted here. Each 12-bit chord field is set
// membership over the pitch classes. Each measure's melody is eight 25-bit
// tick blocks: bit 0 is the tie flag ("continue the previous tick's note
// instead of re-striking it") and bits 1..24 are a one-hot over the
// two-octave pitch space, all-zero meaning a rest.
//
// The tie flag is a run-length encoding in disguise: a note of duration k
// occupies k consecutive blocks, the first with the tie bit clear and the
// rest with it set and the pitch bits repeated. Decoding collapses such a
// run back into a single note with integral tick duration, so
// decode(encode(f)) == f for every valid fragment and
// encode(decode(v)) == v for every vector a prior encode produced.
//
// Both directions are pure functions over value types with no shared state.

use crate::fragment::{
    Chord, Fragment, InvariantError, MEASURES_PER_FRAGMENT, Measure, Note, Octave, PitchClass,
    TICKS_PER_MEASURE,
};
use std::fmt;

/// Bits in a chord set-membership field.
pub const CHORD_BITS: usize = 12;

/// Bits in one melody tick block: tie flag + two-octave one-hot.
pub const NOTE_BITS: usize = 25;

/// Total bit width (the rating rides along as a separate token).
pub const BIT_WIDTH: usize =
    MEASURES_PER_FRAGMENT * CHORD_BITS + MEASURES_PER_FRAGMENT * TICKS_PER_MEASURE as usize * NOTE_BITS;

/// Tokens on a wire line: the rating plus one token per bit.
pub const LINE_TOKENS: usize = BIT_WIDTH + 1;

/// A rated fragment in bit-vector form.
///
/// Produced by `encode` or parsed from a wire line; never mutated after
/// construction. `bits` is expected to hold exactly `BIT_WIDTH` entries —
/// `decode` and `to_line` are the consumers that enforce it.
#[derive(Debug, Clone, PartialEq)]
pub struct BitVector {
    pub rating: f64,
    pub bits: Vec<bool>,
}

impl BitVector {
    /// Render as a wire line: rating token then one `0`/`1` token per bit.
    pub fn to_line(&self) -> String {
        let mut line = format!("{:?}", self.rating);
        for bit in &self.bits {
            line.push(' ');
            line.push(if *bit { '1' } else { '0' });
        }
        line
    }

    /// Parse a wire line. The token count is checked before anything else.
    pub fn from_line(line: &str) -> Result<BitVector, CodecError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != LINE_TOKENS {
            return Err(CodecError::DimensionMismatch {
                expected: LINE_TOKENS,
                found: tokens.len(),
            });
        }
        let rating = tokens[0].parse::<f64>().map_err(|_| CodecError::BadRating {
            token: tokens[0].to_string(),
        })?;
        let mut bits = Vec::with_capacity(BIT_WIDTH);
        for (index, token) in tokens.iter().enumerate().skip(1) {
            match *token {
                "0" => bits.push(false),
                "1" => bits.push(true),
                _ => {
                    return Err(CodecError::BadToken {
                        index,
                        token: token.to_string(),
                    });
                }
            }
        }
        Ok(BitVector { rating, bits })
    }
}

/// A bit vector the codec cannot accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Wrong bit count (or wire-token count); nothing was parsed.
    DimensionMismatch { expected: usize, found: usize },
    /// A wire token other than `0`/`1` at the given line position.
    BadToken { index: usize, token: String },
    /// The leading rating token is not a decimal number.
    BadRating { token: String },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::DimensionMismatch { expected, found } => {
                write!(f, "expected {} tokens, found {}", expected, found)
            }
            CodecError::BadToken { index, token } => {
                write!(f, "token {} is '{}', expected 0 or 1", index, token)
            }
            CodecError::BadRating { token } => {
                write!(f, "rating token '{}' is not a number", token)
            }
        }
    }
}

impl std::error::Error for CodecError {}

/// Encode a fragment into bit-vector form with an unknown (0.0) rating.
///
/// The input must satisfy the measure invariant; the walk is deterministic
/// and the input is not mutated.
pub fn encode(fragment: &Fragment) -> Result<BitVector, InvariantError> {
    fragment.validate()?;

    let mut bits = vec![false; BIT_WIDTH];
    for (m, measure) in fragment.measures.iter().enumerate() {
        for pitch in measure.chord.pitches() {
            bits[m * CHORD_BITS + pitch.index()] = true;
        }
    }

    let mut offset = MEASURES_PER_FRAGMENT * CHORD_BITS;
    for measure in &fragment.measures {
        for note in &measure.notes {
            for tick in 0..note.ticks() {
                // Continuation ticks repeat the pitch bits under a tie flag.
                if tick > 0 {
                    bits[offset] = true;
                }
                if let Note::Pitched { pitch, octave, .. } = note {
                    bits[offset + 1 + octave.index() * CHORD_BITS + pitch.index()] = true;
                }
                offset += NOTE_BITS;
            }
        }
    }

    Ok(BitVector { rating: 0.0, bits })
}

/// Decode a bit vector back into a fragment, ignoring the rating.
///
/// Tick runs under tie flags collapse into single notes; the first tick of
/// a run decides the pitch, so a malformed vector whose continuation ticks
/// disagree still decodes (the tie wins). A tie flag on the very first tick
/// of a measure has nothing to tie to and starts a fresh note. In a
/// multi-hot pitch field only the lowest set bit is honored.
pub fn decode(vector: &BitVector) -> Result<Fragment, CodecError> {
    if vector.bits.len() != BIT_WIDTH {
        return Err(CodecError::DimensionMismatch {
            expected: BIT_WIDTH,
            found: vector.bits.len(),
        });
    }

    let mut measures = Vec::with_capacity(MEASURES_PER_FRAGMENT);
    for m in 0..MEASURES_PER_FRAGMENT {
        let chord_bits = &vector.bits[m * CHORD_BITS..][..CHORD_BITS];
        let chord = Chord::from_pitches(
            PitchClass::ALL
                .iter()
                .zip(chord_bits)
                .filter(|(_, set)| **set)
                .map(|(pitch, _)| *pitch),
        );

        let base = MEASURES_PER_FRAGMENT * CHORD_BITS
            + m * TICKS_PER_MEASURE as usize * NOTE_BITS;
        // Runs of (pitch, tick count), extended in place by tie flags.
        let mut runs: Vec<(Option<(PitchClass, Octave)>, u8)> = Vec::new();
        for tick in 0..TICKS_PER_MEASURE as usize {
            let block = &vector.bits[base + tick * NOTE_BITS..][..NOTE_BITS];
            let tie = block[0];
            let pitch = block[1..].iter().position(|set| *set).map(tick_pitch);
            if tie {
                if let Some(last) = runs.last_mut() {
                    last.1 += 1;
                    continue;
                }
            }
            runs.push((pitch, 1));
        }

        let notes = runs
            .into_iter()
            .map(|(pitch, ticks)| match pitch {
                Some((pitch, octave)) => Note::pitched(pitch, octave, ticks),
                None => Note::rest(ticks),
            })
            .collect();
        measures.push(Measure::new(chord, notes));
    }

    Ok(Fragment::new(measures))
}

/// Map a set bit position within a tick block's 24-bit pitch field to a
/// pitch class and octave: indices 0-11 are the low octave, 12-23 the high.
fn tick_pitch(index: usize) -> (PitchClass, Octave) {
    if index < CHORD_BITS {
        (PitchClass::ALL[index], Octave::Low)
    } else {
        (PitchClass::ALL[index - CHORD_BITS], Octave::High)
    }
}
