// Evomel: evolutionary breeding of two-measure melodies.
//
// Fragments of music — two 4/4 measures, each a chord under an eighth-note
// melody line — are generated at random, rated by an external scoring
// program, and bred together to produce offspring for the next generation.
// This crate holds the fragment model and everything that moves fragments
// between representations and generations.
//
// Architecture:
// - fragment.rs: Core model (pitch classes, notes, chords, measures,
//   fragments) and the structural invariants
// - notation.rs: Text notation parser/renderer (C5w+E5w+G5w+C5i_D5ii...)
//   with configurable octave markers
// - codec.rs: Bidirectional one-hot bit-vector codec, the wire form the
//   external scorer consumes (rating + 424 bits, tie-flagged tick blocks)
// - breed.rs: Crossover — chord pool selection plus melody splicing with a
//   bounded-retry, guaranteed-progress fill
// - generator.rs: Uniform random fragment sampling for initial populations
// - midi.rs: MIDI file output for auditioning fragments
//
// Generation and breeding are deterministic given a seed; the codec and
// breeder are pure functions over value types.

pub mod breed;
pub mod codec;
pub mod fragment;
pub mod generator;
pub mod midi;
pub mod notation;
