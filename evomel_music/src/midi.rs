// MIDI output for fragments.
//
// Converts a fragment into a Standard MIDI File (SMF) for playback and
// auditioning. The chord line and the melody line each map to a separate
// MIDI track; a chord sounds for its whole measure in the low octave while
// the melody plays above it. Eighth-note ticks map to MIDI ticks via the
// tempo track.
//
// Uses the `midly` crate for MIDI writing. Output is SMF Format 1
// (multi-track).

use crate::fragment::{Fragment, Note, Octave, PitchClass, TICKS_PER_MEASURE};
use midly::{
    Format, Header, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::path::Path;

/// Ticks per quarter note in MIDI output.
const TICKS_PER_QUARTER: u16 = 480;

/// Ticks per eighth note (half a quarter note).
const TICKS_PER_EIGHTH: u32 = TICKS_PER_QUARTER as u32 / 2;

/// MIDI key of low-octave C. The low octave is anchored at middle C, the
/// high octave one octave above.
const LOW_OCTAVE_BASE: u8 = 60;

/// Convert a fragment to MIDI and write to a file.
pub fn write_midi(
    fragment: &Fragment,
    tempo_bpm: u16,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let smf = fragment_to_smf(fragment, tempo_bpm);
    let mut buf = Vec::new();
    smf.write(&mut buf)?;
    std::fs::write(path, &buf)?;
    Ok(())
}

/// MIDI key for a pitch class in one of the two melody octaves.
fn midi_key(pitch: PitchClass, octave: Octave) -> u8 {
    LOW_OCTAVE_BASE + octave.index() as u8 * 12 + pitch.index() as u8
}

/// Convert a fragment to an in-memory SMF.
fn fragment_to_smf(fragment: &Fragment, tempo_bpm: u16) -> Smf<'static> {
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    // Track 0: tempo track
    let mut tempo_track: Track<'static> = Vec::new();
    let tempo_microseconds = 60_000_000 / tempo_bpm as u32;
    tempo_track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(midly::MetaMessage::Tempo(u24::new(tempo_microseconds))),
    });
    tempo_track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(midly::MetaMessage::EndOfTrack),
    });
    smf.tracks.push(tempo_track);

    smf.tracks.push(chord_track(fragment));
    smf.tracks.push(melody_track(fragment));
    smf
}

/// One whole-measure block chord per measure, low octave, channel 0.
fn chord_track(fragment: &Fragment) -> Track<'static> {
    let channel = u4::new(0);
    let mut track: Track<'static> = Vec::new();
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(midly::MetaMessage::TrackName(b"Chords")),
    });

    let measure_ticks = TICKS_PER_MEASURE as u32 * TICKS_PER_EIGHTH;
    let mut gap: u32 = 0;
    for measure in &fragment.measures {
        if measure.chord.is_empty() {
            gap += measure_ticks;
            continue;
        }
        let mut delta = gap;
        gap = 0;
        for pitch in measure.chord.pitches() {
            track.push(TrackEvent {
                delta: u28::new(delta),
                kind: TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::NoteOn {
                        key: u7::new(midi_key(pitch, Octave::Low)),
                        vel: u7::new(64),
                    },
                },
            });
            delta = 0;
        }
        let mut delta = measure_ticks;
        for pitch in measure.chord.pitches() {
            track.push(TrackEvent {
                delta: u28::new(delta),
                kind: TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::NoteOff {
                        key: u7::new(midi_key(pitch, Octave::Low)),
                        vel: u7::new(0),
                    },
                },
            });
            delta = 0;
        }
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(midly::MetaMessage::EndOfTrack),
    });
    track
}

/// The melody line, channel 1; rests advance time without events.
fn melody_track(fragment: &Fragment) -> Track<'static> {
    let channel = u4::new(1);
    let mut track: Track<'static> = Vec::new();
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(midly::MetaMessage::TrackName(b"Melody")),
    });

    let mut gap: u32 = 0;
    for measure in &fragment.measures {
        for note in &measure.notes {
            let length = note.ticks() as u32 * TICKS_PER_EIGHTH;
            match note {
                Note::Rest { .. } => gap += length,
                Note::Pitched { pitch, octave, .. } => {
                    let key = u7::new(midi_key(*pitch, *octave));
                    track.push(TrackEvent {
                        delta: u28::new(gap),
                        kind: TrackEventKind::Midi {
                            channel,
                            message: MidiMessage::NoteOn {
                                key,
                                vel: u7::new(80),
                            },
                        },
                    });
                    track.push(TrackEvent {
                        delta: u28::new(length),
                        kind: TrackEventKind::Midi {
                            channel,
                            message: MidiMessage::NoteOff {
                                key,
                                vel: u7::new(0),
                            },
                        },
                    });
                    gap = 0;
                }
            }
        }
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(midly::MetaMessage::EndOfTrack),
    });
    track
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notation::{NotationStyle, parse_fragment};

    #[test]
    fn test_fragment_to_smf_basic() {
        let style = NotationStyle::default();
        let fragment =
            parse_fragment("C5w+E5w+G5w+C5iiii_Riiii Rw+G6iiiiiiii", &style).unwrap();
        let smf = fragment_to_smf(&fragment, 120);
        // Tempo track + chord track + melody track.
        assert_eq!(smf.tracks.len(), 3);

        // Chord track: name + 3 NoteOn + 3 NoteOff + end of track.
        assert_eq!(smf.tracks[1].len(), 8);
        // Melody track: name + 2 sounding notes (the rest emits nothing)
        // + end of track.
        assert_eq!(smf.tracks[2].len(), 6);
    }

    #[test]
    fn test_midi_key_mapping() {
        assert_eq!(midi_key(PitchClass::C, Octave::Low), 60);
        assert_eq!(midi_key(PitchClass::B, Octave::Low), 71);
        assert_eq!(midi_key(PitchClass::C, Octave::High), 72);
        assert_eq!(midi_key(PitchClass::B, Octave::High), 83);
    }
}
