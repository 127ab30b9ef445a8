// Evomel — CLI entry point.
//
// Generates a random population of two-measure fragments, breeds offspring
// from random pairs, and writes everything an external scorer or player
// needs: the population's bit-vector lines, a MIDI rendering of the first
// offspring, and a JSON run summary. Scoring and the generation loop around
// it live outside this binary.
//
// Usage:
//   cargo run -p evomel_music -- [output-prefix] [--seed N] [--population N]
//     [--pairs N] [--tempo BPM]

use evomel_music::breed::Breeder;
use evomel_music::codec::encode;
use evomel_music::fragment::Fragment;
use evomel_music::generator::random_fragment;
use evomel_music::midi::write_midi;
use evomel_prng::EvoRng;
use serde::Serialize;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// What a run produced, for the JSON summary file.
#[derive(Serialize)]
struct RunSummary {
    seed: u64,
    population: Vec<String>,
    offspring: Vec<String>,
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    // Parse arguments
    let prefix = args
        .get(1)
        .filter(|s| !s.starts_with("--"))
        .map(|s| s.as_str())
        .unwrap_or("evomel");
    let population_size: usize = parse_flag(&args, "--population").unwrap_or(20);
    let pairs: usize = parse_flag(&args, "--pairs").unwrap_or(4);
    let tempo: u16 = parse_flag(&args, "--tempo").unwrap_or(120);
    let seed: u64 = parse_flag(&args, "--seed").unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    });

    println!("=== Evomel ===");
    println!("Output prefix: {}", prefix);
    println!("Population: {}", population_size);
    println!("Breeding pairs: {}", pairs);
    println!("Seed: {}", seed);
    println!();

    let mut rng = EvoRng::new(seed);

    // Generate the population
    println!("[1/3] Generating {} random fragments...", population_size);
    let population: Vec<Fragment> = (0..population_size)
        .map(|_| random_fragment(&mut rng))
        .collect();
    for (i, fragment) in population.iter().enumerate() {
        println!("  {:>3}: {}", i + 1, fragment);
    }

    // Breed offspring from random pairs
    println!("[2/3] Breeding {} offspring...", pairs);
    let breeder = Breeder::default();
    let mut offspring = Vec::with_capacity(pairs);
    for i in 0..pairs {
        let a = rng.range_usize(0, population.len());
        let b = rng.range_usize(0, population.len());
        match breeder.breed(&population[a], &population[b], &mut rng) {
            Ok(child) => {
                println!("  {:>3}: {} x {} -> {}", i + 1, a + 1, b + 1, child);
                offspring.push(child);
            }
            Err(e) => {
                eprintln!("  Breeding failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    // Write outputs
    println!("[3/3] Writing outputs...");
    let bits_path = format!("{}.bits", prefix);
    if let Err(e) = write_bits(&population, &offspring, Path::new(&bits_path)) {
        eprintln!("  Error writing bit vectors: {}", e);
        std::process::exit(1);
    }
    println!("  Bit vectors: {}", bits_path);

    if let Some(first) = offspring.first() {
        let midi_path = format!("{}.mid", prefix);
        match write_midi(first, tempo, Path::new(&midi_path)) {
            Ok(()) => println!("  First offspring MIDI: {}", midi_path),
            Err(e) => {
                eprintln!("  Error writing MIDI: {}", e);
                std::process::exit(1);
            }
        }
    }

    let summary = RunSummary {
        seed,
        population: population.iter().map(|f| f.to_string()).collect(),
        offspring: offspring.iter().map(|f| f.to_string()).collect(),
    };
    let summary_path = format!("{}.json", prefix);
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => {
            if let Err(e) = std::fs::write(&summary_path, json) {
                eprintln!("  Error writing summary: {}", e);
                std::process::exit(1);
            }
            println!("  Run summary: {}", summary_path);
        }
        Err(e) => {
            eprintln!("  Error serializing summary: {}", e);
            std::process::exit(1);
        }
    }

    println!();
    println!("Rate the vectors in {} and breed the next generation.", bits_path);
}

/// Write every fragment's wire line, population first, then offspring.
fn write_bits(
    population: &[Fragment],
    offspring: &[Fragment],
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = Vec::with_capacity(population.len() + offspring.len());
    for fragment in population.iter().chain(offspring) {
        lines.push(encode(fragment)?.to_line());
    }
    std::fs::write(path, lines.join("\n") + "\n")?;
    Ok(())
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
