use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use minifill::{place_seeds, Engine, ExclusionSet, FillOptions, Grid, Lexicon};

#[derive(Parser)]
#[command(name = "minifill", version, about = "Fill a 5x5 mini crossword from a scored word list")]
struct Args {
    /// Directory holding 2_letter_words.txt .. 5_letter_words.txt
    #[arg(long, value_name = "DIR")]
    words: PathBuf,

    /// Grid template file: five lines of '.' (empty), '#' or '■' (block),
    /// and letters. Omit to start from a blank grid.
    #[arg(long, value_name = "FILE")]
    grid: Option<PathBuf>,

    /// Seed word to place before filling (repeatable)
    #[arg(long = "seed-word", value_name = "WORD")]
    seed_words: Vec<String>,

    /// Minimum acceptable word score
    #[arg(long, default_value_t = minifill::fill::DEFAULT_MIN_SCORE)]
    min_score: u8,

    /// Soft deadline in milliseconds
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Number of independent retry searches
    #[arg(long, default_value_t = 100)]
    max_attempts: u32,

    /// Seed for the deterministic candidate jitter
    #[arg(long, default_value_t = 0)]
    rng_seed: u64,

    /// Word the fill must not use (repeatable)
    #[arg(long = "exclude", value_name = "WORD")]
    exclude: Vec<String>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("minifill: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), String> {
    let lex = Lexicon::load_dir(&args.words).map_err(|e| e.to_string())?;

    let mut grid = match &args.grid {
        Some(path) => {
            let template = std::fs::read_to_string(path)
                .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
            Grid::parse(&template).map_err(|e| e.to_string())?
        }
        None => Grid::blank(),
    };
    if !args.seed_words.is_empty() {
        grid = place_seeds(&grid, &args.seed_words).map_err(|e| e.to_string())?;
    }

    let opts = FillOptions {
        min_score: args.min_score,
        exclude: ExclusionSet::from_words(&args.exclude),
        timeout: Duration::from_millis(args.timeout_ms),
        max_attempts: args.max_attempts,
        rng_seed: args.rng_seed,
        ..FillOptions::default()
    };

    let engine = Engine::new(&lex);
    match engine.quick_fill(&grid, &opts) {
        Ok(success) => {
            print!("{}", success.solution);
            println!();
            for (slot, word) in &success.words {
                println!(
                    "{:>3}  {}  ({})",
                    slot.to_string(),
                    word,
                    lex.dictionary().score(word)
                );
            }
            println!();
            println!(
                "quality {:.1}, average word score {:.1}",
                success.quality_score, success.average_word_score
            );
            println!(
                "{} attempt(s), {} nodes, {} backtracks, {} ms",
                success.stats.attempts,
                success.stats.nodes,
                success.stats.backtracks,
                success.elapsed.as_millis()
            );
            Ok(())
        }
        Err(failure) => Err(format!(
            "{} after {} ms ({} of {} slots filled)",
            failure.reason.code(),
            failure.elapsed.as_millis(),
            failure.stats.slots_filled,
            failure.stats.slot_count
        )),
    }
}
