use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Shortest word length carried by the dictionary.
pub const MIN_WORD_LEN: usize = 2;
/// Longest word length carried by the dictionary (the board is 5x5).
pub const MAX_WORD_LEN: usize = 5;

/// Score assigned to a word whose source line carries no score.
pub const DEFAULT_SCORE: u8 = 50;
/// Upper bound of the score range; loaded values are clamped to it.
pub const MAX_SCORE: u8 = 100;

#[derive(Debug, Error)]
pub enum DictionaryError {
    /// None of the source files yielded a single word.
    #[error("no words loaded from {dir}")]
    NoWords { dir: PathBuf },
}

/// A dictionary word with its quality score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordEntry {
    pub word: String,
    pub score: u8,
}

/// The master word list: per-length buckets in source order plus a score map.
///
/// Built once and shared read-only for the life of the process; lookups never
/// fail and never allocate beyond normalizing the probe.
#[derive(Debug, Default)]
pub struct Dictionary {
    buckets: Vec<Vec<WordEntry>>,
    scores: FxHashMap<String, u8>,
}

/// Uppercase `word`, rejecting anything that is not pure ASCII letters.
pub(crate) fn normalize(word: &str) -> Option<String> {
    if word.is_empty() || !word.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    Some(word.to_ascii_uppercase())
}

impl Dictionary {
    pub fn new() -> Dictionary {
        Dictionary {
            buckets: vec![Vec::new(); MAX_WORD_LEN + 1],
            scores: FxHashMap::default(),
        }
    }

    /// Build a dictionary from in-memory entries. Invalid words are dropped
    /// with a warning; duplicates merge by keeping the higher score.
    pub fn from_entries<I, S>(entries: I) -> Dictionary
    where
        I: IntoIterator<Item = (S, u8)>,
        S: AsRef<str>,
    {
        let mut dict = Dictionary::new();
        for (word, score) in entries {
            dict.insert(word.as_ref(), score);
        }
        dict
    }

    /// Load the four per-length word lists (`2_letter_words.txt` ..
    /// `5_letter_words.txt`) from `dir`. A missing or unreadable file is a
    /// warning; loading nothing at all is an error.
    pub fn load_dir(dir: &Path) -> Result<Dictionary, DictionaryError> {
        let mut dict = Dictionary::new();
        for len in MIN_WORD_LEN..=MAX_WORD_LEN {
            let path = dir.join(format!("{}_letter_words.txt", len));
            let contents = match fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(err) => {
                    warn!("skipping word list {}: {}", path.display(), err);
                    continue;
                }
            };
            dict.load_lines(&contents, len, &path);
        }
        if dict.is_empty() {
            return Err(DictionaryError::NoWords {
                dir: dir.to_path_buf(),
            });
        }
        Ok(dict)
    }

    fn load_lines(&mut self, contents: &str, expected_len: usize, path: &Path) {
        for (lineno, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let raw = match parts.next() {
                Some(raw) => raw,
                None => continue,
            };
            let word = match normalize(raw) {
                Some(word) if word.len() == expected_len => word,
                _ => {
                    warn!(
                        "{}:{}: ignoring line {:?}",
                        path.display(),
                        lineno + 1,
                        line
                    );
                    continue;
                }
            };
            let score = match parts.next() {
                None => DEFAULT_SCORE,
                Some(raw_score) => match raw_score.parse::<i64>() {
                    Ok(value) => value.clamp(0, i64::from(MAX_SCORE)) as u8,
                    Err(_) => {
                        warn!(
                            "{}:{}: ignoring line {:?}",
                            path.display(),
                            lineno + 1,
                            line
                        );
                        continue;
                    }
                },
            };
            self.insert_normalized(word, score);
        }
    }

    fn insert(&mut self, word: &str, score: u8) {
        match normalize(word) {
            Some(word) if (MIN_WORD_LEN..=MAX_WORD_LEN).contains(&word.len()) => {
                self.insert_normalized(word, score.min(MAX_SCORE));
            }
            _ => warn!("ignoring invalid dictionary word {:?}", word),
        }
    }

    fn insert_normalized(&mut self, word: String, score: u8) {
        match self.scores.get_mut(&word) {
            Some(existing) => {
                // Duplicate: keep the higher score, both here and in the bucket.
                if score > *existing {
                    *existing = score;
                    let bucket = &mut self.buckets[word.len()];
                    if let Some(entry) = bucket.iter_mut().find(|e| e.word == word) {
                        entry.score = score;
                    }
                }
            }
            None => {
                self.scores.insert(word.clone(), score);
                self.buckets[word.len()].push(WordEntry { word, score });
            }
        }
    }

    /// Case-insensitive membership. Non-alphabetic input is simply absent.
    pub fn has(&self, word: &str) -> bool {
        match normalize(word) {
            Some(word) => self.scores.contains_key(&word),
            None => false,
        }
    }

    /// Score lookup; 0 for anything not in the dictionary.
    pub fn score(&self, word: &str) -> u8 {
        match normalize(word) {
            Some(word) => self.scores.get(&word).copied().unwrap_or(0),
            None => 0,
        }
    }

    /// Words of a given length in source order.
    pub fn words_of_length(&self, len: usize) -> &[WordEntry] {
        match self.buckets.get(len) {
            Some(bucket) => bucket,
            None => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}
