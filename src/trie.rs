use std::collections::BTreeMap;

use crate::dict::{Dictionary, WordEntry, MAX_WORD_LEN, MIN_WORD_LEN};

/// Sentinel for an unconstrained position in a pattern.
pub const WILDCARD: u8 = b'.';

#[derive(Debug, Default)]
struct TrieNode {
    // BTreeMap rather than a hash map: fan-out at wildcard positions must
    // enumerate children in a stable (alphabetical) order.
    children: BTreeMap<u8, TrieNode>,
    score: Option<u8>,
}

impl TrieNode {
    fn add(&mut self, word: &[u8], score: u8) {
        match word.first() {
            Some(&letter) => self
                .children
                .entry(letter)
                .or_default()
                .add(&word[1..], score),
            None => self.score = Some(score),
        }
    }

    /// Collect words matching `pattern` below this node. Returns `false` once
    /// `limit` matches have been collected, which unwinds the whole walk.
    fn matches(
        &self,
        pattern: &[u8],
        prefix: &mut Vec<u8>,
        limit: usize,
        out: &mut Vec<WordEntry>,
    ) -> bool {
        let next = match pattern.first() {
            Some(&next) => next,
            None => {
                if let Some(score) = self.score {
                    out.push(WordEntry {
                        word: String::from_utf8_lossy(prefix).into_owned(),
                        score,
                    });
                }
                return out.len() < limit;
            }
        };

        if next == WILDCARD {
            for (&letter, child) in &self.children {
                prefix.push(letter);
                let keep_going = child.matches(&pattern[1..], prefix, limit, out);
                prefix.pop();
                if !keep_going {
                    return false;
                }
            }
            return true;
        }

        match self.children.get(&next) {
            Some(child) => {
                prefix.push(next);
                let keep_going = child.matches(&pattern[1..], prefix, limit, out);
                prefix.pop();
                keep_going
            }
            None => true,
        }
    }
}

/// A prefix tree over the words of a single length. Terminal nodes carry the
/// word's score; internal nodes carry nothing.
#[derive(Debug)]
pub struct Trie {
    root: TrieNode,
    len: usize,
    word_count: usize,
}

impl Trie {
    pub fn build<'a, I>(len: usize, words: I) -> Trie
    where
        I: IntoIterator<Item = (&'a str, u8)>,
    {
        let mut root = TrieNode::default();
        let mut word_count = 0;
        for (word, score) in words {
            debug_assert_eq!(len, word.len());
            root.add(word.as_bytes(), score);
            word_count += 1;
        }
        Trie {
            root,
            len,
            word_count,
        }
    }

    /// Exact lookup; the score if `word` is present.
    pub fn lookup(&self, word: &str) -> Option<u8> {
        if word.len() != self.len {
            return None;
        }
        let mut node = &self.root;
        for &letter in word.as_bytes() {
            node = node.children.get(&letter)?;
        }
        node.score
    }

    /// Enumerate words matching `pattern` (letters fixed, [`WILDCARD`] free)
    /// in trie-traversal order, stopping after `limit` matches if given.
    pub fn matches(&self, pattern: &str, limit: Option<usize>) -> Vec<WordEntry> {
        let mut out = Vec::new();
        if pattern.len() != self.len {
            return out;
        }
        let limit = limit.unwrap_or(usize::MAX);
        if limit == 0 {
            return out;
        }
        let mut prefix = Vec::with_capacity(self.len);
        self.root
            .matches(pattern.as_bytes(), &mut prefix, limit, &mut out);
        out
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }
}

/// One trie per supported word length, built from a [`Dictionary`].
#[derive(Debug)]
pub struct PatternIndex {
    tries: Vec<Trie>,
}

impl PatternIndex {
    pub fn build(dict: &Dictionary) -> PatternIndex {
        let tries = (0..=MAX_WORD_LEN)
            .map(|len| {
                Trie::build(
                    len,
                    dict.words_of_length(len)
                        .iter()
                        .map(|e| (e.word.as_str(), e.score)),
                )
            })
            .collect();
        PatternIndex { tries }
    }

    pub fn trie(&self, len: usize) -> Option<&Trie> {
        self.tries.get(len).filter(|t| t.word_count() > 0)
    }

    /// Pattern query dispatched on pattern length. Unsupported lengths match
    /// nothing.
    pub fn matches(&self, pattern: &str, limit: Option<usize>) -> Vec<WordEntry> {
        let len = pattern.len();
        if !(MIN_WORD_LEN..=MAX_WORD_LEN).contains(&len) {
            return Vec::new();
        }
        self.tries[len].matches(pattern, limit)
    }
}
