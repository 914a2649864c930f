//! Relevance gate: a cheap lexical check of topical fit.
//!
//! The score is the best longest-common-subsequence overlap between the
//! shorter lowercase string and any same-length window of the longer one,
//! divided by the shorter length. Windows are scanned with a bit-parallel
//! LCS and skipped when a character-count bound shows they cannot beat the
//! best so far.
//!
//! This is approximate. It catches obviously unrelated requests and will
//! admit some unrelated ones; thresholds are tunable per corpus.

use parley_core::retrieval::RetrievedPassage;
use std::collections::HashMap;

/// Topics are clipped to this many chars before scoring.
pub const MAX_TOPIC_CHARS: usize = 256;

const WORD: usize = u64::BITS as usize;

/// Decides whether a topic is answerable from retrieved passages.
pub trait RelevanceGate: Send + Sync {
    fn name(&self) -> &str;

    /// Similarity of `topic` to one passage, in [0, 1].
    fn score(&self, topic: &str, passage: &str) -> f64;

    /// True when any passage scores strictly above `threshold`.
    fn is_related(&self, topic: &str, passages: &[RetrievedPassage], threshold: f64) -> bool {
        passages
            .iter()
            .any(|p| self.score(topic, &p.text) > threshold)
    }
}

/// The default gate: case-insensitive best-window LCS ratio.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalGate;

impl RelevanceGate for LexicalGate {
    fn name(&self) -> &str {
        "lexical"
    }

    fn score(&self, topic: &str, passage: &str) -> f64 {
        similarity_ratio(clip_chars(topic, MAX_TOPIC_CHARS), passage)
    }
}

/// Convenience over [`LexicalGate`].
pub fn is_related(topic: &str, passages: &[RetrievedPassage], threshold: f64) -> bool {
    LexicalGate.is_related(topic, passages, threshold)
}

/// Case-insensitive partial similarity ratio in [0, 1]: the best LCS of the
/// shorter string against a same-length window of the longer, over the
/// shorter length.
///
/// Returns 0.0 when either side is empty.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    best_window_lcs(short, long) as f64 / short.len() as f64
}

fn clip_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Best LCS of `short` against any `short.len()`-char window of `long`.
/// Requires `0 < short.len() <= long.len()`.
fn best_window_lcs(short: &[char], long: &[char]) -> usize {
    let n = short.len();
    let matcher = BitMatcher::new(short);
    let ids: Vec<Option<usize>> = long.iter().map(|c| matcher.symbol(*c)).collect();

    // Upper bound on any window's LCS: the size of the char-multiset
    // intersection with `short`, kept current as the window slides.
    let mut have = vec![0usize; matcher.need.len()];
    let mut bound = 0;
    for &id in ids[..n].iter().flatten() {
        have[id] += 1;
        if have[id] <= matcher.need[id] {
            bound += 1;
        }
    }

    let mut best = 0;
    for start in 0..=long.len() - n {
        if start > 0 {
            if let Some(out) = ids[start - 1] {
                if have[out] <= matcher.need[out] {
                    bound -= 1;
                }
                have[out] -= 1;
            }
            if let Some(inn) = ids[start + n - 1] {
                have[inn] += 1;
                if have[inn] <= matcher.need[inn] {
                    bound += 1;
                }
            }
        }

        if bound > best {
            best = best.max(matcher.lcs(&ids[start..start + n]));
            if best == n {
                break;
            }
        }
    }
    best
}

/// Bit-parallel LCS against a fixed pattern (Crochemore et al.), one bit
/// per pattern position.
struct BitMatcher {
    len: usize,
    symbols: HashMap<char, usize>,
    /// Per symbol: bit `i` set where the pattern has that symbol at `i`
    masks: Vec<Vec<u64>>,
    /// Per symbol: occurrences in the pattern
    need: Vec<usize>,
}

impl BitMatcher {
    fn new(pattern: &[char]) -> Self {
        let words = pattern.len().div_ceil(WORD);
        let mut symbols = HashMap::new();
        let mut masks: Vec<Vec<u64>> = Vec::new();
        let mut need = Vec::new();

        for (i, c) in pattern.iter().enumerate() {
            let id = *symbols.entry(*c).or_insert_with(|| {
                masks.push(vec![0; words]);
                need.push(0);
                masks.len() - 1
            });
            masks[id][i / WORD] |= 1 << (i % WORD);
            need[id] += 1;
        }

        Self {
            len: pattern.len(),
            symbols,
            masks,
            need,
        }
    }

    fn symbol(&self, c: char) -> Option<usize> {
        self.symbols.get(&c).copied()
    }

    /// LCS length of the pattern and `text`, given as symbol ids.
    fn lcs(&self, text: &[Option<usize>]) -> usize {
        let words = self.len.div_ceil(WORD);
        let mut v = vec![u64::MAX; words];

        for &id in text.iter().flatten() {
            let m = &self.masks[id];
            let mut carry = false;
            for (word, &mask) in v.iter_mut().zip(m) {
                let u = *word & mask;
                let (sum, c1) = word.overflowing_add(u);
                let (sum, c2) = sum.overflowing_add(u64::from(carry));
                carry = c1 || c2;
                *word = sum | (*word & !mask);
            }
        }

        // Zero bits among the low `len` positions
        v.iter()
            .enumerate()
            .map(|(k, word)| {
                let bits = (self.len - k * WORD).min(WORD);
                let live = if bits == WORD { u64::MAX } else { (1u64 << bits) - 1 };
                bits - (word & live).count_ones() as usize
            })
            .sum()
    }
}

/// The text a tool call is gated on: every string argument, space-joined,
/// or the tool name when there are none.
pub fn tool_topic(call: &parley_core::tool::ToolCallRequest) -> String {
    let args = call.string_arguments();
    if args.is_empty() {
        call.name.clone()
    } else {
        args.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::tool::ToolCallRequest;

    fn passages(texts: &[&str]) -> Vec<RetrievedPassage> {
        texts.iter().map(|t| RetrievedPassage::new(*t)).collect()
    }

    #[test]
    fn related_topic_passes_low_threshold() {
        assert!(is_related(
            "python loops",
            &passages(&["python is a language"]),
            0.1
        ));
    }

    #[test]
    fn unrelated_topic_fails_high_threshold() {
        assert!(!is_related(
            "quantum physics",
            &passages(&["python is a language"]),
            0.9
        ));
    }

    #[test]
    fn default_threshold_separates_examples() {
        let docs = passages(&["python is a language"]);
        assert!(is_related("python loops", &docs, 0.5));
        assert!(!is_related("quantum physics", &docs, 0.5));
    }

    #[test]
    fn identical_strings_score_one() {
        assert!((similarity_ratio("Rust", "rust") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn substring_scores_one() {
        let score = similarity_ratio("borrow checker", "The borrow checker enforces aliasing rules.");
        assert!((score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn score_is_symmetric_and_bounded() {
        let pairs = [
            ("python loops", "python is a language"),
            ("abc", "xyz"),
            ("weather in paris", "cargo workspaces"),
        ];
        for (a, b) in pairs {
            let ab = similarity_ratio(a, b);
            assert!((ab - similarity_ratio(b, a)).abs() < f64::EPSILON);
            assert!((0.0..=1.0).contains(&ab));
        }
        assert_eq!(similarity_ratio("abc", "xyz"), 0.0);
    }

    #[test]
    fn empty_inputs_score_zero() {
        assert_eq!(similarity_ratio("", "anything"), 0.0);
        assert_eq!(similarity_ratio("anything", ""), 0.0);
    }

    #[test]
    fn no_passages_is_never_related() {
        assert!(!is_related("python", &[], 0.0));
    }

    #[test]
    fn threshold_comparison_is_strict() {
        let docs = passages(&["rust"]);
        assert!(!is_related("rust", &docs, 1.0));
        assert!(is_related("rust", &docs, 0.99));
    }

    /// Windowed LCS by plain dynamic programming, for cross-checking.
    fn reference_ratio(a: &str, b: &str) -> f64 {
        fn lcs(a: &[char], b: &[char]) -> usize {
            let mut prev = vec![0usize; b.len() + 1];
            for &ca in a {
                let mut curr = vec![0usize; b.len() + 1];
                for (j, &cb) in b.iter().enumerate() {
                    curr[j + 1] = if ca == cb {
                        prev[j] + 1
                    } else {
                        prev[j + 1].max(curr[j])
                    };
                }
                prev = curr;
            }
            prev[b.len()]
        }

        let a: Vec<char> = a.to_lowercase().chars().collect();
        let b: Vec<char> = b.to_lowercase().chars().collect();
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
        let best = long
            .windows(short.len())
            .map(|w| lcs(short, w))
            .max()
            .unwrap_or(0);
        best as f64 / short.len() as f64
    }

    #[test]
    fn bit_parallel_lcs_matches_dynamic_programming() {
        let a: Vec<char> = "abcde".chars().collect();
        let matcher = BitMatcher::new(&a);
        let text: Vec<Option<usize>> = "ace".chars().map(|c| matcher.symbol(c)).collect();
        assert_eq!(matcher.lcs(&text), 3);

        let long_topic = "ownership and borrowing rules in rust ".repeat(3);
        let pairs = [
            ("python loops", "python is a language"),
            ("the quick brown fox", "a quick brown dog jumps over the lazy fox"),
            ("abab ba", "bbaab abba baab"),
            (
                long_topic.as_str(),
                "rust enforces ownership; borrowing rules keep references valid while a value is shared or mutated",
            ),
            ("Ünïcödé text", "some ÜNÏCÖDÉ TEXT here"),
        ];
        for (a, b) in pairs {
            let fast = similarity_ratio(a, b);
            assert!((fast - reference_ratio(a, b)).abs() < 1e-12, "{a:?} vs {b:?}");
        }
    }

    #[test]
    fn known_scores() {
        assert!((similarity_ratio("python loops", "python is a language") - 8.0 / 12.0).abs() < 1e-12);
        assert!((similarity_ratio("quantum physics", "python is a language") - 4.0 / 15.0).abs() < 1e-12);
        assert!((similarity_ratio("weather in paris", "cargo workspaces") - 6.0 / 16.0).abs() < 1e-12);
    }

    #[test]
    fn long_topic_against_large_passage_is_fast() {
        let topic = "please look up the migratory patterns of arctic terns and their feeding grounds \
            during the southern summer, including distances flown, altitude, typical flock sizes \
            and how climate shifts have altered departure dates over the last several decades of \
            observation by ornithologists around the world and on remote islands";
        assert!(topic.chars().count() > 300);
        let passage = "Cargo is the Rust package manager. It downloads dependencies, compiles \
            packages, makes distributable packages and uploads them to crates.io. "
            .repeat(22);
        assert!(passage.len() > 3000);

        let started = std::time::Instant::now();
        let score = LexicalGate.score(topic, &passage);
        let elapsed = started.elapsed();

        assert!((0.0..=1.0).contains(&score));
        assert!(elapsed < std::time::Duration::from_secs(1), "took {elapsed:?}");
    }

    #[test]
    fn gate_clips_long_topics() {
        let topic = format!("{}{}", "rust ".repeat(60), "zzzz".repeat(100));
        let clipped = clip_chars(&topic, MAX_TOPIC_CHARS);
        assert_eq!(clipped.chars().count(), MAX_TOPIC_CHARS);
        // Only the clipped prefix is scored, so the trailing noise is ignored.
        assert!(LexicalGate.score(&topic, &"rust ".repeat(80)) > 0.99);
    }

    #[test]
    fn tool_topic_joins_string_arguments() {
        let call = ToolCallRequest {
            id: "c1".into(),
            name: "weather".into(),
            arguments: serde_json::json!({"city": "Paris", "days": 3}),
        };
        assert_eq!(tool_topic(&call), "Paris");

        let bare = ToolCallRequest {
            id: "c2".into(),
            name: "current_time".into(),
            arguments: serde_json::json!({}),
        };
        assert_eq!(tool_topic(&bare), "current_time");
    }
}
