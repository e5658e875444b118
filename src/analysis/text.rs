//! Keyword extraction for the page index
//!
//! Page text is reduced to a bag of stemmed keywords: URLs, emails, handles
//! and punctuation go away, short words and stopwords are dropped and the
//! rest is stemmed and counted.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::{HashMap, HashSet};

static URL_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://\S+|www\.\S+|\S+\.\S+").expect("valid regex"));
static EMAIL_LIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+@\S+\.\S+").expect("valid regex"));
static HANDLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@\w+").expect("valid regex"));
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));

static STEMMER: Lazy<Stemmer> = Lazy::new(|| Stemmer::create(Algorithm::English));

const STOPWORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "and", "or", "but", "in", "with", "to", "for",
    "of", "as", "by", "that", "this", "it", "from", "they", "we", "you", "i", "me", "my", "your",
    "are", "was", "were", "been", "be", "have", "has", "had", "do", "does", "did", "will",
    "would", "could", "should", "may", "might", "must", "can", "shall", "am", "who", "what",
    "where", "when", "why", "how", "all", "any", "both", "each", "few", "more", "most", "other",
    "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than", "too", "very", "now",
    "just", "last", "till", "unless",
];

const PREPOSITIONS: &[&str] = &[
    "about", "above", "across", "after", "against", "along", "among", "around", "before",
    "behind", "below", "beneath", "beside", "between", "beyond", "during", "except", "inside",
    "into", "near", "over", "through", "throughout", "toward", "under", "until", "upon",
    "within", "without", "outside", "underneath", "alongside", "amid", "amidst", "concerning",
    "regarding", "despite", "excluding", "following", "including", "pending", "plus", "versus",
    "via", "according", "because", "since", "although", "though", "however", "therefore",
    "moreover", "furthermore", "nevertheless", "meanwhile", "otherwise", "consequently",
    "accordingly", "hence", "thus",
];

static IGNORED_WORDS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| STOPWORDS.iter().chain(PREPOSITIONS).copied().collect());

const RESIDUAL_PUNCTUATION: &[char] = &[
    '.', ',', '!', '?', ';', ':', '"', '\'', '(', ')', '[', ']', '{', '}', '<', '>',
];

/// Turns free text into stemmed keyword frequencies
///
/// Word characters are Unicode (`\w` matches letters of any script) and the
/// short-word cutoff counts characters, not bytes. So `café` and `東京タワー`
/// are kept as whole keywords, and a three-character word such as `日本語`
/// is dropped like any other short word.
///
/// # Examples
///
/// ```
/// use button_trawler::analysis::keyword_frequencies;
///
/// let words = keyword_frequencies("Buttons! Buttons everywhere, see https://x.example/ for buttons");
/// assert_eq!(words.get("button"), Some(&3));
/// assert!(!words.contains_key("see"));
/// ```
pub fn keyword_frequencies(text: &str) -> HashMap<String, usize> {
    let text = text.to_lowercase();
    let text = URL_LIKE.replace_all(&text, "");
    let text = EMAIL_LIKE.replace_all(&text, "");
    let text = HANDLE.replace_all(&text, "");
    let text = NON_WORD.replace_all(&text, " ");

    let mut frequencies = HashMap::new();
    for word in text.split_whitespace() {
        if word.chars().count() <= 3 || IGNORED_WORDS.contains(word) {
            continue;
        }

        let stemmed = STEMMER.stem(word);
        let stemmed = stemmed.trim_matches(RESIDUAL_PUNCTUATION).trim();
        if stemmed.is_empty() {
            continue;
        }

        *frequencies.entry(stemmed.to_string()).or_insert(0) += 1;
    }

    frequencies
}

/// Whitespace-collapsed page text, cut to at most `limit` characters
pub fn embedding_text(raw: &str, limit: usize) -> String {
    let mut collapsed = String::new();
    for word in raw.split_whitespace() {
        if !collapsed.is_empty() {
            collapsed.push(' ');
        }
        collapsed.push_str(word);
    }

    match collapsed.char_indices().nth(limit) {
        Some((cut, _)) => collapsed[..cut].to_string(),
        None => collapsed,
    }
}
