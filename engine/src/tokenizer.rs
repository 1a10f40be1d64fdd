use lazy_static::lazy_static;
use parking_lot::Mutex;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;
use std::collections::{HashMap, HashSet, VecDeque};

lazy_static! {
    static ref MENTION: Regex = Regex::new(r"@[A-Za-z0-9]+").expect("valid regex");
    static ref RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}][\p{L}\p{N}_']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

pub const DEFAULT_STEM_CACHE_CAPACITY: usize = 10_000;

/// Text normalization collaborator: raw text in, ordered tokens out.
///
/// Implementations must be deterministic. Any `Fn(&str) -> Vec<String>`
/// closure qualifies, which keeps tests independent of the English pipeline.
pub trait Preprocess: Send + Sync {
    fn preprocess(&self, text: &str) -> Vec<String>;
}

impl<F> Preprocess for F
where
    F: Fn(&str) -> Vec<String> + Send + Sync,
{
    fn preprocess(&self, text: &str) -> Vec<String> { self(text) }
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Bounded word -> stem memo with first-in-first-out eviction.
pub struct StemCache {
    capacity: usize,
    entries: HashMap<String, String>,
    order: VecDeque<String>,
}

impl StemCache {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, entries: HashMap::new(), order: VecDeque::new() }
    }

    pub fn get(&self, word: &str) -> Option<&String> { self.entries.get(word) }

    pub fn insert(&mut self, word: String, stem: String) {
        if self.capacity == 0 || self.entries.contains_key(&word) { return; }
        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(word.clone());
        self.entries.insert(word, stem);
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

/// English pipeline: mention stripping, NFKC, lowercase, stopword removal,
/// Snowball stemming with a shared stem cache.
pub struct Preprocessor {
    cache: Mutex<StemCache>,
}

impl Default for Preprocessor {
    fn default() -> Self { Self::with_cache_capacity(DEFAULT_STEM_CACHE_CAPACITY) }
}

impl Preprocessor {
    pub fn new() -> Self { Self::default() }

    pub fn with_cache_capacity(capacity: usize) -> Self {
        Self { cache: Mutex::new(StemCache::new(capacity)) }
    }

    pub fn cached_stems(&self) -> usize { self.cache.lock().len() }

    fn stem(&self, word: &str) -> String {
        if let Some(stem) = self.cache.lock().get(word) {
            return stem.clone();
        }
        let stem = STEMMER.stem(word).to_string();
        self.cache.lock().insert(word.to_string(), stem.clone());
        stem
    }
}

impl Preprocess for Preprocessor {
    fn preprocess(&self, text: &str) -> Vec<String> {
        let stripped = MENTION.replace_all(text, " ");
        let normalized = stripped.nfkc().collect::<String>().to_lowercase();
        RE.find_iter(&normalized)
            .map(|m| m.as_str())
            .filter(|token| !is_stopword(token))
            .map(|token| self.stem(token))
            .collect()
    }
}

/// Tokenize with a throwaway pipeline. Prefer a long-lived [`Preprocessor`]
/// when processing many documents so the stem cache is reused.
pub fn tokenize(text: &str) -> Vec<String> {
    Preprocessor::with_cache_capacity(0).preprocess(text)
}
