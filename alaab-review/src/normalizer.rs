//! Arabic-aware text normalization
//!
//! Reduces catalogue text to a comparable canonical form:
//! - hamza-bearing alef variants and alef wasla → bare alef (ا)
//! - alef maqsura (ى) → yaa (ي)
//! - taa marbuta (ة) → haa (ه)
//! - diacritics (harakat, tanween, shadda, sukun, superscript alef) and
//!   tatweel removed
//! - lowercase, whitespace runs collapsed to one space, trimmed
//!
//! `semantic_similarity` is a coarse lexical-overlap measure over these
//! canonical forms. It approximates semantic closeness; it is not an NLP
//! model and does not understand meaning.

use std::collections::HashSet;

const TATWEEL: char = '\u{0640}';

/// Minimum characters a stem keeps after affix removal
const MIN_STEM_CHARS: usize = 3;

/// Definite-article prefixes, longest first (checked before letter folding)
const ARTICLE_PREFIXES: [&str; 6] = ["وال", "بال", "كال", "فال", "لل", "ال"];

/// Plural, dual and possessive endings (in folded form)
const SUFFIXES: [&str; 9] = ["ات", "ون", "ين", "ان", "ها", "هم", "هن", "كم", "نا"];

fn is_diacritic(ch: char) -> bool {
    matches!(ch, '\u{064B}'..='\u{065F}' | '\u{0670}')
}

fn fold_letter(ch: char) -> char {
    match ch {
        'أ' | 'إ' | 'آ' | 'ٱ' => 'ا',
        'ى' => 'ي',
        'ة' => 'ه',
        other => other,
    }
}

/// Drop diacritics and tatweel, lowercase, collapse whitespace
fn strip_marks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for ch in text.chars() {
        if is_diacritic(ch) || ch == TATWEEL {
            continue;
        }
        if ch.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.extend(ch.to_lowercase());
    }

    out
}

fn fold_letters(text: &str) -> String {
    text.chars().map(fold_letter).collect()
}

/// Normalize text to its canonical comparable form
///
/// # Examples
///
/// ```
/// use alaab_review::normalizer::normalize;
///
/// assert_eq!(normalize("  أُمّ   الـــكَرة "), "ام الكره");
/// assert_eq!(normalize(""), "");
/// ```
pub fn normalize(text: &str) -> String {
    fold_letters(&strip_marks(text))
}

/// Light stemming of a single word
///
/// Removes one definite-article prefix and one plural/dual/possessive
/// suffix, each only when at least three characters remain. The article is
/// matched before hamza folding, so words starting with أ are never read as
/// carrying ال. Multi-word input is stemmed word by word.
pub fn stem(word: &str) -> String {
    let stripped = strip_marks(word);
    if stripped.contains(' ') {
        return stripped
            .split(' ')
            .map(stem_single)
            .collect::<Vec<_>>()
            .join(" ");
    }
    stem_single(&stripped)
}

fn stem_single(stripped: &str) -> String {
    let mut chars: Vec<char> = stripped.chars().collect();

    for prefix in ARTICLE_PREFIXES {
        let prefix: Vec<char> = prefix.chars().collect();
        if chars.starts_with(&prefix) && chars.len() - prefix.len() >= MIN_STEM_CHARS {
            chars.drain(..prefix.len());
            break;
        }
    }

    let mut chars: Vec<char> = chars.into_iter().map(fold_letter).collect();

    for suffix in SUFFIXES {
        let suffix: Vec<char> = suffix.chars().collect();
        if chars.ends_with(&suffix) && chars.len() - suffix.len() >= MIN_STEM_CHARS {
            chars.truncate(chars.len() - suffix.len());
            break;
        }
    }

    chars.into_iter().collect()
}

/// Normalized, stemmed word tokens of a text
pub fn tokens(text: &str) -> Vec<String> {
    strip_marks(text)
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(stem_single)
        .filter(|w| !w.is_empty())
        .collect()
}

fn compact(text: &str) -> Vec<char> {
    normalize(text).chars().filter(|c| !c.is_whitespace()).collect()
}

/// Character-overlap similarity of two texts in [0, 1]
///
/// Both texts are normalized with whitespace removed. Identical forms score
/// 1.0, two empty texts included; otherwise the score is the number of
/// characters of `a` that also occur in `b`, divided by the longer length,
/// so empty against non-empty scores 0.0. Directional: see
/// [`symmetric_similarity`].
pub fn semantic_similarity(a: &str, b: &str) -> f64 {
    let a = compact(a);
    let b = compact(b);

    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let b_chars: HashSet<char> = b.iter().copied().collect();
    let shared = a.iter().filter(|c| b_chars.contains(c)).count();
    let longer = a.len().max(b.len());

    (shared as f64 / longer as f64).clamp(0.0, 1.0)
}

/// Mean of both directions of [`semantic_similarity`]
pub fn symmetric_similarity(a: &str, b: &str) -> f64 {
    (semantic_similarity(a, b) + semantic_similarity(b, a)) / 2.0
}
