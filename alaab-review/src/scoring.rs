//! Pairwise game similarity scoring
//!
//! Three sub-scores, each in [0, 1]:
//! - **Structural**: gameplay mechanics; mean of tool overlap, player-count
//!   bucket agreement and tag overlap over the dimensions at least one game
//!   describes. When neither game describes any of them, name similarity
//!   stands in, so bare records are judged on what they do have
//! - **Semantic**: lexical overlap of names (best pair over canonical + local
//!   names) mixed with description overlap
//! - **Heritage**: fixed credits for same heritage field and same
//!   country (or, failing that, same cultural region)
//!
//! The overall score is the weighted sum configured in [`MatchingConfig`].
//! Scoring is pure and symmetric: `score_pair(a, b)` and `score_pair(b, a)`
//! produce identical numbers.

use alaab_common::config::MatchingConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

use crate::normalizer::{normalize, symmetric_similarity, tokens};

/// Tool names at or above this normalized Levenshtein similarity are equal
const TOOL_MATCH_THRESHOLD: f64 = 0.85;

/// Scoring errors
#[derive(Debug, Error)]
pub enum ScoringError {
    /// A sub-score came out as NaN or infinity
    #[error("Non-finite {0} score")]
    NonFinite(&'static str),
}

/// The fields of a game that scoring looks at
#[derive(Debug, Clone)]
pub struct GameSnapshot {
    pub id: Uuid,
    pub canonical_name: String,
    pub local_names: Vec<String>,
    pub description: String,
    pub tools: Vec<String>,
    pub player_count: Option<String>,
    pub tag_ids: Vec<Uuid>,
    pub country_id: Uuid,
    pub region: Option<String>,
    pub heritage_field_id: Uuid,
}

/// Player-count bucket parsed from a free-text descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PlayerBucket {
    Solo,
    Pair,
    SmallGroup,
    LargeGroup,
}

impl PlayerBucket {
    /// Parse descriptors like "2", "2-4", "4+", "٣ لاعبين", "فردي"
    ///
    /// The largest number mentioned decides the bucket. Returns `None` when
    /// nothing recognizable is present.
    pub fn from_descriptor(descriptor: &str) -> Option<Self> {
        let mut max_count: Option<u32> = None;
        let mut current: Option<u32> = None;

        for ch in descriptor.chars() {
            let digit = match ch {
                '0'..='9' => Some(ch as u32 - '0' as u32),
                '\u{0660}'..='\u{0669}' => Some(ch as u32 - 0x0660),
                _ => None,
            };
            match digit {
                Some(d) => current = Some(current.unwrap_or(0).saturating_mul(10).saturating_add(d)),
                None => {
                    if let Some(n) = current.take() {
                        max_count = Some(max_count.map_or(n, |m| m.max(n)));
                    }
                }
            }
        }
        if let Some(n) = current {
            max_count = Some(max_count.map_or(n, |m| m.max(n)));
        }

        match max_count {
            Some(0) => None,
            Some(1) => Some(PlayerBucket::Solo),
            Some(2) => Some(PlayerBucket::Pair),
            Some(3..=6) => Some(PlayerBucket::SmallGroup),
            Some(_) => Some(PlayerBucket::LargeGroup),
            None => {
                let normalized = normalize(descriptor);
                if normalized.contains("فردي") || normalized.contains("solo") {
                    Some(PlayerBucket::Solo)
                } else if normalized.contains("ثنائي") || normalized.contains("pair") {
                    Some(PlayerBucket::Pair)
                } else {
                    None
                }
            }
        }
    }

    fn rank(self) -> i32 {
        match self {
            PlayerBucket::Solo => 0,
            PlayerBucket::Pair => 1,
            PlayerBucket::SmallGroup => 2,
            PlayerBucket::LargeGroup => 3,
        }
    }

    /// 1.0 for the same bucket, 0.5 for neighbours, 0.0 otherwise
    pub fn agreement(self, other: PlayerBucket) -> f64 {
        match (self.rank() - other.rank()).abs() {
            0 => 1.0,
            1 => 0.5,
            _ => 0.0,
        }
    }
}

/// Human-readable rationale plus the partial measures behind the scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchExplanation {
    pub summary: String,
    pub reasons: Vec<String>,
    pub name_similarity: f64,
    pub description_similarity: Option<f64>,
    pub tool_overlap: Option<f64>,
    pub player_agreement: Option<f64>,
    pub tag_overlap: Option<f64>,
    /// Neither game describes tools, players or tags; structural is the
    /// name similarity
    #[serde(default)]
    pub structural_from_names: bool,
    pub same_heritage_field: bool,
    pub same_country: bool,
    pub same_region: bool,
}

/// Result of scoring one pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityScores {
    pub structural: f64,
    pub semantic: f64,
    pub heritage: f64,
    pub overall: f64,
    pub explanation: MatchExplanation,
}

impl SimilarityScores {
    /// Whether this pair belongs in the review queue
    pub fn meets_threshold(&self, config: &MatchingConfig) -> bool {
        self.overall >= config.threshold
    }
}

/// Score a pair of games
pub fn score_pair(
    a: &GameSnapshot,
    b: &GameSnapshot,
    config: &MatchingConfig,
) -> Result<SimilarityScores, ScoringError> {
    let tool_overlap = fuzzy_overlap(&a.tools, &b.tools);
    let player_agreement = match (
        a.player_count.as_deref().and_then(PlayerBucket::from_descriptor),
        b.player_count.as_deref().and_then(PlayerBucket::from_descriptor),
    ) {
        (Some(x), Some(y)) => Some(x.agreement(y)),
        (None, None) => None,
        _ => Some(0.0),
    };
    let tag_overlap = jaccard(&a.tag_ids, &b.tag_ids);

    let name_similarity = best_name_similarity(a, b);
    let described = mean_of_present(&[tool_overlap, player_agreement, tag_overlap]);
    let structural_from_names = described.is_none();
    let structural = described.unwrap_or(name_similarity);
    let description_similarity =
        if a.description.trim().is_empty() || b.description.trim().is_empty() {
            None
        } else {
            Some(symmetric_similarity(&a.description, &b.description))
        };
    let semantic = match description_similarity {
        Some(desc) => config.name_weight * name_similarity + config.description_weight * desc,
        None => name_similarity,
    };

    let same_heritage_field = a.heritage_field_id == b.heritage_field_id;
    let same_country = a.country_id == b.country_id;
    let same_region = match (&a.region, &b.region) {
        (Some(x), Some(y)) => {
            let x = normalize(x);
            !x.is_empty() && x == normalize(y)
        }
        _ => false,
    };
    let mut heritage = 0.0;
    if same_heritage_field {
        heritage += config.heritage_field_credit;
    }
    if same_country {
        heritage += config.same_country_credit;
    } else if same_region {
        heritage += config.same_region_credit;
    }

    let structural = checked_unit(structural, "structural")?;
    let semantic = checked_unit(semantic, "semantic")?;
    let heritage = checked_unit(heritage, "heritage")?;
    let overall = checked_unit(
        config.structural_weight * structural
            + config.semantic_weight * semantic
            + config.heritage_weight * heritage,
        "overall",
    )?;

    let reasons = build_reasons(
        same_heritage_field,
        same_country,
        same_region,
        name_similarity,
        tool_overlap,
    );

    Ok(SimilarityScores {
        structural,
        semantic,
        heritage,
        overall,
        explanation: MatchExplanation {
            summary: summarize(&reasons),
            reasons,
            name_similarity,
            description_similarity,
            tool_overlap,
            player_agreement,
            tag_overlap,
            structural_from_names,
            same_heritage_field,
            same_country,
            same_region,
        },
    })
}

fn checked_unit(value: f64, what: &'static str) -> Result<f64, ScoringError> {
    if !value.is_finite() {
        return Err(ScoringError::NonFinite(what));
    }
    Ok(value.clamp(0.0, 1.0))
}

/// Mean of the dimensions that are present, `None` if none are
fn mean_of_present(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    Some(present.iter().sum::<f64>() / present.len() as f64)
}

/// Share of tools on both sides that find a (fuzzy) counterpart
///
/// `None` when neither game lists tools; 0.0 when only one does.
fn fuzzy_overlap(a: &[String], b: &[String]) -> Option<f64> {
    let a = canonical_items(a);
    let b = canonical_items(b);

    if a.is_empty() && b.is_empty() {
        return None;
    }
    if a.is_empty() || b.is_empty() {
        return Some(0.0);
    }

    let matched_a = a.iter().filter(|x| b.iter().any(|y| items_match(x, y))).count();
    let matched_b = b.iter().filter(|y| a.iter().any(|x| items_match(x, y))).count();

    Some((matched_a + matched_b) as f64 / (a.len() + b.len()) as f64)
}

fn canonical_items(items: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .iter()
        .map(|item| tokens(item).join(" "))
        .filter(|item| !item.is_empty() && seen.insert(item.clone()))
        .collect()
}

fn items_match(x: &str, y: &str) -> bool {
    x == y || strsim::normalized_levenshtein(x, y) >= TOOL_MATCH_THRESHOLD
}

fn jaccard(a: &[Uuid], b: &[Uuid]) -> Option<f64> {
    let a: HashSet<&Uuid> = a.iter().collect();
    let b: HashSet<&Uuid> = b.iter().collect();

    if a.is_empty() && b.is_empty() {
        return None;
    }

    let intersection = a.intersection(&b).count();
    let union = a.union(&b).count();
    Some(intersection as f64 / union as f64)
}

fn best_name_similarity(a: &GameSnapshot, b: &GameSnapshot) -> f64 {
    let names_a: Vec<&str> = all_names(a);
    let names_b: Vec<&str> = all_names(b);

    names_a
        .iter()
        .flat_map(|x| names_b.iter().map(move |y| symmetric_similarity(x, y)))
        .fold(0.0, f64::max)
}

fn all_names(game: &GameSnapshot) -> Vec<&str> {
    std::iter::once(game.canonical_name.as_str())
        .chain(game.local_names.iter().map(String::as_str))
        .filter(|name| !name.trim().is_empty())
        .collect()
}

fn build_reasons(
    same_heritage_field: bool,
    same_country: bool,
    same_region: bool,
    name_similarity: f64,
    tool_overlap: Option<f64>,
) -> Vec<String> {
    let mut reasons = Vec::new();

    if same_heritage_field {
        reasons.push("same heritage field".to_string());
    }
    if same_country {
        reasons.push("same country".to_string());
    } else if same_region {
        reasons.push("same region".to_string());
    }
    if name_similarity > 0.0 {
        reasons.push(format!("{:.0}% name overlap", name_similarity * 100.0));
    }
    if let Some(overlap) = tool_overlap.filter(|o| *o > 0.0) {
        reasons.push(format!("{:.0}% shared tools", overlap * 100.0));
    }

    reasons
}

fn summarize(reasons: &[String]) -> String {
    match reasons {
        [] => "no shared characteristics".to_string(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}
