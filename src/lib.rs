use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

pub mod corpus;
pub mod error;
pub mod policy;
pub mod subtitle;

pub use corpus::{load_corpus, parse_corpus, resolve_scenes, Scene, UNKNOWN};
pub use error::{AppError, AppResult, ErrorKind};
pub use policy::{LexiconMatch, Policy, TemplateRule, ViolationDedup};

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: usize,
    pub share: f64,
}

/// `rate` is `None` when the corpus is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rate {
    pub count: usize,
    pub total: usize,
    pub rate: Option<f64>,
}

impl Rate {
    fn of(count: usize, total: usize) -> Self {
        Self {
            count,
            total,
            rate: ratio(count, total),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovementStats {
    pub distribution: Vec<CategoryCount>,
    pub push_in: Rate,
    pub static_shots: Rate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Uniqueness {
    pub total: usize,
    pub considered: usize,
    pub distinct: usize,
    pub ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateMatch {
    pub name: String,
    pub count: usize,
    pub previews: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceViolation {
    pub category: String,
    /// 1-based, inclusive.
    pub start_scene: usize,
    pub end_scene: usize,
    pub streak: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermCount {
    pub term: String,
    pub scenes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LexiconHits {
    pub none_found: bool,
    pub terms: Vec<TermCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordCountStats {
    pub mean: Option<f64>,
    pub too_short: usize,
    pub in_band: usize,
    pub too_long: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateCluster {
    pub normalized: String,
    pub scenes: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NarrationDuplicates {
    pub cluster_count: usize,
    pub clusters: Vec<DuplicateCluster>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MotionSample {
    pub index: usize,
    pub preview: String,
}

/// Everything the checks found. Field order is the serialization order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub scene_count: usize,
    pub movement: MovementStats,
    pub motion_uniqueness: Uniqueness,
    pub templates: Vec<TemplateMatch>,
    pub sequence_violations: Vec<SequenceViolation>,
    pub motion_lexicon: LexiconHits,
    pub visual_lexicon: LexiconHits,
    pub visual_word_counts: WordCountStats,
    pub narration_duplicates: NarrationDuplicates,
    pub environments: Vec<CategoryCount>,
    pub motion_samples: Vec<MotionSample>,
}

// ---------------------------------------------------------------------------
// Compiled patterns
// ---------------------------------------------------------------------------

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\w'-]+").unwrap());

const NUMBER_PLACEHOLDER: &str = "#";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ratio(count: usize, total: usize) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(count as f64 / total as f64)
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn contains_ci(haystack_lc: &str, needle: &str) -> bool {
    haystack_lc.contains(&needle.to_lowercase())
}

fn tokens(text: &str) -> Vec<String> {
    WORD_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Frequency of each label, highest first; ties keep first-seen order.
fn tally<'a>(labels: impl IntoIterator<Item = &'a str>) -> Vec<CategoryCount> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut total = 0usize;
    for label in labels {
        total += 1;
        let slot = counts.entry(label).or_insert(0);
        if *slot == 0 {
            order.push(label);
        }
        *slot += 1;
    }
    let mut out: Vec<CategoryCount> = order
        .into_iter()
        .map(|label| CategoryCount {
            label: label.to_string(),
            count: counts[label],
            share: counts[label] as f64 / total as f64,
        })
        .collect();
    // sort_by is stable
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

// ---------------------------------------------------------------------------
// Motion classification
// ---------------------------------------------------------------------------

/// First movement phrase contained in `text`, or `"unknown"`.
pub fn classify_motion<'p>(text: &str, movements: &'p [String]) -> &'p str {
    let lowered = text.to_lowercase();
    movements
        .iter()
        .find(|phrase| !phrase.is_empty() && contains_ci(&lowered, phrase))
        .map(String::as_str)
        .unwrap_or(UNKNOWN)
}

pub fn classify_all<'p>(scenes: &[Scene], policy: &'p Policy) -> Vec<&'p str> {
    scenes
        .iter()
        .map(|s| classify_motion(&s.motion_description, &policy.movements))
        .collect()
}

fn movement_stats(scenes: &[Scene], categories: &[&str], policy: &Policy) -> MovementStats {
    let push_in = scenes
        .iter()
        .filter(|s| {
            let lowered = s.motion_description.to_lowercase();
            policy
                .push_in_phrases
                .iter()
                .any(|p| contains_ci(&lowered, p))
        })
        .count();
    let static_shots = categories
        .iter()
        .filter(|c| **c == policy.static_category)
        .count();
    MovementStats {
        distribution: tally(categories.iter().copied()),
        push_in: Rate::of(push_in, scenes.len()),
        static_shots: Rate::of(static_shots, scenes.len()),
    }
}

// ---------------------------------------------------------------------------
// Sequence violations
// ---------------------------------------------------------------------------

fn violation(category: &str, start: usize, end: usize, streak: usize) -> SequenceViolation {
    SequenceViolation {
        category: category.to_string(),
        start_scene: start,
        end_scene: end,
        streak,
        message: format!("Scenes {start}-{end}: '{category}' x{streak}"),
    }
}

/// Runs of the same known category longer than `threshold`.
///
/// In [`ViolationDedup::Message`] mode every step past the threshold emits a
/// descriptor and repeated descriptor text is dropped, so a long run shows up
/// once per overflowing scene. [`ViolationDedup::Range`] reports each maximal
/// run once.
pub fn detect_violations(
    categories: &[&str],
    threshold: usize,
    dedup: ViolationDedup,
) -> Vec<SequenceViolation> {
    let mut found: Vec<SequenceViolation> = Vec::new();
    let mut streak = 1usize;
    for i in 1..categories.len() {
        let current = categories[i];
        let counted = !current.is_empty() && current != UNKNOWN;
        if counted && current == categories[i - 1] {
            streak += 1;
            if streak > threshold && dedup == ViolationDedup::Message {
                // streak >= 2 here, so i + 2 >= streak
                found.push(violation(current, i + 2 - streak, i + 1, streak));
            }
        } else {
            if streak > threshold.max(1) && dedup == ViolationDedup::Range {
                found.push(violation(categories[i - 1], i + 1 - streak, i, streak));
            }
            streak = 1;
        }
    }
    if streak > threshold.max(1) && dedup == ViolationDedup::Range {
        let n = categories.len();
        found.push(violation(categories[n - 1], n + 1 - streak, n, streak));
    }

    let mut unique: Vec<SequenceViolation> = Vec::new();
    for v in found {
        let seen = unique.iter().any(|u| match dedup {
            ViolationDedup::Message => u.message == v.message,
            ViolationDedup::Range => (u.start_scene, u.end_scene) == (v.start_scene, v.end_scene),
        });
        if !seen {
            unique.push(v);
        }
    }
    unique
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

pub fn detect_templates(
    texts: &[&str],
    templates: &[TemplateRule],
    preview_chars: usize,
) -> Vec<TemplateMatch> {
    let lowered: Vec<String> = texts.iter().map(|t| t.to_lowercase()).collect();
    templates
        .iter()
        .map(|rule| {
            let matched: Vec<usize> = lowered
                .iter()
                .enumerate()
                .filter(|(_, t)| rule.all_of.iter().all(|p| contains_ci(t, p)))
                .map(|(i, _)| i)
                .collect();
            let previews = if rule.preview {
                matched
                    .iter()
                    .map(|&i| preview(texts[i], preview_chars))
                    .collect()
            } else {
                Vec::new()
            };
            TemplateMatch {
                name: rule.name.clone(),
                count: matched.len(),
                previews,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Normalization, uniqueness, duplicates
// ---------------------------------------------------------------------------

/// Lowercases, collapses numbers to `#`, trims. Idempotent.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    NUMBER_RE
        .replace_all(&lowered, NUMBER_PLACEHOLDER)
        .trim()
        .to_string()
}

/// Distinct normalized texts over texts longer than `min_chars` characters.
pub fn uniqueness(texts: &[&str], min_chars: usize) -> Uniqueness {
    let considered: Vec<String> = texts
        .iter()
        .filter(|t| t.chars().count() > min_chars)
        .map(|t| normalize(t))
        .collect();
    let mut distinct: Vec<&str> = considered.iter().map(String::as_str).collect();
    distinct.sort_unstable();
    distinct.dedup();
    Uniqueness {
        total: texts.len(),
        considered: considered.len(),
        distinct: distinct.len(),
        ratio: ratio(distinct.len(), considered.len()),
    }
}

/// Groups texts by normalized form; groups with more than one member.
pub fn duplicate_clusters(texts: &[&str]) -> NarrationDuplicates {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, text) in texts.iter().enumerate() {
        let key = normalize(text);
        let members = groups.entry(key.clone()).or_default();
        if members.is_empty() {
            order.push(key);
        }
        members.push(i);
    }
    let clusters: Vec<DuplicateCluster> = order
        .into_iter()
        .filter_map(|key| {
            let scenes = groups.remove(&key)?;
            (scenes.len() > 1).then_some(DuplicateCluster {
                normalized: key,
                scenes,
            })
        })
        .collect();
    NarrationDuplicates {
        cluster_count: clusters.len(),
        clusters,
    }
}

// ---------------------------------------------------------------------------
// Lexicon
// ---------------------------------------------------------------------------

fn contains_tokens(haystack: &[String], needle: &[String]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Number of texts containing each term; zero-count terms are left out.
pub fn scan_lexicon(texts: &[&str], terms: &[String], mode: LexiconMatch) -> LexiconHits {
    let hits: Vec<TermCount> = match mode {
        LexiconMatch::Substring => {
            let lowered: Vec<String> = texts.iter().map(|t| t.to_lowercase()).collect();
            terms
                .iter()
                .map(|term| TermCount {
                    term: term.clone(),
                    scenes: lowered.iter().filter(|t| contains_ci(t, term)).count(),
                })
                .collect()
        }
        LexiconMatch::Token => {
            let tokenized: Vec<Vec<String>> = texts.iter().map(|t| tokens(t)).collect();
            terms
                .iter()
                .map(|term| {
                    let needle = tokens(term);
                    TermCount {
                        term: term.clone(),
                        scenes: tokenized
                            .iter()
                            .filter(|t| contains_tokens(t, &needle))
                            .count(),
                    }
                })
                .collect()
        }
    };
    let terms: Vec<TermCount> = hits.into_iter().filter(|h| h.scenes > 0).collect();
    LexiconHits {
        none_found: terms.is_empty(),
        terms,
    }
}

// ---------------------------------------------------------------------------
// Word counts
// ---------------------------------------------------------------------------

pub fn word_count_stats(
    texts: &[&str],
    too_short_below: usize,
    too_long_above: usize,
) -> WordCountStats {
    let counts: Vec<usize> = texts.iter().map(|t| word_count(t)).collect();
    let too_short = counts.iter().filter(|&&c| c < too_short_below).count();
    let too_long = counts.iter().filter(|&&c| c > too_long_above).count();
    let in_band = counts
        .iter()
        .filter(|&&c| c >= too_short_below && c <= too_long_above)
        .count();
    let mean = if counts.is_empty() {
        None
    } else {
        Some(counts.iter().sum::<usize>() as f64 / counts.len() as f64)
    };
    WordCountStats {
        mean,
        too_short,
        in_band,
        too_long,
    }
}

// ---------------------------------------------------------------------------
// Distribution and sampling
// ---------------------------------------------------------------------------

pub fn environment_distribution(scenes: &[Scene], top_n: usize) -> Vec<CategoryCount> {
    let mut counts = tally(scenes.iter().map(Scene::environment));
    counts.truncate(top_n);
    counts
}

pub fn sample_motions(scenes: &[Scene], every: usize, preview_chars: usize) -> Vec<MotionSample> {
    scenes
        .iter()
        .enumerate()
        .step_by(every.max(1))
        .map(|(index, s)| MotionSample {
            index,
            preview: preview(&s.motion_description, preview_chars),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn analyze(scenes: &[Scene], policy: &Policy) -> Report {
    let motions: Vec<&str> = scenes.iter().map(|s| s.motion_description.as_str()).collect();
    let visuals: Vec<&str> = scenes.iter().map(|s| s.visual_description.as_str()).collect();
    let narrations: Vec<&str> = scenes.iter().map(|s| s.narration.as_str()).collect();

    let categories = classify_all(scenes, policy);

    // 1. Classification and derived rates
    let movement = movement_stats(scenes, &categories, policy);
    tracing::debug!(categories = movement.distribution.len(), "motions classified");
    // 2. Uniqueness
    let motion_uniqueness = uniqueness(&motions, policy.uniqueness_min_chars);
    // 3. Templates
    let templates = detect_templates(&motions, &policy.templates, policy.template_preview_chars);
    // 4. Sequence violations
    let sequence_violations =
        detect_violations(&categories, policy.streak_threshold, policy.violation_dedup);
    tracing::debug!(violations = sequence_violations.len(), "sequence scanned");
    // 5. Motion lexicon
    let motion_lexicon =
        scan_lexicon(&motions, &policy.forbidden_motion_terms, policy.lexicon_match);
    // 6. Visual lexicon
    let visual_lexicon = scan_lexicon(&visuals, &policy.weak_visual_terms, policy.lexicon_match);
    // 7. Word counts
    let visual_word_counts =
        word_count_stats(&visuals, policy.too_short_below, policy.too_long_above);
    // 8. Narration duplicates
    let narration_duplicates = duplicate_clusters(&narrations);
    // 9. Environments
    let environments = environment_distribution(scenes, policy.environment_top_n);

    let motion_samples = sample_motions(scenes, policy.sample_every, policy.sample_preview_chars);

    tracing::info!(
        scenes = scenes.len(),
        violations = sequence_violations.len(),
        duplicate_narrations = narration_duplicates.cluster_count,
        "analysis complete"
    );

    Report {
        scene_count: scenes.len(),
        movement,
        motion_uniqueness,
        templates,
        sequence_violations,
        motion_lexicon,
        visual_lexicon,
        visual_word_counts,
        narration_duplicates,
        environments,
        motion_samples,
    }
}
