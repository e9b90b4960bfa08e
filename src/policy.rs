use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

// ---------------------------------------------------------------------------
// Policy data
// ---------------------------------------------------------------------------

/// Vocabularies and thresholds driving every check.
///
/// Every field has a default, so a policy file only needs to name what it
/// overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Movement phrases, tested in order. A phrase is its own category label.
    pub movements: Vec<String>,
    pub push_in_phrases: Vec<String>,
    pub static_category: String,
    pub streak_threshold: usize,
    pub violation_dedup: ViolationDedup,
    pub templates: Vec<TemplateRule>,
    pub template_preview_chars: usize,
    pub uniqueness_min_chars: usize,
    pub forbidden_motion_terms: Vec<String>,
    pub weak_visual_terms: Vec<String>,
    pub lexicon_match: LexiconMatch,
    pub too_short_below: usize,
    pub too_long_above: usize,
    pub environment_top_n: usize,
    pub sample_every: usize,
    pub sample_preview_chars: usize,
}

/// How repeated sequence violations are collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ViolationDedup {
    /// Emit at every step past the threshold, drop repeated descriptor text.
    #[default]
    Message,
    /// Emit once per maximal run with its true range.
    Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LexiconMatch {
    /// Case-insensitive containment; fragments of longer words count.
    #[default]
    Substring,
    /// Whole word tokens only.
    Token,
}

/// A boilerplate predicate: the text must contain every phrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRule {
    pub name: String,
    pub all_of: Vec<String>,
    #[serde(default)]
    pub preview: bool,
}

impl TemplateRule {
    pub fn new(name: &str, all_of: &[&str], preview: bool) -> Self {
        Self {
            name: name.to_string(),
            all_of: all_of.iter().map(|p| p.to_string()).collect(),
            preview,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            movements: strings(&[
                "static",
                "dolly forward",
                "dolly in",
                "push-in",
                "pull-back",
                "dolly backward",
                "dolly out",
                "pan left",
                "pan right",
                "pan",
                "tilt up",
                "tilt down",
                "tilt",
                "lateral slide",
                "rack focus",
                "breathing camera",
                "deliberate freeze",
                "freeze",
            ]),
            push_in_phrases: strings(&["push-in", "dolly in", "dolly forward"]),
            static_category: "static".to_string(),
            streak_threshold: 2,
            violation_dedup: ViolationDedup::Message,
            templates: vec![
                TemplateRule::new("static-locked-single", &["static locked", "single"], true),
                TemplateRule::new(
                    "full-duration-no-pan-tilt",
                    &["over the full 7.5 seconds, no pan or tilt"],
                    false,
                ),
            ],
            template_preview_chars: 80,
            uniqueness_min_chars: 20,
            forbidden_motion_terms: strings(&[
                "zoom", "handheld", "wobble", "shake", "tremor", "truck", "fast", "quick", "rapid",
                "swift",
            ]),
            weak_visual_terms: strings(&[
                "moody",
                "atmospheric",
                "gritty",
                "eerie",
                "dramatic",
                "concept art",
            ]),
            lexicon_match: LexiconMatch::Substring,
            too_short_below: 35,
            too_long_above: 70,
            environment_top_n: 15,
            sample_every: 10,
            sample_preview_chars: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading and validation
// ---------------------------------------------------------------------------

impl Policy {
    /// Reads a YAML policy file, or falls back to the defaults.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let policy = if let Some(path) = path {
            let data = std::fs::read_to_string(path).map_err(|e| {
                AppError::usage(format!("failed to read policy {}: {e}", path.display()))
            })?;
            Self::from_yaml(&data)
                .map_err(|e| AppError::new(e.kind(), format!("{}: {}", path.display(), e)))?
        } else {
            Policy::default()
        };
        tracing::debug!(
            movements = policy.movements.len(),
            templates = policy.templates.len(),
            "policy loaded"
        );
        Ok(policy)
    }

    pub fn from_yaml(data: &str) -> AppResult<Self> {
        let policy: Policy = serde_yaml::from_str(data)
            .map_err(|e| AppError::policy(format!("failed to parse policy: {e}")))?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.movements.iter().any(|m| m.trim().is_empty()) {
            return Err(AppError::policy("movements must not contain empty phrases"));
        }
        // A later phrase containing an earlier one can never be selected.
        for (i, earlier) in self.movements.iter().enumerate() {
            let earlier_lc = earlier.to_lowercase();
            for later in &self.movements[i + 1..] {
                if later.to_lowercase().contains(&earlier_lc) {
                    return Err(AppError::policy(format!(
                        "movement '{later}' is shadowed by '{earlier}'; list it first"
                    )));
                }
            }
        }
        for template in &self.templates {
            if template.all_of.is_empty() || template.all_of.iter().any(|p| p.is_empty()) {
                return Err(AppError::policy(format!(
                    "template '{}' needs at least one non-empty phrase",
                    template.name
                )));
            }
        }
        let vocab = self
            .push_in_phrases
            .iter()
            .chain(&self.forbidden_motion_terms)
            .chain(&self.weak_visual_terms);
        for term in vocab {
            if term.trim().is_empty() {
                return Err(AppError::policy("vocabulary terms must not be empty"));
            }
        }
        if self.too_short_below > self.too_long_above {
            return Err(AppError::policy(format!(
                "too_short_below ({}) exceeds too_long_above ({})",
                self.too_short_below, self.too_long_above
            )));
        }
        if self.sample_every == 0 {
            return Err(AppError::policy("sample_every must be > 0"));
        }
        Ok(())
    }
}
