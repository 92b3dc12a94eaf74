//! # Decision Explainability
//!
//! Converts a model decision's inputs and outputs into a structured,
//! ranked [`Explanation`] with a natural-language summary, so that users
//! and auditors can understand *why* an automated decision was made.
//!
//! Attribution scoring is pluggable through [`AttributionScorer`].
//! Production deployments inject a real SHAP/LIME adapter; the shipped
//! [`HeuristicScorer`] is a deterministic placeholder that assigns
//! importance bands from feature-name heuristics. Callers may also supply
//! precomputed attribution values per request, which bypass the scorer.
//!
//! Summaries are localized. The locale is engine configuration, never a
//! per-call parameter.

use crate::canonical;
use crate::types::{DecisionType, ExplainabilityMethod, Scalar};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Data model
// ---------------------------------------------------------------------------

/// How a single feature contributed to a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionDirection {
    Positive,
    Negative,
    Neutral,
}

/// One feature's contribution to a decision, ranked by `|importance|`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature_name: String,
    /// Attribution weight in `[-1.0, 1.0]`.
    pub importance: f64,
    /// The feature's value at decision time.
    pub feature_value: Scalar,
    pub contribution_direction: ContributionDirection,
}

/// A complete, immutable explanation of a single decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub decision_id: Uuid,
    pub decision_type: DecisionType,
    pub model_name: String,
    pub model_version: String,
    pub prediction: Scalar,
    /// Model confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Sorted by `|importance|` descending, truncated to `top_k_features`,
    /// every entry at or above the configured threshold.
    pub feature_importances: Vec<FeatureImportance>,
    pub natural_language_summary: String,
    #[serde(with = "crate::canonical::ts_millis")]
    pub timestamp: DateTime<Utc>,
    pub explainability_method: ExplainabilityMethod,
}

/// Aggregated per-feature statistics across a set of explanations, for
/// drift and monitoring dashboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStat {
    pub feature_name: String,
    pub avg_importance: f64,
    pub max_importance: f64,
    pub min_importance: f64,
    /// Number of explanations whose (truncated) top-k list contained the
    /// feature.
    pub frequency: usize,
}

/// Summary language. Selected by configuration at engine construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Tr,
}

/// Engine construction options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainerConfig {
    /// Maximum number of features retained per explanation.
    pub top_k_features: usize,
    /// Minimum `|importance|` for a feature to be retained.
    pub min_importance_threshold: f64,
    /// Summary language.
    pub language: Locale,
}

impl Default for ExplainerConfig {
    fn default() -> Self {
        Self {
            top_k_features: 5,
            min_importance_threshold: 0.01,
            language: Locale::En,
        }
    }
}

/// Input contract for [`ExplainabilityEngine::explain`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainRequest {
    pub decision_type: DecisionType,
    pub model_name: String,
    pub model_version: String,
    pub prediction: Scalar,
    pub confidence: f64,
    /// Feature name to decision-time value.
    pub features: BTreeMap<String, Scalar>,
    /// Precomputed attribution values. When present they override the
    /// configured scorer and the explanation is tagged `shap`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shap_values: Option<BTreeMap<String, f64>>,
}

/// Errors rejecting malformed explanation input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExplainError {
    #[error("confidence {value} is outside [0.0, 1.0]")]
    ConfidenceOutOfRange { value: f64 },
}

// ---------------------------------------------------------------------------
// Attribution scoring
// ---------------------------------------------------------------------------

/// Pluggable attribution scorer: maps decision features to importance
/// values in `[-1.0, 1.0]`. Implement this to wire in a real SHAP or LIME
/// backend.
pub trait AttributionScorer: Send + Sync {
    fn score(&self, features: &BTreeMap<String, Scalar>) -> BTreeMap<String, f64>;
}

/// Deterministic placeholder scorer. Assigns importance bands by feature
/// name keywords; unknown names get a small stable value derived from an
/// FNV-1a hash of the name. Two runs over the same features always produce
/// the same scores.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicScorer;

const KEYWORD_BANDS: &[(&str, f64)] = &[
    ("price", 0.45),
    ("cost", 0.45),
    ("fraud", 0.40),
    ("risk", 0.40),
    ("demand", 0.35),
    ("forecast", 0.35),
    ("competitor", 0.30),
    ("season", 0.20),
    ("stock", 0.15),
    ("inventory", 0.15),
];

impl AttributionScorer for HeuristicScorer {
    fn score(&self, features: &BTreeMap<String, Scalar>) -> BTreeMap<String, f64> {
        features
            .keys()
            .map(|name| (name.clone(), heuristic_importance(name)))
            .collect()
    }
}

fn heuristic_importance(name: &str) -> f64 {
    let lowered = name.to_lowercase();
    for (keyword, band) in KEYWORD_BANDS {
        if lowered.contains(keyword) {
            return *band;
        }
    }
    name_hash_importance(&lowered)
}

/// Stable fallback in `[-0.1, 0.1]` from an FNV-1a hash of the name.
fn name_hash_importance(name: &str) -> f64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in name.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    ((hash % 2001) as f64 / 10_000.0) - 0.1
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Produces [`Explanation`]s from decision inputs.
pub struct ExplainabilityEngine {
    config: ExplainerConfig,
    scorer: Box<dyn AttributionScorer>,
}

impl ExplainabilityEngine {
    /// Create an engine with the deterministic placeholder scorer.
    pub fn new(config: ExplainerConfig) -> Self {
        Self::with_scorer(config, Box::new(HeuristicScorer))
    }

    /// Create an engine with an injected attribution scorer.
    pub fn with_scorer(config: ExplainerConfig, scorer: Box<dyn AttributionScorer>) -> Self {
        Self { config, scorer }
    }

    /// The active configuration.
    pub fn config(&self) -> &ExplainerConfig {
        &self.config
    }

    /// Explain a single decision.
    pub fn explain(&self, request: ExplainRequest) -> Result<Explanation, ExplainError> {
        if !request.confidence.is_finite() || !(0.0..=1.0).contains(&request.confidence) {
            return Err(ExplainError::ConfidenceOutOfRange {
                value: request.confidence,
            });
        }

        let (scores, method) = match &request.shap_values {
            Some(values) => (values.clone(), ExplainabilityMethod::Shap),
            None => (
                self.scorer.score(&request.features),
                ExplainabilityMethod::RuleBased,
            ),
        };

        let mut importances: Vec<FeatureImportance> = request
            .features
            .iter()
            .map(|(name, value)| {
                let raw = scores.get(name).copied().unwrap_or(0.0);
                let importance = raw.clamp(-1.0, 1.0);
                FeatureImportance {
                    feature_name: name.clone(),
                    importance,
                    feature_value: value.clone(),
                    contribution_direction: direction(importance),
                }
            })
            .collect();

        // Stable sort: ties keep the alphabetical feature order.
        importances.sort_by(|a, b| {
            b.importance
                .abs()
                .partial_cmp(&a.importance.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        importances.retain(|fi| fi.importance.abs() >= self.config.min_importance_threshold);
        importances.truncate(self.config.top_k_features);

        let summary = render_summary(
            self.config.language,
            request.decision_type,
            &request.model_name,
            request.confidence,
            &importances,
        );

        debug!(
            decision_type = %request.decision_type,
            model = %request.model_name,
            features = importances.len(),
            method = %method,
            "generated explanation"
        );

        Ok(Explanation {
            decision_id: Uuid::new_v4(),
            decision_type: request.decision_type,
            model_name: request.model_name,
            model_version: request.model_version,
            prediction: request.prediction,
            confidence: request.confidence,
            feature_importances: importances,
            natural_language_summary: summary,
            timestamp: canonical::now_millis(),
            explainability_method: method,
        })
    }

    /// Explain a batch of independent decisions, preserving input order.
    pub fn explain_batch(
        &self,
        requests: Vec<ExplainRequest>,
    ) -> Vec<Result<Explanation, ExplainError>> {
        requests.into_iter().map(|r| self.explain(r)).collect()
    }
}

fn direction(importance: f64) -> ContributionDirection {
    if importance > 0.01 {
        ContributionDirection::Positive
    } else if importance < -0.01 {
        ContributionDirection::Negative
    } else {
        ContributionDirection::Neutral
    }
}

/// Aggregate per-feature statistics across explanations. `frequency`
/// counts explanations whose truncated top-k list contained the feature.
pub fn feature_importance_stats(explanations: &[Explanation]) -> Vec<FeatureStat> {
    struct Acc {
        sum: f64,
        max: f64,
        min: f64,
        count: usize,
    }

    let mut by_feature: BTreeMap<&str, Acc> = BTreeMap::new();
    for explanation in explanations {
        for fi in &explanation.feature_importances {
            let acc = by_feature.entry(fi.feature_name.as_str()).or_insert(Acc {
                sum: 0.0,
                max: f64::NEG_INFINITY,
                min: f64::INFINITY,
                count: 0,
            });
            acc.sum += fi.importance;
            acc.max = acc.max.max(fi.importance);
            acc.min = acc.min.min(fi.importance);
            acc.count += 1;
        }
    }

    let mut stats: Vec<FeatureStat> = by_feature
        .into_iter()
        .map(|(name, acc)| FeatureStat {
            feature_name: name.to_string(),
            avg_importance: acc.sum / acc.count as f64,
            max_importance: acc.max,
            min_importance: acc.min,
            frequency: acc.count,
        })
        .collect();

    // Frequency-first ordering keeps dashboards stable as data drifts.
    stats.sort_by(|a, b| {
        b.frequency.cmp(&a.frequency).then(
            b.avg_importance
                .abs()
                .partial_cmp(&a.avg_importance.abs())
                .unwrap_or(std::cmp::Ordering::Equal),
        )
    });
    stats
}

/// Hash an explanation's canonical form, for attestation-log references.
pub fn explanation_hash(explanation: &Explanation) -> String {
    let value = serde_json::to_value(explanation)
        .expect("explanation serialization is infallible");
    canonical::canonical_sha256(&value)
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

fn qualitative_tier(locale: Locale, importance: f64) -> &'static str {
    let abs = importance.abs();
    match locale {
        Locale::En => {
            if abs > 0.5 {
                "very high"
            } else if abs > 0.3 {
                "high"
            } else if abs > 0.1 {
                "medium"
            } else {
                "low"
            }
        }
        Locale::Tr => {
            if abs > 0.5 {
                "çok yüksek"
            } else if abs > 0.3 {
                "yüksek"
            } else if abs > 0.1 {
                "orta"
            } else {
                "düşük"
            }
        }
    }
}

fn decision_lead(locale: Locale, decision_type: DecisionType) -> &'static str {
    match (locale, decision_type) {
        (Locale::En, DecisionType::Pricing) => "Pricing decision",
        (Locale::En, DecisionType::Promotion) => "Promotion decision",
        (Locale::En, DecisionType::Routing) => "Routing decision",
        (Locale::En, DecisionType::FraudDetection) => "Fraud assessment",
        (Locale::En, DecisionType::Recommendation) => "Recommendation",
        (Locale::En, DecisionType::EconomyOptimization) => "Economy optimization",
        (Locale::Tr, DecisionType::Pricing) => "Fiyatlandırma kararı",
        (Locale::Tr, DecisionType::Promotion) => "Promosyon kararı",
        (Locale::Tr, DecisionType::Routing) => "Rota kararı",
        (Locale::Tr, DecisionType::FraudDetection) => "Dolandırıcılık değerlendirmesi",
        (Locale::Tr, DecisionType::Recommendation) => "Öneri",
        (Locale::Tr, DecisionType::EconomyOptimization) => "Ekonomi optimizasyonu",
    }
}

fn render_summary(
    locale: Locale,
    decision_type: DecisionType,
    model_name: &str,
    confidence: f64,
    importances: &[FeatureImportance],
) -> String {
    let lead = decision_lead(locale, decision_type);
    let percent = (confidence * 100.0).round() as i64;
    let top: Vec<&FeatureImportance> = importances.iter().take(2).collect();

    match locale {
        Locale::En => match top.as_slice() {
            [] => format!(
                "{lead} by {model_name} with {percent}% confidence: no feature passed the importance threshold."
            ),
            [first] => format!(
                "{lead} by {model_name} with {percent}% confidence: {} had a {} impact.",
                first.feature_name,
                qualitative_tier(locale, first.importance)
            ),
            [first, second, ..] => format!(
                "{lead} by {model_name} with {percent}% confidence: {} had a {} impact, while {} had a {} impact.",
                first.feature_name,
                qualitative_tier(locale, first.importance),
                second.feature_name,
                qualitative_tier(locale, second.importance)
            ),
        },
        Locale::Tr => match top.as_slice() {
            [] => format!(
                "{lead}, {model_name} tarafından %{percent} güvenle verildi: önem eşiğini geçen özellik yok."
            ),
            [first] => format!(
                "{lead}, {model_name} tarafından %{percent} güvenle verildi: {} etkisi {} düzeyde.",
                first.feature_name,
                qualitative_tier(locale, first.importance)
            ),
            [first, second, ..] => format!(
                "{lead}, {model_name} tarafından %{percent} güvenle verildi: {} etkisi {}, {} etkisi {} düzeyde.",
                first.feature_name,
                qualitative_tier(locale, first.importance),
                second.feature_name,
                qualitative_tier(locale, second.importance)
            ),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
