//! Shared types for the trust layer.
//!
//! Cross-cutting enums used by more than one module: the decision and
//! operation taxonomies, and the scalar value type that feature values,
//! predictions, and payload fields are allowed to take.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of AI decision being explained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    Pricing,
    Promotion,
    Routing,
    FraudDetection,
    Recommendation,
    EconomyOptimization,
}

impl fmt::Display for DecisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            DecisionType::Pricing => "pricing",
            DecisionType::Promotion => "promotion",
            DecisionType::Routing => "routing",
            DecisionType::FraudDetection => "fraud_detection",
            DecisionType::Recommendation => "recommendation",
            DecisionType::EconomyOptimization => "economy_optimization",
        };
        write!(f, "{tag}")
    }
}

/// The attribution method that produced an explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplainabilityMethod {
    Shap,
    Lime,
    Attention,
    RuleBased,
}

impl fmt::Display for ExplainabilityMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ExplainabilityMethod::Shap => "shap",
            ExplainabilityMethod::Lime => "lime",
            ExplainabilityMethod::Attention => "attention",
            ExplainabilityMethod::RuleBased => "rule_based",
        };
        write!(f, "{tag}")
    }
}

/// The kind of consequential operation being signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    PriceUpdate,
    PromotionActivation,
    RefundApproval,
    DataExport,
    ModelDeployment,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            OperationType::PriceUpdate => "price_update",
            OperationType::PromotionActivation => "promotion_activation",
            OperationType::RefundApproval => "refund_approval",
            OperationType::DataExport => "data_export",
            OperationType::ModelDeployment => "model_deployment",
        };
        write!(f, "{tag}")
    }
}

/// A scalar value as it appears in decision inputs and outputs.
///
/// Feature values and predictions may be text, numeric, or boolean; the
/// untagged representation keeps the JSON shape identical to the wire
/// contract (`"SKU-1"`, `149.99`, `true`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl Scalar {
    /// Numeric view of the scalar, if it is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Flag(b) => write!(f, "{b}"),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Flag(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Number(value as f64)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_type_serde_tags() {
        let json = serde_json::to_string(&DecisionType::FraudDetection).unwrap();
        assert_eq!(json, "\"fraud_detection\"");
        let back: DecisionType = serde_json::from_str("\"economy_optimization\"").unwrap();
        assert_eq!(back, DecisionType::EconomyOptimization);
    }

    #[test]
    fn test_operation_type_serde_tags() {
        let json = serde_json::to_string(&OperationType::PriceUpdate).unwrap();
        assert_eq!(json, "\"price_update\"");
        let back: OperationType = serde_json::from_str("\"refund_approval\"").unwrap();
        assert_eq!(back, OperationType::RefundApproval);
    }

    #[test]
    fn test_display_matches_serde_tag() {
        assert_eq!(DecisionType::Pricing.to_string(), "pricing");
        assert_eq!(OperationType::ModelDeployment.to_string(), "model_deployment");
        assert_eq!(ExplainabilityMethod::RuleBased.to_string(), "rule_based");
    }

    #[test]
    fn test_scalar_untagged_serde() {
        assert_eq!(serde_json::to_string(&Scalar::from("SKU-1")).unwrap(), "\"SKU-1\"");
        assert_eq!(serde_json::to_string(&Scalar::from(149.99)).unwrap(), "149.99");
        assert_eq!(serde_json::to_string(&Scalar::from(true)).unwrap(), "true");

        let n: Scalar = serde_json::from_str("42.5").unwrap();
        assert_eq!(n.as_number(), Some(42.5));
        let b: Scalar = serde_json::from_str("false").unwrap();
        assert_eq!(b, Scalar::Flag(false));
        let s: Scalar = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(s, Scalar::Text("high".into()));
    }

    #[test]
    fn test_scalar_display() {
        assert_eq!(Scalar::from("a").to_string(), "a");
        assert_eq!(Scalar::from(10.0).to_string(), "10");
        assert_eq!(Scalar::from(false).to_string(), "false");
    }
}
