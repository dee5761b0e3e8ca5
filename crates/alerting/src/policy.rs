//! Alert Policy Implementation

use crate::AlertError;
use inference_engine::RiskLabel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Alert configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// AQI above which the environmental-clinical trigger can fire (default: 150)
    pub aqi_threshold: i64,
    /// Systolic BP above which the environmental-clinical trigger can fire (default: 140)
    pub systolic_threshold: i64,
    /// Model confidence above which an alert fires regardless of label (default: 0.75)
    pub confidence_threshold: f64,
    /// Model confidence above which severity is Emergency (default: 0.90)
    pub emergency_threshold: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            aqi_threshold: 150,
            systolic_threshold: 140,
            confidence_threshold: 0.75,
            emergency_threshold: 0.90,
        }
    }
}

impl AlertConfig {
    /// Reject score thresholds outside [0, 1]
    pub fn validate(&self) -> Result<(), AlertError> {
        for (name, value) in [
            ("confidence_threshold", self.confidence_threshold),
            ("emergency_threshold", self.emergency_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AlertError::InvalidThreshold { name, value });
            }
        }
        Ok(())
    }
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Moderate,
    High,
    Emergency,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Moderate => "Moderate",
            Severity::High => "High",
            Severity::Emergency => "Emergency",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Moderate" => Ok(Severity::Moderate),
            "High" => Ok(Severity::High),
            "Emergency" => Ok(Severity::Emergency),
            other => Err(AlertError::UnknownSeverity(other.to_string())),
        }
    }
}

/// Outcome of evaluating the policy for one prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlertDecision {
    /// Whether an alert must be created
    pub triggered: bool,
    /// Severity, present only when triggered
    pub severity: Option<Severity>,
    /// High AQI combined with high systolic BP
    pub environmental_trigger: bool,
    /// Model confidence above threshold
    pub confidence_trigger: bool,
}

/// Escalation rule layered on top of the classifier.
///
/// Two independent triggers are OR-ed: `aqi > 150 && systolic_bp > 140`, and
/// `risk_score > 0.75` whatever the label. Severity precedence is fixed:
/// score above the emergency threshold first, then a High label, otherwise
/// Moderate.
#[derive(Debug, Clone, Default)]
pub struct AlertPolicy {
    config: AlertConfig,
}

impl AlertPolicy {
    /// Create a new alert policy
    pub fn new(config: AlertConfig) -> Self {
        info!("Creating alert policy with config: {:?}", config);
        Self { config }
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Evaluate both triggers and derive severity
    pub fn evaluate(
        &self,
        risk_label: RiskLabel,
        risk_score: f64,
        aqi_value: i64,
        systolic_bp: i64,
    ) -> AlertDecision {
        let environmental_trigger = aqi_value > self.config.aqi_threshold
            && systolic_bp > self.config.systolic_threshold;
        let confidence_trigger = risk_score > self.config.confidence_threshold;
        let triggered = environmental_trigger || confidence_trigger;

        let severity = triggered.then(|| self.severity(risk_label, risk_score));

        debug!(
            "Alert policy: environmental={}, confidence={}, severity={:?}",
            environmental_trigger, confidence_trigger, severity
        );

        AlertDecision {
            triggered,
            severity,
            environmental_trigger,
            confidence_trigger,
        }
    }

    fn severity(&self, risk_label: RiskLabel, risk_score: f64) -> Severity {
        if risk_score > self.config.emergency_threshold {
            Severity::Emergency
        } else if risk_label == RiskLabel::High {
            Severity::High
        } else {
            Severity::Moderate
        }
    }

    /// Human-readable alert text
    pub fn message(
        &self,
        risk_label: RiskLabel,
        risk_score: f64,
        aqi_value: i64,
        systolic_bp: i64,
    ) -> String {
        format!(
            "⚠️ Health Alert: Your cardiovascular risk level is {} (score: {:.2}). \
             AQI is {}, Systolic BP is {}. Please take precautions.",
            risk_label, risk_score, aqi_value, systolic_bp
        )
    }
}
