//! Feature Vector Assembly

use crate::coerce::coerce_int;
use crate::error::FeatureError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

/// Number of features in the vector
pub const FEATURE_DIMENSION: usize = 7;

/// Feature order the classifier was trained on
pub const FEATURE_NAMES: [&str; FEATURE_DIMENSION] = [
    "age",
    "heart_rate",
    "systolic_bp",
    "smoking_status",
    "existing_conditions",
    "aqi_value",
    "pm25",
];

/// Substituted when age is missing or not numeric
pub const DEFAULT_AGE: i64 = 30;

const IDX_AGE: usize = 0;
const IDX_HEART_RATE: usize = 1;
const IDX_SYSTOLIC_BP: usize = 2;
const IDX_SMOKING: usize = 3;
const IDX_CONDITIONS: usize = 4;
const IDX_AQI: usize = 5;
const IDX_PM25: usize = 6;

/// Raw caller-supplied health fields.
///
/// A field is `None` when the key was absent from the request and
/// `Some(Value::Null)` when it was sent as `null`; only the former counts as
/// missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthInputs {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub age: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub systolic_bp: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub smoking_status: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub existing_conditions: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl HealthInputs {
    /// Check that every health field key was supplied
    pub fn ensure_present(&self) -> Result<(), FeatureError> {
        let fields = [
            ("heart_rate", &self.heart_rate),
            ("systolic_bp", &self.systolic_bp),
            ("age", &self.age),
            ("smoking_status", &self.smoking_status),
            ("existing_conditions", &self.existing_conditions),
        ];

        match fields.iter().find(|(_, value)| value.is_none()) {
            Some((name, _)) => Err(FeatureError::MissingField(name)),
            None => Ok(()),
        }
    }
}

/// Air-quality tuple resolved from the AQI store
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AqiReading {
    pub aqi_value: i64,
    pub pm25: f64,
}

impl AqiReading {
    pub fn new(aqi_value: i64, pm25: f64) -> Self {
        Self { aqi_value, pm25 }
    }
}

/// Feature vector for risk inference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Values in [`FEATURE_NAMES`] order
    pub values: [f64; FEATURE_DIMENSION],
}

impl FeatureVector {
    pub fn from_values(values: [f64; FEATURE_DIMENSION]) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn age(&self) -> f64 {
        self.values[IDX_AGE]
    }

    pub fn heart_rate(&self) -> f64 {
        self.values[IDX_HEART_RATE]
    }

    pub fn systolic_bp(&self) -> f64 {
        self.values[IDX_SYSTOLIC_BP]
    }

    pub fn smoking_status(&self) -> f64 {
        self.values[IDX_SMOKING]
    }

    pub fn existing_conditions(&self) -> f64 {
        self.values[IDX_CONDITIONS]
    }

    pub fn aqi_value(&self) -> f64 {
        self.values[IDX_AQI]
    }

    pub fn pm25(&self) -> f64 {
        self.values[IDX_PM25]
    }
}

/// Builds feature vectors from raw inputs.
///
/// Caller fields are coerced leniently: a missing or malformed value becomes
/// its default (age 30, everything else 0). No range validation happens here.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureAssembler;

impl FeatureAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Assemble the 7-element vector from health inputs and an AQI reading
    pub fn assemble(
        &self,
        inputs: &HealthInputs,
        aqi: &AqiReading,
    ) -> Result<FeatureVector, FeatureError> {
        if !aqi.pm25.is_finite() {
            return Err(FeatureError::InvalidPm25(aqi.pm25));
        }

        let mut values = [0.0; FEATURE_DIMENSION];
        values[IDX_AGE] = coerce_int(inputs.age.as_ref(), DEFAULT_AGE) as f64;
        values[IDX_HEART_RATE] = coerce_int(inputs.heart_rate.as_ref(), 0) as f64;
        values[IDX_SYSTOLIC_BP] = coerce_int(inputs.systolic_bp.as_ref(), 0) as f64;
        values[IDX_SMOKING] = coerce_int(inputs.smoking_status.as_ref(), 0) as f64;
        values[IDX_CONDITIONS] = coerce_int(inputs.existing_conditions.as_ref(), 0) as f64;
        values[IDX_AQI] = aqi.aqi_value as f64;
        values[IDX_PM25] = aqi.pm25;

        debug!("Assembled features: {:?}", values);

        Ok(FeatureVector { values })
    }
}
