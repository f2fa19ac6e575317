//! Body Mass Index evaluation.
//!
//! Pure arithmetic: converts a [`Measurement`] to metric units, computes
//! `kg / m^2`, rounds to one decimal and places the rounded value in one of
//! the WHO category bands.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EvaluationError;

const CM_PER_M: f64 = 100.0;
const M_PER_INCH: f64 = 0.0254;
const KG_PER_LB: f64 = 0.453592;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum HeightUnit {
    #[default]
    #[value(name = "cm")]
    #[serde(rename = "cm")]
    Centimeters,
    #[value(name = "in")]
    #[serde(rename = "in")]
    Inches,
}

impl HeightUnit {
    fn to_meters(self, height: f64) -> f64 {
        match self {
            HeightUnit::Centimeters => height / CM_PER_M,
            HeightUnit::Inches => height * M_PER_INCH,
        }
    }
}

impl fmt::Display for HeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeightUnit::Centimeters => f.write_str("cm"),
            HeightUnit::Inches => f.write_str("in"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum WeightUnit {
    #[default]
    #[value(name = "kg")]
    #[serde(rename = "kg")]
    Kilograms,
    #[value(name = "lb")]
    #[serde(rename = "lb")]
    Pounds,
}

impl WeightUnit {
    fn to_kilograms(self, weight: f64) -> f64 {
        match self {
            WeightUnit::Kilograms => weight,
            WeightUnit::Pounds => weight * KG_PER_LB,
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightUnit::Kilograms => f.write_str("kg"),
            WeightUnit::Pounds => f.write_str("lb"),
        }
    }
}

/// Height and weight as entered by the user. Lives for one evaluation only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub height: f64,
    #[serde(default)]
    pub height_unit: HeightUnit,
    pub weight: f64,
    #[serde(default)]
    pub weight_unit: WeightUnit,
}

impl Measurement {
    pub fn evaluate(&self) -> Result<BmiResult, EvaluationError> {
        evaluate(self.height, self.height_unit, self.weight, self.weight_unit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

/// How loudly the UI should present a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Error,
}

impl BmiCategory {
    /// Closed lower bounds: 18.5 is Normal, 25.0 Overweight, 30.0 Obese.
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            BmiCategory::Underweight
        } else if bmi < 25.0 {
            BmiCategory::Normal
        } else if bmi < 30.0 {
            BmiCategory::Overweight
        } else {
            BmiCategory::Obese
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BmiCategory::Underweight => "Underweight",
            BmiCategory::Normal => "Normal weight",
            BmiCategory::Overweight => "Overweight",
            BmiCategory::Obese => "Obese",
        }
    }

    pub fn range(self) -> &'static str {
        match self {
            BmiCategory::Underweight => "BMI < 18.5",
            BmiCategory::Normal => "BMI = 18.5-24.9",
            BmiCategory::Overweight => "BMI = 25-29.9",
            BmiCategory::Obese => "BMI ≥ 30",
        }
    }

    pub fn wellness_message(self) -> &'static str {
        match self {
            BmiCategory::Underweight => "Eat more nutritious foods!",
            BmiCategory::Normal => "Great job!",
            BmiCategory::Overweight => "Consider more exercise",
            BmiCategory::Obese => "Please consult a doctor",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            BmiCategory::Normal => Severity::Success,
            BmiCategory::Underweight | BmiCategory::Overweight => Severity::Warning,
            BmiCategory::Obese => Severity::Error,
        }
    }
}

impl fmt::Display for BmiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BmiResult {
    /// Rounded to one decimal place.
    pub value: f64,
    pub category: BmiCategory,
}

impl fmt::Display for BmiResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} ({})", self.value, self.category)
    }
}

fn check_positive(field: &'static str, value: f64) -> Result<f64, EvaluationError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(EvaluationError::InvalidInput {
            field,
            value: value.to_string(),
        })
    }
}

/// Parses a user-entered quantity such as `"180"` or `" 72.5 "`.
pub fn parse_quantity(field: &'static str, raw: &str) -> Result<f64, EvaluationError> {
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| EvaluationError::InvalidInput {
            field,
            value: raw.to_string(),
        })?;
    check_positive(field, value)
}

pub fn evaluate(
    height: f64,
    height_unit: HeightUnit,
    weight: f64,
    weight_unit: WeightUnit,
) -> Result<BmiResult, EvaluationError> {
    let height_m = height_unit.to_meters(check_positive("height", height)?);
    let weight_kg = weight_unit.to_kilograms(check_positive("weight", weight)?);

    let value = (weight_kg / (height_m * height_m) * 10.0).round() / 10.0;
    // Extreme but positive inputs can overflow to inf or round down to 0.0.
    if !value.is_finite() || value <= 0.0 {
        return Err(EvaluationError::OutOfRange {
            measurement: format!("{} {}, {} {}", height, height_unit, weight, weight_unit),
        });
    }
    Ok(BmiResult {
        value,
        category: BmiCategory::from_bmi(value),
    })
}
