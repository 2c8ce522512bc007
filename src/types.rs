/// Типы данных для ML модуля

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Значение одной ячейки сырых данных
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Flag(bool),
    Text(String),
    Missing,
}

impl Value {
    /// Числовое представление: флаги как 0/1, текст только если парсится
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(v) if v.is_finite() => Some(*v),
            Value::Number(_) => None,
            Value::Flag(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            Value::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        match self {
            Value::Missing => true,
            Value::Number(v) => !v.is_finite(),
            Value::Text(s) => s.trim().is_empty(),
            Value::Flag(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Number(v) if v.is_finite() => Some(v.to_string()),
            Value::Flag(b) => Some(b.to_string()),
            Value::Text(s) if !s.trim().is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// Одна сырая запись: имя колонки -> значение
pub type RawRecord = BTreeMap<String, Value>;

/// Итог обучения одного кандидата
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub name: String,
    pub r2: Option<f64>,
    pub rmse: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionOutput {
    pub predicted_energy: f64,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub best_model: Option<String>,
    pub best_score: Option<f64>,
    pub target_column: String,
    pub features: Vec<String>,
    pub candidates: Vec<CandidateSummary>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
