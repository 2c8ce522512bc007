//! Определение ролей колонок (время, целевая переменная) по именам

use serde::{Deserialize, Serialize};

/// Правило поиска колонки: точное имя или подстрока без учета регистра
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleRule {
    pub preferred: Option<String>,
    pub substrings: Vec<String>,
}

impl RoleRule {
    pub fn new(preferred: Option<&str>, substrings: &[&str]) -> Self {
        Self {
            preferred: preferred.map(str::to_string),
            substrings: substrings.iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    /// Первая подходящая колонка в порядке таблицы, кроме исключенных
    pub fn resolve<'a, I>(&self, columns: I, exclude: &[&str]) -> Option<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let candidates: Vec<&str> = columns
            .into_iter()
            .filter(|c| !exclude.contains(c))
            .collect();

        if let Some(preferred) = &self.preferred {
            if candidates.iter().any(|c| *c == preferred.as_str()) {
                return Some(preferred.clone());
            }
        }

        candidates
            .into_iter()
            .find(|c| {
                let lower = c.to_lowercase();
                self.substrings.iter().any(|s| lower.contains(s.as_str()))
            })
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRoleResolver {
    pub timestamp: RoleRule,
    pub target: RoleRule,
}

impl ColumnRoleResolver {
    pub fn with_target(target_column: &str) -> Self {
        Self {
            target: RoleRule::new(Some(target_column), &["energy", "consum"]),
            ..Self::default()
        }
    }

    pub fn timestamp_column<'a, I>(&self, columns: I) -> Option<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.timestamp.resolve(columns, &[])
    }

    pub fn target_column<'a, I>(&self, columns: I) -> Option<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.target.resolve(columns, &[])
    }
}

impl Default for ColumnRoleResolver {
    fn default() -> Self {
        Self {
            timestamp: RoleRule::new(None, &["time", "date"]),
            target: RoleRule::new(Some("EnergyConsumption"), &["energy", "consum"]),
        }
    }
}
