use std::fmt::Display;

use anyhow::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Stage {
    #[default]
    Local,
    Development,
    Production,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stage = match self {
            Stage::Local => "local",
            Stage::Development => "development",
            Stage::Production => "production",
        };

        write!(f, "{}", stage)
    }
}

impl Stage {
    pub fn try_from(stage: &str) -> Result<Self> {
        match stage.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Stage::Local),
            "development" => Ok(Stage::Development),
            "production" => Ok(Stage::Production),
            _ => Err(anyhow::anyhow!("invalid stage: {}", stage)),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Stage::Production)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_stages() {
        assert_eq!(Stage::try_from("local").unwrap(), Stage::Local);
        assert_eq!(Stage::try_from(" Production ").unwrap(), Stage::Production);
        assert_eq!(Stage::try_from("development").unwrap(), Stage::Development);
    }

    #[test]
    fn unknown_stage_falls_back_to_local() {
        assert!(Stage::try_from("staging").is_err());
        assert_eq!(Stage::try_from("").unwrap_or_default(), Stage::Local);
    }
}
