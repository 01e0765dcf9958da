//! Read the privacy flag back out of restored tab state.

use super::TabState;
use anyhow::{Context, Result};

/// Privacy recorded in a serialized tab state
pub fn privacy_from_state(state: &str) -> Result<bool> {
    let tab: TabState = serde_json::from_str(state).context("Failed to parse tab state")?;
    Ok(tab.is_private())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privacy_from_state() {
        assert!(privacy_from_state(r#"{"attributes":{"privateTab-isPrivate":"true"}}"#).unwrap());
        assert!(!privacy_from_state(r#"{"attributes":{"image":"x"}}"#).unwrap());
        assert!(!privacy_from_state("{}").unwrap());
        assert!(privacy_from_state("").is_err());
    }
}
