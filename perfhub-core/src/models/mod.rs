mod actor;
mod key_result;
mod okr;

pub use actor::*;
pub use key_result::*;
pub use okr::*;

pub(crate) use okr::{dedup_assignees, validate_period};

use crate::error::{Error, Result};

/// Lower and upper bound shared by progress and weight values.
pub const PERCENT_RANGE: std::ops::RangeInclusive<f64> = 0.0..=100.0;

pub(crate) fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::Validation("title must not be empty".into()));
    }
    Ok(())
}

pub(crate) fn validate_percent(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || !PERCENT_RANGE.contains(&value) {
        return Err(Error::Validation(format!(
            "{} must be between 0 and 100, got {}",
            field, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_title_rejected() {
        assert!(matches!(validate_title("   "), Err(Error::Validation(_))));
        assert!(validate_title("Ship v2").is_ok());
    }

    #[test]
    fn test_percent_bounds() {
        assert!(validate_percent("progress", 0.0).is_ok());
        assert!(validate_percent("progress", 100.0).is_ok());
        assert!(validate_percent("progress", 100.5).is_err());
        assert!(validate_percent("weight", -1.0).is_err());
        assert!(validate_percent("weight", f64::NAN).is_err());
    }
}
