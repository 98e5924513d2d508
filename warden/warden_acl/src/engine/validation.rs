//! Input validation for ACL administration.

use warden_core::error::{InvalidParameterError, Result};

use super::AclEngineConfig;

/// Color used when none is given.
pub const DEFAULT_COLOR: &str = "#000000";

/// Check an ACL name. Returns the trimmed name.
pub fn check_name(name: &str, config: &AclEngineConfig) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(InvalidParameterError::new("name", "must not be empty").into());
    }
    if name.chars().count() > config.name_max_length {
        return Err(InvalidParameterError::new(
            "name",
            format!("longer than {} characters", config.name_max_length),
        )
        .into());
    }
    Ok(name.to_string())
}

/// Check an ACL label.
pub fn check_label(label: &str) -> Result<String> {
    if label.trim().is_empty() {
        return Err(InvalidParameterError::new("label", "must not be empty").into());
    }
    Ok(label.to_string())
}

/// Check an ACL description.
pub fn check_description(description: &str, config: &AclEngineConfig) -> Result<String> {
    if description.chars().count() > config.description_max_length {
        return Err(InvalidParameterError::new(
            "description",
            format!("longer than {} characters", config.description_max_length),
        )
        .into());
    }
    Ok(description.to_string())
}

/// Normalize a color.
///
/// Accepts `#RRGGBB`, a bare `RRGGBB` (prefixed with `#`) or a CSS color
/// keyword / style class name. Hex colors are upper-cased; an empty value
/// yields [`DEFAULT_COLOR`].
pub fn process_color(color: &str) -> Result<String> {
    let color = color.trim();
    if color.is_empty() {
        return Ok(DEFAULT_COLOR.to_string());
    }

    let is_hex = |s: &str| s.len() == 6 && s.chars().all(|c| c.is_ascii_hexdigit());

    if let Some(hex) = color.strip_prefix('#') {
        if !is_hex(hex) {
            return Err(InvalidParameterError::new(
                "color",
                format!("'{}' is not of the form #RRGGBB", color),
            )
            .into());
        }
        return Ok(format!("#{}", hex.to_ascii_uppercase()));
    }
    if is_hex(color) {
        return Ok(format!("#{}", color.to_ascii_uppercase()));
    }

    let keyword = color
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        && color.starts_with(|c: char| c.is_ascii_alphabetic());
    if !keyword {
        return Err(InvalidParameterError::new(
            "color",
            format!("'{}' is neither a hex color nor a color name", color),
        )
        .into());
    }
    Ok(color.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_name() {
        let config = AclEngineConfig::default();
        assert_eq!(check_name("  Press  ", &config).unwrap(), "Press");
        assert!(check_name("   ", &config).is_err());
        assert!(check_name(&"x".repeat(250), &config).is_ok());
        assert!(check_name(&"x".repeat(251), &config).is_err());
    }

    #[test]
    fn test_check_description() {
        let config = AclEngineConfig::default();
        assert!(check_description("", &config).is_ok());
        assert!(check_description(&"d".repeat(255), &config).is_ok());
        assert!(check_description(&"d".repeat(256), &config).is_err());
    }

    #[test]
    fn test_check_label() {
        assert!(check_label("Press").is_ok());
        assert!(check_label("").is_err());
    }

    #[test]
    fn test_process_color() {
        assert_eq!(process_color("").unwrap(), DEFAULT_COLOR);
        assert_eq!(process_color("#ff00aa").unwrap(), "#FF00AA");
        assert_eq!(process_color("00ff00").unwrap(), "#00FF00");
        assert_eq!(process_color("darkred").unwrap(), "darkred");
        assert_eq!(process_color("acl-blue").unwrap(), "acl-blue");
        assert!(process_color("#12345").is_err());
        assert!(process_color("#GGGGGG").is_err());
        assert!(process_color("red; background: url(x)").is_err());
    }
}
