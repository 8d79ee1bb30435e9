//! Validation utilities for the SikaGreen platform
//!
//! Includes Togo-specific phone checks and the upload rules shared by the
//! backend and the web client.

use crate::error::{DomainError, DomainResult};

// ============================================================================
// Account Validations
// ============================================================================

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Validate password length
pub fn validate_password(password: &str) -> DomainResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(DomainError::Invalid {
            field: "password",
            message: "Password must be at least 6 characters",
        });
    }
    Ok(())
}

/// Validate Togolese phone number format
/// Accepts: 90123456, 90 12 34 56, +22890123456, 0022890123456
pub fn validate_togo_phone(phone: &str) -> DomainResult<()> {
    let invalid = DomainError::Invalid {
        field: "phone",
        message: "Invalid phone number",
    };

    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || c == ' ' || c == '+' || c == '-')
    {
        return Err(invalid);
    }

    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    let national = digits
        .strip_prefix("00228")
        .or_else(|| digits.strip_prefix("228").filter(|_| phone.trim_start().starts_with('+')))
        .unwrap_or(&digits);

    // Togolese subscriber numbers are 8 digits
    if national.len() == 8 {
        Ok(())
    } else {
        Err(invalid)
    }
}

/// Require a non-blank string of at most `max` characters
pub fn validate_required(field: &'static str, value: &str, max: usize) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::Invalid {
            field,
            message: "This field is required",
        });
    }
    if value.chars().count() > max {
        return Err(DomainError::Invalid {
            field,
            message: "This field is too long",
        });
    }
    Ok(())
}

// ============================================================================
// Chat & Upload Validations
// ============================================================================

pub const MAX_MESSAGE_LENGTH: usize = 1000;

/// Image formats accepted by the image upload endpoint
pub const IMAGE_EXTENSIONS: &[&str] = &["jpeg", "png", "jpg", "gif", "webp"];

/// Formats accepted as chat attachments
pub const CHAT_MEDIA_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "mp3", "wav", "ogg", "webm"];

/// Image formats accepted inline as an avatar data URL
pub const AVATAR_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

pub fn validate_message_content(content: &str) -> DomainResult<()> {
    if content.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(DomainError::Invalid {
            field: "content",
            message: "Message must be at most 1000 characters",
        });
    }
    Ok(())
}

/// Lowercased extension of a file name, if any
pub fn file_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Check a file name against an allow-list of extensions
pub fn validate_extension(
    field: &'static str,
    filename: &str,
    allowed: &[&str],
) -> DomainResult<String> {
    match file_extension(filename) {
        Some(ext) if allowed.contains(&ext.as_str()) => Ok(ext),
        _ => Err(DomainError::Invalid {
            field,
            message: "Unsupported file format",
        }),
    }
}

/// Split a `data:image/<ext>;base64,<payload>` URL into extension and payload
pub fn parse_image_data_url(value: &str) -> Option<(String, &str)> {
    let rest = value.strip_prefix("data:image/")?;
    let (ext, payload) = rest.split_once(";base64,")?;
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some((ext.to_ascii_lowercase(), payload))
}

/// Whether a value looks like an absolute http(s) URL
pub fn is_http_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    matches!(rest, Some(host) if !host.is_empty() && !host.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_togo_phone_formats() {
        assert!(validate_togo_phone("90123456").is_ok());
        assert!(validate_togo_phone("90 12 34 56").is_ok());
        assert!(validate_togo_phone("+22890123456").is_ok());
        assert!(validate_togo_phone("0022890123456").is_ok());
    }

    #[test]
    fn test_invalid_togo_phone() {
        assert!(validate_togo_phone("").is_err());
        assert!(validate_togo_phone("9012345").is_err());
        assert!(validate_togo_phone("22890123456").is_err());
        assert!(validate_togo_phone("90-12-AB-56").is_err());
    }

    #[test]
    fn test_password_length() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn test_required_field() {
        assert!(validate_required("name", "  ", 255).is_err());
        assert!(validate_required("name", "Afi", 255).is_ok());
        assert!(validate_required("name", &"a".repeat(256), 255).is_err());
    }

    #[test]
    fn test_message_length() {
        assert!(validate_message_content(&"x".repeat(1000)).is_ok());
        assert!(validate_message_content(&"x".repeat(1001)).is_err());
    }

    #[test]
    fn test_extensions() {
        assert_eq!(file_extension("photo.JPG"), Some("jpg".to_string()));
        assert_eq!(file_extension("archive"), None);
        assert_eq!(file_extension(".env"), None);
        assert!(validate_extension("image", "photo.png", IMAGE_EXTENSIONS).is_ok());
        assert!(validate_extension("image", "clip.mp3", IMAGE_EXTENSIONS).is_err());
        assert!(validate_extension("media", "note.ogg", CHAT_MEDIA_EXTENSIONS).is_ok());
    }

    #[test]
    fn test_image_data_url() {
        let (ext, payload) = parse_image_data_url("data:image/png;base64,iVBORw0K").unwrap();
        assert_eq!(ext, "png");
        assert_eq!(payload, "iVBORw0K");
        assert!(parse_image_data_url("https://cdn.example.com/a.png").is_none());
        assert!(parse_image_data_url("data:image/;base64,xx").is_none());
    }

    #[test]
    fn test_http_url() {
        assert!(is_http_url("https://sikagreen.tg/api/storage/avatars/a.png"));
        assert!(is_http_url("http://localhost:3000/x"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("https://"));
    }
}
