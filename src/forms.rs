//! Field validation shared by the auth and project forms.
//!
//! Validators return `Err` with a user-facing message; the form components
//! render those messages inline next to the offending field.

use chrono::NaiveDate;

pub fn validate_name(value: &str) -> Result<(), String> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err("Name is required".to_string());
  }
  if trimmed.chars().count() > 255 {
    return Err("Name must be at most 255 characters".to_string());
  }
  Ok(())
}

/// Light-weight shape check, the server stays authoritative.
pub fn validate_email(value: &str) -> Result<(), String> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err("Email is required".to_string());
  }
  let mut parts = trimmed.splitn(2, '@');
  let local = parts.next().unwrap_or_default();
  let domain = parts.next().unwrap_or_default();
  if local.is_empty() || domain.is_empty() || !domain.contains('.') || domain.ends_with('.') {
    return Err("Enter a valid email address".to_string());
  }
  Ok(())
}

pub fn validate_password(value: &str) -> Result<(), String> {
  if value.is_empty() {
    return Err("Password is required".to_string());
  }
  if value.chars().count() < 8 {
    return Err("Password must be at least 8 characters".to_string());
  }
  Ok(())
}

/// One-time codes are exactly six digits.
pub fn validate_otp(value: &str) -> Result<(), String> {
  let trimmed = value.trim();
  if trimmed.len() != 6 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
    return Err("Enter the 6-digit code".to_string());
  }
  Ok(())
}

/// Empty input means no date; anything else must be YYYY-MM-DD.
pub fn parse_date(value: &str) -> Result<Option<NaiveDate>, String> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Ok(None);
  }
  NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
    .map(Some)
    .map_err(|_| "Use YYYY-MM-DD".to_string())
}

/// When both dates are present the due date may not precede the start date.
pub fn validate_date_range(
  start: Option<NaiveDate>,
  due: Option<NaiveDate>,
) -> Result<(), String> {
  if let (Some(start), Some(due)) = (start, due) {
    if due < start {
      return Err("Due date must be on or after the start date".to_string());
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_name_required_and_bounded() {
    assert!(validate_name("Mobile App").is_ok());
    assert!(validate_name("  ").is_err());
    assert!(validate_name(&"x".repeat(255)).is_ok());
    assert!(validate_name(&"x".repeat(256)).is_err());
  }

  #[test]
  fn test_email_shape() {
    assert!(validate_email("dev@example.com").is_ok());
    assert!(validate_email("  dev@example.com  ").is_ok());
    assert!(validate_email("").is_err());
    assert!(validate_email("no-at-sign").is_err());
    assert!(validate_email("@example.com").is_err());
    assert!(validate_email("dev@").is_err());
    assert!(validate_email("dev@localhost").is_err());
    assert!(validate_email("dev@example.").is_err());
  }

  #[test]
  fn test_password_length() {
    assert!(validate_password("longenough").is_ok());
    assert!(validate_password("short").is_err());
    assert!(validate_password("").is_err());
  }

  #[test]
  fn test_otp_exactly_six_digits() {
    assert!(validate_otp("123456").is_ok());
    assert!(validate_otp(" 123456 ").is_ok());
    assert!(validate_otp("12345").is_err());
    assert!(validate_otp("1234567").is_err());
    assert!(validate_otp("12345a").is_err());
  }

  #[test]
  fn test_parse_date() {
    assert_eq!(parse_date("").unwrap(), None);
    assert_eq!(parse_date("   ").unwrap(), None);
    assert_eq!(
      parse_date("2025-06-15").unwrap(),
      NaiveDate::from_ymd_opt(2025, 6, 15)
    );
    assert!(parse_date("15/06/2025").is_err());
    assert!(parse_date("2025-13-40").is_err());
  }

  #[test]
  fn test_date_range() {
    let start = NaiveDate::from_ymd_opt(2025, 6, 1);
    let due = NaiveDate::from_ymd_opt(2025, 7, 1);
    assert!(validate_date_range(start, due).is_ok());
    assert!(validate_date_range(due, start).is_err());
    assert!(validate_date_range(start, start).is_ok());
    assert!(validate_date_range(None, due).is_ok());
    assert!(validate_date_range(start, None).is_ok());
  }
}
