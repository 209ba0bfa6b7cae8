//! Common validation utilities shared across modules

/// Validate that a port number is in valid range (1-65535)
pub fn validate_port_range(port: u16) -> Result<(), String> {
    if port == 0 {
        return Err("Port must be between 1 and 65535".to_string());
    }
    Ok(())
}

/// Check if a string is empty or only whitespace
pub fn is_empty_or_whitespace(s: &str) -> bool {
    s.trim().is_empty()
}

/// Validate that a hostname is safe to use as a directory name.
///
/// Only ASCII alphanumerics, `-` and `.` are allowed. Empty labels (`..`, leading or trailing
/// dots) and labels starting or ending with `-` are rejected, which also rules out any path
/// traversal through a client supplied `Host` header.
pub fn validate_hostname_chars(hostname: &str) -> bool {
    if hostname.is_empty() || hostname.len() > 253 {
        return false;
    }
    if !hostname.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-') {
        return false;
    }
    hostname.split('.').all(|label| !label.is_empty() && label.len() <= 63 && !label.starts_with('-') && !label.ends_with('-'))
}

/// Lower-case and trim a hostname, returning `None` when nothing is left
pub fn normalize_hostname(hostname: &str) -> Option<String> {
    if is_empty_or_whitespace(hostname) {
        return None;
    }
    Some(hostname.trim().to_ascii_lowercase())
}
