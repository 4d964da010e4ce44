//! Parsing helpers for CLI arguments and configuration values.

use byte_unit::Byte;
use std::str::FromStr;

/// Parses a string argument into a `u64` value representing a file size.
///
/// Accepts human-readable formats like "1GB", "500MB", "1024KB", etc.
/// Returns an error if the format is invalid.
pub fn parse_string_to_bytes_size(s: &str) -> Result<u64, String> {
	match Byte::from_str(s) {
		Ok(byte) => Ok(byte.as_u64()),
		Err(e) => Err(format!("Invalid size format: '{}'. Error: {}", s, e)),
	}
}

/// Trims and lowercases `input`, for case-insensitive comparisons of names
pub fn normalize_string(input: &str) -> String {
	input.trim().to_lowercase()
}

/// Whether `slug` is non-empty and made of lowercase letters, digits and
/// underscores only. Slugs name state files, so nothing else is allowed.
pub fn is_valid_slug(slug: &str) -> bool {
	!slug.is_empty()
		&& slug
			.chars()
			.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Parses the `--network` argument, accepting any case
pub fn parse_network_slug(s: &str) -> Result<String, String> {
	let slug = normalize_string(s);
	if is_valid_slug(&slug) {
		Ok(slug)
	} else {
		Err(format!(
			"Invalid network slug: '{}'. Use letters, digits and underscores",
			s
		))
	}
}
