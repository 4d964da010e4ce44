//! Arithmetic on amounts stored as decimal strings.
//!
//! Stored amounts are uint256 values. Intermediate results carry an explicit
//! sign so that an underflow surfaces as a negative string, which the update
//! guard then rejects.

use alloy::primitives::U256;
use std::{cmp::Ordering, fmt};

use crate::models::state::error::StateError;

/// Signed amount whose magnitude spans the whole uint256 range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Amount {
	negative: bool,
	magnitude: U256,
}

impl Amount {
	pub const ZERO: Self = Self {
		negative: false,
		magnitude: U256::ZERO,
	};

	fn new(negative: bool, magnitude: U256) -> Self {
		// Zero is unsigned
		Self {
			negative: negative && !magnitude.is_zero(),
			magnitude,
		}
	}

	pub fn is_zero(&self) -> bool {
		self.magnitude.is_zero()
	}

	pub fn is_negative(&self) -> bool {
		self.negative
	}

	pub fn magnitude(&self) -> U256 {
		self.magnitude
	}

	/// `None` when the magnitude leaves the uint256 range
	pub fn checked_add(self, other: Self) -> Option<Self> {
		if self.negative == other.negative {
			return self
				.magnitude
				.checked_add(other.magnitude)
				.map(|magnitude| Self::new(self.negative, magnitude));
		}
		Some(match self.magnitude.cmp(&other.magnitude) {
			Ordering::Less => Self::new(other.negative, other.magnitude - self.magnitude),
			_ => Self::new(self.negative, self.magnitude - other.magnitude),
		})
	}

	pub fn checked_sub(self, other: Self) -> Option<Self> {
		self.checked_add(Self::new(!other.negative, other.magnitude))
	}
}

impl fmt::Display for Amount {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.negative {
			f.write_str("-")?;
		}
		write!(f, "{}", self.magnitude)
	}
}

/// Parses a decimal amount, an empty string counts as zero
pub fn parse_amount(value: &str) -> Result<Amount, StateError> {
	let trimmed = value.trim();
	if trimmed.is_empty() {
		return Ok(Amount::ZERO);
	}
	let (negative, digits) = match trimmed.strip_prefix('-') {
		Some(digits) => (true, digits),
		None => (false, trimmed),
	};
	if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
		return Err(StateError::InvalidAmount(format!(
			"'{}': not a decimal integer",
			value
		)));
	}
	let magnitude = U256::from_str_radix(digits, 10)
		.map_err(|e| StateError::InvalidAmount(format!("'{}': {}", value, e)))?;
	Ok(Amount::new(negative, magnitude))
}

pub fn add_amounts(a: &str, b: &str) -> Result<String, StateError> {
	parse_amount(a)?
		.checked_add(parse_amount(b)?)
		.map(|sum| sum.to_string())
		.ok_or_else(|| StateError::InvalidAmount(format!("overflow adding {} and {}", a, b)))
}

/// Subtracts `b` from `a`; the result may be negative and is left to the update guard
pub fn sub_amounts(a: &str, b: &str) -> Result<String, StateError> {
	parse_amount(a)?
		.checked_sub(parse_amount(b)?)
		.map(|diff| diff.to_string())
		.ok_or_else(|| StateError::InvalidAmount(format!("overflow subtracting {} from {}", b, a)))
}

pub fn is_negative_amount(value: &str) -> bool {
	value.trim_start().starts_with('-')
}

pub fn is_zero_amount(value: &str) -> bool {
	parse_amount(value).map(|v| v.is_zero()).unwrap_or(false)
}
