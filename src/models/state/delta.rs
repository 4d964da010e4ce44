//! Partial updates applied to snapshots and balances.

use alloy::primitives::Address;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::state::{amount::is_negative_amount, error::StateError};

/// A set of field overwrites keyed by the document's camelCase field names
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Delta(Map<String, Value>);

impl Delta {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
		self.set(field, value);
		self
	}

	pub fn with_address(self, field: &str, address: Address) -> Self {
		self.with(field, format_address(&address))
	}

	pub fn set(&mut self, field: &str, value: impl Into<Value>) {
		self.0.insert(field.to_string(), value.into());
	}

	pub fn get(&self, field: &str) -> Option<&Value> {
		self.0.get(field)
	}

	pub fn get_str(&self, field: &str) -> Option<&str> {
		self.0.get(field).and_then(Value::as_str)
	}

	pub fn contains(&self, field: &str) -> bool {
		self.0.contains_key(field)
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
		self.0.iter()
	}

	/// Keeps only the given fields
	pub fn retain_fields(&self, fields: &[&str]) -> Self {
		Self(
			self.0
				.iter()
				.filter(|(key, _)| fields.contains(&key.as_str()))
				.map(|(key, value)| (key.clone(), value.clone()))
				.collect(),
		)
	}

	/// Rejects the delta if any of the listed numeric fields carries a negative value
	pub fn check_non_negative(&self, numeric_fields: &[&str]) -> Result<(), StateError> {
		for field in numeric_fields {
			if let Some(Value::String(value)) = self.0.get(*field) {
				if is_negative_amount(value) {
					return Err(StateError::NegativeAmount {
						field: field.to_string(),
						value: value.clone(),
					});
				}
			}
		}
		Ok(())
	}
}

/// Lowercase `0x` hex, the representation used in every stored document
pub fn format_address(address: &Address) -> String {
	format!("0x{:x}", address)
}

/// Applies `delta` on top of a serializable document, refusing unknown fields
pub fn merge_document<T>(document: &T, delta: &Delta) -> Result<T, StateError>
where
	T: Serialize + DeserializeOwned,
{
	let mut value = serde_json::to_value(document)?;
	if let Value::Object(fields) = &mut value {
		for (field, update) in delta.iter() {
			if !fields.contains_key(field) {
				return Err(StateError::UnknownField(field.clone()));
			}
			fields.insert(field.clone(), update.clone());
		}
	}
	Ok(serde_json::from_value(value)?)
}
