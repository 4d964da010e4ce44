//! Case-insensitive deserialization of adjacently tagged enums.

/// Implements `Deserialize` for an enum serialized as
/// `{"type": <tag>, "value": <string>}`, matching the tag without regard to
/// case.
///
/// Every variant wraps a type built from a `String` through `From`. Keys
/// other than `type` and `value` are rejected, so do typos in configuration
/// files.
#[macro_export]
macro_rules! impl_case_insensitive_enum {
	($enum_name:ident, { $($tag:literal => $variant:ident),* $(,)? }) => {
		impl<'de> ::serde::Deserialize<'de> for $enum_name {
			fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
			where
				D: ::serde::Deserializer<'de>,
			{
				use ::serde::de::{self, MapAccess, Visitor};
				use std::fmt;

				const FIELDS: &[&str] = &["type", "value"];

				struct TaggedVisitor;

				impl<'de> Visitor<'de> for TaggedVisitor {
					type Value = $enum_name;

					fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
						write!(formatter, "a `type`/`value` map for {}", stringify!($enum_name))
					}

					fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
					where
						M: MapAccess<'de>,
					{
						let mut tag: Option<String> = None;
						let mut value: Option<String> = None;

						while let Some(key) = map.next_key::<String>()? {
							match key.as_str() {
								"type" if tag.is_none() => tag = Some(map.next_value()?),
								"value" if value.is_none() => value = Some(map.next_value()?),
								"type" | "value" => return Err(de::Error::custom(format!("duplicate field `{}`", key))),
								other => return Err(de::Error::unknown_field(other, FIELDS)),
							}
						}

						let tag = tag.ok_or_else(|| de::Error::missing_field("type"))?;
						let value = value.ok_or_else(|| de::Error::missing_field("value"))?;

						match tag.to_lowercase().as_str() {
							$($tag => Ok($enum_name::$variant(value.into())),)*
							_ => Err(de::Error::unknown_variant(&tag, &[$($tag),*])),
						}
					}
				}

				deserializer.deserialize_map(TaggedVisitor)
			}
		}
	};
}
