//! Conversion between [`Value`] and `serde_json::Value`, guided by the schema.
//!
//! Integers that a JavaScript number cannot represent exactly are written as
//! decimal strings; both numbers and strings are accepted on input. Pubkeys
//! are base58 strings, byte vectors are arrays of numbers, and enums are
//! either a bare variant name (unit variants) or a single-key object.

use std::collections::BTreeMap;
use std::str::FromStr;

use num_bigint::BigInt;
use serde_json::Map;
use serde_json::Value as Json;
use solana_address::Address;

use super::Codec;
use super::MAX_DEPTH;
use crate::CodecError;
use crate::Value;
use crate::schema::EnumDef;
use crate::schema::SchemaType;
use crate::schema::StructFields;
use crate::schema::TypeDefBody;

/// Largest integer a JSON consumer using IEEE doubles reads back exactly.
const MAX_SAFE_INTEGER: u128 = (1 << 53) - 1;

impl Codec<'_> {
	/// Build a [`Value`] of type `ty` from its JSON form.
	pub fn value_from_json(&self, ty: &SchemaType, json: &Json) -> Result<Value, CodecError> {
		self.read_json(ty, json, 0)
	}

	/// Render a [`Value`] of type `ty` as JSON.
	pub fn value_to_json(&self, ty: &SchemaType, value: &Value) -> Result<Json, CodecError> {
		self.write_json(ty, value, 0)
	}

	/// Build a struct [`Value`] from a JSON object (or array, for tuple
	/// fields).
	pub fn fields_from_json(
		&self,
		context: &str,
		fields: &StructFields,
		json: &Json,
	) -> Result<Value, CodecError> {
		self.struct_from_json(context, fields, json, 0)
	}

	pub fn fields_to_json(
		&self,
		context: &str,
		fields: &StructFields,
		value: &Value,
	) -> Result<Json, CodecError> {
		self.struct_to_json(context, fields, value, 0)
	}

	fn read_json(&self, ty: &SchemaType, json: &Json, depth: usize) -> Result<Value, CodecError> {
		if depth > MAX_DEPTH {
			return Err(CodecError::RecursionLimit { limit: MAX_DEPTH });
		}

		let value = match ty {
			SchemaType::Bool => {
				Value::Bool(
					json.as_bool()
						.ok_or_else(|| invalid(ty, "expected a boolean"))?,
				)
			}
			ty if ty.is_unsigned_integer() => json_integer(ty, json, false)?,
			ty if ty.is_signed_integer() => json_integer(ty, json, true)?,
			SchemaType::F32 | SchemaType::F64 => {
				Value::Float(json.as_f64().ok_or_else(|| invalid(ty, "expected a number"))?)
			}
			SchemaType::String => {
				Value::String(
					json.as_str()
						.ok_or_else(|| invalid(ty, "expected a string"))?
						.to_owned(),
				)
			}
			SchemaType::Bytes => Value::Bytes(json_bytes(ty, json)?),
			SchemaType::Pubkey => {
				let text = json
					.as_str()
					.ok_or_else(|| invalid(ty, "expected a base58 string"))?;
				Value::Pubkey(
					Address::from_str(text)
						.map_err(|_| invalid(ty, format!("`{text}` is not a valid address")))?,
				)
			}
			SchemaType::Vec(inner) | SchemaType::Array(inner, _) => {
				if **inner == SchemaType::U8 {
					Value::Bytes(json_bytes(ty, json)?)
				} else {
					let items = json
						.as_array()
						.ok_or_else(|| invalid(ty, "expected an array"))?;
					Value::List(
						items
							.iter()
							.map(|item| self.read_json(inner, item, depth + 1))
							.collect::<Result<_, _>>()?,
					)
				}
			}
			SchemaType::Option(inner) => {
				if json.is_null() {
					Value::none()
				} else {
					Value::some(self.read_json(inner, json, depth + 1)?)
				}
			}
			SchemaType::Defined(name) => {
				match &self.registry.require(name)?.body {
					TypeDefBody::Alias(target) => self.read_json(target, json, depth + 1)?,
					TypeDefBody::Struct(fields) => {
						self.struct_from_json(name, fields, json, depth + 1)?
					}
					TypeDefBody::Enum(def) => self.enum_from_json(name, def, json, depth + 1)?,
				}
			}
			SchemaType::Generic(name) => {
				return Err(CodecError::UnresolvedGeneric { name: name.clone() });
			}
			_ => return Err(invalid(ty, "unsupported type")),
		};

		Ok(value)
	}

	fn struct_from_json(
		&self,
		context: &str,
		fields: &StructFields,
		json: &Json,
		depth: usize,
	) -> Result<Value, CodecError> {
		match fields {
			StructFields::Named(fields) => {
				let object = json
					.as_object()
					.ok_or_else(|| invalid(context, "expected an object"))?;
				let mut map = BTreeMap::new();
				for field in fields {
					let raw = object
						.get(&field.name)
						.ok_or_else(|| CodecError::missing_field(context, &field.name))?;
					map.insert(field.name.clone(), self.read_json(&field.ty, raw, depth)?);
				}
				Ok(Value::Struct(map))
			}
			StructFields::Tuple(types) => {
				let items = json
					.as_array()
					.ok_or_else(|| invalid(context, "expected an array"))?;
				if items.len() != types.len() {
					return Err(CodecError::LengthMismatch {
						ty: context.to_owned(),
						expected: types.len(),
						actual: items.len(),
					});
				}
				Ok(Value::Tuple(
					types
						.iter()
						.zip(items)
						.map(|(ty, item)| self.read_json(ty, item, depth))
						.collect::<Result<_, _>>()?,
				))
			}
			StructFields::Unit => Ok(Value::Unit),
		}
	}

	fn enum_from_json(
		&self,
		name: &str,
		def: &EnumDef,
		json: &Json,
		depth: usize,
	) -> Result<Value, CodecError> {
		let (variant, payload) = match json {
			Json::String(variant) => (variant.as_str(), &Json::Null),
			Json::Object(object) if object.len() == 1 => {
				let mut entries = object.iter();
				match entries.next() {
					Some((variant, payload)) => (variant.as_str(), payload),
					None => return Err(invalid(name, "expected a single variant key")),
				}
			}
			_ => {
				return Err(invalid(
					name,
					"expected a variant name or a single-key object",
				));
			}
		};
		let index = def
			.variant_index(variant)
			.ok_or_else(|| CodecError::UnknownVariant {
				enum_name: name.to_owned(),
				variant: variant.to_owned(),
			})?;
		let fields = self.struct_from_json(
			&format!("{name}::{variant}"),
			&def.variants[index].fields,
			payload,
			depth,
		)?;

		Ok(Value::variant(variant, fields))
	}

	fn write_json(&self, ty: &SchemaType, value: &Value, depth: usize) -> Result<Json, CodecError> {
		if depth > MAX_DEPTH {
			return Err(CodecError::RecursionLimit { limit: MAX_DEPTH });
		}

		let json = match (ty, value) {
			(SchemaType::Bool, Value::Bool(b)) => Json::Bool(*b),
			(_, Value::Unsigned(n)) if ty.numeric_width().is_some() => unsigned_to_json(*n),
			(_, Value::Signed(n)) if ty.numeric_width().is_some() => signed_to_json(*n),
			(_, Value::BigInt(n)) => Json::String(n.to_string()),
			(_, Value::Float(f)) => {
				serde_json::Number::from_f64(*f)
					.map(Json::Number)
					.ok_or_else(|| invalid(ty, "non-finite float"))?
			}
			(SchemaType::String, Value::String(s)) => Json::String(s.clone()),
			(_, Value::Bytes(bytes)) => Json::Array(bytes.iter().map(|b| Json::from(*b)).collect()),
			(SchemaType::Pubkey, Value::Pubkey(address)) => Json::String(address.to_string()),
			(SchemaType::Vec(inner) | SchemaType::Array(inner, _), Value::List(items)) => {
				Json::Array(
					items
						.iter()
						.map(|item| self.write_json(inner, item, depth + 1))
						.collect::<Result<_, _>>()?,
				)
			}
			(SchemaType::Option(_), Value::Option(None)) => Json::Null,
			(SchemaType::Option(inner), Value::Option(Some(inner_value))) => {
				self.write_json(inner, inner_value, depth + 1)?
			}
			(SchemaType::Defined(name), _) => {
				match &self.registry.require(name)?.body {
					TypeDefBody::Alias(target) => self.write_json(target, value, depth + 1)?,
					TypeDefBody::Struct(fields) => {
						self.struct_to_json(name, fields, value, depth + 1)?
					}
					TypeDefBody::Enum(def) => self.enum_to_json(name, def, value, depth + 1)?,
				}
			}
			(SchemaType::Generic(name), _) => {
				return Err(CodecError::UnresolvedGeneric { name: name.clone() });
			}
			(ty, other) => {
				return Err(CodecError::TypeMismatch {
					ty: ty.to_string(),
					expected: "a value of the declared type",
					found: other.kind(),
				});
			}
		};

		Ok(json)
	}

	fn struct_to_json(
		&self,
		context: &str,
		fields: &StructFields,
		value: &Value,
		depth: usize,
	) -> Result<Json, CodecError> {
		match (fields, value) {
			(StructFields::Named(fields), Value::Struct(map)) => {
				let mut object = Map::new();
				for field in fields {
					let field_value = map
						.get(&field.name)
						.ok_or_else(|| CodecError::missing_field(context, &field.name))?;
					object.insert(field.name.clone(), self.write_json(&field.ty, field_value, depth)?);
				}
				Ok(Json::Object(object))
			}
			(StructFields::Tuple(types), Value::Tuple(items)) if types.len() == items.len() => {
				Ok(Json::Array(
					types
						.iter()
						.zip(items)
						.map(|(ty, item)| self.write_json(ty, item, depth))
						.collect::<Result<_, _>>()?,
				))
			}
			(StructFields::Unit, _) => Ok(Json::Null),
			(_, other) => {
				Err(CodecError::TypeMismatch {
					ty: context.to_owned(),
					expected: "struct",
					found: other.kind(),
				})
			}
		}
	}

	fn enum_to_json(
		&self,
		name: &str,
		def: &EnumDef,
		value: &Value,
		depth: usize,
	) -> Result<Json, CodecError> {
		let Value::Enum { variant, fields } = value else {
			return Err(CodecError::TypeMismatch {
				ty: name.to_owned(),
				expected: "enum",
				found: value.kind(),
			});
		};
		let index = def
			.variant_index(variant)
			.ok_or_else(|| CodecError::UnknownVariant {
				enum_name: name.to_owned(),
				variant: variant.clone(),
			})?;
		let variant_fields = &def.variants[index].fields;
		if *variant_fields == StructFields::Unit {
			return Ok(Json::String(variant.clone()));
		}

		let payload = self.struct_to_json(
			&format!("{name}::{variant}"),
			variant_fields,
			fields,
			depth,
		)?;
		let mut object = Map::new();
		object.insert(variant.clone(), payload);
		Ok(Json::Object(object))
	}
}

fn invalid(ty: impl ToString, reason: impl Into<String>) -> CodecError {
	CodecError::InvalidJson {
		ty: ty.to_string(),
		reason: reason.into(),
	}
}

fn json_integer(ty: &SchemaType, json: &Json, signed: bool) -> Result<Value, CodecError> {
	let value = match json {
		Json::Number(number) => {
			if let Some(n) = number.as_u64() {
				Value::Unsigned(u128::from(n))
			} else if let Some(n) = number.as_i64() {
				Value::Signed(i128::from(n))
			} else {
				return Err(invalid(ty, format!("`{number}` is not an integer")));
			}
		}
		Json::String(text) => {
			let parsed = BigInt::from_str(text.trim())
				.map_err(|_| invalid(ty, format!("`{text}` is not an integer")))?;
			if matches!(ty, SchemaType::U256 | SchemaType::I256) {
				Value::BigInt(parsed)
			} else if let Ok(n) = u128::try_from(&parsed) {
				Value::Unsigned(n)
			} else if let Ok(n) = i128::try_from(&parsed) {
				Value::Signed(n)
			} else {
				return Err(CodecError::overflow(ty.to_string(), parsed));
			}
		}
		_ => return Err(invalid(ty, "expected an integer or a decimal string")),
	};

	// Decoded values are `Signed` for every signed width, so match that here.
	match (signed, value) {
		(false, Value::Signed(n)) if n < 0 => Err(CodecError::overflow(ty.to_string(), json)),
		(true, Value::Unsigned(n)) => {
			i128::try_from(n)
				.map(Value::Signed)
				.map_err(|_| CodecError::overflow(ty.to_string(), n))
		}
		(_, value) => Ok(value),
	}
}

fn json_bytes(ty: &SchemaType, json: &Json) -> Result<Vec<u8>, CodecError> {
	let items = json
		.as_array()
		.ok_or_else(|| invalid(ty, "expected an array of bytes"))?;
	items
		.iter()
		.map(|item| {
			item.as_u64()
				.and_then(|n| u8::try_from(n).ok())
				.ok_or_else(|| invalid(ty, format!("`{item}` is not a byte")))
		})
		.collect()
}

fn unsigned_to_json(n: u128) -> Json {
	match u64::try_from(n) {
		Ok(small) if n <= MAX_SAFE_INTEGER => Json::from(small),
		_ => Json::String(n.to_string()),
	}
}

fn signed_to_json(n: i128) -> Json {
	match i64::try_from(n) {
		Ok(small) if n.unsigned_abs() <= MAX_SAFE_INTEGER => Json::from(small),
		_ => Json::String(n.to_string()),
	}
}
