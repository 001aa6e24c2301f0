//! Schema-driven binary codec.
//!
//! The wire format is borsh-compatible little-endian:
//!
//! - integers and floats are written at their natural width, 256-bit integers
//!   as 32 two's-complement bytes;
//! - `string`, `bytes` and `Vec<T>` carry a `u32` length prefix;
//! - `[T; N]` is written as `N` elements with no prefix;
//! - `Option<T>` is a one-byte tag (`0` none, `1` some) followed by the value;
//! - enums write their variant index at the declared tag width, then the
//!   variant's fields;
//! - struct fields are written in declaration order with no padding.

mod json;

use std::collections::BTreeMap;

use num_bigint::BigInt;
use solana_address::Address;

use crate::ByteReader;
use crate::ByteWriter;
use crate::CodecError;
use crate::Value;
use crate::schema::EnumDef;
use crate::schema::EnumTag;
use crate::schema::SchemaRegistry;
use crate::schema::SchemaType;
use crate::schema::StructFields;
use crate::schema::TypeDefBody;

/// Type nesting beyond this depth is rejected instead of recursing further.
pub const MAX_DEPTH: usize = 64;

/// Largest fixed size trusted as the initial capacity of an encode buffer.
const MAX_CAPACITY_HINT: usize = 4096;

/// Encodes and decodes [`Value`]s against the types of a [`SchemaRegistry`].
///
/// The codec is a borrowed view and carries no state of its own, so it is
/// cheap to construct wherever one is needed.
#[derive(Debug, Clone, Copy)]
pub struct Codec<'a> {
	registry: &'a SchemaRegistry,
}

impl<'a> Codec<'a> {
	pub fn new(registry: &'a SchemaRegistry) -> Self {
		Self { registry }
	}

	pub fn registry(&self) -> &'a SchemaRegistry {
		self.registry
	}

	/// Serialize `value` as `ty`.
	///
	/// ```
	/// use tessera::Codec;
	/// use tessera::SchemaRegistry;
	/// use tessera::SchemaType;
	/// use tessera::Value;
	///
	/// let registry = SchemaRegistry::new();
	/// let bytes = Codec::new(&registry)
	/// 	.encode(&SchemaType::vec(SchemaType::U16), &Value::List(vec![Value::from(1u16)]))
	/// 	.unwrap();
	/// assert_eq!(bytes, [1, 0, 0, 0, 1, 0]);
	/// ```
	pub fn encode(&self, ty: &SchemaType, value: &Value) -> Result<Vec<u8>, CodecError> {
		let capacity = self
			.registry
			.fixed_size(ty)
			.filter(|size| *size <= MAX_CAPACITY_HINT)
			.unwrap_or(64);
		let mut writer = ByteWriter::with_capacity(capacity);
		self.encode_into(ty, value, &mut writer)?;
		Ok(writer.into_inner())
	}

	pub fn encode_into(
		&self,
		ty: &SchemaType,
		value: &Value,
		writer: &mut ByteWriter,
	) -> Result<(), CodecError> {
		self.encode_value(ty, value, writer, 0)
	}

	/// Deserialize one `ty` from the front of `bytes`, returning the value and
	/// the number of bytes consumed. Trailing bytes are left untouched.
	pub fn decode(&self, ty: &SchemaType, bytes: &[u8]) -> Result<(Value, usize), CodecError> {
		let mut reader = ByteReader::new(bytes);
		let value = self.decode_from(ty, &mut reader)?;
		Ok((value, reader.position()))
	}

	pub fn decode_from(
		&self,
		ty: &SchemaType,
		reader: &mut ByteReader<'_>,
	) -> Result<Value, CodecError> {
		self.decode_value(ty, reader, 0)
	}

	/// Encode a struct's field list (used for instruction arguments, which
	/// are an anonymous struct).
	pub fn encode_fields(
		&self,
		context: &str,
		fields: &StructFields,
		value: &Value,
		writer: &mut ByteWriter,
	) -> Result<(), CodecError> {
		self.encode_struct(context, fields, value, writer, 0)
	}

	pub fn decode_fields(
		&self,
		fields: &StructFields,
		reader: &mut ByteReader<'_>,
	) -> Result<Value, CodecError> {
		self.decode_struct(fields, reader, 0)
	}

	fn encode_value(
		&self,
		ty: &SchemaType,
		value: &Value,
		writer: &mut ByteWriter,
		depth: usize,
	) -> Result<(), CodecError> {
		if depth > MAX_DEPTH {
			return Err(CodecError::RecursionLimit { limit: MAX_DEPTH });
		}

		match ty {
			SchemaType::Bool => {
				match value {
					Value::Bool(b) => writer.write_bool(*b),
					other => return Err(mismatch(ty, "bool", other)),
				}
			}
			SchemaType::U8 => writer.write_u8(integer(ty, value)?),
			SchemaType::U16 => writer.write_u16(integer(ty, value)?),
			SchemaType::U32 => writer.write_u32(integer(ty, value)?),
			SchemaType::U64 => writer.write_u64(integer(ty, value)?),
			SchemaType::U128 => writer.write_u128(integer(ty, value)?),
			SchemaType::I8 => writer.write_i8(integer(ty, value)?),
			SchemaType::I16 => writer.write_i16(integer(ty, value)?),
			SchemaType::I32 => writer.write_i32(integer(ty, value)?),
			SchemaType::I64 => writer.write_i64(integer(ty, value)?),
			SchemaType::I128 => writer.write_i128(integer(ty, value)?),
			SchemaType::U256 => writer.write_int256(&big_integer(ty, value)?, false)?,
			SchemaType::I256 => writer.write_int256(&big_integer(ty, value)?, true)?,
			SchemaType::F32 => writer.write_f32(narrow_f32(ty, value)?),
			SchemaType::F64 => writer.write_f64(float(ty, value)?),
			SchemaType::String => {
				match value {
					Value::String(s) => writer.write_len_prefixed(s.as_bytes())?,
					other => return Err(mismatch(ty, "string", other)),
				}
			}
			SchemaType::Bytes => writer.write_len_prefixed(&byte_list(ty, value)?)?,
			SchemaType::Pubkey => writer.write_bytes(pubkey(ty, value)?.as_array()),
			SchemaType::Vec(inner) => {
				if **inner == SchemaType::U8 {
					writer.write_len_prefixed(&byte_list(ty, value)?)?;
				} else {
					let items = list(ty, value)?;
					self.check_element_size(ty, inner, items.len())?;
					writer.write_len(items.len())?;
					for item in items {
						self.encode_value(inner, item, writer, depth + 1)?;
					}
				}
			}
			SchemaType::Array(inner, len) => {
				if **inner == SchemaType::U8 {
					let bytes = byte_list(ty, value)?;
					check_len(ty, *len, bytes.len())?;
					writer.write_bytes(&bytes);
				} else {
					let items = list(ty, value)?;
					check_len(ty, *len, items.len())?;
					self.check_element_size(ty, inner, items.len())?;
					for item in items {
						self.encode_value(inner, item, writer, depth + 1)?;
					}
				}
			}
			SchemaType::Option(inner) => {
				match value {
					Value::Option(None) => writer.write_u8(0),
					Value::Option(Some(inner_value)) => {
						writer.write_u8(1);
						self.encode_value(inner, inner_value, writer, depth + 1)?;
					}
					other => return Err(mismatch(ty, "option", other)),
				}
			}
			SchemaType::Defined(name) => {
				match &self.registry.require(name)?.body {
					TypeDefBody::Alias(target) => {
						self.encode_value(target, value, writer, depth + 1)?;
					}
					TypeDefBody::Struct(fields) => {
						self.encode_struct(name, fields, value, writer, depth + 1)?;
					}
					TypeDefBody::Enum(def) => self.encode_enum(name, def, value, writer, depth + 1)?,
				}
			}
			SchemaType::Generic(name) => {
				return Err(CodecError::UnresolvedGeneric { name: name.clone() });
			}
		}

		Ok(())
	}

	fn encode_struct(
		&self,
		context: &str,
		fields: &StructFields,
		value: &Value,
		writer: &mut ByteWriter,
		depth: usize,
	) -> Result<(), CodecError> {
		match fields {
			StructFields::Named(fields) => {
				let Value::Struct(map) = value else {
					return Err(CodecError::TypeMismatch {
						ty: context.to_owned(),
						expected: "struct",
						found: value.kind(),
					});
				};
				for field in fields {
					let field_value = map
						.get(&field.name)
						.ok_or_else(|| CodecError::missing_field(context, &field.name))?;
					self.encode_value(&field.ty, field_value, writer, depth)?;
				}
			}
			StructFields::Tuple(types) => {
				let (Value::Tuple(items) | Value::List(items)) = value else {
					return Err(CodecError::TypeMismatch {
						ty: context.to_owned(),
						expected: "tuple",
						found: value.kind(),
					});
				};
				if items.len() != types.len() {
					return Err(CodecError::LengthMismatch {
						ty: context.to_owned(),
						expected: types.len(),
						actual: items.len(),
					});
				}
				for (ty, item) in types.iter().zip(items) {
					self.encode_value(ty, item, writer, depth)?;
				}
			}
			StructFields::Unit => {
				match value {
					Value::Unit => {}
					Value::Struct(map) if map.is_empty() => {}
					Value::Tuple(items) if items.is_empty() => {}
					other => {
						return Err(CodecError::TypeMismatch {
							ty: context.to_owned(),
							expected: "unit",
							found: other.kind(),
						});
					}
				}
			}
		}

		Ok(())
	}

	fn encode_enum(
		&self,
		name: &str,
		def: &EnumDef,
		value: &Value,
		writer: &mut ByteWriter,
		depth: usize,
	) -> Result<(), CodecError> {
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
		write_tag(def.tag, index, writer)?;
		self.encode_struct(
			&format!("{name}::{variant}"),
			&def.variants[index].fields,
			fields,
			writer,
			depth,
		)
	}

	fn decode_value(
		&self,
		ty: &SchemaType,
		reader: &mut ByteReader<'_>,
		depth: usize,
	) -> Result<Value, CodecError> {
		if depth > MAX_DEPTH {
			return Err(CodecError::RecursionLimit { limit: MAX_DEPTH });
		}

		let value = match ty {
			SchemaType::Bool => Value::Bool(reader.read_bool()?),
			SchemaType::U8 => Value::from(reader.read_u8()?),
			SchemaType::U16 => Value::from(reader.read_u16()?),
			SchemaType::U32 => Value::from(reader.read_u32()?),
			SchemaType::U64 => Value::from(reader.read_u64()?),
			SchemaType::U128 => Value::from(reader.read_u128()?),
			SchemaType::I8 => Value::from(reader.read_i8()?),
			SchemaType::I16 => Value::from(reader.read_i16()?),
			SchemaType::I32 => Value::from(reader.read_i32()?),
			SchemaType::I64 => Value::from(reader.read_i64()?),
			SchemaType::I128 => Value::from(reader.read_i128()?),
			SchemaType::U256 => Value::BigInt(reader.read_int256(false)?),
			SchemaType::I256 => Value::BigInt(reader.read_int256(true)?),
			SchemaType::F32 => Value::from(reader.read_f32()?),
			SchemaType::F64 => Value::from(reader.read_f64()?),
			SchemaType::String => {
				let offset = reader.position();
				let bytes = reader.read_len_prefixed()?;
				let s = std::str::from_utf8(bytes)
					.map_err(|_| CodecError::InvalidUtf8 { offset })?;
				Value::String(s.to_owned())
			}
			SchemaType::Bytes => Value::Bytes(reader.read_len_prefixed()?.to_vec()),
			SchemaType::Pubkey => Value::Pubkey(Address::new_from_array(reader.read_array()?)),
			SchemaType::Vec(inner) => {
				if **inner == SchemaType::U8 {
					Value::Bytes(reader.read_len_prefixed()?.to_vec())
				} else {
					let len = reader.read_len()?;
					// Elements are at least one byte wide past this check, so the
					// input size bounds the allocation and the loop.
					self.check_element_size(ty, inner, len)?;
					let mut items = Vec::with_capacity(len.min(reader.remaining()));
					for _ in 0..len {
						items.push(self.decode_value(inner, reader, depth + 1)?);
					}
					Value::List(items)
				}
			}
			SchemaType::Array(inner, len) => {
				if **inner == SchemaType::U8 {
					Value::Bytes(reader.read_slice(*len)?.to_vec())
				} else {
					self.check_element_size(ty, inner, *len)?;
					let mut items = Vec::with_capacity((*len).min(reader.remaining()));
					for _ in 0..*len {
						items.push(self.decode_value(inner, reader, depth + 1)?);
					}
					Value::List(items)
				}
			}
			SchemaType::Option(inner) => {
				if reader.read_bool()? {
					Value::some(self.decode_value(inner, reader, depth + 1)?)
				} else {
					Value::none()
				}
			}
			SchemaType::Defined(name) => {
				match &self.registry.require(name)?.body {
					TypeDefBody::Alias(target) => self.decode_value(target, reader, depth + 1)?,
					TypeDefBody::Struct(fields) => {
						self.decode_struct(fields, reader, depth + 1)?
					}
					TypeDefBody::Enum(def) => self.decode_enum(name, def, reader, depth + 1)?,
				}
			}
			SchemaType::Generic(name) => {
				return Err(CodecError::UnresolvedGeneric { name: name.clone() });
			}
		};

		Ok(value)
	}

	fn decode_struct(
		&self,
		fields: &StructFields,
		reader: &mut ByteReader<'_>,
		depth: usize,
	) -> Result<Value, CodecError> {
		let value = match fields {
			StructFields::Named(fields) => {
				let mut map = BTreeMap::new();
				for field in fields {
					let value = self.decode_value(&field.ty, reader, depth)?;
					map.insert(field.name.clone(), value);
				}
				Value::Struct(map)
			}
			StructFields::Tuple(types) => {
				let mut items = Vec::with_capacity(types.len());
				for ty in types {
					items.push(self.decode_value(ty, reader, depth)?);
				}
				Value::Tuple(items)
			}
			StructFields::Unit => Value::Unit,
		};

		Ok(value)
	}

	fn decode_enum(
		&self,
		name: &str,
		def: &EnumDef,
		reader: &mut ByteReader<'_>,
		depth: usize,
	) -> Result<Value, CodecError> {
		let index = match def.tag {
			EnumTag::U8 => u64::from(reader.read_u8()?),
			EnumTag::U16 => u64::from(reader.read_u16()?),
			EnumTag::U32 => u64::from(reader.read_u32()?),
		};
		let variant = usize::try_from(index)
			.ok()
			.and_then(|i| def.variants.get(i))
			.ok_or_else(|| CodecError::UnknownVariant {
				enum_name: name.to_owned(),
				variant: index.to_string(),
			})?;
		let fields = self.decode_struct(&variant.fields, reader, depth)?;

		Ok(Value::variant(variant.name.clone(), fields))
	}

	/// Collections of zero-sized elements may only be empty. Otherwise a
	/// four-byte length prefix could demand billions of elements without
	/// consuming any further input.
	fn check_element_size(
		&self,
		ty: &SchemaType,
		inner: &SchemaType,
		len: usize,
	) -> Result<(), CodecError> {
		if len > 0 && self.registry.fixed_size(inner) == Some(0) {
			return Err(CodecError::ZeroSizedElements {
				ty: ty.to_string(),
				len,
			});
		}
		Ok(())
	}
}

fn write_tag(tag: EnumTag, index: usize, writer: &mut ByteWriter) -> Result<(), CodecError> {
	let overflow = || CodecError::overflow(format!("{tag:?} enum tag").to_lowercase(), index);
	match tag {
		EnumTag::U8 => writer.write_u8(u8::try_from(index).map_err(|_| overflow())?),
		EnumTag::U16 => writer.write_u16(u16::try_from(index).map_err(|_| overflow())?),
		EnumTag::U32 => writer.write_u32(u32::try_from(index).map_err(|_| overflow())?),
	}
	Ok(())
}

fn mismatch(ty: &SchemaType, expected: &'static str, found: &Value) -> CodecError {
	CodecError::TypeMismatch {
		ty: ty.to_string(),
		expected,
		found: found.kind(),
	}
}

fn check_len(ty: &SchemaType, expected: usize, actual: usize) -> Result<(), CodecError> {
	if expected == actual {
		Ok(())
	} else {
		Err(CodecError::LengthMismatch {
			ty: ty.to_string(),
			expected,
			actual,
		})
	}
}

/// Range-check an integer value against the width of `T`.
fn integer<T>(ty: &SchemaType, value: &Value) -> Result<T, CodecError>
where
	T: TryFrom<u128> + TryFrom<i128>,
{
	let fits = match value {
		Value::Unsigned(n) => <T as TryFrom<u128>>::try_from(*n).ok(),
		Value::Signed(n) => <T as TryFrom<i128>>::try_from(*n).ok(),
		Value::BigInt(n) => {
			u128::try_from(n)
				.ok()
				.and_then(|n| <T as TryFrom<u128>>::try_from(n).ok())
				.or_else(|| {
					i128::try_from(n)
						.ok()
						.and_then(|n| <T as TryFrom<i128>>::try_from(n).ok())
				})
		}
		other => return Err(mismatch(ty, "integer", other)),
	};

	fits.ok_or_else(|| {
		let shown = match value {
			Value::Unsigned(n) => n.to_string(),
			Value::Signed(n) => n.to_string(),
			Value::BigInt(n) => n.to_string(),
			_ => String::new(),
		};
		CodecError::overflow(ty.to_string(), shown)
	})
}

fn big_integer(ty: &SchemaType, value: &Value) -> Result<BigInt, CodecError> {
	match value {
		Value::Unsigned(n) => Ok(BigInt::from(*n)),
		Value::Signed(n) => Ok(BigInt::from(*n)),
		Value::BigInt(n) => Ok(n.clone()),
		other => Err(mismatch(ty, "integer", other)),
	}
}

#[allow(clippy::cast_precision_loss)]
fn float(ty: &SchemaType, value: &Value) -> Result<f64, CodecError> {
	match value {
		Value::Float(f) => Ok(*f),
		Value::Unsigned(n) => Ok(*n as f64),
		Value::Signed(n) => Ok(*n as f64),
		other => Err(mismatch(ty, "float", other)),
	}
}

/// Narrow to `f32`, failing when a finite input lands outside its range.
fn narrow_f32(ty: &SchemaType, value: &Value) -> Result<f32, CodecError> {
	let wide = float(ty, value)?;
	#[allow(clippy::cast_possible_truncation)]
	let narrow = wide as f32;
	if wide.is_finite() && narrow.is_infinite() {
		return Err(CodecError::overflow(ty.to_string(), wide));
	}
	Ok(narrow)
}

fn pubkey<'v>(ty: &SchemaType, value: &'v Value) -> Result<&'v Address, CodecError> {
	match value {
		Value::Pubkey(address) => Ok(address),
		other => Err(mismatch(ty, "pubkey", other)),
	}
}

fn list<'v>(ty: &SchemaType, value: &'v Value) -> Result<&'v [Value], CodecError> {
	match value {
		Value::List(items) | Value::Tuple(items) => Ok(items),
		other => Err(mismatch(ty, "list", other)),
	}
}

/// Accept either raw bytes or a list of `u8` values.
fn byte_list(ty: &SchemaType, value: &Value) -> Result<Vec<u8>, CodecError> {
	match value {
		Value::Bytes(bytes) => Ok(bytes.clone()),
		Value::List(items) => items.iter().map(|item| integer::<u8>(&SchemaType::U8, item)).collect(),
		other => Err(mismatch(ty, "bytes", other)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::EnumVariant;
	use crate::schema::Field;
	use crate::schema::TypeDef;

	fn registry() -> SchemaRegistry {
		SchemaRegistry::new()
			.with_type(TypeDef::named_struct(
				"Point",
				vec![Field::new("x", SchemaType::I16), Field::new("y", SchemaType::I16)],
			))
			.with_type(TypeDef::new(
				"Shape",
				TypeDefBody::Enum(EnumDef {
					tag: EnumTag::U8,
					variants: vec![
						EnumVariant::unit("Empty"),
						EnumVariant {
							name: "Dot".to_owned(),
							fields: StructFields::Tuple(vec![SchemaType::defined("Point")]),
						},
					],
				}),
			))
			.with_type(TypeDef::new(
				"Nested",
				TypeDefBody::Struct(StructFields::Named(vec![Field::new(
					"next",
					SchemaType::option(SchemaType::defined("Nested")),
				)])),
			))
			.with_type(TypeDef::new("Marker", TypeDefBody::Struct(StructFields::Unit)))
	}

	#[test]
	fn enum_payload_follows_tag() {
		let registry = registry();
		let codec = Codec::new(&registry);
		let value = Value::variant(
			"Dot",
			Value::Tuple(vec![Value::struct_from([
				("x", Value::from(-1i16)),
				("y", Value::from(2i16)),
			])]),
		);
		let bytes = codec.encode(&SchemaType::defined("Shape"), &value).unwrap();
		assert_eq!(bytes, [1, 0xff, 0xff, 2, 0]);
		assert_eq!(codec.decode(&SchemaType::defined("Shape"), &bytes).unwrap(), (value, 5));
	}

	#[test]
	fn byte_vectors_decode_as_bytes() {
		let registry = registry();
		let codec = Codec::new(&registry);
		let ty = SchemaType::vec(SchemaType::U8);
		let listed = Value::List(vec![Value::from(9u8), Value::from(8u8)]);
		let bytes = codec.encode(&ty, &listed).unwrap();
		assert_eq!(bytes, [2, 0, 0, 0, 9, 8]);
		assert_eq!(codec.decode(&ty, &bytes).unwrap().0, Value::Bytes(vec![9, 8]));
	}

	#[test]
	fn array_length_is_enforced() {
		let registry = registry();
		let codec = Codec::new(&registry);
		let err = codec
			.encode(
				&SchemaType::array(SchemaType::U16, 3),
				&Value::List(vec![Value::from(1u16)]),
			)
			.unwrap_err();
		assert!(matches!(
			err,
			CodecError::LengthMismatch {
				expected: 3,
				actual: 1,
				..
			}
		));
	}

	#[test]
	fn deep_recursion_is_bounded() {
		let registry = registry();
		let codec = Codec::new(&registry);
		// Every `1` byte opens another `Some(Nested)` level.
		let bytes = vec![1u8; MAX_DEPTH * 4];
		let err = codec.decode(&SchemaType::defined("Nested"), &bytes).unwrap_err();
		assert_eq!(err, CodecError::RecursionLimit { limit: MAX_DEPTH });
	}

	#[test]
	fn invalid_utf8_reports_offset() {
		let registry = registry();
		let codec = Codec::new(&registry);
		let err = codec.decode(&SchemaType::String, &[1, 0, 0, 0, 0xff]).unwrap_err();
		assert_eq!(err, CodecError::InvalidUtf8 { offset: 0 });
	}

	#[test]
	fn f32_rejects_finite_values_out_of_range() {
		let registry = registry();
		let codec = Codec::new(&registry);
		let err = codec.encode(&SchemaType::F32, &Value::Float(1e300)).unwrap_err();
		assert!(matches!(err, CodecError::NumericOverflow { .. }), "{err}");

		let max = Value::Float(f64::from(f32::MAX));
		let bytes = codec.encode(&SchemaType::F32, &max).unwrap();
		assert_eq!(codec.decode(&SchemaType::F32, &bytes).unwrap(), (max, 4));

		let infinity = Value::Float(f64::INFINITY);
		let bytes = codec.encode(&SchemaType::F32, &infinity).unwrap();
		assert_eq!(codec.decode(&SchemaType::F32, &bytes).unwrap(), (infinity, 4));
	}

	#[test]
	fn huge_fixed_arrays_fail_without_allocating() {
		let registry = registry();
		let codec = Codec::new(&registry);
		let err = codec
			.encode(
				&SchemaType::array(SchemaType::U64, usize::MAX / 8),
				&Value::List(Vec::new()),
			)
			.unwrap_err();
		assert!(matches!(
			err,
			CodecError::LengthMismatch {
				expected,
				actual: 0,
				..
			} if expected == usize::MAX / 8
		));
	}

	#[test]
	fn zero_sized_elements_are_bounded() {
		let registry = registry();
		let codec = Codec::new(&registry);
		let ty = SchemaType::vec(SchemaType::defined("Marker"));

		let err = codec.decode(&ty, &[0xff, 0xff, 0xff, 0]).unwrap_err();
		assert!(matches!(
			err,
			CodecError::ZeroSizedElements { len: 0x00ff_ffff, .. }
		));

		let err = codec
			.decode(&SchemaType::array(SchemaType::defined("Marker"), usize::MAX), &[])
			.unwrap_err();
		assert!(matches!(err, CodecError::ZeroSizedElements { .. }));

		let empty = Value::List(Vec::new());
		let bytes = codec.encode(&ty, &empty).unwrap();
		assert_eq!(bytes, [0, 0, 0, 0]);
		assert_eq!(codec.decode(&ty, &bytes).unwrap(), (empty, 4));
	}
}
