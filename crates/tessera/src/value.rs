use std::collections::BTreeMap;

use num_bigint::BigInt;
use solana_address::Address;

/// A dynamically typed value whose shape mirrors a
/// [`SchemaType`](crate::SchemaType).
///
/// Integers of every width up to 128 bits are carried as [`Value::Unsigned`]
/// or [`Value::Signed`] and range-checked against the declared width when
/// encoded; 256-bit integers use [`Value::BigInt`]. Struct fields live in an
/// ordered map, but encoding always follows the schema's declared field order.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	Unit,
	Bool(bool),
	Unsigned(u128),
	Signed(i128),
	BigInt(BigInt),
	Float(f64),
	String(String),
	Bytes(Vec<u8>),
	Pubkey(Address),
	List(Vec<Value>),
	Option(Option<Box<Value>>),
	Struct(BTreeMap<String, Value>),
	Tuple(Vec<Value>),
	Enum { variant: String, fields: Box<Value> },
}

impl Value {
	/// Build a struct value from `(field, value)` pairs.
	///
	/// ```
	/// use tessera::Value;
	///
	/// let counter = Value::struct_from([("count", Value::from(7u64)), ("bump", Value::from(3u8))]);
	/// assert_eq!(counter.field("count").and_then(Value::as_u64), Some(7));
	/// ```
	pub fn struct_from<K, I>(fields: I) -> Self
	where
		K: Into<String>,
		I: IntoIterator<Item = (K, Value)>,
	{
		Self::Struct(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
	}

	/// An enum variant carrying `fields` (a struct, tuple or unit value).
	pub fn variant(name: impl Into<String>, fields: Value) -> Self {
		Self::Enum {
			variant: name.into(),
			fields: Box::new(fields),
		}
	}

	pub fn unit_variant(name: impl Into<String>) -> Self {
		Self::variant(name, Self::Unit)
	}

	pub fn some(value: Value) -> Self {
		Self::Option(Some(Box::new(value)))
	}

	pub fn none() -> Self {
		Self::Option(None)
	}

	/// Short name of the variant, used in type-mismatch diagnostics.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Unit => "unit",
			Self::Bool(_) => "bool",
			Self::Unsigned(_) => "unsigned integer",
			Self::Signed(_) => "signed integer",
			Self::BigInt(_) => "big integer",
			Self::Float(_) => "float",
			Self::String(_) => "string",
			Self::Bytes(_) => "bytes",
			Self::Pubkey(_) => "pubkey",
			Self::List(_) => "list",
			Self::Option(_) => "option",
			Self::Struct(_) => "struct",
			Self::Tuple(_) => "tuple",
			Self::Enum { .. } => "enum",
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_u128(&self) -> Option<u128> {
		match self {
			Self::Unsigned(n) => Some(*n),
			Self::Signed(n) => u128::try_from(*n).ok(),
			Self::BigInt(n) => u128::try_from(n).ok(),
			_ => None,
		}
	}

	pub fn as_i128(&self) -> Option<i128> {
		match self {
			Self::Unsigned(n) => i128::try_from(*n).ok(),
			Self::Signed(n) => Some(*n),
			Self::BigInt(n) => i128::try_from(n).ok(),
			_ => None,
		}
	}

	pub fn as_u64(&self) -> Option<u64> {
		self.as_u128().and_then(|n| u64::try_from(n).ok())
	}

	pub fn as_i64(&self) -> Option<i64> {
		self.as_i128().and_then(|n| i64::try_from(n).ok())
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_bytes(&self) -> Option<&[u8]> {
		match self {
			Self::Bytes(bytes) => Some(bytes),
			_ => None,
		}
	}

	pub fn as_pubkey(&self) -> Option<&Address> {
		match self {
			Self::Pubkey(address) => Some(address),
			_ => None,
		}
	}

	/// A named field of a struct value, or of a struct-shaped enum payload.
	pub fn field(&self, name: &str) -> Option<&Value> {
		match self {
			Self::Struct(fields) => fields.get(name),
			Self::Enum { fields, .. } => fields.field(name),
			_ => None,
		}
	}

	/// Follow a dotted path (`config.authority`) through nested structs.
	/// Numeric segments index into tuples and lists; present options are
	/// stepped through transparently.
	pub fn get_path(&self, path: &str) -> Option<&Value> {
		path.split('.').try_fold(self, |current, segment| {
			let current = match current {
				Self::Option(Some(inner)) => inner,
				other => other,
			};
			match current {
				Self::Tuple(items) | Self::List(items) => {
					segment.parse::<usize>().ok().and_then(|i| items.get(i))
				}
				other => other.field(segment),
			}
		})
	}
}

macro_rules! from_unsigned {
	($($ty:ty),*) => {
		$(
			impl From<$ty> for Value {
				fn from(value: $ty) -> Self {
					Self::Unsigned(u128::from(value))
				}
			}
		)*
	};
}

macro_rules! from_signed {
	($($ty:ty),*) => {
		$(
			impl From<$ty> for Value {
				fn from(value: $ty) -> Self {
					Self::Signed(i128::from(value))
				}
			}
		)*
	};
}

from_unsigned!(u8, u16, u32, u64, u128);
from_signed!(i8, i16, i32, i64, i128);

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<f32> for Value {
	fn from(value: f32) -> Self {
		Self::Float(f64::from(value))
	}
}

impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Self::Float(value)
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Self::String(value.to_owned())
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Self::String(value)
	}
}

impl From<Vec<u8>> for Value {
	fn from(value: Vec<u8>) -> Self {
		Self::Bytes(value)
	}
}

impl From<Address> for Value {
	fn from(value: Address) -> Self {
		Self::Pubkey(value)
	}
}

impl From<BigInt> for Value {
	fn from(value: BigInt) -> Self {
		Self::BigInt(value)
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(value: Option<T>) -> Self {
		Self::Option(value.map(|v| Box::new(v.into())))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn integer_accessors_cross_signedness() {
		assert_eq!(Value::Signed(5).as_u64(), Some(5));
		assert_eq!(Value::Signed(-5).as_u64(), None);
		assert_eq!(Value::Unsigned(u128::MAX).as_i128(), None);
		assert_eq!(Value::BigInt(BigInt::from(9)).as_u64(), Some(9));
	}

	#[test]
	fn path_navigation() {
		let key = Address::new_from_array([4; 32]);
		let value = Value::struct_from([
			(
				"config",
				Value::some(Value::struct_from([("authority", Value::from(key))])),
			),
			("pair", Value::Tuple(vec![Value::from(1u8), Value::from(2u8)])),
		]);

		assert_eq!(
			value.get_path("config.authority").and_then(Value::as_pubkey),
			Some(&key)
		);
		assert_eq!(value.get_path("pair.1").and_then(Value::as_u64), Some(2));
		assert_eq!(value.get_path("config.missing"), None);
		assert_eq!(value.get_path("pair.7"), None);
	}
}
