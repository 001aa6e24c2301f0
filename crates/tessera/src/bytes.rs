//! Little-endian primitives over a growable sink and a bounds-checked cursor.
//!
//! Everything the codec writes or reads goes through [`ByteWriter`] and
//! [`ByteReader`]. Reads never move the cursor when they fail, so a caller can
//! report the exact offset at which the input ran out.

use num_bigint::BigInt;
use num_bigint::Sign;

use crate::CodecError;

/// Width in bytes of a 256-bit integer.
pub const U256_BYTES: usize = 32;

/// A growable little-endian byte sink.
#[derive(Debug, Clone, Default)]
pub struct ByteWriter {
	buffer: Vec<u8>,
}

macro_rules! write_le {
	($($name:ident: $ty:ty),* $(,)?) => {
		$(
			#[inline]
			pub fn $name(&mut self, value: $ty) {
				self.buffer.extend_from_slice(&value.to_le_bytes());
			}
		)*
	};
}

impl ByteWriter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			buffer: Vec::with_capacity(capacity),
		}
	}

	write_le! {
		write_u8: u8,
		write_u16: u16,
		write_u32: u32,
		write_u64: u64,
		write_u128: u128,
		write_i8: i8,
		write_i16: i16,
		write_i32: i32,
		write_i64: i64,
		write_i128: i128,
	}

	#[inline]
	pub fn write_f32(&mut self, value: f32) {
		self.write_u32(value.to_bits());
	}

	#[inline]
	pub fn write_f64(&mut self, value: f64) {
		self.write_u64(value.to_bits());
	}

	#[inline]
	pub fn write_bool(&mut self, value: bool) {
		self.write_u8(u8::from(value));
	}

	/// Append raw bytes with no length prefix.
	#[inline]
	pub fn write_bytes(&mut self, bytes: &[u8]) {
		self.buffer.extend_from_slice(bytes);
	}

	/// Write a `u32` element count.
	pub fn write_len(&mut self, len: usize) -> Result<(), CodecError> {
		let len = u32::try_from(len).map_err(|_| CodecError::overflow("u32", len))?;
		self.write_u32(len);
		Ok(())
	}

	/// Write a `u32` length prefix followed by `bytes`.
	pub fn write_len_prefixed(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
		self.write_len(bytes.len())?;
		self.write_bytes(bytes);
		Ok(())
	}

	/// Write a 256-bit two's-complement integer. `signed` selects between
	/// `i256` and `u256` range checks.
	pub fn write_int256(&mut self, value: &BigInt, signed: bool) -> Result<(), CodecError> {
		let bytes = int256_to_le(value, signed)?;
		self.write_bytes(&bytes);
		Ok(())
	}

	pub fn len(&self) -> usize {
		self.buffer.len()
	}

	pub fn is_empty(&self) -> bool {
		self.buffer.is_empty()
	}

	pub fn as_slice(&self) -> &[u8] {
		&self.buffer
	}

	pub fn into_inner(self) -> Vec<u8> {
		self.buffer
	}
}

/// A cursor over borrowed bytes.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
	data: &'a [u8],
	offset: usize,
}

macro_rules! read_le {
	($($name:ident: $ty:ty),* $(,)?) => {
		$(
			#[inline]
			pub fn $name(&mut self) -> Result<$ty, CodecError> {
				self.read_array().map(<$ty>::from_le_bytes)
			}
		)*
	};
}

impl<'a> ByteReader<'a> {
	pub fn new(data: &'a [u8]) -> Self {
		Self { data, offset: 0 }
	}

	/// Bytes consumed so far.
	pub fn position(&self) -> usize {
		self.offset
	}

	pub fn remaining(&self) -> usize {
		self.data.len() - self.offset
	}

	pub fn is_exhausted(&self) -> bool {
		self.remaining() == 0
	}

	/// Everything after the cursor, without consuming it.
	pub fn rest(&self) -> &'a [u8] {
		&self.data[self.offset..]
	}

	/// Take exactly `len` bytes.
	pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
		if len > self.remaining() {
			return Err(CodecError::TruncatedInput {
				offset: self.offset,
				needed: len,
				remaining: self.remaining(),
			});
		}

		let slice = &self.data[self.offset..self.offset + len];
		self.offset += len;
		Ok(slice)
	}

	pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
		let slice = self.read_slice(N)?;
		let mut out = [0u8; N];
		out.copy_from_slice(slice);
		Ok(out)
	}

	read_le! {
		read_u8: u8,
		read_u16: u16,
		read_u32: u32,
		read_u64: u64,
		read_u128: u128,
		read_i8: i8,
		read_i16: i16,
		read_i32: i32,
		read_i64: i64,
		read_i128: i128,
	}

	pub fn read_f32(&mut self) -> Result<f32, CodecError> {
		self.read_u32().map(f32::from_bits)
	}

	pub fn read_f64(&mut self) -> Result<f64, CodecError> {
		self.read_u64().map(f64::from_bits)
	}

	pub fn read_bool(&mut self) -> Result<bool, CodecError> {
		let offset = self.offset;
		match self.read_u8()? {
			0 => Ok(false),
			1 => Ok(true),
			byte => {
				self.offset = offset;
				Err(CodecError::InvalidBool { offset, byte })
			}
		}
	}

	/// Read a `u32` element count.
	pub fn read_len(&mut self) -> Result<usize, CodecError> {
		self.read_u32().map(|len| len as usize)
	}

	/// Read a `u32` length prefix and the bytes it announces.
	pub fn read_len_prefixed(&mut self) -> Result<&'a [u8], CodecError> {
		let start = self.offset;
		let len = self.read_len()?;
		self.read_slice(len).inspect_err(|_| self.offset = start)
	}

	pub fn read_int256(&mut self, signed: bool) -> Result<BigInt, CodecError> {
		let bytes = self.read_array::<U256_BYTES>()?;
		Ok(if signed {
			BigInt::from_signed_bytes_le(&bytes)
		} else {
			BigInt::from_bytes_le(Sign::Plus, &bytes)
		})
	}
}

/// Convert `value` into a 32-byte little-endian two's-complement buffer,
/// failing when it does not fit the requested signedness.
pub fn int256_to_le(value: &BigInt, signed: bool) -> Result<[u8; U256_BYTES], CodecError> {
	let ty = if signed { "i256" } else { "u256" };
	if !signed && value.sign() == Sign::Minus {
		return Err(CodecError::overflow(ty, value));
	}

	let raw = if signed {
		value.to_signed_bytes_le()
	} else {
		value.to_bytes_le().1
	};
	if raw.len() > U256_BYTES {
		return Err(CodecError::overflow(ty, value));
	}

	let fill = if value.sign() == Sign::Minus { 0xff } else { 0x00 };
	let mut out = [fill; U256_BYTES];
	out[..raw.len()].copy_from_slice(&raw);
	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn writes_little_endian() {
		let mut writer = ByteWriter::new();
		writer.write_u16(0x0102);
		writer.write_i32(-2);
		writer.write_bool(true);
		assert_eq!(writer.into_inner(), vec![0x02, 0x01, 0xfe, 0xff, 0xff, 0xff, 1]);
	}

	#[test]
	fn truncated_read_does_not_advance() {
		let data = [1u8, 2, 3, 4, 5, 6, 7];
		let mut reader = ByteReader::new(&data);
		let err = reader.read_u64().unwrap_err();
		assert_eq!(
			err,
			CodecError::TruncatedInput {
				offset: 0,
				needed: 8,
				remaining: 7
			}
		);
		assert_eq!(reader.position(), 0);
		assert_eq!(reader.read_u32(), Ok(0x0403_0201));
	}

	#[test]
	fn rejects_non_canonical_bool() {
		let mut reader = ByteReader::new(&[2]);
		assert_eq!(
			reader.read_bool(),
			Err(CodecError::InvalidBool { offset: 0, byte: 2 })
		);
	}

	#[test]
	fn length_prefix_restores_cursor_on_short_body() {
		let data = [5u8, 0, 0, 0, b'a', b'b'];
		let mut reader = ByteReader::new(&data);
		assert!(reader.read_len_prefixed().is_err());
		assert_eq!(reader.position(), 0);
	}

	#[test]
	fn int256_sign_extension() {
		let minus_one = BigInt::from(-1);
		assert_eq!(int256_to_le(&minus_one, true), Ok([0xff; 32]));
		assert!(int256_to_le(&minus_one, false).is_err());

		let too_big = BigInt::from(1) << 256;
		assert!(int256_to_le(&too_big, false).is_err());

		let max_i256 = (BigInt::from(1) << 255) - 1;
		let bytes = int256_to_le(&max_i256, true).unwrap_or_else(|e| panic!("{e}"));
		let mut reader = ByteReader::new(&bytes);
		assert_eq!(reader.read_int256(true), Ok(max_i256.clone()));
		assert!(int256_to_le(&(max_i256 + 1), true).is_err());
	}
}
