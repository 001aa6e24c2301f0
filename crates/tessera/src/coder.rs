//! Discriminator-tagged record coding for the instructions, accounts and
//! events of one program.

use std::sync::Arc;

use heck::ToSnakeCase;
use log::debug;
use log::trace;
use serde_json::Value as Json;

use crate::ByteReader;
use crate::ByteWriter;
use crate::Codec;
use crate::CodecError;
use crate::DISCRIMINATOR_LEN;
use crate::Discriminator;
use crate::DiscriminatorCache;
use crate::DiscriminatorValidator;
use crate::Error;
use crate::Namespace;
use crate::Value;
use crate::schema::InstructionDef;
use crate::schema::RecordDef;
use crate::schema::Schema;
use crate::schema::SchemaType;
use crate::schema::StructFields;

/// A decoded instruction: its name and its arguments in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedInstruction {
	pub name: String,
	pub args: Vec<(String, Value)>,
}

impl DecodedInstruction {
	pub fn arg(&self, name: &str) -> Option<&Value> {
		self.args.iter().find(|(n, _)| n == name).map(|(_, v)| v)
	}
}

/// Encodes and decodes the records declared by a [`Schema`].
///
/// Discriminators stored in the schema always win; the rest are computed on
/// demand through a [`DiscriminatorCache`], which may be shared between
/// coders.
#[derive(Debug)]
pub struct RecordCoder {
	schema: Schema,
	cache: Arc<DiscriminatorCache>,
	validator: DiscriminatorValidator,
}

impl RecordCoder {
	pub fn new(schema: Schema) -> Self {
		Self {
			schema,
			cache: Arc::new(DiscriminatorCache::default()),
			validator: DiscriminatorValidator::strict(),
		}
	}

	pub fn with_cache(mut self, cache: Arc<DiscriminatorCache>) -> Self {
		self.cache = cache;
		self
	}

	pub fn with_validator(mut self, validator: DiscriminatorValidator) -> Self {
		self.validator = validator;
		self
	}

	pub fn schema(&self) -> &Schema {
		&self.schema
	}

	pub fn codec(&self) -> Codec<'_> {
		Codec::new(&self.schema.registry)
	}

	pub fn cache(&self) -> &DiscriminatorCache {
		&self.cache
	}

	/// The discriminator for `name` in `namespace`: `explicit` when the
	/// schema carries one, otherwise computed through the cache.
	pub fn discriminator(
		&self,
		namespace: &Namespace,
		name: &str,
		explicit: Option<Discriminator>,
	) -> Discriminator {
		explicit.unwrap_or_else(|| self.cache.get_or_compute(namespace, name))
	}

	/// Instruction names are hashed in snake_case regardless of how the IDL
	/// spells them.
	pub fn instruction_discriminator(&self, instruction: &InstructionDef) -> Discriminator {
		self.discriminator(
			&Namespace::Global,
			&instruction.name.to_snake_case(),
			instruction.discriminator,
		)
	}

	pub fn account_discriminator(&self, account: &RecordDef) -> Discriminator {
		self.discriminator(&Namespace::Account, &account.name, account.discriminator)
	}

	pub fn event_discriminator(&self, event: &RecordDef) -> Discriminator {
		self.discriminator(&Namespace::Event, &event.name, event.discriminator)
	}

	/// Encode `value` as `ty`, prefixed with the discriminator of `name`.
	pub fn encode_record(
		&self,
		namespace: &Namespace,
		name: &str,
		ty: &SchemaType,
		value: &Value,
	) -> Result<Vec<u8>, CodecError> {
		let discriminator = self.discriminator(namespace, name, None);
		self.encode_tagged(&discriminator, ty, value)
	}

	/// Verify the discriminator of `name`, then decode the payload as `ty`.
	pub fn decode_record(
		&self,
		namespace: &Namespace,
		name: &str,
		ty: &SchemaType,
		bytes: &[u8],
	) -> Result<Value, CodecError> {
		let discriminator = self.discriminator(namespace, name, None);
		self.decode_tagged(&discriminator, &format!("{namespace}:{name}"), ty, bytes)
	}

	/// Try to decode `bytes` as a record tagged with `expected`.
	///
	/// Returns `Ok(None)` without decoding anything when the tag does not
	/// match, so callers can scan candidates in order.
	pub fn probe(
		&self,
		expected: &Discriminator,
		ty: &SchemaType,
		bytes: &[u8],
	) -> Result<Option<(Value, usize)>, CodecError> {
		if !expected.matches(bytes) {
			return Ok(None);
		}

		let (value, consumed) = self.codec().decode(ty, &bytes[DISCRIMINATOR_LEN..])?;
		Ok(Some((value, DISCRIMINATOR_LEN + consumed)))
	}

	/// Instruction data: discriminator followed by `args` in declaration
	/// order.
	pub fn encode_instruction(&self, name: &str, args: &[Value]) -> Result<Vec<u8>, Error> {
		let instruction = self.schema.instruction(name)?;
		if args.len() != instruction.args.len() {
			return Err(CodecError::LengthMismatch {
				ty: format!("instruction `{name}` arguments"),
				expected: instruction.args.len(),
				actual: args.len(),
			}
			.into());
		}

		let codec = self.codec();
		let mut writer = ByteWriter::new();
		writer.write_bytes(self.instruction_discriminator(instruction).as_ref());
		for (field, value) in instruction.args.iter().zip(args) {
			codec.encode_into(&field.ty, value, &mut writer)?;
		}

		Ok(writer.into_inner())
	}

	/// Identify and decode instruction data by scanning the declared
	/// instructions for a matching discriminator.
	pub fn decode_instruction(&self, bytes: &[u8]) -> Result<DecodedInstruction, CodecError> {
		let codec = self.codec();
		for instruction in &self.schema.instructions {
			if !self.instruction_discriminator(instruction).matches(bytes) {
				continue;
			}

			let mut reader = ByteReader::new(&bytes[DISCRIMINATOR_LEN..]);
			let mut args = Vec::with_capacity(instruction.args.len());
			for field in &instruction.args {
				args.push((field.name.clone(), codec.decode_from(&field.ty, &mut reader)?));
			}
			return Ok(DecodedInstruction {
				name: instruction.name.clone(),
				args,
			});
		}

		Err(no_match("instruction", bytes))
	}

	/// Build positional argument values from a JSON object keyed by argument
	/// name.
	pub fn instruction_args_from_json(&self, name: &str, json: &Json) -> Result<Vec<Value>, Error> {
		let instruction = self.schema.instruction(name)?;
		let fields = StructFields::Named(instruction.args.clone());
		let empty = Json::Object(serde_json::Map::new());
		let json = if json.is_null() { &empty } else { json };
		let Value::Struct(mut map) = self.codec().fields_from_json(name, &fields, json)? else {
			return Ok(Vec::new());
		};

		Ok(instruction
			.args
			.iter()
			.filter_map(|field| map.remove(&field.name))
			.collect())
	}

	pub fn encode_account(&self, name: &str, value: &Value) -> Result<Vec<u8>, Error> {
		let account = self.schema.account(name)?;
		Ok(self.encode_tagged(&self.account_discriminator(account), &account.ty, value)?)
	}

	/// Decode account data that must belong to account type `name`.
	pub fn decode_account(&self, name: &str, bytes: &[u8]) -> Result<Value, Error> {
		let account = self.schema.account(name)?;
		Ok(self.decode_tagged(
			&self.account_discriminator(account),
			&format!("account `{name}`"),
			&account.ty,
			bytes,
		)?)
	}

	/// Decode account data of any declared account type.
	pub fn decode_any_account(&self, bytes: &[u8]) -> Result<(&RecordDef, Value), CodecError> {
		self.scan("account", &self.schema.accounts, bytes, |record| {
			self.account_discriminator(record)
		})
	}

	/// Decode event data of any declared event type.
	pub fn decode_event(&self, bytes: &[u8]) -> Result<(&RecordDef, Value), CodecError> {
		self.scan("event", &self.schema.events, bytes, |record| {
			self.event_discriminator(record)
		})
	}

	/// Encoded size of account `name` including its discriminator, when its
	/// type has no variable-length members.
	pub fn account_size(&self, name: &str) -> Result<Option<usize>, Error> {
		let account = self.schema.account(name)?;
		Ok(self
			.schema
			.registry
			.fixed_size(&account.ty)
			.map(|size| DISCRIMINATOR_LEN + size))
	}

	fn scan<'s>(
		&'s self,
		kind: &'static str,
		records: &'s [RecordDef],
		bytes: &[u8],
		discriminator: impl Fn(&RecordDef) -> Discriminator,
	) -> Result<(&'s RecordDef, Value), CodecError> {
		for record in records {
			match self.probe(&discriminator(record), &record.ty, bytes)? {
				Some((value, _)) => return Ok((record, value)),
				None => trace!("{kind} `{}` does not match", record.name),
			}
		}

		Err(no_match(kind, bytes))
	}

	fn encode_tagged(
		&self,
		discriminator: &Discriminator,
		ty: &SchemaType,
		value: &Value,
	) -> Result<Vec<u8>, CodecError> {
		let mut writer = ByteWriter::new();
		writer.write_bytes(discriminator.as_ref());
		self.codec().encode_into(ty, value, &mut writer)?;
		Ok(writer.into_inner())
	}

	fn decode_tagged(
		&self,
		expected: &Discriminator,
		context: &str,
		ty: &SchemaType,
		bytes: &[u8],
	) -> Result<Value, CodecError> {
		let mut reader = ByteReader::new(bytes);
		let actual = Discriminator::new(reader.read_array()?);
		self.validator.compare_in(expected, &actual, context)?;
		let value = self.codec().decode_from(ty, &mut reader)?;
		if !reader.is_exhausted() {
			debug!("{context}: {} trailing byte(s) ignored", reader.remaining());
		}

		Ok(value)
	}
}

fn no_match(kind: &'static str, bytes: &[u8]) -> CodecError {
	let prefix = &bytes[..bytes.len().min(DISCRIMINATOR_LEN)];
	CodecError::NoMatchingRecord {
		kind,
		discriminator: hex::encode(prefix),
	}
}

#[cfg(test)]
mod tests {
	use solana_address::Address;

	use super::*;
	use crate::compute_discriminator;
	use crate::schema::Field;
	use crate::schema::SchemaRegistry;
	use crate::schema::TypeDef;

	fn coder() -> RecordCoder {
		let registry = SchemaRegistry::new()
			.with_type(TypeDef::named_struct(
				"Counter",
				vec![
					Field::new("count", SchemaType::U64),
					Field::new("bump", SchemaType::U8),
				],
			))
			.with_type(TypeDef::named_struct(
				"Config",
				vec![Field::new("admin", SchemaType::Pubkey)],
			));
		let schema = Schema::new(Address::new_from_array([7; 32]), registry)
			.with_account(RecordDef {
				name: "Counter".to_owned(),
				docs: Vec::new(),
				discriminator: None,
				ty: SchemaType::defined("Counter"),
			})
			.with_account(RecordDef {
				name: "Config".to_owned(),
				docs: Vec::new(),
				discriminator: Some(Discriminator::new([1, 0, 0, 0, 0, 0, 0, 0])),
				ty: SchemaType::defined("Config"),
			});
		RecordCoder::new(schema)
	}

	#[test]
	fn explicit_discriminator_wins() {
		let coder = coder();
		let config = coder.schema().account("Config").unwrap_or_else(|e| panic!("{e}"));
		assert_eq!(
			coder.account_discriminator(config),
			Discriminator::new([1, 0, 0, 0, 0, 0, 0, 0])
		);
		let counter = coder.schema().account("Counter").unwrap_or_else(|e| panic!("{e}"));
		assert_eq!(
			coder.account_discriminator(counter),
			compute_discriminator(&Namespace::Account, "Counter")
		);
	}

	#[test]
	fn instruction_names_hash_in_snake_case() {
		let coder = coder();
		let instruction = InstructionDef::new("createPool", Vec::new(), Vec::new());
		assert_eq!(
			coder.instruction_discriminator(&instruction),
			compute_discriminator(&Namespace::Global, "create_pool")
		);
		assert_ne!(
			coder.instruction_discriminator(&instruction),
			compute_discriminator(&Namespace::Global, "createPool")
		);
	}

	#[test]
	fn scan_skips_non_matching_candidates() {
		let coder = coder();
		let admin = Address::new_from_array([3; 32]);
		let bytes = coder
			.encode_account("Config", &Value::struct_from([("admin", Value::from(admin))]))
			.unwrap_or_else(|e| panic!("{e}"));

		let (record, value) = coder.decode_any_account(&bytes).unwrap_or_else(|e| panic!("{e}"));
		assert_eq!(record.name, "Config");
		assert_eq!(value.field("admin").and_then(Value::as_pubkey), Some(&admin));

		let err = coder.decode_any_account(&[9; 12]).unwrap_err();
		assert_eq!(
			err,
			CodecError::NoMatchingRecord {
				kind: "account",
				discriminator: "0909090909090909".to_owned(),
			}
		);
	}

	#[test]
	fn wrong_account_type_is_a_mismatch() {
		let coder = coder();
		let bytes = coder
			.encode_account(
				"Counter",
				&Value::struct_from([("count", Value::from(1u64)), ("bump", Value::from(2u8))]),
			)
			.unwrap_or_else(|e| panic!("{e}"));

		let err = coder.decode_account("Config", &bytes).unwrap_err();
		assert!(matches!(
			err,
			Error::Codec(CodecError::DiscriminatorMismatch { .. })
		));
	}

	#[test]
	fn account_size_includes_discriminator() {
		let coder = coder();
		assert_eq!(coder.account_size("Counter").ok().flatten(), Some(17));
		assert_eq!(coder.account_size("Config").ok().flatten(), Some(40));
	}
}
