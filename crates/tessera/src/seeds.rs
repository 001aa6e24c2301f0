//! Declarative PDA seeds and their evaluation against a resolution context.

use solana_address::Address;

use crate::Codec;
use crate::CodecError;
use crate::ResolutionError;
use crate::Value;
use crate::resolver::ResolutionContext;
use crate::schema::SchemaRegistry;
use crate::schema::SchemaType;
use crate::schema::StructFields;
use crate::schema::TypeDefBody;

/// How to produce the bytes of one PDA seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdaSeed {
	/// Literal bytes embedded in the schema.
	Const(Vec<u8>),
	/// A dotted path into the instruction arguments (`params.owner`).
	ArgPath { path: String },
	/// A dotted path naming a resolved account (`owner`) or a field of that
	/// account's data (`pool.authority`). `account` names the record type
	/// used to decode the data when it has to be fetched.
	AccountPath {
		path: String,
		account: Option<String>,
	},
	/// Derive under the program id produced by the nested seed instead of the
	/// instruction's own program. Contributes no seed bytes itself.
	ProgramIdOverride(Box<PdaSeed>),
}

impl PdaSeed {
	pub fn constant(bytes: impl Into<Vec<u8>>) -> Self {
		Self::Const(bytes.into())
	}

	pub fn arg(path: impl Into<String>) -> Self {
		Self::ArgPath { path: path.into() }
	}

	pub fn account(path: impl Into<String>) -> Self {
		Self::AccountPath {
			path: path.into(),
			account: None,
		}
	}

	pub fn program_id(seed: PdaSeed) -> Self {
		Self::ProgramIdOverride(Box::new(seed))
	}

	/// The dotted path this seed reads, if any.
	pub fn path(&self) -> Option<&str> {
		match self {
			Self::Const(_) => None,
			Self::ArgPath { path } | Self::AccountPath { path, .. } => Some(path),
			Self::ProgramIdOverride(inner) => inner.path(),
		}
	}

	/// Evaluate the seed for account `account` declared in group `scope`.
	///
	/// Returns `Ok(None)` while something the seed depends on is unresolved.
	/// Errors are reserved for seeds that resolved but whose value cannot be
	/// turned into bytes.
	pub fn evaluate(
		&self,
		context: &ResolutionContext<'_>,
		scope: &str,
		account: &str,
	) -> Result<Option<Vec<u8>>, ResolutionError> {
		match self {
			Self::Const(bytes) => Ok(Some(bytes.clone())),
			Self::ArgPath { path } => {
				let Some((ty, value)) = arg_value(context, path) else {
					return Ok(None);
				};
				seed_bytes(context.registry(), &ty, value)
					.map(Some)
					.map_err(|source| encoding_error(account, path, source))
			}
			Self::AccountPath { path, .. } => {
				if let Some(address) = context.lookup(path, scope) {
					return Ok(Some(address.as_array().to_vec()));
				}
				let Some((key, field_path)) = context.split_account_field(path, scope) else {
					return Ok(None);
				};
				let Some(data) = context.account_data(&key) else {
					return Ok(None);
				};
				let Some((ty, value)) =
					descend_path(context.registry(), &data.ty, &data.value, field_path)
				else {
					return Ok(None);
				};
				seed_bytes(context.registry(), &ty, value)
					.map(Some)
					.map_err(|source| encoding_error(account, path, source))
			}
			Self::ProgramIdOverride(inner) => inner.evaluate(context, scope, account),
		}
	}

	/// Evaluate a program-id override, which must produce exactly 32 bytes.
	pub fn evaluate_program_id(
		&self,
		context: &ResolutionContext<'_>,
		scope: &str,
		account: &str,
	) -> Result<Option<Address>, ResolutionError> {
		let Some(bytes) = self.evaluate(context, scope, account)? else {
			return Ok(None);
		};
		let array: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
			ResolutionError::InvalidProgramIdSeed {
				account: account.to_owned(),
				len: bytes.len(),
			}
		})?;

		Ok(Some(Address::new_from_array(array)))
	}

	/// For an account-field seed whose account is resolved but whose data
	/// is not loaded yet: the context key of that account and the record type
	/// to decode it with.
	pub fn pending_account_data(
		&self,
		context: &ResolutionContext<'_>,
		scope: &str,
	) -> Option<(String, Option<String>)> {
		match self {
			Self::AccountPath { path, account } => {
				if context.lookup(path, scope).is_some() {
					return None;
				}
				let (key, _) = context.split_account_field(path, scope)?;
				if context.account_data(&key).is_some() {
					return None;
				}
				Some((key, account.clone()))
			}
			Self::ProgramIdOverride(inner) => inner.pending_account_data(context, scope),
			Self::Const(_) | Self::ArgPath { .. } => None,
		}
	}
}

fn encoding_error(account: &str, path: &str, source: CodecError) -> ResolutionError {
	ResolutionError::SeedEncoding {
		account: account.to_owned(),
		path: path.to_owned(),
		source,
	}
}

/// Navigate an argument path: the first segment names the argument, the
/// rest walk into its structured value.
fn arg_value<'c>(context: &'c ResolutionContext<'_>, path: &str) -> Option<(SchemaType, &'c Value)> {
	let (name, rest) = match path.split_once('.') {
		Some((name, rest)) => (name, Some(rest)),
		None => (path, None),
	};
	let (index, field) = context.instruction().arg(name)?;
	let value = context.args().get(index)?;

	match rest {
		None => Some((field.ty.clone(), value)),
		Some(rest) => descend_path(context.registry(), &field.ty, value, rest),
	}
}

/// Walk `path` through `value`, tracking the schema type alongside.
pub(crate) fn descend_path<'v>(
	registry: &SchemaRegistry,
	ty: &SchemaType,
	value: &'v Value,
	path: &str,
) -> Option<(SchemaType, &'v Value)> {
	path.split('.')
		.try_fold((ty.clone(), value), |(ty, value), segment| {
			descend(registry, &ty, value, segment)
		})
}

fn descend<'v>(
	registry: &SchemaRegistry,
	ty: &SchemaType,
	value: &'v Value,
	segment: &str,
) -> Option<(SchemaType, &'v Value)> {
	let ty = resolve_alias(registry, ty)?;
	match (&ty, value) {
		(SchemaType::Option(inner), Value::Option(Some(inner_value))) => {
			descend(registry, inner, inner_value, segment)
		}
		(SchemaType::Vec(inner) | SchemaType::Array(inner, _), Value::List(items)) => {
			let item = items.get(segment.parse::<usize>().ok()?)?;
			Some(((**inner).clone(), item))
		}
		(SchemaType::Defined(name), _) => {
			match &registry.get(name)?.body {
				TypeDefBody::Struct(StructFields::Named(fields)) => {
					let field = fields.iter().find(|f| f.name == segment)?;
					Some((field.ty.clone(), value.field(segment)?))
				}
				TypeDefBody::Struct(StructFields::Tuple(types)) => {
					let index = segment.parse::<usize>().ok()?;
					let Value::Tuple(items) = value else {
						return None;
					};
					Some((types.get(index)?.clone(), items.get(index)?))
				}
				_ => None,
			}
		}
		_ => None,
	}
}

fn resolve_alias(registry: &SchemaRegistry, ty: &SchemaType) -> Option<SchemaType> {
	let mut current = ty.clone();
	for _ in 0..crate::codec::MAX_DEPTH {
		let SchemaType::Defined(name) = &current else {
			return Some(current);
		};
		match &registry.get(name)?.body {
			TypeDefBody::Alias(target) => current = target.clone(),
			_ => return Some(current),
		}
	}
	None
}

/// Seed bytes for a value: strings and byte blobs contribute their raw
/// contents, everything else its fixed little-endian encoding.
fn seed_bytes(registry: &SchemaRegistry, ty: &SchemaType, value: &Value) -> Result<Vec<u8>, CodecError> {
	let ty = resolve_alias(registry, ty).unwrap_or_else(|| ty.clone());
	let mut bytes = Codec::new(registry).encode(&ty, value)?;
	let prefixed = match &ty {
		SchemaType::String | SchemaType::Bytes => true,
		SchemaType::Vec(inner) => **inner == SchemaType::U8,
		_ => false,
	};
	if prefixed {
		bytes.drain(..4);
	}

	Ok(bytes)
}
