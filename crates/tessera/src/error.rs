use std::collections::BTreeMap;

use solana_address::Address;

use crate::discriminator::Discriminator;

/// Errors produced while encoding or decoding schema-typed values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum CodecError {
	#[error(
		"unexpected end of input at offset {offset}: needed {needed} byte(s), {remaining} remaining"
	)]
	TruncatedInput {
		offset: usize,
		needed: usize,
		remaining: usize,
	},

	#[error("value {value} does not fit in `{ty}`")]
	NumericOverflow { ty: String, value: String },

	#[error("enum `{enum_name}` has no variant `{variant}`")]
	UnknownVariant { enum_name: String, variant: String },

	#[error("type `{name}` is not defined in the schema")]
	UnknownType { name: String },

	#[error("missing field `{field}` in `{ty}`")]
	MissingField { ty: String, field: String },

	#[error(
		"discriminator mismatch for {context}: expected {expected}, found {actual} (first \
		 difference at byte {first_difference})"
	)]
	DiscriminatorMismatch {
		context: String,
		expected: Discriminator,
		actual: Discriminator,
		first_difference: usize,
	},

	#[error("expected {expected} for `{ty}`, found {found}")]
	TypeMismatch {
		ty: String,
		expected: &'static str,
		found: &'static str,
	},

	#[error("`{ty}` requires exactly {expected} element(s), found {actual}")]
	LengthMismatch {
		ty: String,
		expected: usize,
		actual: usize,
	},

	#[error("`{ty}` cannot hold {len} zero-sized element(s)")]
	ZeroSizedElements { ty: String, len: usize },

	#[error("invalid boolean byte {byte:#04x} at offset {offset}")]
	InvalidBool { offset: usize, byte: u8 },

	#[error("invalid utf-8 string at offset {offset}")]
	InvalidUtf8 { offset: usize },

	#[error("generic parameter `{name}` must be monomorphized before encoding")]
	UnresolvedGeneric { name: String },

	#[error("no {kind} matches discriminator {discriminator}")]
	NoMatchingRecord {
		kind: &'static str,
		discriminator: String,
	},

	#[error("invalid json for `{ty}`: {reason}")]
	InvalidJson { ty: String, reason: String },

	#[error("type nesting exceeds {limit} levels")]
	RecursionLimit { limit: usize },
}

impl CodecError {
	pub(crate) fn overflow(ty: impl Into<String>, value: impl ToString) -> Self {
		Self::NumericOverflow {
			ty: ty.into(),
			value: value.to_string(),
		}
	}

	pub(crate) fn missing_field(ty: impl Into<String>, field: impl Into<String>) -> Self {
		Self::MissingField {
			ty: ty.into(),
			field: field.into(),
		}
	}
}

/// Errors produced while deriving addresses or resolving instruction accounts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ResolutionError {
	#[error("seed `{path}` of account `{account}` could not be resolved")]
	UnresolvedSeed { account: String, path: String },

	#[error("unresolved required accounts: {}", describe_missing(accounts, waiting_on))]
	UnresolvedRequiredAccounts {
		accounts: Vec<String>,
		/// The seed or relation path each derived account last waited on.
		waiting_on: BTreeMap<String, String>,
	},

	#[error("seed {index} is {len} bytes long, the maximum is {max}")]
	SeedTooLong { index: usize, len: usize, max: usize },

	#[error("{count} seeds supplied, the maximum is {max}")]
	TooManySeeds { count: usize, max: usize },

	#[error("no nonce produced an off-curve address for program {program_id}")]
	NonceSpaceExhausted { program_id: Address },

	#[error("derived address lies on the ed25519 curve")]
	AddressOnCurve,

	#[error("program id seed of account `{account}` evaluated to {len} bytes, expected 32")]
	InvalidProgramIdSeed { account: String, len: usize },

	#[error("failed to encode seed `{path}` of account `{account}`: {source}")]
	SeedEncoding {
		account: String,
		path: String,
		source: CodecError,
	},
}

fn describe_missing(accounts: &[String], waiting_on: &BTreeMap<String, String>) -> String {
	accounts
		.iter()
		.map(|account| {
			match waiting_on.get(account) {
				Some(path) => format!("{account} (waiting on `{path}`)"),
				None => account.clone(),
			}
		})
		.collect::<Vec<_>>()
		.join(", ")
}

/// Errors produced while loading or querying a program schema.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SchemaError {
	#[error("unknown {kind} `{name}`")]
	UnknownAccountOrInstruction { kind: &'static str, name: String },

	#[error("malformed type definition `{name}`: {reason}")]
	MalformedTypeDef { name: String, reason: String },

	#[error("invalid address `{value}`")]
	InvalidAddress { value: String },

	#[error("failed to parse IDL json: {0}")]
	Json(#[from] serde_json::Error),

	#[error("failed to read IDL: {0}")]
	Io(#[from] std::io::Error),
}

impl SchemaError {
	pub(crate) fn malformed(name: impl Into<String>, reason: impl Into<String>) -> Self {
		Self::MalformedTypeDef {
			name: name.into(),
			reason: reason.into(),
		}
	}

	pub(crate) fn unknown(kind: &'static str, name: impl Into<String>) -> Self {
		Self::UnknownAccountOrInstruction {
			kind,
			name: name.into(),
		}
	}
}

/// Errors reported by an [`AccountDataProvider`](crate::AccountDataProvider).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ProviderError {
	#[error("failed to fetch account {address}: {reason}")]
	Fetch { address: Address, reason: String },
}

/// Any error surfaced by the tessera client runtime.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	#[error(transparent)]
	Codec(#[from] CodecError),

	#[error(transparent)]
	Resolution(#[from] ResolutionError),

	#[error(transparent)]
	Schema(#[from] SchemaError),

	#[error(transparent)]
	Provider(#[from] ProviderError),
}
