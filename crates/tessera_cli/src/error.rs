use std::path::PathBuf;

use tessera::CodecError;
use tessera::ResolutionError;
use tessera::SchemaError;

/// Errors surfaced by the `tessera` command line.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
	#[error("IO error at {path}: {source}")]
	Io {
		path: PathBuf,
		source: std::io::Error,
	},

	#[error("Invalid JSON in {input}: {source}")]
	Json {
		input: String,
		source: serde_json::Error,
	},

	#[error("Invalid hex data: {0}")]
	Hex(#[from] hex::FromHexError),

	#[error("Invalid address `{value}`")]
	Address { value: String },

	#[error("Invalid seed `{seed}`: {reason}")]
	Seed { seed: String, reason: String },

	#[error("Data encodes instruction `{actual}`, not `{expected}`")]
	InstructionMismatch { expected: String, actual: String },

	#[error("Expected {expected}")]
	Shape { expected: &'static str },

	#[error(transparent)]
	Tessera(#[from] tessera::Error),
}

impl CliError {
	pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
		Self::Io {
			path: path.into(),
			source,
		}
	}

	pub fn seed(seed: &str, reason: impl Into<String>) -> Self {
		Self::Seed {
			seed: seed.to_owned(),
			reason: reason.into(),
		}
	}
}

impl From<CodecError> for CliError {
	fn from(err: CodecError) -> Self {
		Self::Tessera(err.into())
	}
}

impl From<SchemaError> for CliError {
	fn from(err: SchemaError) -> Self {
		Self::Tessera(err.into())
	}
}

impl From<ResolutionError> for CliError {
	fn from(err: ResolutionError) -> Self {
		Self::Tessera(err.into())
	}
}
