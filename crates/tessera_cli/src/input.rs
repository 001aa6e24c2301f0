//! Parsing of command-line arguments into tessera inputs.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde_json::Value as Json;
use tessera::Address;
use tessera::Schema;

use crate::error::CliError;

pub fn load_schema(path: &Path) -> Result<Schema, CliError> {
	let file = fs::File::open(path).map_err(|e| CliError::io(path, e))?;
	Ok(Schema::from_reader(file)?)
}

/// Parse inline JSON, or the contents of a file when the argument starts
/// with `@`.
pub fn json_arg(arg: &str) -> Result<Json, CliError> {
	let (input, text) = match arg.strip_prefix('@') {
		Some(path) => {
			let text = fs::read_to_string(path).map_err(|e| CliError::io(path, e))?;
			(path.to_owned(), text)
		}
		None => ("argument".to_owned(), arg.to_owned()),
	};

	serde_json::from_str(&text).map_err(|source| CliError::Json { input, source })
}

pub fn hex_arg(arg: &str) -> Result<Vec<u8>, CliError> {
	let trimmed = arg.trim();
	let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
	Ok(hex::decode(digits)?)
}

pub fn address_arg(arg: &str) -> Result<Address, CliError> {
	Address::from_str(arg).map_err(|_| {
		CliError::Address {
			value: arg.to_owned(),
		}
	})
}

/// A JSON object of account path to base58 address.
pub fn accounts_arg(arg: &str) -> Result<BTreeMap<String, Address>, CliError> {
	let Json::Object(map) = json_arg(arg)? else {
		return Err(CliError::Shape {
			expected: "a JSON object of account name to address",
		});
	};

	map.into_iter()
		.map(|(name, value)| {
			let text = value.as_str().ok_or(CliError::Shape {
				expected: "account addresses as base58 strings",
			})?;
			Ok((name, address_arg(text)?))
		})
		.collect()
}

/// A `kind:value` seed. Integers are written little-endian.
pub fn seed_arg(arg: &str) -> Result<Vec<u8>, CliError> {
	let (kind, value) = arg
		.split_once(':')
		.ok_or_else(|| CliError::seed(arg, "expected `kind:value`"))?;

	let int_err = |e: std::num::ParseIntError| CliError::seed(arg, e.to_string());
	match kind {
		"str" | "string" => Ok(value.as_bytes().to_vec()),
		"hex" => hex_arg(value),
		"pubkey" => Ok(address_arg(value)?.to_bytes().to_vec()),
		"u8" => Ok(vec![value.parse::<u8>().map_err(int_err)?]),
		"u16" => Ok(value.parse::<u16>().map_err(int_err)?.to_le_bytes().to_vec()),
		"u32" => Ok(value.parse::<u32>().map_err(int_err)?.to_le_bytes().to_vec()),
		"u64" => Ok(value.parse::<u64>().map_err(int_err)?.to_le_bytes().to_vec()),
		other => Err(CliError::seed(arg, format!("unknown seed kind `{other}`"))),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn seeds_parse_by_kind() {
		assert_eq!(seed_arg("str:vault").unwrap(), b"vault");
		assert_eq!(seed_arg("hex:0aff").unwrap(), [0x0a, 0xff]);
		assert_eq!(seed_arg("u16:258").unwrap(), [2, 1]);
		assert_eq!(seed_arg("u64:1").unwrap(), [1, 0, 0, 0, 0, 0, 0, 0]);
		assert_eq!(
			seed_arg("pubkey:11111111111111111111111111111111").unwrap(),
			[0; 32]
		);
	}

	#[test]
	fn malformed_seeds_are_rejected() {
		assert!(matches!(seed_arg("vault"), Err(CliError::Seed { .. })));
		assert!(matches!(seed_arg("u8:256"), Err(CliError::Seed { .. })));
		assert!(matches!(seed_arg("f32:1.0"), Err(CliError::Seed { .. })));
	}

	#[test]
	fn hex_accepts_an_optional_prefix() {
		assert_eq!(hex_arg("0x0102").unwrap(), [1, 2]);
		assert_eq!(hex_arg("0102\n").unwrap(), [1, 2]);
		assert!(hex_arg("012").is_err());
	}

	#[test]
	fn accounts_must_be_an_object_of_strings() {
		let map = accounts_arg(r#"{"owner": "11111111111111111111111111111111"}"#).unwrap();
		assert_eq!(map.get("owner"), Some(&Address::new_from_array([0; 32])));
		assert!(matches!(accounts_arg("[]"), Err(CliError::Shape { .. })));
		assert!(matches!(
			accounts_arg(r#"{"owner": 1}"#),
			Err(CliError::Shape { .. })
		));
	}
}
