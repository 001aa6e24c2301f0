pub mod error;
pub mod input;

use std::collections::BTreeMap;

use log::debug;
use serde_json::Value as Json;
use serde_json::json;
use tessera::Address;
use tessera::Namespace;
use tessera::Program;
use tessera::RecordCoder;
use tessera::ResolverConfig;
use tessera::Schema;
use tessera::SchemaType;
use tessera::compute_discriminator;
use tessera::find_address;

use crate::error::CliError;

/// What an `encode` or `decode` command operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
	/// Instruction data. Decoding identifies the instruction itself.
	Instruction(Option<String>),
	Account(String),
	/// Event data, identified by discriminator.
	Event,
	Type(String),
}

pub fn discriminator(namespace: &str, name: &str) -> String {
	compute_discriminator(&Namespace::from(namespace), name).to_hex()
}

/// Derive a program address from already-parsed seeds.
pub fn pda(program_id: &Address, seeds: &[Vec<u8>]) -> Result<Json, CliError> {
	let seeds: Vec<&[u8]> = seeds.iter().map(Vec::as_slice).collect();
	let (address, bump) = find_address(&seeds, program_id)?;
	Ok(json!({ "address": address.to_string(), "bump": bump }))
}

/// Encode the JSON form of `target` as hex.
pub fn encode(schema: Schema, target: &Target, value: &Json) -> Result<String, CliError> {
	let coder = RecordCoder::new(schema);
	let bytes = match target {
		Target::Instruction(Some(name)) => {
			let args = coder.instruction_args_from_json(name, value)?;
			coder.encode_instruction(name, &args)?
		}
		Target::Account(name) => {
			let account = coder.schema().account(name)?;
			let value = coder.codec().value_from_json(&account.ty, value)?;
			coder.encode_account(name, &value)?
		}
		Target::Type(name) => {
			let ty = SchemaType::defined(name.as_str());
			let codec = coder.codec();
			codec.encode(&ty, &codec.value_from_json(&ty, value)?)?
		}
		Target::Instruction(None) | Target::Event => {
			return Err(CliError::Shape {
				expected: "an instruction, account or type name to encode",
			});
		}
	};

	debug!("encoded {} byte(s)", bytes.len());
	Ok(hex::encode(bytes))
}

/// Decode `bytes` as `target` into its JSON form.
pub fn decode(schema: Schema, target: &Target, bytes: &[u8]) -> Result<Json, CliError> {
	let coder = RecordCoder::new(schema);
	let codec = coder.codec();

	match target {
		Target::Instruction(expected) => {
			let decoded = coder.decode_instruction(bytes)?;
			if let Some(expected) = expected.as_deref().filter(|e| *e != decoded.name) {
				return Err(CliError::InstructionMismatch {
					expected: expected.to_owned(),
					actual: decoded.name,
				});
			}
			let instruction = coder.schema().instruction(&decoded.name)?;
			let mut args = serde_json::Map::new();
			for ((name, value), field) in decoded.args.iter().zip(&instruction.args) {
				args.insert(name.clone(), codec.value_to_json(&field.ty, value)?);
			}
			Ok(json!({ "name": decoded.name, "args": args }))
		}
		Target::Account(name) => {
			let account = coder.schema().account(name)?;
			let value = coder.decode_account(name, bytes)?;
			Ok(codec.value_to_json(&account.ty, &value)?)
		}
		Target::Event => {
			let (event, value) = coder.decode_event(bytes)?;
			Ok(json!({ "name": event.name, "data": codec.value_to_json(&event.ty, &value)? }))
		}
		Target::Type(name) => {
			let ty = SchemaType::defined(name.as_str());
			let (value, consumed) = codec.decode(&ty, bytes)?;
			if consumed < bytes.len() {
				debug!("{} trailing byte(s) ignored", bytes.len() - consumed);
			}
			Ok(codec.value_to_json(&ty, &value)?)
		}
	}
}

/// Inputs to account resolution.
#[derive(Debug, Default)]
pub struct AccountsRequest {
	pub args: Json,
	pub accounts: BTreeMap<String, Address>,
	pub signer: Option<Address>,
	pub config: ResolverConfig,
}

/// Resolve the accounts of `instruction` into JSON account metas in
/// declaration order.
pub fn accounts(schema: Schema, instruction: &str, request: AccountsRequest) -> Result<Json, CliError> {
	let program = Program::new(schema).with_config(request.config);
	let args = program
		.coder()
		.instruction_args_from_json(instruction, &request.args)?;
	let def = program.schema().instruction(instruction)?;
	let resolver = program.resolver();
	let resolved = resolver.resolve(def, &args, &request.accounts, request.signer.as_ref())?;
	let metas = resolver.account_metas(def, &resolved)?;

	let entries = def
		.flat_accounts()
		.into_iter()
		.zip(metas)
		.map(|(entry, meta)| {
			let mut object = json!({
				"name": entry.path,
				"address": meta.address.to_string(),
				"signer": meta.is_signer,
				"writable": meta.is_writable,
			});
			if let Some(bump) = resolved.bump(&entry.path) {
				object["bump"] = json!(bump);
			}
			object
		})
		.collect();

	Ok(Json::Array(entries))
}

/// Summarise a schema: its records with their discriminators and the
/// registered type names.
pub fn inspect(schema: Schema) -> Json {
	let coder = RecordCoder::new(schema);
	let schema = coder.schema();

	let instructions: Vec<Json> = schema
		.instructions
		.iter()
		.map(|ix| {
			json!({
				"name": ix.name,
				"discriminator": coder.instruction_discriminator(ix).to_hex(),
				"accounts": ix.flat_accounts().into_iter().map(|a| a.path).collect::<Vec<_>>(),
				"args": ix.args.iter().map(|f| format!("{}: {}", f.name, f.ty)).collect::<Vec<_>>(),
			})
		})
		.collect();
	let accounts: Vec<Json> = schema
		.accounts
		.iter()
		.map(|account| {
			json!({
				"name": account.name,
				"discriminator": coder.account_discriminator(account).to_hex(),
				"size": coder.account_size(&account.name).ok().flatten(),
			})
		})
		.collect();
	let events: Vec<Json> = schema
		.events
		.iter()
		.map(|event| {
			json!({
				"name": event.name,
				"discriminator": coder.event_discriminator(event).to_hex(),
			})
		})
		.collect();

	json!({
		"name": schema.metadata.name,
		"version": schema.metadata.version,
		"address": schema.address.to_string(),
		"instructions": instructions,
		"accounts": accounts,
		"events": events,
		"types": schema.registry.iter().map(|def| def.name.as_str()).collect::<Vec<_>>(),
	})
}
