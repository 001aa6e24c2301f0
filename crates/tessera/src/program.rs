//! A client facade tying schema, codec and account resolution together.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;
use solana_address::Address;

use crate::AccountDataProvider;
use crate::AccountResolver;
use crate::DiscriminatorCache;
use crate::Error;
use crate::RecordCoder;
use crate::ResolvedAccounts;
use crate::ResolverConfig;
use crate::Value;
use crate::schema::Schema;

/// An account reference with its signer and writable flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountMeta {
	pub address: Address,
	pub is_signer: bool,
	pub is_writable: bool,
}

impl AccountMeta {
	pub fn new(address: Address, is_signer: bool, is_writable: bool) -> Self {
		Self {
			address,
			is_signer,
			is_writable,
		}
	}

	pub fn readonly(address: Address) -> Self {
		Self::new(address, false, false)
	}
}

/// A fully assembled instruction, ready for a transaction builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
	pub program_id: Address,
	pub accounts: Vec<AccountMeta>,
	pub data: Vec<u8>,
}

/// A program client built from a loaded [`Schema`].
///
/// ```
/// use std::collections::BTreeMap;
///
/// use tessera::Program;
/// use tessera::Schema;
///
/// let idl = r#"{
///   "address": "11111111111111111111111111111111",
///   "metadata": { "name": "noop", "version": "0.1.0" },
///   "instructions": [{ "name": "ping", "accounts": [], "args": [] }]
/// }"#;
/// let program = Program::new(Schema::from_json(idl).unwrap());
/// let ix = program.build_instruction("ping", &[], &BTreeMap::new(), None).unwrap();
/// assert_eq!(ix.data.len(), 8);
/// ```
#[derive(Debug)]
pub struct Program {
	coder: RecordCoder,
	config: ResolverConfig,
}

impl Program {
	pub fn new(schema: Schema) -> Self {
		Self {
			coder: RecordCoder::new(schema),
			config: ResolverConfig::default(),
		}
	}

	/// Share a discriminator cache with other program clients.
	pub fn with_cache(mut self, cache: Arc<DiscriminatorCache>) -> Self {
		self.coder = self.coder.with_cache(cache);
		self
	}

	pub fn with_config(mut self, config: ResolverConfig) -> Self {
		self.config = config;
		self
	}

	pub fn id(&self) -> Address {
		self.coder.schema().address
	}

	pub fn schema(&self) -> &Schema {
		self.coder.schema()
	}

	pub fn coder(&self) -> &RecordCoder {
		&self.coder
	}

	pub fn config(&self) -> &ResolverConfig {
		&self.config
	}

	pub fn resolver(&self) -> AccountResolver<'_> {
		AccountResolver::new(&self.coder, &self.config)
	}

	/// Resolve the accounts of instruction `name` without encoding it.
	pub fn resolve_accounts(
		&self,
		name: &str,
		args: &[Value],
		partial: &BTreeMap<String, Address>,
		signer: Option<&Address>,
	) -> Result<ResolvedAccounts, Error> {
		let instruction = self.schema().instruction(name)?;
		Ok(self.resolver().resolve(instruction, args, partial, signer)?)
	}

	/// Resolve accounts, encode `args` and assemble the instruction.
	pub fn build_instruction(
		&self,
		name: &str,
		args: &[Value],
		partial: &BTreeMap<String, Address>,
		signer: Option<&Address>,
	) -> Result<Instruction, Error> {
		let resolved = self.resolve_accounts(name, args, partial, signer)?;
		self.assemble(name, args, &resolved)
	}

	/// Like [`build_instruction`](Self::build_instruction), loading account
	/// data through `provider` for seeds that read fields of other accounts.
	pub async fn build_instruction_with_provider<P: AccountDataProvider>(
		&self,
		name: &str,
		args: &[Value],
		partial: &BTreeMap<String, Address>,
		signer: Option<&Address>,
		provider: &P,
	) -> Result<Instruction, Error> {
		let instruction = self.schema().instruction(name)?;
		let resolved = self
			.resolver()
			.resolve_with_provider(instruction, args, partial, signer, provider)
			.await?;
		self.assemble(name, args, &resolved)
	}

	fn assemble(
		&self,
		name: &str,
		args: &[Value],
		resolved: &ResolvedAccounts,
	) -> Result<Instruction, Error> {
		let instruction = self.schema().instruction(name)?;
		let accounts = self.resolver().account_metas(instruction, resolved)?;
		let data = self.coder.encode_instruction(name, args)?;
		debug!(
			"built `{name}`: {} account(s), {} data byte(s)",
			accounts.len(),
			data.len()
		);

		Ok(Instruction {
			program_id: self.id(),
			accounts,
			data,
		})
	}
}
