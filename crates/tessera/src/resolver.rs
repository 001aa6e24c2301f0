//! Fixpoint resolution of an instruction's accounts.
//!
//! Resolution starts from whatever the caller already knows and fills in
//! the rest:
//!
//! 1. a single constant pass assigns schema-fixed addresses, the signer to
//!    required signer slots and, optionally, well-known program and sysvar
//!    addresses recognised by name;
//! 2. a derivation pass repeats until it stops making progress (or the
//!    iteration cap is hit), deriving every PDA whose seeds are all available
//!    and copying related account addresses;
//! 3. every required account still missing is reported at once.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use log::debug;
use log::trace;
use solana_address::Address;
use typed_builder::TypedBuilder;

use crate::RecordCoder;
use crate::ResolutionError;
use crate::Value;
use crate::find_address;
use crate::program::AccountMeta;
use crate::schema::FlatAccount;
use crate::schema::InstructionDef;
use crate::schema::SchemaRegistry;
use crate::schema::SchemaType;

/// Default bound on derivation rounds.
pub const DEFAULT_MAX_ITERATIONS: usize = 16;

/// Knobs for [`AccountResolver`].
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct ResolverConfig {
	/// Upper bound on derivation rounds.
	#[builder(default = DEFAULT_MAX_ITERATIONS)]
	pub max_iterations: usize,
	/// Fill accounts such as `system_program` or `rent` from their names.
	#[builder(default = true)]
	pub infer_conventional_accounts: bool,
}

impl Default for ResolverConfig {
	fn default() -> Self {
		Self::builder().build()
	}
}

/// Decoded data of a resolved account, loaded for field-path seeds.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountData {
	/// Name of the account record type the data decoded as.
	pub record: String,
	pub ty: SchemaType,
	pub value: Value,
}

/// Mutable state of one resolution call.
#[derive(Debug)]
pub struct ResolutionContext<'a> {
	registry: &'a SchemaRegistry,
	instruction: &'a InstructionDef,
	args: &'a [Value],
	resolved: BTreeMap<String, Address>,
	bumps: BTreeMap<String, u8>,
	account_data: BTreeMap<String, AccountData>,
	waiting_on: BTreeMap<String, String>,
	max_iterations: usize,
	rounds: usize,
}

impl<'a> ResolutionContext<'a> {
	pub fn new(
		registry: &'a SchemaRegistry,
		instruction: &'a InstructionDef,
		args: &'a [Value],
		max_iterations: usize,
	) -> Self {
		Self {
			registry,
			instruction,
			args,
			resolved: BTreeMap::new(),
			bumps: BTreeMap::new(),
			account_data: BTreeMap::new(),
			waiting_on: BTreeMap::new(),
			max_iterations,
			rounds: 0,
		}
	}

	pub fn registry(&self) -> &'a SchemaRegistry {
		self.registry
	}

	pub fn instruction(&self) -> &'a InstructionDef {
		self.instruction
	}

	pub fn args(&self) -> &'a [Value] {
		self.args
	}

	pub fn max_iterations(&self) -> usize {
		self.max_iterations
	}

	/// Derivation rounds still available to this resolution call. The cap
	/// covers every round, including those run after account data fetches.
	pub fn rounds_left(&self) -> usize {
		self.max_iterations.saturating_sub(self.rounds)
	}

	pub fn resolved(&self) -> &BTreeMap<String, Address> {
		&self.resolved
	}

	pub fn is_resolved(&self, path: &str) -> bool {
		self.resolved.contains_key(path)
	}

	/// Record `address` under the full dotted `path`. An existing entry is
	/// kept, so caller input is never overwritten.
	pub fn insert(&mut self, path: impl Into<String>, address: Address) -> bool {
		let path = path.into();
		if self.resolved.contains_key(&path) {
			return false;
		}
		self.resolved.insert(path, address);
		true
	}

	/// Look `name` up relative to `scope`: the innermost enclosing group
	/// first, then each parent, then the top level.
	pub fn lookup(&self, name: &str, scope: &str) -> Option<&Address> {
		self.lookup_key(name, scope)
			.and_then(|key| self.resolved.get(&key))
	}

	/// The full key under which `name` is resolved from `scope`.
	pub fn lookup_key(&self, name: &str, scope: &str) -> Option<String> {
		let mut scope = scope;
		loop {
			let key = if scope.is_empty() {
				name.to_owned()
			} else {
				format!("{scope}.{name}")
			};
			if self.resolved.contains_key(&key) {
				return Some(key);
			}
			if scope.is_empty() {
				return None;
			}
			scope = scope.rsplit_once('.').map_or("", |(parent, _)| parent);
		}
	}

	/// Split an account-field path (`pool.authority`) into the key of the
	/// longest resolved account prefix and the remaining field path.
	pub fn split_account_field<'p>(&self, path: &'p str, scope: &str) -> Option<(String, &'p str)> {
		path.rmatch_indices('.').find_map(|(index, _)| {
			let key = self.lookup_key(&path[..index], scope)?;
			Some((key, &path[index + 1..]))
		})
	}

	pub fn account_data(&self, key: &str) -> Option<&AccountData> {
		self.account_data.get(key)
	}

	pub fn insert_account_data(&mut self, key: impl Into<String>, data: AccountData) {
		self.account_data.insert(key.into(), data);
	}

	fn into_resolved(self) -> ResolvedAccounts {
		ResolvedAccounts {
			addresses: self.resolved,
			bumps: self.bumps,
		}
	}
}

/// The outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedAccounts {
	addresses: BTreeMap<String, Address>,
	bumps: BTreeMap<String, u8>,
}

impl ResolvedAccounts {
	pub fn get(&self, path: &str) -> Option<&Address> {
		self.addresses.get(path)
	}

	/// The nonce found for PDA account `path`.
	pub fn bump(&self, path: &str) -> Option<u8> {
		self.bumps.get(path).copied()
	}

	pub fn bumps(&self) -> &BTreeMap<String, u8> {
		&self.bumps
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &Address)> {
		self.addresses.iter().map(|(k, v)| (k.as_str(), v))
	}

	pub fn len(&self) -> usize {
		self.addresses.len()
	}

	pub fn is_empty(&self) -> bool {
		self.addresses.is_empty()
	}
}

/// Resolves instruction accounts against the schema held by a
/// [`RecordCoder`].
#[derive(Debug, Clone, Copy)]
pub struct AccountResolver<'a> {
	coder: &'a RecordCoder,
	config: &'a ResolverConfig,
}

impl<'a> AccountResolver<'a> {
	pub fn new(coder: &'a RecordCoder, config: &'a ResolverConfig) -> Self {
		Self { coder, config }
	}

	pub fn coder(&self) -> &'a RecordCoder {
		self.coder
	}

	/// Resolve every account of `instruction`.
	///
	/// `partial` holds caller-supplied addresses keyed by dotted account
	/// path; they are never overwritten. `signer` fills required signer
	/// slots the caller left open.
	pub fn resolve(
		&self,
		instruction: &InstructionDef,
		args: &[Value],
		partial: &BTreeMap<String, Address>,
		signer: Option<&Address>,
	) -> Result<ResolvedAccounts, ResolutionError> {
		let mut context = self.start(instruction, args, partial, signer);
		self.derive_to_fixpoint(&mut context)?;
		self.finish(context)
	}

	/// Seed a context with caller input and run the constant pass.
	pub(crate) fn start<'c>(
		&self,
		instruction: &'c InstructionDef,
		args: &'c [Value],
		partial: &BTreeMap<String, Address>,
		signer: Option<&Address>,
	) -> ResolutionContext<'c>
	where
		'a: 'c,
	{
		let mut context = ResolutionContext::new(
			&self.coder.schema().registry,
			instruction,
			args,
			self.config.max_iterations,
		);

		let flat = instruction.flat_accounts();
		let declared: BTreeSet<&str> = flat.iter().map(|f| f.path.as_str()).collect();
		for (path, address) in partial {
			if declared.contains(path.as_str()) {
				context.insert(path.clone(), *address);
			} else {
				debug!(
					"ignoring account `{path}`, not declared by instruction `{}`",
					instruction.name
				);
			}
		}

		self.constant_pass(&mut context, &flat, signer);
		context
	}

	fn constant_pass(
		&self,
		context: &mut ResolutionContext<'_>,
		flat: &[FlatAccount<'_>],
		signer: Option<&Address>,
	) {
		for entry in flat {
			if context.is_resolved(&entry.path) {
				continue;
			}

			let account = entry.account;
			let address = if let Some(address) = account.address {
				Some(address)
			} else if account.signer && !account.optional && signer.is_some() {
				signer.copied()
			} else if self.config.infer_conventional_accounts && account.pda.is_none() {
				tessera_sdk_ids::conventional_account(&account.name)
			} else {
				None
			};

			if let Some(address) = address {
				trace!("constant pass: `{}` = {address}", entry.path);
				context.insert(entry.path.clone(), address);
			}
		}
	}

	/// Run derivation rounds until one makes no progress or the cap is hit.
	pub(crate) fn derive_to_fixpoint(
		&self,
		context: &mut ResolutionContext<'_>,
	) -> Result<(), ResolutionError> {
		let instruction = context.instruction();
		let flat = instruction.flat_accounts();

		while context.rounds_left() > 0 {
			context.rounds += 1;
			let round = context.rounds;
			let mut progress = false;
			for entry in &flat {
				if context.is_resolved(&entry.path) {
					continue;
				}
				match self.derive_account(context, entry) {
					Ok(Some((address, bump))) => {
						debug!("round {round}: derived `{}` = {address}", entry.path);
						context.insert(entry.path.clone(), address);
						if let Some(bump) = bump {
							context.bumps.insert(entry.path.clone(), bump);
						}
						context.waiting_on.remove(&entry.path);
						progress = true;
					}
					Ok(None) => {}
					Err(ResolutionError::UnresolvedSeed { account, path }) => {
						trace!("round {round}: seed `{path}` of `{account}` not available yet");
						context.waiting_on.insert(account, path);
					}
					Err(err) => return Err(err),
				}
			}

			if !progress {
				debug!("resolution reached a fixpoint after {round} round(s)");
				return Ok(());
			}
		}

		debug!(
			"resolution stopped at the {} round cap",
			context.max_iterations()
		);
		Ok(())
	}

	/// Derive one account from its PDA spec or relations.
	///
	/// Returns `Ok(None)` when the account has neither, and
	/// [`ResolutionError::UnresolvedSeed`] when a seed or relation it depends
	/// on is not available in `context` yet.
	///
	/// A program-id override only swaps the deriving program. IDL seeds never
	/// carry the bump, so the nonce is still searched with
	/// [`find_address`] rather than supplied to `create_address`.
	pub fn derive_account(
		&self,
		context: &ResolutionContext<'_>,
		entry: &FlatAccount<'_>,
	) -> Result<Option<(Address, Option<u8>)>, ResolutionError> {
		let account = entry.account;
		let unresolved = |path: &str| {
			ResolutionError::UnresolvedSeed {
				account: entry.path.clone(),
				path: path.to_owned(),
			}
		};

		if let Some(pda) = &account.pda {
			let mut seeds = Vec::with_capacity(pda.seeds.len());
			for seed in pda.byte_seeds() {
				let bytes = seed
					.evaluate(context, &entry.scope, &entry.path)?
					.ok_or_else(|| unresolved(seed.path().unwrap_or_default()))?;
				seeds.push(bytes);
			}

			let program_id = match pda.program_override() {
				Some(seed) => {
					seed.evaluate_program_id(context, &entry.scope, &entry.path)?
						.ok_or_else(|| unresolved(seed.path().unwrap_or_default()))?
				}
				None => self.coder.schema().address,
			};

			let seeds: Vec<&[u8]> = seeds.iter().map(Vec::as_slice).collect();
			let (address, bump) = find_address(&seeds, &program_id)?;
			return Ok(Some((address, Some(bump))));
		}

		for relation in &account.relations {
			if let Some(address) = context.lookup(relation, &entry.scope) {
				return Ok(Some((*address, None)));
			}
		}
		match account.relations.first() {
			Some(relation) => Err(unresolved(relation)),
			None => Ok(None),
		}
	}

	/// Fail with every required account that is still missing.
	pub(crate) fn finish(
		&self,
		context: ResolutionContext<'_>,
	) -> Result<ResolvedAccounts, ResolutionError> {
		let missing: Vec<String> = context
			.instruction()
			.flat_accounts()
			.into_iter()
			.filter(|entry| !entry.account.optional && !context.is_resolved(&entry.path))
			.map(|entry| entry.path)
			.collect();

		if missing.is_empty() {
			return Ok(context.into_resolved());
		}

		let waiting_on = context
			.waiting_on
			.into_iter()
			.filter(|(account, _)| missing.contains(account))
			.collect();
		Err(ResolutionError::UnresolvedRequiredAccounts {
			accounts: missing,
			waiting_on,
		})
	}

	/// Account metas in declaration order, groups flattened.
	///
	/// Unresolved optional accounts are emitted as the program address with
	/// both flags cleared. Unresolved required accounts are an error even
	/// here, for callers that assembled `resolved` themselves.
	pub fn account_metas(
		&self,
		instruction: &InstructionDef,
		resolved: &ResolvedAccounts,
	) -> Result<Vec<AccountMeta>, ResolutionError> {
		let program_id = self.coder.schema().address;
		let mut metas = Vec::new();
		let mut missing = Vec::new();

		for entry in instruction.flat_accounts() {
			match resolved.get(&entry.path) {
				Some(address) => {
					metas.push(AccountMeta {
						address: *address,
						is_signer: entry.account.signer,
						is_writable: entry.account.writable,
					});
				}
				None if entry.account.optional => metas.push(AccountMeta::readonly(program_id)),
				None => missing.push(entry.path),
			}
		}

		if missing.is_empty() {
			Ok(metas)
		} else {
			Err(ResolutionError::UnresolvedRequiredAccounts {
				accounts: missing,
				waiting_on: BTreeMap::new(),
			})
		}
	}

	/// Field-path seeds waiting for account data, as `(key, address, record
	/// type)` triples.
	pub(crate) fn pending_account_data(
		&self,
		context: &ResolutionContext<'_>,
	) -> Vec<(String, Address, Option<String>)> {
		let mut pending = BTreeMap::new();
		for entry in context.instruction().flat_accounts() {
			if context.is_resolved(&entry.path) {
				continue;
			}
			let Some(pda) = &entry.account.pda else {
				continue;
			};
			for seed in &pda.seeds {
				if let Some((key, record)) = seed.pending_account_data(context, &entry.scope) {
					if let Some(address) = context.resolved().get(&key) {
						pending.entry(key).or_insert((*address, record));
					}
				}
			}
		}

		pending
			.into_iter()
			.map(|(key, (address, record))| (key, address, record))
			.collect()
	}
}
