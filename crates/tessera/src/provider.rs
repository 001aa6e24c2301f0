//! The account-data provider seam.
//!
//! Address resolution only needs fetched account data for seeds that read a
//! field of another account (`pool.authority`). The provider is the single
//! asynchronous boundary: fetches are awaited between derivation rounds and a
//! failed or missing fetch simply leaves the dependent seed unresolved.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::RwLock;
use std::sync::PoisonError;

use log::debug;
use solana_address::Address;

use crate::Error;
use crate::ProviderError;
use crate::Value;
use crate::resolver::AccountData;
use crate::resolver::AccountResolver;
use crate::resolver::ResolvedAccounts;
use crate::schema::InstructionDef;

/// Source of raw account bytes.
pub trait AccountDataProvider: Sync {
	/// Fetch one account; `Ok(None)` when it does not exist.
	fn fetch(
		&self,
		address: &Address,
	) -> impl Future<Output = Result<Option<Vec<u8>>, ProviderError>> + Send;

	/// Fetch several accounts, preserving order. The default implementation
	/// awaits [`fetch`](Self::fetch) for each address in turn.
	fn fetch_many(
		&self,
		addresses: &[Address],
	) -> impl Future<Output = Vec<Result<Option<Vec<u8>>, ProviderError>>> + Send {
		async move {
			let mut results = Vec::with_capacity(addresses.len());
			for address in addresses {
				results.push(self.fetch(address).await);
			}
			results
		}
	}
}

/// An in-memory provider, mainly for tests and offline tooling.
#[derive(Debug, Default)]
pub struct MemoryAccountProvider {
	accounts: RwLock<BTreeMap<Address, Vec<u8>>>,
}

impl MemoryAccountProvider {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_account(self, address: Address, data: Vec<u8>) -> Self {
		self.insert(address, data);
		self
	}

	pub fn insert(&self, address: Address, data: Vec<u8>) {
		self.accounts
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.insert(address, data);
	}

	pub fn remove(&self, address: &Address) -> Option<Vec<u8>> {
		self.accounts
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.remove(address)
	}

	pub fn len(&self) -> usize {
		self.accounts
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl AccountDataProvider for MemoryAccountProvider {
	async fn fetch(&self, address: &Address) -> Result<Option<Vec<u8>>, ProviderError> {
		Ok(self
			.accounts
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.get(address)
			.cloned())
	}
}

impl AccountResolver<'_> {
	/// Like [`resolve`](Self::resolve), but loads account data through
	/// `provider` for seeds that read fields of other accounts.
	///
	/// Whenever a derivation fixpoint still has such seeds pending, the
	/// referenced accounts are fetched, decoded with their record type and
	/// derivation resumes. Each account is fetched at most once, and
	/// derivation rounds on either side of a fetch share one
	/// [`max_iterations`](crate::ResolverConfig::max_iterations) budget.
	pub async fn resolve_with_provider<P: AccountDataProvider>(
		&self,
		instruction: &InstructionDef,
		args: &[Value],
		partial: &BTreeMap<String, Address>,
		signer: Option<&Address>,
		provider: &P,
	) -> Result<ResolvedAccounts, Error> {
		let mut context = self.start(instruction, args, partial, signer);
		let mut attempted = BTreeSet::new();

		loop {
			self.derive_to_fixpoint(&mut context)?;

			let pending: Vec<_> = self
				.pending_account_data(&context)
				.into_iter()
				.filter(|(key, ..)| !attempted.contains(key))
				.collect();
			if pending.is_empty() {
				break;
			}
			if context.rounds_left() == 0 {
				debug!("round cap reached with {} account fetch(es) pending", pending.len());
				break;
			}

			let addresses: Vec<Address> = pending.iter().map(|(_, address, _)| *address).collect();
			debug!("fetching {} account(s) for field seeds", addresses.len());
			let results = provider.fetch_many(&addresses).await;

			for ((key, address, record), result) in pending.into_iter().zip(results) {
				attempted.insert(key.clone());
				let bytes = match result {
					Ok(Some(bytes)) => bytes,
					Ok(None) => {
						debug!("account `{key}` ({address}) does not exist");
						continue;
					}
					Err(err) => {
						debug!("{err}");
						continue;
					}
				};
				match self.decode_account_data(record.as_deref(), &bytes) {
					Ok(data) => context.insert_account_data(key, data),
					Err(err) => debug!("account `{key}` ({address}) could not be decoded: {err}"),
				}
			}
		}

		Ok(self.finish(context)?)
	}

	fn decode_account_data(&self, record: Option<&str>, bytes: &[u8]) -> Result<AccountData, Error> {
		let coder = self.coder();
		match record {
			Some(name) => {
				let value = coder.decode_account(name, bytes)?;
				let ty = coder.schema().account(name)?.ty.clone();
				Ok(AccountData {
					record: name.to_owned(),
					ty,
					value,
				})
			}
			None => {
				let (def, value) = coder.decode_any_account(bytes)?;
				Ok(AccountData {
					record: def.name.clone(),
					ty: def.ty.clone(),
					value,
				})
			}
		}
	}
}
