use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use tessera::AccountDataProvider;
use tessera::AccountMeta;
use tessera::Address;
use tessera::DiscriminatorCache;
use tessera::Error;
use tessera::MemoryAccountProvider;
use tessera::Namespace;
use tessera::Program;
use tessera::ProviderError;
use tessera::ResolutionError;
use tessera::ResolverConfig;
use tessera::Schema;
use tessera::SchemaError;
use tessera::Value;
use tessera::compute_discriminator;
use tessera::find_address;
use tessera_sdk_ids::token_program;

const ESCROW_IDL: &str = include_str!("fixtures/escrow.json");

fn program() -> Program {
	Program::new(Schema::from_json(ESCROW_IDL).unwrap_or_else(|e| panic!("{e}")))
}

fn vault_data(program: &Program, authority: Address) -> Vec<u8> {
	program
		.coder()
		.encode_account(
			"Vault",
			&Value::struct_from([
				("authority", Value::from(authority)),
				("amount", Value::from(1_000u64)),
				("status", Value::unit_variant("Active")),
			]),
		)
		.unwrap_or_else(|e| panic!("{e}"))
}

/// Counts fetches and fails every one of them.
#[derive(Default)]
struct FailingProvider {
	calls: AtomicUsize,
}

impl AccountDataProvider for FailingProvider {
	async fn fetch(&self, address: &Address) -> Result<Option<Vec<u8>>, ProviderError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		Err(ProviderError::Fetch {
			address: *address,
			reason: "connection refused".to_owned(),
		})
	}
}

#[test]
fn schema_loads_the_fixture() {
	let program = program();
	let schema = program.schema();

	assert_eq!(schema.metadata.name, "escrow");
	assert_eq!(schema.instructions.len(), 3);
	assert!(schema.registry.contains("Ring<u64,2>"));
	assert_eq!(
		program.id().to_string(),
		"Fg6PaFpoGXkYsidMpWTK6W2BeZ7FEfcYkg476zPFsLnS"
	);
	assert_eq!(
		program
			.coder()
			.account_size("Config")
			.unwrap_or_else(|e| panic!("{e}")),
		Some(60)
	);
	assert_eq!(
		program
			.coder()
			.account_size("Vault")
			.unwrap_or_else(|e| panic!("{e}")),
		None
	);
}

#[test]
fn initialize_builds_a_complete_instruction() {
	let program = program();
	let payer = Address::new_from_array([3; 32]);
	let params = Value::struct_from([
		("fee_bps", Value::from(25u16)),
		("label", Value::from("main")),
	]);

	let ix = program
		.build_instruction("initialize", &[params], &BTreeMap::new(), Some(&payer))
		.unwrap_or_else(|e| panic!("{e}"));
	let (config, _) = find_address(&[b"config"], &program.id()).unwrap_or_else(|e| panic!("{e}"));

	assert_eq!(ix.program_id, program.id());
	assert_eq!(
		ix.accounts,
		vec![
			AccountMeta::new(payer, true, true),
			AccountMeta::new(config, false, true),
			AccountMeta::new(tessera_sdk_ids::system_program::ID, false, false),
		]
	);

	let mut expected = compute_discriminator(&Namespace::Global, "initialize")
		.as_bytes()
		.to_vec();
	expected.extend_from_slice(&[25, 0, 4, 0, 0, 0, b'm', b'a', b'i', b'n']);
	assert_eq!(ix.data, expected);
}

#[test]
fn instruction_data_decodes_back() {
	let program = program();
	let owner = Address::new_from_array([6; 32]);
	let args = vec![
		Value::struct_from([("amount", Value::from(10u64)), ("nonce", Value::from(0u64))]),
		Value::some(Value::from("hello")),
	];

	let ix = program
		.build_instruction("deposit", &args, &BTreeMap::new(), Some(&owner))
		.unwrap_or_else(|e| panic!("{e}"));
	let decoded = program
		.coder()
		.decode_instruction(&ix.data)
		.unwrap_or_else(|e| panic!("{e}"));

	assert_eq!(decoded.name, "deposit");
	assert_eq!(
		decoded.arg("memo"),
		Some(&Value::some(Value::String("hello".to_owned())))
	);
	assert_eq!(
		decoded
			.arg("params")
			.and_then(|params| params.field("amount"))
			.and_then(Value::as_u64),
		Some(10)
	);
}

#[test]
fn explicit_discriminators_prefix_instruction_data() {
	let program = program();
	let data = program
		.coder()
		.encode_instruction("withdraw", &[Value::from(5u64)])
		.unwrap_or_else(|e| panic!("{e}"));

	assert_eq!(
		data,
		[183, 18, 70, 156, 148, 109, 161, 34, 5, 0, 0, 0, 0, 0, 0, 0]
	);
}

#[test]
fn unknown_instruction_is_a_schema_error() {
	let program = program();
	let err = program
		.build_instruction("close", &[], &BTreeMap::new(), None)
		.unwrap_err();

	assert!(matches!(
		err,
		Error::Schema(SchemaError::UnknownAccountOrInstruction { kind: "instruction", .. })
	));
	insta::assert_snapshot!(err, @"unknown instruction `close`");
}

#[test]
fn events_decode_by_discriminator() {
	let program = program();
	let owner = Address::new_from_array([2; 32]);
	let mut bytes = compute_discriminator(&Namespace::Event, "Deposited")
		.as_bytes()
		.to_vec();
	bytes.extend_from_slice(owner.as_array());
	bytes.extend_from_slice(&42u64.to_le_bytes());

	let (def, value) = program
		.coder()
		.decode_event(&bytes)
		.unwrap_or_else(|e| panic!("{e}"));
	assert_eq!(def.name, "Deposited");
	assert_eq!(value.field("owner").and_then(Value::as_pubkey), Some(&owner));
	assert_eq!(value.field("amount").and_then(Value::as_u64), Some(42));
}

#[tokio::test]
async fn provider_supplies_field_seeds() {
	let program = program();
	let authority = Address::new_from_array([4; 32]);
	let vault = Address::new_from_array([5; 32]);
	let provider = MemoryAccountProvider::new().with_account(vault, vault_data(&program, authority));
	let partial = BTreeMap::from([("vault".to_owned(), vault)]);

	let ix = program
		.build_instruction_with_provider(
			"withdraw",
			&[Value::from(10u64)],
			&partial,
			Some(&authority),
			&provider,
		)
		.await
		.unwrap_or_else(|e| panic!("{e}"));
	let (treasury, _) = find_address(&[b"treasury", authority.as_array()], &program.id())
		.unwrap_or_else(|e| panic!("{e}"));

	assert_eq!(
		ix.accounts,
		vec![
			AccountMeta::new(authority, true, false),
			AccountMeta::new(vault, false, true),
			AccountMeta::new(treasury, false, true),
			AccountMeta::readonly(program.id()),
			AccountMeta::readonly(token_program::ID),
		]
	);
}

#[tokio::test]
async fn missing_account_data_leaves_the_seed_unresolved() {
	let program = program();
	let authority = Address::new_from_array([4; 32]);
	let partial = BTreeMap::from([("vault".to_owned(), Address::new_from_array([5; 32]))]);

	let err = program
		.build_instruction_with_provider(
			"withdraw",
			&[Value::from(10u64)],
			&partial,
			Some(&authority),
			&MemoryAccountProvider::new(),
		)
		.await
		.unwrap_err();

	assert!(matches!(
		err,
		Error::Resolution(ResolutionError::UnresolvedRequiredAccounts { ref accounts, .. })
			if accounts == &["treasury"]
	));
}

#[tokio::test]
async fn failed_fetches_are_attempted_once() {
	let program = program();
	let authority = Address::new_from_array([4; 32]);
	let partial = BTreeMap::from([("vault".to_owned(), Address::new_from_array([5; 32]))]);
	let provider = FailingProvider::default();
	let instruction = program
		.schema()
		.instruction("withdraw")
		.unwrap_or_else(|e| panic!("{e}"));

	let err = program
		.resolver()
		.resolve_with_provider(
			instruction,
			&[Value::from(10u64)],
			&partial,
			Some(&authority),
			&provider,
		)
		.await
		.unwrap_err();

	assert!(matches!(err, Error::Resolution(_)), "{err}");
	assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fetch_rounds_share_the_iteration_cap() {
	let program = program().with_config(ResolverConfig::builder().max_iterations(1).build());
	let authority = Address::new_from_array([4; 32]);
	let partial = BTreeMap::from([("vault".to_owned(), Address::new_from_array([5; 32]))]);
	let provider = FailingProvider::default();
	let instruction = program
		.schema()
		.instruction("withdraw")
		.unwrap_or_else(|e| panic!("{e}"));

	let err = program
		.resolver()
		.resolve_with_provider(
			instruction,
			&[Value::from(10u64)],
			&partial,
			Some(&authority),
			&provider,
		)
		.await
		.unwrap_err();

	assert!(matches!(
		err,
		Error::Resolution(ResolutionError::UnresolvedRequiredAccounts { ref waiting_on, .. })
			if waiting_on.get("treasury").map(String::as_str) == Some("vault.authority")
	));
	assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn programs_can_share_a_cache() {
	let cache = Arc::new(DiscriminatorCache::default());
	let first = program().with_cache(Arc::clone(&cache));
	let second = program().with_cache(Arc::clone(&cache));

	first
		.coder()
		.encode_instruction("withdraw", &[Value::from(1u64)])
		.unwrap_or_else(|e| panic!("{e}"));
	let payer = Address::new_from_array([3; 32]);
	let params = Value::struct_from([("fee_bps", Value::from(1u16)), ("label", Value::from(""))]);
	first
		.build_instruction("initialize", &[params.clone()], &BTreeMap::new(), Some(&payer))
		.unwrap_or_else(|e| panic!("{e}"));
	second
		.build_instruction("initialize", &[params], &BTreeMap::new(), Some(&payer))
		.unwrap_or_else(|e| panic!("{e}"));

	let stats = cache.stats();
	assert_eq!(stats.misses, 1);
	assert_eq!(stats.hits, 1);
}
