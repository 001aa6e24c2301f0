use tessera::Address;
use tessera::MAX_SEED_LEN;
use tessera::MAX_SEEDS;
use tessera::ResolutionError;
use tessera::create_address;
use tessera::find_address;
use tessera_sdk_ids::system_program;

const SYSTEM_ID: Address = system_program::ID;

#[test]
fn find_address_returns_ok_for_valid_seeds() {
	let result = find_address(&[b"test-seed"], &SYSTEM_ID);
	assert!(result.is_ok(), "expected to derive a PDA");
}

#[test]
fn find_address_deterministic() {
	let (addr1, bump1) = find_address(&[b"hello"], &SYSTEM_ID).unwrap_or_else(|e| panic!("{e}"));
	let (addr2, bump2) = find_address(&[b"hello"], &SYSTEM_ID).unwrap_or_else(|e| panic!("{e}"));

	assert_eq!(addr1, addr2, "PDA derivation should be deterministic");
	assert_eq!(bump1, bump2, "bump should be deterministic");
}

#[test]
fn find_address_different_seeds_produce_different_addresses() {
	let (addr1, _) = find_address(&[b"seed-a"], &SYSTEM_ID).unwrap_or_else(|e| panic!("{e}"));
	let (addr2, _) = find_address(&[b"seed-b"], &SYSTEM_ID).unwrap_or_else(|e| panic!("{e}"));

	assert_ne!(
		addr1, addr2,
		"different seeds should produce different PDAs"
	);
}

#[test]
fn find_address_different_programs_produce_different_addresses() {
	let other = Address::new_from_array([42; 32]);
	let (addr1, _) = find_address(&[b"same"], &SYSTEM_ID).unwrap_or_else(|e| panic!("{e}"));
	let (addr2, _) = find_address(&[b"same"], &other).unwrap_or_else(|e| panic!("{e}"));

	assert_ne!(addr1, addr2);
}

#[test]
fn create_address_roundtrip() {
	let (pda, bump) = find_address(&[b"roundtrip"], &SYSTEM_ID).unwrap_or_else(|e| panic!("{e}"));

	let bump_seed = [bump];
	let recreated = create_address(&[b"roundtrip", &bump_seed], &SYSTEM_ID)
		.unwrap_or_else(|e| panic!("failed to recreate PDA: {e}"));

	assert_eq!(pda, recreated, "roundtrip PDA should match");
}

#[test]
fn create_address_wrong_bump_differs_or_fails() {
	let (pda, bump) = find_address(&[b"bump-test"], &SYSTEM_ID).unwrap_or_else(|e| panic!("{e}"));

	let wrong_bump_seed = [bump.wrapping_add(1)];
	match create_address(&[b"bump-test", &wrong_bump_seed], &SYSTEM_ID) {
		Ok(addr) => assert_ne!(addr, pda, "wrong bump should produce a different address"),
		Err(err) => assert_eq!(err, ResolutionError::AddressOnCurve),
	}
}

#[test]
fn find_address_empty_seeds() {
	let result = find_address(&[], &SYSTEM_ID);
	assert!(result.is_ok(), "empty seeds should still derive a PDA");
}

#[test]
fn find_address_accepts_max_length_seed() {
	let seed = [7u8; MAX_SEED_LEN];
	let result = find_address(&[&seed], &SYSTEM_ID);
	assert!(result.is_ok());
}

#[test]
fn find_address_rejects_long_seed() {
	let seed = [7u8; MAX_SEED_LEN + 1];
	let err = find_address(&[b"ok", &seed], &SYSTEM_ID).unwrap_err();

	assert_eq!(
		err,
		ResolutionError::SeedTooLong {
			index: 1,
			len: MAX_SEED_LEN + 1,
			max: MAX_SEED_LEN,
		}
	);
}

#[test]
fn find_address_leaves_room_for_the_nonce() {
	let seeds: Vec<&[u8]> = vec![b"s".as_slice(); MAX_SEEDS - 1];
	assert!(find_address(&seeds, &SYSTEM_ID).is_ok());

	let seeds: Vec<&[u8]> = vec![b"s".as_slice(); MAX_SEEDS];
	let err = find_address(&seeds, &SYSTEM_ID).unwrap_err();
	assert_eq!(
		err,
		ResolutionError::TooManySeeds {
			count: MAX_SEEDS,
			max: MAX_SEEDS - 1,
		}
	);
}

#[test]
fn create_address_rejects_too_many_seeds() {
	let seeds: Vec<&[u8]> = vec![b"s".as_slice(); MAX_SEEDS + 1];
	let err = create_address(&seeds, &SYSTEM_ID).unwrap_err();
	assert!(matches!(err, ResolutionError::TooManySeeds { .. }));
}

#[test]
fn derived_addresses_are_off_curve() {
	let seeds: [&[u8]; 5] = [b"a", b"b", b"c", b"vault", b"config"];
	for seed in seeds {
		let (pda, _) = find_address(&[seed], &SYSTEM_ID).unwrap_or_else(|e| panic!("{e}"));
		assert!(!solana_address::bytes_are_curve_point(pda.to_bytes()));
	}
}
