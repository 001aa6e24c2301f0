use std::sync::Arc;
use std::thread;

use tessera::CacheConfig;
use tessera::CacheStats;
use tessera::CodecError;
use tessera::Discriminator;
use tessera::DiscriminatorCache;
use tessera::DiscriminatorValidator;
use tessera::Namespace;
use tessera::compute_discriminator;

#[test]
fn global_initialize_matches_known_value() {
	let discriminator = compute_discriminator(&Namespace::Global, "initialize");
	assert_eq!(
		discriminator,
		Discriminator::new([175, 175, 109, 31, 13, 152, 155, 237])
	);
	insta::assert_snapshot!(discriminator, @"afaf6d1f0d989bed");
}

#[test]
fn names_are_hashed_verbatim() {
	insta::assert_snapshot!(
		compute_discriminator(&Namespace::Global, "InitializeCounter"),
		@"e62e1cfcf861021f"
	);
	assert_ne!(
		compute_discriminator(&Namespace::Global, "createPool"),
		compute_discriminator(&Namespace::Global, "create_pool")
	);
}

#[test]
fn namespaces_separate_identical_names() {
	let account = compute_discriminator(&Namespace::Account, "Counter");
	let event = compute_discriminator(&Namespace::Event, "Counter");
	let custom = compute_discriminator(&Namespace::Custom("state".to_owned()), "Counter");

	assert_ne!(account, event);
	assert_ne!(account, custom);
	assert_ne!(event, custom);
	assert_eq!(Namespace::from("account"), Namespace::Account);
}

#[test]
fn cache_is_transparent() {
	let cache = DiscriminatorCache::default();
	let first = cache.get_or_compute(&Namespace::Account, "Vault");
	let second = cache.get_or_compute(&Namespace::Account, "Vault");

	assert_eq!(first, second);
	assert_eq!(first, compute_discriminator(&Namespace::Account, "Vault"));
	assert_eq!(
		cache.stats(),
		CacheStats {
			hits: 1,
			misses: 1,
			len: 1,
			capacity: 1000,
		}
	);
}

#[test]
fn cache_evicts_least_recently_used() {
	let cache = DiscriminatorCache::new(CacheConfig::builder().capacity(2).build());
	cache.get_or_compute(&Namespace::Account, "A");
	cache.get_or_compute(&Namespace::Account, "B");
	cache.get_or_compute(&Namespace::Account, "A");
	cache.get_or_compute(&Namespace::Account, "C");
	// `B` was evicted, `A` survived.
	cache.get_or_compute(&Namespace::Account, "A");
	cache.get_or_compute(&Namespace::Account, "B");

	let stats = cache.stats();
	assert_eq!(stats.len, 2);
	assert_eq!(stats.hits, 2);
	assert_eq!(stats.misses, 4);
}

#[test]
fn disabled_cache_always_recomputes() {
	let cache = DiscriminatorCache::disabled();
	assert!(!cache.is_enabled());

	let value = cache.get_or_compute(&Namespace::Event, "Deposited");
	assert_eq!(value, compute_discriminator(&Namespace::Event, "Deposited"));
	cache.get_or_compute(&Namespace::Event, "Deposited");

	let stats = cache.stats();
	assert_eq!((stats.hits, stats.misses, stats.len), (0, 2, 0));
}

#[test]
fn clear_keeps_counters() {
	let cache = DiscriminatorCache::default();
	cache.get_or_compute(&Namespace::Global, "swap");
	cache.clear();

	let stats = cache.stats();
	assert_eq!((stats.misses, stats.len), (1, 0));
}

#[test]
fn cache_is_shared_across_threads() {
	let cache = Arc::new(DiscriminatorCache::default());
	let handles: Vec<_> = (0..4)
		.map(|_| {
			let cache = Arc::clone(&cache);
			thread::spawn(move || cache.get_or_compute(&Namespace::Global, "deposit"))
		})
		.collect();

	let expected = compute_discriminator(&Namespace::Global, "deposit");
	for handle in handles {
		let value = handle
			.join()
			.unwrap_or_else(|_| panic!("thread panicked"));
		assert_eq!(value, expected);
	}
	assert_eq!(cache.stats().hits + cache.stats().misses, 4);
	assert_eq!(cache.stats().len, 1);
}

#[test]
fn strict_validator_reports_first_difference() {
	let validator = DiscriminatorValidator::strict();
	let expected = Discriminator::new([1, 2, 3, 4, 5, 6, 7, 8]);
	let actual = Discriminator::new([1, 2, 3, 9, 5, 6, 7, 8]);

	let err = validator
		.compare_in(&expected, &actual, "account `Vault`")
		.unwrap_err();
	assert_eq!(
		err,
		CodecError::DiscriminatorMismatch {
			context: "account `Vault`".to_owned(),
			expected,
			actual,
			first_difference: 3,
		}
	);
	// The memoised outcome is identical.
	assert_eq!(
		validator.compare_in(&expected, &actual, "account `Vault`"),
		Err(err)
	);
	assert_eq!(validator.compare(&expected, &expected), Ok(()));
}

#[test]
fn bypass_validator_accepts_anything() {
	let validator = DiscriminatorValidator::bypass();
	assert!(validator.is_bypass());
	assert_eq!(
		validator.compare(&Discriminator::new([0; 8]), &Discriminator::new([1; 8])),
		Ok(())
	);
}

#[test]
fn discriminators_parse_from_exact_slices() {
	assert!(Discriminator::try_from([1u8; 8].as_slice()).is_ok());
	assert!(Discriminator::try_from([1u8; 7].as_slice()).is_err());
	assert_eq!(format!("{:x}", Discriminator::new([0xab; 8])), "abababababababab");
}
