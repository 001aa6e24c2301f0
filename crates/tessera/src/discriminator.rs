//! 8-byte record discriminators.
//!
//! A discriminator is the first eight bytes of
//! `sha256("<namespace>:<name>")`. Accounts hash under `account`, instructions
//! under `global` and events under `event`; callers may supply any other
//! namespace.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use lru::LruCache;
use sha2::Digest;
use sha2::Sha256;
use typed_builder::TypedBuilder;

use crate::CodecError;

/// Number of bytes in every discriminator.
pub const DISCRIMINATOR_LEN: usize = 8;

/// Default number of entries kept by [`DiscriminatorCache`].
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// An 8-byte record type tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Discriminator(pub [u8; DISCRIMINATOR_LEN]);

impl Discriminator {
	pub const fn new(bytes: [u8; DISCRIMINATOR_LEN]) -> Self {
		Self(bytes)
	}

	pub const fn as_bytes(&self) -> &[u8; DISCRIMINATOR_LEN] {
		&self.0
	}

	/// Whether `data` starts with this discriminator.
	pub fn matches(&self, data: &[u8]) -> bool {
		data.get(..DISCRIMINATOR_LEN) == Some(self.0.as_slice())
	}

	/// Lower-case hex rendering.
	pub fn to_hex(&self) -> String {
		hex::encode(self.0)
	}
}

impl From<[u8; DISCRIMINATOR_LEN]> for Discriminator {
	fn from(bytes: [u8; DISCRIMINATOR_LEN]) -> Self {
		Self(bytes)
	}
}

impl TryFrom<&[u8]> for Discriminator {
	type Error = CodecError;

	fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
		<[u8; DISCRIMINATOR_LEN]>::try_from(bytes)
			.map(Self)
			.map_err(|_| {
				CodecError::LengthMismatch {
					ty: "discriminator".to_owned(),
					expected: DISCRIMINATOR_LEN,
					actual: bytes.len(),
				}
			})
	}
}

impl AsRef<[u8]> for Discriminator {
	fn as_ref(&self) -> &[u8] {
		&self.0
	}
}

impl fmt::Display for Discriminator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_hex())
	}
}

impl fmt::LowerHex for Discriminator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_hex())
	}
}

impl fmt::Debug for Discriminator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Discriminator({})", self.to_hex())
	}
}

/// The hashing namespace a discriminator is computed under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Namespace {
	/// Account records (`account:<Name>`).
	Account,
	/// Instructions (`global:<name>`).
	Global,
	/// Events (`event:<Name>`).
	Event,
	/// Any other caller-chosen namespace.
	Custom(String),
}

impl Namespace {
	pub fn as_str(&self) -> &str {
		match self {
			Self::Account => "account",
			Self::Global => "global",
			Self::Event => "event",
			Self::Custom(namespace) => namespace,
		}
	}
}

impl From<&str> for Namespace {
	fn from(value: &str) -> Self {
		match value {
			"account" => Self::Account,
			"global" => Self::Global,
			"event" => Self::Event,
			other => Self::Custom(other.to_owned()),
		}
	}
}

impl fmt::Display for Namespace {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// `sha256("<namespace>:<name>")[..8]`. The name is hashed exactly as given.
///
/// ```
/// use tessera::Namespace;
/// use tessera::compute_discriminator;
///
/// let account = compute_discriminator(&Namespace::Account, "Counter");
/// let global = compute_discriminator(&Namespace::Global, "Counter");
/// assert_ne!(account, global);
/// ```
pub fn compute_discriminator(namespace: &Namespace, name: &str) -> Discriminator {
	let mut hasher = Sha256::new();
	hasher.update(namespace.as_str().as_bytes());
	hasher.update(b":");
	hasher.update(name.as_bytes());
	let hash = hasher.finalize();

	let mut bytes = [0u8; DISCRIMINATOR_LEN];
	bytes.copy_from_slice(&hash[..DISCRIMINATOR_LEN]);
	Discriminator(bytes)
}

/// Settings for a [`DiscriminatorCache`].
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct CacheConfig {
	#[builder(default = DEFAULT_CACHE_CAPACITY)]
	pub capacity: usize,
	#[builder(default = true)]
	pub enabled: bool,
}

impl Default for CacheConfig {
	fn default() -> Self {
		Self::builder().build()
	}
}

/// Hit and miss counters of a [`DiscriminatorCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
	pub hits: u64,
	pub misses: u64,
	pub len: usize,
	pub capacity: usize,
}

/// A bounded LRU of computed discriminators keyed by `namespace:name`.
///
/// Entries are immutable once inserted, only the recency order changes, so a
/// single mutex around the LRU bookkeeping is enough for concurrent callers.
#[derive(Debug)]
pub struct DiscriminatorCache {
	entries: Option<Mutex<LruCache<String, Discriminator>>>,
	capacity: usize,
	hits: AtomicU64,
	misses: AtomicU64,
}

impl DiscriminatorCache {
	pub fn new(config: CacheConfig) -> Self {
		let entries = NonZeroUsize::new(config.capacity)
			.filter(|_| config.enabled)
			.map(|capacity| Mutex::new(LruCache::new(capacity)));

		Self {
			capacity: if entries.is_some() { config.capacity } else { 0 },
			entries,
			hits: AtomicU64::new(0),
			misses: AtomicU64::new(0),
		}
	}

	/// A cache that stores nothing and always recomputes.
	pub fn disabled() -> Self {
		Self::new(CacheConfig::builder().enabled(false).build())
	}

	pub fn is_enabled(&self) -> bool {
		self.entries.is_some()
	}

	/// Return the cached discriminator for `namespace:name`, computing and
	/// storing it on a miss.
	pub fn get_or_compute(&self, namespace: &Namespace, name: &str) -> Discriminator {
		let Some(entries) = &self.entries else {
			self.misses.fetch_add(1, Ordering::Relaxed);
			return compute_discriminator(namespace, name);
		};

		let key = format!("{namespace}:{name}");
		let mut entries = entries.lock().unwrap_or_else(PoisonError::into_inner);
		if let Some(found) = entries.get(&key) {
			self.hits.fetch_add(1, Ordering::Relaxed);
			return *found;
		}

		self.misses.fetch_add(1, Ordering::Relaxed);
		let computed = compute_discriminator(namespace, name);
		if let Some((evicted, _)) = entries.push(key, computed) {
			log::trace!("discriminator cache evicted `{evicted}`");
		}
		computed
	}

	pub fn stats(&self) -> CacheStats {
		let len = self.entries.as_ref().map_or(0, |entries| {
			entries.lock().unwrap_or_else(PoisonError::into_inner).len()
		});

		CacheStats {
			hits: self.hits.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
			len,
			capacity: self.capacity,
		}
	}

	/// Drop every entry. Counters are kept.
	pub fn clear(&self) {
		if let Some(entries) = &self.entries {
			entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
		}
	}
}

impl Default for DiscriminatorCache {
	fn default() -> Self {
		Self::new(CacheConfig::default())
	}
}

type ValidationKey = (Discriminator, Discriminator, String);

/// Byte-exact discriminator comparison with mismatch diagnostics.
#[derive(Debug)]
pub struct DiscriminatorValidator {
	bypass: bool,
	outcomes: Mutex<LruCache<ValidationKey, Result<(), CodecError>>>,
}

impl DiscriminatorValidator {
	/// The production validator. Every comparison is byte-exact.
	pub fn strict() -> Self {
		Self::with_bypass(false)
	}

	/// A validator that accepts every pair. Only meant for test harnesses.
	pub fn bypass() -> Self {
		Self::with_bypass(true)
	}

	fn with_bypass(bypass: bool) -> Self {
		Self {
			bypass,
			outcomes: Mutex::new(LruCache::new(
				NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
			)),
		}
	}

	pub fn is_bypass(&self) -> bool {
		self.bypass
	}

	pub fn compare(&self, expected: &Discriminator, actual: &Discriminator) -> Result<(), CodecError> {
		self.compare_in(expected, actual, "record")
	}

	/// Compare with a caller-supplied context used in the mismatch report.
	/// Outcomes are memoised per `(expected, actual, context)`.
	pub fn compare_in(
		&self,
		expected: &Discriminator,
		actual: &Discriminator,
		context: &str,
	) -> Result<(), CodecError> {
		if self.bypass || expected == actual {
			return Ok(());
		}

		let key = (*expected, *actual, context.to_owned());
		let mut outcomes = self.outcomes.lock().unwrap_or_else(PoisonError::into_inner);
		if let Some(outcome) = outcomes.get(&key) {
			return outcome.clone();
		}

		let first_difference = expected
			.0
			.iter()
			.zip(actual.0.iter())
			.position(|(a, b)| a != b)
			.unwrap_or(DISCRIMINATOR_LEN);
		let outcome = Err(CodecError::DiscriminatorMismatch {
			context: key.2.clone(),
			expected: *expected,
			actual: *actual,
			first_difference,
		});
		outcomes.put(key, outcome.clone());
		outcome
	}
}

impl Default for DiscriminatorValidator {
	fn default() -> Self {
		Self::strict()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn global_namespace_snake_cases_names() {
		assert_eq!(
			compute_discriminator(&Namespace::Global, "initializeCounter"),
			compute_discriminator(&Namespace::Global, "initialize_counter"),
		);
		assert_ne!(
			compute_discriminator(&Namespace::Account, "initializeCounter"),
			compute_discriminator(&Namespace::Account, "initialize_counter"),
		);
	}

	#[test]
	fn disabled_cache_stores_nothing() {
		let cache = DiscriminatorCache::disabled();
		let first = cache.get_or_compute(&Namespace::Account, "Counter");
		let second = cache.get_or_compute(&Namespace::Account, "Counter");
		assert_eq!(first, second);
		assert_eq!(
			cache.stats(),
			CacheStats {
				hits: 0,
				misses: 2,
				len: 0,
				capacity: 0
			}
		);
	}

	#[test]
	fn cache_evicts_least_recently_used() {
		let cache = DiscriminatorCache::new(CacheConfig::builder().capacity(2).build());
		cache.get_or_compute(&Namespace::Account, "A");
		cache.get_or_compute(&Namespace::Account, "B");
		// Touch A so B becomes the eviction candidate.
		cache.get_or_compute(&Namespace::Account, "A");
		cache.get_or_compute(&Namespace::Account, "C");
		cache.get_or_compute(&Namespace::Account, "A");

		let stats = cache.stats();
		assert_eq!(stats.len, 2);
		assert_eq!(stats.hits, 2);
		assert_eq!(stats.misses, 3);
	}

	#[test]
	fn mismatch_reports_first_difference() {
		let validator = DiscriminatorValidator::strict();
		let expected = Discriminator([1, 2, 3, 4, 5, 6, 7, 8]);
		let actual = Discriminator([1, 2, 3, 9, 5, 6, 7, 8]);
		let err = validator
			.compare_in(&expected, &actual, "account `Counter`")
			.unwrap_err();
		assert_eq!(
			err.to_string(),
			"discriminator mismatch for account `Counter`: expected 0102030405060708, found \
			 0102030905060708 (first difference at byte 3)"
		);
		// Memoised outcome is identical.
		assert_eq!(
			validator.compare_in(&expected, &actual, "account `Counter`"),
			Err(err)
		);
	}

	#[test]
	fn bypass_accepts_everything() {
		let validator = DiscriminatorValidator::bypass();
		assert!(
			validator
				.compare(&Discriminator([0; 8]), &Discriminator([0xff; 8]))
				.is_ok()
		);
	}
}
