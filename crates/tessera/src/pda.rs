//! Program derived address functions.
//!
//! A PDA is `sha256(seed_0 ‖ … ‖ seed_n ‖ program_id ‖ "ProgramDerivedAddress")`,
//! accepted only when the hash does not decompress to an ed25519 point. The
//! search variant appends a one-byte nonce, starting at 255 and counting down,
//! until an off-curve hash is found.

use log::trace;
use sha2::Digest;
use sha2::Sha256;
pub use solana_address::MAX_SEED_LEN;
pub use solana_address::MAX_SEEDS;
use solana_address::Address;
use solana_address::bytes_are_curve_point;

use crate::ResolutionError;

/// Suffix hashed after the program id.
pub const PDA_MARKER: &[u8; 21] = b"ProgramDerivedAddress";

/// Find a valid program derived address and the nonce that produced it.
///
/// Fails with [`ResolutionError::TooManySeeds`] when no room is left for the
/// nonce seed, [`ResolutionError::SeedTooLong`] when a seed exceeds
/// [`MAX_SEED_LEN`] and [`ResolutionError::NonceSpaceExhausted`] when every
/// nonce lands on the curve.
///
/// ```
/// use tessera::create_address;
/// use tessera::find_address;
/// use tessera_sdk_ids::system_program;
///
/// let (address, nonce) = find_address(&[b"vault"], &system_program::ID).unwrap();
/// let again = create_address(&[b"vault", &[nonce]], &system_program::ID).unwrap();
/// assert_eq!(address, again);
/// ```
pub fn find_address(seeds: &[&[u8]], program_id: &Address) -> Result<(Address, u8), ResolutionError> {
	find_address_with(seeds, program_id, |hash| bytes_are_curve_point(hash))
}

/// Derive the address for `seeds` directly, without a nonce search.
///
/// The caller is expected to include the nonce in `seeds` already.
pub fn create_address(seeds: &[&[u8]], program_id: &Address) -> Result<Address, ResolutionError> {
	check_seeds(seeds, MAX_SEEDS)?;

	let hash = derive(seeds, None, program_id);
	if bytes_are_curve_point(hash) {
		return Err(ResolutionError::AddressOnCurve);
	}

	Ok(Address::new_from_array(hash))
}

/// Nonce search with an injectable curve probe.
fn find_address_with(
	seeds: &[&[u8]],
	program_id: &Address,
	on_curve: impl Fn(&[u8; 32]) -> bool,
) -> Result<(Address, u8), ResolutionError> {
	check_seeds(seeds, MAX_SEEDS - 1)?;

	for nonce in (0..=u8::MAX).rev() {
		let hash = derive(seeds, Some(nonce), program_id);
		if !on_curve(&hash) {
			let address = Address::new_from_array(hash);
			trace!("derived {address} with nonce {nonce} for program {program_id}");
			return Ok((address, nonce));
		}
	}

	Err(ResolutionError::NonceSpaceExhausted {
		program_id: *program_id,
	})
}

fn check_seeds(seeds: &[&[u8]], max_seeds: usize) -> Result<(), ResolutionError> {
	if seeds.len() > max_seeds {
		return Err(ResolutionError::TooManySeeds {
			count: seeds.len(),
			max: max_seeds,
		});
	}

	if let Some((index, seed)) = seeds
		.iter()
		.enumerate()
		.find(|(_, seed)| seed.len() > MAX_SEED_LEN)
	{
		return Err(ResolutionError::SeedTooLong {
			index,
			len: seed.len(),
			max: MAX_SEED_LEN,
		});
	}

	Ok(())
}

fn derive(seeds: &[&[u8]], nonce: Option<u8>, program_id: &Address) -> [u8; 32] {
	let mut hasher = Sha256::new();
	for seed in seeds {
		hasher.update(seed);
	}
	if let Some(nonce) = nonce {
		hasher.update([nonce]);
	}
	hasher.update(program_id.as_array());
	hasher.update(PDA_MARKER);
	hasher.finalize().into()
}

#[cfg(test)]
mod tests {
	use tessera_sdk_ids::system_program;

	use super::*;

	#[test]
	fn find_and_create_roundtrip() {
		let seeds: &[&[u8]] = &[b"tessera-test"];
		let (pda, nonce) = find_address(seeds, &system_program::ID)
			.unwrap_or_else(|e| panic!("expected to derive pda: {e}"));
		let recreated = create_address(&[b"tessera-test", &[nonce]], &system_program::ID)
			.unwrap_or_else(|e| panic!("failed to recreate pda: {e}"));

		assert_eq!(pda, recreated);
	}

	#[test]
	fn exhausted_nonce_space_is_reported() {
		let program_id = system_program::ID;
		let err = find_address_with(&[b"all-on-curve"], &program_id, |_| true).unwrap_err();
		assert_eq!(err, ResolutionError::NonceSpaceExhausted { program_id });
	}

	#[test]
	fn probe_sees_nonces_in_descending_order() {
		let seen = std::cell::RefCell::new(Vec::new());
		let (_, nonce) = find_address_with(&[b"order"], &system_program::ID, |hash| {
			seen.borrow_mut().push(*hash);
			seen.borrow().len() < 3
		})
		.unwrap_or_else(|e| panic!("{e}"));

		assert_eq!(nonce, 253);
		assert_eq!(seen.borrow().len(), 3);
	}

	#[test]
	fn find_leaves_room_for_the_nonce() {
		let seeds = [b"s".as_slice(); MAX_SEEDS];
		assert_eq!(
			find_address(&seeds, &system_program::ID),
			Err(ResolutionError::TooManySeeds {
				count: MAX_SEEDS,
				max: MAX_SEEDS - 1,
			})
		);
		assert!(matches!(
			create_address(&seeds, &system_program::ID),
			Ok(_) | Err(ResolutionError::AddressOnCurve)
		));
	}
}
