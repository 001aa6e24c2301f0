//! Well-known Solana program and sysvar IDs.
//!
//! Each sub-module declares a single `ID` constant via
//! [`solana_address::declare_id!`]. [`conventional_account`] maps the account
//! names programs conventionally give these accounts (`system_program`,
//! `tokenProgram`, `rent`, ...) to their address.

#![no_std]

use solana_address::Address;

/// Associated Token Account program ID.
pub mod associated_token_program {
	solana_address::declare_id!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");
}

/// Compute Budget program ID.
pub mod compute_budget {
	solana_address::declare_id!("ComputeBudget111111111111111111111111111111");
}

/// Memo program ID (v2).
pub mod memo_program {
	solana_address::declare_id!("MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr");
}

/// System program ID.
pub mod system_program {
	solana_address::declare_id!("11111111111111111111111111111111");
}

/// SPL Token program ID.
pub mod token_program {
	solana_address::declare_id!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
}

/// SPL Token-2022 program ID.
pub mod token_2022_program {
	solana_address::declare_id!("TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb");
}

/// Upgradeable BPF loader program ID.
pub mod bpf_loader_upgradeable {
	solana_address::declare_id!("BPFLoaderUpgradeab1e11111111111111111111111");
}

/// Sysvar account IDs.
pub mod sysvar {
	/// Clock sysvar ID.
	pub mod clock {
		solana_address::declare_id!("SysvarC1ock11111111111111111111111111111111");
	}
	/// Epoch schedule sysvar ID.
	pub mod epoch_schedule {
		solana_address::declare_id!("SysvarEpochSchedu1e111111111111111111111111");
	}
	/// Instructions sysvar ID.
	pub mod instructions {
		solana_address::declare_id!("Sysvar1nstructions1111111111111111111111111");
	}
	/// Rent sysvar ID.
	pub mod rent {
		solana_address::declare_id!("SysvarRent111111111111111111111111111111111");
	}
	/// Slot hashes sysvar ID.
	pub mod slot_hashes {
		solana_address::declare_id!("SysvarS1otHashes111111111111111111111111111");
	}
	/// Stake history sysvar ID.
	pub mod stake_history {
		solana_address::declare_id!("SysvarStakeHistory1111111111111111111111111");
	}
}

/// Normalised account names (lower-case, separators removed) and the address
/// each one conventionally refers to.
const CONVENTIONAL_ACCOUNTS: &[(&str, Address)] = &[
	("systemprogram", system_program::ID),
	("tokenprogram", token_program::ID),
	("token2022program", token_2022_program::ID),
	("associatedtokenprogram", associated_token_program::ID),
	("memoprogram", memo_program::ID),
	("computebudgetprogram", compute_budget::ID),
	("rent", sysvar::rent::ID),
	("sysvarrent", sysvar::rent::ID),
	("clock", sysvar::clock::ID),
	("sysvarclock", sysvar::clock::ID),
	("instructions", sysvar::instructions::ID),
	("instructionssysvar", sysvar::instructions::ID),
	("sysvarinstructions", sysvar::instructions::ID),
	("epochschedule", sysvar::epoch_schedule::ID),
	("slothashes", sysvar::slot_hashes::ID),
	("stakehistory", sysvar::stake_history::ID),
];

/// Look up the address conventionally bound to an account name.
///
/// Matching ignores ASCII case and `_`/`-` separators, so `system_program`,
/// `systemProgram` and `SystemProgram` all resolve to the system program.
///
/// ```
/// use tessera_sdk_ids::conventional_account;
/// use tessera_sdk_ids::system_program;
///
/// assert_eq!(conventional_account("systemProgram"), Some(system_program::ID));
/// assert_eq!(conventional_account("vault"), None);
/// ```
pub fn conventional_account(name: &str) -> Option<Address> {
	CONVENTIONAL_ACCOUNTS
		.iter()
		.find(|(pattern, _)| normalized_eq(name, pattern))
		.map(|(_, address)| *address)
}

fn normalized_eq(name: &str, pattern: &str) -> bool {
	let mut normalized = name
		.bytes()
		.filter(|b| *b != b'_' && *b != b'-')
		.map(|b| b.to_ascii_lowercase());

	for expected in pattern.bytes() {
		if normalized.next() != Some(expected) {
			return false;
		}
	}

	normalized.next().is_none()
}
