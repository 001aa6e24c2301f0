#![doc = include_str!("../readme.md")]

mod bytes;
mod codec;
mod coder;
mod discriminator;
mod error;
mod pda;
mod program;
mod provider;
mod resolver;
mod schema;
mod seeds;
mod value;

pub use solana_address::Address;
pub use tessera_sdk_ids as sdk_ids;
pub use typed_builder;

pub use crate::bytes::*;
pub use crate::codec::Codec;
pub use crate::codec::MAX_DEPTH;
pub use crate::coder::*;
pub use crate::discriminator::*;
pub use crate::error::*;
pub use crate::pda::*;
pub use crate::program::*;
pub use crate::provider::*;
pub use crate::resolver::*;
pub use crate::schema::*;
pub use crate::seeds::*;
pub use crate::value::*;

pub mod prelude {
	pub use crate::AccountDataProvider;
	pub use crate::AccountResolver;
	pub use crate::Address;
	pub use crate::Codec;
	pub use crate::Error;
	pub use crate::Program;
	pub use crate::RecordCoder;
	pub use crate::ResolverConfig;
	pub use crate::Schema;
	pub use crate::SchemaType;
	pub use crate::Value;
}
