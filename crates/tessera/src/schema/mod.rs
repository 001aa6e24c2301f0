//! The in-memory program schema.
//!
//! A [`Schema`] is built once from an IDL (see [`Schema::from_json`]) and is
//! read-only afterwards, so it can be shared freely between concurrent codec
//! and resolution calls.

mod idl;

use std::collections::BTreeMap;
use std::fmt;

use solana_address::Address;

use crate::CodecError;
use crate::Discriminator;
use crate::SchemaError;
use crate::seeds::PdaSeed;

/// A schema type node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SchemaType {
	Bool,
	U8,
	U16,
	U32,
	U64,
	U128,
	U256,
	I8,
	I16,
	I32,
	I64,
	I128,
	I256,
	F32,
	F64,
	String,
	Bytes,
	Pubkey,
	Vec(Box<SchemaType>),
	Option(Box<SchemaType>),
	Array(Box<SchemaType>, usize),
	Defined(String),
	Generic(String),
}

impl SchemaType {
	pub fn vec(inner: Self) -> Self {
		Self::Vec(Box::new(inner))
	}

	pub fn option(inner: Self) -> Self {
		Self::Option(Box::new(inner))
	}

	pub fn array(inner: Self, len: usize) -> Self {
		Self::Array(Box::new(inner), len)
	}

	pub fn defined(name: impl Into<String>) -> Self {
		Self::Defined(name.into())
	}

	/// Parse a primitive type name as it appears in an IDL.
	pub fn primitive(name: &str) -> Option<Self> {
		let ty = match name {
			"bool" => Self::Bool,
			"u8" => Self::U8,
			"u16" => Self::U16,
			"u32" => Self::U32,
			"u64" => Self::U64,
			"u128" => Self::U128,
			"u256" => Self::U256,
			"i8" => Self::I8,
			"i16" => Self::I16,
			"i32" => Self::I32,
			"i64" => Self::I64,
			"i128" => Self::I128,
			"i256" => Self::I256,
			"f32" => Self::F32,
			"f64" => Self::F64,
			"string" => Self::String,
			"bytes" => Self::Bytes,
			"pubkey" | "publicKey" => Self::Pubkey,
			_ => return None,
		};
		Some(ty)
	}

	/// Byte width of fixed-size integer and float types.
	pub fn numeric_width(&self) -> Option<usize> {
		match self {
			Self::U8 | Self::I8 => Some(1),
			Self::U16 | Self::I16 => Some(2),
			Self::U32 | Self::I32 | Self::F32 => Some(4),
			Self::U64 | Self::I64 | Self::F64 => Some(8),
			Self::U128 | Self::I128 => Some(16),
			Self::U256 | Self::I256 => Some(32),
			_ => None,
		}
	}

	pub fn is_signed_integer(&self) -> bool {
		matches!(
			self,
			Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::I128 | Self::I256
		)
	}

	pub fn is_unsigned_integer(&self) -> bool {
		matches!(
			self,
			Self::U8 | Self::U16 | Self::U32 | Self::U64 | Self::U128 | Self::U256
		)
	}

	/// Call `visit` on every type node below and including `self`.
	pub fn walk(&self, visit: &mut impl FnMut(&SchemaType)) {
		visit(self);
		match self {
			Self::Vec(inner) | Self::Option(inner) | Self::Array(inner, _) => inner.walk(visit),
			_ => {}
		}
	}
}

impl fmt::Display for SchemaType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Bool => "bool",
			Self::U8 => "u8",
			Self::U16 => "u16",
			Self::U32 => "u32",
			Self::U64 => "u64",
			Self::U128 => "u128",
			Self::U256 => "u256",
			Self::I8 => "i8",
			Self::I16 => "i16",
			Self::I32 => "i32",
			Self::I64 => "i64",
			Self::I128 => "i128",
			Self::I256 => "i256",
			Self::F32 => "f32",
			Self::F64 => "f64",
			Self::String => "string",
			Self::Bytes => "bytes",
			Self::Pubkey => "pubkey",
			Self::Vec(inner) => return write!(f, "Vec<{inner}>"),
			Self::Option(inner) => return write!(f, "Option<{inner}>"),
			Self::Array(inner, len) => return write!(f, "[{inner}; {len}]"),
			Self::Defined(name) | Self::Generic(name) => name,
		};
		f.write_str(name)
	}
}

/// A named, typed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
	pub name: String,
	pub ty: SchemaType,
	pub docs: Vec<String>,
}

impl Field {
	pub fn new(name: impl Into<String>, ty: SchemaType) -> Self {
		Self {
			name: name.into(),
			ty,
			docs: Vec::new(),
		}
	}
}

/// The fields of a struct or of an enum variant.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StructFields {
	Named(Vec<Field>),
	Tuple(Vec<SchemaType>),
	#[default]
	Unit,
}

impl StructFields {
	pub fn types(&self) -> Vec<&SchemaType> {
		match self {
			Self::Named(fields) => fields.iter().map(|f| &f.ty).collect(),
			Self::Tuple(types) => types.iter().collect(),
			Self::Unit => Vec::new(),
		}
	}
}

/// Width of the variant index written before an enum payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumTag {
	#[default]
	U8,
	U16,
	U32,
}

impl EnumTag {
	pub fn max_index(self) -> u64 {
		match self {
			Self::U8 => u64::from(u8::MAX),
			Self::U16 => u64::from(u16::MAX),
			Self::U32 => u64::from(u32::MAX),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumVariant {
	pub name: String,
	pub fields: StructFields,
}

impl EnumVariant {
	pub fn unit(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			fields: StructFields::Unit,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnumDef {
	pub tag: EnumTag,
	pub variants: Vec<EnumVariant>,
}

impl EnumDef {
	pub fn variant_index(&self, name: &str) -> Option<usize> {
		self.variants.iter().position(|v| v.name == name)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDefBody {
	Struct(StructFields),
	Enum(EnumDef),
	Alias(SchemaType),
}

/// A user-defined type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
	pub name: String,
	pub docs: Vec<String>,
	pub body: TypeDefBody,
}

impl TypeDef {
	pub fn new(name: impl Into<String>, body: TypeDefBody) -> Self {
		Self {
			name: name.into(),
			docs: Vec::new(),
			body,
		}
	}

	pub fn named_struct(name: impl Into<String>, fields: Vec<Field>) -> Self {
		Self::new(name, TypeDefBody::Struct(StructFields::Named(fields)))
	}
}

/// Name → [`TypeDef`] lookup. Built once, never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
	types: BTreeMap<String, TypeDef>,
}

impl SchemaRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a type, replacing any previous definition with the same name.
	pub fn with_type(mut self, def: TypeDef) -> Self {
		self.insert(def);
		self
	}

	pub(crate) fn insert(&mut self, def: TypeDef) {
		self.types.insert(def.name.clone(), def);
	}

	pub fn get(&self, name: &str) -> Option<&TypeDef> {
		self.types.get(name)
	}

	/// Like [`get`](Self::get) but fails with [`CodecError::UnknownType`].
	pub fn require(&self, name: &str) -> Result<&TypeDef, CodecError> {
		self.get(name).ok_or_else(|| {
			CodecError::UnknownType {
				name: name.to_owned(),
			}
		})
	}

	pub fn contains(&self, name: &str) -> bool {
		self.types.contains_key(name)
	}

	pub fn len(&self) -> usize {
		self.types.len()
	}

	pub fn is_empty(&self) -> bool {
		self.types.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &TypeDef> {
		self.types.values()
	}

	/// Fixed encoded size of `ty`, or `None` when it contains a variable-length
	/// member (string, bytes, vec, option) or an enum whose variants differ in
	/// size.
	pub fn fixed_size(&self, ty: &SchemaType) -> Option<usize> {
		self.fixed_size_inner(ty, 0)
	}

	fn fixed_size_inner(&self, ty: &SchemaType, depth: usize) -> Option<usize> {
		// Recursive definitions can only be encoded through a variable-length
		// indirection, so a deep chain means the type is not fixed-size.
		if depth > 64 {
			return None;
		}

		match ty {
			SchemaType::Bool => Some(1),
			SchemaType::Pubkey => Some(32),
			SchemaType::String
			| SchemaType::Bytes
			| SchemaType::Vec(_)
			| SchemaType::Option(_)
			| SchemaType::Generic(_) => None,
			SchemaType::Array(inner, len) => {
				self.fixed_size_inner(inner, depth + 1)?.checked_mul(*len)
			}
			SchemaType::Defined(name) => {
				match &self.get(name)?.body {
					TypeDefBody::Alias(inner) => self.fixed_size_inner(inner, depth + 1),
					TypeDefBody::Struct(fields) => self.fields_size(fields, depth + 1),
					TypeDefBody::Enum(def) => {
						let tag = match def.tag {
							EnumTag::U8 => 1,
							EnumTag::U16 => 2,
							EnumTag::U32 => 4,
						};
						let mut sizes = def
							.variants
							.iter()
							.map(|v| self.fields_size(&v.fields, depth + 1));
						let first = sizes.next().unwrap_or(Some(0))?;
						for size in sizes {
							if size? != first {
								return None;
							}
						}
						Some(tag + first)
					}
				}
			}
			numeric => numeric.numeric_width(),
		}
	}

	fn fields_size(&self, fields: &StructFields, depth: usize) -> Option<usize> {
		fields
			.types()
			.into_iter()
			.try_fold(0usize, |acc, ty| acc.checked_add(self.fixed_size_inner(ty, depth)?))
	}
}

/// A program-level record (account or event) and the type of its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDef {
	pub name: String,
	pub docs: Vec<String>,
	pub discriminator: Option<Discriminator>,
	pub ty: SchemaType,
}

/// How to derive a PDA: ordered seeds, at most one of which may be a
/// [`PdaSeed::ProgramIdOverride`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdaSpec {
	pub seeds: Vec<PdaSeed>,
}

impl PdaSpec {
	pub fn new(seeds: Vec<PdaSeed>) -> Self {
		Self { seeds }
	}

	/// Seeds that contribute bytes to the derivation.
	pub fn byte_seeds(&self) -> impl Iterator<Item = &PdaSeed> {
		self.seeds
			.iter()
			.filter(|seed| !matches!(seed, PdaSeed::ProgramIdOverride(_)))
	}

	/// The seed producing the deriving program id, when it is not the
	/// instruction's own program.
	pub fn program_override(&self) -> Option<&PdaSeed> {
		self.seeds.iter().find_map(|seed| {
			match seed {
				PdaSeed::ProgramIdOverride(inner) => Some(&**inner),
				_ => None,
			}
		})
	}
}

/// One account slot of an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct InstructionAccount {
	pub name: String,
	pub docs: Vec<String>,
	pub writable: bool,
	pub signer: bool,
	pub optional: bool,
	pub address: Option<Address>,
	pub pda: Option<PdaSpec>,
	pub relations: Vec<String>,
}

impl InstructionAccount {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			..Self::default()
		}
	}

	pub fn writable(mut self) -> Self {
		self.writable = true;
		self
	}

	pub fn signer(mut self) -> Self {
		self.signer = true;
		self
	}

	pub fn optional(mut self) -> Self {
		self.optional = true;
		self
	}

	pub fn with_address(mut self, address: Address) -> Self {
		self.address = Some(address);
		self
	}

	pub fn with_pda(mut self, pda: PdaSpec) -> Self {
		self.pda = Some(pda);
		self
	}

	pub fn with_relation(mut self, account: impl Into<String>) -> Self {
		self.relations.push(account.into());
		self
	}
}

/// A named group of accounts nested inside an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountGroup {
	pub name: String,
	pub accounts: Vec<AccountItem>,
}

/// A node of an instruction's account tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountItem {
	Single(InstructionAccount),
	Group(AccountGroup),
}

impl AccountItem {
	pub fn name(&self) -> &str {
		match self {
			Self::Single(account) => &account.name,
			Self::Group(group) => &group.name,
		}
	}
}

impl From<InstructionAccount> for AccountItem {
	fn from(account: InstructionAccount) -> Self {
		Self::Single(account)
	}
}

/// A leaf account together with its dotted path (`group.member`) and the
/// group scope it was declared in (empty at the top level).
#[derive(Debug, Clone)]
pub struct FlatAccount<'a> {
	pub path: String,
	pub scope: String,
	pub account: &'a InstructionAccount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionDef {
	pub name: String,
	pub docs: Vec<String>,
	pub discriminator: Option<Discriminator>,
	pub accounts: Vec<AccountItem>,
	pub args: Vec<Field>,
}

impl InstructionDef {
	pub fn new(name: impl Into<String>, accounts: Vec<AccountItem>, args: Vec<Field>) -> Self {
		Self {
			name: name.into(),
			docs: Vec::new(),
			discriminator: None,
			accounts,
			args,
		}
	}

	pub fn with_discriminator(mut self, discriminator: Discriminator) -> Self {
		self.discriminator = Some(discriminator);
		self
	}

	/// Leaf accounts in declaration order, groups flattened depth-first.
	pub fn flat_accounts(&self) -> Vec<FlatAccount<'_>> {
		let mut out = Vec::new();
		flatten(&self.accounts, "", &mut out);
		out
	}

	/// The declared type of argument `name`.
	pub fn arg(&self, name: &str) -> Option<(usize, &Field)> {
		self.args.iter().enumerate().find(|(_, f)| f.name == name)
	}
}

fn flatten<'a>(items: &'a [AccountItem], scope: &str, out: &mut Vec<FlatAccount<'a>>) {
	for item in items {
		let path = if scope.is_empty() {
			item.name().to_owned()
		} else {
			format!("{scope}.{}", item.name())
		};
		match item {
			AccountItem::Single(account) => {
				out.push(FlatAccount {
					path,
					scope: scope.to_owned(),
					account,
				});
			}
			AccountItem::Group(group) => flatten(&group.accounts, &path, out),
		}
	}
}

/// Optional descriptive metadata carried by an IDL.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaMetadata {
	pub name: String,
	pub version: String,
	pub spec: Option<String>,
}

/// A loaded program schema.
#[derive(Debug, Clone)]
pub struct Schema {
	pub address: Address,
	pub metadata: SchemaMetadata,
	pub registry: SchemaRegistry,
	pub instructions: Vec<InstructionDef>,
	pub accounts: Vec<RecordDef>,
	pub events: Vec<RecordDef>,
}

impl Schema {
	pub fn new(address: Address, registry: SchemaRegistry) -> Self {
		Self {
			address,
			metadata: SchemaMetadata::default(),
			registry,
			instructions: Vec::new(),
			accounts: Vec::new(),
			events: Vec::new(),
		}
	}

	pub fn with_instruction(mut self, instruction: InstructionDef) -> Self {
		self.instructions.push(instruction);
		self
	}

	pub fn with_account(mut self, account: RecordDef) -> Self {
		self.accounts.push(account);
		self
	}

	pub fn with_event(mut self, event: RecordDef) -> Self {
		self.events.push(event);
		self
	}

	pub fn instruction(&self, name: &str) -> Result<&InstructionDef, SchemaError> {
		self.instructions
			.iter()
			.find(|ix| ix.name == name)
			.ok_or_else(|| SchemaError::unknown("instruction", name))
	}

	pub fn account(&self, name: &str) -> Result<&RecordDef, SchemaError> {
		self.accounts
			.iter()
			.find(|a| a.name == name)
			.ok_or_else(|| SchemaError::unknown("account", name))
	}

	pub fn event(&self, name: &str) -> Result<&RecordDef, SchemaError> {
		self.events
			.iter()
			.find(|e| e.name == name)
			.ok_or_else(|| SchemaError::unknown("event", name))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn counter_registry() -> SchemaRegistry {
		SchemaRegistry::new()
			.with_type(TypeDef::named_struct(
				"Counter",
				vec![
					Field::new("count", SchemaType::U64),
					Field::new("bump", SchemaType::U8),
				],
			))
			.with_type(TypeDef::new(
				"Status",
				TypeDefBody::Enum(EnumDef {
					tag: EnumTag::U8,
					variants: vec![EnumVariant::unit("Open"), EnumVariant::unit("Closed")],
				}),
			))
	}

	#[test]
	fn fixed_sizes() {
		let registry = counter_registry();
		assert_eq!(registry.fixed_size(&SchemaType::defined("Counter")), Some(9));
		assert_eq!(registry.fixed_size(&SchemaType::defined("Status")), Some(1));
		assert_eq!(
			registry.fixed_size(&SchemaType::array(SchemaType::defined("Counter"), 3)),
			Some(27)
		);
		assert_eq!(registry.fixed_size(&SchemaType::String), None);
		assert_eq!(registry.fixed_size(&SchemaType::defined("Missing")), None);
	}

	#[test]
	fn flattens_groups_in_declaration_order() {
		let ix = InstructionDef::new(
			"deposit",
			vec![
				InstructionAccount::new("payer").signer().into(),
				AccountItem::Group(AccountGroup {
					name: "pool".to_owned(),
					accounts: vec![
						InstructionAccount::new("state").into(),
						InstructionAccount::new("vault").writable().into(),
					],
				}),
				InstructionAccount::new("system_program").into(),
			],
			vec![],
		);

		let flat = ix.flat_accounts();
		let paths: Vec<_> = flat.iter().map(|f| f.path.as_str()).collect();
		assert_eq!(
			paths,
			["payer", "pool.state", "pool.vault", "system_program"]
		);
		assert_eq!(flat[2].scope, "pool");
		assert!(flat[2].account.writable);
	}

	#[test]
	fn unknown_instruction_is_reported() {
		let schema = Schema::new(Address::new_from_array([1; 32]), counter_registry());
		let err = schema.instruction("nope").unwrap_err();
		assert_eq!(err.to_string(), "unknown instruction `nope`");
	}
}
