//! JSON IDL loading.
//!
//! The accepted format follows the anchor 0.30 IDL layout. Generic type
//! definitions are monomorphised while loading: every instantiation
//! `Name<arg,...>` becomes a concrete [`TypeDef`] registered under that
//! mangled name, so the codec only ever sees concrete types.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::io::Read;
use std::str::FromStr;

use log::debug;
use serde::Deserialize;
use solana_address::Address;

use super::AccountGroup;
use super::AccountItem;
use super::EnumDef;
use super::EnumTag;
use super::EnumVariant;
use super::Field;
use super::InstructionAccount;
use super::InstructionDef;
use super::PdaSpec;
use super::RecordDef;
use super::Schema;
use super::SchemaMetadata;
use super::SchemaRegistry;
use super::SchemaType;
use super::StructFields;
use super::TypeDef;
use super::TypeDefBody;
use crate::Discriminator;
use crate::PdaSeed;
use crate::SchemaError;

#[derive(Debug, Deserialize)]
struct IdlDocument {
	address: String,
	#[serde(default)]
	metadata: IdlMetadata,
	#[serde(default)]
	instructions: Vec<IdlInstruction>,
	#[serde(default)]
	accounts: Vec<IdlRecord>,
	#[serde(default)]
	events: Vec<IdlRecord>,
	#[serde(default)]
	types: Vec<IdlTypeDef>,
}

#[derive(Debug, Default, Deserialize)]
struct IdlMetadata {
	#[serde(default)]
	name: String,
	#[serde(default)]
	version: String,
	#[serde(default)]
	spec: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdlInstruction {
	name: String,
	#[serde(default)]
	docs: Vec<String>,
	#[serde(default)]
	discriminator: Option<Vec<u8>>,
	#[serde(default)]
	accounts: Vec<IdlAccountItem>,
	#[serde(default)]
	args: Vec<IdlField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdlAccountItem {
	Group(IdlAccountGroup),
	Single(IdlAccount),
}

#[derive(Debug, Deserialize)]
struct IdlAccountGroup {
	name: String,
	accounts: Vec<IdlAccountItem>,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
struct IdlAccount {
	name: String,
	#[serde(default)]
	docs: Vec<String>,
	#[serde(default)]
	writable: bool,
	#[serde(default)]
	signer: bool,
	#[serde(default)]
	optional: bool,
	#[serde(default)]
	address: Option<String>,
	#[serde(default)]
	pda: Option<IdlPda>,
	#[serde(default)]
	relations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct IdlPda {
	seeds: Vec<IdlSeed>,
	#[serde(default)]
	program: Option<IdlSeed>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum IdlSeed {
	Const {
		value: Vec<u8>,
	},
	Arg {
		path: String,
	},
	Account {
		path: String,
		#[serde(default)]
		account: Option<String>,
	},
}

#[derive(Debug, Deserialize)]
struct IdlRecord {
	name: String,
	#[serde(default)]
	docs: Vec<String>,
	#[serde(default)]
	discriminator: Option<Vec<u8>>,
	#[serde(default, rename = "type")]
	ty: Option<IdlType>,
}

#[derive(Debug, Clone, Deserialize)]
struct IdlField {
	name: String,
	#[serde(default)]
	docs: Vec<String>,
	#[serde(rename = "type")]
	ty: IdlType,
}

#[derive(Debug, Deserialize)]
struct IdlTypeDef {
	name: String,
	#[serde(default)]
	docs: Vec<String>,
	#[serde(default)]
	generics: Vec<IdlGenericParam>,
	#[serde(rename = "type")]
	ty: IdlTypeDefBody,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum IdlGenericParam {
	Type { name: String },
	Const { name: String },
}

impl IdlGenericParam {
	fn name(&self) -> &str {
		match self {
			Self::Type { name } | Self::Const { name } => name,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum IdlTypeDefBody {
	Struct {
		#[serde(default)]
		fields: Option<IdlFields>,
	},
	Enum {
		variants: Vec<IdlVariant>,
		#[serde(default)]
		tag: Option<String>,
	},
	Type {
		alias: IdlType,
	},
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum IdlFields {
	Named(Vec<IdlField>),
	Tuple(Vec<IdlType>),
}

#[derive(Debug, Deserialize)]
struct IdlVariant {
	name: String,
	#[serde(default)]
	fields: Option<IdlFields>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum IdlType {
	Primitive(String),
	Compound(IdlCompound),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
enum IdlCompound {
	Vec(Box<IdlType>),
	Option(Box<IdlType>),
	Array(Box<IdlType>, IdlArrayLen),
	Defined(IdlDefined),
	Generic(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum IdlArrayLen {
	Value(usize),
	Generic { generic: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum IdlDefined {
	Name(String),
	WithGenerics {
		name: String,
		#[serde(default)]
		generics: Vec<IdlGenericArg>,
	},
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum IdlGenericArg {
	Type {
		#[serde(rename = "type")]
		ty: IdlType,
	},
	Const {
		value: String,
	},
}

/// What a generic parameter is bound to during instantiation.
#[derive(Debug, Clone)]
enum Binding {
	Type(SchemaType),
	Const(String),
}

impl Binding {
	fn mangle(&self) -> String {
		match self {
			Self::Type(ty) => ty.to_string(),
			Self::Const(value) => value.clone(),
		}
	}
}

type Env = BTreeMap<String, Binding>;

/// Lowers IDL type definitions into a [`SchemaRegistry`].
struct Lowering<'d> {
	defs: BTreeMap<&'d str, &'d IdlTypeDef>,
	registry: SchemaRegistry,
	instantiating: BTreeSet<String>,
}

impl<'d> Lowering<'d> {
	fn new(types: &'d [IdlTypeDef]) -> Self {
		Self {
			defs: types.iter().map(|def| (def.name.as_str(), def)).collect(),
			registry: SchemaRegistry::new(),
			instantiating: BTreeSet::new(),
		}
	}

	fn lower_all(&mut self) -> Result<(), SchemaError> {
		let concrete: Vec<&IdlTypeDef> =
			self.defs.values().copied().filter(|def| def.generics.is_empty()).collect();
		for def in concrete {
			let body = self.lower_body(&def.name, &def.ty, &Env::new())?;
			self.registry.insert(TypeDef {
				name: def.name.clone(),
				docs: def.docs.clone(),
				body,
			});
		}

		Ok(())
	}

	fn lower_body(
		&mut self,
		name: &str,
		body: &IdlTypeDefBody,
		env: &Env,
	) -> Result<TypeDefBody, SchemaError> {
		Ok(match body {
			IdlTypeDefBody::Struct { fields } => {
				TypeDefBody::Struct(self.lower_fields(name, fields.as_ref(), env)?)
			}
			IdlTypeDefBody::Enum { variants, tag } => {
				let tag = match tag.as_deref() {
					None | Some("u8") => EnumTag::U8,
					Some("u16") => EnumTag::U16,
					Some("u32") => EnumTag::U32,
					Some(other) => {
						return Err(SchemaError::malformed(
							name,
							format!("unsupported enum tag `{other}`"),
						));
					}
				};
				let variants = variants
					.iter()
					.map(|variant| {
						Ok(EnumVariant {
							name: variant.name.clone(),
							fields: self.lower_fields(name, variant.fields.as_ref(), env)?,
						})
					})
					.collect::<Result<Vec<_>, SchemaError>>()?;
				if u64::try_from(variants.len().saturating_sub(1)).unwrap_or(u64::MAX)
					> tag.max_index()
				{
					return Err(SchemaError::malformed(
						name,
						format!("{} variants do not fit the {tag:?} tag", variants.len()),
					));
				}
				TypeDefBody::Enum(EnumDef { tag, variants })
			}
			IdlTypeDefBody::Type { alias } => TypeDefBody::Alias(self.lower_type(name, alias, env)?),
		})
	}

	fn lower_fields(
		&mut self,
		name: &str,
		fields: Option<&IdlFields>,
		env: &Env,
	) -> Result<StructFields, SchemaError> {
		Ok(match fields {
			None => StructFields::Unit,
			Some(IdlFields::Named(fields)) => StructFields::Named(self.lower_field_list(name, fields, env)?),
			Some(IdlFields::Tuple(types)) => {
				StructFields::Tuple(
					types
						.iter()
						.map(|ty| self.lower_type(name, ty, env))
						.collect::<Result<_, _>>()?,
				)
			}
		})
	}

	fn lower_field_list(
		&mut self,
		name: &str,
		fields: &[IdlField],
		env: &Env,
	) -> Result<Vec<Field>, SchemaError> {
		fields
			.iter()
			.map(|field| {
				Ok(Field {
					name: field.name.clone(),
					ty: self.lower_type(name, &field.ty, env)?,
					docs: field.docs.clone(),
				})
			})
			.collect()
	}

	fn lower_type(&mut self, owner: &str, ty: &IdlType, env: &Env) -> Result<SchemaType, SchemaError> {
		let compound = match ty {
			IdlType::Primitive(name) => {
				return SchemaType::primitive(name)
					.ok_or_else(|| SchemaError::malformed(owner, format!("unknown type `{name}`")));
			}
			IdlType::Compound(compound) => compound,
		};

		Ok(match compound {
			IdlCompound::Vec(inner) => SchemaType::vec(self.lower_type(owner, inner, env)?),
			IdlCompound::Option(inner) => SchemaType::option(self.lower_type(owner, inner, env)?),
			IdlCompound::Array(inner, len) => {
				let len = match len {
					IdlArrayLen::Value(len) => *len,
					IdlArrayLen::Generic { generic } => {
						match env.get(generic) {
							Some(Binding::Const(value)) => {
								value.parse().map_err(|_| {
									SchemaError::malformed(
										owner,
										format!("array length `{value}` is not a number"),
									)
								})?
							}
							_ => {
								return Err(SchemaError::malformed(
									owner,
									format!("unbound array length `{generic}`"),
								));
							}
						}
					}
				};
				SchemaType::array(self.lower_type(owner, inner, env)?, len)
			}
			IdlCompound::Generic(name) => {
				match env.get(name) {
					Some(Binding::Type(ty)) => ty.clone(),
					_ => SchemaType::Generic(name.clone()),
				}
			}
			IdlCompound::Defined(IdlDefined::Name(name)) => self.lower_defined(owner, name, &[], env)?,
			IdlCompound::Defined(IdlDefined::WithGenerics { name, generics }) => {
				self.lower_defined(owner, name, generics, env)?
			}
		})
	}

	fn lower_defined(
		&mut self,
		owner: &str,
		name: &str,
		args: &[IdlGenericArg],
		env: &Env,
	) -> Result<SchemaType, SchemaError> {
		let Some(def) = self.defs.get(name).copied() else {
			return Ok(SchemaType::defined(name));
		};
		if def.generics.is_empty() && args.is_empty() {
			return Ok(SchemaType::defined(name));
		}
		if def.generics.len() != args.len() {
			return Err(SchemaError::malformed(
				owner,
				format!(
					"`{name}` expects {} generic argument(s), found {}",
					def.generics.len(),
					args.len()
				),
			));
		}

		let bindings = args
			.iter()
			.map(|arg| {
				Ok(match arg {
					IdlGenericArg::Type { ty } => Binding::Type(self.lower_type(owner, ty, env)?),
					IdlGenericArg::Const { value } => Binding::Const(value.clone()),
				})
			})
			.collect::<Result<Vec<_>, SchemaError>>()?;
		let mangled = format!(
			"{name}<{}>",
			bindings.iter().map(Binding::mangle).collect::<Vec<_>>().join(",")
		);

		if !self.registry.contains(&mangled) && self.instantiating.insert(mangled.clone()) {
			debug!("instantiating `{mangled}`");
			let inner_env: Env = def
				.generics
				.iter()
				.map(|param| param.name().to_owned())
				.zip(bindings)
				.collect();
			let body = self.lower_body(&mangled, &def.ty, &inner_env)?;
			self.registry.insert(TypeDef {
				name: mangled.clone(),
				docs: def.docs.clone(),
				body,
			});
			self.instantiating.remove(&mangled);
		}

		Ok(SchemaType::Defined(mangled))
	}
}

fn parse_address(value: &str) -> Result<Address, SchemaError> {
	Address::from_str(value).map_err(|_| {
		SchemaError::InvalidAddress {
			value: value.to_owned(),
		}
	})
}

fn parse_discriminator(owner: &str, bytes: Option<&Vec<u8>>) -> Result<Option<Discriminator>, SchemaError> {
	bytes
		.map(|bytes| {
			Discriminator::try_from(bytes.as_slice())
				.map_err(|_| SchemaError::malformed(owner, "discriminator must be 8 bytes"))
		})
		.transpose()
}

fn lower_seed(seed: &IdlSeed) -> PdaSeed {
	match seed {
		IdlSeed::Const { value } => PdaSeed::Const(value.clone()),
		IdlSeed::Arg { path } => PdaSeed::ArgPath { path: path.clone() },
		IdlSeed::Account { path, account } => {
			PdaSeed::AccountPath {
				path: path.clone(),
				account: account.clone(),
			}
		}
	}
}

fn lower_account_item(item: &IdlAccountItem) -> Result<AccountItem, SchemaError> {
	Ok(match item {
		IdlAccountItem::Group(group) => {
			AccountItem::Group(AccountGroup {
				name: group.name.clone(),
				accounts: group
					.accounts
					.iter()
					.map(lower_account_item)
					.collect::<Result<_, _>>()?,
			})
		}
		IdlAccountItem::Single(account) => {
			let pda = account.pda.as_ref().map(|pda| {
				let mut seeds: Vec<PdaSeed> = pda.seeds.iter().map(lower_seed).collect();
				if let Some(program) = &pda.program {
					seeds.push(PdaSeed::program_id(lower_seed(program)));
				}
				PdaSpec::new(seeds)
			});
			AccountItem::Single(InstructionAccount {
				name: account.name.clone(),
				docs: account.docs.clone(),
				writable: account.writable,
				signer: account.signer,
				optional: account.optional,
				address: account.address.as_deref().map(parse_address).transpose()?,
				pda,
				relations: account.relations.clone(),
			})
		}
	})
}

impl Schema {
	/// Load a schema from JSON IDL text.
	pub fn from_json(json: &str) -> Result<Self, SchemaError> {
		let document: IdlDocument = serde_json::from_str(json)?;
		Self::from_document(document)
	}

	/// Load a schema from a reader yielding JSON IDL.
	pub fn from_reader(mut reader: impl Read) -> Result<Self, SchemaError> {
		let mut json = String::new();
		reader.read_to_string(&mut json)?;
		Self::from_json(&json)
	}

	fn from_document(document: IdlDocument) -> Result<Self, SchemaError> {
		let address = parse_address(&document.address)?;
		let mut lowering = Lowering::new(&document.types);
		lowering.lower_all()?;

		let mut instructions = Vec::with_capacity(document.instructions.len());
		for ix in &document.instructions {
			let args = lowering.lower_field_list(&ix.name, &ix.args, &Env::new())?;
			instructions.push(InstructionDef {
				name: ix.name.clone(),
				docs: ix.docs.clone(),
				discriminator: parse_discriminator(&ix.name, ix.discriminator.as_ref())?,
				accounts: ix
					.accounts
					.iter()
					.map(lower_account_item)
					.collect::<Result<_, _>>()?,
				args,
			});
		}

		let mut lower_records = |records: &[IdlRecord]| {
			records
				.iter()
				.map(|record| {
					let ty = match &record.ty {
						Some(ty) => lowering.lower_type(&record.name, ty, &Env::new())?,
						None => SchemaType::defined(&record.name),
					};
					Ok(RecordDef {
						name: record.name.clone(),
						docs: record.docs.clone(),
						discriminator: parse_discriminator(
							&record.name,
							record.discriminator.as_ref(),
						)?,
						ty,
					})
				})
				.collect::<Result<Vec<_>, SchemaError>>()
		};
		let accounts = lower_records(&document.accounts)?;
		let events = lower_records(&document.events)?;

		debug!(
			"loaded IDL `{}`: {} instruction(s), {} account(s), {} event(s), {} type(s)",
			document.metadata.name,
			instructions.len(),
			accounts.len(),
			events.len(),
			lowering.registry.len()
		);

		Ok(Self {
			address,
			metadata: SchemaMetadata {
				name: document.metadata.name,
				version: document.metadata.version,
				spec: document.metadata.spec,
			},
			registry: lowering.registry,
			instructions,
			accounts,
			events,
		})
	}
}
