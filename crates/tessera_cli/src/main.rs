use std::path::Path;
use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use log::LevelFilter;
use serde_json::Value as Json;
use tessera::ResolverConfig;
use tessera_cli::AccountsRequest;
use tessera_cli::Target;
use tessera_cli::error::CliError;
use tessera_cli::input;

#[derive(Parser, Debug)]
#[command(
	name = "tessera",
	version,
	about = "Encode, decode and resolve accounts for IDL-described Solana programs"
)]
struct Cli {
	/// Log at debug level regardless of `RUST_LOG`.
	#[arg(short, long, global = true)]
	verbose: bool,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Print the 8-byte discriminator of `<namespace>:<name>` as hex.
	Discriminator {
		/// `global`, `account`, `event` or any custom namespace.
		namespace: String,
		name: String,
	},
	/// Find a program derived address and its bump.
	Pda {
		/// Base58 id of the deriving program.
		#[arg(short, long)]
		program_id: String,

		/// Seed as `kind:value` where kind is one of `str`, `hex`, `pubkey`,
		/// `u8`, `u16`, `u32` or `u64`. Repeat in derivation order.
		#[arg(short, long = "seed")]
		seeds: Vec<String>,
	},
	/// Encode a JSON value as hex.
	Encode {
		/// IDL JSON file.
		#[arg(long)]
		idl: PathBuf,

		#[command(flatten)]
		target: EncodeTarget,

		/// JSON text, or `@path` to read it from a file.
		#[arg(long)]
		value: String,
	},
	/// Decode hex data as JSON.
	Decode {
		/// IDL JSON file.
		#[arg(long)]
		idl: PathBuf,

		#[command(flatten)]
		target: DecodeTarget,

		/// Hex data, with or without a `0x` prefix.
		#[arg(long)]
		data: String,
	},
	/// Resolve the accounts of an instruction.
	Accounts {
		/// IDL JSON file.
		#[arg(long)]
		idl: PathBuf,

		#[arg(long)]
		instruction: String,

		/// Instruction arguments as a JSON object keyed by argument name, or
		/// `@path`.
		#[arg(long)]
		args: Option<String>,

		/// Known accounts as a JSON object of account path to address, or
		/// `@path`.
		#[arg(long)]
		accounts: Option<String>,

		/// Base58 address filling required signer accounts.
		#[arg(long)]
		signer: Option<String>,

		/// Derive under this program id instead of the IDL address.
		#[arg(long)]
		program_id: Option<String>,

		/// Upper bound on derivation rounds.
		#[arg(long, default_value_t = tessera::DEFAULT_MAX_ITERATIONS)]
		max_iterations: usize,

		/// Do not fill well-known program accounts from their names.
		#[arg(long, default_value_t = false)]
		no_infer: bool,
	},
	/// List instructions, accounts, events and types with their
	/// discriminators.
	Inspect {
		/// IDL JSON file.
		#[arg(long)]
		idl: PathBuf,
	},
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct EncodeTarget {
	#[arg(long, value_name = "NAME")]
	instruction: Option<String>,

	#[arg(long, value_name = "NAME")]
	account: Option<String>,

	#[arg(long = "type", value_name = "NAME")]
	ty: Option<String>,
}

impl From<EncodeTarget> for Target {
	fn from(target: EncodeTarget) -> Self {
		match target {
			EncodeTarget {
				account: Some(name),
				..
			} => Self::Account(name),
			EncodeTarget { ty: Some(name), .. } => Self::Type(name),
			EncodeTarget { instruction, .. } => Self::Instruction(instruction),
		}
	}
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct DecodeTarget {
	/// Instruction data. Pass a name to insist on that instruction.
	#[arg(long, value_name = "NAME", num_args = 0..=1)]
	instruction: Option<Option<String>>,

	#[arg(long, value_name = "NAME")]
	account: Option<String>,

	/// Event data, identified by its discriminator.
	#[arg(long)]
	event: bool,

	#[arg(long = "type", value_name = "NAME")]
	ty: Option<String>,
}

impl From<DecodeTarget> for Target {
	fn from(target: DecodeTarget) -> Self {
		match target {
			DecodeTarget {
				account: Some(name),
				..
			} => Self::Account(name),
			DecodeTarget { ty: Some(name), .. } => Self::Type(name),
			DecodeTarget { event: true, .. } => Self::Event,
			DecodeTarget { instruction, .. } => Self::Instruction(instruction.flatten()),
		}
	}
}

fn main() {
	let cli = Cli::parse();
	init_logging(cli.verbose);

	if let Err(err) = run(cli.command) {
		eprintln!("Error: {err}");
		std::process::exit(1);
	}
}

fn init_logging(verbose: bool) {
	let mut builder =
		env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
	if verbose {
		builder.filter_level(LevelFilter::Debug);
	}
	builder.init();
}

fn run(command: Commands) -> Result<(), CliError> {
	match command {
		Commands::Discriminator { namespace, name } => {
			println!("{}", tessera_cli::discriminator(&namespace, &name));
		}
		Commands::Pda { program_id, seeds } => {
			let program_id = input::address_arg(&program_id)?;
			let seeds = seeds
				.iter()
				.map(String::as_str)
				.map(input::seed_arg)
				.collect::<Result<Vec<_>, _>>()?;
			print_json(&tessera_cli::pda(&program_id, &seeds)?)?;
		}
		Commands::Encode { idl, target, value } => {
			let schema = input::load_schema(&idl)?;
			let value = input::json_arg(&value)?;
			println!("{}", tessera_cli::encode(schema, &target.into(), &value)?);
		}
		Commands::Decode { idl, target, data } => {
			let schema = input::load_schema(&idl)?;
			let bytes = input::hex_arg(&data)?;
			print_json(&tessera_cli::decode(schema, &target.into(), &bytes)?)?;
		}
		Commands::Accounts {
			idl,
			instruction,
			args,
			accounts,
			signer,
			program_id,
			max_iterations,
			no_infer,
		} => {
			let schema = load_with_program_id(&idl, program_id.as_deref())?;
			let request = AccountsRequest {
				args: args.as_deref().map(input::json_arg).transpose()?.unwrap_or(Json::Null),
				accounts: accounts
					.as_deref()
					.map(input::accounts_arg)
					.transpose()?
					.unwrap_or_default(),
				signer: signer.as_deref().map(input::address_arg).transpose()?,
				config: ResolverConfig::builder()
					.max_iterations(max_iterations)
					.infer_conventional_accounts(!no_infer)
					.build(),
			};
			print_json(&tessera_cli::accounts(schema, &instruction, request)?)?;
		}
		Commands::Inspect { idl } => {
			print_json(&tessera_cli::inspect(input::load_schema(&idl)?))?;
		}
	}

	Ok(())
}

fn load_with_program_id(idl: &Path, program_id: Option<&str>) -> Result<tessera::Schema, CliError> {
	let mut schema = input::load_schema(idl)?;
	if let Some(program_id) = program_id {
		schema.address = input::address_arg(program_id)?;
	}
	Ok(schema)
}

fn print_json(json: &Json) -> Result<(), CliError> {
	let text = serde_json::to_string_pretty(json).map_err(|source| {
		CliError::Json {
			input: "output".to_owned(),
			source,
		}
	})?;
	println!("{text}");
	Ok(())
}
