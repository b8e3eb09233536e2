/*!
# Disc Dump: CLI
*/

use argyle::Argument;
use dactyl::traits::BytesToUnsigned;
use discdump_core::{
	DumpError,
	DumpOptions,
	ReadOffset,
};
use std::path::PathBuf;



/// # Default Output Stem.
const DEFAULT_OUTPUT: &str = "disc";



#[derive(Debug)]
/// # Parsed Settings.
pub(super) struct Settings {
	/// # Dump Options.
	pub(super) opts: DumpOptions,

	/// # Device Path.
	pub(super) dev: Option<PathBuf>,

	/// # Output Stem.
	pub(super) output: PathBuf,

	/// # Survey Only.
	pub(super) no_dump: bool,

	/// # Skip the Summary.
	pub(super) no_summary: bool,

	/// # Debug Logging.
	pub(super) verbose: bool,
}



/// # Parse Options.
pub(super) fn parse() -> Result<Settings, DumpError> {
	let args = argyle::args()
		.with_keywords(include!(concat!(env!("OUT_DIR"), "/argyle.rs")));

	let mut opts = DumpOptions::default();
	let mut dev = None;
	let mut output = None;
	let mut no_dump = false;
	let mut no_summary = false;
	let mut verbose = false;
	for arg in args {
		match arg {
			Argument::Key("--force") => { opts = opts.with_force(true); },
			Argument::Key("-h" | "--help") => return Err(DumpError::PrintHelp),
			Argument::Key("--no-dump") => { no_dump = true; },
			Argument::Key("--no-fix-offset") => { opts = opts.with_fix_offset(false); },
			Argument::Key("--no-resume") => { opts = opts.with_resume(false); },
			Argument::Key("--no-sidecar") => { opts = opts.with_sidecar(false); },
			Argument::Key("--no-subchannel") => { opts = opts.with_subchannel(false); },
			Argument::Key("--no-summary") => { no_summary = true; },
			Argument::Key("--no-trim") => { opts = opts.with_trim(false); },
			Argument::Key("--stop-on-error") => { opts = opts.with_stop_on_error(true); },
			Argument::Key("-v" | "--verbose") => { verbose = true; },
			Argument::Key("-V" | "--version") => return Err(DumpError::PrintVersion),

			Argument::KeyWithValue("-d" | "--dev", s) => { dev.replace(PathBuf::from(s)); },
			Argument::KeyWithValue("--max-transfer", s) => {
				let s = u16::btou(s.trim().as_bytes())
					.ok_or(DumpError::CliParse("--max-transfer"))?;
				opts = opts.with_max_transfer(s);
			},
			Argument::KeyWithValue("--offset", s) => {
				let s = ReadOffset::try_from(s.trim())
					.map_err(|_| DumpError::CliParse("--offset"))?;
				opts = opts.with_offset(Some(s));
			},
			Argument::KeyWithValue("-o" | "--output", s) => { output.replace(PathBuf::from(s)); },
			Argument::KeyWithValue("-r" | "--retry-passes", s) => {
				let s = u8::btou(s.trim().as_bytes())
					.ok_or(DumpError::CliParse("-r/--retry-passes"))?;
				opts = opts.with_retry_passes(s);
			},
			Argument::KeyWithValue("--skip", s) => {
				let s = u16::btou(s.trim().as_bytes())
					.filter(|&v| v != 0)
					.ok_or(DumpError::CliParse("--skip"))?;
				opts = opts.with_skip(Some(s));
			},

			Argument::Other(s) => return Err(DumpError::CliArg(s)),
			Argument::InvalidUtf8(s) => return Err(DumpError::CliArg(s.to_string_lossy().into_owned())),
			_ => {},
		}
	}

	let output = output.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
	if output.is_dir() {
		return Err(DumpError::Write(output.to_string_lossy().into_owned()));
	}

	Ok(Settings {
		opts,
		dev,
		output,
		no_dump,
		no_summary,
		verbose,
	})
}
