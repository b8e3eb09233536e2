/*!
# Disc Dump: Errors
*/

use cdtoc::TocError;
use crate::SenseError;
use fyi_msg::Msg;
use std::{
	error::Error,
	fmt,
};



#[cfg(feature = "bin")]
/// # Help Text.
const HELP: &str = concat!(r"
      .-----.
    .'  ___  '.    ", "\x1b[38;5;199mDisc Dump\x1b[0;38;5;69m v", env!("CARGO_PKG_VERSION"), "\x1b[0m", r"
   /   /   \   \   Bit-for-bit Compact Disc
  |   |  o  |   |  images, pregaps and all.
   \   \___/   /
    '.       .'
      '-----'

USAGE:
    discdump [OPTIONS]

BASIC SETTINGS:
    -o, --output <PATH>
                      The image path, minus the extension. Sibling files
                      (.sub, .log, etc.) share the same stem.
                      [default: ./disc]
    -r, --retry-passes <NUM>
                      Re-read any remaining bad sectors up to <NUM> times,
                      alternating direction between passes.
                      [default: 5; max: 32]

WHEN ALL ELSE FAILS:
        --force       Keep going when the drive or output format can't do
                      everything asked of it, downgrading features instead of
                      stopping.
        --no-resume   Ignore any previous dump state, starting over from
                      scratch.
        --no-trim     Skip the trim pass that re-reads each bad sector once
                      after the main pass.
        --skip <NUM>  The number of sectors to jump over after a read error.
                      [default: the batch size; range: 1..=512]
        --stop-on-error
                      Stop the dump at the first unreadable sector.

DRIVE SETTINGS:
    -d, --dev <PATH>  The device path for the optical drive containing the CD
                      of interest, like /dev/cdrom. [default: auto]
        --max-transfer <NUM>
                      The most sectors to request from the drive at once. The
                      real limit is probed and may be lower.
                      [default: 64; range: 2..=256]
        --no-fix-offset
                      Write audio sectors exactly as the drive returns them,
                      without read offset correction.
        --no-subchannel
                      Do not read or store sub-channel data. Pregaps will not
                      be detected.
        --offset <SAMPLES>
                      The AccurateRip, et al, sample read offset to apply to
                      audio retrieved from the drive.
                      [default: auto or 0; range: ±5880]

MISCELLANEOUS:
    -h, --help        Print help information to STDOUT and exit.
    -v, --verbose     Print low-level decoder and drive diagnostics to STDERR.
    -V, --version     Print version information to STDOUT and exit.
        --no-dump     Print the basic drive and disc information to STDERR and
                      exit (without dumping anything).
        --no-sidecar  Skip the checksum sidecar normally written beside the
                      image.
        --no-summary  Skip the drive and disc summary and jump straight to
                      dumping.

EARLY EXIT:
    If you don't have time to let a dump finish naturally, press ", "\x1b[38;5;208mCTRL\x1b[0m+\x1b[38;5;208mC\x1b[0m", r" to stop
    it early. Your progress will still be saved, and the next run will pick up
    where this one left off.
");



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Errors.
pub enum DumpError {
	/// # Bug!
	Bug(&'static str),

	/// # Output or drive can't do something required.
	Capability(&'static str),

	/// # CDTOC passthrough.
	Cdtoc(TocError),

	/// # Invalid device.
	Device(String),

	/// # Unable to open device.
	DeviceOpen(Option<String>),

	/// # Image writer failure.
	Image(String),

	/// # User Abort.
	Killed,

	/// # No readable lead-out or capacity.
	NoLeadOut,

	/// # No read command works.
	NoRead,

	/// # No TOC.
	NoToc,

	/// # Read Offset.
	ReadOffset,

	/// # Read failure with stop-on-error.
	ReadStop(i32, SenseError),

	/// # Resume state belongs to another disc.
	ResumeMismatch,

	/// # Track layout is impossible.
	TrackLayout(u8),

	/// # Transfer size probe failed.
	Transfer,

	/// # Writing to disk.
	Write(String),

	#[cfg(feature = "bin")]
	/// # Invalid CLI arg.
	CliArg(String),

	#[cfg(feature = "bin")]
	/// # CLI Parsing failure.
	CliParse(&'static str),

	#[cfg(feature = "bin")]
	/// # Print Help (Not an Error).
	PrintHelp,

	#[cfg(feature = "bin")]
	/// # Print Version (Not an Error).
	PrintVersion,
}

impl Error for DumpError {}

impl From<TocError> for DumpError {
	#[inline]
	fn from(err: TocError) -> Self { Self::Cdtoc(err) }
}

impl From<DumpError> for Msg {
	#[inline]
	fn from(src: DumpError) -> Self { Self::error(src.to_string()) }
}

impl fmt::Display for DumpError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Bug(s) => write!(f, "Bug: {s}."),
			Self::Capability(s) => f.write_str(s),
			Self::Cdtoc(s) => write!(f, "{s}"),
			Self::Device(s) => write!(f, "Invalid device path {s}."),
			Self::DeviceOpen(s) =>
				if let Some(s) = s { write!(f, "Unable to open connection with {s}.") }
				else {
					f.write_str("Unable to open connection with default optical drive.")
				},
			Self::Image(s) => write!(f, "Output image error: {s}."),
			Self::Killed => f.write_str("User abort."),
			Self::NoLeadOut => f.write_str("Could not find the end of the disc; use --force to try reading up to LBA 360000 anyway."),
			Self::NoRead => f.write_str("Cannot read from disc, not continuing."),
			Self::NoToc => f.write_str("Could not read TOC; use --force to try reading from LBA 0 to 360000 anyway."),
			Self::ReadOffset => f.write_str("Invalid read offset."),
			Self::ReadStop(lba, sense) => write!(f, "Error reading sector {lba} ({sense}), stopping as requested."),
			Self::ResumeMismatch => f.write_str("The saved dump state belongs to a different disc; rerun with --no-resume to start over."),
			Self::TrackLayout(n) => write!(f, "The layout of track #{n} is impossible."),
			Self::Transfer => f.write_str("Device error trying to guess the ideal transfer length."),
			Self::Write(s) => write!(f, "Unable to write to {s}."),

			#[cfg(feature = "bin")]
			Self::CliArg(s) => write!(f, "Invalid CLI option: {s}"),

			#[cfg(feature = "bin")]
			Self::CliParse(s) => write!(f, "Unable to parse {s}."),

			#[cfg(feature = "bin")]
			Self::PrintHelp => f.write_str(HELP),

			#[cfg(feature = "bin")]
			Self::PrintVersion => f.write_str(concat!("Disc Dump v", env!("CARGO_PKG_VERSION"))),
		}
	}
}
