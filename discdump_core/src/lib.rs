/*!
# Disc Dump: Library

The engine behind Disc Dump: binary structure decoders, a drive abstraction,
the track and pregap mappers, and the read loop that streams a Compact Disc
into an image writer.
*/

#![deny(unsafe_code)]

#![warn(
	clippy::filetype_is_file,
	clippy::integer_division,
	clippy::needless_borrow,
	clippy::nursery,
	clippy::pedantic,
	clippy::perf,
	clippy::suboptimal_flops,
	clippy::unneeded_field_pattern,
	macro_use_extern_crate,
	missing_copy_implementations,
	missing_debug_implementations,
	missing_docs,
	non_ascii_idents,
	trivial_casts,
	trivial_numeric_casts,
	unreachable_pub,
	unused_crate_dependencies,
	unused_extern_crates,
	unused_import_braces,
)]

#![allow(
	clippy::doc_markdown,
	clippy::module_name_repetitions,
	clippy::redundant_pub_crate,
)]

mod abort;
#[cfg(feature = "cdio")] mod cdio;
pub mod decode;
mod drive;
mod dump;
mod error;
mod extents;
mod geometry;
mod image;
mod log;
mod offset;
mod persist;
mod progress;
mod resume;
mod sidecar;
mod track;

pub use abort::KillSwitch;
#[cfg(feature = "cdio")] pub use cdio::CdioDrive;
pub use drive::{
	Drive,
	DriveResult,
	DriveVendorModel,
	ReadCommand,
	SectorType,
	SenseError,
	Subchannel,
	TocFormat,
};
pub use dump::{
	Dumper,
	DumpPaths,
	DumpReport,
	OffsetSource,
	opts::DumpOptions,
	Survey,
};
pub use error::DumpError;
pub use extents::Extents;
pub use geometry::{
	Geometry,
	HiddenTrack,
	MediaType,
};
pub use image::{
	ImageCapabilities,
	ImageWriter,
	MediaTag,
	RawImage,
	SectorTag,
};
pub use self::log::DumpLog;
pub use offset::{
	ReadOffset,
	sectors_for_bytes,
};
pub use progress::{
	NoProgress,
	ProglessSink,
	ProgressSink,
};
pub use resume::{
	PassKind,
	PassRecord,
	Resume,
};
pub use sidecar::{
	audio_toc,
	Checksums,
	write_sidecar,
};
pub use track::{
	Session,
	Track,
	TrackFlags,
	TrackKind,
	validate_tracks,
};



/// # Bytes Per Sample.
pub const BYTES_PER_SAMPLE: u32 = 4;

/// # Samples Per Sector.
pub const SAMPLES_PER_SECTOR: u32 = 588;

/// # Bytes Per Sector.
///
/// The full raw sector: sync, header, user data, and EDC/ECC for data
/// tracks, or 588 stereo samples for audio.
pub const BYTES_PER_SECTOR: u32 = SAMPLES_PER_SECTOR * BYTES_PER_SAMPLE;

/// # Cooked Sector Size.
///
/// User data only, as returned by the `READ(n)` commands.
pub const COOKED_SECTOR_SIZE: u32 = 2048;

/// # Raw Sub-channel Size.
///
/// All eight channels, interleaved.
pub const CD_SUB_SIZE: u32 = 96;

/// # Formatted Q Sub-channel Size.
pub const CD_SUBQ_SIZE: u32 = 16;

/// # Number of lead-in sectors.
///
/// All discs have a 2-second region at the start before any data. Different
/// contexts include or exclude this amount, so it's good to keep it handy.
pub const CD_LEADIN: u16 = 150;
