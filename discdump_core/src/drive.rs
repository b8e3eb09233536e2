/*!
# Disc Dump: Drive
*/

use crate::{
	DumpError,
	ReadOffset,
};
use std::{
	fmt,
	time::Duration,
};



include!(concat!(env!("OUT_DIR"), "/drives.rs"));



/// # Drive Result.
///
/// Every command returns its payload alongside how long the drive took to
/// answer, or the sense data explaining why it didn't.
pub type DriveResult<T> = Result<(T, Duration), SenseError>;



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Sense Data.
///
/// The key, additional sense code, and qualifier from a failed command.
pub struct SenseError {
	/// # Sense Key.
	pub key: u8,

	/// # Additional Sense Code.
	pub asc: u8,

	/// # Additional Sense Code Qualifier.
	pub ascq: u8,
}

impl std::error::Error for SenseError {}

impl fmt::Display for SenseError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "sense {:02X}h/{:02X}h/{:02X}h", self.key, self.asc, self.ascq)
	}
}

impl SenseError {
	/// # Illegal Request: Invalid Command.
	pub const UNSUPPORTED: Self = Self { key: 0x05, asc: 0x20, ascq: 0x00 };

	/// # Medium Error: Unrecovered Read.
	pub const MEDIUM: Self = Self { key: 0x03, asc: 0x11, ascq: 0x00 };

	/// # Illegal Request: LBA Out of Range.
	pub const OUT_OF_RANGE: Self = Self { key: 0x05, asc: 0x21, ascq: 0x00 };

	#[must_use]
	/// # Unsupported?
	///
	/// True for ILLEGAL REQUEST with an invalid opcode or field.
	pub const fn is_unsupported(&self) -> bool {
		self.key == 0x05 && matches!(self.asc, 0x20 | 0x24)
	}
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # READ CD Expected Sector Type.
pub enum SectorType {
	/// # Anything.
	All,

	/// # CD-DA.
	Cdda,

	/// # Mode 1.
	Mode1,

	/// # Mode 2 (Formless).
	Mode2Formless,

	/// # Mode 2 Form 1.
	Mode2Form1,

	/// # Mode 2 Form 2.
	Mode2Form2,
}

impl SectorType {
	#[must_use]
	/// # CDB Value.
	///
	/// The "expected sector type" field, already shifted into bits 4-2.
	pub const fn cdb(self) -> u8 {
		let v = match self {
			Self::All => 0,
			Self::Cdda => 1,
			Self::Mode1 => 2,
			Self::Mode2Formless => 3,
			Self::Mode2Form1 => 4,
			Self::Mode2Form2 => 5,
		};
		v << 2
	}
}



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
/// # Sub-channel Kind.
pub enum Subchannel {
	#[default]
	/// # None.
	None,

	/// # Formatted Q (16 bytes).
	Q16,

	/// # Raw Interleaved P-W (96 bytes).
	Raw,
}

impl Subchannel {
	#[must_use]
	/// # Size (Bytes Per Sector).
	pub const fn size(self) -> u32 {
		match self {
			Self::None => 0,
			Self::Q16 => crate::CD_SUBQ_SIZE,
			Self::Raw => crate::CD_SUB_SIZE,
		}
	}

	#[must_use]
	/// # READ CD Selection Field.
	pub const fn cdb(self) -> u8 {
		match self {
			Self::None => 0,
			Self::Q16 => 2,
			Self::Raw => 1,
		}
	}

	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::None => "none",
			Self::Q16 => "Q16",
			Self::Raw => "raw P-W",
		}
	}
}



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
/// # Read Command.
///
/// Ordered from most to least capable.
pub enum ReadCommand {
	#[default]
	/// # READ CD (BEh).
	ReadCd,

	/// # READ(16).
	Read16,

	/// # READ(12).
	Read12,

	/// # READ(10).
	Read10,

	/// # READ(6).
	Read6,
}

impl ReadCommand {
	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::ReadCd => "READ CD",
			Self::Read16 => "READ(16)",
			Self::Read12 => "READ(12)",
			Self::Read10 => "READ(10)",
			Self::Read6 => "READ(6)",
		}
	}
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # READ TOC/PMA/ATIP Format.
pub enum TocFormat {
	/// # Formatted TOC.
	Toc,

	/// # Multi-session Information.
	SessionInfo,

	/// # Raw (Full) TOC.
	FullToc,

	/// # PMA.
	Pma,

	/// # ATIP.
	Atip,

	/// # CD-TEXT.
	CdText,
}

impl TocFormat {
	#[must_use]
	/// # Format Code.
	pub const fn code(self) -> u8 {
		match self {
			Self::Toc => 0,
			Self::SessionInfo => 1,
			Self::FullToc => 2,
			Self::Pma => 3,
			Self::Atip => 4,
			Self::CdText => 5,
		}
	}
}



/// # Optical Drive.
///
/// The low-level MMC primitives the dumper needs. Every call blocks until the
/// drive answers or the timeout elapses; only one command is ever in flight.
///
/// Buffers are returned exactly as the drive sends them, big-endian headers
/// and all.
pub trait Drive {
	/// # READ CD.
	///
	/// Read `count` blocks of `block_size` bytes starting at `lba`, with the
	/// given sub-channel appended to each sector.
	///
	/// ## Errors
	///
	/// Returns the sense data if the drive refuses.
	fn read_cd(
		&mut self,
		lba: i32,
		block_size: u32,
		count: u32,
		kind: SectorType,
		sub: Subchannel,
		timeout: Duration,
	) -> DriveResult<Vec<u8>>;

	/// # READ(6).
	///
	/// ## Errors
	///
	/// Returns the sense data if the drive refuses.
	fn read6(&mut self, lba: i32, block_size: u32, count: u32, timeout: Duration) -> DriveResult<Vec<u8>>;

	/// # READ(10).
	///
	/// ## Errors
	///
	/// Returns the sense data if the drive refuses.
	fn read10(&mut self, lba: i32, block_size: u32, count: u32, timeout: Duration) -> DriveResult<Vec<u8>>;

	/// # READ(12).
	///
	/// ## Errors
	///
	/// Returns the sense data if the drive refuses.
	fn read12(&mut self, lba: i32, block_size: u32, count: u32, timeout: Duration) -> DriveResult<Vec<u8>>;

	/// # READ(16).
	///
	/// ## Errors
	///
	/// Returns the sense data if the drive refuses.
	fn read16(&mut self, lba: i32, block_size: u32, count: u32, timeout: Duration) -> DriveResult<Vec<u8>>;

	/// # READ TOC/PMA/ATIP.
	///
	/// `track_session` is the starting track (format 0) or session (format 2).
	///
	/// ## Errors
	///
	/// Returns the sense data if the drive refuses.
	fn read_toc(&mut self, format: TocFormat, track_session: u8, timeout: Duration) -> DriveResult<Vec<u8>>;

	/// # READ TOC (Raw).
	///
	/// The Full TOC for every session.
	///
	/// ## Errors
	///
	/// Returns the sense data if the drive refuses.
	fn read_raw_toc(&mut self, timeout: Duration) -> DriveResult<Vec<u8>> {
		self.read_toc(TocFormat::FullToc, 1, timeout)
	}

	/// # READ DISC INFORMATION.
	///
	/// ## Errors
	///
	/// Returns the sense data if the drive refuses.
	fn read_disc_information(&mut self, _timeout: Duration) -> DriveResult<Vec<u8>> {
		Err(SenseError::UNSUPPORTED)
	}

	/// # Media Catalogue Number.
	///
	/// ## Errors
	///
	/// Returns the sense data if the drive refuses.
	fn read_mcn(&mut self, timeout: Duration) -> DriveResult<Option<String>>;

	/// # Track ISRC.
	///
	/// ## Errors
	///
	/// Returns the sense data if the drive refuses.
	fn read_isrc(&mut self, track: u8, timeout: Duration) -> DriveResult<Option<String>>;

	/// # READ CAPACITY(10).
	///
	/// Returns the last LBA and the block length.
	///
	/// ## Errors
	///
	/// Returns the sense data if the drive refuses.
	fn read_capacity10(&mut self, timeout: Duration) -> DriveResult<(u32, u32)>;

	/// # READ CAPACITY(16).
	///
	/// Returns the last LBA and the block length.
	///
	/// ## Errors
	///
	/// Returns the sense data if the drive refuses.
	fn read_capacity16(&mut self, timeout: Duration) -> DriveResult<(u64, u32)>;

	/// # Seek.
	///
	/// Move the head near `lba`. The default implementation reads (and
	/// discards) a single sector there.
	///
	/// ## Errors
	///
	/// Returns the sense data if the drive refuses.
	fn seek(&mut self, lba: i32, timeout: Duration) -> DriveResult<()> {
		self.read_cd(lba, crate::BYTES_PER_SECTOR, 1, SectorType::All, Subchannel::None, timeout)
			.map(|(_, d)| ((), d))
	}

	/// # Vendor and Model.
	fn vendor_model(&self) -> Option<DriveVendorModel>;
}



#[derive(Debug, Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
/// # Drive Vendor and Model.
///
/// The vendor (8 bytes) and model (16 bytes) are glumped together, uppercase,
/// with unused space left null. This is the form the built-in offset table is
/// keyed by.
pub struct DriveVendorModel(pub(crate) [u8; 24]);

impl fmt::Display for DriveVendorModel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let vendor = self.vendor();
		if vendor.is_empty() { f.write_str(self.model()) }
		else { write!(f, "{vendor} {}", self.model()) }
	}
}

impl DriveVendorModel {
	/// # New.
	///
	/// ## Errors
	///
	/// The vendor may be empty but not more than eight bytes; the model must
	/// be between one and sixteen bytes. Both must be ASCII.
	pub fn new(vendor: &str, model: &str) -> Result<Self, DumpError> {
		let vendor = vendor.trim();
		let model = model.trim();
		if
			vendor.len() > 8 ||
			model.is_empty() ||
			model.len() > 16 ||
			! vendor.is_ascii() ||
			! model.is_ascii()
		{
			return Err(DumpError::Bug("Invalid drive vendor/model"));
		}

		let mut out = [0_u8; 24];
		for (old, new) in out.iter_mut().zip(vendor.bytes()) {
			*old = new.to_ascii_uppercase();
		}
		for (old, new) in out.iter_mut().skip(8).zip(model.bytes()) {
			*old = new.to_ascii_uppercase();
		}
		Ok(Self(out))
	}

	#[must_use]
	/// # Vendor.
	pub fn vendor(&self) -> &str { trim_nul(&self.0[..8]) }

	#[must_use]
	/// # Model.
	pub fn model(&self) -> &str { trim_nul(&self.0[8..]) }

	#[must_use]
	/// # Detect Offset.
	///
	/// Look up the drive's sample read offset in the built-in table.
	pub fn detect_offset(&self) -> Option<ReadOffset> {
		DRIVE_OFFSETS.binary_search_by(|(vm, _)| vm.cmp(self))
			.ok()
			.map(|idx| DRIVE_OFFSETS[idx].1)
	}
}

/// # Trim Nulls.
fn trim_nul(src: &[u8]) -> &str {
	let end = src.iter().position(|&b| b == 0).unwrap_or(src.len());
	std::str::from_utf8(&src[..end]).unwrap_or("")
}
