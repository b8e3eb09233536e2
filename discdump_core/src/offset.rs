/*!
# Disc Dump: Read Offset
*/

use crate::{
	BYTES_PER_SAMPLE,
	BYTES_PER_SECTOR,
	DumpError,
};
use dactyl::traits::BytesToSigned;



/// # Min Offset.
const MIN_OFFSET: i16 = -5880;

/// # Max Offset.
const MAX_OFFSET: i16 = 5880;



#[derive(Debug, Clone, Copy, Default, Eq, Ord, PartialEq, PartialOrd)]
/// # Read Offset.
///
/// A drive (or combined drive+disc) read offset in samples. Positive values
/// mean the drive returns data that belongs later on the disc.
///
/// For historical reasons, values are restricted to `-5880..=5880`.
pub struct ReadOffset(pub(crate) i16);

impl TryFrom<i16> for ReadOffset {
	type Error = DumpError;
	fn try_from(src: i16) -> Result<Self, Self::Error> {
		if (MIN_OFFSET..=MAX_OFFSET).contains(&src) { Ok(Self(src)) }
		else { Err(DumpError::ReadOffset) }
	}
}

impl TryFrom<&[u8]> for ReadOffset {
	type Error = DumpError;
	fn try_from(src: &[u8]) -> Result<Self, Self::Error> {
		if src.is_empty() { Ok(Self(0)) }
		else {
			i16::btoi(src)
				.ok_or(DumpError::ReadOffset)
				.and_then(Self::try_from)
		}
	}
}

impl TryFrom<&str> for ReadOffset {
	type Error = DumpError;
	fn try_from(src: &str) -> Result<Self, Self::Error> {
		Self::try_from(src.trim().as_bytes())
	}
}

impl ReadOffset {
	#[must_use]
	/// # From Bytes.
	///
	/// Byte offsets that don't land on a sample boundary, or fall outside the
	/// supported range, return `None`.
	pub fn from_bytes(bytes: i32) -> Option<Self> {
		if bytes % BYTES_PER_SAMPLE as i32 != 0 { return None; }
		i16::try_from(bytes / BYTES_PER_SAMPLE as i32)
			.ok()
			.and_then(|s| Self::try_from(s).ok())
	}

	#[must_use]
	/// # Samples.
	pub const fn samples(self) -> i16 { self.0 }

	#[must_use]
	/// # Bytes.
	pub const fn bytes(self) -> i32 { self.0 as i32 * BYTES_PER_SAMPLE as i32 }

	#[must_use]
	/// # Sectors.
	///
	/// The number of whole sectors needed to cover the offset either way.
	pub const fn sectors_abs(self) -> u32 { sectors_for_bytes(self.bytes()) }
}



#[must_use]
/// # Sectors For Byte Offset.
///
/// Return the minimum containing sector count for a signed byte offset.
pub const fn sectors_for_bytes(bytes: i32) -> u32 {
	bytes.unsigned_abs().div_ceil(BYTES_PER_SECTOR)
}
