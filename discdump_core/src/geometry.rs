/*!
# Disc Dump: Geometry
*/

use crate::{
	BYTES_PER_SECTOR,
	COOKED_SECTOR_SIZE,
	ReadCommand,
	Subchannel,
	sectors_for_bytes,
};
use serde::{
	Deserialize,
	Serialize,
};
use std::fmt;



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Deserialize, Serialize)]
/// # Media Type.
pub enum MediaType {
	#[default]
	/// # Generic CD (Mixed Mode).
	Cd,

	/// # Audio CD.
	Cdda,

	/// # CD-ROM.
	Cdrom,

	/// # CD-ROM XA.
	CdromXa,

	/// # CD-i.
	Cdi,

	/// # CD-i Ready.
	CdiReady,

	/// # Enhanced CD (CD-Plus).
	CdPlus,
}

impl fmt::Display for MediaType {
	#[inline]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl MediaType {
	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Cd => "CD",
			Self::Cdda => "CD-DA",
			Self::Cdrom => "CD-ROM",
			Self::CdromXa => "CD-ROM XA",
			Self::Cdi => "CD-i",
			Self::CdiReady => "CD-i Ready",
			Self::CdPlus => "CD-Plus",
		}
	}

	#[must_use]
	/// # Is CD-i (or CD-i Ready)?
	pub const fn is_cdi(self) -> bool { matches!(self, Self::Cdi | Self::CdiReady) }
}



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Deserialize, Serialize)]
/// # Hidden Track Kind.
///
/// Content between LBA zero and the first track's index 01.
pub enum HiddenTrack {
	#[default]
	/// # None.
	None,

	/// # Audio.
	Audio,

	/// # Data.
	Data,

	/// # CD-i Ready Application Area.
	CdiReady,
}

impl HiddenTrack {
	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::None => "none",
			Self::Audio => "audio",
			Self::Data => "data",
			Self::CdiReady => "CD-i Ready",
		}
	}
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Disc Geometry.
///
/// The negotiated read parameters for one dump. The sub-channel can be
/// downgraded after the fact, but never upgraded, so the block size only
/// ever shrinks.
pub struct Geometry {
	/// # Media Type.
	pub media_type: MediaType,

	/// # Hidden Track.
	pub hidden_track: HiddenTrack,

	/// # Total Blocks.
	pub blocks: u32,

	/// # Sub-channel.
	subchannel: Subchannel,

	/// # Read Command.
	read_command: ReadCommand,

	/// # Max Blocks Per Transfer.
	pub max_transfer: u32,

	/// # Read Offset (Bytes).
	pub offset_bytes: i32,
}

impl Geometry {
	#[must_use]
	/// # New.
	///
	/// Sub-channel data only comes with READ CD, so other commands force it
	/// off.
	pub const fn new(blocks: u32, subchannel: Subchannel, read_command: ReadCommand) -> Self {
		Self {
			media_type: MediaType::Cd,
			hidden_track: HiddenTrack::None,
			blocks,
			subchannel: if matches!(read_command, ReadCommand::ReadCd) { subchannel } else { Subchannel::None },
			read_command,
			max_transfer: 2,
			offset_bytes: 0,
		}
	}

	#[must_use]
	/// # Sub-channel.
	pub const fn subchannel(&self) -> Subchannel { self.subchannel }

	#[must_use]
	/// # Read Command.
	pub const fn read_command(&self) -> ReadCommand { self.read_command }

	#[must_use]
	/// # READ CD?
	pub const fn readcd(&self) -> bool { matches!(self.read_command, ReadCommand::ReadCd) }

	/// # Downgrade Sub-channel.
	///
	/// Returns `true` if the change was made, `false` if it would have been an
	/// upgrade (or no change at all).
	pub fn downgrade_subchannel(&mut self, sub: Subchannel) -> bool {
		if sub.size() < self.subchannel.size() {
			self.subchannel = sub;
			true
		}
		else { false }
	}

	#[must_use]
	/// # Sector Size.
	pub const fn sector_size(&self) -> u32 {
		if self.readcd() { BYTES_PER_SECTOR } else { COOKED_SECTOR_SIZE }
	}

	#[must_use]
	/// # Block Size.
	///
	/// Sector plus sub-channel.
	pub const fn block_size(&self) -> u32 { self.sector_size() + self.subchannel.size() }

	#[must_use]
	#[allow(clippy::cast_possible_wrap)]
	/// # Last Sector.
	pub const fn last_sector(&self) -> i32 {
		let last = self.blocks.saturating_sub(1);
		if last > i32::MAX as u32 { i32::MAX }
		else { last as i32 }
	}

	#[must_use]
	/// # Sectors For Offset.
	///
	/// The number of extra sectors a read needs to cover the offset shift.
	pub const fn sectors_for_offset(&self) -> u32 { sectors_for_bytes(self.offset_bytes) }
}
