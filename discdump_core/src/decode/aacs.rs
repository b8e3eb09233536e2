/*!
# Disc Dump: AACS and CPRM

Content-protection structures. None of these are interpreted beyond their
headers; the payloads are kept verbatim so they can be stored as media tags.
*/

use super::{
	BeCursor,
	hex,
	write_field,
};
use std::fmt;



/// # Header Size.
const HEADER_LEN: usize = 4;

/// # LBA Extent Size.
const EXTENT_LEN: usize = 16;



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Opaque Structure Kind.
pub enum AacsKind {
	/// # AACS Volume Identifier.
	VolumeId,

	/// # AACS Pre-recorded Media Serial Number.
	MediaSerial,

	/// # AACS Media Identifier.
	MediaId,

	/// # AACS Data Keys.
	DataKeys,
}

impl AacsKind {
	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::VolumeId => "AACS Volume Identifier",
			Self::MediaSerial => "AACS Media Serial Number",
			Self::MediaId => "AACS Media Identifier",
			Self::DataKeys => "AACS Data Keys",
		}
	}
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Opaque AACS Structure.
///
/// A four-byte header followed by a payload.
pub struct AacsBlob {
	/// # Kind.
	pub kind: AacsKind,

	/// # Data Length.
	pub data_length: u16,

	/// # Reserved (bytes 2-3).
	pub reserved: [u8; 2],

	/// # Payload.
	pub payload: Vec<u8>,
}

impl AacsBlob {
	#[must_use]
	/// # Decode.
	pub fn decode(buf: &[u8], kind: AacsKind) -> Option<Self> {
		let cur = header(buf, kind.as_str())?;
		Some(Self {
			kind,
			data_length: cur.u16(0)?,
			reserved: cur.array::<2>(2)?,
			payload: cur.slice(HEADER_LEN, cur.len() - HEADER_LEN)?.to_vec(),
		})
	}
}

impl fmt::Display for AacsBlob {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_field(f, self.kind.as_str(), hex(&self.payload))
	}
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Media Key Block.
///
/// AACS and CPRM share the same framing: byte 3 carries the total pack
/// count.
pub struct MediaKeyBlock {
	/// # CPRM (rather than AACS)?
	pub cprm: bool,

	/// # Data Length.
	pub data_length: u16,

	/// # Reserved (byte 2).
	pub reserved: u8,

	/// # Total Packs.
	pub total_packs: u8,

	/// # Payload.
	pub payload: Vec<u8>,
}

impl MediaKeyBlock {
	#[must_use]
	/// # Decode (AACS).
	pub fn decode_aacs(buf: &[u8]) -> Option<Self> { Self::decode(buf, false) }

	#[must_use]
	/// # Decode (CPRM).
	pub fn decode_cprm(buf: &[u8]) -> Option<Self> { Self::decode(buf, true) }

	/// # Decode.
	fn decode(buf: &[u8], cprm: bool) -> Option<Self> {
		let cur = header(buf, if cprm { "CPRM MKB" } else { "AACS MKB" })?;
		Some(Self {
			cprm,
			data_length: cur.u16(0)?,
			reserved: cur.u8(2)?,
			total_packs: cur.u8(3)?,
			payload: cur.slice(HEADER_LEN, cur.len() - HEADER_LEN)?.to_vec(),
		})
	}
}

impl fmt::Display for MediaKeyBlock {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let label = if self.cprm { "CPRM Media Key Block" } else { "AACS Media Key Block" };
		writeln!(f, "{label}")?;
		write_field(f, "Total packs:", self.total_packs)?;
		write_field(f, "Payload bytes:", self.payload.len())
	}
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # LBA Extent.
pub struct LbaExtent {
	/// # Reserved (bytes 0-7).
	pub reserved: [u8; 8],

	/// # Start LBA.
	pub start: u32,

	/// # Length (sectors).
	pub length: u32,
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # AACS LBA Extents.
pub struct AacsLbaExtents {
	/// # Data Length.
	pub data_length: u16,

	/// # Reserved (byte 2).
	pub reserved: u8,

	/// # Maximum Extents.
	pub max_extents: u8,

	/// # Extents.
	pub extents: Vec<LbaExtent>,
}

impl AacsLbaExtents {
	#[must_use]
	/// # Decode.
	///
	/// A partial trailing record is ignored.
	pub fn decode(buf: &[u8]) -> Option<Self> {
		let cur = header(buf, "AACS LBA extents")?;

		let mut extents = Vec::new();
		let mut offset = HEADER_LEN;
		while offset + EXTENT_LEN <= cur.len() {
			extents.push(LbaExtent {
				reserved: cur.array::<8>(offset)?,
				start: cur.u32(offset + 8)?,
				length: cur.u32(offset + 12)?,
			});
			offset += EXTENT_LEN;
		}

		Some(Self {
			data_length: cur.u16(0)?,
			reserved: cur.u8(2)?,
			max_extents: cur.u8(3)?,
			extents,
		})
	}
}

impl fmt::Display for AacsLbaExtents {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.max_extents == 0 { writeln!(f, "Drive can store an unlimited number of LBA extents")?; }
		else { write_field(f, "Maximum LBA extents:", self.max_extents)?; }
		for e in &self.extents {
			writeln!(f, "LBA extent starting at {} for {} sectors", e.start, e.length)?;
		}
		Ok(())
	}
}



/// # Check Header.
///
/// Structures need at least four bytes, and the declared length must not
/// exceed what was actually returned.
fn header<'a>(buf: &'a [u8], label: &str) -> Option<BeCursor<'a>> {
	let cur = BeCursor::new(buf);
	if cur.len() < HEADER_LEN {
		log::debug!("{label} too short: {}.", cur.len());
		return None;
	}
	let declared = usize::from(cur.u16(0)?) + 2;
	if declared > cur.len() {
		log::debug!("{label} is truncated: declared {declared}, got {}.", cur.len());
		return None;
	}
	Some(cur)
}
