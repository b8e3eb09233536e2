/*!
# Disc Dump: TOC and Session Info

READ TOC/PMA/ATIP formats 0000b and 0001b.
*/

use super::{
	BeCursor,
	write_field,
};
use std::fmt;



/// # Descriptor Size.
const DESCRIPTOR_LEN: usize = 8;

/// # Lead-out Track Number.
pub const LEADOUT_TRACK: u8 = 0xAA;



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # TOC Track Descriptor.
pub struct TocDescriptor {
	/// # Reserved (byte 0).
	pub reserved1: u8,

	/// # ADR (high nibble of byte 1).
	pub adr: u8,

	/// # CONTROL (low nibble of byte 1).
	pub control: u8,

	/// # Track Number.
	pub track: u8,

	/// # Reserved (byte 3).
	pub reserved2: u8,

	/// # Start Address.
	///
	/// This is an LBA unless the command asked for MSF, in which case the
	/// bytes are `00 MM SS FF`.
	pub address: u32,
}

impl TocDescriptor {
	/// # Decode One.
	fn decode(cur: &BeCursor, idx: usize) -> Option<Self> {
		let adr_control = cur.u8(idx + 1)?;
		Some(Self {
			reserved1: cur.u8(idx)?,
			adr: adr_control >> 4,
			control: adr_control & 0x0F,
			track: cur.u8(idx + 2)?,
			reserved2: cur.u8(idx + 3)?,
			address: cur.u32(idx + 4)?,
		})
	}

	#[must_use]
	#[allow(clippy::cast_possible_wrap)]
	/// # Address as LBA.
	pub const fn lba(&self) -> i32 { self.address as i32 }

	#[must_use]
	/// # Data Track?
	pub const fn is_data(&self) -> bool { self.control & 0x04 == 0x04 }
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Table of Contents.
///
/// The simple TOC: one descriptor per track plus the lead-out.
pub struct Toc {
	/// # Data Length.
	pub data_length: u16,

	/// # First Track.
	pub first_track: u8,

	/// # Last Track.
	pub last_track: u8,

	/// # Descriptors.
	pub descriptors: Vec<TocDescriptor>,
}

impl Toc {
	#[must_use]
	/// # Decode.
	///
	/// The declared data length plus its own two bytes must match the buffer
	/// exactly, and the remainder must hold whole 8-byte descriptors.
	pub fn decode(buf: &[u8]) -> Option<Self> {
		let (data_length, first_track, last_track, descriptors) = decode_common(buf, "TOC")?;
		Some(Self { data_length, first_track, last_track, descriptors })
	}

	#[must_use]
	/// # Lead-out.
	pub fn leadout(&self) -> Option<&TocDescriptor> {
		self.descriptors.iter().find(|d| d.track == LEADOUT_TRACK)
	}
}

impl fmt::Display for Toc {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_field(f, "First track:", self.first_track)?;
		write_field(f, "Last track:", self.last_track)?;
		for d in &self.descriptors {
			let label =
				if d.track == LEADOUT_TRACK { "Lead-out".to_owned() }
				else { format!("Track {}", d.track) };
			writeln!(
				f,
				"{label:<10} starts at LBA {:<8} {} (ADR {}, CONTROL {:#06b})",
				d.lba(),
				if d.is_data() { "data" } else { "audio" },
				d.adr,
				d.control,
			)?;
			if d.control & 0x02 == 0x02 { writeln!(f, "           digital copy permitted")?; }
			if d.control & 0x01 == 0x01 {
				if d.is_data() { writeln!(f, "           recorded incrementally")?; }
				else { writeln!(f, "           has pre-emphasis")?; }
			}
			if d.control & 0x08 == 0x08 { writeln!(f, "           four channel")?; }
		}
		Ok(())
	}
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Session Info.
///
/// READ TOC format 0001b: the first and last complete session numbers, and
/// the first track of the last session.
pub struct SessionInfo {
	/// # Data Length.
	pub data_length: u16,

	/// # First Complete Session.
	pub first_session: u8,

	/// # Last Complete Session.
	pub last_session: u8,

	/// # First Track In Last Session.
	pub track: TocDescriptor,
}

impl SessionInfo {
	#[must_use]
	/// # Decode.
	pub fn decode(buf: &[u8]) -> Option<Self> {
		let (data_length, first_session, last_session, descriptors) = decode_common(buf, "session info")?;
		let [track] = <[TocDescriptor; 1]>::try_from(descriptors).ok()?;
		Some(Self { data_length, first_session, last_session, track })
	}
}

impl fmt::Display for SessionInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_field(f, "First complete session:", self.first_session)?;
		write_field(f, "Last complete session:", self.last_session)?;
		write_field(f, "First track in last session:", self.track.track)?;
		write_field(f, "Starts at LBA:", self.track.lba())
	}
}



/// # Decode Header and Descriptors.
fn decode_common(buf: &[u8], label: &str) -> Option<(u16, u8, u8, Vec<TocDescriptor>)> {
	let cur = BeCursor::new(buf);
	let data_length = cur.u16(0)?;
	if cur.len() < 4 || usize::from(data_length) + 2 != cur.len() {
		log::debug!("Bad {label} length: declared {data_length}, got {}.", cur.len());
		return None;
	}
	if (cur.len() - 4) % DESCRIPTOR_LEN != 0 {
		log::debug!("Bad {label} length: {} is not a whole number of descriptors.", cur.len());
		return None;
	}

	let descriptors = (4..cur.len())
		.step_by(DESCRIPTOR_LEN)
		.map(|idx| TocDescriptor::decode(&cur, idx))
		.collect::<Option<Vec<_>>>()?;

	Some((data_length, cur.u8(2)?, cur.u8(3)?, descriptors))
}



#[cfg(test)]
pub(crate) mod test {
	use super::*;

	/// # Encode (Test Helper).
	pub(crate) fn encode(first: u8, last: u8, entries: &[(u8, u8, i32)]) -> Vec<u8> {
		let mut out = Vec::new();
		let len = u16::try_from(2 + entries.len() * DESCRIPTOR_LEN).expect("TOC too big.");
		out.extend_from_slice(&len.to_be_bytes());
		out.push(first);
		out.push(last);
		for &(track, control, lba) in entries {
			out.extend_from_slice(&[0, 0x10 | control, track, 0]);
			out.extend_from_slice(&lba.to_be_bytes());
		}
		out
	}

	#[test]
	fn t_toc() {
		let raw = encode(1, 2, &[(1, 0, 0), (2, 4, 12_000), (LEADOUT_TRACK, 4, 20_000)]);
		let toc = Toc::decode(&raw).expect("Failed to decode TOC.");
		assert_eq!(toc.first_track, 1);
		assert_eq!(toc.last_track, 2);
		assert_eq!(toc.descriptors.len(), 3);
		assert!(toc.descriptors[1].is_data(), "Track 2 should be data.");
		assert_eq!(toc.descriptors[1].adr, 1);
		assert_eq!(toc.leadout().map(TocDescriptor::lba), Some(20_000));

		let pretty = toc.to_string();
		assert!(pretty.contains("Track 2"), "Missing track line.");
		assert!(pretty.contains("Lead-out"), "Missing lead-out line.");
		assert!(pretty.contains("12000"), "Missing track start.");
	}

	#[test]
	fn t_toc_malformed() {
		assert!(Toc::decode(&[]).is_none());
		assert!(Toc::decode(&[0]).is_none());

		let mut raw = encode(1, 1, &[(1, 0, 0), (LEADOUT_TRACK, 0, 100)]);
		raw.truncate(raw.len() - 3);
		assert!(Toc::decode(&raw).is_none(), "Truncated TOC decoded anyway.");

		// Length matches, but the descriptor is partial.
		let raw = [0, 5, 1, 1, 0, 0, 0];
		assert!(Toc::decode(&raw).is_none(), "Partial descriptor decoded anyway.");
	}

	#[test]
	fn t_session_info() {
		let raw = encode(1, 2, &[(5, 0, 30_000)]);
		let info = SessionInfo::decode(&raw).expect("Failed to decode session info.");
		assert_eq!(info.last_session, 2);
		assert_eq!(info.track.track, 5);
		assert_eq!(info.track.lba(), 30_000);
		assert!(info.to_string().contains("30000"));

		let raw = encode(1, 2, &[(5, 0, 30_000), (6, 0, 31_000)]);
		assert!(SessionInfo::decode(&raw).is_none(), "Two descriptors should fail.");
	}
}
