/*!
# Disc Dump: Full TOC

READ TOC/PMA/ATIP format 0010b: the raw Q sub-channel lead-in entries for
every session.
*/

use super::{
	BeCursor,
	hmsf_to_lba,
	previous_frame,
	write_field,
};
use std::fmt;



/// # Descriptor Size.
const DESCRIPTOR_LEN: usize = 11;

/// # POINT: First Track.
pub const POINT_FIRST_TRACK: u8 = 0xA0;

/// # POINT: Last Track.
pub const POINT_LAST_TRACK: u8 = 0xA1;

/// # POINT: Lead-out Start.
pub const POINT_LEADOUT: u8 = 0xA2;

/// # A0 PSEC: CD-i.
pub const DISC_TYPE_CDI: u8 = 0x10;

/// # A0 PSEC: CD-ROM XA.
pub const DISC_TYPE_CDROM_XA: u8 = 0x20;



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Full TOC Descriptor.
pub struct FullTocDescriptor {
	/// # Session Number.
	pub session: u8,

	/// # ADR.
	pub adr: u8,

	/// # CONTROL.
	pub control: u8,

	/// # TNO.
	pub tno: u8,

	/// # POINT.
	pub point: u8,

	/// # Minute.
	pub min: u8,

	/// # Second.
	pub sec: u8,

	/// # Frame.
	pub frame: u8,

	/// # Zero Byte.
	///
	/// On high-capacity discs the nibbles hold HOUR and PHOUR.
	pub zero: u8,

	/// # PMIN.
	pub pmin: u8,

	/// # PSEC.
	pub psec: u8,

	/// # PFRAME.
	pub pframe: u8,
}

impl FullTocDescriptor {
	/// # Decode One.
	fn decode(cur: &BeCursor, idx: usize) -> Option<Self> {
		let [session, adr_control, tno, point, min, sec, frame, zero, pmin, psec, pframe] =
			cur.array::<DESCRIPTOR_LEN>(idx)?;
		Some(Self {
			session,
			adr: adr_control >> 4,
			control: adr_control & 0x0F,
			tno,
			point,
			min,
			sec,
			frame,
			zero,
			pmin,
			psec,
			pframe,
		})
	}

	#[must_use]
	/// # HOUR.
	pub const fn hour(&self) -> u8 { self.zero >> 4 }

	#[must_use]
	/// # PHOUR.
	pub const fn phour(&self) -> u8 { self.zero & 0x0F }

	#[must_use]
	/// # POINT Address.
	///
	/// Return the PHOUR/PMIN/PSEC/PFRAME position as an LBA.
	pub const fn point_lba(&self) -> i32 {
		hmsf_to_lba(self.phour(), self.pmin, self.psec, self.pframe)
	}

	#[must_use]
	/// # Last Sector Before POINT.
	///
	/// For an A2 entry this is the final sector of the session's program area.
	pub const fn point_lba_minus_one(&self) -> i32 {
		let (h, m, s, f) = previous_frame(self.phour(), self.pmin, self.psec, self.pframe);
		hmsf_to_lba(h, m, s, f)
	}

	#[must_use]
	/// # Track Entry?
	pub const fn is_track(&self) -> bool {
		matches!(self.adr, 1 | 4) && 0x01 <= self.point && self.point <= 0x63
	}

	#[must_use]
	/// # Data Track?
	///
	/// Data tracks have CONTROL `01x0b` (masked with `0x0D`, that's 4 or 5).
	pub const fn is_data(&self) -> bool { matches!(self.control & 0x0D, 4 | 5) }
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Full TOC.
pub struct FullToc {
	/// # Data Length.
	pub data_length: u16,

	/// # First Complete Session.
	pub first_session: u8,

	/// # Last Complete Session.
	pub last_session: u8,

	/// # Descriptors.
	pub descriptors: Vec<FullTocDescriptor>,
}

impl FullToc {
	#[must_use]
	/// # Decode.
	pub fn decode(buf: &[u8]) -> Option<Self> {
		let cur = BeCursor::new(buf);
		let data_length = cur.u16(0)?;
		if cur.len() < 4 || usize::from(data_length) + 2 != cur.len() {
			log::debug!("Bad Full TOC length: declared {data_length}, got {}.", cur.len());
			return None;
		}
		if (cur.len() - 4) % DESCRIPTOR_LEN != 0 {
			log::debug!("Bad Full TOC length: {} is not a whole number of descriptors.", cur.len());
			return None;
		}

		let descriptors = (4..cur.len())
			.step_by(DESCRIPTOR_LEN)
			.map(|idx| FullTocDescriptor::decode(&cur, idx))
			.collect::<Option<Vec<_>>>()?;

		Some(Self {
			data_length,
			first_session: cur.u8(2)?,
			last_session: cur.u8(3)?,
			descriptors,
		})
	}

	#[must_use]
	/// # Sorted Descriptors.
	///
	/// Return the descriptors ordered by session, then POINT.
	pub fn sorted(&self) -> Vec<FullTocDescriptor> {
		let mut out = self.descriptors.clone();
		out.sort_by_key(|d| (d.session, d.point));
		out
	}
}

impl fmt::Display for FullToc {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_field(f, "First complete session:", self.first_session)?;
		write_field(f, "Last complete session:", self.last_session)?;

		let mut session = 0;
		for d in self.sorted() {
			if d.session != session {
				session = d.session;
				writeln!(f, "Session {session}")?;
			}

			match (d.adr, d.point) {
				(1 | 4, 0x01..=0x63) => writeln!(
					f,
					"  Track {:>2} starts at {:02}:{:02}:{:02}:{:02} (LBA {}), {}{}{}",
					d.point,
					d.phour(), d.pmin, d.psec, d.pframe,
					d.point_lba(),
					if d.is_data() { "data" } else { "audio" },
					if d.control & 0x02 == 0x02 { ", copy permitted" } else { "" },
					if ! d.is_data() && d.control & 0x01 == 0x01 { ", pre-emphasis" } else { "" },
				)?,
				(1 | 4, POINT_FIRST_TRACK) => writeln!(
					f,
					"  First track {}, disc type {}",
					d.pmin,
					match d.psec {
						0x00 => "CD-DA or CD-ROM",
						DISC_TYPE_CDI => "CD-i",
						DISC_TYPE_CDROM_XA => "CD-ROM XA",
						_ => "unknown",
					},
				)?,
				(1 | 4, POINT_LAST_TRACK) => writeln!(f, "  Last track {}", d.pmin)?,
				(1 | 4, POINT_LEADOUT) => writeln!(
					f,
					"  Lead-out starts at {:02}:{:02}:{:02}:{:02} (LBA {})",
					d.phour(), d.pmin, d.psec, d.pframe,
					d.point_lba(),
				)?,
				(5, 0xB0) => writeln!(
					f,
					"  Next program area at {:02}:{:02}:{:02}, {} mode-5 pointers, maximum lead-out {:02}:{:02}:{:02}",
					d.min, d.sec, d.frame,
					d.zero,
					d.pmin, d.psec, d.pframe,
				)?,
				(5, 0xB1) => writeln!(f, "  {} skipped interval pointers, {} skipped track pointers", d.pmin, d.psec)?,
				(5, 0xC0) => writeln!(
					f,
					"  ATIP values {:02X} {:02X} {:02X}, first lead-in at {:02}:{:02}:{:02}",
					d.min, d.sec, d.frame,
					d.pmin, d.psec, d.pframe,
				)?,
				(5, 0xC1) => writeln!(f, "  Copy of additional ATIP information")?,
				(2, _) => writeln!(f, "  Media catalogue number entry")?,
				(adr, point) => writeln!(f, "  Unhandled entry: ADR {adr}, POINT {point:#04X}")?,
			}
		}

		Ok(())
	}
}
