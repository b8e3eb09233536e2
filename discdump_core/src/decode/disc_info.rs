/*!
# Disc Dump: Disc Information

READ DISC INFORMATION, all three data types.
*/

use super::{
	BeCursor,
	hex,
	write_field,
};
use std::fmt;



/// # Standard Header Size.
const STANDARD_LEN: usize = 34;

/// # OPC Table Size.
const OPC_LEN: usize = 8;

/// # Track Resources Size.
const TRACK_RESOURCES_LEN: usize = 12;

/// # POW Resources Size.
const POW_RESOURCES_LEN: usize = 16;



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Disc Information.
///
/// The response layout depends on the data type in byte 2, bits 7-5.
pub enum DiscInformation {
	/// # Standard (000b).
	Standard(StandardDiscInformation),

	/// # Track Resources (001b).
	TrackResources(TrackResources),

	/// # POW Resources (010b).
	PowResources(PowResources),
}

impl DiscInformation {
	#[must_use]
	/// # Decode.
	pub fn decode(buf: &[u8]) -> Option<Self> {
		let cur = BeCursor::new(buf);
		let declared = usize::from(cur.u16(0)?) + 2;
		if declared > cur.len() {
			log::debug!("Disc information is truncated: declared {declared}, got {}.", cur.len());
			return None;
		}

		// Ignore anything past the declared length.
		let cur = BeCursor::new(cur.slice(0, declared)?);
		match (cur.u8(2)? & 0xE0) >> 5 {
			0b000 => StandardDiscInformation::decode(&cur).map(Self::Standard),
			0b001 => TrackResources::decode(&cur).map(Self::TrackResources),
			0b010 => PowResources::decode(&cur).map(Self::PowResources),
			other => {
				log::debug!("Unknown disc information type {other}.");
				None
			},
		}
	}
}

impl fmt::Display for DiscInformation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Standard(v) => fmt::Display::fmt(v, f),
			Self::TrackResources(v) => fmt::Display::fmt(v, f),
			Self::PowResources(v) => fmt::Display::fmt(v, f),
		}
	}
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # OPC Table Entry.
pub struct OpcTable {
	/// # Speed (kB/s).
	pub speed: u16,

	/// # OPC Values.
	pub values: [u8; 6],
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Standard Disc Information.
pub struct StandardDiscInformation {
	/// # Data Length.
	pub data_length: u16,

	/// # Erasable (byte 2 bit 4).
	pub erasable: bool,

	/// # State of Last Session (byte 2 bits 3-2).
	pub last_session_status: u8,

	/// # Disc Status (byte 2 bits 1-0).
	pub disc_status: u8,

	/// # First Track Number.
	pub first_track: u8,

	/// # Number of Sessions.
	pub sessions: u16,

	/// # First Track in Last Session.
	pub first_track_last_session: u16,

	/// # Last Track in Last Session.
	pub last_track_last_session: u16,

	/// # Disc ID Valid (byte 7 bit 7).
	pub did_v: bool,

	/// # Bar Code Valid (byte 7 bit 6).
	pub dbc_v: bool,

	/// # Unrestricted Use (byte 7 bit 5).
	pub uru: bool,

	/// # Application Code Valid (byte 7 bit 4).
	pub dac_v: bool,

	/// # Reserved (byte 7 bit 3).
	pub reserved: bool,

	/// # Dirty Bit (byte 7 bit 2).
	pub dbit: bool,

	/// # Background Format Status (byte 7 bits 1-0).
	pub bg_format_status: u8,

	/// # Disc Type.
	pub disc_type: u8,

	/// # Disc Identification.
	pub disc_id: u32,

	/// # Last Session Lead-in Start.
	pub last_lead_in: u32,

	/// # Last Possible Lead-out Start.
	pub last_lead_out: u32,

	/// # Disc Bar Code.
	pub barcode: u64,

	/// # Disc Application Code.
	pub application_code: u8,

	/// # OPC Tables.
	pub opc_tables: Vec<OpcTable>,
}

impl StandardDiscInformation {
	/// # Decode.
	fn decode(cur: &BeCursor) -> Option<Self> {
		if cur.len() < STANDARD_LEN {
			log::debug!("Standard disc information too short: {}.", cur.len());
			return None;
		}

		let b2 = cur.u8(2)?;
		let b7 = cur.u8(7)?;

		// The table count is untrusted; stop at the buffer.
		let opc_count = usize::from(cur.u8(33)?);
		let mut opc_tables = Vec::with_capacity(opc_count.min(32));
		let mut offset = STANDARD_LEN;
		for _ in 0..opc_count {
			let Some(speed) = cur.u16(offset) else { break; };
			let Some(values) = cur.array::<6>(offset + 2) else { break; };
			opc_tables.push(OpcTable { speed, values });
			offset += OPC_LEN;
		}

		Some(Self {
			data_length: cur.u16(0)?,
			erasable: b2 & 0x10 == 0x10,
			last_session_status: (b2 & 0x0C) >> 2,
			disc_status: b2 & 0x03,
			first_track: cur.u8(3)?,
			sessions: u16::from_be_bytes([cur.u8(9)?, cur.u8(4)?]),
			first_track_last_session: u16::from_be_bytes([cur.u8(10)?, cur.u8(5)?]),
			last_track_last_session: u16::from_be_bytes([cur.u8(11)?, cur.u8(6)?]),
			did_v: b7 & 0x80 == 0x80,
			dbc_v: b7 & 0x40 == 0x40,
			uru: b7 & 0x20 == 0x20,
			dac_v: b7 & 0x10 == 0x10,
			reserved: b7 & 0x08 == 0x08,
			dbit: b7 & 0x04 == 0x04,
			bg_format_status: b7 & 0x03,
			disc_type: cur.u8(8)?,
			disc_id: cur.u32(12)?,
			last_lead_in: cur.u32(16)?,
			last_lead_out: cur.u32(20)?,
			barcode: cur.u64(24)?,
			application_code: cur.u8(32)?,
			opc_tables,
		})
	}
}

impl fmt::Display for StandardDiscInformation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_field(f, "Disc status:", match self.disc_status {
			0 => "empty",
			1 => "incomplete",
			2 => "finalized",
			_ => "other",
		})?;
		write_field(f, "Last session status:", match self.last_session_status {
			0 => "empty",
			1 => "incomplete",
			2 => "reserved/damaged",
			_ => "complete",
		})?;
		if self.erasable { writeln!(f, "Disc is erasable")?; }
		write_field(f, "First track on disc:", self.first_track)?;
		write_field(f, "Sessions:", self.sessions)?;
		write_field(f, "First track in last session:", self.first_track_last_session)?;
		write_field(f, "Last track in last session:", self.last_track_last_session)?;
		write_field(f, "Disc type:", match self.disc_type {
			0x00 => "CD-DA or CD-ROM",
			0x10 => "CD-i",
			0x20 => "CD-ROM XA",
			0xFF => "undefined",
			_ => "reserved",
		})?;
		if self.uru { writeln!(f, "Disc is for unrestricted use")?; }
		if self.dbit { writeln!(f, "Disc is dirty")?; }
		if self.bg_format_status != 0 {
			write_field(f, "Background format status:", self.bg_format_status)?;
		}
		if self.did_v { write_field(f, "Disc ID:", format_args!("{:#010X}", self.disc_id))?; }
		if self.dbc_v { write_field(f, "Disc bar code:", format_args!("{:#018X}", self.barcode))?; }
		if self.dac_v { write_field(f, "Disc application code:", self.application_code)?; }
		write_field(f, "Last session lead-in:", format_args!("{:#010X}", self.last_lead_in))?;
		write_field(f, "Last possible lead-out:", format_args!("{:#010X}", self.last_lead_out))?;
		for opc in &self.opc_tables {
			write_field(f, "OPC:", format_args!("{} kB/s, {}", opc.speed, hex(&opc.values)))?;
		}
		Ok(())
	}
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Track Resources.
pub struct TrackResources {
	/// # Data Length.
	pub data_length: u16,

	/// # Maximum Possible Tracks.
	pub max_tracks: u16,

	/// # Assigned Tracks.
	pub assigned_tracks: u16,

	/// # Maximum Appendable Tracks.
	pub max_appendable_tracks: u16,

	/// # Current Appendable Tracks.
	pub appendable_tracks: u16,
}

impl TrackResources {
	/// # Decode.
	fn decode(cur: &BeCursor) -> Option<Self> {
		if cur.len() != TRACK_RESOURCES_LEN {
			log::debug!("Bad track resources length: {}.", cur.len());
			return None;
		}
		Some(Self {
			data_length: cur.u16(0)?,
			max_tracks: cur.u16(4)?,
			assigned_tracks: cur.u16(6)?,
			max_appendable_tracks: cur.u16(8)?,
			appendable_tracks: cur.u16(10)?,
		})
	}
}

impl fmt::Display for TrackResources {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_field(f, "Maximum tracks:", self.max_tracks)?;
		write_field(f, "Assigned tracks:", self.assigned_tracks)?;
		write_field(f, "Maximum appendable tracks:", self.max_appendable_tracks)?;
		write_field(f, "Current appendable tracks:", self.appendable_tracks)
	}
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # POW Resources.
pub struct PowResources {
	/// # Data Length.
	pub data_length: u16,

	/// # Remaining Replacements.
	pub remaining_replacements: u32,

	/// # Remaining Map Entries.
	pub remaining_map_entries: u32,

	/// # Remaining Updates.
	pub remaining_updates: u32,
}

impl PowResources {
	/// # Decode.
	fn decode(cur: &BeCursor) -> Option<Self> {
		if cur.len() != POW_RESOURCES_LEN {
			log::debug!("Bad POW resources length: {}.", cur.len());
			return None;
		}
		Some(Self {
			data_length: cur.u16(0)?,
			remaining_replacements: cur.u32(4)?,
			remaining_map_entries: cur.u32(8)?,
			remaining_updates: cur.u32(12)?,
		})
	}
}

impl fmt::Display for PowResources {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_field(f, "Remaining POW replacements:", self.remaining_replacements)?;
		write_field(f, "Remaining POW map entries:", self.remaining_map_entries)?;
		write_field(f, "Remaining POW updates:", self.remaining_updates)
	}
}



#[cfg(test)]
mod test {
	use super::*;

	fn standard(opc: &[(u16, [u8; 6])], declared_opc: u8) -> Vec<u8> {
		let mut raw = vec![0_u8; STANDARD_LEN];
		raw[2] = 0b0001_1110; // Erasable, complete, finalized.
		raw[3] = 1;
		raw[4] = 2;
		raw[5] = 7;
		raw[6] = 9;
		raw[7] = 0b1100_0101;
		raw[8] = 0x20;
		raw[9] = 1;
		raw[12..16].copy_from_slice(&0xDEAD_BEEF_u32.to_be_bytes());
		raw[24..32].copy_from_slice(&0x0123_4567_89AB_CDEF_u64.to_be_bytes());
		raw[33] = declared_opc;
		for (speed, values) in opc {
			raw.extend_from_slice(&speed.to_be_bytes());
			raw.extend_from_slice(values);
		}
		let len = u16::try_from(raw.len() - 2).expect("Too long.");
		raw[..2].copy_from_slice(&len.to_be_bytes());
		raw
	}

	#[test]
	fn t_standard() {
		let raw = standard(&[(1764, [1, 2, 3, 4, 5, 6]), (3528, [7, 8, 9, 10, 11, 12])], 2);
		let Some(DiscInformation::Standard(info)) = DiscInformation::decode(&raw) else {
			panic!("Failed to decode standard disc information.");
		};
		assert!(info.erasable);
		assert_eq!(info.last_session_status, 3);
		assert_eq!(info.disc_status, 2);
		assert_eq!(info.sessions, 0x0102, "Session MSB/LSB mixup.");
		assert_eq!(info.first_track_last_session, 7);
		assert_eq!(info.last_track_last_session, 9);
		assert!(info.did_v && info.dbc_v && ! info.uru && ! info.dac_v, "Byte 7 flags wrong.");
		assert!(info.dbit);
		assert_eq!(info.bg_format_status, 1);
		assert_eq!(info.disc_id, 0xDEAD_BEEF);
		assert_eq!(info.barcode, 0x0123_4567_89AB_CDEF);
		assert_eq!(info.opc_tables.len(), 2);
		assert_eq!(info.opc_tables[1].speed, 3528);

		let pretty = info.to_string();
		assert!(pretty.contains("CD-ROM XA"));
		assert!(pretty.contains("0xDEADBEEF"));
		assert!(pretty.contains("3528 kB/s"));
		assert!(pretty.contains("Disc is dirty"));
	}

	#[test]
	fn t_standard_opc_overrun() {
		// Claims five tables but carries one.
		let raw = standard(&[(1764, [1, 2, 3, 4, 5, 6])], 5);
		let Some(DiscInformation::Standard(info)) = DiscInformation::decode(&raw) else {
			panic!("Failed to decode standard disc information.");
		};
		assert_eq!(info.opc_tables.len(), 1, "OPC loop read past the buffer.");
	}

	#[test]
	fn t_resources() {
		let mut raw = vec![0, 10, 0x20, 0, 0, 99, 0, 3, 0, 96, 0, 95];
		let Some(DiscInformation::TrackResources(res)) = DiscInformation::decode(&raw) else {
			panic!("Failed to decode track resources.");
		};
		assert_eq!(res.max_tracks, 99);
		assert_eq!(res.assigned_tracks, 3);
		assert_eq!(res.appendable_tracks, 95);
		assert!(res.to_string().contains("Assigned tracks:"));

		raw = vec![0, 14, 0x40, 0, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3];
		let Some(DiscInformation::PowResources(res)) = DiscInformation::decode(&raw) else {
			panic!("Failed to decode POW resources.");
		};
		assert_eq!(res.remaining_replacements, 1);
		assert_eq!(res.remaining_updates, 3);
	}

	#[test]
	fn t_malformed() {
		assert!(DiscInformation::decode(&[]).is_none());
		assert!(DiscInformation::decode(&[0]).is_none());

		let raw = standard(&[], 0);
		assert!(DiscInformation::decode(&raw[..20]).is_none(), "Truncated disc information decoded anyway.");

		// Declared length is fine, but too short for the standard layout.
		assert!(DiscInformation::decode(&[0, 2, 0, 0]).is_none());
	}
}
