/*!
# Disc Dump: ATIP

READ TOC/PMA/ATIP format 0100b, recordable media only.
*/

use super::{
	BeCursor,
	msf_to_lba,
	write_field,
};
use std::fmt;



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # ATIP.
pub struct Atip {
	/// # Data Length.
	pub data_length: u16,

	/// # Reserved (bytes 2-3).
	pub reserved1: [u8; 2],

	/// # Always One (byte 4 bit 7).
	pub one1: bool,

	/// # Indicative Target Writing Power (byte 4 bits 6-4).
	pub itwp: u8,

	/// # Double-Density CD (byte 4 bit 3).
	pub ddcd: bool,

	/// # Reference Speed (byte 4 bits 2-0).
	pub reference_speed: u8,

	/// # Unrestricted Use (byte 5 bit 6).
	pub uru: bool,

	/// # Always One (byte 6 bit 7).
	pub one2: bool,

	/// # Disc Type, `true` for rewritable (byte 6 bit 6).
	pub disc_type: bool,

	/// # Disc Sub-type (byte 6 bits 5-3).
	pub disc_subtype: u8,

	/// # A1 Valid (byte 6 bit 2).
	pub a1_valid: bool,

	/// # A2 Valid (byte 6 bit 1).
	pub a2_valid: bool,

	/// # A3 Valid (byte 6 bit 0).
	pub a3_valid: bool,

	/// # Lead-in Start (M, S, F).
	pub lead_in_start: [u8; 3],

	/// # Last Possible Lead-out Start (M, S, F).
	pub lead_out_start: [u8; 3],

	/// # A1 Values.
	pub a1: [u8; 3],

	/// # A2 Values.
	pub a2: [u8; 3],

	/// # A3 Values.
	pub a3: [u8; 3],

	/// # S4 Values.
	///
	/// Only present in 32-byte responses.
	pub s4: Option<[u8; 3]>,
}

impl Atip {
	#[must_use]
	/// # Decode.
	///
	/// The response is either 28 or 32 bytes, the latter including S4.
	pub fn decode(buf: &[u8]) -> Option<Self> {
		let cur = BeCursor::new(buf);
		if cur.len() != 28 && cur.len() != 32 {
			log::debug!("Bad ATIP length: {}.", cur.len());
			return None;
		}

		let b4 = cur.u8(4)?;
		let b5 = cur.u8(5)?;
		let b6 = cur.u8(6)?;

		Some(Self {
			data_length: cur.u16(0)?,
			reserved1: cur.array::<2>(2)?,
			one1: b4 & 0x80 == 0x80,
			itwp: (b4 & 0x70) >> 4,
			ddcd: b4 & 0x08 == 0x08,
			reference_speed: b4 & 0x07,
			uru: b5 & 0x40 == 0x40,
			one2: b6 & 0x80 == 0x80,
			disc_type: b6 & 0x40 == 0x40,
			disc_subtype: (b6 & 0x38) >> 3,
			a1_valid: b6 & 0x04 == 0x04,
			a2_valid: b6 & 0x02 == 0x02,
			a3_valid: b6 & 0x01 == 0x01,
			lead_in_start: cur.array::<3>(8)?,
			lead_out_start: cur.array::<3>(12)?,
			a1: cur.array::<3>(16)?,
			a2: cur.array::<3>(20)?,
			a3: cur.array::<3>(24)?,
			s4: if cur.len() == 32 { cur.array::<3>(28) } else { None },
		})
	}

	#[must_use]
	/// # Maximum Capacity.
	///
	/// The last possible lead-out start, as an LBA.
	pub const fn lead_out_lba(&self) -> i32 {
		msf_to_lba(self.lead_out_start[0], self.lead_out_start[1], self.lead_out_start[2])
	}
}

impl fmt::Display for Atip {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_field(f, "Disc type:", if self.disc_type { "CD-RW" } else { "CD-R" })?;
		write_field(f, "Disc sub-type:", self.disc_subtype)?;
		write_field(f, "Indicative target writing power:", self.itwp)?;
		write_field(f, "Reference speed:", self.reference_speed)?;
		if self.ddcd { writeln!(f, "Disc is a double-density CD")?; }
		write_field(f, "Unrestricted use:", if self.uru { "yes" } else { "no" })?;

		let [m, s, fr] = self.lead_in_start;
		write_field(f, "Lead-in starts at:", format_args!("{m:02}:{s:02}:{fr:02}"))?;
		let [m, s, fr] = self.lead_out_start;
		write_field(f, "Last possible lead-out:", format_args!("{m:02}:{s:02}:{fr:02} (LBA {})", self.lead_out_lba()))?;

		if self.a1_valid {
			write_field(f, "A1 values:", format_args!("{:02X} {:02X} {:02X}", self.a1[0], self.a1[1], self.a1[2]))?;
		}
		if self.a2_valid {
			write_field(f, "A2 values:", format_args!("{:02X} {:02X} {:02X}", self.a2[0], self.a2[1], self.a2[2]))?;
		}
		if self.a3_valid {
			write_field(f, "A3 values:", format_args!("{:02X} {:02X} {:02X}", self.a3[0], self.a3[1], self.a3[2]))?;
		}
		if let Some(s4) = self.s4 {
			write_field(f, "S4 values:", format_args!("{:02X} {:02X} {:02X}", s4[0], s4[1], s4[2]))?;
		}
		Ok(())
	}
}



#[cfg(test)]
mod test {
	use super::*;

	fn sample(len: usize) -> Vec<u8> {
		let mut raw = vec![0_u8; len];
		let declared = u16::try_from(len - 2).expect("Bad length.");
		raw[..2].copy_from_slice(&declared.to_be_bytes());
		raw[4] = 0b1101_1010; // one, ITWP 5, DDCD, speed 2.
		raw[5] = 0x40;
		raw[6] = 0b1110_1101; // one, RW, sub-type 5, A1 + A3.
		raw[8..11].copy_from_slice(&[97, 26, 66]);
		raw[12..15].copy_from_slice(&[79, 59, 74]);
		raw[16..19].copy_from_slice(&[0xA1, 0xA2, 0xA3]);
		raw[24..27].copy_from_slice(&[0xC1, 0xC2, 0xC3]);
		if len == 32 { raw[28..31].copy_from_slice(&[0x51, 0x52, 0x53]); }
		raw
	}

	#[test]
	fn t_atip() {
		let atip = Atip::decode(&sample(28)).expect("Failed to decode ATIP.");
		assert!(atip.one1 && atip.one2, "Marker bits lost.");
		assert_eq!(atip.itwp, 5);
		assert!(atip.ddcd);
		assert_eq!(atip.reference_speed, 2);
		assert!(atip.uru);
		assert!(atip.disc_type);
		assert_eq!(atip.disc_subtype, 5);
		assert!(atip.a1_valid && ! atip.a2_valid && atip.a3_valid, "Valid bits wrong.");
		assert_eq!(atip.lead_in_start, [97, 26, 66]);
		assert_eq!(atip.lead_out_lba(), 359_849);
		assert!(atip.s4.is_none(), "28-byte ATIP has no S4.");

		let pretty = atip.to_string();
		assert!(pretty.contains("CD-RW"));
		assert!(pretty.contains("A1 values:"));
		assert!(! pretty.contains("A2 values:"), "A2 should be hidden.");
		assert!(pretty.contains("C1 C2 C3"));

		let atip = Atip::decode(&sample(32)).expect("Failed to decode long ATIP.");
		assert_eq!(atip.s4, Some([0x51, 0x52, 0x53]));
		assert!(atip.to_string().contains("S4 values:"));
	}

	#[test]
	fn t_atip_malformed() {
		assert!(Atip::decode(&[]).is_none());
		assert!(Atip::decode(&[0]).is_none());
		assert!(Atip::decode(&sample(32)[..30]).is_none(), "Truncated ATIP decoded anyway.");
	}
}
