/*!
# Disc Dump: Blu-ray Structures

READ DISC STRUCTURE responses for BD media: Disc Information (0x00), BCA
(0x03), Disc Definition Structure (0x08), Cartridge Status (0x0A) and Spare
Area Information (0x12).
*/

use super::{
	BeCursor,
	hex,
	write_field,
};
use std::fmt;



/// # DI Response Size.
const DI_LEN: usize = 4100;

/// # DI Unit Signature ("DI").
pub const DI_SIGNATURE: u16 = 0x4449;

/// # DI Unit Header Size.
const DI_UNIT_HEADER_LEN: usize = 12;

/// # DDS Signature ("DS").
pub const DDS_SIGNATURE: u16 = 0x4453;

/// # DDS Minimum Size.
const DDS_MIN_LEN: usize = 100;

/// # BCA Size.
const BCA_LEN: usize = 68;

/// # Cartridge Status Size.
const CARTRIDGE_LEN: usize = 8;

/// # Spare Area Size.
const SPARE_LEN: usize = 16;



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Disc Information Unit.
pub struct DiUnit {
	/// # Signature.
	pub signature: u16,

	/// # Format.
	pub format: u8,

	/// # Units Per Block (byte 3 bits 7-3).
	pub units_per_block: u8,

	/// # Layer (byte 3 bits 2-0).
	pub layer: u8,

	/// # Legacy.
	pub legacy: u8,

	/// # Sequence Number.
	pub sequence: u8,

	/// # Continuation Flag (byte 6 bit 7).
	pub continuation: bool,

	/// # Unit Length (byte 6 bits 6-0).
	pub length: u8,

	/// # Reserved (byte 7).
	pub reserved: u8,

	/// # Disc Type Identifier.
	pub disc_type: [u8; 3],

	/// # Size (byte 11 bits 7-6).
	pub size: u8,

	/// # Class (byte 11 bits 5-4).
	pub class: u8,

	/// # Version (byte 11 bits 3-0).
	pub version: u8,

	/// # Format-Dependent Contents.
	pub format_dependent: Vec<u8>,

	/// # Manufacturer ID (recordable only).
	pub manufacturer_id: Option<[u8; 6]>,

	/// # Media Type ID (recordable only).
	pub media_type_id: Option<[u8; 3]>,

	/// # Time Stamp (recordable only).
	pub timestamp: Option<u16>,

	/// # Product Revision (recordable only).
	pub product_revision: Option<u8>,
}

impl DiUnit {
	/// # Decode One.
	///
	/// Returns the unit along with the number of bytes it occupies, or `None`
	/// if the signature is wrong or the declared length doesn't fit.
	fn decode(cur: &BeCursor, offset: usize) -> Option<Self> {
		let signature = cur.u16(offset)?;
		if signature != DI_SIGNATURE { return None; }

		let b3 = cur.u8(offset + 3)?;
		let b6 = cur.u8(offset + 6)?;
		let b11 = cur.u8(offset + 11)?;
		let length = b6 & 0x7F;

		// The length is untrusted; it must cover the header and fit.
		if usize::from(length) < DI_UNIT_HEADER_LEN {
			log::debug!("DI unit at {offset} has an impossible length ({length}).");
			return None;
		}
		let unit = cur.slice(offset, usize::from(length))?;
		let unit = BeCursor::new(unit);

		let disc_type = unit.array::<3>(8)?;
		let mut out = Self {
			signature,
			format: unit.u8(2)?,
			units_per_block: (b3 & 0xF8) >> 3,
			layer: b3 & 0x07,
			legacy: unit.u8(4)?,
			sequence: unit.u8(5)?,
			continuation: b6 & 0x80 == 0x80,
			length,
			reserved: unit.u8(7)?,
			disc_type,
			size: (b11 & 0xC0) >> 6,
			class: (b11 & 0x30) >> 4,
			version: b11 & 0x0F,
			format_dependent: Vec::new(),
			manufacturer_id: None,
			media_type_id: None,
			timestamp: None,
			product_revision: None,
		};

		match &disc_type {
			b"BDO" => {
				out.format_dependent = unit.slice(DI_UNIT_HEADER_LEN, 52)?.to_vec();
			},
			b"BDW" | b"BDR" => {
				out.format_dependent = unit.slice(DI_UNIT_HEADER_LEN, 88)?.to_vec();
				out.manufacturer_id = unit.array::<6>(100);
				out.media_type_id = unit.array::<3>(106);
				out.timestamp = unit.u16(109);
				out.product_revision = unit.u8(111);
			},
			_ => {
				out.format_dependent = unit.slice(DI_UNIT_HEADER_LEN, unit.len() - DI_UNIT_HEADER_LEN)?.to_vec();
			},
		}

		Some(out)
	}

	#[must_use]
	/// # Disc Type as Text.
	pub fn disc_type_str(&self) -> &str {
		match &self.disc_type {
			b"BDO" => "BD-ROM",
			b"BDW" => "BD-RE",
			b"BDR" => "BD-R",
			_ => "unknown",
		}
	}
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Blu-ray Disc Information.
pub struct BdDiscInformation {
	/// # Data Length.
	pub data_length: u16,

	/// # Reserved (bytes 2-3).
	pub reserved: [u8; 2],

	/// # Units.
	pub units: Vec<DiUnit>,
}

impl BdDiscInformation {
	#[must_use]
	/// # Decode.
	///
	/// Units are walked by their self-declared lengths. The walk stops at the
	/// first unit that is unsigned, too short, or would run past the buffer.
	pub fn decode(buf: &[u8]) -> Option<Self> {
		let cur = BeCursor::new(buf);
		if cur.len() != DI_LEN {
			log::debug!("Bad BD disc information length: {}.", cur.len());
			return None;
		}

		let mut units = Vec::new();
		let mut offset = 4;
		while offset < DI_LEN {
			let Some(unit) = DiUnit::decode(&cur, offset) else { break; };
			offset += usize::from(unit.length);
			units.push(unit);
		}

		if units.is_empty() {
			log::debug!("BD disc information has no units.");
			return None;
		}

		Some(Self {
			data_length: cur.u16(0)?,
			reserved: cur.array::<2>(2)?,
			units,
		})
	}
}

impl fmt::Display for BdDiscInformation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for unit in &self.units {
			writeln!(f, "DI unit {} ({})", unit.sequence, unit.disc_type_str())?;
			write_field(f, "  Format:", unit.format)?;
			write_field(f, "  Layer:", unit.layer)?;
			write_field(f, "  Units per block:", unit.units_per_block)?;
			write_field(f, "  Legacy:", unit.legacy)?;
			write_field(f, "  Length:", unit.length)?;
			if unit.continuation { writeln!(f, "  Continues in the next unit")?; }
			write_field(f, "  Size/class/version:", format_args!("{}/{}/{}", unit.size, unit.class, unit.version))?;
			if let Some(v) = unit.manufacturer_id {
				write_field(f, "  Manufacturer:", String::from_utf8_lossy(&v).trim_end_matches('\0'))?;
			}
			if let Some(v) = unit.media_type_id {
				write_field(f, "  Media type:", String::from_utf8_lossy(&v).trim_end_matches('\0'))?;
			}
			if let Some(v) = unit.timestamp { write_field(f, "  Timestamp:", v)?; }
			if let Some(v) = unit.product_revision { write_field(f, "  Product revision:", v)?; }
			write_field(f, "  Format-dependent contents:", hex(&unit.format_dependent))?;
		}
		Ok(())
	}
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Disc Definition Structure.
pub struct BdDds {
	/// # Data Length.
	pub data_length: u16,

	/// # Reserved (bytes 2-3).
	pub reserved1: [u8; 2],

	/// # Signature.
	pub signature: u16,

	/// # Format.
	pub format: u8,

	/// # Reserved (byte 7).
	pub reserved2: u8,

	/// # Update Count.
	pub update_count: u32,

	/// # Reserved (bytes 12-19).
	pub reserved3: [u8; 8],

	/// # Drive Area PSN.
	pub drive_area_psn: u32,

	/// # Reserved (bytes 24-27).
	pub reserved4: [u8; 4],

	/// # Defect List PSN.
	pub defect_list_psn: u32,

	/// # Reserved (bytes 32-35).
	pub reserved5: [u8; 4],

	/// # PSN of LSN Zero.
	pub psn_lsn_zero: u32,

	/// # Last User Area LSN.
	pub last_user_lsn: u32,

	/// # Inner Spare Area 0 Size.
	pub isa0: u32,

	/// # Outer Spare Area Size.
	pub osa: u32,

	/// # Inner Spare Area 1 Size.
	pub isa1: u32,

	/// # Spare Area Full Flags.
	pub spare_full: u8,

	/// # Reserved (byte 57).
	pub reserved6: u8,

	/// # Disc-Type-Specific Field 1.
	pub disc_field1: u8,

	/// # Reserved (byte 59).
	pub reserved7: u8,

	/// # Disc-Type-Specific Field 2.
	pub disc_field2: u32,

	/// # Reserved (bytes 64-67).
	pub reserved8: [u8; 4],

	/// # Status Bits.
	pub status_bits: [u8; 32],

	/// # Disc-Type-Specific Data.
	pub disc_data: Vec<u8>,
}

impl BdDds {
	#[must_use]
	/// # Decode.
	pub fn decode(buf: &[u8]) -> Option<Self> {
		let cur = BeCursor::new(buf);
		if cur.len() < DDS_MIN_LEN {
			log::debug!("BD DDS too short: {}.", cur.len());
			return None;
		}
		let data_length = cur.u16(0)?;
		if usize::from(data_length) + 2 > cur.len() {
			log::debug!("BD DDS is truncated: declared {data_length}, got {}.", cur.len());
			return None;
		}
		let signature = cur.u16(4)?;
		if signature != DDS_SIGNATURE {
			log::debug!("Bad BD DDS signature: {signature:#06X}.");
			return None;
		}

		Some(Self {
			data_length,
			reserved1: cur.array::<2>(2)?,
			signature,
			format: cur.u8(6)?,
			reserved2: cur.u8(7)?,
			update_count: cur.u32(8)?,
			reserved3: cur.array::<8>(12)?,
			drive_area_psn: cur.u32(20)?,
			reserved4: cur.array::<4>(24)?,
			defect_list_psn: cur.u32(28)?,
			reserved5: cur.array::<4>(32)?,
			psn_lsn_zero: cur.u32(36)?,
			last_user_lsn: cur.u32(40)?,
			isa0: cur.u32(44)?,
			osa: cur.u32(48)?,
			isa1: cur.u32(52)?,
			spare_full: cur.u8(56)?,
			reserved6: cur.u8(57)?,
			disc_field1: cur.u8(58)?,
			reserved7: cur.u8(59)?,
			disc_field2: cur.u32(60)?,
			reserved8: cur.array::<4>(64)?,
			status_bits: cur.array::<32>(68)?,
			disc_data: cur.slice(DDS_MIN_LEN, cur.len() - DDS_MIN_LEN)?.to_vec(),
		})
	}
}

impl fmt::Display for BdDds {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_field(f, "DDS format:", self.format)?;
		write_field(f, "Update count:", self.update_count)?;
		write_field(f, "Drive area PSN:", format_args!("{:#X}", self.drive_area_psn))?;
		write_field(f, "Defect list PSN:", format_args!("{:#X}", self.defect_list_psn))?;
		write_field(f, "PSN of LSN 0:", format_args!("{:#X}", self.psn_lsn_zero))?;
		write_field(f, "Last user area LSN:", self.last_user_lsn)?;
		write_field(f, "Inner spare area 0:", self.isa0)?;
		write_field(f, "Outer spare area:", self.osa)?;
		write_field(f, "Inner spare area 1:", self.isa1)?;
		write_field(f, "Spare area full flags:", format_args!("{:#04X}", self.spare_full))?;
		write_field(f, "Disc-specific field 1:", format_args!("{:#04X}", self.disc_field1))?;
		write_field(f, "Disc-specific field 2:", format_args!("{:#010X}", self.disc_field2))?;
		write_field(f, "Status bits:", hex(&self.status_bits))?;
		if ! self.disc_data.is_empty() {
			write_field(f, "Disc-specific data:", hex(&self.disc_data))?;
		}
		Ok(())
	}
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Cartridge Status.
pub struct BdCartridgeStatus {
	/// # Data Length.
	pub data_length: u16,

	/// # Reserved (bytes 2-3).
	pub reserved1: [u8; 2],

	/// # Disc is in a Cartridge (bit 7).
	pub cartridge: bool,

	/// # Disc was Taken Out (bit 6).
	pub out: bool,

	/// # Reserved (bits 5-3).
	pub reserved2: u8,

	/// # Cartridge Write Protection (bit 2).
	pub cwp: bool,

	/// # Reserved (bits 1-0).
	pub reserved3: u8,

	/// # Reserved (bytes 5-7).
	pub reserved4: [u8; 3],
}

impl BdCartridgeStatus {
	#[must_use]
	/// # Decode.
	pub fn decode(buf: &[u8]) -> Option<Self> {
		let cur = BeCursor::new(buf);
		if cur.len() != CARTRIDGE_LEN {
			log::debug!("Bad BD cartridge status length: {}.", cur.len());
			return None;
		}
		let b4 = cur.u8(4)?;
		Some(Self {
			data_length: cur.u16(0)?,
			reserved1: cur.array::<2>(2)?,
			cartridge: b4 & 0x80 == 0x80,
			out: b4 & 0x40 == 0x40,
			reserved2: (b4 & 0x38) >> 3,
			cwp: b4 & 0x04 == 0x04,
			reserved3: b4 & 0x03,
			reserved4: cur.array::<3>(5)?,
		})
	}
}

impl fmt::Display for BdCartridgeStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.cartridge {
			writeln!(f, "Media is inserted in a cartridge")?;
			if self.out { writeln!(f, "Media has been taken out, or inserted in, the cartridge")?; }
			if self.cwp { writeln!(f, "Media is write protected")?; }
		}
		else { writeln!(f, "Media is not in a cartridge")?; }
		Ok(())
	}
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Spare Area Information.
pub struct BdSpareArea {
	/// # Data Length.
	pub data_length: u16,

	/// # Reserved (bytes 2-7).
	pub reserved: [u8; 6],

	/// # Free Spare Blocks.
	pub free_blocks: u32,

	/// # Allocated Spare Blocks.
	pub allocated_blocks: u32,
}

impl BdSpareArea {
	#[must_use]
	/// # Decode.
	pub fn decode(buf: &[u8]) -> Option<Self> {
		let cur = BeCursor::new(buf);
		if cur.len() != SPARE_LEN {
			log::debug!("Bad BD spare area length: {}.", cur.len());
			return None;
		}
		Some(Self {
			data_length: cur.u16(0)?,
			reserved: cur.array::<6>(2)?,
			free_blocks: cur.u32(8)?,
			allocated_blocks: cur.u32(12)?,
		})
	}
}

impl fmt::Display for BdSpareArea {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_field(f, "Free spare blocks:", self.free_blocks)?;
		write_field(f, "Allocated spare blocks:", self.allocated_blocks)
	}
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Burst Cutting Area.
pub struct BdBca {
	/// # Data Length.
	pub data_length: u16,

	/// # Reserved (bytes 2-3).
	pub reserved: [u8; 2],

	/// # BCA.
	pub bca: [u8; 64],
}

impl BdBca {
	#[must_use]
	/// # Decode.
	pub fn decode(buf: &[u8]) -> Option<Self> {
		let cur = BeCursor::new(buf);
		if cur.len() != BCA_LEN {
			log::debug!("Bad BD BCA length: {}.", cur.len());
			return None;
		}
		Some(Self {
			data_length: cur.u16(0)?,
			reserved: cur.array::<2>(2)?,
			bca: cur.array::<64>(4)?,
		})
	}
}

impl fmt::Display for BdBca {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_field(f, "Blu-ray BCA:", hex(&self.bca))
	}
}



#[cfg(test)]
mod test {
	use super::*;

	fn di_unit(kind: &[u8; 3], len: u8, seq: u8) -> Vec<u8> {
		let mut out = vec![0_u8; usize::from(len)];
		out[..2].copy_from_slice(&DI_SIGNATURE.to_be_bytes());
		out[2] = 1;
		out[3] = (3 << 3) | 1;
		out[5] = seq;
		out[6] = 0x80 | len;
		out[8..11].copy_from_slice(kind);
		out[11] = 0b0110_0010;
		if len >= 112 {
			out[100..106].copy_from_slice(b"VENDOR");
			out[106..109].copy_from_slice(b"M01");
			out[109..111].copy_from_slice(&0x0102_u16.to_be_bytes());
			out[111] = 7;
		}
		out
	}

	fn di(units: &[Vec<u8>]) -> Vec<u8> {
		let mut out = vec![0_u8; DI_LEN];
		out[..2].copy_from_slice(&4098_u16.to_be_bytes());
		let mut offset = 4;
		for u in units {
			out[offset..offset + u.len()].copy_from_slice(u);
			offset += u.len();
		}
		out
	}

	#[test]
	fn t_di() {
		let raw = di(&[di_unit(b"BDO", 64, 0), di_unit(b"BDR", 112, 1)]);
		let info = BdDiscInformation::decode(&raw).expect("Failed to decode DI.");
		assert_eq!(info.units.len(), 2);

		let u = &info.units[0];
		assert_eq!(u.units_per_block, 3);
		assert_eq!(u.layer, 1);
		assert!(u.continuation);
		assert_eq!(u.length, 64);
		assert_eq!((u.size, u.class, u.version), (1, 2, 2));
		assert_eq!(u.format_dependent.len(), 52);
		assert!(u.manufacturer_id.is_none());

		let u = &info.units[1];
		assert_eq!(u.disc_type_str(), "BD-R");
		assert_eq!(u.manufacturer_id, Some(*b"VENDOR"));
		assert_eq!(u.media_type_id, Some(*b"M01"));
		assert_eq!(u.timestamp, Some(0x0102));
		assert_eq!(u.product_revision, Some(7));

		let pretty = info.to_string();
		assert!(pretty.contains("BD-ROM"));
		assert!(pretty.contains("VENDOR"));
	}

	#[test]
	fn t_di_hostile() {
		// A zero-length unit must not loop forever.
		let mut unit = di_unit(b"BDO", 64, 0);
		unit[6] = 0;
		assert!(BdDiscInformation::decode(&di(&[unit])).is_none());

		// A unit hanging off the end is dropped.
		let mut raw = di(&[]);
		let unit = di_unit(b"BDX", 127, 0);
		let mut offset = 4;
		while offset + unit.len() <= DI_LEN {
			raw[offset..offset + unit.len()].copy_from_slice(&unit);
			offset += unit.len();
		}
		let tail = DI_LEN - offset;
		raw[offset..].copy_from_slice(&unit[..tail]);
		let info = BdDiscInformation::decode(&raw).expect("Failed to decode DI.");
		assert_eq!(info.units.len(), 32, "Overrunning unit decoded anyway.");
		assert_eq!(info.units[0].disc_type_str(), "unknown");

		assert!(BdDiscInformation::decode(&[]).is_none());
		assert!(BdDiscInformation::decode(&raw[..100]).is_none());
	}

	#[test]
	fn t_dds() {
		let mut raw = vec![0_u8; 120];
		raw[..2].copy_from_slice(&118_u16.to_be_bytes());
		raw[4..6].copy_from_slice(&DDS_SIGNATURE.to_be_bytes());
		raw[6] = 2;
		raw[8..12].copy_from_slice(&5_u32.to_be_bytes());
		raw[40..44].copy_from_slice(&12_219_391_u32.to_be_bytes());
		raw[68] = 0xFF;
		raw[100] = 0xAB;
		let dds = BdDds::decode(&raw).expect("Failed to decode DDS.");
		assert_eq!(dds.format, 2);
		assert_eq!(dds.update_count, 5);
		assert_eq!(dds.last_user_lsn, 12_219_391);
		assert_eq!(dds.status_bits[0], 0xFF);
		assert_eq!(dds.disc_data.len(), 20);
		assert!(dds.to_string().contains("12219391"));

		raw[4] = 0;
		assert!(BdDds::decode(&raw).is_none(), "Bad signature decoded anyway.");
		assert!(BdDds::decode(&[0x44, 0x53]).is_none());
	}

	#[test]
	fn t_small() {
		let c = BdCartridgeStatus::decode(&[0, 6, 0, 0, 0b1100_0100, 0, 0, 0])
			.expect("Failed to decode cartridge status.");
		assert!(c.cartridge && c.out && c.cwp, "Cartridge bits wrong.");
		assert!(c.to_string().contains("write protected"));
		assert!(BdCartridgeStatus::decode(&[0, 6, 0]).is_none());

		let mut raw = [0_u8; 16];
		raw[8..12].copy_from_slice(&100_u32.to_be_bytes());
		raw[12..16].copy_from_slice(&200_u32.to_be_bytes());
		let s = BdSpareArea::decode(&raw).expect("Failed to decode spare area.");
		assert_eq!((s.free_blocks, s.allocated_blocks), (100, 200));
		assert!(BdSpareArea::decode(&raw[..15]).is_none());

		let mut raw = [0_u8; 68];
		raw[4] = 0xAA;
		let b = BdBca::decode(&raw).expect("Failed to decode BCA.");
		assert_eq!(b.bca[0], 0xAA);
		assert!(b.to_string().starts_with("Blu-ray BCA:"));
		assert!(BdBca::decode(&raw[..67]).is_none(), "BCA must be exactly 68 bytes.");
		assert!(BdBca::decode(&[]).is_none());
	}
}
