/*!
# Disc Dump: Sub-channel Q

Helpers for the Q channel: pulling it out of raw P-W data, validating its
CRC, converting between BCD and binary, and decoding the position, MCN and
ISRC modes.
*/

use crc::{
	Crc,
	CRC_16_GSM,
};
use super::{
	bcd_to_u8,
	msf_to_lba,
	u8_to_bcd,
};
use trimothy::TrimSliceMatches;



/// # Q CRC.
///
/// CCITT polynomial, zero init, inverted output.
const Q_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_GSM);

/// # Raw Sub-channel Size.
pub const RAW_SUB_LEN: usize = 96;

/// # Q Size.
pub const Q_LEN: usize = 12;



/// # Q Buffer.
pub type SubQBuf = [u8; Q_LEN];



#[must_use]
/// # De-interleave Q.
///
/// Raw sub-channel data holds one bit from each of P through W per byte; Q is
/// bit 6. Returns `None` if the buffer is not exactly 96 bytes.
pub fn deinterleave_q(raw: &[u8]) -> Option<SubQBuf> {
	if raw.len() != RAW_SUB_LEN { return None; }
	let mut q = [0_u8; Q_LEN];
	for (i, b) in raw.iter().enumerate() {
		if b & 0x40 == 0x40 { q[i / 8] |= 0x80 >> (i % 8); }
	}
	Some(q)
}

#[must_use]
/// # Interleave Q.
///
/// The inverse of [`deinterleave_q`], leaving every other channel empty.
pub fn interleave_q(q: &SubQBuf) -> [u8; RAW_SUB_LEN] {
	let mut raw = [0_u8; RAW_SUB_LEN];
	for (i, b) in raw.iter_mut().enumerate() {
		if q[i / 8] & (0x80 >> (i % 8)) != 0 { *b = 0x40; }
	}
	raw
}

#[must_use]
/// # Q CRC.
///
/// Compute the CRC for the first ten bytes.
pub fn q_crc(q: &SubQBuf) -> u16 { Q_CRC.checksum(&q[..10]) }

#[must_use]
/// # Q CRC OK?
///
/// The stored CRC is big-endian in bytes 10-11. This only makes sense for
/// BCD-encoded data.
pub fn q_crc_ok(q: &SubQBuf) -> bool {
	q_crc(q) == u16::from_be_bytes([q[10], q[11]])
}

/// # Simple Q Repair.
///
/// Clear the bits that cannot legally be set: four-channel on data tracks,
/// ADR values above three, the ZERO byte of position entries, and impossible
/// BCD nibbles. Returns `true` if the CRC matches afterwards.
pub fn fix_q(q: &mut SubQBuf) -> bool {
	if q[0] & 0x40 == 0x40 { q[0] &= 0x7F; }
	q[0] &= 0xF3;
	if q[0] & 0x0F == 1 { q[6] = 0; }
	for b in &mut q[1..10] {
		if *b & 0xF0 > 0xA0 { *b &= 0x7F; }
		if *b & 0x0F > 0x0A { *b &= 0xF7; }
	}
	q_crc_ok(q)
}

/// # BCD to Binary (Q).
///
/// Convert the addressing bytes (1-9) in place.
pub fn bcd_to_binary_q(q: &mut SubQBuf) {
	for b in &mut q[1..10] { *b = bcd_to_u8(*b); }
}

/// # Binary to BCD (Q).
///
/// Convert the addressing bytes (1-9) in place.
pub fn binary_to_bcd_q(q: &mut SubQBuf) {
	for b in &mut q[1..10] { *b = u8_to_bcd(*b); }
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Decoded Q Position.
///
/// All fields are binary, not BCD.
pub struct SubQ {
	/// # CONTROL.
	pub control: u8,

	/// # ADR.
	pub adr: u8,

	/// # Track Number.
	pub track: u8,

	/// # Index.
	pub index: u8,

	/// # Relative Position (M, S, F).
	pub relative: (u8, u8, u8),

	/// # Zero Byte.
	pub zero: u8,

	/// # Absolute Position (M, S, F).
	pub absolute: (u8, u8, u8),
}

impl SubQ {
	#[must_use]
	/// # From Binary Q.
	///
	/// Only ADR 1 (position) entries are accepted.
	pub const fn from_binary(q: &SubQBuf) -> Option<Self> {
		let adr = q[0] & 0x0F;
		if adr != 1 { return None; }
		Some(Self {
			control: q[0] >> 4,
			adr,
			track: q[1],
			index: q[2],
			relative: (q[3], q[4], q[5]),
			zero: q[6],
			absolute: (q[7], q[8], q[9]),
		})
	}

	#[must_use]
	/// # Absolute LBA.
	pub const fn lba(&self) -> i32 {
		msf_to_lba(self.absolute.0, self.absolute.1, self.absolute.2)
	}
}

#[must_use]
/// # All Zero?
///
/// Some drives return nothing at all rather than failing the command.
pub fn is_empty_q(q: &SubQBuf) -> bool { q.iter().all(|&b| b == 0) }



#[must_use]
/// # MCN From Q (ADR 2).
///
/// Thirteen BCD digits packed into bytes 1-7.
pub fn mcn_from_q(q: &SubQBuf) -> Option<String> {
	if q[0] & 0x0F != 2 { return None; }
	let mut out = String::with_capacity(13);
	for b in &q[1..8] {
		for nibble in [b >> 4, b & 0x0F] {
			if out.len() == 13 { break; }
			if nibble > 9 { return None; }
			out.push(char::from(b'0' + nibble));
		}
	}
	Some(out)
}

#[must_use]
/// # ISRC From Q (ADR 3).
///
/// Five 6-bit characters in bytes 1-4, then seven BCD digits in bytes 5-8.
pub fn isrc_from_q(q: &SubQBuf) -> Option<String> {
	if q[0] & 0x0F != 3 { return None; }
	let bits = u32::from_be_bytes([q[1], q[2], q[3], q[4]]);
	let mut out = String::with_capacity(12);
	for i in 0..5 {
		let v = ((bits >> (26 - i * 6)) & 0x3F) as u8;
		out.push(match v {
			0..=9 => char::from(b'0' + v),
			17..=42 => char::from(b'A' + v - 17),
			_ => return None,
		});
	}
	for b in &q[5..9] {
		for nibble in [b >> 4, b & 0x0F] {
			if out.len() == 12 { break; }
			if nibble > 9 { return None; }
			out.push(char::from(b'0' + nibble));
		}
	}
	Some(out)
}



#[must_use]
/// # MCN From READ SUB-CHANNEL.
///
/// Format 02h: the MCVAL bit is byte 8 bit 7, and the thirteen ASCII digits
/// follow.
pub fn mcn_from_read_subchannel(buf: &[u8]) -> Option<String> {
	if buf.len() < 22 || buf[4] != 2 || buf[8] & 0x80 == 0 { return None; }
	let raw = buf[9..22].trim_matches(|b| b == 0 || b.is_ascii_whitespace());
	if raw.len() == 13 && raw.iter().all(u8::is_ascii_digit) {
		Some(String::from_utf8_lossy(raw).into_owned())
	}
	else { None }
}

#[must_use]
/// # ISRC From READ SUB-CHANNEL.
///
/// Format 03h: the TCVAL bit is byte 8 bit 7, and the twelve ASCII characters
/// follow.
pub fn isrc_from_read_subchannel(buf: &[u8]) -> Option<String> {
	if buf.len() < 21 || buf[4] != 3 || buf[8] & 0x80 == 0 { return None; }
	let raw = buf[9..21].trim_matches(|b| b == 0 || b.is_ascii_whitespace());
	if raw.len() == 12 && raw.iter().all(u8::is_ascii_alphanumeric) {
		Some(String::from_utf8_lossy(raw).to_ascii_uppercase())
	}
	else { None }
}
