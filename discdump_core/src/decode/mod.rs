/*!
# Disc Dump: Binary Structures

Decoders for the fixed-layout structures returned by MMC/SCSI commands. Every
decoder takes the raw response buffer and returns `None` if it is too short,
too long, or signed wrong. Nothing in here panics on bad input.

All multi-byte integers are big-endian.
*/

pub mod aacs;
pub mod atip;
pub mod bd;
pub mod disc_info;
pub mod full_toc;
pub mod subchannel;
pub mod toc;

use crate::CD_LEADIN;



/// # Frames Per Second.
pub(crate) const FRAMES_PER_SECOND: i32 = 75;

/// # Frames Per Minute.
pub(crate) const FRAMES_PER_MINUTE: i32 = FRAMES_PER_SECOND * 60;

/// # Frames Per Hour.
pub(crate) const FRAMES_PER_HOUR: i32 = FRAMES_PER_MINUTE * 60;



/// # Big-Endian Reader.
///
/// A tiny bounds-checked cursor over a response buffer. Every getter returns
/// `None` rather than panicking when asked to read past the end.
pub(crate) struct BeCursor<'a> {
	buf: &'a [u8],
}

impl<'a> BeCursor<'a> {
	/// # New.
	pub(crate) const fn new(buf: &'a [u8]) -> Self { Self { buf } }

	/// # Length.
	pub(crate) const fn len(&self) -> usize { self.buf.len() }

	/// # Byte.
	pub(crate) fn u8(&self, idx: usize) -> Option<u8> { self.buf.get(idx).copied() }

	/// # Two Bytes.
	pub(crate) fn u16(&self, idx: usize) -> Option<u16> {
		self.array::<2>(idx).map(u16::from_be_bytes)
	}

	/// # Three Bytes.
	pub(crate) fn u24(&self, idx: usize) -> Option<u32> {
		self.array::<3>(idx).map(|[a, b, c]| u32::from_be_bytes([0, a, b, c]))
	}

	/// # Four Bytes.
	pub(crate) fn u32(&self, idx: usize) -> Option<u32> {
		self.array::<4>(idx).map(u32::from_be_bytes)
	}

	/// # Eight Bytes.
	pub(crate) fn u64(&self, idx: usize) -> Option<u64> {
		self.array::<8>(idx).map(u64::from_be_bytes)
	}

	/// # Fixed Array.
	pub(crate) fn array<const N: usize>(&self, idx: usize) -> Option<[u8; N]> {
		let end = idx.checked_add(N)?;
		self.buf.get(idx..end).and_then(|v| <[u8; N]>::try_from(v).ok())
	}

	/// # Slice.
	pub(crate) fn slice(&self, idx: usize, len: usize) -> Option<&'a [u8]> {
		let end = idx.checked_add(len)?;
		self.buf.get(idx..end)
	}
}



#[must_use]
/// # BCD to Binary.
///
/// Nibbles above nine are not valid BCD, but are converted anyway; callers
/// that care should check the CRC first.
pub const fn bcd_to_u8(v: u8) -> u8 { (v >> 4) * 10 + (v & 0x0F) }

#[must_use]
/// # Binary to BCD.
///
/// Values above 99 wrap.
pub const fn u8_to_bcd(v: u8) -> u8 {
	let v = v % 100;
	((v / 10) << 4) | (v % 10)
}

#[must_use]
/// # MSF to LBA.
///
/// Convert a disc-time address to a logical block address, accounting for the
/// 150-sector lead-in.
pub const fn msf_to_lba(m: u8, s: u8, f: u8) -> i32 {
	m as i32 * FRAMES_PER_MINUTE +
	s as i32 * FRAMES_PER_SECOND +
	f as i32 -
	CD_LEADIN as i32
}

#[must_use]
/// # HMSF to LBA.
///
/// Same as [`msf_to_lba`], but with the hour field used by the Full TOC.
pub const fn hmsf_to_lba(h: u8, m: u8, s: u8, f: u8) -> i32 {
	h as i32 * FRAMES_PER_HOUR + msf_to_lba(m, s, f)
}

#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::integer_division)]
/// # LBA to MSF.
///
/// Negative addresses (in the lead-in) clamp to `00:00:00`.
pub const fn lba_to_msf(lba: i32) -> (u8, u8, u8) {
	let abs = lba + CD_LEADIN as i32;
	if abs <= 0 { return (0, 0, 0); }
	let m = abs / FRAMES_PER_MINUTE;
	let s = (abs % FRAMES_PER_MINUTE) / FRAMES_PER_SECOND;
	let f = abs % FRAMES_PER_SECOND;
	((m % 256) as u8, s as u8, f as u8)
}

#[must_use]
/// # Previous Frame.
///
/// Step an hour/minute/second/frame address back by exactly one frame,
/// borrowing through each field as needed. A zero address stays zero.
pub const fn previous_frame(h: u8, m: u8, s: u8, f: u8) -> (u8, u8, u8, u8) {
	if f > 0 { return (h, m, s, f - 1); }
	if s > 0 { return (h, m, s - 1, 74); }
	if m > 0 { return (h, m - 1, 59, 74); }
	if h > 0 { return (h - 1, 59, 59, 74); }
	(0, 0, 0, 0)
}



/// # Write a Labelled Line.
///
/// Shared by the `Display` impls so the pretty output lines up.
pub(crate) fn write_field(f: &mut std::fmt::Formatter<'_>, label: &str, value: impl std::fmt::Display)
-> std::fmt::Result {
	writeln!(f, "{label:<32} {value}")
}

/// # Hex Dump.
pub(crate) fn hex(buf: &[u8]) -> String {
	use std::fmt::Write;

	let mut out = String::with_capacity(buf.len() * 2);
	for b in buf {
		let _res = write!(out, "{b:02X}");
	}
	out
}
