/*!
# Disc Dump: Tracks and Sessions
*/

use crate::{
	BYTES_PER_SECTOR,
	DumpError,
	Subchannel,
};
use serde::{
	Deserialize,
	Serialize,
};
use std::fmt;



#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
/// # Track Kind.
///
/// `Data` is only a placeholder between mapping and mode detection.
pub enum TrackKind {
	/// # Audio.
	Audio,

	/// # Data (Undetermined Mode).
	Data,

	/// # Mode 1.
	CdMode1,

	/// # Mode 2 (Formless).
	CdMode2Formless,

	/// # Mode 2 Form 1.
	CdMode2Form1,

	/// # Mode 2 Form 2.
	CdMode2Form2,
}

impl fmt::Display for TrackKind {
	#[inline]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl TrackKind {
	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Audio => "AUDIO",
			Self::Data => "DATA",
			Self::CdMode1 => "MODE1",
			Self::CdMode2Formless => "MODE2",
			Self::CdMode2Form1 => "MODE2/FORM1",
			Self::CdMode2Form2 => "MODE2/FORM2",
		}
	}

	#[must_use]
	/// # Audio?
	pub const fn is_audio(self) -> bool { matches!(self, Self::Audio) }

	#[must_use]
	/// # Cooked Bytes Per Sector.
	///
	/// The user data portion, minus sync, headers and error correction.
	pub const fn cooked_size(self) -> u32 {
		match self {
			Self::Audio => BYTES_PER_SECTOR,
			Self::Data | Self::CdMode1 | Self::CdMode2Form1 => 2048,
			Self::CdMode2Formless => 2336,
			Self::CdMode2Form2 => 2324,
		}
	}
}



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Deserialize, Serialize)]
/// # Track Flags.
///
/// The four CONTROL bits from the TOC or sub-channel Q.
pub struct TrackFlags(u8);

impl From<u8> for TrackFlags {
	#[inline]
	fn from(control: u8) -> Self { Self(control & 0x0F) }
}

impl fmt::Display for TrackFlags {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut any = false;
		for (set, label) in [
			(self.pre_emphasis(), "PRE"),
			(self.copy_permitted(), "DCP"),
			(self.data(), "DATA"),
			(self.four_channel(), "4CH"),
		] {
			if set {
				if any { f.write_str(" ")?; }
				f.write_str(label)?;
				any = true;
			}
		}
		if any { Ok(()) }
		else { f.write_str("-") }
	}
}

impl TrackFlags {
	/// # Pre-emphasis.
	pub const PRE_EMPHASIS: u8 = 0b0001;

	/// # Digital Copy Permitted.
	pub const COPY_PERMITTED: u8 = 0b0010;

	/// # Data Track.
	pub const DATA: u8 = 0b0100;

	/// # Four Channel Audio.
	pub const FOUR_CHANNEL: u8 = 0b1000;

	#[must_use]
	/// # As Byte.
	pub const fn as_u8(self) -> u8 { self.0 }

	#[must_use]
	/// # Pre-emphasis?
	pub const fn pre_emphasis(self) -> bool { Self::PRE_EMPHASIS == self.0 & Self::PRE_EMPHASIS }

	#[must_use]
	/// # Copy Permitted?
	pub const fn copy_permitted(self) -> bool { Self::COPY_PERMITTED == self.0 & Self::COPY_PERMITTED }

	#[must_use]
	/// # Data?
	pub const fn data(self) -> bool { Self::DATA == self.0 & Self::DATA }

	#[must_use]
	/// # Four Channel?
	pub const fn four_channel(self) -> bool { Self::FOUR_CHANNEL == self.0 & Self::FOUR_CHANNEL }
}



#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
/// # Track.
///
/// `start` is index 01; the pregap occupies the `pregap` sectors before it.
pub struct Track {
	/// # Sequence Number.
	pub number: u8,

	/// # Session.
	pub session: u8,

	/// # Kind.
	pub kind: TrackKind,

	/// # Start (LBA).
	pub start: i32,

	/// # End (LBA, Inclusive).
	pub end: i32,

	/// # Pregap (Sectors).
	pub pregap: u32,

	/// # Sub-channel.
	pub subchannel: Subchannel,

	/// # CONTROL Flags.
	pub flags: TrackFlags,

	/// # ISRC.
	pub isrc: Option<String>,
}

impl Track {
	#[must_use]
	/// # New.
	///
	/// The end is unknown until the mapper has seen the following track.
	pub const fn new(number: u8, session: u8, kind: TrackKind, start: i32, flags: TrackFlags) -> Self {
		Self {
			number,
			session,
			kind,
			start,
			end: start,
			pregap: 0,
			subchannel: Subchannel::None,
			flags,
			isrc: None,
		}
	}

	#[must_use]
	/// # Pregap Start.
	pub const fn pregap_start(&self) -> i32 {
		self.start.saturating_sub_unsigned(self.pregap)
	}

	#[must_use]
	/// # Read Start.
	///
	/// Nothing below LBA zero is read by the main pass.
	pub const fn read_start(&self) -> i32 {
		let s = self.pregap_start();
		if s < 0 { 0 } else { s }
	}

	#[must_use]
	/// # Raw Bytes Per Sector.
	pub const fn raw_size(&self) -> u32 { BYTES_PER_SECTOR }

	#[must_use]
	/// # Cooked Bytes Per Sector.
	pub const fn cooked_size(&self) -> u32 { self.kind.cooked_size() }

	#[must_use]
	/// # Sector Count (Excluding Pregap).
	pub const fn sectors(&self) -> u32 { self.end.abs_diff(self.start) + 1 }

	#[must_use]
	/// # Contains LBA?
	///
	/// The pregap counts.
	pub const fn contains(&self, lba: i32) -> bool {
		self.pregap_start() <= lba && lba <= self.end
	}
}

impl fmt::Display for Track {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{:02}  {:>2}  {:<11}  {:>6}  {:>6}  {:>6}  {}",
			self.number,
			self.session,
			self.kind.as_str(),
			self.pregap,
			self.start,
			self.end,
			self.flags,
		)?;
		if let Some(isrc) = self.isrc.as_deref() { write!(f, "  {isrc}")?; }
		Ok(())
	}
}



#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
/// # Session.
pub struct Session {
	/// # Sequence Number.
	pub number: u8,

	/// # Start (LBA).
	pub start: i32,

	/// # End (LBA, Inclusive).
	pub end: i32,

	/// # First Track.
	pub first_track: u8,

	/// # Last Track.
	pub last_track: u8,
}

impl Session {
	#[must_use]
	/// # From Tracks.
	///
	/// Group tracks by session number. Tracks must already be in order.
	pub fn from_tracks(tracks: &[Track]) -> Vec<Self> {
		let mut out: Vec<Self> = Vec::new();
		for t in tracks {
			match out.last_mut() {
				Some(s) if s.number == t.session => {
					s.end = t.end;
					s.last_track = t.number;
				},
				_ => out.push(Self {
					number: t.session,
					start: t.pregap_start(),
					end: t.end,
					first_track: t.number,
					last_track: t.number,
				}),
			}
		}
		out
	}
}



/// # Validate Track Layout.
///
/// Numbers must run densely from one, every track must end after it starts,
/// and nothing may overlap.
///
/// ## Errors
///
/// Returns the number of the first offending track.
pub fn validate_tracks(tracks: &[Track]) -> Result<(), DumpError> {
	let mut last_end: Option<i32> = None;
	for (idx, t) in tracks.iter().enumerate() {
		if usize::from(t.number) != idx + 1 || t.end < t.start {
			return Err(DumpError::TrackLayout(t.number));
		}
		if let Some(end) = last_end {
			if t.pregap_start() <= end { return Err(DumpError::TrackLayout(t.number)); }
		}
		last_end.replace(t.end);
	}
	Ok(())
}
