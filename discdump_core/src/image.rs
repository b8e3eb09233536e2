/*!
# Disc Dump: Image Output
*/

use crate::{
	DumpError,
	MediaType,
	Track,
	persist::write_atomic,
};
use std::{
	collections::BTreeMap,
	fmt::Write as _,
	fs::File,
	io::{
		Seek,
		SeekFrom,
		Write,
	},
	path::{
		Path,
		PathBuf,
	},
};



#[derive(Debug, Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
/// # Sector Tag.
///
/// Track-scoped tags are addressed by track number rather than LBA.
pub enum SectorTag {
	/// # Sub-channel (Per Sector).
	CdSectorSubchannel,

	/// # CONTROL Flags (Per Track).
	CdTrackFlags,

	/// # ISRC (Per Track).
	CdTrackIsrc,
}



#[derive(Debug, Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
/// # Media Tag.
pub enum MediaTag {
	/// # Formatted TOC.
	CdToc,

	/// # Full TOC.
	CdFullToc,

	/// # Session Information.
	CdSessionInfo,

	/// # ATIP.
	CdAtip,

	/// # PMA.
	CdPma,

	/// # CD-TEXT.
	CdText,

	/// # Media Catalogue Number.
	CdMcn,

	/// # First Track Pregap (LBA -150..0).
	CdFirstTrackPregap,
}

impl MediaTag {
	#[must_use]
	/// # File Extension.
	pub const fn extension(self) -> &'static str {
		match self {
			Self::CdToc => "toc",
			Self::CdFullToc => "fulltoc",
			Self::CdSessionInfo => "session",
			Self::CdAtip => "atip",
			Self::CdPma => "pma",
			Self::CdText => "cdtext",
			Self::CdMcn => "mcn",
			Self::CdFirstTrackPregap => "pregap",
		}
	}
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Image Capabilities.
#[allow(clippy::struct_excessive_bools)]
pub struct ImageCapabilities {
	/// # Audio Tracks.
	pub audio: bool,

	/// # Long (2352-byte) Sectors.
	pub long_sectors: bool,

	/// # Sub-channel Storage.
	pub subchannel: bool,

	/// # Multiple Sessions.
	pub sessions: bool,

	/// # Track Flags.
	pub track_flags: bool,

	/// # Track ISRCs.
	pub track_isrc: bool,

	/// # Media Tags.
	pub media_tags: bool,

	/// # Maximum Tracks.
	pub max_tracks: u8,
}

impl Default for ImageCapabilities {
	fn default() -> Self {
		Self {
			audio: true,
			long_sectors: true,
			subchannel: true,
			sessions: true,
			track_flags: true,
			track_isrc: true,
			media_tags: true,
			max_tracks: 99,
		}
	}
}



/// # Image Writer.
///
/// The output container. Calls are strictly sequenced: `create`, then
/// `set_tracks`, then any number of writes, then `close`.
pub trait ImageWriter {
	/// # Capabilities.
	fn capabilities(&self) -> ImageCapabilities;

	/// # Create.
	///
	/// ## Errors
	///
	/// Returns an error if the container cannot be created.
	fn create(&mut self, media: MediaType, sectors: u64, sector_size: u32) -> Result<(), DumpError>;

	/// # Set Tracks.
	///
	/// ## Errors
	///
	/// Returns an error if the layout is unacceptable, including when tracks
	/// carry sub-channel the container can't store.
	fn set_tracks(&mut self, tracks: &[Track]) -> Result<(), DumpError>;

	/// # Write Sectors (Cooked).
	///
	/// ## Errors
	///
	/// Returns an error if the data could not be written.
	fn write_sectors(&mut self, data: &[u8], lba: i32, count: u32) -> Result<(), DumpError>;

	/// # Write Sectors (Long).
	///
	/// ## Errors
	///
	/// Returns an error if the data could not be written.
	fn write_sectors_long(&mut self, data: &[u8], lba: i32, count: u32) -> Result<(), DumpError>;

	/// # Write Sector Tag.
	///
	/// ## Errors
	///
	/// Returns an error if the tag could not be stored.
	fn write_sector_tag(&mut self, data: &[u8], address: i32, tag: SectorTag) -> Result<(), DumpError> {
		self.write_sectors_tag(data, address, 1, tag)
	}

	/// # Write Sectors Tag.
	///
	/// ## Errors
	///
	/// Returns an error if the tag could not be stored.
	fn write_sectors_tag(&mut self, data: &[u8], lba: i32, count: u32, tag: SectorTag) -> Result<(), DumpError>;

	/// # Write Media Tag.
	///
	/// ## Errors
	///
	/// Returns an error if the tag could not be stored.
	fn write_media_tag(&mut self, data: &[u8], tag: MediaTag) -> Result<(), DumpError>;

	/// # Close.
	///
	/// ## Errors
	///
	/// Returns an error if the container could not be finalized.
	fn close(&mut self) -> Result<(), DumpError>;

	/// # Main Data Path.
	///
	/// The file holding the main channel, if there is one.
	fn main_path(&self) -> Option<&Path> { None }
}



#[derive(Debug)]
/// # Raw Image.
///
/// A headerless main-channel file (`.bin`) beside a raw sub-channel file
/// (`.sub`), one file per media tag, and a plain-text `.layout`. Sectors are
/// written in place, so retries can fill earlier holes.
pub struct RawImage {
	stem: PathBuf,
	bin: PathBuf,
	caps: ImageCapabilities,
	media: MediaType,
	sector_size: u32,
	sub_size: u32,
	main: Option<File>,
	sub: Option<File>,
	tracks: Vec<Track>,
	flags: BTreeMap<u8, u8>,
	isrcs: BTreeMap<u8, String>,
}

impl RawImage {
	#[must_use]
	/// # New.
	///
	/// `stem` is the output path without an extension.
	pub fn new<P: AsRef<Path>>(stem: P) -> Self {
		let stem = stem.as_ref().to_path_buf();
		let mut bin = stem.clone().into_os_string();
		bin.push(".bin");
		Self {
			stem,
			bin: PathBuf::from(bin),
			caps: ImageCapabilities::default(),
			media: MediaType::Cd,
			sector_size: crate::BYTES_PER_SECTOR,
			sub_size: 0,
			main: None,
			sub: None,
			tracks: Vec::new(),
			flags: BTreeMap::new(),
			isrcs: BTreeMap::new(),
		}
	}

	#[must_use]
	/// # Without Sub-channel.
	pub const fn without_subchannel(mut self) -> Self {
		self.caps.subchannel = false;
		self
	}

	/// # Sibling Path.
	fn sibling(&self, ext: &str) -> PathBuf {
		let mut out = self.stem.clone().into_os_string();
		out.push(".");
		out.push(ext);
		PathBuf::from(out)
	}

	/// # Write At.
	fn write_at(file: Option<&mut File>, pos: u64, data: &[u8], path: &Path) -> Result<(), DumpError> {
		let file = file.ok_or(DumpError::Bug("Image written before creation"))?;
		file.seek(SeekFrom::Start(pos))
			.and_then(|_| file.write_all(data))
			.map_err(|_| DumpError::Write(path.to_string_lossy().into_owned()))
	}

	/// # Write Main Channel.
	fn write_main(&mut self, data: &[u8], lba: i32, count: u32) -> Result<(), DumpError> {
		let lba = u64::try_from(lba).map_err(|_| DumpError::Image(format!("cannot store sector {lba}")))?;
		if data.len() != count as usize * self.sector_size as usize {
			return Err(DumpError::Image(format!("expected {count} sector(s) of {} bytes", self.sector_size)));
		}
		Self::write_at(self.main.as_mut(), lba * u64::from(self.sector_size), data, &self.bin)
	}

	/// # Layout Text.
	fn layout(&self) -> String {
		let mut out = format!(
			"MEDIA {}\nSECTOR {}\nSUBCHANNEL {}\n",
			self.media,
			self.sector_size,
			self.sub_size,
		);
		for t in &self.tracks {
			let _res = write!(
				out,
				"TRACK {:02} SESSION {} {} PREGAP {} START {} END {} RAW {} COOKED {} FLAGS {:02X}",
				t.number,
				t.session,
				t.kind,
				t.pregap,
				t.start,
				t.end,
				t.raw_size(),
				t.cooked_size(),
				self.flags.get(&t.number).copied().unwrap_or_else(|| t.flags.as_u8()),
			);
			if let Some(isrc) = self.isrcs.get(&t.number) {
				let _res = write!(out, " ISRC {isrc}");
			}
			out.push('\n');
		}
		out
	}
}

impl ImageWriter for RawImage {
	fn capabilities(&self) -> ImageCapabilities { self.caps }

	fn create(&mut self, media: MediaType, _sectors: u64, sector_size: u32) -> Result<(), DumpError> {
		let file = File::options()
			.create(true)
			.write(true)
			.truncate(false)
			.open(&self.bin)
			.map_err(|_| DumpError::Write(self.bin.to_string_lossy().into_owned()))?;
		self.main.replace(file);
		self.media = media;
		self.sector_size = sector_size;
		Ok(())
	}

	fn set_tracks(&mut self, tracks: &[Track]) -> Result<(), DumpError> {
		if tracks.is_empty() { return Err(DumpError::Image("no tracks".to_owned())); }
		if usize::from(self.caps.max_tracks) < tracks.len() {
			return Err(DumpError::Image(format!("too many tracks ({})", tracks.len())));
		}
		if ! self.caps.subchannel && tracks.iter().any(|t| t.subchannel.size() != 0) {
			return Err(DumpError::Image("sub-channel is not supported".to_owned()));
		}
		self.tracks = tracks.to_vec();
		Ok(())
	}

	fn write_sectors(&mut self, data: &[u8], lba: i32, count: u32) -> Result<(), DumpError> {
		self.write_main(data, lba, count)
	}

	fn write_sectors_long(&mut self, data: &[u8], lba: i32, count: u32) -> Result<(), DumpError> {
		self.write_main(data, lba, count)
	}

	fn write_sectors_tag(&mut self, data: &[u8], lba: i32, count: u32, tag: SectorTag) -> Result<(), DumpError> {
		match tag {
			SectorTag::CdSectorSubchannel => {
				if ! self.caps.subchannel { return Err(DumpError::Capability("The image cannot store sub-channel data.")); }
				if count == 0 || data.len() % count as usize != 0 {
					return Err(DumpError::Image("uneven sub-channel data".to_owned()));
				}
				let size = u32::try_from(data.len() / count as usize)
					.map_err(|_| DumpError::Image("oversized sub-channel".to_owned()))?;
				if self.sub_size == 0 { self.sub_size = size; }
				else if self.sub_size != size {
					return Err(DumpError::Image("sub-channel size changed".to_owned()));
				}

				let path = self.sibling("sub");
				if self.sub.is_none() {
					let file = File::options()
						.create(true)
						.write(true)
						.truncate(false)
						.open(&path)
						.map_err(|_| DumpError::Write(path.to_string_lossy().into_owned()))?;
					self.sub.replace(file);
				}
				let lba = u64::try_from(lba).map_err(|_| DumpError::Image(format!("cannot store sub-channel for {lba}")))?;
				Self::write_at(self.sub.as_mut(), lba * u64::from(size), data, &path)
			},
			SectorTag::CdTrackFlags => {
				let track = u8::try_from(lba).map_err(|_| DumpError::Image(format!("invalid track {lba}")))?;
				let flags = data.first().copied().ok_or(DumpError::Image("empty flags".to_owned()))?;
				self.flags.insert(track, flags);
				Ok(())
			},
			SectorTag::CdTrackIsrc => {
				let track = u8::try_from(lba).map_err(|_| DumpError::Image(format!("invalid track {lba}")))?;
				let isrc = std::str::from_utf8(data)
					.map_err(|_| DumpError::Image("invalid ISRC".to_owned()))?;
				self.isrcs.insert(track, isrc.to_owned());
				Ok(())
			},
		}
	}

	fn write_media_tag(&mut self, data: &[u8], tag: MediaTag) -> Result<(), DumpError> {
		write_atomic(&self.sibling(tag.extension()), data)
	}

	fn close(&mut self) -> Result<(), DumpError> {
		if let Some(mut f) = self.main.take() {
			f.flush()
				.and_then(|()| f.sync_all())
				.map_err(|_| DumpError::Write(self.bin.to_string_lossy().into_owned()))?;
		}
		if let Some(mut f) = self.sub.take() {
			let _res = f.flush();
		}
		write_atomic(&self.sibling("layout"), self.layout().as_bytes())
	}

	fn main_path(&self) -> Option<&Path> { Some(self.bin.as_path()) }
}
