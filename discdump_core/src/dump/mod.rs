/*!
# Disc Dump: Dumper

The orchestrator. Negotiates what the drive can do, maps the disc, reads it,
and hands everything to an image writer.
*/

mod interleave;
mod iter;
pub(super) mod opts;
mod pregap;
mod probe;
mod read;
mod retry;
mod speed;
mod tracks;

#[cfg(test)]
pub(crate) mod test_support;

use crate::{
	decode::{
		atip::Atip,
		disc_info::DiscInformation,
		full_toc::FullToc,
		toc::Toc,
	},
	audio_toc,
	Drive,
	DriveResult,
	DriveVendorModel,
	DumpError,
	DumpLog,
	DumpOptions,
	Geometry,
	HiddenTrack,
	ImageCapabilities,
	ImageWriter,
	KillSwitch,
	MediaTag,
	MediaType,
	NoProgress,
	ProgressSink,
	ReadCommand,
	ReadOffset,
	Resume,
	SectorTag,
	SectorType,
	Session,
	Subchannel,
	TocFormat,
	Track,
	validate_tracks,
	write_sidecar,
	CD_LEADIN,
};
use dactyl::NiceElapsed;
use pregap::solve_pregaps;
use probe::{
	combined_offset,
	detect_hidden_track,
	probe_max_transfer,
	probe_subchannel,
	ReadSupport,
};
use read::{
	DumpShare,
	read_disc,
	read_first_pregap,
};
use retry::{
	retry,
	trim,
};
use speed::Speed;
use std::{
	collections::BTreeSet,
	fmt,
	path::{
		Path,
		PathBuf,
	},
	time::{
		Duration,
		Instant,
	},
};
use tracks::{
	build_track_list,
	detect_track_modes,
	reconcile,
	TrackMap,
};



/// # Command Timeout.
pub(super) const TIMEOUT: Duration = Duration::from_secs(10);



/// # Read Blocks.
///
/// Dispatch a read through whichever command was negotiated. The cooked
/// commands ignore the sector type and sub-channel.
pub(super) fn read_blocks(
	drive: &mut dyn Drive,
	cmd: ReadCommand,
	lba: i32,
	count: u32,
	block_size: u32,
	kind: SectorType,
	sub: Subchannel,
) -> DriveResult<Vec<u8>> {
	match cmd {
		ReadCommand::ReadCd => drive.read_cd(lba, block_size, count, kind, sub, TIMEOUT),
		ReadCommand::Read16 => drive.read16(lba, block_size, count, TIMEOUT),
		ReadCommand::Read12 => drive.read12(lba, block_size, count, TIMEOUT),
		ReadCommand::Read10 => drive.read10(lba, block_size, count, TIMEOUT),
		ReadCommand::Read6 => drive.read6(lba, block_size, count, TIMEOUT),
	}
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Dump Paths.
///
/// The files that live alongside the image.
pub struct DumpPaths {
	/// # Resume State.
	pub resume: PathBuf,

	/// # Log.
	pub log: PathBuf,

	/// # Sidecar.
	pub sidecar: PathBuf,
}

impl DumpPaths {
	#[must_use]
	/// # From Stem.
	///
	/// Append `.resume`, `.log`, and `.sidecar.txt` to the output stem.
	pub fn from_stem<P: AsRef<Path>>(stem: P) -> Self {
		let stem = stem.as_ref().as_os_str();
		let with = |ext: &str| {
			let mut out = stem.to_os_string();
			out.push(ext);
			PathBuf::from(out)
		};
		Self {
			resume: with(".resume"),
			log: with(".log"),
			sidecar: with(".sidecar.txt"),
		}
	}
}



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
/// # Where the Read Offset Came From.
pub enum OffsetSource {
	#[default]
	/// # Unknown.
	None,

	/// # Passed In By the User.
	User,

	/// # Measured From a Data Track.
	Combined,

	/// # Drive Offset Database.
	Database,
}

impl OffsetSource {
	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::None => "none",
			Self::User => "user",
			Self::Combined => "measured",
			Self::Database => "drive database",
		}
	}
}



#[derive(Debug, Clone)]
/// # Dump Report.
///
/// What happened, for the summary.
pub struct DumpReport {
	/// # Final Track Layout.
	pub tracks: Vec<Track>,

	/// # Sessions.
	pub sessions: Vec<Session>,

	/// # Negotiated Geometry.
	pub geometry: Geometry,

	/// # Unreadable Blocks.
	pub bad_blocks: BTreeSet<i32>,

	/// # At Least One Pregap Was Guessed.
	pub inexact_positioning: bool,

	/// # Stopped By the User.
	pub aborted: bool,

	/// # First Track Pregap Recovered.
	pub first_pregap: bool,

	/// # Read Offset.
	pub offset: Option<ReadOffset>,

	/// # Offset Source.
	pub offset_source: OffsetSource,

	/// # Media Catalogue Number.
	pub mcn: Option<String>,

	/// # Slowest Burst (MiB/s).
	pub speed_min: f64,

	/// # Fastest Burst (MiB/s).
	pub speed_max: f64,

	/// # Average Rate (MiB/s).
	pub speed_avg: f64,

	/// # Time Spent Writing.
	pub write_time: Duration,

	/// # Total Run Time.
	pub elapsed: Duration,
}

impl DumpReport {
	#[must_use]
	/// # Nice Elapsed.
	pub fn nice_elapsed(&self) -> String {
		NiceElapsed::from(self.elapsed).as_str().to_owned()
	}
}



#[derive(Debug, Clone)]
/// # Disc Survey.
///
/// A read-only look at the drive and disc, for `--no-dump`.
pub struct Survey {
	/// # Drive Vendor/Model.
	pub vendor_model: Option<DriveVendorModel>,

	/// # Known Drive Offset.
	pub drive_offset: Option<ReadOffset>,

	/// # Track Layout (Without Pregaps).
	pub tracks: Vec<Track>,

	/// # Media Type.
	pub media_type: MediaType,

	/// # Decoded Full TOC.
	pub full_toc: Option<FullToc>,

	/// # Decoded TOC.
	pub toc: Option<Toc>,

	/// # Decoded ATIP.
	pub atip: Option<Atip>,

	/// # Decoded Disc Information.
	pub disc_info: Option<DiscInformation>,

	/// # Media Catalogue Number.
	pub mcn: Option<String>,

	/// # Audio TOC.
	pub cdtoc: Option<cdtoc::Toc>,
}

impl fmt::Display for Survey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.vendor_model {
			Some(vm) => writeln!(f, "Drive:        {vm}")?,
			None => writeln!(f, "Drive:        unknown")?,
		}
		if let Some(o) = self.drive_offset { writeln!(f, "Drive offset: {} samples", o.samples())?; }
		writeln!(f, "Media:        {}", self.media_type)?;
		if let Some(mcn) = &self.mcn { writeln!(f, "MCN:          {mcn}")?; }
		if let Some(toc) = &self.cdtoc {
			writeln!(f, "CDTOC:        {toc}")?;
			writeln!(f, "AccurateRip:  {}", toc.accuraterip_id())?;
		}

		writeln!(f, "\nTracks:")?;
		for t in &self.tracks { writeln!(f, "  {t}")?; }

		if let Some(v) = &self.toc { writeln!(f, "\nTOC:\n{v}")?; }
		if let Some(v) = &self.full_toc { writeln!(f, "\nFull TOC:\n{v}")?; }
		if let Some(v) = &self.atip { writeln!(f, "\nATIP:\n{v}")?; }
		if let Some(v) = &self.disc_info { writeln!(f, "\nDisc Information:\n{v}")?; }
		Ok(())
	}
}



/// # Dumper.
///
/// Borrow a drive and an image writer, then call [`Dumper::dump`].
pub struct Dumper<'a> {
	drive: &'a mut dyn Drive,
	image: &'a mut dyn ImageWriter,
	opts: DumpOptions,
	progress: Box<dyn ProgressSink + 'a>,
	log: DumpLog,
	paths: Option<DumpPaths>,
	killed: KillSwitch,
}

impl fmt::Debug for Dumper<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Dumper")
			.field("opts", &self.opts)
			.field("paths", &self.paths)
			.finish_non_exhaustive()
	}
}

impl<'a> Dumper<'a> {
	#[must_use]
	/// # New.
	pub fn new(drive: &'a mut dyn Drive, image: &'a mut dyn ImageWriter, opts: DumpOptions) -> Self {
		Self {
			drive,
			image,
			opts,
			progress: Box::new(NoProgress),
			log: DumpLog::new(),
			paths: None,
			killed: KillSwitch::default(),
		}
	}

	#[must_use]
	/// # With Progress.
	pub fn with_progress<P: ProgressSink + 'a>(mut self, progress: P) -> Self {
		self.progress = Box::new(progress);
		self
	}

	#[must_use]
	/// # With Kill Switch.
	pub fn with_kill_switch(mut self, killed: KillSwitch) -> Self {
		self.killed = killed;
		self
	}

	/// # With Paths.
	///
	/// Enable the on-disk log, resume state, and sidecar, all named after
	/// `stem`.
	///
	/// ## Errors
	///
	/// Returns an error if the log can't be created.
	pub fn with_paths<P: AsRef<Path>>(mut self, stem: P) -> Result<Self, DumpError> {
		let paths = DumpPaths::from_stem(stem);
		self.log.attach(&paths.log)?;
		self.paths.replace(paths);
		Ok(self)
	}

	#[must_use]
	/// # Log.
	pub const fn log(&self) -> &DumpLog { &self.log }

	/// # Survey.
	///
	/// Gather the drive and disc details without reading any user data.
	///
	/// ## Errors
	///
	/// Returns an error if no track list can be assembled.
	pub fn survey(&mut self) -> Result<Survey, DumpError> {
		let mut map = build_track_list(self.drive, self.opts.force(), &mut self.log)?;
		let support = ReadSupport::probe(self.drive);
		detect_track_modes(self.drive, &mut map.tracks, &mut map.media_type, support.readcd, &mut self.log);
		self.log.line(format!("Media type: {}.", map.media_type));

		let atip = self.drive.read_toc(TocFormat::Atip, 0, TIMEOUT)
			.ok()
			.and_then(|(raw, _)| Atip::decode(&raw));
		let disc_info = self.drive.read_disc_information(TIMEOUT)
			.ok()
			.and_then(|(raw, _)| DiscInformation::decode(&raw));
		let mcn = self.drive.read_mcn(TIMEOUT).ok().and_then(|(m, _)| m);
		let vendor_model = self.drive.vendor_model();

		Ok(Survey {
			vendor_model,
			drive_offset: vendor_model.and_then(|vm| vm.detect_offset()),
			cdtoc: audio_toc(&map.tracks, map.last_sector),
			media_type: map.media_type,
			full_toc: map.full_toc.as_deref().and_then(FullToc::decode),
			toc: map.toc.as_deref().and_then(Toc::decode),
			tracks: map.tracks,
			atip,
			disc_info,
			mcn,
		})
	}

	#[allow(clippy::too_many_lines)]
	/// # Dump.
	///
	/// Run every stage in order, from sub-channel negotiation through to the
	/// sidecar. A kill switch stops the reading early but still closes the
	/// image and saves the resume state; the report will say it was aborted.
	///
	/// ## Errors
	///
	/// Returns an error if the disc can't be mapped, the image can't hold it,
	/// a write fails, or a read fails under `stop_on_error`.
	pub fn dump(&mut self) -> Result<DumpReport, DumpError> {
		let now = Instant::now();
		let force = self.opts.force();

		// Sub-channel.
		let mut sub =
			if self.opts.subchannel() { probe_subchannel(self.drive) }
			else { Subchannel::None };
		self.status(format!("Sub-channel: {}.", sub.as_str()));

		// Read commands.
		let support = ReadSupport::probe(self.drive);
		let Some(mut cmd) = support.best() else { return Err(self.fail(DumpError::NoRead)); };
		self.status(format!("Read command: {}.", cmd.as_str()));

		// Layout.
		self.progress.on_pulse("Reading the table of contents…");
		let mut map = build_track_list(self.drive, force, &mut self.log)
			.map_err(|e| self.notify(e))?;

		let mut inexact_positioning = false;
		if matches!(sub, Subchannel::None) {
			self.log.line("No sub-channel; pregaps will not be detected.");
			for idx in 1..map.tracks.len() {
				if map.tracks[idx - 1].session != map.tracks[idx].session {
					map.tracks[idx].pregap = u32::from(CD_LEADIN);
				}
			}
		}
		else {
			self.progress.on_pulse("Solving pregaps…");
			let report = solve_pregaps(self.drive, &mut map.tracks, sub, self.opts.skip_same_type(), &mut self.log);
			inexact_positioning = report.inexact_positioning;
		}

		let hidden = self.hidden_track(&mut map, support.readcd);
		let gaps = reconcile(&mut map.tracks, &map.lead_outs, map.last_sector);
		detect_track_modes(self.drive, &mut map.tracks, &mut map.media_type, support.readcd, &mut self.log);
		validate_tracks(&map.tracks).map_err(|e| self.fail(e))?;
		self.log.line(format!("Media type: {}.", map.media_type));
		for t in &map.tracks { self.log.line(t.to_string()); }

		// What can the image hold?
		let caps = self.image.capabilities();
		self.check_capabilities(caps, &map.tracks, &mut sub, &mut cmd, support)?;

		// Geometry.
		let blocks = map.blocks();
		let mut geometry = Geometry::new(blocks, sub, cmd);
		geometry.media_type = map.media_type;
		geometry.hidden_track = hidden;
		geometry.max_transfer = probe_max_transfer(self.drive, &geometry, self.opts.max_transfer())
			.map_err(|e| self.fail(e))?;
		self.status(format!("Reading up to {} sector(s) at a time.", geometry.max_transfer));
		for t in &mut map.tracks { t.subchannel = geometry.subchannel(); }

		// Container.
		self.image.create(map.media_type, u64::from(blocks), geometry.sector_size())
			.map_err(|e| self.fail(e))?;
		if let Err(e) = self.image.set_tracks(&map.tracks) {
			if ! geometry.downgrade_subchannel(Subchannel::None) { return Err(self.fail(e)); }
			self.log.line(format!("The image rejected the track layout ({e}); retrying without sub-channel."));
			for t in &mut map.tracks { t.subchannel = Subchannel::None; }
			self.image.set_tracks(&map.tracks).map_err(|e| self.fail(e))?;
		}

		// Static metadata.
		let mcn = self.static_metadata(caps, &mut map.tracks);

		// Offset.
		let (offset, offset_source) = self.resolve_offset(&map.tracks, geometry.readcd());
		geometry.offset_bytes = offset.map_or(0, ReadOffset::bytes);
		let offset_bytes =
			if self.opts.fix_offset() && geometry.readcd() { geometry.offset_bytes }
			else { 0 };

		// Resume.
		let mut resume = self.load_resume(Resume::fingerprint(&map.tracks, blocks))?;

		// Read!
		let (res, speed, first_pregap) = {
			let mut share = DumpShare {
				drive: &mut *self.drive,
				image: &mut *self.image,
				progress: &mut *self.progress,
				log: &mut self.log,
				resume: &mut resume,
				resume_path: self.paths.as_ref().map(|p| p.resume.as_path()),
				killed: &self.killed,
				geometry,
				tracks: &map.tracks,
				lead_outs: &gaps,
				opts: self.opts,
				offset: offset_bytes,
				speed: Speed::new(),
				last_save: Instant::now(),
			};
			let mut first_pregap = false;
			let res = run_passes(&mut share, &mut first_pregap);
			(res, share.speed, first_pregap)
		};
		if let Err(e) = res {
			let _res = self.image.close();
			return Err(self.fail(e));
		}

		// Wrap up.
		let aborted = self.killed.killed();
		if caps.media_tags { self.media_tags(&map); }
		self.image.close().map_err(|e| self.fail(e))?;

		if self.opts.sidecar() && ! aborted {
			if let Some(paths) = &self.paths {
				write_sidecar(
					&paths.sidecar,
					self.image.main_path(),
					&geometry,
					&map.tracks,
					resume.bad_blocks(),
				).map_err(|e| self.fail(e))?;
			}
		}

		let report = DumpReport {
			sessions: Session::from_tracks(&map.tracks),
			tracks: map.tracks,
			geometry,
			bad_blocks: resume.bad_blocks().clone(),
			inexact_positioning,
			aborted,
			first_pregap,
			offset,
			offset_source,
			mcn,
			speed_min: speed.min(),
			speed_max: speed.max(),
			speed_avg: speed.average(),
			write_time: speed.write_time(),
			elapsed: now.elapsed(),
		};
		self.log.line(format!(
			"Finished in {} with {} bad block(s).",
			report.nice_elapsed(),
			report.bad_blocks.len(),
		));
		Ok(report)
	}
}

impl Dumper<'_> {
	/// # Status Line.
	fn status(&mut self, msg: String) {
		self.progress.on_status(&msg);
		self.log.line(msg);
	}

	/// # Notify (Already Logged).
	fn notify(&mut self, err: DumpError) -> DumpError {
		self.progress.on_error(&err.to_string());
		err
	}

	/// # Log and Notify.
	fn fail(&mut self, err: DumpError) -> DumpError {
		let err = self.log.error(err);
		self.notify(err)
	}

	/// # Hidden Track.
	///
	/// Anything ahead of the first track is folded into its pregap so it
	/// gets read along with everything else.
	fn hidden_track(&mut self, map: &mut TrackMap, readcd: bool) -> HiddenTrack {
		let Some(first) = map.tracks.first_mut() else { return HiddenTrack::None; };
		let hidden = detect_hidden_track(self.drive, first, readcd);
		if ! matches!(hidden, HiddenTrack::None) {
			first.pregap = first.start.unsigned_abs() + u32::from(CD_LEADIN);
			self.log.line(format!(
				"Found a {} hidden track ahead of track 1; it will be kept with its pregap.",
				hidden.as_str(),
			));
			if matches!(hidden, HiddenTrack::CdiReady) { map.media_type = MediaType::CdiReady; }
		}
		hidden
	}

	/// # Check Image Capabilities.
	///
	/// Some shortfalls can be worked around by settling for less, but only
	/// with `force`.
	fn check_capabilities(
		&mut self,
		caps: ImageCapabilities,
		tracks: &[Track],
		sub: &mut Subchannel,
		cmd: &mut ReadCommand,
		support: ReadSupport,
	) -> Result<(), DumpError> {
		let force = self.opts.force();

		if usize::from(caps.max_tracks) < tracks.len() {
			return Err(self.fail(DumpError::Capability("The image format cannot hold this many tracks.")));
		}

		let audio = tracks.iter().any(|t| t.kind.is_audio());
		if audio && ! caps.audio {
			return Err(self.fail(DumpError::Capability("The image format cannot store audio tracks.")));
		}

		if ! caps.long_sectors && matches!(cmd, ReadCommand::ReadCd) {
			match support.best_cooked() {
				Some(cooked) if force && ! audio => {
					self.log.line(format!("The image cannot store raw sectors; falling back to {}.", cooked.as_str()));
					*cmd = cooked;
					*sub = Subchannel::None;
				},
				_ => return Err(self.fail(DumpError::Capability(
					"The image format cannot store raw sectors.",
				))),
			}
		}

		if ! matches!(sub, Subchannel::None) && ! caps.subchannel {
			if ! force {
				return Err(self.fail(DumpError::Capability("The image format cannot store sub-channel data.")));
			}
			self.log.line("The image cannot store sub-channel data; it will be skipped.");
			*sub = Subchannel::None;
		}

		if ! caps.sessions && tracks.last().is_some_and(|t| t.session != 1) {
			if ! force {
				return Err(self.fail(DumpError::Capability("The image format cannot store multiple sessions.")));
			}
			self.log.line("The image cannot store sessions; the layout will be flattened.");
		}

		Ok(())
	}

	/// # Static Metadata.
	///
	/// MCN, track flags, and ISRCs. None of these are worth failing over.
	fn static_metadata(&mut self, caps: ImageCapabilities, tracks: &mut [Track]) -> Option<String> {
		let mcn = match self.drive.read_mcn(TIMEOUT) {
			Ok((mcn, _)) => mcn,
			Err(e) => {
				log::debug!("MCN unavailable: {e}.");
				None
			},
		};
		if let Some(mcn) = &mcn {
			self.log.line(format!("MCN: {mcn}."));
			if caps.media_tags {
				let res = self.image.write_media_tag(mcn.as_bytes(), MediaTag::CdMcn);
				self.soft(res, "MCN");
			}
		}

		for t in tracks {
			let number = i32::from(t.number);
			if caps.track_flags {
				let res = self.image.write_sector_tag(&[t.flags.as_u8()], number, SectorTag::CdTrackFlags);
				self.soft(res, "track flags");
			}

			if ! t.kind.is_audio() { continue; }
			if let Ok((Some(isrc), _)) = self.drive.read_isrc(t.number, TIMEOUT) {
				self.log.line(format!("Track {:02} ISRC: {isrc}.", t.number));
				if caps.track_isrc {
					let res = self.image.write_sector_tag(isrc.as_bytes(), number, SectorTag::CdTrackIsrc);
					self.soft(res, "ISRC");
				}
				t.isrc.replace(isrc);
			}
		}

		mcn
	}

	/// # Soft Failure.
	fn soft(&mut self, res: Result<(), DumpError>, what: &str) {
		if let Err(e) = res { self.log.line(format!("Could not store the {what}: {e}")); }
	}

	/// # Resolve Read Offset.
	///
	/// The user's word is final; otherwise measure it from a data track,
	/// falling back to the drive database.
	fn resolve_offset(&mut self, tracks: &[Track], readcd: bool) -> (Option<ReadOffset>, OffsetSource) {
		let (offset, source) =
			if let Some(o) = self.opts.offset() { (Some(o), OffsetSource::User) }
			else if let Some(o) = readcd.then(|| combined_offset(self.drive, tracks)).flatten() {
				(Some(o), OffsetSource::Combined)
			}
			else if let Some(o) = self.drive.vendor_model().and_then(|vm| vm.detect_offset()) {
				(Some(o), OffsetSource::Database)
			}
			else { (None, OffsetSource::None) };

		match offset {
			Some(o) => self.log.line(format!(
				"Read offset: {} samples ({}).",
				o.samples(),
				source.as_str(),
			)),
			None if tracks.iter().any(|t| t.kind.is_audio()) => {
				self.status("The read offset is unknown; audio will not be corrected.".to_owned());
			},
			None => {},
		}

		(offset, source)
	}

	/// # Load Resume State.
	fn load_resume(&mut self, fingerprint: u32) -> Result<Resume, DumpError> {
		let Some(path) = self.paths.as_ref().map(|p| p.resume.clone()) else {
			return Ok(Resume::new(fingerprint));
		};
		if ! self.opts.resume() { return Ok(Resume::new(fingerprint)); }

		match Resume::load(&path, fingerprint) {
			Ok(Some(resume)) => {
				self.status(format!(
					"Resuming from sector {} with {} bad block(s).",
					resume.next_block(),
					resume.bad_blocks().len(),
				));
				Ok(resume)
			},
			Ok(None) => Ok(Resume::new(fingerprint)),
			Err(DumpError::ResumeMismatch) if self.opts.force() => {
				self.log.line("The resume state belongs to a different disc; starting over.");
				Ok(Resume::new(fingerprint))
			},
			Err(e) => Err(self.fail(e)),
		}
	}

	/// # Media Tags.
	///
	/// The raw TOC structures, kept verbatim. Anything the drive won't give
	/// up is skipped.
	fn media_tags(&mut self, map: &TrackMap) {
		if let Some(raw) = map.toc.as_deref() {
			let res = self.image.write_media_tag(raw, MediaTag::CdToc);
			self.soft(res, "TOC");
		}
		if let Some(raw) = map.full_toc.as_deref() {
			let res = self.image.write_media_tag(raw, MediaTag::CdFullToc);
			self.soft(res, "full TOC");
		}

		for (format, tag, what) in [
			(TocFormat::SessionInfo, MediaTag::CdSessionInfo, "session information"),
			(TocFormat::Atip, MediaTag::CdAtip, "ATIP"),
			(TocFormat::Pma, MediaTag::CdPma, "PMA"),
			(TocFormat::CdText, MediaTag::CdText, "CD-TEXT"),
		] {
			match self.drive.read_toc(format, 0, TIMEOUT) {
				// Anything shorter is just a header.
				Ok((raw, _)) if 4 < raw.len() => {
					let res = self.image.write_media_tag(&raw, tag);
					self.soft(res, what);
				},
				Ok(_) => {},
				Err(e) => log::debug!("No {what}: {e}."),
			}
		}
	}
}



/// # Run the Read Passes.
///
/// First pregap (fresh dumps only), then the main pass, trim, and retries.
fn run_passes(share: &mut DumpShare, first_pregap: &mut bool) -> Result<(), DumpError> {
	if share.resume.next_block() <= 0 && share.resume.extents().sectors() == 0 {
		*first_pregap = read_first_pregap(share)?;
	}

	read_disc(share)?;
	if share.killed.killed() { return share.save(); }

	if share.opts.trim() { trim(share)?; }
	retry(share)?;
	share.save()
}



#[cfg(test)]
mod test {
	use super::*;
	use test_support::{
		MemoryImage,
		MockDrive,
		MockTrack,
	};
	use crate::{
		progress::test::RecordingSink,
		TrackKind,
	};

	/// # Audio, Mode 1, Audio.
	fn mixed() -> MockDrive {
		MockDrive::new(
			vec![
				MockTrack::audio(1, 0, 150),
				MockTrack::data(2, 1, 300, 0),
				MockTrack::audio(3, 600, 0),
			],
			&[900],
		)
	}

	#[test]
	fn t_dump() {
		let mut drive = mixed();
		let mut image = MemoryImage::new();
		let report = Dumper::new(&mut drive, &mut image, DumpOptions::default())
			.dump()
			.expect("Dump failed.");

		let pregaps: Vec<u32> = report.tracks.iter().map(|t| t.pregap).collect();
		assert_eq!(pregaps, [150, 0, 0], "Wrong pregaps.");

		let kinds: Vec<TrackKind> = report.tracks.iter().map(|t| t.kind).collect();
		assert_eq!(kinds, [TrackKind::Audio, TrackKind::CdMode1, TrackKind::Audio]);

		assert!(report.bad_blocks.is_empty(), "A clean disc should have no bad blocks.");
		assert!(! report.aborted);
		assert_eq!(report.sessions.len(), 1);
		assert_eq!(report.geometry.blocks, 900);
		assert_eq!(report.offset_source, OffsetSource::None);

		assert!(image.closed, "The image was never closed.");
		assert_eq!(image.created, Some((MediaType::Cd, 900, 2352)));
		assert_eq!(image.tracks.len(), 3);
		for lba in 0..900 {
			assert_eq!(image.main.get(&lba), Some(&drive.true_sector(lba)), "Sector {lba} mismatch.");
			assert_eq!(image.subs.get(&lba).map(Vec::len), Some(96), "Sector {lba} sub-channel missing.");
		}
		assert!(image.media_tags.contains_key(&MediaTag::CdToc));
		assert!(image.media_tags.contains_key(&MediaTag::CdFullToc));
		assert!(! image.media_tags.contains_key(&MediaTag::CdFirstTrackPregap));
	}

	#[test]
	fn t_dump_metadata() {
		let mut drive = mixed();
		drive.mcn = Some("0123456789012".to_owned());
		drive.isrc.insert(3, "USRC17607839".to_owned());
		let mut image = MemoryImage::new();
		let report = Dumper::new(&mut drive, &mut image, DumpOptions::default())
			.dump()
			.expect("Dump failed.");

		assert_eq!(report.mcn.as_deref(), Some("0123456789012"));
		assert_eq!(report.tracks[2].isrc.as_deref(), Some("USRC17607839"));
		assert_eq!(
			image.media_tags.get(&MediaTag::CdMcn).map(Vec::as_slice),
			Some(&b"0123456789012"[..]),
		);
		assert_eq!(
			image.track_tags.get(&(3, SectorTag::CdTrackIsrc)).map(Vec::as_slice),
			Some(&b"USRC17607839"[..]),
		);
		assert_eq!(
			image.track_tags.get(&(2, SectorTag::CdTrackFlags)).map(Vec::as_slice),
			Some(&[4_u8][..]),
			"Data track flags missing.",
		);
	}

	#[test]
	fn t_dump_offset() {
		// A user-supplied offset is applied to audio only.
		let mut drive = mixed();
		drive.offset_bytes = 2668;
		let mut image = MemoryImage::new();
		let opts = DumpOptions::default().with_offset(ReadOffset::from_bytes(2668));
		let report = Dumper::new(&mut drive, &mut image, opts)
			.dump()
			.expect("Dump failed.");

		assert_eq!(report.offset_source, OffsetSource::User);
		assert_eq!(report.geometry.offset_bytes, 2668);
		assert!(report.bad_blocks.is_empty());

		// Audio is corrected up to the data track and the end of the disc;
		// whatever lies beyond either is zero-filled.
		for lba in 0..300 {
			assert_eq!(image.main.get(&lba), Some(&drive.corrected_sector(lba, 2668, -150, 299)), "Sector {lba} mismatch.");
		}
		for lba in 300..600 {
			assert_eq!(image.main.get(&lba), Some(&drive.true_sector(lba)), "Data sector {lba} mismatch.");
		}
		for lba in 600..900 {
			assert_eq!(image.main.get(&lba), Some(&drive.corrected_sector(lba, 2668, 600, 899)), "Sector {lba} mismatch.");
		}
	}

	#[test]
	fn t_dump_offset_sessions() {
		// CD-Plus: the first session's audio runs right up to a lead-out.
		let mut drive = MockDrive::new(
			vec![
				MockTrack::audio(1, 0, 150),
				MockTrack::audio(2, 500, 0),
				MockTrack::data(3, 2, 12_400, 150).in_session(2),
			],
			&[1000, 13_000],
		);
		drive.offset_bytes = 2668;
		let mut image = MemoryImage::new();
		let opts = DumpOptions::default().with_offset(ReadOffset::from_bytes(2668));
		let report = Dumper::new(&mut drive, &mut image, opts)
			.dump()
			.expect("Dump failed.");

		assert_eq!(report.geometry.media_type, MediaType::CdPlus);
		assert_eq!(report.sessions.len(), 2);
		assert!(report.bad_blocks.is_empty(), "Sectors lost at the session boundary: {:?}.", report.bad_blocks);
		for lba in 0..1000 {
			assert_eq!(image.main.get(&lba), Some(&drive.corrected_sector(lba, 2668, -150, 999)), "Sector {lba} mismatch.");
		}
		assert!(! image.main.contains_key(&1000), "The lead-out should not be read.");
		assert!(! image.main.contains_key(&12_249), "The session gap should not be read.");
		for lba in 12_250..13_000 {
			assert_eq!(image.main.get(&lba), Some(&drive.true_sector(lba)), "Data sector {lba} mismatch.");
		}
	}

	#[test]
	fn t_dump_pregaps() {
		let mut drive = MockDrive::new(
			vec![
				MockTrack::audio(1, 0, 150),
				MockTrack::audio(2, 1000, 75),
				MockTrack::data(3, 1, 3000, 187),
				MockTrack::audio(4, 4000, 2),
			],
			&[5000],
		);
		let mut image = MemoryImage::new();
		let report = Dumper::new(&mut drive, &mut image, DumpOptions::default())
			.dump()
			.expect("Dump failed.");

		let layout: Vec<(u32, i32, i32)> = report.tracks.iter().map(|t| (t.pregap, t.start, t.end)).collect();
		assert_eq!(
			layout,
			[(150, 0, 924), (75, 1000, 2812), (187, 3000, 3997), (2, 4000, 4999)],
			"Solved pregaps did not make it into the layout.",
		);
		assert!(! report.inexact_positioning);
		assert!(report.bad_blocks.is_empty());
		assert_eq!(
			image.tracks.iter().map(|t| t.pregap).collect::<Vec<_>>(),
			[150, 75, 187, 2],
			"The image got the wrong pregaps.",
		);
		for lba in 0..5000 {
			assert_eq!(image.main.get(&lba), Some(&drive.true_sector(lba)), "Sector {lba} mismatch.");
		}
	}

	#[test]
	fn t_dump_stop_on_error() {
		let mut drive = mixed();
		drive.permanent.insert(450);
		let mut image = MemoryImage::new();
		let mut progress = RecordingSink::default();
		let opts = DumpOptions::default().with_stop_on_error(true);
		let res = {
			let mut dumper = Dumper::new(&mut drive, &mut image, opts).with_progress(&mut progress);
			let res = dumper.dump();
			assert!(dumper.log().contains("ERROR:"), "The failure was not logged.");
			res
		};
		assert!(matches!(res, Err(DumpError::ReadStop(lba, _)) if (400..=450).contains(&lba)));
		assert_eq!(progress.errors.len(), 1, "The failure should be reported once.");
		assert!(image.closed, "The image should still be closed.");
	}

	#[test]
	fn t_dump_capabilities() {
		let mut drive = mixed();
		let mut image = MemoryImage::new();
		image.caps.subchannel = false;
		let res = Dumper::new(&mut drive, &mut image, DumpOptions::default()).dump();
		assert!(matches!(res, Err(DumpError::Capability(_))), "Sub-channel shortfall should need force.");

		let mut image = MemoryImage::new();
		image.caps.subchannel = false;
		let report = Dumper::new(&mut drive, &mut image, DumpOptions::default().with_force(true))
			.dump()
			.expect("Forced dump failed.");
		assert_eq!(report.geometry.subchannel(), Subchannel::None);
		assert!(image.subs.is_empty(), "Sub-channel should have been dropped.");

		let mut image = MemoryImage::new();
		image.caps.audio = false;
		let res = Dumper::new(&mut drive, &mut image, DumpOptions::default().with_force(true)).dump();
		assert!(matches!(res, Err(DumpError::Capability(_))), "Audio can't be forced.");

		// A layout rejection triggers a single downgrade.
		let mut image = MemoryImage::new();
		image.reject_subchannel = true;
		let report = Dumper::new(&mut drive, &mut image, DumpOptions::default())
			.dump()
			.expect("Downgraded dump failed.");
		assert_eq!(report.geometry.subchannel(), Subchannel::None);
		assert_eq!(image.tracks.len(), 3);
	}

	#[test]
	fn t_dump_resume() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let stem = dir.path().join("disc");
		let mut drive = mixed();

		// Killed before a single sector.
		let killed = KillSwitch::default();
		killed.kill();
		let mut image = MemoryImage::new();
		let report = Dumper::new(&mut drive, &mut image, DumpOptions::default())
			.with_kill_switch(killed)
			.with_paths(&stem)
			.expect("Paths failed.")
			.dump()
			.expect("Dump failed.");
		assert!(report.aborted);
		assert!(image.main.is_empty());

		let paths = DumpPaths::from_stem(&stem);
		assert!(paths.resume.is_file(), "Resume state not saved.");
		assert!(paths.log.is_file(), "Log not created.");
		assert!(! paths.sidecar.exists(), "Aborted dumps get no sidecar.");

		// Pick up where it left off.
		let mut image = MemoryImage::new();
		let report = Dumper::new(&mut drive, &mut image, DumpOptions::default())
			.with_paths(&stem)
			.expect("Paths failed.")
			.dump()
			.expect("Dump failed.");
		assert!(! report.aborted);
		assert!(report.bad_blocks.is_empty());
		assert_eq!(image.main.len(), 900);
		assert!(paths.sidecar.is_file(), "Sidecar missing.");

		// A different disc doesn't match.
		let mut other = MockDrive::new(vec![MockTrack::audio(1, 0, 150)], &[500]);
		let mut image = MemoryImage::new();
		let res = Dumper::new(&mut other, &mut image, DumpOptions::default())
			.with_paths(&stem)
			.expect("Paths failed.")
			.dump();
		assert_eq!(res.err(), Some(DumpError::ResumeMismatch));
	}

	#[test]
	fn t_survey() {
		let mut drive = mixed();
		let mut image = MemoryImage::new();
		let survey = Dumper::new(&mut drive, &mut image, DumpOptions::default())
			.survey()
			.expect("Survey failed.");
		assert_eq!(survey.tracks.len(), 3);
		assert!(survey.full_toc.is_some());
		assert!(survey.toc.is_some());
		assert_eq!(survey.tracks[1].kind, TrackKind::CdMode1);
		assert!(image.main.is_empty());
	}

	#[test]
	fn t_survey_log() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let stem = dir.path().join("disc");
		let mut drive = mixed();
		let mut image = MemoryImage::new();

		let mut dumper = Dumper::new(&mut drive, &mut image, DumpOptions::default());
		dumper.survey().expect("Survey failed.");
		let before = dumper.log().lines().len();
		assert!(dumper.log().contains("Media type:"), "Survey logged nothing.");

		let report = dumper.with_paths(&stem)
			.expect("Paths failed.")
			.dump()
			.expect("Dump failed.");
		assert!(report.bad_blocks.is_empty());

		let raw = std::fs::read_to_string(DumpPaths::from_stem(&stem).log)
			.expect("Read failed.");
		assert!(
			raw.lines().count() > before,
			"The dump should append to the survey lines."
		);
		assert_eq!(
			raw.matches("Media type:").count(),
			2,
			"Both the survey and the dump layout belong in the log file."
		);
	}

	#[test]
	fn t_paths() {
		let paths = DumpPaths::from_stem("/tmp/disc");
		assert_eq!(paths.resume, PathBuf::from("/tmp/disc.resume"));
		assert_eq!(paths.log, PathBuf::from("/tmp/disc.log"));
		assert_eq!(paths.sidecar, PathBuf::from("/tmp/disc.sidecar.txt"));
	}
}
