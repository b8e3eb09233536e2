/*!
# Disc Dump: Dump Options
*/

use crate::ReadOffset;



/// # FLAG: Force (Downgrade Instead of Abort).
const FLAG_FORCE: u8 =          0b0000_0001;

/// # FLAG: Stop on First Read Error.
const FLAG_STOP_ON_ERROR: u8 =  0b0000_0010;

/// # FLAG: Trim Pass.
const FLAG_TRIM: u8 =           0b0000_0100;

/// # FLAG: Offset Correction.
const FLAG_FIX_OFFSET: u8 =     0b0000_1000;

/// # FLAG: Resume Previous Dump.
const FLAG_RESUME: u8 =         0b0001_0000;

/// # FLAG: Sidecar.
const FLAG_SIDECAR: u8 =        0b0010_0000;

/// # FLAG: Sub-channel.
const FLAG_SUBCHANNEL: u8 =     0b0100_0000;

/// # FLAG: Skip Same-Type Pregaps.
const FLAG_SKIP_SAME_TYPE: u8 = 0b1000_0000;

/// # FLAG: Default.
const FLAG_DEFAULT: u8 =
	FLAG_TRIM | FLAG_FIX_OFFSET | FLAG_RESUME | FLAG_SIDECAR | FLAG_SUBCHANNEL;

/// # Maximum Retry Passes.
const RETRY_MAX: u8 = 32;

/// # Maximum Skip.
const SKIP_MAX: u16 = 512;

/// # Minimum Transfer.
const TRANSFER_MIN: u16 = 2;

/// # Maximum Transfer.
const TRANSFER_MAX: u16 = 256;



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Dump Options.
///
/// Options are set using builder-style methods, like:
///
/// ```
/// use discdump_core::DumpOptions;
///
/// let opts = DumpOptions::default()
///     .with_retry_passes(3)
///     .with_skip(Some(16))
///     .with_trim(false);
///
/// assert_eq!(opts.retry_passes(), 3);
/// assert_eq!(opts.skip(), Some(16));
/// assert!(! opts.trim());
/// ```
pub struct DumpOptions {
	offset: Option<ReadOffset>,
	retry_passes: u8,
	skip: u16,
	max_transfer: u16,
	flags: u8,
}

impl Default for DumpOptions {
	fn default() -> Self {
		Self {
			offset: None,
			retry_passes: 5,
			skip: 0,
			max_transfer: 64,
			flags: FLAG_DEFAULT,
		}
	}
}

macro_rules! with_flag {
	($fn:ident, $flag:ident, $($doc:literal),+ $(,)?) => (
		#[must_use]
		$(
			#[doc = $doc]
		)+
		pub const fn $fn(self, v: bool) -> Self {
			let flags =
				if v { self.flags | $flag }
				else { self.flags & ! $flag };

			Self {
				flags,
				..self
			}
		}
	)
}

/// ## Setters.
impl DumpOptions {
	with_flag!(
		with_fix_offset,
		FLAG_FIX_OFFSET,
		"# Offset Correction.",
		"",
		"When `true`, audio sectors are shifted by the resolved read offset",
		"so the image matches the disc rather than the drive.",
		"",
		"The default is `true`.",
	);

	with_flag!(
		with_force,
		FLAG_FORCE,
		"# Force.",
		"",
		"When `true`, capability problems (sub-channel, unreadable TOC, etc.)",
		"downgrade the dump instead of stopping it.",
		"",
		"The default is `false`.",
	);

	#[must_use]
	/// # Maximum Transfer.
	///
	/// The most sectors to ask for in a single command. The drive is probed
	/// and may support fewer.
	///
	/// Values are capped to `2..=256`, with a default of `64`.
	pub const fn with_max_transfer(self, mut max_transfer: u16) -> Self {
		if max_transfer < TRANSFER_MIN { max_transfer = TRANSFER_MIN; }
		else if TRANSFER_MAX < max_transfer { max_transfer = TRANSFER_MAX; }
		Self {
			max_transfer,
			..self
		}
	}

	#[must_use]
	/// # Read Offset.
	///
	/// Override the detected offset. `None` means auto.
	pub const fn with_offset(self, offset: Option<ReadOffset>) -> Self {
		Self {
			offset,
			..self
		}
	}

	with_flag!(
		with_resume,
		FLAG_RESUME,
		"# Resume Previous Dump.",
		"",
		"When `true`, a saved state for the same disc is picked up where it",
		"left off.",
		"",
		"The default is `true`.",
	);

	#[must_use]
	/// # Retry Passes.
	///
	/// The number of full passes over the remaining bad blocks after the trim
	/// pass, alternating direction each time.
	///
	/// The default is `5`; the maximum is `32`.
	pub const fn with_retry_passes(self, mut retry_passes: u8) -> Self {
		if RETRY_MAX < retry_passes { retry_passes = RETRY_MAX; }
		Self {
			retry_passes,
			..self
		}
	}

	with_flag!(
		with_sidecar,
		FLAG_SIDECAR,
		"# Sidecar.",
		"",
		"When `true`, a checksum/layout summary is written beside the image.",
		"",
		"The default is `true`.",
	);

	#[must_use]
	/// # Skip.
	///
	/// The number of sectors to jump over after a read error. `None` uses the
	/// current batch size.
	///
	/// Values are capped to `1..=512`.
	pub const fn with_skip(self, skip: Option<u16>) -> Self {
		let skip = match skip {
			None | Some(0) => 0,
			Some(s) => if SKIP_MAX < s { SKIP_MAX } else { s },
		};
		Self {
			skip,
			..self
		}
	}

	with_flag!(
		with_skip_same_type,
		FLAG_SKIP_SAME_TYPE,
		"# Skip Same-Type Pregaps.",
		"",
		"When `true`, pregap detection is skipped for tracks of the same type",
		"as the one before them.",
		"",
		"The default is `false`.",
	);

	with_flag!(
		with_stop_on_error,
		FLAG_STOP_ON_ERROR,
		"# Stop on Error.",
		"",
		"When `true`, the first unreadable sector ends the dump.",
		"",
		"The default is `false`.",
	);

	with_flag!(
		with_subchannel,
		FLAG_SUBCHANNEL,
		"# Sub-channel.",
		"",
		"When `true`, sub-channel data is read (if the drive can) and stored",
		"(if the image can).",
		"",
		"The default is `true`.",
	);

	with_flag!(
		with_trim,
		FLAG_TRIM,
		"# Trim Pass.",
		"",
		"When `true`, each bad block is re-read once right after the main",
		"pass.",
		"",
		"The default is `true`.",
	);
}



macro_rules! get_flag {
	($fn:ident, $flag:ident, $title:literal) => (
		#[must_use]
		#[doc = concat!("# ", $title, "?")]
		pub const fn $fn(&self) -> bool { $flag == self.flags & $flag }
	);
}

/// # Getters.
impl DumpOptions {
	get_flag!(fix_offset, FLAG_FIX_OFFSET, "Offset Correction");
	get_flag!(force, FLAG_FORCE, "Force");
	get_flag!(resume, FLAG_RESUME, "Resume Previous Dump");
	get_flag!(sidecar, FLAG_SIDECAR, "Sidecar");
	get_flag!(skip_same_type, FLAG_SKIP_SAME_TYPE, "Skip Same-Type Pregaps");
	get_flag!(stop_on_error, FLAG_STOP_ON_ERROR, "Stop on Error");
	get_flag!(subchannel, FLAG_SUBCHANNEL, "Sub-channel");
	get_flag!(trim, FLAG_TRIM, "Trim Pass");

	#[must_use]
	/// # Maximum Transfer.
	pub const fn max_transfer(&self) -> u32 { self.max_transfer as u32 }

	#[must_use]
	/// # Read Offset Override.
	pub const fn offset(&self) -> Option<ReadOffset> { self.offset }

	#[must_use]
	/// # Retry Passes.
	pub const fn retry_passes(&self) -> u8 { self.retry_passes }

	#[must_use]
	/// # Skip.
	pub const fn skip(&self) -> Option<u16> {
		if self.skip == 0 { None } else { Some(self.skip) }
	}
}
