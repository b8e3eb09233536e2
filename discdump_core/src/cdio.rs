/*!
# Disc Dump: `libcdio` Drive

A [`Drive`] backed by `libcdio`'s pass-through MMC interface. Commands are
built by hand and sent one at a time; failures come back with whatever
sense data the drive left behind.
*/

use crate::{
	decode::subchannel::{
		isrc_from_read_subchannel,
		mcn_from_read_subchannel,
	},
	Drive,
	DriveResult,
	DriveVendorModel,
	DumpError,
	SectorType,
	SenseError,
	Subchannel,
	TocFormat,
};
use libcdio_sys::{
	cdio_hwinfo,
	driver_id_t_DRIVER_DEVICE, // The equivalent of "use whatever's best".
	driver_return_code_t_DRIVER_OP_SUCCESS,
};
use std::{
	ffi::{
		CStr,
		CString,
	},
	os::unix::ffi::OsStrExt,
	path::Path,
	sync::Once,
	time::{
		Duration,
		Instant,
	},
};



static LIBCDIO_INIT: Once = Once::new();

/// # Data Direction: Read.
const SCSI_MMC_DATA_READ: u32 = 0;

/// # Fallback Sense.
///
/// Used when a command fails without leaving any sense data behind.
const ABORTED: SenseError = SenseError { key: 0x0B, asc: 0x00, ascq: 0x00 };

/// # READ CD: Sync, All Headers, User Data, EDC/ECC.
const READ_CD_MAIN: u8 = 0xF8;



#[derive(Debug)]
#[allow(dead_code)] // We just want to make sure dev lives as long as the ptr.
/// # `libcdio` Drive.
pub struct CdioDrive {
	dev: Option<CString>,
	ptr: *mut libcdio_sys::CdIo_t,
	vendor_model: Option<DriveVendorModel>,
}

impl Drop for CdioDrive {
	#[allow(unsafe_code)]
	fn drop(&mut self) {
		// Release the C memory!
		if ! self.ptr.is_null() {
			unsafe { libcdio_sys::cdio_destroy(self.ptr); }
		}
	}
}

impl CdioDrive {
	#[allow(unsafe_code)]
	/// # New!
	///
	/// Open the given device, or whichever one `libcdio` likes best.
	///
	/// ## Errors
	///
	/// This will return an error if the device path is obviously wrong or
	/// the device can't be opened.
	pub fn new<P>(dev: Option<P>) -> Result<Self, DumpError>
	where P: AsRef<Path> {
		// Make sure the library has been initialized.
		init();

		let dev = match dev {
			Some(dev) => {
				let dev = dev.as_ref();
				let original: String = dev.to_string_lossy().into_owned();
				if ! dev.exists() { return Err(DumpError::Device(original)); }
				Some(
					CString::new(dev.as_os_str().as_bytes())
						.map_err(|_| DumpError::Device(original))?
				)
			},
			None => None,
		};

		let ptr = unsafe {
			libcdio_sys::cdio_open(
				dev.as_ref().map_or_else(std::ptr::null, |v| v.as_ptr()),
				driver_id_t_DRIVER_DEVICE,
			)
		};

		// NULL is bad.
		if ptr.is_null() {
			return Err(DumpError::DeviceOpen(dev.map(|v| v.to_string_lossy().into_owned())));
		}

		let mut out = Self { dev, ptr, vendor_model: None };
		out.vendor_model = out.hwinfo();
		Ok(out)
	}

	#[allow(unsafe_code, clippy::cast_sign_loss)]
	/// # Drive Vendor/Model.
	fn hwinfo(&self) -> Option<DriveVendorModel> {
		let mut raw = cdio_hwinfo {
			psz_vendor: [0; 9],
			psz_model: [0; 17],
			psz_revision: [0; 5],
		};

		// The return code is a bool, true for good, instead of the usual
		// 0 for good.
		if 1 != unsafe { libcdio_sys::cdio_get_hwinfo(self.ptr, &mut raw) } { return None; }

		let vendor_u8 = raw.psz_vendor.map(|b| b as u8);
		let model_u8 = raw.psz_model.map(|b| b as u8);

		// Vendor might be empty, but model is required.
		let vendor =
			if vendor_u8[0] == 0 { "" }
			else {
				CStr::from_bytes_until_nul(vendor_u8.as_slice())
					.ok()
					.and_then(|v| v.to_str().ok())?
			};
		let model = CStr::from_bytes_until_nul(model_u8.as_slice())
			.ok()
			.and_then(|v| v.to_str().ok())
			.filter(|v| ! v.is_empty())?;

		DriveVendorModel::new(vendor, model).ok()
	}

	#[allow(unsafe_code)]
	/// # Run Command.
	///
	/// Send a (read-direction) CDB and collect `len` bytes of response.
	fn command(&mut self, cdb: [u8; 12], len: usize, timeout: Duration) -> DriveResult<Vec<u8>> {
		let len_u32 = u32::try_from(len).map_err(|_| SenseError::UNSUPPORTED)?;
		let timeout = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
		let cdb = libcdio_sys::mmc_cdb_t { field: cdb };
		let mut buf = vec![0_u8; len];

		let now = Instant::now();
		let res = unsafe {
			libcdio_sys::mmc_run_cmd(
				self.ptr,
				timeout,
				&cdb,
				SCSI_MMC_DATA_READ,
				len_u32,
				buf.as_mut_ptr().cast(),
			)
		};
		let took = now.elapsed();

		if res == driver_return_code_t_DRIVER_OP_SUCCESS { Ok((buf, took)) }
		else { Err(self.last_sense()) }
	}

	#[allow(unsafe_code)]
	/// # Last Sense.
	fn last_sense(&self) -> SenseError {
		let mut ptr: *mut libcdio_sys::cdio_mmc_request_sense_t = std::ptr::null_mut();
		let len = unsafe { libcdio_sys::mmc_last_cmd_sense(self.ptr, &mut ptr) };
		if ptr.is_null() { return ABORTED; }

		let out = match usize::try_from(len) {
			Ok(len) if 14 <= len => {
				let raw = unsafe { std::slice::from_raw_parts(ptr.cast::<u8>(), len) };
				SenseError { key: raw[2] & 0x0F, asc: raw[12], ascq: raw[13] }
			},
			_ => ABORTED,
		};

		unsafe { libcdio_sys::cdio_free(ptr.cast()); }
		out
	}

	/// # Sized Command.
	///
	/// Structures that lead with a two-byte length: fetch the header first,
	/// then the whole thing.
	fn sized(&mut self, mut cdb: [u8; 12], len_at: usize, timeout: Duration) -> DriveResult<Vec<u8>> {
		cdb[len_at..len_at + 2].copy_from_slice(&4_u16.to_be_bytes());
		let (head, _) = self.command(cdb, 4, timeout)?;
		let len = u16::from_be_bytes([head[0], head[1]]).saturating_add(2);

		cdb[len_at..len_at + 2].copy_from_slice(&len.to_be_bytes());
		self.command(cdb, usize::from(len), timeout)
	}

	/// # READ SUB-CHANNEL (Sub-Q).
	fn read_subchannel(&mut self, format: u8, track: u8, timeout: Duration) -> DriveResult<Vec<u8>> {
		self.command([0x42, 0, 0x40, format, 0, 0, track, 0, 24, 0, 0, 0], 24, timeout)
	}
}

/// # Block Address and Buffer Size.
fn frame(lba: i32, block_size: u32, count: u32) -> Result<([u8; 4], usize), SenseError> {
	let len = usize::try_from(u64::from(block_size) * u64::from(count))
		.map_err(|_| SenseError::UNSUPPORTED)?;
	Ok((lba.to_be_bytes(), len))
}

impl Drive for CdioDrive {
	fn read_cd(
		&mut self,
		lba: i32,
		block_size: u32,
		count: u32,
		kind: SectorType,
		sub: Subchannel,
		timeout: Duration,
	) -> DriveResult<Vec<u8>> {
		let (addr, len) = frame(lba, block_size, count)?;
		let [_, c1, c2, c3] = count.to_be_bytes();
		self.command(
			[0xBE, kind.cdb(), addr[0], addr[1], addr[2], addr[3], c1, c2, c3, READ_CD_MAIN, sub.cdb(), 0],
			len,
			timeout,
		)
	}

	fn read6(&mut self, lba: i32, block_size: u32, count: u32, timeout: Duration) -> DriveResult<Vec<u8>> {
		if ! (0..0x0020_0000).contains(&lba) { return Err(SenseError::OUT_OF_RANGE); }
		let count = u8::try_from(count).map_err(|_| SenseError::UNSUPPORTED)?;
		let (addr, len) = frame(lba, block_size, u32::from(count))?;
		self.command([0x08, addr[1] & 0x1F, addr[2], addr[3], count, 0, 0, 0, 0, 0, 0, 0], len, timeout)
	}

	fn read10(&mut self, lba: i32, block_size: u32, count: u32, timeout: Duration) -> DriveResult<Vec<u8>> {
		let [c1, c2] = u16::try_from(count).map_err(|_| SenseError::UNSUPPORTED)?.to_be_bytes();
		let (addr, len) = frame(lba, block_size, count)?;
		self.command([0x28, 0, addr[0], addr[1], addr[2], addr[3], 0, c1, c2, 0, 0, 0], len, timeout)
	}

	fn read12(&mut self, lba: i32, block_size: u32, count: u32, timeout: Duration) -> DriveResult<Vec<u8>> {
		let [c0, c1, c2, c3] = count.to_be_bytes();
		let (addr, len) = frame(lba, block_size, count)?;
		self.command([0xA8, 0, addr[0], addr[1], addr[2], addr[3], c0, c1, c2, c3, 0, 0], len, timeout)
	}

	/// # READ(16).
	///
	/// `libcdio` tops out at twelve-byte CDBs.
	fn read16(&mut self, _lba: i32, _block_size: u32, _count: u32, _timeout: Duration) -> DriveResult<Vec<u8>> {
		Err(SenseError::UNSUPPORTED)
	}

	fn read_toc(&mut self, format: TocFormat, track_session: u8, timeout: Duration) -> DriveResult<Vec<u8>> {
		let msf = if matches!(format, TocFormat::FullToc) { 0x02 } else { 0 };
		self.sized([0x43, msf, format.code(), 0, 0, 0, track_session, 0, 0, 0, 0, 0], 7, timeout)
	}

	fn read_disc_information(&mut self, timeout: Duration) -> DriveResult<Vec<u8>> {
		self.sized([0x51, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0], 7, timeout)
	}

	fn read_mcn(&mut self, timeout: Duration) -> DriveResult<Option<String>> {
		self.read_subchannel(2, 0, timeout)
			.map(|(buf, took)| (mcn_from_read_subchannel(&buf), took))
	}

	fn read_isrc(&mut self, track: u8, timeout: Duration) -> DriveResult<Option<String>> {
		self.read_subchannel(3, track, timeout)
			.map(|(buf, took)| (isrc_from_read_subchannel(&buf), took))
	}

	fn read_capacity10(&mut self, timeout: Duration) -> DriveResult<(u32, u32)> {
		let (buf, took) = self.command([0x25, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0], 8, timeout)?;
		let last = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
		let block = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
		Ok(((last, block), took))
	}

	/// # READ CAPACITY(16).
	///
	/// Another sixteen-byte CDB.
	fn read_capacity16(&mut self, _timeout: Duration) -> DriveResult<(u64, u32)> {
		Err(SenseError::UNSUPPORTED)
	}

	fn vendor_model(&self) -> Option<DriveVendorModel> { self.vendor_model }
}



#[allow(unsafe_code)]
/// # Initialize `libcdio`.
fn init() {
	LIBCDIO_INIT.call_once(|| unsafe { libcdio_sys::cdio_init(); });
}
