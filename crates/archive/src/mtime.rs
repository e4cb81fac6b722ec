//! Entry timestamps.
//!
//! Archive entries carry an MS-DOS style local timestamp (two-second
//! resolution, 1980..=2107). While an archive is extracted the timestamp lives
//! on as the file's modification time; both directions treat it as UTC so the
//! value survives unchanged.

use crate::error::{ErrorKind, Result};
use crate::longpath::for_fs;
use exn::ResultExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::SystemTime;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};
use zip::DateTime;

/// Converts an entry timestamp into a filesystem time.
pub(crate) fn to_system_time(stamp: DateTime) -> Option<SystemTime> {
    let month = Month::try_from(stamp.month()).ok()?;
    let date = Date::from_calendar_date(i32::from(stamp.year()), month, stamp.day()).ok()?;
    let time = Time::from_hms(stamp.hour(), stamp.minute(), stamp.second()).ok()?;
    Some(PrimitiveDateTime::new(date, time).assume_utc().into())
}

/// Converts a filesystem time into an entry timestamp, falling back to the
/// container epoch (1980-01-01) for times it cannot represent.
pub(crate) fn from_system_time(modified: SystemTime) -> DateTime {
    let stamp = OffsetDateTime::from(modified);
    u16::try_from(stamp.year())
        .ok()
        .and_then(|year| {
            DateTime::from_date_and_time(
                year,
                u8::from(stamp.month()),
                stamp.day(),
                stamp.hour(),
                stamp.minute(),
                stamp.second(),
            )
            .ok()
        })
        .unwrap_or_default()
}

/// The modification time to stamp on a freshly extracted file.
pub(crate) fn extracted(stamp: Option<DateTime>) -> SystemTime {
    stamp
        .and_then(to_system_time)
        .or_else(|| to_system_time(DateTime::default()))
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

pub(crate) fn set_modified(file: &File, modified: SystemTime, path: &Path) -> Result<()> {
    file.set_modified(modified).or_raise(|| ErrorKind::Io(path.to_path_buf()))
}

/// Modification time of the file at `path`.
pub fn modified(path: impl AsRef<Path>) -> Result<SystemTime> {
    let path = path.as_ref();
    std::fs::metadata(for_fs(path)).and_then(|m| m.modified()).or_raise(|| ErrorKind::Io(path.to_path_buf()))
}

/// Puts back a modification time, typically one taken with [`modified`]
/// before something else rewrote the file.
pub fn restamp(path: impl AsRef<Path>, modified: SystemTime) -> Result<()> {
    let path = path.as_ref();
    let file = OpenOptions::new().write(true).open(for_fs(path)).or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
    set_modified(&file, modified, path)
}

/// Replaces the contents of a file inside an extracted tree, keeping the
/// modification time that will become its entry timestamp.
pub fn overwrite(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<()> {
    let path = path.as_ref();
    let modified = modified(path)?;
    let io = || ErrorKind::Io(path.to_path_buf());
    let mut file = OpenOptions::new().write(true).truncate(true).open(for_fs(path)).or_raise(io)?;
    file.write_all(contents.as_ref()).or_raise(io)?;
    set_modified(&file, modified, path)
}
