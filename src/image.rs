use crate::{
    data::{SyspageError, SyspageErrorCode},
    verbose_println,
};
use std::{
    fs::OpenOptions,
    io::{Seek, SeekFrom, Write},
};

/// Writes `syspage` into the existing image at `offset`. The file is neither
/// created nor truncated.
pub fn commit(image_path: &str, offset: u64, syspage: &[u8]) -> Result<(), SyspageError> {
    let write_error = |what: &str, err: std::io::Error| {
        SyspageError::new(
            SyspageErrorCode::ImageWriteError,
            format!("cannot {what} image {image_path} :: {err}"),
        )
    };
    let mut img = OpenOptions::new()
        .read(true)
        .write(true)
        .open(image_path)
        .map_err(|err| write_error("open", err))?;
    img.seek(SeekFrom::Start(offset))
        .map_err(|err| write_error("seek", err))?;
    img.write_all(syspage)
        .map_err(|err| write_error("write syspage into", err))?;
    img.flush().map_err(|err| write_error("flush", err))?;
    verbose_println!("wrote {:#x} bytes at offset {offset:#x} of {image_path}", syspage.len());
    Ok(())
}
