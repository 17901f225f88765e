use crate::{
    constant::{Word, ALIGNMENT, HEADER_BYTES, WORD_BYTES},
    data::{Endian, SyspageError, SyspageErrorCode},
    very_verbose_println,
};

pub fn align_up(value: usize) -> usize {
    (value + (ALIGNMENT - 1)) & !(ALIGNMENT - 1)
}

/// Bump allocator over the host copy of the syspage.
///
/// Every address handed out or accepted by the arena is an execution address,
/// i.e. where the byte will live once the image is loaded at `pkernel` and the
/// syspage sits `offs` bytes into it. Host offsets never leave this module.
pub struct Arena {
    buff: Vec<u8>,
    base: Word,
    size: usize,
    endian: Endian,
}

impl Arena {
    pub fn new(pkernel: Word, offs: Word, maxsz: usize, endian: Endian) -> Result<Self, SyspageError> {
        let base = pkernel.checked_add(offs).ok_or_else(|| {
            SyspageError::new(
                SyspageErrorCode::InvalidConfiguration,
                format!("syspage address {pkernel:#x} + {offs:#x} does not fit the target address space"),
            )
        })?;
        if base as u64 + maxsz as u64 > Word::MAX as u64 + 1 {
            return Err(SyspageError::new(
                SyspageErrorCode::InvalidConfiguration,
                format!("syspage of size {maxsz:#x} at {base:#x} does not fit the target address space"),
            ));
        }
        let size = align_up(HEADER_BYTES);
        if maxsz < size {
            return Err(SyspageError::new(
                SyspageErrorCode::InvalidConfiguration,
                format!("syspage size {maxsz:#x} cannot hold the {size:#x} byte header"),
            ));
        }
        Ok(Self {
            buff: vec![0; maxsz],
            base,
            size,
            endian,
        })
    }

    pub fn base(&self) -> Word {
        self.base
    }
    /// current high-water mark
    pub fn size(&self) -> usize {
        self.size
    }
    pub fn capacity(&self) -> usize {
        self.buff.len()
    }
    /// the allocated part of the syspage, ready to be written out
    pub fn bytes(&self) -> &[u8] {
        &self.buff[..self.size]
    }

    pub fn allocate(&mut self, sz: usize) -> Result<Word, SyspageError> {
        let aligned = align_up(self.size);
        let new_size = aligned
            .checked_add(sz)
            .map(align_up)
            .filter(|new_size| *new_size < self.capacity());
        let Some(new_size) = new_size else {
            return Err(SyspageError::new(
                SyspageErrorCode::AllocationFailed,
                format!(
                    "cannot allocate size {sz:#x}; current syspage size {:#x} of {:#x}",
                    self.size,
                    self.capacity()
                ),
            ));
        };
        let address = self.base + aligned as Word;
        self.size = new_size;
        very_verbose_println!("allocated {sz:#x} bytes at {address:#010x}");
        Ok(address)
    }

    fn offset(&self, address: Word, len: usize) -> Result<usize, SyspageError> {
        match address.checked_sub(self.base) {
            Some(offset) if offset as usize + len <= self.size => Ok(offset as usize),
            _ => Err(SyspageError::new(
                SyspageErrorCode::InvalidAddress,
                format!(
                    "[ {address:#010x} ] with length {len:#x} is outside of the syspage [ {:#010x} .. {:#010x} ]",
                    self.base,
                    self.base as usize + self.size
                ),
            )),
        }
    }

    pub fn view(&self, address: Word, len: usize) -> Result<&[u8], SyspageError> {
        let offset = self.offset(address, len)?;
        Ok(&self.buff[offset..offset + len])
    }

    pub fn view_mut(&mut self, address: Word, len: usize) -> Result<&mut [u8], SyspageError> {
        let offset = self.offset(address, len)?;
        Ok(&mut self.buff[offset..offset + len])
    }

    pub fn read_word(&self, address: Word) -> Result<Word, SyspageError> {
        let mut bytes = [0; WORD_BYTES];
        bytes.copy_from_slice(self.view(address, WORD_BYTES)?);
        Ok(self.endian.word_from_bytes(bytes))
    }

    pub fn write_word(&mut self, address: Word, word: Word) -> Result<(), SyspageError> {
        let bytes = self.endian.word_to_bytes(word);
        self.view_mut(address, WORD_BYTES)?.copy_from_slice(&bytes);
        Ok(())
    }

    pub fn write_bytes(&mut self, address: Word, bytes: &[u8]) -> Result<(), SyspageError> {
        self.view_mut(address, bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    /// reads a NUL terminated string, without the terminator
    pub fn read_str(&self, address: Word) -> Result<String, SyspageError> {
        let offset = self.offset(address, 0)?;
        let tail = &self.buff[offset..self.size];
        match tail.iter().position(|b| *b == 0) {
            Some(len) => Ok(String::from_utf8_lossy(&tail[..len]).into_owned()),
            None => Err(SyspageError::new(
                SyspageErrorCode::InvalidAddress,
                format!("string at [ {address:#010x} ] is not terminated inside the syspage"),
            )),
        }
    }
}
