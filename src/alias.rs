use crate::{
    constant::{Word, ALIAS_NAME_MAX},
    data::{SyspageError, SyspageErrorCode},
    syspage::Syspage,
    very_verbose_println,
};

/// Names a payload already present in the image. Host side only, never stored
/// in the syspage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub name: String,
    /// physical address of the payload
    pub addr: Word,
    pub size: Word,
}

impl Alias {
    pub fn end(&self) -> Word {
        self.addr + self.size
    }
}

#[derive(Default)]
pub struct AliasTable {
    entries: Vec<Alias>,
}

impl AliasTable {
    pub fn insert(&mut self, alias: Alias) {
        self.entries.push(alias);
    }
    /// newest definition wins when a name was defined more than once
    pub fn get(&self, name: &str) -> Result<&Alias, SyspageError> {
        match self.entries.iter().rev().find(|alias| alias.name == name) {
            Some(alias) => Ok(alias),
            None => Err(SyspageError::new(
                SyspageErrorCode::AliasNotFound,
                format!("alias [ {name} ] was never defined"),
            )),
        }
    }
}

impl Syspage {
    /// `addr` is an offset inside the image, the stored alias is rebased onto
    /// the image's physical address.
    pub fn define_alias(&mut self, name: &str, addr: Word, size: Word) -> Result<(), SyspageError> {
        if name.len() > ALIAS_NAME_MAX {
            return Err(SyspageError::new(
                SyspageErrorCode::NameTooLong,
                format!("alias name [ {name} ] is longer than {ALIAS_NAME_MAX} bytes"),
            ));
        }
        let out_of_range = || {
            SyspageError::new(
                SyspageErrorCode::InvalidArgument,
                format!("alias [ {name} ] at {addr:#x} of size {size:#x} does not fit the target address space"),
            )
        };
        let image_end = addr.checked_add(size).ok_or_else(out_of_range)?;
        let physical = addr
            .checked_add(self.header.pkernel)
            .filter(|physical| physical.checked_add(size).is_some())
            .ok_or_else(out_of_range)?;

        if self.header.imgsz < image_end {
            self.header.imgsz = image_end;
        }
        very_verbose_println!("alias [ {name} ] -> {physical:#010x} size {size:#x}");
        self.aliases.insert(Alias {
            name: name.to_string(),
            addr: physical,
            size,
        });
        Ok(())
    }

    pub fn find_alias(&self, name: &str) -> Result<&Alias, SyspageError> {
        self.aliases.get(name)
    }
}
