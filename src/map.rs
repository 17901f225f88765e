use crate::{
    constant::{
        Word, ATTR_BUFFERABLE, ATTR_CACHEABLE, ATTR_EXEC, ATTR_READ, ATTR_SHAREABLE, ATTR_WRITE,
        MAP_ENTRY_BYTES, MAX_MAPS, WORD_BYTES,
    },
    data::{SyspageError, SyspageErrorCode},
    list,
    syspage::Syspage,
    very_verbose_println,
};

const MAP_ENTRIES: usize = 2 * WORD_BYTES;
const MAP_START: usize = 3 * WORD_BYTES;
const MAP_END: usize = 4 * WORD_BYTES;
const MAP_ATTR: usize = 5 * WORD_BYTES;
const MAP_ID: usize = 6 * WORD_BYTES;
const MAP_NAME: usize = 7 * WORD_BYTES;

pub fn encode_attributes(code: &str) -> Result<Word, SyspageError> {
    let mut attr = 0;
    for chr in code.chars() {
        attr |= match chr {
            'r' => ATTR_READ,
            'w' => ATTR_WRITE,
            'x' => ATTR_EXEC,
            's' => ATTR_SHAREABLE,
            'c' => ATTR_CACHEABLE,
            'b' => ATTR_BUFFERABLE,
            _ => {
                return Err(SyspageError::new(
                    SyspageErrorCode::InvalidAttribute,
                    format!("wrong attribute [ {chr} ] in [ {code} ]"),
                ))
            }
        };
    }
    Ok(attr)
}

/// A map entry as read back from the syspage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub address: Word,
    pub id: u8,
    pub name: String,
    pub start: Word,
    pub end: Word,
    pub attr: Word,
    pub entries: Word,
}

impl MapEntry {
    pub fn overlaps(&self, start: Word, end: Word) -> bool {
        self.start < end && self.end > start
    }
}

impl Syspage {
    fn read_map(&self, address: Word) -> Result<MapEntry, SyspageError> {
        let field = |offset: usize| self.arena.read_word(address + offset as Word);
        Ok(MapEntry {
            address,
            id: self.arena.view(address + MAP_ID as Word, 1)?[0],
            name: self.arena.read_str(field(MAP_NAME)?)?,
            start: field(MAP_START)?,
            end: field(MAP_END)?,
            attr: field(MAP_ATTR)?,
            entries: field(MAP_ENTRIES)?,
        })
    }

    /// All maps from the list head, in id order.
    pub fn maps(&self) -> Result<Vec<MapEntry>, SyspageError> {
        list::iter(&self.arena, self.header.maps)
            .map(|address| self.read_map(address?))
            .collect()
    }

    pub fn add_map(&mut self, name: &str, start: Word, end: Word, attr: Word) -> Result<u8, SyspageError> {
        let maps = self.maps()?;
        for map in &maps {
            if map.overlaps(start, end) {
                return Err(SyspageError::new(
                    SyspageErrorCode::MapOverlap,
                    format!(
                        "map [ {name} ] {start:#x}..{end:#x} overlaps [ {} ] {:#x}..{:#x}",
                        map.name, map.start, map.end
                    ),
                ));
            }
            if map.name == name {
                return Err(SyspageError::new(
                    SyspageErrorCode::DuplicateMapName,
                    format!("map [ {name} ] is already defined"),
                ));
            }
        }
        let id = match maps.last() {
            None => 0,
            Some(_) if maps.len() >= MAX_MAPS => {
                return Err(SyspageError::new(
                    SyspageErrorCode::TooManyMaps,
                    format!("cannot add map [ {name} ], all {MAX_MAPS} map ids are taken"),
                ))
            }
            Some(tail) => tail.id + 1,
        };

        let address = self.arena.allocate(MAP_ENTRY_BYTES)?;
        let name_address = self.arena.allocate(name.len() + 1)?;
        self.arena.write_bytes(name_address, name.as_bytes())?;
        self.arena.write_bytes(name_address + name.len() as Word, &[0])?;

        self.arena.write_word(address + MAP_ENTRIES as Word, 0)?;
        self.arena.write_word(address + MAP_START as Word, start)?;
        self.arena.write_word(address + MAP_END as Word, end)?;
        self.arena.write_word(address + MAP_ATTR as Word, attr)?;
        self.arena.write_bytes(address + MAP_ID as Word, &[id])?;
        self.arena.write_word(address + MAP_NAME as Word, name_address)?;
        self.header.maps = list::insert_tail(&mut self.arena, self.header.maps, address)?;

        very_verbose_println!("map [ {name} ] id {id} {start:#010x}..{end:#010x} attr {attr:#x} at {address:#010x}");
        Ok(id)
    }

    pub fn resolve_map(&self, name: &str) -> Result<u8, SyspageError> {
        for address in list::iter(&self.arena, self.header.maps) {
            let map = self.read_map(address?)?;
            if map.name == name {
                return Ok(map.id);
            }
        }
        Err(SyspageError::new(
            SyspageErrorCode::MapNotFound,
            format!("map [ {name} ] was never defined"),
        ))
    }
}
