use crate::{
    constant::{Word, EXEC_MARKER, PROG_ENTRY_BYTES, SEPERATOR, WORD_BYTES},
    data::SyspageError,
    list,
    syspage::Syspage,
    very_verbose_println,
};

const PROG_START: usize = 2 * WORD_BYTES;
const PROG_END: usize = 3 * WORD_BYTES;
const PROG_ARGV: usize = 4 * WORD_BYTES;
const PROG_IMAP_SZ: usize = 5 * WORD_BYTES;
const PROG_IMAPS: usize = 6 * WORD_BYTES;
const PROG_DMAP_SZ: usize = 7 * WORD_BYTES;
const PROG_DMAPS: usize = 8 * WORD_BYTES;

/// A program entry as read back from the syspage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramEntry {
    pub address: Word,
    pub start: Word,
    pub end: Word,
    /// argv bytes without the terminator, exec marker included
    pub argv: Vec<u8>,
    pub imaps: Vec<u8>,
    pub dmaps: Vec<u8>,
}

impl ProgramEntry {
    pub fn is_exec(&self) -> bool {
        self.argv.first() == Some(&EXEC_MARKER)
    }
    /// the argument text as written in the script
    pub fn args(&self) -> String {
        let skip = if self.is_exec() { 1 } else { 0 };
        String::from_utf8_lossy(&self.argv[skip..]).into_owned()
    }
}

impl Syspage {
    fn resolve_maps(&self, names: &str) -> Result<Vec<u8>, SyspageError> {
        names.split(SEPERATOR).map(|name| self.resolve_map(name)).collect()
    }

    fn store_ids(&mut self, ids: &[u8]) -> Result<Word, SyspageError> {
        let address = self.arena.allocate(ids.len())?;
        self.arena.write_bytes(address, ids)?;
        Ok(address)
    }

    fn read_program(&self, address: Word) -> Result<ProgramEntry, SyspageError> {
        let field = |offset: usize| self.arena.read_word(address + offset as Word);
        let ids = |size_offset: usize, array_offset: usize| -> Result<Vec<u8>, SyspageError> {
            let len = field(size_offset)? as usize;
            Ok(self.arena.view(field(array_offset)?, len)?.to_vec())
        };
        Ok(ProgramEntry {
            address,
            start: field(PROG_START)?,
            end: field(PROG_END)?,
            argv: self.arena.read_str(field(PROG_ARGV)?)?.into_bytes(),
            imaps: ids(PROG_IMAP_SZ, PROG_IMAPS)?,
            dmaps: ids(PROG_DMAP_SZ, PROG_DMAPS)?,
        })
    }

    /// All programs in the order they were added.
    pub fn programs(&self) -> Result<Vec<ProgramEntry>, SyspageError> {
        list::iter(&self.arena, self.header.progs)
            .map(|address| self.read_program(address?))
            .collect()
    }

    /// `imaps` and `dmaps` are `;` separated map names. Every name is resolved
    /// before anything is allocated, so an unknown name leaves the arena as it was.
    pub fn add_program(
        &mut self,
        alias_name: &str,
        imaps: &str,
        dmaps: &str,
        argv: &str,
        exec: bool,
    ) -> Result<(), SyspageError> {
        let alias = self.find_alias(alias_name)?;
        let (start, end) = (alias.addr, alias.end());
        let imap_ids = self.resolve_maps(imaps)?;
        let dmap_ids = self.resolve_maps(dmaps)?;

        let mut argv_bytes = Vec::with_capacity(argv.len() + 2);
        if exec {
            argv_bytes.push(EXEC_MARKER);
        }
        argv_bytes.extend_from_slice(argv.as_bytes());
        argv_bytes.push(0);

        let address = self.arena.allocate(PROG_ENTRY_BYTES)?;
        let dmaps_address = self.store_ids(&dmap_ids)?;
        let imaps_address = self.store_ids(&imap_ids)?;
        let argv_address = self.arena.allocate(argv_bytes.len())?;
        self.arena.write_bytes(argv_address, &argv_bytes)?;

        for (offset, word) in [
            (PROG_START, start),
            (PROG_END, end),
            (PROG_ARGV, argv_address),
            (PROG_IMAP_SZ, imap_ids.len() as Word),
            (PROG_IMAPS, imaps_address),
            (PROG_DMAP_SZ, dmap_ids.len() as Word),
            (PROG_DMAPS, dmaps_address),
        ] {
            self.arena.write_word(address + offset as Word, word)?;
        }
        self.header.progs = list::insert_tail(&mut self.arena, self.header.progs, address)?;

        very_verbose_println!(
            "program [ {argv} ] {start:#010x}..{end:#010x} imaps {imap_ids:?} dmaps {dmap_ids:?} at {address:#010x}"
        );
        Ok(())
    }
}
