use crate::{
    alias::AliasTable,
    arena::Arena,
    constant::{Word, CONFIG_SEPERATOR, CONSOLE_SEPERATOR, WORD_BYTES},
    data::{Endian, SyspageError, SyspageErrorCode},
    list,
    script::parse_integer,
    verbose_println,
};
use std::{fmt, str::FromStr};

const HEADER_IMGSZ: usize = 0;
const HEADER_SIZE: usize = WORD_BYTES;
const HEADER_PKERNEL: usize = 2 * WORD_BYTES;
const HEADER_MAPS: usize = 3 * WORD_BYTES;
const HEADER_PROGS: usize = 4 * WORD_BYTES;
const HEADER_CONSOLE: usize = 5 * WORD_BYTES;

/// where the syspage lands: `pkernel:offs:maxsz`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyspageLayout {
    /// physical address the target image is loaded at
    pub pkernel: Word,
    /// syspage offset inside the target image
    pub offs: Word,
    /// maximum syspage size
    pub maxsz: Word,
}

impl FromStr for SyspageLayout {
    type Err = SyspageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(CONFIG_SEPERATOR).collect();
        let &[pkernel, offs, maxsz] = fields.as_slice() else {
            return Err(SyspageError::new(
                SyspageErrorCode::InvalidConfiguration,
                format!("[ {s} ] is not of the form pimg:offs:sz"),
            ));
        };
        let field = |raw: &str, what: &str| {
            parse_integer(raw).map_err(|err| {
                SyspageError::new(
                    SyspageErrorCode::InvalidConfiguration,
                    format!("wrong {what} [ {raw} ] :: {}", err.reason),
                )
            })
        };
        let layout = Self {
            pkernel: field(pkernel, "physical image address")?,
            offs: field(offs, "syspage offset")?,
            maxsz: field(maxsz, "syspage size")?,
        };
        if layout.maxsz == 0 {
            return Err(SyspageError::new(
                SyspageErrorCode::InvalidConfiguration,
                "syspage size must not be zero".to_string(),
            ));
        }
        Ok(layout)
    }
}

/// Top level record, stored at the very start of the syspage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    pub imgsz: Word,
    pub size: Word,
    pub pkernel: Word,
    pub maps: Word,
    pub progs: Word,
    pub console: Word,
}

/// One syspage build session. Owns the arena, the header and the alias table;
/// every script command operates on it.
pub struct Syspage {
    pub(crate) arena: Arena,
    pub(crate) header: Header,
    pub(crate) aliases: AliasTable,
}

impl Syspage {
    pub fn new(layout: &SyspageLayout, endian: Endian) -> Result<Self, SyspageError> {
        let arena = Arena::new(layout.pkernel, layout.offs, layout.maxsz as usize, endian)?;
        verbose_println!(
            "syspage at {:#010x}, image at {:#010x}, {:#x} bytes max",
            arena.base(),
            layout.pkernel,
            layout.maxsz
        );
        Ok(Self {
            arena,
            header: Header {
                pkernel: layout.pkernel,
                ..Header::default()
            },
            aliases: AliasTable::default(),
        })
    }

    pub fn header(&self) -> Header {
        Header {
            size: self.arena.size() as Word,
            ..self.header
        }
    }

    pub fn set_console(&mut self, token: &str) -> Result<(), SyspageError> {
        let invalid = |what: &str| {
            SyspageError::new(
                SyspageErrorCode::InvalidConsole,
                format!("wrong {what} value in [ {token} ], expected <major>.<minor>"),
            )
        };
        let (major, minor) = token
            .split_once(CONSOLE_SEPERATOR)
            .ok_or_else(|| invalid("major"))?;
        parse_integer(major).map_err(|_| invalid("major"))?;
        let minor = parse_integer(minor).map_err(|_| invalid("minor"))?;
        self.header.console = minor;
        Ok(())
    }

    /// Validates both lists and every program's map references.
    pub fn check(&self) -> Result<(), SyspageError> {
        let map_count = list::check(&self.arena, self.header.maps)?;
        list::check(&self.arena, self.header.progs)?;
        for (expected, map) in self.maps()?.iter().enumerate() {
            if map.id as usize != expected || map.entries != 0 {
                return Err(SyspageError::new(
                    SyspageErrorCode::CorruptList,
                    format!(
                        "map [ {} ] at position {expected} has id {} and {} entries",
                        map.name, map.id, map.entries
                    ),
                ));
            }
        }
        for prog in self.programs()? {
            if let Some(id) = prog
                .imaps
                .iter()
                .chain(prog.dmaps.iter())
                .find(|id| **id as usize >= map_count)
            {
                return Err(SyspageError::new(
                    SyspageErrorCode::CorruptList,
                    format!("program [ {} ] references unknown map id {id}", prog.args()),
                ));
            }
        }
        Ok(())
    }

    /// Stores the header and returns the syspage bytes as they go into the image.
    pub fn image(&mut self) -> Result<&[u8], SyspageError> {
        let header = self.header();
        let base = self.arena.base();
        for (offset, word) in [
            (HEADER_IMGSZ, header.imgsz),
            (HEADER_SIZE, header.size),
            (HEADER_PKERNEL, header.pkernel),
            (HEADER_MAPS, header.maps),
            (HEADER_PROGS, header.progs),
            (HEADER_CONSOLE, header.console),
        ] {
            self.arena.write_word(base + offset as Word, word)?;
        }
        Ok(self.arena.bytes())
    }
}

impl fmt::Display for Syspage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = self.header();
        writeln!(f, "\tSyspage:")?;
        writeln!(f, "\tImage size: {:#010x}", header.imgsz)?;
        writeln!(f, "\tSyspage size: {:#010x}", header.size)?;
        writeln!(f, "\tKernel physical address: {:#010x}", header.pkernel)?;
        writeln!(f, "\tConsole: {:#04x}", header.console)?;
        writeln!(f, "\tMaps:")?;
        match self.maps() {
            Ok(maps) if maps.is_empty() => writeln!(f, "\t\tnot defined")?,
            Ok(maps) => {
                for map in maps {
                    writeln!(
                        f,
                        "\t\t{:3} {:<12} {:#010x}..{:#010x} attr {:#04x} at {:#010x}",
                        map.id, map.name, map.start, map.end, map.attr, map.address
                    )?;
                }
            }
            Err(err) => writeln!(f, "\t\tunreadable :: {}", err.reason)?,
        }
        writeln!(f, "\tPrograms:")?;
        match self.programs() {
            Ok(progs) if progs.is_empty() => writeln!(f, "\t\tnot defined"),
            Ok(progs) => {
                for prog in progs {
                    writeln!(
                        f,
                        "\t\t{} {:#010x}..{:#010x} at {:#010x}",
                        String::from_utf8_lossy(&prog.argv),
                        prog.start,
                        prog.end,
                        prog.address
                    )?;
                }
                Ok(())
            }
            Err(err) => writeln!(f, "\t\tunreadable :: {}", err.reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syspage() -> Syspage {
        let layout: SyspageLayout = "0x0:0x0:0x1000".parse().unwrap();
        Syspage::new(&layout, Endian::Little).unwrap()
    }

    #[test]
    fn test_layout_parsing() {
        let layout: SyspageLayout = "0x80000000:0x200:01000".parse().unwrap();
        assert_eq!(layout.pkernel, 0x8000_0000);
        assert_eq!(layout.offs, 0x200);
        assert_eq!(layout.maxsz, 0o1000);
        for bad in ["0x1000:0x200", "0x1000:0x200:0x100:1", "0x1000;0x200:0x100", "1:2:0", "1:2:"] {
            assert_eq!(
                bad.parse::<SyspageLayout>().unwrap_err().code,
                SyspageErrorCode::InvalidConfiguration,
                "{bad}"
            );
        }
    }

    #[test]
    fn test_console_keeps_minor() {
        let mut syspage = syspage();
        syspage.set_console("1.2").unwrap();
        assert_eq!(syspage.header().console, 2);
        syspage.set_console("0x3.0x10").unwrap();
        assert_eq!(syspage.header().console, 0x10);
    }

    #[test]
    fn test_invalid_console_leaves_field() {
        let mut syspage = syspage();
        syspage.set_console("1.2").unwrap();
        for bad in ["abc", "1", "1.", ".2", "1.2x", "1.2.3", "a.2"] {
            let err = syspage.set_console(bad).unwrap_err();
            assert_eq!(err.code, SyspageErrorCode::InvalidConsole, "{bad}");
        }
        assert_eq!(syspage.header().console, 2);
    }

    #[test]
    fn test_header_is_written_at_base() {
        let layout: SyspageLayout = "0x1000:0x100:0x400".parse().unwrap();
        let mut syspage = Syspage::new(&layout, Endian::Little).unwrap();
        syspage.set_console("0.5").unwrap();
        let bytes = syspage.image().unwrap().to_vec();
        assert_eq!(bytes.len(), 24);
        assert_eq!(&bytes[HEADER_SIZE..HEADER_SIZE + 4], &24u32.to_le_bytes());
        assert_eq!(&bytes[HEADER_PKERNEL..HEADER_PKERNEL + 4], &0x1000u32.to_le_bytes());
        assert_eq!(&bytes[HEADER_MAPS..HEADER_MAPS + 4], &[0; 4]);
        assert_eq!(&bytes[HEADER_CONSOLE..HEADER_CONSOLE + 4], &5u32.to_le_bytes());
    }

    #[test]
    fn test_dump_without_programs() {
        let dump = syspage().to_string();
        assert!(dump.contains("Syspage size: 0x00000018"));
        assert!(dump.contains("not defined"));
    }
}
