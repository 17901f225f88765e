pub type Word = u32;
pub const WORD_BYTES: usize = size_of::<Word>();

pub const NAME: &str = "syspagen";
pub const ALIGNMENT: usize = 8;

pub const HEADER_BYTES: usize = 6 * WORD_BYTES;
pub const MAP_ENTRY_BYTES: usize = 8 * WORD_BYTES;
pub const PROG_ENTRY_BYTES: usize = 9 * WORD_BYTES;

// list links sit at the front of both map and program entries
pub const NEXT_OFFSET: usize = 0;
pub const PREV_OFFSET: usize = WORD_BYTES;

pub const ALIAS_NAME_MAX: usize = 31;
pub const MAX_MAPS: usize = u8::MAX as usize + 1;

pub const MAX_LINE_ARGS: usize = 10;
pub const MAX_LINE_BYTES: usize = 181;

pub const SEPERATOR: char = ';';
pub const CONSOLE_SEPERATOR: char = '.';
pub const CONFIG_SEPERATOR: char = ':';
pub const EXEC_MARKER: u8 = b'X';
pub const FLAG_PREFIX: char = '-';

pub const CMD_ALIAS: &str = "alias";
pub const CMD_MAP: &str = "map";
pub const CMD_APP: &str = "app";
pub const CMD_CONSOLE: &str = "console";

pub const ATTR_READ: Word = 0x01;
pub const ATTR_WRITE: Word = 0x02;
pub const ATTR_EXEC: Word = 0x04;
pub const ATTR_SHAREABLE: Word = 0x08;
pub const ATTR_CACHEABLE: Word = 0x10;
pub const ATTR_BUFFERABLE: Word = 0x20;
