use clap::{ArgAction, Parser};
use colorize::AnsiColor;
use constant::NAME;
use data::{Endian, SyspageError};
use std::{
    process::exit,
    sync::atomic::{AtomicUsize, Ordering},
};
use syspage::{Syspage, SyspageLayout};

mod alias;
mod arena;
mod constant;
mod data;
mod image;
mod list;
mod map;
mod program;
mod script;
mod syspage;

static VERBOSE_LEVEL: AtomicUsize = AtomicUsize::new(0);

fn handle_fatal_err(err: SyspageError) -> ! {
    eprintln!("{err}");
    exit(1)
}

fn _verbose_println(msg: &str) {
    if VERBOSE_LEVEL.load(Ordering::Relaxed) >= 1 {
        println!("{NAME}: {} {}", "verbose:".yellow(), msg)
    }
}
fn _very_verbose_println(msg: &str) {
    if VERBOSE_LEVEL.load(Ordering::Relaxed) >= 2 {
        println!("{NAME}: {} {}", "very-verbose:".yellow(), msg)
    }
}

#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => (crate::_verbose_println(&format!($($arg)*)));
}
#[macro_export]
macro_rules! very_verbose_println {
    ($($arg:tt)*) => (crate::_very_verbose_println(&format!($($arg)*)));
}

#[derive(Parser, Debug)]
#[command(
    name = NAME,
    version,
    about = "Generates a syspage from plo scripts and writes it into the target image"
)]
struct Cli {
    #[arg(
        short = 's',
        long = "syspage",
        value_name = "PIMG:OFFS:SZ",
        long_help = "Syspage properties: physical address of the target image, syspage offset in the image and maximum syspage size."
    )]
    layout: SyspageLayout,
    #[arg(short = 'p', long = "preinit", value_name = "PATH", help = "preinit script")]
    preinit: String,
    #[arg(short = 'u', long = "user", value_name = "PATH", help = "user script")]
    user: String,
    #[arg(short = 'i', long = "image", value_name = "PATH", help = "target image")]
    image: String,
    #[arg(
        short = 'e',
        long = "endian",
        value_enum,
        default_value_t = Endian::Little,
        help = "byte order of the target"
    )]
    endian: Endian,
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, help = "verbose printing, repeat for more")]
    verbose: u8,
}

/// preinit script, user script, then the image. Nothing is written unless both
/// scripts went through.
fn run(cli: &Cli) -> Result<Syspage, SyspageError> {
    let mut syspage = Syspage::new(&cli.layout, cli.endian)?;
    script::load_script(&mut syspage, &cli.preinit)?;
    verbose_println!("passed checkpoint PREINIT");
    script::load_script(&mut syspage, &cli.user)?;
    verbose_println!("passed checkpoint USER");
    syspage.check()?;
    image::commit(&cli.image, cli.layout.offs as u64, syspage.image()?)?;
    Ok(syspage)
}

fn main() {
    let cli = Cli::parse();
    VERBOSE_LEVEL.store(cli.verbose as usize, Ordering::Relaxed);
    verbose_println!("preinit script: {}", cli.preinit);
    verbose_println!("user script: {}", cli.user);
    verbose_println!("image: {}", cli.image);

    let syspage = match run(&cli) {
        Ok(syspage) => syspage,
        Err(err) => handle_fatal_err(err),
    };
    println!(
        "Syspage is written to image: {} at offset {:#x}",
        cli.image, cli.layout.offs
    );
    println!("\n{syspage}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use crate::data::SyspageErrorCode;
    use std::{fs, path::PathBuf};

    const PREINIT: &str = "kernel flash0\nmap ocram 0x0 0x10000 rwx\nconsole 0.1\n";
    const USER: &str = "alias app1 0x1000 0x200\napp app1 -x ocram ocram\ngo!\n";

    fn scratch(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("syspagen-run-{}-{name}", std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    fn cli(test: &str, preinit: &str, user: &str) -> Cli {
        let arg = |path: PathBuf| path.to_str().unwrap().to_string();
        Cli {
            layout: "0x0:0x1000:0x400".parse().unwrap(),
            preinit: arg(scratch(&format!("{test}-preinit"), preinit.as_bytes())),
            user: arg(scratch(&format!("{test}-user"), user.as_bytes())),
            image: arg(scratch(&format!("{test}-image"), &[0xee; 0x2000])),
            endian: Endian::Little,
            verbose: 0,
        }
    }

    fn cleanup(cli: &Cli) {
        for path in [&cli.preinit, &cli.user, &cli.image] {
            fs::remove_file(path).unwrap();
        }
    }

    fn word(image: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(image[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
        let cli = Cli::try_parse_from([
            NAME, "-s", "0x80000000:0x200:0x1000", "-p", "pre.plo", "-u", "user.plo", "-i", "img", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.layout.pkernel, 0x8000_0000);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.endian, Endian::Little);
        assert!(Cli::try_parse_from([NAME, "-s", "0:0:0x100", "-p", "a", "-u", "b"]).is_err());
        assert!(Cli::try_parse_from([NAME, "-s", "0:0", "-p", "a", "-u", "b", "-i", "c"]).is_err());
    }

    #[test]
    fn test_syspage_lands_in_image() {
        let cli = cli("lands", PREINIT, USER);
        run(&cli).unwrap();
        let image = fs::read(&cli.image).unwrap();
        assert_eq!(image.len(), 0x2000);
        assert_eq!(&image[..0x1000], &[0xee; 0x1000]);

        let syspage = &image[0x1000..];
        assert_eq!(word(syspage, 0), 0x1200); // imgsz
        assert_eq!(word(syspage, 4), 0x80); // size
        assert_eq!(word(syspage, 8), 0); // pkernel
        assert_eq!(word(syspage, 12), 0x1018); // maps
        assert_eq!(word(syspage, 16), 0x1040); // progs
        assert_eq!(word(syspage, 20), 1); // console

        // lone map and program link to themselves
        assert_eq!(word(syspage, 0x18), 0x1018);
        assert_eq!(word(syspage, 0x1c), 0x1018);
        assert_eq!(&syspage[0x38..0x3e], b"ocram\0");
        assert_eq!(word(syspage, 0x40), 0x1040);
        assert_eq!(word(syspage, 0x44), 0x1040);
        assert_eq!(word(syspage, 0x48), 0x1000); // start
        assert_eq!(word(syspage, 0x4c), 0x1200); // end
        assert_eq!(word(syspage, 0x50), 0x1078); // argv
        assert_eq!(&syspage[0x78..0x7e], b"Xapp1\0");

        // nothing past the syspage size is touched
        assert_eq!(&syspage[0x80..], &[0xee; 0xf80]);
        cleanup(&cli);
    }

    #[test]
    fn test_failed_script_leaves_image_untouched() {
        let cli = cli("untouched", PREINIT, "alias app1 0x1000 0x200\napp app1 ocram ddr\n");
        let Err(err) = run(&cli) else {
            panic!("run accepted an unknown map");
        };
        assert_eq!(err.code, SyspageErrorCode::MapNotFound);
        assert_eq!(fs::read(&cli.image).unwrap(), vec![0xee; 0x2000]);
        cleanup(&cli);
    }

    #[test]
    fn test_output_is_deterministic() {
        let first = cli("first", PREINIT, USER);
        let second = cli("second", PREINIT, USER);
        run(&first).unwrap();
        run(&second).unwrap();
        assert_eq!(fs::read(&first.image).unwrap(), fs::read(&second.image).unwrap());
        cleanup(&first);
        cleanup(&second);
    }

    #[test]
    fn test_dump_lists_programs() {
        let cli = cli("dump", PREINIT, USER);
        let dump = run(&cli).unwrap().to_string();
        assert!(dump.contains("Image size: 0x00001200"));
        assert!(dump.contains("Console: 0x01"));
        assert!(dump.contains("Xapp1"));
        cleanup(&cli);
    }
}
