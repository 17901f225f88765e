use crate::{
    constant::{
        Word, CMD_ALIAS, CMD_APP, CMD_CONSOLE, CMD_MAP, FLAG_PREFIX, MAX_LINE_ARGS,
        MAX_LINE_BYTES, SEPERATOR,
    },
    data::{SyspageError, SyspageErrorCode},
    map::encode_attributes,
    syspage::Syspage,
    verbose_println, very_verbose_println,
};
use std::{fs::File, io::Read};

/// Integers as plo scripts write them: `0x` hex, leading `0` octal, decimal
/// otherwise. The whole token has to be a number that fits a target word.
pub fn parse_integer(s: &str) -> Result<Word, SyspageError> {
    let (digits, radix) = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        (hex, 16)
    } else if s.len() > 1 && s.starts_with('0') {
        (&s[1..], 8)
    } else {
        (s, 10)
    };
    // from_str_radix would take a sign
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(SyspageError::new(
            SyspageErrorCode::InvalidArgument,
            format!("[ {s} ] is not a valid integer"),
        ));
    }
    Word::from_str_radix(digits, radix).map_err(|err| {
        SyspageError::new(
            SyspageErrorCode::InvalidArgument,
            format!("[ {s} ] is not a valid integer :: [ {err} ]"),
        )
    })
}

fn push_arg<'a>(args: &mut Vec<&'a str>, used: &mut usize, token: &'a str) -> Result<(), SyspageError> {
    if args.len() >= MAX_LINE_ARGS {
        return Err(SyspageError::new(
            SyspageErrorCode::TooManyArguments,
            format!("more than {MAX_LINE_ARGS} arguments in one line"),
        ));
    }
    // every argument is stored with its terminator
    *used += token.len() + 1;
    if *used > MAX_LINE_BYTES {
        return Err(SyspageError::new(
            SyspageErrorCode::LineTooLong,
            format!("arguments exceed the {MAX_LINE_BYTES} byte command buffer"),
        ));
    }
    args.push(token);
    Ok(())
}

/// Splits one script line into its arguments. Blanks separate arguments, any
/// other whitespace ends the line.
pub fn tokenize_line(line: &str) -> Result<Vec<&str>, SyspageError> {
    let mut args: Vec<&str> = vec![];
    let mut used = 0;
    let mut token_start: Option<usize> = None;
    let mut end = line.len();
    for (i, chr) in line.char_indices() {
        match chr {
            ' ' | '\t' => {
                if let Some(start) = token_start.take() {
                    push_arg(&mut args, &mut used, &line[start..i])?;
                }
            }
            c if c.is_whitespace() => {
                end = i;
                break;
            }
            c if c.is_ascii_graphic() => {
                if token_start.is_none() {
                    token_start = Some(i);
                }
            }
            c => {
                return Err(SyspageError::new(
                    SyspageErrorCode::InvalidCharacter,
                    format!("unexpected character {c:?}"),
                ))
            }
        }
    }
    if let Some(start) = token_start {
        push_arg(&mut args, &mut used, &line[start..end])?;
    }
    very_verbose_println!("tokenized {args:?}");
    Ok(args)
}

fn expect_args(args: &[&str], expected: usize) -> Result<(), SyspageError> {
    if args.len() != expected {
        return Err(SyspageError::new(
            SyspageErrorCode::InvalidArgumentCount,
            format!(
                "{} takes {} arguments, [ {} ] were given",
                args[0],
                expected - 1,
                args.len() - 1
            ),
        ));
    }
    Ok(())
}

fn cmd_alias(syspage: &mut Syspage, args: &[&str]) -> Result<(), SyspageError> {
    expect_args(args, 4)?;
    let addr = parse_integer(args[2])?;
    let size = parse_integer(args[3])?;
    syspage.define_alias(args[1], addr, size)
}

fn cmd_map(syspage: &mut Syspage, args: &[&str]) -> Result<(), SyspageError> {
    expect_args(args, 5)?;
    let start = parse_integer(args[2])?;
    let end = parse_integer(args[3])?;
    let attr = encode_attributes(args[4])?;
    syspage.add_map(args[1], start, end, attr)?;
    Ok(())
}

// app <alias>[;argv] [-x] <imaps> <dmaps>
fn cmd_app(syspage: &mut Syspage, args: &[&str]) -> Result<(), SyspageError> {
    if args.len() < 4 || args.len() > 5 {
        return Err(SyspageError::new(
            SyspageErrorCode::InvalidArgumentCount,
            format!("app takes 3 or 4 arguments, [ {} ] were given", args.len() - 1),
        ));
    }
    let mut next = 2;
    let mut exec = false;
    if args[next].starts_with(FLAG_PREFIX) {
        if !args[next].eq_ignore_ascii_case("-x") {
            return Err(SyspageError::new(
                SyspageErrorCode::InvalidArgument,
                format!("unknown app flag [ {} ]", args[next]),
            ));
        }
        exec = true;
        next += 1;
    }
    if next != args.len() - 2 {
        return Err(SyspageError::new(
            SyspageErrorCode::InvalidArgumentCount,
            "app expects exactly one instruction and one data map list".to_string(),
        ));
    }
    let argv = args[1];
    let alias = argv.split(SEPERATOR).next().unwrap_or(argv);
    syspage.add_program(alias, args[next], args[next + 1], argv, exec)
}

fn cmd_console(syspage: &mut Syspage, args: &[&str]) -> Result<(), SyspageError> {
    expect_args(args, 2)?;
    syspage.set_console(args[1])
}

/// Runs one tokenized command. Commands other than the syspage ones belong to
/// the boot loader and are skipped.
pub fn run_line(syspage: &mut Syspage, args: &[&str]) -> Result<(), SyspageError> {
    let Some(command) = args.first() else {
        return Ok(());
    };
    match *command {
        CMD_ALIAS => cmd_alias(syspage, args),
        CMD_MAP => cmd_map(syspage, args),
        CMD_APP => cmd_app(syspage, args),
        CMD_CONSOLE => cmd_console(syspage, args),
        other => {
            verbose_println!("ignoring command [ {other} ]");
            Ok(())
        }
    }
}

/// Runs every line of `source` in order, stopping at the first failing one.
pub fn run_script(syspage: &mut Syspage, path: &str, source: &str) -> Result<(), SyspageError> {
    for (number, line) in source.lines().enumerate() {
        let result = tokenize_line(line).and_then(|args| run_line(syspage, &args));
        if let Err(err) = result {
            return Err(err.traceback(path, number + 1, line));
        }
    }
    Ok(())
}

pub fn load_script(syspage: &mut Syspage, path: &str) -> Result<(), SyspageError> {
    let mut f = File::open(path).map_err(|err| {
        SyspageError::new(
            SyspageErrorCode::ScriptReadError,
            format!("cannot open script {path} :: {err}"),
        )
    })?;
    let mut source = String::new();
    f.read_to_string(&mut source).map_err(|err| {
        SyspageError::new(
            SyspageErrorCode::ScriptReadError,
            format!("cannot read script {path} :: {err}"),
        )
    })?;
    verbose_println!("running script {path}");
    run_script(syspage, path, &source)
}
