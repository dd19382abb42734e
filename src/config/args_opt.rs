use crate::command::DEFAULT_PLACEHOLDER;
use clap::{ArgAction, Parser};
use std::{ffi::OsString, mem, path::PathBuf};

#[derive(Parser, Debug)]
#[command(
    version,
    about("Run a command line every time a file is modified"),
    after_help("Examples:\n  rebuild foo.py python {}\n  rebuild foo.c -- gcc -o foo foo.c '||' echo FAIL\n  rebuild foo.c -- echo Start ';' gcc -o foo foo.c")
)]
pub struct ArgsOpt {
    #[arg(value_name("FILE"), help("the file to watch"))]
    file: PathBuf,

    #[arg(
        value_name("COMMAND"),
        trailing_var_arg(true),
        allow_hyphen_values(true),
        help("command to run on every change; after `--` the tokens `;`, `&&` and `||` join several commands")
    )]
    command: Vec<String>,

    #[arg(
        long,
        value_name("TOKEN"),
        default_value(DEFAULT_PLACEHOLDER),
        help("argument that gets replaced with FILE")
    )]
    placeholder: String,

    #[arg(long, help("don't replace the placeholder with FILE"))]
    verbatim: bool,

    #[arg(long, help("exit after the first run triggered by a change"))]
    once: bool,

    #[arg(short, long, help("run the command once at startup, before waiting for a change"))]
    initial: bool,

    #[arg(
        short,
        long,
        action(ArgAction::Count),
        conflicts_with("verbose"),
        help("log less; repeat to only log errors")
    )]
    quiet: u8,

    #[arg(
        short,
        long,
        action(ArgAction::Count),
        help("log more; repeat for trace output")
    )]
    verbose: u8,

    #[arg(skip)]
    form: Form,
}

/// Which grammar the trailing tokens follow.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    /// `rebuild FILE PROGRAM [ARGS]...`, every token literal.
    #[default]
    Simple,
    /// `rebuild FILE -- TOKENS...`, operators recognised.
    Extended,
}

impl ArgsOpt {
    pub fn from_env() -> Self {
        Self::from_raw(std::env::args_os().collect())
    }

    pub fn from_raw(raw: Vec<OsString>) -> Self {
        Self::try_from_raw(raw).unwrap_or_else(|err| err.exit())
    }

    pub fn try_from_raw(raw: Vec<OsString>) -> Result<Self, clap::Error> {
        let mut args_opt = Self::try_parse_from(&raw)?;
        args_opt.form = detect_form(&raw, &args_opt.command);
        Ok(args_opt)
    }

    pub fn take_file(&mut self) -> PathBuf {
        mem::take(&mut self.file)
    }

    pub fn take_command(&mut self) -> (Form, Vec<String>) {
        (self.form, mem::take(&mut self.command))
    }

    pub fn take_placeholder(&mut self) -> Option<String> {
        if self.verbatim {
            None
        } else {
            Some(mem::take(&mut self.placeholder))
        }
    }

    pub fn once(&self) -> bool {
        self.once
    }

    pub fn initial(&self) -> bool {
        self.initial
    }

    /// Positive for `-v`, negative for `-q`.
    pub fn verbosity(&self) -> i8 {
        self.verbose.min(2) as i8 - self.quiet.min(2) as i8
    }
}

// clap swallows a `--` that directly follows FILE, but keeps one that shows up
// inside COMMAND. So the extended form is the one where COMMAND is exactly what
// came after the first `--`.
fn detect_form(raw: &[OsString], command: &[String]) -> Form {
    let Some(separator) = raw.iter().position(|arg| arg == "--") else {
        return Form::Simple;
    };

    let rest = &raw[separator + 1..];
    let is_extended = rest.len() == command.len()
        && rest
            .iter()
            .zip(command)
            .all(|(raw, token)| raw == token.as_str());

    if is_extended {
        Form::Extended
    } else {
        Form::Simple
    }
}
