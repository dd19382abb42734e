mod args_opt;

pub use args_opt::{ArgsOpt, Form};

use crate::{
    command::{CommandPlan, Placeholder},
    error::Result,
};
use std::path::{Path, PathBuf};

/// Everything the watch loop needs, fixed for the life of the process.
#[derive(Debug)]
pub struct Config {
    target: PathBuf,
    plan: CommandPlan,
    once: bool,
    initial: bool,
}

impl Config {
    pub fn new(mut args_opt: ArgsOpt) -> Result<Self> {
        let target = args_opt.take_file();
        let replacement = target.to_string_lossy().into_owned();
        let marker = args_opt.take_placeholder();
        let placeholder = marker
            .as_deref()
            .map(|marker| Placeholder::new(marker, &replacement));

        let plan = match args_opt.take_command() {
            (Form::Simple, tokens) => CommandPlan::single(tokens, placeholder)?,
            (Form::Extended, tokens) => CommandPlan::parse(tokens, placeholder)?,
        };

        Ok(Self {
            target,
            plan,
            once: args_opt.once(),
            initial: args_opt.initial(),
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn plan(&self) -> &CommandPlan {
        &self.plan
    }

    pub fn once(&self) -> bool {
        self.once
    }

    pub fn initial(&self) -> bool {
        self.initial
    }
}
