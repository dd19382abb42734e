use crate::command::{CommandGroup, CommandPlan};
use std::{
    io,
    process::{Command, ExitStatus},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a group counts as failed. Only ever feeds `&&`/`||` decisions.
#[derive(Debug, Error)]
pub enum CommandFailure {
    #[error("`{program}` exited with {status}")]
    Exited { program: String, status: ExitStatus },

    #[error("failed to execute `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` not started, interrupted")]
    Interrupted { program: String },
}

pub trait Runner {
    fn run(&mut self, group: &CommandGroup) -> Result<(), CommandFailure>;
}

/// Runs groups as child processes sharing our stdin, stdout and stderr.
///
/// Once `interrupted` is set no further process is started, so the rest of
/// the plan fails fast instead of running after a Ctrl+C.
#[derive(Debug, Default)]
pub struct ProcessRunner {
    interrupted: Arc<AtomicBool>,
}

impl ProcessRunner {
    pub fn new(interrupted: Arc<AtomicBool>) -> Self {
        Self { interrupted }
    }
}

impl Runner for ProcessRunner {
    fn run(&mut self, group: &CommandGroup) -> Result<(), CommandFailure> {
        if self.interrupted.load(Ordering::SeqCst) {
            return Err(CommandFailure::Interrupted {
                program: group.program().to_owned(),
            });
        }

        let status = Command::new(group.program())
            .args(group.args())
            .status()
            .map_err(|source| CommandFailure::Spawn {
                program: group.program().to_owned(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(CommandFailure::Exited {
                program: group.program().to_owned(),
                status,
            })
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlanSummary {
    pub executed: usize,
    pub skipped: usize,
    pub last_succeeded: bool,
}

/// Runs the plan front to back. A skipped group leaves the previous result in place.
pub fn execute_plan(plan: &CommandPlan, runner: &mut impl Runner) -> PlanSummary {
    let mut summary = PlanSummary {
        last_succeeded: true,
        ..PlanSummary::default()
    };

    for step in plan.steps() {
        let group = step.group();
        if !step.operator().proceeds(summary.last_succeeded) {
            debug!("skipping `{group}` after `{}`", step.operator());
            summary.skipped += 1;
            continue;
        }

        info!("running `{group}`");
        summary.last_succeeded = match runner.run(group) {
            Ok(()) => true,
            Err(failure) => {
                warn!("{failure}");
                false
            }
        };
        summary.executed += 1;
    }

    summary
}
