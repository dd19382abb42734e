use crate::{
    config::Config,
    error::{Error, Result},
    exec::{execute_plan, ProcessRunner},
};
use notify::{
    event::ModifyKind, Config as NotifyConfig, Event, EventKind, RecommendedWatcher,
    RecursiveMode, Watcher,
};
use std::{
    fs,
    path::Path,
    process,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{channel, Receiver, Sender},
        Arc,
    },
};
use tracing::{debug, info, warn};

/// What the loop can be woken up by.
enum Wake {
    Fs(notify::Result<Event>),
    Interrupt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    /// Contents were written in place.
    Modified,
    /// The watched inode went away, e.g. an editor saving through a rename.
    Replaced,
    Ignored,
}

fn classify(kind: &EventKind) -> Change {
    match kind {
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_)) => Change::Replaced,
        EventKind::Modify(ModifyKind::Metadata(_)) => Change::Ignored,
        EventKind::Modify(_) | EventKind::Create(_) => Change::Modified,
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Change::Ignored,
    }
}

/// The single watch on the target file.
struct Watch<'a> {
    watcher: RecommendedWatcher,
    path: &'a Path,
}

impl<'a> Watch<'a> {
    fn arm(path: &'a Path, tx: Sender<Wake>) -> Result<Self> {
        check_target(path)?;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = tx.send(Wake::Fs(res));
            },
            NotifyConfig::default(),
        )
        .map_err(|err| Error::watch_setup(path, err))?;

        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|err| Error::watch_setup(path, err))?;
        info!("watching {path:?}");

        Ok(Self { watcher, path })
    }

    /// Drops the current watch and registers the path again, following a file
    /// that was replaced in the meantime.
    fn rearm(&mut self) -> Result<()> {
        if let Err(err) = self.watcher.unwatch(self.path) {
            // inotify has already dropped the watch if the file was removed
            debug!("releasing watch on {:?}: {err}", self.path);
        }

        check_target(self.path)?;
        self.watcher
            .watch(self.path, RecursiveMode::NonRecursive)
            .map_err(|err| Error::watch_setup(self.path, err))
    }
}

fn check_target(path: &Path) -> Result<()> {
    let metadata =
        fs::metadata(path).map_err(|err| Error::watch_setup(path, notify::Error::io(err)))?;

    if !metadata.is_file() {
        return Err(Error::watch_setup(
            path,
            notify::Error::generic("not a regular file"),
        ));
    }

    Ok(())
}

/// Arms the watch and runs the plan on every modification until interrupted
/// (or after the first run with `--once`).
pub fn watch(config: &Config) -> Result<()> {
    let (tx, rx) = channel();

    let interrupted = Arc::new(AtomicBool::new(false));
    install_interrupt_handler(Arc::clone(&interrupted), tx.clone());

    let mut watch = Watch::arm(config.target(), tx)?;
    let mut runner = ProcessRunner::new(Arc::clone(&interrupted));

    if config.initial() {
        run(config, &mut runner);
    }

    while let Ok(wake) = rx.recv() {
        let event = match wake {
            Wake::Interrupt => break,
            Wake::Fs(Ok(event)) => event,
            Wake::Fs(Err(err)) => {
                warn!("watch error: {err}");
                continue;
            }
        };

        match classify(&event.kind) {
            Change::Ignored => {
                debug!("ignoring {:?}", event.kind);
                continue;
            }
            Change::Replaced => {
                debug!("{:?} was replaced, re-arming", config.target());
                watch.rearm()?;
            }
            Change::Modified => {}
        }

        info!("{:?} changed", config.target());
        run(config, &mut runner);

        if config.once() || interrupted.load(Ordering::SeqCst) {
            break;
        }

        // whatever piled up while the plan was running is stale by now, including
        // writes the plan itself made to the file
        if drain(&rx) {
            break;
        }
        watch.rearm()?;
    }

    info!("stopped watching {:?}", config.target());
    Ok(())
}

fn run(config: &Config, runner: &mut ProcessRunner) {
    let summary = execute_plan(config.plan(), runner);
    debug!(
        "plan finished: {} run, {} skipped, last {}",
        summary.executed,
        summary.skipped,
        if summary.last_succeeded { "succeeded" } else { "failed" }
    );
}

/// Empties the queue without blocking. Returns whether an interrupt was queued.
fn drain(rx: &Receiver<Wake>) -> bool {
    let mut interrupted = false;
    let mut discarded = 0;
    while let Ok(wake) = rx.try_recv() {
        match wake {
            Wake::Interrupt => interrupted = true,
            Wake::Fs(_) => discarded += 1,
        }
    }

    if discarded > 0 {
        debug!("discarded {discarded} events queued during the run");
    }
    interrupted
}

/// Exit status when a second Ctrl+C arrives before the first one was handled.
const FORCED_EXIT_STATUS: i32 = 130;

/// The first Ctrl+C lets the running command finish and then stops the loop.
/// A second one exits right away, for children that ignore SIGINT.
fn install_interrupt_handler(interrupted: Arc<AtomicBool>, tx: Sender<Wake>) {
    let result = ctrlc::set_handler(move || {
        if interrupted.swap(true, Ordering::SeqCst) {
            process::exit(FORCED_EXIT_STATUS);
        }
        let _ = tx.send(Wake::Interrupt);
    });

    if let Err(err) = result {
        warn!("could not install Ctrl+C handler: {err}");
    }
}
