/// The interpreter context: registries, collaborators and the dispatcher.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, error, info, warn};

use crate::analysis::{CancelToken, Candidate, ObjectFinder};
use crate::buffers::BufferRegistry;
use crate::commands::{self, Output};
use crate::config::Settings;
use crate::display::{DisplayBackend, HeadlessBackend};
use crate::error::{ErrorKind, ZViewError};
use crate::formats::{FitsLoader, ImageLoader};
use crate::image::ImageBuffer;
use crate::report::{self, Report};
use crate::shell::{ShellRunner, SystemShell};
use crate::transcript::Transcript;
use crate::viewers::ViewerRegistry;

/// Viewer created when a command needs one and none is current.
pub const DEFAULT_VIEWER: &str = "gview_0";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Ok,
    NoSuchCommand,
    Failed,
}

/// Text produced by one command line.
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    pub status: Status,
    pub lines: Vec<String>,
}

impl Reply {
    fn new(status: Status, output: Output) -> Self {
        Reply {
            status,
            lines: output.into_lines(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

pub struct ZView {
    pub(crate) settings: Settings,
    pub(crate) buffers: BufferRegistry,
    pub(crate) viewers: ViewerRegistry,
    pub(crate) backend: Box<dyn DisplayBackend>,
    loader: Box<dyn ImageLoader>,
    shell: Box<dyn ShellRunner>,
    pub(crate) finder: ObjectFinder,
    cwd: PathBuf,
    transcript: Transcript,
    cancel: CancelToken,
    quit: bool,
}

impl ZView {
    /// Headless context rooted at the process working directory.
    pub fn new(settings: Settings) -> Result<Self> {
        let cwd = env::current_dir().context("Failed to get current directory")?;
        Ok(Self::with_cwd(settings, cwd))
    }

    pub fn with_cwd(settings: Settings, cwd: PathBuf) -> Self {
        let transcript = Transcript::new(settings.history_limit)
            .with_timestamps(settings.timestamp_history);
        let finder = ObjectFinder::from_config(settings.finder.clone());
        ZView {
            settings,
            buffers: BufferRegistry::new(),
            viewers: ViewerRegistry::new(),
            backend: Box::new(HeadlessBackend::new()),
            loader: Box::new(FitsLoader),
            shell: Box::new(SystemShell),
            finder,
            cwd,
            transcript,
            cancel: CancelToken::new(),
            quit: false,
        }
    }

    pub fn with_backend(mut self, backend: Box<dyn DisplayBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_loader(mut self, loader: Box<dyn ImageLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_shell(mut self, shell: Box<dyn ShellRunner>) -> Self {
        self.shell = shell;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn buffers(&self) -> &BufferRegistry {
        &self.buffers
    }

    pub fn viewers(&self) -> &ViewerRegistry {
        &self.viewers
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Token that cancels a running object search from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Set by `quit`/`exit`.
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub(crate) fn request_quit(&mut self) {
        self.quit = true;
    }

    // ── Dispatch ─────────────────────────────────────────────────────────────

    /// Execute one command line.
    pub fn exec(&mut self, text: &str) -> Reply {
        let line = text.trim();
        let mut out = Output::new();
        if line.is_empty() {
            return Reply::new(Status::Ok, out);
        }
        self.transcript.push(&format!("ZVIEW> {}", line));

        let status = match line.strip_prefix('!') {
            Some(command) => self.exec_shell(line, command.trim(), &mut out),
            None => self.exec_command(line, &mut out),
        };

        for l in out.lines() {
            self.transcript.push(l);
        }
        Reply::new(status, out)
    }

    fn exec_command(&mut self, line: &str, out: &mut Output) -> Status {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Status::Ok;
        };
        let args: Vec<&str> = words.collect();

        let Some(spec) = commands::lookup(name) else {
            out.log(format!("!! No such command: '{}'", name));
            return Status::NoSuchCommand;
        };

        debug!("Dispatching '{}' with {} args", spec.name, args.len());
        match (spec.handler)(self, &args, out) {
            Ok(()) => Status::Ok,
            Err(e) => {
                report_error(line, &e);
                out.log(format!("!! Error executing '{}': {:#}", line, e));
                Status::Failed
            }
        }
    }

    fn exec_shell(&mut self, line: &str, command: &str, out: &mut Output) -> Status {
        match self.run_shell(command, out) {
            Ok(true) => Status::Ok,
            Ok(false) => Status::Failed,
            Err(e) => {
                report_error(line, &e);
                out.log(format!("!! Error executing '{}': {:#}", line, e));
                Status::Failed
            }
        }
    }

    /// Run `command` in the working directory, echoing its output.
    /// Returns whether it exited with status 0.
    pub(crate) fn run_shell(&mut self, command: &str, out: &mut Output) -> Result<bool> {
        let result = self
            .shell
            .run(command, &self.cwd)
            .map_err(|e| ZViewError::Environment(format!("{:#}", e)))?;
        out.log(result.stdout.trim_end());
        out.log(result.stderr.trim_end());
        match result.status {
            Some(0) => {}
            Some(code) => out.log(format!("!! Command exited with status {}", code)),
            None => out.log("!! Command terminated by signal"),
        }
        Ok(result.success())
    }

    // ── Session ──────────────────────────────────────────────────────────────

    /// Resolve `path` against the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.cwd.join(p)
        }
    }

    /// Change the working directory; `None` means the home directory.
    pub fn change_dir(&mut self, path: Option<&str>) -> Result<&Path> {
        let target = match path {
            Some(p) => self.resolve_path(p),
            None => match dirs::home_dir() {
                Some(home) => home,
                None => bail!(ZViewError::Environment("No home directory".to_string())),
            },
        };
        let canonical = target.canonicalize().map_err(|e| {
            ZViewError::Environment(format!("{}: {}", target.display(), e))
        })?;
        if !canonical.is_dir() {
            bail!(ZViewError::Environment(format!(
                "Not a directory: {}",
                canonical.display()
            )));
        }
        info!("Working directory: {}", canonical.display());
        self.cwd = canonical;
        Ok(&self.cwd)
    }

    // ── Buffers and viewers ──────────────────────────────────────────────────

    /// Load `path` into buffer `name` and refresh viewers showing it.
    pub fn read_buffer(&mut self, name: &str, path: &Path) -> Result<()> {
        self.buffers.read(name, path, self.loader.as_ref())?;
        let image = self.buffers.get(name)?.clone();
        let refreshed = self.viewers.refresh(&image);
        if refreshed > 0 {
            debug!("Refreshed {} viewer(s) showing buffer {}", refreshed, name);
        }
        Ok(())
    }

    /// Create viewer `name` with the configured default colour map.
    pub fn make_viewer(&mut self, name: &str, width: u32, height: u32) -> Result<()> {
        let handle = self.viewers.create(self.backend.as_mut(), name, width, height)?;
        if let Err(e) = handle.surface_mut().set_color_map(&self.settings.default_color_map) {
            warn!("Default color map not applied to {}: {:#}", name, e);
        }
        Ok(())
    }

    pub fn close_viewer(&mut self, name: &str) -> Result<(), ZViewError> {
        self.viewers.close(self.backend.as_mut(), name)
    }

    /// Make sure a viewer is current, creating or re-selecting `gview_0`.
    pub(crate) fn ensure_viewer(&mut self) -> Result<()> {
        if self.viewers.current().is_some() {
            return Ok(());
        }
        if self.viewers.contains(DEFAULT_VIEWER) {
            self.viewers.switch(DEFAULT_VIEWER)?;
            return Ok(());
        }
        let (w, h) = (
            self.settings.default_viewer_width,
            self.settings.default_viewer_height,
        );
        self.make_viewer(DEFAULT_VIEWER, w, h)
    }

    /// Show buffer `name` in the current viewer (created if needed).
    pub fn display_buffer(&mut self, name: &str) -> Result<()> {
        let image = self.buffers.get(name)?.clone();
        self.ensure_viewer()?;
        let viewer = self.viewers.current_mut().ok_or(ZViewError::NoViewers)?;
        viewer.surface_mut().set_image(image);
        Ok(())
    }

    /// Startup file: buffer `index` shown in its own viewer `gview_<index>`.
    pub fn open_file(&mut self, index: usize, path: &Path) -> Result<()> {
        let buffer = index.to_string();
        let viewer = format!("gview_{}", index);
        self.read_buffer(&buffer, path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        let (w, h) = (
            self.settings.default_viewer_width,
            self.settings.default_viewer_height,
        );
        self.make_viewer(&viewer, w, h)?;
        let image = self.buffers.get(&buffer)?.clone();
        if let Some(handle) = self.viewers.get_mut(&viewer) {
            handle.surface_mut().set_image(image);
        }
        Ok(())
    }

    // ── Analysis ─────────────────────────────────────────────────────────────

    /// Image shown in the current viewer.
    pub fn current_image(&self) -> Result<Arc<ImageBuffer>> {
        let viewer = self.viewers.current().ok_or(ZViewError::NoViewers)?;
        match viewer.surface().image() {
            Some(image) => Ok(image.clone()),
            None => bail!(ZViewError::UserInput(format!(
                "No image in viewer '{}'",
                viewer.name()
            ))),
        }
    }

    /// Find objects around `(x, y)` in the current viewer's image.
    /// A cancel raised before or during the run fails it; the token is
    /// cleared once the run is over.
    pub fn find_objects(&self, image: &ImageBuffer, x: f64, y: f64) -> Result<Vec<Candidate>> {
        let result = self.finder.find_objects(image, x, y, &self.cancel);
        self.cancel.reset();
        result.map_err(|e| ZViewError::Data(e.to_string()).into())
    }

    pub fn make_report(&self, image: &ImageBuffer, candidate: &Candidate) -> Report {
        report::make_report(image, candidate, self.finder.config().pixel_coords_offset)
    }
}

/// Log a handler failure at a level matching its kind.
fn report_error(line: &str, err: &anyhow::Error) {
    let kind = err
        .downcast_ref::<ZViewError>()
        .map(ZViewError::kind)
        .unwrap_or(ErrorKind::Data);
    match kind {
        ErrorKind::UserInput => debug!("'{}' rejected: {:#}", line, err),
        ErrorKind::Data => warn!("'{}' failed: {:#}", line, err),
        ErrorKind::Environment => error!("'{}' failed: {:#}", line, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{star_field, zview_with, MemoryLoader, RecordingShell};
    use ndarray::Array2;

    #[test]
    fn test_empty_line_is_noop() {
        let mut zv = zview_with(MemoryLoader::new());
        let reply = zv.exec("   ");
        assert!(reply.is_ok());
        assert!(reply.lines.is_empty());
        assert!(zv.transcript().is_empty());
    }

    #[test]
    fn test_unknown_command() {
        let mut zv = zview_with(MemoryLoader::new());
        let reply = zv.exec("frobnicate 1 2");
        assert_eq!(reply.status, Status::NoSuchCommand);
        assert_eq!(reply.lines, vec!["!! No such command: 'frobnicate'"]);
        let lines: Vec<&str> = zv.transcript().lines().collect();
        assert_eq!(lines, vec!["ZVIEW> frobnicate 1 2", "!! No such command: 'frobnicate'"]);
    }

    #[test]
    fn test_commands_are_case_insensitive() {
        let mut zv = zview_with(MemoryLoader::new());
        assert!(zv.exec("LSB").is_ok());
        assert_eq!(zv.exec("Lsv").lines, vec!["No viewers"]);
    }

    #[test]
    fn test_handler_error_is_reported() {
        let mut zv = zview_with(MemoryLoader::new());
        let reply = zv.exec("rd 1");
        assert_eq!(reply.status, Status::Failed);
        assert_eq!(reply.lines.len(), 1);
        assert!(
            reply.lines[0].starts_with("!! Error executing 'rd 1': "),
            "{}",
            reply.lines[0]
        );
    }

    #[test]
    fn test_shell_escape() {
        let shell = RecordingShell::new().with_reply("echo hi", 0, "hi\n", "");
        let mut zv = zview_with(MemoryLoader::new()).with_shell(Box::new(shell.clone()));
        let reply = zv.exec("!echo hi");
        assert!(reply.is_ok());
        assert_eq!(reply.lines, vec!["hi"]);
        assert_eq!(shell.calls(), vec![("echo hi".to_string(), zv.cwd().to_path_buf())]);

        let failing = RecordingShell::new().with_reply("false", 1, "", "");
        let mut zv = zview_with(MemoryLoader::new()).with_shell(Box::new(failing));
        let reply = zv.exec("!false");
        assert_eq!(reply.status, Status::Failed);
        assert_eq!(reply.lines, vec!["!! Command exited with status 1"]);
    }

    #[test]
    fn test_read_then_view_creates_viewer() {
        let loader = MemoryLoader::new().with_image("/data/a.fits", Array2::from_elem((10, 20), 1.0));
        let mut zv = zview_with(loader);

        assert!(zv.exec("read 1 /data/a.fits").is_ok());
        assert!(zv.exec("v 1").is_ok());
        assert_eq!(zv.viewers().current_name(), Some(DEFAULT_VIEWER));
        assert_eq!(zv.exec("lsv").lines, vec![">gview_0"]);
        assert_eq!(zv.viewers().current().unwrap().buffer_name(), Some("1"));
    }

    #[test]
    fn test_reread_refreshes_viewer() {
        let loader = MemoryLoader::new()
            .with_image("/data/a.fits", Array2::from_elem((10, 20), 1.0))
            .with_image("/data/b.fits", Array2::from_elem((30, 40), 2.0));
        let mut zv = zview_with(loader);
        zv.exec("rd 1 /data/a.fits");
        zv.exec("v 1");
        zv.exec("rd 1 /data/b.fits");

        let shown = zv.current_image().unwrap();
        assert_eq!(shown.width(), 40);
    }

    #[test]
    fn test_open_file_at_startup() {
        let loader = MemoryLoader::new()
            .with_image("/data/a.fits", Array2::from_elem((10, 20), 1.0))
            .with_image("/data/b.fits", Array2::from_elem((30, 40), 2.0));
        let mut zv = zview_with(loader);
        zv.open_file(0, Path::new("/data/a.fits")).unwrap();
        zv.open_file(1, Path::new("/data/b.fits")).unwrap();
        assert!(zv.open_file(2, Path::new("/data/nope.fits")).is_err());

        assert_eq!(zv.exec("lsv").lines, vec![">gview_0", " gview_1"]);
        assert_eq!(zv.viewers().get("gview_1").unwrap().buffer_name(), Some("1"));
        assert_eq!(zv.buffers().len(), 2);
    }

    #[test]
    fn test_ensure_viewer_reuses_default() {
        let loader = MemoryLoader::new().with_image("/data/a.fits", Array2::from_elem((4, 4), 1.0));
        let mut zv = zview_with(loader);
        zv.exec("rd 1 /data/a.fits");
        zv.exec("mkv gview_0");
        zv.exec("mkv other");
        zv.exec("clv other");
        assert!(zv.viewers().current().is_none());

        zv.exec("v 1");
        assert_eq!(zv.viewers().current_name(), Some(DEFAULT_VIEWER));
        assert_eq!(zv.viewers().len(), 1);
    }

    #[test]
    fn test_cancel_before_search_is_honoured_once() {
        let data = star_field(64, 64, &[(32.0, 32.0, 3000.0, 2.0)], 100.0, 1.0);
        let mut zv = zview_with(MemoryLoader::new().with_image("/data/s.fits", data));
        zv.exec("rd 1 /data/s.fits");
        zv.exec("v 1");

        zv.cancel_token().cancel();
        assert_eq!(zv.exec("pick 32 32").lines, vec!["No objects found"]);
        assert!(!zv.cancel_token().is_cancelled());
        assert!(zv.exec("pick 32 32").lines[0].starts_with("X: "));
    }

    #[test]
    fn test_transcript_records_output() {
        let mut zv = zview_with(MemoryLoader::new());
        zv.exec("lsb");
        let lines: Vec<&str> = zv.transcript().lines().collect();
        assert_eq!(lines, vec!["ZVIEW> lsb", "No buffers"]);
    }
}
