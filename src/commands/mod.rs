/// Command table and the handler-side helpers.

mod analysis;
mod buffers;
mod session;
mod viewers;

use std::str::FromStr;

use anyhow::Result;

use crate::error::ZViewError;
use crate::zview::ZView;

pub type Handler = fn(&mut ZView, &[&str], &mut Output) -> Result<()>;

pub struct CommandSpec {
    pub name: &'static str,
    pub usage: &'static str,
    pub doc: &'static str,
    pub handler: Handler,
}

/// All commands, sorted by name.
pub static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "cd",
        usage: "cd [path]",
        doc: "Change the current working directory to `path` (default: home).",
        handler: session::cd,
    },
    CommandSpec {
        name: "clv",
        usage: "clv name",
        doc: "Close viewer NAME.",
        handler: viewers::clv,
    },
    CommandSpec {
        name: "cm",
        usage: "cm [cm_name | inv]",
        doc: "Set the color map of the current viewer; 'inv' inverts it. \
              With no argument, report the current color map.",
        handler: viewers::cm,
    },
    CommandSpec {
        name: "dist",
        usage: "dist [dist_name]",
        doc: "Set the color distribution of the current viewer: linear, log, power, \
              sqrt, squared, asinh, sinh or histeq. With no argument, report it.",
        handler: viewers::dist,
    },
    CommandSpec {
        name: "ep",
        usage: "ep x y",
        doc: "Contour plot around the object nearest data position (x, y).",
        handler: analysis::ep,
    },
    CommandSpec {
        name: "exit",
        usage: "exit",
        doc: "Synonym for 'quit'.",
        handler: session::quit,
    },
    CommandSpec {
        name: "gp",
        usage: "gp x y",
        doc: "FWHM gaussians plot for the object nearest data position (x, y).",
        handler: analysis::gp,
    },
    CommandSpec {
        name: "head",
        usage: "head buf [kwd ...]",
        doc: "List the headers for the image in the named buffer.",
        handler: buffers::head,
    },
    CommandSpec {
        name: "help",
        usage: "help [cmd]",
        doc: "Get general help, or help for command `cmd`.",
        handler: session::help,
    },
    CommandSpec {
        name: "ls",
        usage: "ls [options]",
        doc: "Execute list files command.",
        handler: session::ls,
    },
    CommandSpec {
        name: "lsb",
        usage: "lsb",
        doc: "List the buffers.",
        handler: buffers::lsb,
    },
    CommandSpec {
        name: "lscm",
        usage: "lscm",
        doc: "List the possible color maps that can be loaded.",
        handler: viewers::lscm,
    },
    CommandSpec {
        name: "lsv",
        usage: "lsv",
        doc: "List the viewers, showing the current one.",
        handler: viewers::lsv,
    },
    CommandSpec {
        name: "mkv",
        usage: "mkv name [width height]",
        doc: "Make a viewer with name NAME and make it current. \
              `width` and `height` give the pixel size of the view pane.",
        handler: viewers::mkv,
    },
    CommandSpec {
        name: "pick",
        usage: "pick x y",
        doc: "Find the object nearest data position (x, y) and report on it.",
        handler: analysis::pick,
    },
    CommandSpec {
        name: "pix",
        usage: "pix x y",
        doc: "Report sky position and pixel value at data position (x, y).",
        handler: analysis::pix,
    },
    CommandSpec {
        name: "pwd",
        usage: "pwd",
        doc: "List the current working directory.",
        handler: session::pwd,
    },
    CommandSpec {
        name: "quit",
        usage: "quit",
        doc: "Quit using zview.",
        handler: session::quit,
    },
    CommandSpec {
        name: "rd",
        usage: "rd bufname path",
        doc: "Read file from `path` into buffer `bufname`, creating the buffer if \
              needed. Relative paths are taken from the current working directory.",
        handler: buffers::rd,
    },
    CommandSpec {
        name: "read",
        usage: "read bufname path",
        doc: "Synonym for 'rd'.",
        handler: buffers::rd,
    },
    CommandSpec {
        name: "rm",
        usage: "rm NAME ...",
        doc: "command to be deprecated--use 'rmb'",
        handler: buffers::rm,
    },
    CommandSpec {
        name: "rmb",
        usage: "rmb NAME ...",
        doc: "Remove buffer NAME.",
        handler: buffers::rmb,
    },
    CommandSpec {
        name: "rp",
        usage: "rp x y",
        doc: "Radial profile plot for the object nearest data position (x, y).",
        handler: analysis::rp,
    },
    CommandSpec {
        name: "swv",
        usage: "swv name",
        doc: "Switch the current viewer to NAME.",
        handler: viewers::swv,
    },
    CommandSpec {
        name: "tv",
        usage: "tv bufname [min max] [bw | inv | jt]",
        doc: "Display a buffer; provided for ZVIEW compatibility.",
        handler: viewers::tv,
    },
    CommandSpec {
        name: "v",
        usage: "v bufname [min max] [colormap | inv]",
        doc: "Display buffer `bufname` in the current viewer, creating one if none \
              exists. `min` and `max` set the cut levels.",
        handler: viewers::v,
    },
];

/// Case-insensitive command lookup.
pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

/// Lines produced by a handler.
#[derive(Debug, Default)]
pub struct Output {
    lines: Vec<String>,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text; multi-line text becomes several lines, empty text none.
    pub fn log(&mut self, text: impl AsRef<str>) {
        self.lines.extend(text.as_ref().lines().map(str::to_string));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

// ── Argument helpers ────────────────────────────────────────────────────────

pub(crate) fn required<'a>(args: &[&'a str], index: usize, what: &str) -> Result<&'a str> {
    args.get(index)
        .copied()
        .ok_or_else(|| ZViewError::UserInput(format!("Missing required argument '{}'", what)).into())
}

pub(crate) fn parse<T: FromStr>(text: &str, what: &str) -> Result<T> {
    text.parse::<T>()
        .map_err(|_| ZViewError::UserInput(format!("Invalid {}: '{}'", what, text)).into())
}

/// Data position from the first two arguments.
pub(crate) fn position(args: &[&str]) -> Result<(f64, f64)> {
    let x = parse(required(args, 0, "x")?, "x")?;
    let y = parse(required(args, 1, "y")?, "y")?;
    Ok((x, y))
}
