/// cd, pwd, ls, help, quit.

use anyhow::Result;

use super::{lookup, Output, COMMANDS};
use crate::zview::ZView;

pub(crate) fn cd(zv: &mut ZView, args: &[&str], out: &mut Output) -> Result<()> {
    let cwd = zv.change_dir(args.first().copied())?;
    out.log(cwd.display().to_string());
    Ok(())
}

pub(crate) fn pwd(zv: &mut ZView, _args: &[&str], out: &mut Output) -> Result<()> {
    out.log(zv.cwd().display().to_string());
    Ok(())
}

pub(crate) fn ls(zv: &mut ZView, args: &[&str], out: &mut Output) -> Result<()> {
    let command = std::iter::once("ls")
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");
    zv.run_shell(&command, out)?;
    Ok(())
}

pub(crate) fn help(_zv: &mut ZView, args: &[&str], out: &mut Output) -> Result<()> {
    match args.first() {
        Some(name) => {
            let name = name.to_lowercase();
            match lookup(&name) {
                Some(spec) => out.log(format!("{}: {}\n    {}", spec.name, spec.usage, spec.doc)),
                None => out.log(format!(
                    "No such command '{}'; type help for general help.",
                    name
                )),
            }
        }
        None => {
            for spec in COMMANDS {
                out.log(format!("{}: {}\n    {}", spec.name, spec.usage, spec.doc));
            }
        }
    }
    Ok(())
}

pub(crate) fn quit(zv: &mut ZView, _args: &[&str], _out: &mut Output) -> Result<()> {
    zv.request_quit();
    Ok(())
}
