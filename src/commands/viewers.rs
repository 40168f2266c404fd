/// v, tv, cm, dist, mkv, swv, lsv, clv, lscm.

use anyhow::{bail, Result};

use super::{parse, required, Output};
use crate::display::Distribution;
use crate::error::ZViewError;
use crate::zview::ZView;

pub(crate) fn v(zv: &mut ZView, args: &[&str], out: &mut Output) -> Result<()> {
    let name = required(args, 0, "bufname")?;
    if !zv.buffers.contains(name) {
        out.log(format!("!! No such buffer: '{}'", name));
        return Ok(());
    }
    zv.display_buffer(name)?;

    let mut rest = &args[1..];
    let mut cuts = None;
    if let Some(first) = rest.first() {
        if let Ok(lo) = first.parse::<f64>() {
            let Some(second) = rest.get(1) else {
                bail!(ZViewError::UserInput("Missing high cut level".to_string()));
            };
            if let Ok(hi) = second.parse::<f64>() {
                cuts = Some((lo, hi));
                rest = &rest[2..];
            }
        }
    }

    let viewer = zv.viewers.current_mut().ok_or(ZViewError::NoViewers)?;
    let surface = viewer.surface_mut();
    if let Some((lo, hi)) = cuts {
        surface.set_cut_levels(lo, hi);
    }
    match rest.first() {
        Some(&"inv") => surface.invert_color_map(),
        Some(cmap) => surface.set_color_map(cmap)?,
        None => {}
    }
    Ok(())
}

pub(crate) fn tv(zv: &mut ZView, args: &[&str], out: &mut Output) -> Result<()> {
    let mut args = args.to_vec();
    // Only the first occurrence of each alias is translated
    if let Some(i) = args.iter().skip(1).position(|a| *a == "bw") {
        args[i + 1] = "gray";
    }
    if let Some(i) = args.iter().skip(1).position(|a| *a == "jt") {
        args[i + 1] = "rainbow3";
    }
    v(zv, &args, out)
}

pub(crate) fn cm(zv: &mut ZView, args: &[&str], out: &mut Output) -> Result<()> {
    let Some(viewer) = zv.viewers.current_mut() else {
        out.log("No viewers");
        return Ok(());
    };
    let surface = viewer.surface_mut();
    match args.first() {
        None => out.log(surface.color_map()),
        Some(&"inv") => surface.invert_color_map(),
        Some(name) => surface.set_color_map(name)?,
    }
    Ok(())
}

pub(crate) fn dist(zv: &mut ZView, args: &[&str], out: &mut Output) -> Result<()> {
    let Some(viewer) = zv.viewers.current_mut() else {
        out.log("No viewers");
        return Ok(());
    };
    let surface = viewer.surface_mut();
    match args.first() {
        None => out.log(surface.distribution().to_string()),
        Some(name) => surface.set_distribution(name.parse::<Distribution>()?),
    }
    Ok(())
}

pub(crate) fn mkv(zv: &mut ZView, args: &[&str], _out: &mut Output) -> Result<()> {
    let name = required(args, 0, "name")?;
    let (width, height) = if args.len() > 1 {
        (
            parse::<u32>(args[1], "width")?,
            parse::<u32>(required(args, 2, "height")?, "height")?,
        )
    } else {
        (
            zv.settings.default_viewer_width,
            zv.settings.default_viewer_height,
        )
    };
    zv.make_viewer(name, width, height)?;
    zv.viewers.switch(name)?;
    Ok(())
}

pub(crate) fn swv(zv: &mut ZView, args: &[&str], out: &mut Output) -> Result<()> {
    let name = required(args, 0, "name")?;
    if let Err(e) = zv.viewers.switch(name) {
        out.log(e.to_string());
    }
    Ok(())
}

pub(crate) fn clv(zv: &mut ZView, args: &[&str], out: &mut Output) -> Result<()> {
    let name = required(args, 0, "name")?;
    if let Err(e) = zv.close_viewer(name) {
        out.log(e.to_string());
    }
    Ok(())
}

pub(crate) fn lsv(zv: &mut ZView, _args: &[&str], out: &mut Output) -> Result<()> {
    if zv.viewers.is_empty() {
        out.log("No viewers");
        return Ok(());
    }
    for (name, current) in zv.viewers.list() {
        let mark = if current { '>' } else { ' ' };
        out.log(format!("{}{}", mark, name));
    }
    Ok(())
}

pub(crate) fn lscm(zv: &mut ZView, _args: &[&str], out: &mut Output) -> Result<()> {
    out.log(zv.backend.color_maps().join("\n"));
    Ok(())
}
