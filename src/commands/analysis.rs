/// pix, pick, rp, gp, ep: readouts and object analysis in the current viewer.

use anyhow::Result;
use tracing::{info, warn};

use super::{position, Output};
use crate::analysis::plots;
use crate::report::BAD_WCS;
use crate::wcs::{self, Wcs};
use crate::zview::ZView;

pub(crate) fn pix(zv: &mut ZView, args: &[&str], out: &mut Output) -> Result<()> {
    let (x, y) = position(args)?;
    if zv.viewers.current().is_none() {
        out.log("No viewers");
        return Ok(());
    }
    let image = zv.current_image()?;

    // The value is reported across the whole pixel
    let (px, py) = ((x + 0.5).floor(), (y + 0.5).floor());
    let value = if px >= 0.0 && py >= 0.0 {
        image.pixel(px as usize, py as usize)
    } else {
        None
    };
    let value = value.map_or_else(|| "None".to_string(), |v| v.to_string());

    let (ra_txt, dec_txt) = match Wcs::from_header(image.header()).and_then(|w| w.pixel_to_sky(x, y)) {
        Ok((ra, dec)) => (wcs::ra_deg_to_str(ra), wcs::dec_deg_to_str(dec)),
        Err(e) => {
            warn!("Bad coordinate conversion: {:#}", e);
            (BAD_WCS.to_string(), BAD_WCS.to_string())
        }
    };

    out.log(format!(
        "RA: {}  DEC: {}  X: {:.2}  Y: {:.2}  Value: {}",
        ra_txt,
        dec_txt,
        x + 1.0,
        y + 1.0,
        value
    ));
    Ok(())
}

pub(crate) fn pick(zv: &mut ZView, args: &[&str], out: &mut Output) -> Result<()> {
    let (x, y) = position(args)?;
    if zv.viewers.current().is_none() {
        out.log("No viewers");
        return Ok(());
    }
    let image = zv.current_image()?;
    let Ok(found) = zv.find_objects(&image, x, y) else {
        out.log("No objects found");
        return Ok(());
    };
    let report = zv.make_report(&image, &found[0]);
    out.log(report.to_string());
    Ok(())
}

pub(crate) fn rp(zv: &mut ZView, args: &[&str], out: &mut Output) -> Result<()> {
    let (x, y) = position(args)?;
    if zv.viewers.current().is_none() {
        out.log("No viewers");
        return Ok(());
    }
    let image = zv.current_image()?;
    let Ok(found) = zv.find_objects(&image, x, y) else {
        out.log("No objects found");
        return Ok(());
    };
    let qs = &found[0];

    let radius = zv.finder.config().radius;
    let profile = plots::radial_profile(&image, qs.objx, qs.objy, radius)?;
    info!(
        "Radial profile at ({:.2}, {:.2}): {} points",
        qs.objx,
        qs.objy,
        profile.points.len()
    );
    out.log(format!(
        "radial profile: {} points within {} px of ({:.2}, {:.2})",
        profile.points.len(),
        radius,
        qs.objx,
        qs.objy
    ));

    let report = zv.make_report(&image, qs);
    out.log(format!("seeing size {:5.2}", report.starsize));
    Ok(())
}

pub(crate) fn gp(zv: &mut ZView, args: &[&str], out: &mut Output) -> Result<()> {
    let (x, y) = position(args)?;
    if zv.viewers.current().is_none() {
        out.log("No viewers");
        return Ok(());
    }
    let image = zv.current_image()?;
    let Ok(found) = zv.find_objects(&image, x, y) else {
        out.log("No objects found");
        return Ok(());
    };
    let qs = &found[0];

    let profiles = plots::fwhm_profiles(&image, qs.objx, qs.objy, zv.finder.config().radius)?;
    out.log(format!(
        "FWHM X: {:.3} (center {:.2})  FWHM Y: {:.3} (center {:.2})",
        profiles.x.fwhm, profiles.x.center, profiles.y.fwhm, profiles.y.center
    ));
    Ok(())
}

pub(crate) fn ep(zv: &mut ZView, args: &[&str], out: &mut Output) -> Result<()> {
    let (x, y) = position(args)?;
    if zv.viewers.current().is_none() {
        out.log("No viewers");
        return Ok(());
    }
    let image = zv.current_image()?;
    // Without an object the contours are drawn around the requested point
    let (cx, cy) = match zv.find_objects(&image, x, y) {
        Ok(found) => (found[0].objx, found[0].objy),
        Err(_) => {
            out.log("No objects found");
            (x, y)
        }
    };

    let config = zv.finder.config();
    let contours = plots::contour_levels(&image, cx, cy, config.contour_radius, config.num_contours)?;
    let levels: Vec<String> = contours.levels.iter().map(|l| format!("{:.1}", l)).collect();
    out.log(format!(
        "contours at ({:.2}, {:.2}) radius {}: {}",
        cx,
        cy,
        config.contour_radius,
        levels.join(" ")
    ));
    Ok(())
}
