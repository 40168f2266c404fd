/// rd/read, lsb, rmb, rm, head.

use anyhow::Result;

use super::{required, Output};
use crate::zview::ZView;

pub(crate) fn rd(zv: &mut ZView, args: &[&str], out: &mut Output) -> Result<()> {
    let name = required(args, 0, "bufname")?;
    let path = zv.resolve_path(required(args, 1, "path")?);

    if zv.buffers.contains(name) {
        out.log(format!(
            "Buffer {} is in use. Will discard the previous data",
            name
        ));
    }
    out.log(format!("Reading file...({})", path.display()));
    zv.read_buffer(name, &path)?;
    out.log("File read");
    Ok(())
}

pub(crate) fn lsb(zv: &mut ZView, _args: &[&str], out: &mut Output) -> Result<()> {
    if zv.buffers.is_empty() {
        out.log("No buffers");
        return Ok(());
    }
    for info in zv.buffers.list() {
        let size = format!("{}x{}", info.width, info.height);
        out.log(format!(
            "{:<10.10}  {:>13}  {}",
            info.name,
            size,
            info.path.display()
        ));
    }
    Ok(())
}

pub(crate) fn rmb(zv: &mut ZView, args: &[&str], out: &mut Output) -> Result<()> {
    for name in args {
        if let Err(e) = zv.buffers.remove(name) {
            out.log(e.to_string());
        }
    }
    lsb(zv, &[], out)
}

pub(crate) fn rm(zv: &mut ZView, args: &[&str], out: &mut Output) -> Result<()> {
    out.log("warning: this command will be deprecated--use 'rmb'");
    rmb(zv, args, out)
}

pub(crate) fn head(zv: &mut ZView, args: &[&str], out: &mut Output) -> Result<()> {
    let name = required(args, 0, "buf")?;
    let image = match zv.buffers.get(name) {
        Ok(image) => image,
        Err(e) => {
            out.log(e.to_string());
            return Ok(());
        }
    };
    let header = image.header();

    if args.len() > 1 {
        for kwd in &args[1..] {
            match header.get(kwd) {
                Some(value) => out.log(format!("{:<8.8}  {}", kwd, value)),
                None => out.log(format!("{:<8.8}  -- NOT FOUND IN HEADER --", kwd)),
            }
        }
    } else {
        for card in header.cards().iter().filter(|c| !c.is_commentary()) {
            out.log(format!("{:<8.8}  {}", card.keyword, card.value));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::formats::{Header, HeaderValue};
    use crate::test_utils::{zview_with, MemoryLoader};
    use crate::zview::Status;
    use ndarray::Array2;

    fn loader() -> MemoryLoader {
        let mut header = Header::new();
        header.set("OBJECT", HeaderValue::String("M31".into()));
        header.set("EXPTIME", HeaderValue::Float(30.0));
        header.set("NAXIS1", HeaderValue::Integer(20));
        MemoryLoader::new()
            .with_image("/data/a.fits", Array2::from_elem((10, 20), 1.0))
            .with_header("/data/a.fits", header)
            .with_image("/work/rel.fits", Array2::from_elem((3, 4), 1.0))
    }

    #[test]
    fn test_rd_messages() {
        let mut zv = zview_with(loader());
        let reply = zv.exec("rd 1 /data/a.fits");
        assert_eq!(reply.lines, vec!["Reading file...(/data/a.fits)", "File read"]);

        let reply = zv.exec("rd 1 /data/a.fits");
        assert_eq!(reply.lines[0], "Buffer 1 is in use. Will discard the previous data");
        assert_eq!(zv.buffers().len(), 1);
    }

    #[test]
    fn test_rd_relative_to_cwd() {
        let mut zv = zview_with(loader());
        assert!(zv.exec("rd r rel.fits").is_ok());
        assert_eq!(zv.buffers().get("r").unwrap().width(), 4);
    }

    #[test]
    fn test_rd_missing_file() {
        let mut zv = zview_with(loader());
        let reply = zv.exec("rd 1 /data/missing.fits");
        assert_eq!(reply.status, Status::Failed);
        assert_eq!(reply.lines[0], "Reading file...(/data/missing.fits)");
        assert!(reply.lines[1].starts_with("!! Error executing 'rd 1 /data/missing.fits': "));
        assert!(!zv.buffers().contains("1"));
    }

    #[test]
    fn test_rd_malformed_dimensions_fails_cleanly() {
        use crate::config::Settings;
        use crate::formats::fits::tests::build_fits;
        use crate::zview::ZView;

        let dir = tempfile::tempdir().unwrap();
        let side = 1usize << 33;
        std::fs::write(dir.path().join("huge.fits"), build_fits(-64, side, side, &[], &[])).unwrap();
        std::fs::write(
            dir.path().join("short.fits"),
            build_fits(-64, 200_000, 200_000, &[], &[0u8; 16]),
        )
        .unwrap();

        let mut zv = ZView::with_cwd(Settings::default(), dir.path().to_path_buf());
        for file in ["huge.fits", "short.fits"] {
            let reply = zv.exec(&format!("rd 1 {}", file));
            assert_eq!(reply.status, Status::Failed, "{}", file);
            assert!(reply.lines[1].starts_with("!! Error executing"), "{:?}", reply.lines);
        }
        assert!(zv.buffers().is_empty());
        assert!(zv.exec("lsb").is_ok());
    }

    #[test]
    fn test_lsb_format() {
        let mut zv = zview_with(loader());
        assert_eq!(zv.exec("lsb").lines, vec!["No buffers"]);

        zv.exec("rd averyveryverylongname /data/a.fits");
        zv.exec("rd 1 /data/a.fits");
        let lines = zv.exec("lsb").lines;
        assert_eq!(
            lines,
            vec![
                format!("{:<10}  {:>13}  /data/a.fits", "1", "20x10"),
                format!("{}  {:>13}  /data/a.fits", "averyveryv", "20x10"),
            ]
        );
    }

    #[test]
    fn test_rmb_and_rm() {
        let mut zv = zview_with(loader());
        zv.exec("rd 1 /data/a.fits");
        zv.exec("rd 2 /data/a.fits");

        let lines = zv.exec("rmb 1 nope").lines;
        assert_eq!(lines[0], "No such buffer: 'nope'");
        assert!(lines[1].starts_with("2 "));
        assert_eq!(zv.buffers().len(), 1);

        let lines = zv.exec("rm 2").lines;
        assert_eq!(
            lines,
            vec!["warning: this command will be deprecated--use 'rmb'", "No buffers"]
        );
    }

    #[test]
    fn test_removed_buffer_stays_in_viewer() {
        let mut zv = zview_with(loader());
        zv.exec("rd 1 /data/a.fits");
        zv.exec("v 1");
        zv.exec("rmb 1");
        assert!(zv.buffers().is_empty());
        assert_eq!(zv.current_image().unwrap().width(), 20);
    }

    #[test]
    fn test_head() {
        let mut zv = zview_with(loader());
        assert_eq!(zv.exec("head 1").lines, vec!["No such buffer: '1'"]);

        zv.exec("rd 1 /data/a.fits");
        let lines = zv.exec("head 1").lines;
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "OBJECT    M31");

        let lines = zv.exec("head 1 EXPTIME FILTER").lines;
        assert_eq!(lines[0], "EXPTIME   30.0");
        assert_eq!(lines[1], "FILTER    -- NOT FOUND IN HEADER --");

        let lines = zv.exec("head 1 exptime").lines;
        assert_eq!(lines, vec!["exptime   -- NOT FOUND IN HEADER --"]);
    }
}
