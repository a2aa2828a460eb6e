//! Plain-text listing of gemc volumes

use std::io::{self, Write};

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use super::VolumeMap;

/// Print every volume as a block of `name | key | value` lines
pub fn print_volumes(vols: &VolumeMap, color: bool) -> io::Result<()> {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut stdout = StandardStream::stdout(choice);
    write_volumes(&mut stdout, vols)
}

pub(crate) fn write_volumes<W: WriteColor>(out: &mut W, vols: &VolumeMap) -> io::Result<()> {
    for (i, (name, params)) in vols.iter().enumerate() {
        if i > 0 {
            // Blank line between volumes
            writeln!(out)?;
        }
        for (key, value) in params {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)).set_bold(true))?;
            write!(out, "{name}")?;
            out.reset()?;
            write!(out, " | ")?;
            out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
            write!(out, "{key}")?;
            out.reset()?;
            writeln!(out, " | {value}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use termcolor::Buffer;

    #[test]
    fn test_write_volumes() {
        let mut vols = VolumeMap::new();
        vols.insert(
            "b".to_string(),
            BTreeMap::from([("type".to_string(), "Box".to_string())]),
        );
        vols.insert(
            "a".to_string(),
            BTreeMap::from([
                ("mother".to_string(), "root".to_string()),
                ("color".to_string(), "ff11aa".to_string()),
            ]),
        );

        let mut buf = Buffer::no_color();
        write_volumes(&mut buf, &vols).unwrap();
        let text = String::from_utf8(buf.into_inner()).unwrap();
        assert_eq!(text, "a | color | ff11aa\na | mother | root\n\nb | type | Box\n");
    }

    #[test]
    fn test_write_nothing() {
        let mut buf = Buffer::no_color();
        write_volumes(&mut buf, &VolumeMap::new()).unwrap();
        assert!(buf.into_inner().is_empty());
    }
}
