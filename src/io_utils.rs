//! Input loading and output writing for the command-line front end.
//!
//! - **Inputs** must carry a `.csv` extension; `-` reads standard input.
//! - **Encoding**: input bytes are decoded via `encoding_rs`, defaulting to
//!   UTF-8 (a byte-order mark selects its own encoding).
//! - **Outputs** go to a file, or to stdout when no path (or `-`) is given.

use std::{
    fs::File,
    io::{self, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow, bail};
use encoding_rs::{Encoding, UTF_8};

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

/// Rejects anything that is not a `.csv` file or stdin.
pub fn ensure_csv_input(path: &Path) -> Result<()> {
    if is_dash(path) {
        return Ok(());
    }
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => Ok(()),
        _ => bail!("Input {path:?} is not a .csv file"),
    }
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!("Failed to decode text with encoding {}", used.name()))
    } else {
        Ok(text.into_owned())
    }
}

/// Reads the whole CSV input into memory as text.
pub fn read_input_text(path: &Path, encoding: &'static Encoding) -> Result<String> {
    ensure_csv_input(path)?;
    let mut bytes = Vec::new();
    if is_dash(path) {
        io::stdin()
            .lock()
            .read_to_end(&mut bytes)
            .context("Reading CSV from stdin")?;
    } else {
        File::open(path)
            .with_context(|| format!("Opening input file {path:?}"))?
            .read_to_end(&mut bytes)
            .with_context(|| format!("Reading input file {path:?}"))?;
    }
    decode_bytes(&bytes, encoding).with_context(|| format!("Decoding {path:?}"))
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(io::stdout()),
    })
}

/// Writes `contents` followed by a newline.
pub fn write_output(path: Option<&Path>, contents: &str) -> Result<()> {
    let mut writer = open_output(path)?;
    writer.write_all(contents.as_bytes())?;
    if !contents.is_empty() && !contents.ends_with('\n') {
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn only_csv_inputs_are_accepted() {
        assert!(ensure_csv_input(&PathBuf::from("people.CSV")).is_ok());
        assert!(ensure_csv_input(&PathBuf::from("-")).is_ok());
        assert!(ensure_csv_input(&PathBuf::from("people.tsv")).is_err());
        assert!(ensure_csv_input(&PathBuf::from("people")).is_err());
    }

    #[test]
    fn latin1_input_is_decoded() {
        let encoding = resolve_encoding(Some("windows-1252")).expect("encoding");
        let text = decode_bytes(b"name\nJos\xe9\n", encoding).expect("decode");
        assert_eq!(text, "name\nJosé\n");
    }

    #[test]
    fn invalid_utf8_is_reported() {
        assert!(decode_bytes(b"abc\xff", UTF_8).is_err());
    }
}
