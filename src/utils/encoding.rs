use encoding_rs::WINDOWS_1252;
use std::borrow::Cow;
use tracing::warn;

/// Decode file contents as UTF-8, falling back to Windows-1252.
///
/// Reference files such as `uszips.csv` are sometimes re-saved by spreadsheet
/// tools with a legacy code page (county names like "Doña Ana").
pub fn decode_text<'a>(bytes: &'a [u8], source: &str) -> Cow<'a, str> {
    // Strip a UTF-8 byte order mark
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF][..]).unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            warn!("{} is not valid UTF-8, decoding as Windows-1252", source);
            let (text, _, _) = WINDOWS_1252.decode(bytes);
            text
        }
    }
}
