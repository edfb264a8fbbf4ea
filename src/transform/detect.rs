//! Vector content sniffing
//!
//! SVG sources are never rasterised: they are cached and served byte for
//! byte. Detection looks at a short lowercase prefix of the payload.

/// Number of leading bytes inspected
const SNIFF_LEN: usize = 500;

/// Whether `data` looks like SVG markup
pub fn is_svg(data: &[u8]) -> bool {
    if data.len() < 5 {
        return false;
    }

    let end = data.len().min(SNIFF_LEN);
    let prefix = String::from_utf8_lossy(&data[..end]).to_ascii_lowercase();

    prefix.contains("<svg")
        || prefix.contains("<!doctype svg")
        || (prefix.contains("<?xml") && prefix.contains("svg"))
}
