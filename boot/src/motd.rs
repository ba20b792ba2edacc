//! Message-of-the-day rendering.
//!
//! Each line of the motd file may end in `, <fg>, <bg>` (both 0..=15); the
//! prefix before the directive prints in that colour, everything else in
//! the current one.

use orion_lib::console::{kprint, kprint_color};
use orion_lib::string::trim;

use orion_fs::fscmd;

/// Split a trailing `, fg, bg` colour directive off `line`. Returns the
/// text prefix and the pair when the suffix parses.
fn split_color_suffix(line: &[u8]) -> Option<(&[u8], u8, u8)> {
    let line = trim(line);
    if line.is_empty() {
        return None;
    }

    let last_comma = line.iter().rposition(|&b| b == b',')?;
    let bg = parse_color_field(&line[last_comma + 1..])?;

    let rest = &line[..last_comma];
    let prev_comma = rest.iter().rposition(|&b| b == b',')?;
    let fg = parse_color_field(&rest[prev_comma + 1..])?;

    let text = trim(&rest[..prev_comma]);
    Some((text, fg, bg))
}

fn parse_color_field(field: &[u8]) -> Option<u8> {
    let field = trim(field);
    if field.is_empty() || !field.iter().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value = orion_lib::string::parse_u32(field)?;
    if value > 15 {
        return None;
    }
    Some(value as u8)
}

/// Render `path` to the console, line by line.
pub fn print_motd_file(path: &str) {
    if path.is_empty() || !fscmd::exists(path) {
        return;
    }

    let mut buf = [0u8; 512];
    let n = fscmd::read_file_by_name(path, &mut buf);
    if n <= 0 {
        return;
    }

    for raw_line in buf[..n as usize].split(|&b| b == b'\n') {
        let line = raw_line.strip_suffix(b"\r").unwrap_or(raw_line);
        match split_color_suffix(line) {
            Some((text, fg, bg)) => {
                if let Ok(s) = core::str::from_utf8(text) {
                    kprint_color(s, fg, bg);
                }
            }
            None => {
                if let Ok(s) = core::str::from_utf8(line) {
                    if !s.is_empty() {
                        kprint(s);
                    }
                }
            }
        }
        kprint("\n");
    }
}
