//! Path normalisation for the shell-visible current directory.
//!
//! `normalize(base, input)` resolves `input` against `base`: absolute paths
//! restart at `/`, `.` is dropped, `..` pops one component, and repeated
//! separators collapse. The result always starts with `/` and carries no
//! trailing separator (except the root itself).

use alloc::string::String;
use alloc::vec::Vec;

pub fn normalize(base: &str, input: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();

    if !input.starts_with('/') {
        for comp in base.split('/') {
            push_component(&mut parts, comp);
        }
    }
    for comp in input.split('/') {
        push_component(&mut parts, comp);
    }

    if parts.is_empty() {
        return String::from("/");
    }
    let mut out = String::new();
    for part in parts {
        out.push('/');
        out.push_str(part);
    }
    out
}

fn push_component<'a>(parts: &mut Vec<&'a str>, comp: &'a str) {
    match comp {
        "" | "." => {}
        ".." => {
            parts.pop();
        }
        other => parts.push(other),
    }
}

/// Split a normalized path into its components.
pub fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|c| !c.is_empty() && *c != ".")
}

/// Final component of a path, if any.
pub fn file_name(path: &str) -> Option<&str> {
    components(path).last()
}

/// Everything before the final component; `/` when there is none.
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}
