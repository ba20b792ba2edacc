//! File explorer: a GUI client that pages the current directory through
//! `SYS_DIR_LIST` into its window body.

use alloc::format;
use alloc::string::String;

use orion_abi::gui::GUI_MSG_TEXT_MAX;

use crate::syscall::*;

const MAX_ENTRIES: usize = 64;
const NAME_LEN: usize = 32;
const PAGE_LINES: usize = 8;

struct Listing {
    names: [u8; MAX_ENTRIES * NAME_LEN],
    is_dir: [u8; MAX_ENTRIES],
    count: usize,
}

impl Listing {
    fn refresh(&mut self, path: &str) -> bool {
        let count = sys_dir_list(
            Some(path),
            &mut self.names,
            &mut self.is_dir,
            NAME_LEN as u32,
        );
        if count < 0 {
            return false;
        }
        self.count = count as usize;
        true
    }

    fn name(&self, i: usize) -> &str {
        orion_lib::string::bytes_as_str(&self.names[i * NAME_LEN..(i + 1) * NAME_LEN])
    }
}

fn build_page_text(path: &str, listing: &Listing, page: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!("Path: {}\n", if path.is_empty() { "/" } else { path }));

    let total_pages = listing.count.div_ceil(PAGE_LINES).max(1);
    let page = page.min(total_pages - 1);
    out.push_str(&format!("Page {}/{}  (n/p/r/q)\n", page + 1, total_pages));

    if listing.count == 0 {
        out.push_str("(empty)\n");
        return out;
    }

    let start = page * PAGE_LINES;
    let end = (start + PAGE_LINES).min(listing.count);
    for i in start..end {
        let mut name = listing.name(i);
        if name.len() > 24 {
            name = &name[..24];
        }
        let kind = if listing.is_dir[i] != 0 { 'D' } else { 'F' };
        let line = format!("[{}] {}\n", kind, name);
        if out.len() + line.len() >= GUI_MSG_TEXT_MAX - 1 {
            break;
        }
        out.push_str(&line);
    }
    out
}

pub extern "C" fn explorer_entry() {
    let path = "/";
    let mut listing = Listing {
        names: [0; MAX_ENTRIES * NAME_LEN],
        is_dir: [0; MAX_ENTRIES],
        count: 0,
    };

    if !listing.refresh(path) {
        if !gui_create(-1, -1, 360, 220, "Explorer") {
            sys_kprint("explorer: gui not running\n");
            sys_exit(1);
        }
        gui_set_text("explorer: list failed");
        sys_pause();
        sys_exit(1);
    }

    if !gui_create(-1, -1, 360, 240, "Explorer") {
        sys_kprint("explorer: gui not running\n");
        sys_exit(1);
    }

    let mut page = 0usize;
    gui_set_text(&build_page_text(path, &listing, page));

    loop {
        let key = sys_getkey();
        match key {
            0x1B | 0x71 | 0x51 => break,
            0x72 | 0x52 => {
                if !listing.refresh(path) {
                    gui_set_text("explorer: list failed");
                    continue;
                }
            }
            0x6E | 0x4E => page += 1,
            0x70 | 0x50 => page = page.saturating_sub(1),
            _ => continue,
        }

        let total_pages = listing.count.div_ceil(PAGE_LINES).max(1);
        page = page.min(total_pages - 1);
        gui_set_text(&build_page_text(path, &listing, page));
    }

    gui_close();
    sys_exit(0);
}
