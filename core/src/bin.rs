//! Flat-binary loader and builtin program registry.
//!
//! `.sys` images are position-independent flat binaries: the file is read
//! into an owned buffer and entered at its first byte. Programs compiled
//! into the kernel image (shell, GUI server, explorer) register their entry
//! points here so the same paths work before any disk carries binaries.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use orion_lib::{IrqMutex, klog_info};

use crate::proc;

const MAX_BUILTINS: usize = 16;
const BUILTIN_PATH_MAX: usize = 64;

#[derive(Clone, Copy)]
struct Builtin {
    path: [u8; BUILTIN_PATH_MAX],
    entry: u32,
}

impl Builtin {
    const fn empty() -> Self {
        Self {
            path: [0; BUILTIN_PATH_MAX],
            entry: 0,
        }
    }
}

static BUILTINS: IrqMutex<[Builtin; MAX_BUILTINS]> =
    IrqMutex::new([Builtin::empty(); MAX_BUILTINS]);

/// Register a compiled-in program under `path`. Called by the userland
/// crate at init.
pub fn register_builtin(path: &str, entry: u32) -> bool {
    let mut table = BUILTINS.lock();
    for slot in table.iter_mut() {
        if slot.entry == 0 {
            orion_lib::string::copy_into_padded(&mut slot.path, path.as_bytes());
            slot.entry = entry;
            return true;
        }
    }
    false
}

fn builtin_entry(path: &str) -> Option<u32> {
    let table = BUILTINS.lock();
    table
        .iter()
        .find(|b| {
            b.entry != 0
                && orion_lib::string::eq_ignore_ascii_case(
                    orion_lib::string::bytes_as_str(&b.path).as_bytes(),
                    path.as_bytes(),
                )
        })
        .map(|b| b.entry)
}

/// A resolved program: where to enter and what memory it owns.
pub struct LoadedImage {
    pub entry: u32,
    pub image: Option<Box<[u8]>>,
    pub load_base: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadError {
    NotFound,
    NotExecutable,
    NoMemory,
}

/// Resolve `path` to something runnable: a builtin entry, else a flat
/// binary read whole from the mounted filesystem.
pub fn bin_load_image(path: &str) -> Result<LoadedImage, LoadError> {
    if let Some(entry) = builtin_entry(path) {
        return Ok(LoadedImage {
            entry,
            image: None,
            load_base: 0,
        });
    }

    if !orion_fs::fscmd::exists(path) {
        return Err(LoadError::NotFound);
    }
    let size = orion_fs::fscmd::get_file_size(path);
    if size == 0 {
        return Err(LoadError::NotExecutable);
    }

    let mut image = vec![0u8; size as usize].into_boxed_slice();
    let got = orion_fs::fscmd::read_file_by_name(path, &mut image);
    if got <= 0 || got as u32 != size {
        return Err(LoadError::NotExecutable);
    }

    let load_base = image.as_ptr() as u32;
    Ok(LoadedImage {
        entry: load_base,
        image: Some(image),
        load_base,
    })
}

/// Spawn a process from `path` with an owned argv. Returns the pid, or
/// `None` — callers translate that to the 0-on-failure spawn contract.
pub fn bin_create_process(
    path: &str,
    argv: Vec<Box<[u8]>>,
    foreground: bool,
) -> Option<u32> {
    let loaded = match bin_load_image(path) {
        Ok(l) => l,
        Err(e) => {
            klog_info!("BIN: load of {} failed: {:?}", path, e);
            return None;
        }
    };

    let name = orion_fs::path::file_name(path).unwrap_or(path);
    proc::proc_create_user(
        name,
        loaded.entry,
        loaded.image,
        loaded.load_base,
        argv,
        foreground,
    )
}
