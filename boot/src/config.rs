//! Persisted configuration: `/system/config/orion.stg`.
//!
//! INI-style, `[orion]` section only. Unknown keys are ignored so old
//! kernels boot newer configs. Load-once with an explicit reload for the
//! shell's config command.

use orion_lib::string::{parse_u32, trim};
use orion_lib::{IrqMutex, cprintf};

use orion_fs::fscmd;

const CONFIG_PATH: &str = "/system/config/orion.stg";
const BOOT_CLEAR_FLAG: u32 = 0x1;

#[derive(Clone, Copy)]
pub struct OrionConfig {
    pub prompt_fg: u8,
    pub prompt_bg: u8,
    pub prompt_color_set: bool,
    pub beep_enabled: bool,
    pub boot_clear: bool,
}

impl OrionConfig {
    const fn defaults() -> Self {
        Self {
            prompt_fg: 15,
            prompt_bg: 0,
            prompt_color_set: false,
            beep_enabled: false,
            boot_clear: true,
        }
    }
}

struct ConfigState {
    cfg: OrionConfig,
    loaded: bool,
}

static STATE: IrqMutex<ConfigState> = IrqMutex::new(ConfigState {
    cfg: OrionConfig::defaults(),
    loaded: false,
});

pub fn config() -> OrionConfig {
    STATE.lock().cfg
}

pub fn boot_flags() -> u32 {
    if STATE.lock().cfg.boot_clear {
        BOOT_CLEAR_FLAG
    } else {
        0
    }
}

fn parse_bool(value: &[u8]) -> Option<bool> {
    parse_u32(trim(value)).map(|v| v != 0)
}

/// `prompt_color=<fg>,<bg>`, both 0..=15.
fn parse_prompt_color(value: &[u8]) -> Option<(u8, u8)> {
    let comma = value.iter().position(|&b| b == b',')?;
    let fg = parse_u32(trim(&value[..comma]))?;
    let bg = parse_u32(trim(&value[comma + 1..]))?;
    Some((fg.min(15) as u8, bg.min(15) as u8))
}

fn apply_line(cfg: &mut OrionConfig, key: &[u8], value: &[u8]) {
    match key {
        b"prompt_color" => {
            if let Some((fg, bg)) = parse_prompt_color(value) {
                cfg.prompt_fg = fg;
                cfg.prompt_bg = bg;
                cfg.prompt_color_set = true;
            }
        }
        b"beep_enabled" => {
            if let Some(v) = parse_bool(value) {
                cfg.beep_enabled = v;
            }
        }
        b"boot_clear" => {
            if let Some(v) = parse_bool(value) {
                cfg.boot_clear = v;
            }
        }
        _ => {}
    }
}

fn read_config(reset_defaults: bool) -> bool {
    let mut cfg = if reset_defaults {
        OrionConfig::defaults()
    } else {
        config()
    };

    let mut buf = [0u8; 512];
    let n = fscmd::read_file_by_name(CONFIG_PATH, &mut buf);
    if n <= 0 {
        STATE.lock().cfg = cfg;
        return false;
    }

    let mut in_orion = false;
    for line in buf[..n as usize].split(|&b| b == b'\n') {
        let line = trim(line);
        if line.is_empty() || line[0] == b'#' || line[0] == b';' {
            continue;
        }

        if line[0] == b'[' {
            let end = line.iter().position(|&b| b == b']').unwrap_or(line.len());
            let section = trim(&line[1..end]);
            in_orion = orion_lib::string::eq_ignore_ascii_case(section, b"orion");
            continue;
        }
        if !in_orion {
            continue;
        }

        let Some(eq) = line.iter().position(|&b| b == b'=') else {
            continue;
        };
        let mut key = [0u8; 32];
        let key_src = trim(&line[..eq]);
        let klen = key_src.len().min(key.len());
        key[..klen].copy_from_slice(&key_src[..klen]);
        key[..klen].make_ascii_lowercase();
        apply_line(&mut cfg, &key[..klen], trim(&line[eq + 1..]));
    }

    if cfg.prompt_color_set {
        if let Some(console) = orion_lib::services::CONSOLE.get() {
            (console.set_color)(cfg.prompt_fg, cfg.prompt_bg);
        }
    }
    if cfg.beep_enabled {
        if let Some(speaker) = orion_lib::services::SPEAKER.get() {
            (speaker.beep)(600, 100);
        }
    }

    STATE.lock().cfg = cfg;
    true
}

/// Load once; later calls are free.
pub fn load() {
    let already = {
        let mut state = STATE.lock();
        let was = state.loaded;
        state.loaded = true;
        was
    };
    if !already {
        let _ = read_config(true);
    }
}

pub fn reload(reset_defaults: bool) {
    STATE.lock().loaded = true;
    if !read_config(reset_defaults) {
        cprintf!("config: {} not found\n", CONFIG_PATH);
    }
}
