//! The shell: a user process over the syscall API.
//!
//! Dispatch is a fixed, ordered table of `(name, handler)` pairs matched by
//! exact string or prefix-plus-space; the first hit wins. A trailing `&`
//! sends a spawned program to the background. Commands with no syscall of
//! their own (md/rd/del/cp/mv/format/vf) use the filesystem façade the way
//! the original's in-kernel handlers did; everything else goes through the
//! trap.

use alloc::format;
use alloc::string::String;

use orion_abi::input::{KEY_BACKSPACE, KEY_ENTER, KEY_ESC};
use orion_abi::task::{KillResult, MAX_PROCS, PROC_NAME_MAX, ProcState};

use orion_fs::fscmd;

use crate::syscall::*;

const VERSION: &str = "orionOS 0.1";
const LINE_MAX: usize = 256;

struct Shell {
    running: bool,
}

type Handler = fn(&mut Shell, &str) -> bool;

/// Ordered command catalogue; prefix commands accept ` args`.
const COMMANDS: &[(&str, Handler)] = &[
    ("help", cmd_help),
    ("ver", cmd_ver),
    ("clear", cmd_clear),
    ("echo", cmd_echo),
    ("ls", cmd_ls),
    ("fl", cmd_fl),
    ("cat", cmd_cat),
    ("cd", cmd_cd),
    ("cwd", cmd_cwd),
    ("md", cmd_md),
    ("rd", cmd_rd),
    ("del", cmd_del),
    ("cp", cmd_cp),
    ("mv", cmd_mv),
    ("disk", cmd_disk),
    ("format", cmd_format),
    ("vf", cmd_vf),
    ("ps", cmd_ps),
    ("kill", cmd_kill),
    ("wait", cmd_wait),
    ("pause", cmd_pause),
    ("beep", cmd_beep),
    ("color", cmd_color),
    ("uptime", cmd_uptime),
    ("motd", cmd_motd),
    ("font", cmd_font),
    ("note", cmd_note),
    ("run", cmd_run),
    ("calc", cmd_calc),
    ("gui", cmd_gui),
    ("explorer", cmd_explorer),
    ("reboot", cmd_reboot),
    ("exit", cmd_exit),
];

// ---------------------------------------------------------------------------
// Entry and main loop
// ---------------------------------------------------------------------------

pub extern "C" fn shell_entry() {
    // Boot tail: config, root mount, boot-log close-out.
    sys_start_shell();
    if sys_get_boot_flags() & orion_abi::syscall::BOOT_FLAG_CLEAR != 0 {
        sys_clear_screen();
    }
    sys_start_sysmgr();
    sys_sh_motd();
    sys_print_motd("/system/config/motd.txt");

    let mut shell = Shell { running: true };
    let mut line = String::new();

    while shell.running {
        prompt();
        if !read_line(&mut line) {
            continue;
        }
        let input = line.trim();
        if !input.is_empty() {
            dispatch(&mut shell, input);
        }
    }
    sys_exit(0);
}

fn prompt() {
    sys_kprint(&format!("{}> ", fscmd::current_path()));
}

/// Line editor: echo, backspace, Esc clears. Enter submits.
fn read_line(line: &mut String) -> bool {
    line.clear();
    loop {
        let key = sys_getkey();
        match key {
            KEY_ENTER => {
                sys_kprint("\n");
                return true;
            }
            KEY_BACKSPACE => {
                if line.pop().is_some() {
                    sys_kprint("\x08");
                }
            }
            KEY_ESC => {
                while line.pop().is_some() {
                    sys_kprint("\x08");
                }
            }
            0x20..=0x7E if line.len() < LINE_MAX => {
                let ch = key as u8 as char;
                line.push(ch);
                let mut echo = [0u8; 4];
                sys_kprint(ch.encode_utf8(&mut echo));
            }
            _ => {}
        }
    }
}

fn dispatch(shell: &mut Shell, input: &str) {
    for (name, handler) in COMMANDS {
        let matched = input == *name
            || (input.len() > name.len()
                && input.starts_with(name)
                && input.as_bytes()[name.len()] == b' ');
        if matched {
            let args = input[name.len()..].trim_start();
            if !handler(shell, args) {
                sys_kprint("command failed\n");
            }
            return;
        }
    }

    // Not a builtin: treat it as a program path.
    run_program(input);
}

// ---------------------------------------------------------------------------
// Program execution (foreground/background policy)
// ---------------------------------------------------------------------------

fn run_program(input: &str) {
    let (command, background) = match input.strip_suffix('&') {
        Some(rest) => (rest.trim(), true),
        None => (input, false),
    };
    let mut parts = command.split_whitespace();
    let Some(path) = parts.next() else {
        return;
    };

    if !path.ends_with(".sys") {
        sys_kprint(&format!("unknown command: {}\n", path));
        return;
    }

    let mut argv: [&str; 8] = [""; 8];
    argv[0] = path;
    let mut argc = 1;
    for arg in parts {
        if argc >= argv.len() {
            break;
        }
        argv[argc] = arg;
        argc += 1;
    }

    let pid = sys_spawn(path, &argv[..argc]);
    if pid == 0 {
        sys_kprint(&format!("spawn failed: {}\n", path));
        return;
    }

    if background {
        sys_kprint(&format!("[{}] started\n", pid));
        return;
    }

    // Foreground: poll-wait with yields until the child exits.
    loop {
        match sys_wait(pid) {
            WaitStatus::Running => sys_yield(),
            WaitStatus::Exited(code) => {
                if code != 0 {
                    sys_kprint(&format!("[{}] exited with {}\n", pid, code));
                }
                return;
            }
            WaitStatus::NoSuch => return,
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_help(_shell: &mut Shell, _args: &str) -> bool {
    sys_kprint("File:    ls fl cat cd cwd md rd del cp mv note\n");
    sys_kprint("Disk:    disk <ls|N#>  format <N#> <fat16|fat32|xvfs>  vf\n");
    sys_kprint("Proc:    ps  kill [--force] <pid>  wait <pid>  <path.sys> [&]\n");
    sys_kprint("Misc:    help ver clear echo beep color uptime motd font\n");
    sys_kprint("UI:      gui explorer note pause reboot exit\n");
    true
}

fn cmd_ver(_shell: &mut Shell, _args: &str) -> bool {
    sys_kprint(VERSION);
    sys_kprint("\n");
    true
}

fn cmd_clear(_shell: &mut Shell, _args: &str) -> bool {
    sys_clear_screen();
    true
}

fn cmd_echo(_shell: &mut Shell, args: &str) -> bool {
    sys_kprint(args);
    sys_kprint("\n");
    true
}

fn cmd_ls(_shell: &mut Shell, args: &str) -> bool {
    sys_ls(if args.is_empty() { None } else { Some(args) });
    true
}

/// `fl`: the uniform `(name, is_dir)` listing, same data the explorer sees.
fn cmd_fl(_shell: &mut Shell, args: &str) -> bool {
    let mut names = [0u8; 64 * 32];
    let mut is_dir = [0u8; 64];
    let path = if args.is_empty() { None } else { Some(args) };
    let count = sys_dir_list(path, &mut names, &mut is_dir, 32);
    if count < 0 {
        sys_kprint("fl: listing failed\n");
        return false;
    }

    for i in 0..count as usize {
        let name = orion_lib::string::bytes_as_str(&names[i * 32..(i + 1) * 32]);
        if name == "." || name == ".." {
            continue;
        }
        let kind = if is_dir[i] != 0 { "<DIR>" } else { "     " };
        sys_kprint(&format!("  {} {}\n", kind, name));
    }
    true
}

fn cmd_cat(_shell: &mut Shell, args: &str) -> bool {
    if args.is_empty() {
        sys_kprint("Usage: cat <file>\n");
        return true;
    }
    sys_cat(args)
}

fn cmd_cd(_shell: &mut Shell, args: &str) -> bool {
    if args.is_empty() {
        sys_kprint("Usage: cd <path>\n");
        return true;
    }
    if !sys_chdir(args) {
        sys_kprint(&format!("cd: no such directory: {}\n", args));
    }
    true
}

fn cmd_cwd(_shell: &mut Shell, _args: &str) -> bool {
    sys_kprint(&format!("{}\n", fscmd::current_path()));
    true
}

fn cmd_md(_shell: &mut Shell, args: &str) -> bool {
    if args.is_empty() {
        sys_kprint("Usage: md <dir>\n");
        return true;
    }
    if !fscmd::mkdir(args) {
        sys_kprint(&format!("md: cannot create {}\n", args));
    }
    true
}

fn cmd_rd(_shell: &mut Shell, args: &str) -> bool {
    if args.is_empty() {
        sys_kprint("Usage: rd <dir>\n");
        return true;
    }
    if !fscmd::rmdir(args) {
        sys_kprint(&format!("rd: cannot remove {} (not empty?)\n", args));
    }
    true
}

fn cmd_del(_shell: &mut Shell, args: &str) -> bool {
    if args.is_empty() {
        sys_kprint("Usage: del <file>\n");
        return true;
    }
    if !fscmd::rm(args) {
        sys_kprint(&format!("del: cannot delete {}\n", args));
    }
    true
}

fn two_paths(args: &str) -> Option<(&str, &str)> {
    let mut parts = args.split_whitespace();
    let a = parts.next()?;
    let b = parts.next()?;
    Some((a, b))
}

fn cmd_cp(_shell: &mut Shell, args: &str) -> bool {
    let Some((src, dst)) = two_paths(args) else {
        sys_kprint("Usage: cp <src> <dst>\n");
        return true;
    };
    if !fscmd::cp(src, dst) {
        sys_kprint("cp: copy failed\n");
    }
    true
}

fn cmd_mv(_shell: &mut Shell, args: &str) -> bool {
    let Some((src, dst)) = two_paths(args) else {
        sys_kprint("Usage: mv <src> <dst>\n");
        return true;
    };
    if !fscmd::mv(src, dst) {
        sys_kprint("mv: move failed\n");
    }
    true
}

fn cmd_disk(_shell: &mut Shell, args: &str) -> bool {
    sys_disk(args)
}

fn cmd_format(_shell: &mut Shell, args: &str) -> bool {
    let Some((drive_arg, fs_name)) = two_paths(args) else {
        sys_kprint("Usage: format <drive#># <filesystem>\n");
        sys_kprint("Example: format 0# fat16\n");
        return true;
    };
    let Some(drive) = orion_boot::bootcmd::parse_drive_arg(drive_arg) else {
        sys_kprint("format: bad drive\n");
        return true;
    };
    fscmd::format(drive, fs_name)
}

fn cmd_vf(_shell: &mut Shell, _args: &str) -> bool {
    let total = fscmd::total_units();
    let free = fscmd::free_units();
    sys_kprint(&format!(
        "{} of {} allocation units free\n",
        free, total
    ));
    true
}

fn cmd_ps(_shell: &mut Shell, _args: &str) -> bool {
    let mut snap = [(0u32, [0u8; PROC_NAME_MAX], ProcState::Unused, false, false); MAX_PROCS];
    let count = orion_core::proc::proc_list(&mut snap);

    sys_kprint("  PID  STATE    NAME\n");
    for (pid, name, state, kernel, foreground) in snap[..count].iter() {
        let mark = if *foreground {
            "*"
        } else if *kernel {
            "k"
        } else {
            " "
        };
        sys_kprint(&format!(
            " {}{:>4}  {:<8} {}\n",
            mark,
            pid,
            state.as_str(),
            orion_lib::string::bytes_as_str(name)
        ));
    }
    true
}

fn cmd_kill(_shell: &mut Shell, args: &str) -> bool {
    let mut force = false;
    let mut target = args.trim();
    if let Some(rest) = target.strip_prefix("--force") {
        force = true;
        target = rest.trim();
    } else if target.starts_with('-') {
        sys_kprint("kill: unknown flag\n");
        return true;
    }

    let Some(pid) = orion_lib::string::parse_u32(target.as_bytes()) else {
        sys_kprint("Usage: kill [--force] <pid>\n");
        return true;
    };

    match orion_core::proc::proc_kill(pid, force) {
        KillResult::Ok => sys_kprint(&format!("pid {} killed\n", pid)),
        KillResult::KernelRequiresForce => {
            sys_kprint("kill: kernel process, use --force\n");
        }
        KillResult::AlreadyExited => sys_kprint("kill: already exited\n"),
        KillResult::NoSuch => sys_kprint("kill: no such pid\n"),
        KillResult::BadArg => sys_kprint("kill: bad pid\n"),
    }
    true
}

fn cmd_wait(_shell: &mut Shell, args: &str) -> bool {
    let Some(pid) = orion_lib::string::parse_u32(args.as_bytes()) else {
        sys_kprint("Usage: wait <pid>\n");
        return true;
    };
    loop {
        match sys_wait(pid) {
            WaitStatus::Running => sys_yield(),
            WaitStatus::Exited(code) => {
                sys_kprint(&format!("pid {} exited with {}\n", pid, code));
                return true;
            }
            WaitStatus::NoSuch => {
                sys_kprint("wait: no such pid\n");
                return true;
            }
        }
    }
}

fn cmd_pause(_shell: &mut Shell, _args: &str) -> bool {
    sys_pause();
    true
}

fn cmd_beep(_shell: &mut Shell, args: &str) -> bool {
    let mut parts = args.split_whitespace();
    let hz = parts
        .next()
        .and_then(|s| orion_lib::string::parse_u32(s.as_bytes()))
        .unwrap_or(880);
    let ms = parts
        .next()
        .and_then(|s| orion_lib::string::parse_u32(s.as_bytes()))
        .unwrap_or(150);
    sys_beep(hz, ms);
    true
}

fn cmd_color(_shell: &mut Shell, args: &str) -> bool {
    let Some((fg_s, bg_s)) = two_paths(args) else {
        sys_kprint("Usage: color <fg 0-15> <bg 0-15>\n");
        return true;
    };
    let (Some(fg), Some(bg)) = (
        orion_lib::string::parse_u32(fg_s.as_bytes()),
        orion_lib::string::parse_u32(bg_s.as_bytes()),
    ) else {
        sys_kprint("color: bad value\n");
        return true;
    };
    if fg > 15 || bg > 15 {
        sys_kprint("color: values are 0-15\n");
        return true;
    }
    if let Some(console) = orion_lib::services::CONSOLE.get() {
        (console.set_color)(fg as u8, bg as u8);
    }
    true
}

fn cmd_uptime(_shell: &mut Shell, _args: &str) -> bool {
    let ms = orion_lib::clock::uptime_ms();
    sys_kprint(&format!(
        "up {}.{:03} s ({} ticks at {} Hz)\n",
        ms / 1000,
        ms % 1000,
        orion_lib::clock::ticks(),
        orion_lib::clock::tick_frequency()
    ));
    true
}

fn cmd_motd(_shell: &mut Shell, args: &str) -> bool {
    let path = if args.is_empty() {
        "/system/config/motd.txt"
    } else {
        args
    };
    sys_print_motd(path)
}

fn cmd_font(_shell: &mut Shell, args: &str) -> bool {
    if args.is_empty() {
        sys_kprint("Usage: font <path>\n");
        return true;
    }
    let size = fscmd::get_file_size(args);
    if size == 0 {
        sys_kprint(&format!("font: cannot open {}\n", args));
        return true;
    }
    let mut image = alloc::vec![0u8; size as usize];
    if fscmd::read_file_by_name(args, &mut image) <= 0
        || !orion_video::font::load_from_bytes(&image)
    {
        sys_kprint("font: not a usable font file\n");
    }
    true
}

fn cmd_note(_shell: &mut Shell, args: &str) -> bool {
    if args.is_empty() {
        sys_kprint("Usage: note <file>\n");
        return true;
    }
    sys_note(args)
}

fn cmd_run(_shell: &mut Shell, args: &str) -> bool {
    // The .run interpreter is an external collaborator.
    if args.is_empty() {
        sys_kprint("Usage: run <script.run>\n");
    } else {
        sys_kprint("run: script interpreter not installed\n");
    }
    true
}

fn cmd_calc(_shell: &mut Shell, _args: &str) -> bool {
    sys_kprint("calc: calculator not installed\n");
    true
}

fn cmd_gui(_shell: &mut Shell, _args: &str) -> bool {
    run_program("/cmd/gui.sys");
    true
}

fn cmd_explorer(_shell: &mut Shell, _args: &str) -> bool {
    run_program("/cmd/explorer.sys &");
    true
}

fn cmd_reboot(_shell: &mut Shell, _args: &str) -> bool {
    sys_reboot();
    true
}

fn cmd_exit(shell: &mut Shell, _args: &str) -> bool {
    shell.running = false;
    true
}
