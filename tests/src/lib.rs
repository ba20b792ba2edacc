//! Boot-time test runner.
//!
//! Suites self-register into the `.test_registry` link section via
//! `define_test_suite!`; the linker script brackets the section with
//! start/end symbols this walker iterates. Runs once during boot when the
//! `builtin-tests` feature is on, before any user process starts.

#![no_std]

use orion_lib::testing::{HARNESS_MAX_SUITES, TestRunSummary, TestSuiteDesc, TestSuiteResult};
use orion_lib::{klog_info, string::bytes_as_str};

unsafe extern "C" {
    static __test_registry_start: TestSuiteDesc;
    static __test_registry_end: TestSuiteDesc;
}

fn registered_suites() -> &'static [TestSuiteDesc] {
    // SAFETY: the linker script places every TestSuiteDesc contiguously
    // between these two symbols.
    unsafe {
        let start = &raw const __test_registry_start;
        let end = &raw const __test_registry_end;
        let count = end.offset_from(start).max(0) as usize;
        core::slice::from_raw_parts(start, count.min(HARNESS_MAX_SUITES))
    }
}

fn suite_name(desc: &TestSuiteDesc) -> &str {
    if desc.name.is_null() {
        return "<unnamed>";
    }
    // SAFETY: suite names come from NUL-terminated static byte literals.
    unsafe {
        let mut len = 0usize;
        while *desc.name.add(len) != 0 && len < 64 {
            len += 1;
        }
        bytes_as_str(core::slice::from_raw_parts(desc.name as *const u8, len))
    }
}

/// Run every registered suite and log the summary. Returns true when
/// everything passed.
pub fn run_all() -> bool {
    let suites = registered_suites();
    klog_info!("TESTS: running {} suite(s)", suites.len());

    let mut summary = TestRunSummary::default();
    for desc in suites {
        let Some(run) = desc.run else {
            continue;
        };
        let mut result = TestSuiteResult::default();
        let rc = run(&mut result);
        klog_info!(
            "TESTS: suite {} -> {}/{} passed ({} ms){}",
            suite_name(desc),
            result.passed,
            result.total,
            result.elapsed_ms,
            if rc == 0 { "" } else { " FAILED" }
        );
        if summary.suite_count < HARNESS_MAX_SUITES {
            summary.suites[summary.suite_count] = result;
            summary.suite_count += 1;
        }
        summary.add_suite_result(&result);
    }

    klog_info!(
        "TESTS: total {}/{} passed in {} ms",
        summary.passed,
        summary.total_tests,
        summary.elapsed_ms
    );
    summary.all_passed()
}
