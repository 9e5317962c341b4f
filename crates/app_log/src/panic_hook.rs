//! Panic hook for crash reporting

use backtrace::Backtrace;
use chrono::Local;
use std::panic::PanicHookInfo;

/// Initialize the panic hook for crash reporting
pub fn init_panic_hook() {
    std::panic::set_hook(Box::new(panic_handler));
    tracing::debug!("Panic hook initialized");
}

/// Render a crash report for a panic payload
pub fn crash_report(thread_name: &str, location: &str, payload: &str, backtrace: &str) -> String {
    format!(
        "=== CRITICAL PANIC ===\n\
         Timestamp: {}\n\
         Thread: {}\n\
         Location: {}\n\
         Payload: {}\n\n\
         Stack Trace:\n{}",
        Local::now().to_rfc3339(),
        thread_name,
        location,
        payload,
        backtrace
    )
}

fn panic_handler(info: &PanicHookInfo) {
    let backtrace = Backtrace::new();
    let thread = std::thread::current();
    let thread_name = thread.name().unwrap_or("<unnamed>");

    let payload = info
        .payload()
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| info.payload().downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "<unknown>".to_string());
    let location = info
        .location()
        .map(|l| format!("{}:{}", l.file(), l.line()))
        .unwrap_or_else(|| "<unknown>".to_string());

    let report = crash_report(thread_name, &location, &payload, &format!("{:?}", backtrace));

    eprintln!("{}", report);

    // May be lost if the writer thread is already gone
    tracing::error!("{}", report);

    let dump_filename = format!(
        "tagfiler_crash_{}.txt",
        Local::now().format("%Y%m%d_%H%M%S")
    );
    let dump_path = std::env::temp_dir().join(&dump_filename);

    if let Err(e) = std::fs::write(&dump_path, &report) {
        eprintln!("Failed to write crash dump: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crash_report_contains_fields() {
        let report = crash_report("scan-worker", "src/scanner.rs:10", "boom", "frame0");
        assert!(report.starts_with("=== CRITICAL PANIC ==="));
        assert!(report.contains("Thread: scan-worker"));
        assert!(report.contains("Location: src/scanner.rs:10"));
        assert!(report.contains("Payload: boom"));
        assert!(report.contains("frame0"));
    }
}
