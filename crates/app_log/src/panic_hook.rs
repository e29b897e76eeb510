//! Panic hook for crash reporting

use backtrace::Backtrace;
use chrono::Local;
use std::panic::PanicHookInfo;

/// Initialize the panic hook for crash reporting
pub fn init_panic_hook() {
    std::panic::set_hook(Box::new(panic_handler));
    tracing::debug!("Panic hook initialized");
}

fn payload_message(info: &PanicHookInfo) -> String {
    if let Some(s) = info.payload().downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "<unknown>".to_string()
    }
}

fn panic_handler(info: &PanicHookInfo) {
    let backtrace = Backtrace::new();
    let thread = std::thread::current();
    let thread_name = thread.name().unwrap_or("<unnamed>");

    let report = format!(
        "=== drivesh crashed ===\n\
         Timestamp: {}\n\
         Version: {}\n\
         Thread: {}\n\
         Location: {:?}\n\
         Payload: {}\n\n\
         Stack Trace:\n{:?}",
        Local::now().to_rfc3339(),
        env!("CARGO_PKG_VERSION"),
        thread_name,
        info.location(),
        payload_message(info),
        backtrace
    );

    tracing::error!("{}", report);

    let dump_dir = super::log_dir();
    let dump_path = dump_dir.join(format!(
        "drivesh_crash_{}.txt",
        Local::now().format("%Y%m%d_%H%M%S")
    ));

    let written = std::fs::create_dir_all(&dump_dir).and_then(|_| std::fs::write(&dump_path, &report));
    match written {
        Ok(()) => eprintln!(
            "drivesh hit an internal error: {}\nA crash report was written to {}",
            payload_message(info),
            dump_path.display()
        ),
        Err(e) => eprintln!("{}\n(failed to write crash dump: {})", report, e),
    }
}
