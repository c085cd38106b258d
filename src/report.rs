// src/report.rs

//! Error-reporting boundary.
//!
//! The runtime calls into here whenever a task transitions to Failed; no
//! transform or pipeline formats its own notification. The notification is
//! a console block with a title, subtitle and the underlying message,
//! alongside the structured log record.

use tracing::{error, warn};

const TITLE: &str = "sitegear";

/// Surface a task failure to the developer.
///
/// Soft failures (lint) are reported at warn level and never stop the
/// watch/serve loop; hard failures are errors.
pub fn task_failed(task: &str, soft: bool, message: &str) {
    if soft {
        warn!(task = %task, "task failed (non-fatal): {message}");
    } else {
        error!(task = %task, "task failed: {message}");
    }
    notify(TITLE, &format!("{task} failed"), message);
}

/// Console notification: title, short subtitle, underlying message.
fn notify(title: &str, subtitle: &str, message: &str) {
    eprintln!("\n  {title} — {subtitle}\n  {message}\n");
}
