use std::fmt::Write;
use std::time::Duration;
use sweep_library::{Action, Disposition, ReconcileEvent, RunOutcome, RunReport};

/// Prints one progress line per processed object.
pub fn on_event(event: ReconcileEvent<'_>) {
    if let ReconcileEvent::Disposed { position, total, disposition } = event {
        println!("{}", progress_line(position, total, disposition));
    }
}

fn progress_line(position: usize, total: usize, disposition: &Disposition) -> String {
    let action = match &disposition.action {
        Action::Unlinked => "unlinked".to_string(),
        Action::Archived(path) => format!("archived to {}", path.display()),
        Action::Graveyarded(path) => format!("graveyarded to {}", path.display()),
        Action::Salvaged(path) => format!("salvaged to {}", path.display()),
        Action::LeftInPlace => "left in place".to_string(),
    };
    let mut line = format!(
        "[{position}/{total}] {} ({}): {} {action} in {}",
        disposition.name,
        disposition.kind,
        disposition.outcome.as_str().to_uppercase(),
        format_duration(disposition.elapsed),
    );
    if !disposition.is_success() && !disposition.detail.is_empty() {
        let _ = write!(line, " [{}]", disposition.detail);
    }
    line
}

/// The end-of-run summary.
pub fn summary(outcome: &RunOutcome, elapsed: Duration) -> String {
    let mut out = String::new();
    match outcome {
        RunOutcome::NothingToDo(reason) => {
            let _ = writeln!(out, "Nothing to do: {}", reason.as_str());
        },
        RunOutcome::Completed(report) => render_report(&mut out, report),
    }
    let _ = write!(out, "Total runtime: {}", format_duration(elapsed));
    out
}

fn render_report(out: &mut String, report: &RunReport) {
    let processed = report.dispositions.len();
    let _ = writeln!(
        out,
        "Processed {processed} of {} objects, {} failed",
        report.candidates,
        report.failures.len()
    );
    if report.interrupted {
        let _ = writeln!(out, "Interrupted: {} objects left untouched", report.candidates.saturating_sub(processed));
    }
    if !report.failures.is_empty() {
        let _ = writeln!(out, "Failed to archive these objects:");
        for failure in &report.failures {
            let _ = writeln!(out, "    {:>10}: {}", capitalize(failure.kind_label()), failure.name);
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map(|first| first.to_uppercase().chain(chars).collect()).unwrap_or_default()
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}
