// src/utils/log.rs

//! Console section helpers for command output.
//!
//! All lines go through the `log` facade so the binary's logger decides
//! timestamps and filtering.

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(60);
    log::info!("{border}");
    log::info!("  {title}");
    log::info!("{border}");
}

/// Log an informational line
pub fn info(message: &str) {
    log::info!("{message}");
}

/// Log a warning
pub fn warn(message: &str) {
    log::warn!("[WARN] {message}");
}

/// Log an error
pub fn error(message: &str) {
    log::error!("[ERROR] {message}");
}

/// Log a step in a process
pub fn step(step_num: usize, total: usize, message: &str) {
    log::info!("[STEP {step_num}/{total}] {message}");
}

/// Log a completed action
pub fn success(message: &str) {
    log::info!("[OK] {message}");
}

/// Log a sub-item (indented)
pub fn sub_item(message: &str) {
    log::info!("    {message}");
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {title}");
    for line in summary_lines(items) {
        log::info!("{line}");
    }
}

fn summary_lines(items: &[(&str, String)]) -> Vec<String> {
    let width = items.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);
    items
        .iter()
        .map(|(key, value)| format!("    {key:<width$} : {value}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lines_align_keys() {
        let lines = summary_lines(&[("Rows", "3".to_string()), ("Output", "a.xlsx".to_string())]);
        assert_eq!(lines, vec!["    Rows   : 3", "    Output : a.xlsx"]);
    }
}
