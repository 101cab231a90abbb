use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

pub static TICK_STRINGS: [&str; 9] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "✔"];

/// Spinner on stderr; indicatif hides it when stderr is not a terminal.
pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner} [{elapsed}] {msg} ({pos} records)")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&TICK_STRINGS);
    spinner.set_style(style);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}
