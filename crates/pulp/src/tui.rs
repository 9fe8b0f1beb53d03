use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Per-ticker download bar; hidden whenever tracing owns the terminal.
pub(crate) fn download_bar(len: usize, tui: bool) -> anyhow::Result<ProgressBar> {
    if !tui {
        return Ok(ProgressBar::hidden());
    }

    let bar = ProgressBar::new(len as u64).with_style(
        ProgressStyle::default_bar()
            .template(
                "  {msg} {spinner:.magenta}\n  \
                [{elapsed_precise:.magenta}] |{bar:40.cyan/blue}| {pos:<2} / {human_len} \
                [Rate: {per_sec}, ETA: {eta:.blue}]",
            )?
            .progress_chars("##-"),
    );
    bar.enable_steady_tick(Duration::from_millis(100));

    Ok(bar)
}
