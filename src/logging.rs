/// Width of banners framing dumps of captured output in the logs.
pub(crate) const BANNER_WIDTH: usize = 80;

/// Renders `title` as a framed banner line, e.g. `--            output            --`.
///
/// The title is centered between a leading and a trailing `--`. Titles too long to fit are kept
/// whole, pushing the frame outwards.
pub(crate) fn banner(title: &str, width: usize) -> String {
    let title_len = title.chars().count();
    let padding = width.saturating_sub(title_len + 4) / 2;

    let mut line = String::with_capacity(width.max(title_len + 4));
    line.push_str("--");
    line.push_str(&" ".repeat(padding));
    line.push_str(title);
    let line_len = 2 + padding + title_len;
    line.push_str(&" ".repeat(width.saturating_sub(line_len + 2)));
    line.push_str("--");
    line
}

/// Logs `lines` at debug level, framed by a banner titled `title`.
pub(crate) fn debug_dump(process: &str, title: &str, lines: &[String]) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    let rule = "-".repeat(BANNER_WIDTH);
    tracing::debug!(process, "{rule}");
    tracing::debug!(process, "{}", banner(title, BANNER_WIDTH));
    tracing::debug!(process, "{rule}");
    for line in lines {
        tracing::debug!(process, "{line}");
    }
}
