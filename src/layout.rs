//! Wrapping long console lines to the terminal width.
use once_cell::sync::Lazy;
use std::borrow::Cow;
use terminal_size::{terminal_size, Height, Width};
use textwrap::wrap;

struct Constants<'a> {
    line_width: usize,
    wrap_options: textwrap::Options<'a>,
}
static C: Lazy<Constants> = Lazy::new(|| {
    fn from_env() -> Option<usize> {
        std::env::var_os("COLUMNS")?.to_str()?.parse::<usize>().ok()
    }
    let line_width = if let Some((Width(width), Height(_))) = terminal_size() {
        usize::from(width)
    } else {
        from_env().unwrap_or(100)
    };
    let wrap_options = textwrap::Options::new(line_width);

    Constants { line_width, wrap_options }
});

const BLANKS: &str = "                                ";

/// The width console output is wrapped to
#[must_use]
pub fn line_width() -> usize {
    C.line_width
}

/// Wraps `text` so that the first line starts with `label` and the
/// following lines are indented to line up under the text.
#[must_use]
pub fn labelled<'a>(label: &'a str, text: &'a str) -> Vec<Cow<'a, str>> {
    labelled_to(C.line_width, label, text)
}

fn labelled_to<'a>(width: usize, label: &'a str, text: &'a str) -> Vec<Cow<'a, str>> {
    let rest = &BLANKS[..label.chars().count().min(BLANKS.len())];
    let options = C.wrap_options.clone().width(width).initial_indent(label).subsequent_indent(rest);
    wrap(text, options)
}

#[allow(clippy::pedantic)]
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn short_text_stays_on_one_line() {
        assert_eq!(labelled_to(80, "A = ", "{1, 2, 3}"), vec!["A = {1, 2, 3}"]);
    }

    #[test]
    fn continuation_lines_line_up_under_the_text() {
        let lines = labelled_to(15, "Set: ", "{1, 2, 3, 4, 5, 6, 7}");
        assert_eq!(lines, vec!["Set: {1, 2,", "     3, 4, 5,", "     6, 7}"]);
    }

    #[test]
    fn width_is_positive() {
        assert!(line_width() > 0);
    }
}
