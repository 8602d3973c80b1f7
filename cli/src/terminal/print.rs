use std::fmt::Display;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::terminal::colors;
use crate::terminal::logging::PRINT_TARGET;
use chrono::Local;
use colored::*;
use console::Term;
use tracing::info;
use unicode_width::UnicodeWidthStr;

pub const TOTAL_WIDTH: usize = 64;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static KEY_WIDTH: AtomicUsize = AtomicUsize::new(0);

/// Line width: [`TOTAL_WIDTH`], narrowed to the terminal when it is smaller.
fn line_width() -> usize {
    Term::stdout()
        .size_checked()
        .map(|(_, cols)| usize::from(cols).min(TOTAL_WIDTH))
        .unwrap_or(TOTAL_WIDTH)
}

pub fn print(msg: &str) {
    info!(target: PRINT_TARGET, raw_msg = msg);
}

pub fn banner() {
    let text_content: String = format!("⟦ VOLLEY v{} ⟧ ", env!("CARGO_PKG_VERSION"));
    let text_width: usize = UnicodeWidthStr::width(text_content.as_str());
    let text: ColoredString = text_content.bright_green().bold();
    let sep: ColoredString = "═".repeat(line_width().saturating_sub(text_width) / 2).bright_black();
    print(&format!("{}{}{}", sep, text, sep));
}

pub fn header(msg: &str) {
    let formatted: String = format!("⟦ {} ⟧", msg);
    let msg_len: usize = UnicodeWidthStr::width(formatted.as_str());

    let dash_count: usize = line_width().saturating_sub(msg_len);
    let left: usize = dash_count / 2;
    let right: usize = dash_count - left;

    let line: ColoredString = format!(
        "{}{}{}",
        "─".repeat(left),
        formatted.to_uppercase().bright_green(),
        "─".repeat(right)
    )
    .bright_black();

    print(&format!("{}", line));
}

pub fn timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// `2024-01-01 12:00:00 - Key: value`
pub fn timestamped<V: Display>(key: &str, value: V) {
    print(&format!(
        "{} {} {}{} {}",
        timestamp().color(colors::SEPARATOR),
        "-".color(colors::SEPARATOR),
        key.color(colors::PRIMARY),
        ":".color(colors::SEPARATOR),
        value
    ));
}

/// Pads keys of following [`aligned_line`] calls to the widest of `keys`.
pub fn set_key_width<'a>(keys: impl IntoIterator<Item = &'a str>) {
    let width: usize = keys.into_iter().map(UnicodeWidthStr::width).max().unwrap_or(0);
    KEY_WIDTH.store(width, Ordering::Relaxed);
}

pub fn aligned_line(key: &str, value: ColoredString) {
    let key_width: usize = UnicodeWidthStr::width(key);
    let dots: String = ".".repeat((KEY_WIDTH.load(Ordering::Relaxed) + 1).saturating_sub(key_width));
    let colon: String = format!("{}{}", dots.color(colors::SEPARATOR), ":".color(colors::SEPARATOR));
    print_status(format!("{}{} {}", key.color(colors::PRIMARY), colon, value));
}

pub fn print_status<T: AsRef<str>>(msg: T) {
    let prefix: ColoredString = ">".color(colors::SEPARATOR);
    let message: String = format!("{} {}", prefix, msg.as_ref().color(colors::TEXT_DEFAULT));
    print(&message);
}

pub fn tree_head(idx: usize, name: ColoredString) {
    let idx_str: String = format!("[{}]", idx.to_string().color(colors::ACCENT));
    print(&format!("{} {}", idx_str.color(colors::SEPARATOR), name));
}

pub fn as_tree_one_level(key_value_pair: Vec<(&str, ColoredString)>) {
    let key_width: usize = key_value_pair
        .iter()
        .map(|(key, _)| UnicodeWidthStr::width(*key))
        .max()
        .unwrap_or(0);

    for (i, (key, value)) in key_value_pair.iter().enumerate() {
        let last: bool = i + 1 == key_value_pair.len();
        let branch: ColoredString = if !last { "├─".bright_black() } else { "└─".bright_black() };
        let dots: String = ".".repeat(key_width + 1 - UnicodeWidthStr::width(*key));
        let output: String = format!(
            " {} {}{}{} {}",
            branch,
            key.color(colors::TEXT_DEFAULT),
            dots.color(colors::SEPARATOR),
            ":".color(colors::SEPARATOR),
            value
        );
        print(&output);
    }
}

/// Two-column table, first column padded to its widest cell.
pub fn two_column_table(left_title: &str, right_title: &str, rows: &[(&str, &str)]) {
    let width: usize = rows
        .iter()
        .map(|(left, _)| UnicodeWidthStr::width(*left))
        .chain(std::iter::once(UnicodeWidthStr::width(left_title)))
        .max()
        .unwrap_or(0);
    let pad = |cell: &str| " ".repeat(width - UnicodeWidthStr::width(cell));

    print(&format!(
        "{}{}  {}",
        left_title.color(colors::HEADING).bold(),
        pad(left_title),
        right_title.color(colors::HEADING).bold()
    ));
    print(&format!("{}", "─".repeat(line_width()).color(colors::SEPARATOR)));
    for (left, right) in rows {
        print(&format!("{}{}  {}", left.color(colors::PRIMARY), pad(left), right));
    }
}

const NO_RESULTS_0: &str = r#"
                       _  _    ___  _  _
                      | || |  / _ \| || |
                      | || |_| | | | || |_
                      |__   _| |_| |__   _|
         _   _  ___ _____|_|__\___/__ |_|  _ _   _ ____
        | \ | |/ _ \_   _| |  ___/ _ \| | | | \ | |  _ \
        |  \| | | | || |   | |_ | | | | | | |  \| | | | |
        | |\  | |_| || |   |  _|| |_| | |_| | |\  | |_| |
        |_| \_|\___/ |_|   |_|   \___/ \___/|_| \_|____/
"#;

pub fn no_results() {
    print(&format!("{}", NO_RESULTS_0.red().bold()));
}

pub fn end_of_program() {
    print(&format!("{}", "═".repeat(line_width()).color(colors::SEPARATOR)));
}
