//! Output formatting for the command-line tool
//!
//! Text output uses `comfy-table` tables and colored status lines. Colors are
//! turned off by `--no-color` or when `NO_COLOR` is set; `--ascii` swaps the
//! Unicode table borders for plain ASCII. JSON output goes through `serde_json`.

use crate::keymap::Keymap;
use clap::ValueEnum;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table, presets};
use owo_colors::OwoColorize;
use serde::Serialize;
use spider_cache_protocol::ServerEndpoint;

/// Output format for command results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Text,
    /// JSON output
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

impl OutputFormat {
    /// Serialize `value` for a JSON format, `None` for text
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be serialized
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> serde_json::Result<Option<String>> {
        match self {
            Self::Text => Ok(None),
            Self::Json => serde_json::to_string(value).map(Some),
            Self::JsonPretty => serde_json::to_string_pretty(value).map(Some),
        }
    }
}

/// How text output is decorated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputStyle {
    /// Emit ANSI colors
    pub use_color: bool,
    /// Draw tables with Unicode box characters
    pub use_unicode: bool,
}

impl OutputStyle {
    /// Style for the `--no-color` and `--ascii` switches.
    ///
    /// Color is also off whenever `NO_COLOR` is set.
    #[must_use]
    pub fn new(no_color: bool, ascii: bool) -> Self {
        Self {
            use_color: !no_color && std::env::var_os("NO_COLOR").is_none(),
            use_unicode: !ascii,
        }
    }
}

/// What a line of text output reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Section title, such as a server name
    Header,
    /// Completed operation
    Success,
    /// Nothing to show or nothing done
    Warning,
    /// Failed operation
    Error,
    /// Secondary detail
    Muted,
}

/// Color `text` for `tone`, or return it unchanged without color
#[must_use]
pub fn paint(text: &str, tone: Tone, style: &OutputStyle) -> String {
    if !style.use_color {
        return text.to_string();
    }
    match tone {
        Tone::Header => text.bold().bright_blue().to_string(),
        Tone::Success => text.green().to_string(),
        Tone::Warning => text.yellow().to_string(),
        Tone::Error => text.red().to_string(),
        Tone::Muted => text.dimmed().to_string(),
    }
}

/// `(1 key)`, `(3 keys)`
#[must_use]
pub fn count_badge(count: usize, noun: &str, style: &OutputStyle) -> String {
    let plural = if count == 1 { "" } else { "s" };
    paint(&format!("({count} {noun}{plural})"), Tone::Muted, style)
}

fn table(style: &OutputStyle, headers: &[&str]) -> Table {
    let mut table = Table::new();
    if style.use_unicode {
        table
            .load_preset(presets::UTF8_FULL)
            .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    } else {
        table.load_preset(presets::ASCII_FULL);
    }
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);

    table.set_header(headers.iter().map(|text| {
        let cell = Cell::new(text).add_attribute(Attribute::Bold);
        if style.use_color { cell.fg(Color::Cyan) } else { cell }
    }));
    table
}

/// Table of the groups in a keymap
#[must_use]
pub fn keymap_table(keymap: &Keymap, style: &OutputStyle) -> Table {
    let mut table = table(style, &["Site", "Group", "Keys", "Sample"]);

    for entry in keymap {
        let sample = Cell::new(&entry.representative_raw);
        table.add_row(vec![
            Cell::new(entry.site_scope),
            Cell::new(&entry.group),
            Cell::new(entry.keys.len()).set_alignment(CellAlignment::Right),
            if style.use_color { sample.fg(Color::Grey) } else { sample },
        ]);
    }

    table
}

/// Table of configured servers
#[must_use]
pub fn servers_table(servers: &[ServerEndpoint], style: &OutputStyle) -> Table {
    let mut table = table(style, &["Host", "Port"]);

    for server in servers {
        table.add_row(vec![
            Cell::new(&server.host),
            Cell::new(server.port).set_alignment(CellAlignment::Right),
        ]);
    }

    table
}
