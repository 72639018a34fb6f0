// UI layer: the output sink handed to every command, plus the interactive
// prompts used by `share setup`. Colors are only emitted when writing to a
// terminal, so captured output stays plain.

use anyhow::Result;
use crossterm::style::Stylize;
use dialoguer::{Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Display;
use std::io::{self, IsTerminal, Write};
use std::time::Duration;

const BYTES_PER_MB: f64 = 1_048_576.0;
const BYTES_PER_GB: f64 = 1_073_741_824.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Bold,
    Dim,
    Green,
    Yellow,
    Red,
    Cyan,
    Blue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

pub struct Column {
    pub header: &'static str,
    pub tone: Tone,
    pub align: Align,
}

impl Column {
    pub fn new(header: &'static str, tone: Tone) -> Self {
        Column {
            header,
            tone,
            align: Align::Left,
        }
    }

    pub fn right(mut self) -> Self {
        self.align = Align::Right;
        self
    }
}

/// A titled table of plain-text cells. Styling happens at render time.
pub struct Table {
    pub title: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(title: &str, columns: Vec<Column>) -> Self {
        Table {
            title: title.to_string(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.chars().count())
                    .chain(std::iter::once(col.header.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }
}

fn pad(text: &str, width: usize, align: Align) -> String {
    match align {
        Align::Left => format!("{text:<width$}"),
        Align::Right => format!("{text:>width$}"),
    }
}

/// Output sink for command results.
pub struct Console<W: Write> {
    out: W,
    color: bool,
}

impl Console<io::Stdout> {
    /// Console on stdout, colored when stdout is a terminal.
    pub fn stdout() -> Self {
        let out = io::stdout();
        let color = out.is_terminal();
        Console { out, color }
    }
}

impl<W: Write> Console<W> {
    pub fn new(out: W, color: bool) -> Self {
        Console { out, color }
    }

    /// Uncolored console, e.g. over a `Vec<u8>` in tests.
    pub fn plain(out: W) -> Self {
        Self::new(out, false)
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn paint(&self, text: &str, tone: Tone) -> String {
        if !self.color {
            return text.to_string();
        }
        match tone {
            Tone::Plain => text.to_string(),
            Tone::Bold => text.bold().to_string(),
            Tone::Dim => text.dim().to_string(),
            Tone::Green => text.green().to_string(),
            Tone::Yellow => text.yellow().to_string(),
            Tone::Red => text.red().to_string(),
            Tone::Cyan => text.cyan().to_string(),
            Tone::Blue => text.blue().to_string(),
        }
    }

    pub fn line(&mut self, text: impl Display) -> io::Result<()> {
        writeln!(self.out, "{text}")
    }

    pub fn blank(&mut self) -> io::Result<()> {
        writeln!(self.out)
    }

    pub fn styled(&mut self, text: &str, tone: Tone) -> io::Result<()> {
        let painted = self.paint(text, tone);
        writeln!(self.out, "{painted}")
    }

    pub fn success(&mut self, text: &str) -> io::Result<()> {
        self.styled(text, Tone::Green)
    }

    pub fn warn(&mut self, text: &str) -> io::Result<()> {
        self.styled(text, Tone::Yellow)
    }

    pub fn dim(&mut self, text: &str) -> io::Result<()> {
        self.styled(text, Tone::Dim)
    }

    /// Spinner shown while a blocking call runs. Hidden for non-terminal sinks.
    pub fn spinner(&self, message: String) -> ProgressBar {
        if !self.color {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(message);
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }

    /// Render `table` with padded columns. Widths are measured before painting.
    pub fn table(&mut self, table: &Table) -> io::Result<()> {
        let widths = table.widths();
        let gap = "  ";
        let total: usize = widths.iter().sum::<usize>() + gap.len() * widths.len().saturating_sub(1);

        let title = format!("{:^total$}", table.title);
        let title = self.paint(title.trim_end(), Tone::Bold);
        writeln!(self.out, "{title}")?;

        let header = table
            .columns
            .iter()
            .zip(&widths)
            .map(|(col, &w)| self.paint(&pad(col.header, w, col.align), Tone::Bold))
            .collect::<Vec<_>>()
            .join(gap);
        writeln!(self.out, "{}", header.trim_end())?;
        writeln!(self.out, "{}", "-".repeat(total))?;

        for row in &table.rows {
            let line = table
                .columns
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(i, (col, &w))| {
                    let cell = row.get(i).map(String::as_str).unwrap_or("");
                    self.paint(&pad(cell, w, col.align), col.tone)
                })
                .collect::<Vec<_>>()
                .join(gap);
            writeln!(self.out, "{}", line.trim_end())?;
        }
        Ok(())
    }
}

/// Print an error chain to stderr, red when stderr is a terminal.
pub fn report_error(err: &anyhow::Error) {
    let text = format!("Error: {err:#}");
    if io::stderr().is_terminal() {
        eprintln!("{}", text.red());
    } else {
        eprintln!("{text}");
    }
}

/// `12.3 MB` below 1024 MB, `1.2 GB` from there on.
pub fn format_size(bytes: u64) -> String {
    let mb = bytes as f64 / BYTES_PER_MB;
    if mb < 1024.0 {
        format!("{mb:.1} MB")
    } else {
        format!("{:.1} GB", mb / 1024.0)
    }
}

pub fn format_gb(bytes: u64) -> String {
    format!("{:.2} GB", bytes as f64 / BYTES_PER_GB)
}

/// Source of answers for the setup wizard.
pub trait Prompter {
    fn ask(&self, prompt: &str, default: Option<&str>) -> Result<String>;
    /// Like `ask`, without echoing the input.
    fn ask_secret(&self, prompt: &str) -> Result<String>;
}

/// Prompts on the terminal with `dialoguer`.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn ask(&self, prompt: &str, default: Option<&str>) -> Result<String> {
        let mut input = Input::<String>::new();
        input.with_prompt(prompt);
        if let Some(d) = default {
            input.default(d.to_string());
        }
        let answer = input.interact_text()?;
        Ok(answer.trim().to_string())
    }

    fn ask_secret(&self, prompt: &str) -> Result<String> {
        let answer = Password::new().with_prompt(prompt).interact()?;
        Ok(answer.trim().to_string())
    }
}
