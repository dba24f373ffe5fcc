//! Text table renderers in the style of database CLIs. Write-only.
//!
//! | scheme | look |
//! |---|---|
//! | `asciilite` | `a|b` rows without a header, like the sqlite shell |
//! | `asciiborderless` | psql-style header and separator |
//! | `asciibox` | boxed, like pgcli |
//! | `unicodebox` | box-drawing characters, like the ClickHouse client |
//! | `markdown`, `md` | GitHub-flavored Markdown |
//!
//! Widths are measured in characters. Embedded newlines render as a literal `\n`.

use crate::error::{AdapterError, AdapterResult};
use crate::registry::{Adapter, Capabilities, Stdio};
use crate::types::{Table, Value};
use crate::uri::Location;

use super::write_destination;

/// All text table renderers, selected by scheme.
#[derive(Debug, Default, Clone, Copy)]
pub struct AsciiAdapter;

impl Adapter for AsciiAdapter {
    fn schemes(&self) -> &'static [&'static str] {
        &["asciilite", "asciiborderless", "asciibox", "unicodebox", "markdown", "md"]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::WRITE_ONLY
    }

    fn is_text_based(&self) -> bool {
        true
    }

    fn dump(&self, table: &Table, location: &Location, stdio: &mut Stdio<'_>) -> AdapterResult<String> {
        let mut text = render(location.scheme(), table)?;
        text.push('\n');
        write_destination(location, stdio, text.as_bytes())
    }
}

/// Render `table` in the style named by `scheme`, without a trailing newline.
pub fn render(scheme: &str, table: &Table) -> AdapterResult<String> {
    let grid = Grid::new(table);
    let lines = match scheme {
        "asciilite" => grid.asciilite(),
        "asciiborderless" => grid.borderless(),
        "asciibox" => grid.boxed(),
        "unicodebox" => grid.unicode_box(),
        "markdown" | "md" => grid.markdown(),
        other => {
            return Err(AdapterError::Unsupported {
                message: format!("no text renderer named '{other}'"),
            });
        }
    };
    Ok(lines.join("\n"))
}

struct Grid<'t> {
    columns: &'t [String],
    cells: Vec<Vec<String>>,
    widths: Vec<usize>,
}

impl<'t> Grid<'t> {
    fn new(table: &'t Table) -> Self {
        let cells: Vec<Vec<String>> = table
            .rows
            .iter()
            .map(|row| row.iter().map(render_cell).collect())
            .collect();
        let widths = table
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                cells
                    .iter()
                    .map(|row| row.get(i).map_or(0, |c| char_len(c)))
                    .chain(std::iter::once(char_len(name)))
                    .max()
                    .unwrap_or(0)
            })
            .collect();
        Self {
            columns: &table.columns,
            cells,
            widths,
        }
    }

    fn header_centered(&self) -> Vec<String> {
        self.columns
            .iter()
            .zip(&self.widths)
            .map(|(name, w)| center(name, *w))
            .collect()
    }

    fn rules(&self, fill: &str) -> Vec<String> {
        self.widths.iter().map(|w| fill.repeat(*w)).collect()
    }

    fn body(&self, left: &str, sep: &str, right: &str) -> Vec<String> {
        self.cells
            .iter()
            .map(|row| {
                let padded: Vec<String> = row.iter().zip(&self.widths).map(|(c, w)| ljust(c, *w, ' ')).collect();
                format!("{left}{}{right}", padded.join(sep))
            })
            .collect()
    }

    fn asciilite(&self) -> Vec<String> {
        self.cells.iter().map(|row| row.join("|")).collect()
    }

    fn borderless(&self) -> Vec<String> {
        let mut out = vec![
            format!(" {} ", self.header_centered().join(" | ")),
            format!("-{}-", self.rules("-").join("-+-")),
        ];
        out.extend(self.body(" ", " | ", " "));
        out
    }

    fn boxed(&self) -> Vec<String> {
        let edge = format!("+-{}-+", self.rules("-").join("-+-"));
        let mut out = vec![
            edge.clone(),
            format!("| {} |", self.header_centered().join(" | ")),
            format!("|-{}-|", self.rules("-").join("-+-")),
        ];
        out.extend(self.body("| ", " | ", " |"));
        out.push(edge);
        out
    }

    fn unicode_box(&self) -> Vec<String> {
        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&self.widths)
            .map(|(name, w)| ljust(name, *w, '─'))
            .collect();
        let mut out = vec![format!("┌─{}─┐", header.join("─┬─"))];
        out.extend(self.body("│ ", " │ ", " │"));
        out.push(format!("└─{}─┘", self.rules("─").join("─┴─")));
        out
    }

    fn markdown(&self) -> Vec<String> {
        let mut out = vec![
            format!("| {} |", self.header_centered().join(" | ")),
            format!("| {} |", self.rules("-").join(" | ")),
        ];
        out.extend(self.body("| ", " | ", " |"));
        out
    }
}

fn render_cell(v: &Value) -> String {
    v.to_text().replace('\n', "\\n")
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn ljust(s: &str, width: usize, fill: char) -> String {
    let pad = width.saturating_sub(char_len(s));
    let mut out = String::with_capacity(s.len() + pad);
    out.push_str(s);
    out.extend(std::iter::repeat_n(fill, pad));
    out
}

/// Center `s` in `width` columns. With odd padding the extra space goes left only when
/// `width` is odd, which keeps headers aligned the way sqlite-era CLIs print them.
fn center(s: &str, width: usize) -> String {
    let margin = width.saturating_sub(char_len(s));
    let left = margin / 2 + (margin & width & 1);
    let right = margin - left;
    format!("{}{s}{}", " ".repeat(left), " ".repeat(right))
}
