//! Plain-text tables for `--format table`.
//!
//! Widths are measured in chars so author names with diacritics line up.

#[derive(Clone, Copy, Debug)]
pub struct TableOptions {
    pub max_width: Option<usize>,
    pub color: bool,
}

/// Narrowest a column is squeezed to when fitting the terminal.
const MIN_COLUMN: usize = 6;
const GAP: &str = "  ";

#[derive(Clone, Copy)]
enum Tone {
    Good,
    Pending,
    Bad,
}

impl Tone {
    fn of(cell: &str) -> Option<Self> {
        match cell {
            "true" | "completed" | "valid" | "allow" => Some(Self::Good),
            "started" | "reused" | "skipped" | "unverified" => Some(Self::Pending),
            "false" | "failed" | "deny" | "worker_failed" | "timed_out" | "missing_artifact"
            | "invalid_artifact" => Some(Self::Bad),
            _ => None,
        }
    }

    const fn ansi(self) -> &'static str {
        match self {
            Self::Good => "32",
            Self::Pending => "33",
            Self::Bad => "31",
        }
    }
}

/// Render an aligned table for string rows, right-aligning numeric cells.
#[must_use]
pub fn render_entity_table(
    headers: &[&str],
    rows: &[Vec<String>],
    options: TableOptions,
) -> String {
    let mut widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(index, header)| {
            rows.iter()
                .filter_map(|row| row.get(index))
                .map(|cell| cell.chars().count())
                .chain([header.chars().count(), MIN_COLUMN])
                .max()
                .unwrap_or(MIN_COLUMN)
        })
        .collect();

    if let Some(max_width) = options.max_width {
        shrink_to_fit(&mut widths, headers, max_width);
    }

    let header_line = headers
        .iter()
        .zip(&widths)
        .map(|(header, width)| pad(&truncate(header, *width), *width, false))
        .collect::<Vec<_>>()
        .join(GAP);
    let divider = "-".repeat(header_line.chars().count());

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(header_line.trim_end().to_string());
    lines.push(divider.trim_end().to_string());
    for row in rows {
        let line = widths
            .iter()
            .enumerate()
            .map(|(index, width)| {
                let cell = truncate(row.get(index).map_or("-", String::as_str), *width);
                let padded = pad(&cell, *width, is_numeric(&cell));
                match Tone::of(&cell).filter(|_| options.color) {
                    Some(tone) => {
                        let painted = format!("\u{1b}[{}m{cell}\u{1b}[0m", tone.ansi());
                        padded.replacen(&cell, &painted, 1)
                    }
                    None => padded,
                }
            })
            .collect::<Vec<_>>()
            .join(GAP);
        lines.push(line.trim_end().to_string());
    }
    lines.join("\n")
}

/// Take one char at a time from the widest column that can still give one.
fn shrink_to_fit(widths: &mut [usize], headers: &[&str], max_width: usize) {
    let gaps = widths.len().saturating_sub(1) * GAP.len();
    while widths.iter().sum::<usize>() + gaps > max_width {
        let widest = widths
            .iter()
            .enumerate()
            .filter(|(index, width)| {
                let floor = headers[*index].chars().count().max(MIN_COLUMN);
                **width > floor
            })
            .max_by_key(|(_, width)| **width)
            .map(|(index, _)| index);
        let Some(index) = widest else {
            break;
        };
        widths[index] -= 1;
    }
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut out: String = value.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn pad(value: &str, width: usize, right_align: bool) -> String {
    let fill = " ".repeat(width.saturating_sub(value.chars().count()));
    if right_align {
        format!("{fill}{value}")
    } else {
        format!("{value}{fill}")
    }
}

fn is_numeric(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|ch| ch.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::{TableOptions, render_entity_table};

    const PLAIN: TableOptions = TableOptions {
        max_width: None,
        color: false,
    };

    #[test]
    fn numbers_are_right_aligned() {
        let table = render_entity_table(
            &["phase", "attempts"],
            &[
                vec!["plan".to_string(), "1".to_string()],
                vec!["research".to_string(), "12".to_string()],
            ],
            PLAIN,
        );
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[2].ends_with("       1"), "{table}");
        assert!(lines[3].ends_with("      12"), "{table}");
    }

    #[test]
    fn wide_columns_are_truncated_to_fit() {
        let long = "intermediate_files/literature-domain-12.bib".to_string();
        let table = render_entity_table(
            &["unit", "artifact"],
            &[vec!["12".to_string(), long]],
            TableOptions {
                max_width: Some(30),
                color: false,
            },
        );
        assert!(table.lines().all(|line| line.chars().count() <= 30), "{table}");
        assert!(table.contains('…'));
    }

    #[test]
    fn diacritics_do_not_break_alignment() {
        let table = render_entity_table(
            &["author", "year"],
            &[
                vec!["Müller".to_string(), "2020".to_string()],
                vec!["Smith".to_string(), "2019".to_string()],
            ],
            PLAIN,
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[2].chars().count(), lines[3].chars().count());
    }

    #[test]
    fn statuses_are_colored_only_when_enabled() {
        let rows = [vec!["failed".to_string()]];
        let colored = render_entity_table(
            &["status"],
            &rows,
            TableOptions {
                max_width: None,
                color: true,
            },
        );
        assert!(colored.contains("\u{1b}[31mfailed\u{1b}[0m"));
        assert!(!render_entity_table(&["status"], &rows, PLAIN).contains('\u{1b}'));
    }
}
