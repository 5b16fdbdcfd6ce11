use tabula::{CellValue, RunMetrics, Table};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
    pub const YELLOW: &str = "\x1b[33m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

pub fn print_run(table: &Table, metrics: &RunMetrics, color: bool) {
    let palette = ansi::Palette::new(color);

    println!("\n{}", palette.paint("━━━ Records ━━━", ansi::GRAY));
    if table.is_empty() {
        println!("{}", palette.dim("  No records extracted"));
        if metrics.skipped_lines == metrics.lines && metrics.lines > 0 {
            println!("\n{}", palette.paint("No input line matched any rule.", ansi::YELLOW));
            println!("{}", palette.dim("  Tip: set RUST_LOG=tabula=trace to watch rule selection"));
        }
    } else {
        print_table(table, &palette);
    }

    println!("\n{}", palette.paint("━━━ Run ━━━", ansi::GRAY));
    println!(
        "  {} lines ({} matched, {} skipped), {} records ({} filtered) in {:?}",
        metrics.lines,
        metrics.matched_lines,
        metrics.skipped_lines,
        metrics.records,
        metrics.records_filtered,
        metrics.total,
    );
}

fn render_cell(cell: &CellValue) -> String {
    match cell {
        CellValue::Scalar(s) => s.clone(),
        CellValue::List(items) => items.join(","),
    }
}

fn print_table(table: &Table, palette: &ansi::Palette) {
    let header = table.header();
    let mut widths: Vec<usize> = header.iter().map(String::len).collect();
    let rendered: Vec<Vec<String>> = table
        .rows()
        .iter()
        .map(|row| row.iter().map(render_cell).collect())
        .collect();
    for row in &rendered {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let header_line = header
        .iter()
        .zip(widths.iter().copied())
        .map(|(name, width)| format!("{name:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    println!("  {}", palette.bold(palette.paint(header_line, ansi::CYAN)));

    let separator =
        widths.iter().map(|w| "─".repeat(*w)).collect::<Vec<_>>().join("──");
    println!("  {}", palette.dim(separator));

    for row in &rendered {
        let line = row
            .iter()
            .zip(widths.iter().copied())
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        println!("  {line}");
    }
}
