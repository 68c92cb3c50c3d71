/// Pivot Report Example
///
/// This example demonstrates:
/// - Loading a dataset from JSON rows
/// - Building a two-dimensional pivot cube
/// - Adding a region subtotal
/// - Rendering a plain-text cross-tab through the Visitor protocol

use cubeframe::{count, sum, Dataset, Expression, Key, PivotCube, Record, Visitor};
use std::cell::RefCell;
use std::rc::Rc;

/// One rendered line: the row label and its cells, labelled by column.
#[derive(Default)]
struct Sheet {
    header: Vec<String>,
    label: String,
    cells: Vec<(String, String)>,
    lines: Vec<String>,
}

/// Visits the row margin and opens a line for each terminal row entry.
struct Rows {
    sheet: Rc<RefCell<Sheet>>,
    columns: Columns,
}

impl Visitor for Rows {
    fn begin(&mut self, group: &[Key], _leaves: usize, _subtotals: &[usize]) {
        let mut sheet = self.sheet.borrow_mut();
        sheet.label = group.iter().map(Key::to_string).collect::<Vec<_>>().join(" / ");
        sheet.cells.clear();
    }

    fn interior(&mut self, group: &[Key], _key: &Key, value: Option<&Record>) {
        // Only reached when the cube has no column margin.
        let label = group.iter().map(Key::to_string).collect::<Vec<_>>().join(" / ");
        self.sheet.borrow_mut().lines.push(format!("{:<20}{:>10}", label, cell(value)));
    }

    fn end(&mut self, _group: &[Key], _leaves: usize, _subtotals: &[usize]) {
        let mut sheet = self.sheet.borrow_mut();
        if sheet.cells.is_empty() {
            return;
        }
        if sheet.header.is_empty() {
            sheet.header = sheet.cells.iter().map(|(column, _)| column.clone()).collect();
        }
        let mut line = format!("{:<20}", sheet.label);
        for (_, value) in &sheet.cells {
            line.push_str(&format!("{:>10}", value));
        }
        sheet.lines.push(line);
        sheet.cells.clear();
    }

    fn follow(&mut self) -> Option<&mut dyn Visitor> {
        Some(&mut self.columns)
    }
}

/// Visits the column margin below one row entry and collects its cells.
struct Columns {
    sheet: Rc<RefCell<Sheet>>,
    row_depth: usize,
}

impl Visitor for Columns {
    fn dimension(&self) -> usize {
        1
    }

    fn interior(&mut self, group: &[Key], _key: &Key, value: Option<&Record>) {
        let column = group[self.row_depth..]
            .iter()
            .map(Key::to_string)
            .collect::<Vec<_>>()
            .join(" / ");
        self.sheet.borrow_mut().cells.push((column, cell(value)));
    }
}

fn cell(value: Option<&Record>) -> String {
    match value.and_then(|row| row.value("revenue").as_f64()) {
        Some(revenue) => format!("{:.0}", revenue),
        None => "-".to_string(),
    }
}

fn render(cube: &PivotCube) -> String {
    let sheet = Rc::new(RefCell::new(Sheet::default()));
    let mut rows = Rows {
        sheet: sheet.clone(),
        columns: Columns {
            sheet: sheet.clone(),
            row_depth: cube.dimensions()[0].len(),
        },
    };
    cube.navigate(&mut rows);

    let sheet = sheet.borrow();
    let mut out = format!("{:<20}", "");
    for column in &sheet.header {
        out.push_str(&format!("{:>10}", column));
    }
    out.push('\n');
    for line in &sheet.lines {
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn main() -> cubeframe::Result<()> {
    println!("=== CubeFrame Pivot Report Example ===\n");

    // 1. Load orders
    println!("1. Loading orders...");
    let data = Dataset::from_json(
        r#"[
            ["region", "city", "quarter", "revenue"],
            ["E", "Paris", "Q1", 10],
            ["E", "Paris", "Q2", 4],
            ["E", "Lyon", "Q1", 6],
            ["W", "Lima", "Q1", 7],
            ["W", "Lima", "Q2", 3],
            ["W", "Quito", "Q2", 8]
        ]"#,
    )?;
    println!("   {} rows over {:?}\n", data.live_count(), data.column_names().collect::<Vec<_>>());

    // 2. Build the cube: region/city down, quarter across
    println!("2. Building cube...");
    let expression = Expression::new()
        .with("revenue", sum("revenue"))
        .with("orders", count());
    let mut cube = PivotCube::new(data, expression, &[vec!["region", "city"], vec!["quarter"]])?;
    println!("   total revenue: {}\n", cube.total().value("revenue"));

    // 3. Plain cross-tab
    println!("3. Cross-tab:");
    println!("{}", render(&cube));

    // 4. A subtotal row per region, broken out by quarter
    println!("4. With region subtotals:");
    cube.subtotal(&["region", "quarter"])?;
    println!("{}", render(&cube));

    println!("=== Example Complete ===");
    Ok(())
}
