/// CubeFrame - In-Memory Datasets and Pivot Cubes
///
/// Columnar datasets with stable row positions, hierarchical grouping and
/// ordered indices, left-fold group-by aggregation, and multi-dimensional pivot
/// cubes with margins, subtotals and page totals. Rendering is left to callers,
/// which consume a cube through the `Visitor` protocol.

pub mod value;
pub mod record;
pub mod column;
pub mod node;
pub mod index;
pub mod dataset;
pub mod aggregate;
pub mod pivot;
pub mod traverse;
pub mod config;
pub mod error;

pub use value::{Key, Value};
pub use record::Record;
pub use column::Column;
pub use node::{Branch, IndexNode, RowId, RowIds, SubtotalEntry};
pub use index::{GroupingIndex, Index, OrderedIndex};
pub use dataset::{Dataset, PRIMARY};
pub use aggregate::{aggregate, count, first, last, max, min, reduce, sum, Expression, Reducer};
pub use pivot::{PivotCube, PIVOT_ORDER, SUBTOTAL_ORDER};
pub use traverse::{breadth, sorted, walk, Crossing, EchoVisitor, Visitor};
pub use config::{Measure, PivotConfig};
pub use error::{Error, Result};

#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn orders() -> Dataset {
        Dataset::from_json(
            r#"[
                ["region", "city", "quarter", "channel", "revenue"],
                ["E", "Paris", "Q1", "web", 10],
                ["E", "Paris", "Q2", "shop", 4],
                ["E", "Lyon", "Q1", "web", 6],
                ["W", "Lima", "Q1", "shop", 7],
                ["W", "Lima", "Q2", "web", 3],
                ["W", "Quito", "Q2", "web", 8]
            ]"#,
        )
        .unwrap()
    }

    /// Collects cells across a follow chain into shared storage.
    struct Grid {
        dimension: usize,
        cells: Rc<RefCell<Vec<(Vec<String>, Option<f64>)>>>,
        follow: Option<Box<Grid>>,
    }

    impl Grid {
        fn chain(dimensions: usize, cells: &Rc<RefCell<Vec<(Vec<String>, Option<f64>)>>>) -> Grid {
            let mut grid: Option<Box<Grid>> = None;
            for dimension in (0..dimensions).rev() {
                grid = Some(Box::new(Grid {
                    dimension,
                    cells: cells.clone(),
                    follow: grid,
                }));
            }
            *grid.unwrap()
        }
    }

    impl Visitor for Grid {
        fn dimension(&self) -> usize {
            self.dimension
        }

        fn interior(&mut self, group: &[Key], _key: &Key, value: Option<&Record>) {
            let labels = group.iter().map(Key::to_string).collect();
            let revenue = value.and_then(|row| row.value("revenue").as_f64());
            self.cells.borrow_mut().push((labels, revenue));
        }

        fn follow(&mut self) -> Option<&mut dyn Visitor> {
            match self.follow.as_mut() {
                Some(next) => Some(&mut **next),
                None => None,
            }
        }
    }

    fn cells(cube: &PivotCube) -> Vec<(Vec<String>, Option<f64>)> {
        let storage = Rc::new(RefCell::new(Vec::new()));
        let mut grid = Grid::chain(cube.dimensions().len(), &storage);
        cube.navigate(&mut grid);
        let result = storage.borrow().clone();
        result
    }

    #[test]
    fn test_scenario_cube() {
        init_logging();
        let data = Dataset::from_records(vec![
            record! { "region" => "E", "quarter" => "Q1", "revenue" => 10 },
            record! { "region" => "E", "quarter" => "Q2", "revenue" => 5 },
            record! { "region" => "W", "quarter" => "Q1", "revenue" => 7 },
        ]);
        let mut cube = PivotCube::new(
            data,
            Expression::new().with("revenue", sum("revenue")),
            &[vec!["region"], vec!["quarter"]],
        )
        .unwrap();

        let summary: Vec<Record> = cube.summary().rows().map(|(_, row)| row).collect();
        assert_eq!(
            summary,
            vec![
                record! { "region" => "E", "quarter" => "Q1", "revenue" => 10 },
                record! { "region" => "E", "quarter" => "Q2", "revenue" => 5 },
                record! { "region" => "W", "quarter" => "Q1", "revenue" => 7 },
            ]
        );

        let margin = |d: usize| -> Vec<(String, f64)> {
            cube.margin(d)
                .unwrap()
                .rows()
                .map(|(_, row)| {
                    let key = row.values().next().map(Value::to_string).unwrap_or_default();
                    (key, row.value("revenue").as_f64().unwrap_or(0.0))
                })
                .collect()
        };
        assert_eq!(margin(0), vec![("E".to_string(), 15.0), ("W".to_string(), 7.0)]);
        assert_eq!(margin(1), vec![("Q1".to_string(), 17.0), ("Q2".to_string(), 5.0)]);
        assert_eq!(cube.total().value("revenue").as_f64(), Some(22.0));

        cube.subtotal(&["region"]).unwrap();
        let totals: Vec<(Vec<String>, Option<f64>)> = cells(&cube)
            .into_iter()
            .filter(|(labels, _)| labels.last().map(String::as_str) == Some("Total"))
            .collect();
        assert_eq!(
            totals,
            vec![
                (vec!["E".to_string(), "Total".to_string()], Some(15.0)),
                (vec!["W".to_string(), "Total".to_string()], Some(7.0)),
            ]
        );
        let after: Vec<Record> = cube.summary().rows().map(|(_, row)| row).collect();
        assert_eq!(summary, after);
    }

    #[test]
    fn test_cells_sum_to_total_in_each_slice() {
        init_logging();
        let data = orders();
        let expression = Expression::new().with("revenue", sum("revenue"));
        let cube = PivotCube::new(data, expression, &[vec!["region", "city"], vec!["quarter"]]).unwrap();

        let grid = cells(&cube);
        let total: f64 = grid.iter().filter_map(|(_, v)| *v).sum();
        assert_eq!(total, 38.0);
        assert_eq!(cube.total().value("revenue").as_f64(), Some(38.0));

        // Crossings with no rows render as blanks rather than zero.
        assert!(grid.contains(&(vec!["E".into(), "Lyon".into(), "Q2".into()], None)));
    }

    #[test]
    fn test_nested_subtotal_cells() {
        init_logging();
        let mut cube = PivotCube::new(
            orders(),
            Expression::new().with("revenue", sum("revenue")),
            &[vec!["region", "city"], vec!["quarter"]],
        )
        .unwrap();
        cube.subtotal(&["region", "quarter"]).unwrap();
        cube.subtotal(&["region"]).unwrap();

        let grid = cells(&cube);
        let find = |labels: &[&str]| -> Option<Option<f64>> {
            grid.iter()
                .find(|(l, _)| l.iter().map(String::as_str).eq(labels.iter().copied()))
                .map(|(_, v)| *v)
        };

        // Region subtotal rows across quarters.
        assert_eq!(find(&["E", "Total", "Q1"]), Some(Some(16.0)));
        assert_eq!(find(&["E", "Total", "Q2"]), Some(Some(4.0)));
        assert_eq!(find(&["W", "Total", "Q2"]), Some(Some(11.0)));
        // The second subtotal finds its nesting level taken.
        assert_eq!(cube.subtotals().len(), 2);
        assert_eq!(find(&["E", "Paris", "Total"]), None);
        assert_eq!(find(&["W", "Quito", "Q2"]), Some(Some(8.0)));
    }

    #[test]
    fn test_delete_then_rebuild() {
        init_logging();
        let mut data = orders();
        data.retain(|row, _| row.value("channel").as_str() == Some("web"));

        let cube = PivotCube::new(data, Expression::new().with("revenue", sum("revenue")), &[vec!["region"]]).unwrap();
        assert_eq!(cube.total().value("revenue").as_f64(), Some(27.0));
        assert_eq!(cube.live_count(), 4);
        assert_eq!(cube.len(), 6);
    }

    #[test]
    fn test_three_dimension_navigation() {
        init_logging();
        let data = orders();
        let expression = revenue_expression();
        let cube = PivotCube::new(data, expression, &[vec!["region"], vec!["quarter"], vec!["channel"]]).unwrap();

        let grid = cells(&cube);
        let total: f64 = grid.iter().filter_map(|(_, v)| *v).sum();
        assert_eq!(total, 38.0);

        let page = cube.page_total().unwrap();
        let east_web = page
            .find_path(PIVOT_ORDER, &[Key::from("E"), Key::from("web")])
            .unwrap();
        assert_eq!(east_web.value("revenue").as_f64(), Some(16.0));
        assert_eq!(east_web.value("orders").as_f64(), Some(2.0));
        assert!(cube.page_grand_total().is_some());
    }

    fn revenue_expression() -> Expression {
        Expression::new().with("revenue", sum("revenue")).with("orders", count())
    }

    #[test]
    fn test_config_driven_cube_with_ratio() {
        init_logging();
        let config = PivotConfig::from_json(
            r#"{
                "dimensions": [["region"], ["quarter"]],
                "measures": {
                    "revenue": {"op": "sum", "column": "revenue"},
                    "orders": {"op": "count"}
                },
                "subtotals": [["region"]]
            }"#,
        )
        .unwrap();
        let mut cube = PivotCube::from_config(orders(), &config).unwrap();
        cube.ratio(|row| {
            let revenue = row.value("revenue").as_f64()?;
            let orders = row.value("orders").as_f64()?;
            Some(record! { "average" => revenue / orders })
        });

        let west = cube.margin(0).unwrap().find_path(PIVOT_ORDER, &[Key::from("W")]).unwrap();
        assert_eq!(west.value("average").as_f64(), Some(6.0));
        let east = cube.subtotals()[0].find_path(SUBTOTAL_ORDER, &[Key::from("E")]).unwrap();
        assert_eq!(east.value("average").as_f64(), Some(20.0 / 3.0));
    }
}
