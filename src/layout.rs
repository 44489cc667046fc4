use serde::Serialize;
use tracing::warn;

use crate::charts::ChartSnapshot;

pub const HEADING_HEIGHT: f64 = 8.0;
pub const LINE_HEIGHT: f64 = 6.0;
pub const METRIC_BOX_HEIGHT: f64 = 15.0;
pub const METRIC_ROW_GAP: f64 = 5.0;
pub const TABLE_HEADER_HEIGHT: f64 = 10.0;
pub const TABLE_ROW_HEIGHT: f64 = 6.0;

/// Approximate width of one character of body text, in page units.
const CHAR_WIDTH: f64 = 2.0;

/// Page dimensions in millimetres. Defaults to portrait A4.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageGeometry {
    pub page_width: f64,
    pub page_height: f64,
    pub margin: f64,
    /// Cursor start on the first page, below the title banner.
    pub first_page_top: f64,
    pub page_top: f64,
    pub bottom_reserve: f64,
    pub block_gap: f64,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            margin: 15.0,
            first_page_top: 50.0,
            page_top: 20.0,
            bottom_reserve: 20.0,
            block_gap: 2.0,
        }
    }
}

impl PageGeometry {
    pub fn content_width(&self) -> f64 {
        self.page_width - 2.0 * self.margin
    }

    pub fn bottom_limit(&self) -> f64 {
        self.page_height - self.bottom_reserve
    }

    /// Characters of body text that fit on one line.
    pub fn line_chars(&self) -> usize {
        (self.content_width() / CHAR_WIDTH).floor().max(1.0) as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub label: String,
    pub value: String,
}

impl Metric {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Content handed to the paginator.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading(String),
    Text(String),
    /// Two-column grid of labelled values.
    Metrics(Vec<Metric>),
    /// Header row is repeated after every page break.
    Table(Table),
    Chart(ChartSnapshot),
    /// Vertical space only; never forces a break on its own.
    Spacer(f64),
}

/// What actually lands on a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Fragment {
    Heading { text: String },
    Text { text: String },
    Metrics { metrics: Vec<Metric> },
    TableHeader { cells: Vec<String> },
    TableRow { cells: Vec<String> },
    Chart { chart: ChartSnapshot, width: f64, height: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub page: usize,
    pub x: f64,
    pub y: f64,
    pub height: f64,
    pub fragment: Fragment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagedDocument {
    pub geometry: PageGeometry,
    pub page_count: usize,
    pub placements: Vec<Placement>,
}

impl PagedDocument {
    pub fn page(&self, index: usize) -> impl Iterator<Item = &Placement> + '_ {
        self.placements.iter().filter(move |p| p.page == index)
    }
}

/// Scales an image of `width` x `height` to fit `max_width`, never upscaling.
pub fn scale_to_fit(width: f64, height: f64, max_width: f64) -> (f64, f64) {
    if width <= 0.0 {
        return (0.0, 0.0);
    }
    let scale = (max_width / width).min(1.0);
    (width * scale, height * scale)
}

fn metrics_height(count: usize) -> f64 {
    let rows = count.div_ceil(2);
    if rows == 0 {
        return 0.0;
    }
    rows as f64 * METRIC_BOX_HEIGHT + (rows - 1) as f64 * METRIC_ROW_GAP
}

/// Greedy word wrap to at most `width` characters per line.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

struct Cursor {
    geometry: PageGeometry,
    page: usize,
    y: f64,
    placements: Vec<Placement>,
}

impl Cursor {
    fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            page: 0,
            y: geometry.first_page_top,
            placements: Vec::new(),
        }
    }

    fn top(&self) -> f64 {
        if self.page == 0 {
            self.geometry.first_page_top
        } else {
            self.geometry.page_top
        }
    }

    fn fits(&self, height: f64) -> bool {
        self.y + height <= self.geometry.bottom_limit()
    }

    fn break_page(&mut self) {
        self.page += 1;
        self.y = self.geometry.page_top;
    }

    fn place(&mut self, fragment: Fragment, height: f64) {
        if !self.fits(height) {
            let fits_fresh_page = self.geometry.page_top + height <= self.geometry.bottom_limit();
            if fits_fresh_page || self.y > self.top() {
                self.break_page();
            }
            if !fits_fresh_page {
                warn!(
                    page = self.page,
                    height,
                    "block taller than a page, placing at top"
                );
            }
        }
        self.placements.push(Placement {
            page: self.page,
            x: self.geometry.margin,
            y: self.y,
            height,
            fragment,
        });
        self.y += height + self.geometry.block_gap;
    }

    // A header never ends a page without at least one row under it.
    fn place_table(&mut self, table: Table) {
        let header = || Fragment::TableHeader {
            cells: table.columns.clone(),
        };
        let lead = if table.rows.is_empty() {
            TABLE_HEADER_HEIGHT
        } else {
            TABLE_HEADER_HEIGHT + self.geometry.block_gap + TABLE_ROW_HEIGHT
        };
        if !self.fits(lead) && self.y > self.top() {
            self.break_page();
        }
        self.place(header(), TABLE_HEADER_HEIGHT);
        for row in &table.rows {
            if !self.fits(TABLE_ROW_HEIGHT) {
                self.break_page();
                self.place(header(), TABLE_HEADER_HEIGHT);
            }
            self.place(Fragment::TableRow { cells: row.clone() }, TABLE_ROW_HEIGHT);
        }
    }
}

pub fn paginate(blocks: Vec<Block>, geometry: PageGeometry) -> PagedDocument {
    let mut cursor = Cursor::new(geometry);

    for block in blocks {
        match block {
            Block::Heading(text) => cursor.place(Fragment::Heading { text }, HEADING_HEIGHT),
            Block::Text(text) => cursor.place(Fragment::Text { text }, LINE_HEIGHT),
            Block::Metrics(metrics) => {
                let height = metrics_height(metrics.len());
                cursor.place(Fragment::Metrics { metrics }, height);
            }
            Block::Table(table) => cursor.place_table(table),
            Block::Chart(chart) => {
                let (width, height) =
                    scale_to_fit(chart.width, chart.height, geometry.content_width());
                cursor.place(Fragment::Chart { chart, width, height }, height);
            }
            Block::Spacer(height) => cursor.y += height,
        }
    }

    let page_count = cursor.placements.last().map_or(1, |p| p.page + 1).max(cursor.page + 1);
    PagedDocument {
        geometry,
        page_count,
        placements: cursor.placements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::{ChartKind, ChartSeries};

    fn chart(width: f64, height: f64) -> ChartSnapshot {
        ChartSnapshot::new(
            ChartSeries {
                kind: ChartKind::CollegeLine,
                label: "Average AI Dependency Score".to_string(),
                labels: vec!["CAS".to_string()],
                values: vec![4.0],
                y_max: None,
            },
            width,
            height,
        )
    }

    fn assert_within_pages(doc: &PagedDocument) {
        for placement in &doc.placements {
            assert!(
                placement.y + placement.height <= doc.geometry.bottom_limit(),
                "placement crosses bottom reserve: {placement:?}"
            );
        }
    }

    #[test]
    fn overflowing_content_breaks_onto_new_pages() {
        let blocks: Vec<Block> = (0..60).map(|i| Block::Text(format!("line {i}"))).collect();
        let doc = paginate(blocks, PageGeometry::default());

        assert!(doc.page_count >= 2);
        assert_within_pages(&doc);

        let second_page_first = doc.page(1).next().unwrap();
        assert_eq!(second_page_first.y, 20.0);
    }

    #[test]
    fn cursor_advances_by_height_plus_gap() {
        let doc = paginate(
            vec![Block::Heading("Title".into()), Block::Text("body".into())],
            PageGeometry::default(),
        );
        assert_eq!(doc.placements[0].y, 50.0);
        assert_eq!(doc.placements[1].y, 50.0 + HEADING_HEIGHT + 2.0);
        assert_eq!(doc.page_count, 1);
    }

    #[test]
    fn table_header_repeats_after_break() {
        let table = Table {
            columns: vec!["College".into(), "Students".into()],
            rows: (0..50).map(|i| vec![format!("C{i}"), i.to_string()]).collect(),
        };
        let doc = paginate(vec![Block::Table(table)], PageGeometry::default());

        assert!(doc.page_count >= 2);
        assert_within_pages(&doc);
        for page in 0..doc.page_count {
            let first = doc.page(page).next().unwrap();
            assert!(
                matches!(first.fragment, Fragment::TableHeader { .. }),
                "page {page} does not start with a header"
            );
        }
        let rows = doc
            .placements
            .iter()
            .filter(|p| matches!(p.fragment, Fragment::TableRow { .. }))
            .count();
        assert_eq!(rows, 50);
    }

    #[test]
    fn charts_scale_down_but_never_up() {
        assert_eq!(scale_to_fit(360.0, 180.0, 180.0), (180.0, 90.0));
        assert_eq!(scale_to_fit(120.0, 60.0, 180.0), (120.0, 60.0));
        assert_eq!(scale_to_fit(0.0, 60.0, 180.0), (0.0, 0.0));
    }

    #[test]
    fn chart_that_does_not_fit_moves_to_next_page() {
        let mut blocks: Vec<Block> = (0..28).map(|i| Block::Text(format!("line {i}"))).collect();
        blocks.push(Block::Chart(chart(360.0, 180.0)));
        let doc = paginate(blocks, PageGeometry::default());

        let placed = doc.placements.last().unwrap();
        assert_eq!(placed.page, 1);
        assert_eq!(placed.y, 20.0);
        assert_eq!(placed.height, 90.0);
        assert_within_pages(&doc);
    }

    #[test]
    fn tall_block_on_first_page_moves_to_a_fresh_page() {
        let blocks = vec![Block::Chart(chart(180.0, 240.0))];
        let doc = paginate(blocks, PageGeometry::default());

        let placed = &doc.placements[0];
        assert_eq!((placed.page, placed.y, placed.height), (1, 20.0, 240.0));
        assert_within_pages(&doc);
    }

    #[test]
    fn block_taller_than_any_page_stays_at_the_top() {
        let doc = paginate(
            vec![Block::Text("intro".into()), Block::Chart(chart(180.0, 300.0))],
            PageGeometry::default(),
        );

        let placed = doc.placements.last().unwrap();
        assert_eq!((placed.page, placed.y), (1, 20.0));
        assert_eq!(doc.page_count, 2);
    }

    #[test]
    fn table_header_is_kept_with_its_first_row() {
        // 27 lines leave the cursor at y=266: room for a header, not a row.
        let mut blocks: Vec<Block> = (0..27).map(|i| Block::Text(format!("line {i}"))).collect();
        blocks.push(Block::Table(Table {
            columns: vec!["College".into(), "Students".into()],
            rows: vec![vec!["CAS".into(), "2".into()]],
        }));
        let doc = paginate(blocks, PageGeometry::default());

        let table: Vec<(usize, f64)> = doc
            .placements
            .iter()
            .filter(|p| {
                matches!(
                    p.fragment,
                    Fragment::TableHeader { .. } | Fragment::TableRow { .. }
                )
            })
            .map(|p| (p.page, p.y))
            .collect();
        assert_eq!(table, vec![(1, 20.0), (1, 32.0)]);
    }

    #[test]
    fn metrics_grid_height_counts_rows_of_two() {
        assert_eq!(metrics_height(0), 0.0);
        assert_eq!(metrics_height(1), 15.0);
        assert_eq!(metrics_height(4), 35.0);
        assert_eq!(metrics_height(5), 55.0);
    }

    #[test]
    fn wraps_on_word_boundaries() {
        let lines = wrap_text("one two three four five", 9);
        assert_eq!(lines, vec!["one two", "three", "four five"]);
        assert!(wrap_text("   ", 10).is_empty());
        assert_eq!(
            wrap_text("unbreakablelongword", 5),
            vec!["unbreakablelongword"]
        );
    }
}
