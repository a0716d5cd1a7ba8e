//! Region report: which defects fall into each longitudinal band of the weld.
//!
//! The image width is split into equal bands. A complete polygon is listed
//! in every band that contains at least one of its vertices. The report is
//! written as a one-sheet workbook, CSV or JSON.

use rust_xlsxwriter::{Format, Workbook};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::export::REPORT_SHEET;
use crate::model::PolygonAnnotation;

/// Errors while writing a report.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// How the band descriptor column is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegionLabels {
    /// Image pixel bounds, e.g. `"100-200"`.
    PixelRange,
    /// Fixed-length millimeter sections of the measuring belt, e.g. `"300-600"`.
    Millimeters { band_mm: u32 },
}

impl RegionLabels {
    pub fn label(&self, index: usize, band_width: f32) -> String {
        match self {
            RegionLabels::PixelRange => {
                let start = (index as f32 * band_width).round() as i64;
                let end = ((index + 1) as f32 * band_width).round() as i64;
                format!("{}-{}", start, end)
            }
            RegionLabels::Millimeters { band_mm } => {
                let start = index as u64 * *band_mm as u64;
                format!("{}-{}", start, start + *band_mm as u64)
            }
        }
    }
}

impl Default for RegionLabels {
    fn default() -> Self {
        RegionLabels::Millimeters {
            band_mm: crate::constants::export::REGION_MM,
        }
    }
}

/// Content of a report column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Free text the inspector fills in later.
    Placeholder,
    /// Band descriptor.
    Region,
    /// Control sensitivity.
    Sensitivity,
    /// Labels of the defects in the band.
    Defects,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportColumn {
    pub header: String,
    pub kind: ColumnKind,
}

impl ReportColumn {
    pub fn new(header: &str, kind: ColumnKind) -> Self {
        Self {
            header: header.to_string(),
            kind,
        }
    }
}

/// Columns of the weld inspection conclusion form.
pub fn default_columns() -> Vec<ReportColumn> {
    use ColumnKind::*;
    vec![
        ReportColumn::new("Номер сварного соединения по журналу сварки", Placeholder),
        ReportColumn::new("Диаметр и толщина стенки трубы, мм", Placeholder),
        ReportColumn::new("Шифр бригады или клеймо сварщика", Placeholder),
        ReportColumn::new("Номер участка контроля (координаты мерного пояса)", Region),
        ReportColumn::new("Чувствительность контроля, мм", Sensitivity),
        ReportColumn::new("Описание выявленных дефектов", Defects),
        ReportColumn::new("Координаты недопустимых дефектов по периметру шва", Placeholder),
        ReportColumn::new("Заключение (годен, ремонт, вырезать)", Placeholder),
        ReportColumn::new("Примечания", Placeholder),
    ]
}

/// Report settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub region_count: usize,
    pub region_labels: RegionLabels,
    pub sensitivity: f32,
    pub placeholder: String,
    pub columns: Vec<ReportColumn>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            region_count: crate::constants::export::REGION_COUNT,
            region_labels: RegionLabels::default(),
            sensitivity: crate::constants::export::SENSITIVITY_MM,
            placeholder: "<Напишите здесь>".to_string(),
            columns: default_columns(),
        }
    }
}

/// One band of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRow {
    pub index: usize,
    /// Band descriptor.
    pub region: String,
    /// Labels of polygons with a vertex in the band, in store order.
    pub defects: Vec<String>,
    /// One cell per column.
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionReport {
    pub headers: Vec<String>,
    /// Content kind of each column, parallel to `headers`.
    pub kinds: Vec<ColumnKind>,
    /// Sensitivity as a number, for typed spreadsheet cells.
    pub sensitivity: f32,
    pub rows: Vec<RegionRow>,
}

impl RegionReport {
    /// Bucket the complete polygons of an image `image_width` pixels wide.
    pub fn build(image_width: u32, polygons: &[PolygonAnnotation], config: &ReportConfig) -> Self {
        let count = config.region_count.max(1);
        let band_width = image_width as f32 / count as f32;

        let rows = (0..count)
            .map(|index| {
                let start = index as f32 * band_width;
                let end = (index + 1) as f32 * band_width;
                let defects: Vec<String> = polygons
                    .iter()
                    .filter(|p| p.is_complete && p.points.iter().any(|v| v.x >= start && v.x < end))
                    .map(|p| p.label.clone())
                    .collect();
                let region = config.region_labels.label(index, band_width);
                let cells = config
                    .columns
                    .iter()
                    .map(|column| match column.kind {
                        ColumnKind::Placeholder => config.placeholder.clone(),
                        ColumnKind::Region => region.clone(),
                        ColumnKind::Sensitivity => config.sensitivity.to_string(),
                        ColumnKind::Defects => defects.join(", "),
                    })
                    .collect();
                RegionRow {
                    index,
                    region,
                    defects,
                    cells,
                }
            })
            .collect();

        Self {
            headers: config.columns.iter().map(|c| c.header.clone()).collect(),
            kinds: config.columns.iter().map(|c| c.kind).collect(),
            sensitivity: config.sensitivity,
            rows,
        }
    }

    /// Workbook bytes with a single sheet: a bold header row, then one row
    /// per band. Sensitivity cells are numeric.
    pub fn to_xlsx(&self) -> Result<Vec<u8>, ReportError> {
        let mut workbook = Workbook::new();
        let header = Format::new().set_bold();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(REPORT_SHEET)?;

        for (col, title) in self.headers.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, title.as_str(), &header)?;
            worksheet.set_column_width(col as u16, 24)?;
        }
        for (index, row) in self.rows.iter().enumerate() {
            let line = index as u32 + 1;
            for (col, cell) in row.cells.iter().enumerate() {
                match self.kinds.get(col) {
                    Some(ColumnKind::Sensitivity) => {
                        worksheet.write_number(line, col as u16, f64::from(self.sensitivity))?;
                    }
                    _ => {
                        worksheet.write_string(line, col as u16, cell.as_str())?;
                    }
                }
            }
        }

        Ok(workbook.save_to_buffer()?)
    }

    /// Comma separated values with a header line, CRLF line endings.
    pub fn to_csv(&self) -> Result<Vec<u8>, ReportError> {
        let mut out = Vec::new();
        {
            let mut writer = csv::WriterBuilder::new()
                .terminator(csv::Terminator::CRLF)
                .from_writer(&mut out);
            writer.write_record(&self.headers)?;
            for row in &self.rows {
                writer.write_record(&row.cells)?;
            }
            writer.flush()?;
        }
        Ok(out)
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Point;
    use weldmark_canvas::Color;

    fn polygon(id: u64, xs: &[f32], label: &str) -> PolygonAnnotation {
        PolygonAnnotation {
            id,
            points: xs.iter().map(|&x| Point::new(x, 10.0)).collect(),
            label: label.into(),
            color: Color::WHITE,
            is_complete: true,
        }
    }

    fn pixel_config() -> ReportConfig {
        ReportConfig {
            region_labels: RegionLabels::PixelRange,
            ..ReportConfig::default()
        }
    }

    #[test]
    fn test_vertex_bucketing() {
        let polygons = vec![polygon(1, &[150.0, 160.0, 170.0], "crack")];
        let report = RegionReport::build(1000, &polygons, &pixel_config());
        assert_eq!(report.rows.len(), 10);
        let row = &report.rows[1];
        assert_eq!(row.region, "100-200");
        assert_eq!(row.defects, vec!["crack".to_string()]);
        assert!(report.rows.iter().filter(|r| r.index != 1).all(|r| r.defects.is_empty()));
    }

    #[test]
    fn test_polygon_spanning_bands() {
        let polygons = vec![
            polygon(1, &[50.0, 250.0, 260.0], "пора"),
            polygon(2, &[280.0, 290.0, 295.0], "трещина"),
        ];
        let report = RegionReport::build(1000, &polygons, &pixel_config());
        assert_eq!(report.rows[0].defects, vec!["пора"]);
        assert!(report.rows[1].defects.is_empty());
        assert_eq!(report.rows[2].defects, vec!["пора", "трещина"]);
        assert_eq!(report.rows[2].cells[5], "пора, трещина");
    }

    #[test]
    fn test_band_is_half_open() {
        let polygons = vec![polygon(1, &[200.0, 200.0, 200.0], "x")];
        let report = RegionReport::build(1000, &polygons, &pixel_config());
        assert!(report.rows[1].defects.is_empty());
        assert_eq!(report.rows[2].defects, vec!["x"]);
        // Vertices outside the image are not listed anywhere
        let outside = vec![polygon(2, &[-5.0, 1000.0, 1200.0], "y")];
        let report = RegionReport::build(1000, &outside, &pixel_config());
        assert!(report.rows.iter().all(|r| r.defects.is_empty()));
    }

    #[test]
    fn test_millimeter_labels() {
        let report = RegionReport::build(640, &[], &ReportConfig::default());
        let regions: Vec<_> = report.rows.iter().map(|r| r.region.as_str()).collect();
        assert_eq!(regions[0], "0-300");
        assert_eq!(regions[9], "2700-3000");
    }

    #[test]
    fn test_default_cells() {
        let report = RegionReport::build(1000, &[], &ReportConfig::default());
        assert_eq!(report.headers.len(), 9);
        let cells = &report.rows[3].cells;
        assert_eq!(cells[0], "<Напишите здесь>");
        assert_eq!(cells[3], "900-1200");
        assert_eq!(cells[4], "0.5");
        assert_eq!(cells[5], "");
    }

    #[test]
    fn test_csv_reads_back() {
        let polygons = vec![
            polygon(1, &[1.0, 2.0, 3.0], "a"),
            polygon(2, &[1.0, 2.0, 3.0], "say \"b\""),
        ];
        let bytes = RegionReport::build(100, &polygons, &ReportConfig::default())
            .to_csv()
            .unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("\"Диаметр и толщина стенки трубы, мм\""));
        assert!(text.ends_with("\r\n"));

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), 9);
        assert_eq!(&headers[5], "Описание выявленных дефектов");
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 10);
        assert_eq!(&rows[0][5], "a, say \"b\"");
        assert_eq!(&rows[0][3], "0-300");
    }

    #[test]
    fn test_workbook_reads_back() {
        use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};

        let polygons = vec![
            polygon(1, &[150.0, 160.0, 170.0], "пора"),
            polygon(2, &[155.0, 900.0, 950.0], "трещина"),
        ];
        let bytes = RegionReport::build(1000, &polygons, &ReportConfig::default())
            .to_xlsx()
            .unwrap();

        let mut workbook: Xlsx<_> = open_workbook_from_rs(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(workbook.sheet_names(), vec![REPORT_SHEET.to_string()]);
        let range = workbook.worksheet_range(REPORT_SHEET).unwrap();
        assert_eq!(range.height(), 11);
        assert_eq!(
            range.get_value((0, 0)),
            Some(&Data::String("Номер сварного соединения по журналу сварки".into()))
        );
        assert_eq!(
            range.get_value((2, 5)),
            Some(&Data::String("пора, трещина".into()))
        );
        assert_eq!(range.get_value((10, 5)), Some(&Data::String("трещина".into())));
        assert_eq!(range.get_value((2, 3)), Some(&Data::String("300-600".into())));
        assert_eq!(range.get_value((1, 4)), Some(&Data::Float(0.5)));
    }

    #[test]
    fn test_json_round_trip() {
        let report = RegionReport::build(100, &[polygon(1, &[1.0, 2.0, 3.0], "a")], &pixel_config());
        let json = report.to_json().unwrap();
        let back: RegionReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
