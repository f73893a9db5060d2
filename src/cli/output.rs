//! Output formatting for inspected frames.
//!
//! Rows render as a comfy-table table, or as JSON Lines with one object per
//! frame. JSON rows are written as soon as they are pushed; a table needs
//! every row to size its columns, so [`RowWriter`] buffers table rows until
//! [`RowWriter::finish`].

use std::io::Write;

use clap::ValueEnum;
use serde_json::{json, Map, Value};

use crate::inspect::FrameRow;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed table (default), rendered after the last frame
    Table,
    /// JSON Lines (one JSON object per frame)
    Json,
}

/// Formats frame rows for output.
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    /// Create a new formatter with the specified format.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Start writing rows one at a time.
    pub fn stream<W: Write>(&self, writer: W) -> RowWriter<W> {
        RowWriter {
            format: self.format,
            writer,
            pending: Vec::new(),
        }
    }

    /// Format rows and write to the given writer.
    pub fn write<W: Write>(&self, rows: &[FrameRow], writer: &mut W) -> std::io::Result<()> {
        match self.format {
            OutputFormat::Table => write_table(rows, writer),
            OutputFormat::Json => rows.iter().try_for_each(|row| write_json(row, writer)),
        }
    }
}

/// Incremental row output from [`OutputFormatter::stream`].
pub struct RowWriter<W: Write> {
    format: OutputFormat,
    writer: W,
    /// Table rows waiting for `finish`.
    pending: Vec<FrameRow>,
}

impl<W: Write> RowWriter<W> {
    pub fn push(&mut self, row: FrameRow) -> std::io::Result<()> {
        match self.format {
            OutputFormat::Table => {
                self.pending.push(row);
                Ok(())
            }
            OutputFormat::Json => write_json(&row, &mut self.writer),
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Render any buffered rows, flush, and hand back the writer.
    pub fn finish(mut self) -> std::io::Result<W> {
        if self.format == OutputFormat::Table {
            write_table(&self.pending, &mut self.writer)?;
        }
        self.writer.flush()?;
        Ok(self.writer)
    }
}

fn write_table<W: Write>(rows: &[FrameRow], writer: &mut W) -> std::io::Result<()> {
    use comfy_table::{Cell, Table};

    let with_selection = rows.iter().any(|row| !row.selected.is_empty());

    let mut table = Table::new();
    let mut headers = vec![
        Cell::new("frame"),
        Cell::new("time"),
        Cell::new("caplen"),
        Cell::new("wirelen"),
        Cell::new("headers"),
        Cell::new("payload"),
    ];
    if with_selection {
        headers.push(Cell::new("selected"));
    }
    table.set_header(headers);

    for row in rows {
        let headers: Vec<String> = row
            .headers
            .iter()
            .map(|h| format!("{}@{}+{}", h.name, h.offset, h.length))
            .collect();
        let mut headers = headers.join(" ");
        if let Some(fragment) = &row.fragment {
            headers.push_str(&format!(
                " [frag id={:#x} off={}{}]",
                fragment.identification,
                fragment.offset,
                if fragment.more { " +" } else { "" }
            ));
        }

        let mut cells = vec![
            Cell::new(row.frame),
            Cell::new(row.timestamp.as_deref().unwrap_or("")),
            Cell::new(row.capture_length),
            Cell::new(row.wire_length),
            Cell::new(headers),
            Cell::new(
                row.payload
                    .map(|(offset, length)| format!("{offset}+{length}"))
                    .unwrap_or_default(),
            ),
        ];
        if with_selection {
            let selected: Vec<String> = row
                .selected
                .iter()
                .map(|s| format!("[{}] {}+{} {}", s.depth, s.offset, s.length, s.preview))
                .collect();
            cells.push(Cell::new(selected.join("\n")));
        }
        table.add_row(cells);
    }

    writeln!(writer, "{table}")
}

fn write_json<W: Write>(row: &FrameRow, writer: &mut W) -> std::io::Result<()> {
    let mut obj = Map::new();
    obj.insert("frame".to_string(), json!(row.frame));
    obj.insert(
        "timestamp".to_string(),
        row.timestamp.clone().map_or(Value::Null, Value::String),
    );
    obj.insert("descriptor".to_string(), json!(row.descriptor.as_str()));
    obj.insert("caplen".to_string(), json!(row.capture_length));
    obj.insert("wirelen".to_string(), json!(row.wire_length));
    obj.insert(
        "headers".to_string(),
        Value::Array(
            row.headers
                .iter()
                .map(|h| json!({"name": h.name, "offset": h.offset, "length": h.length}))
                .collect(),
        ),
    );
    obj.insert(
        "payload".to_string(),
        row.payload.map_or(Value::Null, |(offset, length)| {
            json!({"offset": offset, "length": length})
        }),
    );
    if let Some(fragment) = &row.fragment {
        obj.insert(
            "fragment".to_string(),
            json!({
                "identification": fragment.identification,
                "offset": fragment.offset,
                "more": fragment.more,
            }),
        );
    }
    if !row.selected.is_empty() {
        obj.insert(
            "selected".to_string(),
            Value::Array(
                row.selected
                    .iter()
                    .map(|s| {
                        json!({
                            "depth": s.depth,
                            "offset": s.offset,
                            "length": s.length,
                            "bytes": s.preview,
                        })
                    })
                    .collect(),
            ),
        );
    }

    writeln!(writer, "{}", Value::Object(obj))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::{FragmentInfo, HeaderEntry, SelectedHeader};
    use netdesc_core::DescriptorType;

    fn create_test_rows() -> Vec<FrameRow> {
        vec![
            FrameRow {
                frame: 1,
                timestamp: Some("2023-11-14T22:13:20+00:00".to_string()),
                descriptor: DescriptorType::Type2,
                capture_length: 42,
                wire_length: 60,
                headers: vec![
                    HeaderEntry {
                        name: "ethernet",
                        offset: 0,
                        length: 14,
                    },
                    HeaderEntry {
                        name: "arp",
                        offset: 14,
                        length: 28,
                    },
                ],
                payload: Some((42, 0)),
                fragment: None,
                selected: Vec::new(),
            },
            FrameRow {
                frame: 2,
                timestamp: None,
                descriptor: DescriptorType::Type2,
                capture_length: 50,
                wire_length: 50,
                headers: vec![HeaderEntry {
                    name: "ipv4",
                    offset: 14,
                    length: 20,
                }],
                payload: Some((34, 16)),
                fragment: Some(FragmentInfo {
                    identification: 0x1234,
                    offset: 1480,
                    more: false,
                }),
                selected: vec![SelectedHeader {
                    depth: 0,
                    offset: 14,
                    length: 20,
                    preview: "4500".to_string(),
                }],
            },
        ]
    }

    #[test]
    fn test_table_output() {
        let formatter = OutputFormatter::new(OutputFormat::Table);
        let mut output = Vec::new();
        formatter.write(&create_test_rows(), &mut output).unwrap();

        let output_str = String::from_utf8(output).unwrap();
        assert!(output_str.contains("ethernet@0+14 arp@14+28"));
        assert!(output_str.contains("42+0"));
        assert!(output_str.contains("frag id=0x1234 off=1480"));
        assert!(output_str.contains("selected"));
    }

    #[test]
    fn test_json_output() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let mut output = Vec::new();
        formatter.write(&create_test_rows(), &mut output).unwrap();

        let output_str = String::from_utf8(output).unwrap();
        let lines: Vec<Value> = output_str
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);

        assert_eq!(lines[0]["frame"], 1);
        assert_eq!(lines[0]["descriptor"], "type2");
        assert_eq!(lines[0]["headers"][1]["name"], "arp");
        assert_eq!(lines[0]["payload"]["offset"], 42);
        assert!(lines[0].get("fragment").is_none());

        assert!(lines[1]["timestamp"].is_null());
        assert_eq!(lines[1]["fragment"]["offset"], 1480);
        assert_eq!(lines[1]["selected"][0]["bytes"], "4500");
    }

    #[test]
    fn test_json_rows_stream_as_pushed() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let mut stream = formatter.stream(Vec::new());
        let mut rows = create_test_rows().into_iter();

        stream.push(rows.next().unwrap()).unwrap();
        let written = String::from_utf8(stream.get_ref().clone()).unwrap();
        assert_eq!(written.lines().count(), 1);
        assert!(written.contains("\"frame\":1"));

        stream.push(rows.next().unwrap()).unwrap();
        assert_eq!(stream.get_ref().split(|&b| b == b'\n').count(), 3);

        let output = stream.finish().unwrap();
        let mut batch = Vec::new();
        formatter.write(&create_test_rows(), &mut batch).unwrap();
        assert_eq!(output, batch);
    }

    #[test]
    fn test_table_rows_render_on_finish() {
        let formatter = OutputFormatter::new(OutputFormat::Table);
        let mut stream = formatter.stream(Vec::new());
        for row in create_test_rows() {
            stream.push(row).unwrap();
        }
        assert!(stream.get_ref().is_empty());

        let output = String::from_utf8(stream.finish().unwrap()).unwrap();
        assert!(output.contains("ethernet@0+14 arp@14+28"));
        assert!(output.contains("frag id=0x1234 off=1480"));
    }
}
