//! Reader for the XML "data set" strings returned by the GlobalWeather
//! service: a root element holding repeated row elements whose children are
//! the columns.
//!
//! ```xml
//! <NewDataSet>
//!   <Table><Country>Australia</Country><City>Sydney Airport</City></Table>
//! </NewDataSet>
//! ```

use std::collections::BTreeMap;

use quick_xml::{Reader, events::Event};

use crate::error::SourceError;

/// Column name to trimmed text. Self-closing columns map to an empty string.
pub type Row = BTreeMap<String, String>;

pub const TABLE_TAG: &str = "Table";

/// Collect every `row_tag` element of `xml`, at any depth.
pub fn parse_rows(xml: &str, row_tag: &str) -> Result<Vec<Row>, SourceError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut rows = Vec::new();
    let mut row: Option<Row> = None;
    let mut column: Option<(String, String)> = None;
    let mut column_depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = utf8_name(e.local_name().as_ref())?;
                match (row.is_some(), column.is_some()) {
                    (false, _) if name == row_tag => row = Some(Row::new()),
                    (true, false) => {
                        column = Some((name, String::new()));
                        column_depth = 0;
                    }
                    (true, true) => column_depth += 1,
                    _ => {}
                }
            }
            Event::Empty(e) => {
                let name = utf8_name(e.local_name().as_ref())?;
                match (row.as_mut(), &column) {
                    (None, _) if name == row_tag => rows.push(Row::new()),
                    (Some(r), None) => {
                        r.insert(name, String::new());
                    }
                    _ => {}
                }
            }
            Event::Text(t) => {
                if let Some((_, value)) = column.as_mut() {
                    value.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some((_, value)) = column.as_mut() {
                    value.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(_) => {
                if column.is_some() {
                    if column_depth > 0 {
                        column_depth -= 1;
                    } else if let (Some((name, value)), Some(r)) = (column.take(), row.as_mut()) {
                        r.insert(name, value.trim().to_string());
                    }
                } else if let Some(r) = row.take() {
                    rows.push(r);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if row.is_some() {
        return Err(SourceError::Malformed(format!("unterminated <{row_tag}> element")));
    }

    Ok(rows)
}

/// First `Table` row of `xml`, or the root element's children when the
/// payload has no `Table` rows.
pub fn first_record(xml: &str) -> Result<Option<Row>, SourceError> {
    if let Some(first) = parse_rows(xml, TABLE_TAG)?.into_iter().next() {
        return Ok(Some(first));
    }

    match root_name(xml)? {
        Some(root) => Ok(parse_rows(xml, &root)?.into_iter().next().filter(|r| !r.is_empty())),
        None => Ok(None),
    }
}

fn root_name(xml: &str) -> Result<Option<String>, SourceError> {
    let mut reader = Reader::from_str(xml);

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                return utf8_name(e.local_name().as_ref()).map(Some);
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

fn utf8_name(raw: &[u8]) -> Result<String, SourceError> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|e| SourceError::Malformed(format!("invalid element name: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CITIES: &str = r#"<?xml version="1.0" encoding="utf-16"?>
<NewDataSet>
  <Table>
    <Country>Australia</Country>
    <City>Sydney Airport</City>
  </Table>
  <Table>
    <Country>Australia</Country>
    <City>Perth &amp; Districts</City>
  </Table>
  <Table>
    <Country>Australia</Country>
    <City />
  </Table>
</NewDataSet>"#;

    #[test]
    fn parses_each_table_row() {
        let rows = parse_rows(CITIES, TABLE_TAG).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["City"], "Sydney Airport");
        assert_eq!(rows[1]["City"], "Perth & Districts");
        assert_eq!(rows[2]["City"], "");
        assert_eq!(rows[2]["Country"], "Australia");
    }

    #[test]
    fn empty_data_set_has_no_rows() {
        assert!(parse_rows("<NewDataSet />", TABLE_TAG).unwrap().is_empty());
        assert!(parse_rows("<NewDataSet></NewDataSet>", TABLE_TAG).unwrap().is_empty());
    }

    #[test]
    fn mismatched_tags_are_malformed() {
        let err = parse_rows("<NewDataSet><Table><City>x</Country></Table>", TABLE_TAG)
            .unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }

    #[test]
    fn unterminated_row_is_malformed() {
        let err = parse_rows("<NewDataSet><Table><City>x</City>", TABLE_TAG).unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }

    #[test]
    fn first_record_falls_back_to_root_children() {
        let xml = "<CurrentWeather><Location>Canberra</Location><Status>Success</Status></CurrentWeather>";
        let record = first_record(xml).unwrap().unwrap();

        assert_eq!(record["Location"], "Canberra");
        assert_eq!(record["Status"], "Success");
    }

    #[test]
    fn first_record_prefers_table_rows() {
        let record = first_record(CITIES).unwrap().unwrap();
        assert_eq!(record["City"], "Sydney Airport");
    }
}
