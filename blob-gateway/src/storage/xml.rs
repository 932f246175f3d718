//! XML bodies returned by the Blob REST API

use quick_xml::events::Event;
use quick_xml::Reader;

use super::StorageError;

const BLOB_NAME: &[&str] = &["EnumerationResults", "Blobs", "Blob", "Name"];
const NEXT_MARKER: &[&str] = &["EnumerationResults", "NextMarker"];
const ERROR_MESSAGE: &[&str] = &["Error", "Message"];

/// One page of a List Blobs response
#[derive(Debug, Default, PartialEq)]
pub struct ListBlobsPage {
    pub names: Vec<String>,
    pub next_marker: Option<String>,
}

/// Parses an `EnumerationResults` document.
///
/// Only `Blobs/Blob/Name` and the top-level `NextMarker` are read; an empty
/// or absent `NextMarker` means the listing is complete.
pub fn parse_list_blobs(xml: &str) -> Result<ListBlobsPage, StorageError> {
    let mut reader = Reader::from_str(xml.trim_start_matches('\u{feff}'));
    reader.trim_text(true);

    let mut page = ListBlobsPage::default();
    let mut path: Vec<String> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                path.push(String::from_utf8_lossy(e.name().as_ref()).to_string());
            }
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| StorageError::Xml(e.to_string()))?
                    .to_string();
                if at(&path, BLOB_NAME) {
                    page.names.push(text);
                } else if at(&path, NEXT_MARKER) && !text.is_empty() {
                    page.next_marker = Some(text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(StorageError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(page)
}

/// Extracts `Error/Message` from an error body, if there is one.
pub fn parse_error_message(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml.trim_start_matches('\u{feff}'));
    reader.trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                path.push(String::from_utf8_lossy(e.name().as_ref()).to_string());
            }
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Text(e)) if at(&path, ERROR_MESSAGE) => {
                return e.unescape().ok().map(|m| m.to_string());
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

fn at(path: &[String], expected: &[&str]) -> bool {
    path.len() == expected.len() && path.iter().zip(expected).all(|(a, b)| a == b)
}
