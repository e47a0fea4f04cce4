//! RSS update-feed parsing.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::errors::RepositoryError;
use crate::types::FeedEntry;

/// Parse the `<item>` entries of an RSS 2.0 document.
///
/// Entries without a `<link>` are dropped.
pub fn parse_feed(xml: &[u8]) -> Result<Vec<FeedEntry>, RepositoryError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut buf = Vec::new();

    let mut in_item = false;
    let mut field: Option<&'static str> = None;
    let mut title: Option<String> = None;
    let mut link: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"item" => {
                    in_item = true;
                    title = None;
                    link = None;
                }
                b"title" if in_item => field = Some("title"),
                b"link" if in_item => field = Some("link"),
                _ => {}
            },
            Ok(Event::Text(te)) => {
                if let Some(name) = field {
                    let text = te.unescape().unwrap_or_default().trim().to_string();
                    assign(name, text, &mut title, &mut link);
                }
            }
            Ok(Event::CData(cdata)) => {
                if let Some(name) = field {
                    let text = String::from_utf8_lossy(&cdata.into_inner()).trim().to_string();
                    assign(name, text, &mut title, &mut link);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"item" => {
                    in_item = false;
                    if let Some(link) = link.take() {
                        entries.push(FeedEntry {
                            title: title.take(),
                            handle: handle_from_link(&link),
                            link,
                        });
                    }
                }
                b"title" | b"link" => field = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(RepositoryError::parse(format!("invalid feed: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(entries)
}

fn assign(name: &str, text: String, title: &mut Option<String>, link: &mut Option<String>) {
    if text.is_empty() {
        return;
    }
    match name {
        "title" => *title = Some(text),
        _ => *link = Some(text),
    }
}

/// Extract the `prefix/suffix` persistent handle from an item link such as
/// `https://repo.example.org/handle/1834/42`.
pub fn handle_from_link(link: &str) -> Option<String> {
    let (_, rest) = link.split_once("/handle/")?;
    let mut parts = rest.split(['/', '?', '#']);
    let prefix = parts.next().filter(|p| !p.is_empty())?;
    let suffix = parts.next().filter(|s| !s.is_empty())?;
    Some(format!("{}/{}", prefix, suffix))
}
