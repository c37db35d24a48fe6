use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("the response body is missing")]
    MissingBody,
    #[error("malformed feed: {0}")]
    Malformed(String),
    #[error("the feed is empty")]
    EmptyFeed,
}

/// A decoded RSS document, reduced to its items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feed {
    pub items: Vec<Item>,
}

/// One `<item>` of an RSS channel, as found in the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    pub title: String,
    pub description: String,
    pub pub_date: String,
    pub link: String,
}

#[derive(Clone, Copy)]
enum Field {
    Title,
    Description,
    PubDate,
    Link,
}

impl Field {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"title" => Some(Field::Title),
            b"description" => Some(Field::Description),
            b"pubDate" => Some(Field::PubDate),
            b"link" => Some(Field::Link),
            _ => None,
        }
    }

    fn slot<'a>(&self, item: &'a mut Item) -> &'a mut String {
        match self {
            Field::Title => &mut item.title,
            Field::Description => &mut item.description,
            Field::PubDate => &mut item.pub_date,
            Field::Link => &mut item.link,
        }
    }
}

/// Decode an RSS document into a [`Feed`].
///
/// `None` means there was no body to read at all and is reported separately
/// from documents that fail to parse. A well-formed document without any
/// `rss/channel/item` element is [`DecodeError::EmptyFeed`].
pub fn parse<R: BufRead>(body: Option<R>) -> Result<Feed, DecodeError> {
    let body = body.ok_or(DecodeError::MissingBody)?;

    let mut reader = Reader::from_reader(body);
    reader.config_mut().trim_text(true);

    let mut feed = Feed::default();
    let mut buf = Vec::new();
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut seen_root = false;

    let mut current_item: Option<Item> = None;
    let mut current_field: Option<Field> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.name().as_ref().to_vec();
                if path.is_empty() {
                    if seen_root {
                        return Err(DecodeError::Malformed(
                            "multiple root elements".to_string(),
                        ));
                    }
                    if name != b"rss" {
                        return Err(DecodeError::Malformed(format!(
                            "expected <rss> root element, found <{}>",
                            String::from_utf8_lossy(&name)
                        )));
                    }
                    seen_root = true;
                }
                path.push(name);

                if is_item_path(&path) {
                    current_item = Some(Item::default());
                } else if path.len() == 4 && is_item_path(&path[..3]) {
                    current_field = Field::from_tag(&path[3]);
                    if let (Some(field), Some(item)) = (current_field, current_item.as_mut()) {
                        field.slot(item).clear();
                    }
                }
            }
            Ok(Event::End(_)) => {
                if is_item_path(&path) {
                    if let Some(item) = current_item.take() {
                        feed.items.push(item);
                    }
                }
                if path.len() == 4 {
                    current_field = None;
                }
                path.pop();
            }
            Ok(Event::Empty(e)) => {
                if path.is_empty() {
                    return Err(DecodeError::Malformed(format!(
                        "expected <rss> root element, found <{}/>",
                        String::from_utf8_lossy(e.name().as_ref())
                    )));
                }
                if path.len() == 2 && path[1] == b"channel" && e.name().as_ref() == b"item" {
                    feed.items.push(Item::default());
                }
            }
            Ok(Event::Text(e)) => {
                if let (Some(field), Some(item)) = (current_field, current_item.as_mut()) {
                    let text = e
                        .unescape()
                        .map_err(|err| DecodeError::Malformed(err.to_string()))?;
                    field.slot(item).push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let (Some(field), Some(item)) = (current_field, current_item.as_mut()) {
                    field.slot(item).push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(DecodeError::Malformed(format!(
                    "XML parse error at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(DecodeError::Malformed("no root element".to_string()));
    }
    if !path.is_empty() {
        return Err(DecodeError::Malformed(format!(
            "unexpected end of document inside <{}>",
            String::from_utf8_lossy(&path[path.len() - 1])
        )));
    }
    if feed.items.is_empty() {
        return Err(DecodeError::EmptyFeed);
    }

    Ok(feed)
}

fn is_item_path(path: &[Vec<u8>]) -> bool {
    path.len() == 3 && path[0] == b"rss" && path[1] == b"channel" && path[2] == b"item"
}
