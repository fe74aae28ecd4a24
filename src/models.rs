use serde::{Deserialize, Serialize};

/// One event from the streaming tokenizer, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseEvent {
    ElementStart {
        name: String,
        attributes: Vec<(String, String)>,
    },
    ElementEnd {
        name: String,
    },
    Text(String),
}

impl ParseEvent {
    pub fn start(name: &str) -> Self {
        ParseEvent::ElementStart {
            name: name.to_string(),
            attributes: Vec::new(),
        }
    }

    pub fn end(name: &str) -> Self {
        ParseEvent::ElementEnd {
            name: name.to_string(),
        }
    }

    pub fn text(chunk: &str) -> Self {
        ParseEvent::Text(chunk.to_string())
    }
}

/// Classification of a single wikitext body line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedLine {
    Redirect,
    ShortDescription(String),
    Coordinates(String),
    Category(String),
    Noise,
    Content(String),
}

/// The indexed record for one non-redirect page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    /// Same value as `title`, mapped as a keyword field for exact matches.
    pub title_keyword: String,
    pub wiki_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<String>,
    pub categories: Vec<String>,
    #[serde(rename = "text")]
    pub content: String,
    pub complete_text: String,
}
