//! Element context tracking and text accumulation for the page stream.
//!
//! [`PageState`] is a plain value threaded through [`PageState::step`]: every
//! event consumes the previous state and returns the next one together with a
//! [`ContextDelta`]. "Inside X" questions are answered from an explicit stack
//! of open element names, so an element name reused at another depth (the
//! page `id` versus the revision and contributor `id`s) cannot be confused.

use crate::models::ParseEvent;
use tracing::debug;

const PAGE: &str = "page";
const TITLE: &str = "title";
const ID: &str = "id";
const REVISION: &str = "revision";
const TEXT: &str = "text";

/// Text collected for the page that is currently open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContext {
    pub title: Option<String>,
    pub wiki_id: String,
    pub raw_text: String,
}

impl PageContext {
    pub fn title_or_empty(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ContextDelta {
    Continue,
    /// A `page` element closed; carries everything accumulated for it.
    PageComplete(PageContext),
}

#[derive(Debug, Clone, Default)]
pub struct PageState {
    stack: Vec<String>,
    page: PageContext,
    text_elements_seen: u64,
}

impl PageState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, event: &ParseEvent) -> (Self, ContextDelta) {
        let delta = match event {
            ParseEvent::ElementStart { name, .. } => {
                self.open(name);
                ContextDelta::Continue
            }
            ParseEvent::ElementEnd { name } => self.close(name),
            ParseEvent::Text(chunk) => {
                self.accumulate(chunk);
                ContextDelta::Continue
            }
        };
        (self, delta)
    }

    fn open(&mut self, name: &str) {
        match name {
            PAGE => {
                if let Some(outer) = self.stack.iter().position(|n| n == PAGE) {
                    debug!(
                        title = self.page.title_or_empty(),
                        "Page opened inside another page, discarding the partial page"
                    );
                    self.stack.truncate(outer);
                }
                self.page = PageContext::default();
            }
            TEXT if self.inside_page() => self.text_elements_seen += 1,
            _ => {}
        }
        self.stack.push(name.to_string());
    }

    fn close(&mut self, name: &str) -> ContextDelta {
        let Some(pos) = self.stack.iter().rposition(|n| n == name) else {
            return ContextDelta::Continue;
        };
        self.stack.truncate(pos);

        if name == PAGE {
            return ContextDelta::PageComplete(std::mem::take(&mut self.page));
        }
        if !self.inside_page() && self.page != PageContext::default() {
            // An ancestor of the page closed before the page itself did.
            self.page = PageContext::default();
        }
        ContextDelta::Continue
    }

    fn accumulate(&mut self, chunk: &str) {
        if self.inside_title() {
            self.page
                .title
                .get_or_insert_with(String::new)
                .push_str(chunk);
        } else if self.inside_page_id() {
            self.page.wiki_id.push_str(chunk);
        } else if self.inside_text() {
            self.page.raw_text.push_str(chunk);
        }
    }

    fn innermost(&self) -> Option<&str> {
        self.stack.last().map(String::as_str)
    }

    fn parent(&self) -> Option<&str> {
        self.stack
            .len()
            .checked_sub(2)
            .map(|i| self.stack[i].as_str())
    }

    pub fn inside_page(&self) -> bool {
        self.stack.iter().any(|n| n == PAGE)
    }

    pub fn inside_title(&self) -> bool {
        self.innermost() == Some(TITLE) && self.inside_page()
    }

    pub fn inside_revision(&self) -> bool {
        self.inside_page() && self.stack.iter().any(|n| n == REVISION)
    }

    /// True only for an `id` that is a direct child of `page`.
    pub fn inside_page_id(&self) -> bool {
        self.innermost() == Some(ID) && self.parent() == Some(PAGE)
    }

    pub fn inside_text(&self) -> bool {
        self.innermost() == Some(TEXT) && self.inside_page()
    }

    pub fn page(&self) -> &PageContext {
        &self.page
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Number of `text` elements opened inside pages over the whole stream.
    pub fn text_elements_seen(&self) -> u64 {
        self.text_elements_seen
    }
}
