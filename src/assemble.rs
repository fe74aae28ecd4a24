use crate::classify::classify;
use crate::context::PageContext;
use crate::models::{ClassifiedLine, Document};

/// What a completed page turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Document(Document),
    /// The body carried a `#REDIRECT` marker; nothing is indexed.
    Redirect { title: String },
}

/// Folds classified lines into a [`Document`], or `None` for a redirect page.
///
/// Later short descriptions and coordinates replace earlier ones. Categories
/// keep encounter order and duplicates.
pub fn assemble<I>(page: &PageContext, lines: I) -> Option<Document>
where
    I: IntoIterator<Item = ClassifiedLine>,
{
    let mut short_description = None;
    let mut coordinates = None;
    let mut categories = Vec::new();
    let mut content: Vec<String> = Vec::new();

    for line in lines {
        match line {
            ClassifiedLine::Redirect => return None,
            ClassifiedLine::ShortDescription(text) => short_description = Some(text),
            ClassifiedLine::Coordinates(text) => coordinates = Some(text),
            ClassifiedLine::Category(name) => categories.push(name),
            ClassifiedLine::Noise => {}
            ClassifiedLine::Content(text) => content.push(text),
        }
    }

    let title = page.title_or_empty().to_string();
    Some(Document {
        title_keyword: title.clone(),
        title,
        wiki_id: page.wiki_id.clone(),
        short_description,
        coordinates,
        categories,
        content: content.join("\n"),
        complete_text: page.raw_text.clone(),
    })
}

/// Classifies and assembles one completed page.
pub fn extract_page(page: &PageContext) -> PageOutcome {
    match assemble(page, classify(&page.raw_text)) {
        Some(doc) => PageOutcome::Document(doc),
        None => PageOutcome::Redirect {
            title: page.title_or_empty().to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(title: &str, id: &str, text: &str) -> PageContext {
        PageContext {
            title: Some(title.to_string()),
            wiki_id: id.to_string(),
            raw_text: text.to_string(),
        }
    }

    fn doc(outcome: PageOutcome) -> Document {
        match outcome {
            PageOutcome::Document(doc) => doc,
            PageOutcome::Redirect { title } => panic!("unexpected redirect for {title}"),
        }
    }

    #[test]
    fn assembles_all_fields() {
        let text = "{{short description|A thing}}\n{{Infobox\n| coordinates = {{1|2}}\n}}\nHello\n* list\nWorld\n[[Category:Science]]";
        let d = doc(extract_page(&page("Foo", "7", text)));
        assert_eq!(d.title, "Foo");
        assert_eq!(d.title_keyword, "Foo");
        assert_eq!(d.wiki_id, "7");
        assert_eq!(d.short_description.as_deref(), Some("A thing"));
        assert_eq!(d.coordinates.as_deref(), Some("1|2"));
        assert_eq!(d.categories, vec!["Science"]);
        assert_eq!(d.content, "}}\nHello\nWorld");
        assert_eq!(d.complete_text, text);
    }

    #[test]
    fn redirect_anywhere_skips_page() {
        let p = page("Old", "3", "Some text\n[[Category:X]]\n#REDIRECT [[New]]\nMore");
        assert_eq!(
            extract_page(&p),
            PageOutcome::Redirect {
                title: "Old".to_string()
            }
        );
        assert_eq!(assemble(&p, classify(&p.raw_text)), None);
    }

    #[test]
    fn last_short_description_wins() {
        let p = page(
            "T",
            "1",
            "{{short description|first}}\n{{short description|second}}",
        );
        assert_eq!(
            doc(extract_page(&p)).short_description.as_deref(),
            Some("second")
        );
    }

    #[test]
    fn later_coordinates_override_earlier() {
        let p = page("T", "1", "| coordinates = {{1|2}}\n{{coord|3|4}}");
        assert_eq!(doc(extract_page(&p)).coordinates.as_deref(), Some("3|4"));

        let p = page("T", "1", "{{coord|3|4}}\n| coordinates = {{1|2}}");
        assert_eq!(doc(extract_page(&p)).coordinates.as_deref(), Some("1|2"));
    }

    #[test]
    fn categories_keep_order_and_duplicates() {
        let p = page(
            "T",
            "1",
            "[[Category:B]]\n[[Category:A]]\n[[Category:B]]",
        );
        assert_eq!(doc(extract_page(&p)).categories, vec!["B", "A", "B"]);
    }

    #[test]
    fn empty_body_gives_empty_document() {
        let d = doc(extract_page(&page("Empty", "9", "")));
        assert_eq!(d.content, "");
        assert!(d.categories.is_empty());
        assert_eq!(d.short_description, None);
        assert_eq!(d.coordinates, None);
    }

    #[test]
    fn missing_title_becomes_empty_string() {
        let p = PageContext {
            title: None,
            wiki_id: "5".to_string(),
            raw_text: "Body".to_string(),
        };
        let d = doc(extract_page(&p));
        assert_eq!(d.title, "");
        assert_eq!(d.title_keyword, "");
    }

    #[test]
    fn serializes_with_legacy_text_key() {
        let d = doc(extract_page(&page("Foo", "1", "Hello")));
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["text"], "Hello");
        assert_eq!(json["title_keyword"], "Foo");
        assert!(json.get("short_description").is_none());
        assert!(json.get("coordinates").is_none());
    }
}
