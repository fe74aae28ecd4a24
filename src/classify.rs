use crate::models::ClassifiedLine;
use once_cell::sync::Lazy;
use regex::Regex;

const REDIRECT_PREFIX: &str = "#REDIRECT";
const SHORT_DESCRIPTION_PREFIX: &str = "{{short description|";
const CATEGORY_PREFIX: &str = "[[Category:";
const NOISE_PREFIXES: [&str; 3] = ["{{", "|", "*"];

/// `coordinates = {{...}}` anywhere on the line, typically an infobox field.
static COORDINATES_FIELD_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"coordinates\s*=\s*\{\{(.*)\}\}").unwrap());

/// A line opening with a `{{coord|...}}` template, any case.
static COORD_TEMPLATE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\{\{coord\|(.*)\}\}").unwrap());

/// Lazy single-pass iterator over the classified lines of one page body.
pub struct LineClassifier<'a> {
    lines: BodyLines<'a>,
    redirected: bool,
}

/// Classifies the lines of a page body, lazily and in order.
///
/// One item is produced per input line until a redirect marker is seen; the
/// redirect is yielded and the rest of the body is never examined.
pub fn classify(raw_text: &str) -> LineClassifier<'_> {
    LineClassifier {
        lines: BodyLines { rest: raw_text },
        redirected: false,
    }
}

/// Splits on `\n`, `\r\n` and a lone `\r`. A trailing break adds no empty line.
struct BodyLines<'a> {
    rest: &'a str,
}

impl<'a> Iterator for BodyLines<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.rest.is_empty() {
            return None;
        }
        let Some(pos) = self.rest.find(['\r', '\n']) else {
            return Some(std::mem::take(&mut self.rest));
        };
        let line = &self.rest[..pos];
        let skip = if self.rest[pos..].starts_with("\r\n") { 2 } else { 1 };
        self.rest = &self.rest[pos + skip..];
        Some(line)
    }
}

impl Iterator for LineClassifier<'_> {
    type Item = ClassifiedLine;

    fn next(&mut self) -> Option<Self::Item> {
        if self.redirected {
            return None;
        }
        let line = classify_line(self.lines.next()?);
        if line == ClassifiedLine::Redirect {
            self.redirected = true;
        }
        Some(line)
    }
}

pub fn classify_line(line: &str) -> ClassifiedLine {
    let trimmed = line.trim();

    if trimmed.starts_with(REDIRECT_PREFIX) {
        return ClassifiedLine::Redirect;
    }
    if let Some(rest) = trimmed.strip_prefix(SHORT_DESCRIPTION_PREFIX) {
        return ClassifiedLine::ShortDescription(drop_last_chars(rest, 2).to_string());
    }
    if let Some(caps) = COORDINATES_FIELD_REGEX.captures(trimmed) {
        return ClassifiedLine::Coordinates(caps[1].to_string());
    }
    if let Some(caps) = COORD_TEMPLATE_REGEX.captures(trimmed) {
        return ClassifiedLine::Coordinates(caps[1].to_string());
    }
    if NOISE_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
        return ClassifiedLine::Noise;
    }
    if let Some(rest) = trimmed.strip_prefix(CATEGORY_PREFIX) {
        return ClassifiedLine::Category(drop_last_chars(rest, 2).to_string());
    }
    ClassifiedLine::Content(trimmed.to_string())
}

/// Removes `n` trailing characters, or everything if there are fewer.
fn drop_last_chars(s: &str, n: usize) -> &str {
    match s.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &s[..idx],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ClassifiedLine::*;

    fn all(text: &str) -> Vec<ClassifiedLine> {
        classify(text).collect()
    }

    #[test]
    fn short_description() {
        assert_eq!(
            classify_line("{{short description|A test page}}"),
            ShortDescription("A test page".to_string())
        );
    }

    #[test]
    fn short_description_with_surrounding_whitespace() {
        assert_eq!(
            classify_line("   {{short description|Indented}}  "),
            ShortDescription("Indented".to_string())
        );
    }

    #[test]
    fn short_description_too_short_is_empty() {
        assert_eq!(
            classify_line("{{short description|}"),
            ShortDescription(String::new())
        );
    }

    #[test]
    fn short_description_is_case_sensitive() {
        // Capitalised form is an ordinary template line.
        assert_eq!(classify_line("{{Short description|Thing}}"), Noise);
    }

    #[test]
    fn category() {
        assert_eq!(
            classify_line("[[Category:Physics]]"),
            Category("Physics".to_string())
        );
    }

    #[test]
    fn category_keeps_sort_key() {
        assert_eq!(
            classify_line("[[Category:People|Smith, John]]"),
            Category("People|Smith, John".to_string())
        );
    }

    #[test]
    fn category_non_ascii() {
        assert_eq!(
            classify_line("[[Category:Städte in Österreich]]"),
            Category("Städte in Österreich".to_string())
        );
    }

    #[test]
    fn coordinates_field() {
        assert_eq!(
            classify_line("| coordinates = {{41.9|12.5}}"),
            Coordinates("41.9|12.5".to_string())
        );
    }

    #[test]
    fn coordinates_field_without_spaces() {
        assert_eq!(
            classify_line("|coordinates={{coord|1|2|display=inline}}"),
            Coordinates("coord|1|2|display=inline".to_string())
        );
    }

    #[test]
    fn coordinates_field_key_is_case_sensitive() {
        assert_eq!(classify_line("| Coordinates = {{41.9|12.5}}"), Noise);
    }

    #[test]
    fn coord_template_any_case() {
        assert_eq!(
            classify_line("{{Coord|51|30|N|0|7|W}}"),
            Coordinates("51|30|N|0|7|W".to_string())
        );
        assert_eq!(
            classify_line("{{coord|1|2}}"),
            Coordinates("1|2".to_string())
        );
    }

    #[test]
    fn coord_template_not_at_start_is_content() {
        assert_eq!(
            classify_line("Located at {{coord|1|2}}"),
            Content("Located at {{coord|1|2}}".to_string())
        );
    }

    #[test]
    fn noise_lines() {
        assert_eq!(classify_line("{{Infobox person"), Noise);
        assert_eq!(classify_line("| name = Foo"), Noise);
        assert_eq!(classify_line("* [[Rust]]"), Noise);
        assert_eq!(classify_line("  }}"), Content("}}".to_string()));
    }

    #[test]
    fn content_is_trimmed() {
        assert_eq!(
            classify_line("  Hello world \t"),
            Content("Hello world".to_string())
        );
        assert_eq!(classify_line(""), Content(String::new()));
    }

    #[test]
    fn redirect_stops_scan() {
        let lines = all("#REDIRECT [[Foo]]\n[[Category:Never]]\nText");
        assert_eq!(lines, vec![Redirect]);
    }

    #[test]
    fn redirect_after_content() {
        let lines = all("Intro\n  #REDIRECT [[Foo]]\nTail");
        assert_eq!(lines, vec![Content("Intro".to_string()), Redirect]);
    }

    #[test]
    fn lowercase_redirect_is_content() {
        assert_eq!(
            classify_line("#redirect [[Foo]]"),
            Content("#redirect [[Foo]]".to_string())
        );
    }

    #[test]
    fn one_output_per_line_in_order() {
        let text = "{{short description|Thing}}\nHello\r\n[[Category:A]]\n* item\nWorld";
        assert_eq!(
            all(text),
            vec![
                ShortDescription("Thing".to_string()),
                Content("Hello".to_string()),
                Category("A".to_string()),
                Noise,
                Content("World".to_string()),
            ]
        );
    }

    #[test]
    fn classification_is_deterministic() {
        let text = "{{coord|1|2}}\nBody\n[[Category:X]]\n[[Category:X]]";
        assert_eq!(all(text), all(text));
    }

    #[test]
    fn lone_carriage_return_breaks_lines() {
        assert_eq!(
            all("Hello\r[[Category:X]]"),
            vec![Content("Hello".to_string()), Category("X".to_string())]
        );
    }

    #[test]
    fn mixed_line_endings() {
        let lines: Vec<&str> = BodyLines {
            rest: "a\r\nb\nc\rd\n\ne\n",
        }
        .collect();
        assert_eq!(lines, vec!["a", "b", "c", "d", "", "e"]);
    }

    #[test]
    fn empty_body_yields_nothing() {
        assert!(all("").is_empty());
    }
}
