//! In-text action marker parsing.
//!
//! A marker is `[Name]` or `[Name:arguments]`. Names are ASCII letters,
//! digits, `_` or `-`; arguments run to the first closing bracket and are
//! passed through untrimmed.
//!
//! ```rust
//! use pplugin::find_markers;
//!
//! let markers = find_markers("Okay! [Feed:treat] Enjoy. [not a marker]");
//! assert_eq!(markers.len(), 1);
//! assert_eq!(markers[0].name, "Feed");
//! assert_eq!(markers[0].arguments, "treat");
//! assert_eq!(markers[0].raw, "[Feed:treat]");
//! ```

use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionMarker {
    pub name: String,
    pub arguments: String,
    /// Byte range of the whole marker, brackets included.
    pub span: Range<usize>,
    pub raw: String,
}

pub fn find_markers(text: &str) -> Vec<ActionMarker> {
    let mut markers = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find('[') {
        let start = cursor + offset;
        let body_start = start + 1;

        let Some(close) = text[body_start..].find(']') else {
            break;
        };
        let end = body_start + close + 1;
        let body = &text[body_start..end - 1];

        // A nested '[' means this bracket was literal; retry from the inner one.
        if let Some(inner) = body.find('[') {
            cursor = body_start + inner;
            continue;
        }

        let (name, arguments) = match body.split_once(':') {
            Some((name, arguments)) => (name, arguments),
            None => (body, ""),
        };

        if is_marker_name(name) {
            markers.push(ActionMarker {
                name: name.to_string(),
                arguments: arguments.to_string(),
                span: start..end,
                raw: text[start..end].to_string(),
            });
        }

        cursor = end;
    }

    markers
}

fn is_marker_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
}
