use serde::{Deserialize, Serialize};

/// Axis-aligned box in CSS pixels, as reported by the page side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// One rendered text node together with the style facts needed to decide
/// whether the user can actually see it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextNode {
    pub text: String,
    pub bounds: Rect,
    #[serde(default)]
    pub display_none: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_opacity() -> f64 {
    1.0
}

/// Everything the page side captured in one pass: the viewport box and the
/// text nodes of the document, visible or not. Filtering happens here so
/// the companion script stays dumb.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub viewport: Rect,
    pub nodes: Vec<TextNode>,
}

fn is_visible(node: &TextNode, viewport: &Rect) -> bool {
    !node.display_none
        && !node.hidden
        && node.opacity > 0.0
        && !node.bounds.is_empty()
        && node.bounds.intersects(viewport)
}

/// Concatenate the trimmed text of every visible node, separated by single
/// spaces. A node counts as visible when it is not display:none, not
/// hidden, not fully transparent, has a non-empty rendered box and
/// intersects the viewport.
pub fn extract_visible_text(snapshot: &PageSnapshot) -> String {
    snapshot
        .nodes
        .iter()
        .filter(|node| is_visible(node, &snapshot.viewport))
        .map(|node| node.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Rect {
        Rect {
            x: 0.0,
            y: 0.0,
            width: 1280.0,
            height: 720.0,
        }
    }

    fn node(text: &str, y: f64) -> TextNode {
        TextNode {
            text: text.to_string(),
            bounds: Rect {
                x: 10.0,
                y,
                width: 200.0,
                height: 20.0,
            },
            display_none: false,
            hidden: false,
            opacity: 1.0,
        }
    }

    #[test]
    fn visible_nodes_join_with_single_spaces() {
        let snapshot = PageSnapshot {
            viewport: viewport(),
            nodes: vec![node("  Hello  ", 10.0), node("world", 40.0)],
        };
        assert_eq!(extract_visible_text(&snapshot), "Hello world");
    }

    #[test]
    fn hidden_and_styled_out_nodes_are_skipped() {
        let mut display_none = node("invisible", 10.0);
        display_none.display_none = true;

        let mut hidden = node("hidden", 40.0);
        hidden.hidden = true;

        let mut transparent = node("transparent", 70.0);
        transparent.opacity = 0.0;

        let mut collapsed = node("collapsed", 100.0);
        collapsed.bounds.height = 0.0;

        let snapshot = PageSnapshot {
            viewport: viewport(),
            nodes: vec![
                display_none,
                hidden,
                transparent,
                collapsed,
                node("kept", 130.0),
            ],
        };
        assert_eq!(extract_visible_text(&snapshot), "kept");
    }

    #[test]
    fn nodes_outside_the_viewport_are_skipped() {
        let snapshot = PageSnapshot {
            viewport: viewport(),
            nodes: vec![node("above the fold", 100.0), node("below the fold", 5000.0)],
        };
        assert_eq!(extract_visible_text(&snapshot), "above the fold");
    }

    #[test]
    fn whitespace_only_nodes_contribute_nothing() {
        let snapshot = PageSnapshot {
            viewport: viewport(),
            nodes: vec![node("   ", 10.0), node("content", 40.0)],
        };
        assert_eq!(extract_visible_text(&snapshot), "content");
    }

    #[test]
    fn empty_page_extracts_to_empty_string() {
        let snapshot = PageSnapshot {
            viewport: viewport(),
            nodes: vec![],
        };
        assert_eq!(extract_visible_text(&snapshot), "");
    }
}
