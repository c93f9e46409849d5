pub mod bridge;
pub mod extractor;
pub mod scheduler;

pub use bridge::{PageBridge, TabEvent};
pub use extractor::{extract_visible_text, PageSnapshot, Rect, TextNode};
pub use scheduler::{ExtractedContent, PageAccessor, ScanScheduler, TabId};
