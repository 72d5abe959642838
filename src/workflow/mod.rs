//! 流程层：一个网页从导航到打印 PDF 的完整流程

pub mod page_render;
pub mod popups;
pub mod scripts;
pub mod scroll;

pub use page_render::{ChromeRenderer, PageRenderer, RenderOutcome};
pub use scroll::{scroll_until_stable, ScrollOutcome, ScrollSettings};
