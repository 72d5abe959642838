pub mod session;

pub use session::{launch_headless_browser, BrowserOptions, BrowserSession};
