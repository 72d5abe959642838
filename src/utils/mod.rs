pub mod logging;
pub mod urls;

pub use urls::{normalize_url, parse_url_list, read_url_file};
