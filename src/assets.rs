//! Client files, compiled into the binary.

pub const INDEX_HTML: &str = include_str!("../frontend/index.html");
pub const APP_JS: &str = include_str!("../frontend/app.js");
pub const STYLE_CSS: &str = include_str!("../frontend/style.css");
