pub mod errors;
pub mod url_parser;

pub use errors::ParseError;
pub use url_parser::{TikTokUrl, UrlParser};
