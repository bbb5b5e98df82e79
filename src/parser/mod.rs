pub mod name;

pub use name::{NameParser, ParseError, clean_series_name};
