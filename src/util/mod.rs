//! Small helpers shared by the gateway and the CLI.
//!
//! - **URL validation**: base URL checks for the content API
//! - **Text**: flattening API text to one terminal line and width-aware truncation

mod text;
mod url_validator;

pub use text::{display_width, single_line, truncate_to_width};
pub use url_validator::{validate_base_url, UrlValidationError};
