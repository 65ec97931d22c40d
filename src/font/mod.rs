//! Font specifications, the font registry and the readiness wait.

pub mod book;
pub mod ready;
pub mod spec;

pub use book::{FontBook, FontData, FontFace, FontLoadStatus, FontProvider};
pub use ready::{wait_for_font, wait_for_font_polling, wait_until_ready, Readiness, WaitTimeout};
pub use spec::{is_generic_family, FontSpec, FontStyle};
