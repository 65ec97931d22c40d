//! Share-intent link for posting about a generated card.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::ShareConfig;

/// Everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`, matching
/// `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_uri_component(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}

/// The post text, before encoding.
pub fn status_text(wave: &str, goal: &str) -> String {
    format!("富士ヒルに参加します！{wave}スタートです！{goal}目指して頑張ります！")
}

/// `{endpoint}?text=..&url=..&hashtags=..`, each parameter encoded on its own.
pub fn intent_url(share: &ShareConfig, wave: &str, goal: &str) -> String {
    format!(
        "{}?text={}&url={}&hashtags={}",
        share.endpoint,
        encode_uri_component(&status_text(wave, goal)),
        encode_uri_component(&share.page_url),
        encode_uri_component(&share.hashtags),
    )
}
