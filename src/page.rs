//! The result display and the markup written into it.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::rendering::Composite;

pub const PROGRESS_MESSAGE: &str = "画像を生成中です...";
pub const FONT_FAILURE_MESSAGE: &str = "フォントの読み込みに失敗しました。";
pub const FONT_FAILURE_ALERT: &str =
    "フォントの読み込みに失敗しました。ページを再読み込みするか、ネットワーク接続を確認してください。";
pub const ASSET_FAILURE_MESSAGE: &str = "背景画像の読み込みに失敗しました。";
pub const EXPORT_FAILURE_MESSAGE: &str = "画像の書き出しに失敗しました。";

#[derive(Debug, Default)]
struct ResultState {
    html: String,
    alerts: Vec<String>,
}

/// Handle to the result display region. Clones share the same region;
/// every `replace` overwrites whatever was there before.
#[derive(Debug, Clone, Default)]
pub struct ResultArea {
    inner: Arc<Mutex<ResultState>>,
}

impl ResultArea {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&self, html: impl Into<String>) {
        self.lock().html = html.into();
    }

    pub fn html(&self) -> String {
        self.lock().html.clone()
    }

    /// Raise a blocking alert for the user.
    pub fn alert(&self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("alert: {message}");
        self.lock().alerts.push(message);
    }

    pub fn alerts(&self) -> Vec<String> {
        self.lock().alerts.clone()
    }

    /// Drain the alerts raised so far.
    pub fn take_alerts(&self) -> Vec<String> {
        std::mem::take(&mut self.lock().alerts)
    }

    fn lock(&self) -> MutexGuard<'_, ResultState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub fn progress_markup() -> String {
    format!("<p>{PROGRESS_MESSAGE}</p>")
}

pub fn failure_markup(message: &str) -> String {
    format!("<p>{}</p>", html_escape::encode_text(message))
}

pub fn asset_failure_alert(location: &str) -> String {
    format!(
        "背景画像の読み込みに失敗しました。\n`{location}` のパスが正しいか、ファイルが存在するか確認してください。"
    )
}

pub fn success_markup(composite: &Composite) -> String {
    format!(
        r#"
  <p>画像の生成完了！画像を長押しか右クリックで保存してください。</p>
  <img src="{src}" alt="生成された画像">
  <a href="{href}" class="btn-x" target="_blank" rel="noopener noreferrer">
    Xに投稿する
  </a>
  <p class="small-text">※ Xに投稿するボタンを押した後、<br>保存した画像を投稿画面で添付してください。</p>
"#,
        src = html_escape::encode_double_quoted_attribute(&composite.data_url),
        href = html_escape::encode_double_quoted_attribute(&composite.intent_url),
    )
}

/// Wrap result markup in a standalone document.
pub fn render_document(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"ja\">\n<head>\n<meta charset=\"utf-8\">\n<title>富士ヒル 参加画像</title>\n</head>\n<body>\n<div id=\"result\">{body}</div>\n</body>\n</html>\n"
    )
}
