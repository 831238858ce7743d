//! レビューセッション（画面をまたいで共有する解析状態）
//!
//! 暗黙のグローバル状態にはせず、アプリの最上位で1つ生成して明示的に渡す。
//! 寿命は生成元（Webでは `App`、CLIでは1コマンド）と同じ。

use crate::diagnosis::DiagnosisResult;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewSession {
    current_image: Option<String>,
    analysis: Option<DiagnosisResult>,
    is_analyzing: bool,
    error: Option<String>,
}

impl ReviewSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_image(&self) -> Option<&str> {
        self.current_image.as_deref()
    }

    pub fn analysis(&self) -> Option<&DiagnosisResult> {
        self.analysis.as_ref()
    }

    pub fn is_analyzing(&self) -> bool {
        self.is_analyzing
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_current_image(&mut self, url: Option<String>) {
        self.current_image = url;
    }

    /// 診断結果を丸ごと差し替える
    pub fn set_analysis(&mut self, result: Option<DiagnosisResult>) {
        self.analysis = result;
    }

    pub fn set_analyzing(&mut self, analyzing: bool) {
        self.is_analyzing = analyzing;
    }

    /// 解析開始（前回のエラーは消す）
    pub fn begin_analysis(&mut self) {
        self.is_analyzing = true;
        self.error = None;
    }

    /// 解析完了。結果に画像URLがあれば表示画像も更新する
    pub fn finish_analysis(&mut self, result: DiagnosisResult) {
        if let Some(url) = &result.details.image_url {
            self.current_image = Some(url.clone());
        }
        self.analysis = Some(result);
        self.is_analyzing = false;
    }

    pub fn fail_analysis(&mut self, message: impl Into<String>) {
        self.analysis = None;
        self.is_analyzing = false;
        self.error = Some(message.into());
    }

    /// 新規スキャン用に初期化
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::DiagnosisDetails;

    fn result_with_url(url: Option<&str>) -> DiagnosisResult {
        DiagnosisResult {
            image_id: "i".into(),
            details: DiagnosisDetails {
                image_url: url.map(str::to_string),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_finish_sets_image_from_result() {
        let mut s = ReviewSession::new();
        s.begin_analysis();
        assert!(s.is_analyzing());
        s.finish_analysis(result_with_url(Some("/uploads/i.png")));
        assert!(!s.is_analyzing());
        assert_eq!(s.current_image(), Some("/uploads/i.png"));
        assert!(s.analysis().is_some());
    }

    #[test]
    fn test_finish_without_url_keeps_preview() {
        let mut s = ReviewSession::new();
        s.set_current_image(Some("blob:local".into()));
        s.finish_analysis(result_with_url(None));
        assert_eq!(s.current_image(), Some("blob:local"));
    }

    #[test]
    fn test_fail_clears_analysis() {
        let mut s = ReviewSession::new();
        s.finish_analysis(result_with_url(None));
        s.begin_analysis();
        s.fail_analysis("Analysis failed. Please try again.");
        assert!(s.analysis().is_none());
        assert!(!s.is_analyzing());
        assert_eq!(s.error(), Some("Analysis failed. Please try again."));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut s = ReviewSession::new();
        s.set_current_image(Some("x".into()));
        s.finish_analysis(result_with_url(Some("y")));
        s.set_analyzing(true);
        s.reset();
        assert_eq!(s, ReviewSession::default());
    }
}
