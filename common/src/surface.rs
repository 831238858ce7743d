//! ビューア表示面の構成
//!
//! 単一表示か分割表示か、各ペインの幅・ラベル・アノテーション描画の有無を決める。
//! 画像の非同期読み込みは [`LoadSlot`] で世代管理し、古い読み込み結果は捨てる。

use crate::annotation::{overlays, Annotation, OverlayGeometry};
use crate::view_state::ViewState;

pub const STAGE_WIDTH: f64 = 800.0;
pub const STAGE_HEIGHT: f64 = 600.0;

pub const PRIMARY_LABEL: &str = "Patient Scan";
pub const COMPARISON_LABEL: &str = "Reference Normal";
pub const NO_PREVIEW_TEXT: &str = "No preview available";

/// ステージサイズ
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stage {
    pub width: f64,
    pub height: f64,
}

impl Default for Stage {
    fn default() -> Self {
        Self {
            width: STAGE_WIDTH,
            height: STAGE_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneRole {
    Primary,
    Comparison,
}

/// 1ペインの構成
#[derive(Debug, Clone, PartialEq)]
pub struct PaneSpec {
    pub role: PaneRole,
    pub width: f64,
    pub height: f64,
    /// 分割表示時のみ
    pub label: Option<&'static str>,
    pub draws_annotations: bool,
}

/// 表示面全体の構成
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceLayout {
    pub panes: Vec<PaneSpec>,
    pub stage: Stage,
}

impl SurfaceLayout {
    pub fn compute(state: &ViewState, has_comparison: bool, stage: Stage) -> Self {
        let split = state.split_view_enabled && has_comparison;
        let pane_width = if split { stage.width / 2.0 } else { stage.width };

        let mut panes = vec![PaneSpec {
            role: PaneRole::Primary,
            width: pane_width,
            height: stage.height,
            label: split.then_some(PRIMARY_LABEL),
            draws_annotations: state.annotations_visible,
        }];

        if split {
            panes.push(PaneSpec {
                role: PaneRole::Comparison,
                width: pane_width,
                height: stage.height,
                label: Some(COMPARISON_LABEL),
                draws_annotations: false,
            });
        }

        Self { panes, stage }
    }

    pub fn is_split(&self) -> bool {
        self.panes.len() > 1
    }

    pub fn primary(&self) -> &PaneSpec {
        &self.panes[0]
    }

    /// 一次ペインに描くオーバーレイ
    ///
    /// 画像はステージと同じ大きさで描くので、座標変換もステージ寸法で行う。
    pub fn primary_overlays(&self, annotations: &[Annotation], state: &ViewState) -> Vec<OverlayGeometry> {
        if !self.primary().draws_annotations {
            return Vec::new();
        }
        overlays(annotations, self.stage.width, self.stage.height, state.scale)
    }
}

/// 画像読み込み状態
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Empty,
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            LoadState::Ready(v) => Some(v),
            _ => None,
        }
    }

    /// プレースホルダ表示が必要
    pub fn shows_placeholder(&self) -> bool {
        matches!(self, LoadState::Failed(_))
    }
}

/// 読み込み要求の識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// 世代付きの読み込みスロット
///
/// `begin` のたびに世代が進み、古いチケットでの `complete` は無視される。
/// 読み込み自体は中断しない。
#[derive(Debug, Clone)]
pub struct LoadSlot<T> {
    generation: u64,
    url: Option<String>,
    state: LoadState<T>,
}

impl<T> Default for LoadSlot<T> {
    fn default() -> Self {
        Self {
            generation: 0,
            url: None,
            state: LoadState::Empty,
        }
    }
}

impl<T> LoadSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, url: &str) -> LoadTicket {
        self.generation += 1;
        self.url = Some(url.to_string());
        self.state = LoadState::Loading;
        LoadTicket(self.generation)
    }

    /// 結果を反映。現行の要求でなければ `false` を返して捨てる
    pub fn complete(&mut self, ticket: LoadTicket, outcome: std::result::Result<T, String>) -> bool {
        if ticket.0 != self.generation {
            tracing::debug!(stale = ticket.0, current = self.generation, "discarding stale image load");
            return false;
        }
        self.state = match outcome {
            Ok(v) => LoadState::Ready(v),
            Err(e) => LoadState::Failed(e),
        };
        true
    }

    /// アンマウント時。以降の完了通知はすべて捨てられる
    pub fn clear(&mut self) {
        self.generation += 1;
        self.url = None;
        self.state = LoadState::Empty;
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn state(&self) -> &LoadState<T> {
        &self.state
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view_state::ViewStateController;

    fn annotation() -> Annotation {
        Annotation {
            label: "Mass".into(),
            coordinates: [100.0, 200.0, 300.0, 400.0],
            confidence: 0.9,
            explanation: None,
        }
    }

    #[test]
    fn test_single_pane_by_default() {
        let layout = SurfaceLayout::compute(&ViewState::default(), true, Stage::default());
        assert!(!layout.is_split());
        assert_eq!(layout.primary().width, 800.0);
        assert_eq!(layout.primary().label, None);
        assert!(layout.primary().draws_annotations);
    }

    #[test]
    fn test_split_halves_width_and_labels_panes() {
        let mut c = ViewStateController::new(true);
        c.toggle_split_view();
        let layout = SurfaceLayout::compute(c.state(), true, Stage::default());

        assert!(layout.is_split());
        assert_eq!(layout.panes[0].width, 400.0);
        assert_eq!(layout.panes[1].width, 400.0);
        assert_eq!(layout.panes[0].label, Some(PRIMARY_LABEL));
        assert_eq!(layout.panes[1].label, Some(COMPARISON_LABEL));
        assert!(layout.panes[0].draws_annotations);
        assert!(!layout.panes[1].draws_annotations);
    }

    #[test]
    fn test_split_flag_without_comparison_url_renders_single() {
        let state = ViewState {
            split_view_enabled: true,
            ..ViewState::default()
        };
        let layout = SurfaceLayout::compute(&state, false, Stage::default());
        assert!(!layout.is_split());
    }

    #[test]
    fn test_hidden_annotations_produce_no_overlays() {
        let mut c = ViewStateController::new(false);
        let annotations = vec![annotation()];

        let layout = SurfaceLayout::compute(c.state(), false, Stage::default());
        assert_eq!(layout.primary_overlays(&annotations, c.state()).len(), 1);

        c.toggle_annotations();
        let layout = SurfaceLayout::compute(c.state(), false, Stage::default());
        assert!(layout.primary_overlays(&annotations, c.state()).is_empty());
    }

    #[test]
    fn test_overlays_use_stage_extent() {
        let state = ViewState::default();
        let layout = SurfaceLayout::compute(&state, false, Stage::default());
        let o = &layout.primary_overlays(&[annotation()], &state)[0];
        assert_eq!(o.rect.x, 160.0);
        assert_eq!(o.rect.y, 60.0);
    }

    #[test]
    fn test_load_slot_accepts_current() {
        let mut slot: LoadSlot<u32> = LoadSlot::new();
        let t = slot.begin("a.png");
        assert_eq!(slot.state(), &LoadState::Loading);
        assert!(slot.complete(t, Ok(7)));
        assert_eq!(slot.state().ready(), Some(&7));
    }

    #[test]
    fn test_load_slot_discards_stale() {
        let mut slot: LoadSlot<u32> = LoadSlot::new();
        let old = slot.begin("a.png");
        let new = slot.begin("b.png");

        assert!(!slot.complete(old, Ok(1)));
        assert_eq!(slot.state(), &LoadState::Loading);
        assert!(slot.complete(new, Ok(2)));
        assert_eq!(slot.url(), Some("b.png"));
        assert_eq!(slot.state().ready(), Some(&2));
    }

    #[test]
    fn test_load_slot_after_clear() {
        let mut slot: LoadSlot<u32> = LoadSlot::new();
        let t = slot.begin("a.png");
        slot.clear();
        assert!(!slot.complete(t, Ok(1)));
        assert_eq!(slot.state(), &LoadState::Empty);
    }

    #[test]
    fn test_load_failure_shows_placeholder() {
        let mut slot: LoadSlot<u32> = LoadSlot::new();
        let t = slot.begin("broken.png");
        slot.complete(t, Err("decode failed".into()));
        assert!(slot.state().shows_placeholder());
    }
}
