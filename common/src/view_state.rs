//! ビューア表示状態（ズーム・パン・明るさ・コントラスト・ツール）
//!
//! 状態はビューアのインスタンスごとに持ち、永続化しない。
//! 変更操作は再描画の種類（[`Repaint`]）を返す。明るさ/コントラストの変更だけが
//! 画素の再フィルタを要求し、ズームやパンは変換の更新だけで済む。

use serde::{Deserialize, Serialize};

pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 5.0;
pub const ZOOM_STEP: f64 = 0.25;

pub const MIN_BRIGHTNESS: f64 = -0.5;
pub const MAX_BRIGHTNESS: f64 = 0.5;
pub const MIN_CONTRAST: f64 = -50.0;
pub const MAX_CONTRAST: f64 = 50.0;

/// ステージ座標の点
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// 操作ツール
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Pan,
    Ruler,
    None,
}

/// 変更後に必要な再描画
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Repaint {
    /// 変化なし
    None,
    /// 変換（拡大率・位置）やオーバーレイだけ更新
    Transform,
    /// 画素バッファを再フィルタ
    Refilter,
}

impl Repaint {
    pub fn needs_refilter(self) -> bool {
        self == Repaint::Refilter
    }
}

/// 表示状態
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub scale: f64,
    pub position: Point,
    pub brightness: f64,
    pub contrast: f64,
    pub active_tool: Tool,
    pub annotations_visible: bool,
    pub split_view_enabled: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            position: Point::default(),
            brightness: 0.0,
            contrast: 0.0,
            active_tool: Tool::Pan,
            annotations_visible: true,
            split_view_enabled: false,
        }
    }
}

impl ViewState {
    /// ステージ座標を画像座標へ逆変換
    pub fn screen_to_image(&self, p: Point) -> Point {
        Point {
            x: (p.x - self.position.x) / self.scale,
            y: (p.y - self.position.y) / self.scale,
        }
    }

    /// 画像座標をステージ座標へ変換
    pub fn image_to_screen(&self, p: Point) -> Point {
        Point {
            x: p.x * self.scale + self.position.x,
            y: p.y * self.scale + self.position.y,
        }
    }

    /// ツールバー表示用のズーム率
    pub fn zoom_percent(&self) -> i64 {
        (self.scale * 100.0).round() as i64
    }

    /// ステージのドラッグ可否
    pub fn is_draggable(&self) -> bool {
        self.active_tool == Tool::Pan
    }

    /// CSS transform 文字列
    pub fn css_transform(&self) -> String {
        format!(
            "translate({}px, {}px) scale({})",
            self.position.x, self.position.y, self.scale
        )
    }
}

/// 表示状態コントローラ
#[derive(Debug, Clone)]
pub struct ViewStateController {
    state: ViewState,
    has_comparison: bool,
}

impl ViewStateController {
    /// 比較画像の有無を指定して生成
    pub fn new(has_comparison: bool) -> Self {
        Self {
            state: ViewState::default(),
            has_comparison,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn has_comparison(&self) -> bool {
        self.has_comparison
    }

    /// 比較画像の有無が変わった場合（URL差し替え）
    ///
    /// 比較画像がなくなったら分割表示も解除する。
    pub fn set_has_comparison(&mut self, has_comparison: bool) -> Repaint {
        self.has_comparison = has_comparison;
        if !has_comparison && self.state.split_view_enabled {
            self.state.split_view_enabled = false;
            return Repaint::Transform;
        }
        Repaint::None
    }

    pub fn zoom_in(&mut self) -> Repaint {
        self.zoom_to(self.state.scale + ZOOM_STEP)
    }

    pub fn zoom_out(&mut self) -> Repaint {
        self.zoom_to(self.state.scale - ZOOM_STEP)
    }

    /// ホイール操作（上スクロール = ズームイン）
    pub fn zoom_by_wheel(&mut self, delta_y: f64) -> Repaint {
        if delta_y < 0.0 {
            self.zoom_in()
        } else {
            self.zoom_out()
        }
    }

    /// 倍率を直接指定（範囲外は丸める。非有限値は無視）
    pub fn zoom_to(&mut self, scale: f64) -> Repaint {
        if !scale.is_finite() {
            return Repaint::None;
        }
        let scale = scale.clamp(MIN_SCALE, MAX_SCALE);
        if scale == self.state.scale {
            return Repaint::None;
        }
        self.state.scale = scale;
        Repaint::Transform
    }

    /// ドラッグ終了時の絶対位置を反映
    pub fn pan_to(&mut self, x: f64, y: f64) -> Repaint {
        let next = Point::new(x, y);
        if next == self.state.position {
            return Repaint::None;
        }
        self.state.position = next;
        Repaint::Transform
    }

    /// 相対移動（範囲制限なし）
    pub fn pan_by(&mut self, dx: f64, dy: f64) -> Repaint {
        let p = self.state.position;
        self.pan_to(p.x + dx, p.y + dy)
    }

    pub fn set_brightness(&mut self, value: f64) -> Repaint {
        if !value.is_finite() {
            return Repaint::None;
        }
        let value = value.clamp(MIN_BRIGHTNESS, MAX_BRIGHTNESS);
        if value == self.state.brightness {
            return Repaint::None;
        }
        self.state.brightness = value;
        Repaint::Refilter
    }

    pub fn set_contrast(&mut self, value: f64) -> Repaint {
        if !value.is_finite() {
            return Repaint::None;
        }
        let value = value.clamp(MIN_CONTRAST, MAX_CONTRAST);
        if value == self.state.contrast {
            return Repaint::None;
        }
        self.state.contrast = value;
        Repaint::Refilter
    }

    pub fn toggle_annotations(&mut self) -> Repaint {
        self.state.annotations_visible = !self.state.annotations_visible;
        Repaint::Transform
    }

    /// 分割表示の切替（比較画像がなければ何もしない）
    pub fn toggle_split_view(&mut self) -> Repaint {
        if !self.has_comparison {
            return Repaint::None;
        }
        self.state.split_view_enabled = !self.state.split_view_enabled;
        Repaint::Transform
    }

    pub fn set_tool(&mut self, tool: Tool) -> Repaint {
        if tool == self.state.active_tool {
            return Repaint::None;
        }
        self.state.active_tool = tool;
        Repaint::Transform
    }

    /// ルーラーボタン: ruler ⇔ none
    pub fn toggle_ruler(&mut self) -> Repaint {
        let next = if self.state.active_tool == Tool::Ruler {
            Tool::None
        } else {
            Tool::Ruler
        };
        self.set_tool(next)
    }

    /// 初期状態へ戻す
    ///
    /// アノテーション表示と分割表示は維持する。
    pub fn reset(&mut self) -> Repaint {
        let defaults = ViewState {
            annotations_visible: self.state.annotations_visible,
            split_view_enabled: self.state.split_view_enabled,
            ..ViewState::default()
        };

        let refilter = defaults.brightness != self.state.brightness
            || defaults.contrast != self.state.contrast;
        let changed = defaults != self.state;
        self.state = defaults;

        if refilter {
            Repaint::Refilter
        } else if changed {
            Repaint::Transform
        } else {
            Repaint::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = ViewStateController::new(false);
        let s = c.state();
        assert_eq!(s.scale, 1.0);
        assert_eq!(s.position, Point::new(0.0, 0.0));
        assert_eq!(s.brightness, 0.0);
        assert_eq!(s.contrast, 0.0);
        assert_eq!(s.active_tool, Tool::Pan);
        assert!(s.annotations_visible);
        assert!(!s.split_view_enabled);
    }

    #[test]
    fn test_seven_zoom_ins() {
        let mut c = ViewStateController::new(false);
        for _ in 0..7 {
            c.zoom_in();
        }
        assert_eq!(c.state().scale, 2.75);
    }

    #[test]
    fn test_zoom_clamps_at_bounds() {
        let mut c = ViewStateController::new(false);
        for _ in 0..40 {
            c.zoom_in();
        }
        assert_eq!(c.state().scale, MAX_SCALE);
        assert_eq!(c.zoom_in(), Repaint::None);

        for _ in 0..40 {
            c.zoom_out();
        }
        assert_eq!(c.state().scale, MIN_SCALE);
        assert_eq!(c.zoom_out(), Repaint::None);
    }

    #[test]
    fn test_zoom_in_out_is_inverse_away_from_bounds() {
        let mut c = ViewStateController::new(false);
        for steps in 0..12 {
            let mut c2 = c.clone();
            let before = c2.state().scale;
            c2.zoom_in();
            c2.zoom_out();
            if before + ZOOM_STEP <= MAX_SCALE {
                assert!((c2.state().scale - before).abs() < 1e-12, "steps={}", steps);
            }
            c.zoom_in();
        }
    }

    #[test]
    fn test_zoom_out_from_min_clamps_instead_of_overshooting() {
        let mut c = ViewStateController::new(false);
        for _ in 0..4 {
            c.zoom_out();
        }
        // 1.0 -> 0.75 -> 0.5 -> 0.25 -> 0.1（クランプ）
        assert_eq!(c.state().scale, MIN_SCALE);
        c.zoom_in();
        assert!((c.state().scale - 0.35).abs() < 1e-12);
    }

    #[test]
    fn test_wheel_direction() {
        let mut c = ViewStateController::new(false);
        c.zoom_by_wheel(-120.0);
        assert_eq!(c.state().scale, 1.25);
        c.zoom_by_wheel(120.0);
        c.zoom_by_wheel(120.0);
        assert_eq!(c.state().scale, 0.75);
    }

    #[test]
    fn test_zoom_to() {
        let mut c = ViewStateController::new(false);
        assert_eq!(c.zoom_to(2.0), Repaint::Transform);
        assert_eq!(c.zoom_to(2.0), Repaint::None);
        c.zoom_to(9.0);
        assert_eq!(c.state().scale, 5.0);
        assert_eq!(c.zoom_to(f64::NAN), Repaint::None);
        assert_eq!(c.state().scale, 5.0);
    }

    #[test]
    fn test_brightness_clamped() {
        let mut c = ViewStateController::new(false);
        assert_eq!(c.set_brightness(0.6), Repaint::Refilter);
        assert_eq!(c.state().brightness, 0.5);
        c.set_brightness(-3.0);
        assert_eq!(c.state().brightness, -0.5);
        assert_eq!(c.set_brightness(f64::NAN), Repaint::None);
        assert_eq!(c.state().brightness, -0.5);
    }

    #[test]
    fn test_contrast_clamped() {
        let mut c = ViewStateController::new(false);
        c.set_contrast(75.0);
        assert_eq!(c.state().contrast, 50.0);
        c.set_contrast(-51.0);
        assert_eq!(c.state().contrast, -50.0);
    }

    #[test]
    fn test_geometry_changes_never_refilter() {
        let mut c = ViewStateController::new(true);
        let ops: Vec<Repaint> = vec![
            c.zoom_in(),
            c.zoom_out(),
            c.pan_to(10.0, -20.0),
            c.pan_by(5.0, 5.0),
            c.toggle_annotations(),
            c.toggle_split_view(),
            c.set_tool(Tool::Ruler),
        ];
        assert!(ops.iter().all(|r| !r.needs_refilter()));
        assert!(ops.iter().all(|r| *r == Repaint::Transform));
    }

    #[test]
    fn test_pan_is_unbounded() {
        let mut c = ViewStateController::new(false);
        c.pan_to(-10_000.0, 25_000.0);
        c.pan_by(-1.0, 1.0);
        assert_eq!(c.state().position, Point::new(-10_001.0, 25_001.0));
    }

    #[test]
    fn test_split_view_without_comparison_is_noop() {
        let mut c = ViewStateController::new(false);
        assert_eq!(c.toggle_split_view(), Repaint::None);
        assert!(!c.state().split_view_enabled);
    }

    #[test]
    fn test_split_view_with_comparison() {
        let mut c = ViewStateController::new(true);
        c.toggle_split_view();
        assert!(c.state().split_view_enabled);
        c.set_has_comparison(false);
        assert!(!c.state().split_view_enabled);
    }

    #[test]
    fn test_reset_preserves_toggles() {
        let mut c = ViewStateController::new(true);
        c.zoom_in();
        c.pan_to(30.0, 40.0);
        c.set_brightness(0.2);
        c.set_contrast(-10.0);
        c.set_tool(Tool::Ruler);
        c.toggle_annotations();
        c.toggle_split_view();

        assert_eq!(c.reset(), Repaint::Refilter);
        let s = c.state().clone();
        assert_eq!(s.scale, 1.0);
        assert_eq!(s.position, Point::default());
        assert_eq!(s.brightness, 0.0);
        assert_eq!(s.contrast, 0.0);
        assert_eq!(s.active_tool, Tool::Pan);
        assert!(!s.annotations_visible);
        assert!(s.split_view_enabled);

        // 2回目は同じ状態
        assert_eq!(c.reset(), Repaint::None);
        assert_eq!(c.state(), &s);
    }

    #[test]
    fn test_reset_geometry_only_does_not_refilter() {
        let mut c = ViewStateController::new(false);
        c.zoom_in();
        assert_eq!(c.reset(), Repaint::Transform);
    }

    #[test]
    fn test_toggle_ruler() {
        let mut c = ViewStateController::new(false);
        c.toggle_ruler();
        assert_eq!(c.state().active_tool, Tool::Ruler);
        assert!(!c.state().is_draggable());
        c.toggle_ruler();
        assert_eq!(c.state().active_tool, Tool::None);
    }

    #[test]
    fn test_screen_image_roundtrip() {
        let mut c = ViewStateController::new(false);
        c.zoom_in();
        c.zoom_in();
        c.pan_to(40.0, -20.0);
        let s = c.state();
        let img = s.screen_to_image(Point::new(190.0, 130.0));
        assert_eq!(img, Point::new(100.0, 100.0));
        assert_eq!(s.image_to_screen(img), Point::new(190.0, 130.0));
        assert_eq!(s.zoom_percent(), 150);
    }
}
