//! ルーラー（2点間距離の計測）
//!
//! 計測点はステージ上の画像座標で持つ。画像はステージ寸法に引き伸ばして
//! 描くので、長さは `NativeScale` で元画像の画素に戻してから測る。
//! ミリ換算は呼び出し側が画素間隔を明示したときだけ行う。

use crate::surface::Stage;
use crate::view_state::{Point, ViewState};
use serde::{Deserialize, Serialize};

/// ステージ1pxあたりの元画像の画素数（縦横別）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NativeScale {
    pub x: f64,
    pub y: f64,
}

impl Default for NativeScale {
    fn default() -> Self {
        Self { x: 1.0, y: 1.0 }
    }
}

impl NativeScale {
    /// 元画像の寸法から求める。寸法が不正なら等倍
    pub fn between(natural_width: f64, natural_height: f64, stage: Stage) -> Self {
        let ratio = |natural: f64, extent: f64| {
            if natural.is_finite() && natural > 0.0 && extent > 0.0 {
                natural / extent
            } else {
                1.0
            }
        };
        Self {
            x: ratio(natural_width, stage.width),
            y: ratio(natural_height, stage.height),
        }
    }

    pub fn to_native(self, p: Point) -> Point {
        Point::new(p.x * self.x, p.y * self.y)
    }

    pub fn to_stage(self, p: Point) -> Point {
        Point::new(p.x / self.x, p.y / self.y)
    }
}

/// 1画素あたりの実寸（mm）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelSpacing {
    pub mm_per_px: f64,
}

impl PixelSpacing {
    /// 正の有限値のみ受け付ける
    pub fn new(mm_per_px: f64) -> Option<Self> {
        (mm_per_px.is_finite() && mm_per_px > 0.0).then_some(Self { mm_per_px })
    }
}

/// 計測結果（端点はステージ上の画像座標）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub start: Point,
    pub end: Point,
    #[serde(default)]
    pub native: NativeScale,
}

impl Measurement {
    /// ステージ座標の端点から作る
    pub fn new(start: Point, end: Point, native: NativeScale) -> Self {
        Self { start, end, native }
    }

    /// 元画像の画素座標の端点から作る
    pub fn from_native(start: Point, end: Point, native: NativeScale) -> Self {
        Self {
            start: native.to_stage(start),
            end: native.to_stage(end),
            native,
        }
    }

    /// 元画像の画素での長さ
    pub fn length_px(&self) -> f64 {
        let start = self.native.to_native(self.start);
        let end = self.native.to_native(self.end);
        (end.x - start.x).hypot(end.y - start.y)
    }

    pub fn length_mm(&self, spacing: PixelSpacing) -> f64 {
        self.length_px() * spacing.mm_per_px
    }

    /// 表示用ラベル（画素間隔がなければpxのみ）
    pub fn label(&self, spacing: Option<PixelSpacing>) -> String {
        match spacing {
            Some(s) => format!("{:.1} mm", self.length_mm(s)),
            None => format!("{:.0} px", self.length_px()),
        }
    }
}

/// ドラッグ中のルーラー
///
/// ステージ座標を受け取り、その時点の表示状態で画像座標へ変換して保持する。
#[derive(Debug, Clone, Default)]
pub struct Ruler {
    anchor: Option<Point>,
    current: Option<Measurement>,
    native: NativeScale,
}

impl Ruler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 表示中の画像が変わったら呼ぶ。計測済みの線にも反映する
    pub fn set_native_scale(&mut self, native: NativeScale) {
        self.native = native;
        if let Some(m) = self.current.as_mut() {
            m.native = native;
        }
    }

    pub fn native_scale(&self) -> NativeScale {
        self.native
    }

    pub fn begin(&mut self, screen: Point, view: &ViewState) {
        let p = view.screen_to_image(screen);
        self.anchor = Some(p);
        self.current = Some(Measurement::new(p, p, self.native));
    }

    pub fn update(&mut self, screen: Point, view: &ViewState) {
        if let Some(start) = self.anchor {
            self.current = Some(Measurement::new(start, view.screen_to_image(screen), self.native));
        }
    }

    /// ドラッグ終了。長さ0の計測は捨てる
    pub fn finish(&mut self, screen: Point, view: &ViewState) -> Option<Measurement> {
        self.update(screen, view);
        self.anchor = None;
        match self.current {
            Some(m) if m.length_px() > 0.0 => Some(m),
            _ => {
                self.current = None;
                None
            }
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn measurement(&self) -> Option<Measurement> {
        self.current
    }

    pub fn clear(&mut self) {
        self.anchor = None;
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view_state::ViewStateController;

    #[test]
    fn test_length_px() {
        let m = Measurement::new(Point::new(0.0, 0.0), Point::new(30.0, 40.0), NativeScale::default());
        assert_eq!(m.length_px(), 50.0);
        assert_eq!(m.label(None), "50 px");
    }

    #[test]
    fn test_length_mm_requires_spacing() {
        let m = Measurement::new(Point::new(10.0, 10.0), Point::new(10.0, 110.0), NativeScale::default());
        let spacing = PixelSpacing::new(0.25).unwrap();
        assert_eq!(m.length_mm(spacing), 25.0);
        assert_eq!(m.label(Some(spacing)), "25.0 mm");
    }

    #[test]
    fn test_spacing_rejects_invalid() {
        assert!(PixelSpacing::new(0.0).is_none());
        assert!(PixelSpacing::new(-1.0).is_none());
        assert!(PixelSpacing::new(f64::INFINITY).is_none());
    }

    #[test]
    fn test_ruler_measures_in_image_space() {
        let mut c = ViewStateController::new(false);
        for _ in 0..4 {
            c.zoom_in(); // scale 2.0
        }
        c.pan_to(100.0, 50.0);

        let mut ruler = Ruler::new();
        ruler.begin(Point::new(100.0, 50.0), c.state());
        assert!(ruler.is_dragging());
        let m = ruler.finish(Point::new(300.0, 50.0), c.state()).unwrap();

        assert_eq!(m.start, Point::new(0.0, 0.0));
        assert_eq!(m.end, Point::new(100.0, 0.0));
        assert_eq!(m.length_px(), 100.0);
        assert!(!ruler.is_dragging());
    }

    #[test]
    fn test_length_uses_native_pixels() {
        let native = NativeScale::between(2048.0, 1536.0, Stage::default());
        assert_eq!(native, NativeScale { x: 2.56, y: 2.56 });

        let mut ruler = Ruler::new();
        ruler.set_native_scale(native);
        let view = ViewState::default();
        ruler.begin(Point::new(0.0, 0.0), &view);
        let m = ruler.finish(Point::new(800.0, 0.0), &view).unwrap();

        assert_eq!(m.length_px(), 2048.0);
        assert_eq!(m.label(PixelSpacing::new(0.1)), "204.8 mm");
        assert_eq!(m.label(None), "2048 px");
    }

    #[test]
    fn test_anisotropic_native_scale() {
        // 400x600 の画像は横だけ縮めて表示される
        let native = NativeScale::between(400.0, 600.0, Stage::default());
        let m = Measurement::new(Point::new(0.0, 0.0), Point::new(800.0, 600.0), native);
        assert_eq!(m.length_px(), 400f64.hypot(600.0));
    }

    #[test]
    fn test_from_native_round_trips_length() {
        let native = NativeScale::between(1600.0, 1200.0, Stage::default());
        let m = Measurement::from_native(Point::new(0.0, 0.0), Point::new(1600.0, 0.0), native);
        assert_eq!(m.end, Point::new(800.0, 0.0));
        assert_eq!(m.length_px(), 1600.0);
    }

    #[test]
    fn test_rescale_existing_measurement() {
        let view = ViewState::default();
        let mut ruler = Ruler::new();
        ruler.begin(Point::new(0.0, 0.0), &view);
        ruler.finish(Point::new(400.0, 0.0), &view);
        ruler.set_native_scale(NativeScale { x: 2.0, y: 2.0 });
        assert_eq!(ruler.measurement().unwrap().length_px(), 800.0);
    }

    #[test]
    fn test_invalid_natural_size_is_identity() {
        assert_eq!(NativeScale::between(0.0, f64::NAN, Stage::default()), NativeScale::default());
    }

    #[test]
    fn test_zero_length_is_discarded() {
        let view = ViewState::default();
        let mut ruler = Ruler::new();
        ruler.begin(Point::new(5.0, 5.0), &view);
        assert!(ruler.finish(Point::new(5.0, 5.0), &view).is_none());
        assert!(ruler.measurement().is_none());
    }
}
