//! 明るさ・コントラストの画素フィルタ
//!
//! RGBAバッファを直接書き換える。明るさを先に加算し、次にコントラストを掛ける。
//! 各段で 0〜255 に丸めるので、段ごとの結果はキャンバスの8bitバッファと一致する。
//! アルファは変更しない。

use crate::view_state::ViewState;

/// フィルタ設定
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FilterParams {
    /// -0.5〜0.5（×255 を加算）
    pub brightness: f64,
    /// -50〜50
    pub contrast: f64,
}

impl FilterParams {
    pub fn new(brightness: f64, contrast: f64) -> Self {
        Self { brightness, contrast }
    }

    pub fn from_view(state: &ViewState) -> Self {
        Self::new(state.brightness, state.contrast)
    }

    pub fn is_identity(&self) -> bool {
        self.brightness == 0.0 && self.contrast == 0.0
    }

    /// 256段階の変換テーブル
    pub fn lookup_table(&self) -> [u8; 256] {
        let offset = self.brightness * 255.0;
        let adjust = ((self.contrast + 100.0) / 100.0).powi(2);

        let mut table = [0u8; 256];
        for (value, slot) in table.iter_mut().enumerate() {
            let brightened = clamp_channel(value as f64 + offset);
            let contrasted = ((brightened / 255.0 - 0.5) * adjust + 0.5) * 255.0;
            *slot = clamp_channel(contrasted) as u8;
        }
        table
    }
}

fn clamp_channel(value: f64) -> f64 {
    value.round().clamp(0.0, 255.0)
}

/// RGBAバッファへ適用
pub fn apply_filters(rgba: &mut [u8], params: FilterParams) {
    if params.is_identity() {
        return;
    }
    let table = params.lookup_table();
    apply_table(rgba, &table);
}

/// 変換テーブルを適用（行単位の並列処理から呼ぶ用）
pub fn apply_table(rgba: &mut [u8], table: &[u8; 256]) {
    for px in rgba.chunks_exact_mut(4) {
        px[0] = table[px[0] as usize];
        px[1] = table[px[1] as usize];
        px[2] = table[px[2] as usize];
    }
}
