use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "medview")]
#[command(about = "医用画像レビュー クライアント（アップロード・診断取得・注釈付き描画・レポート生成）", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 画像を1枚アップロードして image_id を表示
    Upload {
        /// 画像ファイル（.jpg .jpeg .png .dcm）
        #[arg(required = true)]
        file: PathBuf,

        /// キャッシュを使わない
        #[arg(long)]
        no_cache: bool,
    },

    /// 既存の診断結果を取得
    Diagnosis {
        #[arg(required = true)]
        image_id: String,

        /// 結果JSONの保存先
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 解析を依頼して診断結果を取得
    Analyze {
        #[arg(required = true)]
        image_id: String,

        /// 結果JSONの保存先
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// ファイルまたはフォルダをアップロードから結果保存まで一括処理
    Run {
        /// 画像ファイルまたはフォルダ
        #[arg(required = true)]
        path: PathBuf,

        /// 結果の出力フォルダ（デフォルト: 入力と同じ場所）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 注釈付きPNGも出力
        #[arg(long)]
        render: bool,

        /// キャッシュを使わない
        #[arg(long)]
        no_cache: bool,

        /// サブフォルダも再帰的にスキャン
        #[arg(short = 'r', long)]
        recursive: bool,
    },

    /// 診断結果を画像に重ねてPNGに描画
    Render {
        /// 診断結果JSON
        #[arg(required = true)]
        result: PathBuf,

        /// 患者画像
        #[arg(short, long)]
        image: PathBuf,

        /// 比較用の正常画像（指定すると左右分割表示）
        #[arg(short, long)]
        comparison: Option<PathBuf>,

        /// 出力PNG（デフォルト: <stem>.render-<日時>.png）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 明るさ (-0.5〜0.5)
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        brightness: f64,

        /// コントラスト (-50〜50)
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        contrast: f64,

        /// 倍率 (0.1〜5.0)
        #[arg(long, default_value = "1")]
        scale: f64,

        /// 表示位置 x,y（px）
        #[arg(long, value_parser = parse_pair, allow_hyphen_values = true)]
        pan: Option<(f64, f64)>,

        /// アノテーションを描かない
        #[arg(long)]
        hide_annotations: bool,

        /// ルーラー計測 x1,y1,x2,y2（元画像の画素座標）
        #[arg(long, value_parser = parse_quad, allow_hyphen_values = true)]
        measure: Option<[f64; 4]>,

        /// 画素間隔（mm/px）。指定時のみ計測値をmmで表示
        #[arg(long)]
        pixel_spacing: Option<f64>,
    },

    /// 診断結果からレポートを生成
    Report {
        #[arg(required = true)]
        image_id: String,

        /// 診断結果JSON
        #[arg(short, long)]
        result: PathBuf,

        /// 患者名
        #[arg(long)]
        patient: Option<String>,

        /// 医師名
        #[arg(long)]
        doctor: Option<String>,

        /// 臨床的適応
        #[arg(long)]
        indication: Option<String>,

        /// 未指定項目を尋ねずに既定値で送信
        #[arg(long)]
        no_prompt: bool,
    },

    /// 設定を表示/編集
    Config {
        /// APIのベースURLを設定
        #[arg(long)]
        set_api_url: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },

    /// キャッシュ管理
    Cache {
        /// キャッシュを削除
        #[arg(long)]
        clear: bool,

        /// 対象フォルダ（省略時はカレント）
        #[arg(short, long)]
        folder: Option<PathBuf>,

        /// キャッシュ情報を表示
        #[arg(long)]
        info: bool,
    },
}

fn parse_numbers(s: &str, expected: usize) -> Result<Vec<f64>, String> {
    let values: Vec<f64> = s
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("{}: {}", v.trim(), e)))
        .collect::<Result<_, _>>()?;
    if values.len() != expected {
        return Err(format!("{}個の数値をカンマ区切りで指定してください: {}", expected, s));
    }
    Ok(values)
}

fn parse_pair(s: &str) -> Result<(f64, f64), String> {
    let v = parse_numbers(s, 2)?;
    Ok((v[0], v[1]))
}

fn parse_quad(s: &str) -> Result<[f64; 4], String> {
    let v = parse_numbers(s, 4)?;
    Ok([v[0], v[1], v[2], v[3]])
}
