//! medview: 医用画像レビュー クライアントのCLI
//!
//! バックエンドへのアップロード・診断取得・レポート生成と、
//! ビューア表示面のヘッドレス描画を提供する。

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod report_form;
pub mod scanner;
pub mod summary;
