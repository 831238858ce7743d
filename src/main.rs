use anyhow::Context;
use clap::Parser;
use indicatif::ProgressBar;
use medview::client::{compute_file_hash, ApiClient, CacheFile};
use medview::pipeline::{self, ResultOrigin, RunOptions};
use medview::render::{self, RenderOptions};
use medview::report_form::{complete_report_form, ReportArgs};
use medview::{cli, config, scanner, summary};
use cli::{Cli, Commands};
use config::Config;
use medview_common::{Measurement, PixelSpacing, Point, ReportRequest};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn save_or_print(result: &medview_common::DiagnosisResult, output: Option<&Path>) -> anyhow::Result<()> {
    println!("{}", summary::format_summary(result));
    if let Some(path) = output {
        summary::save_result(result, path)?;
        println!("\n✔ 結果を保存: {}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let config = Config::load().context("設定の読み込みに失敗しました")?;

    match cli.command {
        Commands::Upload { file, no_cache } => {
            let client = ApiClient::from_config(&config)?;
            let targets = scanner::scan_path(&file, false)?;
            let target = targets
                .first()
                .ok_or_else(|| medview::error::MedviewError::FileNotFound(file.display().to_string()))?;

            let folder = pipeline::cache_folder(&file);
            let mut cache = (!no_cache).then(|| CacheFile::load(&folder));
            let hash = match cache {
                Some(_) => Some(compute_file_hash(&target.path)?),
                None => None,
            };

            let pb = spinner("アップロード中...");
            let cache_arg = cache.as_mut().zip(hash.as_deref());
            let uploaded = pipeline::upload_with_cache(&client, target, cache_arg).await;
            pb.finish_and_clear();
            let (image_id, hit) = uploaded?;

            if let Some(cache) = &cache {
                cache.save(&folder)?;
            }
            println!("{}{}", image_id, if hit { " (キャッシュ)" } else { "" });
        }

        Commands::Diagnosis { image_id, output } => {
            let client = ApiClient::from_config(&config)?;
            let pb = spinner("診断結果を取得中...");
            let result = client.get_diagnosis(&image_id).await;
            pb.finish_and_clear();
            save_or_print(&result?, output.as_deref())?;
        }

        Commands::Analyze { image_id, output } => {
            let client = ApiClient::from_config(&config)?;
            let pb = spinner("解析中...");
            let result = client.analyze_image(&image_id).await;
            pb.finish_and_clear();
            save_or_print(&result?, output.as_deref())?;
        }

        Commands::Run { path, output, render, no_cache, recursive } => {
            println!("🩻 medview - 一括処理\n");
            let client = ApiClient::from_config(&config)?;
            let options = RunOptions {
                output_dir: output,
                render,
                use_cache: !no_cache,
                recursive,
            };
            let report = pipeline::run_batch(&client, &path, &options).await?;

            println!();
            for outcome in &report.succeeded {
                let origin = match outcome.origin {
                    ResultOrigin::Cache => "キャッシュ",
                    ResultOrigin::Existing => "取得",
                    ResultOrigin::Analyzed => "解析",
                };
                println!("✔ {} [{}] → {}", outcome.file_name, origin, outcome.result_path.display());
                if let Some(png) = &outcome.render_path {
                    println!("    描画: {}", png.display());
                }
            }
            for (file_name, error) in &report.failed {
                println!("✘ {}: {}", file_name, error);
            }
            println!("\n完了: 成功 {}件 / 失敗 {}件", report.succeeded.len(), report.failed.len());
        }

        Commands::Render {
            result,
            image,
            comparison,
            output,
            brightness,
            contrast,
            scale,
            pan,
            hide_annotations,
            measure,
            pixel_spacing,
        } => {
            let diagnosis = summary::load_result(&result)?;
            let pixel_spacing = match pixel_spacing {
                Some(mm) => Some(PixelSpacing::new(mm).ok_or_else(|| {
                    medview::error::MedviewError::Config(format!("画素間隔は正の数で指定してください: {}", mm))
                })?),
                None => None,
            };
            let primary = render::load_pane_image(&image);
            // 計測座標は元画像の画素で受け取る
            let native = render::native_scale(&primary);
            let measurement = measure.map(|[x1, y1, x2, y2]| {
                Measurement::from_native(Point::new(x1, y1), Point::new(x2, y2), native)
            });
            let options = RenderOptions {
                brightness,
                contrast,
                scale,
                pan: pan.unwrap_or((0.0, 0.0)),
                show_annotations: !hide_annotations,
                measurement,
                pixel_spacing,
            };

            let comparison = comparison.as_deref().map(render::load_pane_image);
            let img = render::render_surface(
                &primary,
                comparison.as_ref(),
                &diagnosis.details.annotations,
                &options,
            );

            let output: PathBuf = output.unwrap_or_else(|| render::default_output_path(&result));
            render::save_png(&img, &output)?;
            if let Some(m) = &measurement {
                println!("計測: {}", m.label(pixel_spacing));
            }
            println!("✔ 描画を保存: {}", output.display());
        }

        Commands::Report { image_id, result, patient, doctor, indication, no_prompt } => {
            let diagnosis = summary::load_result(&result)?;
            let args = ReportArgs {
                patient_name: patient,
                doctor_name: doctor,
                clinical_indication: indication,
            };
            let form = complete_report_form(args, !no_prompt)?;
            let request = ReportRequest::from_diagnosis(&image_id, &diagnosis, &form);

            let client = ApiClient::from_config(&config)?;
            let pb = spinner("レポートを生成中...");
            let url = client.generate_report(&request).await;
            pb.finish_and_clear();
            println!("✔ レポート: {}", url?);
        }

        Commands::Config { set_api_url, show } => {
            let mut config = config;

            if let Some(url) = set_api_url {
                config.set_api_base_url(url)?;
                println!("✔ APIのURLを設定しました");
            }

            if show {
                println!("設定:");
                println!("  APIのURL: {}", config.api_base_url());
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!(
                    "  最大アップロードサイズ: {}",
                    medview_common::upload::format_file_size(config.max_upload_bytes)
                );
            }
        }

        Commands::Cache { clear, folder, info } => {
            let target = folder.unwrap_or_else(|| PathBuf::from("."));
            let cache_path = CacheFile::cache_path(&target);

            if info || !clear {
                if cache_path.exists() {
                    let cache = CacheFile::load(&target);
                    println!("キャッシュ情報:");
                    println!("  パス: {}", cache_path.display());
                    println!("  件数: {} (診断結果あり {})", cache.len(), cache.diagnosed_count());
                    if let Ok(meta) = std::fs::metadata(&cache_path) {
                        println!("  サイズ: {} bytes", meta.len());
                    }
                } else {
                    println!("キャッシュファイルが存在しません: {}", cache_path.display());
                }
            }

            if clear {
                match CacheFile::clear(&target) {
                    Ok(true) => println!("✔ キャッシュを削除しました: {}", cache_path.display()),
                    Ok(false) => println!("キャッシュファイルが存在しません"),
                    Err(e) => println!("キャッシュ削除エラー: {}", e),
                }
            }
        }
    }

    Ok(())
}
