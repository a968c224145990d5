use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info};

use tt_downloader::common::api::client::MediaApiClient;
use tt_downloader::common::api::error::ApiError;
use tt_downloader::db::{Database, RecordStatus};
use tt_downloader::downloader::DownloadManager;
use tt_downloader::parser::UrlParser;
use tt_downloader::store::poller::POLL_INTERVAL;
use tt_downloader::store::{PhotosStore, StatusPoller, StoreChange, VideosStore};

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = cli::Cli::parse();
    let database = Database::open(&args.db).await?;

    match args.command {
        cli::Command::Download { url, hd } => {
            handle_download(database, args.output_dir, url, hd).await
        }
        cli::Command::List => handle_list(database, args.output_dir).await,
        cli::Command::Delete { id } => handle_delete(database, args.output_dir, id).await,
        cli::Command::Photo {
            file,
            preset,
            base_url,
        } => handle_photo(database, file, preset, base_url).await,
    }
}

/// 解析链接、落库、后台下载并渲染进度条
async fn handle_download(
    database: Database,
    output_dir: PathBuf,
    url: String,
    hd: bool,
) -> Result<()> {
    // 先做本地校验，无效输入不发网络请求
    let parsed = UrlParser::validate(&url)?;

    info!("开始解析: {}", parsed.url);
    let client = MediaApiClient::new()?;
    let data = match client.resolve_video(&parsed.url).await {
        Ok(data) => data,
        Err(e @ ApiError::Api { .. }) => {
            error!("解析接口返回错误: {}", e);
            bail!("Unable to download this video. Please check the URL and try again.");
        }
        Err(e) => return Err(e.into()),
    };

    info!("标题: << {} >>", data.title);

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let manager = Arc::new(DownloadManager::new(&output_dir, events_tx).with_prefer_hd(hd));
    let store = VideosStore::new(database.videos(), Arc::clone(&manager));

    // 先订阅再保存，避免漏掉最早的事件
    let mut changes = store.subscribe();
    tokio::spawn(Arc::clone(&store).run_reconciler(events_rx));

    let record = store.save_video(data).await?;

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% ({eta})",
        )?
        .progress_chars("#>-"),
    );

    loop {
        match changes.recv().await {
            Ok(StoreChange::Updated(id)) if id == record.id => {
                let Some(current) = store.get_video(&id).await else {
                    continue;
                };
                pb.set_position(current.download_percentage.round() as u64);

                match current.status {
                    RecordStatus::Downloaded => {
                        pb.finish();
                        println!(
                            "{} {}",
                            "下载完成！".green(),
                            current.local_uri.unwrap_or_default()
                        );
                        break;
                    }
                    RecordStatus::Failed => {
                        pb.abandon();
                        let reason = store
                            .last_error()
                            .await
                            .unwrap_or_else(|| "未知错误".to_string());
                        bail!("下载失败: {}", reason);
                    }
                    _ => {}
                }
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }

    Ok(())
}

/// 打印本地记录列表
async fn handle_list(database: Database, output_dir: PathBuf) -> Result<()> {
    let (events_tx, _events_rx) = mpsc::unbounded_channel();
    let manager = Arc::new(DownloadManager::new(&output_dir, events_tx));
    let store = VideosStore::new(database.videos(), manager);

    store.load_videos().await;
    if let Some(e) = store.last_error().await {
        bail!("加载记录失败: {}", e);
    }

    let videos = store.videos().await;
    if videos.is_empty() {
        println!("{}", "暂无本地记录".bright_black());
        return Ok(());
    }

    for video in videos {
        let status = match video.status {
            RecordStatus::Pending => "pending".bright_black(),
            RecordStatus::Downloading => "downloading".cyan(),
            RecordStatus::Downloaded => "downloaded".green(),
            RecordStatus::Failed => "failed".red(),
        };
        println!(
            "{}  {:<12} {:>5.1}%  @{}  {}",
            video.id, status, video.download_percentage, video.author_unique_id, video.title
        );
    }
    Ok(())
}

/// 删除记录，同时取消在途下载并清理半成品文件
async fn handle_delete(database: Database, output_dir: PathBuf, id: String) -> Result<()> {
    let (events_tx, _events_rx) = mpsc::unbounded_channel();
    let manager = Arc::new(DownloadManager::new(&output_dir, events_tx));
    let store = VideosStore::new(database.videos(), manager);

    store.delete_video(&id).await?;
    println!("{} {}", "已删除".green(), id);
    Ok(())
}

/// 上传证件照，轮询到终态后打印结果
async fn handle_photo(
    database: Database,
    file: PathBuf,
    preset: String,
    base_url: String,
) -> Result<()> {
    let client = MediaApiClient::new()?;
    let photo = client.upload_photo(&base_url, &file, &preset).await?;
    println!(
        "{} 任务id: {}, 状态: {}",
        "上传成功".green(),
        photo.id,
        photo.status
    );

    let store = PhotosStore::new(database.photos());
    store.add_photo(photo.clone()).await?;

    if photo.is_processing() {
        info!("等待服务端处理，每{}秒查询一次", POLL_INTERVAL.as_secs());
        let handle = StatusPoller::spawn(client, photo.clone(), Arc::clone(&store));
        handle.wait().await;
    }

    let final_photo = store.get_photo(photo.id).await.unwrap_or(photo);
    println!("处理状态: {}", final_photo.status);
    if let Some(url) = &final_photo.result_hd_url {
        println!("{} {}", "高清结果:".green(), url);
    }
    Ok(())
}
