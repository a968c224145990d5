mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use tt_downloader::downloader::{DownloadEvent, DownloadManager};

async fn recv_event(
    rx: &mut mpsc::UnboundedReceiver<DownloadEvent>,
    wait: Duration,
) -> Option<DownloadEvent> {
    timeout(wait, rx.recv()).await.ok().flatten()
}

/// 一路收事件直到Completed或Failed，返回收到的全部事件
async fn collect_until_terminal(
    rx: &mut mpsc::UnboundedReceiver<DownloadEvent>,
    wait: Duration,
) -> Vec<DownloadEvent> {
    let mut events = Vec::new();
    loop {
        match recv_event(rx, wait).await {
            Some(event) => {
                let terminal = matches!(
                    event,
                    DownloadEvent::Completed { .. } | DownloadEvent::Failed { .. }
                );
                events.push(event);
                if terminal {
                    break;
                }
            }
            None => break,
        }
    }
    events
}

#[tokio::test]
async fn test_existing_file_short_circuits() {
    let dir = common::temp_dir("short-circuit");
    std::fs::write(dir.join("7401.mp4"), b"already here").unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let manager = DownloadManager::new(&dir, tx);

    // 故意给一个不存在的地址，证明没有发网络请求
    let record = common::make_record("7401", "http://127.0.0.1:1/nope.mp4");
    manager.start_download(&record).await;

    assert!(matches!(
        recv_event(&mut rx, Duration::from_secs(1)).await,
        Some(DownloadEvent::Progress { percent, .. }) if percent == 100.0
    ));
    match recv_event(&mut rx, Duration::from_secs(1)).await {
        Some(DownloadEvent::Completed { id, local_path }) => {
            assert_eq!(id, "7401");
            assert_eq!(local_path, dir.join("7401.mp4"));
        }
        other => panic!("期望Completed事件，收到 {:?}", other),
    }
    // 短路路径不注册任务
    assert!(!manager.has_task("7401"));
}

#[tokio::test]
async fn test_download_to_completion() {
    let body: Vec<u8> = (0..65536u32).map(|i| (i % 251) as u8).collect();
    let base = common::serve_bytes("video/mp4", body.clone(), 8192, Duration::from_millis(5)).await;

    let dir = common::temp_dir("full");
    let (tx, mut rx) = mpsc::unbounded_channel();
    let manager = DownloadManager::new(&dir, tx);

    let record = common::make_record("7402", &format!("{}/7402.mp4", base));
    manager.start_download(&record).await;

    let events = collect_until_terminal(&mut rx, Duration::from_secs(10)).await;

    // 进度单调不减，最终到100
    let mut last = -1.0f64;
    let mut final_percent = 0.0f64;
    for event in &events {
        if let DownloadEvent::Progress { id, percent } = event {
            assert_eq!(id, "7402");
            assert!(*percent >= last, "进度回退了: {} -> {}", last, percent);
            last = *percent;
            final_percent = *percent;
        }
    }
    assert_eq!(final_percent, 100.0);
    assert!(matches!(
        events.last(),
        Some(DownloadEvent::Completed { .. })
    ));

    // 文件完整落盘，任务已出注册表
    let written = std::fs::read(dir.join("7402.mp4")).unwrap();
    assert_eq!(written, body);
    assert!(!manager.has_task("7402"));
    assert_eq!(manager.task_count(), 0);
}

#[tokio::test]
async fn test_duplicate_start_is_noop() {
    let body = vec![7u8; 128 * 1024];
    let base = common::serve_bytes("video/mp4", body, 4096, Duration::from_millis(10)).await;

    let dir = common::temp_dir("dup");
    let (tx, mut rx) = mpsc::unbounded_channel();
    let manager = DownloadManager::new(&dir, tx);

    let record = common::make_record("7403", &format!("{}/7403.mp4", base));
    manager.start_download(&record).await;
    // 第二次start必须被忽略，不产生第二个任务
    manager.start_download(&record).await;
    assert_eq!(manager.task_count(), 1);

    let events = collect_until_terminal(&mut rx, Duration::from_secs(10)).await;
    let completed = events
        .iter()
        .filter(|e| matches!(e, DownloadEvent::Completed { .. }))
        .count();
    assert_eq!(completed, 1);

    // 终态之后不应该再有事件
    assert!(recv_event(&mut rx, Duration::from_millis(300)).await.is_none());
}

#[tokio::test]
async fn test_cancel_removes_task_and_partial_file() {
    let body = vec![7u8; 512 * 1024];
    let base = common::serve_bytes("video/mp4", body, 4096, Duration::from_millis(20)).await;

    let dir = common::temp_dir("cancel");
    let (tx, mut rx) = mpsc::unbounded_channel();
    let manager = DownloadManager::new(&dir, tx);

    let record = common::make_record("7404", &format!("{}/7404.mp4", base));
    manager.start_download(&record).await;
    assert!(manager.has_task("7404"));

    // 等传输真的开始
    assert!(recv_event(&mut rx, Duration::from_secs(5)).await.is_some());

    manager.cancel("7404").await;

    assert!(!manager.has_task("7404"));
    assert!(!dir.join("7404.mp4").exists());

    // 被取消的任务不再上报终态
    let mut saw_terminal = false;
    while let Some(event) = recv_event(&mut rx, Duration::from_millis(300)).await {
        if matches!(
            event,
            DownloadEvent::Completed { .. } | DownloadEvent::Failed { .. }
        ) {
            saw_terminal = true;
        }
    }
    assert!(!saw_terminal);
}

#[tokio::test]
async fn test_cancel_unknown_id_is_noop() {
    let dir = common::temp_dir("cancel-noop");
    let (tx, mut rx) = mpsc::unbounded_channel();
    let manager = DownloadManager::new(&dir, tx);

    manager.cancel("不存在").await;
    assert!(recv_event(&mut rx, Duration::from_millis(200)).await.is_none());
}

#[tokio::test]
async fn test_unreachable_url_reports_failed() {
    let dir = common::temp_dir("failed");
    let (tx, mut rx) = mpsc::unbounded_channel();
    let manager = DownloadManager::new(&dir, tx);

    let record = common::make_record("7405", "http://127.0.0.1:1/unreachable.mp4");
    manager.start_download(&record).await;

    let events = collect_until_terminal(&mut rx, Duration::from_secs(10)).await;
    match events.last() {
        Some(DownloadEvent::Failed { id, error }) => {
            assert_eq!(id, "7405");
            assert!(!error.is_empty());
        }
        other => panic!("期望Failed事件，收到 {:?}", other),
    }
    assert!(!manager.has_task("7405"));
}

#[tokio::test]
async fn test_http_error_status_reports_failed() {
    let base = common::serve_status(404, "Not Found").await;

    let dir = common::temp_dir("http-404");
    let (tx, mut rx) = mpsc::unbounded_channel();
    let manager = DownloadManager::new(&dir, tx);

    let record = common::make_record("7406", &format!("{}/gone.mp4", base));
    manager.start_download(&record).await;

    let events = collect_until_terminal(&mut rx, Duration::from_secs(10)).await;
    assert!(matches!(
        events.last(),
        Some(DownloadEvent::Failed { .. })
    ));
}

#[tokio::test]
async fn test_failed_transfer_cleans_partial_file() {
    // 声明4096字节但只发1024就断连，传输中途失败
    let base = common::serve_truncated(4096, vec![8u8; 1024]).await;

    let dir = common::temp_dir("truncated");
    let (tx, mut rx) = mpsc::unbounded_channel();
    let manager = DownloadManager::new(&dir, tx);

    let record = common::make_record("7410", &format!("{}/7410.mp4", base));
    manager.start_download(&record).await;

    let events = collect_until_terminal(&mut rx, Duration::from_secs(10)).await;
    assert!(matches!(events.last(), Some(DownloadEvent::Failed { .. })));
    // 半成品不能留在磁盘上
    assert!(!dir.join("7410.mp4").exists());
    assert!(!manager.has_task("7410"));

    // 重试走的还是失败路径，不会被残留文件短路成完成
    manager.start_download(&record).await;
    let events = collect_until_terminal(&mut rx, Duration::from_secs(10)).await;
    assert!(matches!(events.last(), Some(DownloadEvent::Failed { .. })));
    assert!(!dir.join("7410.mp4").exists());
}

#[tokio::test]
async fn test_empty_url_reports_failed() {
    let dir = common::temp_dir("no-url");
    let (tx, mut rx) = mpsc::unbounded_channel();
    let manager = DownloadManager::new(&dir, tx);

    let record = common::make_record("7407", "");
    manager.start_download(&record).await;

    assert!(matches!(
        recv_event(&mut rx, Duration::from_secs(1)).await,
        Some(DownloadEvent::Failed { .. })
    ));
    assert!(!manager.has_task("7407"));
}

#[tokio::test]
async fn test_pause_stalls_and_resume_finishes() {
    let body = vec![3u8; 256 * 1024];
    let base = common::serve_bytes("video/mp4", body.clone(), 4096, Duration::from_millis(10)).await;

    let dir = common::temp_dir("pause");
    let (tx, mut rx) = mpsc::unbounded_channel();
    let manager = DownloadManager::new(&dir, tx);

    let record = common::make_record("7408", &format!("{}/7408.mp4", base));
    manager.start_download(&record).await;

    // 等第一批进度事件到来再暂停
    assert!(recv_event(&mut rx, Duration::from_secs(5)).await.is_some());
    manager.pause("7408");
    assert!(manager.has_task("7408"));

    // 暂停生效前可能还有在途的一两个事件，先放过沉降期
    while recv_event(&mut rx, Duration::from_millis(400)).await.is_some() {}

    // 沉降之后进度彻底停住
    assert!(recv_event(&mut rx, Duration::from_millis(500)).await.is_none());

    manager.resume("7408");
    let events = collect_until_terminal(&mut rx, Duration::from_secs(15)).await;
    assert!(matches!(
        events.last(),
        Some(DownloadEvent::Completed { .. })
    ));
    assert_eq!(std::fs::read(dir.join("7408.mp4")).unwrap(), body);
}

#[tokio::test]
async fn test_prefer_hd_picks_hd_url() {
    let body = vec![9u8; 4096];
    let base = common::serve_bytes("video/mp4", body.clone(), 4096, Duration::ZERO).await;

    let dir = common::temp_dir("hd");
    let (tx, mut rx) = mpsc::unbounded_channel();
    let manager = Arc::new(DownloadManager::new(&dir, tx).with_prefer_hd(true));

    // 普通直链故意指向不可达地址，只有走hd直链才可能成功
    let mut record = common::make_record("7409", "http://127.0.0.1:1/nope.mp4");
    record.hdplay = format!("{}/hd.mp4", base);
    manager.start_download(&record).await;

    let events = collect_until_terminal(&mut rx, Duration::from_secs(10)).await;
    assert!(matches!(
        events.last(),
        Some(DownloadEvent::Completed { .. })
    ));
}
