#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use tt_downloader::db::{RecordStatus, VideoRecord};

static NEXT_DIR: AtomicU32 = AtomicU32::new(0);

/// 每个测试用例一个独立的临时目录
pub fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "ttdl-{}-{}-{}",
        tag,
        std::process::id(),
        NEXT_DIR.fetch_add(1, Ordering::SeqCst)
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn temp_db_path(tag: &str) -> PathBuf {
    temp_dir(tag).join("test.db")
}

/// 起一个本地HTTP服务，对每个连接按固定分片节奏返回同一份内容
pub async fn serve_bytes(
    content_type: &str,
    body: Vec<u8>,
    chunk_size: usize,
    chunk_delay: Duration,
) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let header = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        content_type,
        body.len()
    );

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let header = header.clone();
            let body = body.clone();
            tokio::spawn(async move {
                // 把请求头读掉就行，内容不关心
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;

                if socket.write_all(header.as_bytes()).await.is_err() {
                    return;
                }
                for chunk in body.chunks(chunk_size.max(1)) {
                    if socket.write_all(chunk).await.is_err() {
                        return;
                    }
                    let _ = socket.flush().await;
                    tokio::time::sleep(chunk_delay).await;
                }
            });
        }
    });

    format!("http://{}", addr)
}

/// 起一个本地HTTP服务，依次返回给定的JSON响应，用完后重复最后一个
/// 响应体里的 {BASE} 会被替换成服务自身的地址
pub async fn serve_json_sequence(bodies: Vec<String>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base = format!("http://{}", addr);
    let queue = Arc::new(Mutex::new(
        bodies
            .into_iter()
            .map(|b| b.replace("{BASE}", &base))
            .collect::<VecDeque<_>>(),
    ));

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            // 队列里只剩一个时重复返回它
            let body = {
                let mut queue = queue.lock().unwrap();
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            }
            .unwrap_or_else(|| "{}".to_string());

            tokio::spawn(async move {
                let mut buf = [0u8; 8192];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            });
        }
    });

    format!("http://{}", addr)
}

/// 起一个本地HTTP服务，声明的Content-Length比实际发送的字节多，发完就断连
pub async fn serve_truncated(declared_len: usize, body: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let header = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: video/mp4\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        declared_len
    );

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let header = header.clone();
            let body = body.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(header.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.flush().await;
                // 提前关闭连接，客户端会在拿满之前读到EOF
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{}", addr)
}

/// 起一个本地HTTP服务，所有请求都返回指定状态码
pub async fn serve_status(status: u16, reason: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        status, reason
    );

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let response = response.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
            });
        }
    });

    format!("http://{}", addr)
}

pub fn make_record(id: &str, play: &str) -> VideoRecord {
    VideoRecord {
        id: id.to_string(),
        title: "测试视频".to_string(),
        cover: "https://www.tikwm.com/video/cover/test.webp".to_string(),
        duration: 15,
        hdplay: play.to_string(),
        hd_size: 2048,
        play: play.to_string(),
        size: 1024,
        author_unique_id: "tester".to_string(),
        author_nickname: "Tester".to_string(),
        author_avatar: "https://www.tikwm.com/avatar/test.jpeg".to_string(),
        created_at: "2025-01-01T00:00:00+00:00".to_string(),
        status: RecordStatus::Pending,
        download_percentage: 0.0,
        local_uri: None,
    }
}
