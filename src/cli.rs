use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// TikTok视频下载器
#[derive(Parser, Debug)]
#[command(name = "ttdl")]
#[command(version = "0.1.0")]
#[command(about = "一个简单的TikTok视频下载工具", long_about = None)]
pub struct Cli {
    /// 数据库文件路径
    #[arg(long, value_name = "FILE", default_value = "ttdl.db")]
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub db: PathBuf,

    /// 视频保存目录
    #[arg(long, value_name = "DIR", default_value = "downloads")]
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub output_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 下载一个TikTok视频
    Download {
        /// 视频链接 (支持短链接、网页链接和移动端链接)
        #[arg(value_name = "URL")]
        #[arg(value_hint = clap::ValueHint::Url)]
        url: String,

        /// 优先下载高清直链
        #[arg(long)]
        hd: bool,
    },

    /// 列出本地保存的视频记录
    List,

    /// 删除一条视频记录并清理对应文件
    Delete {
        /// 视频id
        #[arg(value_name = "ID")]
        id: String,
    },

    /// 上传证件照并等待处理结果
    Photo {
        /// 照片文件
        #[arg(value_name = "FILE")]
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,

        /// 规格预设
        #[arg(long, value_name = "PRESET")]
        preset: String,

        /// 证件照服务端地址
        #[arg(long, value_name = "URL")]
        #[arg(value_hint = clap::ValueHint::Url)]
        base_url: String,
    },
}
