//! # Deep Energy Method (DEM) サンプルプログラム
//!
//! 両端を固定し上辺に分布荷重を与えた梁の変位場を、エネルギー最小化で学習します。
//!
//! `clap` クレートを利用して、コマンドラインから`train`（学習）と`infer`（推論）の
//! 機能を個別に実行できます。
//!
//! ## 使い方
//!
//! ### 学習
//! ```bash
//! cargo run --release -- train --epochs 10000
//! ```
//!
//! ### 推論
//! ```bash
//! cargo run --release -- infer
//! ```

use clap::Parser;
use dem2d::cli::{Cli, Commands};
use dem2d::{inference, training};
use tracing::{Level, error};

/// プログラムのエントリーポイント。
///
/// コマンドライン引数を解析し、`train`または`infer`の処理に振り分けます。
fn main() {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Train(args) => training::run(args),
        Commands::Infer(args) => inference::run(args),
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}
