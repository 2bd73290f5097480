use crate::boundary::Edge;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// clapでコマンドラインの構造を定義します。
#[derive(Parser, Debug)]
#[command(author, version, about = "Deep Energy Method (DEM) for 2D plane-stress elasticity with Burn", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 実行するサブコマンドを定義します（train または infer）。
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// エネルギー汎関数を最小化してモデルを学習し、結果をファイルに保存します
    Train(TrainArgs),
    /// 保存されたモデルを使い、変位場を推論します
    Infer(InferArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// 実験設定ファイル (JSON)。省略時は既定の両端固定梁
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// 学習エポック数（設定ファイルの値を上書き）
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    pub epochs: Option<usize>,

    /// u = v = 0 に固定する辺 (例: left,right)
    #[arg(long, value_delimiter = ',')]
    pub clamp: Option<Vec<Edge>>,

    /// 荷重を与える辺
    #[arg(long)]
    pub load_edge: Option<Edge>,

    /// 出力ディレクトリ
    #[arg(long, default_value = "artifacts")]
    pub out_dir: PathBuf,

    /// 変形図での変位の拡大率
    #[arg(long, default_value_t = 5.0)]
    pub scale: f64,
}

#[derive(Args, Debug)]
pub struct InferArgs {
    /// `train` の出力ディレクトリ
    #[arg(long, default_value = "artifacts")]
    pub out_dir: PathBuf,

    /// 変形図での変位の拡大率
    #[arg(long, default_value_t = 5.0)]
    pub scale: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_train_overrides() {
        let cli = Cli::try_parse_from([
            "dem2d", "train", "--epochs", "500", "--clamp", "left,bottom", "--load-edge", "right",
        ])
        .unwrap();
        match cli.command {
            Commands::Train(args) => {
                assert_eq!(args.epochs, Some(500));
                assert_eq!(args.clamp, Some(vec![Edge::Left, Edge::Bottom]));
                assert_eq!(args.load_edge, Some(Edge::Right));
                assert_eq!(args.out_dir, PathBuf::from("artifacts"));
            }
            Commands::Infer(_) => panic!("train として解釈されるべきです"),
        }
    }

    #[test]
    fn rejects_zero_epochs() {
        let result = Cli::try_parse_from(["dem2d", "train", "--epochs", "0"]);
        assert!(result.is_err());
        let cli = Cli::try_parse_from(["dem2d", "train", "--epochs", "1"]).unwrap();
        assert!(matches!(cli.command, Commands::Train(args) if args.epochs == Some(1)));
    }

    #[test]
    fn rejects_unknown_edge() {
        let result = Cli::try_parse_from(["dem2d", "train", "--clamp", "left,front"]);
        assert!(result.is_err());
    }
}
