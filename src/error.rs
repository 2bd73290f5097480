//! エラー型の定義。
//!
//! 設定ミスは学習開始前に検出し、`DemError` として呼び出し元へ返します。

use thiserror::Error;

/// DEM ソルバー全体で使用するエラー型。
#[derive(Debug, Error)]
pub enum DemError {
    /// ネットワークの層構成が不正です。
    #[error("層構成が不正です: {0}")]
    InvalidModel(String),

    /// 計算領域またはグリッド解像度が不正です。
    #[error("計算領域が不正です: {0}")]
    InvalidDomain(String),

    /// 材料定数が物理的に不正です。
    #[error("材料定数が不正です: {0}")]
    InvalidMaterial(String),

    /// 未知の境界辺タグです。
    #[error("未知の境界辺です: '{0}' (left, right, bottom, top のいずれかを指定してください)")]
    UnknownEdge(String),

    /// 設定ファイルの読み書きに失敗しました。
    #[error("設定ファイルの処理に失敗しました: {0}")]
    Config(String),

    /// モデルの保存・読み込みに失敗しました。
    #[error(transparent)]
    Recorder(#[from] burn::record::RecorderError),

    /// テンソルからホスト配列への変換に失敗しました。
    #[error("テンソルデータの変換に失敗しました: {0}")]
    Data(String),

    #[error("I/O エラー: {0}")]
    Io(#[from] std::io::Error),
}

/// `Result<T, DemError>` の省略形。
pub type DemResult<T> = Result<T, DemError>;
