//! # Deep Energy Method (DEM) ライブラリ
//!
//! `burn` フレームワークを使用して、2次元線形弾性体（平面応力）の変位場を
//! ニューラルネットワークで近似します。ラベル付きデータは使わず、
//! 離散化した全ポテンシャルエネルギーを損失として直接最小化します。

pub mod boundary;
pub mod cli;
pub mod domain;
pub mod energy;
pub mod error;
pub mod field;
pub mod inference;
pub mod material;
pub mod model;
pub mod plot;
pub mod scenario;
pub mod training;

pub use error::{DemError, DemResult};

/// モデルを保存するファイル名
pub const MODEL_FILENAME: &str = "dem_model.mpk";
/// 実験設定を保存するファイル名
pub const CONFIG_FILENAME: &str = "experiment.json";
pub const LOSS_GRAPH_FILENAME: &str = "loss_graph.png";
pub const DISPLACEMENT_PLOT_FILENAME: &str = "displacement.png";
