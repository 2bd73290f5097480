use crate::cli::InferArgs;
use crate::domain::{Domain, Grid};
use crate::error::{DemError, DemResult};
use crate::field::Displacement;
use crate::model::Model;
use crate::plot::plot_displacement;
use crate::scenario::ExperimentConfig;
use crate::{CONFIG_FILENAME, DISPLACEMENT_PLOT_FILENAME, MODEL_FILENAME};
use burn::backend::NdArray;
use burn::module::{AutodiffModule, Module};
use burn::prelude::Backend;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::Tensor;
use burn::tensor::backend::AutodiffBackend;
use std::time::Instant;
use tracing::info;

type MyBackend = NdArray<f32>;

/// モデルをグリッド全体で 1 回評価し、u, v を `(nx, ny)` に整形します。
pub fn predict<B: Backend>(model: &Model<B>, domain: &Domain<B>) -> Displacement<B> {
    let output = model.forward(domain.coordinates());
    Displacement::from_output(output, domain.nx(), domain.ny())
}

/// 学習中のモデルを、計算グラフを作らずに内部バックエンドで評価します。
pub fn infer<B: AutodiffBackend>(
    model: &Model<B>,
    domain: &Domain<B>,
) -> Displacement<B::InnerBackend> {
    let output = model.valid().forward(domain.coordinates().inner());
    Displacement::from_output(output, domain.nx(), domain.ny())
}

/// ホスト側に取り出した変位場。配列はすべて `i*ny + j` の順です。
#[derive(Debug, Clone, PartialEq)]
pub struct DisplacementGrid {
    pub nx: usize,
    pub ny: usize,
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub u: Vec<f32>,
    pub v: Vec<f32>,
}

impl DisplacementGrid {
    pub fn new<B: Backend>(grid: &Grid<B>, displacement: &Displacement<B>) -> DemResult<Self> {
        let [nx, ny] = grid.dims();
        Ok(Self {
            nx,
            ny,
            x: host(&grid.x)?,
            y: host(&grid.y)?,
            u: host(&displacement.u)?,
            v: host(&displacement.v)?,
        })
    }

    fn index(&self, i: usize, j: usize) -> usize {
        i * self.ny + j
    }

    /// 格子点 (i, j) での変位の大きさ。
    pub fn magnitude(&self, i: usize, j: usize) -> f32 {
        let k = self.index(i, j);
        self.u[k].hypot(self.v[k])
    }

    pub fn magnitudes(&self) -> Vec<f32> {
        self.u
            .iter()
            .zip(&self.v)
            .map(|(u, v)| u.hypot(*v))
            .collect()
    }

    pub fn max_magnitude(&self) -> f32 {
        self.magnitudes().into_iter().fold(0.0, f32::max)
    }
}

fn host<B: Backend>(tensor: &Tensor<B, 2>) -> DemResult<Vec<f32>> {
    tensor
        .clone()
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| DemError::Data(format!("{e:?}")))
}

/// `infer`サブコマンドを実行します。
///
/// 保存済みの設定とモデルを読み込み、変位場を計算して図に出力します。
pub fn run(args: &InferArgs) -> Result<(), Box<dyn std::error::Error>> {
    let device = Default::default();
    let model_path = args.out_dir.join(MODEL_FILENAME);
    let config_path = args.out_dir.join(CONFIG_FILENAME);

    if !model_path.exists() {
        return Err(format!(
            "モデルファイル '{}' が見つかりません。\n最初に 'train' コマンドでモデルを学習・保存してください。",
            model_path.display()
        )
        .into());
    }

    info!("推論を実行します - バックエンド: NdArray (CPU)");
    let inference_start = Instant::now();

    let config = ExperimentConfig::load_from(&config_path)?;
    info!(path = %model_path.display(), "保存済みモデルをロード中...");
    let model = config.model.init::<MyBackend>(&device)?.load_file(
        model_path,
        &NamedMpkFileRecorder::<FullPrecisionSettings>::new(),
        &device,
    )?;
    let domain = config.domain.init::<MyBackend>(&device)?;

    let displacement = predict(&model, &domain);
    let field = DisplacementGrid::new(&domain.grid(), &displacement)?;
    let inference_duration = inference_start.elapsed();

    let center = field.magnitude(field.nx / 2, field.ny - 1);
    info!(
        nx = field.nx,
        ny = field.ny,
        shape = ?displacement.u.dims(),
        elapsed = ?inference_duration,
        "推論が完了しました"
    );
    info!(
        top_center = center,
        max = field.max_magnitude(),
        "変位の大きさ"
    );

    let figure = args.out_dir.join(DISPLACEMENT_PLOT_FILENAME);
    plot_displacement(&field, args.scale, &figure)?;
    info!(path = %figure.display(), "変位図を保存しました");

    Ok(())
}
