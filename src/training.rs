use crate::cli::TrainArgs;
use crate::domain::Domain;
use crate::error::{DemError, DemResult};
use crate::energy::{EnergyFunctional, EnergyTerms};
use crate::inference::{DisplacementGrid, infer};
use crate::model::Model;
use crate::plot::{plot_displacement, plot_loss_history};
use crate::scenario::ExperimentConfig;
use crate::{CONFIG_FILENAME, DISPLACEMENT_PLOT_FILENAME, LOSS_GRAPH_FILENAME, MODEL_FILENAME};
use burn::backend::{Autodiff, NdArray};
use burn::config::Config;
use burn::module::Module;
use burn::optim::{AdamWConfig, GradientsParams, Optimizer};
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Tensor};
use std::fmt;
use std::time::Instant;
use tracing::{info, warn};

type MyBackend = Autodiff<NdArray<f32>>;

/// 学習ループの設定。
#[derive(Config)]
pub struct TrainingConfig {
    #[config(default = "AdamWConfig::new().with_weight_decay(0.01)")]
    pub optimizer: AdamWConfig,
    #[config(default = 10000)]
    pub num_epochs: usize,
    #[config(default = 1.0e-4)]
    pub learning_rate: f64,
    #[config(default = 100)]
    pub log_interval: usize,
    #[config(default = 42)]
    pub seed: u64,
}

impl TrainingConfig {
    /// 学習を開始できる設定かどうかを検証します。
    pub fn validate(&self) -> DemResult<()> {
        if self.num_epochs == 0 {
            return Err(DemError::Config(
                "エポック数は 1 以上である必要があります".to_string(),
            ));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(DemError::Config(format!(
                "学習率は正の値である必要があります (lr = {})",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

// AdamWConfig は Debug を実装しないため、JSON 表現で出力する
impl fmt::Debug for TrainingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainingConfig")
            .field("optimizer", &format_args!("{}", self.optimizer))
            .field("num_epochs", &self.num_epochs)
            .field("learning_rate", &self.learning_rate)
            .field("log_interval", &self.log_interval)
            .field("seed", &self.seed)
            .finish()
    }
}

/// 1 エポック分の損失と各項の値。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochRecord {
    pub epoch: usize,
    pub loss: f64,
    pub internal: f64,
    pub external: f64,
    pub penalty: f64,
}

impl EpochRecord {
    pub fn is_finite(&self) -> bool {
        self.loss.is_finite()
    }
}

/// 学習中に記録した全エポックの履歴。
#[derive(Debug, Clone, Default)]
pub struct TrainingHistory {
    pub records: Vec<EpochRecord>,
}

impl TrainingHistory {
    pub fn losses(&self) -> Vec<f64> {
        self.records.iter().map(|record| record.loss).collect()
    }

    pub fn last(&self) -> Option<&EpochRecord> {
        self.records.last()
    }

    /// すべてのエポックで損失が有限かどうか。
    pub fn is_finite(&self) -> bool {
        self.records.iter().all(EpochRecord::is_finite)
    }

    /// 幅 `window` の後方移動平均。履歴が窓より短い場合は空です。
    pub fn moving_average(&self, window: usize) -> Vec<f64> {
        let window = window.max(1);
        self.losses()
            .windows(window)
            .map(|values| values.iter().sum::<f64>() / window as f64)
            .collect()
    }
}

/// エネルギー汎関数を最小化する学習器。
///
/// エポックをまたいで保持されるのはモデルパラメータとオプティマイザの状態だけです。
pub struct Trainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<Model<B>, B>,
{
    model: Model<B>,
    optim: O,
    learning_rate: f64,
    log_interval: usize,
    epoch: usize,
}

impl<B, O> Trainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<Model<B>, B>,
{
    pub fn new(model: Model<B>, optim: O, config: &TrainingConfig) -> Self {
        Self {
            model,
            optim,
            learning_rate: config.learning_rate,
            log_interval: config.log_interval.max(1),
            epoch: 0,
        }
    }

    /// 1 エポック分の更新を行います。
    ///
    /// 損失の評価、微分項を含む計算グラフ全体の逆伝播、オプティマイザの 1 ステップを実行します。
    /// このエポックで作られた中間テンソルは、関数を抜けるときにすべて解放されます。
    pub fn step(&mut self, functional: &EnergyFunctional<B>, domain: &Domain<B>) -> EpochRecord {
        let terms = functional.evaluate(&self.model, domain);
        let record = record(self.epoch, &terms);

        let grads = terms.total.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        self.model = self.optim.step(self.learning_rate, self.model.clone(), grads);
        self.epoch += 1;

        record
    }

    /// 指定したエポック数だけ学習します。早期終了はしません。
    pub fn fit(
        &mut self,
        functional: &EnergyFunctional<B>,
        domain: &Domain<B>,
        num_epochs: usize,
    ) -> TrainingHistory {
        let mut history = TrainingHistory {
            records: Vec::with_capacity(num_epochs),
        };
        let mut reported_divergence = false;

        for _ in 0..num_epochs {
            let record = self.step(functional, domain);

            if record.epoch % self.log_interval == 0 {
                info!(
                    epoch = record.epoch,
                    loss = record.loss,
                    internal = record.internal,
                    external = record.external,
                    penalty = record.penalty,
                    "[Epoch {}] Loss: {:.6e}",
                    record.epoch,
                    record.loss
                );
            }
            if !record.is_finite() && !reported_divergence {
                warn!(epoch = record.epoch, loss = record.loss, "損失が有限値ではなくなりました");
                reported_divergence = true;
            }

            history.records.push(record);
        }
        history
    }

    pub fn model(&self) -> &Model<B> {
        &self.model
    }

    pub fn into_model(self) -> Model<B> {
        self.model
    }

    /// これまでに実行したエポック数。
    pub fn epochs_run(&self) -> usize {
        self.epoch
    }
}

fn record<B: Backend>(epoch: usize, terms: &EnergyTerms<B>) -> EpochRecord {
    EpochRecord {
        epoch,
        loss: to_f64(&terms.total),
        internal: to_f64(&terms.internal),
        external: to_f64(&terms.external),
        penalty: to_f64(&terms.penalty),
    }
}

fn to_f64<B: Backend>(tensor: &Tensor<B, 1>) -> f64 {
    tensor.clone().into_scalar().elem::<f64>()
}

/// `train`サブコマンドを実行します。
///
/// 梁モデルを学習し、損失グラフ・変位図・学習済みモデル・設定を出力ディレクトリに保存します。
pub fn run(args: &TrainArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => ExperimentConfig::load_from(path)?,
        None => ExperimentConfig::new(),
    };
    if let Some(epochs) = args.epochs {
        config.training.num_epochs = epochs;
    }
    if let Some(edges) = &args.clamp {
        config.load_case.clamped_edges = edges.clone();
    }
    if let Some(edge) = args.load_edge {
        config.load_case.loaded_edge = edge;
    }
    config.training.validate()?;

    // --- 領域・モデル・汎関数の準備 ---
    MyBackend::seed(config.training.seed);
    let device = Default::default();
    let domain = config.domain.init::<MyBackend>(&device)?;
    let model = config.model.init::<MyBackend>(&device)?;
    let functional = config.functional::<MyBackend>()?;
    let optim = config.training.optimizer.init();
    let mut trainer = Trainer::new(model, optim, &config.training);

    info!(
        nx = domain.nx(),
        ny = domain.ny(),
        layers = ?config.model.layers,
        epochs = config.training.num_epochs,
        "学習を開始します (DEM 平面応力) - バックエンド: NdArray (CPU)"
    );
    let training_start = Instant::now();
    let history = trainer.fit(&functional, &domain, config.training.num_epochs);
    info!(elapsed = ?training_start.elapsed(), "学習が完了しました");
    if let Some(last) = history.last() {
        info!(loss = last.loss, finite = history.is_finite(), "最終エポックの損失");
    }

    // --- 結果の保存と描画 ---
    std::fs::create_dir_all(&args.out_dir)?;
    let loss_graph = args.out_dir.join(LOSS_GRAPH_FILENAME);
    plot_loss_history(&history, &loss_graph)?;
    info!(path = %loss_graph.display(), "損失グラフを保存しました");

    let model = trainer.into_model();
    let model_path = args.out_dir.join(MODEL_FILENAME);
    model
        .clone()
        .save_file(model_path.clone(), &NamedMpkFileRecorder::<FullPrecisionSettings>::new())?;
    config.save_to(args.out_dir.join(CONFIG_FILENAME))?;
    info!(path = %model_path.display(), "モデルと設定を保存しました");

    let displacement = infer(&model, &domain);
    let field = DisplacementGrid::new(&domain.grid().inner(), &displacement)?;
    let figure = args.out_dir.join(DISPLACEMENT_PLOT_FILENAME);
    plot_displacement(&field, args.scale, &figure)?;
    info!(
        max_displacement = field.max_magnitude(),
        path = %figure.display(),
        "変位図を保存しました"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{BoundaryCondition, Edge, edge_load};
    use crate::material::Material;
    use crate::model::ModelConfig;

    type TestBackend = Autodiff<NdArray<f32>>;

    fn setup(layers: Vec<usize>) -> (Domain<TestBackend>, Model<TestBackend>, EnergyFunctional<TestBackend>) {
        let device = Default::default();
        let domain = Domain::new((1.0, 0.2), (8, 4), &device).unwrap();
        let model = ModelConfig::new()
            .with_layers(layers)
            .init::<TestBackend>(&device)
            .unwrap();
        let mut functional = EnergyFunctional::new(Material::new(1e5, 0.3).unwrap());
        functional.set_boundary_conditions(vec![
            BoundaryCondition::clamped(Edge::Left),
            BoundaryCondition::clamped(Edge::Right),
        ]);
        functional.set_force(edge_load(Edge::Top, 0.0, -400.0));
        (domain, model, functional)
    }

    #[test]
    fn runs_exactly_the_requested_epochs() {
        let (domain, model, functional) = setup(vec![2, 8, 2]);
        let config = TrainingConfig::new();
        let optim = config.optimizer.init();
        let mut trainer = Trainer::new(model, optim, &config);

        let history = trainer.fit(&functional, &domain, 7);
        assert_eq!(history.records.len(), 7);
        assert_eq!(trainer.epochs_run(), 7);

        // 続けて学習するとエポック番号が引き継がれる
        let more = trainer.fit(&functional, &domain, 3);
        let epochs: Vec<usize> = more.records.iter().map(|record| record.epoch).collect();
        assert_eq!(epochs, vec![7, 8, 9]);
    }

    #[test]
    fn steps_update_parameters_and_reduce_loss() {
        let (domain, model, functional) = setup(vec![2, 16, 16, 2]);
        let config = TrainingConfig::new().with_learning_rate(1e-3);
        let optim = config.optimizer.init();
        let mut trainer = Trainer::new(model, optim, &config);

        let history = trainer.fit(&functional, &domain, 60);
        assert!(history.is_finite());
        let first = history.records[0].loss;
        let last = history.last().unwrap().loss;
        assert!(last < first, "first = {first}, last = {last}");
    }

    #[test]
    fn rejects_zero_epochs_and_non_positive_learning_rate() {
        assert!(TrainingConfig::new().validate().is_ok());
        assert!(matches!(
            TrainingConfig::new().with_num_epochs(0).validate(),
            Err(DemError::Config(_))
        ));
        assert!(TrainingConfig::new().with_learning_rate(0.0).validate().is_err());
        assert!(TrainingConfig::new().with_learning_rate(f64::NAN).validate().is_err());
    }

    #[test]
    fn debug_output_lists_every_field() {
        let text = format!("{:?}", TrainingConfig::new().with_num_epochs(250));
        assert!(text.starts_with("TrainingConfig"));
        assert!(text.contains("num_epochs: 250"));
        assert!(text.contains("weight_decay"));
        assert!(text.contains("seed: 42"));
    }

    #[test]
    fn moving_average_uses_trailing_windows() {
        let history = TrainingHistory {
            records: [4.0, 2.0, 6.0, 0.0]
                .into_iter()
                .enumerate()
                .map(|(epoch, loss)| EpochRecord {
                    epoch,
                    loss,
                    internal: 0.0,
                    external: 0.0,
                    penalty: 0.0,
                })
                .collect(),
        };
        assert_eq!(history.moving_average(2), vec![3.0, 4.0, 3.0]);
        assert_eq!(history.moving_average(1), vec![4.0, 2.0, 6.0, 0.0]);
        assert!(history.moving_average(5).is_empty());
        assert!(history.is_finite());
    }

    #[test]
    fn detects_non_finite_losses() {
        let record = |loss| EpochRecord {
            epoch: 0,
            loss,
            internal: 0.0,
            external: 0.0,
            penalty: 0.0,
        };
        let history = TrainingHistory {
            records: vec![record(1.0), record(f64::NAN)],
        };
        assert!(!history.is_finite());
    }
}
