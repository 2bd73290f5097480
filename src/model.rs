use crate::error::{DemError, DemResult};
use burn::config::Config;
use burn::module::Module;
use burn::nn::{Linear, LinearConfig, Tanh};
use burn::prelude::Backend;
use burn::tensor::Tensor;

/// ネットワークの層構成。
///
/// `layers` は入力層から出力層までの幅を順に並べたもので、先頭と末尾は 2 です。
#[derive(Config, Debug)]
pub struct ModelConfig {
    #[config(default = "vec![2, 128, 128, 128, 2]")]
    pub layers: Vec<usize>,
}

impl ModelConfig {
    /// 層構成を検証し、新しいモデルを初期化します。
    pub fn init<B: Backend>(&self, device: &B::Device) -> DemResult<Model<B>> {
        let layers = &self.layers;
        if layers.len() < 2 {
            return Err(DemError::InvalidModel(format!(
                "少なくとも 2 つの層幅が必要です (指定: {layers:?})"
            )));
        }
        if layers[0] != 2 || layers[layers.len() - 1] != 2 {
            return Err(DemError::InvalidModel(format!(
                "入力と出力の幅は 2 である必要があります (指定: {layers:?})"
            )));
        }
        if layers.contains(&0) {
            return Err(DemError::InvalidModel(format!(
                "幅 0 の層は指定できません (指定: {layers:?})"
            )));
        }

        let mut linears: Vec<Linear<B>> = layers
            .windows(2)
            .map(|pair| LinearConfig::new(pair[0], pair[1]).init(device))
            .collect();
        // windows(2) は長さ 2 以上なら必ず 1 つ以上の要素を返す
        let output = linears.pop().ok_or_else(|| {
            DemError::InvalidModel("出力層を構成できませんでした".to_string())
        })?;

        Ok(Model {
            hidden: linears,
            output,
            activation: Tanh::new(),
        })
    }
}

/// 変位場を近似するニューラルネットワークモデル。
///
/// 座標 (x, y) を入力とし、その点の変位 (u, v) を予測する多層パーセプトロン（MLP）です。
/// 最終層は活性化関数を持たない線形層です。
#[derive(Module, Debug)]
pub struct Model<B: Backend> {
    hidden: Vec<Linear<B>>,
    output: Linear<B>,
    activation: Tanh,
}

/// モデル出力と、入力座標に関するその方向微分。
///
/// いずれも形状は `(N, 2)` で、列 0 が u、列 1 が v に対応します。
#[derive(Debug, Clone)]
pub struct Jet<B: Backend> {
    pub value: Tensor<B, 2>,
    /// ∂(u, v)/∂x
    pub d_dx: Tensor<B, 2>,
    /// ∂(u, v)/∂y
    pub d_dy: Tensor<B, 2>,
}

impl<B: Backend> Model<B> {
    /// モデルの順伝播を実行します。
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = input;
        for layer in &self.hidden {
            x = layer.forward(x);
            x = self.activation.forward(x);
        }
        self.output.forward(x)
    }

    /// 順伝播と同時に、入力座標に関する微分を層ごとに前進伝播します。
    ///
    /// 各層で接ベクトルを `dz = dh·W`、`da = (1 - tanh²(z))·dz` として更新します。
    /// すべて通常のテンソル演算で記録されるため、返される微分は
    /// 自動微分バックエンド上でパラメータについてさらに微分できます。
    pub fn forward_with_jacobian(&self, input: Tensor<B, 2>) -> Jet<B> {
        let [n, _] = input.dims();
        let device = input.device();
        let ones = Tensor::<B, 2>::ones([n, 1], &device);
        let zeros = Tensor::<B, 2>::zeros([n, 1], &device);
        let mut tangent_x = Tensor::cat(vec![ones.clone(), zeros.clone()], 1);
        let mut tangent_y = Tensor::cat(vec![zeros, ones], 1);

        let mut x = input;
        for layer in &self.hidden {
            let weight = layer.weight.val();
            let z = layer.forward(x);
            let dz_x = tangent_x.matmul(weight.clone());
            let dz_y = tangent_y.matmul(weight);
            x = self.activation.forward(z);
            let slope = x.clone().powf_scalar(2.0).neg().add_scalar(1.0);
            tangent_x = slope.clone() * dz_x;
            tangent_y = slope * dz_y;
        }

        let weight = self.output.weight.val();
        Jet {
            value: self.output.forward(x),
            d_dx: tangent_x.matmul(weight.clone()),
            d_dy: tangent_y.matmul(weight),
        }
    }

    /// 線形層の数。
    pub fn num_layers(&self) -> usize {
        self.hidden.len() + 1
    }
}
