use crate::model::Jet;
use burn::prelude::Backend;
use burn::tensor::Tensor;

/// グリッド形状 `(nx, ny)` の変位場。
#[derive(Debug, Clone)]
pub struct Displacement<B: Backend> {
    pub u: Tensor<B, 2>,
    pub v: Tensor<B, 2>,
}

impl<B: Backend> Displacement<B> {
    /// `(nx*ny, 2)` のネットワーク出力を u, v のグリッドに分解します。
    pub fn from_output(output: Tensor<B, 2>, nx: usize, ny: usize) -> Self {
        Self {
            u: channel(output.clone(), 0, nx, ny),
            v: channel(output, 1, nx, ny),
        }
    }
}

/// 変位とその空間微分。いずれもグリッド形状 `(nx, ny)` です。
#[derive(Debug, Clone)]
pub struct Kinematics<B: Backend> {
    pub u: Tensor<B, 2>,
    pub v: Tensor<B, 2>,
    pub du_dx: Tensor<B, 2>,
    pub du_dy: Tensor<B, 2>,
    pub dv_dx: Tensor<B, 2>,
    pub dv_dy: Tensor<B, 2>,
}

impl<B: Backend> Kinematics<B> {
    pub fn from_jet(jet: Jet<B>, nx: usize, ny: usize) -> Self {
        Self {
            u: channel(jet.value.clone(), 0, nx, ny),
            v: channel(jet.value, 1, nx, ny),
            du_dx: channel(jet.d_dx.clone(), 0, nx, ny),
            dv_dx: channel(jet.d_dx, 1, nx, ny),
            du_dy: channel(jet.d_dy.clone(), 0, nx, ny),
            dv_dy: channel(jet.d_dy, 1, nx, ny),
        }
    }

    /// 微小ひずみ。`ε_xy` はテンソルひずみ（工学ひずみの半分）です。
    pub fn strain(&self) -> Strain<B> {
        Strain {
            xx: self.du_dx.clone(),
            yy: self.dv_dy.clone(),
            xy: (self.du_dy.clone() + self.dv_dx.clone()).mul_scalar(0.5),
        }
    }

    pub fn displacement(&self) -> Displacement<B> {
        Displacement {
            u: self.u.clone(),
            v: self.v.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Strain<B: Backend> {
    pub xx: Tensor<B, 2>,
    pub yy: Tensor<B, 2>,
    pub xy: Tensor<B, 2>,
}

fn channel<B: Backend>(output: Tensor<B, 2>, index: usize, nx: usize, ny: usize) -> Tensor<B, 2> {
    let [n, _] = output.dims();
    output.slice([0..n, index..index + 1]).reshape([nx, ny])
}
