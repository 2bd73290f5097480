//! 全ポテンシャルエネルギー汎関数の評価。
//!
//! 損失は `L = E_in - E_ex + λ·(境界ペナルティ)` です。
//! 内部エネルギーと外力仕事は格子点上の矩形則で積分します。

use crate::boundary::{BoundaryCondition, ForceField};
use crate::domain::{Domain, Grid};
use crate::field::{Kinematics, Strain};
use crate::material::Material;
use crate::model::Model;
use burn::nn::loss::{MseLoss, Reduction};
use burn::prelude::Backend;
use burn::tensor::Tensor;

/// 境界ペナルティの重み λ。
pub const PENALTY_WEIGHT: f64 = 1e5;

/// 1 回の評価で得られる各項。いずれも要素数 1 のテンソルです。
#[derive(Debug, Clone)]
pub struct EnergyTerms<B: Backend> {
    pub internal: Tensor<B, 1>,
    pub external: Tensor<B, 1>,
    pub penalty: Tensor<B, 1>,
    pub total: Tensor<B, 1>,
}

/// 平面応力の線形弾性体に対するエネルギー汎関数。
///
/// 境界条件と外力は学習前に設定します。未設定の場合はどちらも 0 として扱います。
pub struct EnergyFunctional<B: Backend> {
    material: Material,
    boundary_conditions: Vec<BoundaryCondition<B>>,
    force: Option<ForceField<B>>,
    penalty_weight: f64,
}

impl<B: Backend> EnergyFunctional<B> {
    pub fn new(material: Material) -> Self {
        Self {
            material,
            boundary_conditions: Vec::new(),
            force: None,
            penalty_weight: PENALTY_WEIGHT,
        }
    }

    pub fn with_penalty_weight(mut self, penalty_weight: f64) -> Self {
        self.penalty_weight = penalty_weight;
        self
    }

    /// 境界条件を設定します（既存の設定は置き換えられます）。
    ///
    /// 同じ辺が複数回現れた場合、ペナルティは加算されます。
    pub fn set_boundary_conditions(&mut self, boundary_conditions: Vec<BoundaryCondition<B>>) {
        self.boundary_conditions = boundary_conditions;
    }

    pub fn set_force(&mut self, force: ForceField<B>) {
        self.force = Some(force);
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn penalty_weight(&self) -> f64 {
        self.penalty_weight
    }

    pub fn boundary_conditions(&self) -> &[BoundaryCondition<B>] {
        &self.boundary_conditions
    }

    /// ひずみエネルギー密度 `ψ = ½(σ_xx ε_xx + σ_yy ε_yy + 2 σ_xy ε_xy)`。
    pub fn strain_energy_density(&self, strain: &Strain<B>) -> Tensor<B, 2> {
        let nu = self.material.poisson_ratio();
        let c = self.material.plane_stress_modulus();
        let g = self.material.shear_modulus();

        let sigma_xx = (strain.xx.clone() + strain.yy.clone().mul_scalar(nu)).mul_scalar(c);
        let sigma_yy = (strain.xx.clone().mul_scalar(nu) + strain.yy.clone()).mul_scalar(c);
        let sigma_xy = strain.xy.clone().mul_scalar(g);

        (sigma_xx * strain.xx.clone()
            + sigma_yy * strain.yy.clone()
            + (sigma_xy * strain.xy.clone()).mul_scalar(2.0))
        .mul_scalar(0.5)
    }

    /// 内部エネルギー `E_in = Σ ψ · dx · dy`。
    pub fn internal_energy(&self, kinematics: &Kinematics<B>, cell_area: f64) -> Tensor<B, 1> {
        self.strain_energy_density(&kinematics.strain())
            .sum()
            .mul_scalar(cell_area)
    }

    /// 外力仕事 `E_ex = Σ (fx·u + fy·v) · dx · dy`。外力が未設定なら 0 です。
    pub fn external_work(
        &self,
        grid: &Grid<B>,
        u: Tensor<B, 2>,
        v: Tensor<B, 2>,
        cell_area: f64,
    ) -> Tensor<B, 1> {
        match &self.force {
            None => Tensor::zeros([1], &u.device()),
            Some(force) => {
                let (fx, fy) = force(grid.x.clone(), grid.y.clone());
                (fx * u + fy * v).sum().mul_scalar(cell_area)
            }
        }
    }

    /// 境界条件の二乗平均誤差の和（重み付け前）。
    pub fn boundary_penalty(&self, grid: &Grid<B>, u: Tensor<B, 2>, v: Tensor<B, 2>) -> Tensor<B, 1> {
        let mut penalty = Tensor::zeros([1], &u.device());
        for condition in &self.boundary_conditions {
            let edge = condition.edge;
            let x_edge = edge.select(grid.x.clone());
            let y_edge = edge.select(grid.y.clone());

            if let Some(target) = &condition.u {
                let expected = target(x_edge.clone(), y_edge.clone());
                penalty = penalty
                    + MseLoss::new().forward(edge.select(u.clone()), expected, Reduction::Mean);
            }
            if let Some(target) = &condition.v {
                let expected = target(x_edge.clone(), y_edge.clone());
                penalty = penalty
                    + MseLoss::new().forward(edge.select(v.clone()), expected, Reduction::Mean);
            }
        }
        penalty
    }

    /// 変位場とその微分から全損失を組み立てます。
    pub fn assemble(&self, grid: &Grid<B>, kinematics: &Kinematics<B>, cell_area: f64) -> EnergyTerms<B> {
        let internal = self.internal_energy(kinematics, cell_area);
        let external = self.external_work(
            grid,
            kinematics.u.clone(),
            kinematics.v.clone(),
            cell_area,
        );
        let penalty = self.boundary_penalty(grid, kinematics.u.clone(), kinematics.v.clone());
        let total = internal.clone() - external.clone() + penalty.clone().mul_scalar(self.penalty_weight);

        EnergyTerms {
            internal,
            external,
            penalty,
            total,
        }
    }

    /// 現在のモデルパラメータで損失を評価します。
    ///
    /// 座標の葉テンソルは毎回作り直されます。
    pub fn evaluate(&self, model: &Model<B>, domain: &Domain<B>) -> EnergyTerms<B> {
        let grid = domain.tracked_grid();
        let jet = model.forward_with_jacobian(grid.coordinates());
        let kinematics = Kinematics::from_jet(jet, domain.nx(), domain.ny());
        self.assemble(&grid, &kinematics, domain.cell_area())
    }
}
