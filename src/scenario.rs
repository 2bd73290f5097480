//! 実験設定。
//!
//! 既定値は両端固定・上辺分布荷重の梁（30 × 10 グリッド）を再現します。

use crate::boundary::{BoundaryCondition, Edge, ForceField, edge_load};
use crate::domain::DomainConfig;
use crate::energy::{EnergyFunctional, PENALTY_WEIGHT};
use crate::error::{DemError, DemResult};
use crate::material::Material;
use crate::model::ModelConfig;
use crate::training::TrainingConfig;
use burn::config::Config;
use burn::prelude::Backend;
use std::path::Path;

/// 固定する辺と、荷重を与える辺。
#[derive(Config, Debug)]
pub struct LoadCaseConfig {
    #[config(default = "vec![Edge::Left, Edge::Right]")]
    pub clamped_edges: Vec<Edge>,
    #[config(default = "Edge::Top")]
    pub loaded_edge: Edge,
    #[config(default = 0.0)]
    pub load_x: f64,
    #[config(default = "-400.0")]
    pub load_y: f64,
}

impl LoadCaseConfig {
    /// 固定辺ごとに u = v = 0 を課し、それ以外の辺は自由とします。
    pub fn boundary_conditions<B: Backend>(&self) -> Vec<BoundaryCondition<B>> {
        Edge::ALL
            .into_iter()
            .map(|edge| {
                if self.clamped_edges.contains(&edge) {
                    BoundaryCondition::clamped(edge)
                } else {
                    BoundaryCondition::free(edge)
                }
            })
            .collect()
    }

    pub fn force_field<B: Backend>(&self) -> ForceField<B> {
        edge_load(self.loaded_edge, self.load_x, self.load_y)
    }
}

/// 1 回の実験に必要な設定一式。JSON として保存・読み込みできます。
#[derive(Config, Debug)]
pub struct ExperimentConfig {
    #[config(default = "DomainConfig::new()")]
    pub domain: DomainConfig,
    #[config(default = "ModelConfig::new()")]
    pub model: ModelConfig,
    #[config(default = "TrainingConfig::new()")]
    pub training: TrainingConfig,
    #[config(default = "LoadCaseConfig::new()")]
    pub load_case: LoadCaseConfig,
    #[config(default = 1e5)]
    pub young_modulus: f64,
    #[config(default = 0.3)]
    pub poisson_ratio: f64,
    #[config(default = "PENALTY_WEIGHT")]
    pub penalty_weight: f64,
}

impl ExperimentConfig {
    pub fn material(&self) -> DemResult<Material> {
        Material::new(self.young_modulus, self.poisson_ratio)
    }

    /// 材料・境界条件・外力を設定したエネルギー汎関数を構築します。
    pub fn functional<B: Backend>(&self) -> DemResult<EnergyFunctional<B>> {
        if !(self.penalty_weight.is_finite() && self.penalty_weight > 0.0) {
            return Err(DemError::Config(format!(
                "ペナルティ重みは正の値である必要があります (λ = {})",
                self.penalty_weight
            )));
        }
        let mut functional =
            EnergyFunctional::new(self.material()?).with_penalty_weight(self.penalty_weight);
        functional.set_boundary_conditions(self.load_case.boundary_conditions());
        functional.set_force(self.load_case.force_field());
        Ok(functional)
    }

    pub fn load_from(path: impl AsRef<Path>) -> DemResult<Self> {
        let path = path.as_ref();
        Self::load(path).map_err(|e| {
            DemError::Config(format!("'{}' を読み込めません: {e:?}", path.display()))
        })
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> DemResult<()> {
        self.save(path)?;
        Ok(())
    }
}
