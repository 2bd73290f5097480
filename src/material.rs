use crate::error::{DemError, DemResult};

/// 線形弾性体の材料定数（平面応力）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    young_modulus: f64,
    poisson_ratio: f64,
}

impl Material {
    /// ヤング率 `E` とポアソン比 `ν` から材料を作成します。
    ///
    /// `E > 0` かつ `-1 < ν < 0.5` でなければエラーを返します。
    pub fn new(young_modulus: f64, poisson_ratio: f64) -> DemResult<Self> {
        if !(young_modulus.is_finite() && young_modulus > 0.0) {
            return Err(DemError::InvalidMaterial(format!(
                "ヤング率は正の値である必要があります (E = {young_modulus})"
            )));
        }
        if !(poisson_ratio > -1.0 && poisson_ratio < 0.5) {
            return Err(DemError::InvalidMaterial(format!(
                "ポアソン比は (-1, 0.5) の範囲である必要があります (nu = {poisson_ratio})"
            )));
        }
        Ok(Self {
            young_modulus,
            poisson_ratio,
        })
    }

    pub fn young_modulus(&self) -> f64 {
        self.young_modulus
    }

    pub fn poisson_ratio(&self) -> f64 {
        self.poisson_ratio
    }

    /// 平面応力の剛性係数 `E / (1 - ν²)`。
    pub fn plane_stress_modulus(&self) -> f64 {
        self.young_modulus / (1.0 - self.poisson_ratio * self.poisson_ratio)
    }

    /// せん断弾性係数 `E / (2(1 + ν))`。
    pub fn shear_modulus(&self) -> f64 {
        self.young_modulus / (2.0 * (1.0 + self.poisson_ratio))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_steel_like_constants() {
        let material = Material::new(2.1e5, 0.3).unwrap();
        assert!((material.shear_modulus() - 2.1e5 / 2.6).abs() < 1e-9);
        assert!((material.plane_stress_modulus() - 2.1e5 / 0.91).abs() < 1e-6);
    }

    #[test]
    fn rejects_non_physical_constants() {
        assert!(matches!(
            Material::new(0.0, 0.3),
            Err(DemError::InvalidMaterial(_))
        ));
        assert!(matches!(
            Material::new(-1.0, 0.3),
            Err(DemError::InvalidMaterial(_))
        ));
        assert!(Material::new(1e5, 0.5).is_err());
        assert!(Material::new(1e5, -1.0).is_err());
        assert!(Material::new(1e5, f64::NAN).is_err());
    }
}
