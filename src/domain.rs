//! 矩形の計算領域と、その上の規則格子（コロケーション点）。

use crate::error::{DemError, DemResult};
use burn::config::Config;
use burn::prelude::Backend;
use burn::tensor::Tensor;
use burn::tensor::backend::AutodiffBackend;

/// 計算領域の大きさとグリッド解像度。
#[derive(Config, Debug)]
pub struct DomainConfig {
    #[config(default = 1.0)]
    pub length: f64,
    #[config(default = 0.2)]
    pub height: f64,
    #[config(default = 30)]
    pub nx: usize,
    #[config(default = 10)]
    pub ny: usize,
}

impl DomainConfig {
    /// 設定を検証し、指定デバイス上に領域とグリッドを構築します。
    pub fn init<B: Backend>(&self, device: &B::Device) -> DemResult<Domain<B>> {
        Domain::new((self.length, self.height), (self.nx, self.ny), device)
    }
}

/// 形状 `(nx, ny)` の座標グリッド。第1軸が x、第2軸が y です。
#[derive(Debug, Clone)]
pub struct Grid<B: Backend> {
    pub x: Tensor<B, 2>,
    pub y: Tensor<B, 2>,
}

impl<B: Backend> Grid<B> {
    /// ネットワーク入力用に `(nx*ny, 2)` へ平坦化した座標（行優先、`i*ny + j`）。
    pub fn coordinates(&self) -> Tensor<B, 2> {
        let [nx, ny] = self.x.dims();
        let n = nx * ny;
        Tensor::cat(
            vec![self.x.clone().reshape([n, 1]), self.y.clone().reshape([n, 1])],
            1,
        )
    }

    pub fn dims(&self) -> [usize; 2] {
        self.x.dims()
    }
}

impl<B: AutodiffBackend> Grid<B> {
    /// 勾配追跡を持たない内部バックエンドのグリッド。
    pub fn inner(&self) -> Grid<B::InnerBackend> {
        Grid {
            x: self.x.clone().inner(),
            y: self.y.clone().inner(),
        }
    }
}

/// 軸に平行な矩形領域 `[0, length] × [0, height]`。
///
/// 構築後は変更されません。
#[derive(Debug, Clone)]
pub struct Domain<B: Backend> {
    length: f64,
    height: f64,
    nx: usize,
    ny: usize,
    grid: Grid<B>,
}

impl<B: Backend> Domain<B> {
    /// 両端を含む等間隔の点列から外積でグリッドを作ります。
    pub fn new(
        (length, height): (f64, f64),
        (nx, ny): (usize, usize),
        device: &B::Device,
    ) -> DemResult<Self> {
        if !(length.is_finite() && length > 0.0 && height.is_finite() && height > 0.0) {
            return Err(DemError::InvalidDomain(format!(
                "領域の大きさは正の値である必要があります ({length} x {height})"
            )));
        }
        if nx < 2 || ny < 2 {
            return Err(DemError::InvalidDomain(format!(
                "各方向に 2 点以上が必要です ({nx} x {ny})"
            )));
        }

        let xs = linspace(length, nx);
        let ys = linspace(height, ny);
        let mut x_values = Vec::with_capacity(nx * ny);
        let mut y_values = Vec::with_capacity(nx * ny);
        for x in &xs {
            for y in &ys {
                x_values.push(*x);
                y_values.push(*y);
            }
        }

        let x = Tensor::<B, 1>::from_floats(x_values.as_slice(), device).reshape([nx, ny]);
        let y = Tensor::<B, 1>::from_floats(y_values.as_slice(), device).reshape([nx, ny]);

        Ok(Self {
            length,
            height,
            nx,
            ny,
            grid: Grid { x, y },
        })
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn num_points(&self) -> usize {
        self.nx * self.ny
    }

    /// 数値積分に用いるセル面積 `(length/nx) * (height/ny)`。
    ///
    /// 点間隔 `length/(nx-1)` とは一致しません。
    pub fn cell_area(&self) -> f64 {
        (self.length / self.nx as f64) * (self.height / self.ny as f64)
    }

    /// 勾配追跡なしのグリッド。
    pub fn grid(&self) -> Grid<B> {
        self.grid.clone()
    }

    /// 位置に関する勾配を追跡するグリッド。
    ///
    /// 呼び出しごとに新しい葉テンソルを作るため、計算グラフはエポックをまたいで残りません。
    pub fn tracked_grid(&self) -> Grid<B> {
        Grid {
            x: self.grid.x.clone().require_grad(),
            y: self.grid.y.clone().require_grad(),
        }
    }

    /// 平坦化した入力座標 `(nx*ny, 2)`。
    pub fn coordinates(&self) -> Tensor<B, 2> {
        self.grid.coordinates()
    }
}

fn linspace(end: f64, num: usize) -> Vec<f32> {
    let step = end / (num - 1) as f64;
    (0..num)
        .map(|i| {
            // 終点は丸め誤差なしで領域端に一致させる
            let value = if i == num - 1 { end } else { i as f64 * step };
            value as f32
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn grid_has_x_on_first_axis() {
        let device = Default::default();
        let domain = Domain::<TestBackend>::new((1.0, 0.2), (5, 3), &device).unwrap();
        let grid = domain.grid();
        assert_eq!(grid.dims(), [5, 3]);

        let x = grid.x.into_data().to_vec::<f32>().unwrap();
        let y = grid.y.into_data().to_vec::<f32>().unwrap();
        // 行 i は x 一定、列 j は y 一定
        assert_eq!(&x[0..3], &[0.0, 0.0, 0.0]);
        assert_eq!(&x[12..15], &[1.0, 1.0, 1.0]);
        assert!((x[3] - 0.25).abs() < 1e-7);
        assert_eq!(y[0], 0.0);
        assert!((y[1] - 0.1).abs() < 1e-7);
        assert!((y[2] - 0.2).abs() < 1e-7);
    }

    #[test]
    fn coordinates_are_row_major() {
        let device = Default::default();
        let domain = Domain::<TestBackend>::new((2.0, 1.0), (3, 2), &device).unwrap();
        let coords = domain.coordinates();
        assert_eq!(coords.dims(), [6, 2]);

        let values = coords.into_data().to_vec::<f32>().unwrap();
        let expected = [
            0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 2.0, 0.0, 2.0, 1.0,
        ];
        assert_eq!(values, expected);
    }

    #[test]
    fn cell_area_uses_cell_count_not_point_spacing() {
        let device = Default::default();
        let domain = Domain::<TestBackend>::new((1.0, 0.2), (30, 10), &device).unwrap();
        let expected = (1.0 / 30.0) * (0.2 / 10.0);
        assert!((domain.cell_area() - expected).abs() < 1e-15);
        assert_eq!(domain.num_points(), 300);
    }

    #[test]
    fn rejects_degenerate_domains() {
        let device = Default::default();
        assert!(matches!(
            Domain::<TestBackend>::new((0.0, 1.0), (4, 4), &device),
            Err(DemError::InvalidDomain(_))
        ));
        assert!(Domain::<TestBackend>::new((1.0, -1.0), (4, 4), &device).is_err());
        assert!(Domain::<TestBackend>::new((1.0, 1.0), (1, 4), &device).is_err());
        assert!(DomainConfig::new().with_ny(1).init::<TestBackend>(&device).is_err());
    }
}
