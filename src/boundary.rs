//! 境界条件と外力の定義。
//!
//! 境界条件は「辺」と、u・v それぞれに対する任意の拘束関数の組で表します。
//! 拘束関数は辺上の座標配列から目標値の配列を返します。

use crate::error::DemError;
use burn::prelude::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use std::sync::Arc;

/// 矩形領域の辺。
///
/// グリッドの第1軸が x、第2軸が y であることを前提にスライスを選びます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    /// x = 0
    Left,
    /// x = length
    Right,
    /// y = 0
    Bottom,
    /// y = height
    Top,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::Left, Edge::Right, Edge::Bottom, Edge::Top];

    fn ranges(self, nx: usize, ny: usize) -> [Range<usize>; 2] {
        match self {
            Edge::Left => [0..1, 0..ny],
            Edge::Right => [nx - 1..nx, 0..ny],
            Edge::Bottom => [0..nx, 0..1],
            Edge::Top => [0..nx, ny - 1..ny],
        }
    }

    /// `(nx, ny)` グリッドからこの辺に沿った 1 次元スライスを取り出します。
    pub fn select<B: Backend>(self, grid: Tensor<B, 2>) -> Tensor<B, 1> {
        let [nx, ny] = grid.dims();
        let len = match self {
            Edge::Left | Edge::Right => ny,
            Edge::Bottom | Edge::Top => nx,
        };
        grid.slice(self.ranges(nx, ny)).reshape([len])
    }

    /// グリッドのこの辺上の値を `value` で置き換えます。
    pub fn fill<B: Backend>(self, grid: Tensor<B, 2>, value: f64) -> Tensor<B, 2> {
        let [nx, ny] = grid.dims();
        let ranges = self.ranges(nx, ny);
        let shape = [ranges[0].len(), ranges[1].len()];
        let values = Tensor::full(shape, value, &grid.device());
        grid.slice_assign(ranges, values)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Edge::Left => "left",
            Edge::Right => "right",
            Edge::Bottom => "bottom",
            Edge::Top => "top",
        };
        f.write_str(name)
    }
}

impl FromStr for Edge {
    type Err = DemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Edge::Left),
            "right" => Ok(Edge::Right),
            "bottom" => Ok(Edge::Bottom),
            "top" => Ok(Edge::Top),
            _ => Err(DemError::UnknownEdge(s.to_string())),
        }
    }
}

/// 辺上の座標 `(x, y)` から変位の目標値を返す関数。
pub type EdgeFn<B> = Arc<dyn Fn(Tensor<B, 1>, Tensor<B, 1>) -> Tensor<B, 1> + Send + Sync>;

/// グリッド全体の座標 `(X, Y)` から外力 `(fx, fy)` を返す関数。
pub type ForceField<B> =
    Arc<dyn Fn(Tensor<B, 2>, Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) + Send + Sync>;

/// 1 つの辺に対する境界条件。`None` の成分にはペナルティを課しません。
#[derive(Clone)]
pub struct BoundaryCondition<B: Backend> {
    pub edge: Edge,
    pub u: Option<EdgeFn<B>>,
    pub v: Option<EdgeFn<B>>,
}

impl<B: Backend> BoundaryCondition<B> {
    /// 拘束のない（自由）辺。
    pub fn free(edge: Edge) -> Self {
        Self {
            edge,
            u: None,
            v: None,
        }
    }

    /// u = v = 0 の固定辺。
    pub fn clamped(edge: Edge) -> Self {
        Self {
            edge,
            u: Some(zero()),
            v: Some(zero()),
        }
    }

    pub fn with_u(mut self, constraint: EdgeFn<B>) -> Self {
        self.u = Some(constraint);
        self
    }

    pub fn with_v(mut self, constraint: EdgeFn<B>) -> Self {
        self.v = Some(constraint);
        self
    }
}

impl<B: Backend> fmt::Debug for BoundaryCondition<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundaryCondition")
            .field("edge", &self.edge)
            .field("u", &self.u.is_some())
            .field("v", &self.v.is_some())
            .finish()
    }
}

/// 目標値 0。
pub fn zero<B: Backend>() -> EdgeFn<B> {
    Arc::new(|x: Tensor<B, 1>, _y: Tensor<B, 1>| Tensor::zeros_like(&x))
}

/// 一定の目標値。
pub fn constant<B: Backend>(value: f64) -> EdgeFn<B> {
    Arc::new(move |x: Tensor<B, 1>, _y: Tensor<B, 1>| {
        Tensor::zeros_like(&x).add_scalar(value)
    })
}

/// 指定した辺の格子点にだけ `(fx, fy)` を与え、それ以外は 0 とする外力。
pub fn edge_load<B: Backend>(edge: Edge, fx: f64, fy: f64) -> ForceField<B> {
    Arc::new(move |x: Tensor<B, 2>, _y: Tensor<B, 2>| {
        let fx_grid = edge.fill(Tensor::zeros_like(&x), fx);
        let fy_grid = edge.fill(Tensor::zeros_like(&x), fy);
        (fx_grid, fy_grid)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn parses_edge_tags() {
        assert_eq!("left".parse::<Edge>().unwrap(), Edge::Left);
        assert_eq!(" Top ".parse::<Edge>().unwrap(), Edge::Top);
        for edge in Edge::ALL {
            assert_eq!(edge.to_string().parse::<Edge>().unwrap(), edge);
        }
    }

    #[test]
    fn unknown_edge_tag_is_an_error() {
        let result = "front".parse::<Edge>();
        assert!(matches!(result, Err(DemError::UnknownEdge(tag)) if tag == "front"));
    }

    #[test]
    fn selects_edges_along_axis_convention() {
        let device = Default::default();
        let domain = Domain::<TestBackend>::new((2.0, 1.0), (5, 4), &device).unwrap();
        let grid = domain.grid();

        let left_x = Edge::Left.select(grid.x.clone());
        assert_eq!(left_x.dims(), [4]);
        assert_eq!(left_x.into_data().to_vec::<f32>().unwrap(), vec![0.0; 4]);

        let right_x = Edge::Right.select(grid.x.clone());
        assert_eq!(right_x.into_data().to_vec::<f32>().unwrap(), vec![2.0; 4]);

        let bottom_y = Edge::Bottom.select(grid.y.clone());
        assert_eq!(bottom_y.dims(), [5]);
        assert_eq!(bottom_y.into_data().to_vec::<f32>().unwrap(), vec![0.0; 5]);

        let top_y = Edge::Top.select(grid.y.clone());
        assert_eq!(top_y.into_data().to_vec::<f32>().unwrap(), vec![1.0; 5]);

        let top_x = Edge::Top.select(grid.x).into_data().to_vec::<f32>().unwrap();
        assert_eq!(top_x, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
    }

    #[test]
    fn edge_load_only_touches_the_edge() {
        let device = Default::default();
        let domain = Domain::<TestBackend>::new((1.0, 0.2), (4, 3), &device).unwrap();
        let grid = domain.grid();
        let force = edge_load::<TestBackend>(Edge::Top, 0.0, -400.0);
        let (fx, fy) = force(grid.x, grid.y);

        assert_eq!(fx.into_data().to_vec::<f32>().unwrap(), vec![0.0; 12]);
        let fy = fy.into_data().to_vec::<f32>().unwrap();
        for i in 0..4 {
            for j in 0..3 {
                let expected = if j == 2 { -400.0 } else { 0.0 };
                assert_eq!(fy[i * 3 + j], expected);
            }
        }
    }

    #[test]
    fn clamped_condition_targets_zero() {
        let device = Default::default();
        let condition = BoundaryCondition::<TestBackend>::clamped(Edge::Left);
        let x = Tensor::<TestBackend, 1>::from_floats([0.5f32, 1.0, 2.0].as_slice(), &device);
        let target = condition.u.as_ref().unwrap()(x.clone(), x.clone());
        assert_eq!(target.into_data().to_vec::<f32>().unwrap(), vec![0.0; 3]);

        let shifted = BoundaryCondition::<TestBackend>::free(Edge::Top).with_v(constant(0.25));
        assert!(shifted.u.is_none());
        let target = shifted.v.as_ref().unwrap()(x.clone(), x);
        assert_eq!(target.into_data().to_vec::<f32>().unwrap(), vec![0.25; 3]);
    }
}
