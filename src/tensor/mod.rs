/*
 * @Date         : 2026-10-17
 * @Description  : 稠密f64张量，作为各网络层之间唯一的数据交换格式
 */

use ndarray::{Array, ArrayD, IxDyn};
use rand::Rng;

use crate::errors::TensorError;

mod index;
mod ops {
    pub mod eq;
    pub mod mat_mul;
}
mod shape;


/// 定义张量的结构体。其可以是标量、向量、矩阵或更高维度的数组。
/// 注：只要通Tensor初始化的都是张量（即使标量也是张量）；
/// 而通常意义上的数字（类型为usize、f64等）就只是纯数（number），在这里不被认为是张量。
#[derive(Debug, Clone)]
pub struct Tensor {
    data: ArrayD<f64>,
}

impl Tensor {
    /// 创建一个张量，若为标量，`shape`可以是[]、[1]、[1,1]...
    /// 若为向量，`shape`可以是[n]、[1,n]、[n,1]；
    /// 若为矩阵，`shape`可以是[n,m]；
    /// 若为更高维度的数组，`shape`可以是[c,n,m,...]；
    /// 注：`data`的长度必须和`shape`中所有元素的乘积相等，否则panic。
    pub fn new(data: &[f64], shape: &[usize]) -> Self {
        let expected_len = shape.iter().product::<usize>();
        assert!(
            data.len() == expected_len,
            "{}",
            TensorError::DataLenMismatch {
                data_len: data.len(),
                shape: shape.to_vec(),
            }
        );
        Self {
            data: Array::from_shape_vec(IxDyn(shape), data.to_vec())
                .expect("长度已校验，构造不会失败"),
        }
    }

    /// 创建一个全零张量
    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            data: ArrayD::zeros(IxDyn(shape)),
        }
    }

    /// 创建一个含`n`个对角元素的单位矩阵
    pub fn new_eye(n: usize) -> Self {
        Self {
            data: Array::eye(n).into_dyn(),
        }
    }

    /// 用给定的随机源创建一个服从正态分布的随机张量。
    /// 随机源由调用方持有，从而同一种子可复现同样的初始化结果。
    pub fn new_normal<R: Rng + ?Sized>(
        mean: f64,
        std_dev: f64,
        shape: &[usize],
        rng: &mut R,
    ) -> Self {
        let data_len = shape.iter().product::<usize>();
        let mut data = Vec::with_capacity(data_len);

        // Box-Muller：一次产生两个样本
        while data.len() < data_len {
            let u1: f64 = rng.r#gen();
            let u2: f64 = rng.r#gen();
            let r = (-2.0 * u1.ln()).sqrt();
            let theta = 2.0 * std::f64::consts::PI * u2;
            let z0 = mean + std_dev * r * theta.cos();
            let z1 = mean + std_dev * r * theta.sin();

            if z0.is_finite() {
                data.push(z0);
            }
            if data.len() < data_len && z1.is_finite() {
                data.push(z1);
            }
        }

        Self::new(&data, shape)
    }

    /// 按行优先顺序拷贝出所有元素
    pub fn to_vec(&self) -> Vec<f64> {
        self.data.iter().copied().collect()
    }

    /// 对每个元素做`f`映射，返回新张量
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            data: self.data.mapv(f),
        }
    }
}
