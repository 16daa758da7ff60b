use crate::errors::TensorError;
use crate::tensor::Tensor;
use ndarray::Ix2;

impl Tensor {
    /// 实现矩阵乘法。只接受2阶张量，否则会触发panic。
    /// 需要保证前一个张量的列数（col）等于后一个张量的行数（row），否则也会触发panic。
    pub fn mat_mul(&self, other: &Self) -> Self {
        let shape_error = || TensorError::MatMulShape {
            left: self.shape().to_vec(),
            right: other.shape().to_vec(),
        };
        assert!(
            self.dimension() == 2 && other.dimension() == 2 && self.shape()[1] == other.shape()[0],
            "{}",
            shape_error()
        );
        // 将动态维度数组转换为常量维度数组
        let lhs = self
            .data
            .view()
            .into_dimensionality::<Ix2>()
            .expect("阶数已校验");
        let rhs = other
            .data
            .view()
            .into_dimensionality::<Ix2>()
            .expect("阶数已校验");
        Self {
            data: lhs.dot(&rhs).into_dyn(),
        }
    }
}
