use super::Tensor;
use crate::errors::TensorError;

impl Tensor {
    /// 若为向量，`shape`可以是[n]、[1,n]、[n,1]；
    /// 若为矩阵，`shape`可以是[n,m]；
    /// 若为更高维度的数组，`shape`可以是[c,n,m,...]。
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// 张量的维（dim）数、阶（rank）数
    /// 即`shape()`的元素个数--如：形状为`[]`的标量阶数为0，向量阶数为1，矩阵阶数为2，以此类推
    pub fn dimension(&self) -> usize {
        self.data.ndim()
    }

    /// 张量中所有元素的数量
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 判断两个张量的形状是否严格一致。如：形状为 [1, 4]，[1, 4]和[4]是不一致的，会返回false
    pub fn is_same_shape(&self, other: &Self) -> bool {
        self.shape() == other.shape()
    }

    pub fn reshape(&self, shape: &[usize]) -> Self {
        let new_total_elements: usize = shape.iter().product();
        assert!(
            self.size() == new_total_elements,
            "{}",
            TensorError::IncompatibleShape
        );
        let data = self
            .data
            .as_standard_layout()
            .into_owned()
            .into_shape(shape)
            .expect("元素个数已校验，reshape不会失败");
        Self { data }
    }

    /// 展平为1阶张量
    pub fn flatten(&self) -> Self {
        self.reshape(&[self.size()])
    }
}
