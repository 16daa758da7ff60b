use super::Tensor;
use std::ops::{Index, IndexMut};

// 引用式索引：`tensor[[i, j]]`或`tensor[&idx[..]]`，索引个数须等于张量阶数
impl<const N: usize> Index<[usize; N]> for Tensor {
    type Output = f64;

    fn index(&self, index: [usize; N]) -> &Self::Output {
        &self.data[&index[..]]
    }
}

impl<const N: usize> IndexMut<[usize; N]> for Tensor {
    fn index_mut(&mut self, index: [usize; N]) -> &mut Self::Output {
        &mut self.data[&index[..]]
    }
}

impl Index<&[usize]> for Tensor {
    type Output = f64;

    fn index(&self, index: &[usize]) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<&[usize]> for Tensor {
    fn index_mut(&mut self, index: &[usize]) -> &mut Self::Output {
        &mut self.data[index]
    }
}
