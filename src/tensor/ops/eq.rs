use crate::tensor::Tensor;

impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl<'a> PartialEq<&'a Tensor> for Tensor {
    fn eq(&self, other: &&'a Tensor) -> bool {
        self.data == other.data
    }
}
