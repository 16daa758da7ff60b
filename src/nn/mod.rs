/*
 * @Date         : 2026-10-17
 * @Description  : 负责神经网络层（卷积、最大池化、softmax）的前向与反向传播
 */

mod conv;
mod descriptor;
mod layer;
mod max_pool;
mod softmax;

pub use conv::Conv;
pub use descriptor::LayerDescriptor;
pub use layer::{Layer, LayerGrads, TraitLayer};
pub use max_pool::MaxPool;
pub use softmax::SoftMax;

#[cfg(test)]
mod tests;
