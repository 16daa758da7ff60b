//! # Scratch Layers
//!
//! 用纯rust手推前向与反向传播的三种神经网络层：
//! - [`nn::Conv`]：沿最后两维的卷积
//! - [`nn::MaxPool`]：沿前两维的最大池化
//! - [`nn::SoftMax`]：全连接 + softmax 的分类头
//!
//! 每个层都实现[`nn::TraitLayer`]：形状推断、`forward`（缓存中间量）与`backprop`（消费缓存、返回梯度）。
//!
//! ```
//! use scratch_layers::nn::{MaxPool, TraitLayer};
//! use scratch_layers::tensor::Tensor;
//!
//! let mut pool = MaxPool::new(&[2, 2], 2).unwrap();
//! let y = pool.forward(&Tensor::new(&[1., 4., 3., 2.], &[2, 2])).unwrap();
//! assert_eq!(y, Tensor::new(&[4.], &[1, 1]));
//! let grads = pool.backprop(&Tensor::new(&[1.], &[1, 1])).unwrap();
//! assert_eq!(grads.input.unwrap(), Tensor::new(&[0., 1., 0., 0.], &[2, 2]));
//! ```

pub mod errors;
pub mod nn;
pub mod tensor;
pub mod utils;
