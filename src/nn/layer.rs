/*
 * @Date         : 2026-10-17
 * @Description  : 网络层的公共契约
 *
 * 设计决策：
 * - 每个层都是独立的值，构造时固定输入形状与超参数
 * - `forward`覆盖写入单槽缓存，`backprop`消费该缓存；二者须成对、交替调用
 * - 通过`enum_dispatch`让三种层可以放进同一个集合里，但本库不提供把层串起来的网络容器
 */

use std::fmt;

use enum_dispatch::enum_dispatch;

use super::{Conv, LayerDescriptor, MaxPool, SoftMax};
use crate::errors::LayerError;
use crate::tensor::Tensor;

/// 一次反向传播的结果
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGrads {
    /// 损失对本层输入的梯度；形状同输入形状
    pub input: Option<Tensor>,
    /// 损失对各可训练参数的梯度，顺序与`TraitLayer::parameters`一致，形状与对应参数完全相同
    pub params: Vec<Tensor>,
}

#[enum_dispatch]
pub trait TraitLayer {
    fn name(&self) -> &'static str;

    fn input_shape(&self) -> &[usize];

    /// 由输入形状和超参数推出的输出形状（纯函数，可反复调用）
    fn output_shape(&self) -> Vec<usize>;

    /// 前向传播。输入形状须与`input_shape()`严格一致，否则返回`LayerError::ShapeMismatch`。
    /// 成功时缓存反向传播所需的中间量；失败时不会留下任何有效缓存。
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, LayerError>;

    /// 反向传播。`output_grad`为损失对本层输出的梯度。
    /// 须在一次成功的`forward`之后调用，否则返回`LayerError::State`；成功后缓存被消费。
    fn backprop(&mut self, output_grad: &Tensor) -> Result<LayerGrads, LayerError>;

    /// 可训练参数，顺序固定
    fn parameters(&self) -> Vec<&Tensor> {
        Vec::new()
    }

    /// 可训练参数的标量总数
    fn parameter_count(&self) -> usize {
        self.parameters().iter().map(|p| p.size()).sum()
    }

    /// 当前是否持有可供`backprop`使用的前向缓存
    fn has_cache(&self) -> bool;

    /// 只含超参数的描述（不含权重）
    fn descriptor(&self) -> LayerDescriptor;
}

#[enum_dispatch(TraitLayer)]
#[derive(Debug, Clone)]
pub enum Layer {
    Conv(Conv),
    MaxPool(MaxPool),
    SoftMax(SoftMax),
}

pub(in crate::nn) fn fmt_layer(layer: &impl TraitLayer, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
        f,
        "{}: {:?} --> {:?}",
        layer.name(),
        layer.input_shape(),
        layer.output_shape()
    )
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_layer(self, f)
    }
}

/// 校验构造时给出的输入形状：阶数不低于`min_rank`且每一维都为正
pub(in crate::nn) fn check_input_shape(
    layer_name: &str,
    input_shape: &[usize],
    min_rank: usize,
) -> Result<(), LayerError> {
    if input_shape.len() < min_rank {
        return Err(LayerError::Configuration(format!(
            "{layer_name}需要至少{min_rank}维的输入，得到{input_shape:?}"
        )));
    }
    if input_shape.contains(&0) {
        return Err(LayerError::Configuration(format!(
            "{layer_name}的输入形状每一维都须为正，得到{input_shape:?}"
        )));
    }
    Ok(())
}

/// 校验前向传播的输入形状
pub(in crate::nn) fn check_forward_input(
    layer_name: &str,
    expected: &[usize],
    input: &Tensor,
) -> Result<(), LayerError> {
    if input.shape() != expected {
        return Err(LayerError::shape_mismatch(
            expected,
            input.shape(),
            &format!("{layer_name}前向传播的输入形状错误"),
        ));
    }
    Ok(())
}

pub(in crate::nn) fn missing_cache(layer_name: &str) -> LayerError {
    LayerError::State(format!("{layer_name}缓存为空，需先执行前向传播"))
}
