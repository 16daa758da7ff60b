/*
 * @Date         : 2026-10-17
 * @Description  : 全连接仿射变换 + softmax 的分类头
 *                 y = bias + weight·x,  o_i = exp(y_i) / Σ_k exp(y_k)
 */

use std::fmt;

use log::{debug, trace};
use rand::Rng;

use super::layer::{check_forward_input, check_input_shape, fmt_layer, missing_cache};
use super::{LayerDescriptor, LayerGrads, TraitLayer};
use crate::errors::LayerError;
use crate::tensor::Tensor;

#[derive(Debug, Clone)]
struct SoftMaxCache {
    /// 展平后的输入，形状[n_x]
    input: Tensor,
    /// 输出概率，形状[nodes]
    output: Tensor,
}

/// Softmax分类层
///
/// ## 参数
/// - `weight`: [nodes, n_x]，n_x为输入形状各维之积，初始化为标准正态 / n_x
/// - `bias`: [nodes]，初始化为0
///
/// ## 输出
/// - 形状[nodes]的概率分布
#[derive(Debug, Clone)]
pub struct SoftMax {
    input_shape: Vec<usize>,
    weight: Tensor,
    bias: Tensor,
    cache: Option<SoftMaxCache>,
}

impl SoftMax {
    pub fn new<R: Rng + ?Sized>(
        input_shape: &[usize],
        nodes: usize,
        rng: &mut R,
    ) -> Result<Self, LayerError> {
        if nodes == 0 {
            return Err(LayerError::Configuration(
                "SoftMax的输出节点数须为正".to_string(),
            ));
        }
        check_input_shape("SoftMax", input_shape, 1)?;

        let n_x = input_shape.iter().product::<usize>();
        let weight = Tensor::new_normal(0.0, 1.0, &[nodes, n_x], rng).map(|w| w / n_x as f64);
        let bias = Tensor::zeros(&[nodes]);

        debug!("创建SoftMax层：输入{input_shape:?}，{nodes}个输出节点");
        Ok(Self {
            input_shape: input_shape.to_vec(),
            weight,
            bias,
            cache: None,
        })
    }

    pub fn nodes(&self) -> usize {
        self.bias.size()
    }

    pub const fn weight(&self) -> &Tensor {
        &self.weight
    }

    pub const fn bias(&self) -> &Tensor {
        &self.bias
    }

    /// 替换权重；形状须为[nodes, n_x]
    pub fn set_weight(&mut self, weight: Tensor) -> Result<(), LayerError> {
        if !weight.is_same_shape(&self.weight) {
            return Err(LayerError::shape_mismatch(
                self.weight.shape(),
                weight.shape(),
                "SoftMax权重形状错误",
            ));
        }
        self.weight = weight;
        Ok(())
    }

    /// 替换偏置；形状须为[nodes]
    pub fn set_bias(&mut self, bias: Tensor) -> Result<(), LayerError> {
        if !bias.is_same_shape(&self.bias) {
            return Err(LayerError::shape_mismatch(
                self.bias.shape(),
                bias.shape(),
                "SoftMax偏置形状错误",
            ));
        }
        self.bias = bias;
        Ok(())
    }

    /// 数值稳定的softmax：先减去最大值再取指数，结果与直接计算一致
    fn softmax(logits: &[f64]) -> Vec<f64> {
        let max_val = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = logits.iter().map(|&y| (y - max_val).exp()).collect();
        let sum_exp: f64 = exps.iter().sum();
        exps.into_iter().map(|z| z / sum_exp).collect()
    }
}

impl TraitLayer for SoftMax {
    fn name(&self) -> &'static str {
        "SoftMax"
    }

    fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }

    fn output_shape(&self) -> Vec<usize> {
        vec![self.nodes()]
    }

    fn forward(&mut self, input: &Tensor) -> Result<Tensor, LayerError> {
        self.cache = None;
        check_forward_input(self.name(), &self.input_shape, input)?;

        let x = input.flatten();
        let n_x = x.size();
        let wx = self.weight.mat_mul(&x.reshape(&[n_x, 1]));
        let logits: Vec<f64> = wx
            .to_vec()
            .iter()
            .zip(self.bias.to_vec())
            .map(|(wx_i, b_i)| wx_i + b_i)
            .collect();
        let output = Tensor::new(&Self::softmax(&logits), &[self.nodes()]);

        trace!("SoftMax前向传播：{:?} -> {:?}", input.shape(), output.shape());
        self.cache = Some(SoftMaxCache {
            input: x,
            output: output.clone(),
        });
        Ok(output)
    }

    /// 上游梯度`g`可以是[nodes]，也可以是按行堆叠的[p, nodes]。
    ///
    /// 记 J = diag(o) - o·oᵀ 为softmax的Jacobi矩阵，h = g·J，则：
    /// - dL/dx = h·weight，重塑为输入形状（批量时前置一维p）
    /// - dL/dbias = h
    /// - dL/dweight[i, k] = h[i]·x[k]
    fn backprop(&mut self, output_grad: &Tensor) -> Result<LayerGrads, LayerError> {
        if self.cache.is_none() {
            return Err(missing_cache(self.name()));
        }
        let n_o = self.nodes();
        let grad_shape = output_grad.shape();
        let rows = match grad_shape {
            [n] if *n == n_o => None,
            [p, n] if *n == n_o => Some(*p),
            _ => {
                return Err(LayerError::shape_mismatch(
                    &[n_o],
                    grad_shape,
                    "SoftMax上游梯度须为[nodes]或[p, nodes]",
                ));
            }
        };
        let SoftMaxCache { input, output } =
            self.cache.take().ok_or_else(|| missing_cache(self.name()))?;

        let p = rows.unwrap_or(1);
        let n_x = input.size();
        let o = output.to_vec();

        // do/dy = diag(o) - outer(o, o)
        let mut jacobi = Tensor::zeros(&[n_o, n_o]);
        for i in 0..n_o {
            for j in 0..n_o {
                let diag = if i == j { o[i] } else { 0.0 };
                jacobi[[i, j]] = diag - o[i] * o[j];
            }
        }

        let h = output_grad.reshape(&[p, n_o]).mat_mul(&jacobi); // p x n_o
        let grad_x = h.mat_mul(&self.weight); // p x n_x

        let x = input.to_vec();
        let mut grad_w = Vec::with_capacity(p * n_o * n_x);
        for h_i in h.to_vec() {
            grad_w.extend(x.iter().map(|x_k| h_i * x_k));
        }

        let (x_shape, bias_shape, weight_shape) = match rows {
            None => (self.input_shape.clone(), vec![n_o], vec![n_o, n_x]),
            Some(p) => {
                let mut x_shape = vec![p];
                x_shape.extend_from_slice(&self.input_shape);
                (x_shape, vec![p, n_o], vec![p, n_o, n_x])
            }
        };

        trace!("SoftMax反向传播：上游梯度{grad_shape:?}");
        Ok(LayerGrads {
            input: Some(grad_x.reshape(&x_shape)),
            params: vec![h.reshape(&bias_shape), Tensor::new(&grad_w, &weight_shape)],
        })
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.bias, &self.weight]
    }

    fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    fn descriptor(&self) -> LayerDescriptor {
        LayerDescriptor::SoftMax {
            input_shape: self.input_shape.clone(),
            nodes: self.nodes(),
        }
    }
}

impl fmt::Display for SoftMax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_layer(self, f)
    }
}
