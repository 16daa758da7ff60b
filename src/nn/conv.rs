/*
 * @Date         : 2026-10-17
 * @Description  : 沿最后两维做卷积的层
 *
 * 设计决策：
 * - 步长固定为1、无填充，故输出的最后两维各缩小`conv_size - 1`，并在末尾追加一维`num_filters`
 * - 最后两维之前的所有维度视为batch维，各自独立卷积
 * - 卷积核形状为[num_filters, conv_size, conv_size]，初始化为标准正态 / conv_size²
 */

use std::fmt;

use log::{debug, trace};
use rand::Rng;

use super::layer::{check_forward_input, check_input_shape, fmt_layer, missing_cache};
use super::{LayerDescriptor, LayerGrads, TraitLayer};
use crate::errors::LayerError;
use crate::tensor::Tensor;

/// 卷积层
#[derive(Debug, Clone)]
pub struct Conv {
    input_shape: Vec<usize>,
    conv_size: usize,
    num_filters: usize,
    kernels: Tensor,

    // 缓存（用于反向传播）
    input_cache: Option<Tensor>,
}

impl Conv {
    /// 创建卷积层
    ///
    /// # 参数
    /// - `input_shape`: 至少2维，最后两维为卷积的空间维，且都不小于`conv_size`
    /// - `conv_size`: 卷积核边长，须为正奇数
    /// - `num_filters`: 卷积核个数，须为正
    /// - `rng`: 用于初始化卷积核的随机源
    pub fn new<R: Rng + ?Sized>(
        input_shape: &[usize],
        conv_size: usize,
        num_filters: usize,
        rng: &mut R,
    ) -> Result<Self, LayerError> {
        // 1. 验证超参数
        if conv_size % 2 != 1 {
            return Err(LayerError::Configuration(format!(
                "Conv的卷积核边长须为正奇数，得到{conv_size}"
            )));
        }
        if num_filters == 0 {
            return Err(LayerError::Configuration(
                "Conv的卷积核个数须为正".to_string(),
            ));
        }

        // 2. 验证输入形状
        check_input_shape("Conv", input_shape, 2)?;
        let rank = input_shape.len();
        let (n1, n2) = (input_shape[rank - 2], input_shape[rank - 1]);
        if n1 < conv_size || n2 < conv_size {
            return Err(LayerError::Configuration(format!(
                "Conv的卷积核{conv_size}x{conv_size}超出输入空间尺寸{n1}x{n2}"
            )));
        }

        // 3. 初始化卷积核
        let scale = (conv_size * conv_size) as f64;
        let kernels = Tensor::new_normal(0.0, 1.0, &[num_filters, conv_size, conv_size], rng)
            .map(|w| w / scale);

        debug!("创建Conv层：输入{input_shape:?}，核{conv_size}x{conv_size}，{num_filters}个滤波器");
        Ok(Self {
            input_shape: input_shape.to_vec(),
            conv_size,
            num_filters,
            kernels,
            input_cache: None,
        })
    }

    pub const fn conv_size(&self) -> usize {
        self.conv_size
    }

    pub const fn num_filters(&self) -> usize {
        self.num_filters
    }

    /// 卷积核，形状为[num_filters, conv_size, conv_size]
    pub const fn kernels(&self) -> &Tensor {
        &self.kernels
    }

    /// 替换卷积核；形状须与原卷积核一致
    pub fn set_kernels(&mut self, kernels: Tensor) -> Result<(), LayerError> {
        if !kernels.is_same_shape(&self.kernels) {
            return Err(LayerError::shape_mismatch(
                self.kernels.shape(),
                kernels.shape(),
                "Conv卷积核形状错误",
            ));
        }
        self.kernels = kernels;
        Ok(())
    }

    /// (batch, n1, n2)：最后两维之前的维度合并为一个batch维（没有时为1）
    fn split_dims(&self) -> (usize, usize, usize) {
        let rank = self.input_shape.len();
        let batch = self.input_shape[..rank - 2].iter().product();
        (batch, self.input_shape[rank - 2], self.input_shape[rank - 1])
    }

    /// 输出的空间尺寸
    const fn out_dims(&self, n1: usize, n2: usize) -> (usize, usize) {
        (n1 - self.conv_size + 1, n2 - self.conv_size + 1)
    }
}

impl TraitLayer for Conv {
    fn name(&self) -> &'static str {
        "Conv"
    }

    fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }

    fn output_shape(&self) -> Vec<usize> {
        let mut out_shape = self.input_shape.clone();
        let rank = out_shape.len();
        out_shape[rank - 2] -= self.conv_size - 1;
        out_shape[rank - 1] -= self.conv_size - 1;
        out_shape.push(self.num_filters);
        out_shape
    }

    fn forward(&mut self, input: &Tensor) -> Result<Tensor, LayerError> {
        self.input_cache = None;
        check_forward_input(self.name(), &self.input_shape, input)?;

        let (batch, n1, n2) = self.split_dims();
        let (o1, o2) = self.out_dims(n1, n2);
        let (k, nf) = (self.conv_size, self.num_filters);
        let x = input.to_vec();
        let w = self.kernels.to_vec();

        // y[b, i, j, f] = Σ_{a,c} x[b, i+a, j+c] · w[f, a, c]
        let mut y = vec![0.0; batch * o1 * o2 * nf];
        for b in 0..batch {
            for i in 0..o1 {
                for j in 0..o2 {
                    let out_base = ((b * o1 + i) * o2 + j) * nf;
                    for f in 0..nf {
                        let mut sum = 0.0;
                        for a in 0..k {
                            for c in 0..k {
                                sum += x[(b * n1 + i + a) * n2 + j + c] * w[(f * k + a) * k + c];
                            }
                        }
                        y[out_base + f] = sum;
                    }
                }
            }
        }

        trace!("Conv前向传播：{:?} -> {:?}", input.shape(), self.output_shape());
        self.input_cache = Some(input.clone());
        Ok(Tensor::new(&y, &self.output_shape()))
    }

    /// 卷积核梯度：dL/dw[f, a, c] = Σ_{b,i,j} dL/dy[b, i, j, f] · x[b, i+a, j+c]
    ///
    /// 输入梯度为转置卷积：每个输出位置的梯度按卷积核加权、散回它所来自的窗口，窗口重叠处累加。
    fn backprop(&mut self, output_grad: &Tensor) -> Result<LayerGrads, LayerError> {
        if self.input_cache.is_none() {
            return Err(missing_cache(self.name()));
        }
        let output_shape = self.output_shape();
        if output_grad.shape() != output_shape.as_slice() {
            return Err(LayerError::shape_mismatch(
                &output_shape,
                output_grad.shape(),
                "Conv上游梯度形状错误",
            ));
        }
        let input = self
            .input_cache
            .take()
            .ok_or_else(|| missing_cache(self.name()))?;

        let (batch, n1, n2) = self.split_dims();
        let (o1, o2) = self.out_dims(n1, n2);
        let (k, nf) = (self.conv_size, self.num_filters);
        let x = input.to_vec();
        let w = self.kernels.to_vec();
        let g = output_grad.to_vec();

        let mut grad_w = vec![0.0; nf * k * k];
        let mut grad_x = vec![0.0; batch * n1 * n2];
        for b in 0..batch {
            for i in 0..o1 {
                for j in 0..o2 {
                    let out_base = ((b * o1 + i) * o2 + j) * nf;
                    for f in 0..nf {
                        let grad_val = g[out_base + f];
                        for a in 0..k {
                            for c in 0..k {
                                let in_idx = (b * n1 + i + a) * n2 + j + c;
                                let w_idx = (f * k + a) * k + c;
                                grad_w[w_idx] += grad_val * x[in_idx];
                                grad_x[in_idx] += grad_val * w[w_idx];
                            }
                        }
                    }
                }
            }
        }

        trace!("Conv反向传播：上游梯度{:?}", output_grad.shape());
        Ok(LayerGrads {
            input: Some(Tensor::new(&grad_x, &self.input_shape)),
            params: vec![Tensor::new(&grad_w, self.kernels.shape())],
        })
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.kernels]
    }

    fn has_cache(&self) -> bool {
        self.input_cache.is_some()
    }

    fn descriptor(&self) -> LayerDescriptor {
        LayerDescriptor::Conv {
            input_shape: self.input_shape.clone(),
            conv_size: self.conv_size,
            num_filters: self.num_filters,
        }
    }
}

impl fmt::Display for Conv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_layer(self, f)
    }
}
