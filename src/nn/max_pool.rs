/*
 * @Date         : 2026-10-17
 * @Description  : 沿前两维做最大池化的层
 *
 * 设计决策：
 * - 窗口不重叠，步长等于`pool_size`；维度不能整除时最后一个窗口较小（输出尺寸向上取整）
 * - 前两维之后的维度原样保留，各自独立取最大值
 * - 缓存输入与输出：反向传播时，输入值等于所在窗口最大值的位置才接收梯度
 * - 并列最大值：所有并列位置都接收完整的上游梯度（不做均分）
 * - 窗口内含NaN时输出NaN，反向传播时梯度传给窗口内的NaN位置
 */

use std::fmt;

use log::{debug, trace};

use super::layer::{check_forward_input, check_input_shape, fmt_layer, missing_cache};
use super::{LayerDescriptor, LayerGrads, TraitLayer};
use crate::errors::LayerError;
use crate::tensor::Tensor;

#[derive(Debug, Clone)]
struct PoolCache {
    input: Tensor,
    output: Tensor,
}

/// 最大池化层
#[derive(Debug, Clone)]
pub struct MaxPool {
    input_shape: Vec<usize>,
    pool_size: usize,
    cache: Option<PoolCache>,
}

impl MaxPool {
    /// 创建最大池化层
    ///
    /// # 参数
    /// - `input_shape`: 至少2维，池化作用于前两维
    /// - `pool_size`: 池化窗口边长，须为正
    pub fn new(input_shape: &[usize], pool_size: usize) -> Result<Self, LayerError> {
        if pool_size == 0 {
            return Err(LayerError::Configuration(
                "MaxPool的池化窗口边长须为正".to_string(),
            ));
        }
        check_input_shape("MaxPool", input_shape, 2)?;

        debug!("创建MaxPool层：输入{input_shape:?}，窗口{pool_size}x{pool_size}");
        Ok(Self {
            input_shape: input_shape.to_vec(),
            pool_size,
            cache: None,
        })
    }

    pub const fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// (n1, n2, rest)：前两维之后的维度合并为一维（没有时为1）
    fn split_dims(&self) -> (usize, usize, usize) {
        let rest = self.input_shape[2..].iter().product();
        (self.input_shape[0], self.input_shape[1], rest)
    }

    const fn pooled_len(&self, len: usize) -> usize {
        len.div_ceil(self.pool_size)
    }
}

impl TraitLayer for MaxPool {
    fn name(&self) -> &'static str {
        "MaxPool"
    }

    fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }

    fn output_shape(&self) -> Vec<usize> {
        let mut out_shape = self.input_shape.clone();
        out_shape[0] = self.pooled_len(out_shape[0]);
        out_shape[1] = self.pooled_len(out_shape[1]);
        out_shape
    }

    fn forward(&mut self, input: &Tensor) -> Result<Tensor, LayerError> {
        self.cache = None;
        check_forward_input(self.name(), &self.input_shape, input)?;

        let (n1, n2, rest) = self.split_dims();
        let (o1, o2) = (self.pooled_len(n1), self.pooled_len(n2));
        let ps = self.pool_size;
        let x = input.to_vec();

        let mut y = vec![f64::NEG_INFINITY; o1 * o2 * rest];
        for i in 0..o1 {
            for j in 0..o2 {
                let out_base = (i * o2 + j) * rest;
                for p in (ps * i)..n1.min(ps * (i + 1)) {
                    for q in (ps * j)..n2.min(ps * (j + 1)) {
                        let in_base = (p * n2 + q) * rest;
                        for t in 0..rest {
                            let val = x[in_base + t];
                            // NaN一旦出现就保留
                            if val.is_nan() || val > y[out_base + t] {
                                y[out_base + t] = val;
                            }
                        }
                    }
                }
            }
        }

        let output = Tensor::new(&y, &self.output_shape());
        trace!("MaxPool前向传播：{:?} -> {:?}", input.shape(), output.shape());
        self.cache = Some(PoolCache {
            input: input.clone(),
            output: output.clone(),
        });
        Ok(output)
    }

    /// 对每个输入位置(p, q, ...)，其所属输出位置为(p / pool_size, q / pool_size, ...)；
    /// 若输入值等于该输出位置缓存的最大值，则把该处的上游梯度原样传回，否则为0。
    fn backprop(&mut self, output_grad: &Tensor) -> Result<LayerGrads, LayerError> {
        if self.cache.is_none() {
            return Err(missing_cache(self.name()));
        }
        let output_shape = self.output_shape();
        if output_grad.shape() != output_shape.as_slice() {
            return Err(LayerError::shape_mismatch(
                &output_shape,
                output_grad.shape(),
                "MaxPool上游梯度形状错误",
            ));
        }
        let PoolCache { input, output } =
            self.cache.take().ok_or_else(|| missing_cache(self.name()))?;

        let (n1, n2, rest) = self.split_dims();
        let o2 = self.pooled_len(n2);
        let ps = self.pool_size;
        let x = input.to_vec();
        let y = output.to_vec();
        let g = output_grad.to_vec();

        let mut grad_x = vec![0.0; n1 * n2 * rest];
        for p in 0..n1 {
            for q in 0..n2 {
                let in_base = (p * n2 + q) * rest;
                let out_base = ((p / ps) * o2 + q / ps) * rest;
                for t in 0..rest {
                    let (max_val, val) = (y[out_base + t], x[in_base + t]);
                    if max_val == val || (max_val.is_nan() && val.is_nan()) {
                        grad_x[in_base + t] = g[out_base + t];
                    }
                }
            }
        }

        trace!("MaxPool反向传播：上游梯度{:?}", output_grad.shape());
        Ok(LayerGrads {
            input: Some(Tensor::new(&grad_x, &self.input_shape)),
            params: Vec::new(),
        })
    }

    fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    fn descriptor(&self) -> LayerDescriptor {
        LayerDescriptor::MaxPool {
            input_shape: self.input_shape.clone(),
            pool_size: self.pool_size,
        }
    }
}

impl fmt::Display for MaxPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_layer(self, f)
    }
}
