/*
 * @Date         : 2026-10-17
 * @Description  : 层描述符（Layer Descriptor）
 *                 只记录层的类型与超参数，用于从配置构建层；不含任何权重
 */

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{Conv, Layer, MaxPool, SoftMax};
use crate::errors::LayerError;

const fn default_conv_size() -> usize {
    3
}

const fn default_num_filters() -> usize {
    1
}

/// 层类型描述（包含类型特定的超参数）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LayerDescriptor {
    Conv {
        input_shape: Vec<usize>,
        #[serde(default = "default_conv_size")]
        conv_size: usize,
        #[serde(default = "default_num_filters")]
        num_filters: usize,
    },
    MaxPool {
        input_shape: Vec<usize>,
        pool_size: usize,
    },
    SoftMax {
        input_shape: Vec<usize>,
        nodes: usize,
    },
}

impl LayerDescriptor {
    /// 转换为 JSON 字符串
    pub fn to_json(&self) -> Result<String, LayerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 从 JSON 字符串解析
    pub fn from_json(json: &str) -> Result<Self, LayerError> {
        Ok(serde_json::from_str(json)?)
    }

    /// 按描述构建层，带权重的层用`rng`初始化
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Layer, LayerError> {
        let layer = match self {
            Self::Conv {
                input_shape,
                conv_size,
                num_filters,
            } => Conv::new(input_shape, *conv_size, *num_filters, rng)?.into(),
            Self::MaxPool {
                input_shape,
                pool_size,
            } => MaxPool::new(input_shape, *pool_size)?.into(),
            Self::SoftMax { input_shape, nodes } => {
                SoftMax::new(input_shape, *nodes, rng)?.into()
            }
        };
        Ok(layer)
    }
}
