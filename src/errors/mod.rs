use thiserror::Error;

/// 张量自身的构造/形状错误。张量辅助方法遇到这些情况时直接panic（属编程错误），
/// 本枚举只负责提供统一的报错文案。
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TensorError {
    #[error("数据长度{data_len}与形状{shape:?}所需的元素个数不一致")]
    DataLenMismatch { data_len: usize, shape: Vec<usize> },
    #[error("张量形状不兼容")]
    IncompatibleShape,
    #[error("矩阵乘法要求两个2阶张量且前者列数等于后者行数：{left:?} × {right:?}")]
    MatMulShape { left: Vec<usize>, right: Vec<usize> },
}

/// 网络层的错误类型
#[derive(Error, Debug, PartialEq)]
pub enum LayerError {
    /// 构造时给出了非法的超参数
    #[error("层配置错误：{0}")]
    Configuration(String),
    #[error("形状不匹配：期望{expected:?}，得到{got:?}（{message}）")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
        message: String,
    },
    /// 在没有有效前向缓存的情况下调用了反向传播
    #[error("层状态错误：{0}")]
    State(String),
    #[error("层描述解析失败：{0}")]
    Descriptor(String),
}

impl LayerError {
    pub(crate) fn shape_mismatch(expected: &[usize], got: &[usize], message: &str) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
            message: message.to_string(),
        }
    }
}

impl From<serde_json::Error> for LayerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Descriptor(err.to_string())
    }
}
