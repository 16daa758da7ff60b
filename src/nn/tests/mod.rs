mod layer_max_pool;

use crate::tensor::Tensor;

/// 中心差分求数值梯度：d(loss)/d(x)，`loss`为以`x`为自变量的标量函数
fn numeric_grad(mut loss: impl FnMut(&Tensor) -> f64, x: &Tensor, eps: f64) -> Tensor {
    let base = x.to_vec();
    let grad: Vec<f64> = (0..base.len())
        .map(|i| {
            let mut plus = base.clone();
            let mut minus = base.clone();
            plus[i] += eps;
            minus[i] -= eps;
            let l_plus = loss(&Tensor::new(&plus, x.shape()));
            let l_minus = loss(&Tensor::new(&minus, x.shape()));
            (l_plus - l_minus) / (2.0 * eps)
        })
        .collect();
    Tensor::new(&grad, x.shape())
}

/// 以`weights`加权求和作为标量损失，则 dL/d(output) 恰为`weights`
fn weighted_sum(output: &Tensor, weights: &Tensor) -> f64 {
    output
        .to_vec()
        .iter()
        .zip(weights.to_vec())
        .map(|(o, w)| o * w)
        .sum()
}

fn assert_tensor_close(actual: &Tensor, expected: &Tensor, epsilon: f64) {
    assert_eq!(actual.shape(), expected.shape(), "形状不一致");
    for (a, e) in actual.to_vec().iter().zip(expected.to_vec()) {
        approx::assert_abs_diff_eq!(*a, e, epsilon = epsilon);
    }
}
