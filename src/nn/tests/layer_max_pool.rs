/*
 * @Date         : 2026-10-17
 * @Description  : MaxPool 层单元测试
 */

use crate::assert_err;
use crate::errors::LayerError;
use crate::nn::{MaxPool, TraitLayer};
use crate::tensor::Tensor;

#[rustfmt::skip]
const X_4X4: &[f64] = &[
    1., 2., 3., 4.,
    2., 5., 4., 0.,
    0., 0., 0., 0.,
    10., 0., 0., 2.,
];

// ==================== 构造与形状 ====================

#[test]
fn test_max_pool_output_shape() -> Result<(), LayerError> {
    assert_eq!(MaxPool::new(&[4, 4], 2)?.output_shape(), vec![2, 2]);
    // 不能整除时向上取整
    assert_eq!(MaxPool::new(&[5, 3], 2)?.output_shape(), vec![3, 2]);
    // 前两维之后的维度保持不变
    assert_eq!(MaxPool::new(&[6, 6, 3, 2], 3)?.output_shape(), vec![2, 2, 3, 2]);
    // 窗口比输入还大时输出为 1x1
    assert_eq!(MaxPool::new(&[2, 3], 4)?.output_shape(), vec![1, 1]);
    Ok(())
}

#[test]
fn test_max_pool_invalid_config() {
    assert_err!(
        MaxPool::new(&[4, 4], 0),
        LayerError::Configuration("MaxPool的池化窗口边长须为正")
    );
    assert_err!(MaxPool::new(&[4], 2), LayerError::Configuration(_));
    assert_err!(MaxPool::new(&[4, 0], 2), LayerError::Configuration(_));
}

#[test]
fn test_max_pool_has_no_parameters() -> Result<(), LayerError> {
    let pool = MaxPool::new(&[4, 4], 2)?;
    assert!(pool.parameters().is_empty());
    assert_eq!(pool.parameter_count(), 0);
    assert_eq!(pool.pool_size(), 2);
    Ok(())
}

// ==================== 前向传播 ====================

#[test]
fn test_max_pool_forward() -> Result<(), LayerError> {
    let mut pool = MaxPool::new(&[4, 4], 2)?;
    let y = pool.forward(&Tensor::new(X_4X4, &[4, 4]))?;
    assert_eq!(y, Tensor::new(&[5., 4., 10., 2.], &[2, 2]));
    Ok(())
}

#[test]
fn test_max_pool_forward_partial_blocks() -> Result<(), LayerError> {
    let mut pool = MaxPool::new(&[3, 3], 2)?;
    #[rustfmt::skip]
    let x = Tensor::new(&[
        1., 9., 2.,
        3., 4., 8.,
        7., 5., 6.,
    ], &[3, 3]);
    let y = pool.forward(&x)?;
    // 右、下边界上的窗口只有 2x1、1x2、1x1
    assert_eq!(y, Tensor::new(&[9., 8., 7., 6.], &[2, 2]));
    Ok(())
}

#[test]
fn test_max_pool_forward_trailing_axes() -> Result<(), LayerError> {
    // 形状 [2, 2, 2]：最后一维为两个独立通道
    let mut pool = MaxPool::new(&[2, 2, 2], 2)?;
    let x = Tensor::new(&[1., -1., 4., -4., 3., -3., 2., -2.], &[2, 2, 2]);
    let y = pool.forward(&x)?;
    assert_eq!(y, Tensor::new(&[4., -1.], &[1, 1, 2]));
    Ok(())
}

#[test]
fn test_max_pool_forward_negative_values() -> Result<(), LayerError> {
    let mut pool = MaxPool::new(&[2, 2], 2)?;
    let y = pool.forward(&Tensor::new(&[-5., -3., -7., -4.], &[2, 2]))?;
    assert_eq!(y, Tensor::new(&[-3.], &[1, 1]));
    Ok(())
}

#[test]
fn test_max_pool_forward_nan_propagates() -> Result<(), LayerError> {
    let mut pool = MaxPool::new(&[2, 2], 2)?;
    // NaN与普通数值混在同一窗口
    let y = pool.forward(&Tensor::new(&[f64::NAN, 1., 2., 3.], &[2, 2]))?;
    assert_eq!(y.shape(), &[1, 1]);
    assert!(y[[0, 0]].is_nan());

    // 整个窗口都是NaN时不能得到-inf
    let y = pool.forward(&Tensor::new(&[f64::NAN; 4], &[2, 2]))?;
    assert!(y[[0, 0]].is_nan());

    // 只影响所在窗口
    let mut pool = MaxPool::new(&[2, 4], 2)?;
    let y = pool.forward(&Tensor::new(&[f64::NAN, 1., 5., 6., 0., 2., 7., 8.], &[2, 4]))?;
    assert!(y[[0, 0]].is_nan());
    assert_eq!(y[[0, 1]], 8.);
    Ok(())
}

#[test]
fn test_max_pool_forward_wrong_shape() -> Result<(), LayerError> {
    let mut pool = MaxPool::new(&[4, 4], 2)?;
    assert_err!(
        pool.forward(&Tensor::zeros(&[16])),
        LayerError::ShapeMismatch([4, 4], [16], "MaxPool前向传播的输入形状错误")
    );
    Ok(())
}

// ==================== 反向传播 ====================

#[test]
fn test_max_pool_backprop() -> Result<(), LayerError> {
    let mut pool = MaxPool::new(&[4, 4], 2)?;
    pool.forward(&Tensor::new(X_4X4, &[4, 4]))?;
    let grads = pool.backprop(&Tensor::new(&[1., 2., 3., 4.], &[2, 2]))?;

    #[rustfmt::skip]
    let expected = Tensor::new(&[
        0., 0., 0., 2.,
        0., 1., 2., 0.,
        0., 0., 0., 0.,
        3., 0., 0., 4.,
    ], &[4, 4]);
    assert_eq!(grads.input, Some(expected));
    assert!(grads.params.is_empty());
    Ok(())
}

#[test]
fn test_max_pool_backprop_ties_all_receive_gradient() -> Result<(), LayerError> {
    let mut pool = MaxPool::new(&[2, 2], 2)?;
    pool.forward(&Tensor::new(&[1., 1., 0., 1.], &[2, 2]))?;
    let grads = pool.backprop(&Tensor::new(&[5.], &[1, 1]))?;
    // 并列最大值的位置各自获得完整的上游梯度，而非均分
    assert_eq!(grads.input, Some(Tensor::new(&[5., 5., 0., 5.], &[2, 2])));
    Ok(())
}

#[test]
fn test_max_pool_backprop_partial_blocks_and_trailing_axes() -> Result<(), LayerError> {
    let mut pool = MaxPool::new(&[3, 1, 2], 2)?;
    // 通道0：[1, 3, 2]；通道1：[6, 4, 5]
    let x = Tensor::new(&[1., 6., 3., 4., 2., 5.], &[3, 1, 2]);
    let y = pool.forward(&x)?;
    assert_eq!(y, Tensor::new(&[3., 6., 2., 5.], &[2, 1, 2]));

    let grads = pool.backprop(&Tensor::new(&[10., 20., 30., 40.], &[2, 1, 2]))?;
    assert_eq!(
        grads.input,
        Some(Tensor::new(&[0., 20., 10., 0., 30., 40.], &[3, 1, 2]))
    );
    Ok(())
}

#[test]
fn test_max_pool_backprop_state() -> Result<(), LayerError> {
    let mut pool = MaxPool::new(&[4, 4], 2)?;
    let grad = Tensor::zeros(&[2, 2]);
    assert_err!(
        pool.backprop(&grad),
        LayerError::State("MaxPool缓存为空，需先执行前向传播")
    );

    pool.forward(&Tensor::new(X_4X4, &[4, 4]))?;
    assert_err!(
        pool.backprop(&Tensor::zeros(&[4, 4])),
        LayerError::ShapeMismatch([2, 2], [4, 4], "MaxPool上游梯度形状错误")
    );
    // 形状错误不消费缓存
    assert!(pool.has_cache());
    pool.backprop(&grad)?;
    assert!(!pool.has_cache());
    Ok(())
}

#[test]
fn test_max_pool_backprop_nan_routes_to_nan_positions() -> Result<(), LayerError> {
    let mut pool = MaxPool::new(&[2, 2], 2)?;
    pool.forward(&Tensor::new(&[1., f64::NAN, 3., f64::NAN], &[2, 2]))?;
    let grads = pool.backprop(&Tensor::new(&[7.], &[1, 1]))?;
    assert_eq!(grads.input, Some(Tensor::new(&[0., 7., 0., 7.], &[2, 2])));
    Ok(())
}

#[test]
fn test_max_pool_backprop_signed_zero_ties() -> Result<(), LayerError> {
    let mut pool = MaxPool::new(&[2, 2], 2)?;
    let y = pool.forward(&Tensor::new(&[0., -0., -1., -2.], &[2, 2]))?;
    assert_eq!(y[[0, 0]], 0.);
    // 0.0与-0.0相等，两处都算并列最大值
    let grads = pool.backprop(&Tensor::new(&[3.], &[1, 1]))?;
    assert_eq!(grads.input, Some(Tensor::new(&[3., 3., 0., 0.], &[2, 2])));
    Ok(())
}
