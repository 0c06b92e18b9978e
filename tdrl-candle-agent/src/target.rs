//! Target values of temporal-difference learning.
//!
//! Bootstrap values are computed from target networks and must be detached by
//! the caller before they enter a loss.
use anyhow::{bail, Result};
use candle_core::{Device, Tensor, D};
use rand::Rng;
use rand_distr::StandardNormal;

/// One-step Bellman target `reward + (1 - done) * gamma * bootstrap`.
///
/// `is_done` is a `u8` mask. Where it is set, the target is exactly `reward`,
/// whatever the bootstrap value is.
pub fn bellman_target(
    reward: &Tensor,
    is_done: &Tensor,
    gamma: f64,
    bootstrap: &Tensor,
) -> Result<Tensor> {
    let continued = (reward + (bootstrap * gamma)?)?;
    Ok(is_done.where_cond(reward, &continued)?)
}

/// Double-Q bootstrap value.
///
/// The action is chosen by `argmax` over the live network's values
/// `q_live_next` and evaluated with the target network's values `q_tgt_next`.
/// Both are `[batch_size, n_actions]`, the output is `[batch_size]`.
pub fn double_q_bootstrap(q_live_next: &Tensor, q_tgt_next: &Tensor) -> Result<Tensor> {
    let ix = q_live_next.argmax_keepdim(D::Minus1)?;
    Ok(q_tgt_next.gather(&ix, D::Minus1)?.squeeze(D::Minus1)?)
}

/// Bootstrap value of vanilla DQN, the maximum of the target network's values.
pub fn max_q_bootstrap(q_tgt_next: &Tensor) -> Result<Tensor> {
    Ok(q_tgt_next.max(D::Minus1)?)
}

/// Twin-critic bootstrap value, the elementwise minimum of two critics.
pub fn twin_critic_bootstrap(q1: &Tensor, q2: &Tensor) -> Result<Tensor> {
    Ok(q1.minimum(q2)?)
}

/// Noise of target policy smoothing with shape `[batch_size, scale.len()]`.
///
/// Each element is `clamp(N(0, 1) * policy_noise, -noise_clip, noise_clip) * scale[j]`,
/// where `scale` is the half width of the action box.
pub fn smoothing_noise(
    rng: &mut impl Rng,
    batch_size: usize,
    policy_noise: f64,
    noise_clip: f64,
    scale: &[f32],
    device: &Device,
) -> Result<Tensor> {
    if noise_clip < 0.0 {
        bail!("noise_clip must be non-negative, got {}", noise_clip);
    }
    let dim = scale.len();
    let (policy_noise, noise_clip) = (policy_noise as f32, noise_clip as f32);
    let noise = (0..batch_size * dim)
        .map(|i| {
            let z: f32 = rng.sample(StandardNormal);
            (z * policy_noise).max(-noise_clip).min(noise_clip) * scale[i % dim]
        })
        .collect::<Vec<_>>();
    Ok(Tensor::from_vec(noise, (batch_size, dim), device)?)
}

/// Target action `clamp(a + noise, low, high)` of target policy smoothing.
///
/// `a` and `noise` are `[batch_size, dim]`, `low` and `high` are `[dim]`.
pub fn smoothed_target_action(
    a: &Tensor,
    noise: &Tensor,
    low: &Tensor,
    high: &Tensor,
) -> Result<Tensor> {
    Ok((a + noise)?
        .broadcast_maximum(low)?
        .broadcast_minimum(high)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_bellman_target() -> Result<()> {
        let device = Device::Cpu;
        let reward = Tensor::new(&[1.5f32, 2.0, -1.0], &device)?;
        let is_done = Tensor::new(&[1u8, 0, 1], &device)?;
        let bootstrap = Tensor::new(&[1e6f32, 10.0, f32::NAN], &device)?;
        let tgt = bellman_target(&reward, &is_done, 0.99, &bootstrap)?.to_vec1::<f32>()?;

        assert_eq!(tgt[0], 1.5);
        assert!((tgt[1] - 11.9).abs() < 1e-5);
        assert_eq!(tgt[2], -1.0);
        Ok(())
    }

    #[test]
    fn test_double_q_bootstrap() -> Result<()> {
        let device = Device::Cpu;
        let q_live = Tensor::new(&[[1f32, 5.0, 2.0], [3.0, 0.0, 0.0]], &device)?;
        let q_tgt = Tensor::new(&[[10f32, 20.0, 30.0], [40.0, 50.0, 60.0]], &device)?;

        // Index from the live network, value from the target network.
        let q = double_q_bootstrap(&q_live, &q_tgt)?.to_vec1::<f32>()?;
        assert_eq!(q, vec![20.0, 40.0]);

        let q = max_q_bootstrap(&q_tgt)?.to_vec1::<f32>()?;
        assert_eq!(q, vec![30.0, 60.0]);
        Ok(())
    }

    #[test]
    fn test_twin_critic_bootstrap() -> Result<()> {
        let device = Device::Cpu;
        let q1 = Tensor::new(&[[1f32], [5.0], [-2.0]], &device)?;
        let q2 = Tensor::new(&[[3f32], [4.0], [-1.0]], &device)?;
        let q = twin_critic_bootstrap(&q1, &q2)?.flatten_all()?.to_vec1::<f32>()?;
        assert_eq!(q, vec![1.0, 4.0, -2.0]);
        Ok(())
    }

    #[test]
    fn test_smoothing_noise_statistics() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(0);
        let n = 20000;
        let noise = smoothing_noise(&mut rng, n, 1.0, 100.0, &[1.0], &Device::Cpu)?;
        let zs = noise.flatten_all()?.to_vec1::<f32>()?;
        let mean = zs.iter().sum::<f32>() / n as f32;
        let var = zs.iter().map(|z| (z - mean).powi(2)).sum::<f32>() / n as f32;
        assert!(zs.iter().all(|z| z.is_finite()));
        assert!(mean.abs() < 0.05);
        assert!((var - 1.0).abs() < 0.05);
        Ok(())
    }

    #[test]
    fn test_smoothing_noise_bounds() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(1);
        let scale = [2.0f32, 0.5];
        let noise = smoothing_noise(&mut rng, 500, 10.0, 0.5, &scale, &Device::Cpu)?;
        assert_eq!(noise.dims(), &[500, 2]);

        let noise = noise.to_vec2::<f32>()?;
        for n in noise.iter() {
            assert!(n[0].abs() <= 0.5 * 2.0 + 1e-6);
            assert!(n[1].abs() <= 0.5 * 0.5 + 1e-6);
        }
        // With a large policy noise, most values are at the clipping bound.
        let n_clipped = noise.iter().filter(|n| n[0].abs() == 1.0).count();
        assert!(n_clipped > 400);

        assert!(smoothing_noise(&mut rng, 1, 0.2, -0.1, &scale, &Device::Cpu).is_err());
        Ok(())
    }

    #[test]
    fn test_smoothed_target_action() -> Result<()> {
        let device = Device::Cpu;
        let a = Tensor::new(&[[1.9f32, 0.0], [-1.9, 0.1]], &device)?;
        let noise = Tensor::new(&[[0.5f32, 0.2], [-0.5, -0.2]], &device)?;
        let low = Tensor::new(&[-2f32, -1.0], &device)?;
        let high = Tensor::new(&[2f32, 1.0], &device)?;
        let tgt = smoothed_target_action(&a, &noise, &low, &high)?.to_vec2::<f32>()?;

        assert_eq!(tgt[0][0], 2.0);
        assert!((tgt[0][1] - 0.2).abs() < 1e-6);
        assert_eq!(tgt[1][0], -2.0);
        assert!((tgt[1][1] + 0.1).abs() < 1e-6);
        Ok(())
    }
}
