//! Synchronization of target networks.
//!
//! A target network has the same topology as its live network, so the two
//! [`VarMap`]s hold variables of the same names and shapes. Target networks are
//! written only through the functions in this module.
use anyhow::{anyhow, bail, Result};
use candle_nn::VarMap;
use log::trace;
use serde::{Deserialize, Serialize};

fn check_distinct(dest: &VarMap, src: &VarMap) -> Result<()> {
    if std::ptr::eq(dest.data(), src.data()) {
        bail!("The source and the destination of synchronization are the same VarMap");
    }
    Ok(())
}

/// Copies the variables of `src` into `dest`.
///
/// Variables are identified by their names.
pub fn hard_copy(dest: &VarMap, src: &VarMap) -> Result<()> {
    check_distinct(dest, src)?;
    let dest = dest.data().lock().map_err(|e| anyhow!("{}", e))?;
    let src = src.data().lock().map_err(|e| anyhow!("{}", e))?;

    for (k_dest, v_dest) in dest.iter() {
        let v_src = src
            .get(k_dest)
            .ok_or_else(|| anyhow!("Variable {} is not in the source", k_dest))?;
        v_dest.set(v_src.as_tensor())?;
    }
    trace!("Copied {} variables", dest.len());

    Ok(())
}

/// Apply soft update on variables.
///
/// Variables are identified by their names.
///
/// dest = tau * src + (1.0 - tau) * dest
pub fn track(dest: &VarMap, src: &VarMap, tau: f64) -> Result<()> {
    check_distinct(dest, src)?;
    let dest = dest.data().lock().map_err(|e| anyhow!("{}", e))?;
    let src = src.data().lock().map_err(|e| anyhow!("{}", e))?;

    for (k_dest, v_dest) in dest.iter() {
        let v_src = src
            .get(k_dest)
            .ok_or_else(|| anyhow!("Variable {} is not in the source", k_dest))?;
        let t_src = v_src.as_tensor();
        let t_dest = v_dest.as_tensor();
        let t_dest = ((tau * t_src)? + ((1.0 - tau) * t_dest)?)?;
        v_dest.set(&t_dest)?;
    }
    trace!("Tracked {} variables with tau = {}", dest.len(), tau);

    Ok(())
}

/// How target networks follow live networks.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub enum SyncPolicy {
    /// Copies the live network every `interval` optimization steps.
    Hard {
        /// Interval in optimization steps.
        interval: usize,
    },

    /// Moves the target network toward the live network on every optimization step,
    /// `target = tau * live + (1 - tau) * target`.
    Soft {
        /// Soft update coefficient in `[0, 1]`.
        tau: f64,
    },
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self::Soft { tau: 0.005 }
    }
}

impl SyncPolicy {
    /// Updates `target` from `live` regardless of the interval.
    pub fn apply(&self, live: &VarMap, target: &VarMap) -> Result<()> {
        match self {
            Self::Hard { .. } => hard_copy(target, live),
            Self::Soft { tau } => track(target, live, *tau),
        }
    }

    fn check(&self) -> Result<()> {
        match self {
            Self::Hard { interval } if *interval == 0 => {
                bail!("Interval of hard synchronization must be positive")
            }
            Self::Soft { tau } if !(0.0..=1.0).contains(tau) => {
                bail!("tau must be in [0, 1], got {}", tau)
            }
            _ => Ok(()),
        }
    }
}

/// Applies a [`SyncPolicy`] to pairs of live and target networks on a schedule
/// of optimization steps.
///
/// [`SyncPolicy::Hard`] syncs on every `interval`-th call of [`TargetSync::step`],
/// [`SyncPolicy::Soft`] on every call. All pairs given to a call are updated
/// together.
#[derive(Debug, Clone)]
pub struct TargetSync {
    policy: SyncPolicy,
    n_steps: usize,
}

impl TargetSync {
    /// Constructs the synchronizer.
    ///
    /// Fails if the interval is zero or `tau` is out of `[0, 1]`.
    pub fn new(policy: SyncPolicy) -> Result<Self> {
        policy.check()?;
        Ok(Self { policy, n_steps: 0 })
    }

    /// Returns the policy.
    pub fn policy(&self) -> &SyncPolicy {
        &self.policy
    }

    /// Counts an optimization step and updates the target networks if it is due.
    ///
    /// Each pair is `(live, target)`. Returns `true` if the targets were updated.
    pub fn step(&mut self, pairs: &[(&VarMap, &VarMap)]) -> Result<bool> {
        self.n_steps += 1;
        let is_due = match &self.policy {
            SyncPolicy::Hard { interval } => self.n_steps % interval == 0,
            SyncPolicy::Soft { .. } => true,
        };

        if is_due {
            for (live, target) in pairs.iter() {
                self.policy.apply(live, target)?;
            }
        }

        Ok(is_due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device, Tensor};
    use candle_nn::Init;

    fn varmap(w: &[f32], b: &[f32]) -> Result<VarMap> {
        let vm = VarMap::new();
        for (name, v) in [("w", w), ("b", b)].iter() {
            vm.get((v.len(),), name, Init::Const(0.), DType::F32, &Device::Cpu)?;
            let t = Tensor::from_slice(v, (v.len(),), &Device::Cpu)?;
            vm.data().lock().unwrap().get(*name).unwrap().set(&t)?;
        }
        Ok(vm)
    }

    fn values(vm: &VarMap, name: &str) -> Vec<f32> {
        vm.data()
            .lock()
            .unwrap()
            .get(name)
            .unwrap()
            .as_tensor()
            .to_vec1::<f32>()
            .unwrap()
    }

    fn assert_close(x: &[f32], y: &[f32]) {
        assert_eq!(x.len(), y.len());
        for (a, b) in x.iter().zip(y.iter()) {
            assert!((a - b).abs() < 1e-6, "{:?} != {:?}", x, y);
        }
    }

    #[test]
    fn test_hard_copy() -> Result<()> {
        let live = varmap(&[1.0, 2.0, 3.0], &[0.5])?;
        let target = varmap(&[4.0, 5.0, 6.0], &[-0.5])?;
        hard_copy(&target, &live)?;
        assert_eq!(values(&target, "w"), vec![1.0, 2.0, 3.0]);
        assert_eq!(values(&target, "b"), vec![0.5]);

        // The copy does not alias the live variables.
        let t = Tensor::from_slice(&[7f32, 8.0, 9.0], (3,), &Device::Cpu)?;
        live.data().lock().unwrap().get("w").unwrap().set(&t)?;
        assert_eq!(values(&target, "w"), vec![1.0, 2.0, 3.0]);
        Ok(())
    }

    #[test]
    fn test_track() -> Result<()> {
        let live = varmap(&[1.0, 2.0, 3.0], &[0.0])?;

        let target = varmap(&[4.0, 5.0, 6.0], &[1.0])?;
        track(&target, &live, 1.0)?;
        assert_close(&values(&target, "w"), &[1.0, 2.0, 3.0]);

        let target = varmap(&[4.0, 5.0, 6.0], &[1.0])?;
        track(&target, &live, 0.0)?;
        assert_close(&values(&target, "w"), &[4.0, 5.0, 6.0]);

        let target = varmap(&[4.0, 5.0, 6.0], &[1.0])?;
        track(&target, &live, 0.7)?;
        assert_close(&values(&target, "w"), &[1.9, 2.9, 3.9]);
        assert_close(&values(&target, "b"), &[0.3]);
        Ok(())
    }

    #[test]
    fn test_same_varmap_is_an_error() -> Result<()> {
        let vm = varmap(&[1.0], &[0.0])?;
        assert!(hard_copy(&vm, &vm).is_err());
        assert!(track(&vm, &vm.clone(), 0.5).is_err());
        Ok(())
    }

    #[test]
    fn test_missing_variable_is_an_error() -> Result<()> {
        let live = VarMap::new();
        live.get((1,), "w", Init::Const(0.), DType::F32, &Device::Cpu)?;
        let target = varmap(&[1.0], &[0.0])?;
        assert!(hard_copy(&target, &live).is_err());
        Ok(())
    }

    #[test]
    fn test_hard_interval() -> Result<()> {
        let live = varmap(&[1.0], &[1.0])?;
        let target = varmap(&[0.0], &[0.0])?;
        let mut sync = TargetSync::new(SyncPolicy::Hard { interval: 3 })?;

        let synced = (0..6)
            .map(|_| sync.step(&[(&live, &target)]))
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(synced, vec![false, false, true, false, false, true]);
        assert_eq!(values(&target, "w"), vec![1.0]);
        Ok(())
    }

    #[test]
    fn test_soft_updates_all_pairs() -> Result<()> {
        let live1 = varmap(&[1.0], &[1.0])?;
        let target1 = varmap(&[0.0], &[0.0])?;
        let live2 = varmap(&[2.0], &[2.0])?;
        let target2 = varmap(&[0.0], &[0.0])?;
        let mut sync = TargetSync::new(SyncPolicy::Soft { tau: 0.5 })?;

        assert!(sync.step(&[(&live1, &target1), (&live2, &target2)])?);
        assert_close(&values(&target1, "w"), &[0.5]);
        assert_close(&values(&target2, "w"), &[1.0]);
        Ok(())
    }

    #[test]
    fn test_invalid_policy() {
        assert!(TargetSync::new(SyncPolicy::Hard { interval: 0 }).is_err());
        assert!(TargetSync::new(SyncPolicy::Soft { tau: 1.5 }).is_err());
        assert!(TargetSync::new(SyncPolicy::Soft { tau: 1.0 }).is_ok());
    }
}
