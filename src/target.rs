//! Target-network synchronisation.
//!
//! A target network is a slowly-tracking copy of an online network. Soft updates
//! blend the online parameters in at rate `tau` (Polyak averaging); hard updates
//! copy them outright.

use log::trace;
use ndarray::Zip;

use crate::approximator::FunctionApproximator;
use crate::error::{DdpgError, Result};

/// `target[i] = tau * online[i] + (1 - tau) * target[i]` for every parameter tensor.
pub fn soft_update<M: FunctionApproximator>(target: &mut M, online: &M, tau: f32) -> Result<()> {
    if !(tau > 0.0 && tau <= 1.0) {
        return Err(DdpgError::invalid_parameter(
            "tau".to_string(),
            format!("{} is outside (0, 1]", tau),
        ));
    }

    let online = online.parameters();
    let mut blended = target.parameters();
    check_mirrored(&blended, &online)?;

    for (t, o) in blended.iter_mut().zip(online.iter()) {
        Zip::from(t).and(o).for_each(|t, &o| *t = tau * o + (1.0 - tau) * *t);
    }

    target.set_parameters(&blended)?;
    trace!("soft update with tau = {}", tau);
    Ok(())
}

/// Copy the online parameters into the target exactly.
pub fn hard_update<M: FunctionApproximator>(target: &mut M, online: &M) -> Result<()> {
    target.set_parameters(&online.parameters())?;
    trace!("hard update");
    Ok(())
}

/// Euclidean distance between the parameters of two identically shaped networks.
pub fn parameter_distance<M: FunctionApproximator>(a: &M, b: &M) -> Result<f32> {
    let a = a.parameters();
    let b = b.parameters();
    check_mirrored(&a, &b)?;

    let squared: f32 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| Zip::from(x).and(y).fold(0.0, |acc, &x, &y| acc + (x - y) * (x - y)))
        .sum();
    Ok(squared.sqrt())
}

fn check_mirrored(a: &[ndarray::ArrayD<f32>], b: &[ndarray::ArrayD<f32>]) -> Result<()> {
    if a.len() != b.len() || a.iter().zip(b).any(|(x, y)| x.shape() != y.shape()) {
        return Err(DdpgError::dimension_mismatch(
            format!("{} tensors with shapes {:?}", a.len(), a.iter().map(|x| x.shape().to_vec()).collect::<Vec<_>>()),
            format!("{} tensors with shapes {:?}", b.len(), b.iter().map(|x| x.shape().to_vec()).collect::<Vec<_>>()),
        ));
    }
    Ok(())
}
