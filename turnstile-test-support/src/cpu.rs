//! Thread pinning for benchmark workers.

use turnstile::{Result, TurnstileError};

#[cfg(target_os = "linux")]
pub fn pin_to_cpu(cpu_id: usize) -> Result<()> {
    use libc::{cpu_set_t, sched_setaffinity, CPU_SET, CPU_ZERO};
    use std::mem;

    unsafe {
        let mut cpu_set: cpu_set_t = mem::zeroed();
        CPU_ZERO(&mut cpu_set);
        CPU_SET(cpu_id, &mut cpu_set);

        if sched_setaffinity(0, mem::size_of::<cpu_set_t>(), &cpu_set) != 0 {
            return Err(TurnstileError::config(format!("failed to pin thread to cpu {}", cpu_id)));
        }
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn pin_to_cpu(_cpu_id: usize) -> Result<()> {
    Ok(())
}

/// CPU for the `index`-th worker, wrapping over the available cores.
pub fn cpu_for_worker(index: usize) -> usize {
    index % num_cpus::get().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_for_worker_wraps() {
        let cores = num_cpus::get().max(1);
        assert_eq!(cpu_for_worker(0), 0);
        assert_eq!(cpu_for_worker(cores), 0);
        assert!(cpu_for_worker(cores + 1) < cores);
    }
}
