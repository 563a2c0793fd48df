//! Efficiency scoring against the first container's requests

use crate::models::{ContainerSpec, Efficiency, EfficiencyLevel};

const MIB: u64 = 1024 * 1024;

/// Below this average efficiency a workload is rated `Low`
pub const MEDIUM_THRESHOLD: f64 = 50.0;
/// At or above this average efficiency a workload is rated `High`
pub const HIGH_THRESHOLD: f64 = 80.0;

/// Classify an average efficiency percentage
pub fn classify(avg_efficiency: f64) -> EfficiencyLevel {
    if avg_efficiency < MEDIUM_THRESHOLD {
        EfficiencyLevel::Low
    } else if avg_efficiency < HIGH_THRESHOLD {
        EfficiencyLevel::Medium
    } else {
        EfficiencyLevel::High
    }
}

/// Score average usage against the baseline container's requests
///
/// Only the first container of the pod template is used as the baseline;
/// sidecars do not contribute requests. Memory is compared in whole MiB.
pub fn compute_efficiency(
    avg_cpu_millicores: u64,
    avg_memory_bytes: u64,
    baseline: Option<&ContainerSpec>,
) -> Efficiency {
    let Some(baseline) = baseline else {
        return Efficiency::unavailable("no containers");
    };

    let cpu_request = baseline.cpu_request_millicores;
    let memory_request_mib = baseline.memory_request_bytes / MIB;

    if cpu_request == 0 || memory_request_mib == 0 {
        return Efficiency::unavailable("no resource requests set");
    }

    let avg_memory_mib = avg_memory_bytes / MIB;

    let cpu_efficiency = avg_cpu_millicores as f64 / cpu_request as f64 * 100.0;
    let memory_efficiency = avg_memory_mib as f64 / memory_request_mib as f64 * 100.0;
    let percent = (cpu_efficiency + memory_efficiency) / 2.0;

    Efficiency::Rated {
        level: classify(percent),
        percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline(cpu_request: u64, memory_request: u64) -> ContainerSpec {
        ContainerSpec {
            name: "app".to_string(),
            image: "app:latest".to_string(),
            cpu_request_millicores: cpu_request,
            memory_request_bytes: memory_request,
            ..Default::default()
        }
    }

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(classify(0.0), EfficiencyLevel::Low);
        assert_eq!(classify(49.9), EfficiencyLevel::Low);
        assert_eq!(classify(50.0), EfficiencyLevel::Medium);
        assert_eq!(classify(79.9), EfficiencyLevel::Medium);
        assert_eq!(classify(80.0), EfficiencyLevel::High);
        assert_eq!(classify(250.0), EfficiencyLevel::High);
    }

    #[test]
    fn test_compute_efficiency_high() {
        let efficiency = compute_efficiency(150, 256 * MIB, Some(&baseline(150, 320 * MIB)));

        assert_eq!(efficiency.level(), EfficiencyLevel::High);
        assert!((efficiency.percent().unwrap() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_compute_efficiency_low() {
        let efficiency = compute_efficiency(50, 64 * MIB, Some(&baseline(500, 512 * MIB)));

        // cpu 10%, memory 12.5%
        assert_eq!(efficiency.level(), EfficiencyLevel::Low);
        assert!((efficiency.percent().unwrap() - 11.25).abs() < 1e-9);
    }

    #[test]
    fn test_zero_requests_are_not_available() {
        for (cpu, memory) in [(0, 320 * MIB), (150, 0), (0, 0)] {
            let efficiency = compute_efficiency(10_000, 10_000 * MIB, Some(&baseline(cpu, memory)));
            assert_eq!(efficiency.level(), EfficiencyLevel::NotAvailable);
            assert_eq!(efficiency.percent(), None);
            assert_eq!(efficiency.unavailable_reason(), Some("no resource requests set"));
        }
    }

    #[test]
    fn test_sub_mebibyte_memory_request_is_not_available() {
        let efficiency = compute_efficiency(100, 10 * MIB, Some(&baseline(100, 512 * 1024)));
        assert_eq!(efficiency.unavailable_reason(), Some("no resource requests set"));
    }

    #[test]
    fn test_no_containers() {
        let efficiency = compute_efficiency(100, MIB, None);
        assert_eq!(efficiency.unavailable_reason(), Some("no containers"));
    }
}
