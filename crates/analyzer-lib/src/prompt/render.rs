//! Canonical spec text for a resolved pod template

use crate::locator::quantity::{format_cpu_quantity, format_memory_quantity};
use crate::models::{PodTemplateSpec, WorkloadRef};
use std::fmt::Write;

/// Render the pod template as YAML-shaped text
///
/// The layout is fixed: the container list sits at six spaces so the
/// default summarizer indent applies.
pub fn render_spec_text(workload: &WorkloadRef, template: &PodTemplateSpec) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "apiVersion: apps/v1");
    let _ = writeln!(out, "kind: {}", workload.kind);
    let _ = writeln!(out, "metadata:");
    let _ = writeln!(out, "  name: {}", workload.name);
    let _ = writeln!(out, "  namespace: {}", workload.namespace);
    let _ = writeln!(out, "spec:");
    if let Some(replicas) = template.desired_replicas {
        let _ = writeln!(out, "  replicas: {}", replicas);
    }
    let _ = writeln!(out, "  template:");
    let _ = writeln!(out, "    spec:");
    if let Some(priority_class) = &template.priority_class_name {
        let _ = writeln!(out, "      priorityClassName: {}", priority_class);
    }
    let _ = write!(out, "      containers:");

    for container in &template.containers {
        let _ = write!(
            out,
            "\n      - name: {}\
             \n        image: {}\
             \n        resources:\
             \n          limits:\
             \n            cpu: {}\
             \n            memory: {}\
             \n          requests:\
             \n            cpu: {}\
             \n            memory: {}",
            container.name,
            container.image,
            format_cpu_quantity(container.cpu_limit_millicores),
            format_memory_quantity(container.memory_limit_bytes),
            format_cpu_quantity(container.cpu_request_millicores),
            format_memory_quantity(container.memory_request_bytes),
        );
    }

    out
}
