//! Kubernetes resource quantity parsing and formatting

const KI: f64 = 1024.0;
const MI: f64 = KI * 1024.0;
const GI: f64 = MI * 1024.0;
const TI: f64 = GI * 1024.0;
const PI: f64 = TI * 1024.0;
const EI: f64 = PI * 1024.0;

/// Parse a CPU quantity ("100m", "1", "0.5", "500000000n") into millicores
pub fn parse_cpu_millicores(quantity: &str) -> Option<u64> {
    let quantity = quantity.trim();

    let millicores = if let Some(val) = quantity.strip_suffix('n') {
        val.parse::<f64>().ok()? / 1_000_000.0
    } else if let Some(val) = quantity.strip_suffix('u') {
        val.parse::<f64>().ok()? / 1_000.0
    } else if let Some(val) = quantity.strip_suffix('m') {
        val.parse::<f64>().ok()?
    } else {
        quantity.parse::<f64>().ok()? * 1000.0
    };

    (millicores >= 0.0).then(|| millicores.round() as u64)
}

/// Parse a memory quantity ("128Mi", "1Gi", "500M", "1000000") into bytes
pub fn parse_memory_bytes(quantity: &str) -> Option<u64> {
    let quantity = quantity.trim();

    // Binary suffixes must be checked before their decimal prefixes
    let suffixes: [(&str, f64); 14] = [
        ("Ki", KI),
        ("Mi", MI),
        ("Gi", GI),
        ("Ti", TI),
        ("Pi", PI),
        ("Ei", EI),
        ("k", 1e3),
        ("K", 1e3),
        ("M", 1e6),
        ("G", 1e9),
        ("T", 1e12),
        ("P", 1e15),
        ("E", 1e18),
        ("m", 1e-3),
    ];

    let bytes = suffixes
        .iter()
        .find_map(|(suffix, factor)| {
            quantity
                .strip_suffix(suffix)
                .map(|val| val.parse::<f64>().map(|v| v * factor))
        })
        .unwrap_or_else(|| quantity.parse::<f64>())
        .ok()?;

    (bytes >= 0.0).then(|| bytes.round() as u64)
}

/// Format millicores the way Kubernetes manifests usually spell them
pub fn format_cpu_quantity(millicores: u64) -> String {
    if millicores != 0 && millicores % 1000 == 0 {
        format!("{}", millicores / 1000)
    } else {
        format!("{}m", millicores)
    }
}

/// Format bytes using the largest exact binary suffix
pub fn format_memory_quantity(bytes: u64) -> String {
    const UNITS: [(u64, &str); 4] = [
        (1 << 40, "Ti"),
        (1 << 30, "Gi"),
        (1 << 20, "Mi"),
        (1 << 10, "Ki"),
    ];

    if bytes == 0 {
        return "0".to_string();
    }

    UNITS
        .iter()
        .find(|(unit, _)| bytes % unit == 0)
        .map(|(unit, suffix)| format!("{}{}", bytes / unit, suffix))
        .unwrap_or_else(|| bytes.to_string())
}
