//! Container-section summarizer
//!
//! Walks YAML-shaped spec text line by line and keeps the marker line plus
//! allow-listed keys inside the container list. The walk is a two-state
//! machine driven by indentation depth.

/// Keys retained inside the container list
pub const ALLOWED_KEYS: [&str; 10] = [
    "name",
    "image",
    "resources",
    "limits",
    "requests",
    "securityContext",
    "volumeMounts",
    "ports",
    "livenessProbe",
    "readinessProbe",
];

const MARKER_KEY: &str = "containers";

/// Configuration for the container summarizer
#[derive(Debug, Clone)]
pub struct SummaryConfig {
    /// Indentation depth of the container list entries (default: 6)
    pub container_indent: usize,
    /// Columns a tab counts for (default: 2)
    pub tab_width: usize,
    /// Upper bound on retained lines (default: 200)
    pub max_lines: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            container_indent: 6,
            tab_width: 2,
            max_lines: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Outside,
    InContainers,
}

/// Summarize spec text down to the container configuration
pub fn summarize(spec_text: &str, config: &SummaryConfig) -> String {
    let mut state = State::Outside;
    let mut retained: Vec<&str> = Vec::new();

    for line in spec_text.lines() {
        if retained.len() >= config.max_lines {
            break;
        }

        if line.trim().is_empty() {
            continue;
        }

        let key = line_key(line);

        state = match state {
            State::Outside => {
                if key == Some(MARKER_KEY) {
                    retained.push(line);
                    State::InContainers
                } else {
                    State::Outside
                }
            }
            State::InContainers => {
                if indent_depth(line, config.tab_width) < config.container_indent {
                    // A dedented line may itself open another container list
                    if key == Some(MARKER_KEY) {
                        retained.push(line);
                        State::InContainers
                    } else {
                        State::Outside
                    }
                } else {
                    if key.is_some_and(|k| ALLOWED_KEYS.contains(&k)) {
                        retained.push(line);
                    }
                    State::InContainers
                }
            }
        };
    }

    retained.join("\n")
}

/// Indentation depth in columns, counting tabs as `tab_width`
fn indent_depth(line: &str, tab_width: usize) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { tab_width } else { 1 })
        .sum()
}

/// Mapping key of a line, ignoring a leading list dash
fn line_key(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let trimmed = trimmed.strip_prefix("- ").unwrap_or(trimmed).trim_start();
    let (key, _) = trimmed.split_once(':')?;
    let key = key.trim_end();
    (!key.is_empty() && !key.contains(' ')).then_some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str = "\
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
spec:
  template:
    spec:
      containers:
      - name: web
        image: nginx:1.25
        env:
        - value: production
        resources:
          limits:
            cpu: 500m
          requests:
            cpu: 150m
        livenessProbe:
          httpGet:
            path: /healthz
  strategy:
    type: RollingUpdate
";

    #[test]
    fn test_keeps_marker_and_allowed_keys() {
        let summary = summarize(SPEC, &SummaryConfig::default());

        assert_eq!(
            summary,
            "      containers:\n\
             \x20     - name: web\n\
             \x20       image: nginx:1.25\n\
             \x20       resources:\n\
             \x20         limits:\n\
             \x20         requests:\n\
             \x20       livenessProbe:"
        );
    }

    #[test]
    fn test_metadata_name_outside_containers_is_dropped() {
        let summary = summarize(SPEC, &SummaryConfig::default());
        assert!(!summary.contains("  name: web\n"));
        assert!(!summary.starts_with("  name"));
    }

    #[test]
    fn test_stops_before_dedented_line() {
        let spec = "      containers:\n      - name: app\n    strategy:\n      name: late\n";
        let summary = summarize(spec, &SummaryConfig::default());

        assert_eq!(summary, "      containers:\n      - name: app");
    }

    #[test]
    fn test_blank_lines_do_not_exit_container_section() {
        let spec = "      containers:\n\n      - name: app\n\n        image: app:1\n";
        let summary = summarize(spec, &SummaryConfig::default());

        assert_eq!(summary, "      containers:\n      - name: app\n        image: app:1");
    }

    #[test]
    fn test_tabs_count_as_configured_width() {
        let spec = "\t\t\tcontainers:\n\t\t\t- name: app\n\t\timage: dropped\n";

        // Three tabs at width 2 reach the default indent of 6
        let summary = summarize(spec, &SummaryConfig::default());
        assert_eq!(summary, "\t\t\tcontainers:\n\t\t\t- name: app");

        let narrow = SummaryConfig {
            tab_width: 1,
            ..Default::default()
        };
        assert_eq!(summarize(spec, &narrow), "\t\t\tcontainers:");
    }

    #[test]
    fn test_custom_container_indent() {
        let spec = "containers:\n- name: app\n  image: app:1\n";
        let config = SummaryConfig {
            container_indent: 0,
            ..Default::default()
        };

        assert_eq!(summarize(spec, &config), "containers:\n- name: app\n  image: app:1");
    }

    #[test]
    fn test_substring_keys_are_not_matched() {
        let spec = "      containers:\n      - name: app\n        imagePullPolicy: Always\n        hostname: x\n";
        let summary = summarize(spec, &SummaryConfig::default());

        assert_eq!(summary, "      containers:\n      - name: app");
    }

    #[test]
    fn test_max_lines_bounds_output() {
        let mut spec = String::from("      containers:\n");
        for i in 0..50 {
            spec.push_str(&format!("      - name: c{}\n", i));
        }

        let config = SummaryConfig {
            max_lines: 5,
            ..Default::default()
        };
        assert_eq!(summarize(&spec, &config).lines().count(), 5);
    }

    #[test]
    fn test_no_marker_yields_empty_summary() {
        assert_eq!(summarize("kind: Service\nspec:\n  ports: []\n", &SummaryConfig::default()), "");
    }

    #[test]
    fn test_line_key() {
        assert_eq!(line_key("      - name: web"), Some("name"));
        assert_eq!(line_key("        resources:"), Some("resources"));
        assert_eq!(line_key("  # a comment: here"), None);
        assert_eq!(line_key("plain text"), None);
    }
}
