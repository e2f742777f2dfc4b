//! Tree-walking port patching for JSON and YAML configs.

/// Keys containing "port" (any case) are port-bearing.
pub fn is_port_key(key: &str) -> bool {
    key.to_ascii_lowercase().contains("port")
}

/// Overwrite integer values of port-bearing keys anywhere in a JSON tree.
///
/// Port-bearing keys with non-integer values are left as they are and not
/// descended into. Returns the number of values that changed.
pub fn replace_json_ports(value: &mut serde_json::Value, new_port: u16) -> usize {
    use serde_json::Value;

    match value {
        Value::Object(map) => {
            let mut changed = 0;
            for (key, child) in map.iter_mut() {
                if is_port_key(key) {
                    if child.is_i64() || child.is_u64() {
                        if child.as_u64() != Some(u64::from(new_port)) {
                            tracing::debug!("Port field '{}': {} -> {}", key, child, new_port);
                            *child = Value::from(new_port);
                            changed += 1;
                        }
                    }
                } else {
                    changed += replace_json_ports(child, new_port);
                }
            }
            changed
        }
        Value::Array(items) => items
            .iter_mut()
            .map(|item| replace_json_ports(item, new_port))
            .sum(),
        _ => 0,
    }
}

/// Number of integer-valued port-bearing keys anywhere in a JSON tree.
pub fn count_json_ports(value: &serde_json::Value) -> usize {
    use serde_json::Value;

    match value {
        Value::Object(map) => map
            .iter()
            .map(|(key, child)| {
                if is_port_key(key) {
                    usize::from(child.is_i64() || child.is_u64())
                } else {
                    count_json_ports(child)
                }
            })
            .sum(),
        Value::Array(items) => items.iter().map(count_json_ports).sum(),
        _ => 0,
    }
}

/// Number of integer-valued port-bearing keys anywhere in a YAML tree.
pub fn count_yaml_ports(value: &serde_yaml::Value) -> usize {
    use serde_yaml::Value;

    match value {
        Value::Mapping(map) => map
            .iter()
            .map(|(key, child)| match key.as_str() {
                Some(key) if is_port_key(key) => {
                    usize::from(matches!(child, Value::Number(n) if n.is_i64() || n.is_u64()))
                }
                _ => count_yaml_ports(child),
            })
            .sum(),
        Value::Sequence(items) => items.iter().map(count_yaml_ports).sum(),
        Value::Tagged(tagged) => count_yaml_ports(&tagged.value),
        _ => 0,
    }
}

/// YAML counterpart of [`replace_json_ports`]; non-string keys are never port keys.
pub fn replace_yaml_ports(value: &mut serde_yaml::Value, new_port: u16) -> usize {
    use serde_yaml::Value;

    match value {
        Value::Mapping(map) => {
            let mut changed = 0;
            for (key, child) in map.iter_mut() {
                match key.as_str() {
                    Some(key) if is_port_key(key) => {
                        if let Value::Number(n) = child {
                            if (n.is_i64() || n.is_u64()) && n.as_u64() != Some(u64::from(new_port))
                            {
                                tracing::debug!("Port field '{}': {} -> {}", key, n, new_port);
                                *child = Value::Number(u64::from(new_port).into());
                                changed += 1;
                            }
                        }
                    }
                    _ => changed += replace_yaml_ports(child, new_port),
                }
            }
            changed
        }
        Value::Sequence(items) => items
            .iter_mut()
            .map(|item| replace_yaml_ports(item, new_port))
            .sum(),
        Value::Tagged(tagged) => replace_yaml_ports(&mut tagged.value, new_port),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn port_key_matching_is_case_insensitive_substring() {
        assert!(is_port_key("port"));
        assert!(is_port_key("HTTP_PORT"));
        assert!(is_port_key("adminPort"));
        assert!(is_port_key("ports"));
        assert!(!is_port_key("host"));
    }

    #[test]
    fn json_nested_objects_and_arrays() {
        let mut value = json!({
            "name": "bot",
            "server": { "port": 8000, "host": "0.0.0.0" },
            "adapters": [ { "wsPort": 3001 }, { "ws_port": 3002, "label": "b" } ],
            "retries": 3
        });
        let changed = replace_json_ports(&mut value, 9000);
        assert_eq!(changed, 3);
        assert_eq!(
            value,
            json!({
                "name": "bot",
                "server": { "port": 9000, "host": "0.0.0.0" },
                "adapters": [ { "wsPort": 9000 }, { "ws_port": 9000, "label": "b" } ],
                "retries": 3
            })
        );
    }

    #[test]
    fn json_non_integer_port_values_untouched() {
        let mut value = json!({
            "port": "8000",
            "export_port": 1.5,
            "ports": { "http": 80 },
            "api_port": null
        });
        let before = value.clone();
        assert_eq!(replace_json_ports(&mut value, 9000), 0);
        assert_eq!(value, before);
    }

    #[test]
    fn json_second_pass_changes_nothing() {
        let mut value = json!({ "port": 1 });
        assert_eq!(replace_json_ports(&mut value, 9000), 1);
        assert_eq!(replace_json_ports(&mut value, 9000), 0);
    }

    #[test]
    fn counts_only_integer_port_values() {
        let value = json!({ "port": 9000, "api": { "adminPort": "x", "ws_port": 1 }, "list": [{ "port": 2 }] });
        assert_eq!(count_json_ports(&value), 3);

        let yaml: serde_yaml::Value =
            serde_yaml::from_str("port: 1\nname: x\nsub:\n  http_port: null\n").unwrap();
        assert_eq!(count_yaml_ports(&yaml), 1);
    }

    #[test]
    fn yaml_mappings_and_sequences() {
        let mut value: serde_yaml::Value = serde_yaml::from_str(
            "server:\n  Port: 8000\n  host: localhost\nlisteners:\n  - listen_port: 8001\n  - name: x\n1: 2\n",
        )
        .unwrap();
        assert_eq!(replace_yaml_ports(&mut value, 9000), 2);
        assert_eq!(value["server"]["Port"], serde_yaml::Value::from(9000u64));
        assert_eq!(value["listeners"][0]["listen_port"], serde_yaml::Value::from(9000u64));
        assert_eq!(value["server"]["host"], serde_yaml::Value::from("localhost"));
    }
}
