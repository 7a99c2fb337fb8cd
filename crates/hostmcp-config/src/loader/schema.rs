//! Structural checks for hostmcp JSON5 config layers.
//!
//! Every layer is checked on its own so a typo is reported against the file
//! that contains it rather than the merged result.

use crate::ConfigError;
use serde_json::{Map, Value};

/// Validate a single config layer.
pub(super) fn validate_layer(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, "")?;
    ensure_allowed_keys(
        map,
        &[
            "$schema",
            "host",
            "readiness",
            "bridge",
            "server",
            "tools",
            "startup",
        ],
        layer,
        "",
    )?;

    if let Some(value) = map.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = map.get("host") {
        validate_host(value, layer, "host")?;
    }
    if let Some(value) = map.get("readiness") {
        validate_readiness(value, layer, "readiness")?;
    }
    if let Some(value) = map.get("bridge") {
        let map = expect_object(value, layer, "bridge")?;
        ensure_allowed_keys(map, &["timeout_ms"], layer, "bridge")?;
        if let Some(value) = map.get("timeout_ms") {
            expect_u64(value, layer, "bridge.timeout_ms")?;
        }
    }
    if let Some(value) = map.get("server") {
        validate_server(value, layer, "server")?;
    }
    if let Some(value) = map.get("tools") {
        validate_tools(value, layer, "tools")?;
    }
    if let Some(value) = map.get("startup") {
        validate_startup(value, layer, "startup")?;
    }
    Ok(())
}

fn validate_host(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["address", "port", "health_path"], layer, path)?;
    if let Some(value) = map.get("address") {
        expect_string(value, layer, &join_path(path, "address"))?;
    }
    if let Some(value) = map.get("port") {
        expect_port(value, layer, &join_path(path, "port"))?;
    }
    if let Some(value) = map.get("health_path") {
        expect_string(value, layer, &join_path(path, "health_path"))?;
    }
    Ok(())
}

fn validate_readiness(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["poll_interval_ms", "max_attempts", "probe_timeout_ms", "probe"],
        layer,
        path,
    )?;
    for key in ["poll_interval_ms", "max_attempts", "probe_timeout_ms"] {
        if let Some(value) = map.get(key) {
            expect_u64(value, layer, &join_path(path, key))?;
        }
    }
    if let Some(value) = map.get("probe") {
        let probe_path = join_path(path, "probe");
        match value.as_str() {
            Some("http") | Some("tcp") => {}
            Some(_) => {
                return Err(invalid_field(
                    layer,
                    &probe_path,
                    "expected \"http\" or \"tcp\"",
                ));
            }
            None => return Err(invalid_field(layer, &probe_path, "expected string")),
        }
    }
    Ok(())
}

fn validate_server(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["enabled", "name", "listen", "port", "session_idle_secs", "cors"],
        layer,
        path,
    )?;
    if let Some(value) = map.get("enabled") {
        expect_bool(value, layer, &join_path(path, "enabled"))?;
    }
    for key in ["name", "listen"] {
        if let Some(value) = map.get(key) {
            expect_string(value, layer, &join_path(path, key))?;
        }
    }
    if let Some(value) = map.get("port") {
        expect_port(value, layer, &join_path(path, "port"))?;
    }
    if let Some(value) = map.get("session_idle_secs") {
        expect_u64(value, layer, &join_path(path, "session_idle_secs"))?;
    }
    if let Some(value) = map.get("cors") {
        let cors_path = join_path(path, "cors");
        let cors = expect_object(value, layer, &cors_path)?;
        let lists = [
            "allow_origins",
            "allow_methods",
            "allow_headers",
            "expose_headers",
        ];
        let mut allowed = lists.to_vec();
        allowed.push("allow_credentials");
        ensure_allowed_keys(cors, &allowed, layer, &cors_path)?;
        for key in lists {
            if let Some(value) = cors.get(key) {
                validate_string_array(value, layer, &join_path(&cors_path, key))?;
            }
        }
        if let Some(value) = cors.get("allow_credentials") {
            expect_bool(value, layer, &join_path(&cors_path, "allow_credentials"))?;
        }
    }
    Ok(())
}

fn validate_tools(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["output_policy", "disabled"], layer, path)?;
    if let Some(value) = map.get("disabled") {
        validate_string_array(value, layer, &join_path(path, "disabled"))?;
    }
    if let Some(value) = map.get("output_policy") {
        let policy_path = join_path(path, "output_policy");
        let policy = expect_object(value, layer, &policy_path)?;
        ensure_allowed_keys(
            policy,
            &[
                "max_string_bytes",
                "max_array_len",
                "max_object_entries",
                "redact_keys",
                "replacement",
            ],
            layer,
            &policy_path,
        )?;
        for key in ["max_string_bytes", "max_array_len", "max_object_entries"] {
            if let Some(value) = policy.get(key) {
                expect_u64(value, layer, &join_path(&policy_path, key))?;
            }
        }
        if let Some(value) = policy.get("redact_keys") {
            validate_string_array(value, layer, &join_path(&policy_path, "redact_keys"))?;
        }
        if let Some(value) = policy.get("replacement") {
            expect_string(value, layer, &join_path(&policy_path, "replacement"))?;
        }
    }
    Ok(())
}

fn validate_startup(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["prepare_commands", "health_check"], layer, path)?;
    if let Some(value) = map.get("health_check") {
        expect_bool(value, layer, &join_path(path, "health_check"))?;
    }
    if let Some(list) = map.get("prepare_commands") {
        let list_path = join_path(path, "prepare_commands");
        for (idx, entry) in expect_array(list, layer, &list_path)?.iter().enumerate() {
            let entry_path = format!("{list_path}[{idx}]");
            let command = expect_object(entry, layer, &entry_path)?;
            ensure_allowed_keys(command, &["name", "check", "install"], layer, &entry_path)?;
            let name_path = join_path(&entry_path, "name");
            let Some(name) = command.get("name") else {
                return Err(invalid_field(layer, &name_path, "missing required field"));
            };
            expect_string(name, layer, &name_path)?;
            let install_path = join_path(&entry_path, "install");
            let Some(install) = command.get("install") else {
                return Err(invalid_field(layer, &install_path, "missing required field"));
            };
            validate_string_array(install, layer, &install_path)?;
            if let Some(check) = command.get("check") {
                validate_string_array(check, layer, &join_path(&entry_path, "check"))?;
            }
        }
    }
    Ok(())
}

fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    value
        .as_object()
        .ok_or_else(|| invalid_field(layer, path, "expected object"))
}

fn expect_array<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Vec<Value>, ConfigError> {
    value
        .as_array()
        .ok_or_else(|| invalid_field(layer, path, "expected array"))
}

fn expect_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    match value {
        Value::String(_) => Ok(()),
        _ => Err(invalid_field(layer, path, "expected string")),
    }
}

fn expect_bool(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    match value {
        Value::Bool(_) => Ok(()),
        _ => Err(invalid_field(layer, path, "expected bool")),
    }
}

fn expect_u64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_u64() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected non-negative integer"))
    }
}

fn expect_port(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    match value.as_u64() {
        Some(port) if port <= u64::from(u16::MAX) => Ok(()),
        _ => Err(invalid_field(layer, path, "expected port number")),
    }
}

fn validate_string_array(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    for (idx, entry) in expect_array(value, layer, path)?.iter().enumerate() {
        expect_string(entry, layer, &format!("{path}[{idx}]"))?;
    }
    Ok(())
}

fn ensure_allowed_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    match map.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(invalid_field(layer, &join_path(path, key), "unknown key")),
        None => Ok(()),
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let path = if path.is_empty() { "root" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{path}"),
        message: message.to_string(),
    }
}
