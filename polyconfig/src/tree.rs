//! Path operations over the YAML document
//!
//! Keys are case-insensitive: they are lowercased on the way in and every
//! lookup lowercases the requested segment.

use anyhow::{Result, anyhow, bail};
use serde_yaml::{Mapping, Value};

fn key(segment: &str) -> Value {
    Value::String(segment.to_lowercase())
}

/// Value stored at `path`
pub(crate) fn lookup<'a>(root: &'a Value, path: &[&str]) -> Result<&'a Value> {
    path.iter().enumerate().try_fold(root, |node, (depth, segment)| {
        let Value::Mapping(map) = node else {
            bail!("{} is not a section", path[..depth].join("."));
        };
        map.get(key(segment))
            .ok_or_else(|| anyhow!("{} is not set", path[..=depth].join(".")))
    })
}

/// Stores `value` at `path`, creating intermediate sections
pub(crate) fn insert(root: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return Ok(());
    };

    let mut node = root;
    for segment in parents {
        let Value::Mapping(map) = node else {
            bail!("Cannot create {} under a value", segment);
        };
        node = map
            .entry(key(segment))
            .or_insert(Value::Mapping(Mapping::new()));
    }
    match node {
        Value::Mapping(map) => {
            map.insert(key(last), value);
            Ok(())
        }
        _ => Err(anyhow!("{} is not a section", parents.join("."))),
    }
}

/// Removes the value at `path`; returns whether something was removed
pub(crate) fn remove(root: &mut Value, path: &[&str]) -> Result<bool> {
    let Some((last, parents)) = path.split_last() else {
        bail!("Cannot remove the configuration root");
    };

    let mut node = root;
    for segment in parents {
        match node {
            Value::Mapping(map) => match map.get_mut(key(segment)) {
                Some(next) => node = next,
                None => return Ok(false),
            },
            _ => return Ok(false),
        }
    }
    Ok(match node {
        Value::Mapping(map) => map.remove(key(last)).is_some(),
        _ => false,
    })
}

/// Overlays `overlay` onto `base`: sections merge key by key, anything else
/// replaces the base value
pub(crate) fn overlay(base: &mut Value, overlay_value: &Value) {
    match (base, overlay_value) {
        (Value::Mapping(base_map), Value::Mapping(over_map)) => {
            for (k, v) in over_map {
                if let Some(existing) = base_map.get_mut(k) {
                    overlay(existing, v);
                } else {
                    base_map.insert(k.clone(), v.clone());
                }
            }
        }
        (slot, v) => *slot = v.clone(),
    }
}

/// Lowercases every string key, recursively
pub(crate) fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| {
                    let k = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (k, normalize_keys(v))
                })
                .collect(),
        ),
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

/// Applies `PREFIX` + `A__B__C=value` variables as overrides of `a.b.c`
///
/// Values are parsed as YAML so that numbers and booleans keep their type.
pub(crate) fn apply_overrides<I>(root: &mut Value, prefix: &str, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (name, raw) in vars {
        let Some(path) = name.strip_prefix(prefix) else {
            continue;
        };
        let segments: Vec<&str> = path.split("__").collect();
        let value = serde_yaml::from_str(&raw).unwrap_or(Value::String(raw));
        if let Err(e) = insert(root, &segments, value) {
            tracing::warn!(variable = %name, "Ignoring configuration override: {}", e);
        }
    }
}
